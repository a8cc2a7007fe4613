//! Locating and framing the raw `blk*.dat` files a node writes.
//!
//! Each file holds a sequence of frames: 4-byte network magic, 4-byte
//! payload size, payload. Files are preallocated, so a zero magic marks the
//! end of written data; the bytes after it are either padding or a frame the
//! node hasn't written yet.

use std::{
    fs::{self, File},
    io::{self, BufReader, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use byteorder::{LittleEndian, ReadBytesExt};
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use blkstream_chain::parameters::{BLOCK_MAGIC, END_OF_DATA_MAGIC, MAX_BLOCK_BYTES};

use crate::error::{Corruption, ScanError};

lazy_static! {
    static ref BLK_FILE_NAME: Regex =
        Regex::new(r"^blk(\d+)\.dat$").expect("hard-coded regex compiles");
}

/// A resumable position in the ordered `blk*.dat` sequence: the numeric
/// suffix of a file and the byte offset of the next unread frame within it.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct FilePosition {
    pub file_no: u32,
    pub offset: u64,
}

/// Lists the block files under `dir`, ordered by numeric suffix.
pub(crate) fn block_files(dir: &Path) -> io::Result<Vec<(u32, PathBuf)>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = match name.to_str() {
            Some(name) => name,
            None => continue,
        };
        if let Some(captures) = BLK_FILE_NAME.captures(name) {
            if let Ok(number) = captures[1].parse::<u32>() {
                files.push((number, entry.path()));
            }
        }
    }
    files.sort_unstable_by_key(|(number, _)| *number);
    Ok(files)
}

/// What unblocked a tailing wait.
enum Wait {
    /// New bytes are readable at the current offset.
    InPlace,
    /// Only a higher-numbered file appeared.
    NextFile,
}

/// Yields framed block payloads from the ordered file sequence.
///
/// This is the only pipeline stage that blocks: on file io, and on the
/// polling wait in tailing mode.
pub(crate) struct FrameReader {
    dir: PathBuf,
    files: Vec<(u32, PathBuf)>,
    cursor: usize,
    offset: u64,
    reader: Option<BufReader<File>>,
    tail: bool,
    recover: bool,
    poll_interval: Duration,
    cancel: Arc<AtomicBool>,
    exhausted: bool,
}

impl FrameReader {
    pub(crate) fn open(
        dir: &Path,
        start: Option<FilePosition>,
        tail: bool,
        recover: bool,
        poll_interval: Duration,
        cancel: Arc<AtomicBool>,
    ) -> Result<FrameReader, ScanError> {
        let files = block_files(dir)?;
        let mut reader = FrameReader {
            dir: dir.to_owned(),
            files,
            cursor: 0,
            offset: 0,
            reader: None,
            tail,
            recover,
            poll_interval,
            cancel,
            exhausted: false,
        };
        if let Some(position) = start {
            reader.cursor = reader
                .files
                .iter()
                .position(|(number, _)| *number == position.file_no)
                .ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::NotFound,
                        "resume position names a missing block file",
                    )
                })?;
            reader.offset = position.offset;
        }
        Ok(reader)
    }

    /// The position of the next unread frame.
    pub(crate) fn position(&self) -> FilePosition {
        let file_no = match self.files.get(self.cursor) {
            Some((number, _)) => *number,
            // past the end: the file the node would create next
            None => self.files.last().map(|(number, _)| number + 1).unwrap_or(0),
        };
        FilePosition {
            file_no,
            offset: self.offset,
        }
    }

    /// The next framed block payload, or `None` once the written data is
    /// exhausted (never in tailing mode, which waits instead).
    pub(crate) fn next_frame(&mut self) -> Result<Option<Bytes>, ScanError> {
        loop {
            if self.exhausted {
                return Ok(None);
            }
            if !self.ensure_reader()? {
                // nothing at the cursor: an empty directory, or all files read
                if self.tail {
                    self.wait_for_data()?;
                    continue;
                }
                self.exhausted = true;
                return Ok(None);
            }

            let frame_start = self.offset;
            let reader = self.reader.as_mut().expect("ensure_reader opened a file");
            let magic = match reader.read_u32::<LittleEndian>() {
                Ok(magic) => magic,
                Err(ref e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    self.end_of_data()?;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if magic == END_OF_DATA_MAGIC {
                self.end_of_data()?;
                continue;
            }
            if magic != BLOCK_MAGIC {
                let corruption = Corruption::BadMagic {
                    found: magic,
                    file_no: self.current_file_no(),
                    offset: frame_start,
                };
                self.advance_file();
                if self.recover {
                    warn!(%corruption, "skipping to the next block file");
                    continue;
                }
                return Err(corruption.into());
            }

            let reader = self.reader.as_mut().expect("reader still open");
            let size = match reader.read_u32::<LittleEndian>() {
                Ok(size) => size,
                Err(ref e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    self.incomplete_frame(frame_start)?;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if u64::from(size) > MAX_BLOCK_BYTES {
                let corruption = Corruption::OversizedFrame {
                    size,
                    file_no: self.current_file_no(),
                    offset: frame_start,
                };
                self.advance_file();
                if self.recover {
                    warn!(%corruption, "skipping to the next block file");
                    continue;
                }
                return Err(corruption.into());
            }

            let mut payload = vec![0u8; size as usize];
            let reader = self.reader.as_mut().expect("reader still open");
            match reader.read_exact(&mut payload) {
                Ok(()) => {
                    self.offset = frame_start + 8 + u64::from(size);
                    trace!(size, offset = self.offset, "framed block");
                    return Ok(Some(Bytes::from(payload)));
                }
                Err(ref e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    self.incomplete_frame(frame_start)?;
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn ensure_reader(&mut self) -> Result<bool, ScanError> {
        if self.reader.is_some() {
            return Ok(true);
        }
        let (_, path) = match self.files.get(self.cursor) {
            Some(file) => file,
            None => return Ok(false),
        };
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(self.offset))?;
        debug!(file = %path.display(), offset = self.offset, "reading block file");
        self.reader = Some(reader);
        Ok(true)
    }

    fn current_file_no(&self) -> u32 {
        self.files
            .get(self.cursor)
            .map(|(number, _)| *number)
            .unwrap_or(0)
    }

    fn is_last_file(&self) -> bool {
        self.cursor + 1 >= self.files.len()
    }

    fn advance_file(&mut self) {
        self.cursor += 1;
        self.offset = 0;
        self.reader = None;
    }

    /// Reached the end of the written data in the current file: either the
    /// zero magic or the physical end of file.
    fn end_of_data(&mut self) -> Result<(), ScanError> {
        if !self.is_last_file() {
            self.advance_file();
            return Ok(());
        }
        if !self.tail {
            self.exhausted = true;
            self.reader = None;
            return Ok(());
        }
        // stay on the frame boundary; the node overwrites the zero padding
        // in place when it writes the next block here
        match self.wait_for_data()? {
            Wait::InPlace => {}
            Wait::NextFile => self.advance_file(),
        }
        Ok(())
    }

    /// A frame ended before its declared size.
    fn incomplete_frame(&mut self, frame_start: u64) -> Result<(), ScanError> {
        if self.is_last_file() && self.tail {
            // the node is mid-write; re-read the frame once it lands
            self.offset = frame_start;
            match self.wait_for_data()? {
                Wait::InPlace => {}
                Wait::NextFile => self.advance_file(),
            }
            return Ok(());
        }
        let corruption = Corruption::TruncatedFrame {
            file_no: self.current_file_no(),
            offset: frame_start,
        };
        self.advance_file();
        if self.recover {
            warn!(%corruption, "skipping to the next block file");
            return Ok(());
        }
        Err(corruption.into())
    }

    /// Block until the chain data advances: a frame becomes readable at the
    /// current offset, or a higher-numbered file appears. Checks the cancel
    /// flag on every poll.
    fn wait_for_data(&mut self) -> Result<Wait, ScanError> {
        self.reader = None;
        let current = self.files.get(self.cursor).cloned();
        // with no current file we are waiting for one the node hasn't
        // created yet: the very first, or one past the highest number seen
        let highest_seen = self.files.last().map(|(number, _)| *number);
        loop {
            if self.cancel.load(Ordering::Relaxed) {
                return Err(ScanError::Cancelled);
            }
            thread::sleep(self.poll_interval);
            if self.cancel.load(Ordering::Relaxed) {
                return Err(ScanError::Cancelled);
            }

            if let Some((_, path)) = &current {
                if has_data_at(path, self.offset) {
                    return Ok(Wait::InPlace);
                }
            }

            self.files = block_files(&self.dir)?;
            match &current {
                Some((number, _)) => {
                    // re-locate the file we were on; the list may have grown
                    self.cursor = self
                        .files
                        .iter()
                        .position(|(n, _)| n == number)
                        .ok_or_else(|| {
                            io::Error::new(
                                io::ErrorKind::NotFound,
                                "block file vanished while tailing",
                            )
                        })?;
                    if !self.is_last_file() {
                        debug!("a newer block file appeared");
                        return Ok(Wait::NextFile);
                    }
                }
                None => {
                    let arrived = match highest_seen {
                        Some(last) => {
                            self.files.iter().position(|(number, _)| *number > last)
                        }
                        None => {
                            if self.files.is_empty() {
                                None
                            } else {
                                Some(0)
                            }
                        }
                    };
                    if let Some(index) = arrived {
                        self.cursor = index;
                        self.offset = 0;
                        return Ok(Wait::InPlace);
                    }
                    trace!("waiting for a new block file");
                }
            }
        }
    }
}

/// Whether a nonzero magic is readable at `offset`.
fn has_data_at(path: &Path, offset: u64) -> bool {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(_) => return false,
    };
    if file.seek(SeekFrom::Start(offset)).is_err() {
        return false;
    }
    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_err() {
        return false;
    }
    u32::from_le_bytes(magic) != END_OF_DATA_MAGIC
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;
    use std::sync::atomic::AtomicBool;

    use tempdir::TempDir;

    use blkstream_test::vectors::{BLOCK_1_FRAMED, GENESIS_BLOCK, GENESIS_BLOCK_FRAMED};

    fn write_file(dir: &Path, name: &str, contents: &[u8]) {
        let mut file = File::create(dir.join(name)).unwrap();
        file.write_all(contents).unwrap();
    }

    fn reader(dir: &Path, recover: bool) -> FrameReader {
        FrameReader::open(
            dir,
            None,
            false,
            recover,
            Duration::from_millis(10),
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap()
    }

    #[test]
    fn files_sort_by_numeric_suffix() {
        blkstream_test::init();
        let dir = TempDir::new("blkfile").unwrap();
        write_file(dir.path(), "blk00010.dat", b"");
        write_file(dir.path(), "blk00002.dat", b"");
        write_file(dir.path(), "blk00000.dat", b"");
        write_file(dir.path(), "rev00000.dat", b"");
        write_file(dir.path(), "notes.txt", b"");

        let files = block_files(dir.path()).unwrap();
        let numbers: Vec<u32> = files.iter().map(|(number, _)| *number).collect();
        assert_eq!(numbers, vec![0, 2, 10]);
    }

    #[test]
    fn frames_cross_file_boundaries() {
        blkstream_test::init();
        let dir = TempDir::new("blkfile").unwrap();
        write_file(dir.path(), "blk00000.dat", &GENESIS_BLOCK_FRAMED);
        write_file(dir.path(), "blk00001.dat", &BLOCK_1_FRAMED);

        let mut reader = reader(dir.path(), false);
        assert_eq!(
            reader.next_frame().unwrap().unwrap().len(),
            GENESIS_BLOCK.len()
        );
        assert_eq!(reader.next_frame().unwrap().unwrap().len(), 215);
        assert!(reader.next_frame().unwrap().is_none());
    }

    #[test]
    fn zero_magic_ends_a_file() {
        blkstream_test::init();
        let dir = TempDir::new("blkfile").unwrap();
        let mut data = GENESIS_BLOCK_FRAMED.clone();
        data.extend_from_slice(&[0u8; 64]); // preallocated padding
        write_file(dir.path(), "blk00000.dat", &data);
        write_file(dir.path(), "blk00001.dat", &BLOCK_1_FRAMED);

        let mut reader = reader(dir.path(), false);
        assert!(reader.next_frame().unwrap().is_some());
        assert!(reader.next_frame().unwrap().is_some());
        assert!(reader.next_frame().unwrap().is_none());
    }

    #[test]
    fn bad_magic_is_corruption() {
        blkstream_test::init();
        let dir = TempDir::new("blkfile").unwrap();
        let mut data = GENESIS_BLOCK_FRAMED.clone();
        data.extend_from_slice(&[0xAA, 0xBB, 0xCC, 0xDD]);
        write_file(dir.path(), "blk00000.dat", &data);

        let mut reader = reader(dir.path(), false);
        assert!(reader.next_frame().unwrap().is_some());
        match reader.next_frame() {
            Err(ScanError::Corruption(Corruption::BadMagic { found, .. })) => {
                assert_eq!(found, 0xDDCC_BBAA);
            }
            other => panic!("expected BadMagic, got {:?}", other),
        }
    }

    #[test]
    fn recovery_skips_to_the_next_file() {
        blkstream_test::init();
        let dir = TempDir::new("blkfile").unwrap();
        let mut data = GENESIS_BLOCK_FRAMED.clone();
        data.extend_from_slice(&[0xAA, 0xBB, 0xCC, 0xDD]);
        write_file(dir.path(), "blk00000.dat", &data);
        write_file(dir.path(), "blk00001.dat", &BLOCK_1_FRAMED);

        let mut reader = reader(dir.path(), true);
        assert!(reader.next_frame().unwrap().is_some());
        // corruption in file 0 is skipped, block 1 comes from file 1
        assert_eq!(reader.next_frame().unwrap().unwrap().len(), 215);
        assert!(reader.next_frame().unwrap().is_none());
    }

    #[test]
    fn truncated_final_frame_is_corruption() {
        blkstream_test::init();
        let dir = TempDir::new("blkfile").unwrap();
        let mut data = GENESIS_BLOCK_FRAMED.clone();
        data.extend_from_slice(&BLOCK_1_FRAMED[..50]);
        write_file(dir.path(), "blk00000.dat", &data);

        let mut reader = reader(dir.path(), false);
        assert!(reader.next_frame().unwrap().is_some());
        match reader.next_frame() {
            Err(ScanError::Corruption(Corruption::TruncatedFrame { .. })) => {}
            other => panic!("expected TruncatedFrame, got {:?}", other),
        }
    }

    #[test]
    fn position_resumes_mid_file() {
        blkstream_test::init();
        let dir = TempDir::new("blkfile").unwrap();
        let mut data = GENESIS_BLOCK_FRAMED.clone();
        data.extend_from_slice(&BLOCK_1_FRAMED);
        write_file(dir.path(), "blk00000.dat", &data);

        let mut reader = reader(dir.path(), false);
        assert!(reader.next_frame().unwrap().is_some());
        let position = reader.position();
        assert_eq!(position.file_no, 0);
        assert_eq!(position.offset, GENESIS_BLOCK_FRAMED.len() as u64);

        let mut resumed = FrameReader::open(
            dir.path(),
            Some(position),
            false,
            false,
            Duration::from_millis(10),
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();
        assert_eq!(resumed.next_frame().unwrap().unwrap().len(), 215);
        assert!(resumed.next_frame().unwrap().is_none());
    }
}
