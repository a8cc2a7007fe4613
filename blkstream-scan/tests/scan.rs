//! End-to-end scans over chains synthesized through real block files.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use tempdir::TempDir;

use blkstream_chain::{
    amount::{Amount, COIN},
    block::{self, merkle, Header, Height},
    transaction::{LockTime, Transaction},
    transparent::{CoinbaseData, Input, OutPoint, Output, Script},
    CompactInt, WireSerialize,
};
use blkstream_scan::{
    blocks, transactions, BlockChain, BlockFilter, BlockIter, Corruption, ForkResolver,
    ScanConfig, ScanError, TransactionIter,
};
use blkstream_test::vectors::{frame, BLOCK_1, GENESIS_BLOCK};

fn coinbase(salt: u32, value: u64) -> Transaction {
    Transaction::new(
        1,
        vec![Input::Coinbase {
            data: CoinbaseData::new(salt.to_le_bytes().to_vec()),
            sequence: 0xFFFF_FFFF,
        }],
        vec![Output {
            value: Amount::from_sat(value),
            lock_script: Script::new(vec![0x51]),
        }],
        LockTime::unlocked(),
    )
}

fn spend(prev: &Transaction, index: u32, values: &[u64]) -> Transaction {
    Transaction::new(
        1,
        vec![Input::PrevOut {
            outpoint: OutPoint {
                hash: prev.txid(),
                index,
            },
            unlock_script: Script::new(Vec::new()),
            sequence: 0xFFFF_FFFF,
            spent_output: None,
        }],
        values
            .iter()
            .map(|satoshis| Output {
                value: Amount::from_sat(*satoshis),
                lock_script: Script::new(vec![0x52]),
            })
            .collect(),
        LockTime::unlocked(),
    )
}

fn block_payload(parent: block::Hash, salt: u32, txs: &[Transaction]) -> Vec<u8> {
    let header = Header::new(
        1,
        parent,
        merkle::Root([salt as u8; 32]),
        Utc.timestamp(1_300_000_000 + i64::from(salt) * 600, 0),
        0x1d00_ffff,
        salt,
    );
    let mut payload = header.wire_serialize_to_vec().expect("header serializes");
    CompactInt::from(txs.len())
        .wire_serialize(&mut payload)
        .expect("count serializes");
    for tx in txs {
        tx.wire_serialize(&mut payload).expect("tx serializes");
    }
    payload
}

/// A coinbase-only chain of `length` blocks, returned as framed bytes and
/// block hashes.
fn coinbase_chain(length: u32) -> (Vec<u8>, Vec<block::Hash>) {
    let mut data = Vec::new();
    let mut hashes = Vec::new();
    let mut parent = blkstream_chain::parameters::GENESIS_PREVIOUS_BLOCK_HASH;
    for salt in 0..length {
        let payload = block_payload(parent, salt, &[coinbase(salt, 50 * COIN)]);
        parent = Header::read_from(&payload).expect("payload parses").hash();
        hashes.push(parent);
        data.extend_from_slice(&frame(&payload));
    }
    (data, hashes)
}

fn write_file(path: &Path, contents: &[u8]) {
    let mut file = File::create(path).expect("test file creates");
    file.write_all(contents).expect("test file writes");
}

fn config_for(dir: &TempDir) -> ScanConfig {
    ScanConfig::in_dir(dir.path())
}

#[test]
fn blocks_arrive_in_height_order() {
    blkstream_test::init();
    let dir = TempDir::new("scan").unwrap();
    let (data, hashes) = coinbase_chain(10);
    write_file(&dir.path().join("blk00000.dat"), &data);

    let scanned: Vec<_> = blocks(config_for(&dir))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(scanned.len(), 10);
    for (expected, block) in scanned.iter().enumerate() {
        assert_eq!(block.height, Some(Height(expected as u32)));
        assert_eq!(block.hash(), hashes[expected]);
        if expected > 0 {
            assert_eq!(
                block.header.previous_block_hash,
                scanned[expected - 1].hash()
            );
        }
    }
}

#[test]
fn height_and_time_filters_restrict_the_stream() {
    blkstream_test::init();
    let dir = TempDir::new("scan").unwrap();
    let (data, _) = coinbase_chain(10);
    write_file(&dir.path().join("blk00000.dat"), &data);

    let mut config = config_for(&dir);
    config.filter = BlockFilter::height_range(2, 5);
    let heights: Vec<_> = blocks(config)
        .unwrap()
        .map(|block| block.unwrap().height.unwrap().0)
        .collect();
    assert_eq!(heights, vec![2, 3, 4]);

    // blocks are stamped 600 seconds apart from 1_300_000_000
    let mut config = config_for(&dir);
    config.filter = BlockFilter {
        start_time: Some(Utc.timestamp(1_300_000_000 + 3 * 600, 0)),
        stop_time: Some(Utc.timestamp(1_300_000_000 + 6 * 600, 0)),
        ..BlockFilter::default()
    };
    let heights: Vec<_> = blocks(config)
        .unwrap()
        .map(|block| block.unwrap().height.unwrap().0)
        .collect();
    assert_eq!(heights, vec![3, 4, 5]);
}

#[test]
fn the_mainnet_prefix_scans() {
    blkstream_test::init();
    let dir = TempDir::new("scan").unwrap();
    let mut data = frame(&GENESIS_BLOCK);
    data.extend_from_slice(&frame(&BLOCK_1));
    write_file(&dir.path().join("blk00000.dat"), &data);

    let scanned: Vec<_> = blocks(config_for(&dir))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(scanned.len(), 2);
    assert_eq!(
        scanned[0].hash().to_string(),
        "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
    );
    assert_eq!(scanned[0].height, Some(Height(0)));
    assert_eq!(scanned[1].height, Some(Height(1)));

    let txids: Vec<String> = transactions(config_for(&dir), false)
        .unwrap()
        .map(|tx| tx.unwrap().txid().to_string())
        .collect();
    assert_eq!(
        txids,
        vec![
            "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b".to_string(),
            "0e3e2357e806b6cdb1f70b54c3a3a17b6714ee1f0e68bebb44a74b1efd512098".to_string(),
        ]
    );
}

#[test]
fn tracking_resolves_spends_across_and_within_blocks() {
    blkstream_test::init();
    let dir = TempDir::new("scan").unwrap();

    let coinbase_a = coinbase(0, 50 * COIN);
    let payload_0 = block_payload(
        blkstream_chain::parameters::GENESIS_PREVIOUS_BLOCK_HASH,
        0,
        &[coinbase_a.clone()],
    );
    let hash_0 = Header::read_from(&payload_0).unwrap().hash();

    let coinbase_b = coinbase(1, 50 * COIN);
    // spends the height-0 coinbase, paying a 1 coin fee
    let spend_1 = spend(&coinbase_a, 0, &[30 * COIN, 19 * COIN]);
    // spends an output created earlier in this same block
    let spend_2 = spend(&spend_1, 1, &[19 * COIN]);
    let payload_1 = block_payload(
        hash_0,
        1,
        &[coinbase_b.clone(), spend_1.clone(), spend_2.clone()],
    );

    let mut data = frame(&payload_0);
    data.extend_from_slice(&frame(&payload_1));
    write_file(&dir.path().join("blk00000.dat"), &data);

    let mut config = config_for(&dir);
    config.track_scripts = true;
    let mut stream = transactions(config, true).unwrap();
    let mut scanned = Vec::new();
    while let Some(item) = stream.next() {
        scanned.push(item.expect("clean chain tracks without errors"));
    }

    assert_eq!(scanned.len(), 4);

    let tracked_1 = &scanned[2];
    assert_eq!(tracked_1.txid(), spend_1.txid());
    let info = tracked_1.inputs[0]
        .spent_output()
        .expect("tracker attached spending info");
    assert_eq!(info.value.as_sat(), 50 * COIN);
    assert_eq!(info.height, Some(Height(0)));
    assert_eq!(info.lock_script, Some(Script::new(vec![0x51])));
    assert_eq!(tracked_1.fee(), Some(Amount::from_sat(COIN)));

    let tracked_2 = &scanned[3];
    assert_eq!(tracked_2.txid(), spend_2.txid());
    let info = tracked_2.inputs[0]
        .spent_output()
        .expect("intra-block spends resolve");
    assert_eq!(info.value.as_sat(), 19 * COIN);
    assert_eq!(info.height, Some(Height(1)));
    assert_eq!(tracked_2.fee(), Some(Amount::ZERO));

    // conservation: inputs cover outputs for every tracked non-coinbase tx
    for tx in &scanned {
        if !tx.is_coinbase() {
            assert!(tx.fee().is_some());
        }
    }

    // liveness: fully spent transactions are gone, everything else is
    // present exactly once
    let tracker = stream.tracker().expect("tracking was on");
    assert!(!tracker.contains(&coinbase_a.txid()));
    assert!(tracker.contains(&coinbase_b.txid()));
    assert!(tracker.contains(&spend_1.txid()));
    assert!(tracker.contains(&spend_2.txid()));
    assert_eq!(tracker.len(), 3);
}

#[test]
fn double_spends_surface_and_the_stream_continues() {
    blkstream_test::init();
    let dir = TempDir::new("scan").unwrap();

    let coinbase_a = coinbase(0, 50 * COIN);
    let payload_0 = block_payload(
        blkstream_chain::parameters::GENESIS_PREVIOUS_BLOCK_HASH,
        0,
        &[coinbase_a.clone()],
    );
    let hash_0 = Header::read_from(&payload_0).unwrap().hash();

    let spend_1 = spend(&coinbase_a, 0, &[50 * COIN]);
    let spend_again = spend(&coinbase_a, 0, &[49 * COIN]);
    let payload_1 = block_payload(
        hash_0,
        1,
        &[coinbase(1, 50 * COIN), spend_1, spend_again.clone()],
    );

    let mut data = frame(&payload_0);
    data.extend_from_slice(&frame(&payload_1));
    write_file(&dir.path().join("blk00000.dat"), &data);

    let mut not_found = 0;
    let mut unresolved = Vec::new();
    for item in transactions(config_for(&dir), true).unwrap() {
        match item {
            Ok(tx) => {
                if !tx.is_coinbase() && tx.inputs[0].spent_output().is_none() {
                    unresolved.push(tx.txid());
                }
            }
            Err(ScanError::NotFound { index, .. }) => {
                assert_eq!(index, 0);
                not_found += 1;
            }
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }
    assert_eq!(not_found, 1);
    assert_eq!(unresolved, vec![spend_again.txid()]);
}

#[test]
fn the_chain_index_answers_by_height_and_hash() {
    blkstream_test::init();
    let dir = TempDir::new("scan").unwrap();
    let (data, hashes) = coinbase_chain(6);
    write_file(&dir.path().join("blk00000.dat"), &data);

    let chain = BlockChain::load(blocks(config_for(&dir)).unwrap()).unwrap();
    assert_eq!(chain.len(), 6);
    assert_eq!(chain.genesis().unwrap().hash(), hashes[0]);
    assert_eq!(chain.tip().unwrap().hash(), hashes[5]);
    assert_eq!(chain.by_height(Height(3)).unwrap().hash(), hashes[3]);
    assert_eq!(
        chain.by_hash(&hashes[4]).unwrap().height,
        Some(Height(4))
    );
    assert_eq!(chain.height_of(&hashes[2]), Some(Height(2)));
    assert!(chain.by_hash(&block::Hash([0x77; 32])).is_none());
}

#[test]
fn tailing_follows_growth_until_cancelled() {
    blkstream_test::init();
    let dir = TempDir::new("scan").unwrap();
    let (data, _) = coinbase_chain(2);
    let boundary = data.len() / 2;
    let file_path = dir.path().join("blk00000.dat");
    write_file(&file_path, &data[..boundary]);

    let mut config = config_for(&dir);
    config.tail = true;
    config.safety_margin = 0;
    config.poll_interval = Duration::from_millis(20);

    let mut stream = blocks(config).unwrap();
    let cancel = stream.cancel_flag();

    let writer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        let mut file = OpenOptions::new()
            .append(true)
            .open(&file_path)
            .expect("block file reopens");
        file.write_all(&data[boundary..]).expect("appends");
    });

    let first = stream.next().unwrap().unwrap();
    assert_eq!(first.height, Some(Height(0)));
    let second = stream.next().unwrap().unwrap();
    assert_eq!(second.height, Some(Height(1)));
    writer.join().unwrap();

    cancel.store(true, Ordering::Relaxed);
    match stream.next() {
        Some(Err(ScanError::Cancelled)) => {}
        other => panic!("expected Cancelled, got {:?}", other.map(|r| r.map(|b| b.hash()))),
    }
    assert!(stream.next().is_none());
}

#[test]
fn a_snapshot_resumes_with_the_same_suffix() {
    blkstream_test::init();
    let dir = TempDir::new("scan").unwrap();
    let (data, _) = coinbase_chain(12);
    write_file(&dir.path().join("blk00000.dat"), &data);

    let mut config = config_for(&dir);
    config.safety_margin = 2;

    let uninterrupted: Vec<_> = blocks(config.clone())
        .unwrap()
        .map(|block| block.unwrap().hash())
        .collect();
    assert_eq!(uninterrupted.len(), 12);

    let mut first_leg = blocks(config.clone()).unwrap();
    let mut scanned: Vec<_> = (&mut first_leg)
        .take(5)
        .map(|block| block.unwrap().hash())
        .collect();

    // snapshot the reader position and resolver state, then drop the scan
    let position = first_leg.position();
    let resolver_bytes =
        bincode::serialize(first_leg.resolver()).expect("resolver serializes");
    drop(first_leg);

    let resolver: ForkResolver =
        bincode::deserialize(&resolver_bytes).expect("resolver deserializes");
    let mut config = config;
    config.start = Some(position);
    let second_leg = BlockIter::resume(config, resolver).unwrap();
    scanned.extend(second_leg.map(|block| block.unwrap().hash()));

    assert_eq!(scanned, uninterrupted);
}

#[test]
fn a_tracked_snapshot_resumes_with_the_same_tracker_state() {
    blkstream_test::init();
    let dir = TempDir::new("scan").unwrap();
    let (data, _) = coinbase_chain(8);
    write_file(&dir.path().join("blk00000.dat"), &data);

    let mut config = config_for(&dir);
    config.safety_margin = 1;

    let mut first_leg = transactions(config.clone(), true).unwrap();
    for _ in 0..3 {
        first_leg.next().unwrap().unwrap();
    }

    let position = first_leg.position();
    let resolver_bytes = bincode::serialize(first_leg.resolver()).unwrap();
    let tracker_bytes = bincode::serialize(first_leg.tracker().unwrap()).unwrap();
    drop(first_leg);

    let mut config = config;
    config.start = Some(position);
    let second_leg = TransactionIter::resume(
        config,
        bincode::deserialize(&resolver_bytes).unwrap(),
        Some(bincode::deserialize(&tracker_bytes).unwrap()),
    )
    .unwrap();
    let rest: Vec<_> = second_leg.map(|tx| tx.unwrap().txid()).collect();
    assert_eq!(rest.len(), 5);

    // all eight coinbases stay unspent in this chain
    let full: Vec<_> = transactions(config_for(&dir), true)
        .unwrap()
        .map(|tx| tx.unwrap().txid())
        .collect();
    assert_eq!(&full[3..], &rest[..]);
}

#[test]
fn a_chain_without_genesis_is_corrupt() {
    blkstream_test::init();
    let dir = TempDir::new("scan").unwrap();
    write_file(&dir.path().join("blk00000.dat"), &frame(&BLOCK_1));

    match blocks(config_for(&dir)).unwrap().next() {
        Some(Err(ScanError::Corruption(Corruption::MissingGenesis(_)))) => {}
        other => panic!(
            "expected MissingGenesis, got {:?}",
            other.map(|r| r.map(|b| b.hash()))
        ),
    }
}
