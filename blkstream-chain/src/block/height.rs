use serde::{Deserialize, Serialize};

/// The height of a block: its distance from the genesis block along the
/// longest chain. Genesis is height 0.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub struct Height(pub u32);

impl Height {
    /// The height of the next block in the chain.
    pub fn next(self) -> Height {
        Height(self.0 + 1)
    }
}

impl std::fmt::Display for Height {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
