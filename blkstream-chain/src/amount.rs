//! Satoshi amounts.

use std::fmt;
use std::iter::Sum;

use blkstream_wire_derive::{BlkDeserialize, BlkSerialize};
use serde::{Deserialize, Serialize};

use crate::{DecodeError, WireDeserialize, WireSerialize};

/// The number of satoshis in one coin.
pub const COIN: u64 = 100_000_000;

/// A non-negative quantity of satoshis.
///
/// On the wire this is a little-endian u64. The all-ones value is never a
/// legal amount; the UTXO tracker uses it as a spent marker.
#[derive(
    Clone,
    Copy,
    Default,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    BlkSerialize,
    BlkDeserialize,
)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_sat(satoshis: u64) -> Amount {
        Amount(satoshis)
    }

    pub const fn as_sat(self) -> u64 {
        self.0
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        Amount(iter.map(|amount| amount.0).sum())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:08}", self.0 / COIN, self.0 % COIN)
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Amount").field(&self.0).finish()
    }
}
