use chrono::{TimeZone, Utc};
use proptest::{arbitrary::any, collection::vec, prelude::*};

use crate::{block, cached::Cached, transparent};

use super::{LockTime, Transaction};

impl Arbitrary for LockTime {
    type Parameters = ();

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        prop_oneof![
            (0..LockTime::MIN_TIMESTAMP)
                .prop_map(|n| LockTime::Height(block::Height(n))),
            (LockTime::MIN_TIMESTAMP..=std::u32::MAX)
                .prop_map(|n| LockTime::Time(Utc.timestamp(n as i64, 0)))
        ]
        .boxed()
    }

    type Strategy = BoxedStrategy<Self>;
}

impl Transaction {
    /// Strategy for a coinbase transaction.
    pub fn coinbase_strategy() -> BoxedStrategy<Self> {
        (
            transparent::Input::coinbase_strategy(),
            vec(any::<transparent::Output>(), 1..4),
            any::<LockTime>(),
        )
            .prop_map(|(input, outputs, locktime)| Transaction {
                version: 1,
                inputs: vec![input],
                outputs,
                locktime,
                txid: Cached::new(),
                size: Cached::new(),
            })
            .boxed()
    }
}

impl Arbitrary for Transaction {
    type Parameters = ();

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        (
            any::<i32>(),
            vec(transparent::Input::prevout_strategy(), 1..4),
            vec(any::<transparent::Output>(), 0..4),
            any::<LockTime>(),
        )
            .prop_map(|(version, inputs, outputs, locktime)| Transaction {
                version,
                inputs,
                outputs,
                locktime,
                txid: Cached::new(),
                size: Cached::new(),
            })
            .boxed()
    }

    type Strategy = BoxedStrategy<Self>;
}
