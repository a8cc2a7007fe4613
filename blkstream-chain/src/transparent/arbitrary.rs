use proptest::{arbitrary::any, collection::vec, prelude::*};

use crate::{amount::Amount, transaction};

use super::{CoinbaseData, Input, OutPoint, Output, Script};

impl Arbitrary for Script {
    type Parameters = ();

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        vec(any::<u8>(), 0..100).prop_map(Script).boxed()
    }

    type Strategy = BoxedStrategy<Self>;
}

impl Arbitrary for OutPoint {
    type Parameters = ();

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        (any::<[u8; 32]>(), any::<u32>())
            .prop_map(|(mut hash, index)| {
                // a real previous-output reference never carries the
                // all-zeros hash
                hash[0] |= 1;
                OutPoint {
                    hash: transaction::Hash(hash),
                    index,
                }
            })
            .boxed()
    }

    type Strategy = BoxedStrategy<Self>;
}

impl Arbitrary for Output {
    type Parameters = ();

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        // values stay below the 21 million coin supply cap
        (0u64..=2_100_000_000_000_000, any::<Script>())
            .prop_map(|(satoshis, lock_script)| Output {
                value: Amount::from_sat(satoshis),
                lock_script,
            })
            .boxed()
    }

    type Strategy = BoxedStrategy<Self>;
}

impl Input {
    /// Strategy for a spending (non-coinbase) input.
    pub fn prevout_strategy() -> BoxedStrategy<Self> {
        (any::<OutPoint>(), any::<Script>(), any::<u32>())
            .prop_map(|(outpoint, unlock_script, sequence)| Input::PrevOut {
                outpoint,
                unlock_script,
                sequence,
                spent_output: None,
            })
            .boxed()
    }

    /// Strategy for a coinbase input.
    pub fn coinbase_strategy() -> BoxedStrategy<Self> {
        (vec(any::<u8>(), 0..100), any::<u32>())
            .prop_map(|(data, sequence)| Input::Coinbase {
                data: CoinbaseData(data),
                sequence,
            })
            .boxed()
    }
}

impl Arbitrary for Input {
    type Parameters = ();

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        Input::prevout_strategy()
    }

    type Strategy = BoxedStrategy<Self>;
}
