use bytes::Bytes;
use chrono::{TimeZone, Utc};
use proptest::{
    arbitrary::{any, Arbitrary},
    collection::vec,
    prelude::*,
};

use crate::{compactint::CompactInt, transaction::Transaction, WireSerialize};

use super::*;

impl Arbitrary for Header {
    type Parameters = ();

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        (
            // version is interpreted as i32 by some consumers, stay positive
            (1u32..(i32::MAX as u32)),
            any::<Hash>(),
            any::<merkle::Root>(),
            // time is a u32 on the wire, but rust timestamps are i64
            (0i64..(u32::MAX as i64)),
            any::<u32>(),
            any::<u32>(),
        )
            .prop_map(
                |(version, previous_block_hash, merkle_root, timestamp, difficulty_bits, nonce)| {
                    Header::new(
                        version,
                        previous_block_hash,
                        merkle_root,
                        Utc.timestamp(timestamp, 0),
                        difficulty_bits,
                        nonce,
                    )
                },
            )
            .boxed()
    }

    type Strategy = BoxedStrategy<Self>;
}

impl Arbitrary for Block {
    type Parameters = ();

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        let transactions = (
            Transaction::coinbase_strategy(),
            vec(any::<Transaction>(), 0..3),
        )
            .prop_map(|(coinbase, mut rest)| {
                rest.insert(0, coinbase);
                rest
            });

        (any::<Header>(), transactions)
            .prop_map(|(header, transactions)| {
                let mut payload = header
                    .wire_serialize_to_vec()
                    .expect("writing to a vec never fails");
                CompactInt::from(transactions.len())
                    .wire_serialize(&mut payload)
                    .expect("writing to a vec never fails");
                for transaction in &transactions {
                    transaction
                        .wire_serialize(&mut payload)
                        .expect("writing to a vec never fails");
                }
                Block::parse(Bytes::from(payload)).expect("serialized blocks parse")
            })
            .boxed()
    }

    type Strategy = BoxedStrategy<Self>;
}
