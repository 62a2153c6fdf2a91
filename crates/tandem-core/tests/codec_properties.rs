//! Property tests for the RLP codec and the transaction field model
//!
//! These check canonical encoding over arbitrary inputs: every value has
//! exactly one encoding, decoding inverts encoding, and any field change
//! moves the signing hash.

use proptest::prelude::*;
use tandem_core::rlp::{self, RlpError, RlpItem};
use tandem_core::{
    AccessListEntry, Address, EcdsaSignature, Scalar, SignedTransaction, TxError,
    UnsignedTransaction,
};

fn scalar() -> impl Strategy<Value = Scalar> {
    prop::collection::vec(any::<u8>(), 0..40).prop_map(|bytes| Scalar::from_bytes_be(&bytes))
}

fn u256() -> impl Strategy<Value = Scalar> {
    prop::array::uniform32(any::<u8>()).prop_map(|bytes| Scalar::from_bytes_be(&bytes))
}

fn address() -> impl Strategy<Value = Address> {
    prop::array::uniform20(any::<u8>()).prop_map(Address::new)
}

fn access_list() -> impl Strategy<Value = Vec<AccessListEntry>> {
    prop::collection::vec(
        (address(), prop::collection::vec(prop::array::uniform32(any::<u8>()), 0..4))
            .prop_map(|(address, keys)| AccessListEntry::new(address, keys)),
        0..4,
    )
}

prop_compose! {
    fn unsigned_tx()(
        chain_id in scalar(),
        nonce in any::<u64>(),
        max_priority_fee_per_gas in scalar(),
        max_fee_per_gas in scalar(),
        gas_limit in any::<u64>(),
        to in prop::option::of(address()),
        value in scalar(),
        data in prop::collection::vec(any::<u8>(), 0..300),
        access_list in access_list(),
    ) -> UnsignedTransaction {
        UnsignedTransaction {
            chain_id,
            nonce,
            max_priority_fee_per_gas,
            max_fee_per_gas,
            gas_limit,
            to,
            value,
            data,
            access_list,
        }
    }
}

mod rlp_properties {
    use super::*;

    proptest! {
        #[test]
        fn bytes_roundtrip(data in prop::collection::vec(any::<u8>(), 0..2000)) {
            let encoded = rlp::encode_bytes(&data);
            let decoded = rlp::decode_exact(&encoded).unwrap();
            prop_assert_eq!(decoded, RlpItem::String(&data[..]));
        }

        #[test]
        fn scalar_roundtrip_is_minimal(value in scalar()) {
            let encoded = rlp::encode_scalar(&value);
            let payload = rlp::scalar_to_bytes(&value);
            prop_assert!(payload.first() != Some(&0));

            let decoded = rlp::decode_exact(&encoded).unwrap().as_scalar().unwrap();
            prop_assert_eq!(decoded, value);
        }

        #[test]
        fn leading_zero_scalar_rejected(value in 1u64..) {
            let mut padded = vec![0u8];
            padded.extend(rlp::scalar_to_bytes(&Scalar::from(value)));
            let encoded = rlp::encode_bytes(&padded);

            let item = rlp::decode_exact(&encoded).unwrap();
            prop_assert_eq!(item.as_scalar(), Err(RlpError::LeadingZero));
            prop_assert_eq!(item.as_u64(), Err(RlpError::LeadingZero));
        }

        #[test]
        fn single_byte_is_its_own_encoding(byte in 0u8..0x80) {
            prop_assert_eq!(rlp::encode_bytes(&[byte]), vec![byte]);
        }

        #[test]
        fn long_form_for_short_payload_rejected(data in prop::collection::vec(any::<u8>(), 0..56)) {
            let mut forged = vec![0xb8, data.len() as u8];
            forged.extend_from_slice(&data);
            prop_assert_eq!(rlp::decode_exact(&forged), Err(RlpError::NonCanonicalLength));
        }

        #[test]
        fn truncation_is_detected(data in prop::collection::vec(any::<u8>(), 2..200)) {
            let encoded = rlp::encode_bytes(&data);
            let cut = &encoded[..encoded.len() - 1];
            prop_assert_eq!(rlp::decode_exact(cut), Err(RlpError::UnexpectedEof));
        }

        #[test]
        fn nested_list_roundtrip(items in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..80), 0..12)) {
            let encoded_items: Vec<Vec<u8>> = items.iter().map(|i| rlp::encode_bytes(i)).collect();
            let inner = rlp::encode_list(&encoded_items);
            let outer = rlp::encode_list(&[inner.clone(), inner]);

            let decoded = rlp::decode_exact(&outer).unwrap();
            let halves = decoded.as_list().unwrap();
            prop_assert_eq!(halves.len(), 2);
            for half in halves {
                let strings: Vec<&[u8]> = half.as_list().unwrap().iter().map(|s| s.as_bytes().unwrap()).collect();
                let expected: Vec<&[u8]> = items.iter().map(|i| i.as_slice()).collect();
                prop_assert_eq!(strings, expected);
            }
        }
    }
}

mod transaction_properties {
    use super::*;

    proptest! {
        #[test]
        fn unsigned_roundtrip(tx in unsigned_tx()) {
            let decoded = UnsignedTransaction::decode_unsigned(&tx.signing_payload()).unwrap();
            prop_assert_eq!(decoded, tx);
        }

        #[test]
        fn signed_roundtrip(
            tx in unsigned_tx(),
            y_parity in 0u8..2,
            r in u256(),
            s in u256(),
            pq_signature in prop::collection::vec(any::<u8>(), 0..128),
            pq_public_key in prop::collection::vec(any::<u8>(), 0..64),
        ) {
            let signed = SignedTransaction::from_parts(
                tx.clone(),
                EcdsaSignature::new(y_parity, r, s),
                pq_signature,
                pq_public_key,
            ).unwrap();

            let decoded = SignedTransaction::decode(&signed.encode()).unwrap();
            prop_assert_eq!(decoded.signing_hash(), tx.hash());
            prop_assert_eq!(decoded, signed);
        }

        #[test]
        fn nonce_change_moves_hash(tx in unsigned_tx()) {
            let mut other = tx.clone();
            other.nonce = tx.nonce.wrapping_add(1);
            prop_assert_ne!(other.hash(), tx.hash());
        }

        #[test]
        fn data_change_moves_hash(tx in unsigned_tx(), extra in any::<u8>()) {
            let mut other = tx.clone();
            other.data.push(extra);
            prop_assert_ne!(other.hash(), tx.hash());
        }

        #[test]
        fn foreign_type_tag_rejected(tx in unsigned_tx(), tag in any::<u8>().prop_filter("not hybrid", |t| *t != 0x05)) {
            let mut payload = tx.signing_payload();
            payload[0] = tag;
            prop_assert_eq!(
                UnsignedTransaction::decode_unsigned(&payload),
                Err(TxError::UnsupportedTransactionType(tag))
            );
        }
    }
}
