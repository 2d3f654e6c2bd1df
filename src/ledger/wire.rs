//! Binary transaction packing
//!
//! The chain signs and broadcasts the packed little-endian form of a
//! transaction. Only the envelope is packed locally; action payloads
//! arrive pre-serialized (raw `binArgs` or the node's `abi_json_to_bin`).

use sha2::{Digest, Sha256};

/// TAPOS header fields binding a transaction to a recent block.
#[derive(Debug, Clone)]
pub struct TransactionHeader {
    /// Expiration as seconds since the Unix epoch.
    pub expiration: u32,
    /// Low 16 bits of the reference block number.
    pub ref_block_num: u16,
    /// Checksum prefix of the reference block id.
    pub ref_block_prefix: u32,
}

impl TransactionHeader {
    pub fn new(expiration: u32, ref_block_num: u32, ref_block_prefix: u32) -> Self {
        TransactionHeader {
            expiration,
            ref_block_num: (ref_block_num & 0xffff) as u16,
            ref_block_prefix,
        }
    }
}

/// An action with names resolved to their u64 form and data fully
/// serialized, ready for packing.
#[derive(Debug, Clone)]
pub struct BoundAction {
    pub account: u64,
    pub name: u64,
    /// `(actor, permission)` pairs.
    pub authorization: Vec<(u64, u64)>,
    pub data: Vec<u8>,
}

struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    fn new() -> Self {
        ByteWriter { buf: Vec::new() }
    }

    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn varuint32(&mut self, mut v: u32) {
        loop {
            let mut byte = (v & 0x7f) as u8;
            v >>= 7;
            if v != 0 {
                byte |= 0x80;
            }
            self.buf.push(byte);
            if v == 0 {
                break;
            }
        }
    }

    fn bytes(&mut self, data: &[u8]) {
        self.varuint32(data.len() as u32);
        self.buf.extend_from_slice(data);
    }
}

/// Pack a transaction envelope: header, resource limits, context-free
/// actions (always empty here), actions and extensions.
pub fn pack_transaction(header: &TransactionHeader, actions: &[BoundAction]) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.u32(header.expiration);
    w.u16(header.ref_block_num);
    w.u32(header.ref_block_prefix);
    w.varuint32(0); // max_net_usage_words
    w.u8(0); // max_cpu_usage_ms
    w.varuint32(0); // delay_sec
    w.varuint32(0); // context_free_actions
    w.varuint32(actions.len() as u32);
    for action in actions {
        w.u64(action.account);
        w.u64(action.name);
        w.varuint32(action.authorization.len() as u32);
        for &(actor, permission) in &action.authorization {
            w.u64(actor);
            w.u64(permission);
        }
        w.bytes(&action.data);
    }
    w.varuint32(0); // transaction_extensions
    w.buf
}

/// Digest that gets signed: sha256(chain_id || packed_trx || 32 zero bytes
/// standing in for the context-free data hash).
pub fn signing_digest(chain_id: &[u8; 32], packed: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(chain_id);
    hasher.update(packed);
    hasher.update([0u8; 32]);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::name::name_to_u64;

    #[test]
    fn test_varuint32_encoding() {
        let cases: [(u32, &[u8]); 5] = [
            (0, &[0x00]),
            (1, &[0x01]),
            (127, &[0x7f]),
            (128, &[0x80, 0x01]),
            (300, &[0xac, 0x02]),
        ];
        for (value, expected) in cases {
            let mut w = ByteWriter::new();
            w.varuint32(value);
            assert_eq!(w.buf, expected, "varuint32({})", value);
        }
    }

    #[test]
    fn test_ref_block_num_truncation() {
        let header = TransactionHeader::new(0, 0x0012_3456, 7);
        assert_eq!(header.ref_block_num, 0x3456);
    }

    #[test]
    fn test_empty_transaction_layout() {
        let header = TransactionHeader::new(0x01020304, 0x0506, 0x0708090a);
        let packed = pack_transaction(&header, &[]);
        assert_eq!(
            packed,
            vec![
                0x04, 0x03, 0x02, 0x01, // expiration LE
                0x06, 0x05, // ref_block_num LE
                0x0a, 0x09, 0x08, 0x07, // ref_block_prefix LE
                0x00, // max_net_usage_words
                0x00, // max_cpu_usage_ms
                0x00, // delay_sec
                0x00, // context_free_actions
                0x00, // actions
                0x00, // transaction_extensions
            ]
        );
    }

    #[test]
    fn test_single_action_layout() {
        let header = TransactionHeader::new(0, 0, 0);
        let action = BoundAction {
            account: name_to_u64("eosio.token").unwrap(),
            name: name_to_u64("transfer").unwrap(),
            authorization: vec![(
                name_to_u64("alice").unwrap(),
                name_to_u64("active").unwrap(),
            )],
            data: vec![0xde, 0xad, 0xbe, 0xef],
        };
        let packed = pack_transaction(&header, &[action.clone()]);

        // header (10) + limits (3) + cfa count (1) + action count (1)
        let mut offset = 15;
        assert_eq!(packed[14], 1, "one action");
        assert_eq!(
            packed[offset..offset + 8],
            action.account.to_le_bytes(),
            "account name"
        );
        offset += 8;
        assert_eq!(packed[offset..offset + 8], action.name.to_le_bytes());
        offset += 8;
        assert_eq!(packed[offset], 1, "one authorization");
        offset += 1;
        assert_eq!(packed[offset..offset + 8], action.authorization[0].0.to_le_bytes());
        offset += 8;
        assert_eq!(packed[offset..offset + 8], action.authorization[0].1.to_le_bytes());
        offset += 8;
        assert_eq!(packed[offset], 4, "data length");
        offset += 1;
        assert_eq!(packed[offset..offset + 4], [0xde, 0xad, 0xbe, 0xef]);
        offset += 4;
        assert_eq!(packed[offset], 0, "no extensions");
        assert_eq!(packed.len(), offset + 1);
    }

    #[test]
    fn test_signing_digest_is_deterministic() {
        let chain_id = [0x11u8; 32];
        let packed = vec![1, 2, 3];
        let a = signing_digest(&chain_id, &packed);
        let b = signing_digest(&chain_id, &packed);
        assert_eq!(a, b);

        let other = signing_digest(&[0x22u8; 32], &packed);
        assert_ne!(a, other);
    }
}
