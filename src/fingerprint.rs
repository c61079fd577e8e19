use sha2::{Digest, Sha256};

/// Content fingerprint of raw class bytes: the leading eight bytes of their
/// SHA-256 digest.
pub fn fingerprint(bytes: &[u8]) -> i64 {
    let digest = Sha256::digest(bytes);
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(head)
}

pub fn fingerprint_hex(fp: i64) -> String {
    hex::encode(fp.to_be_bytes())
}
