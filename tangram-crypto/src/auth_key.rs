//! The 256-byte authorization key produced by the DH handshake.

use crate::sha1;

/// An authorization key plus its precomputed identifiers.
#[derive(Clone)]
pub struct AuthKey {
    pub(crate) data: [u8; 256],
    pub(crate) aux_hash: [u8; 8],
    pub(crate) key_id: [u8; 8],
}

impl AuthKey {
    /// Construct from raw 256-byte DH output.
    pub fn from_bytes(data: [u8; 256]) -> Self {
        let sha = sha1!(&data);
        let mut aux_hash = [0u8; 8];
        aux_hash.copy_from_slice(&sha[..8]);
        let mut key_id = [0u8; 8];
        key_id.copy_from_slice(&sha[12..20]);
        Self { data, aux_hash, key_id }
    }

    /// The raw 256-byte representation.
    pub fn to_bytes(&self) -> [u8; 256] {
        self.data
    }

    /// The 8-byte key identifier: `sha1(key)[12..20]`.
    pub fn key_id(&self) -> [u8; 8] {
        self.key_id
    }

    /// The key identifier as the little-endian integer that goes on the wire.
    pub fn key_id_u64(&self) -> u64 {
        u64::from_le_bytes(self.key_id)
    }

    /// New-nonce hash for `dh_gen_ok/retry/fail` verification.
    ///
    /// `number` is 1, 2 or 3 depending on the answer variant.
    pub fn calc_new_nonce_hash(&self, new_nonce: &[u8; 32], number: u8) -> [u8; 16] {
        let data: Vec<u8> = new_nonce
            .iter()
            .copied()
            .chain([number])
            .chain(self.aux_hash.iter().copied())
            .collect();
        let sha = sha1!(&data);
        let mut out = [0u8; 16];
        out.copy_from_slice(&sha[4..]);
        out
    }
}

impl std::fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthKey(id={})", self.key_id_u64())
    }
}

impl PartialEq for AuthKey {
    fn eq(&self, other: &Self) -> bool {
        self.key_id == other.key_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_id_is_sha1_tail() {
        let key = AuthKey::from_bytes([7u8; 256]);
        let sha = sha1!(&[7u8; 256]);
        assert_eq!(key.key_id(), &sha[12..20]);
        assert_eq!(key.key_id_u64(), u64::from_le_bytes(sha[12..20].try_into().unwrap()));
    }
}
