//! Key derivation for secret-chat message encryption.
//!
//! Secret chats frame their plaintext with a 16-byte `msg_key` taken from
//! `sha1(plaintext)[4..20]`, then derive the AES-IGE key and IV from the
//! shared 256-byte chat key and that `msg_key` through four SHA-1 runs.

use crate::sha1;

/// `msg_key` for a secret-chat plaintext: `sha1(plain)[4..20]`.
pub fn secret_msg_key(plain: &[u8]) -> [u8; 16] {
    let sha = sha1!(plain);
    let mut out = [0u8; 16];
    out.copy_from_slice(&sha[4..20]);
    out
}

/// Derive the AES key and IV for one secret-chat message.
pub fn secret_key_iv(key: &[u8; 256], msg_key: &[u8; 16]) -> ([u8; 32], [u8; 32]) {
    let a = sha1!(msg_key, &key[0..32]);
    let b = sha1!(&key[32..48], msg_key, &key[48..64]);
    let c = sha1!(&key[64..96], msg_key);
    let d = sha1!(msg_key, &key[96..128]);

    let mut aes_key = [0u8; 32];
    aes_key[0..8].copy_from_slice(&a[0..8]);
    aes_key[8..20].copy_from_slice(&b[8..20]);
    aes_key[20..32].copy_from_slice(&c[4..16]);

    let mut aes_iv = [0u8; 32];
    aes_iv[0..12].copy_from_slice(&a[8..20]);
    aes_iv[12..20].copy_from_slice(&b[0..8]);
    aes_iv[20..24].copy_from_slice(&c[16..20]);
    aes_iv[24..32].copy_from_slice(&d[0..8]);

    (aes_key, aes_iv)
}

/// Fingerprint of a 256-byte shared secret: low 64 bits of `sha1(key)[12..20]`.
pub fn key_fingerprint(key: &[u8; 256]) -> i64 {
    let sha = sha1!(key);
    i64::from_le_bytes(sha[12..20].try_into().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kdf_is_deterministic_and_key_dependent() {
        let key_a = [1u8; 256];
        let key_b = [2u8; 256];
        let msg_key = secret_msg_key(b"plaintext");
        let (k1, iv1) = secret_key_iv(&key_a, &msg_key);
        let (k2, iv2) = secret_key_iv(&key_a, &msg_key);
        let (k3, _) = secret_key_iv(&key_b, &msg_key);
        assert_eq!((k1, iv1), (k2, iv2));
        assert_ne!(k1, k3);
    }

    #[test]
    fn fingerprint_matches_sha1_tail() {
        let key = [9u8; 256];
        let sha = sha1!(&key);
        assert_eq!(
            key_fingerprint(&key),
            i64::from_le_bytes(sha[12..20].try_into().unwrap())
        );
    }
}
