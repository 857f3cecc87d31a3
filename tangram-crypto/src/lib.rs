//! Cryptographic primitives for the tangram MTProto client.
//!
//! Provides:
//! - AES-256-IGE encryption/decryption
//! - SHA-1 / SHA-256 / MD5 hash macros
//! - Pollard-rho PQ factorization
//! - RSA encryption with SHA-1 prefix padding, key fingerprints, keyring
//! - `AuthKey` — the 256-byte DH output with precomputed identifiers
//! - Envelope encryption (the 4-SHA-1 key schedule over `auth_key`/`msg_key`)
//! - Secret-chat key derivation
//! - DH nonce → key derivation for the handshake inner payloads

#![deny(unsafe_code)]

pub mod aes;
mod auth_key;
mod deque_buffer;
mod factorize;
pub mod prime;
pub mod rsa;
pub mod secret;
mod sha;

pub use auth_key::AuthKey;
pub use deque_buffer::DequeBuffer;
pub use factorize::{factorize, FactorizeError};

/// Hash crates re-exported for the `sha1!` / `sha256!` / `md5!` expansions.
#[doc(hidden)]
pub mod digest {
    pub use md5;
    pub use sha1;
    pub use sha2;
}

// ─── Envelope encrypt / decrypt ──────────────────────────────────────────────

/// Errors from [`decrypt_data`].
#[derive(Clone, Debug, PartialEq)]
pub enum DecryptError {
    /// Ciphertext too short or not block-aligned.
    InvalidBuffer,
    /// The `auth_key_id` in the ciphertext does not match our key.
    AuthKeyMismatch,
}

impl std::fmt::Display for DecryptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBuffer => write!(f, "invalid ciphertext buffer length"),
            Self::AuthKeyMismatch => write!(f, "auth_key_id mismatch"),
        }
    }
}
impl std::error::Error for DecryptError {}

/// Which direction a message travels; selects the key-schedule offset.
#[derive(Clone, Copy)]
pub enum Side {
    /// Client → server.
    Client,
    /// Server → client.
    Server,
}

impl Side {
    fn x(&self) -> usize {
        match self {
            Side::Client => 0,
            Side::Server => 8,
        }
    }
}

/// Derive the AES key and IV from `auth_key` and `msg_key`.
///
/// Four SHA-1 runs over fixed windows of the auth key; the window base is
/// shifted by 8 for server-originated messages.
pub fn calc_key(auth_key: &AuthKey, msg_key: &[u8; 16], side: Side) -> ([u8; 32], [u8; 32]) {
    let x = side.x();
    let k = &auth_key.data;

    let a = sha1!(msg_key, &k[x..x + 32]);
    let b = sha1!(&k[32 + x..48 + x], msg_key, &k[48 + x..64 + x]);
    let c = sha1!(&k[64 + x..96 + x], msg_key);
    let d = sha1!(msg_key, &k[96 + x..128 + x]);

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

/// `msg_key` over the plaintext inner header + payload: `sha1(plain)[4..20]`.
///
/// Computed before padding; inbound validation recomputes it over the first
/// `32 + msg_len` decrypted bytes.
pub fn calc_msg_key(plain: &[u8]) -> [u8; 16] {
    let sha = sha1!(plain);
    let mut out = [0u8; 16];
    out.copy_from_slice(&sha[4..20]);
    out
}

/// Encrypt `buffer` in place, prepending the unencrypted header.
///
/// On return `buffer` holds `auth_key_id ‖ msg_key ‖ ciphertext`. The
/// 0–15 byte random pad to a 16-byte multiple comes from `getrandom`.
pub fn encrypt_data(buffer: &mut DequeBuffer, auth_key: &AuthKey) {
    encrypt_data_for_side(buffer, auth_key, Side::Client);
}

/// Like [`encrypt_data`] with an explicit direction — server stubs in tests
/// encrypt with [`Side::Server`] so the client-side schedule decrypts them.
pub fn encrypt_data_for_side(buffer: &mut DequeBuffer, auth_key: &AuthKey, side: Side) {
    let mut rnd = [0u8; 16];
    getrandom::getrandom(&mut rnd).expect("getrandom failed");
    do_encrypt_data(buffer, auth_key, &rnd, side);
}

pub(crate) fn do_encrypt_data(
    buffer: &mut DequeBuffer,
    auth_key: &AuthKey,
    rnd: &[u8; 16],
    side: Side,
) {
    let msg_key = calc_msg_key(buffer.as_ref());

    let pad = (16 - buffer.len() % 16) % 16;
    buffer.extend(rnd.iter().take(pad).copied());

    let (key, iv) = calc_key(auth_key, &msg_key, side);
    aes::ige_encrypt(buffer.as_mut(), &key, &iv);

    buffer.extend_front(&msg_key);
    buffer.extend_front(&auth_key.key_id);
}

/// Decrypt an envelope in place.
///
/// `buffer` must start with `auth_key_id ‖ msg_key ‖ ciphertext`. Returns the
/// transmitted `msg_key` and the decrypted inner bytes; the caller verifies
/// the `msg_key` once it knows `msg_len` (the SHA-1 excludes the pad).
pub fn decrypt_data<'a>(
    buffer: &'a mut [u8],
    auth_key: &AuthKey,
) -> Result<([u8; 16], &'a mut [u8]), DecryptError> {
    decrypt_data_for_side(buffer, auth_key, Side::Server)
}

/// Like [`decrypt_data`] with an explicit direction — server stubs decrypt
/// client envelopes with [`Side::Client`].
pub fn decrypt_data_for_side<'a>(
    buffer: &'a mut [u8],
    auth_key: &AuthKey,
    side: Side,
) -> Result<([u8; 16], &'a mut [u8]), DecryptError> {
    if buffer.len() < 24 || (buffer.len() - 24) % 16 != 0 {
        return Err(DecryptError::InvalidBuffer);
    }
    if auth_key.key_id != buffer[..8] {
        return Err(DecryptError::AuthKeyMismatch);
    }
    let mut msg_key = [0u8; 16];
    msg_key.copy_from_slice(&buffer[8..24]);

    let (key, iv) = calc_key(auth_key, &msg_key, side);
    aes::ige_decrypt(&mut buffer[24..], &key, &iv);

    Ok((msg_key, &mut buffer[24..]))
}

/// Derive `(key, iv)` from nonces for the handshake's encrypted answers.
pub fn generate_key_data_from_nonce(
    server_nonce: &[u8; 16],
    new_nonce: &[u8; 32],
) -> ([u8; 32], [u8; 32]) {
    let h1 = sha1!(new_nonce, server_nonce);
    let h2 = sha1!(server_nonce, new_nonce);
    let h3 = sha1!(new_nonce, new_nonce);

    let mut key = [0u8; 32];
    key[..20].copy_from_slice(&h1);
    key[20..].copy_from_slice(&h2[..12]);

    let mut iv = [0u8; 32];
    iv[..8].copy_from_slice(&h2[12..]);
    iv[8..28].copy_from_slice(&h3);
    iv[28..].copy_from_slice(&new_nonce[..4]);

    (key, iv)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_key() -> AuthKey {
        let mut data = [0u8; 256];
        for (i, b) in data.iter_mut().enumerate() {
            *b = (i * 7 + 3) as u8;
        }
        AuthKey::from_bytes(data)
    }

    #[test]
    fn envelope_roundtrip_server_to_client() {
        let auth_key = sample_key();
        // Inner: salt + session + msg_id + seq_no + len + body (4-aligned)
        let inner: Vec<u8> = (0u8..48).collect();

        let mut buf = DequeBuffer::with_capacity(inner.len(), 32);
        buf.extend(inner.iter().copied());
        do_encrypt_data(&mut buf, &auth_key, &[0xaa; 16], Side::Server);

        let mut wire = buf.as_ref().to_vec();
        assert_eq!(&wire[..8], &auth_key.key_id);

        let (msg_key, plain) = decrypt_data(&mut wire, &auth_key).unwrap();
        assert_eq!(&plain[..inner.len()], &inner[..]);
        assert_eq!(msg_key, calc_msg_key(&plain[..inner.len()]));
    }

    #[test]
    fn envelope_roundtrip_client_to_server() {
        let auth_key = sample_key();
        let inner: Vec<u8> = (0u8..32).map(|b| b ^ 0x42).collect();

        let mut buf = DequeBuffer::with_capacity(inner.len(), 32);
        buf.extend(inner.iter().copied());
        encrypt_data(&mut buf, &auth_key);

        let mut wire = buf.as_ref().to_vec();
        let (_, plain) = decrypt_data_for_side(&mut wire, &auth_key, Side::Client).unwrap();
        assert_eq!(&plain[..inner.len()], &inner[..]);
    }

    #[test]
    fn decrypt_rejects_foreign_key_id() {
        let auth_key = sample_key();
        let other = AuthKey::from_bytes([0x55; 256]);

        let mut buf = DequeBuffer::with_capacity(16, 32);
        buf.extend([1u8; 16]);
        do_encrypt_data(&mut buf, &auth_key, &[0; 16], Side::Client);

        let mut wire = buf.as_ref().to_vec();
        assert_eq!(decrypt_data(&mut wire, &other), Err(DecryptError::AuthKeyMismatch));
    }

    #[test]
    fn client_and_server_schedules_differ() {
        let auth_key = sample_key();
        let msg_key = [3u8; 16];
        let c = calc_key(&auth_key, &msg_key, Side::Client);
        let s = calc_key(&auth_key, &msg_key, Side::Server);
        assert_ne!(c, s);
    }
}
