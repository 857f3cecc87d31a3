//! AES-256 in IGE mode, the block chaining MTProto uses everywhere.
//!
//! IGE chains both the previous plaintext and the previous ciphertext block
//! into each encryption, so the 32-byte IV carries one block of each.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes256;

/// Encrypt `data` in place. `data.len()` must be a multiple of 16.
pub fn ige_encrypt(data: &mut [u8], key: &[u8; 32], iv: &[u8; 32]) {
    assert_eq!(data.len() % 16, 0, "IGE requires 16-byte blocks");
    let cipher = Aes256::new(GenericArray::from_slice(key));

    let mut y_prev = [0u8; 16];
    let mut x_prev = [0u8; 16];
    y_prev.copy_from_slice(&iv[..16]);
    x_prev.copy_from_slice(&iv[16..]);

    for chunk in data.chunks_exact_mut(16) {
        let plain: [u8; 16] = chunk.try_into().unwrap();

        let mut block = [0u8; 16];
        for i in 0..16 {
            block[i] = plain[i] ^ y_prev[i];
        }
        let ga = GenericArray::from_mut_slice(&mut block);
        cipher.encrypt_block(ga);
        for i in 0..16 {
            block[i] ^= x_prev[i];
        }

        chunk.copy_from_slice(&block);
        y_prev = block;
        x_prev = plain;
    }
}

/// Decrypt `data` in place. `data.len()` must be a multiple of 16.
pub fn ige_decrypt(data: &mut [u8], key: &[u8; 32], iv: &[u8; 32]) {
    assert_eq!(data.len() % 16, 0, "IGE requires 16-byte blocks");
    let cipher = Aes256::new(GenericArray::from_slice(key));

    let mut y_prev = [0u8; 16];
    let mut x_prev = [0u8; 16];
    y_prev.copy_from_slice(&iv[..16]);
    x_prev.copy_from_slice(&iv[16..]);

    for chunk in data.chunks_exact_mut(16) {
        let cipher_block: [u8; 16] = chunk.try_into().unwrap();

        let mut block = [0u8; 16];
        for i in 0..16 {
            block[i] = cipher_block[i] ^ x_prev[i];
        }
        let ga = GenericArray::from_mut_slice(&mut block);
        cipher.decrypt_block(ga);
        for i in 0..16 {
            block[i] ^= y_prev[i];
        }

        chunk.copy_from_slice(&block);
        y_prev = cipher_block;
        x_prev = block;
    }
}

/// Encrypt `data` in place, updating `iv` so the next call continues the
/// stream (used for chunked file transfers).
pub fn ige_encrypt_continuing(data: &mut [u8], key: &[u8; 32], iv: &mut [u8; 32]) {
    if data.is_empty() {
        return;
    }
    let last_plain: [u8; 16] = data[data.len() - 16..].try_into().unwrap();
    ige_encrypt(data, key, iv);
    iv[..16].copy_from_slice(&data[data.len() - 16..]);
    iv[16..].copy_from_slice(&last_plain);
}

/// Decrypt `data` in place, updating `iv` for the next chunk.
pub fn ige_decrypt_continuing(data: &mut [u8], key: &[u8; 32], iv: &mut [u8; 32]) {
    if data.is_empty() {
        return;
    }
    let last_cipher: [u8; 16] = data[data.len() - 16..].try_into().unwrap();
    ige_decrypt(data, key, iv);
    iv[..16].copy_from_slice(&last_cipher);
    iv[16..].copy_from_slice(&data[data.len() - 16..]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let key = [0x11u8; 32];
        let iv: [u8; 32] = core::array::from_fn(|i| i as u8);
        let original: Vec<u8> = (0u8..64).collect();
        let mut data = original.clone();
        ige_encrypt(&mut data, &key, &iv);
        assert_ne!(data, original);
        ige_decrypt(&mut data, &key, &iv);
        assert_eq!(data, original);
    }

    #[test]
    fn continuing_chunks_match_whole_buffer() {
        let key = [0x42u8; 32];
        let iv0: [u8; 32] = core::array::from_fn(|i| (i * 3) as u8);

        let whole: Vec<u8> = (0u8..96).collect();
        let mut one_shot = whole.clone();
        ige_encrypt(&mut one_shot, &key, &iv0);

        let mut chunked = whole.clone();
        let mut iv = iv0;
        let (a, b) = chunked.split_at_mut(32);
        ige_encrypt_continuing(a, &key, &mut iv);
        ige_encrypt_continuing(b, &key, &mut iv);
        assert_eq!(chunked, one_shot);

        let mut back = chunked.clone();
        let mut iv = iv0;
        let (a, b) = back.split_at_mut(64);
        ige_decrypt_continuing(a, &key, &mut iv);
        ige_decrypt_continuing(b, &key, &mut iv);
        assert_eq!(back, whole);
    }

    #[test]
    fn chaining_differs_per_block() {
        let key = [0u8; 32];
        let iv = [0u8; 32];
        // Two identical plaintext blocks must not produce identical ciphertext.
        let mut data = vec![0xabu8; 32];
        ige_encrypt(&mut data, &key, &iv);
        assert_ne!(&data[..16], &data[16..]);
    }
}
