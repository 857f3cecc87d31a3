//! RSA encryption for the unauthenticated key exchange.
//!
//! The padded plaintext is `sha1(data) ‖ data ‖ random`, 255 bytes total,
//! raised to `e` mod `n`. Key fingerprints are the low 64 bits of the SHA-1
//! tail over the TL serialization of `(n, e)`.

use num_bigint::BigUint;

use crate::sha1;
use tangram_tl::serialize_bignum;

/// An RSA public key (n, e).
#[derive(Clone, Debug)]
pub struct Key {
    n: BigUint,
    e: BigUint,
}

impl Key {
    /// Parse decimal `n` and `e` strings.
    pub fn new(n: &str, e: &str) -> Option<Self> {
        Some(Self {
            n: BigUint::parse_bytes(n.as_bytes(), 10)?,
            e: BigUint::parse_bytes(e.as_bytes(), 10)?,
        })
    }

    /// Build from raw big-endian component bytes.
    pub fn from_bytes(n: &[u8], e: &[u8]) -> Self {
        Self { n: BigUint::from_bytes_be(n), e: BigUint::from_bytes_be(e) }
    }

    /// The 64-bit fingerprint servers advertise in `resPQ`.
    pub fn fingerprint(&self) -> i64 {
        let mut buf = Vec::new();
        serialize_bignum(&self.n.to_bytes_be(), &mut buf);
        serialize_bignum(&self.e.to_bytes_be(), &mut buf);
        let sha = sha1!(&buf);
        i64::from_le_bytes(sha[12..20].try_into().unwrap())
    }

    /// The modulus, big-endian.
    pub fn modulus_bytes(&self) -> Vec<u8> {
        self.n.to_bytes_be()
    }
}

/// Maximum payload for [`encrypt_hashed`]: 255 bytes minus the SHA-1 prefix.
pub const MAX_PLAIN_LEN: usize = 255 - 20;

/// Encrypt `data` with a leading SHA-1 and random padding to 255 bytes.
///
/// `random_pad` supplies the padding bytes; only `255 - 20 - data.len()` of
/// them are consumed. Returns the 256-byte ciphertext block.
pub fn encrypt_hashed(data: &[u8], key: &Key, random_pad: &[u8]) -> Vec<u8> {
    assert!(data.len() <= MAX_PLAIN_LEN, "data too large for RSA block");
    let pad_len = 255 - 20 - data.len();
    assert!(random_pad.len() >= pad_len, "not enough padding material");

    let mut plain = Vec::with_capacity(255);
    plain.extend_from_slice(&sha1!(data));
    plain.extend_from_slice(data);
    plain.extend_from_slice(&random_pad[..pad_len]);

    let payload = BigUint::from_bytes_be(&plain);
    let encrypted = payload.modpow(&key.e, &key.n);
    let mut block = encrypted.to_bytes_be();
    while block.len() < 256 {
        block.insert(0, 0);
    }
    block
}

// ─── Keyring ─────────────────────────────────────────────────────────────────

/// The set of RSA keys this client trusts, matched against server
/// fingerprints during the handshake.
#[derive(Clone, Debug, Default)]
pub struct Keyring {
    keys: Vec<Key>,
}

impl Keyring {
    /// An empty keyring (for tests and custom deployments).
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in production and test DC keys.
    pub fn with_defaults() -> Self {
        let mut ring = Self::new();
        for (n, e) in DEFAULT_KEYS {
            if let Some(key) = Key::new(n, e) {
                ring.add(key);
            }
        }
        ring
    }

    /// Add a trusted key.
    pub fn add(&mut self, key: Key) {
        self.keys.push(key);
    }

    /// Find a key matching one of the advertised fingerprints.
    ///
    /// Returns the key index (stored with the DC for later reconnects), the
    /// matching fingerprint and the key itself.
    pub fn find(&self, fingerprints: &[i64]) -> Option<(usize, i64, &Key)> {
        for &fp in fingerprints {
            for (idx, key) in self.keys.iter().enumerate() {
                if key.fingerprint() == fp {
                    return Some((idx, fp, key));
                }
            }
        }
        None
    }

    /// Look up a key by stored index.
    pub fn get(&self, idx: usize) -> Option<&Key> {
        self.keys.get(idx)
    }

    /// Number of keys in the ring.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True if the ring holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

const DEFAULT_KEYS: [(&str, &str); 2] = [
    // Production DC key
    (
        "29379598170669337022986177149456128565388431120058863768162556424047512191330847455146576344487764408661701890505066208632169112269581063774293102577308490531282748465986139880977280302242772832972539403531316010870401287642763009136156734339538042419388722777357134487746169093539093850251243897188928735903389451772730245253062963384108812842079887538976360465290946139638691491496062099570836476454855996319192747663615955633778034897140982517446405334423701359108810182097749467210509584293428076654573384828809574217079944388301239431309115013843331317877374435868468779972014486325557807783825502498215169806323",
        "65537",
    ),
    // Test DC key
    (
        "25342889448840415564971689590713473206898847759084779052582026594546022463853940585885215951168491965708222649399180603818074200620463776135424884632162512403163793083921641631564740959529419359595852941166848940585952337613333022396096584117954892216031229237302943701877588456738335398602461675225081791820393153757504952636234951323237820036543581047826906120927972487366805292115792231423684261262330394324750785450942589751755390156647751460719351439969059949569615302809050721500330239005077889855323917509948255722081644689442127297605422579707142646660768825302832201908302295573257427896031830742328565032949",
        "65537",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable() {
        let ring = Keyring::with_defaults();
        assert_eq!(ring.len(), 2);
        let fp0 = ring.get(0).unwrap().fingerprint();
        let fp1 = ring.get(1).unwrap().fingerprint();
        assert_ne!(fp0, fp1);
        let found = ring.find(&[999, fp1]).unwrap();
        assert_eq!(found.0, 1);
        assert_eq!(found.1, fp1);
    }

    #[test]
    fn encrypt_block_is_256_bytes() {
        let ring = Keyring::with_defaults();
        let out = encrypt_hashed(b"hello", ring.get(0).unwrap(), &[0x42; 255]);
        assert_eq!(out.len(), 256);
    }
}
