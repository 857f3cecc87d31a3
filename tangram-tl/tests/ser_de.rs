use num_bigint::BigUint;
use tangram_tl::{deserialize_bignum, serialize_bignum, Cursor, Deserializable, Serializable};

// ── Primitive round-trips ─────────────────────────────────────────────────────

#[test]
fn roundtrip_i32() {
    for v in [0i32, -1, i32::MAX, i32::MIN, 42] {
        let bytes = v.to_bytes();
        assert_eq!(i32::from_bytes(&bytes).unwrap(), v);
    }
}

#[test]
fn roundtrip_i64() {
    for v in [0i64, -1, i64::MAX, i64::MIN, 1_234_567_890] {
        let bytes = v.to_bytes();
        assert_eq!(i64::from_bytes(&bytes).unwrap(), v);
    }
}

#[test]
fn roundtrip_f64() {
    for v in [0.0f64, -1.5, f64::MAX, 1e-300] {
        let bytes = v.to_bytes();
        assert_eq!(f64::from_bytes(&bytes).unwrap(), v);
    }
}

#[test]
fn roundtrip_bool() {
    assert_eq!(true.to_bytes(), 0x997275b5u32.to_le_bytes());
    assert_eq!(false.to_bytes(), 0xbc799737u32.to_le_bytes());
    assert_eq!(bool::from_bytes(&true.to_bytes()).unwrap(), true);
    assert_eq!(bool::from_bytes(&false.to_bytes()).unwrap(), false);
}

// ── String / bytes ────────────────────────────────────────────────────────────

#[test]
fn roundtrip_empty_string() {
    let s = String::new();
    assert_eq!(String::from_bytes(&s.to_bytes()).unwrap(), s);
}

#[test]
fn roundtrip_short_string() {
    let s = "hello world".to_owned();
    let bytes = s.to_bytes();
    assert_eq!(bytes.len() % 4, 0, "must be 4-byte aligned");
    assert_eq!(String::from_bytes(&bytes).unwrap(), s);
}

#[test]
fn roundtrip_long_string() {
    // >253 bytes triggers the 4-byte length header path
    let s = "x".repeat(300);
    let bytes = s.clone().to_bytes();
    assert_eq!(bytes.len() % 4, 0);
    assert_eq!(String::from_bytes(&bytes).unwrap(), s);
}

#[test]
fn roundtrip_bytes_all_lengths_stay_aligned() {
    for len in 0..64usize {
        let v: Vec<u8> = (0..len as u8).collect();
        let bytes = v.clone().to_bytes();
        assert_eq!(bytes.len() % 4, 0, "len {len} not aligned");
        assert_eq!(Vec::<u8>::from_bytes(&bytes).unwrap(), v);
    }
}

// ── Vectors ───────────────────────────────────────────────────────────────────

#[test]
fn roundtrip_vec_i32() {
    let v: Vec<i32> = vec![1, 2, 3, -99];
    assert_eq!(Vec::<i32>::from_bytes(&v.to_bytes()).unwrap(), v);
}

#[test]
fn roundtrip_empty_vec() {
    let v: Vec<i64> = vec![];
    assert_eq!(Vec::<i64>::from_bytes(&v.to_bytes()).unwrap(), Vec::<i64>::new());
}

#[test]
fn vec_rejects_wrong_constructor() {
    use tangram_tl::deserialize::Error;
    let mut bytes = vec![1, 2, 3, 4]; // not the vector id
    bytes.extend_from_slice(&0i32.to_le_bytes());
    assert!(matches!(
        Vec::<i32>::from_bytes(&bytes),
        Err(Error::UnexpectedConstructor { .. })
    ));
}

// ── Fixed-size nonces ─────────────────────────────────────────────────────────

#[test]
fn roundtrip_int128() {
    let v: [u8; 16] = core::array::from_fn(|i| i as u8);
    assert_eq!(<[u8; 16]>::from_bytes(&v.to_bytes()).unwrap(), v);
}

#[test]
fn roundtrip_int256() {
    let v: [u8; 32] = core::array::from_fn(|i| i as u8 ^ 0x5a);
    assert_eq!(<[u8; 32]>::from_bytes(&v.to_bytes()).unwrap(), v);
}

// ── Big numbers ───────────────────────────────────────────────────────────────

#[test]
fn bignum_roundtrip_up_to_4096_bits() {
    // Deterministic pseudo-random values of growing width.
    let mut x = BigUint::from(0xdeadbeefu32);
    for bits in [8u32, 64, 127, 128, 255, 256, 1024, 2048, 4096] {
        let v = &x % (BigUint::from(1u8) << bits);
        let mut buf = Vec::new();
        serialize_bignum(&v.to_bytes_be(), &mut buf);
        let mut cur = Cursor::from_slice(&buf);
        let back = deserialize_bignum(&mut cur).unwrap();
        assert_eq!(BigUint::from_bytes_be(&back), v, "width {bits}");
        x = &x * &x + 1u8;
    }
}

#[test]
fn bignum_high_bit_gets_zero_prefix() {
    let mut buf = Vec::new();
    serialize_bignum(&[0x80, 0x01], &mut buf);
    // TL bytes: len 3, then 0x00 0x80 0x01, padded
    assert_eq!(buf[0], 3);
    assert_eq!(&buf[1..4], &[0x00, 0x80, 0x01]);
}

// ── Cursor EOF detection ──────────────────────────────────────────────────────

#[test]
fn deserialize_truncated_returns_eof() {
    use tangram_tl::deserialize::Error;
    let result = i32::from_bytes(&[0x01, 0x02]);
    assert_eq!(result, Err(Error::UnexpectedEof));
}

// ── Option passthrough ────────────────────────────────────────────────────────

#[test]
fn option_none_writes_nothing() {
    let v: Option<i32> = None;
    assert_eq!(v.to_bytes(), b"");
}

#[test]
fn option_some_writes_inner() {
    let v: Option<i32> = Some(42);
    assert_eq!(v.to_bytes(), 42i32.to_bytes());
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[test]
fn respq_boxed_roundtrip() {
    use tangram_tl::{enums, types};
    let v = enums::ResPq::ResPq(types::ResPq {
        nonce: [1; 16],
        server_nonce: [2; 16],
        pq: vec![0x17, 0xed, 0x48, 0x94, 0x1a, 0x08, 0xf9, 0x81],
        server_public_key_fingerprints: vec![-0x2f64c42c4f2e9c1b],
    });
    let bytes = v.to_bytes();
    assert_eq!(&bytes[..4], &0x05162463u32.to_le_bytes());
    assert_eq!(enums::ResPq::from_bytes(&bytes).unwrap(), v);
}

#[test]
fn update_envelope_roundtrip() {
    use tangram_tl::enums;
    let v = enums::Updates::ShortMessage {
        out: false,
        id: 7,
        user_id: 1234,
        message: "hi".into(),
        pts: 101,
        pts_count: 1,
        date: 1_700_000_000,
    };
    assert_eq!(enums::Updates::from_bytes(&v.to_bytes()).unwrap(), v);
}

#[test]
fn difference_roundtrip_carries_state() {
    use tangram_tl::{enums, types};
    let v = enums::updates::Difference::Difference(types::updates::Difference {
        new_messages: vec![],
        new_encrypted_messages: vec![],
        other_updates: vec![],
        chats: vec![],
        users: vec![],
        state: types::updates::State { pts: 10, qts: 2, date: 3, seq: 4, unread_count: 0 },
    });
    let back = enums::updates::Difference::from_bytes(&v.to_bytes()).unwrap();
    assert_eq!(back, v);
}

#[test]
fn function_serializes_constructor_first() {
    use tangram_tl::functions;
    let req = functions::updates::GetDifference { pts: 1, date: 2, qts: 3 };
    let bytes = req.to_bytes();
    assert_eq!(&bytes[..4], &0x0a041495u32.to_le_bytes());
    assert_eq!(bytes.len(), 4 + 12);
}
