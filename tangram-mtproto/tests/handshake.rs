//! Full handshake round-trip against a cooperative server stub.
//!
//! The stub shares the randomness injected into the client's deterministic
//! step functions, so it never needs the RSA private key: it already knows
//! `new_nonce` and derives the same transfer cipher from the nonces.

use num_bigint::BigUint;
use sha1::{Digest, Sha1};

use tangram_crypto::rsa::{Key, Keyring};
use tangram_crypto::{aes, generate_key_data_from_nonce, AuthKey};
use tangram_mtproto::authentication as auth;
use tangram_tl::{enums, types, Cursor, Deserializable, Serializable};

/// RFC 3526 group 14 — a published 2048-bit safe prime with generator 2.
const DH_PRIME_HEX: &str = "\
FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74\
020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437\
4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF05\
98DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB\
9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B\
E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF695581718\
3995497CEA956AE515D2261898FA051015728E5A8AACAA68FFFFFFFFFFFFFFFF";

const PQ: u64 = 1470626929934143021; // 1206429347 * 1218991343

fn dh_prime() -> BigUint {
    BigUint::parse_bytes(DH_PRIME_HEX.as_bytes(), 16).unwrap()
}

/// Any 2048-bit odd modulus works for the stub: it never decrypts.
fn stub_rsa_key() -> Key {
    let n = vec![0xffu8; 256];
    Key::from_bytes(&n, &[0x01, 0x00, 0x01])
}

fn sha1_of(data: &[u8]) -> [u8; 20] {
    let mut h = Sha1::new();
    h.update(data);
    h.finalize().into()
}

#[test]
fn full_handshake_produces_matching_keys() {
    let mut keyring = Keyring::new();
    keyring.add(stub_rsa_key());
    let fingerprint = stub_rsa_key().fingerprint();

    let server_nonce: [u8; 16] = core::array::from_fn(|i| 0xa0 + i as u8);
    let prime = dh_prime();
    let prime_bytes = prime.to_bytes_be();
    assert_eq!(prime_bytes.len(), 256);

    // Server's DH exponent.
    let a = BigUint::from_bytes_be(&[0x77u8; 256]) % &prime;
    let g = BigUint::from(2u32);
    let g_a = g.modpow(&a, &prime);

    // ── Step 1 ──────────────────────────────────────────────────────────
    let step1_random = [0x11u8; 16];
    let (req_pq, s1) = auth::do_step1(&step1_random, auth::KeyKind::Permanent).unwrap();
    assert_eq!(req_pq.nonce, step1_random);

    let res_pq = enums::ResPq::ResPq(types::ResPq {
        nonce: req_pq.nonce,
        server_nonce,
        pq: PQ.to_be_bytes().to_vec(),
        server_public_key_fingerprints: vec![fingerprint],
    });

    // ── Step 2 ──────────────────────────────────────────────────────────
    let mut step2_random = [0u8; 256];
    for (i, b) in step2_random.iter_mut().enumerate() {
        *b = (i * 13 + 5) as u8;
    }
    let (req_dh, s2) = auth::do_step2(&keyring, s1, res_pq, &step2_random).unwrap();

    assert_eq!(req_dh.public_key_fingerprint, fingerprint);
    let p = BigUint::from_bytes_be(&req_dh.p);
    let q = BigUint::from_bytes_be(&req_dh.q);
    assert!(p < q, "factors must be ordered");
    assert_eq!(&p * &q, BigUint::from(PQ));

    // The stub shares the client's randomness, so it knows new_nonce.
    let new_nonce: [u8; 32] = step2_random[..32].try_into().unwrap();
    let (transfer_key, transfer_iv) = generate_key_data_from_nonce(&server_nonce, &new_nonce);

    // ── Server answer: server_DH_inner_data ─────────────────────────────
    let now = 1_700_000_000i32;
    let inner = enums::ServerDhInnerData::Data(types::ServerDhInnerData {
        nonce: req_pq.nonce,
        server_nonce,
        g: 2,
        dh_prime: prime_bytes.clone(),
        g_a: g_a.to_bytes_be(),
        server_time: now + 25,
    })
    .to_bytes();

    let mut answer = Vec::new();
    answer.extend_from_slice(&sha1_of(&inner));
    answer.extend_from_slice(&inner);
    while answer.len() % 16 != 0 {
        answer.push(0);
    }
    aes::ige_encrypt(&mut answer, &transfer_key, &transfer_iv);

    let dh_params = enums::ServerDhParams::Ok(types::ServerDhParamsOk {
        nonce: req_pq.nonce,
        server_nonce,
        encrypted_answer: answer,
    });

    // ── Step 3 ──────────────────────────────────────────────────────────
    let step3_random = [0x5cu8; 272];
    let (set_client, s3) = auth::do_step3(s2, dh_params, &step3_random, now).unwrap();

    // Stub decrypts the client's answer and recovers g_b.
    let mut client_blob = set_client.encrypted_data.clone();
    aes::ige_decrypt(&mut client_blob, &transfer_key, &transfer_iv);
    let client_hash: [u8; 20] = client_blob[..20].try_into().unwrap();
    let mut cur = Cursor::from_slice(&client_blob[20..]);
    let enums::ClientDhInnerData::Data(client_inner) =
        enums::ClientDhInnerData::deserialize(&mut cur).unwrap();
    assert_eq!(client_hash, sha1_of(&client_blob[20..20 + cur.pos()]));
    assert_eq!(client_inner.retry_id, 0);

    let g_b = BigUint::from_bytes_be(&client_inner.g_b);
    let server_shared = g_b.modpow(&a, &prime);
    let mut server_key = [0u8; 256];
    let shared_bytes = server_shared.to_bytes_be();
    server_key[256 - shared_bytes.len()..].copy_from_slice(&shared_bytes);
    let server_auth_key = AuthKey::from_bytes(server_key);

    let answer = enums::SetClientDhParamsAnswer::DhGenOk(types::DhGenOk {
        nonce: req_pq.nonce,
        server_nonce,
        new_nonce_hash1: server_auth_key.calc_new_nonce_hash(&new_nonce, 1),
    });

    // ── Finish ──────────────────────────────────────────────────────────
    let done = auth::finish(s3, answer).unwrap();

    assert_eq!(done.auth_key.len(), 256);
    assert_eq!(done.auth_key, server_auth_key.to_bytes(), "both sides derive the same key");
    assert_eq!(done.time_offset, 25);
    assert_eq!(done.kind, auth::KeyKind::Permanent);
    assert_eq!(done.rsa_key_idx, 0, "the only keyring entry signed the exchange");

    // auth_key_id == low64(sha1(auth_key)[12..20])
    let sha = sha1_of(&done.auth_key);
    assert_eq!(
        AuthKey::from_bytes(done.auth_key).key_id_u64(),
        u64::from_le_bytes(sha[12..20].try_into().unwrap())
    );

    // first_salt == low64(new_nonce) ^ low64(server_nonce)
    let expected_salt = i64::from_le_bytes(new_nonce[..8].try_into().unwrap())
        ^ i64::from_le_bytes(server_nonce[..8].try_into().unwrap());
    assert_eq!(done.first_salt, expected_salt);
}

#[test]
fn handshake_rejects_composite_dh_prime() {
    let mut keyring = Keyring::new();
    keyring.add(stub_rsa_key());
    let fingerprint = stub_rsa_key().fingerprint();

    let server_nonce = [9u8; 16];
    let (req_pq, s1) = auth::do_step1(&[0x22; 16], auth::KeyKind::Permanent).unwrap();
    let res_pq = enums::ResPq::ResPq(types::ResPq {
        nonce: req_pq.nonce,
        server_nonce,
        pq: PQ.to_be_bytes().to_vec(),
        server_public_key_fingerprints: vec![fingerprint],
    });
    let step2_random = [0x33u8; 256];
    let (_, s2) = auth::do_step2(&keyring, s1, res_pq, &step2_random).unwrap();

    let new_nonce: [u8; 32] = step2_random[..32].try_into().unwrap();
    let (transfer_key, transfer_iv) = generate_key_data_from_nonce(&server_nonce, &new_nonce);

    // A 2048-bit even number cannot be prime.
    let mut bogus_prime = vec![0xffu8; 256];
    bogus_prime[255] = 0xfe;

    let inner = enums::ServerDhInnerData::Data(types::ServerDhInnerData {
        nonce: req_pq.nonce,
        server_nonce,
        g: 2,
        dh_prime: bogus_prime,
        g_a: vec![0x03; 256],
        server_time: 1_700_000_000,
    })
    .to_bytes();

    let mut answer = Vec::new();
    answer.extend_from_slice(&sha1_of(&inner));
    answer.extend_from_slice(&inner);
    while answer.len() % 16 != 0 {
        answer.push(0);
    }
    aes::ige_encrypt(&mut answer, &transfer_key, &transfer_iv);

    let dh_params = enums::ServerDhParams::Ok(types::ServerDhParamsOk {
        nonce: req_pq.nonce,
        server_nonce,
        encrypted_answer: answer,
    });

    let err = auth::do_step3(s2, dh_params, &[0x44; 272], 1_700_000_000).unwrap_err();
    assert_eq!(err, auth::Error::InvalidDhPrime);
}

#[test]
fn unfactorable_pq_aborts_step2() {
    let mut keyring = Keyring::new();
    keyring.add(stub_rsa_key());
    let fingerprint = stub_rsa_key().fingerprint();

    let (req_pq, s1) = auth::do_step1(&[0x55; 16], auth::KeyKind::Permanent).unwrap();
    let res_pq = enums::ResPq::ResPq(types::ResPq {
        nonce: req_pq.nonce,
        server_nonce: [6; 16],
        // 2^32 - 5 is prime; a hostile server could send this to wedge naive
        // clients.
        pq: 4294967291u64.to_be_bytes().to_vec(),
        server_public_key_fingerprints: vec![fingerprint],
    });
    let err = auth::do_step2(&keyring, s1, res_pq, &[0x11; 256]).unwrap_err();
    assert_eq!(err, auth::Error::FactorizationFailed { pq: 4294967291 });
}

#[test]
fn nonce_mismatch_aborts_step2() {
    let keyring = Keyring::with_defaults();
    let (_, s1) = auth::do_step1(&[1; 16], auth::KeyKind::Permanent).unwrap();
    let res_pq = enums::ResPq::ResPq(types::ResPq {
        nonce: [2; 16], // wrong
        server_nonce: [3; 16],
        pq: PQ.to_be_bytes().to_vec(),
        server_public_key_fingerprints: vec![0],
    });
    let err = auth::do_step2(&keyring, s1, res_pq, &[0; 256]).unwrap_err();
    assert!(matches!(err, auth::Error::InvalidNonce { .. }));
}
