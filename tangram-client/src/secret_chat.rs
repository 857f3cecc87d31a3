//! Secret chats: DH key agreement and end-to-end message framing.
//!
//! Each chat carries its own 256-byte shared key (fingerprinted by the low
//! 64 bits of its SHA-1 tail) and two sequence counters with fixed parity:
//! the side that initiated the chat (`admin`) owns the odd out-parity.
//! Messages travel as `fingerprint ‖ msg_key ‖ IGE(len ‖ layer-envelope)`.

use std::collections::HashMap;

use num_bigint::BigUint;

use tangram_crypto::{aes, prime, secret};
use tangram_tl::{enums, functions, types, Serializable, SECRET_LAYER};

use crate::errors::InvocationError;
use crate::Client;

/// Lifecycle of a secret chat.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SecretChatState {
    /// Placeholder before any handshake traffic.
    #[default]
    None,
    /// We sent `requestEncryption`; waiting for the peer to accept.
    Waiting,
    /// Peer requested; waiting for us to accept.
    Request,
    /// Key agreed on both sides.
    Ok,
    /// Discarded.
    Deleted,
}

/// One end-to-end encrypted conversation.
#[derive(Clone, Debug)]
pub struct SecretChat {
    /// Chat id.
    pub id: i32,
    /// Server access hash.
    pub access_hash: i64,
    /// The other participant.
    pub user_id: i32,
    /// Which side initiated (owns the odd out-parity).
    pub admin_id: i32,
    /// Lifecycle state.
    pub state: SecretChatState,
    /// The 256-byte shared key (zero until `Ok`).
    pub key: [u8; 256],
    /// `low64(sha1(key)[12..20])`.
    pub key_fingerprint: i64,
    /// DH modulus from `messages.getDhConfig`.
    pub prime: Vec<u8>,
    /// DH generator.
    pub g: i32,
    /// Our secret exponent while the handshake is open.
    pub exponent: [u8; 256],
    /// Incoming `g_a` while in `Request` state.
    pub peer_g_a: Vec<u8>,
    /// Message TTL in seconds (0 = off).
    pub ttl: i32,
    /// Negotiated secret layer.
    pub layer: i32,
    /// Messages received from the peer.
    pub in_seq_no: i32,
    /// Messages sent by us.
    pub out_seq_no: i32,
    /// Highest of our messages the peer reports having seen.
    pub last_in_seq_no: i32,
}

impl SecretChat {
    fn blank(id: i32, access_hash: i64, user_id: i32, admin_id: i32) -> Self {
        Self {
            id,
            access_hash,
            user_id,
            admin_id,
            state: SecretChatState::None,
            key: [0u8; 256],
            key_fingerprint: 0,
            prime: Vec::new(),
            g: 0,
            exponent: [0u8; 256],
            peer_g_a: Vec::new(),
            ttl: 0,
            layer: SECRET_LAYER,
            in_seq_no: 0,
            out_seq_no: 0,
            last_in_seq_no: 0,
        }
    }

    /// Parity bit our outbound `out_seq_no` carries.
    pub fn out_parity(&self, our_id: i32) -> i32 {
        i32::from(self.admin_id == our_id)
    }

    /// Parity bit our outbound `in_seq_no` carries.
    pub fn in_parity(&self, our_id: i32) -> i32 {
        i32::from(self.admin_id != our_id)
    }

    /// Raw `in_seq_no` / `out_seq_no` fields for the next outbound message.
    pub fn next_layer_seq(&mut self, our_id: i32) -> (i32, i32) {
        let in_field = 2 * self.in_seq_no + self.in_parity(our_id);
        let out_field = 2 * self.out_seq_no + self.out_parity(our_id);
        self.out_seq_no += 1;
        (in_field, out_field)
    }

    /// Adopt a freshly computed shared key.
    pub fn set_key(&mut self, key: [u8; 256]) {
        self.key_fingerprint = secret::key_fingerprint(&key);
        self.key = key;
    }
}

/// Verdict for one inbound secret message.
#[derive(Clone, Debug, PartialEq)]
pub enum SeqVerdict {
    /// In order.
    Ok,
    /// Parity bit does not match the peer's side.
    BadParity,
    /// Already seen.
    Duplicate,
    /// Messages were missed; ask for `start..=end` (raw seq values).
    Gap {
        /// First missing raw seq.
        start: i32,
        /// Last raw seq (the one just received).
        end: i32,
    },
}

/// Classify an inbound raw `out_seq_no` against the chat's counters.
pub fn check_incoming_seq(chat: &SecretChat, our_id: i32, raw_out_seq: i32) -> SeqVerdict {
    let their_parity = 1 - chat.out_parity(our_id);
    if raw_out_seq & 1 != their_parity {
        return SeqVerdict::BadParity;
    }
    let their_seq = raw_out_seq >> 1;
    if their_seq < chat.in_seq_no {
        SeqVerdict::Duplicate
    } else if their_seq > chat.in_seq_no {
        SeqVerdict::Gap { start: 2 * chat.in_seq_no + their_parity, end: raw_out_seq }
    } else {
        SeqVerdict::Ok
    }
}

/// Registry of all secret chats plus our own user id.
#[derive(Debug, Default)]
pub struct SecretChatRegistry {
    chats: HashMap<i32, SecretChat>,
    /// Our user id, set after login.
    pub our_id: i32,
}

impl SecretChatRegistry {
    /// Borrow a chat.
    pub fn get(&self, id: i32) -> Option<&SecretChat> {
        self.chats.get(&id)
    }

    /// Mutably borrow a chat.
    pub fn get_mut(&mut self, id: i32) -> Option<&mut SecretChat> {
        self.chats.get_mut(&id)
    }

    /// Fetch or create a blank record.
    pub fn get_or_create(
        &mut self,
        id: i32,
        access_hash: i64,
        user_id: i32,
        admin_id: i32,
    ) -> &mut SecretChat {
        self.chats.entry(id).or_insert_with(|| SecretChat::blank(id, access_hash, user_id, admin_id))
    }

    /// Remove a chat (discard).
    pub fn remove(&mut self, id: i32) -> Option<SecretChat> {
        self.chats.remove(&id)
    }

    /// Iterate all chats (persistence).
    pub fn iter(&self) -> impl Iterator<Item = &SecretChat> {
        self.chats.values()
    }

    /// Re-insert a persisted chat.
    pub fn insert(&mut self, chat: SecretChat) {
        self.chats.insert(chat.id, chat);
    }
}

// ─── Payload framing ─────────────────────────────────────────────────────────

/// Errors decrypting an inbound secret payload.
#[derive(Clone, Debug, PartialEq)]
pub enum SecretError {
    /// Blob too short for fingerprint + msg_key + one block.
    TooShort,
    /// Fingerprint does not match the chat key.
    FingerprintMismatch,
    /// Length field inconsistent with the blob.
    BadLength,
    /// Recomputed msg_key differs.
    MsgKeyMismatch,
}

impl std::fmt::Display for SecretError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooShort => write!(f, "secret payload too short"),
            Self::FingerprintMismatch => write!(f, "key fingerprint mismatch"),
            Self::BadLength => write!(f, "secret payload length inconsistent"),
            Self::MsgKeyMismatch => write!(f, "secret msg_key mismatch"),
        }
    }
}
impl std::error::Error for SecretError {}

/// Encrypt a serialized layer envelope into the on-wire `data` blob.
pub fn encrypt_secret_data(key: &[u8; 256], fingerprint: i64, payload: &[u8]) -> Vec<u8> {
    let mut plain = Vec::with_capacity(4 + payload.len() + 15);
    plain.extend((payload.len() as u32).to_le_bytes());
    plain.extend_from_slice(payload);

    let msg_key = secret::secret_msg_key(&plain);

    let pad = (16 - plain.len() % 16) % 16;
    if pad > 0 {
        let mut rnd = [0u8; 16];
        getrandom::getrandom(&mut rnd).expect("getrandom");
        plain.extend_from_slice(&rnd[..pad]);
    }

    let (aes_key, aes_iv) = secret::secret_key_iv(key, &msg_key);
    aes::ige_encrypt(&mut plain, &aes_key, &aes_iv);

    let mut out = Vec::with_capacity(8 + 16 + plain.len());
    out.extend(fingerprint.to_le_bytes());
    out.extend_from_slice(&msg_key);
    out.extend_from_slice(&plain);
    out
}

/// Decrypt an on-wire `data` blob back into the serialized layer envelope.
pub fn decrypt_secret_data(
    key: &[u8; 256],
    expected_fingerprint: i64,
    data: &[u8],
) -> Result<Vec<u8>, SecretError> {
    if data.len() < 8 + 16 + 16 || (data.len() - 24) % 16 != 0 {
        return Err(SecretError::TooShort);
    }
    let fingerprint = i64::from_le_bytes(data[..8].try_into().unwrap());
    if fingerprint != expected_fingerprint {
        return Err(SecretError::FingerprintMismatch);
    }
    let mut msg_key = [0u8; 16];
    msg_key.copy_from_slice(&data[8..24]);

    let (aes_key, aes_iv) = secret::secret_key_iv(key, &msg_key);
    let mut plain = data[24..].to_vec();
    aes::ige_decrypt(&mut plain, &aes_key, &aes_iv);

    let len = u32::from_le_bytes(plain[..4].try_into().unwrap()) as usize;
    if len == 0 || len % 4 != 0 || 4 + len > plain.len() || plain.len() - 4 - len > 15 {
        return Err(SecretError::BadLength);
    }
    if secret::secret_msg_key(&plain[..4 + len]) != msg_key {
        return Err(SecretError::MsgKeyMismatch);
    }
    Ok(plain[4..4 + len].to_vec())
}

// ─── Client driver ────────────────────────────────────────────────────────────

impl Client {
    /// Start a secret chat with `user_id` (initiator side).
    pub async fn request_encryption(
        &self,
        user_id: i64,
        access_hash: i64,
    ) -> Result<i32, InvocationError> {
        let dh = self.invoke(&functions::messages::GetDhConfig { version: 0, random_length: 256 }).await?;
        let (g, p, server_random) = match dh {
            enums::messages::DhConfig::Config(c) => (c.g, c.p, c.random),
            enums::messages::DhConfig::NotModified(_) => {
                return Err(InvocationError::Deserialize(
                    "dhConfigNotModified without cached config".into(),
                ));
            }
        };
        validate_dh_config(g, &p)?;

        // Our exponent: local randomness XORed with the server-provided bytes.
        let mut a = [0u8; 256];
        getrandom::getrandom(&mut a).map_err(|_| InvocationError::Dropped)?;
        for (dst, srv) in a.iter_mut().zip(server_random.iter()) {
            *dst ^= srv;
        }

        let prime_int = BigUint::from_bytes_be(&p);
        let g_a = BigUint::from(g as u32).modpow(&BigUint::from_bytes_be(&a), &prime_int);
        check_g_value(&g_a, &prime_int)?;

        let mut rnd = [0u8; 4];
        getrandom::getrandom(&mut rnd).map_err(|_| InvocationError::Dropped)?;
        let random_id = i32::from_le_bytes(rnd);

        let chat = self
            .invoke(&functions::messages::RequestEncryption {
                user_id: enums::InputUser::User { user_id, access_hash },
                random_id,
                g_a: g_a.to_bytes_be(),
            })
            .await?;

        let our_id = self.inner.secret_chats.lock().await.our_id;
        let chat_id = match &chat {
            enums::EncryptedChat::Waiting(w) => w.id,
            enums::EncryptedChat::Requested(r) => r.id,
            enums::EncryptedChat::Chat(c) => c.id,
            enums::EncryptedChat::Empty { id } | enums::EncryptedChat::Discarded { id } => *id,
        };

        let mut reg = self.inner.secret_chats.lock().await;
        let record = reg.get_or_create(chat_id, access_hash, user_id as i32, our_id);
        record.state = SecretChatState::Waiting;
        record.prime = p;
        record.g = g;
        record.exponent = a;
        if let enums::EncryptedChat::Waiting(w) = &chat {
            record.access_hash = w.access_hash;
            record.user_id = w.participant_id;
            record.admin_id = w.admin_id;
        }
        let snapshot = record.clone();
        drop(reg);
        self.inner.hooks.new_secret_chat(&snapshot);
        Ok(chat_id)
    }

    /// Accept a pending encryption request (acceptor side).
    pub async fn accept_encryption(&self, chat_id: i32) -> Result<(), InvocationError> {
        let (access_hash, mut g, mut p, g_a) = {
            let reg = self.inner.secret_chats.lock().await;
            let chat = reg.get(chat_id).ok_or(InvocationError::Dropped)?;
            if chat.state != SecretChatState::Request {
                return Err(InvocationError::Deserialize("chat not in request state".into()));
            }
            (chat.access_hash, chat.g, chat.prime.clone(), chat.peer_g_a.clone())
        };

        // The request update carries only g_a; the DH group comes from the
        // server-side config.
        if p.is_empty() {
            let dh = self
                .invoke(&functions::messages::GetDhConfig { version: 0, random_length: 0 })
                .await?;
            match dh {
                enums::messages::DhConfig::Config(c) => {
                    g = c.g;
                    p = c.p;
                }
                enums::messages::DhConfig::NotModified(_) => {
                    return Err(InvocationError::Deserialize(
                        "dhConfigNotModified without cached config".into(),
                    ));
                }
            }
            let mut reg = self.inner.secret_chats.lock().await;
            if let Some(chat) = reg.get_mut(chat_id) {
                chat.g = g;
                chat.prime = p.clone();
            }
        }

        validate_dh_config(g, &p)?;
        let prime_int = BigUint::from_bytes_be(&p);
        let g_a_int = BigUint::from_bytes_be(&g_a);
        check_g_value(&g_a_int, &prime_int)?;

        let mut b = [0u8; 256];
        getrandom::getrandom(&mut b).map_err(|_| InvocationError::Dropped)?;
        let b_int = BigUint::from_bytes_be(&b);
        let g_b = BigUint::from(g as u32).modpow(&b_int, &prime_int);
        check_g_value(&g_b, &prime_int)?;

        let shared = g_a_int.modpow(&b_int, &prime_int);
        let mut key = [0u8; 256];
        let shared_bytes = shared.to_bytes_be();
        key[256 - shared_bytes.len()..].copy_from_slice(&shared_bytes);

        let fingerprint = secret::key_fingerprint(&key);
        self.invoke(&functions::messages::AcceptEncryption {
            peer: enums::InputEncryptedChat::Chat(types::InputEncryptedChat {
                chat_id,
                access_hash,
            }),
            g_b: g_b.to_bytes_be(),
            key_fingerprint: fingerprint,
        })
        .await?;

        let snapshot = {
            let mut reg = self.inner.secret_chats.lock().await;
            let chat = reg.get_mut(chat_id).ok_or(InvocationError::Dropped)?;
            chat.set_key(key);
            chat.state = SecretChatState::Ok;
            chat.clone()
        };
        self.inner.hooks.new_secret_chat(&snapshot);

        // Announce our layer as the first service message.
        self.send_secret_action(chat_id, enums::DecryptedMessageAction::NotifyLayer {
            layer: SECRET_LAYER,
        })
        .await?;
        Ok(())
    }

    /// React to an `updateEncryption` state change.
    pub(crate) async fn handle_encryption_update(&self, chat: enums::EncryptedChat) {
        let our_id = self.inner.secret_chats.lock().await.our_id;
        let snapshot = match chat {
            enums::EncryptedChat::Requested(r) => {
                let mut reg = self.inner.secret_chats.lock().await;
                let record = reg.get_or_create(r.id, r.access_hash, r.admin_id, r.admin_id);
                record.access_hash = r.access_hash;
                record.user_id = r.admin_id; // the requester is the peer
                record.admin_id = r.admin_id;
                record.peer_g_a = r.g_a;
                record.state = SecretChatState::Request;
                Some(record.clone())
            }
            enums::EncryptedChat::Chat(c) => {
                // Confirmation for the initiator: derive the shared key.
                let mut reg = self.inner.secret_chats.lock().await;
                let Some(record) = reg.get_mut(c.id) else {
                    tracing::warn!("encryptedChat for unknown chat {}", c.id);
                    return;
                };
                if record.state == SecretChatState::Waiting {
                    if record.prime.len() != 256 {
                        // Restored without its DH group; the agreement cannot
                        // be completed.
                        tracing::warn!("chat {}: no DH modulus on record, discarding", c.id);
                        record.state = SecretChatState::Deleted;
                        return;
                    }
                    let prime_int = BigUint::from_bytes_be(&record.prime);
                    let g_b = BigUint::from_bytes_be(&c.g_a_or_b);
                    if check_g_value(&g_b, &prime_int).is_err() {
                        tracing::warn!("chat {}: g_b out of range, discarding", c.id);
                        record.state = SecretChatState::Deleted;
                        return;
                    }
                    let shared =
                        g_b.modpow(&BigUint::from_bytes_be(&record.exponent), &prime_int);
                    let mut key = [0u8; 256];
                    let bytes = shared.to_bytes_be();
                    key[256 - bytes.len()..].copy_from_slice(&bytes);
                    let fingerprint = secret::key_fingerprint(&key);
                    if fingerprint != c.key_fingerprint {
                        tracing::warn!("chat {}: fingerprint mismatch, discarding", c.id);
                        record.state = SecretChatState::Deleted;
                        return;
                    }
                    record.set_key(key);
                    record.state = SecretChatState::Ok;
                }
                Some(record.clone())
            }
            enums::EncryptedChat::Waiting(w) => {
                let mut reg = self.inner.secret_chats.lock().await;
                let record = reg.get_or_create(w.id, w.access_hash, w.participant_id, our_id);
                record.state = SecretChatState::Waiting;
                Some(record.clone())
            }
            enums::EncryptedChat::Discarded { id } | enums::EncryptedChat::Empty { id } => {
                let mut reg = self.inner.secret_chats.lock().await;
                if let Some(mut chat) = reg.remove(id) {
                    chat.state = SecretChatState::Deleted;
                    Some(chat)
                } else {
                    None
                }
            }
        };
        if let Some(chat) = snapshot {
            self.inner.hooks.new_secret_chat(&chat);
        }
    }

    /// Send a text message over a secret chat.
    pub async fn send_secret_text(&self, chat_id: i32, text: &str) -> Result<(), InvocationError> {
        let mut rnd = [0u8; 8];
        getrandom::getrandom(&mut rnd).map_err(|_| InvocationError::Dropped)?;
        let random_id = i64::from_le_bytes(rnd);

        let ttl = {
            let reg = self.inner.secret_chats.lock().await;
            reg.get(chat_id).ok_or(InvocationError::Dropped)?.ttl
        };
        let message = enums::DecryptedMessage::Message(types::DecryptedMessageData {
            random_id,
            ttl,
            message: text.to_string(),
            media: enums::DecryptedMessageMedia::Empty,
        });

        let (peer, data) = self.seal_secret_message(chat_id, message).await?;
        self.invoke(&functions::messages::SendEncrypted { peer, random_id, data }).await?;
        Ok(())
    }

    /// Send a service action over a secret chat.
    pub async fn send_secret_action(
        &self,
        chat_id: i32,
        action: enums::DecryptedMessageAction,
    ) -> Result<(), InvocationError> {
        let mut rnd = [0u8; 8];
        getrandom::getrandom(&mut rnd).map_err(|_| InvocationError::Dropped)?;
        let random_id = i64::from_le_bytes(rnd);

        let message = enums::DecryptedMessage::Service(types::DecryptedMessageServiceData {
            random_id,
            action,
        });
        let (peer, data) = self.seal_secret_message(chat_id, message).await?;
        self.invoke(&functions::messages::SendEncryptedService { peer, random_id, data }).await?;
        Ok(())
    }

    /// Frame, sequence and encrypt one outbound secret message.
    pub(crate) async fn seal_secret_message(
        &self,
        chat_id: i32,
        message: enums::DecryptedMessage,
    ) -> Result<(enums::InputEncryptedChat, Vec<u8>), InvocationError> {
        let mut reg = self.inner.secret_chats.lock().await;
        let our_id = reg.our_id;
        let chat = reg.get_mut(chat_id).ok_or(InvocationError::Dropped)?;
        if chat.state != SecretChatState::Ok {
            return Err(InvocationError::Deserialize("secret chat has no key".into()));
        }

        let (in_field, out_field) = chat.next_layer_seq(our_id);
        let mut random_bytes = vec![0u8; 15];
        getrandom::getrandom(&mut random_bytes).map_err(|_| InvocationError::Dropped)?;

        let layer = enums::DecryptedMessageLayer::Layer(types::DecryptedMessageLayer {
            random_bytes,
            layer: chat.layer.min(SECRET_LAYER),
            in_seq_no: in_field,
            out_seq_no: out_field,
            message,
        });

        let data = encrypt_secret_data(&chat.key, chat.key_fingerprint, &layer.to_bytes());
        let peer = enums::InputEncryptedChat::Chat(types::InputEncryptedChat {
            chat_id,
            access_hash: chat.access_hash,
        });
        Ok((peer, data))
    }

    /// Decrypt and sequence-check one inbound secret message.
    pub(crate) async fn handle_encrypted_message(&self, message: enums::EncryptedMessage) {
        let (chat_id, bytes) = match message {
            enums::EncryptedMessage::Message(m) => (m.chat_id, m.bytes),
            enums::EncryptedMessage::Service(m) => (m.chat_id, m.bytes),
        };

        let decrypted = {
            let reg = self.inner.secret_chats.lock().await;
            let Some(chat) = reg.get(chat_id) else {
                tracing::warn!("encrypted message for unknown chat {chat_id}");
                return;
            };
            if chat.state != SecretChatState::Ok {
                tracing::warn!("encrypted message for chat {chat_id} without key");
                return;
            }
            decrypt_secret_data(&chat.key, chat.key_fingerprint, &bytes)
        };

        let payload = match decrypted {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("chat {chat_id}: dropping undecryptable message: {e}");
                return;
            }
        };

        use tangram_tl::Deserializable;
        let layer = match enums::DecryptedMessageLayer::from_bytes(&payload) {
            Ok(enums::DecryptedMessageLayer::Layer(l)) => l,
            Err(e) => {
                tracing::warn!("chat {chat_id}: bad layer envelope: {e}");
                return;
            }
        };

        let verdict = {
            let mut reg = self.inner.secret_chats.lock().await;
            let our_id = reg.our_id;
            let chat = reg.get_mut(chat_id).expect("checked above");
            let verdict = check_incoming_seq(chat, our_id, layer.out_seq_no);
            if verdict == SeqVerdict::Ok {
                chat.in_seq_no += 1;
                chat.last_in_seq_no = layer.in_seq_no >> 1;
                if layer.layer > 0 {
                    chat.layer = layer.layer;
                }
            }
            verdict
        };

        match verdict {
            SeqVerdict::Ok => {}
            SeqVerdict::BadParity => {
                tracing::warn!("chat {chat_id}: seq parity mismatch, dropping");
                return;
            }
            SeqVerdict::Duplicate => {
                tracing::debug!("chat {chat_id}: duplicate secret message, dropping");
                return;
            }
            SeqVerdict::Gap { start, end } => {
                tracing::warn!("chat {chat_id}: seq gap, requesting resend {start}..{end}");
                let _ = self
                    .send_secret_action(
                        chat_id,
                        enums::DecryptedMessageAction::Resend(types::DecryptedMessageActionResend {
                            start_seq_no: start,
                            end_seq_no: end,
                        }),
                    )
                    .await;
                return;
            }
        }

        match layer.message {
            enums::DecryptedMessage::Message(m) => {
                self.inner.hooks.new_secret_message(chat_id, &m);
            }
            enums::DecryptedMessage::Service(s) => {
                self.handle_secret_action(chat_id, s.action).await;
            }
        }
    }

    async fn handle_secret_action(&self, chat_id: i32, action: enums::DecryptedMessageAction) {
        use enums::DecryptedMessageAction as A;
        match action {
            A::SetMessageTtl { ttl_seconds } => {
                if let Some(chat) = self.inner.secret_chats.lock().await.get_mut(chat_id) {
                    chat.ttl = ttl_seconds;
                }
            }
            A::NotifyLayer { layer } => {
                if let Some(chat) = self.inner.secret_chats.lock().await.get_mut(chat_id) {
                    chat.layer = layer;
                }
            }
            A::Resend(r) => {
                // Message history is the host's concern; nothing to replay here.
                tracing::warn!(
                    "chat {chat_id}: peer requested resend {}..{} (unsupported)",
                    r.start_seq_no,
                    r.end_seq_no
                );
            }
            A::Typing { action } => {
                self.inner
                    .hooks
                    .typing_status_changed(chat_id as i64, action == enums::SendMessageAction::Typing);
            }
            A::ReadMessages { .. } | A::DeleteMessages { .. } | A::FlushHistory => {}
        }
    }

    /// Tear down a secret chat on both sides.
    pub async fn discard_encryption(&self, chat_id: i32) -> Result<(), InvocationError> {
        self.invoke(&functions::messages::DiscardEncryption { chat_id }).await?;
        if let Some(mut chat) = self.inner.secret_chats.lock().await.remove(chat_id) {
            chat.state = SecretChatState::Deleted;
            self.inner.hooks.new_secret_chat(&chat);
        }
        Ok(())
    }
}

fn validate_dh_config(g: i32, p: &[u8]) -> Result<(), InvocationError> {
    if !(2..=7).contains(&g) || p.len() != 256 || p[0] & 0x80 == 0 {
        return Err(InvocationError::Deserialize("bad DH config".into()));
    }
    let p_int = BigUint::from_bytes_be(p);
    if !prime::is_safe_prime(&p_int) {
        return Err(InvocationError::Deserialize("DH modulus is not a safe prime".into()));
    }
    Ok(())
}

fn check_g_value(value: &BigUint, modulus: &BigUint) -> Result<(), InvocationError> {
    let one = BigUint::from(1u32);
    let safety = BigUint::from(1u32) << (2048 - 64);
    if value <= &one
        || value >= &(modulus - &one)
        || value < &safety
        || value > &(modulus - &safety)
    {
        return Err(InvocationError::Deserialize("DH value out of range".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat_with_key(admin_id: i32, user_id: i32) -> SecretChat {
        let mut chat = SecretChat::blank(7, 99, user_id, admin_id);
        let mut key = [0u8; 256];
        for (i, b) in key.iter_mut().enumerate() {
            *b = (i * 11 + 1) as u8;
        }
        chat.set_key(key);
        chat.state = SecretChatState::Ok;
        chat
    }

    #[test]
    fn fingerprint_matches_sha1_tail() {
        let chat = chat_with_key(1, 2);
        assert_eq!(chat.key_fingerprint, secret::key_fingerprint(&chat.key));
    }

    #[test]
    fn admin_side_seq_parity() {
        let our_id = 10;
        let mut chat = chat_with_key(our_id, 20);
        // Initiator: in parity 0, out parity 1.
        let (in_field, out_field) = chat.next_layer_seq(our_id);
        assert_eq!(in_field, 0);
        assert_eq!(out_field, 1);
        let (_, out2) = chat.next_layer_seq(our_id);
        assert_eq!(out2, 3);
    }

    #[test]
    fn participant_side_seq_parity() {
        let our_id = 20;
        let mut chat = chat_with_key(10, 20);
        // Acceptor: in parity 1, out parity 0.
        let (in_field, out_field) = chat.next_layer_seq(our_id);
        assert_eq!(in_field, 1);
        assert_eq!(out_field, 0);
    }

    #[test]
    fn incoming_seq_classification() {
        let our_id = 10;
        let mut chat = chat_with_key(our_id, 20);
        // Peer's parity is 0 (we are admin).
        assert_eq!(check_incoming_seq(&chat, our_id, 0), SeqVerdict::Ok);
        assert_eq!(check_incoming_seq(&chat, our_id, 1), SeqVerdict::BadParity);

        chat.in_seq_no = 2;
        assert_eq!(check_incoming_seq(&chat, our_id, 2), SeqVerdict::Duplicate);
        assert_eq!(check_incoming_seq(&chat, our_id, 4), SeqVerdict::Ok);
        assert_eq!(
            check_incoming_seq(&chat, our_id, 8),
            SeqVerdict::Gap { start: 4, end: 8 }
        );
    }

    #[test]
    fn secret_payload_roundtrip() {
        let chat = chat_with_key(1, 2);
        let payload: Vec<u8> = (0u8..40).collect(); // multiple of 4
        let blob = encrypt_secret_data(&chat.key, chat.key_fingerprint, &payload);

        assert_eq!(i64::from_le_bytes(blob[..8].try_into().unwrap()), chat.key_fingerprint);
        let back = decrypt_secret_data(&chat.key, chat.key_fingerprint, &blob).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn wrong_fingerprint_is_rejected() {
        let chat = chat_with_key(1, 2);
        let blob = encrypt_secret_data(&chat.key, chat.key_fingerprint, &[0u8; 16]);
        assert_eq!(
            decrypt_secret_data(&chat.key, chat.key_fingerprint ^ 1, &blob),
            Err(SecretError::FingerprintMismatch)
        );
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let chat = chat_with_key(1, 2);
        let mut blob = encrypt_secret_data(&chat.key, chat.key_fingerprint, &[7u8; 32]);
        let last = blob.len() - 1;
        blob[last] ^= 0x80;
        let err = decrypt_secret_data(&chat.key, chat.key_fingerprint, &blob).unwrap_err();
        assert!(matches!(err, SecretError::MsgKeyMismatch | SecretError::BadLength));
    }
}
