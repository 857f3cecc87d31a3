//! Encrypted session: envelope pack/unpack over an established auth key.
//!
//! Outbound layout (everything after `msg_key` is encrypted):
//!
//! ```text
//! auth_key_id : u64
//! msg_key     : [u8;16]   = sha1(salt ‖ … ‖ payload)[4..20]
//! server_salt : i64
//! session_id  : i64
//! msg_id      : i64
//! seq_no      : i32
//! msg_len     : u32       multiple of 4
//! payload     : [u8;msg_len], then 0..12 bytes random pad
//! ```

use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

use tangram_crypto::{
    calc_msg_key, decrypt_data, encrypt_data, AuthKey, DequeBuffer,
};
use tangram_tl::{RemoteCall, Serializable};

use crate::message::MessageId;

/// Inbound messages older than this (seconds) force a session restart.
const MSG_ID_WINDOW_PAST: i64 = 300;
/// Inbound messages further in the future than this force a session restart.
const MSG_ID_WINDOW_FUTURE: i64 = 30;

/// Errors that can occur when decrypting a server envelope.
#[derive(Clone, Debug, PartialEq)]
pub enum DecryptError {
    /// The crypto layer rejected the buffer.
    Crypto(tangram_crypto::DecryptError),
    /// The decrypted inner message was too short for a valid header.
    FrameTooShort,
    /// `session_id` does not match this session.
    SessionMismatch,
    /// Recomputed `msg_key` differs from the transmitted one.
    MsgKeyMismatch,
    /// `msg_len` is not a 4-byte multiple or does not fit the buffer.
    BadLength {
        /// The transmitted length.
        msg_len: usize,
        /// Decrypted bytes available after the header.
        available: usize,
    },
    /// The message id falls outside the accepted time window.
    MsgIdOutOfWindow {
        /// The offending id.
        msg_id: i64,
    },
}

impl std::fmt::Display for DecryptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Crypto(e) => write!(f, "crypto: {e}"),
            Self::FrameTooShort => write!(f, "inner plaintext too short"),
            Self::SessionMismatch => write!(f, "session_id mismatch"),
            Self::MsgKeyMismatch => write!(f, "msg_key mismatch"),
            Self::BadLength { msg_len, available } => {
                write!(f, "bad msg_len {msg_len} (available {available})")
            }
            Self::MsgIdOutOfWindow { msg_id } => {
                write!(f, "msg_id {msg_id} outside accepted time window")
            }
        }
    }
}
impl std::error::Error for DecryptError {}

impl DecryptError {
    /// True when the right recovery is a new session on the same DC rather
    /// than a reconnect.
    pub fn requires_new_session(&self) -> bool {
        matches!(self, Self::SessionMismatch | Self::MsgIdOutOfWindow { .. })
    }
}

/// The inner payload extracted from a successfully decrypted server frame.
#[derive(Debug)]
pub struct DecryptedMessage {
    /// `salt` sent by the server.
    pub salt: i64,
    /// The `session_id` from the frame.
    pub session_id: i64,
    /// The `msg_id` of the inner message.
    pub msg_id: i64,
    /// `seq_no` of the inner message.
    pub seq_no: i32,
    /// TL-serialized body.
    pub body: Vec<u8>,
}

/// Encrypted session state: one logical message stream over a connection.
pub struct EncryptedSession {
    auth_key: AuthKey,
    session_id: i64,
    sequence: i32,
    last_msg_id: i64,
    pending_acks: BTreeSet<i64>,
    received_count: u64,
    /// Current server salt for outgoing messages.
    pub salt: i64,
    /// Clock skew in seconds vs. the server.
    pub time_offset: i32,
}

impl EncryptedSession {
    /// Create a new session from a finished handshake (or persisted key).
    pub fn new(auth_key: [u8; 256], first_salt: i64, time_offset: i32) -> Self {
        let mut rnd = [0u8; 8];
        getrandom::getrandom(&mut rnd).expect("getrandom");
        Self::with_session_id(auth_key, first_salt, time_offset, i64::from_le_bytes(rnd))
    }

    /// Create with an explicit session id (tests, session restore).
    pub fn with_session_id(
        auth_key: [u8; 256],
        first_salt: i64,
        time_offset: i32,
        session_id: i64,
    ) -> Self {
        Self {
            auth_key: AuthKey::from_bytes(auth_key),
            session_id,
            sequence: 0,
            last_msg_id: 0,
            pending_acks: BTreeSet::new(),
            received_count: 0,
            salt: first_salt,
            time_offset,
        }
    }

    /// Next strictly-increasing message id.
    pub fn next_msg_id(&mut self) -> i64 {
        let id = MessageId::generate(self.last_msg_id, self.time_offset);
        self.last_msg_id = id.0;
        id.0
    }

    fn next_seq_no(&mut self, content_related: bool) -> i32 {
        if content_related {
            let n = self.sequence * 2 + 1;
            self.sequence += 1;
            n
        } else {
            self.sequence * 2
        }
    }

    fn build_inner(&mut self, body: &[u8], content_related: bool) -> (DequeBuffer, i64) {
        let msg_id = self.next_msg_id();
        let seq_no = self.next_seq_no(content_related);
        let mut buf = DequeBuffer::with_capacity(32 + body.len(), 24);
        buf.extend(self.salt.to_le_bytes());
        buf.extend(self.session_id.to_le_bytes());
        buf.extend(msg_id.to_le_bytes());
        buf.extend(seq_no.to_le_bytes());
        buf.extend((body.len() as u32).to_le_bytes());
        buf.extend(body.iter().copied());
        (buf, msg_id)
    }

    /// Encrypt a content-related request. Returns wire bytes and the msg id
    /// allocated for it (for pending-query registration).
    pub fn pack<R: RemoteCall>(&mut self, call: &R) -> (Vec<u8>, i64) {
        self.pack_serializable(call)
    }

    /// Like [`EncryptedSession::pack`] for payloads that are `Serializable`
    /// but not `RemoteCall` (wrappers like `invokeWithLayer`).
    pub fn pack_serializable<S: Serializable>(&mut self, call: &S) -> (Vec<u8>, i64) {
        let (wire, msg_id, _) = self.pack_with_seq(call);
        (wire, msg_id)
    }

    /// Pack a content-related payload, also reporting the seq no used —
    /// the query manager stores it for container-wrapped re-sends.
    pub fn pack_with_seq<S: Serializable>(&mut self, call: &S) -> (Vec<u8>, i64, i32) {
        let body = call.to_bytes();
        let (mut buf, msg_id) = self.build_inner(&body, true);
        let seq_no = self.sequence * 2 - 1;
        encrypt_data(&mut buf, &self.auth_key);
        (buf.as_ref().to_vec(), msg_id, seq_no)
    }

    /// Encrypt a content-unrelated service message (`msgs_ack`, `ping`).
    pub fn pack_unrelated<S: Serializable>(&mut self, call: &S) -> (Vec<u8>, i64) {
        let body = call.to_bytes();
        let (mut buf, msg_id) = self.build_inner(&body, false);
        encrypt_data(&mut buf, &self.auth_key);
        (buf.as_ref().to_vec(), msg_id)
    }

    /// Encrypt a payload under a caller-chosen msg id.
    ///
    /// Needed by the temp-key bind, whose inner message must carry the same
    /// msg id as the outer `auth.bindTempAuthKey` RPC.
    pub fn pack_with_msg_id<S: Serializable>(&mut self, call: &S, msg_id: i64) -> Vec<u8> {
        let body = call.to_bytes();
        let seq_no = self.next_seq_no(true);
        let mut buf = DequeBuffer::with_capacity(32 + body.len(), 24);
        buf.extend(self.salt.to_le_bytes());
        buf.extend(self.session_id.to_le_bytes());
        buf.extend(msg_id.to_le_bytes());
        buf.extend(seq_no.to_le_bytes());
        buf.extend((body.len() as u32).to_le_bytes());
        buf.extend(body.iter().copied());
        encrypt_data(&mut buf, &self.auth_key);
        buf.as_ref().to_vec()
    }

    /// Re-send a previously sent payload under its original msg id, wrapped
    /// in a single-element container so the server treats it idempotently.
    pub fn pack_resend(&mut self, orig_msg_id: i64, orig_seq_no: i32, payload: &[u8]) -> (Vec<u8>, i64) {
        let mut body = Vec::with_capacity(4 + 4 + 16 + payload.len());
        body.extend(0x73f1f8dcu32.to_le_bytes()); // msg_container
        body.extend(1i32.to_le_bytes());
        body.extend(orig_msg_id.to_le_bytes());
        body.extend(orig_seq_no.to_le_bytes());
        body.extend((payload.len() as i32).to_le_bytes());
        body.extend_from_slice(payload);

        let (mut buf, msg_id) = self.build_inner(&body, false);
        encrypt_data(&mut buf, &self.auth_key);
        (buf.as_ref().to_vec(), msg_id)
    }

    /// Decrypt and validate a server frame.
    pub fn unpack(&mut self, frame: &mut [u8]) -> Result<DecryptedMessage, DecryptError> {
        let (msg_key, plain) = decrypt_data(frame, &self.auth_key).map_err(DecryptError::Crypto)?;

        if plain.len() < 32 {
            return Err(DecryptError::FrameTooShort);
        }

        let salt = i64::from_le_bytes(plain[..8].try_into().unwrap());
        let session_id = i64::from_le_bytes(plain[8..16].try_into().unwrap());
        let msg_id = i64::from_le_bytes(plain[16..24].try_into().unwrap());
        let seq_no = i32::from_le_bytes(plain[24..28].try_into().unwrap());
        let msg_len = u32::from_le_bytes(plain[28..32].try_into().unwrap()) as usize;

        let available = plain.len() - 32;
        if msg_len == 0 || msg_len % 4 != 0 || msg_len > available || available - msg_len > 12 {
            return Err(DecryptError::BadLength { msg_len, available });
        }
        if calc_msg_key(&plain[..32 + msg_len]) != msg_key {
            return Err(DecryptError::MsgKeyMismatch);
        }
        if session_id != self.session_id {
            return Err(DecryptError::SessionMismatch);
        }

        let server_now = self.server_time();
        let msg_time = msg_id >> 32;
        if msg_time < server_now - MSG_ID_WINDOW_PAST || msg_time > server_now + MSG_ID_WINDOW_FUTURE {
            return Err(DecryptError::MsgIdOutOfWindow { msg_id });
        }

        // First envelope after connect refines the server-time estimate.
        if self.received_count == 0 {
            self.adopt_time_from(msg_id);
        }
        self.received_count += 1;

        let body = plain[32..32 + msg_len].to_vec();
        Ok(DecryptedMessage { salt, session_id, msg_id, seq_no, body })
    }

    /// Current server-time estimate in Unix seconds.
    pub fn server_time(&self) -> i64 {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        now.as_secs() as i64 + self.time_offset as i64
    }

    /// Adjust the clock-skew estimate from a server-issued message id.
    pub fn adopt_time_from(&mut self, msg_id: i64) {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        self.time_offset = ((msg_id >> 32) - now.as_secs() as i64) as i32;
    }

    /// Buffer an inbound content-related message id for acknowledgement.
    pub fn push_ack(&mut self, msg_id: i64) {
        self.pending_acks.insert(msg_id);
    }

    /// True if acks are waiting for the flush timer.
    pub fn has_pending_acks(&self) -> bool {
        !self.pending_acks.is_empty()
    }

    /// Drain the buffered ack set.
    pub fn take_acks(&mut self) -> Vec<i64> {
        std::mem::take(&mut self.pending_acks).into_iter().collect()
    }

    /// How many envelopes this session has decrypted.
    pub fn received_count(&self) -> u64 {
        self.received_count
    }

    /// The auth key bytes (for persistence).
    pub fn auth_key_bytes(&self) -> [u8; 256] {
        self.auth_key.to_bytes()
    }

    /// The auth key identifier on the wire.
    pub fn auth_key_id(&self) -> i64 {
        self.auth_key.key_id_u64() as i64
    }

    /// The session id.
    pub fn session_id(&self) -> i64 {
        self.session_id
    }
}
