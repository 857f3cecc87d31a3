//! One TCP link to one DC: framing, handshake, envelope receive loop.
//!
//! The ping schedule and reconnect policy follow the transport rules: with a
//! 10 s base interval, a ping goes out after 3 intervals without an inbound
//! frame and the connection is declared dead after 6. Reconnects back off
//! exponentially (capped at 10 s) and rotate the TCP port through
//! 443 → 80 → 25 to survive middlebox filtering.

use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use tangram_crypto::rsa::Keyring;
use tangram_mtproto::authentication::{self as auth, KeyKind};
use tangram_mtproto::envelope::{self, InboundMessage, ServerMessage};
use tangram_mtproto::transport::{encode_frame, Deframer, INIT_BYTE};
use tangram_mtproto::{EncryptedSession, Session};
use tangram_tl::{enums, functions, types, Cursor, Deserializable, Serializable};

use crate::errors::InvocationError;

/// Base ping interval in seconds.
pub const PING_INTERVAL: u64 = 10;
/// Send a ping after this long without any inbound frame.
pub const PING_AFTER: Duration = Duration::from_secs(3 * PING_INTERVAL);
/// Declare the connection dead after this long without any inbound frame.
pub const DEAD_AFTER: Duration = Duration::from_secs(6 * PING_INTERVAL);
/// Reconnect backoff cap.
pub const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Next TCP port in the rotation cycle.
pub fn rotate_port(port: u16) -> u16 {
    match port {
        443 => 80,
        80 => 25,
        _ => 443,
    }
}

/// Exponentially damped restart delay for the given consecutive-failure count.
pub fn backoff_delay(fail_count: u32) -> Duration {
    let secs = 1u64 << fail_count.min(4);
    Duration::from_secs(secs).min(MAX_BACKOFF)
}

/// Outcome of negotiating keys on a fresh link.
pub struct NegotiatedKeys {
    /// The permanent key (exchange output or the persisted one).
    pub perm_key: [u8; 256],
    /// Temp key, when PFS was requested.
    pub temp_key: Option<[u8; 256]>,
    /// First server salt.
    pub first_salt: i64,
    /// Clock skew.
    pub time_offset: i32,
    /// Keyring entry that signed the exchange.
    pub rsa_key_idx: usize,
}

/// A live encrypted connection to one DC.
pub struct Connection {
    stream: TcpStream,
    deframer: Deframer,
    init_sent: bool,
    /// The session speaking over this link (temp key under PFS).
    pub session: EncryptedSession,
    /// Permanent key backing the link.
    pub perm_key: [u8; 256],
    /// Temp key when PFS is active.
    pub temp_key: Option<[u8; 256]>,
    /// When the last inbound frame arrived.
    pub last_frame_at: Instant,
    /// When we last sent a ping probe.
    pub last_ping_at: Option<Instant>,
}

impl Connection {
    // ── Establishment ──────────────────────────────────────────────────────

    /// Dial and run the full DH handshake (plus temp key + bind under PFS).
    pub async fn connect_raw(
        addr: &str,
        keyring: &Keyring,
        pfs: Option<i32>,
    ) -> Result<(Self, NegotiatedKeys), InvocationError> {
        tracing::info!("connecting to {addr} …");
        let stream = TcpStream::connect(addr).await?;
        let mut conn = Self::bare(stream);

        let perm = conn.run_handshake(keyring, KeyKind::Permanent).await?;
        tracing::info!("DH complete for {addr}");

        let keys = match pfs {
            None => {
                conn.session =
                    EncryptedSession::new(perm.auth_key, perm.first_salt, perm.time_offset);
                NegotiatedKeys {
                    perm_key: perm.auth_key,
                    temp_key: None,
                    first_salt: perm.first_salt,
                    time_offset: perm.time_offset,
                    rsa_key_idx: perm.rsa_key_idx,
                }
            }
            Some(expires_in) => {
                let temp =
                    conn.run_handshake(keyring, KeyKind::Temporary { expires_in }).await?;
                conn.session =
                    EncryptedSession::new(temp.auth_key, temp.first_salt, temp.time_offset);
                conn.bind_temp_key(&perm.auth_key, &temp.auth_key, expires_in).await?;
                tracing::info!("temp key bound for {addr}");
                NegotiatedKeys {
                    perm_key: perm.auth_key,
                    temp_key: Some(temp.auth_key),
                    first_salt: temp.first_salt,
                    time_offset: temp.time_offset,
                    rsa_key_idx: perm.rsa_key_idx,
                }
            }
        };

        conn.perm_key = keys.perm_key;
        conn.temp_key = keys.temp_key;
        Ok((conn, keys))
    }

    /// Dial with an already-known permanent key (no DH).
    pub async fn connect_with_key(
        addr: &str,
        auth_key: [u8; 256],
        first_salt: i64,
        time_offset: i32,
    ) -> Result<Self, InvocationError> {
        let stream = TcpStream::connect(addr).await?;
        let mut conn = Self::bare(stream);
        conn.session = EncryptedSession::new(auth_key, first_salt, time_offset);
        conn.perm_key = auth_key;
        Ok(conn)
    }

    fn bare(stream: TcpStream) -> Self {
        Self {
            stream,
            deframer: Deframer::new(),
            init_sent: false,
            session: EncryptedSession::new([0u8; 256], 0, 0),
            perm_key: [0u8; 256],
            temp_key: None,
            last_frame_at: Instant::now(),
            last_ping_at: None,
        }
    }

    async fn run_handshake(
        &mut self,
        keyring: &Keyring,
        kind: KeyKind,
    ) -> Result<auth::Finished, InvocationError> {
        let mut plain = Session::new();

        let (req1, s1) = auth::step1(kind)?;
        self.send_frame(&plain.pack(&req1).to_plaintext_bytes()).await?;
        let res_pq: enums::ResPq = self.recv_plain_frame().await?;

        let (req2, s2) = auth::step2(keyring, s1, res_pq)?;
        self.send_frame(&plain.pack(&req2).to_plaintext_bytes()).await?;
        let dh: enums::ServerDhParams = self.recv_plain_frame().await?;

        let (req3, s3) = auth::step3(s2, dh)?;
        self.send_frame(&plain.pack(&req3).to_plaintext_bytes()).await?;
        let answer: enums::SetClientDhParamsAnswer = self.recv_plain_frame().await?;

        Ok(auth::finish(s3, answer)?)
    }

    /// Bind the temp key to the permanent one over the temp-key session.
    async fn bind_temp_key(
        &mut self,
        perm_key: &[u8; 256],
        temp_key: &[u8; 256],
        expires_in: i32,
    ) -> Result<(), InvocationError> {
        let perm = tangram_crypto::AuthKey::from_bytes(*perm_key);
        let temp = tangram_crypto::AuthKey::from_bytes(*temp_key);

        let mut rnd = [0u8; 8];
        getrandom::getrandom(&mut rnd).map_err(|_| InvocationError::Dropped)?;
        let nonce = i64::from_le_bytes(rnd);
        let expires_at = self.session.server_time() as i32 + expires_in;

        let msg_id = self.session.next_msg_id();
        let inner = types::BindAuthKeyInner {
            nonce,
            temp_auth_key_id: temp.key_id_u64() as i64,
            perm_auth_key_id: perm.key_id_u64() as i64,
            temp_session_id: self.session.session_id(),
            expires_at,
        };
        let encrypted_message = auth::encrypt_bind_message(&perm, &inner, msg_id);

        let bind = functions::auth::BindTempAuthKey {
            perm_auth_key_id: perm.key_id_u64() as i64,
            nonce,
            expires_at,
            encrypted_message,
        };
        let wire = self.session.pack_with_msg_id(&bind, msg_id);
        self.send_frame(&wire).await?;

        // The bind answer is a plain Bool rpc_result on the temp session.
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(InvocationError::Dropped);
            }
            let msgs = tokio::time::timeout(remaining, self.recv_envelope())
                .await
                .map_err(|_| InvocationError::Dropped)??;
            for msg in msgs {
                match msg.payload {
                    ServerMessage::RpcResult { req_msg_id, body } if req_msg_id == msg_id => {
                        let ok = bool::from_bytes(&body).unwrap_or(false);
                        if ok {
                            return Ok(());
                        }
                        return Err(InvocationError::Dropped);
                    }
                    ServerMessage::RpcError { req_msg_id, error } if req_msg_id == msg_id => {
                        return Err(InvocationError::Rpc(
                            crate::errors::RpcError::from_server(
                                error.error_code,
                                &error.error_message,
                            ),
                        ));
                    }
                    _ => {}
                }
            }
        }
    }

    // ── Framed IO ──────────────────────────────────────────────────────────

    /// Write one framed message, emitting the init byte on first use.
    pub async fn send_frame(&mut self, data: &[u8]) -> Result<(), InvocationError> {
        if !self.init_sent {
            self.stream.write_all(&[INIT_BYTE]).await?;
            self.init_sent = true;
        }
        self.stream.write_all(&encode_frame(data)).await?;
        Ok(())
    }

    /// Read socket bytes until a complete frame is buffered.
    async fn recv_frame(&mut self) -> Result<Vec<u8>, InvocationError> {
        loop {
            match self.deframer.next_frame() {
                Ok(Some(frame)) => {
                    self.last_frame_at = Instant::now();
                    return Ok(frame);
                }
                Ok(None) => {}
                Err(e) => {
                    return Err(InvocationError::Deserialize(e.to_string()));
                }
            }
            let mut buf = [0u8; 4096];
            let n = self.stream.read(&mut buf).await?;
            if n == 0 {
                return Err(InvocationError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed",
                )));
            }
            self.deframer.push(&buf[..n]);
        }
    }

    async fn recv_plain_frame<T: Deserializable>(&mut self) -> Result<T, InvocationError> {
        let raw = self.recv_frame().await?;
        if raw.len() < 20 {
            return Err(InvocationError::Deserialize("plain frame too short".into()));
        }
        if i64::from_le_bytes(raw[..8].try_into().unwrap()) != 0 {
            return Err(InvocationError::Deserialize("expected auth_key_id=0".into()));
        }
        let body_len = u32::from_le_bytes(raw[16..20].try_into().unwrap()) as usize;
        if raw.len() < 20 + body_len {
            return Err(InvocationError::Deserialize("plain frame truncated".into()));
        }
        let mut cur = Cursor::from_slice(&raw[20..20 + body_len]);
        T::deserialize(&mut cur).map_err(Into::into)
    }

    /// Receive one encrypted envelope, decrypt, validate, dispatch.
    ///
    /// Adopts the envelope salt, buffers acks for content-related children
    /// and returns the flattened messages.
    pub async fn recv_envelope(&mut self) -> Result<Vec<InboundMessage>, InvocationError> {
        loop {
            let mut frame = self.recv_frame().await?;
            // 4-byte frames carry a transport-level error code.
            if frame.len() == 4 {
                let code = i32::from_le_bytes(frame[..4].try_into().unwrap());
                return Err(InvocationError::Deserialize(format!("transport error {code}")));
            }
            let msg = match self.session.unpack(&mut frame) {
                Ok(msg) => msg,
                Err(e) if e.requires_new_session() => {
                    return Err(InvocationError::Deserialize(e.to_string()));
                }
                Err(e) => {
                    tracing::warn!("dropping bad envelope: {e}");
                    continue;
                }
            };
            if msg.salt != 0 {
                self.session.salt = msg.salt;
            }
            let parsed = envelope::parse_payload(msg.msg_id, msg.seq_no, &msg.body)?;
            for m in &parsed {
                if m.wants_ack() {
                    self.session.push_ack(m.msg_id);
                }
            }
            return Ok(parsed);
        }
    }

    /// Send a ping probe (content-unrelated).
    pub async fn send_ping(&mut self) -> Result<(), InvocationError> {
        let mut rnd = [0u8; 8];
        getrandom::getrandom(&mut rnd).map_err(|_| InvocationError::Dropped)?;
        let ping = functions::Ping { ping_id: i64::from_le_bytes(rnd) };
        let (wire, _) = self.session.pack_unrelated(&ping);
        self.last_ping_at = Some(Instant::now());
        self.send_frame(&wire).await
    }

    /// Flush buffered acks as a single `msgs_ack` (not content-related).
    pub async fn flush_acks(&mut self) -> Result<(), InvocationError> {
        if !self.session.has_pending_acks() {
            return Ok(());
        }
        let ack = types::MsgsAck { msg_ids: self.session.take_acks() };
        let mut body = 0x62d6b459u32.to_le_bytes().to_vec();
        ack.serialize(&mut body);
        let (wire, _) = {
            let raw = RawBody(body);
            self.session.pack_unrelated(&raw)
        };
        self.send_frame(&wire).await
    }

    /// Send an already-serialized request as content-related, returning its
    /// msg id and seq no.
    pub async fn send_query_payload(
        &mut self,
        payload: &[u8],
    ) -> Result<(i64, i32), InvocationError> {
        let raw = RawBody(payload.to_vec());
        let (wire, msg_id, seq_no) = self.session.pack_with_seq(&raw);
        self.send_frame(&wire).await?;
        Ok((msg_id, seq_no))
    }

    /// How long since the last inbound frame.
    pub fn idle_for(&self) -> Duration {
        self.last_frame_at.elapsed()
    }
}

/// Pre-serialized TL body used where the request is stored as raw bytes.
pub(crate) struct RawBody(pub Vec<u8>);

impl Serializable for RawBody {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        buf.extend(self.0.iter().copied());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_rotation_cycles() {
        assert_eq!(rotate_port(443), 80);
        assert_eq!(rotate_port(80), 25);
        assert_eq!(rotate_port(25), 443);
        assert_eq!(rotate_port(8080), 443);
    }

    #[test]
    fn backoff_is_damped_and_capped() {
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2), Duration::from_secs(4));
        assert_eq!(backoff_delay(3), Duration::from_secs(8));
        assert_eq!(backoff_delay(4), MAX_BACKOFF);
        assert_eq!(backoff_delay(30), MAX_BACKOFF);
    }
}
