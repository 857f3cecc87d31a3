//! Session persistence: DC keys, update counters, secret chats.
//!
//! The host owns durability; the core hands it a [`PersistedSession`] through
//! a [`SessionBackend`]. The binary format is versioned and self-contained.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::secret_chat::{SecretChat, SecretChatState};

const MAGIC: &[u8; 4] = b"TGM1";

/// One persisted DC record.
#[derive(Clone)]
pub struct DcRecord {
    /// DC id.
    pub dc_id: i32,
    /// Dial address (`host:port`).
    pub addr: String,
    /// Permanent auth key, if negotiated.
    pub auth_key: Option<[u8; 256]>,
    /// Last server salt.
    pub salt: i64,
    /// Clock skew.
    pub time_offset: i32,
}

/// Everything worth surviving a restart.
#[derive(Clone, Default)]
pub struct PersistedSession {
    /// Working DC id.
    pub home_dc_id: i32,
    /// Our user id once logged in.
    pub self_id: i64,
    /// Per-DC records.
    pub dcs: Vec<DcRecord>,
    /// Update counters: pts, qts, seq, date.
    pub counters: (i32, i32, i32, i32),
    /// Per-channel pts.
    pub channel_pts: HashMap<i64, i32>,
    /// Secret chats with their keys and seq state.
    pub secret_chats: Vec<SecretChat>,
}

impl PersistedSession {
    /// Serialize to the binary session format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(MAGIC);
        b.extend_from_slice(&self.home_dc_id.to_le_bytes());
        b.extend_from_slice(&self.self_id.to_le_bytes());

        b.push(self.dcs.len() as u8);
        for dc in &self.dcs {
            b.extend_from_slice(&dc.dc_id.to_le_bytes());
            match &dc.auth_key {
                Some(k) => {
                    b.push(1);
                    b.extend_from_slice(k);
                }
                None => b.push(0),
            }
            b.extend_from_slice(&dc.salt.to_le_bytes());
            b.extend_from_slice(&dc.time_offset.to_le_bytes());
            let ab = dc.addr.as_bytes();
            b.push(ab.len() as u8);
            b.extend_from_slice(ab);
        }

        let (pts, qts, seq, date) = self.counters;
        for v in [pts, qts, seq, date] {
            b.extend_from_slice(&v.to_le_bytes());
        }

        b.extend_from_slice(&(self.channel_pts.len() as u32).to_le_bytes());
        let mut channels: Vec<_> = self.channel_pts.iter().collect();
        channels.sort();
        for (id, pts) in channels {
            b.extend_from_slice(&id.to_le_bytes());
            b.extend_from_slice(&pts.to_le_bytes());
        }

        b.extend_from_slice(&(self.secret_chats.len() as u32).to_le_bytes());
        for chat in &self.secret_chats {
            b.extend_from_slice(&chat.id.to_le_bytes());
            b.extend_from_slice(&chat.access_hash.to_le_bytes());
            b.extend_from_slice(&chat.user_id.to_le_bytes());
            b.extend_from_slice(&chat.admin_id.to_le_bytes());
            b.push(match chat.state {
                SecretChatState::None => 0,
                SecretChatState::Waiting => 1,
                SecretChatState::Request => 2,
                SecretChatState::Ok => 3,
                SecretChatState::Deleted => 4,
            });
            b.extend_from_slice(&chat.key);
            b.extend_from_slice(&chat.ttl.to_le_bytes());
            b.extend_from_slice(&chat.layer.to_le_bytes());
            b.extend_from_slice(&chat.in_seq_no.to_le_bytes());
            b.extend_from_slice(&chat.out_seq_no.to_le_bytes());
            b.extend_from_slice(&chat.last_in_seq_no.to_le_bytes());
            // Handshake material: a chat persisted mid-agreement must be
            // able to finish it after a restart.
            b.extend_from_slice(&chat.g.to_le_bytes());
            b.extend_from_slice(&(chat.prime.len() as u32).to_le_bytes());
            b.extend_from_slice(&chat.prime);
            b.extend_from_slice(&chat.exponent);
            b.extend_from_slice(&(chat.peer_g_a.len() as u32).to_le_bytes());
            b.extend_from_slice(&chat.peer_g_a);
        }
        b
    }

    /// Parse the binary session format.
    pub fn from_bytes(buf: &[u8]) -> io::Result<Self> {
        let mut p = 0usize;
        macro_rules! take {
            ($n:expr) => {{
                if p + $n > buf.len() {
                    return Err(io::Error::new(io::ErrorKind::InvalidData, "truncated session"));
                }
                let s = &buf[p..p + $n];
                p += $n;
                s
            }};
        }

        if take!(4) != MAGIC {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "bad session magic"));
        }
        let home_dc_id = i32::from_le_bytes(take!(4).try_into().unwrap());
        let self_id = i64::from_le_bytes(take!(8).try_into().unwrap());

        let dc_count = take!(1)[0] as usize;
        let mut dcs = Vec::with_capacity(dc_count);
        for _ in 0..dc_count {
            let dc_id = i32::from_le_bytes(take!(4).try_into().unwrap());
            let auth_key = if take!(1)[0] == 1 {
                let mut k = [0u8; 256];
                k.copy_from_slice(take!(256));
                Some(k)
            } else {
                None
            };
            let salt = i64::from_le_bytes(take!(8).try_into().unwrap());
            let time_offset = i32::from_le_bytes(take!(4).try_into().unwrap());
            let al = take!(1)[0] as usize;
            let addr = String::from_utf8_lossy(take!(al)).into_owned();
            dcs.push(DcRecord { dc_id, addr, auth_key, salt, time_offset });
        }

        let pts = i32::from_le_bytes(take!(4).try_into().unwrap());
        let qts = i32::from_le_bytes(take!(4).try_into().unwrap());
        let seq = i32::from_le_bytes(take!(4).try_into().unwrap());
        let date = i32::from_le_bytes(take!(4).try_into().unwrap());

        let channel_count = u32::from_le_bytes(take!(4).try_into().unwrap()) as usize;
        let mut channel_pts = HashMap::with_capacity(channel_count);
        for _ in 0..channel_count {
            let id = i64::from_le_bytes(take!(8).try_into().unwrap());
            let cpts = i32::from_le_bytes(take!(4).try_into().unwrap());
            channel_pts.insert(id, cpts);
        }

        let chat_count = u32::from_le_bytes(take!(4).try_into().unwrap()) as usize;
        let mut secret_chats = Vec::with_capacity(chat_count);
        for _ in 0..chat_count {
            let id = i32::from_le_bytes(take!(4).try_into().unwrap());
            let access_hash = i64::from_le_bytes(take!(8).try_into().unwrap());
            let user_id = i32::from_le_bytes(take!(4).try_into().unwrap());
            let admin_id = i32::from_le_bytes(take!(4).try_into().unwrap());
            let state = match take!(1)[0] {
                1 => SecretChatState::Waiting,
                2 => SecretChatState::Request,
                3 => SecretChatState::Ok,
                4 => SecretChatState::Deleted,
                _ => SecretChatState::None,
            };
            let mut key = [0u8; 256];
            key.copy_from_slice(take!(256));
            let ttl = i32::from_le_bytes(take!(4).try_into().unwrap());
            let layer = i32::from_le_bytes(take!(4).try_into().unwrap());
            let in_seq_no = i32::from_le_bytes(take!(4).try_into().unwrap());
            let out_seq_no = i32::from_le_bytes(take!(4).try_into().unwrap());
            let last_in_seq_no = i32::from_le_bytes(take!(4).try_into().unwrap());
            let g = i32::from_le_bytes(take!(4).try_into().unwrap());
            let prime_len = u32::from_le_bytes(take!(4).try_into().unwrap()) as usize;
            if prime_len > 256 {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "oversized DH modulus"));
            }
            let prime = take!(prime_len).to_vec();
            let mut exponent = [0u8; 256];
            exponent.copy_from_slice(take!(256));
            let g_a_len = u32::from_le_bytes(take!(4).try_into().unwrap()) as usize;
            if g_a_len > 256 {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "oversized DH share"));
            }
            let peer_g_a = take!(g_a_len).to_vec();

            let mut chat = SecretChat {
                id,
                access_hash,
                user_id,
                admin_id,
                state,
                key: [0u8; 256],
                key_fingerprint: 0,
                prime,
                g,
                exponent,
                peer_g_a,
                ttl,
                layer,
                in_seq_no,
                out_seq_no,
                last_in_seq_no,
            };
            if state == SecretChatState::Ok {
                chat.set_key(key);
            }
            // A half-open handshake without its DH group cannot be resumed;
            // drop it rather than let a late confirmation hit a zero modulus.
            if matches!(chat.state, SecretChatState::Waiting | SecretChatState::Request)
                && chat.prime.len() != 256
            {
                chat.state = SecretChatState::Deleted;
            }
            secret_chats.push(chat);
        }

        Ok(Self {
            home_dc_id,
            self_id,
            dcs,
            counters: (pts, qts, seq, date),
            channel_pts,
            secret_chats,
        })
    }
}

// ─── Backends ────────────────────────────────────────────────────────────────

/// Where the session blob lives.
pub trait SessionBackend: Send + Sync + 'static {
    /// Load the stored session, if any.
    fn load(&self) -> io::Result<Option<PersistedSession>>;
    /// Store the session.
    fn save(&self, session: &PersistedSession) -> io::Result<()>;
}

/// Stores the session as a single binary file.
pub struct BinaryFileBackend {
    path: PathBuf,
}

impl BinaryFileBackend {
    /// Backend writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionBackend for BinaryFileBackend {
    fn load(&self) -> io::Result<Option<PersistedSession>> {
        match std::fs::read(&self.path) {
            Ok(buf) => PersistedSession::from_bytes(&buf).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save(&self, session: &PersistedSession) -> io::Result<()> {
        std::fs::write(&self.path, session.to_bytes())
    }
}

/// Keeps the session in memory (tests, ephemeral bots).
#[derive(Default)]
pub struct InMemoryBackend {
    blob: Mutex<Option<Vec<u8>>>,
}

impl InMemoryBackend {
    /// Empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionBackend for InMemoryBackend {
    fn load(&self) -> io::Result<Option<PersistedSession>> {
        match self.blob.lock().unwrap().as_ref() {
            Some(b) => PersistedSession::from_bytes(b).map(Some),
            None => Ok(None),
        }
    }

    fn save(&self, session: &PersistedSession) -> io::Result<()> {
        *self.blob.lock().unwrap() = Some(session.to_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PersistedSession {
        let mut chat = SecretChat {
            id: 7,
            access_hash: 0x1234,
            user_id: 42,
            admin_id: 42,
            state: SecretChatState::Ok,
            key: [0u8; 256],
            key_fingerprint: 0,
            prime: Vec::new(),
            g: 0,
            exponent: [0u8; 256],
            peer_g_a: Vec::new(),
            ttl: 60,
            layer: 17,
            in_seq_no: 3,
            out_seq_no: 5,
            last_in_seq_no: 2,
        };
        chat.set_key([9u8; 256]);

        // A second chat persisted mid-handshake, DH material and all.
        let waiting = SecretChat {
            id: 8,
            access_hash: 0x5678,
            user_id: 43,
            admin_id: 42,
            state: SecretChatState::Waiting,
            key: [0u8; 256],
            key_fingerprint: 0,
            prime: vec![0xc7; 256],
            g: 3,
            exponent: [0x42; 256],
            peer_g_a: vec![0x19; 256],
            ttl: 0,
            layer: 17,
            in_seq_no: 0,
            out_seq_no: 0,
            last_in_seq_no: 0,
        };

        PersistedSession {
            home_dc_id: 2,
            self_id: 777,
            dcs: vec![
                DcRecord {
                    dc_id: 2,
                    addr: "149.154.167.51:443".into(),
                    auth_key: Some([3u8; 256]),
                    salt: -5,
                    time_offset: 12,
                },
                DcRecord {
                    dc_id: 4,
                    addr: "149.154.167.91:443".into(),
                    auth_key: None,
                    salt: 0,
                    time_offset: 0,
                },
            ],
            counters: (100, 4, 9, 1_700_000_000),
            channel_pts: [(55i64, 1200i32)].into_iter().collect(),
            secret_chats: vec![chat, waiting],
        }
    }

    #[test]
    fn roundtrip_preserves_everything() {
        let s = sample();
        let back = PersistedSession::from_bytes(&s.to_bytes()).unwrap();

        assert_eq!(back.home_dc_id, 2);
        assert_eq!(back.self_id, 777);
        assert_eq!(back.dcs.len(), 2);
        assert_eq!(back.dcs[0].auth_key, Some([3u8; 256]));
        assert_eq!(back.dcs[1].auth_key, None);
        assert_eq!(back.counters, (100, 4, 9, 1_700_000_000));
        assert_eq!(back.channel_pts.get(&55), Some(&1200));

        let chat = &back.secret_chats[0];
        assert_eq!(chat.id, 7);
        assert_eq!(chat.state, SecretChatState::Ok);
        assert_eq!(chat.key, [9u8; 256]);
        assert_eq!(chat.key_fingerprint, tangram_crypto::secret::key_fingerprint(&[9u8; 256]));
        assert_eq!(chat.in_seq_no, 3);
        assert_eq!(chat.out_seq_no, 5);
    }

    #[test]
    fn mid_handshake_chat_keeps_its_dh_material() {
        let back = PersistedSession::from_bytes(&sample().to_bytes()).unwrap();
        let waiting = &back.secret_chats[1];
        assert_eq!(waiting.id, 8);
        assert_eq!(waiting.state, SecretChatState::Waiting);
        assert_eq!(waiting.g, 3);
        assert_eq!(waiting.prime, vec![0xc7; 256]);
        assert_eq!(waiting.exponent, [0x42; 256]);
        assert_eq!(waiting.peer_g_a, vec![0x19; 256]);
    }

    #[test]
    fn half_open_chat_without_group_is_discarded_on_load() {
        let mut s = sample();
        s.secret_chats[1].prime = Vec::new();
        let back = PersistedSession::from_bytes(&s.to_bytes()).unwrap();
        // The confirmation path must never see a zero modulus.
        assert_eq!(back.secret_chats[1].state, SecretChatState::Deleted);
    }

    #[test]
    fn corrupt_magic_is_rejected() {
        let mut bytes = sample().to_bytes();
        bytes[0] ^= 0xff;
        assert!(PersistedSession::from_bytes(&bytes).is_err());
    }

    #[test]
    fn file_backend_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = BinaryFileBackend::new(dir.path().join("test.session"));
        assert!(backend.load().unwrap().is_none());
        backend.save(&sample()).unwrap();
        let loaded = backend.load().unwrap().unwrap();
        assert_eq!(loaded.home_dc_id, 2);
    }
}
