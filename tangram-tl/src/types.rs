//! Bare constructor types.
//!
//! One struct per TL constructor, fields in wire order. Serialization writes
//! the fields only; the boxed form (constructor id + fields) lives on the
//! corresponding enum in [`crate::enums`].

use crate::deserialize::{Buffer, Result};
use crate::serialize::Serializable;
use crate::Deserializable;

macro_rules! ser_fields {
    ($self:ident, $buf:ident, $($field:ident),* $(,)?) => {
        $( $self.$field.serialize($buf); )*
    };
}

// ─── Handshake ───────────────────────────────────────────────────────────────

/// `resPQ#05162463`
#[derive(Clone, Debug, PartialEq)]
pub struct ResPq {
    pub nonce: [u8; 16],
    pub server_nonce: [u8; 16],
    pub pq: Vec<u8>,
    pub server_public_key_fingerprints: Vec<i64>,
}

impl Serializable for ResPq {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, nonce, server_nonce, pq, server_public_key_fingerprints);
    }
}

impl Deserializable for ResPq {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            nonce: <[u8; 16]>::deserialize(buf)?,
            server_nonce: <[u8; 16]>::deserialize(buf)?,
            pq: Vec::<u8>::deserialize(buf)?,
            server_public_key_fingerprints: Vec::<i64>::deserialize(buf)?,
        })
    }
}

/// `p_q_inner_data#83c95aec`
#[derive(Clone, Debug, PartialEq)]
pub struct PQInnerData {
    pub pq: Vec<u8>,
    pub p: Vec<u8>,
    pub q: Vec<u8>,
    pub nonce: [u8; 16],
    pub server_nonce: [u8; 16],
    pub new_nonce: [u8; 32],
}

impl Serializable for PQInnerData {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, pq, p, q, nonce, server_nonce, new_nonce);
    }
}

impl Deserializable for PQInnerData {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            pq: Vec::<u8>::deserialize(buf)?,
            p: Vec::<u8>::deserialize(buf)?,
            q: Vec::<u8>::deserialize(buf)?,
            nonce: <[u8; 16]>::deserialize(buf)?,
            server_nonce: <[u8; 16]>::deserialize(buf)?,
            new_nonce: <[u8; 32]>::deserialize(buf)?,
        })
    }
}

/// `p_q_inner_data_temp#3c6a84d4` — PFS variant carrying a key lifetime.
#[derive(Clone, Debug, PartialEq)]
pub struct PQInnerDataTemp {
    pub pq: Vec<u8>,
    pub p: Vec<u8>,
    pub q: Vec<u8>,
    pub nonce: [u8; 16],
    pub server_nonce: [u8; 16],
    pub new_nonce: [u8; 32],
    pub expires_in: i32,
}

impl Serializable for PQInnerDataTemp {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, pq, p, q, nonce, server_nonce, new_nonce, expires_in);
    }
}

impl Deserializable for PQInnerDataTemp {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            pq: Vec::<u8>::deserialize(buf)?,
            p: Vec::<u8>::deserialize(buf)?,
            q: Vec::<u8>::deserialize(buf)?,
            nonce: <[u8; 16]>::deserialize(buf)?,
            server_nonce: <[u8; 16]>::deserialize(buf)?,
            new_nonce: <[u8; 32]>::deserialize(buf)?,
            expires_in: i32::deserialize(buf)?,
        })
    }
}

/// `server_DH_params_ok#d0e8075c`
#[derive(Clone, Debug, PartialEq)]
pub struct ServerDhParamsOk {
    pub nonce: [u8; 16],
    pub server_nonce: [u8; 16],
    pub encrypted_answer: Vec<u8>,
}

impl Serializable for ServerDhParamsOk {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, nonce, server_nonce, encrypted_answer);
    }
}

impl Deserializable for ServerDhParamsOk {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            nonce: <[u8; 16]>::deserialize(buf)?,
            server_nonce: <[u8; 16]>::deserialize(buf)?,
            encrypted_answer: Vec::<u8>::deserialize(buf)?,
        })
    }
}

/// `server_DH_params_fail#79cb045d`
#[derive(Clone, Debug, PartialEq)]
pub struct ServerDhParamsFail {
    pub nonce: [u8; 16],
    pub server_nonce: [u8; 16],
    pub new_nonce_hash: [u8; 16],
}

impl Serializable for ServerDhParamsFail {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, nonce, server_nonce, new_nonce_hash);
    }
}

impl Deserializable for ServerDhParamsFail {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            nonce: <[u8; 16]>::deserialize(buf)?,
            server_nonce: <[u8; 16]>::deserialize(buf)?,
            new_nonce_hash: <[u8; 16]>::deserialize(buf)?,
        })
    }
}

/// `server_DH_inner_data#b5890dba`
#[derive(Clone, Debug, PartialEq)]
pub struct ServerDhInnerData {
    pub nonce: [u8; 16],
    pub server_nonce: [u8; 16],
    pub g: i32,
    pub dh_prime: Vec<u8>,
    pub g_a: Vec<u8>,
    pub server_time: i32,
}

impl Serializable for ServerDhInnerData {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, nonce, server_nonce, g, dh_prime, g_a, server_time);
    }
}

impl Deserializable for ServerDhInnerData {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            nonce: <[u8; 16]>::deserialize(buf)?,
            server_nonce: <[u8; 16]>::deserialize(buf)?,
            g: i32::deserialize(buf)?,
            dh_prime: Vec::<u8>::deserialize(buf)?,
            g_a: Vec::<u8>::deserialize(buf)?,
            server_time: i32::deserialize(buf)?,
        })
    }
}

/// `client_DH_inner_data#6643b654`
#[derive(Clone, Debug, PartialEq)]
pub struct ClientDhInnerData {
    pub nonce: [u8; 16],
    pub server_nonce: [u8; 16],
    pub retry_id: i64,
    pub g_b: Vec<u8>,
}

impl Serializable for ClientDhInnerData {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, nonce, server_nonce, retry_id, g_b);
    }
}

impl Deserializable for ClientDhInnerData {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            nonce: <[u8; 16]>::deserialize(buf)?,
            server_nonce: <[u8; 16]>::deserialize(buf)?,
            retry_id: i64::deserialize(buf)?,
            g_b: Vec::<u8>::deserialize(buf)?,
        })
    }
}

/// `dh_gen_ok#3bcbf734`
#[derive(Clone, Debug, PartialEq)]
pub struct DhGenOk {
    pub nonce: [u8; 16],
    pub server_nonce: [u8; 16],
    pub new_nonce_hash1: [u8; 16],
}

impl Serializable for DhGenOk {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, nonce, server_nonce, new_nonce_hash1);
    }
}

impl Deserializable for DhGenOk {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            nonce: <[u8; 16]>::deserialize(buf)?,
            server_nonce: <[u8; 16]>::deserialize(buf)?,
            new_nonce_hash1: <[u8; 16]>::deserialize(buf)?,
        })
    }
}

/// `dh_gen_retry#46dc1fb9`
#[derive(Clone, Debug, PartialEq)]
pub struct DhGenRetry {
    pub nonce: [u8; 16],
    pub server_nonce: [u8; 16],
    pub new_nonce_hash2: [u8; 16],
}

impl Serializable for DhGenRetry {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, nonce, server_nonce, new_nonce_hash2);
    }
}

impl Deserializable for DhGenRetry {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            nonce: <[u8; 16]>::deserialize(buf)?,
            server_nonce: <[u8; 16]>::deserialize(buf)?,
            new_nonce_hash2: <[u8; 16]>::deserialize(buf)?,
        })
    }
}

/// `dh_gen_fail#a69dae02`
#[derive(Clone, Debug, PartialEq)]
pub struct DhGenFail {
    pub nonce: [u8; 16],
    pub server_nonce: [u8; 16],
    pub new_nonce_hash3: [u8; 16],
}

impl Serializable for DhGenFail {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, nonce, server_nonce, new_nonce_hash3);
    }
}

impl Deserializable for DhGenFail {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            nonce: <[u8; 16]>::deserialize(buf)?,
            server_nonce: <[u8; 16]>::deserialize(buf)?,
            new_nonce_hash3: <[u8; 16]>::deserialize(buf)?,
        })
    }
}

/// `bind_auth_key_inner#75a3f765` — payload of the PFS temp-key bind.
#[derive(Clone, Debug, PartialEq)]
pub struct BindAuthKeyInner {
    pub nonce: i64,
    pub temp_auth_key_id: i64,
    pub perm_auth_key_id: i64,
    pub temp_session_id: i64,
    pub expires_at: i32,
}

impl Serializable for BindAuthKeyInner {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, nonce, temp_auth_key_id, perm_auth_key_id, temp_session_id, expires_at);
    }
}

impl Deserializable for BindAuthKeyInner {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            nonce: i64::deserialize(buf)?,
            temp_auth_key_id: i64::deserialize(buf)?,
            perm_auth_key_id: i64::deserialize(buf)?,
            temp_session_id: i64::deserialize(buf)?,
            expires_at: i32::deserialize(buf)?,
        })
    }
}

// ─── Transport service messages ──────────────────────────────────────────────

/// `pong#347773c5`
#[derive(Clone, Debug, PartialEq)]
pub struct Pong {
    pub msg_id: i64,
    pub ping_id: i64,
}

impl Serializable for Pong {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, msg_id, ping_id);
    }
}

impl Deserializable for Pong {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self { msg_id: i64::deserialize(buf)?, ping_id: i64::deserialize(buf)? })
    }
}

/// `msgs_ack#62d6b459`
#[derive(Clone, Debug, PartialEq)]
pub struct MsgsAck {
    pub msg_ids: Vec<i64>,
}

impl Serializable for MsgsAck {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        self.msg_ids.serialize(buf);
    }
}

impl Deserializable for MsgsAck {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self { msg_ids: Vec::<i64>::deserialize(buf)? })
    }
}

/// `rpc_error#2144ca19`
#[derive(Clone, Debug, PartialEq)]
pub struct RpcError {
    pub error_code: i32,
    pub error_message: String,
}

impl Serializable for RpcError {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, error_code, error_message);
    }
}

impl Deserializable for RpcError {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            error_code: i32::deserialize(buf)?,
            error_message: String::deserialize(buf)?,
        })
    }
}

/// `new_session_created#9ec20908`
#[derive(Clone, Debug, PartialEq)]
pub struct NewSessionCreated {
    pub first_msg_id: i64,
    pub unique_id: i64,
    pub server_salt: i64,
}

impl Serializable for NewSessionCreated {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, first_msg_id, unique_id, server_salt);
    }
}

impl Deserializable for NewSessionCreated {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            first_msg_id: i64::deserialize(buf)?,
            unique_id: i64::deserialize(buf)?,
            server_salt: i64::deserialize(buf)?,
        })
    }
}

/// `bad_server_salt#edab447b`
#[derive(Clone, Debug, PartialEq)]
pub struct BadServerSalt {
    pub bad_msg_id: i64,
    pub bad_msg_seqno: i32,
    pub error_code: i32,
    pub new_server_salt: i64,
}

impl Serializable for BadServerSalt {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, bad_msg_id, bad_msg_seqno, error_code, new_server_salt);
    }
}

impl Deserializable for BadServerSalt {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            bad_msg_id: i64::deserialize(buf)?,
            bad_msg_seqno: i32::deserialize(buf)?,
            error_code: i32::deserialize(buf)?,
            new_server_salt: i64::deserialize(buf)?,
        })
    }
}

/// `bad_msg_notification#a7eff811`
#[derive(Clone, Debug, PartialEq)]
pub struct BadMsgNotification {
    pub bad_msg_id: i64,
    pub bad_msg_seqno: i32,
    pub error_code: i32,
}

impl Serializable for BadMsgNotification {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, bad_msg_id, bad_msg_seqno, error_code);
    }
}

impl Deserializable for BadMsgNotification {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            bad_msg_id: i64::deserialize(buf)?,
            bad_msg_seqno: i32::deserialize(buf)?,
            error_code: i32::deserialize(buf)?,
        })
    }
}

/// `msg_detailed_info#276d3ec6`
#[derive(Clone, Debug, PartialEq)]
pub struct MsgDetailedInfo {
    pub msg_id: i64,
    pub answer_msg_id: i64,
    pub bytes: i32,
    pub status: i32,
}

impl Serializable for MsgDetailedInfo {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, msg_id, answer_msg_id, bytes, status);
    }
}

impl Deserializable for MsgDetailedInfo {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            msg_id: i64::deserialize(buf)?,
            answer_msg_id: i64::deserialize(buf)?,
            bytes: i32::deserialize(buf)?,
            status: i32::deserialize(buf)?,
        })
    }
}

/// `msg_new_detailed_info#809db6df`
#[derive(Clone, Debug, PartialEq)]
pub struct MsgNewDetailedInfo {
    pub answer_msg_id: i64,
    pub bytes: i32,
    pub status: i32,
}

impl Serializable for MsgNewDetailedInfo {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, answer_msg_id, bytes, status);
    }
}

impl Deserializable for MsgNewDetailedInfo {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            answer_msg_id: i64::deserialize(buf)?,
            bytes: i32::deserialize(buf)?,
            status: i32::deserialize(buf)?,
        })
    }
}

// ─── Peers, users, chats ─────────────────────────────────────────────────────

/// `peerUser#9db1bc6d`
#[derive(Clone, Debug, PartialEq)]
pub struct PeerUser {
    pub user_id: i64,
}

/// `peerChat#36c6019a`
#[derive(Clone, Debug, PartialEq)]
pub struct PeerChat {
    pub chat_id: i64,
}

/// `peerChannel#a2426b19`
#[derive(Clone, Debug, PartialEq)]
pub struct PeerChannel {
    pub channel_id: i64,
}

/// `userProfilePhoto` (reduced)
#[derive(Clone, Debug, PartialEq)]
pub struct UserProfilePhoto {
    pub photo_id: i64,
    pub photo_small: FileLocation,
    pub photo_big: FileLocation,
}

impl Serializable for UserProfilePhoto {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, photo_id, photo_small, photo_big);
    }
}

impl Deserializable for UserProfilePhoto {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            photo_id: i64::deserialize(buf)?,
            photo_small: FileLocation::deserialize(buf)?,
            photo_big: FileLocation::deserialize(buf)?,
        })
    }
}

/// Reduced `user` constructor — the fields the client core consumes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct User {
    pub id: i64,
    pub access_hash: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub photo: Option<UserProfilePhoto>,
}

impl Serializable for User {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        let mut flags = 0u32;
        if self.access_hash.is_some() { flags |= 1 << 0; }
        if self.first_name.is_some()  { flags |= 1 << 1; }
        if self.last_name.is_some()   { flags |= 1 << 2; }
        if self.username.is_some()    { flags |= 1 << 3; }
        if self.phone.is_some()       { flags |= 1 << 4; }
        if self.photo.is_some()       { flags |= 1 << 5; }
        flags.serialize(buf);
        self.id.serialize(buf);
        self.access_hash.serialize(buf);
        self.first_name.serialize(buf);
        self.last_name.serialize(buf);
        self.username.serialize(buf);
        self.phone.serialize(buf);
        self.photo.serialize(buf);
    }
}

impl Deserializable for User {
    fn deserialize(buf: Buffer) -> Result<Self> {
        let flags = u32::deserialize(buf)?;
        Ok(Self {
            id: i64::deserialize(buf)?,
            access_hash: if flags & (1 << 0) != 0 { Some(i64::deserialize(buf)?) } else { None },
            first_name: if flags & (1 << 1) != 0 { Some(String::deserialize(buf)?) } else { None },
            last_name: if flags & (1 << 2) != 0 { Some(String::deserialize(buf)?) } else { None },
            username: if flags & (1 << 3) != 0 { Some(String::deserialize(buf)?) } else { None },
            phone: if flags & (1 << 4) != 0 { Some(String::deserialize(buf)?) } else { None },
            photo: if flags & (1 << 5) != 0 {
                Some(UserProfilePhoto::deserialize(buf)?)
            } else {
                None
            },
        })
    }
}

/// Reduced basic-group constructor.
#[derive(Clone, Debug, PartialEq)]
pub struct Chat {
    pub id: i64,
    pub title: String,
}

impl Serializable for Chat {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, id, title);
    }
}

impl Deserializable for Chat {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self { id: i64::deserialize(buf)?, title: String::deserialize(buf)? })
    }
}

/// Reduced `channel` constructor.
#[derive(Clone, Debug, PartialEq)]
pub struct Channel {
    pub id: i64,
    pub access_hash: Option<i64>,
    pub title: String,
}

impl Serializable for Channel {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        let flags: u32 = if self.access_hash.is_some() { 1 } else { 0 };
        flags.serialize(buf);
        self.id.serialize(buf);
        self.access_hash.serialize(buf);
        self.title.serialize(buf);
    }
}

impl Deserializable for Channel {
    fn deserialize(buf: Buffer) -> Result<Self> {
        let flags = u32::deserialize(buf)?;
        Ok(Self {
            id: i64::deserialize(buf)?,
            access_hash: if flags & 1 != 0 { Some(i64::deserialize(buf)?) } else { None },
            title: String::deserialize(buf)?,
        })
    }
}

// ─── Messages and media ──────────────────────────────────────────────────────

/// Reduced `message` constructor.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub out: bool,
    pub id: i32,
    pub from_id: Option<crate::enums::Peer>,
    pub peer_id: crate::enums::Peer,
    pub date: i32,
    pub message: String,
    pub media: Option<crate::enums::MessageMedia>,
}

impl Serializable for Message {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        let mut flags = 0u32;
        if self.out { flags |= 1 << 1; }
        if self.from_id.is_some() { flags |= 1 << 8; }
        if self.media.is_some() { flags |= 1 << 9; }
        flags.serialize(buf);
        self.id.serialize(buf);
        self.from_id.serialize(buf);
        self.peer_id.serialize(buf);
        self.date.serialize(buf);
        self.message.serialize(buf);
        self.media.serialize(buf);
    }
}

impl Deserializable for Message {
    fn deserialize(buf: Buffer) -> Result<Self> {
        let flags = u32::deserialize(buf)?;
        Ok(Self {
            out: flags & (1 << 1) != 0,
            id: i32::deserialize(buf)?,
            from_id: if flags & (1 << 8) != 0 {
                Some(crate::enums::Peer::deserialize(buf)?)
            } else {
                None
            },
            peer_id: crate::enums::Peer::deserialize(buf)?,
            date: i32::deserialize(buf)?,
            message: String::deserialize(buf)?,
            media: if flags & (1 << 9) != 0 {
                Some(crate::enums::MessageMedia::deserialize(buf)?)
            } else {
                None
            },
        })
    }
}

/// `fileLocation#53d69076` (pre-file-reference layout)
#[derive(Clone, Debug, PartialEq)]
pub struct FileLocation {
    pub dc_id: i32,
    pub volume_id: i64,
    pub local_id: i32,
    pub secret: i64,
}

impl Serializable for FileLocation {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, dc_id, volume_id, local_id, secret);
    }
}

impl Deserializable for FileLocation {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            dc_id: i32::deserialize(buf)?,
            volume_id: i64::deserialize(buf)?,
            local_id: i32::deserialize(buf)?,
            secret: i64::deserialize(buf)?,
        })
    }
}

/// `photoSize` (reduced)
#[derive(Clone, Debug, PartialEq)]
pub struct PhotoSize {
    pub r#type: String,
    pub location: FileLocation,
    pub w: i32,
    pub h: i32,
    pub size: i32,
}

impl Serializable for PhotoSize {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, r#type, location, w, h, size);
    }
}

impl Deserializable for PhotoSize {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            r#type: String::deserialize(buf)?,
            location: FileLocation::deserialize(buf)?,
            w: i32::deserialize(buf)?,
            h: i32::deserialize(buf)?,
            size: i32::deserialize(buf)?,
        })
    }
}

/// Reduced `photo` constructor.
#[derive(Clone, Debug, PartialEq)]
pub struct Photo {
    pub id: i64,
    pub access_hash: i64,
    pub date: i32,
    pub sizes: Vec<PhotoSize>,
}

impl Serializable for Photo {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, id, access_hash, date, sizes);
    }
}

impl Deserializable for Photo {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            id: i64::deserialize(buf)?,
            access_hash: i64::deserialize(buf)?,
            date: i32::deserialize(buf)?,
            sizes: Vec::<PhotoSize>::deserialize(buf)?,
        })
    }
}

/// Reduced `document` constructor.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub id: i64,
    pub access_hash: i64,
    pub date: i32,
    pub mime_type: String,
    pub size: i64,
    pub dc_id: i32,
    pub attributes: Vec<crate::enums::DocumentAttribute>,
}

impl Serializable for Document {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, id, access_hash, date, mime_type, size, dc_id, attributes);
    }
}

impl Deserializable for Document {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            id: i64::deserialize(buf)?,
            access_hash: i64::deserialize(buf)?,
            date: i32::deserialize(buf)?,
            mime_type: String::deserialize(buf)?,
            size: i64::deserialize(buf)?,
            dc_id: i32::deserialize(buf)?,
            attributes: Vec::<crate::enums::DocumentAttribute>::deserialize(buf)?,
        })
    }
}

// ─── Secret chats ────────────────────────────────────────────────────────────

/// `encryptedChatWaiting#3bf703dc`
#[derive(Clone, Debug, PartialEq)]
pub struct EncryptedChatWaiting {
    pub id: i32,
    pub access_hash: i64,
    pub date: i32,
    pub admin_id: i32,
    pub participant_id: i32,
}

impl Serializable for EncryptedChatWaiting {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, id, access_hash, date, admin_id, participant_id);
    }
}

impl Deserializable for EncryptedChatWaiting {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            id: i32::deserialize(buf)?,
            access_hash: i64::deserialize(buf)?,
            date: i32::deserialize(buf)?,
            admin_id: i32::deserialize(buf)?,
            participant_id: i32::deserialize(buf)?,
        })
    }
}

/// `encryptedChatRequested#c878527e`
#[derive(Clone, Debug, PartialEq)]
pub struct EncryptedChatRequested {
    pub id: i32,
    pub access_hash: i64,
    pub date: i32,
    pub admin_id: i32,
    pub participant_id: i32,
    pub g_a: Vec<u8>,
}

impl Serializable for EncryptedChatRequested {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, id, access_hash, date, admin_id, participant_id, g_a);
    }
}

impl Deserializable for EncryptedChatRequested {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            id: i32::deserialize(buf)?,
            access_hash: i64::deserialize(buf)?,
            date: i32::deserialize(buf)?,
            admin_id: i32::deserialize(buf)?,
            participant_id: i32::deserialize(buf)?,
            g_a: Vec::<u8>::deserialize(buf)?,
        })
    }
}

/// `encryptedChat#fa56ce36`
#[derive(Clone, Debug, PartialEq)]
pub struct EncryptedChat {
    pub id: i32,
    pub access_hash: i64,
    pub date: i32,
    pub admin_id: i32,
    pub participant_id: i32,
    pub g_a_or_b: Vec<u8>,
    pub key_fingerprint: i64,
}

impl Serializable for EncryptedChat {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, id, access_hash, date, admin_id, participant_id, g_a_or_b, key_fingerprint);
    }
}

impl Deserializable for EncryptedChat {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            id: i32::deserialize(buf)?,
            access_hash: i64::deserialize(buf)?,
            date: i32::deserialize(buf)?,
            admin_id: i32::deserialize(buf)?,
            participant_id: i32::deserialize(buf)?,
            g_a_or_b: Vec::<u8>::deserialize(buf)?,
            key_fingerprint: i64::deserialize(buf)?,
        })
    }
}

/// `inputEncryptedChat#f141b5e1`
#[derive(Clone, Debug, PartialEq)]
pub struct InputEncryptedChat {
    pub chat_id: i32,
    pub access_hash: i64,
}

impl Serializable for InputEncryptedChat {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, chat_id, access_hash);
    }
}

impl Deserializable for InputEncryptedChat {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self { chat_id: i32::deserialize(buf)?, access_hash: i64::deserialize(buf)? })
    }
}

/// `encryptedMessage#ed18c118`
#[derive(Clone, Debug, PartialEq)]
pub struct EncryptedMessage {
    pub random_id: i64,
    pub chat_id: i32,
    pub date: i32,
    pub bytes: Vec<u8>,
    pub file: crate::enums::EncryptedFile,
}

impl Serializable for EncryptedMessage {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, random_id, chat_id, date, bytes, file);
    }
}

impl Deserializable for EncryptedMessage {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            random_id: i64::deserialize(buf)?,
            chat_id: i32::deserialize(buf)?,
            date: i32::deserialize(buf)?,
            bytes: Vec::<u8>::deserialize(buf)?,
            file: crate::enums::EncryptedFile::deserialize(buf)?,
        })
    }
}

/// `encryptedMessageService#23734b06`
#[derive(Clone, Debug, PartialEq)]
pub struct EncryptedMessageService {
    pub random_id: i64,
    pub chat_id: i32,
    pub date: i32,
    pub bytes: Vec<u8>,
}

impl Serializable for EncryptedMessageService {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, random_id, chat_id, date, bytes);
    }
}

impl Deserializable for EncryptedMessageService {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            random_id: i64::deserialize(buf)?,
            chat_id: i32::deserialize(buf)?,
            date: i32::deserialize(buf)?,
            bytes: Vec::<u8>::deserialize(buf)?,
        })
    }
}

/// `encryptedFile#4a70994c`
#[derive(Clone, Debug, PartialEq)]
pub struct EncryptedFileData {
    pub id: i64,
    pub access_hash: i64,
    pub size: i32,
    pub dc_id: i32,
    pub key_fingerprint: i32,
}

impl Serializable for EncryptedFileData {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, id, access_hash, size, dc_id, key_fingerprint);
    }
}

impl Deserializable for EncryptedFileData {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            id: i64::deserialize(buf)?,
            access_hash: i64::deserialize(buf)?,
            size: i32::deserialize(buf)?,
            dc_id: i32::deserialize(buf)?,
            key_fingerprint: i32::deserialize(buf)?,
        })
    }
}

/// `decryptedMessageLayer#1be31789`
#[derive(Clone, Debug, PartialEq)]
pub struct DecryptedMessageLayer {
    pub random_bytes: Vec<u8>,
    pub layer: i32,
    pub in_seq_no: i32,
    pub out_seq_no: i32,
    pub message: crate::enums::DecryptedMessage,
}

impl Serializable for DecryptedMessageLayer {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, random_bytes, layer, in_seq_no, out_seq_no, message);
    }
}

impl Deserializable for DecryptedMessageLayer {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            random_bytes: Vec::<u8>::deserialize(buf)?,
            layer: i32::deserialize(buf)?,
            in_seq_no: i32::deserialize(buf)?,
            out_seq_no: i32::deserialize(buf)?,
            message: crate::enums::DecryptedMessage::deserialize(buf)?,
        })
    }
}

/// `decryptedMessage#204d3878` (layer 17)
#[derive(Clone, Debug, PartialEq)]
pub struct DecryptedMessageData {
    pub random_id: i64,
    pub ttl: i32,
    pub message: String,
    pub media: crate::enums::DecryptedMessageMedia,
}

impl Serializable for DecryptedMessageData {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, random_id, ttl, message, media);
    }
}

impl Deserializable for DecryptedMessageData {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            random_id: i64::deserialize(buf)?,
            ttl: i32::deserialize(buf)?,
            message: String::deserialize(buf)?,
            media: crate::enums::DecryptedMessageMedia::deserialize(buf)?,
        })
    }
}

/// `decryptedMessageService#73164160` (layer 17)
#[derive(Clone, Debug, PartialEq)]
pub struct DecryptedMessageServiceData {
    pub random_id: i64,
    pub action: crate::enums::DecryptedMessageAction,
}

impl Serializable for DecryptedMessageServiceData {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, random_id, action);
    }
}

impl Deserializable for DecryptedMessageServiceData {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            random_id: i64::deserialize(buf)?,
            action: crate::enums::DecryptedMessageAction::deserialize(buf)?,
        })
    }
}

/// `decryptedMessageMediaPhoto#32798a8c`
#[derive(Clone, Debug, PartialEq)]
pub struct DecryptedMessageMediaPhoto {
    pub thumb: Vec<u8>,
    pub thumb_w: i32,
    pub thumb_h: i32,
    pub w: i32,
    pub h: i32,
    pub size: i32,
    pub key: Vec<u8>,
    pub iv: Vec<u8>,
}

impl Serializable for DecryptedMessageMediaPhoto {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, thumb, thumb_w, thumb_h, w, h, size, key, iv);
    }
}

impl Deserializable for DecryptedMessageMediaPhoto {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            thumb: Vec::<u8>::deserialize(buf)?,
            thumb_w: i32::deserialize(buf)?,
            thumb_h: i32::deserialize(buf)?,
            w: i32::deserialize(buf)?,
            h: i32::deserialize(buf)?,
            size: i32::deserialize(buf)?,
            key: Vec::<u8>::deserialize(buf)?,
            iv: Vec::<u8>::deserialize(buf)?,
        })
    }
}

/// `decryptedMessageMediaDocument#b095434b`
#[derive(Clone, Debug, PartialEq)]
pub struct DecryptedMessageMediaDocument {
    pub thumb: Vec<u8>,
    pub thumb_w: i32,
    pub thumb_h: i32,
    pub file_name: String,
    pub mime_type: String,
    pub size: i32,
    pub key: Vec<u8>,
    pub iv: Vec<u8>,
}

impl Serializable for DecryptedMessageMediaDocument {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, thumb, thumb_w, thumb_h, file_name, mime_type, size, key, iv);
    }
}

impl Deserializable for DecryptedMessageMediaDocument {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            thumb: Vec::<u8>::deserialize(buf)?,
            thumb_w: i32::deserialize(buf)?,
            thumb_h: i32::deserialize(buf)?,
            file_name: String::deserialize(buf)?,
            mime_type: String::deserialize(buf)?,
            size: i32::deserialize(buf)?,
            key: Vec::<u8>::deserialize(buf)?,
            iv: Vec::<u8>::deserialize(buf)?,
        })
    }
}

/// `decryptedMessageActionResend#511110b0`
#[derive(Clone, Debug, PartialEq)]
pub struct DecryptedMessageActionResend {
    pub start_seq_no: i32,
    pub end_seq_no: i32,
}

impl Serializable for DecryptedMessageActionResend {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, start_seq_no, end_seq_no);
    }
}

impl Deserializable for DecryptedMessageActionResend {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            start_seq_no: i32::deserialize(buf)?,
            end_seq_no: i32::deserialize(buf)?,
        })
    }
}

// ─── Updates ─────────────────────────────────────────────────────────────────

pub mod updates {
    use super::*;

    /// `updates.state#a56c2a3e`
    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    pub struct State {
        pub pts: i32,
        pub qts: i32,
        pub date: i32,
        pub seq: i32,
        pub unread_count: i32,
    }

    impl Serializable for State {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            ser_fields!(self, buf, pts, qts, date, seq, unread_count);
        }
    }

    impl Deserializable for State {
        fn deserialize(buf: Buffer) -> Result<Self> {
            Ok(Self {
                pts: i32::deserialize(buf)?,
                qts: i32::deserialize(buf)?,
                date: i32::deserialize(buf)?,
                seq: i32::deserialize(buf)?,
                unread_count: i32::deserialize(buf)?,
            })
        }
    }

    /// `updates.differenceEmpty#5d75a138`
    #[derive(Clone, Debug, PartialEq)]
    pub struct DifferenceEmpty {
        pub date: i32,
        pub seq: i32,
    }

    impl Serializable for DifferenceEmpty {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            ser_fields!(self, buf, date, seq);
        }
    }

    impl Deserializable for DifferenceEmpty {
        fn deserialize(buf: Buffer) -> Result<Self> {
            Ok(Self { date: i32::deserialize(buf)?, seq: i32::deserialize(buf)? })
        }
    }

    /// `updates.difference#00f49ca0`
    #[derive(Clone, Debug, PartialEq)]
    pub struct Difference {
        pub new_messages: Vec<crate::enums::Message>,
        pub new_encrypted_messages: Vec<crate::enums::EncryptedMessage>,
        pub other_updates: Vec<crate::enums::Update>,
        pub chats: Vec<crate::enums::Chat>,
        pub users: Vec<crate::enums::User>,
        pub state: State,
    }

    impl Serializable for Difference {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            self.new_messages.serialize(buf);
            self.new_encrypted_messages.serialize(buf);
            self.other_updates.serialize(buf);
            self.chats.serialize(buf);
            self.users.serialize(buf);
            0xa56c2a3eu32.serialize(buf);
            self.state.serialize(buf);
        }
    }

    impl Deserializable for Difference {
        fn deserialize(buf: Buffer) -> Result<Self> {
            let new_messages = Vec::<crate::enums::Message>::deserialize(buf)?;
            let new_encrypted_messages = Vec::<crate::enums::EncryptedMessage>::deserialize(buf)?;
            let other_updates = Vec::<crate::enums::Update>::deserialize(buf)?;
            let chats = Vec::<crate::enums::Chat>::deserialize(buf)?;
            let users = Vec::<crate::enums::User>::deserialize(buf)?;
            let id = u32::deserialize(buf)?;
            if id != 0xa56c2a3e {
                return Err(crate::deserialize::Error::UnexpectedConstructor { id });
            }
            let state = State::deserialize(buf)?;
            Ok(Self { new_messages, new_encrypted_messages, other_updates, chats, users, state })
        }
    }

    /// `updates.differenceSlice#a8fb1981`
    #[derive(Clone, Debug, PartialEq)]
    pub struct DifferenceSlice {
        pub new_messages: Vec<crate::enums::Message>,
        pub new_encrypted_messages: Vec<crate::enums::EncryptedMessage>,
        pub other_updates: Vec<crate::enums::Update>,
        pub chats: Vec<crate::enums::Chat>,
        pub users: Vec<crate::enums::User>,
        pub intermediate_state: State,
    }

    impl Serializable for DifferenceSlice {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            self.new_messages.serialize(buf);
            self.new_encrypted_messages.serialize(buf);
            self.other_updates.serialize(buf);
            self.chats.serialize(buf);
            self.users.serialize(buf);
            0xa56c2a3eu32.serialize(buf);
            self.intermediate_state.serialize(buf);
        }
    }

    impl Deserializable for DifferenceSlice {
        fn deserialize(buf: Buffer) -> Result<Self> {
            let new_messages = Vec::<crate::enums::Message>::deserialize(buf)?;
            let new_encrypted_messages = Vec::<crate::enums::EncryptedMessage>::deserialize(buf)?;
            let other_updates = Vec::<crate::enums::Update>::deserialize(buf)?;
            let chats = Vec::<crate::enums::Chat>::deserialize(buf)?;
            let users = Vec::<crate::enums::User>::deserialize(buf)?;
            let id = u32::deserialize(buf)?;
            if id != 0xa56c2a3e {
                return Err(crate::deserialize::Error::UnexpectedConstructor { id });
            }
            let intermediate_state = State::deserialize(buf)?;
            Ok(Self { new_messages, new_encrypted_messages, other_updates, chats, users, intermediate_state })
        }
    }

    /// `updates.channelDifferenceEmpty#3e11affb`
    #[derive(Clone, Debug, PartialEq)]
    pub struct ChannelDifferenceEmpty {
        pub r#final: bool,
        pub pts: i32,
        pub timeout: Option<i32>,
    }

    impl Serializable for ChannelDifferenceEmpty {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            let mut flags = 0u32;
            if self.r#final { flags |= 1 << 0; }
            if self.timeout.is_some() { flags |= 1 << 1; }
            flags.serialize(buf);
            self.pts.serialize(buf);
            self.timeout.serialize(buf);
        }
    }

    impl Deserializable for ChannelDifferenceEmpty {
        fn deserialize(buf: Buffer) -> Result<Self> {
            let flags = u32::deserialize(buf)?;
            Ok(Self {
                r#final: flags & (1 << 0) != 0,
                pts: i32::deserialize(buf)?,
                timeout: if flags & (1 << 1) != 0 { Some(i32::deserialize(buf)?) } else { None },
            })
        }
    }

    /// `updates.channelDifference#2064674e`
    #[derive(Clone, Debug, PartialEq)]
    pub struct ChannelDifference {
        pub r#final: bool,
        pub pts: i32,
        pub timeout: Option<i32>,
        pub new_messages: Vec<crate::enums::Message>,
        pub other_updates: Vec<crate::enums::Update>,
        pub chats: Vec<crate::enums::Chat>,
        pub users: Vec<crate::enums::User>,
    }

    impl Serializable for ChannelDifference {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            let mut flags = 0u32;
            if self.r#final { flags |= 1 << 0; }
            if self.timeout.is_some() { flags |= 1 << 1; }
            flags.serialize(buf);
            self.pts.serialize(buf);
            self.timeout.serialize(buf);
            self.new_messages.serialize(buf);
            self.other_updates.serialize(buf);
            self.chats.serialize(buf);
            self.users.serialize(buf);
        }
    }

    impl Deserializable for ChannelDifference {
        fn deserialize(buf: Buffer) -> Result<Self> {
            let flags = u32::deserialize(buf)?;
            Ok(Self {
                r#final: flags & (1 << 0) != 0,
                pts: i32::deserialize(buf)?,
                timeout: if flags & (1 << 1) != 0 { Some(i32::deserialize(buf)?) } else { None },
                new_messages: Vec::<crate::enums::Message>::deserialize(buf)?,
                other_updates: Vec::<crate::enums::Update>::deserialize(buf)?,
                chats: Vec::<crate::enums::Chat>::deserialize(buf)?,
                users: Vec::<crate::enums::User>::deserialize(buf)?,
            })
        }
    }

    /// `updates.channelDifferenceTooLong#410dee07` (reduced)
    #[derive(Clone, Debug, PartialEq)]
    pub struct ChannelDifferenceTooLong {
        pub r#final: bool,
        pub pts: i32,
        pub timeout: Option<i32>,
        pub messages: Vec<crate::enums::Message>,
        pub chats: Vec<crate::enums::Chat>,
        pub users: Vec<crate::enums::User>,
    }

    impl Serializable for ChannelDifferenceTooLong {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            let mut flags = 0u32;
            if self.r#final { flags |= 1 << 0; }
            if self.timeout.is_some() { flags |= 1 << 1; }
            flags.serialize(buf);
            self.pts.serialize(buf);
            self.timeout.serialize(buf);
            self.messages.serialize(buf);
            self.chats.serialize(buf);
            self.users.serialize(buf);
        }
    }

    impl Deserializable for ChannelDifferenceTooLong {
        fn deserialize(buf: Buffer) -> Result<Self> {
            let flags = u32::deserialize(buf)?;
            Ok(Self {
                r#final: flags & (1 << 0) != 0,
                pts: i32::deserialize(buf)?,
                timeout: if flags & (1 << 1) != 0 { Some(i32::deserialize(buf)?) } else { None },
                messages: Vec::<crate::enums::Message>::deserialize(buf)?,
                chats: Vec::<crate::enums::Chat>::deserialize(buf)?,
                users: Vec::<crate::enums::User>::deserialize(buf)?,
            })
        }
    }
}

// ─── Upload / storage ────────────────────────────────────────────────────────

pub mod upload {
    use super::*;

    /// `upload.file#096a18d5`
    #[derive(Clone, Debug, PartialEq)]
    pub struct File {
        pub r#type: crate::enums::storage::FileType,
        pub mtime: i32,
        pub bytes: Vec<u8>,
    }

    impl Serializable for File {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            ser_fields!(self, buf, r#type, mtime, bytes);
        }
    }

    impl Deserializable for File {
        fn deserialize(buf: Buffer) -> Result<Self> {
            Ok(Self {
                r#type: crate::enums::storage::FileType::deserialize(buf)?,
                mtime: i32::deserialize(buf)?,
                bytes: Vec::<u8>::deserialize(buf)?,
            })
        }
    }
}

// ─── Auth / config ───────────────────────────────────────────────────────────

pub mod auth {
    use super::*;

    /// `auth.sentCode#efed51d9`
    #[derive(Clone, Debug, PartialEq)]
    pub struct SentCode {
        pub phone_registered: bool,
        pub phone_code_hash: String,
        pub send_call_timeout: i32,
        pub is_password: bool,
    }

    impl Serializable for SentCode {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            ser_fields!(self, buf, phone_registered, phone_code_hash, send_call_timeout, is_password);
        }
    }

    impl Deserializable for SentCode {
        fn deserialize(buf: Buffer) -> Result<Self> {
            Ok(Self {
                phone_registered: bool::deserialize(buf)?,
                phone_code_hash: String::deserialize(buf)?,
                send_call_timeout: i32::deserialize(buf)?,
                is_password: bool::deserialize(buf)?,
            })
        }
    }

    /// `auth.authorization#f6b673a4`
    #[derive(Clone, Debug, PartialEq)]
    pub struct Authorization {
        pub expires: i32,
        pub user: crate::enums::User,
    }

    impl Serializable for Authorization {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            ser_fields!(self, buf, expires, user);
        }
    }

    impl Deserializable for Authorization {
        fn deserialize(buf: Buffer) -> Result<Self> {
            Ok(Self {
                expires: i32::deserialize(buf)?,
                user: crate::enums::User::deserialize(buf)?,
            })
        }
    }

    /// `auth.exportedAuthorization#df969c2d`
    #[derive(Clone, Debug, PartialEq)]
    pub struct ExportedAuthorization {
        pub id: i32,
        pub bytes: Vec<u8>,
    }

    impl Serializable for ExportedAuthorization {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            ser_fields!(self, buf, id, bytes);
        }
    }

    impl Deserializable for ExportedAuthorization {
        fn deserialize(buf: Buffer) -> Result<Self> {
            Ok(Self { id: i32::deserialize(buf)?, bytes: Vec::<u8>::deserialize(buf)? })
        }
    }
}

/// `dcOption#18b7a10d`
#[derive(Clone, Debug, PartialEq)]
pub struct DcOption {
    pub ipv6: bool,
    pub media_only: bool,
    pub tcpo_only: bool,
    pub cdn: bool,
    pub r#static: bool,
    pub id: i32,
    pub ip_address: String,
    pub port: i32,
}

impl Serializable for DcOption {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        let mut flags = 0u32;
        if self.ipv6 { flags |= 1 << 0; }
        if self.media_only { flags |= 1 << 1; }
        if self.tcpo_only { flags |= 1 << 2; }
        if self.cdn { flags |= 1 << 3; }
        if self.r#static { flags |= 1 << 4; }
        flags.serialize(buf);
        self.id.serialize(buf);
        self.ip_address.serialize(buf);
        self.port.serialize(buf);
    }
}

impl Deserializable for DcOption {
    fn deserialize(buf: Buffer) -> Result<Self> {
        let flags = u32::deserialize(buf)?;
        Ok(Self {
            ipv6: flags & (1 << 0) != 0,
            media_only: flags & (1 << 1) != 0,
            tcpo_only: flags & (1 << 2) != 0,
            cdn: flags & (1 << 3) != 0,
            r#static: flags & (1 << 4) != 0,
            id: i32::deserialize(buf)?,
            ip_address: String::deserialize(buf)?,
            port: i32::deserialize(buf)?,
        })
    }
}

/// `config` (reduced to the fields the client consumes)
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub date: i32,
    pub expires: i32,
    pub test_mode: bool,
    pub this_dc: i32,
    pub dc_options: Vec<crate::enums::DcOption>,
}

impl Serializable for Config {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        ser_fields!(self, buf, date, expires, test_mode, this_dc, dc_options);
    }
}

impl Deserializable for Config {
    fn deserialize(buf: Buffer) -> Result<Self> {
        Ok(Self {
            date: i32::deserialize(buf)?,
            expires: i32::deserialize(buf)?,
            test_mode: bool::deserialize(buf)?,
            this_dc: i32::deserialize(buf)?,
            dc_options: Vec::<crate::enums::DcOption>::deserialize(buf)?,
        })
    }
}

pub mod messages {
    use super::*;

    /// `messages.dhConfig#2c221edd`
    #[derive(Clone, Debug, PartialEq)]
    pub struct DhConfig {
        pub g: i32,
        pub p: Vec<u8>,
        pub version: i32,
        pub random: Vec<u8>,
    }

    impl Serializable for DhConfig {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            ser_fields!(self, buf, g, p, version, random);
        }
    }

    impl Deserializable for DhConfig {
        fn deserialize(buf: Buffer) -> Result<Self> {
            Ok(Self {
                g: i32::deserialize(buf)?,
                p: Vec::<u8>::deserialize(buf)?,
                version: i32::deserialize(buf)?,
                random: Vec::<u8>::deserialize(buf)?,
            })
        }
    }

    /// `messages.dhConfigNotModified#c0e24635`
    #[derive(Clone, Debug, PartialEq)]
    pub struct DhConfigNotModified {
        pub random: Vec<u8>,
    }

    impl Serializable for DhConfigNotModified {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            self.random.serialize(buf);
        }
    }

    impl Deserializable for DhConfigNotModified {
        fn deserialize(buf: Buffer) -> Result<Self> {
            Ok(Self { random: Vec::<u8>::deserialize(buf)? })
        }
    }

    /// `messages.sentEncryptedFile#9493ff32`
    #[derive(Clone, Debug, PartialEq)]
    pub struct SentEncryptedFile {
        pub date: i32,
        pub file: crate::enums::EncryptedFile,
    }

    impl Serializable for SentEncryptedFile {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            ser_fields!(self, buf, date, file);
        }
    }

    impl Deserializable for SentEncryptedFile {
        fn deserialize(buf: Buffer) -> Result<Self> {
            Ok(Self {
                date: i32::deserialize(buf)?,
                file: crate::enums::EncryptedFile::deserialize(buf)?,
            })
        }
    }
}
