//! RPC function types.
//!
//! Each struct serializes to its boxed form (constructor id first) and
//! declares the response type through [`RemoteCall`].

use crate::serialize::Serializable;
use crate::{enums, RemoteCall};

/// `req_pq#60469778`
#[derive(Clone, Debug, PartialEq)]
pub struct ReqPq {
    pub nonce: [u8; 16],
}

impl Serializable for ReqPq {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        0x60469778u32.serialize(buf);
        self.nonce.serialize(buf);
    }
}

impl RemoteCall for ReqPq {
    type Return = enums::ResPq;
}

/// `req_DH_params#d712e4be`
#[derive(Clone, Debug, PartialEq)]
pub struct ReqDhParams {
    pub nonce: [u8; 16],
    pub server_nonce: [u8; 16],
    pub p: Vec<u8>,
    pub q: Vec<u8>,
    pub public_key_fingerprint: i64,
    pub encrypted_data: Vec<u8>,
}

impl Serializable for ReqDhParams {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        0xd712e4beu32.serialize(buf);
        self.nonce.serialize(buf);
        self.server_nonce.serialize(buf);
        self.p.serialize(buf);
        self.q.serialize(buf);
        self.public_key_fingerprint.serialize(buf);
        self.encrypted_data.serialize(buf);
    }
}

impl RemoteCall for ReqDhParams {
    type Return = enums::ServerDhParams;
}

/// `set_client_DH_params#f5045f1f`
#[derive(Clone, Debug, PartialEq)]
pub struct SetClientDhParams {
    pub nonce: [u8; 16],
    pub server_nonce: [u8; 16],
    pub encrypted_data: Vec<u8>,
}

impl Serializable for SetClientDhParams {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        0xf5045f1fu32.serialize(buf);
        self.nonce.serialize(buf);
        self.server_nonce.serialize(buf);
        self.encrypted_data.serialize(buf);
    }
}

impl RemoteCall for SetClientDhParams {
    type Return = enums::SetClientDhParamsAnswer;
}

/// `ping#7abe77ec`
#[derive(Clone, Debug, PartialEq)]
pub struct Ping {
    pub ping_id: i64,
}

impl Serializable for Ping {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        0x7abe77ecu32.serialize(buf);
        self.ping_id.serialize(buf);
    }
}

impl RemoteCall for Ping {
    type Return = enums::Pong;
}

/// `invokeWithLayer#da9b0d0d`
#[derive(Clone, Debug, PartialEq)]
pub struct InvokeWithLayer<Q> {
    pub layer: i32,
    pub query: Q,
}

impl<Q: Serializable> Serializable for InvokeWithLayer<Q> {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        0xda9b0d0du32.serialize(buf);
        self.layer.serialize(buf);
        self.query.serialize(buf);
    }
}

impl<Q: RemoteCall> RemoteCall for InvokeWithLayer<Q> {
    type Return = Q::Return;
}

/// `initConnection#69796de9`
#[derive(Clone, Debug, PartialEq)]
pub struct InitConnection<Q> {
    pub api_id: i32,
    pub device_model: String,
    pub system_version: String,
    pub app_version: String,
    pub lang_code: String,
    pub query: Q,
}

impl<Q: Serializable> Serializable for InitConnection<Q> {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        0x69796de9u32.serialize(buf);
        self.api_id.serialize(buf);
        self.device_model.serialize(buf);
        self.system_version.serialize(buf);
        self.app_version.serialize(buf);
        self.lang_code.serialize(buf);
        self.query.serialize(buf);
    }
}

impl<Q: RemoteCall> RemoteCall for InitConnection<Q> {
    type Return = Q::Return;
}

// ─── auth ────────────────────────────────────────────────────────────────────

pub mod auth {
    use super::*;

    /// `auth.sendCode#768d5f4d`
    #[derive(Clone, Debug, PartialEq)]
    pub struct SendCode {
        pub phone_number: String,
        pub sms_type: i32,
        pub api_id: i32,
        pub api_hash: String,
        pub lang_code: String,
    }

    impl Serializable for SendCode {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            0x768d5f4du32.serialize(buf);
            self.phone_number.serialize(buf);
            self.sms_type.serialize(buf);
            self.api_id.serialize(buf);
            self.api_hash.serialize(buf);
            self.lang_code.serialize(buf);
        }
    }

    impl RemoteCall for SendCode {
        type Return = enums::auth::SentCode;
    }

    /// `auth.signIn#bcd51581`
    #[derive(Clone, Debug, PartialEq)]
    pub struct SignIn {
        pub phone_number: String,
        pub phone_code_hash: String,
        pub phone_code: String,
    }

    impl Serializable for SignIn {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            0xbcd51581u32.serialize(buf);
            self.phone_number.serialize(buf);
            self.phone_code_hash.serialize(buf);
            self.phone_code.serialize(buf);
        }
    }

    impl RemoteCall for SignIn {
        type Return = enums::auth::Authorization;
    }

    /// `auth.logOut#5717da40`
    #[derive(Clone, Debug, PartialEq)]
    pub struct LogOut;

    impl Serializable for LogOut {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            0x5717da40u32.serialize(buf);
        }
    }

    impl RemoteCall for LogOut {
        type Return = bool;
    }

    /// `auth.exportAuthorization#e5bfffcd`
    #[derive(Clone, Debug, PartialEq)]
    pub struct ExportAuthorization {
        pub dc_id: i32,
    }

    impl Serializable for ExportAuthorization {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            0xe5bfffcdu32.serialize(buf);
            self.dc_id.serialize(buf);
        }
    }

    impl RemoteCall for ExportAuthorization {
        type Return = enums::auth::ExportedAuthorization;
    }

    /// `auth.importAuthorization#e3ef9613`
    #[derive(Clone, Debug, PartialEq)]
    pub struct ImportAuthorization {
        pub id: i32,
        pub bytes: Vec<u8>,
    }

    impl Serializable for ImportAuthorization {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            0xe3ef9613u32.serialize(buf);
            self.id.serialize(buf);
            self.bytes.serialize(buf);
        }
    }

    impl RemoteCall for ImportAuthorization {
        type Return = enums::auth::Authorization;
    }

    /// `auth.bindTempAuthKey#cdd42a05`
    #[derive(Clone, Debug, PartialEq)]
    pub struct BindTempAuthKey {
        pub perm_auth_key_id: i64,
        pub nonce: i64,
        pub expires_at: i32,
        pub encrypted_message: Vec<u8>,
    }

    impl Serializable for BindTempAuthKey {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            0xcdd42a05u32.serialize(buf);
            self.perm_auth_key_id.serialize(buf);
            self.nonce.serialize(buf);
            self.expires_at.serialize(buf);
            self.encrypted_message.serialize(buf);
        }
    }

    impl RemoteCall for BindTempAuthKey {
        type Return = bool;
    }
}

// ─── help ────────────────────────────────────────────────────────────────────

pub mod help {
    use super::*;

    /// `help.getConfig#c4f9186b`
    #[derive(Clone, Debug, PartialEq)]
    pub struct GetConfig;

    impl Serializable for GetConfig {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            0xc4f9186bu32.serialize(buf);
        }
    }

    impl RemoteCall for GetConfig {
        type Return = enums::Config;
    }
}

// ─── updates ─────────────────────────────────────────────────────────────────

pub mod updates {
    use super::*;

    /// `updates.getState#edd4882a`
    #[derive(Clone, Debug, PartialEq)]
    pub struct GetState;

    impl Serializable for GetState {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            0xedd4882au32.serialize(buf);
        }
    }

    impl RemoteCall for GetState {
        type Return = enums::updates::State;
    }

    /// `updates.getDifference#0a041495`
    #[derive(Clone, Debug, PartialEq)]
    pub struct GetDifference {
        pub pts: i32,
        pub date: i32,
        pub qts: i32,
    }

    impl Serializable for GetDifference {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            0x0a041495u32.serialize(buf);
            self.pts.serialize(buf);
            self.date.serialize(buf);
            self.qts.serialize(buf);
        }
    }

    impl RemoteCall for GetDifference {
        type Return = enums::updates::Difference;
    }

    /// `updates.getChannelDifference#bb32d7c0`
    #[derive(Clone, Debug, PartialEq)]
    pub struct GetChannelDifference {
        pub channel: enums::InputChannel,
        pub filter: enums::ChannelMessagesFilter,
        pub pts: i32,
        pub limit: i32,
    }

    impl Serializable for GetChannelDifference {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            0xbb32d7c0u32.serialize(buf);
            self.channel.serialize(buf);
            self.filter.serialize(buf);
            self.pts.serialize(buf);
            self.limit.serialize(buf);
        }
    }

    impl RemoteCall for GetChannelDifference {
        type Return = enums::updates::ChannelDifference;
    }
}

// ─── upload ──────────────────────────────────────────────────────────────────

pub mod upload {
    use super::*;

    /// `upload.saveFilePart#b304a621`
    #[derive(Clone, Debug, PartialEq)]
    pub struct SaveFilePart {
        pub file_id: i64,
        pub file_part: i32,
        pub bytes: Vec<u8>,
    }

    impl Serializable for SaveFilePart {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            0xb304a621u32.serialize(buf);
            self.file_id.serialize(buf);
            self.file_part.serialize(buf);
            self.bytes.serialize(buf);
        }
    }

    impl RemoteCall for SaveFilePart {
        type Return = bool;
    }

    /// `upload.saveBigFilePart#de7b673d`
    #[derive(Clone, Debug, PartialEq)]
    pub struct SaveBigFilePart {
        pub file_id: i64,
        pub file_part: i32,
        pub file_total_parts: i32,
        pub bytes: Vec<u8>,
    }

    impl Serializable for SaveBigFilePart {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            0xde7b673du32.serialize(buf);
            self.file_id.serialize(buf);
            self.file_part.serialize(buf);
            self.file_total_parts.serialize(buf);
            self.bytes.serialize(buf);
        }
    }

    impl RemoteCall for SaveBigFilePart {
        type Return = bool;
    }

    /// `upload.getFile#e3a6cfb5`
    #[derive(Clone, Debug, PartialEq)]
    pub struct GetFile {
        pub location: enums::InputFileLocation,
        pub offset: i32,
        pub limit: i32,
    }

    impl Serializable for GetFile {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            0xe3a6cfb5u32.serialize(buf);
            self.location.serialize(buf);
            self.offset.serialize(buf);
            self.limit.serialize(buf);
        }
    }

    impl RemoteCall for GetFile {
        type Return = enums::upload::File;
    }
}

// ─── messages ────────────────────────────────────────────────────────────────

pub mod messages {
    use super::*;

    /// `messages.sendMessage#fa88427a` (reduced flag set)
    #[derive(Clone, Debug, PartialEq)]
    pub struct SendMessage {
        pub peer: enums::InputPeer,
        pub reply_to_msg_id: Option<i32>,
        pub message: String,
        pub random_id: i64,
    }

    impl Serializable for SendMessage {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            0xfa88427au32.serialize(buf);
            let flags: u32 = if self.reply_to_msg_id.is_some() { 1 } else { 0 };
            flags.serialize(buf);
            self.peer.serialize(buf);
            self.reply_to_msg_id.serialize(buf);
            self.message.serialize(buf);
            self.random_id.serialize(buf);
        }
    }

    impl RemoteCall for SendMessage {
        type Return = enums::Updates;
    }

    /// `messages.sendMedia#c8f16791` (reduced flag set)
    #[derive(Clone, Debug, PartialEq)]
    pub struct SendMedia {
        pub peer: enums::InputPeer,
        pub reply_to_msg_id: Option<i32>,
        pub media: enums::InputMedia,
        pub random_id: i64,
    }

    impl Serializable for SendMedia {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            0xc8f16791u32.serialize(buf);
            let flags: u32 = if self.reply_to_msg_id.is_some() { 1 } else { 0 };
            flags.serialize(buf);
            self.peer.serialize(buf);
            self.reply_to_msg_id.serialize(buf);
            self.media.serialize(buf);
            self.random_id.serialize(buf);
        }
    }

    impl RemoteCall for SendMedia {
        type Return = enums::Updates;
    }

    /// `messages.getDhConfig#26cf8950`
    #[derive(Clone, Debug, PartialEq)]
    pub struct GetDhConfig {
        pub version: i32,
        pub random_length: i32,
    }

    impl Serializable for GetDhConfig {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            0x26cf8950u32.serialize(buf);
            self.version.serialize(buf);
            self.random_length.serialize(buf);
        }
    }

    impl RemoteCall for GetDhConfig {
        type Return = enums::messages::DhConfig;
    }

    /// `messages.requestEncryption#f64daf43`
    #[derive(Clone, Debug, PartialEq)]
    pub struct RequestEncryption {
        pub user_id: enums::InputUser,
        pub random_id: i32,
        pub g_a: Vec<u8>,
    }

    impl Serializable for RequestEncryption {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            0xf64daf43u32.serialize(buf);
            self.user_id.serialize(buf);
            self.random_id.serialize(buf);
            self.g_a.serialize(buf);
        }
    }

    impl RemoteCall for RequestEncryption {
        type Return = enums::EncryptedChat;
    }

    /// `messages.acceptEncryption#3dbc0415`
    #[derive(Clone, Debug, PartialEq)]
    pub struct AcceptEncryption {
        pub peer: enums::InputEncryptedChat,
        pub g_b: Vec<u8>,
        pub key_fingerprint: i64,
    }

    impl Serializable for AcceptEncryption {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            0x3dbc0415u32.serialize(buf);
            self.peer.serialize(buf);
            self.g_b.serialize(buf);
            self.key_fingerprint.serialize(buf);
        }
    }

    impl RemoteCall for AcceptEncryption {
        type Return = enums::EncryptedChat;
    }

    /// `messages.discardEncryption#edd923c5`
    #[derive(Clone, Debug, PartialEq)]
    pub struct DiscardEncryption {
        pub chat_id: i32,
    }

    impl Serializable for DiscardEncryption {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            0xedd923c5u32.serialize(buf);
            self.chat_id.serialize(buf);
        }
    }

    impl RemoteCall for DiscardEncryption {
        type Return = bool;
    }

    /// `messages.sendEncrypted#a9776773`
    #[derive(Clone, Debug, PartialEq)]
    pub struct SendEncrypted {
        pub peer: enums::InputEncryptedChat,
        pub random_id: i64,
        pub data: Vec<u8>,
    }

    impl Serializable for SendEncrypted {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            0xa9776773u32.serialize(buf);
            self.peer.serialize(buf);
            self.random_id.serialize(buf);
            self.data.serialize(buf);
        }
    }

    impl RemoteCall for SendEncrypted {
        type Return = enums::messages::SentEncryptedMessage;
    }

    /// `messages.sendEncryptedFile#9a901b66`
    #[derive(Clone, Debug, PartialEq)]
    pub struct SendEncryptedFile {
        pub peer: enums::InputEncryptedChat,
        pub random_id: i64,
        pub data: Vec<u8>,
        pub file: enums::InputEncryptedFile,
    }

    impl Serializable for SendEncryptedFile {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            0x9a901b66u32.serialize(buf);
            self.peer.serialize(buf);
            self.random_id.serialize(buf);
            self.data.serialize(buf);
            self.file.serialize(buf);
        }
    }

    impl RemoteCall for SendEncryptedFile {
        type Return = enums::messages::SentEncryptedMessage;
    }

    /// `messages.sendEncryptedService#32d439a4`
    #[derive(Clone, Debug, PartialEq)]
    pub struct SendEncryptedService {
        pub peer: enums::InputEncryptedChat,
        pub random_id: i64,
        pub data: Vec<u8>,
    }

    impl Serializable for SendEncryptedService {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            0x32d439a4u32.serialize(buf);
            self.peer.serialize(buf);
            self.random_id.serialize(buf);
            self.data.serialize(buf);
        }
    }

    impl RemoteCall for SendEncryptedService {
        type Return = enums::messages::SentEncryptedMessage;
    }
}
