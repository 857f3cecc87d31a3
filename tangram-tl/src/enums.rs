//! Boxed TL types: constructor id dispatch over the bare types.
//!
//! Each enum is a closed variant set; decoding a constructor id outside the
//! set fails with [`Error::UnexpectedConstructor`].

use crate::deserialize::{Buffer, Error, Result};
use crate::serialize::Serializable;
use crate::{types, Deserializable};

macro_rules! boxed_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $variant:ident($inner:ty) = $id:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        pub enum $name {
            $( $variant($inner), )+
        }

        impl Serializable for $name {
            fn serialize(&self, buf: &mut impl Extend<u8>) {
                match self {
                    $( Self::$variant(x) => {
                        ($id as u32).serialize(buf);
                        x.serialize(buf);
                    } )+
                }
            }
        }

        impl Deserializable for $name {
            fn deserialize(buf: Buffer) -> Result<Self> {
                match u32::deserialize(buf)? {
                    $( $id => Ok(Self::$variant(<$inner>::deserialize(buf)?)), )+
                    id => Err(Error::UnexpectedConstructor { id }),
                }
            }
        }
    };
}

macro_rules! unit_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $variant:ident = $id:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Eq, PartialEq)]
        pub enum $name {
            $( $variant, )+
        }

        impl Serializable for $name {
            fn serialize(&self, buf: &mut impl Extend<u8>) {
                match self {
                    $( Self::$variant => ($id as u32).serialize(buf), )+
                }
            }
        }

        impl Deserializable for $name {
            fn deserialize(buf: Buffer) -> Result<Self> {
                match u32::deserialize(buf)? {
                    $( $id => Ok(Self::$variant), )+
                    id => Err(Error::UnexpectedConstructor { id }),
                }
            }
        }
    };
}

// ─── Handshake ───────────────────────────────────────────────────────────────

boxed_enum! {
    /// `ResPQ`
    pub enum ResPq {
        ResPq(types::ResPq) = 0x05162463,
    }
}

boxed_enum! {
    /// `P_Q_inner_data` — permanent or temp (PFS) variant.
    pub enum PQInnerData {
        Data(types::PQInnerData) = 0x83c95aec,
        Temp(types::PQInnerDataTemp) = 0x3c6a84d4,
    }
}

boxed_enum! {
    /// `Server_DH_Params`
    pub enum ServerDhParams {
        Ok(types::ServerDhParamsOk) = 0xd0e8075c,
        Fail(types::ServerDhParamsFail) = 0x79cb045d,
    }
}

boxed_enum! {
    /// `Server_DH_inner_data`
    pub enum ServerDhInnerData {
        Data(types::ServerDhInnerData) = 0xb5890dba,
    }
}

boxed_enum! {
    /// `Client_DH_Inner_Data`
    pub enum ClientDhInnerData {
        Data(types::ClientDhInnerData) = 0x6643b654,
    }
}

boxed_enum! {
    /// `Set_client_DH_params_answer`
    pub enum SetClientDhParamsAnswer {
        DhGenOk(types::DhGenOk) = 0x3bcbf734,
        DhGenRetry(types::DhGenRetry) = 0x46dc1fb9,
        DhGenFail(types::DhGenFail) = 0xa69dae02,
    }
}

boxed_enum! {
    /// `BindAuthKeyInner`
    pub enum BindAuthKeyInner {
        Inner(types::BindAuthKeyInner) = 0x75a3f765,
    }
}

boxed_enum! {
    /// `Pong`
    pub enum Pong {
        Pong(types::Pong) = 0x347773c5,
    }
}

// ─── Peers ───────────────────────────────────────────────────────────────────

/// `Peer`
#[derive(Clone, Debug, PartialEq)]
pub enum Peer {
    User(types::PeerUser),
    Chat(types::PeerChat),
    Channel(types::PeerChannel),
}

impl Serializable for Peer {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        match self {
            Self::User(x) => {
                0x9db1bc6du32.serialize(buf);
                x.user_id.serialize(buf);
            }
            Self::Chat(x) => {
                0x36c6019au32.serialize(buf);
                x.chat_id.serialize(buf);
            }
            Self::Channel(x) => {
                0xa2426b19u32.serialize(buf);
                x.channel_id.serialize(buf);
            }
        }
    }
}

impl Deserializable for Peer {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            0x9db1bc6d => Ok(Self::User(types::PeerUser { user_id: i64::deserialize(buf)? })),
            0x36c6019a => Ok(Self::Chat(types::PeerChat { chat_id: i64::deserialize(buf)? })),
            0xa2426b19 => {
                Ok(Self::Channel(types::PeerChannel { channel_id: i64::deserialize(buf)? }))
            }
            id => Err(Error::UnexpectedConstructor { id }),
        }
    }
}

/// `User`
#[derive(Clone, Debug, PartialEq)]
pub enum User {
    Empty { id: i64 },
    User(types::User),
}

impl Serializable for User {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        match self {
            Self::Empty { id } => {
                0xd3bc4b7au32.serialize(buf);
                id.serialize(buf);
            }
            Self::User(x) => {
                0x215c4438u32.serialize(buf);
                x.serialize(buf);
            }
        }
    }
}

impl Deserializable for User {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            0xd3bc4b7a => Ok(Self::Empty { id: i64::deserialize(buf)? }),
            0x215c4438 => Ok(Self::User(types::User::deserialize(buf)?)),
            id => Err(Error::UnexpectedConstructor { id }),
        }
    }
}

/// `Chat`
#[derive(Clone, Debug, PartialEq)]
pub enum Chat {
    Empty { id: i64 },
    Chat(types::Chat),
    Channel(types::Channel),
}

impl Serializable for Chat {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        match self {
            Self::Empty { id } => {
                0x29562865u32.serialize(buf);
                id.serialize(buf);
            }
            Self::Chat(x) => {
                0x41cbf256u32.serialize(buf);
                x.serialize(buf);
            }
            Self::Channel(x) => {
                0xfe4478bdu32.serialize(buf);
                x.serialize(buf);
            }
        }
    }
}

impl Deserializable for Chat {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            0x29562865 => Ok(Self::Empty { id: i64::deserialize(buf)? }),
            0x41cbf256 => Ok(Self::Chat(types::Chat::deserialize(buf)?)),
            0xfe4478bd => Ok(Self::Channel(types::Channel::deserialize(buf)?)),
            id => Err(Error::UnexpectedConstructor { id }),
        }
    }
}

// ─── Messages and media ──────────────────────────────────────────────────────

/// `Message`
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    Empty { id: i32 },
    Message(types::Message),
}

impl Serializable for Message {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        match self {
            Self::Empty { id } => {
                0x83e5de54u32.serialize(buf);
                id.serialize(buf);
            }
            Self::Message(x) => {
                0x38116ee0u32.serialize(buf);
                x.serialize(buf);
            }
        }
    }
}

impl Deserializable for Message {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            0x83e5de54 => Ok(Self::Empty { id: i32::deserialize(buf)? }),
            0x38116ee0 => Ok(Self::Message(types::Message::deserialize(buf)?)),
            id => Err(Error::UnexpectedConstructor { id }),
        }
    }
}

boxed_enum! {
    /// `Photo`
    pub enum Photo {
        Photo(types::Photo) = 0xfb197a65,
    }
}

boxed_enum! {
    /// `Document`
    pub enum Document {
        Document(types::Document) = 0x9ba29cc1,
    }
}

/// `MessageMedia`
#[derive(Clone, Debug, PartialEq)]
pub enum MessageMedia {
    Empty,
    Photo(types::Photo),
    Document(types::Document),
}

impl Serializable for MessageMedia {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        match self {
            Self::Empty => 0x3ded6320u32.serialize(buf),
            Self::Photo(x) => {
                0x695150d7u32.serialize(buf);
                x.serialize(buf);
            }
            Self::Document(x) => {
                0x9cb070d7u32.serialize(buf);
                x.serialize(buf);
            }
        }
    }
}

impl Deserializable for MessageMedia {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            0x3ded6320 => Ok(Self::Empty),
            0x695150d7 => Ok(Self::Photo(types::Photo::deserialize(buf)?)),
            0x9cb070d7 => Ok(Self::Document(types::Document::deserialize(buf)?)),
            id => Err(Error::UnexpectedConstructor { id }),
        }
    }
}

/// `DocumentAttribute`
#[derive(Clone, Debug, PartialEq)]
pub enum DocumentAttribute {
    ImageSize { w: i32, h: i32 },
    Animated,
    Sticker,
    Video { duration: i32, w: i32, h: i32 },
    Audio { duration: i32 },
    Filename { file_name: String },
}

impl Serializable for DocumentAttribute {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        match self {
            Self::ImageSize { w, h } => {
                0x6c37c15cu32.serialize(buf);
                w.serialize(buf);
                h.serialize(buf);
            }
            Self::Animated => 0x11b58939u32.serialize(buf),
            Self::Sticker => 0xfb0a5727u32.serialize(buf),
            Self::Video { duration, w, h } => {
                0x5910cccbu32.serialize(buf);
                duration.serialize(buf);
                w.serialize(buf);
                h.serialize(buf);
            }
            Self::Audio { duration } => {
                0x051448e5u32.serialize(buf);
                duration.serialize(buf);
            }
            Self::Filename { file_name } => {
                0x15590068u32.serialize(buf);
                file_name.serialize(buf);
            }
        }
    }
}

impl Deserializable for DocumentAttribute {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            0x6c37c15c => Ok(Self::ImageSize { w: i32::deserialize(buf)?, h: i32::deserialize(buf)? }),
            0x11b58939 => Ok(Self::Animated),
            0xfb0a5727 => Ok(Self::Sticker),
            0x5910cccb => Ok(Self::Video {
                duration: i32::deserialize(buf)?,
                w: i32::deserialize(buf)?,
                h: i32::deserialize(buf)?,
            }),
            0x051448e5 => Ok(Self::Audio { duration: i32::deserialize(buf)? }),
            0x15590068 => Ok(Self::Filename { file_name: String::deserialize(buf)? }),
            id => Err(Error::UnexpectedConstructor { id }),
        }
    }
}

/// `UserStatus`
#[derive(Clone, Debug, PartialEq)]
pub enum UserStatus {
    Empty,
    Online { expires: i32 },
    Offline { was_online: i32 },
}

impl Serializable for UserStatus {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        match self {
            Self::Empty => 0x09d05049u32.serialize(buf),
            Self::Online { expires } => {
                0xedb93949u32.serialize(buf);
                expires.serialize(buf);
            }
            Self::Offline { was_online } => {
                0x008c703fu32.serialize(buf);
                was_online.serialize(buf);
            }
        }
    }
}

impl Deserializable for UserStatus {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            0x09d05049 => Ok(Self::Empty),
            0xedb93949 => Ok(Self::Online { expires: i32::deserialize(buf)? }),
            0x008c703f => Ok(Self::Offline { was_online: i32::deserialize(buf)? }),
            id => Err(Error::UnexpectedConstructor { id }),
        }
    }
}

unit_enum! {
    /// `SendMessageAction` (subset)
    pub enum SendMessageAction {
        Typing = 0x16bf744e,
        Cancel = 0xfd5ec8f5,
    }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// `InputPeer`
#[derive(Clone, Debug, PartialEq)]
pub enum InputPeer {
    Empty,
    PeerSelf,
    Chat { chat_id: i64 },
    User { user_id: i64, access_hash: i64 },
    Channel { channel_id: i64, access_hash: i64 },
}

impl Serializable for InputPeer {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        match self {
            Self::Empty => 0x7f3b18eau32.serialize(buf),
            Self::PeerSelf => 0x7da07ec9u32.serialize(buf),
            Self::Chat { chat_id } => {
                0x35a95cb9u32.serialize(buf);
                chat_id.serialize(buf);
            }
            Self::User { user_id, access_hash } => {
                0xdde8a54cu32.serialize(buf);
                user_id.serialize(buf);
                access_hash.serialize(buf);
            }
            Self::Channel { channel_id, access_hash } => {
                0x27bcbbfcu32.serialize(buf);
                channel_id.serialize(buf);
                access_hash.serialize(buf);
            }
        }
    }
}

impl Deserializable for InputPeer {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            0x7f3b18ea => Ok(Self::Empty),
            0x7da07ec9 => Ok(Self::PeerSelf),
            0x35a95cb9 => Ok(Self::Chat { chat_id: i64::deserialize(buf)? }),
            0xdde8a54c => Ok(Self::User {
                user_id: i64::deserialize(buf)?,
                access_hash: i64::deserialize(buf)?,
            }),
            0x27bcbbfc => Ok(Self::Channel {
                channel_id: i64::deserialize(buf)?,
                access_hash: i64::deserialize(buf)?,
            }),
            id => Err(Error::UnexpectedConstructor { id }),
        }
    }
}

/// `InputUser`
#[derive(Clone, Debug, PartialEq)]
pub enum InputUser {
    Empty,
    UserSelf,
    User { user_id: i64, access_hash: i64 },
}

impl Serializable for InputUser {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        match self {
            Self::Empty => 0xb98886cfu32.serialize(buf),
            Self::UserSelf => 0xf7c1b13fu32.serialize(buf),
            Self::User { user_id, access_hash } => {
                0xf21158c6u32.serialize(buf);
                user_id.serialize(buf);
                access_hash.serialize(buf);
            }
        }
    }
}

impl Deserializable for InputUser {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            0xb98886cf => Ok(Self::Empty),
            0xf7c1b13f => Ok(Self::UserSelf),
            0xf21158c6 => Ok(Self::User {
                user_id: i64::deserialize(buf)?,
                access_hash: i64::deserialize(buf)?,
            }),
            id => Err(Error::UnexpectedConstructor { id }),
        }
    }
}

/// `InputChannel`
#[derive(Clone, Debug, PartialEq)]
pub enum InputChannel {
    Empty,
    Channel { channel_id: i64, access_hash: i64 },
}

impl Serializable for InputChannel {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        match self {
            Self::Empty => 0xee8c1e86u32.serialize(buf),
            Self::Channel { channel_id, access_hash } => {
                0xf35aec28u32.serialize(buf);
                channel_id.serialize(buf);
                access_hash.serialize(buf);
            }
        }
    }
}

impl Deserializable for InputChannel {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            0xee8c1e86 => Ok(Self::Empty),
            0xf35aec28 => Ok(Self::Channel {
                channel_id: i64::deserialize(buf)?,
                access_hash: i64::deserialize(buf)?,
            }),
            id => Err(Error::UnexpectedConstructor { id }),
        }
    }
}

/// `InputFile`
#[derive(Clone, Debug, PartialEq)]
pub enum InputFile {
    File { id: i64, parts: i32, name: String, md5_checksum: String },
    Big { id: i64, parts: i32, name: String },
}

impl Serializable for InputFile {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        match self {
            Self::File { id, parts, name, md5_checksum } => {
                0xf52ff27fu32.serialize(buf);
                id.serialize(buf);
                parts.serialize(buf);
                name.serialize(buf);
                md5_checksum.serialize(buf);
            }
            Self::Big { id, parts, name } => {
                0xfa4f0bb5u32.serialize(buf);
                id.serialize(buf);
                parts.serialize(buf);
                name.serialize(buf);
            }
        }
    }
}

impl Deserializable for InputFile {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            0xf52ff27f => Ok(Self::File {
                id: i64::deserialize(buf)?,
                parts: i32::deserialize(buf)?,
                name: String::deserialize(buf)?,
                md5_checksum: String::deserialize(buf)?,
            }),
            0xfa4f0bb5 => Ok(Self::Big {
                id: i64::deserialize(buf)?,
                parts: i32::deserialize(buf)?,
                name: String::deserialize(buf)?,
            }),
            id => Err(Error::UnexpectedConstructor { id }),
        }
    }
}

/// `InputFileLocation`
#[derive(Clone, Debug, PartialEq)]
pub enum InputFileLocation {
    Location { volume_id: i64, local_id: i32, secret: i64 },
    Document { id: i64, access_hash: i64 },
    Encrypted { id: i64, access_hash: i64 },
}

impl Serializable for InputFileLocation {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        match self {
            Self::Location { volume_id, local_id, secret } => {
                0x14637196u32.serialize(buf);
                volume_id.serialize(buf);
                local_id.serialize(buf);
                secret.serialize(buf);
            }
            Self::Document { id, access_hash } => {
                0x4e45abe9u32.serialize(buf);
                id.serialize(buf);
                access_hash.serialize(buf);
            }
            Self::Encrypted { id, access_hash } => {
                0xf5235d55u32.serialize(buf);
                id.serialize(buf);
                access_hash.serialize(buf);
            }
        }
    }
}

impl Deserializable for InputFileLocation {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            0x14637196 => Ok(Self::Location {
                volume_id: i64::deserialize(buf)?,
                local_id: i32::deserialize(buf)?,
                secret: i64::deserialize(buf)?,
            }),
            0x4e45abe9 => Ok(Self::Document {
                id: i64::deserialize(buf)?,
                access_hash: i64::deserialize(buf)?,
            }),
            0xf5235d55 => Ok(Self::Encrypted {
                id: i64::deserialize(buf)?,
                access_hash: i64::deserialize(buf)?,
            }),
            id => Err(Error::UnexpectedConstructor { id }),
        }
    }
}

/// `InputMedia` (subset)
#[derive(Clone, Debug, PartialEq)]
pub enum InputMedia {
    UploadedPhoto { file: InputFile },
    UploadedDocument { file: InputFile, mime_type: String, attributes: Vec<DocumentAttribute> },
}

impl Serializable for InputMedia {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        match self {
            Self::UploadedPhoto { file } => {
                0x1e287d04u32.serialize(buf);
                file.serialize(buf);
            }
            Self::UploadedDocument { file, mime_type, attributes } => {
                0x5b38c6c1u32.serialize(buf);
                file.serialize(buf);
                mime_type.serialize(buf);
                attributes.serialize(buf);
            }
        }
    }
}

impl Deserializable for InputMedia {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            0x1e287d04 => Ok(Self::UploadedPhoto { file: InputFile::deserialize(buf)? }),
            0x5b38c6c1 => Ok(Self::UploadedDocument {
                file: InputFile::deserialize(buf)?,
                mime_type: String::deserialize(buf)?,
                attributes: Vec::<DocumentAttribute>::deserialize(buf)?,
            }),
            id => Err(Error::UnexpectedConstructor { id }),
        }
    }
}

// ─── Secret chats ────────────────────────────────────────────────────────────

/// `EncryptedChat`
#[derive(Clone, Debug, PartialEq)]
pub enum EncryptedChat {
    Empty { id: i32 },
    Waiting(types::EncryptedChatWaiting),
    Requested(types::EncryptedChatRequested),
    Chat(types::EncryptedChat),
    Discarded { id: i32 },
}

impl Serializable for EncryptedChat {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        match self {
            Self::Empty { id } => {
                0xab7ec0a0u32.serialize(buf);
                id.serialize(buf);
            }
            Self::Waiting(x) => {
                0x3bf703dcu32.serialize(buf);
                x.serialize(buf);
            }
            Self::Requested(x) => {
                0xc878527eu32.serialize(buf);
                x.serialize(buf);
            }
            Self::Chat(x) => {
                0xfa56ce36u32.serialize(buf);
                x.serialize(buf);
            }
            Self::Discarded { id } => {
                0x13d6dd27u32.serialize(buf);
                id.serialize(buf);
            }
        }
    }
}

impl Deserializable for EncryptedChat {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            0xab7ec0a0 => Ok(Self::Empty { id: i32::deserialize(buf)? }),
            0x3bf703dc => Ok(Self::Waiting(types::EncryptedChatWaiting::deserialize(buf)?)),
            0xc878527e => Ok(Self::Requested(types::EncryptedChatRequested::deserialize(buf)?)),
            0xfa56ce36 => Ok(Self::Chat(types::EncryptedChat::deserialize(buf)?)),
            0x13d6dd27 => Ok(Self::Discarded { id: i32::deserialize(buf)? }),
            id => Err(Error::UnexpectedConstructor { id }),
        }
    }
}

boxed_enum! {
    /// `InputEncryptedChat`
    pub enum InputEncryptedChat {
        Chat(types::InputEncryptedChat) = 0xf141b5e1,
    }
}

boxed_enum! {
    /// `EncryptedMessage`
    pub enum EncryptedMessage {
        Message(types::EncryptedMessage) = 0xed18c118,
        Service(types::EncryptedMessageService) = 0x23734b06,
    }
}

/// `EncryptedFile`
#[derive(Clone, Debug, PartialEq)]
pub enum EncryptedFile {
    Empty,
    File(types::EncryptedFileData),
}

impl Serializable for EncryptedFile {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        match self {
            Self::Empty => 0xc21f497eu32.serialize(buf),
            Self::File(x) => {
                0x4a70994cu32.serialize(buf);
                x.serialize(buf);
            }
        }
    }
}

impl Deserializable for EncryptedFile {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            0xc21f497e => Ok(Self::Empty),
            0x4a70994c => Ok(Self::File(types::EncryptedFileData::deserialize(buf)?)),
            id => Err(Error::UnexpectedConstructor { id }),
        }
    }
}

/// `InputEncryptedFile`
#[derive(Clone, Debug, PartialEq)]
pub enum InputEncryptedFile {
    Empty,
    Uploaded { id: i64, parts: i32, md5_checksum: String, key_fingerprint: i32 },
    BigUploaded { id: i64, parts: i32, key_fingerprint: i32 },
    File { id: i64, access_hash: i64 },
}

impl Serializable for InputEncryptedFile {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        match self {
            Self::Empty => 0x1837c364u32.serialize(buf),
            Self::Uploaded { id, parts, md5_checksum, key_fingerprint } => {
                0x64bd0306u32.serialize(buf);
                id.serialize(buf);
                parts.serialize(buf);
                md5_checksum.serialize(buf);
                key_fingerprint.serialize(buf);
            }
            Self::BigUploaded { id, parts, key_fingerprint } => {
                0x2dc173c8u32.serialize(buf);
                id.serialize(buf);
                parts.serialize(buf);
                key_fingerprint.serialize(buf);
            }
            Self::File { id, access_hash } => {
                0x5a17b5e5u32.serialize(buf);
                id.serialize(buf);
                access_hash.serialize(buf);
            }
        }
    }
}

impl Deserializable for InputEncryptedFile {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            0x1837c364 => Ok(Self::Empty),
            0x64bd0306 => Ok(Self::Uploaded {
                id: i64::deserialize(buf)?,
                parts: i32::deserialize(buf)?,
                md5_checksum: String::deserialize(buf)?,
                key_fingerprint: i32::deserialize(buf)?,
            }),
            0x2dc173c8 => Ok(Self::BigUploaded {
                id: i64::deserialize(buf)?,
                parts: i32::deserialize(buf)?,
                key_fingerprint: i32::deserialize(buf)?,
            }),
            0x5a17b5e5 => Ok(Self::File {
                id: i64::deserialize(buf)?,
                access_hash: i64::deserialize(buf)?,
            }),
            id => Err(Error::UnexpectedConstructor { id }),
        }
    }
}

boxed_enum! {
    /// `DecryptedMessage` (layer 17)
    pub enum DecryptedMessage {
        Message(types::DecryptedMessageData) = 0x204d3878,
        Service(types::DecryptedMessageServiceData) = 0x73164160,
    }
}

boxed_enum! {
    /// `DecryptedMessageLayer`
    pub enum DecryptedMessageLayer {
        Layer(types::DecryptedMessageLayer) = 0x1be31789,
    }
}

/// `DecryptedMessageMedia` (subset)
#[derive(Clone, Debug, PartialEq)]
pub enum DecryptedMessageMedia {
    Empty,
    Photo(types::DecryptedMessageMediaPhoto),
    Document(types::DecryptedMessageMediaDocument),
}

impl Serializable for DecryptedMessageMedia {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        match self {
            Self::Empty => 0x089f5c4au32.serialize(buf),
            Self::Photo(x) => {
                0x32798a8cu32.serialize(buf);
                x.serialize(buf);
            }
            Self::Document(x) => {
                0xb095434bu32.serialize(buf);
                x.serialize(buf);
            }
        }
    }
}

impl Deserializable for DecryptedMessageMedia {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            0x089f5c4a => Ok(Self::Empty),
            0x32798a8c => Ok(Self::Photo(types::DecryptedMessageMediaPhoto::deserialize(buf)?)),
            0xb095434b => {
                Ok(Self::Document(types::DecryptedMessageMediaDocument::deserialize(buf)?))
            }
            id => Err(Error::UnexpectedConstructor { id }),
        }
    }
}

/// `DecryptedMessageAction` (subset)
#[derive(Clone, Debug, PartialEq)]
pub enum DecryptedMessageAction {
    SetMessageTtl { ttl_seconds: i32 },
    ReadMessages { random_ids: Vec<i64> },
    DeleteMessages { random_ids: Vec<i64> },
    FlushHistory,
    Resend(types::DecryptedMessageActionResend),
    NotifyLayer { layer: i32 },
    Typing { action: SendMessageAction },
}

impl Serializable for DecryptedMessageAction {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        match self {
            Self::SetMessageTtl { ttl_seconds } => {
                0xa1733aecu32.serialize(buf);
                ttl_seconds.serialize(buf);
            }
            Self::ReadMessages { random_ids } => {
                0x0c4f40beu32.serialize(buf);
                random_ids.serialize(buf);
            }
            Self::DeleteMessages { random_ids } => {
                0x65614304u32.serialize(buf);
                random_ids.serialize(buf);
            }
            Self::FlushHistory => 0x6719e45cu32.serialize(buf),
            Self::Resend(x) => {
                0x511110b0u32.serialize(buf);
                x.serialize(buf);
            }
            Self::NotifyLayer { layer } => {
                0xf3048883u32.serialize(buf);
                layer.serialize(buf);
            }
            Self::Typing { action } => {
                0xccb27641u32.serialize(buf);
                action.serialize(buf);
            }
        }
    }
}

impl Deserializable for DecryptedMessageAction {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            0xa1733aec => Ok(Self::SetMessageTtl { ttl_seconds: i32::deserialize(buf)? }),
            0x0c4f40be => Ok(Self::ReadMessages { random_ids: Vec::<i64>::deserialize(buf)? }),
            0x65614304 => Ok(Self::DeleteMessages { random_ids: Vec::<i64>::deserialize(buf)? }),
            0x6719e45c => Ok(Self::FlushHistory),
            0x511110b0 => Ok(Self::Resend(types::DecryptedMessageActionResend::deserialize(buf)?)),
            0xf3048883 => Ok(Self::NotifyLayer { layer: i32::deserialize(buf)? }),
            0xccb27641 => Ok(Self::Typing { action: SendMessageAction::deserialize(buf)? }),
            id => Err(Error::UnexpectedConstructor { id }),
        }
    }
}

// ─── Updates ─────────────────────────────────────────────────────────────────

/// `Update` (subset)
#[derive(Clone, Debug, PartialEq)]
pub enum Update {
    NewMessage { message: Message, pts: i32, pts_count: i32 },
    MessageId { id: i32, random_id: i64 },
    DeleteMessages { messages: Vec<i32>, pts: i32, pts_count: i32 },
    ReadHistoryInbox { peer: Peer, max_id: i32, pts: i32, pts_count: i32 },
    ReadHistoryOutbox { peer: Peer, max_id: i32, pts: i32, pts_count: i32 },
    UserTyping { user_id: i64, action: SendMessageAction },
    ChatUserTyping { chat_id: i64, user_id: i64, action: SendMessageAction },
    UserStatus { user_id: i64, status: UserStatus },
    NewChannelMessage { message: Message, pts: i32, pts_count: i32 },
    ChannelTooLong { channel_id: i64, pts: Option<i32> },
    NewEncryptedMessage { message: EncryptedMessage, qts: i32 },
    Encryption { chat: EncryptedChat, date: i32 },
    EncryptedChatTyping { chat_id: i32 },
    EncryptedMessagesRead { chat_id: i32, max_date: i32, date: i32 },
    DcOptions { dc_options: Vec<DcOption> },
}

impl Serializable for Update {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        match self {
            Self::NewMessage { message, pts, pts_count } => {
                0x1f2b0afdu32.serialize(buf);
                message.serialize(buf);
                pts.serialize(buf);
                pts_count.serialize(buf);
            }
            Self::MessageId { id, random_id } => {
                0x4e90bfd6u32.serialize(buf);
                id.serialize(buf);
                random_id.serialize(buf);
            }
            Self::DeleteMessages { messages, pts, pts_count } => {
                0xa20db0e5u32.serialize(buf);
                messages.serialize(buf);
                pts.serialize(buf);
                pts_count.serialize(buf);
            }
            Self::ReadHistoryInbox { peer, max_id, pts, pts_count } => {
                0x9961fd5cu32.serialize(buf);
                peer.serialize(buf);
                max_id.serialize(buf);
                pts.serialize(buf);
                pts_count.serialize(buf);
            }
            Self::ReadHistoryOutbox { peer, max_id, pts, pts_count } => {
                0x2f2f21bfu32.serialize(buf);
                peer.serialize(buf);
                max_id.serialize(buf);
                pts.serialize(buf);
                pts_count.serialize(buf);
            }
            Self::UserTyping { user_id, action } => {
                0x5c486927u32.serialize(buf);
                user_id.serialize(buf);
                action.serialize(buf);
            }
            Self::ChatUserTyping { chat_id, user_id, action } => {
                0x9a65ea1fu32.serialize(buf);
                chat_id.serialize(buf);
                user_id.serialize(buf);
                action.serialize(buf);
            }
            Self::UserStatus { user_id, status } => {
                0x1bfbd823u32.serialize(buf);
                user_id.serialize(buf);
                status.serialize(buf);
            }
            Self::NewChannelMessage { message, pts, pts_count } => {
                0x62ba04d9u32.serialize(buf);
                message.serialize(buf);
                pts.serialize(buf);
                pts_count.serialize(buf);
            }
            Self::ChannelTooLong { channel_id, pts } => {
                0xeb0467fbu32.serialize(buf);
                let flags: u32 = if pts.is_some() { 1 } else { 0 };
                flags.serialize(buf);
                channel_id.serialize(buf);
                pts.serialize(buf);
            }
            Self::NewEncryptedMessage { message, qts } => {
                0x12bcbd9au32.serialize(buf);
                message.serialize(buf);
                qts.serialize(buf);
            }
            Self::Encryption { chat, date } => {
                0xb4a2e88du32.serialize(buf);
                chat.serialize(buf);
                date.serialize(buf);
            }
            Self::EncryptedChatTyping { chat_id } => {
                0x1710f156u32.serialize(buf);
                chat_id.serialize(buf);
            }
            Self::EncryptedMessagesRead { chat_id, max_date, date } => {
                0x38fe25b7u32.serialize(buf);
                chat_id.serialize(buf);
                max_date.serialize(buf);
                date.serialize(buf);
            }
            Self::DcOptions { dc_options } => {
                0x8e5e9873u32.serialize(buf);
                dc_options.serialize(buf);
            }
        }
    }
}

impl Deserializable for Update {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            0x1f2b0afd => Ok(Self::NewMessage {
                message: Message::deserialize(buf)?,
                pts: i32::deserialize(buf)?,
                pts_count: i32::deserialize(buf)?,
            }),
            0x4e90bfd6 => Ok(Self::MessageId {
                id: i32::deserialize(buf)?,
                random_id: i64::deserialize(buf)?,
            }),
            0xa20db0e5 => Ok(Self::DeleteMessages {
                messages: Vec::<i32>::deserialize(buf)?,
                pts: i32::deserialize(buf)?,
                pts_count: i32::deserialize(buf)?,
            }),
            0x9961fd5c => Ok(Self::ReadHistoryInbox {
                peer: Peer::deserialize(buf)?,
                max_id: i32::deserialize(buf)?,
                pts: i32::deserialize(buf)?,
                pts_count: i32::deserialize(buf)?,
            }),
            0x2f2f21bf => Ok(Self::ReadHistoryOutbox {
                peer: Peer::deserialize(buf)?,
                max_id: i32::deserialize(buf)?,
                pts: i32::deserialize(buf)?,
                pts_count: i32::deserialize(buf)?,
            }),
            0x5c486927 => Ok(Self::UserTyping {
                user_id: i64::deserialize(buf)?,
                action: SendMessageAction::deserialize(buf)?,
            }),
            0x9a65ea1f => Ok(Self::ChatUserTyping {
                chat_id: i64::deserialize(buf)?,
                user_id: i64::deserialize(buf)?,
                action: SendMessageAction::deserialize(buf)?,
            }),
            0x1bfbd823 => Ok(Self::UserStatus {
                user_id: i64::deserialize(buf)?,
                status: UserStatus::deserialize(buf)?,
            }),
            0x62ba04d9 => Ok(Self::NewChannelMessage {
                message: Message::deserialize(buf)?,
                pts: i32::deserialize(buf)?,
                pts_count: i32::deserialize(buf)?,
            }),
            0xeb0467fb => {
                let flags = u32::deserialize(buf)?;
                Ok(Self::ChannelTooLong {
                    channel_id: i64::deserialize(buf)?,
                    pts: if flags & 1 != 0 { Some(i32::deserialize(buf)?) } else { None },
                })
            }
            0x12bcbd9a => Ok(Self::NewEncryptedMessage {
                message: EncryptedMessage::deserialize(buf)?,
                qts: i32::deserialize(buf)?,
            }),
            0xb4a2e88d => Ok(Self::Encryption {
                chat: EncryptedChat::deserialize(buf)?,
                date: i32::deserialize(buf)?,
            }),
            0x1710f156 => Ok(Self::EncryptedChatTyping { chat_id: i32::deserialize(buf)? }),
            0x38fe25b7 => Ok(Self::EncryptedMessagesRead {
                chat_id: i32::deserialize(buf)?,
                max_date: i32::deserialize(buf)?,
                date: i32::deserialize(buf)?,
            }),
            0x8e5e9873 => Ok(Self::DcOptions { dc_options: Vec::<DcOption>::deserialize(buf)? }),
            id => Err(Error::UnexpectedConstructor { id }),
        }
    }
}

/// `Updates` — the top-level update envelope.
#[derive(Clone, Debug, PartialEq)]
pub enum Updates {
    TooLong,
    ShortMessage {
        out: bool,
        id: i32,
        user_id: i64,
        message: String,
        pts: i32,
        pts_count: i32,
        date: i32,
    },
    ShortChatMessage {
        out: bool,
        id: i32,
        from_id: i64,
        chat_id: i64,
        message: String,
        pts: i32,
        pts_count: i32,
        date: i32,
    },
    Short { update: Update, date: i32 },
    Combined {
        updates: Vec<Update>,
        users: Vec<User>,
        chats: Vec<Chat>,
        date: i32,
        seq_start: i32,
        seq: i32,
    },
    Updates {
        updates: Vec<Update>,
        users: Vec<User>,
        chats: Vec<Chat>,
        date: i32,
        seq: i32,
    },
}

impl Serializable for Updates {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        match self {
            Self::TooLong => 0xe317af7eu32.serialize(buf),
            Self::ShortMessage { out, id, user_id, message, pts, pts_count, date } => {
                0x313bc7f8u32.serialize(buf);
                let flags: u32 = if *out { 1 << 1 } else { 0 };
                flags.serialize(buf);
                id.serialize(buf);
                user_id.serialize(buf);
                message.serialize(buf);
                pts.serialize(buf);
                pts_count.serialize(buf);
                date.serialize(buf);
            }
            Self::ShortChatMessage { out, id, from_id, chat_id, message, pts, pts_count, date } => {
                0x4d6deea5u32.serialize(buf);
                let flags: u32 = if *out { 1 << 1 } else { 0 };
                flags.serialize(buf);
                id.serialize(buf);
                from_id.serialize(buf);
                chat_id.serialize(buf);
                message.serialize(buf);
                pts.serialize(buf);
                pts_count.serialize(buf);
                date.serialize(buf);
            }
            Self::Short { update, date } => {
                0x78d4dec1u32.serialize(buf);
                update.serialize(buf);
                date.serialize(buf);
            }
            Self::Combined { updates, users, chats, date, seq_start, seq } => {
                0x725b04c3u32.serialize(buf);
                updates.serialize(buf);
                users.serialize(buf);
                chats.serialize(buf);
                date.serialize(buf);
                seq_start.serialize(buf);
                seq.serialize(buf);
            }
            Self::Updates { updates, users, chats, date, seq } => {
                0x74ae4240u32.serialize(buf);
                updates.serialize(buf);
                users.serialize(buf);
                chats.serialize(buf);
                date.serialize(buf);
                seq.serialize(buf);
            }
        }
    }
}

impl Deserializable for Updates {
    fn deserialize(buf: Buffer) -> Result<Self> {
        match u32::deserialize(buf)? {
            0xe317af7e => Ok(Self::TooLong),
            0x313bc7f8 => {
                let flags = u32::deserialize(buf)?;
                Ok(Self::ShortMessage {
                    out: flags & (1 << 1) != 0,
                    id: i32::deserialize(buf)?,
                    user_id: i64::deserialize(buf)?,
                    message: String::deserialize(buf)?,
                    pts: i32::deserialize(buf)?,
                    pts_count: i32::deserialize(buf)?,
                    date: i32::deserialize(buf)?,
                })
            }
            0x4d6deea5 => {
                let flags = u32::deserialize(buf)?;
                Ok(Self::ShortChatMessage {
                    out: flags & (1 << 1) != 0,
                    id: i32::deserialize(buf)?,
                    from_id: i64::deserialize(buf)?,
                    chat_id: i64::deserialize(buf)?,
                    message: String::deserialize(buf)?,
                    pts: i32::deserialize(buf)?,
                    pts_count: i32::deserialize(buf)?,
                    date: i32::deserialize(buf)?,
                })
            }
            0x78d4dec1 => Ok(Self::Short {
                update: Update::deserialize(buf)?,
                date: i32::deserialize(buf)?,
            }),
            0x725b04c3 => Ok(Self::Combined {
                updates: Vec::<Update>::deserialize(buf)?,
                users: Vec::<User>::deserialize(buf)?,
                chats: Vec::<Chat>::deserialize(buf)?,
                date: i32::deserialize(buf)?,
                seq_start: i32::deserialize(buf)?,
                seq: i32::deserialize(buf)?,
            }),
            0x74ae4240 => Ok(Self::Updates {
                updates: Vec::<Update>::deserialize(buf)?,
                users: Vec::<User>::deserialize(buf)?,
                chats: Vec::<Chat>::deserialize(buf)?,
                date: i32::deserialize(buf)?,
                seq: i32::deserialize(buf)?,
            }),
            id => Err(Error::UnexpectedConstructor { id }),
        }
    }
}

pub mod updates {
    use super::*;

    boxed_enum! {
        /// `updates.State`
        pub enum State {
            State(types::updates::State) = 0xa56c2a3e,
        }
    }

    boxed_enum! {
        /// `updates.Difference`
        pub enum Difference {
            Empty(types::updates::DifferenceEmpty) = 0x5d75a138,
            Difference(types::updates::Difference) = 0x00f49ca0,
            Slice(types::updates::DifferenceSlice) = 0xa8fb1981,
        }
    }

    boxed_enum! {
        /// `updates.ChannelDifference`
        pub enum ChannelDifference {
            Empty(types::updates::ChannelDifferenceEmpty) = 0x3e11affb,
            TooLong(types::updates::ChannelDifferenceTooLong) = 0x410dee07,
            Difference(types::updates::ChannelDifference) = 0x2064674e,
        }
    }
}

unit_enum! {
    /// `ChannelMessagesFilter` (subset)
    pub enum ChannelMessagesFilter {
        Empty = 0x94d42ee7,
    }
}

// ─── Config / auth / storage ─────────────────────────────────────────────────

boxed_enum! {
    /// `DcOption`
    pub enum DcOption {
        DcOption(types::DcOption) = 0x18b7a10d,
    }
}

boxed_enum! {
    /// `Config`
    pub enum Config {
        Config(types::Config) = 0x4e32b894,
    }
}

pub mod auth {
    use super::*;

    boxed_enum! {
        /// `auth.SentCode`
        pub enum SentCode {
            SentCode(types::auth::SentCode) = 0xefed51d9,
        }
    }

    boxed_enum! {
        /// `auth.Authorization`
        pub enum Authorization {
            Authorization(types::auth::Authorization) = 0xf6b673a4,
        }
    }

    boxed_enum! {
        /// `auth.ExportedAuthorization`
        pub enum ExportedAuthorization {
            ExportedAuthorization(types::auth::ExportedAuthorization) = 0xdf969c2d,
        }
    }
}

pub mod storage {
    use super::*;

    unit_enum! {
        /// `storage.FileType`
        pub enum FileType {
            Unknown = 0xaa963b05,
            Partial = 0x40bc6f52,
            Jpeg = 0x007efe0e,
            Gif = 0xcae1aadf,
            Png = 0x0a4f63c0,
            Pdf = 0xae1e508d,
            Mp3 = 0x528a0677,
            Mov = 0x4b09ebbc,
            Mp4 = 0xb3cea0e4,
            Webp = 0x1081464c,
        }
    }

    impl FileType {
        /// Conventional file extension, if the type implies one.
        pub fn extension(&self) -> Option<&'static str> {
            match self {
                Self::Jpeg => Some("jpg"),
                Self::Gif => Some("gif"),
                Self::Png => Some("png"),
                Self::Pdf => Some("pdf"),
                Self::Mp3 => Some("mp3"),
                Self::Mov => Some("mov"),
                Self::Mp4 => Some("mp4"),
                Self::Webp => Some("webp"),
                Self::Unknown | Self::Partial => None,
            }
        }
    }
}

pub mod upload {
    use super::*;

    boxed_enum! {
        /// `upload.File`
        pub enum File {
            File(types::upload::File) = 0x096a18d5,
        }
    }
}

pub mod messages {
    use super::*;

    boxed_enum! {
        /// `messages.DhConfig`
        pub enum DhConfig {
            NotModified(types::messages::DhConfigNotModified) = 0xc0e24635,
            Config(types::messages::DhConfig) = 0x2c221edd,
        }
    }

    /// `messages.SentEncryptedMessage`
    #[derive(Clone, Debug, PartialEq)]
    pub enum SentEncryptedMessage {
        Message { date: i32 },
        File(types::messages::SentEncryptedFile),
    }

    impl Serializable for SentEncryptedMessage {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            match self {
                Self::Message { date } => {
                    0x560f8935u32.serialize(buf);
                    date.serialize(buf);
                }
                Self::File(x) => {
                    0x9493ff32u32.serialize(buf);
                    x.serialize(buf);
                }
            }
        }
    }

    impl Deserializable for SentEncryptedMessage {
        fn deserialize(buf: Buffer) -> Result<Self> {
            match u32::deserialize(buf)? {
                0x560f8935 => Ok(Self::Message { date: i32::deserialize(buf)? }),
                0x9493ff32 => Ok(Self::File(types::messages::SentEncryptedFile::deserialize(buf)?)),
                id => Err(Error::UnexpectedConstructor { id }),
            }
        }
    }
}
