//! TL binary serialization and the wire-type subset used by the client core.
//!
//! The full Telegram TL registry is out of scope for this workspace; this
//! crate carries only the closed constructor set the session layer, query
//! manager, update reconciler, secret-chat engine and transfer pipeline
//! actually speak. Everything follows the 32-bit-word aligned MTProto
//! encoding: boxed values are prefixed with their constructor id, strings and
//! byte blobs are length-prefixed and zero-padded to a 4-byte boundary.

#![deny(unsafe_code)]

pub mod deserialize;
pub mod serialize;

pub mod enums;
pub mod functions;
pub mod types;

pub use deserialize::{Cursor, Deserializable};
pub use serialize::Serializable;

/// API layer this schema subset was written against.
pub const LAYER: i32 = 45;

/// Secret-chat transport layer spoken by the engine.
pub const SECRET_LAYER: i32 = 17;

/// A bare `vector` (no leading constructor id).
#[derive(Clone, Debug, PartialEq)]
pub struct RawVec<T>(pub Vec<T>);

/// A serializable request whose server answer deserializes to [`RemoteCall::Return`].
pub trait RemoteCall: Serializable {
    /// The type of the response body.
    type Return: Deserializable;
}

/// Serialize a positive big-endian integer as TL `bytes`.
///
/// A leading zero byte is prepended when the top bit of the first byte is
/// set, so the value never reads back as negative.
pub fn serialize_bignum(bytes_be: &[u8], buf: &mut impl Extend<u8>) {
    let trimmed = {
        let skip = bytes_be.iter().position(|&b| b != 0).unwrap_or(bytes_be.len());
        &bytes_be[skip..]
    };
    if trimmed.first().is_some_and(|&b| b >= 0x80) {
        let mut v = Vec::with_capacity(trimmed.len() + 1);
        v.push(0);
        v.extend_from_slice(trimmed);
        v.as_slice().serialize(buf);
    } else {
        trimmed.serialize(buf);
    }
}

/// Parse TL `bytes` produced by [`serialize_bignum`] back into big-endian bytes.
pub fn deserialize_bignum(cur: &mut Cursor<'_>) -> deserialize::Result<Vec<u8>> {
    let mut bytes = Vec::<u8>::deserialize(cur)?;
    while bytes.first() == Some(&0) {
        bytes.remove(0);
    }
    Ok(bytes)
}
