//! MTProto session and transport layer.
//!
//! This crate handles:
//! * Message identifiers, sequence numbers and acknowledgement buffering
//! * The unauthenticated DH handshake (permanent and PFS temp keys)
//! * Encrypted envelopes (pack, unpack, full inbound validation)
//! * Dispatch of decrypted service payloads (containers, acks, results,
//!   errors, salts, gzip)
//! * Abridged stream framing with an incremental deframer
//!
//! It is intentionally transport-agnostic and sans-IO: the async client in
//! `tangram-client` owns the sockets and timers.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod authentication;
pub mod envelope;
pub mod encrypted;
pub mod message;
pub mod session;
pub mod transport;

pub use authentication::Finished;
pub use encrypted::EncryptedSession;
pub use message::{Message, MessageId};
pub use session::Session;
