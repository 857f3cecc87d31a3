//! Plaintext session state for the handshake phase.

use std::collections::BTreeSet;

use tangram_tl::RemoteCall;

use crate::message::{Message, MessageId};

/// Tracks per-connection message-id and seq-no state.
///
/// A `Session` is cheap to create and is discarded on reconnect. The same
/// counters later seed the [`crate::EncryptedSession`] once an auth key
/// exists.
pub struct Session {
    time_offset: i32,
    last_msg_id: i64,
    seq: i32,
    pending_acks: BTreeSet<i64>,
}

impl Session {
    /// Create a fresh session with no server-time correction.
    pub fn new() -> Self {
        Self::with_time_offset(0)
    }

    /// Create a session with a known clock skew against the server.
    pub fn with_time_offset(time_offset: i32) -> Self {
        Self { time_offset, last_msg_id: 0, seq: 0, pending_acks: BTreeSet::new() }
    }

    /// Allocate a new strictly-increasing message id.
    pub fn next_msg_id(&mut self) -> MessageId {
        let id = MessageId::generate(self.last_msg_id, self.time_offset);
        self.last_msg_id = id.0;
        id
    }

    /// Next sequence number.
    ///
    /// Content-related messages get `seq*2 + 1` and advance the counter;
    /// service messages (acks, pings) get `seq*2` and do not.
    pub fn next_seq_no(&mut self, content_related: bool) -> i32 {
        if content_related {
            let n = self.seq * 2 + 1;
            self.seq += 1;
            n
        } else {
            self.seq * 2
        }
    }

    /// Buffer an inbound message id for acknowledgement.
    ///
    /// Only ids with the low bit of their seq semantics set (content-related
    /// server messages) need acks; the caller decides.
    pub fn push_ack(&mut self, msg_id: i64) {
        self.pending_acks.insert(msg_id);
    }

    /// True if any acks are waiting to be flushed.
    pub fn has_pending_acks(&self) -> bool {
        !self.pending_acks.is_empty()
    }

    /// Drain all buffered ack ids, oldest first.
    pub fn take_acks(&mut self) -> Vec<i64> {
        std::mem::take(&mut self.pending_acks).into_iter().collect()
    }

    /// Serialize an RPC function into a plaintext [`Message`].
    pub fn pack<R: RemoteCall>(&mut self, call: &R) -> Message {
        let id = self.next_msg_id();
        let seq_no = self.next_seq_no(true);
        Message::plaintext(id, seq_no, call.to_bytes())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
