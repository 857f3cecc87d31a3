//! Message identifiers and plaintext framing.

/// A 64-bit MTProto message identifier.
///
/// The top 32 bits approximate server-time Unix seconds; the low two bits are
/// zero for client-originated messages. Generation lives on the session so
/// monotonicity is enforced against the previous id.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MessageId(pub i64);

impl MessageId {
    /// Compute a fresh id from a wall-clock reading adjusted by the server
    /// time delta, clamped above `prev` to stay strictly increasing.
    pub(crate) fn generate(prev: i64, time_offset: i32) -> Self {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        let secs = (now.as_secs() as i64) + time_offset as i64;
        let nanos = now.subsec_nanos() as i64;
        // subsec_nanos < 2^30, so the shifted value keeps the two low bits 0
        let mut id = (secs << 32) | (nanos << 2);
        if id <= prev {
            id = prev + 4;
        }
        Self(id)
    }

    /// Seconds-part of the id (approximate server time of creation).
    pub fn approx_seconds(&self) -> i64 {
        self.0 >> 32
    }
}

/// A framed plaintext message, used before key exchange completes.
#[derive(Debug)]
pub struct Message {
    /// Unique identifier for this message.
    pub id: MessageId,
    /// Session-scoped sequence number.
    pub seq_no: i32,
    /// The serialized TL body (constructor id + fields).
    pub body: Vec<u8>,
}

impl Message {
    /// Construct a new plaintext message.
    pub fn plaintext(id: MessageId, seq_no: i32, body: Vec<u8>) -> Self {
        Self { id, seq_no, body }
    }

    /// Serialize into the plaintext wire format:
    ///
    /// ```text
    /// auth_key_id:long  (0 for plaintext)
    /// message_id:long
    /// message_data_length:int
    /// message_data:bytes
    /// ```
    pub fn to_plaintext_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + 8 + 4 + self.body.len());
        buf.extend(0i64.to_le_bytes());
        buf.extend(self.id.0.to_le_bytes());
        buf.extend((self.body.len() as u32).to_le_bytes());
        buf.extend(&self.body);
        buf
    }
}
