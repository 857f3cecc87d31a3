//! Dispatch of decrypted payloads by constructor tag.
//!
//! This is the single point where raw inner bytes become typed service
//! messages. Containers recurse through the same path; `gzip_packed` goes
//! through a distinct entry that refuses nested compression.

use std::io::Read;

use tangram_tl::{enums, types, Cursor, Deserializable};

/// Containers announcing more children than this are rejected outright.
const MAX_CONTAINER_CHILDREN: i32 = 1024;
/// Decompressed `gzip_packed` payloads are capped at 16 MiB.
const MAX_INFLATED_LEN: u64 = 16 * 1024 * 1024;

const ID_MSG_CONTAINER: u32 = 0x73f1f8dc;
const ID_RPC_RESULT: u32 = 0xf35c6d01;
const ID_RPC_ERROR: u32 = 0x2144ca19;
const ID_GZIP_PACKED: u32 = 0x3072cfa1;
const ID_PONG: u32 = 0x347773c5;
const ID_MSGS_ACK: u32 = 0x62d6b459;
const ID_BAD_SERVER_SALT: u32 = 0xedab447b;
const ID_BAD_MSG_NOTIFY: u32 = 0xa7eff811;
const ID_NEW_SESSION: u32 = 0x9ec20908;
const ID_MSG_DETAILED_INFO: u32 = 0x276d3ec6;
const ID_MSG_NEW_DETAILED_INFO: u32 = 0x809db6df;

const UPDATE_IDS: [u32; 6] = [
    0xe317af7e, // updatesTooLong
    0x313bc7f8, // updateShortMessage
    0x4d6deea5, // updateShortChatMessage
    0x78d4dec1, // updateShort
    0x725b04c3, // updatesCombined
    0x74ae4240, // updates
];

/// Errors from envelope dispatch.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Malformed TL in a service message.
    Parse(tangram_tl::deserialize::Error),
    /// Container declared an implausible child count.
    OversizedContainer {
        /// The declared count.
        count: i32,
    },
    /// `gzip_packed` nested inside `gzip_packed`.
    NestedGzip,
    /// Inflation failed or overran the 16 MiB cap.
    BadGzip,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "envelope parse: {e}"),
            Self::OversizedContainer { count } => write!(f, "container with {count} children"),
            Self::NestedGzip => write!(f, "nested gzip_packed"),
            Self::BadGzip => write!(f, "gzip_packed inflation failed"),
        }
    }
}
impl std::error::Error for Error {}

impl From<tangram_tl::deserialize::Error> for Error {
    fn from(e: tangram_tl::deserialize::Error) -> Self {
        Self::Parse(e)
    }
}

/// A typed service payload.
#[derive(Clone, Debug, PartialEq)]
pub enum ServerMessage {
    /// Result body for the query sent as `req_msg_id`.
    RpcResult {
        /// msg id of the original request.
        req_msg_id: i64,
        /// Raw TL result body (already un-gzipped).
        body: Vec<u8>,
    },
    /// Server-side error for the query sent as `req_msg_id`.
    RpcError {
        /// msg id of the original request.
        req_msg_id: i64,
        /// The error constructor.
        error: types::RpcError,
    },
    /// The server acknowledged these msg ids.
    Ack(Vec<i64>),
    /// Reply to a ping.
    Pong(types::Pong),
    /// Outgoing salt is stale; adopt the new one and re-send the query.
    BadServerSalt(types::BadServerSalt),
    /// The referenced message was malformed (msg-id skew, bad container).
    BadMsgNotification(types::BadMsgNotification),
    /// The server opened a new session (carries the salt to adopt).
    NewSessionCreated(types::NewSessionCreated),
    /// Liveness info about a previous answer; safe to drop.
    DetailedInfo {
        /// msg id of the answer the info refers to.
        answer_msg_id: i64,
    },
    /// An update envelope for the reconciliation loop.
    Updates(enums::Updates),
    /// Constructor outside the known set; skipped.
    Unknown {
        /// The unrecognized id.
        constructor: u32,
    },
}

/// One inbound message with its transport identifiers.
#[derive(Clone, Debug, PartialEq)]
pub struct InboundMessage {
    /// Server-assigned message id.
    pub msg_id: i64,
    /// Server-assigned sequence number.
    pub seq_no: i32,
    /// The decoded payload.
    pub payload: ServerMessage,
}

impl InboundMessage {
    /// True if this message must be acknowledged: server-initiated content
    /// messages carry an odd id and an odd seq.
    pub fn wants_ack(&self) -> bool {
        self.msg_id & 1 == 1 || self.seq_no & 1 == 1
    }
}

/// Parse one decrypted body, flattening containers.
pub fn parse_payload(msg_id: i64, seq_no: i32, body: &[u8]) -> Result<Vec<InboundMessage>, Error> {
    let mut out = Vec::new();
    parse_one(msg_id, seq_no, body, true, &mut out)?;
    Ok(out)
}

fn parse_one(
    msg_id: i64,
    seq_no: i32,
    body: &[u8],
    allow_gzip: bool,
    out: &mut Vec<InboundMessage>,
) -> Result<(), Error> {
    if body.len() < 4 {
        return Err(Error::Parse(tangram_tl::deserialize::Error::UnexpectedEof));
    }
    let constructor = u32::from_le_bytes(body[..4].try_into().unwrap());

    match constructor {
        ID_MSG_CONTAINER => {
            let mut cur = Cursor::from_slice(&body[4..]);
            let count = i32::deserialize(&mut cur)?;
            if !(0..=MAX_CONTAINER_CHILDREN).contains(&count) {
                return Err(Error::OversizedContainer { count });
            }
            for _ in 0..count {
                let child_id = i64::deserialize(&mut cur)?;
                let child_seq = i32::deserialize(&mut cur)?;
                let child_len = i32::deserialize(&mut cur)? as usize;
                let child_body = cur.read_slice(child_len)?;
                parse_one(child_id, child_seq, child_body, allow_gzip, out)?;
            }
            Ok(())
        }
        ID_GZIP_PACKED => {
            if !allow_gzip {
                return Err(Error::NestedGzip);
            }
            let mut cur = Cursor::from_slice(&body[4..]);
            let packed = Vec::<u8>::deserialize(&mut cur)?;
            let inflated = inflate(&packed)?;
            parse_one(msg_id, seq_no, &inflated, false, out)
        }
        ID_RPC_RESULT => {
            let mut cur = Cursor::from_slice(&body[4..]);
            let req_msg_id = i64::deserialize(&mut cur)?;
            let mut result = Vec::new();
            cur.read_to_end(&mut result);

            // The result itself may be gzip-wrapped or an rpc_error.
            if result.len() >= 4 {
                let inner_id = u32::from_le_bytes(result[..4].try_into().unwrap());
                if inner_id == ID_GZIP_PACKED {
                    let mut icur = Cursor::from_slice(&result[4..]);
                    let packed = Vec::<u8>::deserialize(&mut icur)?;
                    result = inflate(&packed)?;
                }
            }
            if result.len() >= 4 {
                let inner_id = u32::from_le_bytes(result[..4].try_into().unwrap());
                if inner_id == ID_RPC_ERROR {
                    let mut icur = Cursor::from_slice(&result[4..]);
                    let error = types::RpcError::deserialize(&mut icur)?;
                    out.push(InboundMessage {
                        msg_id,
                        seq_no,
                        payload: ServerMessage::RpcError { req_msg_id, error },
                    });
                    return Ok(());
                }
            }
            out.push(InboundMessage {
                msg_id,
                seq_no,
                payload: ServerMessage::RpcResult { req_msg_id, body: result },
            });
            Ok(())
        }
        ID_MSGS_ACK => {
            let mut cur = Cursor::from_slice(&body[4..]);
            let ack = types::MsgsAck::deserialize(&mut cur)?;
            out.push(InboundMessage { msg_id, seq_no, payload: ServerMessage::Ack(ack.msg_ids) });
            Ok(())
        }
        ID_PONG => {
            let mut cur = Cursor::from_slice(&body[4..]);
            let pong = types::Pong::deserialize(&mut cur)?;
            out.push(InboundMessage { msg_id, seq_no, payload: ServerMessage::Pong(pong) });
            Ok(())
        }
        ID_BAD_SERVER_SALT => {
            let mut cur = Cursor::from_slice(&body[4..]);
            let salt = types::BadServerSalt::deserialize(&mut cur)?;
            out.push(InboundMessage {
                msg_id,
                seq_no,
                payload: ServerMessage::BadServerSalt(salt),
            });
            Ok(())
        }
        ID_BAD_MSG_NOTIFY => {
            let mut cur = Cursor::from_slice(&body[4..]);
            let notify = types::BadMsgNotification::deserialize(&mut cur)?;
            out.push(InboundMessage {
                msg_id,
                seq_no,
                payload: ServerMessage::BadMsgNotification(notify),
            });
            Ok(())
        }
        ID_NEW_SESSION => {
            let mut cur = Cursor::from_slice(&body[4..]);
            let created = types::NewSessionCreated::deserialize(&mut cur)?;
            out.push(InboundMessage {
                msg_id,
                seq_no,
                payload: ServerMessage::NewSessionCreated(created),
            });
            Ok(())
        }
        ID_MSG_DETAILED_INFO => {
            let mut cur = Cursor::from_slice(&body[4..]);
            let info = types::MsgDetailedInfo::deserialize(&mut cur)?;
            out.push(InboundMessage {
                msg_id,
                seq_no,
                payload: ServerMessage::DetailedInfo { answer_msg_id: info.answer_msg_id },
            });
            Ok(())
        }
        ID_MSG_NEW_DETAILED_INFO => {
            let mut cur = Cursor::from_slice(&body[4..]);
            let info = types::MsgNewDetailedInfo::deserialize(&mut cur)?;
            out.push(InboundMessage {
                msg_id,
                seq_no,
                payload: ServerMessage::DetailedInfo { answer_msg_id: info.answer_msg_id },
            });
            Ok(())
        }
        id if UPDATE_IDS.contains(&id) => {
            let mut cur = Cursor::from_slice(body);
            let updates = enums::Updates::deserialize(&mut cur)?;
            out.push(InboundMessage { msg_id, seq_no, payload: ServerMessage::Updates(updates) });
            Ok(())
        }
        id => {
            log::debug!("skipping unknown constructor {id:#010x} (msg_id {msg_id})");
            out.push(InboundMessage {
                msg_id,
                seq_no,
                payload: ServerMessage::Unknown { constructor: id },
            });
            Ok(())
        }
    }
}

fn inflate(packed: &[u8]) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    let mut decoder = flate2::read::GzDecoder::new(packed).take(MAX_INFLATED_LEN + 1);
    decoder.read_to_end(&mut out).map_err(|_| Error::BadGzip)?;
    if out.len() as u64 > MAX_INFLATED_LEN {
        return Err(Error::BadGzip);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tangram_tl::Serializable;

    fn boxed(id: u32, fields: &[u8]) -> Vec<u8> {
        let mut v = id.to_le_bytes().to_vec();
        v.extend_from_slice(fields);
        v
    }

    #[test]
    fn container_flattens_children() {
        let pong = types::Pong { msg_id: 11, ping_id: 22 };
        let child = boxed(ID_PONG, &pong.to_bytes());

        let mut body = ID_MSG_CONTAINER.to_le_bytes().to_vec();
        body.extend(2i32.to_le_bytes());
        for (id, seq) in [(100i64, 1i32), (104, 3)] {
            body.extend(id.to_le_bytes());
            body.extend(seq.to_le_bytes());
            body.extend((child.len() as i32).to_le_bytes());
            body.extend_from_slice(&child);
        }

        let msgs = parse_payload(1, 0, &body).unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].msg_id, 100);
        assert!(msgs[0].wants_ack());
        assert_eq!(msgs[1].msg_id, 104);
        assert!(matches!(msgs[1].payload, ServerMessage::Pong(_)));
    }

    #[test]
    fn rpc_error_routes_separately() {
        let err = types::RpcError { error_code: 420, error_message: "FLOOD_WAIT_3".into() };
        let mut inner = boxed(ID_RPC_ERROR, &err.to_bytes());

        let mut body = ID_RPC_RESULT.to_le_bytes().to_vec();
        body.extend(77i64.to_le_bytes());
        body.append(&mut inner);

        let msgs = parse_payload(5, 1, &body).unwrap();
        assert_eq!(msgs.len(), 1);
        match &msgs[0].payload {
            ServerMessage::RpcError { req_msg_id, error } => {
                assert_eq!(*req_msg_id, 77);
                assert_eq!(error.error_code, 420);
                assert_eq!(error.error_message, "FLOOD_WAIT_3");
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn gzip_must_not_nest() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        // gzip(gzip(pong)) must be rejected.
        let pong_body = boxed(ID_PONG, &types::Pong { msg_id: 1, ping_id: 2 }.to_bytes());
        let gz = |data: &[u8]| {
            let mut enc = GzEncoder::new(Vec::new(), Compression::default());
            enc.write_all(data).unwrap();
            enc.finish().unwrap()
        };

        let inner_gzip = {
            let mut b = ID_GZIP_PACKED.to_le_bytes().to_vec();
            gz(&pong_body).serialize(&mut b);
            b
        };
        let outer_gzip = {
            let mut b = ID_GZIP_PACKED.to_le_bytes().to_vec();
            gz(&inner_gzip).serialize(&mut b);
            b
        };

        assert_eq!(parse_payload(1, 0, &outer_gzip), Err(Error::NestedGzip));
        // A single level inflates fine.
        let ok = parse_payload(1, 0, &inner_gzip).unwrap();
        assert!(matches!(ok[0].payload, ServerMessage::Pong(_)));
    }

    #[test]
    fn unknown_constructor_is_skipped_not_fatal() {
        let body = boxed(0xdeadbeef, &[0u8; 8]);
        let msgs = parse_payload(9, 0, &body).unwrap();
        assert_eq!(msgs[0].payload, ServerMessage::Unknown { constructor: 0xdeadbeef });
    }
}
