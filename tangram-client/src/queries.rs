//! The query manager: one record per outstanding RPC, keyed by msg id.
//!
//! A query is registered before its packet hits the wire and removed on the
//! terminal result, error, or when its retry budget runs out. Resubmission
//! wraps the original payload in a single-element container under the prior
//! msg id so the server can deduplicate.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use crate::errors::{InvocationError, RpcError};

/// Default per-query timeout before a resend attempt.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifecycle of an outstanding query.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryState {
    /// Serialized but not yet on a live session.
    PendingSend,
    /// Sent; no acknowledgement yet.
    InFlight,
    /// Acknowledged; awaiting the result body.
    Acked,
}

/// One outstanding RPC.
pub struct PendingQuery {
    /// msg id the query currently rides under.
    pub msg_id: i64,
    /// seq_no it was sent with.
    pub seq_no: i32,
    /// DC it targets.
    pub dc_id: i32,
    /// The serialized TL request body (plaintext).
    pub payload: Vec<u8>,
    /// Completion channel back to the caller.
    pub tx: oneshot::Sender<Result<Vec<u8>, InvocationError>>,
    /// Lifecycle state.
    pub state: QueryState,
    /// When the current attempt went out.
    pub sent_at: Instant,
    /// Re-issues performed so far.
    pub retries: u32,
}

/// A query parked on a DC that is not yet usable.
pub struct ParkedQuery {
    /// The serialized TL request body.
    pub payload: Vec<u8>,
    /// Completion channel back to the caller.
    pub tx: oneshot::Sender<Result<Vec<u8>, InvocationError>>,
}

impl ParkedQuery {
    #[cfg(test)]
    pub(crate) fn for_test(tag: i64) -> Self {
        let (tx, _rx) = oneshot::channel();
        Self { payload: tag.to_le_bytes().to_vec(), tx }
    }

    #[cfg(test)]
    pub(crate) fn test_tag(&self) -> i64 {
        i64::from_le_bytes(self.payload[..8].try_into().unwrap())
    }
}

/// Process-wide `{msg_id → query}` table.
#[derive(Default)]
pub struct QueryTable {
    map: HashMap<i64, PendingQuery>,
}

impl QueryTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a query under its msg id.
    ///
    /// A msg id collision would mean two live queries share an id, which the
    /// id generator rules out; the old record is dropped (failing its caller)
    /// rather than silently leaked.
    pub fn register(&mut self, query: PendingQuery) {
        if let Some(old) = self.map.insert(query.msg_id, query) {
            let _ = old.tx.send(Err(InvocationError::Dropped));
        }
    }

    /// Number of outstanding queries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when no queries are outstanding.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Route a result body to its query, completing it.
    pub fn route_result(&mut self, req_msg_id: i64, body: Vec<u8>) -> bool {
        match self.map.remove(&req_msg_id) {
            Some(q) => {
                let _ = q.tx.send(Ok(body));
                true
            }
            None => {
                tracing::debug!("rpc_result for unknown msg_id {req_msg_id}");
                false
            }
        }
    }

    /// Route an rpc_error to its query, completing it.
    pub fn route_error(&mut self, req_msg_id: i64, error: RpcError) -> bool {
        match self.map.remove(&req_msg_id) {
            Some(q) => {
                let _ = q.tx.send(Err(InvocationError::Rpc(error)));
                true
            }
            None => false,
        }
    }

    /// Mark acknowledged queries; cancels their resend timeout.
    pub fn mark_acked(&mut self, msg_ids: &[i64]) {
        for id in msg_ids {
            if let Some(q) = self.map.get_mut(id) {
                q.state = QueryState::Acked;
            }
        }
    }

    /// Pull a query out for re-issue (bad salt, bad msg id, resend).
    pub fn take(&mut self, msg_id: i64) -> Option<PendingQuery> {
        self.map.remove(&msg_id)
    }

    /// Re-file a query under a fresh msg id after a re-issue.
    pub fn reassign(&mut self, mut query: PendingQuery, new_msg_id: i64, new_seq_no: i32) {
        query.msg_id = new_msg_id;
        query.seq_no = new_seq_no;
        query.sent_at = Instant::now();
        query.retries += 1;
        query.state = QueryState::InFlight;
        self.register(query);
    }

    /// msg ids of in-flight queries whose timeout has elapsed.
    ///
    /// Acked queries are exempt: the server owns them now and will answer
    /// (or drop the session, which resets everything anyway).
    pub fn timed_out(&self, now: Instant, timeout: Duration) -> Vec<i64> {
        self.map
            .values()
            .filter(|q| q.state == QueryState::InFlight && now.duration_since(q.sent_at) >= timeout)
            .map(|q| q.msg_id)
            .collect()
    }

    /// Fail every outstanding query (connection teardown).
    pub fn fail_all(&mut self) {
        for (_, q) in self.map.drain() {
            let _ = q.tx.send(Err(InvocationError::Dropped));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(msg_id: i64) -> (PendingQuery, oneshot::Receiver<Result<Vec<u8>, InvocationError>>) {
        let (tx, rx) = oneshot::channel();
        (
            PendingQuery {
                msg_id,
                seq_no: 1,
                dc_id: 2,
                payload: vec![1, 2, 3, 4],
                tx,
                state: QueryState::InFlight,
                sent_at: Instant::now(),
                retries: 0,
            },
            rx,
        )
    }

    #[test]
    fn result_routes_to_matching_query_only() {
        let mut t = QueryTable::new();
        let (q1, mut rx1) = query(100);
        let (q2, mut rx2) = query(104);
        t.register(q1);
        t.register(q2);

        assert!(t.route_result(104, vec![9]));
        assert!(rx1.try_recv().is_err(), "q1 must stay pending");
        assert_eq!(rx2.try_recv().unwrap().unwrap(), vec![9]);
        assert_eq!(t.len(), 1);
        assert!(!t.route_result(999, vec![]));
    }

    #[test]
    fn ack_suppresses_timeout() {
        let mut t = QueryTable::new();
        let (mut q, _rx) = query(100);
        q.sent_at = Instant::now() - Duration::from_secs(60);
        t.register(q);

        assert_eq!(t.timed_out(Instant::now(), QUERY_TIMEOUT), vec![100]);
        t.mark_acked(&[100]);
        assert!(t.timed_out(Instant::now(), QUERY_TIMEOUT).is_empty());
    }

    #[test]
    fn reassign_moves_id_and_counts_retry() {
        let mut t = QueryTable::new();
        let (q, _rx) = query(100);
        t.register(q);

        let q = t.take(100).unwrap();
        t.reassign(q, 200, 3);
        assert!(t.take(100).is_none());
        let q = t.take(200).unwrap();
        assert_eq!(q.retries, 1);
        assert_eq!(q.seq_no, 3);
    }

    #[test]
    fn error_reaches_caller() {
        let mut t = QueryTable::new();
        let (q, mut rx) = query(100);
        t.register(q);
        t.route_error(100, RpcError::from_server(400, "PEER_ID_INVALID"));
        match rx.try_recv().unwrap() {
            Err(InvocationError::Rpc(e)) => assert_eq!(e.code, 400),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn fail_all_drops_everything() {
        let mut t = QueryTable::new();
        let (q1, mut rx1) = query(100);
        let (q2, _rx2) = query(104);
        t.register(q1);
        t.register(q2);
        t.fail_all();
        assert!(t.is_empty());
        assert!(matches!(rx1.try_recv().unwrap(), Err(InvocationError::Dropped)));
    }
}
