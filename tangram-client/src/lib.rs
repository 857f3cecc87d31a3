//! # tangram-client
//!
//! Async MTProto client core built on `tangram-mtproto`.
//!
//! What lives here:
//! - DC registry and working-DC routing, with cross-DC authorization
//!   export/import and automatic `*_MIGRATE_n` handling
//! - The query manager: per-msg-id records, acks, timeouts, bounded retries,
//!   flood-wait back-off
//! - Connection keep-alive: ping schedule, exponential reconnect with port
//!   rotation
//! - Update reconciliation (pts/qts/seq + per-channel pts + differences)
//! - Secret chats and the chunked transfer pipeline
//! - Session persistence behind a pluggable backend
//!
//! The host integrates through [`Hooks`] and drives the connection by
//! awaiting [`Client::run`].

#![deny(unsafe_code)]

mod conn;
mod dc;
mod errors;
mod hooks;
mod queries;
mod retry;
pub mod secret_chat;
mod session_store;
pub mod transfer;
pub mod updates;

pub use conn::{PING_INTERVAL, rotate_port};
pub use dc::{default_endpoints, DcEndpoint, DcFlags, DcRegistry, DcState, HandshakeState};
pub use errors::{InvocationError, RpcError};
pub use hooks::{Hooks, NoopHooks, ValueKind};
pub use queries::{ParkedQuery, PendingQuery, QueryState, QueryTable, QUERY_TIMEOUT};
pub use retry::{AutoSleep, NoRetries, RetryContext, RetryPolicy, MAX_ATTEMPTS};
pub use secret_chat::{SecretChat, SecretChatRegistry, SecretChatState};
pub use session_store::{BinaryFileBackend, DcRecord, InMemoryBackend, PersistedSession, SessionBackend};
pub use transfer::{CancelToken, DownloadRequest, TransferOptions, UploadedEncryptedFile, UploadedFile};
pub use updates::UpdateState;

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tangram_crypto::rsa::Keyring;
use tangram_mtproto::envelope::{InboundMessage, ServerMessage};
use tangram_tl::{enums, functions, Cursor, Deserializable, RemoteCall, Serializable, LAYER};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::{sleep, timeout};

use conn::Connection;

/// Cached access hashes for users and channels.
#[derive(Default)]
pub(crate) struct PeerCache {
    pub(crate) users: HashMap<i64, i64>,
    pub(crate) channels: HashMap<i64, i64>,
}

// ─── Config ───────────────────────────────────────────────────────────────────

/// Configuration for [`Client::connect`].
#[derive(Clone)]
pub struct Config {
    /// Application id issued by the platform.
    pub api_id: i32,
    /// Application hash issued by the platform.
    pub api_hash: String,
    /// Override the first DC to dial (`host:port`).
    pub first_dc_addr: Option<String>,
    /// Retry policy for failed RPCs.
    pub retry_policy: Arc<dyn RetryPolicy>,
    /// Session persistence backend.
    pub session_backend: Arc<dyn SessionBackend>,
    /// Host callback surface.
    pub hooks: Arc<dyn Hooks>,
    /// Where downloads land.
    pub download_dir: PathBuf,
    /// Allow IPv6 DC endpoints.
    pub allow_ipv6: bool,
    /// Negotiate PFS temp keys with this lifetime (seconds), if set.
    pub temp_key_expires: Option<i32>,
    /// Trusted RSA keys for the handshake.
    pub keyring: Arc<Keyring>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_id: 0,
            api_hash: String::new(),
            first_dc_addr: None,
            retry_policy: Arc::new(AutoSleep::default()),
            session_backend: Arc::new(BinaryFileBackend::new("tangram.session")),
            hooks: Arc::new(NoopHooks),
            download_dir: PathBuf::from("."),
            allow_ipv6: false,
            temp_key_expires: None,
            keyring: Arc::new(Keyring::with_defaults()),
        }
    }
}

/// Token linking `request_login_code` to `sign_in`.
pub struct LoginToken {
    phone: String,
    phone_code_hash: String,
}

// ─── Client ───────────────────────────────────────────────────────────────────

pub(crate) struct ClientInner {
    conn: Mutex<Connection>,
    dc_pool: Mutex<HashMap<i32, Connection>>,
    pub(crate) registry: Mutex<DcRegistry>,
    queries: Mutex<QueryTable>,
    pub(crate) update_state: Mutex<UpdateState>,
    pub(crate) secret_chats: Mutex<SecretChatRegistry>,
    pub(crate) peer_cache: Mutex<PeerCache>,
    pub(crate) hooks: Arc<dyn Hooks>,
    retry_policy: Arc<dyn RetryPolicy>,
    session_backend: Arc<dyn SessionBackend>,
    keyring: Arc<Keyring>,
    api_id: i32,
    api_hash: String,
    pub(crate) download_dir: PathBuf,
    pub(crate) allow_ipv6: bool,
    temp_key_expires: Option<i32>,
    updates_tx: mpsc::UnboundedSender<enums::Updates>,
    updates_rx: Mutex<mpsc::UnboundedReceiver<enums::Updates>>,
    needs_difference: AtomicBool,
}

/// The MTProto client. Cheap to clone — internally `Arc`-wrapped.
#[derive(Clone)]
pub struct Client {
    pub(crate) inner: Arc<ClientInner>,
}

impl Client {
    // ── Connect ────────────────────────────────────────────────────────────

    /// Establish (or restore) the working-DC connection.
    pub async fn connect(config: Config) -> Result<Self, InvocationError> {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();

        let persisted = config.session_backend.load()?;
        let mut registry = DcRegistry::new(persisted.as_ref().map(|s| s.home_dc_id).unwrap_or(2));
        for ep in default_endpoints() {
            registry.get_or_create(ep.id, ep.clone());
        }

        let mut secret_registry = SecretChatRegistry::default();
        let mut update_state = UpdateState::default();
        if let Some(s) = &persisted {
            secret_registry.our_id = s.self_id as i32;
            let (pts, qts, seq, date) = s.counters;
            update_state.pts = pts;
            update_state.qts = qts;
            update_state.seq = seq;
            update_state.date = date;
            update_state.channel_pts = s.channel_pts.clone();
            for chat in &s.secret_chats {
                secret_registry.insert(chat.clone());
            }
            for dc in &s.dcs {
                if let Some((host, port)) = dc.addr.rsplit_once(':') {
                    let endpoint =
                        DcEndpoint::v4(dc.dc_id, host, port.parse().unwrap_or(443));
                    let state = registry.get_or_create(dc.dc_id, endpoint.clone());
                    state.endpoint = endpoint;
                    if let Some(key) = dc.auth_key {
                        state.set_auth_key(key, dc.salt, dc.time_offset);
                        if s.self_id != 0 {
                            state.flags.logged_in = true;
                        }
                    }
                }
            }
        }

        let home_dc = registry.working();
        let addr = config
            .first_dc_addr
            .clone()
            .or_else(|| registry.get(home_dc).and_then(|dc| dc.endpoint.addr(config.allow_ipv6)))
            .ok_or_else(|| InvocationError::Deserialize(format!("no endpoint for DC{home_dc}")))?;

        let saved = registry
            .get(home_dc)
            .and_then(|dc| dc.perm_auth_key.map(|k| (k, dc.server_salt, dc.time_offset)));

        let conn = match saved {
            Some((key, salt, offset)) => {
                tracing::info!("restoring session on DC{home_dc}");
                match Connection::connect_with_key(&addr, key, salt, offset).await {
                    Ok(c) => c,
                    Err(e) => {
                        tracing::warn!("restore failed ({e}), fresh handshake");
                        Self::fresh(&addr, &config.keyring, config.temp_key_expires, &mut registry, home_dc)
                            .await?
                    }
                }
            }
            None => {
                Self::fresh(&addr, &config.keyring, config.temp_key_expires, &mut registry, home_dc)
                    .await?
            }
        };

        let inner = Arc::new(ClientInner {
            conn: Mutex::new(conn),
            dc_pool: Mutex::new(HashMap::new()),
            registry: Mutex::new(registry),
            queries: Mutex::new(QueryTable::new()),
            update_state: Mutex::new(update_state),
            secret_chats: Mutex::new(secret_registry),
            peer_cache: Mutex::new(PeerCache::default()),
            hooks: config.hooks,
            retry_policy: config.retry_policy,
            session_backend: config.session_backend,
            keyring: config.keyring,
            api_id: config.api_id,
            api_hash: config.api_hash,
            download_dir: config.download_dir,
            allow_ipv6: config.allow_ipv6,
            temp_key_expires: config.temp_key_expires,
            updates_tx,
            updates_rx: Mutex::new(updates_rx),
            needs_difference: AtomicBool::new(false),
        });
        let client = Self { inner };

        // A stale persisted key can be rejected here; fall back to a fresh
        // handshake once before giving up.
        if let Err(e) = client.init_connection().await {
            tracing::warn!("init_connection failed ({e}); retrying with a fresh key");
            let (dc_id, addr) = {
                let registry = client.inner.registry.lock().await;
                let dc_id = registry.working();
                let addr = registry
                    .get(dc_id)
                    .and_then(|d| d.endpoint.addr(client.inner.allow_ipv6))
                    .ok_or_else(|| {
                        InvocationError::Deserialize(format!("no endpoint for DC{dc_id}"))
                    })?;
                (dc_id, addr)
            };
            let (new_conn, keys) = Connection::connect_raw(
                &addr,
                &client.inner.keyring,
                client.inner.temp_key_expires,
            )
            .await?;
            {
                let mut registry = client.inner.registry.lock().await;
                adopt_keys(&mut registry, dc_id, &keys);
            }
            client.inner.hooks.auth_key_updated(dc_id, &keys.perm_key);
            *client.inner.conn.lock().await = new_conn;
            client.init_connection().await?;
        }
        client.inner.hooks.started();
        Ok(client)
    }

    async fn fresh(
        addr: &str,
        keyring: &Keyring,
        pfs: Option<i32>,
        registry: &mut DcRegistry,
        dc_id: i32,
    ) -> Result<Connection, InvocationError> {
        let (conn, keys) = Connection::connect_raw(addr, keyring, pfs).await?;
        adopt_keys(registry, dc_id, &keys);
        Ok(conn)
    }

    // ── RPC ────────────────────────────────────────────────────────────────

    /// Invoke an RPC on the working DC, with retries and migration handling.
    pub async fn invoke<R: RemoteCall>(&self, req: &R) -> Result<R::Return, InvocationError> {
        let body = Box::pin(self.rpc_call_raw(req.to_bytes())).await?;
        let mut cur = Cursor::from_slice(&body);
        R::Return::deserialize(&mut cur).map_err(Into::into)
    }

    async fn rpc_call_raw(&self, body: Vec<u8>) -> Result<Vec<u8>, InvocationError> {
        let mut fail_count = NonZeroU32::new(1).unwrap();
        let mut slept_so_far = Duration::default();
        loop {
            match self.send_and_wait(&body).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if let Some(dc) = e.migrate_dc() {
                        tracing::info!("server demands DC{dc}; migrating");
                        self.migrate_to(dc).await?;
                        continue;
                    }
                    if let InvocationError::Rpc(rpc) = &e {
                        if rpc.password_needed() {
                            // 2FA lives outside this core: tell the host and
                            // surface the error untouched.
                            self.inner.hooks.on_failed_login();
                        }
                    }
                    let ctx = RetryContext { fail_count, slept_so_far, error: e };
                    match self.inner.retry_policy.should_retry(&ctx) {
                        ControlFlow::Continue(delay) => {
                            sleep(delay).await;
                            slept_so_far += delay;
                            fail_count = fail_count.saturating_add(1);
                        }
                        ControlFlow::Break(()) => return Err(ctx.error),
                    }
                }
            }
        }
    }

    /// One attempt: send the payload and pump the connection until its
    /// result arrives, resending under the original msg id on timeout.
    async fn send_and_wait(&self, body: &[u8]) -> Result<Vec<u8>, InvocationError> {
        let mut conn = self.inner.conn.lock().await;
        let (msg_id, seq_no) = conn.send_query_payload(body).await?;

        let (tx, mut rx) = oneshot::channel();
        let dc_id = self.inner.registry.lock().await.working();
        self.inner.queries.lock().await.register(PendingQuery {
            msg_id,
            seq_no,
            dc_id,
            payload: body.to_vec(),
            tx,
            state: QueryState::InFlight,
            sent_at: Instant::now(),
            retries: 0,
        });

        let mut current_msg_id = msg_id;
        loop {
            if let Ok(result) = rx.try_recv() {
                return result;
            }

            match timeout(QUERY_TIMEOUT, conn.recv_envelope()).await {
                Ok(Ok(messages)) => {
                    current_msg_id = self.route_inbound(&mut conn, messages, current_msg_id).await?;
                    let _ = conn.flush_acks().await;
                }
                Ok(Err(e)) => {
                    self.inner.queries.lock().await.take(current_msg_id);
                    return Err(e);
                }
                Err(_elapsed) => {
                    // Timeout: wrap the original message in a container so
                    // the server can deduplicate, up to the retry budget.
                    let mut queries = self.inner.queries.lock().await;
                    let Some(mut q) = queries.take(current_msg_id) else {
                        return Err(InvocationError::Dropped);
                    };
                    if q.retries + 1 >= MAX_ATTEMPTS {
                        drop(queries);
                        let _ = q.tx.send(Err(InvocationError::RetriesExhausted));
                        return rx.await.unwrap_or(Err(InvocationError::Dropped));
                    }
                    q.retries += 1;
                    q.sent_at = Instant::now();
                    tracing::warn!("query {current_msg_id} timed out; resending (attempt {})", q.retries + 1);
                    let (wire, _outer) = conn.session.pack_resend(q.msg_id, q.seq_no, &q.payload);
                    queries.register(q);
                    drop(queries);
                    conn.send_frame(&wire).await?;
                }
            }
        }
    }

    /// Route inbound messages; returns the (possibly re-keyed) msg id the
    /// caller is waiting on.
    async fn route_inbound(
        &self,
        conn: &mut Connection,
        messages: Vec<InboundMessage>,
        waiting_for: i64,
    ) -> Result<i64, InvocationError> {
        let mut waiting = waiting_for;
        for msg in messages {
            match msg.payload {
                ServerMessage::RpcResult { req_msg_id, body } => {
                    self.inner.queries.lock().await.route_result(req_msg_id, body);
                }
                ServerMessage::RpcError { req_msg_id, error } => {
                    let rpc = RpcError::from_server(error.error_code, &error.error_message);
                    self.inner.queries.lock().await.route_error(req_msg_id, rpc);
                }
                ServerMessage::Ack(ids) => {
                    self.inner.queries.lock().await.mark_acked(&ids);
                }
                ServerMessage::BadServerSalt(salt) => {
                    tracing::debug!("adopting new server salt");
                    conn.session.salt = salt.new_server_salt;
                    if let Some(new_id) =
                        self.resend_query(conn, salt.bad_msg_id).await?
                    {
                        if salt.bad_msg_id == waiting {
                            waiting = new_id;
                        }
                    }
                }
                ServerMessage::BadMsgNotification(bad) => {
                    tracing::warn!(
                        "bad_msg_notification code {} for {}",
                        bad.error_code,
                        bad.bad_msg_id
                    );
                    if matches!(bad.error_code, 16 | 17) {
                        conn.session.adopt_time_from(msg.msg_id);
                    }
                    if matches!(bad.error_code, 16 | 17 | 64) {
                        if let Some(new_id) = self.resend_query(conn, bad.bad_msg_id).await? {
                            if bad.bad_msg_id == waiting {
                                waiting = new_id;
                            }
                        }
                    }
                }
                ServerMessage::NewSessionCreated(created) => {
                    conn.session.salt = created.server_salt;
                    self.inner.needs_difference.store(true, Ordering::Relaxed);
                }
                ServerMessage::Pong(_) | ServerMessage::DetailedInfo { .. } => {}
                ServerMessage::Updates(updates) => {
                    let _ = self.inner.updates_tx.send(updates);
                }
                ServerMessage::Unknown { constructor } => {
                    tracing::debug!("ignoring unknown constructor {constructor:#010x}");
                }
            }
        }
        Ok(waiting)
    }

    /// Re-key and resend a query after bad-salt/bad-msg. Returns the new id.
    async fn resend_query(
        &self,
        conn: &mut Connection,
        bad_msg_id: i64,
    ) -> Result<Option<i64>, InvocationError> {
        let mut queries = self.inner.queries.lock().await;
        let Some(q) = queries.take(bad_msg_id) else {
            return Ok(None);
        };
        if q.retries + 1 >= MAX_ATTEMPTS {
            let _ = q.tx.send(Err(InvocationError::RetriesExhausted));
            return Ok(None);
        }
        let payload = q.payload.clone();
        drop(queries);

        let (new_msg_id, new_seq) = conn.send_query_payload(&payload).await?;
        self.inner.queries.lock().await.reassign(q, new_msg_id, new_seq);
        Ok(Some(new_msg_id))
    }

    // ── initConnection / config ────────────────────────────────────────────

    /// Run `invokeWithLayer(initConnection(help.getConfig))` and adopt the
    /// DC table; flips the working DC's `configured` flag.
    pub async fn init_connection(&self) -> Result<(), InvocationError> {
        let req = functions::InvokeWithLayer {
            layer: LAYER,
            query: functions::InitConnection {
                api_id: self.inner.api_id,
                device_model: "Linux".to_string(),
                system_version: "1.0".to_string(),
                app_version: env!("CARGO_PKG_VERSION").to_string(),
                lang_code: "en".to_string(),
                query: functions::help::GetConfig,
            },
        };

        let enums::Config::Config(cfg) = self.invoke(&req).await?;
        let dc_options: Vec<tangram_tl::types::DcOption> =
            cfg.dc_options.into_iter().map(|enums::DcOption::DcOption(o)| o).collect();

        let drained = {
            let mut registry = self.inner.registry.lock().await;
            registry.update_endpoints(&dc_options, self.inner.allow_ipv6);
            let working = registry.working();
            if let Some(dc) = registry.get_mut(working) {
                dc.flags.configured = true;
            }
            let drained = registry.drain_pending(working);
            tracing::info!("configured ({} DC options)", dc_options.len());
            self.inner.hooks.dc_update(working);
            drained
        };
        self.flush_parked(drained);
        Ok(())
    }

    fn flush_parked(&self, parked: Vec<ParkedQuery>) {
        for q in parked {
            let client = self.clone();
            tokio::spawn(async move {
                let result = client.rpc_call_raw(q.payload).await;
                let _ = q.tx.send(result);
            });
        }
    }

    // ── Migration & cross-DC ───────────────────────────────────────────────

    /// Switch the working DC (after a `*_MIGRATE_n` error).
    pub async fn migrate_to(&self, dc_id: i32) -> Result<(), InvocationError> {
        let (addr, saved, was_logged_in) = {
            let registry = self.inner.registry.lock().await;
            let dc = registry.get(dc_id);
            let addr = dc
                .and_then(|d| d.endpoint.addr(self.inner.allow_ipv6))
                .ok_or_else(|| InvocationError::Deserialize(format!("unknown DC{dc_id}")))?;
            let saved = dc.and_then(|d| d.perm_auth_key.map(|k| (k, d.server_salt, d.time_offset)));
            let was_logged_in = registry
                .get(registry.working())
                .map(|d| d.flags.logged_in)
                .unwrap_or(false);
            (addr, saved, was_logged_in)
        };
        tracing::info!("migrating to DC{dc_id} ({addr})");

        let new_conn = match saved {
            Some((key, salt, offset)) => {
                Connection::connect_with_key(&addr, key, salt, offset).await?
            }
            None => {
                let (conn, keys) =
                    Connection::connect_raw(&addr, &self.inner.keyring, self.inner.temp_key_expires)
                        .await?;
                let mut registry = self.inner.registry.lock().await;
                adopt_keys(&mut registry, dc_id, &keys);
                self.inner.hooks.auth_key_updated(dc_id, &keys.perm_key);
                conn
            }
        };

        *self.inner.conn.lock().await = new_conn;
        let old_working = {
            let mut registry = self.inner.registry.lock().await;
            let old = registry.working();
            registry.set_working(dc_id);
            old
        };
        self.inner.hooks.change_active_dc(dc_id);

        // Carry the user authorization over when we had one.
        let needs_import = was_logged_in
            && !self
                .inner
                .registry
                .lock()
                .await
                .get(dc_id)
                .map(|d| d.flags.logged_in)
                .unwrap_or(false);
        if needs_import {
            if let Err(e) = self.import_authorization_from(old_working, dc_id).await {
                tracing::warn!("auth import into DC{dc_id} failed: {e}");
            }
        }

        self.init_connection().await?;
        tracing::info!("now on DC{dc_id}");
        Ok(())
    }

    /// Export authorization on the working connection, import it on `dc_id`.
    async fn import_authorization_from(
        &self,
        _from_dc: i32,
        dc_id: i32,
    ) -> Result<(), InvocationError> {
        let enums::auth::ExportedAuthorization::ExportedAuthorization(exported) =
            self.invoke(&functions::auth::ExportAuthorization { dc_id }).await?;
        self.invoke(&functions::auth::ImportAuthorization {
            id: exported.id,
            bytes: exported.bytes,
        })
        .await?;
        let mut registry = self.inner.registry.lock().await;
        registry.set_signed(dc_id);
        let drained = registry.drain_pending(dc_id);
        drop(registry);
        self.flush_parked(drained);
        Ok(())
    }

    /// Invoke on a specific DC, opening (and authorizing) a pool connection
    /// as needed.
    pub async fn invoke_on_dc<R: RemoteCall>(
        &self,
        dc_id: i32,
        req: &R,
    ) -> Result<R::Return, InvocationError> {
        if dc_id == self.inner.registry.lock().await.working() {
            return self.invoke(req).await;
        }

        self.ensure_pool_connection(dc_id).await?;

        let body = req.to_bytes();
        let result = {
            let mut pool = self.inner.dc_pool.lock().await;
            let conn = pool
                .get_mut(&dc_id)
                .ok_or_else(|| InvocationError::Deserialize(format!("no connection for DC{dc_id}")))?;
            Self::lockstep_call(conn, &body).await
        }?;

        let mut cur = Cursor::from_slice(&result);
        R::Return::deserialize(&mut cur).map_err(Into::into)
    }

    async fn ensure_pool_connection(&self, dc_id: i32) -> Result<(), InvocationError> {
        if self.inner.dc_pool.lock().await.contains_key(&dc_id) {
            return Ok(());
        }

        let (addr, saved, authorized_here, logged_in_here) = {
            let registry = self.inner.registry.lock().await;
            let dc = registry
                .get(dc_id)
                .ok_or_else(|| InvocationError::Deserialize(format!("unknown DC{dc_id}")))?;
            (
                dc.endpoint
                    .addr(self.inner.allow_ipv6)
                    .ok_or_else(|| InvocationError::Deserialize(format!("no endpoint for DC{dc_id}")))?,
                dc.perm_auth_key.map(|k| (k, dc.server_salt, dc.time_offset)),
                dc.flags.authorized,
                dc.flags.logged_in,
            )
        };

        let conn = match saved {
            Some((key, salt, offset)) if authorized_here => {
                Connection::connect_with_key(&addr, key, salt, offset).await?
            }
            _ => {
                let (conn, keys) =
                    Connection::connect_raw(&addr, &self.inner.keyring, None).await?;
                let mut registry = self.inner.registry.lock().await;
                adopt_keys(&mut registry, dc_id, &keys);
                self.inner.hooks.auth_key_updated(dc_id, &keys.perm_key);
                conn
            }
        };
        self.inner.dc_pool.lock().await.insert(dc_id, conn);

        // First query against an authorized-but-not-signed DC transfers auth.
        if !logged_in_here {
            let enums::auth::ExportedAuthorization::ExportedAuthorization(exported) =
                self.invoke(&functions::auth::ExportAuthorization { dc_id }).await?;
            let import = functions::auth::ImportAuthorization {
                id: exported.id,
                bytes: exported.bytes,
            };
            let body = import.to_bytes();
            {
                let mut pool = self.inner.dc_pool.lock().await;
                let conn = pool.get_mut(&dc_id).ok_or(InvocationError::Dropped)?;
                Self::lockstep_call(conn, &body).await?;
            }
            let mut registry = self.inner.registry.lock().await;
            registry.set_signed(dc_id);
            let drained = registry.drain_pending(dc_id);
            drop(registry);
            self.flush_parked(drained);
            tracing::info!("authorization imported into DC{dc_id}");
        }
        Ok(())
    }

    /// Simple request/response exchange used by pool connections, which
    /// carry exactly one query at a time.
    async fn lockstep_call(conn: &mut Connection, body: &[u8]) -> Result<Vec<u8>, InvocationError> {
        let (msg_id, _) = conn.send_query_payload(body).await?;
        let deadline = Instant::now() + QUERY_TIMEOUT;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(InvocationError::RetriesExhausted);
            }
            let messages = timeout(remaining, conn.recv_envelope())
                .await
                .map_err(|_| InvocationError::RetriesExhausted)??;
            for msg in messages {
                match msg.payload {
                    ServerMessage::RpcResult { req_msg_id, body } if req_msg_id == msg_id => {
                        let _ = conn.flush_acks().await;
                        return Ok(body);
                    }
                    ServerMessage::RpcError { req_msg_id, error } if req_msg_id == msg_id => {
                        return Err(InvocationError::Rpc(RpcError::from_server(
                            error.error_code,
                            &error.error_message,
                        )));
                    }
                    _ => {}
                }
            }
        }
    }

    // ── Keep-alive pump ────────────────────────────────────────────────────

    /// Drive the connection: receive updates, flush acks, ping on idle,
    /// reconnect with back-off and port rotation on failure.
    ///
    /// Runs until the connection is irrecoverable.
    pub async fn run(&self) {
        let mut consecutive_failures: u32 = 0;
        loop {
            // Drain queued update envelopes outside the connection lock.
            loop {
                let next = self.inner.updates_rx.lock().await.try_recv();
                match next {
                    Ok(u) => self.handle_updates(u).await,
                    Err(_) => break,
                }
            }
            if self.inner.needs_difference.swap(false, Ordering::Relaxed) {
                if let Err(e) = self.get_difference().await {
                    tracing::warn!("getDifference failed: {e}");
                }
            }

            let step = {
                let mut conn = self.inner.conn.lock().await;
                if conn.idle_for() >= conn::DEAD_AFTER {
                    Err(InvocationError::Io(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        "no frames within the liveness window",
                    )))
                } else {
                    if conn.idle_for() >= conn::PING_AFTER
                        && conn.last_ping_at.map(|t| t.elapsed() >= conn::PING_AFTER).unwrap_or(true)
                    {
                        let _ = conn.send_ping().await;
                    }
                    let _ = conn.flush_acks().await;
                    match timeout(Duration::from_secs(1), conn.recv_envelope()).await {
                        Ok(Ok(messages)) => {
                            self.route_inbound(&mut conn, messages, 0).await.map(|_| ())
                        }
                        Ok(Err(e)) => Err(e),
                        Err(_idle) => Ok(()),
                    }
                }
            };

            match step {
                Ok(()) => {
                    consecutive_failures = 0;
                }
                Err(e) => {
                    tracing::warn!("connection failed: {e} — reconnecting");
                    self.inner.queries.lock().await.fail_all();
                    match self.reconnect(consecutive_failures).await {
                        Ok(()) => {
                            consecutive_failures = 0;
                            if let Err(e2) = self.get_difference().await {
                                tracing::warn!("getDifference after reconnect failed: {e2}");
                            }
                        }
                        Err(e2) => {
                            consecutive_failures += 1;
                            tracing::error!("reconnect failed: {e2}");
                            if consecutive_failures > 8 {
                                tracing::error!("giving up after {consecutive_failures} attempts");
                                return;
                            }
                        }
                    }
                }
            }
        }
    }

    async fn reconnect(&self, fail_count: u32) -> Result<(), InvocationError> {
        sleep(conn::backoff_delay(fail_count)).await;

        let (dc_id, addr, saved) = {
            let mut registry = self.inner.registry.lock().await;
            let dc_id = registry.working();
            let dc = registry
                .get_mut(dc_id)
                .ok_or_else(|| InvocationError::Deserialize(format!("unknown DC{dc_id}")))?;
            // Rotate the port each failure to dodge middlebox filtering.
            if fail_count > 0 {
                if let Some((_, port)) = &mut dc.endpoint.ipv4 {
                    *port = conn::rotate_port(*port);
                }
            }
            let addr = dc
                .endpoint
                .addr(self.inner.allow_ipv6)
                .ok_or_else(|| InvocationError::Deserialize(format!("no endpoint for DC{dc_id}")))?;
            let saved = dc.perm_auth_key.map(|k| (k, dc.server_salt, dc.time_offset));
            (dc_id, addr, saved)
        };

        let new_conn = match saved {
            Some((key, salt, offset)) => {
                tracing::info!("reconnecting to DC{dc_id} with the saved key");
                match Connection::connect_with_key(&addr, key, salt, offset).await {
                    Ok(c) => c,
                    Err(e) => {
                        tracing::warn!("saved-key reconnect failed ({e}); fresh handshake");
                        let (c, keys) = Connection::connect_raw(
                            &addr,
                            &self.inner.keyring,
                            self.inner.temp_key_expires,
                        )
                        .await?;
                        let mut registry = self.inner.registry.lock().await;
                        adopt_keys(&mut registry, dc_id, &keys);
                        self.inner.hooks.auth_key_updated(dc_id, &keys.perm_key);
                        c
                    }
                }
            }
            None => {
                let (c, keys) = Connection::connect_raw(
                    &addr,
                    &self.inner.keyring,
                    self.inner.temp_key_expires,
                )
                .await?;
                let mut registry = self.inner.registry.lock().await;
                adopt_keys(&mut registry, dc_id, &keys);
                self.inner.hooks.auth_key_updated(dc_id, &keys.perm_key);
                c
            }
        };

        *self.inner.conn.lock().await = new_conn;
        self.init_connection().await
    }

    // ── Login ──────────────────────────────────────────────────────────────

    /// Ask the server to send a login code to `phone`.
    pub async fn request_login_code(&self, phone: &str) -> Result<LoginToken, InvocationError> {
        let enums::auth::SentCode::SentCode(sent) = self
            .invoke(&functions::auth::SendCode {
                phone_number: phone.to_string(),
                sms_type: 0,
                api_id: self.inner.api_id,
                api_hash: self.inner.api_hash.clone(),
                lang_code: "en".to_string(),
            })
            .await?;
        Ok(LoginToken { phone: phone.to_string(), phone_code_hash: sent.phone_code_hash })
    }

    /// Complete the login with the received code.
    pub async fn sign_in(
        &self,
        token: &LoginToken,
        code: &str,
    ) -> Result<enums::User, InvocationError> {
        let result = self
            .invoke(&functions::auth::SignIn {
                phone_number: token.phone.clone(),
                phone_code_hash: token.phone_code_hash.clone(),
                phone_code: code.to_string(),
            })
            .await;

        match result {
            Ok(enums::auth::Authorization::Authorization(authorization)) => {
                let user = authorization.user;
                if let enums::User::User(u) = &user {
                    self.inner.secret_chats.lock().await.our_id = u.id as i32;
                }
                let working = self.inner.registry.lock().await.working();
                self.inner.registry.lock().await.set_signed(working);
                self.inner.hooks.logged_in();
                let _ = self.save_session().await;
                Ok(user)
            }
            Err(e) => {
                self.inner.hooks.on_failed_login();
                Err(e)
            }
        }
    }

    /// Fully host-driven login: phone and code come through the hooks.
    pub async fn login_interactive(&self) -> Result<enums::User, InvocationError> {
        let phone = self.ask_host(ValueKind::PhoneNumber, "phone number").await?;
        let token = self.request_login_code(phone.trim()).await?;
        loop {
            let code = self.ask_host(ValueKind::LoginCode, "login code").await?;
            if code.trim() == "call" {
                // The host wants code delivery by phone call; re-request.
                let _ = self.request_login_code(phone.trim()).await;
                continue;
            }
            return self.sign_in(&token, code.trim()).await;
        }
    }

    async fn ask_host(&self, kind: ValueKind, prompt: &str) -> Result<String, InvocationError> {
        let (tx, rx) = oneshot::channel();
        self.inner.hooks.get_value(kind, prompt, tx);
        rx.await.map_err(|_| InvocationError::Dropped)
    }

    /// Log the account out.
    pub async fn sign_out(&self) -> Result<bool, InvocationError> {
        let result = self.invoke(&functions::auth::LogOut).await;
        let success = matches!(result, Ok(true));
        self.inner.hooks.logged_out(success);
        result
    }

    // ── Messaging helpers ──────────────────────────────────────────────────

    /// Send a text message to a peer.
    pub async fn send_message(
        &self,
        peer: enums::InputPeer,
        text: &str,
    ) -> Result<i64, InvocationError> {
        let mut rnd = [0u8; 8];
        getrandom::getrandom(&mut rnd).map_err(|_| InvocationError::Dropped)?;
        let random_id = i64::from_le_bytes(rnd);
        let updates = self
            .invoke(&functions::messages::SendMessage {
                peer,
                reply_to_msg_id: None,
                message: text.to_string(),
                random_id,
            })
            .await?;
        self.handle_updates(updates).await;
        Ok(random_id)
    }

    // ── Persistence ────────────────────────────────────────────────────────

    /// Snapshot DC keys, counters and secret chats into the backend.
    pub async fn save_session(&self) -> Result<(), InvocationError> {
        let registry = self.inner.registry.lock().await;
        let update_state = self.inner.update_state.lock().await;
        let secret_chats = self.inner.secret_chats.lock().await;

        let dcs = registry
            .iter()
            .filter_map(|(id, dc)| {
                let addr = dc.endpoint.addr(self.inner.allow_ipv6)?;
                Some(DcRecord {
                    dc_id: *id,
                    addr,
                    auth_key: dc.perm_auth_key,
                    salt: dc.server_salt,
                    time_offset: dc.time_offset,
                })
            })
            .collect();

        let session = PersistedSession {
            home_dc_id: registry.working(),
            self_id: secret_chats.our_id as i64,
            dcs,
            counters: (update_state.pts, update_state.qts, update_state.seq, update_state.date),
            channel_pts: update_state.channel_pts.clone(),
            secret_chats: secret_chats.iter().cloned().collect(),
        };
        self.inner.session_backend.save(&session)?;
        Ok(())
    }
}

/// Record a completed handshake's output into the registry.
fn adopt_keys(registry: &mut DcRegistry, dc_id: i32, keys: &conn::NegotiatedKeys) {
    registry.set_auth_key(dc_id, keys.perm_key, keys.first_salt, keys.time_offset);
    if let Some(dc) = registry.get_mut(dc_id) {
        dc.rsa_key_idx = keys.rsa_key_idx as i32;
        if let Some(temp) = keys.temp_key {
            dc.set_temp_key(temp);
            dc.flags.bound = true;
        }
    }
}
