//! The DC registry: per-DC endpoints, keys, flags and parked queries.
//!
//! The registry owns every `DcState` by id; connections and queries refer to
//! DCs through the id, never through shared pointers, so teardown can never
//! dangle.

use std::collections::{HashMap, VecDeque};

use crate::queries::ParkedQuery;

/// A serving endpoint for one DC id.
#[derive(Clone, Debug, PartialEq)]
pub struct DcEndpoint {
    /// The DC id (small positive integer).
    pub id: i32,
    /// IPv4 host and port, when known.
    pub ipv4: Option<(String, u16)>,
    /// IPv6 host and port, when known.
    pub ipv6: Option<(String, u16)>,
}

impl DcEndpoint {
    /// Endpoint with only an IPv4 address.
    pub fn v4(id: i32, host: impl Into<String>, port: u16) -> Self {
        Self { id, ipv4: Some((host.into(), port)), ipv6: None }
    }

    /// The address to dial, preferring IPv4.
    pub fn addr(&self, allow_ipv6: bool) -> Option<String> {
        if let Some((host, port)) = &self.ipv4 {
            return Some(format!("{host}:{port}"));
        }
        if allow_ipv6 {
            if let Some((host, port)) = &self.ipv6 {
                return Some(format!("[{host}]:{port}"));
            }
        }
        None
    }
}

/// Progress of the key exchange on a DC.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum HandshakeState {
    /// Nothing sent yet.
    #[default]
    Init,
    /// `req_pq` sent (permanent key).
    ReqPqSent,
    /// `req_DH_params` sent.
    ReqDhSent,
    /// `set_client_DH_params` sent.
    ClientDhSent,
    /// Permanent key established.
    Authorized,
    /// `req_pq` sent for a temp key.
    ReqPqSentTemp,
    /// `req_DH_params` sent for a temp key.
    ReqDhSentTemp,
    /// `set_client_DH_params` sent for a temp key.
    ClientDhSentTemp,
}

/// Lifecycle flags of a DC.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DcFlags {
    /// Permanent auth key established.
    pub authorized: bool,
    /// User authorization valid on this DC (sign-in or auth import).
    pub logged_in: bool,
    /// `help.getConfig` succeeded on this DC.
    pub configured: bool,
    /// Temp key bound to the permanent key (PFS).
    pub bound: bool,
}

/// Everything the client knows about one DC.
pub struct DcState {
    /// Where to reach it.
    pub endpoint: DcEndpoint,
    /// Permanent auth key, once negotiated.
    pub perm_auth_key: Option<[u8; 256]>,
    /// `low64(sha1(perm_auth_key)[12..20])`.
    pub perm_auth_key_id: i64,
    /// Temp (PFS) auth key, once negotiated.
    pub temp_auth_key: Option<[u8; 256]>,
    /// Identifier of the temp key.
    pub temp_auth_key_id: i64,
    /// Current server salt.
    pub server_salt: i64,
    /// Clock skew against this DC.
    pub time_offset: i32,
    /// Key-exchange progress.
    pub state: HandshakeState,
    /// Lifecycle flags.
    pub flags: DcFlags,
    /// Which keyring entry signed our handshake (for reconnects).
    pub rsa_key_idx: i32,
    /// Queries waiting for this DC to become usable, FIFO.
    pub pending: VecDeque<ParkedQuery>,
}

impl DcState {
    fn new(endpoint: DcEndpoint) -> Self {
        Self {
            endpoint,
            perm_auth_key: None,
            perm_auth_key_id: 0,
            temp_auth_key: None,
            temp_auth_key_id: 0,
            server_salt: 0,
            time_offset: 0,
            state: HandshakeState::Init,
            flags: DcFlags::default(),
            rsa_key_idx: -1,
            pending: VecDeque::new(),
        }
    }

    /// Adopt a freshly negotiated permanent key.
    pub fn set_auth_key(&mut self, key: [u8; 256], salt: i64, time_offset: i32) {
        let auth = tangram_crypto::AuthKey::from_bytes(key);
        self.perm_auth_key = Some(key);
        self.perm_auth_key_id = auth.key_id_u64() as i64;
        self.server_salt = salt;
        self.time_offset = time_offset;
        self.state = HandshakeState::Authorized;
        self.flags.authorized = true;
    }

    /// Adopt a temp key and mark it bound.
    pub fn set_temp_key(&mut self, key: [u8; 256]) {
        let auth = tangram_crypto::AuthKey::from_bytes(key);
        self.temp_auth_key = Some(key);
        self.temp_auth_key_id = auth.key_id_u64() as i64;
    }
}

/// Process-wide table of DCs plus the working-DC pointer.
#[derive(Default)]
pub struct DcRegistry {
    dcs: HashMap<i32, DcState>,
    working_dc: i32,
}

impl DcRegistry {
    /// Empty registry; DCs appear on first contact.
    pub fn new(working_dc: i32) -> Self {
        Self { dcs: HashMap::new(), working_dc }
    }

    /// Fetch or create the state for `id`.
    pub fn get_or_create(&mut self, id: i32, endpoint: DcEndpoint) -> &mut DcState {
        self.dcs.entry(id).or_insert_with(|| DcState::new(endpoint))
    }

    /// Borrow a DC if known.
    pub fn get(&self, id: i32) -> Option<&DcState> {
        self.dcs.get(&id)
    }

    /// Mutably borrow a DC if known.
    pub fn get_mut(&mut self, id: i32) -> Option<&mut DcState> {
        self.dcs.get_mut(&id)
    }

    /// Record a negotiated permanent key for `id`.
    pub fn set_auth_key(&mut self, id: i32, key: [u8; 256], salt: i64, time_offset: i32) {
        if let Some(dc) = self.dcs.get_mut(&id) {
            dc.set_auth_key(key, salt, time_offset);
        }
    }

    /// Mark `id` as carrying a valid user authorization.
    pub fn set_signed(&mut self, id: i32) {
        if let Some(dc) = self.dcs.get_mut(&id) {
            dc.flags.logged_in = true;
        }
    }

    /// Move the working-DC pointer.
    pub fn set_working(&mut self, id: i32) {
        self.working_dc = id;
    }

    /// The current working DC id.
    pub fn working(&self) -> i32 {
        self.working_dc
    }

    /// Park a query until `id` becomes usable.
    pub fn add_pending_query(&mut self, id: i32, q: ParkedQuery) {
        if let Some(dc) = self.dcs.get_mut(&id) {
            dc.pending.push_back(q);
        }
    }

    /// Take all parked queries for `id` in FIFO order.
    pub fn drain_pending(&mut self, id: i32) -> Vec<ParkedQuery> {
        match self.dcs.get_mut(&id) {
            Some(dc) => dc.pending.drain(..).collect(),
            None => Vec::new(),
        }
    }

    /// Update endpoints from a fresh `config.dc_options` vector.
    pub fn update_endpoints(&mut self, options: &[tangram_tl::types::DcOption], allow_ipv6: bool) {
        for opt in options {
            if opt.media_only || opt.cdn || opt.tcpo_only {
                continue;
            }
            if opt.ipv6 && !allow_ipv6 {
                continue;
            }
            let entry = self
                .dcs
                .entry(opt.id)
                .or_insert_with(|| DcState::new(DcEndpoint { id: opt.id, ipv4: None, ipv6: None }));
            let hostport = (opt.ip_address.clone(), opt.port as u16);
            if opt.ipv6 {
                entry.endpoint.ipv6 = Some(hostport);
            } else {
                entry.endpoint.ipv4 = Some(hostport);
            }
        }
    }

    /// Iterate all known DCs.
    pub fn iter(&self) -> impl Iterator<Item = (&i32, &DcState)> {
        self.dcs.iter()
    }
}

/// Bootstrap endpoints used before the first `help.getConfig`.
pub fn default_endpoints() -> Vec<DcEndpoint> {
    vec![
        DcEndpoint::v4(1, "149.154.175.53", 443),
        DcEndpoint::v4(2, "149.154.167.51", 443),
        DcEndpoint::v4(3, "149.154.175.100", 443),
        DcEndpoint::v4(4, "149.154.167.91", 443),
        DcEndpoint::v4(5, "91.108.56.130", 443),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_key_id_matches_sha1_tail() {
        let mut reg = DcRegistry::new(2);
        reg.get_or_create(2, DcEndpoint::v4(2, "127.0.0.1", 443));
        let key = [0x5au8; 256];
        reg.set_auth_key(2, key, 99, 3);

        let dc = reg.get(2).unwrap();
        let expected = tangram_crypto::AuthKey::from_bytes(key).key_id_u64() as i64;
        assert_eq!(dc.perm_auth_key_id, expected);
        assert!(dc.flags.authorized);
        assert_eq!(dc.state, HandshakeState::Authorized);
        assert_eq!(dc.server_salt, 99);
    }

    #[test]
    fn pending_queue_is_fifo() {
        let mut reg = DcRegistry::new(1);
        reg.get_or_create(4, DcEndpoint::v4(4, "127.0.0.1", 443));
        for i in 0..3 {
            reg.add_pending_query(4, ParkedQuery::for_test(i));
        }
        let drained = reg.drain_pending(4);
        assert_eq!(drained.len(), 3);
        assert!(drained.windows(2).all(|w| w[0].test_tag() < w[1].test_tag()));
        assert!(reg.drain_pending(4).is_empty());
    }
}
