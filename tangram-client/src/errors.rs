//! Error types and the server-error classification table.

use std::{fmt, io};

// ─── RpcError ─────────────────────────────────────────────────────────────────

/// An error returned by the server in response to an RPC call.
///
/// Numeric suffixes are stripped from the name and placed in
/// [`RpcError::value`]: `FLOOD_WAIT_30` → `{ code: 420, name: "FLOOD_WAIT",
/// value: Some(30) }`.
#[derive(Clone, Debug, PartialEq)]
pub struct RpcError {
    /// HTTP-like status code.
    pub code: i32,
    /// Error name in SCREAMING_SNAKE_CASE with digits removed.
    pub name: String,
    /// Numeric suffix extracted from the name, if any.
    pub value: Option<u32>,
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RPC {}: {}", self.code, self.name)?;
        if let Some(v) = self.value {
            write!(f, " (value: {v})")?;
        }
        Ok(())
    }
}

impl std::error::Error for RpcError {}

impl RpcError {
    /// Parse a raw error message like `"PHONE_MIGRATE_4"`.
    pub fn from_server(code: i32, message: &str) -> Self {
        if let Some(idx) = message.rfind('_') {
            let suffix = &message[idx + 1..];
            if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) {
                if let Ok(v) = suffix.parse::<u32>() {
                    return Self { code, name: message[..idx].to_string(), value: Some(v) };
                }
            }
        }
        Self { code, name: message.to_string(), value: None }
    }

    /// Match on the error name, with optional `'*'` prefix/suffix wildcard.
    pub fn is(&self, pattern: &str) -> bool {
        if let Some(prefix) = pattern.strip_suffix('*') {
            self.name.starts_with(prefix)
        } else if let Some(suffix) = pattern.strip_prefix('*') {
            self.name.ends_with(suffix)
        } else {
            self.name == pattern
        }
    }

    /// Seconds to wait if this is a `FLOOD_WAIT_s`.
    pub fn flood_wait_seconds(&self) -> Option<u64> {
        if self.code == 420 && self.name == "FLOOD_WAIT" {
            self.value.map(u64::from)
        } else {
            None
        }
    }

    /// Target DC if this is a 303 `*_MIGRATE_n`.
    pub fn migrate_dc(&self) -> Option<i32> {
        if self.code == 303 && self.is("*_MIGRATE") {
            self.value.map(|v| v as i32)
        } else {
            None
        }
    }

    /// True for 401 `SESSION_PASSWORD_NEEDED`.
    pub fn password_needed(&self) -> bool {
        self.code == 401 && self.name == "SESSION_PASSWORD_NEEDED"
    }

    /// True for errors that must be delivered to the caller untouched.
    pub fn is_terminal(&self) -> bool {
        matches!(self.code, 400 | 403 | 404) || (self.code == 401 && !self.password_needed())
    }

    /// True for 500-class errors worth a delayed re-issue.
    pub fn is_transient(&self) -> bool {
        self.code >= 500
            || !(self.is_terminal()
                || self.code == 303
                || self.code == 401
                || self.code == 420)
    }
}

// ─── InvocationError ──────────────────────────────────────────────────────────

/// The error type returned from any client method that talks to the server.
#[derive(Debug)]
pub enum InvocationError {
    /// The server rejected the request.
    Rpc(RpcError),
    /// Network / I/O failure.
    Io(io::Error),
    /// Response deserialization failed.
    Deserialize(String),
    /// The request was dropped (connection torn down mid-flight).
    Dropped,
    /// The retry budget for this request is exhausted.
    RetriesExhausted,
    /// A transfer was cancelled through its token.
    Cancelled,
}

impl fmt::Display for InvocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rpc(e) => write!(f, "{e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Deserialize(s) => write!(f, "deserialize error: {s}"),
            Self::Dropped => write!(f, "request dropped"),
            Self::RetriesExhausted => write!(f, "retry budget exhausted"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::error::Error for InvocationError {}

impl From<io::Error> for InvocationError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<tangram_tl::deserialize::Error> for InvocationError {
    fn from(e: tangram_tl::deserialize::Error) -> Self {
        Self::Deserialize(e.to_string())
    }
}

impl From<tangram_mtproto::envelope::Error> for InvocationError {
    fn from(e: tangram_mtproto::envelope::Error) -> Self {
        Self::Deserialize(e.to_string())
    }
}

impl From<tangram_mtproto::authentication::Error> for InvocationError {
    fn from(e: tangram_mtproto::authentication::Error) -> Self {
        Self::Deserialize(e.to_string())
    }
}

impl InvocationError {
    /// Returns true if this is the named RPC error (wildcards allowed).
    pub fn is(&self, pattern: &str) -> bool {
        match self {
            Self::Rpc(e) => e.is(pattern),
            _ => false,
        }
    }

    /// Flood-wait duration, if applicable.
    pub fn flood_wait_seconds(&self) -> Option<u64> {
        match self {
            Self::Rpc(e) => e.flood_wait_seconds(),
            _ => None,
        }
    }

    /// Migration target DC, if applicable.
    pub fn migrate_dc(&self) -> Option<i32> {
        match self {
            Self::Rpc(e) => e.migrate_dc(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_suffix() {
        let e = RpcError::from_server(420, "FLOOD_WAIT_30");
        assert_eq!(e.name, "FLOOD_WAIT");
        assert_eq!(e.value, Some(30));
        assert_eq!(e.flood_wait_seconds(), Some(30));
    }

    #[test]
    fn migrate_variants_classify() {
        for name in ["PHONE_MIGRATE_4", "NETWORK_MIGRATE_4", "USER_MIGRATE_4"] {
            let e = RpcError::from_server(303, name);
            assert_eq!(e.migrate_dc(), Some(4), "{name}");
        }
        assert_eq!(RpcError::from_server(400, "PHONE_MIGRATE_4").migrate_dc(), None);
    }

    #[test]
    fn terminal_and_transient_split() {
        assert!(RpcError::from_server(400, "MESSAGE_EMPTY").is_terminal());
        assert!(RpcError::from_server(403, "CHAT_WRITE_FORBIDDEN").is_terminal());
        assert!(RpcError::from_server(404, "METHOD_NOT_FOUND").is_terminal());
        assert!(RpcError::from_server(401, "AUTH_KEY_UNREGISTERED").is_terminal());
        assert!(!RpcError::from_server(401, "SESSION_PASSWORD_NEEDED").is_terminal());
        assert!(RpcError::from_server(500, "INTERDC_CALL_ERROR").is_transient());
        assert!(!RpcError::from_server(420, "FLOOD_WAIT_5").is_transient());
    }

    #[test]
    fn wildcard_matching() {
        let e = RpcError::from_server(303, "PHONE_MIGRATE_4");
        assert!(e.is("PHONE_*"));
        assert!(e.is("*_MIGRATE"));
        assert!(!e.is("USER_MIGRATE"));
    }
}
