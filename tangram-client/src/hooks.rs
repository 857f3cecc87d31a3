//! The host callback surface.
//!
//! The core never blocks on the host: values the host must supply (phone
//! number, login code, passwords) are requested through [`Hooks::get_value`]
//! with a oneshot answer channel the host may resolve immediately or later.

use tangram_tl::{enums, types};
use tokio::sync::oneshot;

use crate::secret_chat::SecretChat;

/// What kind of value the core is asking the host for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValueKind {
    /// The account phone number in international format.
    PhoneNumber,
    /// The login code; the literal answer `"call"` requests phone-call delivery.
    LoginCode,
    /// First and last name, newline separated (sign-up).
    RegisterInfo,
    /// A new 2FA password.
    NewPassword,
    /// Current and new password, newline separated.
    CurrentAndNewPassword,
    /// The current 2FA password.
    CurrentPassword,
    /// A bot token.
    BotHash,
}

/// Host-implemented event sink and value source.
///
/// Every method has a no-op default so hosts implement only what they need.
#[allow(unused_variables)]
pub trait Hooks: Send + Sync + 'static {
    /// Fresh messages from updates or a difference fetch, in server order.
    fn new_messages(&self, messages: &[enums::Message]) {}

    /// A message we sent was assigned its server id.
    fn message_sent(&self, random_id: i64, server_id: i32, peer: Option<&enums::Peer>) {}

    /// Messages were deleted server-side.
    fn messages_deleted(&self, ids: &[i32]) {}

    /// The peer read our history up to `max_id` (or we read theirs).
    fn messages_mark_read(&self, peer: &enums::Peer, max_id: i32, outbox: bool) {}

    /// A user record became known or changed.
    fn new_user(&self, user: &enums::User) {}

    /// A chat or channel record became known or changed.
    fn new_chat(&self, chat: &enums::Chat) {}

    /// A peer's avatar locations became known or changed.
    fn avatar_update(
        &self,
        peer_id: i64,
        small: &types::FileLocation,
        big: &types::FileLocation,
    ) {
    }

    /// A secret chat changed state (requested, accepted, discarded).
    fn new_secret_chat(&self, chat: &SecretChat) {}

    /// A decrypted incoming secret-chat message.
    fn new_secret_message(&self, chat_id: i32, message: &types::DecryptedMessageData) {}

    /// Typing status changed in a dialog.
    fn typing_status_changed(&self, user_id: i64, typing: bool) {}

    /// A user went online/offline.
    fn status_notification(&self, user_id: i64, online: bool) {}

    /// A DC's registry entry changed (keys, flags, endpoints).
    fn dc_update(&self, dc_id: i32) {}

    /// The working DC moved (after a `*_MIGRATE_n`).
    fn change_active_dc(&self, dc_id: i32) {}

    /// A DC negotiated a fresh permanent auth key; persist it.
    fn auth_key_updated(&self, dc_id: i32, auth_key: &[u8; 256]) {}

    /// Request a value from the host. Resolve `answer` whenever ready.
    fn get_value(&self, kind: ValueKind, prompt: &str, answer: oneshot::Sender<String>) {
        // Default: drop the sender; the pending operation fails cleanly.
        let _ = (kind, prompt, answer);
    }

    /// Login completed.
    fn logged_in(&self) {}

    /// Logout finished (successfully or not).
    fn logged_out(&self, success: bool) {}

    /// The client is connected and configured.
    fn started(&self) {}

    /// A login attempt failed terminally.
    fn on_failed_login(&self) {}
}

/// A do-nothing host, useful for tests and headless tools.
pub struct NoopHooks;

impl Hooks for NoopHooks {}
