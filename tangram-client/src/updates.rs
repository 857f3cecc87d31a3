//! Update reconciliation: pts/qts/seq gating and difference fetches.
//!
//! Every accepted update with a `(pts, pts_count)` pair must satisfy
//! `new_pts == old_pts + pts_count`. Anything ahead of that opens a gap and
//! triggers `updates.getDifference`; anything behind is a duplicate and is
//! dropped. While a difference fetch is in flight the normal ingestion path
//! is locked and live envelopes are discarded — the difference response is
//! authoritative.

use std::collections::HashMap;

use tangram_tl::{enums, functions, types};

use crate::errors::InvocationError;
use crate::Client;

/// Verdict for one sequence-gated update.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GateCheck {
    /// In order — process it.
    Ok,
    /// Jumped ahead — fetch the difference first.
    Gap,
    /// Already seen — drop it.
    Duplicate,
}

/// Process-wide update counters plus per-channel pts.
#[derive(Clone, Debug, Default)]
pub struct UpdateState {
    /// Main message counter.
    pub pts: i32,
    /// Secret-chat counter.
    pub qts: i32,
    /// Combined-envelope sequence.
    pub seq: i32,
    /// Date of the newest processed update.
    pub date: i32,
    /// Per-channel pts values.
    pub channel_pts: HashMap<i64, i32>,
    diff_lock: bool,
}

impl UpdateState {
    /// Adopt a server `updates.state`.
    pub fn adopt(&mut self, state: &types::updates::State) {
        self.pts = state.pts;
        self.qts = state.qts;
        self.seq = state.seq;
        self.date = state.date;
    }

    /// Gate a `(pts, pts_count)` pair.
    pub fn check_pts(&self, new_pts: i32, pts_count: i32) -> GateCheck {
        let expected = self.pts + pts_count;
        if new_pts == expected {
            GateCheck::Ok
        } else if new_pts > expected {
            GateCheck::Gap
        } else {
            GateCheck::Duplicate
        }
    }

    /// Gate a qts value (strictly sequential).
    pub fn check_qts(&self, new_qts: i32) -> GateCheck {
        let expected = self.qts + 1;
        if new_qts == expected {
            GateCheck::Ok
        } else if new_qts > expected {
            GateCheck::Gap
        } else {
            GateCheck::Duplicate
        }
    }

    /// Gate a combined-envelope seq. Zero means "not sequenced".
    pub fn check_seq(&self, seq_start: i32) -> GateCheck {
        if seq_start == 0 {
            return GateCheck::Ok;
        }
        let expected = self.seq + 1;
        if seq_start == expected {
            GateCheck::Ok
        } else if seq_start > expected {
            GateCheck::Gap
        } else {
            GateCheck::Duplicate
        }
    }

    /// Gate a per-channel `(pts, pts_count)` pair. Unknown channels accept
    /// and seed their counter.
    pub fn check_channel_pts(&self, channel_id: i64, new_pts: i32, pts_count: i32) -> GateCheck {
        match self.channel_pts.get(&channel_id) {
            None => GateCheck::Ok,
            Some(&current) => {
                let expected = current + pts_count;
                if new_pts == expected {
                    GateCheck::Ok
                } else if new_pts > expected {
                    GateCheck::Gap
                } else {
                    GateCheck::Duplicate
                }
            }
        }
    }

    /// Advance pts monotonically.
    pub fn apply_pts(&mut self, new_pts: i32) {
        if new_pts > self.pts {
            self.pts = new_pts;
        }
    }

    /// Advance qts monotonically.
    pub fn apply_qts(&mut self, new_qts: i32) {
        if new_qts > self.qts {
            self.qts = new_qts;
        }
    }

    /// Advance a channel's pts.
    pub fn apply_channel_pts(&mut self, channel_id: i64, new_pts: i32) {
        let entry = self.channel_pts.entry(channel_id).or_insert(0);
        if new_pts > *entry {
            *entry = new_pts;
        }
    }

    /// True while a difference fetch owns the stream.
    pub fn locked(&self) -> bool {
        self.diff_lock
    }

    fn lock(&mut self) -> bool {
        if self.diff_lock {
            false
        } else {
            self.diff_lock = true;
            true
        }
    }

    fn unlock(&mut self) {
        self.diff_lock = false;
    }
}

// ─── Client driver ────────────────────────────────────────────────────────────

impl Client {
    /// Fetch the current server state and adopt it (first start).
    pub async fn sync_state(&self) -> Result<(), InvocationError> {
        let enums::updates::State::State(state) =
            self.invoke(&functions::updates::GetState).await?;
        let mut us = self.inner.update_state.lock().await;
        us.adopt(&state);
        tracing::info!("state synced: pts={} qts={} seq={}", state.pts, state.qts, state.seq);
        Ok(())
    }

    /// Close any update gap via `updates.getDifference`, iterating slices.
    pub async fn get_difference(&self) -> Result<(), InvocationError> {
        {
            let mut us = self.inner.update_state.lock().await;
            if !us.lock() {
                return Ok(()); // a fetch is already in flight
            }
        }
        let result = self.run_difference_loop().await;
        self.inner.update_state.lock().await.unlock();
        result
    }

    async fn run_difference_loop(&self) -> Result<(), InvocationError> {
        loop {
            let (pts, qts, date) = {
                let us = self.inner.update_state.lock().await;
                (us.pts, us.qts, us.date)
            };
            if pts == 0 {
                // No local state yet; adopt the server's and stop.
                self.sync_state().await?;
                return Ok(());
            }

            tracing::info!("getDifference (pts={pts}, qts={qts}, date={date})");
            let diff =
                self.invoke(&functions::updates::GetDifference { pts, date, qts }).await?;

            match diff {
                enums::updates::Difference::Empty(e) => {
                    let mut us = self.inner.update_state.lock().await;
                    us.date = e.date;
                    us.seq = e.seq;
                    return Ok(());
                }
                enums::updates::Difference::Difference(d) => {
                    self.apply_difference_payload(
                        d.new_messages,
                        d.new_encrypted_messages,
                        d.other_updates,
                        d.chats,
                        d.users,
                    )
                    .await;
                    self.inner.update_state.lock().await.adopt(&d.state);
                    return Ok(());
                }
                enums::updates::Difference::Slice(d) => {
                    self.apply_difference_payload(
                        d.new_messages,
                        d.new_encrypted_messages,
                        d.other_updates,
                        d.chats,
                        d.users,
                    )
                    .await;
                    self.inner.update_state.lock().await.adopt(&d.intermediate_state);
                    // Loop: more slices follow until Difference or Empty.
                }
            }
        }
    }

    async fn apply_difference_payload(
        &self,
        new_messages: Vec<enums::Message>,
        new_encrypted: Vec<enums::EncryptedMessage>,
        other_updates: Vec<enums::Update>,
        chats: Vec<enums::Chat>,
        users: Vec<enums::User>,
    ) {
        self.cache_peers(&users, &chats).await;
        if !new_messages.is_empty() {
            self.inner.hooks.new_messages(&new_messages);
        }
        for encrypted in new_encrypted {
            self.handle_encrypted_message(encrypted).await;
        }
        for update in other_updates {
            // Counters come from the difference state; apply without gating.
            self.dispatch_update(update, false).await;
        }
    }

    /// Fetch a channel's difference after a channel gap or too-long signal.
    pub async fn get_channel_difference(&self, channel_id: i64) -> Result<(), InvocationError> {
        let access_hash = self
            .inner
            .peer_cache
            .lock()
            .await
            .channels
            .get(&channel_id)
            .copied()
            .unwrap_or(0);
        let pts = self
            .inner
            .update_state
            .lock()
            .await
            .channel_pts
            .get(&channel_id)
            .copied()
            .unwrap_or(1);

        tracing::info!("getChannelDifference (channel={channel_id}, pts={pts})");
        let diff = self
            .invoke(&functions::updates::GetChannelDifference {
                channel: enums::InputChannel::Channel { channel_id, access_hash },
                filter: enums::ChannelMessagesFilter::Empty,
                pts,
                limit: 100,
            })
            .await?;

        match diff {
            enums::updates::ChannelDifference::Empty(d) => {
                self.inner.update_state.lock().await.apply_channel_pts(channel_id, d.pts);
            }
            enums::updates::ChannelDifference::TooLong(d) => {
                self.cache_peers(&d.users, &d.chats).await;
                if !d.messages.is_empty() {
                    self.inner.hooks.new_messages(&d.messages);
                }
                self.inner.update_state.lock().await.apply_channel_pts(channel_id, d.pts);
            }
            enums::updates::ChannelDifference::Difference(d) => {
                self.cache_peers(&d.users, &d.chats).await;
                if !d.new_messages.is_empty() {
                    self.inner.hooks.new_messages(&d.new_messages);
                }
                for update in d.other_updates {
                    Box::pin(self.dispatch_update(update, false)).await;
                }
                self.inner.update_state.lock().await.apply_channel_pts(channel_id, d.pts);
            }
        }
        Ok(())
    }

    /// Entry point for a raw update envelope off the wire.
    pub(crate) async fn handle_updates(&self, updates: enums::Updates) {
        if self.inner.update_state.lock().await.locked() {
            // A difference fetch is in flight; the response supersedes this.
            tracing::debug!("dropping update during difference fetch");
            return;
        }

        match updates {
            enums::Updates::TooLong => {
                if let Err(e) = self.get_difference().await {
                    tracing::warn!("getDifference failed: {e}");
                }
            }
            enums::Updates::Short { update, date } => {
                self.inner.update_state.lock().await.date = date;
                self.dispatch_update(update, true).await;
            }
            enums::Updates::ShortMessage { out, id, user_id, message, pts, pts_count, date } => {
                let gate = self.inner.update_state.lock().await.check_pts(pts, pts_count);
                match gate {
                    GateCheck::Ok => {
                        let msg = enums::Message::Message(types::Message {
                            out,
                            id,
                            from_id: Some(enums::Peer::User(types::PeerUser { user_id })),
                            peer_id: enums::Peer::User(types::PeerUser { user_id }),
                            date,
                            message,
                            media: None,
                        });
                        {
                            let mut us = self.inner.update_state.lock().await;
                            us.apply_pts(pts);
                            us.date = date;
                        }
                        self.inner.hooks.new_messages(&[msg]);
                    }
                    GateCheck::Gap => {
                        let _ = self.get_difference().await;
                    }
                    GateCheck::Duplicate => {}
                }
            }
            enums::Updates::ShortChatMessage {
                out,
                id,
                from_id,
                chat_id,
                message,
                pts,
                pts_count,
                date,
            } => {
                let gate = self.inner.update_state.lock().await.check_pts(pts, pts_count);
                match gate {
                    GateCheck::Ok => {
                        let msg = enums::Message::Message(types::Message {
                            out,
                            id,
                            from_id: Some(enums::Peer::User(types::PeerUser { user_id: from_id })),
                            peer_id: enums::Peer::Chat(types::PeerChat { chat_id }),
                            date,
                            message,
                            media: None,
                        });
                        {
                            let mut us = self.inner.update_state.lock().await;
                            us.apply_pts(pts);
                            us.date = date;
                        }
                        self.inner.hooks.new_messages(&[msg]);
                    }
                    GateCheck::Gap => {
                        let _ = self.get_difference().await;
                    }
                    GateCheck::Duplicate => {}
                }
            }
            enums::Updates::Combined { updates, users, chats, date, seq_start, seq } => {
                self.handle_sequenced(updates, users, chats, date, seq_start, seq).await;
            }
            enums::Updates::Updates { updates, users, chats, date, seq } => {
                self.handle_sequenced(updates, users, chats, date, seq, seq).await;
            }
        }
    }

    async fn handle_sequenced(
        &self,
        updates: Vec<enums::Update>,
        users: Vec<enums::User>,
        chats: Vec<enums::Chat>,
        date: i32,
        seq_start: i32,
        seq: i32,
    ) {
        let gate = self.inner.update_state.lock().await.check_seq(seq_start);
        match gate {
            GateCheck::Duplicate => return,
            GateCheck::Gap => {
                tracing::warn!("seq gap (got {seq_start}) — fetching difference");
                let _ = self.get_difference().await;
                return;
            }
            GateCheck::Ok => {}
        }

        self.cache_peers(&users, &chats).await;
        for update in updates {
            self.dispatch_update(update, true).await;
        }
        let mut us = self.inner.update_state.lock().await;
        if seq > 0 {
            us.seq = seq;
        }
        us.date = date;
    }

    /// Apply one update, gating on its counters when `gated`.
    pub(crate) async fn dispatch_update(&self, update: enums::Update, gated: bool) {
        use enums::Update as U;

        // Gate pts-carrying updates first.
        let gate = if gated {
            let us = self.inner.update_state.lock().await;
            match &update {
                U::NewMessage { pts, pts_count, .. }
                | U::DeleteMessages { pts, pts_count, .. }
                | U::ReadHistoryInbox { pts, pts_count, .. }
                | U::ReadHistoryOutbox { pts, pts_count, .. } => us.check_pts(*pts, *pts_count),
                U::NewChannelMessage { message, pts, pts_count } => {
                    match channel_of(message) {
                        Some(id) => us.check_channel_pts(id, *pts, *pts_count),
                        None => GateCheck::Ok,
                    }
                }
                U::NewEncryptedMessage { qts, .. } => us.check_qts(*qts),
                _ => GateCheck::Ok,
            }
        } else {
            GateCheck::Ok
        };

        match gate {
            GateCheck::Duplicate => return,
            GateCheck::Gap => {
                match &update {
                    U::NewChannelMessage { message, .. } => {
                        if let Some(id) = channel_of(message) {
                            let _ = Box::pin(self.get_channel_difference(id)).await;
                        }
                    }
                    _ => {
                        let _ = Box::pin(self.get_difference()).await;
                    }
                }
                return;
            }
            GateCheck::Ok => {}
        }

        match update {
            U::NewMessage { message, pts, .. } => {
                self.inner.update_state.lock().await.apply_pts(pts);
                self.inner.hooks.new_messages(&[message]);
            }
            U::NewChannelMessage { message, pts, .. } => {
                if let Some(id) = channel_of(&message) {
                    self.inner.update_state.lock().await.apply_channel_pts(id, pts);
                }
                self.inner.hooks.new_messages(&[message]);
            }
            U::ChannelTooLong { channel_id, .. } => {
                let _ = self.get_channel_difference(channel_id).await;
            }
            U::MessageId { id, random_id } => {
                self.inner.hooks.message_sent(random_id, id, None);
            }
            U::DeleteMessages { messages, pts, .. } => {
                self.inner.update_state.lock().await.apply_pts(pts);
                self.inner.hooks.messages_deleted(&messages);
            }
            U::ReadHistoryInbox { peer, max_id, pts, .. } => {
                self.inner.update_state.lock().await.apply_pts(pts);
                self.inner.hooks.messages_mark_read(&peer, max_id, false);
            }
            U::ReadHistoryOutbox { peer, max_id, pts, .. } => {
                self.inner.update_state.lock().await.apply_pts(pts);
                self.inner.hooks.messages_mark_read(&peer, max_id, true);
            }
            U::UserTyping { user_id, action } => {
                self.inner
                    .hooks
                    .typing_status_changed(user_id, action == enums::SendMessageAction::Typing);
            }
            U::ChatUserTyping { user_id, action, .. } => {
                self.inner
                    .hooks
                    .typing_status_changed(user_id, action == enums::SendMessageAction::Typing);
            }
            U::UserStatus { user_id, status } => {
                let online = matches!(status, enums::UserStatus::Online { .. });
                self.inner.hooks.status_notification(user_id, online);
            }
            U::NewEncryptedMessage { message, qts } => {
                self.inner.update_state.lock().await.apply_qts(qts);
                self.handle_encrypted_message(message).await;
            }
            U::Encryption { chat, .. } => {
                self.handle_encryption_update(chat).await;
            }
            U::EncryptedChatTyping { chat_id } => {
                self.inner.hooks.typing_status_changed(chat_id as i64, true);
            }
            U::EncryptedMessagesRead { .. } => {}
            U::DcOptions { dc_options } => {
                let opts: Vec<types::DcOption> =
                    dc_options.into_iter().map(|enums::DcOption::DcOption(o)| o).collect();
                self.inner.registry.lock().await.update_endpoints(&opts, self.inner.allow_ipv6);
            }
        }
    }

    pub(crate) async fn cache_peers(&self, users: &[enums::User], chats: &[enums::Chat]) {
        let mut cache = self.inner.peer_cache.lock().await;
        for user in users {
            if let enums::User::User(u) = user {
                if let Some(hash) = u.access_hash {
                    cache.users.insert(u.id, hash);
                }
                if let Some(photo) = &u.photo {
                    self.inner.hooks.avatar_update(u.id, &photo.photo_small, &photo.photo_big);
                }
            }
            self.inner.hooks.new_user(user);
        }
        for chat in chats {
            if let enums::Chat::Channel(c) = chat {
                if let Some(hash) = c.access_hash {
                    cache.channels.insert(c.id, hash);
                }
            }
            self.inner.hooks.new_chat(chat);
        }
    }
}

fn channel_of(message: &enums::Message) -> Option<i64> {
    match message {
        enums::Message::Message(m) => match &m.peer_id {
            enums::Peer::Channel(c) => Some(c.channel_id),
            _ => None,
        },
        enums::Message::Empty { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pts_gating() {
        let mut us = UpdateState { pts: 100, ..Default::default() };
        assert_eq!(us.check_pts(101, 1), GateCheck::Ok);
        assert_eq!(us.check_pts(103, 1), GateCheck::Gap);
        assert_eq!(us.check_pts(99, 1), GateCheck::Duplicate);
        us.apply_pts(101);
        assert_eq!(us.pts, 101);
        us.apply_pts(50); // never regresses
        assert_eq!(us.pts, 101);
    }

    #[test]
    fn qts_is_strictly_sequential() {
        let us = UpdateState { qts: 7, ..Default::default() };
        assert_eq!(us.check_qts(8), GateCheck::Ok);
        assert_eq!(us.check_qts(10), GateCheck::Gap);
        assert_eq!(us.check_qts(7), GateCheck::Duplicate);
    }

    #[test]
    fn seq_zero_always_accepted() {
        let us = UpdateState { seq: 40, ..Default::default() };
        assert_eq!(us.check_seq(0), GateCheck::Ok);
        assert_eq!(us.check_seq(41), GateCheck::Ok);
        assert_eq!(us.check_seq(45), GateCheck::Gap);
        assert_eq!(us.check_seq(40), GateCheck::Duplicate);
    }

    #[test]
    fn unknown_channel_seeds_counter() {
        let mut us = UpdateState::default();
        assert_eq!(us.check_channel_pts(5, 17, 1), GateCheck::Ok);
        us.apply_channel_pts(5, 17);
        assert_eq!(us.check_channel_pts(5, 18, 1), GateCheck::Ok);
        assert_eq!(us.check_channel_pts(5, 25, 1), GateCheck::Gap);
        assert_eq!(us.check_channel_pts(5, 17, 1), GateCheck::Duplicate);
    }

    #[test]
    fn diff_lock_is_exclusive() {
        let mut us = UpdateState::default();
        assert!(!us.locked());
        assert!(us.lock());
        assert!(!us.lock());
        us.unlock();
        assert!(us.lock());
    }
}
