//! Real-time bridge commands: parsing the untyped payload into a typed
//! command, and applying that command to the interest lists and publisher.

use crate::constants::{
    FIELD_ID, FIELD_NAME, FIELD_PARENT_ID, FIELD_SENDER, FIELD_SUBJECT, FIELD_TARGET,
    FIELD_TARGET_ID, FIELD_TARGET_TYPE, FIELD_TYPE,
};
use crate::error::Result;
use crate::models::{
    CommentNotice, CommentType, ListChangedNotice, Notice, NoteNotice, NotificationModel,
    StatusType,
};
use crate::payload::CommandPayload;
use crate::publisher::UpdatePublisher;
use crate::services::BridgeServices;
use crate::stats::{CommandOutcome, SharedBridgeStats};
use crate::store::{ListKind, SharedInterestStore};

/// A recognized bridge command with its fields validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeCommand {
    Note {
        sender: String,
        subject: String,
        note_id: Option<i64>,
    },
    Comment {
        name: String,
        comment_id: i64,
        parent_id: i64,
        target_id: i64,
        /// Already HTML-decoded
        title: String,
        comment_type: CommentType,
    },
    TrackAdd { name: String },
    TrackRemove { name: String },
    FriendAdd { name: String },
    FriendRequest { name: String },
    FriendRemove { name: String },
}

/// How a list command touches the interest store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListChange {
    pub list: ListKind,
    pub is_add: bool,
    /// Publish a notice when the store reports a real change.
    pub notify: bool,
}

impl BridgeCommand {
    /// Parse one payload.
    ///
    /// `Ok(None)` means the payload has no `type` or a type this client does
    /// not know; the server may add kinds ahead of a client release.
    pub fn parse(payload: &CommandPayload) -> Result<Option<Self>> {
        let Some(command_type) = payload.get_str(FIELD_TYPE) else {
            return Ok(None);
        };

        let command = match command_type.as_str() {
            "note" => parse_note(payload)?,
            "comment" => parse_comment(payload)?,
            "trackadd" => BridgeCommand::TrackAdd {
                name: payload.require_name(FIELD_NAME)?,
            },
            "trackrem" => BridgeCommand::TrackRemove {
                name: payload.require_name(FIELD_NAME)?,
            },
            "friendadd" => BridgeCommand::FriendAdd {
                name: payload.require_name(FIELD_NAME)?,
            },
            "friendrequest" => BridgeCommand::FriendRequest {
                name: payload.require_name(FIELD_NAME)?,
            },
            "friendremove" => BridgeCommand::FriendRemove {
                name: payload.require_name(FIELD_NAME)?,
            },
            _ => return Ok(None),
        };
        Ok(Some(command))
    }

    /// Wire name of the command type.
    pub fn command_type(&self) -> &'static str {
        match self {
            BridgeCommand::Note { .. } => "note",
            BridgeCommand::Comment { .. } => "comment",
            BridgeCommand::TrackAdd { .. } => "trackadd",
            BridgeCommand::TrackRemove { .. } => "trackrem",
            BridgeCommand::FriendAdd { .. } => "friendadd",
            BridgeCommand::FriendRequest { .. } => "friendrequest",
            BridgeCommand::FriendRemove { .. } => "friendremove",
        }
    }

    /// The list mutation this command performs, if any.
    pub fn list_change(&self) -> Option<(&str, ListChange)> {
        let (name, list, is_add, notify) = match self {
            BridgeCommand::TrackAdd { name } => (name, ListKind::Bookmark, true, true),
            BridgeCommand::TrackRemove { name } => (name, ListKind::Bookmark, false, true),
            BridgeCommand::FriendAdd { name } => (name, ListKind::Friend, true, true),
            BridgeCommand::FriendRequest { name } => {
                (name, ListKind::FriendRequestReceived, true, true)
            }
            // Losing a friend is never announced.
            BridgeCommand::FriendRemove { name } => (name, ListKind::Friend, false, false),
            BridgeCommand::Note { .. } | BridgeCommand::Comment { .. } => return None,
        };
        Some((
            name.as_str(),
            ListChange {
                list,
                is_add,
                notify,
            },
        ))
    }
}

fn parse_note(payload: &CommandPayload) -> Result<BridgeCommand> {
    let sender = payload.require_name(FIELD_SENDER)?;
    let subject = payload.require_string(FIELD_SUBJECT)?;
    // The id only feeds the notice; a bad one must not cost the user the note.
    let note_id = payload.optional_i64(FIELD_ID).unwrap_or_else(|e| {
        tracing::warn!(sender = %sender, error = %e, "ignoring malformed note id");
        None
    });
    Ok(BridgeCommand::Note {
        sender,
        subject,
        note_id,
    })
}

fn parse_comment(payload: &CommandPayload) -> Result<BridgeCommand> {
    Ok(BridgeCommand::Comment {
        name: payload.require_name(FIELD_NAME)?,
        comment_id: payload.require_i64(FIELD_ID)?,
        parent_id: payload.require_i64(FIELD_PARENT_ID)?,
        target_id: payload.require_i64(FIELD_TARGET_ID)?,
        title: payload.require_decoded(FIELD_TARGET)?,
        comment_type: payload.require_string(FIELD_TARGET_TYPE)?.parse()?,
    })
}

/// Applies bridge commands to shared state.
///
/// Must only be driven from one thread: it is the single writer of the
/// interest store and the only publisher of bridge updates.
pub struct CommandDispatcher {
    store: SharedInterestStore,
    publisher: UpdatePublisher,
    services: BridgeServices,
    stats: SharedBridgeStats,
    site_domain: String,
}

impl CommandDispatcher {
    pub fn new(
        store: SharedInterestStore,
        publisher: UpdatePublisher,
        services: BridgeServices,
        site_domain: impl Into<String>,
    ) -> Self {
        Self {
            store,
            publisher,
            services,
            stats: SharedBridgeStats::new(),
            site_domain: site_domain.into(),
        }
    }

    pub fn with_stats(mut self, stats: SharedBridgeStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn stats(&self) -> SharedBridgeStats {
        self.stats.clone()
    }

    /// Parse and apply one payload. Failures are logged and the payload is
    /// dropped; nothing propagates to the caller.
    pub fn dispatch(&self, payload: &CommandPayload) {
        let raw_type = payload.get_str(FIELD_TYPE);

        match BridgeCommand::parse(payload) {
            Ok(Some(command)) => {
                self.apply(command);
                self.stats.record(raw_type.as_deref(), CommandOutcome::Applied);
            }
            Ok(None) => {
                tracing::debug!(
                    command_type = raw_type.as_deref().unwrap_or("<none>"),
                    "ignoring bridge command"
                );
                self.stats.record(raw_type.as_deref(), CommandOutcome::Ignored);
            }
            Err(e) => {
                tracing::warn!(
                    command_type = raw_type.as_deref().unwrap_or("<none>"),
                    error = %e,
                    "dropping bridge command"
                );
                self.stats.record(raw_type.as_deref(), CommandOutcome::Dropped);
            }
        }
    }

    pub fn apply(&self, command: BridgeCommand) {
        if let Some((name, change)) = command.list_change() {
            self.apply_list_change(name, change);
            match &command {
                BridgeCommand::FriendAdd { .. } => {
                    self.services.friend_requests.refresh_pending_requests();
                    self.services.friend_requests.refresh_outgoing_requests();
                }
                BridgeCommand::FriendRequest { .. } => {
                    self.services.friend_requests.refresh_pending_requests();
                }
                _ => {}
            }
            return;
        }

        match command {
            BridgeCommand::Note {
                sender,
                subject,
                note_id,
            } => {
                let character = self.store.find(&sender);
                let notice = NoteNotice::new(&sender, subject, note_id);
                self.services.notes.refresh_notes(&sender);
                self.publish(NotificationModel::new(character, Notice::Note(notice)));
            }
            BridgeCommand::Comment {
                name,
                comment_id,
                parent_id,
                target_id,
                title,
                comment_type,
            } => {
                let character = self.store.find(&name);
                let notice = CommentNotice {
                    comment_id,
                    parent_id,
                    target_id,
                    comment_type,
                    title,
                    site_domain: self.site_domain.clone(),
                };
                self.publish(NotificationModel::new(character, Notice::Comment(notice)));
            }
            // list commands returned above
            _ => {}
        }
    }

    /// Mutate the list and announce the change if the store reports one.
    fn apply_list_change(&self, name: &str, change: ListChange) {
        let (changed, character) = {
            let mut store = self.store.write();
            let changed = if change.is_add {
                store.add(name, change.list)
            } else {
                store.remove(name, change.list)
            };

            // A rediscovered character may still be counted online from a
            // stale session.
            if change.is_add && store.find(name).status == StatusType::Offline {
                store.sign_off(name);
            }
            (changed, store.refresh_interest(name))
        };

        tracing::debug!(
            character = name,
            list = ?change.list,
            is_add = change.is_add,
            changed,
            "applied list change"
        );

        if change.notify && changed {
            let notice = ListChangedNotice {
                list: change.list,
                is_added: change.is_add,
            };
            self.publish(NotificationModel::new(character, Notice::ListChanged(notice)));
        }
    }

    /// Act on an update through the shell the dispatcher was built with.
    pub fn navigate(&self, update: &NotificationModel) {
        update.navigate(&*self.services.shell);
    }

    fn publish(&self, update: NotificationModel) {
        self.stats.record_published();
        self.publisher.publish(&update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::models::{NoticeBehavior, NotificationStyle};
    use crate::services::testing::{recording_services, RecordingShell, RecordingSync};
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct Harness {
        dispatcher: CommandDispatcher,
        store: SharedInterestStore,
        published: Arc<Mutex<Vec<NotificationModel>>>,
        sync: Arc<RecordingSync>,
        shell: Arc<RecordingShell>,
    }

    impl Harness {
        fn new() -> Self {
            let store = SharedInterestStore::new();
            let publisher = UpdatePublisher::new();
            let published = Arc::new(Mutex::new(Vec::new()));
            let sink = published.clone();
            publisher.subscribe(move |update: &NotificationModel| sink.lock().push(update.clone()));

            let (services, sync, shell) = recording_services();
            let dispatcher = CommandDispatcher::new(
                store.clone(),
                publisher,
                services,
                "https://www.f-list.net",
            );
            Self {
                dispatcher,
                store,
                published,
                sync,
                shell,
            }
        }

        fn send(&self, value: Value) {
            let payload = match value {
                Value::Object(map) => CommandPayload::new(map),
                _ => panic!("payload must be an object"),
            };
            self.dispatcher.dispatch(&payload);
        }

        fn published(&self) -> Vec<NotificationModel> {
            self.published.lock().clone()
        }
    }

    fn payload(value: Value) -> CommandPayload {
        match value {
            Value::Object(map) => CommandPayload::new(map),
            _ => panic!("payload must be an object"),
        }
    }

    #[test]
    fn test_parse_comment_round_trip() {
        let command = BridgeCommand::parse(&payload(json!({
            "type": "comment",
            "name": "Alice",
            "id": "42",
            "parent_id": 0,
            "target_id": "7",
            "target": "My&amp;Title",
            "target_type": "newspost"
        })))
        .unwrap()
        .unwrap();

        assert_eq!(
            command,
            BridgeCommand::Comment {
                name: "Alice".to_string(),
                comment_id: 42,
                parent_id: 0,
                target_id: 7,
                title: "My&Title".to_string(),
                comment_type: CommentType::Newspost,
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_fields() {
        let unknown_kind = BridgeCommand::parse(&payload(json!({
            "type": "comment", "name": "A", "id": 1, "parent_id": 0,
            "target_id": 2, "target": "t", "target_type": "poll"
        })));
        assert_eq!(
            unknown_kind,
            Err(BridgeError::UnknownCommentType("poll".to_string()))
        );

        let bad_id = BridgeCommand::parse(&payload(json!({
            "type": "comment", "name": "A", "id": "x", "parent_id": 0,
            "target_id": 2, "target": "t", "target_type": "feature"
        })));
        assert!(matches!(bad_id, Err(BridgeError::MalformedField { .. })));

        let no_name = BridgeCommand::parse(&payload(json!({"type": "trackadd"})));
        assert_eq!(no_name, Err(BridgeError::missing("name")));
    }

    #[test]
    fn test_parse_absent_or_unknown_type_is_none() {
        assert_eq!(BridgeCommand::parse(&payload(json!({"name": "A"}))), Ok(None));
        assert_eq!(
            BridgeCommand::parse(&payload(json!({"type": "newthing", "name": "A"}))),
            Ok(None)
        );
    }

    #[test]
    fn test_comment_publishes_quiet_notice_with_link() {
        let h = Harness::new();
        h.send(json!({
            "type": "comment", "name": "Alice", "id": "42", "parent_id": 0,
            "target_id": "7", "target": "My&amp;Title", "target_type": "newspost"
        }));

        let published = h.published();
        assert_eq!(published.len(), 1);
        let update = &published[0];
        assert_eq!(update.character.name, "Alice");
        assert_eq!(update.style(), NotificationStyle::Quiet);
        let link = update.link().unwrap();
        assert!(link.contains("newspost/7/"));
        assert!(link.contains("Comment42"));
        match &update.notice {
            Notice::Comment(notice) => {
                assert_eq!(notice.title, "My&Title");
                assert_eq!(notice.comment_id, 42);
                assert_eq!(notice.target_id, 7);
            }
            other => panic!("expected comment notice, got {:?}", other),
        }
    }

    #[test]
    fn test_comment_reply_wording() {
        let h = Harness::new();
        h.send(json!({
            "type": "comment", "name": "Bob", "id": 1, "parent_id": 0,
            "target_id": 3, "target": "Crash", "target_type": "bugreport"
        }));
        h.send(json!({
            "type": "comment", "name": "Bob", "id": 2, "parent_id": "1",
            "target_id": 3, "target": "Crash", "target_type": "bugreport"
        }));

        let published = h.published();
        let top = published[0].notice.render();
        let nested = published[1].notice.render();
        assert!(top.starts_with("has replied to your bug report, "));
        assert!(nested.starts_with("has replied to your comment on the bug report "));
    }

    #[test]
    fn test_note_refreshes_notes_and_publishes_loud() {
        let h = Harness::new();
        h.send(json!({"type": "note", "sender": "Carol", "subject": "Hey"}));

        assert_eq!(h.sync.notes(), vec!["Carol".to_string()]);
        let published = h.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].style(), NotificationStyle::Loud);
        match &published[0].notice {
            Notice::Note(note) => {
                assert_eq!(note.target, "Carol/notes");
                assert_eq!(note.subject, "Hey");
            }
            other => panic!("expected note notice, got {:?}", other),
        }
    }

    #[test]
    fn test_trackadd_publishes_only_on_change() {
        let h = Harness::new();
        h.send(json!({"type": "trackadd", "name": "Dana"}));
        h.send(json!({"type": "trackadd", "name": "Dana"}));

        assert!(h.store.read().is_on_list("Dana", ListKind::Bookmark));
        let published = h.published();
        assert_eq!(published.len(), 1);
        assert_eq!(
            published[0].notice,
            Notice::ListChanged(ListChangedNotice {
                list: ListKind::Bookmark,
                is_added: true
            })
        );
        assert!(published[0].character.is_interesting);
    }

    #[test]
    fn test_trackrem_publishes_only_on_change() {
        let h = Harness::new();
        h.send(json!({"type": "trackrem", "name": "Eve"}));
        assert!(h.published().is_empty());

        h.send(json!({"type": "trackadd", "name": "Eve"}));
        h.send(json!({"type": "trackrem", "name": "Eve"}));
        let published = h.published();
        assert_eq!(published.len(), 2);
        assert_eq!(
            published[1].notice,
            Notice::ListChanged(ListChangedNotice {
                list: ListKind::Bookmark,
                is_added: false
            })
        );
        assert!(!published[1].character.is_interesting);
    }

    #[test]
    fn test_friendadd_refreshes_both_request_lists() {
        let h = Harness::new();
        h.send(json!({"type": "friendadd", "name": "Finn"}));
        h.send(json!({"type": "friendadd", "name": "Finn"}));

        assert_eq!(h.published().len(), 1);
        assert_eq!(h.sync.pending_refreshes(), 2);
        assert_eq!(h.sync.outgoing_refreshes(), 2);
        assert!(h.store.is_of_interest("Finn"));
    }

    #[test]
    fn test_friendrequest_refreshes_pending_only() {
        let h = Harness::new();
        h.send(json!({"type": "friendrequest", "name": "Gus"}));

        assert!(h
            .store
            .read()
            .is_on_list("Gus", ListKind::FriendRequestReceived));
        assert_eq!(h.published().len(), 1);
        assert_eq!(
            h.published()[0].notice.render(),
            "has sent you a friend request."
        );
        assert_eq!(h.sync.pending_refreshes(), 1);
        assert_eq!(h.sync.outgoing_refreshes(), 0);
    }

    #[test]
    fn test_friendremove_never_publishes() {
        let h = Harness::new();
        h.send(json!({"type": "friendadd", "name": "Hal"}));
        assert_eq!(h.published().len(), 1);

        h.send(json!({"type": "friendremove", "name": "Hal"}));
        assert!(!h.store.read().is_on_list("Hal", ListKind::Friend));
        assert_eq!(h.published().len(), 1);
        assert!(!h.store.find("Hal").is_interesting);
    }

    #[test]
    fn test_add_reconciles_stale_online_state() {
        let h = Harness::new();
        {
            let mut store = h.store.write();
            store.sign_on("Ivy", StatusType::Online);
            // status dropped to offline without a proper sign-off
            store.set_status("Ivy", StatusType::Offline);
            assert!(store.is_online("Ivy"));
        }

        h.send(json!({"type": "trackadd", "name": "Ivy"}));

        let store = h.store.read();
        assert!(!store.is_online("Ivy"));
        assert_eq!(store.find("Ivy").status, StatusType::Offline);
        assert!(store.find("Ivy").is_interesting);
    }

    #[test]
    fn test_add_keeps_online_character_online() {
        let h = Harness::new();
        h.store.write().sign_on("Jo", StatusType::Away);
        h.send(json!({"type": "friendadd", "name": "Jo"}));

        let store = h.store.read();
        assert!(store.is_online("Jo"));
        assert_eq!(store.find("Jo").status, StatusType::Away);
    }

    #[test]
    fn test_unknown_or_missing_type_changes_nothing() {
        let h = Harness::new();
        h.send(json!({"name": "Kai"}));
        h.send(json!({"type": "friendblock", "name": "Kai"}));
        h.send(json!({"type": 12, "name": "Kai"}));

        assert!(h.published().is_empty());
        assert!(!h.store.read().is_known("Kai"));
        assert_eq!(h.sync.pending_refreshes(), 0);

        let stats = h.dispatcher.stats().snapshot();
        assert_eq!(stats.total_for(CommandOutcome::Ignored), 3);
        assert_eq!(stats.published, 0);
    }

    #[test]
    fn test_malformed_command_is_dropped_and_pipeline_continues() {
        let h = Harness::new();
        h.send(json!({"type": "comment", "name": "Lee", "id": "nope"}));
        h.send(json!({"type": "note", "sender": "Lee"}));
        h.send(json!({"type": "trackadd", "name": "Lee"}));

        assert_eq!(h.published().len(), 1);
        assert!(h.sync.notes().is_empty());
        let stats = h.dispatcher.stats().snapshot();
        assert_eq!(stats.count("comment", CommandOutcome::Dropped), 1);
        assert_eq!(stats.count("note", CommandOutcome::Dropped), 1);
        assert_eq!(stats.count("trackadd", CommandOutcome::Applied), 1);
        assert_eq!(stats.published, 1);
    }

    #[test]
    fn test_duplicate_friendrequest_publishes_once_but_refreshes_each_time() {
        let h = Harness::new();
        h.send(json!({"type": "friendrequest", "name": "Gus"}));
        h.send(json!({"type": "friendrequest", "name": "Gus"}));

        assert_eq!(h.published().len(), 1);
        assert_eq!(h.sync.pending_refreshes(), 2);
        assert_eq!(h.sync.outgoing_refreshes(), 0);
    }

    #[test]
    fn test_blank_names_are_dropped() {
        let h = Harness::new();
        h.send(json!({"type": "trackadd", "name": "   "}));
        h.send(json!({"type": "friendrequest", "name": ""}));
        h.send(json!({"type": "note", "sender": " ", "subject": "Hey"}));
        h.send(json!({
            "type": "comment", "name": "\t", "id": 1, "parent_id": 0,
            "target_id": 2, "target": "t", "target_type": "feature"
        }));

        assert!(h.published().is_empty());
        assert!(h.store.read().members(ListKind::Bookmark).is_empty());
        assert!(!h.store.read().is_known(""));
        assert!(h.sync.notes().is_empty());
        assert_eq!(h.sync.pending_refreshes(), 0);
        let stats = h.dispatcher.stats().snapshot();
        assert_eq!(stats.total_for(CommandOutcome::Dropped), 4);
    }

    #[test]
    fn test_list_command_names_are_trimmed() {
        let h = Harness::new();
        h.send(json!({"type": "trackadd", "name": "  Nia "}));

        assert!(h.store.read().is_on_list("Nia", ListKind::Bookmark));
        assert_eq!(h.published()[0].character.name, "Nia");
    }

    #[test]
    fn test_note_id_is_kept_when_numeric_and_skipped_when_malformed() {
        let h = Harness::new();
        h.send(json!({"type": "note", "sender": "Mo", "subject": "a", "id": "17"}));
        h.send(json!({"type": "note", "sender": "Mo", "subject": "b", "id": "abc"}));

        let published = h.published();
        assert_eq!(published.len(), 2);
        let ids: Vec<Option<i64>> = published
            .iter()
            .map(|update| match &update.notice {
                Notice::Note(note) => note.note_id,
                other => panic!("expected note notice, got {:?}", other),
            })
            .collect();
        assert_eq!(ids, vec![Some(17), None]);
        assert_eq!(
            h.dispatcher.stats().snapshot().count("note", CommandOutcome::Applied),
            2
        );
    }

    #[test]
    fn test_navigate_uses_dispatcher_shell() {
        let h = Harness::new();
        h.send(json!({
            "type": "comment", "name": "Ona", "id": 9, "parent_id": 0,
            "target_id": 4, "target": "Patch", "target_type": "changelog"
        }));
        h.send(json!({"type": "note", "sender": "Ona", "subject": "Hi"}));

        let published = h.published();
        for update in &published {
            h.dispatcher.navigate(update);
        }

        assert_eq!(h.shell.links(), vec![published[0].link().unwrap()]);
        assert_eq!(
            h.shell.commands(),
            vec![("priv".to_string(), vec!["Ona/notes".to_string()])]
        );
        assert_eq!(h.shell.windows_shown(), 1);
    }
}
