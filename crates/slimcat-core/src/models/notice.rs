use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::character::Character;
use crate::constants::{NOTES_SUFFIX, PRIVATE_CONVERSATION_COMMAND};
use crate::error::BridgeError;
use crate::services::ChatShell;
use crate::store::ListKind;

/// Priority hint for the toast layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStyle {
    Quiet,
    Loud,
}

impl fmt::Display for NotificationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationStyle::Quiet => f.write_str("quiet"),
            NotificationStyle::Loud => f.write_str("loud"),
        }
    }
}

/// What a notice can do once it reaches a consumer.
pub trait NoticeBehavior {
    /// Text shown after the character name, BBCode links included.
    fn render(&self) -> String;

    fn link(&self) -> Option<String> {
        None
    }

    fn style(&self) -> NotificationStyle;

    /// Act on the notice for `character` (the one who triggered it).
    fn navigate(&self, character: &Character, shell: &dyn ChatShell);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommentType {
    Comment,
    Newspost,
    BugReport,
    ChangeLog,
    Feature,
}

impl CommentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentType::Comment => "Comment",
            CommentType::Newspost => "Newspost",
            CommentType::BugReport => "BugReport",
            CommentType::ChangeLog => "ChangeLog",
            CommentType::Feature => "Feature",
        }
    }

    /// Wording used inside rendered notices.
    pub fn phrase(&self) -> &'static str {
        match self {
            CommentType::BugReport => "bug report",
            CommentType::Feature => "feature suggestion",
            other => other.as_str(),
        }
    }
}

impl FromStr for CommentType {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "comment" => Ok(CommentType::Comment),
            "newspost" => Ok(CommentType::Newspost),
            "bugreport" => Ok(CommentType::BugReport),
            "changelog" => Ok(CommentType::ChangeLog),
            "feature" => Ok(CommentType::Feature),
            _ => Err(BridgeError::UnknownCommentType(s.to_string())),
        }
    }
}

/// Someone replied to the user's item, or to the user's comment on an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentNotice {
    pub comment_id: i64,
    /// 0 when the reply is to the item itself.
    pub parent_id: i64,
    /// The item the comment thread hangs off.
    pub target_id: i64,
    pub comment_type: CommentType,
    pub title: String,
    pub site_domain: String,
}

impl CommentNotice {
    pub fn is_reply_to_item(&self) -> bool {
        self.parent_id == 0
    }

    fn domain(&self) -> &str {
        self.site_domain.trim_end_matches('/')
    }
}

impl NoticeBehavior for CommentNotice {
    fn render(&self) -> String {
        let link = self.link().unwrap_or_default();
        if self.is_reply_to_item() {
            format!(
                "has replied to your {}, [url={}]{}[/url]",
                self.comment_type.phrase(),
                link,
                self.title
            )
        } else {
            format!(
                "has replied to your comment on the {} [url={}]{}[/url]",
                self.comment_type.phrase(),
                link,
                self.title
            )
        }
    }

    fn link(&self) -> Option<String> {
        let domain = self.domain();
        let (target, comment) = (self.target_id, self.comment_id);
        match self.comment_type {
            CommentType::Newspost => Some(format!("{domain}/newspost/{target}/#Comment{comment}")),
            CommentType::BugReport => Some(format!(
                "{domain}/view_bugreport.php?id={target}#Comment{comment}"
            )),
            CommentType::ChangeLog => Some(format!("{domain}/log.php?id={target}#Comment{comment}")),
            CommentType::Feature => Some(format!("{domain}/vote.php?fid={target}#Comment{comment}")),
            CommentType::Comment => None,
        }
    }

    fn style(&self) -> NotificationStyle {
        NotificationStyle::Quiet
    }

    fn navigate(&self, _character: &Character, shell: &dyn ChatShell) {
        if let Some(link) = self.link() {
            shell.open_external_link(&link);
        }
    }
}

/// A note (site-side private message) arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteNotice {
    pub note_id: Option<i64>,
    pub subject: String,
    /// `<sender>/notes`
    pub target: String,
}

impl NoteNotice {
    pub fn new(sender: &str, subject: impl Into<String>, note_id: Option<i64>) -> Self {
        Self {
            note_id,
            subject: subject.into(),
            target: format!("{}{}", sender, NOTES_SUFFIX),
        }
    }
}

impl NoticeBehavior for NoteNotice {
    fn render(&self) -> String {
        format!("has sent you a note: [url={}]{}[/url]", self.target, self.subject)
    }

    fn style(&self) -> NotificationStyle {
        NotificationStyle::Loud
    }

    fn navigate(&self, character: &Character, shell: &dyn ChatShell) {
        shell.send_user_command(
            PRIVATE_CONVERSATION_COMMAND,
            &[format!("{}{}", character.name, NOTES_SUFFIX)],
        );
        shell.show_notification_window();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListChangedNotice {
    pub list: ListKind,
    pub is_added: bool,
}

impl NoticeBehavior for ListChangedNotice {
    fn render(&self) -> String {
        match (self.list, self.is_added) {
            (ListKind::FriendRequestReceived, true) => "has sent you a friend request.".to_string(),
            (list, true) => format!("has been added to your {}.", list),
            (list, false) => format!("has been removed from your {}.", list),
        }
    }

    fn style(&self) -> NotificationStyle {
        NotificationStyle::Quiet
    }

    fn navigate(&self, character: &Character, shell: &dyn ChatShell) {
        shell.send_user_command(PRIVATE_CONVERSATION_COMMAND, &[character.name.clone()]);
    }
}

/// Closed set of notices the bridge can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Comment(CommentNotice),
    Note(NoteNotice),
    ListChanged(ListChangedNotice),
}

impl Notice {
    fn behavior(&self) -> &dyn NoticeBehavior {
        match self {
            Notice::Comment(notice) => notice,
            Notice::Note(notice) => notice,
            Notice::ListChanged(notice) => notice,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Notice::Comment(_) => "comment",
            Notice::Note(_) => "note",
            Notice::ListChanged(_) => "list_changed",
        }
    }
}

impl NoticeBehavior for Notice {
    fn render(&self) -> String {
        self.behavior().render()
    }

    fn link(&self) -> Option<String> {
        self.behavior().link()
    }

    fn style(&self) -> NotificationStyle {
        self.behavior().style()
    }

    fn navigate(&self, character: &Character, shell: &dyn ChatShell) {
        self.behavior().navigate(character, shell)
    }
}

/// A notice attached to the character that triggered it. This is the unit
/// the publisher hands to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationModel {
    pub character: Character,
    pub notice: Notice,
    pub received_at: DateTime<Utc>,
}

impl NotificationModel {
    pub fn new(character: Character, notice: Notice) -> Self {
        Self {
            character,
            notice,
            received_at: Utc::now(),
        }
    }

    /// Full line as the UI shows it: character name followed by the notice.
    pub fn display_text(&self) -> String {
        format!("{} {}", self.character.name, self.notice.render())
    }

    pub fn style(&self) -> NotificationStyle {
        self.notice.style()
    }

    pub fn link(&self) -> Option<String> {
        self.notice.link()
    }

    pub fn navigate(&self, shell: &dyn ChatShell) {
        self.notice.navigate(&self.character, shell)
    }
}
