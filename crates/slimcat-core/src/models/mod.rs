pub mod character;
pub mod notice;

pub use character::{character_key, Character, StatusType};
pub use notice::{
    CommentNotice, CommentType, ListChangedNotice, NoteNotice, Notice, NoticeBehavior,
    NotificationModel, NotificationStyle,
};
