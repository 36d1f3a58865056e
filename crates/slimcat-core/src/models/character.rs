use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Presence status as reported by the chat server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusType {
    Online,
    Looking,
    Busy,
    Away,
    Idle,
    Dnd,
    Crown,
    #[default]
    Offline,
}

impl StatusType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusType::Online => "online",
            StatusType::Looking => "looking",
            StatusType::Busy => "busy",
            StatusType::Away => "away",
            StatusType::Idle => "idle",
            StatusType::Dnd => "dnd",
            StatusType::Crown => "crown",
            StatusType::Offline => "offline",
        }
    }

    pub fn is_online(&self) -> bool {
        *self != StatusType::Offline
    }
}

impl fmt::Display for StatusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "online" => Ok(StatusType::Online),
            "looking" => Ok(StatusType::Looking),
            "busy" => Ok(StatusType::Busy),
            "away" => Ok(StatusType::Away),
            "idle" => Ok(StatusType::Idle),
            "dnd" => Ok(StatusType::Dnd),
            "crown" => Ok(StatusType::Crown),
            "offline" => Ok(StatusType::Offline),
            other => Err(format!("unknown status: {}", other)),
        }
    }
}

/// A chat character as tracked by the interest list store.
///
/// Notices carry a snapshot of this at the time they were built; the live
/// record stays in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub status: StatusType,
    pub is_interesting: bool,
}

impl Character {
    /// Unknown character, assumed offline.
    pub fn placeholder(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: StatusType::Offline,
            is_interesting: false,
        }
    }

    pub fn key(&self) -> String {
        character_key(&self.name)
    }
}

/// Identity key: character names compare case-insensitively.
pub fn character_key(name: &str) -> String {
    name.trim().to_lowercase()
}
