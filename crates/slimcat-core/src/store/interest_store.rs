use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};

use crate::models::{character_key, Character, StatusType};

/// Named character lists the local user keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListKind {
    Friend,
    Bookmark,
    Interested,
    NotInterested,
    Ignored,
    FriendRequestSent,
    FriendRequestReceived,
}

impl ListKind {
    pub const ALL: [ListKind; 7] = [
        ListKind::Friend,
        ListKind::Bookmark,
        ListKind::Interested,
        ListKind::NotInterested,
        ListKind::Ignored,
        ListKind::FriendRequestSent,
        ListKind::FriendRequestReceived,
    ];

    /// Membership in one of these lists makes a character interesting.
    pub fn is_interesting(&self) -> bool {
        matches!(
            self,
            ListKind::Friend
                | ListKind::Bookmark
                | ListKind::Interested
                | ListKind::FriendRequestSent
                | ListKind::FriendRequestReceived
        )
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ListKind::Friend => "friends list",
            ListKind::Bookmark => "bookmarks",
            ListKind::Interested => "interested list",
            ListKind::NotInterested => "not interested list",
            ListKind::Ignored => "ignore list",
            ListKind::FriendRequestSent => "sent friend requests",
            ListKind::FriendRequestReceived => "friend requests",
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Character records plus the named lists that reference them.
///
/// All keys are case-insensitive character keys; the display name kept on the
/// record is the first spelling seen.
#[derive(Debug, Default)]
pub struct InterestListStore {
    characters: HashMap<String, Character>,
    lists: HashMap<ListKind, HashSet<String>>,
    online: HashSet<String>,
}

impl InterestListStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.characters.clear();
        self.lists.clear();
        self.online.clear();
    }

    // ===== Query Methods =====

    /// Existing record, or an offline placeholder for an unknown name.
    pub fn find(&self, name: &str) -> Character {
        self.characters
            .get(&character_key(name))
            .cloned()
            .unwrap_or_else(|| Character::placeholder(name.trim()))
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.characters.contains_key(&character_key(name))
    }

    pub fn is_on_list(&self, name: &str, list: ListKind) -> bool {
        self.lists
            .get(&list)
            .is_some_and(|members| members.contains(&character_key(name)))
    }

    pub fn is_online(&self, name: &str) -> bool {
        self.online.contains(&character_key(name))
    }

    pub fn is_of_interest(&self, name: &str) -> bool {
        let key = character_key(name);
        let on_list = |list: &ListKind| {
            self.lists
                .get(list)
                .is_some_and(|members| members.contains(&key))
        };

        if on_list(&ListKind::NotInterested) {
            return false;
        }
        ListKind::ALL
            .iter()
            .filter(|list| list.is_interesting())
            .any(on_list)
    }

    pub fn is_of_interest_online(&self, name: &str) -> bool {
        self.is_online(name) && self.is_of_interest(name)
    }

    /// Display names on a list, sorted case-insensitively.
    pub fn members(&self, list: ListKind) -> Vec<String> {
        self.collect_members(list, |_| true)
    }

    pub fn online_members(&self, list: ListKind) -> Vec<String> {
        self.collect_members(list, |key| self.online.contains(key))
    }

    fn collect_members(&self, list: ListKind, keep: impl Fn(&str) -> bool) -> Vec<String> {
        let Some(keys) = self.lists.get(&list) else {
            return Vec::new();
        };
        let mut names: Vec<String> = keys
            .iter()
            .filter(|key| keep(key.as_str()))
            .filter_map(|key| self.characters.get(key.as_str()).map(|c| c.name.clone()))
            .collect();
        names.sort_by_key(|name| name.to_lowercase());
        names
    }

    // ===== Mutation Methods =====

    /// Insert `name` into `list`. Returns false if it was already there.
    pub fn add(&mut self, name: &str, list: ListKind) -> bool {
        let key = self.ensure_record(name);
        self.lists.entry(list).or_default().insert(key)
    }

    /// Remove `name` from `list`. Returns false if it was not there.
    pub fn remove(&mut self, name: &str, list: ListKind) -> bool {
        let key = character_key(name);
        self.lists
            .get_mut(&list)
            .is_some_and(|members| members.remove(&key))
    }

    /// Replace the whole list. Returns the resulting member count.
    pub fn set_list<I, S>(&mut self, list: ListKind, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys: HashSet<String> = names
            .into_iter()
            .map(|name| self.ensure_record(name.as_ref()))
            .collect();
        let count = keys.len();
        self.lists.insert(list, keys);
        count
    }

    /// Mark a character online with the given status.
    pub fn sign_on(&mut self, name: &str, status: StatusType) {
        if status == StatusType::Offline {
            self.sign_off(name);
            return;
        }
        let key = self.ensure_record(name);
        if let Some(character) = self.characters.get_mut(&key) {
            character.status = status;
        }
        self.online.insert(key);
    }

    /// Mark a character offline. Returns true if it was counted as online.
    pub fn sign_off(&mut self, name: &str) -> bool {
        let key = character_key(name);
        if let Some(character) = self.characters.get_mut(&key) {
            character.status = StatusType::Offline;
        }
        self.online.remove(&key)
    }

    /// Update the status of a known character without touching the online set.
    pub fn set_status(&mut self, name: &str, status: StatusType) -> bool {
        match self.characters.get_mut(&character_key(name)) {
            Some(character) => {
                character.status = status;
                true
            }
            None => false,
        }
    }

    /// Recompute the cached interest flag and return the updated record.
    pub fn refresh_interest(&mut self, name: &str) -> Character {
        let interesting = self.is_of_interest(name);
        match self.characters.get_mut(&character_key(name)) {
            Some(character) => {
                character.is_interesting = interesting;
                character.clone()
            }
            None => Character {
                is_interesting: interesting,
                ..Character::placeholder(name.trim())
            },
        }
    }

    fn ensure_record(&mut self, name: &str) -> String {
        let key = character_key(name);
        self.characters
            .entry(key.clone())
            .or_insert_with(|| Character::placeholder(name.trim()));
        key
    }
}

/// Store handle shared between the worker (sole writer) and readers on
/// other threads.
#[derive(Debug, Clone, Default)]
pub struct SharedInterestStore {
    inner: Arc<RwLock<InterestListStore>>,
}

impl SharedInterestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, InterestListStore> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, InterestListStore> {
        self.inner.write()
    }

    pub fn find(&self, name: &str) -> Character {
        self.inner.read().find(name)
    }

    pub fn is_of_interest(&self, name: &str) -> bool {
        self.inner.read().is_of_interest(name)
    }

    pub fn members(&self, list: ListKind) -> Vec<String> {
        self.inner.read().members(list)
    }
}
