//! Sync Entry Table: the peer's authoritative list of tracked textures.

use std::collections::HashMap;

use spritesync_core::{SyncFlags, TextureEntry};
use tracing::debug;

/// Texture name to sync attributes, plus the session that declared them.
#[derive(Debug, Clone, Default)]
pub struct SyncEntryTable {
    session_token: String,
    entries: HashMap<String, SyncFlags>,
}

impl SyncEntryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a new table and session token. Never merged with the old one.
    pub fn replace<I>(&mut self, session_token: impl Into<String>, entries: I)
    where
        I: IntoIterator<Item = TextureEntry>,
    {
        self.session_token = session_token.into();
        self.entries = entries
            .into_iter()
            .map(|entry| (entry.name, entry.flags))
            .collect();
        debug!(
            token = %self.session_token,
            count = self.entries.len(),
            "sync entries replaced"
        );
    }

    /// Forget everything, including the session token.
    pub fn clear(&mut self) {
        self.session_token.clear();
        self.entries.clear();
    }

    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    pub fn get(&self, name: &str) -> Option<SyncFlags> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Track a name the peer just sent us.
    pub fn insert(&mut self, name: impl Into<String>, flags: SyncFlags) {
        self.entries.insert(name.into(), flags);
    }

    /// Toggle one attribute. Unknown names are left alone.
    ///
    /// Returns whether the name is tracked.
    pub fn set_flag(&mut self, name: &str, flag: SyncFlags, value: bool) -> bool {
        match self.entries.get_mut(name) {
            Some(flags) => {
                flags.set(flag, value);
                true
            }
            None => false,
        }
    }

    /// Move an entry to a new key. Returns whether `from` was tracked.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        match self.entries.remove(from) {
            Some(flags) => {
                self.entries.insert(to.to_string(), flags);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_discards_old_entries() {
        let mut table = SyncEntryTable::new();
        table.replace("T1", [TextureEntry::new("a", SyncFlags::ANIMATED)]);
        table.replace("T2", [TextureEntry::new("b", SyncFlags::empty())]);

        assert_eq!(table.session_token(), "T2");
        assert!(!table.contains("a"));
        assert_eq!(table.get("b"), Some(SyncFlags::empty()));
    }

    #[test]
    fn test_set_flag_unknown_is_noop() {
        let mut table = SyncEntryTable::new();
        assert!(!table.set_flag("ghost", SyncFlags::ANIMATED, true));
        assert!(table.is_empty());

        table.insert("a", SyncFlags::empty());
        assert!(table.set_flag("a", SyncFlags::SHOW_UV, true));
        assert_eq!(table.get("a"), Some(SyncFlags::SHOW_UV));
        assert!(table.set_flag("a", SyncFlags::SHOW_UV, false));
        assert_eq!(table.get("a"), Some(SyncFlags::empty()));
    }

    #[test]
    fn test_rename_moves_flags() {
        let mut table = SyncEntryTable::new();
        table.insert("a", SyncFlags::ANIMATED);
        assert!(table.rename("a", "b"));
        assert_eq!(table.get("b"), Some(SyncFlags::ANIMATED));
        assert!(!table.contains("a"));
        assert!(!table.rename("a", "c"));
    }

    #[test]
    fn test_clear_resets_token() {
        let mut table = SyncEntryTable::new();
        table.replace("T", [TextureEntry::new("a", SyncFlags::empty())]);
        table.clear();
        assert_eq!(table.session_token(), "");
        assert_eq!(table.len(), 0);
    }
}
