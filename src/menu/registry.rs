use crate::error::TrayError;
use crate::tray::IconId;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Label that renders as a separator line.
pub const SEPARATOR: &str = "-";

/// Identifies a menu entry for the lifetime of its icon. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MenuTag(u64);

impl MenuTag {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MenuTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEvent {
    pub icon: IconId,
    pub tag: MenuTag,
    pub label: String,
}

pub type MenuListener = Arc<dyn Fn(&MenuEvent) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub label: String,
    pub tag: MenuTag,
    pub enabled: bool,
}

impl MenuEntry {
    pub fn is_separator(&self) -> bool {
        self.label == SEPARATOR
    }
}

/// Ordered menu entries with monotonically allocated tags.
#[derive(Default)]
pub struct MenuRegistry {
    entries: Vec<MenuEntry>,
    listeners: HashMap<MenuTag, MenuListener>,
    next_tag: u64,
}

impl MenuRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry at `index` and returns its tag.
    ///
    /// Entries without a listener are disabled. Nothing changes on error.
    pub fn insert(
        &mut self,
        label: &str,
        index: usize,
        listener: Option<MenuListener>,
    ) -> Result<MenuTag, TrayError> {
        if label.is_empty() {
            return Err(TrayError::InvalidArgument("menu label must not be empty".into()));
        }
        if index > self.entries.len() {
            return Err(TrayError::InvalidArgument(format!(
                "menu insert index {} out of range 0..={}",
                index,
                self.entries.len()
            )));
        }

        let tag = self.allocate_tag()?;
        let enabled = listener.is_some();
        if let Some(listener) = listener {
            self.listeners.insert(tag, listener);
        }
        self.entries.insert(
            index,
            MenuEntry {
                label: label.to_string(),
                tag,
                enabled,
            },
        );
        Ok(tag)
    }

    pub fn insert_separator(&mut self, index: usize) -> Result<MenuTag, TrayError> {
        self.insert(SEPARATOR, index, None)
    }

    pub fn remove(&mut self, index: usize) -> Result<MenuEntry, TrayError> {
        if index >= self.entries.len() {
            return Err(TrayError::InvalidArgument(format!(
                "menu remove index {} out of range 0..{}",
                index,
                self.entries.len()
            )));
        }
        let entry = self.entries.remove(index);
        self.listeners.remove(&entry.tag);
        Ok(entry)
    }

    fn allocate_tag(&mut self) -> Result<MenuTag, TrayError> {
        let tag = MenuTag(self.next_tag);
        self.next_tag = self.next_tag.checked_add(1).ok_or(TrayError::TagsExhausted)?;
        Ok(tag)
    }

    /// Resolves a selected tag to its listener and the event to hand it.
    /// Unknown tags resolve to nothing.
    pub fn resolve(&self, icon: IconId, tag: MenuTag) -> Option<(MenuListener, MenuEvent)> {
        let listener = self.listeners.get(&tag)?.clone();
        let label = self
            .entries
            .iter()
            .find(|e| e.tag == tag)
            .map(|e| e.label.clone())
            .unwrap_or_default();
        Some((listener, MenuEvent { icon, tag, label }))
    }

    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    pub fn tags(&self) -> Vec<MenuTag> {
        self.entries.iter().map(|e| e.tag).collect()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.label.as_str()).collect()
    }

    pub fn has_listener(&self, tag: MenuTag) -> bool {
        self.listeners.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for MenuRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuRegistry")
            .field("entries", &self.entries)
            .field("listeners", &self.listeners.len())
            .field("next_tag", &self.next_tag)
            .finish()
    }
}
