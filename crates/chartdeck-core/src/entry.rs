#![forbid(unsafe_code)]

//! Chart entries and the ordered list they live in.
//!
//! The server owns the authoritative [`EntryList`]; the client keeps a mirror
//! of it as rendered rows. Both sides agree on the value types here and on
//! the adjacency rules that reorder gestures rely on:
//!
//! - titles are unique and double as row ids,
//! - position is the list index and is never stored,
//! - moving up swaps with the immediate predecessor, moving down with the
//!   immediate successor; at either boundary the move is a no-op.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Rendering mode applied to an entry's data.
///
/// The set of valid values is served by the backend (see
/// [`ChartTypeCatalog`]); the client treats the name as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChartType(String);

impl ChartType {
    /// Create a chart type from its backend name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Backend name of this chart type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChartType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// The enumerated set of chart types offered by the backend.
///
/// An empty catalogue means "unknown": every type is accepted and the server
/// remains the only judge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChartTypeCatalog {
    types: Vec<ChartType>,
}

impl ChartTypeCatalog {
    /// Build a catalogue, dropping duplicates while keeping first-seen order.
    pub fn new<I, T>(types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ChartType>,
    {
        let mut out: Vec<ChartType> = Vec::new();
        for ty in types {
            let ty = ty.into();
            if !out.contains(&ty) {
                out.push(ty);
            }
        }
        Self { types: out }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChartType> {
        self.types.iter()
    }

    /// Whether `name` is one of the listed types.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.types.iter().any(|ty| ty.as_str() == name)
    }

    /// Whether a type-change request naming `name` may be sent.
    #[must_use]
    pub fn accepts(&self, name: &str) -> bool {
        self.is_empty() || self.contains(name)
    }
}

/// One uploaded chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Unique title; also the row id and the server-side key.
    pub title: String,
    /// Currently selected rendering mode.
    pub chart_type: ChartType,
}

impl Entry {
    #[must_use]
    pub fn new(title: impl Into<String>, chart_type: impl Into<ChartType>) -> Self {
        Self {
            title: title.into(),
            chart_type: chart_type.into(),
        }
    }
}

/// Direction of a reorder gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveDirection {
    /// Towards the start of the list (swap with predecessor).
    Up,
    /// Towards the end of the list (swap with successor).
    Down,
}

impl MoveDirection {
    #[must_use]
    pub const fn is_up(self) -> bool {
        matches!(self, Self::Up)
    }

    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

/// Errors raised by [`EntryList`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    /// A second entry with an existing title was added.
    DuplicateTitle(String),
    /// The named entry is not in the list.
    UnknownTitle(String),
}

impl fmt::Display for EntryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateTitle(title) => write!(f, "duplicate chart title: {title}"),
            Self::UnknownTitle(title) => write!(f, "unknown chart title: {title}"),
        }
    }
}

impl std::error::Error for EntryError {}

/// Ordered sequence of entries with unique titles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryList {
    entries: Vec<Entry>,
}

impl EntryList {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build a list, rejecting duplicate titles.
    pub fn from_entries<I>(entries: I) -> Result<Self, EntryError>
    where
        I: IntoIterator<Item = Entry>,
    {
        let mut list = Self::new();
        for entry in entries {
            list.push(entry)?;
        }
        Ok(list)
    }

    /// Append an entry at the end of the list.
    pub fn push(&mut self, entry: Entry) -> Result<(), EntryError> {
        if self.position(&entry.title).is_some() {
            return Err(EntryError::DuplicateTitle(entry.title));
        }
        self.entries.push(entry);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Entry] {
        &self.entries
    }

    /// Titles in list order.
    #[must_use]
    pub fn titles(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.title.clone()).collect()
    }

    #[must_use]
    pub fn get(&self, title: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.title == title)
    }

    /// Index of the named entry.
    #[must_use]
    pub fn position(&self, title: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.title == title)
    }

    /// The entry a move in `direction` would swap with, if any.
    #[must_use]
    pub fn neighbor(&self, title: &str, direction: MoveDirection) -> Option<&Entry> {
        let idx = self.position(title)?;
        match direction {
            MoveDirection::Up => idx.checked_sub(1).and_then(|i| self.entries.get(i)),
            MoveDirection::Down => self.entries.get(idx + 1),
        }
    }

    /// Swap the named entry with its neighbour in `direction`.
    ///
    /// Returns `Ok(false)` when the entry is already at that boundary.
    pub fn move_entry(&mut self, title: &str, direction: MoveDirection) -> Result<bool, EntryError> {
        let idx = self
            .position(title)
            .ok_or_else(|| EntryError::UnknownTitle(title.to_string()))?;
        let other = match direction {
            MoveDirection::Up => match idx.checked_sub(1) {
                Some(i) => i,
                None => return Ok(false),
            },
            MoveDirection::Down if idx + 1 < self.entries.len() => idx + 1,
            MoveDirection::Down => return Ok(false),
        };
        self.entries.swap(idx, other);
        Ok(true)
    }

    /// Remove the named entry, returning it.
    pub fn remove(&mut self, title: &str) -> Option<Entry> {
        let idx = self.position(title)?;
        Some(self.entries.remove(idx))
    }

    /// Change the chart type of the named entry.
    pub fn set_chart_type(&mut self, title: &str, chart_type: ChartType) -> Result<(), EntryError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.title == title)
            .ok_or_else(|| EntryError::UnknownTitle(title.to_string()))?;
        entry.chart_type = chart_type;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a EntryList {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
