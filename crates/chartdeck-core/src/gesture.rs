#![forbid(unsafe_code)]

//! User gestures understood by the mutation controller.

use std::fmt;

use crate::entry::{ChartType, MoveDirection};

/// A file picked for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// File name as reported by the picker.
    pub name: String,
    /// Raw file contents. Never inspected client-side.
    pub bytes: Vec<u8>,
}

impl UploadFile {
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A user gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gesture {
    /// Upload one or more files; each becomes its own request.
    Upload(Vec<UploadFile>),
    /// Pick a different chart type for an entry.
    SetChartType { title: String, chart_type: ChartType },
    /// Move an entry one place up or down.
    Move { title: String, direction: MoveDirection },
    /// Delete an entry.
    Delete { title: String },
    /// Show an entry's plot in the viewer.
    Select { title: String },
}

impl Gesture {
    /// Stable name for tracing.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Upload(_) => "upload",
            Self::SetChartType { .. } => "set_chart_type",
            Self::Move { .. } => "move",
            Self::Delete { .. } => "delete",
            Self::Select { .. } => "select",
        }
    }

    /// The entry this gesture targets, if any.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Upload(_) => None,
            Self::SetChartType { title, .. }
            | Self::Move { title, .. }
            | Self::Delete { title }
            | Self::Select { title } => Some(title),
        }
    }

    /// Whether the gesture changes the server's list for one entry and is
    /// therefore subject to the per-title in-flight guard.
    #[must_use]
    pub const fn is_entry_mutation(&self) -> bool {
        matches!(
            self,
            Self::SetChartType { .. } | Self::Move { .. } | Self::Delete { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_list_mutations_are_guarded() {
        let upload = Gesture::Upload(vec![UploadFile::new("a.csv", b"1,2".to_vec())]);
        let select = Gesture::Select { title: "A".into() };
        let delete = Gesture::Delete { title: "A".into() };
        assert!(!upload.is_entry_mutation());
        assert!(!select.is_entry_mutation());
        assert!(delete.is_entry_mutation());
        assert_eq!(upload.title(), None);
        assert_eq!(delete.title(), Some("A"));
    }

    #[test]
    fn upload_debug_hides_contents() {
        let file = UploadFile::new("a.csv", vec![0u8; 1024]);
        assert_eq!(format!("{file:?}"), "UploadFile { name: \"a.csv\", len: 1024 }");
    }
}
