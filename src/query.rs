//! Tag filtering and free-text search over a list of notes.
use uuid::Uuid;

use crate::{BuiltinTag, Note};

/// A single tag selection. Built-in and custom selections exclude each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagFilter {
    #[default]
    All,
    Builtin(BuiltinTag),
    Custom(Uuid),
}

impl TagFilter {
    pub fn matches(&self, note: &Note) -> bool {
        match self {
            TagFilter::All => true,
            TagFilter::Builtin(tag) => note.tag == *tag,
            TagFilter::Custom(id) => note.custom_tag_id() == Some(*id),
        }
    }
}

/// Case-insensitive substring test; an empty query matches everything.
///
/// The query is used as given, so surrounding spaces must appear in `content`.
pub fn matches_text(content: &str, query: &str) -> bool {
    query.is_empty() || content.to_lowercase().contains(&query.to_lowercase())
}

/// Tag filter followed by free-text search. Results keep the input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteQuery {
    pub filter: TagFilter,
    pub text: String,
}

impl NoteQuery {
    pub fn new(filter: TagFilter, text: impl Into<String>) -> Self {
        Self {
            filter,
            text: text.into(),
        }
    }

    pub fn matches(&self, note: &Note) -> bool {
        self.filter.matches(note) && matches_text(&note.content, &self.text)
    }

    pub fn apply(&self, notes: &[Note]) -> Vec<Note> {
        notes.iter().filter(|note| self.matches(note)).cloned().collect()
    }
}
