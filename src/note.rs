//! The note record and its derived display properties.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{BuiltinTag, CustomTag, NotesError, Result, Rgb};

/// Represents a single note in our system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Unique identifier for the note
    pub id: Uuid,
    /// Free-text content, trimmed and non-empty when created through [`Note::new`]
    pub content: String,
    /// Built-in category, always present
    #[serde(default)]
    pub tag: BuiltinTag,
    /// Copy of the custom tag taken when the note was created or last edited
    #[serde(default)]
    pub custom_tag: Option<CustomTag>,
    /// When the note was created; only changed by an explicit edit
    pub created_at: DateTime<Utc>,
}

impl Note {
    /// Creates a new note stamped with the current time.
    pub fn new(content: &str, tag: BuiltinTag, custom_tag: Option<CustomTag>) -> Result<Self> {
        Self::with_timestamp(content, tag, custom_tag, Utc::now())
    }

    /// Creates a new note with an explicit creation time.
    pub fn with_timestamp(
        content: &str,
        tag: BuiltinTag,
        custom_tag: Option<CustomTag>,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        let content = validate_content(content)?;

        Ok(Note {
            id: Uuid::new_v4(),
            content,
            tag,
            custom_tag,
            created_at,
        })
    }

    /// Name shown for the note's tag: the custom tag when set, else the built-in one.
    pub fn display_tag_name(&self) -> &str {
        match &self.custom_tag {
            Some(custom) => custom.display_name(),
            None => self.tag.display_name(),
        }
    }

    pub fn display_icon(&self) -> &str {
        match &self.custom_tag {
            Some(custom) => &custom.icon,
            None => self.tag.icon(),
        }
    }

    pub fn display_color(&self) -> Rgb {
        match &self.custom_tag {
            Some(custom) => custom.color_rgb(),
            None => self.tag.color(),
        }
    }

    /// `"<tag>: <content>"`, as used in compact listings.
    pub fn formatted_content(&self) -> String {
        format!("{}: {}", self.display_tag_name(), self.content)
    }

    /// Identifier of the custom tag this note carries, if any.
    pub fn custom_tag_id(&self) -> Option<Uuid> {
        self.custom_tag.as_ref().map(|tag| tag.id)
    }
}

/// Trims note content and rejects it when nothing is left.
pub fn validate_content(content: &str) -> Result<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(NotesError::InvalidInput {
            message: "note content cannot be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}
