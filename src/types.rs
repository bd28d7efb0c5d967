//! Shared types for the tagnotes application: the `Result` alias, edit
//! descriptions, policies, and the command-line subcommands.
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::{Deserialize, Serialize};

use crate::{parse_list_limit, BuiltinTag, CustomTag, Note, NotesError};

/// A specialized Result type for tagnotes operations.
pub type Result<T> = std::result::Result<T, NotesError>;

/// Fields to replace on an existing note. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteUpdate {
    pub content: Option<String>,
    pub tag: Option<BuiltinTag>,
    /// `Some(None)` removes the custom tag
    pub custom_tag: Option<Option<CustomTag>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl NoteUpdate {
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn tag(mut self, tag: BuiltinTag) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn custom_tag(mut self, custom_tag: Option<CustomTag>) -> Self {
        self.custom_tag = Some(custom_tag);
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.tag.is_none()
            && self.custom_tag.is_none()
            && self.created_at.is_none()
    }

    pub fn apply_to(self, note: &mut Note) {
        if let Some(content) = self.content {
            note.content = content;
        }
        if let Some(tag) = self.tag {
            note.tag = tag;
        }
        if let Some(custom_tag) = self.custom_tag {
            note.custom_tag = custom_tag;
        }
        if let Some(created_at) = self.created_at {
            note.created_at = created_at;
        }
    }
}

/// What the tag store does when a new custom tag's name matches a built-in
/// tag or another custom tag.
///
/// Built-in tags are never deletable under either policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameCollisionPolicy {
    /// Duplicate names are kept and told apart by identifier.
    #[default]
    Allow,
    /// Duplicate names are refused with [`NotesError::TagNameCollision`].
    Reject,
}

/// Which tag a listing is restricted to. At most one may be given.
#[derive(Args, Debug, Clone, Default)]
#[group(multiple = false)]
pub struct TagSelection {
    /// Built-in tag (todo, idea, tools, general)
    #[clap(short = 't', long)]
    pub tag: Option<BuiltinTag>,

    /// Custom tag, by name or id prefix
    #[clap(short = 'c', long)]
    pub custom_tag: Option<String>,
}

/// Available subcommands for the tagnotes application
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Capture a new note
    Add {
        /// Note text; opens the editor when omitted
        content: Option<String>,

        /// Built-in tag (defaults to the configured default tag)
        #[clap(short = 't', long)]
        tag: Option<BuiltinTag>,

        /// Custom tag, by name or id prefix
        #[clap(short = 'c', long)]
        custom_tag: Option<String>,

        /// Creation time (RFC 3339), defaults to now
        #[clap(long)]
        at: Option<String>,

        /// Open content in editor before saving
        #[clap(short, long)]
        edit: bool,
    },

    /// List notes, newest first
    List {
        #[clap(flatten)]
        selection: TagSelection,

        /// Only notes whose content contains this text (case-insensitive)
        #[clap(short, long)]
        search: Option<String>,

        /// Limit the number of notes shown (defaults to the configured limit)
        #[clap(short = 'n', long, value_parser = parse_list_limit)]
        limit: Option<usize>,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,

        /// Group notes under day headers
        #[clap(long)]
        timeline: bool,
    },

    /// Edit an existing note
    Edit {
        /// ID (or unique prefix) of the note to edit
        id: String,

        /// New content
        #[clap(long)]
        content: Option<String>,

        /// New built-in tag
        #[clap(short = 't', long)]
        tag: Option<BuiltinTag>,

        /// New custom tag, by name or id prefix
        #[clap(short = 'c', long, conflicts_with = "no_custom_tag")]
        custom_tag: Option<String>,

        /// Remove the custom tag
        #[clap(long)]
        no_custom_tag: bool,

        /// New creation time (RFC 3339)
        #[clap(long)]
        at: Option<String>,

        /// Edit the content in the editor
        #[clap(short, long)]
        edit: bool,
    },

    /// Delete a note by ID
    Delete {
        /// ID (or unique prefix) of the note to delete
        id: String,
    },

    /// Delete every note
    Clear {
        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Custom tag operations
    #[clap(subcommand)]
    Tag(TagCommands),

    /// Configuration management
    Config {
        /// Show current configuration
        #[clap(short = 'S', long)]
        show: bool,

        /// Update a configuration setting (key=value)
        #[clap(short, long)]
        set: Option<String>,

        /// Reset configuration to defaults
        #[clap(short, long)]
        reset: bool,
    },
}

/// Subcommands of `tag`
#[derive(Subcommand, Debug)]
pub enum TagCommands {
    /// Create a custom tag
    Add {
        name: String,

        /// Icon key
        #[clap(short, long)]
        icon: Option<String>,

        /// Hex color, e.g. #8B5FBF
        #[clap(long)]
        color: Option<String>,
    },

    /// List built-in and custom tags with note counts
    List {
        /// Only tags whose name contains this text (case-insensitive)
        #[clap(short, long)]
        search: Option<String>,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Replace a custom tag's name, icon or color
    Update {
        /// ID (or unique prefix) of the tag
        id: String,

        #[clap(long)]
        name: Option<String>,

        #[clap(short, long)]
        icon: Option<String>,

        #[clap(long)]
        color: Option<String>,
    },

    /// Delete a custom tag; notes keep their copy of it
    Delete {
        /// ID (or unique prefix) of the tag
        id: String,
    },
}
