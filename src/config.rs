use std::{
    fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use which::which;

use crate::{parse_list_limit, BuiltinTag, NameCollisionPolicy, NotesError, Result};

/// Key the notes blob is stored under by default.
pub const DEFAULT_NOTES_KEY: &str = "saved_notes";

/// Key the custom tags blob is stored under by default.
pub const DEFAULT_TAGS_KEY: &str = "saved_custom_tags";

const CONFIG_FILE: &str = "config.json";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "tagnotes", "tagnotes")
}

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory holding the key-value files
    pub data_dir: PathBuf,

    /// Storage key for the notes list
    pub notes_key: String,

    /// Storage key for the custom tags list
    pub tags_key: String,

    /// Tag given to new notes when none is chosen
    pub default_tag: BuiltinTag,

    /// How a custom tag name that matches an existing tag is handled
    pub tag_name_collisions: NameCollisionPolicy,

    /// Editor used for composing note content
    pub editor_command: Option<String>,

    /// Default number of notes shown by `list`
    pub list_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".tagnotes"));

        Self {
            data_dir,
            notes_key: DEFAULT_NOTES_KEY.to_string(),
            tags_key: DEFAULT_TAGS_KEY.to_string(),
            default_tag: BuiltinTag::General,
            tag_name_collisions: NameCollisionPolicy::Allow,
            editor_command: None,
            list_limit: 20,
        }
    }
}

impl Config {
    /// Default location of the configuration file.
    pub fn default_path() -> PathBuf {
        project_dirs()
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
            .unwrap_or_else(|| PathBuf::from(".tagnotes").join(CONFIG_FILE))
    }

    /// Reads the configuration at `path`, or the defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content).map_err(|e| NotesError::ConfigError {
            message: format!("failed to parse {}: {}", path.display(), e),
        })?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Writes the configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|_| NotesError::DirectoryError {
                    path: parent.to_path_buf(),
                })?;
            }
        }

        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Updates one setting from its textual form, as given to `config --set`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key.trim() {
            "data_dir" => self.data_dir = PathBuf::from(value),
            "notes_key" => self.notes_key = non_empty(key, value)?,
            "tags_key" => self.tags_key = non_empty(key, value)?,
            "default_tag" => self.default_tag = value.parse()?,
            "tag_name_collisions" => {
                self.tag_name_collisions = match value.to_lowercase().as_str() {
                    "allow" => NameCollisionPolicy::Allow,
                    "reject" => NameCollisionPolicy::Reject,
                    other => {
                        return Err(NotesError::ConfigError {
                            message: format!("tag_name_collisions must be allow or reject, got '{}'", other),
                        })
                    }
                }
            }
            "editor_command" => {
                self.editor_command = Some(value.to_string()).filter(|v| !v.is_empty())
            }
            "list_limit" => {
                self.list_limit = parse_list_limit(value).map_err(|_| NotesError::ConfigError {
                    message: format!("list_limit must be a positive number, got '{}'", value),
                })?
            }
            other => {
                return Err(NotesError::ConfigError {
                    message: format!("unknown setting '{}'", other),
                })
            }
        }
        Ok(())
    }

    // This method provides smart fallbacks when no editor is configured
    pub fn get_editor_command(&self) -> String {
        // First try the configured editor
        if let Some(editor) = &self.editor_command {
            return editor.clone();
        }

        // Then try environment variable
        if let Ok(editor) = std::env::var("EDITOR") {
            return editor;
        }

        // Fall back to platform defaults
        if cfg!(windows) {
            "notepad".to_string()
        } else if cfg!(target_os = "macos") {
            "open -W -t".to_string()
        } else {
            for editor in &["nano", "vim", "vi", "emacs"] {
                if which(editor).is_ok() {
                    return editor.to_string();
                }
            }
            "nano".to_string()
        }
    }
}

fn non_empty(key: &str, value: &str) -> Result<String> {
    if value.is_empty() {
        return Err(NotesError::ConfigError {
            message: format!("{} cannot be empty", key),
        });
    }
    Ok(value.to_string())
}
