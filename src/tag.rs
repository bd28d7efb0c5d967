//! Tag types: the four built-in note categories and user-defined custom tags.
use std::{
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{NotesError, Result};

/// Color given to custom tags created without one, and used when a stored
/// color cannot be parsed.
pub const DEFAULT_TAG_COLOR: &str = "#8B5FBF";

/// Icon given to custom tags created without one.
pub const DEFAULT_TAG_ICON: &str = "tag";

/// An RGB color parsed from a hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#RRGGBB`, `RRGGBB` or `#RGB`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim();
        let digits = digits.strip_prefix('#').unwrap_or(digits);
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }

        match digits.len() {
            6 => Some(Self {
                r: u8::from_str_radix(&digits[0..2], 16).ok()?,
                g: u8::from_str_radix(&digits[2..4], 16).ok()?,
                b: u8::from_str_radix(&digits[4..6], 16).ok()?,
            }),
            3 => {
                // #RGB expands each nibble: #F0A -> #FF00AA
                let nibble = |i: usize| u8::from_str_radix(&digits[i..i + 1], 16).ok();
                Some(Self {
                    r: nibble(0)? * 17,
                    g: nibble(1)? * 17,
                    b: nibble(2)? * 17,
                })
            }
            _ => None,
        }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// One of the four fixed note categories.
///
/// Only the identifier is persisted (as the note's `tag` field); the label,
/// icon and color are compiled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinTag {
    Todo,
    Idea,
    Tools,
    #[default]
    General,
}

impl BuiltinTag {
    /// All built-in tags in display order.
    pub const ALL: [BuiltinTag; 4] = [
        BuiltinTag::Todo,
        BuiltinTag::Idea,
        BuiltinTag::Tools,
        BuiltinTag::General,
    ];

    /// Stable identifier, identical to the serialized form.
    pub fn id(&self) -> &'static str {
        match self {
            BuiltinTag::Todo => "todo",
            BuiltinTag::Idea => "idea",
            BuiltinTag::Tools => "tools",
            BuiltinTag::General => "general",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BuiltinTag::Todo => "To-do",
            BuiltinTag::Idea => "Idea",
            BuiltinTag::Tools => "Tool",
            BuiltinTag::General => "General",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            BuiltinTag::Todo => "checkmark.circle",
            BuiltinTag::Idea => "lightbulb",
            BuiltinTag::Tools => "wrench",
            BuiltinTag::General => "note",
        }
    }

    pub fn color(&self) -> Rgb {
        match self {
            BuiltinTag::Todo => Rgb::new(0xFF, 0x3B, 0x30),
            BuiltinTag::Idea => Rgb::new(0x00, 0x7A, 0xFF),
            BuiltinTag::Tools => Rgb::new(0x34, 0xC7, 0x59),
            BuiltinTag::General => Rgb::new(0x8E, 0x8E, 0x93),
        }
    }

    /// True when `name` equals this tag's identifier or label, ignoring case.
    pub fn matches_name(&self, name: &str) -> bool {
        let name = name.trim();
        name.eq_ignore_ascii_case(self.id()) || name.eq_ignore_ascii_case(self.display_name())
    }
}

impl fmt::Display for BuiltinTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for BuiltinTag {
    type Err = NotesError;

    fn from_str(s: &str) -> Result<Self> {
        BuiltinTag::ALL
            .into_iter()
            .find(|tag| tag.matches_name(s))
            .ok_or_else(|| NotesError::InvalidInput {
                message: format!(
                    "unknown tag '{}', expected one of: todo, idea, tools, general",
                    s.trim()
                ),
            })
    }
}

/// A user-created tag.
///
/// Equality and hashing use the identifier only, so an edited tag still
/// compares equal to its earlier copies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomTag {
    pub id: Uuid,
    pub name: String,
    pub icon: String,
    pub color: String,
}

impl CustomTag {
    /// Creates a tag with a fresh identifier. The name is trimmed and must not
    /// be empty; icon and color fall back to the defaults.
    pub fn new(name: &str, icon: Option<&str>, color: Option<&str>) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(NotesError::InvalidInput {
                message: "tag name cannot be empty".to_string(),
            });
        }

        let icon = icon
            .map(str::trim)
            .filter(|icon| !icon.is_empty())
            .unwrap_or(DEFAULT_TAG_ICON);

        let color = match color {
            Some(color) => Rgb::from_hex(color)
                .ok_or_else(|| NotesError::InvalidInput {
                    message: format!("invalid hex color '{}'", color),
                })?
                .to_hex(),
            None => DEFAULT_TAG_COLOR.to_string(),
        };

        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            icon: icon.to_string(),
            color,
        })
    }

    pub fn display_name(&self) -> &str {
        &self.name
    }

    /// A copy with the given fields replaced, keeping the identifier.
    ///
    /// Omitted fields keep their current value; a stored color that does not
    /// parse is carried over as [`CustomTag::color_rgb`] instead.
    pub fn edited(&self, name: Option<&str>, icon: Option<&str>, color: Option<&str>) -> Result<Self> {
        let current_color = self.color_rgb().to_hex();
        let mut edited = Self::new(
            name.unwrap_or(&self.name),
            Some(icon.unwrap_or(&self.icon)),
            Some(color.unwrap_or(&current_color)),
        )?;
        edited.id = self.id;
        Ok(edited)
    }

    /// The stored color, or the default color when it does not parse.
    pub fn color_rgb(&self) -> Rgb {
        Rgb::from_hex(&self.color)
            .or_else(|| Rgb::from_hex(DEFAULT_TAG_COLOR))
            .unwrap_or(Rgb::new(0x8B, 0x5F, 0xBF))
    }
}

impl PartialEq for CustomTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CustomTag {}

impl Hash for CustomTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// An entry of the combined "all tags" view.
///
/// Names may collide between a built-in and a custom tag; entries are told
/// apart by [`TagRef::id`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagRef {
    Builtin(BuiltinTag),
    Custom(CustomTag),
}

impl TagRef {
    pub fn id(&self) -> String {
        match self {
            TagRef::Builtin(tag) => tag.id().to_string(),
            TagRef::Custom(tag) => tag.id.to_string(),
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            TagRef::Builtin(tag) => tag.display_name(),
            TagRef::Custom(tag) => tag.display_name(),
        }
    }

    pub fn icon(&self) -> &str {
        match self {
            TagRef::Builtin(tag) => tag.icon(),
            TagRef::Custom(tag) => &tag.icon,
        }
    }

    pub fn color(&self) -> Rgb {
        match self {
            TagRef::Builtin(tag) => tag.color(),
            TagRef::Custom(tag) => tag.color_rgb(),
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, TagRef::Builtin(_))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn parses_hex_colors() {
        assert_eq!(Rgb::from_hex("#FF0000"), Some(Rgb::new(255, 0, 0)));
        assert_eq!(Rgb::from_hex("8b5fbf"), Some(Rgb::new(0x8B, 0x5F, 0xBF)));
        assert_eq!(Rgb::from_hex("#F0A"), Some(Rgb::new(0xFF, 0x00, 0xAA)));
        assert_eq!(Rgb::from_hex("#12345"), None);
        assert_eq!(Rgb::from_hex("#GG0000"), None);
        assert_eq!(Rgb::from_hex(""), None);
        assert_eq!(Rgb::new(1, 2, 255).to_hex(), "#0102FF");
    }

    #[test]
    fn builtin_tags_parse_by_id_or_label() {
        assert_eq!("todo".parse::<BuiltinTag>().unwrap(), BuiltinTag::Todo);
        assert_eq!("To-Do".parse::<BuiltinTag>().unwrap(), BuiltinTag::Todo);
        assert_eq!(" TOOLS ".parse::<BuiltinTag>().unwrap(), BuiltinTag::Tools);
        assert_eq!("tool".parse::<BuiltinTag>().unwrap(), BuiltinTag::Tools);
        assert!("work".parse::<BuiltinTag>().is_err());
        assert_eq!(BuiltinTag::default(), BuiltinTag::General);
    }

    #[test]
    fn builtin_tag_serializes_as_identifier() {
        let json = serde_json::to_string(&BuiltinTag::ALL).unwrap();
        assert_eq!(json, r#"["todo","idea","tools","general"]"#);
    }

    #[test]
    fn custom_tag_requires_a_name() {
        assert!(matches!(
            CustomTag::new("   ", None, None),
            Err(NotesError::InvalidInput { .. })
        ));

        let tag = CustomTag::new("  Work ", None, None).unwrap();
        assert_eq!(tag.name, "Work");
        assert_eq!(tag.icon, DEFAULT_TAG_ICON);
        assert_eq!(tag.color, DEFAULT_TAG_COLOR);
    }

    #[test]
    fn custom_tag_rejects_bad_color_and_normalizes_good_one() {
        assert!(CustomTag::new("Work", None, Some("purple")).is_err());
        let tag = CustomTag::new("Work", Some("star"), Some("ff0000")).unwrap();
        assert_eq!(tag.color, "#FF0000");
        assert_eq!(tag.icon, "star");
    }

    #[test]
    fn stored_garbage_color_falls_back() {
        let mut tag = CustomTag::new("Work", None, None).unwrap();
        tag.color = "not-a-color".to_string();
        assert_eq!(tag.color_rgb().to_hex(), DEFAULT_TAG_COLOR);
    }

    #[test]
    fn edited_tag_survives_an_unparseable_stored_color() {
        let mut stored = CustomTag::new("Work", Some("star"), None).unwrap();
        stored.color = "not a color".to_string();

        let renamed = stored.edited(Some("Office"), None, None).unwrap();
        assert_eq!(renamed.id, stored.id);
        assert_eq!(renamed.name, "Office");
        assert_eq!(renamed.icon, "star");
        assert_eq!(renamed.color, DEFAULT_TAG_COLOR);

        let recolored = stored.edited(None, None, Some("#0a0b0c")).unwrap();
        assert_eq!(recolored.name, "Work");
        assert_eq!(recolored.color, "#0A0B0C");
        assert!(stored.edited(None, None, Some("#zz")).is_err());
    }

    #[test]
    fn custom_tag_identity_is_the_id() {
        let tag = CustomTag::new("Work", None, None).unwrap();
        let mut renamed = tag.clone();
        renamed.name = "Office".to_string();
        assert_eq!(tag, renamed);

        let other = CustomTag::new("Work", None, None).unwrap();
        assert_ne!(tag, other);

        let set: HashSet<_> = [tag, renamed, other].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn tag_refs_are_distinguished_by_id() {
        let custom = CustomTag::new("Idea", None, None).unwrap();
        let builtin = TagRef::Builtin(BuiltinTag::Idea);
        let custom_ref = TagRef::Custom(custom.clone());

        assert_eq!(builtin.display_name(), custom_ref.display_name());
        assert_ne!(builtin.id(), custom_ref.id());
        assert_eq!(custom_ref.id(), custom.id.to_string());
        assert!(builtin.is_builtin());
    }
}
