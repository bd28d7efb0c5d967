use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::{NotesError, Result};

/// Parses a timestamp given on the command line.
///
/// Accepts RFC 3339, or a local `YYYY-MM-DD HH:MM` / `YYYY-MM-DD`.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        return Ok(parsed.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        });

    naive
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| NotesError::InvalidInput {
            message: format!(
                "invalid timestamp '{}', expected RFC 3339 or YYYY-MM-DD[ HH:MM]",
                input
            ),
        })
}

/// Parses a positive list limit.
pub fn parse_list_limit(input: &str) -> Result<usize> {
    match input.trim().parse::<usize>() {
        Ok(limit) if limit > 0 => Ok(limit),
        _ => Err(NotesError::InvalidInput {
            message: format!("list limit must be a positive number, got '{}'", input.trim()),
        }),
    }
}

/// Shortens `text` to at most `width` characters on a single line, ending
/// with `…` when cut.
pub fn truncate_for_display(text: &str, width: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= width {
        return single_line;
    }
    if width == 0 {
        return String::new();
    }

    let mut cut: String = single_line.chars().take(width - 1).collect();
    cut.push('…');
    cut
}

// Drops the `<!-- ... -->` lines written into the editor template
pub fn strip_editor_comments(content: &str) -> String {
    content
        .lines()
        .filter(|line| {
            let line = line.trim();
            !(line.starts_with("<!--") && line.ends_with("-->"))
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
