//! Bucketing notes by calendar day for the timeline listing.
use chrono::{NaiveDate, TimeZone};

use crate::Note;

/// Notes created on the same calendar day, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup {
    pub date: NaiveDate,
    pub notes: Vec<Note>,
}

impl DayGroup {
    /// The note that carries the day header.
    pub fn latest(&self) -> Option<&Note> {
        self.notes.first()
    }

    pub fn earliest(&self) -> Option<&Note> {
        self.notes.last()
    }
}

/// Groups a newest-first list by the day each note was created in `tz`.
///
/// Single pass: a new group starts whenever the day changes, so the input
/// must already be sorted descending by creation time.
pub fn group_by_day<Tz: TimeZone>(notes: &[Note], tz: &Tz) -> Vec<DayGroup> {
    let mut groups: Vec<DayGroup> = Vec::new();

    for note in notes {
        let date = note.created_at.with_timezone(tz).date_naive();
        match groups.last_mut() {
            Some(group) if group.date == date => group.notes.push(note.clone()),
            _ => groups.push(DayGroup {
                date,
                notes: vec![note.clone()],
            }),
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, Utc};

    use super::*;
    use crate::BuiltinTag;

    fn at(rfc3339: &str) -> Note {
        let created_at = chrono::DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc);
        Note::with_timestamp(rfc3339, BuiltinTag::General, None, created_at).unwrap()
    }

    #[test]
    fn groups_consecutive_days() {
        let notes = vec![
            at("2025-08-11T09:00:00Z"),
            at("2025-08-10T18:00:00Z"),
            at("2025-08-10T08:00:00Z"),
            at("2025-08-08T12:00:00Z"),
        ];

        let groups = group_by_day(&notes, &Utc);
        let sizes: Vec<_> = groups.iter().map(|g| (g.date.to_string(), g.notes.len())).collect();
        assert_eq!(
            sizes,
            [
                ("2025-08-11".to_string(), 1),
                ("2025-08-10".to_string(), 2),
                ("2025-08-08".to_string(), 1)
            ]
        );
        assert_eq!(groups[1].latest().unwrap().id, notes[1].id);
        assert_eq!(groups[1].earliest().unwrap().id, notes[2].id);
    }

    #[test]
    fn day_boundary_follows_time_zone() {
        let notes = vec![at("2025-08-10T23:30:00Z"), at("2025-08-10T14:00:00Z")];
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();

        assert_eq!(group_by_day(&notes, &Utc).len(), 1);

        let groups = group_by_day(&notes, &tokyo);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].date.to_string(), "2025-08-11");
    }

    #[test]
    fn empty_input_has_no_groups() {
        assert!(group_by_day(&[], &Utc).is_empty());
    }
}
