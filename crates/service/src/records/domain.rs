use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::pagination::Pagination;

/// Attribution used for rows imported without an `added_by`.
pub const IMPORT_MARKER: &str = "import";
/// Attribution for ids added from the admin page.
pub const MANUAL_MARKER: &str = "manual";
/// Upper bound on rows returned by an unpaginated search.
pub const SEARCH_LIMIT: u64 = 500;

/// One stored identifier with attribution, note and insertion time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub added_by: String,
    #[serde(default)]
    pub note: String,
    pub created_at: DateTime<Utc>,
}

impl Record {
    pub fn new(id: impl Into<String>, added_by: impl Into<String>) -> Self {
        Self { id: id.into(), added_by: added_by.into(), note: String::new(), created_at: Utc::now() }
    }

    /// Case-insensitive substring match on id, added_by and note.
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        needle.is_empty()
            || self.id.to_lowercase().contains(needle)
            || self.added_by.to_lowercase().contains(needle)
            || self.note.to_lowercase().contains(needle)
    }
}

impl From<models::record::Model> for Record {
    fn from(m: models::record::Model) -> Self {
        Self { id: m.id, added_by: m.added_by, note: m.note, created_at: m.created_at.with_timezone(&Utc) }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ListQuery {
    pub pagination: Pagination,
    pub filter: Option<String>,
}

impl ListQuery {
    /// Trimmed, non-empty filter.
    pub fn filter_term(&self) -> Option<&str> {
        self.filter.as_deref().map(str::trim).filter(|f| !f.is_empty())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RecordPage {
    pub items: Vec<Record>,
    pub total: u64,
}

#[derive(Clone, Debug)]
pub struct SubmitOutcome {
    pub record: Record,
    /// False when the id already existed and the call was a no-op.
    pub inserted: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_any_field_case_insensitively() {
        let mut r = Record::new("ABC123", "alice");
        r.note = "Needs Review".into();
        assert!(r.matches("abc"));
        assert!(r.matches("lice"));
        assert!(r.matches("review"));
        assert!(r.matches(""));
        assert!(!r.matches("bob"));
    }

    #[test]
    fn filter_term_ignores_blank() {
        let q = ListQuery { filter: Some("   ".into()), ..Default::default() };
        assert_eq!(q.filter_term(), None);
        let q = ListQuery { filter: Some(" ab ".into()), ..Default::default() };
        assert_eq!(q.filter_term(), Some("ab"));
    }
}
