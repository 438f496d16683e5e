//! Exercise catalog: the ordered, read-only set of lab exercises.
//!
//! The catalog is parsed once at startup (embedded dataset or an external
//! JSON file) and validated: ids must be unique, positive, and the catalog
//! non-empty. Everything else in the application borrows exercises from
//! here; nothing mutates them.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default embedded dataset compiled into the binary.
const EMBEDDED_DATA: &str = include_str!("../data/exercises.json");

/// Rows shown per index page. The index table is padded with blank rows up
/// to this count so every page keeps the same printed footprint.
pub const ITEMS_PER_PAGE: usize = 25;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("catalog contains no exercises")]
    Empty,
    #[error("exercise id {0} is not positive")]
    NonPositiveId(u32),
    #[error("duplicate exercise id {0}")]
    DuplicateId(u32),
}

/// One lab exercise record. Immutable for the process lifetime.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: u32,
    pub title: String,
    pub aim: String,
    pub procedure: Vec<String>,
    pub code: String,
    pub expected_output: String,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    exercises: Vec<Exercise>,
}

impl Catalog {
    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let exercises: Vec<Exercise> = serde_json::from_str(raw)?;
        Self::validate(exercises)
    }

    /// The dataset compiled into the binary.
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_json_str(EMBEDDED_DATA)
    }

    /// Load from an external file when given, otherwise the embedded set.
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(p) => {
                let raw = fs::read_to_string(p)?;
                let catalog = Self::from_json_str(&raw)?;
                tracing::info!(
                    target: "catalog",
                    file = %p.display(),
                    count = catalog.len(),
                    "catalog_loaded"
                );
                Ok(catalog)
            }
            None => Self::embedded(),
        }
    }

    fn validate(exercises: Vec<Exercise>) -> Result<Self, CatalogError> {
        if exercises.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = std::collections::HashSet::new();
        for ex in &exercises {
            if ex.id == 0 {
                return Err(CatalogError::NonPositiveId(ex.id));
            }
            if !seen.insert(ex.id) {
                return Err(CatalogError::DuplicateId(ex.id));
            }
        }
        Ok(Self { exercises })
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Exercise> {
        self.exercises.iter()
    }

    pub fn get(&self, id: u32) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == id)
    }

    /// Zero-based ordinal of an exercise within catalog order.
    pub fn position(&self, id: u32) -> Option<usize> {
        self.exercises.iter().position(|e| e.id == id)
    }

    /// The exercises before and after the given id in catalog order.
    pub fn neighbors(&self, id: u32) -> (Option<&Exercise>, Option<&Exercise>) {
        let Some(pos) = self.position(id) else {
            return (None, None);
        };
        let prev = pos.checked_sub(1).and_then(|p| self.exercises.get(p));
        let next = self.exercises.get(pos + 1);
        (prev, next)
    }

    /// First exercise in catalog order. The non-empty invariant is enforced
    /// at construction.
    pub fn first(&self) -> &Exercise {
        &self.exercises[0]
    }

    pub fn last(&self) -> &Exercise {
        &self.exercises[self.exercises.len() - 1]
    }

    // --- index pagination -------------------------------------------------

    pub fn total_index_pages(&self, per_page: usize) -> usize {
        self.exercises.len().div_ceil(per_page.max(1))
    }

    /// Exercises shown on the given one-based index page.
    pub fn page_slice(&self, page: usize, per_page: usize) -> &[Exercise] {
        let per_page = per_page.max(1);
        let start = page.saturating_sub(1) * per_page;
        if start >= self.exercises.len() {
            return &[];
        }
        let end = (start + per_page).min(self.exercises.len());
        &self.exercises[start..end]
    }

    /// One-based serial number of the first row on the given index page.
    pub fn page_start_serial(&self, page: usize, per_page: usize) -> usize {
        page.saturating_sub(1) * per_page.max(1) + 1
    }

    // --- document page numbering ------------------------------------------

    /// Printed page number of an exercise document: index pages first, then
    /// one page per exercise, addressed by id.
    pub fn doc_page_number(&self, id: u32, per_page: usize) -> usize {
        self.total_index_pages(per_page) + id as usize
    }

    pub fn doc_total_pages(&self, per_page: usize) -> usize {
        self.total_index_pages(per_page) + self.exercises.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Catalog {
        Catalog::from_json_str(
            r#"[
                {"id": 1, "title": "One", "aim": "a", "procedure": ["p"],
                 "code": "print(1)", "expectedOutput": "1\n"},
                {"id": 2, "title": "Two", "aim": "a", "procedure": ["p"],
                 "code": "print(2)", "expectedOutput": "2\n"},
                {"id": 3, "title": "Three", "aim": "a", "procedure": ["p"],
                 "code": "print(3)", "expectedOutput": "3\n"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn embedded_dataset_parses_and_validates() {
        let catalog = Catalog::embedded().unwrap();
        assert!(!catalog.is_empty());
        assert_eq!(catalog.first().id, 1);
        assert!(catalog.iter().all(|e| !e.code.is_empty()));
        assert!(catalog.iter().all(|e| !e.expected_output.is_empty()));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = Catalog::from_json_str(
            r#"[
                {"id": 1, "title": "A", "aim": "a", "procedure": [],
                 "code": "", "expectedOutput": ""},
                {"id": 1, "title": "B", "aim": "a", "procedure": [],
                 "code": "", "expectedOutput": ""}
            ]"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId(1)));
    }

    #[test]
    fn rejects_empty_and_zero_id() {
        assert!(matches!(
            Catalog::from_json_str("[]").unwrap_err(),
            CatalogError::Empty
        ));
        let err = Catalog::from_json_str(
            r#"[{"id": 0, "title": "A", "aim": "a", "procedure": [],
                 "code": "", "expectedOutput": ""}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::NonPositiveId(0)));
    }

    #[test]
    fn lookup_and_neighbors() {
        let c = small();
        assert_eq!(c.get(2).unwrap().title, "Two");
        assert!(c.get(9).is_none());

        let (prev, next) = c.neighbors(2);
        assert_eq!(prev.unwrap().id, 1);
        assert_eq!(next.unwrap().id, 3);

        let (prev, next) = c.neighbors(1);
        assert!(prev.is_none());
        assert_eq!(next.unwrap().id, 2);

        let (prev, next) = c.neighbors(3);
        assert_eq!(prev.unwrap().id, 2);
        assert!(next.is_none());

        assert_eq!(c.first().id, 1);
        assert_eq!(c.last().id, 3);
    }

    #[test]
    fn page_slicing_covers_catalog_without_overlap() {
        let c = small();
        assert_eq!(c.total_index_pages(2), 2);
        assert_eq!(c.page_slice(1, 2).len(), 2);
        assert_eq!(c.page_slice(2, 2).len(), 1);
        assert_eq!(c.page_slice(3, 2).len(), 0);
        assert_eq!(c.page_slice(2, 2)[0].id, 3);
        assert_eq!(c.page_start_serial(2, 2), 3);
    }

    #[test]
    fn document_page_numbers_follow_index_pages() {
        let c = small();
        // 3 exercises at 2 per page: 2 index pages, then pages 3..5.
        assert_eq!(c.doc_page_number(1, 2), 3);
        assert_eq!(c.doc_page_number(3, 2), 5);
        assert_eq!(c.doc_total_pages(2), 5);
    }

    #[test]
    fn load_missing_file_reports_io_error() {
        let err = Catalog::load(Some(Path::new("__no_such_catalog__.json"))).unwrap_err();
        assert!(matches!(err, CatalogError::Io(_)));
    }
}
