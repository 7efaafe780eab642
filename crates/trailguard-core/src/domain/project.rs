//! Project entities and the paginated results document.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::validation::ValidationError;

/// Default page requested when the caller does not specify one.
pub const DEFAULT_PAGE: u32 = 1;
/// Default number of results per page.
pub const DEFAULT_LIMIT: u32 = 50;
/// Largest page size the server accepts.
pub const MAX_LIMIT: u32 = 100;

/// A camera-trap project as listed by `GET /api/projects`.
///
/// `created_at` may be `null` in list responses, and the create endpoint
/// omits `session_count`; both fall back to defaults on decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub session_count: u32,
}

/// Input of the create-project mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
}

impl NewProject {
    /// Creates a project draft with no description.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    /// Sets the optional description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Rejects empty or whitespace-only names before a request is sent.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyProjectName`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyProjectName);
        }
        Ok(())
    }
}

/// Page coordinates for the project results endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultsPage {
    pub page: u32,
    pub limit: u32,
}

impl Default for ResultsPage {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl ResultsPage {
    /// Builds page coordinates, enforcing the server's bounds
    /// (`page >= 1`, `1 <= limit <= 100`).
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PageOutOfRange`] or
    /// [`ValidationError::LimitOutOfRange`].
    pub fn new(page: u32, limit: u32) -> Result<Self, ValidationError> {
        if page < 1 {
            return Err(ValidationError::PageOutOfRange(page));
        }
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(ValidationError::LimitOutOfRange {
                limit,
                max: MAX_LIMIT,
            });
        }
        Ok(Self { page, limit })
    }
}

/// One image with a detected animal, as returned in a results page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultImage {
    pub id: String,
    pub file_path: String,
    /// Detection payload; its shape is owned by the detection model.
    #[serde(default)]
    pub species: serde_json::Value,
    #[serde(default)]
    pub quality_score: Option<f64>,
    #[serde(default)]
    pub animal_count: u32,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResultStatistics {
    #[serde(default)]
    pub total_processed: u64,
    #[serde(default)]
    pub animals_detected: u64,
    #[serde(default)]
    pub unique_species: u64,
    #[serde(default)]
    pub species_count: BTreeMap<String, u64>,
}

/// Document returned by `GET /api/projects/{id}/results`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectResults {
    #[serde(default)]
    pub images: Vec<ResultImage>,
    pub pagination: Pagination,
    #[serde(default)]
    pub statistics: ResultStatistics,
}

/// A field-survey session belonging to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub total_images: u64,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
