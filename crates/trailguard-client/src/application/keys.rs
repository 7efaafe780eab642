//! Cache keys of every resource, and the prefixes writes invalidate.
//!
//! ```text
//! ["projects"]                                   project list
//! ["projects", id, "results", page, limit]       one results page
//! ["projects", id, "sessions"]                   sessions of a project
//! ["batch-status", id, task_id | null]           status of one batch task
//! ["species"]                                    species catalogue
//! ```
//!
//! `["projects"]` is a prefix of every per-project key, so creating a project
//! also refreshes any results page being watched.

use trailguard_core::{cache_key, CacheKey, ResultsPage};

pub fn projects() -> CacheKey {
    cache_key!["projects"]
}

pub fn project_results(project_id: Option<&str>, page: ResultsPage) -> CacheKey {
    cache_key!["projects", project_id, "results", page.page, page.limit]
}

/// Prefix covering every results page of one project.
pub fn results_prefix(project_id: &str) -> CacheKey {
    cache_key!["projects", project_id, "results"]
}

pub fn project_sessions(project_id: Option<&str>) -> CacheKey {
    cache_key!["projects", project_id, "sessions"]
}

pub fn batch_status(project_id: &str, task_id: Option<&str>) -> CacheKey {
    cache_key!["batch-status", project_id, task_id]
}

/// Prefix covering the status of every task of one project.
pub fn batch_prefix(project_id: &str) -> CacheKey {
    cache_key!["batch-status", project_id]
}

pub fn species() -> CacheKey {
    cache_key!["species"]
}
