//! Request builders for every back-end endpoint the client uses.
//!
//! Each function returns an [`ApiRequest`] describing exactly one call.  Path
//! segments that come from user data (project ids) are percent-encoded so a
//! stray `/` or space cannot address a different resource.

use crate::domain::analysis::ImageFile;
use crate::domain::project::{NewProject, ResultsPage};
use crate::protocol::request::{ApiRequest, FilePart};

/// WebSocket path of the realtime feed for one project.
pub fn live_updates_path(project_id: &str) -> String {
    format!("/api/ws/projects/{}", urlencoding::encode(project_id))
}

/// `GET /health`
pub fn health() -> ApiRequest {
    ApiRequest::get("/health")
}

/// `GET /api/projects`
pub fn list_projects() -> ApiRequest {
    ApiRequest::get("/api/projects")
}

/// `POST /api/projects?name=&description=`
///
/// The back end reads both fields from the query string, so the request has
/// no body.  An absent description is left out entirely.
pub fn create_project(project: &NewProject) -> ApiRequest {
    ApiRequest::post("/api/projects")
        .query("name", &project.name)
        .query_opt("description", project.description.as_ref())
}

/// `GET /api/projects/{id}/results?page=&limit=`
pub fn project_results(project_id: &str, page: ResultsPage) -> ApiRequest {
    ApiRequest::get(project_path(project_id, "results"))
        .query("page", page.page)
        .query("limit", page.limit)
}

/// `GET /api/projects/{id}/sessions`
pub fn project_sessions(project_id: &str) -> ApiRequest {
    ApiRequest::get(project_path(project_id, "sessions"))
}

/// `GET /api/projects/{id}/status?task_id=`
pub fn batch_status(project_id: &str, task_id: &str) -> ApiRequest {
    ApiRequest::get(project_path(project_id, "status")).query("task_id", task_id)
}

/// `POST /api/projects/{id}/batch` with a JSON array of image paths.
pub fn start_batch(project_id: &str, image_paths: &[String]) -> ApiRequest {
    ApiRequest::post(project_path(project_id, "batch")).json(serde_json::Value::from(
        image_paths.to_vec(),
    ))
}

/// `POST /api/analyze/single` with the image in multipart field `file`.
pub fn analyze_single(file: &ImageFile) -> ApiRequest {
    ApiRequest::post("/api/analyze/single").multipart(vec![file_part("file", file)])
}

/// `POST /api/analyze/batch` with one multipart field `files` per image.
pub fn analyze_batch(files: &[ImageFile]) -> ApiRequest {
    ApiRequest::post("/api/analyze/batch")
        .multipart(files.iter().map(|f| file_part("files", f)).collect())
}

/// `GET /api/species`
pub fn list_species() -> ApiRequest {
    ApiRequest::get("/api/species")
}

fn project_path(project_id: &str, resource: &str) -> String {
    format!(
        "/api/projects/{}/{resource}",
        urlencoding::encode(project_id)
    )
}

fn file_part(field: &str, file: &ImageFile) -> FilePart {
    FilePart {
        field: field.to_string(),
        file_name: file.name.clone(),
        content_type: file.content_type.clone(),
        bytes: file.bytes.clone(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
