//! In-memory back end for tests and offline demos.
//!
//! [`MockBackend`] implements [`ApiTransport`] by routing each request to a
//! small in-process model of the REST API: projects, paginated results,
//! scripted batch tasks, single and multi-image analysis, species, and
//! health.  Every request is recorded so tests can assert on exactly what
//! went over the "wire".
//!
//! # Scripted batches
//!
//! Each batch started with `POST /api/projects/{id}/batch` walks through the
//! states given to [`MockBackend::script_batches`] (by default
//! `pending → running → completed`), one state per status poll, repeating the
//! last one.  When a task first reports `completed`, one result image per
//! submitted path is added to the project, so a refreshed results page shows
//! the batch output.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use trailguard_core::domain::analysis::{ImageFile, ALLOWED_EXTENSIONS};
use trailguard_core::domain::project::{DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT};
use trailguard_core::{ApiError, ApiRequest, BatchState, FilePart, Method, Project, RequestBody};
use uuid::Uuid;

use crate::application::api::ApiTransport;

struct StoredProject {
    project: Project,
    images: Vec<Value>,
}

struct Task {
    project_id: String,
    paths: Vec<String>,
    script: VecDeque<BatchState>,
    current: BatchState,
    published: bool,
}

struct State {
    projects: Vec<StoredProject>,
    tasks: BTreeMap<String, Task>,
    batch_script: Vec<BatchState>,
    species: Vec<Value>,
    failures: Vec<(String, ApiError)>,
    requests: Vec<ApiRequest>,
    next_task: u32,
}

/// An in-memory TrailGuard back end.
pub struct MockBackend {
    state: Mutex<State>,
    latency: Duration,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("latency", &self.latency)
            .field("requests", &self.state().requests.len())
            .finish()
    }
}

impl MockBackend {
    /// An empty back end with a small species catalogue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                projects: Vec::new(),
                tasks: BTreeMap::new(),
                batch_script: vec![BatchState::Pending, BatchState::Running, BatchState::Completed],
                species: vec![
                    json!({"common_name": "Leopard", "scientific_name": "Panthera pardus"}),
                    json!({"common_name": "Impala", "scientific_name": "Aepyceros melampus"}),
                    json!({"common_name": "African Elephant", "scientific_name": "Loxodonta africana"}),
                ],
                failures: Vec::new(),
                requests: Vec::new(),
                next_task: 1,
            }),
            latency: Duration::ZERO,
        }
    }

    /// Delays every response by `latency` (recorded on arrival).
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Adds an existing project.
    #[must_use]
    pub fn with_project(self, id: &str, name: &str) -> Self {
        self.state().projects.push(StoredProject {
            project: Project {
                id: id.to_string(),
                name: name.to_string(),
                description: None,
                created_at: Some(chrono::Utc::now().naive_utc()),
                session_count: 0,
            },
            images: Vec::new(),
        });
        self
    }

    /// Sets the status sequence of batches started from now on.
    pub fn script_batches(&self, states: &[BatchState]) {
        if !states.is_empty() {
            self.state().batch_script = states.to_vec();
        }
    }

    /// Makes the next request to exactly `path` fail with `error`.
    pub fn fail_next(&self, path: &str, error: ApiError) {
        self.state().failures.push((path.to_string(), error));
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.state().requests.clone()
    }

    /// Number of requests received with `method` on exactly `path`.
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.state()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ApiTransport for MockBackend {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        self.state().requests.push(request.clone());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut state = self.state();
        if let Some(i) = state.failures.iter().position(|(path, _)| *path == request.path) {
            return Err(state.failures.remove(i).1);
        }
        state.route(&request)
    }
}

// ── Routing ───────────────────────────────────────────────────────────────────

impl State {
    fn route(&mut self, request: &ApiRequest) -> Result<Value, ApiError> {
        let segments: Vec<String> = request
            .path
            .trim_start_matches('/')
            .split('/')
            .map(|s| urlencoding::decode(s).map_or_else(|_| s.to_string(), |d| d.into_owned()))
            .collect();
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

        match (request.method, segments.as_slice()) {
            (Method::Get, ["health"]) => Ok(json!({"status": "ok"})),
            (Method::Get, ["api", "projects"]) => self.list_projects(),
            (Method::Post, ["api", "projects"]) => self.create_project(request),
            (Method::Get, ["api", "projects", id, "results"]) => self.results(id, request),
            (Method::Get, ["api", "projects", id, "sessions"]) => {
                self.project(id)?;
                Ok(json!([]))
            }
            (Method::Get, ["api", "projects", id, "status"]) => self.status(id, request),
            (Method::Post, ["api", "projects", id, "batch"]) => self.start_batch(id, request),
            (Method::Post, ["api", "analyze", "single"]) => analyze_single(request),
            (Method::Post, ["api", "analyze", "batch"]) => analyze_batch(request),
            (Method::Get, ["api", "species"]) => Ok(Value::from(self.species.clone())),
            _ => Err(detail(404, "Not Found")),
        }
    }

    fn project(&mut self, id: &str) -> Result<&mut StoredProject, ApiError> {
        self.projects
            .iter_mut()
            .find(|p| p.project.id == id)
            .ok_or_else(|| detail(404, "Project not found"))
    }

    fn list_projects(&self) -> Result<Value, ApiError> {
        let projects: Vec<&Project> = self.projects.iter().map(|p| &p.project).collect();
        Ok(serde_json::to_value(projects)?)
    }

    fn create_project(&mut self, request: &ApiRequest) -> Result<Value, ApiError> {
        let name = request
            .query_value("name")
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| detail(422, "query parameter 'name' is required"))?;
        let project = Project {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: request.query_value("description").map(str::to_string),
            created_at: Some(chrono::Utc::now().naive_utc()),
            session_count: 0,
        };
        let mut created = serde_json::to_value(&project)?;
        // The create endpoint does not report a session count.
        if let Some(fields) = created.as_object_mut() {
            fields.remove("session_count");
        }
        self.projects.push(StoredProject {
            project,
            images: Vec::new(),
        });
        Ok(created)
    }

    fn results(&mut self, id: &str, request: &ApiRequest) -> Result<Value, ApiError> {
        let page = query_u32(request, "page", DEFAULT_PAGE)?;
        let limit = query_u32(request, "limit", DEFAULT_LIMIT)?;
        if page < 1 || !(1..=MAX_LIMIT).contains(&limit) {
            return Err(detail(422, "page must be >= 1 and limit within 1..=100"));
        }
        let images = &self.project(id)?.images;

        let mut species_count = BTreeMap::<String, u64>::new();
        for name in images.iter().filter_map(|i| i["species"]["name"].as_str()) {
            *species_count.entry(name.to_string()).or_default() += 1;
        }
        let start = ((page - 1) * limit) as usize;
        let page_images: Vec<&Value> = images.iter().skip(start).take(limit as usize).collect();

        Ok(json!({
            "images": page_images,
            "pagination": {"page": page, "limit": limit, "total": images.len()},
            "statistics": {
                "total_processed": images.len(),
                "animals_detected": images.iter().filter(|i| i["animal_count"].as_u64() > Some(0)).count(),
                "unique_species": species_count.len(),
                "species_count": species_count,
            }
        }))
    }

    fn start_batch(&mut self, id: &str, request: &ApiRequest) -> Result<Value, ApiError> {
        self.project(id)?;
        let paths: Vec<String> = match &request.body {
            RequestBody::Json(body) => serde_json::from_value(body.clone())
                .map_err(|_| detail(422, "body must be a list of image paths"))?,
            _ => return Err(detail(422, "body must be a list of image paths")),
        };

        let task_id = format!("t{}", self.next_task);
        self.next_task += 1;
        self.tasks.insert(
            task_id.clone(),
            Task {
                project_id: id.to_string(),
                paths: paths.clone(),
                script: self.batch_script.iter().copied().collect(),
                current: BatchState::Pending,
                published: false,
            },
        );
        Ok(json!({"task_id": task_id, "status": "pending", "total_images": paths.len()}))
    }

    fn status(&mut self, id: &str, request: &ApiRequest) -> Result<Value, ApiError> {
        let task_id = request
            .query_value("task_id")
            .ok_or_else(|| detail(422, "query parameter 'task_id' is required"))?
            .to_string();
        let task = self
            .tasks
            .get_mut(&task_id)
            .filter(|t| t.project_id == id)
            .ok_or_else(|| detail(404, "Task not found"))?;
        if let Some(next) = task.script.pop_front() {
            task.current = next;
        }
        let status = task.current;
        let total = task.paths.len();

        let output = if status == BatchState::Completed && !task.published {
            task.published = true;
            task.paths.clone()
        } else {
            Vec::new()
        };
        if !output.is_empty() {
            let images = &mut self.project(id)?.images;
            images.extend(output.iter().map(|path| result_image(path)));
        }

        let processed = if status.is_terminal() { total } else { 0 };
        Ok(json!({"task_id": task_id, "status": status, "processed": processed, "total": total}))
    }
}

// ── Analysis ──────────────────────────────────────────────────────────────────

fn analyze_single(request: &ApiRequest) -> Result<Value, ApiError> {
    let file = multipart_parts(request, "file")?
        .into_iter()
        .next()
        .ok_or_else(|| detail(422, "field 'file' is required"))?;
    let ext = extension(&file.file_name);
    if !accepted(file) {
        return Err(detail(
            400,
            &format!("Invalid file format. Allowed: {}", ALLOWED_EXTENSIONS.join(", ")),
        ));
    }
    Ok(json!({
        "success": true,
        "data": detection(&file.file_name),
        "filename": file.file_name,
        "original_format": ext,
        "file_size": file.bytes.len(),
    }))
}

fn analyze_batch(request: &ApiRequest) -> Result<Value, ApiError> {
    let files = multipart_parts(request, "files")?;
    if files.is_empty() {
        return Err(detail(422, "field 'files' is required"));
    }
    let results: Vec<Value> = files
        .iter()
        .map(|file| {
            let ext = extension(&file.file_name);
            if accepted(file) {
                json!({
                    "filename": file.file_name,
                    "success": true,
                    "data": detection(&file.file_name),
                    "original_format": ext,
                })
            } else {
                json!({
                    "filename": file.file_name,
                    "success": false,
                    "error": format!("Invalid format: {ext}"),
                })
            }
        })
        .collect();
    let processed = results.iter().filter(|r| r["success"] == true).count();
    Ok(json!({
        "success": true,
        "total_files": results.len(),
        "processed": processed,
        "failed": results.len() - processed,
        "results": results,
    }))
}

fn multipart_parts<'a>(request: &'a ApiRequest, field: &str) -> Result<Vec<&'a FilePart>, ApiError> {
    match &request.body {
        RequestBody::Multipart(parts) => Ok(parts.iter().filter(|p| p.field == field).collect()),
        _ => Err(detail(422, "multipart body required")),
    }
}

fn accepted(file: &FilePart) -> bool {
    ImageFile::with_content_type(file.file_name.clone(), file.content_type.clone(), Vec::new())
        .has_allowed_extension()
}

fn extension(name: &str) -> String {
    name.rsplit_once('.')
        .map(|(_, ext)| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// A deterministic fake detection: names containing "empty" have no animal.
fn detection(name: &str) -> Value {
    if name.contains("empty") {
        json!({"status": "no_animal", "detections": []})
    } else {
        json!({
            "status": "animal_detected",
            "detections": [{"species": "leopard", "confidence": 0.91}],
        })
    }
}

fn result_image(path: &str) -> Value {
    json!({
        "id": Uuid::new_v4().to_string(),
        "file_path": path,
        "species": {"name": "leopard", "confidence": 0.91},
        "quality_score": 0.8,
        "animal_count": 1,
        "created_at": chrono::Utc::now().naive_utc(),
    })
}

fn query_u32(request: &ApiRequest, name: &str, default: u32) -> Result<u32, ApiError> {
    request.query_value(name).map_or(Ok(default), |v| {
        v.parse()
            .map_err(|_| detail(422, &format!("query parameter '{name}' must be an integer")))
    })
}

fn detail(status: u16, message: &str) -> ApiError {
    ApiError::from_response(status, &json!({ "detail": message }).to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
