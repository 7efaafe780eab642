//! Project data-sync hook: the project list, create-project, and the
//! per-project results and sessions.

use trailguard_core::domain::project::Session;
use trailguard_core::protocol::endpoints;
use trailguard_core::{
    ApiError, NewProject, Project, ProjectResults, ResultsPage, ValidationError,
};

use crate::application::api::{request_fetcher, send_decoded, unavailable_fetcher, SharedTransport};
use crate::application::cache::{Mutation, MutationState, Query, QueryOptions, ResourceCache};
use crate::application::keys;

/// Binds the project resources to the cache.
pub struct ProjectSync {
    cache: ResourceCache,
    transport: SharedTransport,
    create: Mutation<Project>,
}

impl ProjectSync {
    pub fn new(cache: ResourceCache, transport: SharedTransport) -> Self {
        Self {
            cache,
            transport,
            create: Mutation::new(),
        }
    }

    /// All projects, under `["projects"]`.  Failures are not retried.
    pub fn list_projects(&self) -> Query<Vec<Project>> {
        self.cache.subscribe(
            keys::projects(),
            request_fetcher(&self.transport, endpoints::list_projects()),
            QueryOptions::default().retry(false),
        )
    }

    /// Creates a project and refreshes the project list.
    ///
    /// # Errors
    ///
    /// [`ValidationError::EmptyProjectName`] (no request is sent) or any
    /// transport error.
    pub async fn create_project(&self, draft: NewProject) -> Result<Project, ApiError> {
        self.create
            .run(async {
                draft.validate()?;
                let write = send_decoded(self.transport.as_ref(), endpoints::create_project(&draft));
                self.cache.mutate(write, &[keys::projects()]).await
            })
            .await
    }

    pub fn is_creating(&self) -> bool {
        self.create.is_loading()
    }

    pub fn create_state(&self) -> MutationState<Project> {
        self.create.state()
    }

    /// One page of a project's results.
    ///
    /// The query is disabled until `project_id` is a non-empty id.
    ///
    /// # Errors
    ///
    /// Rejects a page below 1 or a limit outside `1..=100`.
    pub fn project_results(
        &self,
        project_id: Option<&str>,
        page: ResultsPage,
    ) -> Result<Query<ProjectResults>, ValidationError> {
        let page = ResultsPage::new(page.page, page.limit)?;
        let project_id = project_id.filter(|id| !id.is_empty());
        let fetcher = match project_id {
            Some(id) => request_fetcher(&self.transport, endpoints::project_results(id, page)),
            None => unavailable_fetcher(ValidationError::MissingProjectId.into()),
        };
        Ok(self.cache.subscribe(
            keys::project_results(project_id, page),
            fetcher,
            QueryOptions::default().enabled(project_id.is_some()),
        ))
    }

    /// Survey sessions of a project; disabled until `project_id` is set.
    pub fn project_sessions(&self, project_id: Option<&str>) -> Query<Vec<Session>> {
        let project_id = project_id.filter(|id| !id.is_empty());
        let fetcher = match project_id {
            Some(id) => request_fetcher(&self.transport, endpoints::project_sessions(id)),
            None => unavailable_fetcher(ValidationError::MissingProjectId.into()),
        };
        self.cache.subscribe(
            keys::project_sessions(project_id),
            fetcher,
            QueryOptions::default().enabled(project_id.is_some()),
        )
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mockall::predicate::{eq, function};
    use serde_json::json;
    use trailguard_core::{ApiRequest, Method};

    use super::*;
    use crate::application::api::MockApiTransport;

    fn sync(transport: MockApiTransport) -> ProjectSync {
        ProjectSync::new(ResourceCache::default(), Arc::new(transport))
    }

    #[tokio::test]
    async fn test_list_projects_does_not_retry_failures() {
        // Arrange
        let mut transport = MockApiTransport::new();
        transport
            .expect_send()
            .with(eq(endpoints::list_projects()))
            .times(1)
            .returning(|_| Err(ApiError::Network("connection refused".into())));
        let projects = sync(transport);

        // Act
        let state = projects.list_projects().wait_settled().await;

        // Assert
        assert!(matches!(state.error, Some(ApiError::Network(_))));
        assert!(state.data.is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name_without_request() {
        // Arrange: no expectations, so any request would panic
        let projects = sync(MockApiTransport::new());

        // Act
        let result = projects.create_project(NewProject::named("  ")).await;

        // Assert
        assert_eq!(
            result,
            Err(ApiError::Validation(ValidationError::EmptyProjectName))
        );
        assert!(projects.create_state().error.is_some());
        assert!(!projects.is_creating());
    }

    #[tokio::test]
    async fn test_create_posts_query_string_and_returns_project() {
        let mut transport = MockApiTransport::new();
        transport
            .expect_send()
            .with(function(|req: &ApiRequest| {
                req.method == Method::Post
                    && req.path == "/api/projects"
                    && req.query_value("name") == Some("Kruger")
                    && req.query_value("description").is_none()
            }))
            .times(1)
            .returning(|_| Ok(json!({"id": "p1", "name": "Kruger", "created_at": "2024-03-01T00:00:00"})));
        let projects = sync(transport);

        let created = projects.create_project(NewProject::named("Kruger")).await.unwrap();

        assert_eq!(created.id, "p1");
        assert_eq!(projects.create_state().data.map(|p| p.name), Some("Kruger".to_string()));
    }

    #[tokio::test]
    async fn test_results_without_project_is_disabled() {
        // Arrange: no expectations
        let projects = sync(MockApiTransport::new());

        // Act
        let none = projects.project_results(None, ResultsPage::default()).unwrap();
        let empty = projects.project_results(Some(""), ResultsPage::default()).unwrap();
        let sessions = projects.project_sessions(None);

        // Assert
        assert!(!none.is_enabled());
        assert!(!empty.is_enabled());
        assert!(!sessions.is_enabled());
        assert!(!none.state().is_loading);
    }

    #[tokio::test]
    async fn test_results_rejects_out_of_range_limit() {
        let projects = sync(MockApiTransport::new());

        let result = projects.project_results(Some("p1"), ResultsPage { page: 1, limit: 500 });

        assert!(matches!(
            result,
            Err(ValidationError::LimitOutOfRange { limit: 500, max: 100 })
        ));
    }

    #[tokio::test]
    async fn test_results_fetches_requested_page() {
        let mut transport = MockApiTransport::new();
        transport
            .expect_send()
            .with(eq(endpoints::project_results("p1", ResultsPage { page: 2, limit: 10 })))
            .times(1)
            .returning(|_| {
                Ok(json!({
                    "images": [],
                    "pagination": {"page": 2, "limit": 10, "total": 12},
                    "statistics": {}
                }))
            });
        let projects = sync(transport);

        let mut query = projects
            .project_results(Some("p1"), ResultsPage { page: 2, limit: 10 })
            .unwrap();
        let state = query.wait_settled().await;

        assert_eq!(
            query.key().to_string(),
            r#"["projects","p1","results",2,10]"#
        );
        assert_eq!(state.data.map(|r| r.pagination.total), Some(12));
    }
}
