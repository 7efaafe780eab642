//! Image upload and analysis hook.
//!
//! Analysis is a one-shot write: results are not cached, only held in a
//! [`Mutation`] so a view can show progress, the last result, or the last
//! error.  Selecting a new file resets that state so an old result is never
//! shown next to a new image.

use std::sync::Mutex;

use tracing::debug;
use trailguard_core::domain::analysis::{AnalysisResult, BatchAnalysisSummary, ImageFile};
use trailguard_core::protocol::endpoints;
use trailguard_core::{ApiError, ValidationError};

use crate::application::api::{send_decoded, SharedTransport};
use crate::application::cache::{Mutation, MutationState};

pub struct ImageAnalysis {
    transport: SharedTransport,
    selected: Mutex<Option<ImageFile>>,
    single: Mutation<AnalysisResult>,
    batch: Mutation<BatchAnalysisSummary>,
}

impl ImageAnalysis {
    pub fn new(transport: SharedTransport) -> Self {
        Self {
            transport,
            selected: Mutex::new(None),
            single: Mutation::new(),
            batch: Mutation::new(),
        }
    }

    /// Makes `file` the current selection.
    ///
    /// Only images are accepted.  On rejection the previous selection and
    /// any previous result stay as they were.
    ///
    /// # Errors
    ///
    /// [`ValidationError::NotAnImage`].
    pub fn select_file(&self, file: ImageFile) -> Result<(), ValidationError> {
        file.ensure_image()?;
        self.reset();
        debug!(name = %file.name, content_type = %file.content_type, "image selected");
        *self.selection() = Some(file);
        Ok(())
    }

    pub fn selected_file(&self) -> Option<ImageFile> {
        self.selection().clone()
    }

    /// Clears the last result and error.  An analysis still running will not
    /// publish its result.
    pub fn reset(&self) {
        self.single.reset();
        self.batch.reset();
    }

    /// Uploads `file` (multipart field `file`) and returns the raw analysis.
    ///
    /// # Errors
    ///
    /// [`ValidationError::NotAnImage`] (no request is sent) or any transport
    /// error.
    pub async fn analyze_image(&self, file: &ImageFile) -> Result<AnalysisResult, ApiError> {
        self.single
            .run(async {
                file.ensure_image()?;
                send_decoded(self.transport.as_ref(), endpoints::analyze_single(file)).await
            })
            .await
    }

    /// Analyzes the current selection.
    ///
    /// # Errors
    ///
    /// [`ValidationError::NoImagesSelected`] when nothing is selected, or any
    /// error of [`analyze_image`](Self::analyze_image).
    pub async fn analyze_selected(&self) -> Result<AnalysisResult, ApiError> {
        let file = self
            .selected_file()
            .ok_or(ApiError::Validation(ValidationError::NoImagesSelected))?;
        self.analyze_image(&file).await
    }

    /// Uploads several images in one request (`files` fields).
    ///
    /// # Errors
    ///
    /// [`ValidationError::NoImagesSelected`] for an empty list,
    /// [`ValidationError::NotAnImage`] for the first non-image, or any
    /// transport error.
    pub async fn analyze_images(&self, files: &[ImageFile]) -> Result<BatchAnalysisSummary, ApiError> {
        self.batch
            .run(async {
                if files.is_empty() {
                    return Err(ApiError::from(ValidationError::NoImagesSelected));
                }
                for file in files {
                    file.ensure_image()?;
                }
                send_decoded(self.transport.as_ref(), endpoints::analyze_batch(files)).await
            })
            .await
    }

    pub fn state(&self) -> MutationState<AnalysisResult> {
        self.single.state()
    }

    pub fn batch_state(&self) -> MutationState<BatchAnalysisSummary> {
        self.batch.state()
    }

    pub fn is_analyzing(&self) -> bool {
        self.single.is_loading() || self.batch.is_loading()
    }

    fn selection(&self) -> std::sync::MutexGuard<'_, Option<ImageFile>> {
        self.selected
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mockall::predicate::function;
    use serde_json::json;
    use trailguard_core::{ApiRequest, RequestBody};

    use super::*;
    use crate::application::api::MockApiTransport;

    fn jpeg(name: &str) -> ImageFile {
        ImageFile::new(name, vec![0xFF, 0xD8, 0xFF])
    }

    #[test]
    fn test_select_non_image_keeps_previous_selection() {
        // Arrange: no expectations, so any request would panic
        let analysis = ImageAnalysis::new(Arc::new(MockApiTransport::new()));
        analysis.select_file(jpeg("leopard.jpg")).unwrap();

        // Act
        let result = analysis.select_file(ImageFile::new("notes.txt", b"hi".to_vec()));

        // Assert
        assert!(matches!(result, Err(ValidationError::NotAnImage { .. })));
        assert_eq!(analysis.selected_file().map(|f| f.name), Some("leopard.jpg".to_string()));
    }

    #[test]
    fn test_select_non_image_on_empty_selection_leaves_it_empty() {
        let analysis = ImageAnalysis::new(Arc::new(MockApiTransport::new()));

        let result = analysis.select_file(ImageFile::new("clip.mp4", vec![0]));

        assert!(result.is_err());
        assert!(analysis.selected_file().is_none());
    }

    #[tokio::test]
    async fn test_analyze_selected_uploads_file_field() {
        // Arrange
        let mut transport = MockApiTransport::new();
        transport
            .expect_send()
            .with(function(|req: &ApiRequest| {
                req.path == "/api/analyze/single"
                    && matches!(&req.body, RequestBody::Multipart(parts)
                        if parts.len() == 1 && parts[0].field == "file")
            }))
            .times(1)
            .returning(|_| Ok(json!({"success": true, "data": {"status": "animal_detected"}})));
        let analysis = ImageAnalysis::new(Arc::new(transport));
        analysis.select_file(jpeg("leopard.jpg")).unwrap();

        // Act
        let result = analysis.analyze_selected().await.unwrap();

        // Assert
        assert_eq!(result.succeeded(), Some(true));
        assert_eq!(analysis.state().data, Some(result));
    }

    #[tokio::test]
    async fn test_analyze_without_selection_is_rejected() {
        let analysis = ImageAnalysis::new(Arc::new(MockApiTransport::new()));

        let result = analysis.analyze_selected().await;

        assert_eq!(
            result,
            Err(ApiError::Validation(ValidationError::NoImagesSelected))
        );
    }

    #[tokio::test]
    async fn test_server_error_message_is_propagated() {
        let mut transport = MockApiTransport::new();
        transport
            .expect_send()
            .returning(|_| Err(ApiError::from_response(400, r#"{"detail":"Invalid image format"}"#)));
        let analysis = ImageAnalysis::new(Arc::new(transport));

        let err = analysis.analyze_image(&jpeg("a.jpg")).await.unwrap_err();

        assert_eq!(err.to_string(), "server returned 400: Invalid image format");
        assert_eq!(analysis.state().error, Some(err));
    }

    #[tokio::test]
    async fn test_new_selection_clears_previous_result() {
        // Arrange
        let mut transport = MockApiTransport::new();
        transport
            .expect_send()
            .returning(|_| Ok(json!({"success": true})));
        let analysis = ImageAnalysis::new(Arc::new(transport));
        analysis.select_file(jpeg("a.jpg")).unwrap();
        analysis.analyze_selected().await.unwrap();

        // Act
        analysis.select_file(jpeg("b.jpg")).unwrap();

        // Assert
        assert_eq!(analysis.state(), MutationState::default());
    }

    #[tokio::test]
    async fn test_analyze_images_requires_images() {
        let analysis = ImageAnalysis::new(Arc::new(MockApiTransport::new()));

        let empty = analysis.analyze_images(&[]).await;
        let mixed = analysis
            .analyze_images(&[jpeg("a.jpg"), ImageFile::new("b.txt", vec![])])
            .await;

        assert_eq!(empty, Err(ApiError::Validation(ValidationError::NoImagesSelected)));
        assert!(matches!(
            mixed,
            Err(ApiError::Validation(ValidationError::NotAnImage { .. }))
        ));
    }

    #[tokio::test]
    async fn test_analyze_images_returns_summary() {
        let mut transport = MockApiTransport::new();
        transport
            .expect_send()
            .with(function(|req: &ApiRequest| req.path == "/api/analyze/batch"))
            .times(1)
            .returning(|_| {
                Ok(json!({"success": true, "total_files": 2, "processed": 2, "failed": 0, "results": []}))
            });
        let analysis = ImageAnalysis::new(Arc::new(transport));

        let summary = analysis
            .analyze_images(&[jpeg("a.jpg"), jpeg("b.jpg")])
            .await
            .unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(analysis.batch_state().data, Some(summary));
    }
}
