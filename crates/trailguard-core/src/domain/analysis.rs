//! Image uploads and the analysis documents returned for them.
//!
//! The analysis payload is owned by the detection model on the server and is
//! treated as opaque JSON here.  The client only needs to pretty-print it and
//! to peek at the `success`/`error` envelope fields when they are present.

use serde::{Deserialize, Serialize};

use crate::domain::validation::ValidationError;

/// File extensions the analysis endpoints accept.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "tiff", "gif"];

/// Guesses a MIME type from a file name's extension.
///
/// Unknown extensions map to `application/octet-stream`, which is then
/// rejected by [`ImageFile::ensure_image`].
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "txt" => "text/plain",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

/// An in-memory file chosen for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ImageFile {
    /// Wraps file contents, inferring the content type from `name`.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let content_type = content_type_for(&name).to_string();
        Self {
            name,
            content_type,
            bytes,
        }
    }

    /// Wraps file contents with an explicit content type (e.g. from a
    /// drag-and-drop payload).
    pub fn with_content_type(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// `true` when the content type is `image/*`.
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    /// `true` when the extension is one the server will process.
    pub fn has_allowed_extension(&self) -> bool {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    /// Rejects anything that is not an image.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NotAnImage`].
    pub fn ensure_image(&self) -> Result<(), ValidationError> {
        if self.is_image() {
            Ok(())
        } else {
            Err(ValidationError::NotAnImage {
                name: self.name.clone(),
                content_type: self.content_type.clone(),
            })
        }
    }
}

/// Raw payload returned by `POST /api/analyze/single`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisResult(pub serde_json::Value);

impl AnalysisResult {
    /// The `success` flag of the response envelope, if present.
    pub fn succeeded(&self) -> Option<bool> {
        self.0.get("success").and_then(serde_json::Value::as_bool)
    }

    /// The `error` message of the response envelope, if present.
    pub fn error_message(&self) -> Option<&str> {
        self.0.get("error").and_then(serde_json::Value::as_str)
    }

    /// Pretty-printed JSON for display.
    pub fn pretty(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| self.0.to_string())
    }
}

/// Per-file entry of a multi-image analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub filename: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_format: Option<String>,
}

/// Document returned by `POST /api/analyze/batch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchAnalysisSummary {
    pub success: bool,
    pub total_files: u32,
    pub processed: u32,
    pub failed: u32,
    #[serde(default)]
    pub results: Vec<FileAnalysis>,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
