//! Client-side validation failures.
//!
//! These are detected before any request is issued, so a validation failure
//! always means "no network call was made".

use thiserror::Error;

/// A request the client refused to send.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The selected file is not an image.
    #[error("'{name}' is not an image (content type {content_type})")]
    NotAnImage { name: String, content_type: String },

    /// The content type of an upload part is not a valid MIME type.
    #[error("'{name}' has an invalid content type '{content_type}'")]
    InvalidContentType { name: String, content_type: String },

    /// A multi-file upload was requested with no files.
    #[error("no images selected")]
    NoImagesSelected,

    /// Project names must contain at least one non-whitespace character.
    #[error("project name must not be empty")]
    EmptyProjectName,

    /// An operation scoped to a project was invoked without one.
    #[error("project id must not be empty")]
    MissingProjectId,

    /// Result pages are numbered from 1.
    #[error("page {0} is out of range (pages start at 1)")]
    PageOutOfRange(u32),

    /// The server caps page sizes.
    #[error("limit {limit} is out of range (1..={max})")]
    LimitOutOfRange { limit: u32, max: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_an_image_message_names_the_file() {
        let err = ValidationError::NotAnImage {
            name: "notes.txt".to_string(),
            content_type: "text/plain".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "'notes.txt' is not an image (content type text/plain)"
        );
    }

    #[test]
    fn test_limit_message_includes_bounds() {
        let err = ValidationError::LimitOutOfRange { limit: 500, max: 100 };
        assert_eq!(err.to_string(), "limit 500 is out of range (1..=100)");
    }
}
