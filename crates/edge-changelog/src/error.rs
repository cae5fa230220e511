//! Request-level errors.

use http::StatusCode;

use crate::render::RenderError;
use crate::source::SourceError;

/// Why a changelog request could not be served.
#[derive(Debug, thiserror::Error)]
pub enum ChangelogError {
    /// Slug is empty or not in canonical form.
    #[error("invalid product slug '{0}'")]
    InvalidSlug(String),

    /// No published product with this slug.
    #[error("product '{0}' not found")]
    ProductNotFound(String),

    /// The product has no changelog text.
    #[error("no changelog found for '{0}'")]
    EmptyChangelog(String),

    /// Product lookup failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Rendering failed.
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl ChangelogError {
    /// HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidSlug(_) | Self::ProductNotFound(_) | Self::EmptyChangelog(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Source(_) | Self::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ChangelogError::InvalidSlug("A B".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ChangelogError::EmptyChangelog("demo".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ChangelogError::from(SourceError::Unavailable("down".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ChangelogError::from(RenderError::Template("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ChangelogError::ProductNotFound("demo".into()).to_string(),
            "product 'demo' not found"
        );
    }
}
