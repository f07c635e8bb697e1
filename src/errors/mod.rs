//! Errors for signpdf
//!
//! Every error is terminal for the action that triggered it: nothing is retried
//! and no session state is left half-updated.

use std::fmt;

use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

use crate::render::PageIndex;

pub type Result<T> = std::result::Result<T, SignError>;

/// Which input was absent when an action needed it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingInput {
    Document,
    Signature,
    Placement,
}

impl fmt::Display for MissingInput {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::MissingInput::*;
        let msg = match self {
            Document => "upload a PDF document first",
            Signature => "upload a signature image first",
            Placement => "drag a rectangle on the page to place the signature first",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignError {
    /// An action needs an input the user has not provided yet
    #[error("{0}")]
    MissingInput(MissingInput),

    /// The rendering collaborator could not rasterize a page
    #[error("failed to render page {page}: {reason}")]
    RenderFailure { page: PageIndex, reason: String },

    /// A selection with zero or negative area
    #[error("the selected area is empty")]
    DegenerateSelection,

    /// Writing the signed document failed, no output was produced
    #[error("failed to save the signed document: {0}")]
    SerializationFailure(String),

    #[error("invalid PDF document: {0}")]
    InvalidDocument(String),

    #[error("invalid signature image: {0}")]
    InvalidSignature(String),

    #[error("page {page} does not exist, the document has {page_count} pages")]
    PageOutOfRange { page: PageIndex, page_count: usize },

    #[error("invalid options: {0}")]
    InvalidOptions(String),
}

impl From<MissingInput> for SignError {
    fn from(value: MissingInput) -> Self {
        SignError::MissingInput(value)
    }
}

impl SignError {
    /// Errors the user can fix by providing more input, as opposed to failures.
    pub fn is_prompt(&self) -> bool {
        matches!(self, SignError::MissingInput(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_signature_reads_as_prompt() {
        let err: SignError = MissingInput::Signature.into();
        assert!(err.is_prompt());
        assert_eq!(err.to_string(), "upload a signature image first");
    }

    #[test]
    fn render_failure_mentions_page() {
        let err = SignError::RenderFailure {
            page: PageIndex::FIRST,
            reason: "corrupt content stream".to_string(),
        };
        assert!(!err.is_prompt());
        assert_eq!(
            err.to_string(),
            "failed to render page 1: corrupt content stream"
        );
    }

    #[test]
    fn page_out_of_range_message() {
        let err = SignError::PageOutOfRange {
            page: PageIndex(4),
            page_count: 3,
        };
        assert_eq!(
            err.to_string(),
            "page 4 does not exist, the document has 3 pages"
        );
    }
}
