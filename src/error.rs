//! Error types for the pdfmate core.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ValidationError`] — **Recoverable**: the uploaded file cannot be used
//!   for the requested operation (wrong extension, too large). The user gets
//!   a retry prompt; depending on the variant the conversation state is
//!   preserved or reset, per the transition table in [`crate::engine`].
//!
//! * [`BotError`] — **Session-ending**: staging, transport, or an external
//!   tool went wrong in a way the user cannot fix by picking a different
//!   file. The session is cleared and a generic failure message is sent.
//!
//! Nothing in this taxonomy is process-fatal: every path ends either in a
//! retry-in-place reprompt or a full session reset with a visible reply.

use std::path::PathBuf;
use thiserror::Error;

/// Recoverable rejection of an uploaded file.
///
/// Variants map one-to-one to the user-facing retry prompts. Whether the
/// session survives the rejection depends on the variant: oversize files
/// reset the flow, everything else allows retry in place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Extension is neither on the convertible whitelist nor `.pdf`.
    #[error("unsupported file format: '.{extension}'")]
    UnsupportedFormat { extension: String },

    /// A `.pdf` was uploaded to the convert flow — converting it is a no-op.
    #[error("file is already a PDF")]
    AlreadyPdf,

    /// Compress/rotate/merge require a `.pdf`, got something else.
    #[error("expected a PDF file, got '.{extension}'")]
    NotPdf { extension: String },

    /// File meets or exceeds the 20 MiB ceiling.
    #[error("file is too large: {size_bytes} bytes (limit {limit_bytes})")]
    OversizeFile { size_bytes: u64, limit_bytes: u64 },
}

/// All session-ending errors in the pdfmate core.
///
/// Recoverable upload rejections use [`ValidationError`] instead and never
/// appear here.
#[derive(Debug, Error)]
pub enum BotError {
    // ── Staging errors ────────────────────────────────────────────────────
    /// The platform download failed before a local file existed.
    #[error("failed to download file '{file_id}': {detail}")]
    DownloadFailed { file_id: String, detail: String },

    /// A downloaded input is absent or unreadable at its staging path.
    #[error("staged file missing or unreadable: '{}'", path.display())]
    StagingFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Transport errors ──────────────────────────────────────────────────
    /// The chat platform rejected an outbound message or document.
    #[error("chat transport error: {detail}")]
    Transport { detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or environment validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_format_display() {
        let e = ValidationError::UnsupportedFormat {
            extension: "exe".into(),
        };
        assert!(e.to_string().contains(".exe"), "got: {e}");
    }

    #[test]
    fn oversize_display_carries_both_sizes() {
        let e = ValidationError::OversizeFile {
            size_bytes: 30 * 1024 * 1024,
            limit_bytes: 20 * 1024 * 1024,
        };
        let msg = e.to_string();
        assert!(msg.contains("31457280"));
        assert!(msg.contains("20971520"));
    }

    #[test]
    fn not_pdf_display() {
        let e = ValidationError::NotPdf {
            extension: "docx".into(),
        };
        assert!(e.to_string().contains(".docx"));
    }

    #[test]
    fn download_failed_display() {
        let e = BotError::DownloadFailed {
            file_id: "AgAD42".into(),
            detail: "connection reset".into(),
        };
        assert!(e.to_string().contains("AgAD42"));
        assert!(e.to_string().contains("connection reset"));
    }

    #[test]
    fn staging_failed_has_source() {
        use std::error::Error as _;
        let e = BotError::StagingFailed {
            path: PathBuf::from("/tmp/in/x.pdf"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("/tmp/in/x.pdf"));
    }
}
