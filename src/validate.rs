//! Upload validation: pure predicates over `(filename, size, required kind)`.
//!
//! Checks run in a fixed order — extension first, then the size ceiling —
//! and short-circuit on the first failure. Everything here is stateless so
//! the rules can be tested exhaustively without a session or a filesystem.
//!
//! The whitelist covers formats the converter service accepts (documents,
//! spreadsheets, presentations, images, plain text). `.pdf` is deliberately
//! *not* on it: converting a PDF to PDF is a no-op and gets its own
//! rejection, while the compress/rotate/merge flows accept nothing else.

use crate::error::ValidationError;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Hard ceiling on uploaded file size. A file of exactly this many bytes is
/// rejected; acceptance requires strictly fewer.
pub const MAX_FILE_BYTES: u64 = 20 * 1024 * 1024;

/// Extensions the convert flow accepts (lowercase, without the dot).
static SUPPORTED_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // documents
        "doc", "docx", "odt", "rtf", "txt", "md",
        // spreadsheets
        "xls", "xlsx", "ods", "csv",
        // presentations
        "ppt", "pptx", "odp",
        // images
        "jpg", "jpeg", "png", "bmp", "gif", "tiff",
    ]
    .into_iter()
    .collect()
});

/// What the current flow requires of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredKind {
    /// Convert flow: any whitelisted non-PDF format.
    Convertible,
    /// Compress/rotate/merge flows: `.pdf` only.
    Pdf,
}

/// Lowercased extension of a filename, without the dot.
///
/// Returns `None` for names with no dot or an empty trailing segment
/// (`"archive"`, `"noext."`).
pub fn extension_of(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Membership test against the convertible-format whitelist.
pub fn supported_extension(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(ext)
}

/// True when the extension names a PDF.
pub fn is_pdf(ext: &str) -> bool {
    ext.eq_ignore_ascii_case("pdf")
}

/// Strict size gate: accepted only below [`MAX_FILE_BYTES`].
pub fn under_size_limit(size_bytes: u64) -> bool {
    size_bytes < MAX_FILE_BYTES
}

/// Validate an upload for a flow, short-circuiting on the first failure.
///
/// Order: extension check for the required kind, then the size ceiling.
/// The caller decides what each rejection does to the session — only the
/// oversize variant resets the flow.
pub fn validate_upload(
    file_name: &str,
    size_bytes: u64,
    kind: RequiredKind,
) -> Result<(), ValidationError> {
    let ext = extension_of(file_name).unwrap_or_default();

    match kind {
        RequiredKind::Convertible => {
            if is_pdf(&ext) {
                return Err(ValidationError::AlreadyPdf);
            }
            if !supported_extension(&ext) {
                return Err(ValidationError::UnsupportedFormat { extension: ext });
            }
        }
        RequiredKind::Pdf => {
            if !is_pdf(&ext) {
                return Err(ValidationError::NotPdf { extension: ext });
            }
        }
    }

    if !under_size_limit(size_bytes) {
        return Err(ValidationError::OversizeFile {
            size_bytes,
            limit_bytes: MAX_FILE_BYTES,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_parsing() {
        assert_eq!(extension_of("report.DOCX").as_deref(), Some("docx"));
        assert_eq!(extension_of("a.b.c.PdF").as_deref(), Some("pdf"));
        assert_eq!(extension_of("archive"), None);
        assert_eq!(extension_of("noext."), None);
    }

    #[test]
    fn whitelist_has_nineteen_entries_and_no_pdf() {
        assert_eq!(SUPPORTED_EXTENSIONS.len(), 19);
        assert!(!supported_extension("pdf"));
    }

    #[test]
    fn every_whitelisted_extension_converts() {
        for ext in SUPPORTED_EXTENSIONS.iter() {
            let name = format!("file.{ext}");
            assert!(
                validate_upload(&name, 1024, RequiredKind::Convertible).is_ok(),
                "'.{ext}' should be accepted by the convert flow"
            );
        }
    }

    #[test]
    fn convert_rejects_pdf_as_noop() {
        assert_eq!(
            validate_upload("already.pdf", 1024, RequiredKind::Convertible),
            Err(ValidationError::AlreadyPdf)
        );
    }

    #[test]
    fn convert_rejects_unknown_extension() {
        assert_eq!(
            validate_upload("virus.exe", 1024, RequiredKind::Convertible),
            Err(ValidationError::UnsupportedFormat {
                extension: "exe".into()
            })
        );
    }

    #[test]
    fn pdf_flows_reject_everything_else() {
        assert_eq!(
            validate_upload("notes.docx", 1024, RequiredKind::Pdf),
            Err(ValidationError::NotPdf {
                extension: "docx".into()
            })
        );
        assert!(validate_upload("fine.pdf", 1024, RequiredKind::Pdf).is_ok());
    }

    #[test]
    fn size_boundary_is_strict() {
        // Exactly 20 MiB is rejected; one byte less is accepted.
        let limit = MAX_FILE_BYTES;
        assert_eq!(
            validate_upload("big.pdf", limit, RequiredKind::Pdf),
            Err(ValidationError::OversizeFile {
                size_bytes: limit,
                limit_bytes: limit
            })
        );
        assert!(validate_upload("big.pdf", limit - 1, RequiredKind::Pdf).is_ok());
    }

    #[test]
    fn extension_failure_short_circuits_size() {
        // An oversize non-PDF in a PDF flow reports NotPdf, not OversizeFile.
        assert_eq!(
            validate_upload("huge.docx", MAX_FILE_BYTES * 2, RequiredKind::Pdf),
            Err(ValidationError::NotPdf {
                extension: "docx".into()
            })
        );
    }
}
