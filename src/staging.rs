//! Temp-file lifecycle: materialize uploads locally, release artifacts.
//!
//! Staged inputs live under the configured input root, keyed by the
//! platform file id plus the original name so two users uploading
//! `report.pdf` at the same moment never clobber each other. After the
//! download the file is stat-checked — platforms occasionally report
//! success for a truncated or missing transfer, and catching that here
//! turns it into a clean [`BotError::StagingFailed`] instead of a tool
//! failure later.
//!
//! Deletion is ownership-driven: the returned [`StagedFile`] (and the
//! pipeline's output artifact) each remove their file exactly once, on drop.

use crate::chat::{ChatApi, DocumentRef};
use crate::error::BotError;
use crate::session::StagedFile;
use std::path::PathBuf;
use tracing::debug;

/// Downloads uploads into the input root.
pub struct Stager {
    input_root: PathBuf,
}

impl Stager {
    pub fn new(input_root: impl Into<PathBuf>) -> Self {
        Self {
            input_root: input_root.into(),
        }
    }

    /// Materialize a platform document locally and take ownership of it.
    ///
    /// # Errors
    /// [`BotError::DownloadFailed`] when the transport download fails,
    /// [`BotError::StagingFailed`] when the downloaded file is absent or
    /// unreadable afterwards.
    pub async fn stage(
        &self,
        api: &dyn ChatApi,
        document: &DocumentRef,
    ) -> Result<StagedFile, BotError> {
        let local_path = self.staging_path(document);

        api.download_file(&document.file_id, &local_path).await?;

        let meta = tokio::fs::metadata(&local_path)
            .await
            .map_err(|source| BotError::StagingFailed {
                path: local_path.clone(),
                source,
            })?;

        debug!(
            "staged '{}' as {} ({} bytes)",
            document.file_name,
            local_path.display(),
            meta.len()
        );

        Ok(StagedFile {
            file_id: document.file_id.clone(),
            original_name: document.file_name.clone(),
            local_path,
            size_bytes: meta.len(),
        })
    }

    /// Collision-resistant staging path: `<input_root>/<file_id>_<name>`.
    fn staging_path(&self, document: &DocumentRef) -> PathBuf {
        let safe_name = sanitize_name(&document.file_name);
        self.input_root
            .join(format!("{}_{}", document.file_id, safe_name))
    }
}

/// Strip path separators from a user-supplied filename so it cannot escape
/// the input root.
fn sanitize_name(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Keyboard;
    use async_trait::async_trait;
    use std::path::Path;

    /// Transport stub: "downloads" by writing a fixed payload.
    struct WritingApi {
        payload: Vec<u8>,
    }

    #[async_trait]
    impl ChatApi for WritingApi {
        async fn send_message(
            &self,
            _chat_id: i64,
            _text: &str,
            _keyboard: Option<&Keyboard>,
        ) -> Result<(), BotError> {
            Ok(())
        }

        async fn send_document(
            &self,
            _chat_id: i64,
            _local_path: &Path,
            _display_name: &str,
        ) -> Result<(), BotError> {
            Ok(())
        }

        async fn download_file(&self, _file_id: &str, dest: &Path) -> Result<(), BotError> {
            std::fs::write(dest, &self.payload).map_err(|e| BotError::DownloadFailed {
                file_id: "x".into(),
                detail: e.to_string(),
            })
        }
    }

    /// Transport stub: claims success without writing anything.
    struct LyingApi;

    #[async_trait]
    impl ChatApi for LyingApi {
        async fn send_message(
            &self,
            _chat_id: i64,
            _text: &str,
            _keyboard: Option<&Keyboard>,
        ) -> Result<(), BotError> {
            Ok(())
        }

        async fn send_document(
            &self,
            _chat_id: i64,
            _local_path: &Path,
            _display_name: &str,
        ) -> Result<(), BotError> {
            Ok(())
        }

        async fn download_file(&self, _file_id: &str, _dest: &Path) -> Result<(), BotError> {
            Ok(())
        }
    }

    fn doc(file_id: &str, name: &str) -> DocumentRef {
        DocumentRef {
            file_id: file_id.into(),
            file_name: name.into(),
            size_bytes: 3,
        }
    }

    #[tokio::test]
    async fn stages_under_id_prefixed_name() {
        let dir = tempfile::tempdir().unwrap();
        let stager = Stager::new(dir.path());
        let api = WritingApi {
            payload: b"%PDF".to_vec(),
        };

        let staged = stager.stage(&api, &doc("AgAD42", "report.pdf")).await.unwrap();
        assert_eq!(
            staged.local_path.file_name().unwrap().to_str().unwrap(),
            "AgAD42_report.pdf"
        );
        assert_eq!(staged.size_bytes, 4);
        assert!(staged.local_path.exists());
    }

    #[tokio::test]
    async fn same_name_different_ids_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let stager = Stager::new(dir.path());
        let api = WritingApi {
            payload: b"x".to_vec(),
        };

        let a = stager.stage(&api, &doc("id1", "report.pdf")).await.unwrap();
        let b = stager.stage(&api, &doc("id2", "report.pdf")).await.unwrap();
        assert_ne!(a.local_path, b.local_path);
    }

    #[tokio::test]
    async fn missing_file_after_download_is_staging_error() {
        let dir = tempfile::tempdir().unwrap();
        let stager = Stager::new(dir.path());

        let err = stager
            .stage(&LyingApi, &doc("id9", "ghost.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::StagingFailed { .. }));
    }

    #[test]
    fn sanitizes_path_separators() {
        assert_eq!(sanitize_name("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_name(r"c:\evil.pdf"), "c:_evil.pdf");
    }
}
