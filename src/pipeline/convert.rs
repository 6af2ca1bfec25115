//! Office-document-to-PDF conversion.
//!
//! Two adapters satisfy the same contract, mirroring the two deployment
//! shapes the bot has run in:
//!
//! * [`SofficeConvertTool`] — all-in-one container, LibreOffice invoked
//!   headless as a subprocess.
//! * [`HttpConvertTool`] — a dedicated converter container exposing an
//!   HTTP endpoint; the document goes out as a multipart upload and the
//!   PDF comes back in the response body.
//!
//! Either way the artifact lands at `<output_dir>/<stem>.pdf`, where the
//! stem already carries the staging id prefix, so concurrent conversions
//! of files with equal names cannot collide.

use super::exec::run_checked;
use super::{JobOutcome, JobRequest, OutputArtifact, ToolAdapter};
use crate::session::StagedFile;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::warn;

/// Where the converted PDF is expected for a given staged input.
fn expected_pdf(input: &StagedFile, output_dir: &Path) -> PathBuf {
    let stem = input
        .local_path
        .file_stem()
        .unwrap_or(input.local_path.as_os_str());
    output_dir.join(Path::new(stem).with_extension("pdf"))
}

// ── Subprocess variant ───────────────────────────────────────────────────

pub struct SofficeConvertTool {
    soffice_bin: String,
}

impl SofficeConvertTool {
    pub fn new(soffice_bin: String) -> Self {
        Self { soffice_bin }
    }
}

#[async_trait]
impl ToolAdapter for SofficeConvertTool {
    fn name(&self) -> &'static str {
        "libreoffice"
    }

    async fn run(&self, request: &JobRequest<'_>) -> JobOutcome {
        let input = &request.inputs[0];
        let expected = expected_pdf(input, request.output_dir);

        let mut cmd = Command::new(&self.soffice_bin);
        cmd.arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(request.output_dir)
            .arg(&input.local_path);

        run_checked(self.name(), &mut cmd, &expected).await
    }
}

// ── HTTP variant ─────────────────────────────────────────────────────────

pub struct HttpConvertTool {
    client: reqwest::Client,
    url: String,
}

impl HttpConvertTool {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl ToolAdapter for HttpConvertTool {
    fn name(&self) -> &'static str {
        "converter-service"
    }

    async fn run(&self, request: &JobRequest<'_>) -> JobOutcome {
        let input = &request.inputs[0];
        let expected = expected_pdf(input, request.output_dir);

        let bytes = match tokio::fs::read(&input.local_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(
                    "{}: cannot read staged input {}: {e}",
                    self.name(),
                    input.local_path.display()
                );
                return JobOutcome::ToolFailure {
                    tool: self.name(),
                    code: None,
                };
            }
        };

        let part = reqwest::multipart::Part::bytes(bytes).file_name(input.original_name.clone());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = match self.client.post(&self.url).multipart(form).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("{}: request to {} failed: {e}", self.name(), self.url);
                return JobOutcome::ToolFailure {
                    tool: self.name(),
                    code: None,
                };
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("{}: converter returned HTTP {status}", self.name());
            return JobOutcome::ToolFailure {
                tool: self.name(),
                code: Some(status.as_u16() as i32),
            };
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                warn!("{}: reading converter response failed: {e}", self.name());
                return JobOutcome::ToolFailure {
                    tool: self.name(),
                    code: None,
                };
            }
        };

        if let Err(e) = tokio::fs::write(&expected, &body).await {
            warn!(
                "{}: writing {} failed: {e}",
                self.name(),
                expected.display()
            );
            return JobOutcome::ToolFailure {
                tool: self.name(),
                code: None,
            };
        }

        if !expected.exists() {
            return JobOutcome::MissingOutput { expected };
        }
        JobOutcome::Success(OutputArtifact::new(expected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_pdf_swaps_extension_and_keeps_prefix() {
        let input = StagedFile {
            file_id: "AgAD42".into(),
            original_name: "report.docx".into(),
            local_path: PathBuf::from("/in/AgAD42_report.docx"),
            size_bytes: 1,
        };
        assert_eq!(
            expected_pdf(&input, Path::new("/out")),
            PathBuf::from("/out/AgAD42_report.pdf")
        );
    }
}
