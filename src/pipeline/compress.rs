//! PDF compression via Ghostscript.
//!
//! `pdfwrite` with `/ebook` downsamples embedded images to 150 DPI, which
//! is where scanned documents shrink the most while staying readable on
//! screen. The output keeps the input's basename under the job's output
//! directory.

use super::exec::run_checked;
use super::{JobOutcome, JobRequest, ToolAdapter};
use async_trait::async_trait;
use tokio::process::Command;

pub struct CompressTool {
    gs_bin: String,
}

impl CompressTool {
    pub fn new(gs_bin: String) -> Self {
        Self { gs_bin }
    }
}

#[async_trait]
impl ToolAdapter for CompressTool {
    fn name(&self) -> &'static str {
        "ghostscript"
    }

    async fn run(&self, request: &JobRequest<'_>) -> JobOutcome {
        let input = &request.inputs[0];
        let expected = request.output_dir.join(
            input
                .local_path
                .file_name()
                .unwrap_or(input.local_path.as_os_str()),
        );

        let mut cmd = Command::new(&self.gs_bin);
        cmd.arg("-q")
            .arg("-dNOPAUSE")
            .arg("-dBATCH")
            .arg("-dSAFER")
            .arg("-sDEVICE=pdfwrite")
            .arg("-dPDFSETTINGS=/ebook")
            .arg(format!("-sOutputFile={}", expected.display()))
            .arg(&input.local_path);

        run_checked(self.name(), &mut cmd, &expected).await
    }
}
