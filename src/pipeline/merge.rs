//! Two-document PDF merge via qpdf.
//!
//! Pages of the second input are appended after the first; the artifact
//! keeps the first input's basename under the output directory.

use super::exec::run_checked;
use super::{JobOutcome, JobRequest, ToolAdapter};
use async_trait::async_trait;
use tokio::process::Command;

pub struct MergeTool {
    qpdf_bin: String,
}

impl MergeTool {
    pub fn new(qpdf_bin: String) -> Self {
        Self { qpdf_bin }
    }
}

#[async_trait]
impl ToolAdapter for MergeTool {
    fn name(&self) -> &'static str {
        "qpdf"
    }

    async fn run(&self, request: &JobRequest<'_>) -> JobOutcome {
        let first = &request.inputs[0];
        let second = &request.inputs[1];
        let expected = request.output_dir.join(
            first
                .local_path
                .file_name()
                .unwrap_or(first.local_path.as_os_str()),
        );

        let mut cmd = Command::new(&self.qpdf_bin);
        cmd.arg("--empty")
            .arg("--pages")
            .arg(&first.local_path)
            .arg(&second.local_path)
            .arg("--")
            .arg(&expected);

        run_checked(self.name(), &mut cmd, &expected).await
    }
}
