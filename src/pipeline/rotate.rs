//! Page rotation via qpdf.
//!
//! Applies the requested angle to every page. The angle comes from the
//! job's operation, which the state machine restricts to the three
//! rotation-menu choices; any other request shape is reported as a
//! validation failure rather than guessed at.

use super::exec::run_checked;
use super::{JobOutcome, JobRequest, Operation, ToolAdapter};
use async_trait::async_trait;
use tokio::process::Command;

pub struct RotateTool {
    qpdf_bin: String,
}

impl RotateTool {
    pub fn new(qpdf_bin: String) -> Self {
        Self { qpdf_bin }
    }
}

#[async_trait]
impl ToolAdapter for RotateTool {
    fn name(&self) -> &'static str {
        "qpdf"
    }

    async fn run(&self, request: &JobRequest<'_>) -> JobOutcome {
        let angle = match request.operation {
            Operation::Rotate(angle) => angle,
            _ => {
                return JobOutcome::ValidationFailure {
                    reason: "rotate adapter invoked without an angle".into(),
                }
            }
        };

        let input = &request.inputs[0];
        let expected = request.output_dir.join(
            input
                .local_path
                .file_name()
                .unwrap_or(input.local_path.as_os_str()),
        );

        let mut cmd = Command::new(&self.qpdf_bin);
        cmd.arg(&input.local_path)
            .arg(&expected)
            .arg(format!("--rotate=+{}", angle.degrees()));

        run_checked(self.name(), &mut cmd, &expected).await
    }
}
