//! Transformation pipeline: a uniform adapter contract over four operations.
//!
//! Each submodule wraps exactly one external tool behind the same
//! [`ToolAdapter`] shape, so the state machine can run any job the same way
//! and the concrete invocation mechanism (subprocess, HTTP service) stays an
//! implementation detail behind the seam.
//!
//! ## Data Flow
//!
//! ```text
//! JobRequest ──▶ Pipeline::execute ──▶ adapter ──▶ JobOutcome
//! (op + staged    (worker-pool        (gs / soffice /
//!  inputs)         permit)             qpdf / HTTP)
//! ```
//!
//! External tools are the only blocking work in the system; `execute`
//! acquires a permit from a bounded semaphore first, which is the process's
//! sole admission control. Adapters never mutate their inputs and write
//! only under the request's output directory. Tools are not fully trusted:
//! a zero exit status with no artifact on disk is reported as
//! [`JobOutcome::MissingOutput`], not success.

pub mod compress;
pub mod convert;
pub mod exec;
pub mod merge;
pub mod rotate;

use crate::config::BotConfig;
use crate::session::StagedFile;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Rotation amount, restricted to the three menu choices.
///
/// 270 is the canonical representation of "rotate left 90°".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateAngle {
    Deg90,
    Deg180,
    Deg270,
}

impl RotateAngle {
    /// Map a rotation-menu token to its angle: left → 270, right → 90,
    /// full → 180.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "left" => Some(RotateAngle::Deg270),
            "right" => Some(RotateAngle::Deg90),
            "full" => Some(RotateAngle::Deg180),
            _ => None,
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            RotateAngle::Deg90 => 90,
            RotateAngle::Deg180 => 180,
            RotateAngle::Deg270 => 270,
        }
    }
}

/// One transformation the pipeline can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ToPdf,
    Compress,
    Rotate(RotateAngle),
    Merge,
}

impl Operation {
    /// How many staged inputs this operation consumes.
    pub fn input_count(self) -> usize {
        match self {
            Operation::Merge => 2,
            _ => 1,
        }
    }
}

/// Transient description of one pipeline invocation.
///
/// Inputs stay owned by the session that staged them; the request only
/// borrows them for the duration of the job.
#[derive(Debug)]
pub struct JobRequest<'a> {
    pub operation: Operation,
    pub inputs: &'a [StagedFile],
    pub output_dir: &'a Path,
}

/// A produced artifact, deleted exactly once when dropped.
///
/// The engine drops it right after delivery (or after a failed delivery),
/// so no orphaned output accumulates per completed job.
#[derive(Debug)]
pub struct OutputArtifact {
    path: PathBuf,
}

impl OutputArtifact {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for OutputArtifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("released output {}", self.path.display()),
            Err(e) => warn!("failed to remove output {}: {e}", self.path.display()),
        }
    }
}

/// Result of one pipeline invocation.
#[derive(Debug)]
pub enum JobOutcome {
    /// The tool succeeded and the artifact exists.
    Success(OutputArtifact),
    /// The external tool reported failure (non-zero exit, HTTP error,
    /// or it could not be invoked at all — then `code` is `None`).
    ToolFailure {
        tool: &'static str,
        code: Option<i32>,
    },
    /// The tool claimed success but the expected artifact is absent.
    MissingOutput { expected: PathBuf },
    /// The request itself was malformed (wrong input arity).
    ValidationFailure { reason: String },
}

/// Uniform contract every operation implements.
///
/// Implementations differ only in which external tool they drive and how
/// many inputs they expect. They must not mutate inputs in place and must
/// write only under `request.output_dir`.
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    /// Tool name used in logs and failure reports.
    fn name(&self) -> &'static str;

    /// Run the job. Infallible at the type level: every failure mode is a
    /// [`JobOutcome`] variant so callers handle exactly one shape.
    async fn run(&self, request: &JobRequest<'_>) -> JobOutcome;
}

/// Front door to the four adapters, with the worker-pool cap.
pub struct Pipeline {
    permits: Semaphore,
    to_pdf: Box<dyn ToolAdapter>,
    compress: Box<dyn ToolAdapter>,
    rotate: Box<dyn ToolAdapter>,
    merge: Box<dyn ToolAdapter>,
}

impl Pipeline {
    /// Production wiring from configuration.
    ///
    /// Conversion goes over HTTP when `converter_url` is configured,
    /// otherwise through a local LibreOffice subprocess — both satisfy the
    /// same adapter contract.
    pub fn from_config(config: &BotConfig) -> Self {
        let to_pdf: Box<dyn ToolAdapter> = match &config.converter_url {
            Some(url) => Box::new(convert::HttpConvertTool::new(url.clone())),
            None => Box::new(convert::SofficeConvertTool::new(config.soffice_bin.clone())),
        };
        Self {
            permits: Semaphore::new(config.workers),
            to_pdf,
            compress: Box::new(compress::CompressTool::new(config.ghostscript_bin.clone())),
            rotate: Box::new(rotate::RotateTool::new(config.qpdf_bin.clone())),
            merge: Box::new(merge::MergeTool::new(config.qpdf_bin.clone())),
        }
    }

    /// Wire arbitrary adapters (tests, alternative deployments).
    pub fn with_adapters(
        workers: usize,
        to_pdf: Box<dyn ToolAdapter>,
        compress: Box<dyn ToolAdapter>,
        rotate: Box<dyn ToolAdapter>,
        merge: Box<dyn ToolAdapter>,
    ) -> Self {
        Self {
            permits: Semaphore::new(workers.max(1)),
            to_pdf,
            compress,
            rotate,
            merge,
        }
    }

    /// Execute one job under the worker-pool cap.
    ///
    /// Blocks (asynchronously) until a worker permit is free, then drives
    /// the matching adapter to completion. There is no timeout here: a hung
    /// external tool holds its permit and its session indefinitely, which
    /// is a documented limitation rather than silent handling.
    pub async fn execute(&self, request: &JobRequest<'_>) -> JobOutcome {
        let expected = request.operation.input_count();
        if request.inputs.len() != expected {
            return JobOutcome::ValidationFailure {
                reason: format!(
                    "{:?} needs {} input(s), got {}",
                    request.operation,
                    expected,
                    request.inputs.len()
                ),
            };
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .expect("worker semaphore closed");

        let adapter = match request.operation {
            Operation::ToPdf => &self.to_pdf,
            Operation::Compress => &self.compress,
            Operation::Rotate(_) => &self.rotate,
            Operation::Merge => &self.merge,
        };

        debug!(
            "running {} on {} input(s)",
            adapter.name(),
            request.inputs.len()
        );
        adapter.run(request).await
    }
}
