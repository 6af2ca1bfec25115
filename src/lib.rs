//! # pdfmate
//!
//! Chat-driven PDF assistant core: a user converses with a bot, uploads a
//! file, picks an operation, and gets a transformed file back.
//!
//! This crate is the conversation state machine and transformation
//! pipeline behind that bot — the chat transport itself (message delivery,
//! inline keyboards, command registration) is a collaborator implementing
//! [`chat::ChatApi`], not part of the core.
//!
//! ## Event Flow
//!
//! ```text
//! chat event
//!  │
//!  ├─ 1. Dispatch  route to the identity's worker (in-order per session)
//!  ├─ 2. Engine    transition table: cancel → state rules → reprompt
//!  ├─ 3. Validate  extension whitelist / PDF-required / 20 MiB ceiling
//!  ├─ 4. Stage     download the upload under the input root
//!  ├─ 5. Pipeline  gs / LibreOffice / qpdf / HTTP converter, worker cap
//!  └─ 6. Deliver   send the artifact, release temp files, back to idle
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfmate::{BotConfig, Engine, InboundEvent, ChatEvent};
//! use std::sync::Arc;
//!
//! # async fn example(api: Arc<dyn pdfmate::ChatApi>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = BotConfig::from_env()?;
//! let engine = Arc::new(Engine::new(api, config));
//!
//! let (tx, rx) = tokio::sync::mpsc::channel::<InboundEvent>(64);
//! // The transport pushes normalized events into `tx`…
//! tx.send(InboundEvent {
//!     chat_id: 1,
//!     user_id: 7,
//!     event: ChatEvent::Command("compress".into()),
//! })
//! .await?;
//! pdfmate::dispatch::run(engine, rx).await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Guarantees
//!
//! - Events for one identity are handled in arrival order; identities are
//!   independent.
//! - At most one active job per session; external tools run under a
//!   bounded worker pool.
//! - Staged inputs and produced outputs are deleted exactly once, on every
//!   exit path — ownership does the bookkeeping.
//! - No event is ever fatal: every path ends in a reply and a well-defined
//!   state.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod chat;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod locale;
pub mod pipeline;
pub mod replies;
pub mod session;
pub mod staging;
pub mod validate;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use chat::{Button, ChatApi, ChatEvent, DocumentRef, InboundEvent, Keyboard};
pub use config::{BotConfig, BotConfigBuilder};
pub use engine::Engine;
pub use error::{BotError, ValidationError};
pub use pipeline::{
    JobOutcome, JobRequest, Operation, OutputArtifact, Pipeline, RotateAngle, ToolAdapter,
};
pub use session::{FlowState, Session, SessionKey, SessionStore, StagedFile};
pub use staging::Stager;
pub use validate::{RequiredKind, MAX_FILE_BYTES};
