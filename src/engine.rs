//! Conversation state machine: chat events in, replies and jobs out.
//!
//! The original bot expressed these flows as framework-registered handlers
//! with overlapping filters; here the whole routing surface is one explicit
//! table, checked in a fixed priority order:
//!
//! 1. global cancel — valid in every state, always wins
//! 2. locale switch commands — valid in every state, do not touch the flow
//! 3. the per-state rules below
//! 4. fallback — a state-preserving reprompt; no event is ever fatal
//!
//! ```text
//! (idle) ──command/button──▶ Awaiting*Input ──upload──▶ [validate]
//!    │                            │                        │ pass
//!    │upload                      │other event             ▼
//!    ▼                            ▼                      stage ──▶ job ──▶ (idle)
//! AwaitingOperationChoice     reprompt                    │
//!    (classify, offer ops)                         rotate: option menu
//!                                                  merge:  second input
//! ```
//!
//! `Idle` is the absence of a session; every flow ends back there whether
//! it finished, failed, or was cancelled. Handling of one event holds that
//! session's slot for its whole duration — including the synchronous
//! pipeline call — so a slow tool suspends only its own conversation.

use crate::chat::{ChatApi, ChatEvent, DocumentRef, InboundEvent, Keyboard};
use crate::config::BotConfig;
use crate::error::ValidationError;
use crate::locale::LocaleStore;
use crate::pipeline::{JobOutcome, JobRequest, Operation, Pipeline, RotateAngle};
use crate::replies::{text, Lang, Reply};
use crate::session::{FlowState, Session, SessionKey, SessionStore, StagedFile};
use crate::staging::Stager;
use crate::validate::{self, RequiredKind};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The assistant core: owns the stores, the pipeline, and the transition
/// table. One instance serves every session.
pub struct Engine {
    api: Arc<dyn ChatApi>,
    config: BotConfig,
    sessions: SessionStore,
    locales: LocaleStore,
    stager: Stager,
    pipeline: Pipeline,
}

impl Engine {
    /// Production wiring: adapters picked from `config`.
    pub fn new(api: Arc<dyn ChatApi>, config: BotConfig) -> Self {
        let pipeline = Pipeline::from_config(&config);
        Self::with_pipeline(api, config, pipeline)
    }

    /// Wire an explicit pipeline (tests, alternative adapters).
    pub fn with_pipeline(api: Arc<dyn ChatApi>, config: BotConfig, pipeline: Pipeline) -> Self {
        if let Ok(snapshot) = serde_json::to_string(&config) {
            debug!("engine config: {snapshot}");
        }
        let locales = LocaleStore::new(config.default_locale.clone());
        let stager = Stager::new(config.input_root.clone());
        Self {
            api,
            config,
            sessions: SessionStore::new(),
            locales,
            stager,
            pipeline,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn locales(&self) -> &LocaleStore {
        &self.locales
    }

    /// Handle one inbound event to completion.
    ///
    /// Never returns an error: every failure path ends in a user-visible
    /// reply and a well-defined state. Events for the same identity are
    /// serialized on the session slot; unrelated identities proceed
    /// concurrently.
    pub async fn handle(&self, inbound: InboundEvent) {
        let key = SessionKey {
            chat_id: inbound.chat_id,
            user_id: inbound.user_id,
        };
        let slot = self.sessions.slot(key);
        let mut guard = slot.lock().await;

        let event = inbound.event.normalized();
        let lang = self.lang_for(key.user_id, guard.as_ref());
        debug!("event {event:?} for {key:?}");

        // ── Priority 1: global cancel ────────────────────────────────────
        if event == ChatEvent::CancelRequested {
            self.cancel(key, &mut guard, lang).await;
            return;
        }

        // ── Priority 2: locale switches, valid mid-flow ──────────────────
        if let ChatEvent::Command(name) = &event {
            if name == "en" || name == "ru" {
                self.switch_locale(key, name, guard.as_mut()).await;
                return;
            }
        }

        // ── Priority 3: per-state rules ──────────────────────────────────
        match guard.as_ref().map(|s| s.state) {
            None => self.handle_idle(key, event, &mut guard, lang).await,
            Some(FlowState::AwaitingConvertInput) => {
                self.handle_upload_state(key, event, &mut guard, lang, UploadFlow::Convert)
                    .await
            }
            Some(FlowState::AwaitingCompressInput) => {
                self.handle_upload_state(key, event, &mut guard, lang, UploadFlow::Compress)
                    .await
            }
            Some(FlowState::AwaitingRotateInput) => {
                self.handle_upload_state(key, event, &mut guard, lang, UploadFlow::Rotate)
                    .await
            }
            Some(FlowState::AwaitingMergeFirst) => {
                self.handle_upload_state(key, event, &mut guard, lang, UploadFlow::MergeFirst)
                    .await
            }
            Some(FlowState::AwaitingMergeSecond) => {
                self.handle_upload_state(key, event, &mut guard, lang, UploadFlow::MergeSecond)
                    .await
            }
            Some(FlowState::AwaitingRotateOption) => {
                self.handle_rotate_option(key, event, &mut guard, lang).await
            }
            Some(FlowState::AwaitingOperationChoice) => {
                self.handle_operation_choice(key, event, &mut guard, lang)
                    .await
            }
        }
    }

    // ── Global transitions ───────────────────────────────────────────────

    /// Cancel from any state: clear the session (releasing staged inputs)
    /// and confirm. Cancelling while already idle is silently ignored, as
    /// in the original bot.
    async fn cancel(&self, key: SessionKey, guard: &mut Option<Session>, lang: Lang) {
        if guard.take().is_none() {
            debug!("cancel with no active session for {key:?}");
            return;
        }
        info!("session cancelled for {key:?}");
        self.say(key.chat_id, lang, Reply::Cancelled, Some(&initial_keyboard()))
            .await;
    }

    async fn switch_locale(&self, key: SessionKey, code: &str, session: Option<&mut Session>) {
        self.locales.set(key.user_id, code);
        if let Some(session) = session {
            session.locale_override = Some(code.to_string());
        }
        let lang = Lang::from_code(code);
        self.say(key.chat_id, lang, Reply::LocaleSwitched, None).await;
    }

    // ── Idle ─────────────────────────────────────────────────────────────

    async fn handle_idle(
        &self,
        key: SessionKey,
        event: ChatEvent,
        guard: &mut Option<Session>,
        lang: Lang,
    ) {
        match event {
            ChatEvent::Command(name) | ChatEvent::ButtonTap(name) if flow_state_for(&name).is_some() => {
                let state = flow_state_for(&name).expect("checked by guard");
                *guard = Some(Session::new(state));
                self.say(key.chat_id, lang, Reply::UploadPrompt, None).await;
            }
            ChatEvent::Command(name) if name == "start" => {
                self.say(key.chat_id, lang, Reply::Greeting, Some(&initial_keyboard()))
                    .await;
            }
            ChatEvent::Command(name) if name == "admin" && self.config.admins.contains(&key.user_id) => {
                let message = format!(
                    "{}\nActive sessions: {}",
                    text(lang, Reply::AdminGreeting),
                    self.sessions.active_sessions()
                );
                self.send(key.chat_id, &message, None).await;
            }
            ChatEvent::DocumentUploaded(doc) => {
                self.enter_operation_choice(key, doc, guard, lang).await;
            }
            _ => {
                // Unrecognized traffic while idle: show the menu.
                self.say(key.chat_id, lang, Reply::Greeting, Some(&initial_keyboard()))
                    .await;
            }
        }
    }

    /// A document arrived with no prior command: classify it and offer the
    /// applicable operations. Nothing is staged unless the file passes
    /// validation for at least one flow.
    async fn enter_operation_choice(
        &self,
        key: SessionKey,
        doc: DocumentRef,
        guard: &mut Option<Session>,
        lang: Lang,
    ) {
        let ext = validate::extension_of(&doc.file_name).unwrap_or_default();
        let is_pdf = validate::is_pdf(&ext);

        if !is_pdf && !validate::supported_extension(&ext) {
            self.say(key.chat_id, lang, Reply::UnsupportedFormat, None).await;
            return;
        }
        if !validate::under_size_limit(doc.size_bytes) {
            self.say(key.chat_id, lang, Reply::Oversize, None).await;
            return;
        }

        let staged = match self.stager.stage(self.api.as_ref(), &doc).await {
            Ok(staged) => staged,
            Err(e) => {
                warn!("staging failed for {key:?}: {e}");
                self.say(key.chat_id, lang, Reply::GenericFailure, None).await;
                return;
            }
        };

        let mut session = Session::new(FlowState::AwaitingOperationChoice);
        session.inputs.push(staged);
        *guard = Some(session);

        self.say(
            key.chat_id,
            lang,
            Reply::ChooseOperation,
            Some(&choice_keyboard(is_pdf)),
        )
        .await;
    }

    // ── Awaiting an upload ───────────────────────────────────────────────

    async fn handle_upload_state(
        &self,
        key: SessionKey,
        event: ChatEvent,
        guard: &mut Option<Session>,
        lang: Lang,
        flow: UploadFlow,
    ) {
        let doc = match event {
            ChatEvent::DocumentUploaded(doc) => doc,
            _ => {
                // Only a document advances this state.
                self.say(key.chat_id, lang, Reply::NotADocument, None).await;
                return;
            }
        };

        if let Err(rejection) =
            validate::validate_upload(&doc.file_name, doc.size_bytes, flow.required_kind())
        {
            self.reject_upload(key, guard, lang, rejection).await;
            return;
        }

        let staged = match self.stager.stage(self.api.as_ref(), &doc).await {
            Ok(staged) => staged,
            Err(e) => {
                warn!("staging failed for {key:?}: {e}");
                self.fail_and_clear(key, guard, lang).await;
                return;
            }
        };

        let session = guard.as_mut().expect("upload state requires a session");
        session.inputs.push(staged);

        match flow {
            UploadFlow::Convert => self.run_job(key, guard, Operation::ToPdf, lang).await,
            UploadFlow::Compress => self.run_job(key, guard, Operation::Compress, lang).await,
            UploadFlow::Rotate => {
                session.state = FlowState::AwaitingRotateOption;
                self.say(
                    key.chat_id,
                    lang,
                    Reply::ChooseRotation,
                    Some(&rotation_keyboard()),
                )
                .await;
            }
            UploadFlow::MergeFirst => {
                session.state = FlowState::AwaitingMergeSecond;
                self.say(key.chat_id, lang, Reply::UploadSecondPrompt, None).await;
            }
            UploadFlow::MergeSecond => self.run_job(key, guard, Operation::Merge, lang).await,
        }
    }

    /// Reply to a validation rejection. Oversize is terminal for the flow;
    /// everything else leaves the state untouched for an in-place retry.
    async fn reject_upload(
        &self,
        key: SessionKey,
        guard: &mut Option<Session>,
        lang: Lang,
        rejection: ValidationError,
    ) {
        debug!("upload rejected for {key:?}: {rejection}");
        let reply = match rejection {
            ValidationError::UnsupportedFormat { .. } => Reply::UnsupportedFormat,
            ValidationError::AlreadyPdf => Reply::AlreadyPdf,
            ValidationError::NotPdf { .. } => Reply::NotPdf,
            ValidationError::OversizeFile { .. } => {
                guard.take();
                self.say(key.chat_id, lang, Reply::Oversize, None).await;
                return;
            }
        };
        self.say(key.chat_id, lang, reply, None).await;
    }

    // ── Rotation menu ────────────────────────────────────────────────────

    async fn handle_rotate_option(
        &self,
        key: SessionKey,
        event: ChatEvent,
        guard: &mut Option<Session>,
        lang: Lang,
    ) {
        let angle = match &event {
            ChatEvent::ButtonTap(token) => token
                .strip_prefix("rotate:")
                .and_then(RotateAngle::from_token),
            _ => None,
        };
        match angle {
            Some(angle) => {
                self.run_job(key, guard, Operation::Rotate(angle), lang)
                    .await
            }
            None => {
                self.say(
                    key.chat_id,
                    lang,
                    Reply::ChooseRotation,
                    Some(&rotation_keyboard()),
                )
                .await;
            }
        }
    }

    // ── Operation choice for an unsolicited upload ───────────────────────

    async fn handle_operation_choice(
        &self,
        key: SessionKey,
        event: ChatEvent,
        guard: &mut Option<Session>,
        lang: Lang,
    ) {
        let session = guard.as_mut().expect("choice state requires a session");
        let staged_is_pdf = session
            .inputs
            .first()
            .map(|f| {
                validate::extension_of(&f.original_name)
                    .map(|ext| validate::is_pdf(&ext))
                    .unwrap_or(false)
            })
            .unwrap_or(false);

        let token = match &event {
            ChatEvent::ButtonTap(token) => token.as_str(),
            _ => "",
        };

        // Only operations applicable to the staged file are accepted.
        match (token, staged_is_pdf) {
            ("topdf", false) => self.run_job(key, guard, Operation::ToPdf, lang).await,
            ("compress", true) => self.run_job(key, guard, Operation::Compress, lang).await,
            ("rotate", true) => {
                session.state = FlowState::AwaitingRotateOption;
                self.say(
                    key.chat_id,
                    lang,
                    Reply::ChooseRotation,
                    Some(&rotation_keyboard()),
                )
                .await;
            }
            ("merge", true) => {
                session.state = FlowState::AwaitingMergeSecond;
                self.say(key.chat_id, lang, Reply::UploadSecondPrompt, None).await;
            }
            _ => {
                self.say(
                    key.chat_id,
                    lang,
                    Reply::ChooseOperation,
                    Some(&choice_keyboard(staged_is_pdf)),
                )
                .await;
            }
        }
    }

    // ── Job execution ────────────────────────────────────────────────────

    /// Run the pipeline against the session's staged inputs, deliver the
    /// artifact, and clear the session. Every outcome — success, tool
    /// failure, missing output, failed delivery — ends with the session
    /// cleared and its inputs released.
    async fn run_job(
        &self,
        key: SessionKey,
        guard: &mut Option<Session>,
        operation: Operation,
        lang: Lang,
    ) {
        self.say(key.chat_id, lang, Reply::PleaseWait, None).await;

        let outcome = {
            let session = guard.as_ref().expect("job requires a session");
            let request = JobRequest {
                operation,
                inputs: &session.inputs,
                output_dir: &self.config.output_root,
            };
            info!("running {operation:?} for {key:?}");
            self.pipeline.execute(&request).await
        };

        match outcome {
            JobOutcome::Success(artifact) => {
                let display = {
                    let session = guard.as_ref().expect("job requires a session");
                    delivery_name(operation, &session.inputs)
                };
                match self
                    .api
                    .send_document(key.chat_id, artifact.path(), &display)
                    .await
                {
                    Ok(()) => {
                        self.say(key.chat_id, lang, Reply::Done, Some(&initial_keyboard()))
                            .await;
                    }
                    Err(e) => {
                        warn!("delivery failed for {key:?}: {e}");
                        self.say(key.chat_id, lang, Reply::GenericFailure, None).await;
                    }
                }
                // `artifact` drops here, deleting the delivered output.
            }
            JobOutcome::ToolFailure { tool, code } => {
                warn!("{tool} failed with {code:?} for {key:?}");
                self.say(key.chat_id, lang, Reply::GenericFailure, None).await;
            }
            JobOutcome::MissingOutput { expected } => {
                warn!(
                    "tool reported success but {} is absent for {key:?}",
                    expected.display()
                );
                self.say(key.chat_id, lang, Reply::GenericFailure, None).await;
            }
            JobOutcome::ValidationFailure { reason } => {
                warn!("malformed job for {key:?}: {reason}");
                self.say(key.chat_id, lang, Reply::GenericFailure, None).await;
            }
        }

        // Any outcome clears the session and releases staged inputs.
        guard.take();
    }

    async fn fail_and_clear(&self, key: SessionKey, guard: &mut Option<Session>, lang: Lang) {
        guard.take();
        self.say(key.chat_id, lang, Reply::GenericFailure, None).await;
    }

    // ── Outbound helpers ─────────────────────────────────────────────────

    fn lang_for(&self, user_id: i64, session: Option<&Session>) -> Lang {
        let code = session
            .and_then(|s| s.locale_override.clone())
            .unwrap_or_else(|| self.locales.get(user_id));
        Lang::from_code(&code)
    }

    async fn say(&self, chat_id: i64, lang: Lang, reply: Reply, keyboard: Option<&Keyboard>) {
        self.send(chat_id, text(lang, reply), keyboard).await;
    }

    /// Replies are best-effort: a transport error is logged, never fatal.
    async fn send(&self, chat_id: i64, message: &str, keyboard: Option<&Keyboard>) {
        if let Err(e) = self.api.send_message(chat_id, message, keyboard).await {
            warn!("send to chat {chat_id} failed: {e}");
        }
    }
}

/// Which upload the state machine is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UploadFlow {
    Convert,
    Compress,
    Rotate,
    MergeFirst,
    MergeSecond,
}

impl UploadFlow {
    fn required_kind(self) -> RequiredKind {
        match self {
            UploadFlow::Convert => RequiredKind::Convertible,
            _ => RequiredKind::Pdf,
        }
    }
}

/// Flow-starting tokens shared by commands and menu buttons.
fn flow_state_for(token: &str) -> Option<FlowState> {
    match token {
        "topdf" => Some(FlowState::AwaitingConvertInput),
        "compress" => Some(FlowState::AwaitingCompressInput),
        "rotate" => Some(FlowState::AwaitingRotateInput),
        "merge" => Some(FlowState::AwaitingMergeFirst),
        _ => None,
    }
}

fn initial_keyboard() -> Keyboard {
    Keyboard::from_pairs([
        ("Convert to PDF", "topdf"),
        ("Compress PDF file", "compress"),
        ("Rotate PDF", "rotate"),
        ("Merge two PDFs", "merge"),
    ])
}

fn rotation_keyboard() -> Keyboard {
    Keyboard::from_pairs([
        ("Rotate left", "rotate:left"),
        ("Rotate right", "rotate:right"),
        ("Turn upside down", "rotate:full"),
    ])
}

/// Operations applicable to an unsolicited upload: a PDF can be compressed,
/// rotated, or merged; anything else can only become a PDF.
fn choice_keyboard(staged_is_pdf: bool) -> Keyboard {
    if staged_is_pdf {
        Keyboard::from_pairs([
            ("Compress PDF file", "compress"),
            ("Rotate PDF", "rotate"),
            ("Merge with another PDF", "merge"),
        ])
    } else {
        Keyboard::from_pairs([("Convert to PDF", "topdf")])
    }
}

/// Name the delivered document carries in the chat.
fn delivery_name(operation: Operation, inputs: &[StagedFile]) -> String {
    let original = inputs
        .first()
        .map(|f| f.original_name.as_str())
        .unwrap_or("document");
    match operation {
        Operation::ToPdf => {
            let stem = original.rsplit_once('.').map(|(s, _)| s).unwrap_or(original);
            format!("{stem}.pdf")
        }
        Operation::Compress => format!("compressed_{original}"),
        Operation::Rotate(_) => format!("rotated_{original}"),
        Operation::Merge => format!("merged_{original}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staged(name: &str) -> StagedFile {
        StagedFile {
            file_id: "id".into(),
            original_name: name.into(),
            local_path: std::path::PathBuf::from(format!("/nonexistent/id_{name}")),
            size_bytes: 1,
        }
    }

    #[test]
    fn delivery_names_per_operation() {
        let pdf = [staged("scan.pdf")];
        assert_eq!(
            delivery_name(Operation::Compress, &pdf),
            "compressed_scan.pdf"
        );
        assert_eq!(
            delivery_name(Operation::Rotate(RotateAngle::Deg90), &pdf),
            "rotated_scan.pdf"
        );
        assert_eq!(delivery_name(Operation::Merge, &pdf), "merged_scan.pdf");

        let docx = [staged("report.docx")];
        assert_eq!(delivery_name(Operation::ToPdf, &docx), "report.pdf");
    }

    #[test]
    fn flow_tokens_map_to_states() {
        assert_eq!(
            flow_state_for("topdf"),
            Some(FlowState::AwaitingConvertInput)
        );
        assert_eq!(
            flow_state_for("merge"),
            Some(FlowState::AwaitingMergeFirst)
        );
        assert_eq!(flow_state_for("start"), None);
    }

    #[test]
    fn choice_keyboard_depends_on_classification() {
        let pdf_kb = choice_keyboard(true);
        assert!(pdf_kb.rows.iter().all(|b| b.token != "topdf"));
        assert_eq!(pdf_kb.rows.len(), 3);

        let other_kb = choice_keyboard(false);
        assert_eq!(other_kb.rows.len(), 1);
        assert_eq!(other_kb.rows[0].token, "topdf");
    }
}
