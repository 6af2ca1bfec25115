//! Chat-platform boundary: normalized inbound events and the outbound API.
//!
//! The core never talks to a concrete messenger. A transport adapter
//! (Telegram, console harness, test mock) normalizes whatever the platform
//! delivers into [`ChatEvent`] values and implements [`ChatApi`] for the
//! outbound direction. Everything the state machine needs from a document —
//! opaque file id, original name, declared size — arrives in
//! [`DocumentRef`] before any bytes are downloaded, so validation can run
//! without touching the network.

use crate::error::BotError;
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;

/// Reference to a document the user attached, as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    /// Opaque platform handle used to download the bytes later.
    pub file_id: String,
    /// Name the file had on the user's device.
    pub file_name: String,
    /// Size declared by the platform, in bytes.
    pub size_bytes: u64,
}

/// One normalized inbound chat event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// Slash command without the leading `/`, e.g. `compress`.
    Command(String),
    /// Inline-keyboard button tap carrying its callback token.
    ButtonTap(String),
    /// The user attached a document.
    DocumentUploaded(DocumentRef),
    /// Plain text that is not a command.
    TextMessage(String),
    /// Explicit cancellation.
    CancelRequested,
}

impl ChatEvent {
    /// Fold the cancel spellings into [`ChatEvent::CancelRequested`].
    ///
    /// `/cancel` and a bare "cancel" text (any case) both cancel, matching
    /// the command and the case-folded text trigger of the original bot.
    pub fn normalized(self) -> Self {
        match &self {
            ChatEvent::Command(name) if name == "cancel" => ChatEvent::CancelRequested,
            ChatEvent::TextMessage(body) if body.trim().eq_ignore_ascii_case("cancel") => {
                ChatEvent::CancelRequested
            }
            _ => self,
        }
    }
}

/// An inbound event together with the identity it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub chat_id: i64,
    pub user_id: i64,
    pub event: ChatEvent,
}

/// One inline-keyboard button: visible label plus the callback token the
/// platform echoes back in a [`ChatEvent::ButtonTap`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub label: String,
    pub token: String,
}

/// Inline keyboard, one button per row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Keyboard {
    pub rows: Vec<Button>,
}

impl Keyboard {
    /// Build a keyboard from `(label, token)` pairs, one row each.
    pub fn from_pairs<L, T>(pairs: impl IntoIterator<Item = (L, T)>) -> Self
    where
        L: Into<String>,
        T: Into<String>,
    {
        Self {
            rows: pairs
                .into_iter()
                .map(|(label, token)| Button {
                    label: label.into(),
                    token: token.into(),
                })
                .collect(),
        }
    }
}

/// Outbound side of the chat platform.
///
/// Implementations must be safe to share across sessions; the engine holds
/// one `Arc<dyn ChatApi>` for its whole lifetime.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Send a text reply, optionally with an inline keyboard.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), BotError>;

    /// Deliver a local file to the chat under a display name.
    async fn send_document(
        &self,
        chat_id: i64,
        local_path: &Path,
        display_name: &str,
    ) -> Result<(), BotError>;

    /// Download the platform file behind `file_id` to `dest`.
    async fn download_file(&self, file_id: &str, dest: &Path) -> Result<(), BotError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_command_normalizes() {
        assert_eq!(
            ChatEvent::Command("cancel".into()).normalized(),
            ChatEvent::CancelRequested
        );
    }

    #[test]
    fn cancel_text_normalizes_case_insensitively() {
        for spelling in ["cancel", "CANCEL", "  Cancel "] {
            assert_eq!(
                ChatEvent::TextMessage(spelling.into()).normalized(),
                ChatEvent::CancelRequested,
                "spelling {spelling:?}"
            );
        }
    }

    #[test]
    fn other_events_pass_through() {
        let ev = ChatEvent::Command("compress".into());
        assert_eq!(ev.clone().normalized(), ev);

        let ev = ChatEvent::TextMessage("cancel my subscription".into());
        assert_eq!(ev.clone().normalized(), ev);
    }

    #[test]
    fn keyboard_from_pairs_keeps_order() {
        let kb = Keyboard::from_pairs([("Convert to PDF", "topdf"), ("Compress PDF", "compress")]);
        assert_eq!(kb.rows.len(), 2);
        assert_eq!(kb.rows[0].token, "topdf");
        assert_eq!(kb.rows[1].label, "Compress PDF");
    }
}
