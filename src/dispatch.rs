//! Event intake: per-session ordering, cross-session concurrency.
//!
//! The transport feeds one mpsc channel of normalized events. Each identity
//! gets a lightweight worker task with its own queue; the intake loop only
//! routes, so a slow job for one user never delays another user's events,
//! while events for the same identity are handled strictly in arrival
//! order. There is no ordering guarantee across identities.
//!
//! Workers live for the life of the process — session state is in-memory
//! and ephemeral, so the worker map is bounded by the number of distinct
//! identities seen, the same bound the session store already has.

use crate::chat::InboundEvent;
use crate::engine::Engine;
use crate::session::SessionKey;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

struct Worker {
    queue: mpsc::UnboundedSender<InboundEvent>,
    task: JoinHandle<()>,
}

/// Drain `events`, routing each to its identity's worker.
///
/// Returns once the sender side of `events` is dropped *and* every worker
/// has finished its queue, so callers can treat completion as "all inbound
/// traffic fully handled".
pub async fn run(engine: Arc<Engine>, mut events: mpsc::Receiver<InboundEvent>) {
    info!("dispatcher started");
    let mut workers: HashMap<SessionKey, Worker> = HashMap::new();

    while let Some(event) = events.recv().await {
        let key = SessionKey {
            chat_id: event.chat_id,
            user_id: event.user_id,
        };
        let worker = workers
            .entry(key)
            .or_insert_with(|| spawn_worker(Arc::clone(&engine), key));
        if worker.queue.send(event).is_err() {
            // A worker only exits when its sender is gone, so this is
            // unreachable in practice; drop the stale entry if it happens.
            workers.remove(&key);
        }
    }

    // Intake closed: let every worker drain its queue, then stop.
    for (_, worker) in workers {
        drop(worker.queue);
        let _ = worker.task.await;
    }
    info!("dispatcher stopped");
}

fn spawn_worker(engine: Arc<Engine>, key: SessionKey) -> Worker {
    let (queue, mut rx) = mpsc::unbounded_channel::<InboundEvent>();
    let task = tokio::spawn(async move {
        debug!("worker started for {key:?}");
        while let Some(event) = rx.recv().await {
            engine.handle(event).await;
        }
        debug!("worker stopped for {key:?}");
    });
    Worker { queue, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{ChatApi, ChatEvent, Keyboard};
    use crate::config::BotConfig;
    use crate::error::BotError;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingApi {
        texts: Mutex<Vec<(i64, String)>>,
    }

    #[async_trait]
    impl ChatApi for RecordingApi {
        async fn send_message(
            &self,
            chat_id: i64,
            text: &str,
            _keyboard: Option<&Keyboard>,
        ) -> Result<(), BotError> {
            self.texts.lock().unwrap().push((chat_id, text.to_string()));
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

    fn event(chat_id: i64, user_id: i64, event: ChatEvent) -> InboundEvent {
        InboundEvent {
            chat_id,
            user_id,
            event,
        }
    }

    #[tokio::test]
    async fn one_session_is_handled_in_arrival_order() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let api = Arc::new(RecordingApi::default());
        let config = BotConfig::builder()
            .input_root(input.path())
            .output_root(output.path())
            .build()
            .unwrap();
        let engine = Arc::new(Engine::new(Arc::clone(&api) as Arc<dyn ChatApi>, config));

        let (tx, rx) = mpsc::channel(16);
        let dispatcher = tokio::spawn(run(engine, rx));

        // Same identity: prompt, reprompt, cancel — order must survive.
        tx.send(event(1, 7, ChatEvent::Command("compress".into())))
            .await
            .unwrap();
        tx.send(event(1, 7, ChatEvent::TextMessage("hold on".into())))
            .await
            .unwrap();
        tx.send(event(1, 7, ChatEvent::CancelRequested)).await.unwrap();
        // A second identity interleaves freely.
        tx.send(event(2, 8, ChatEvent::Command("start".into())))
            .await
            .unwrap();
        drop(tx);

        dispatcher.await.unwrap();

        let texts = api.texts.lock().unwrap();
        let session_one: Vec<&str> = texts
            .iter()
            .filter(|(chat, _)| *chat == 1)
            .map(|(_, t)| t.as_str())
            .collect();
        assert_eq!(session_one.len(), 3);
        assert_eq!(session_one[0], "Upload your file");
        assert!(session_one[1].contains("not a document"));
        assert!(session_one[2].contains("cancelled"));

        assert!(texts.iter().any(|(chat, _)| *chat == 2));
    }
}
