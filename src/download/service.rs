//! Runs relay requests as independent tasks and tracks them for `/cancel`.

use super::error::RelayError;
use super::pipeline::{Delivery, RelayPipeline};
use super::progress::StatusMessage;
use super::request::RelayRequest;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use teloxide::types::ChatId;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// In-flight requests keyed by request id.
#[derive(Debug, Default)]
pub struct ActiveRequests {
    entries: DashMap<Uuid, (ChatId, CancellationToken)>,
}

impl ActiveRequests {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, id: Uuid, chat_id: ChatId) -> CancellationToken {
        let token = CancellationToken::new();
        self.entries.insert(id, (chat_id, token.clone()));
        token
    }

    fn remove(&self, id: &Uuid) {
        self.entries.remove(id);
    }

    /// Cancels every request of `chat_id`. Returns how many were running.
    pub fn cancel_chat(&self, chat_id: ChatId) -> usize {
        let mut cancelled = 0;
        for entry in self.entries.iter() {
            let (owner, token) = entry.value();
            if *owner == chat_id && !token.is_cancelled() {
                token.cancel();
                cancelled += 1;
            }
        }
        cancelled
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Deregisters the request when the task finishes, panics or is aborted.
struct ActiveGuard {
    active: Arc<ActiveRequests>,
    id: Uuid,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active.remove(&self.id);
    }
}

/// Spawns one task per accepted request.
#[derive(Clone)]
pub struct RelayService {
    pipeline: Arc<RelayPipeline>,
    active: Arc<ActiveRequests>,
}

impl RelayService {
    pub fn new(pipeline: Arc<RelayPipeline>) -> Self {
        Self {
            pipeline,
            active: Arc::new(ActiveRequests::new()),
        }
    }

    /// Starts the request in the background so the dispatcher is never blocked.
    pub fn spawn(&self, request: RelayRequest, mut status: StatusMessage) -> JoinHandle<Result<Delivery, RelayError>> {
        let pipeline = Arc::clone(&self.pipeline);
        let id = request.id;
        let chat_id = request.chat_id;
        self.track(id, chat_id, move |token| async move {
            pipeline.run(request, &mut status, &token).await
        })
    }

    /// Runs other per-chat work (e.g. building a preview) so `/cancel` reaches it too.
    pub fn spawn_tracked<F, Fut, T>(&self, chat_id: ChatId, task: F) -> JoinHandle<T>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.track(Uuid::new_v4(), chat_id, task)
    }

    fn track<F, Fut, T>(&self, id: Uuid, chat_id: ChatId, task: F) -> JoinHandle<T>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let token = self.active.register(id, chat_id);
        let guard = ActiveGuard {
            active: Arc::clone(&self.active),
            id,
        };
        let fut = task(token);

        tokio::spawn(async move {
            let _guard = guard;
            fut.await
        })
    }

    pub fn cancel_chat(&self, chat_id: ChatId) -> usize {
        let cancelled = self.active.cancel_chat(chat_id);
        if cancelled > 0 {
            log::info!("Cancelled {} request(s) for chat {}", cancelled, chat_id);
        }
        cancelled
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}
