//! Per-user "waiting for an image" sessions.
//!
//! A recognition command without an image opens a session and arms a timer.
//! The next message from the same user that carries an image consumes it;
//! otherwise the timer expires it and sends a timeout notice. Consume,
//! replace and expire all happen under one map lock, and the timer's token
//! is cancelled inside that lock before its entry is removed, so a timer
//! that lost the race sees its own cancelled token and does nothing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shitu_core::ModelSelector;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::locator::ImageReference;
use crate::messages;
use crate::transport::{ReplyChannel, reply_logged};

/// A recognition command still waiting for its image.
#[derive(Clone)]
pub struct WaitingSession {
    pub user_id: String,
    pub model: ModelSelector,
    pub created_at: Instant,
    pub reply: Arc<dyn ReplyChannel>,
}

impl std::fmt::Debug for WaitingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitingSession")
            .field("user_id", &self.user_id)
            .field("model", &self.model)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

struct Entry {
    session: WaitingSession,
    timeout: Duration,
    timer: CancellationToken,
}

type SessionMap = HashMap<String, Entry>;

/// Process-scoped registry of waiting sessions, keyed by user id.
///
/// Cheap to clone; clones share the same sessions.
#[derive(Clone, Default)]
pub struct WaitingRegistry {
    sessions: Arc<Mutex<SessionMap>>,
}

impl WaitingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or replace) the session for `user_id` and send the prompt.
    ///
    /// Any previous session for the user is removed and its timer cancelled
    /// before the new one is installed.
    pub async fn open(
        &self,
        user_id: &str,
        model: ModelSelector,
        reply: Arc<dyn ReplyChannel>,
        timeout: Duration,
    ) {
        let timer = CancellationToken::new();
        let session = WaitingSession {
            user_id: user_id.to_string(),
            model,
            created_at: Instant::now(),
            reply: Arc::clone(&reply),
        };

        {
            let mut sessions = self.lock();
            if let Some(previous) = sessions.remove(user_id) {
                previous.timer.cancel();
                info!("[user:{}] Replacing waiting session", user_id);
            }
            sessions.insert(
                user_id.to_string(),
                Entry {
                    session,
                    timeout,
                    timer: timer.clone(),
                },
            );
        }

        self.arm_timer(user_id.to_string(), timer, timeout);
        info!(
            "[user:{}] Waiting for image ({}, {}s)",
            user_id,
            model.display_name(),
            timeout.as_secs()
        );

        reply_logged(&reply, &messages::session::awaiting_image(timeout.as_secs())).await;
    }

    /// Take the user's session if it is still live and an image was found.
    ///
    /// Returns `None` without touching any state when there is no image, no
    /// session, or the session is past its deadline (the timer owns that one).
    pub fn try_consume(
        &self,
        user_id: &str,
        candidate: Option<&ImageReference>,
    ) -> Option<WaitingSession> {
        candidate?;

        let mut sessions = self.lock();
        let entry = sessions.get(user_id)?;
        if Instant::now() > entry.session.created_at + entry.timeout {
            return None;
        }

        let entry = sessions.remove(user_id)?;
        entry.timer.cancel();
        info!("[user:{}] Waiting session consumed", user_id);
        Some(entry.session)
    }

    /// Drop the user's session, if any, without sending a notice.
    ///
    /// Used when a command carrying its own image supersedes an open session.
    pub fn cancel(&self, user_id: &str) -> bool {
        let mut sessions = self.lock();
        match sessions.remove(user_id) {
            Some(entry) => {
                entry.timer.cancel();
                info!("[user:{}] Waiting session superseded", user_id);
                true
            }
            None => false,
        }
    }

    /// Cancel every timer and drop every session. Returns how many were live.
    pub fn shutdown(&self) -> usize {
        let mut sessions = self.lock();
        let count = sessions.len();
        for (_, entry) in sessions.drain() {
            entry.timer.cancel();
        }
        if count > 0 {
            info!("Cancelled {} waiting session(s)", count);
        }
        count
    }

    pub fn is_waiting(&self, user_id: &str) -> bool {
        self.lock().contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionMap> {
        self.sessions.lock().expect("WaitingRegistry lock poisoned")
    }

    fn arm_timer(&self, user_id: String, timer: CancellationToken, timeout: Duration) {
        let registry = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = timer.cancelled() => return,
                _ = tokio::time::sleep(timeout) => {}
            }

            let expired = {
                let mut sessions = registry.lock();
                // Consume, replace, cancel and shutdown all run under this lock, so an
                // uncancelled token here means the entry is still ours.
                if timer.is_cancelled() {
                    None
                } else {
                    timer.cancel();
                    sessions.remove(&user_id).map(|entry| entry.session)
                }
            };

            if let Some(session) = expired {
                info!("[user:{}] Waiting session timed out", user_id);
                reply_logged(&session.reply, messages::session::TIMED_OUT).await;
            }
        });
    }
}
