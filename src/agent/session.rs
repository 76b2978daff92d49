//! Per-conversation state owned by whoever drives the agent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::warn;

use super::error::AgentError;
use crate::conversation::ConversationStore;
use crate::message::{ChatMessage, Message};
use crate::session::Transcript;

/// One conversation plus its `processing` flag.
///
/// At most one turn runs per session. The log lives behind a mutex only so
/// the session can be shared by reference; the flag is what serializes
/// writers.
pub struct AgentSession {
    conversation: Mutex<ConversationStore>,
    processing: AtomicBool,
    transcript: Option<Mutex<Transcript>>,
}

/// Clears `processing` when the turn ends, however it ends.
pub(super) struct ProcessingGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl AgentSession {
    /// An in-memory session that is never written to disk.
    pub fn new() -> Self {
        Self::from_parts(ConversationStore::new(), None)
    }

    /// A session that mirrors every append into `transcript`, seeded with
    /// previously recorded `history`.
    pub fn recorded(transcript: Transcript, history: Vec<Message>) -> Self {
        Self::from_parts(
            ConversationStore::from_messages(history),
            Some(Mutex::new(transcript)),
        )
    }

    fn from_parts(conversation: ConversationStore, transcript: Option<Mutex<Transcript>>) -> Self {
        Self {
            conversation: Mutex::new(conversation),
            processing: AtomicBool::new(false),
            transcript,
        }
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    pub(super) fn begin(&self) -> Result<ProcessingGuard<'_>, AgentError> {
        self.processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AgentError::Busy)?;
        Ok(ProcessingGuard {
            flag: &self.processing,
        })
    }

    fn store(&self) -> MutexGuard<'_, ConversationStore> {
        self.conversation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `messages` in order. Transcript write failures are logged and
    /// do not affect the in-memory log.
    pub(super) fn commit(&self, messages: Vec<Message>) {
        if let Some(transcript) = &self.transcript {
            let mut transcript = transcript.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = transcript.record(&messages) {
                warn!(session = %transcript.id, error = %format!("{e:#}"), "failed to persist messages");
            }
        }
        let mut store = self.store();
        for msg in messages {
            store.append(msg);
        }
    }

    /// Copy of the log in append order.
    pub fn messages(&self) -> Vec<Message> {
        self.store().messages().to_vec()
    }

    pub fn len(&self) -> usize {
        self.store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store().is_empty()
    }

    pub fn flatten(&self, preamble: &str) -> Vec<ChatMessage> {
        self.store().flatten(preamble)
    }

    pub fn transcript_id(&self) -> Option<String> {
        self.transcript.as_ref().map(|t| {
            t.lock().unwrap_or_else(PoisonError::into_inner).id.clone()
        })
    }
}

impl Default for AgentSession {
    fn default() -> Self {
        Self::new()
    }
}
