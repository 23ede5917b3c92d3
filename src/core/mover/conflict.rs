//! External decisions for the `Ask` conflict policy.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// What to do about one conflicting destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictDecision {
    Rename,
    Skip,
    Overwrite,
}

/// The question put to the decision-maker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictPrompt {
    pub pending_id: String,
    pub file_name: String,
    pub source: PathBuf,
    /// The file that is already there
    pub destination: PathBuf,
}

/// Anything that can answer a conflict prompt
///
/// Implementations must return within roughly `timeout`; `None` means no
/// decision (timed out, cancelled, or nobody listening).
pub trait ConflictResolver: Send + Sync {
    fn decide(&self, prompt: &ConflictPrompt, timeout: Duration) -> Option<ConflictDecision>;
}

/// A prompt waiting for an answer
pub struct ConflictRequest {
    pub prompt: ConflictPrompt,
    reply: Sender<ConflictDecision>,
}

impl ConflictRequest {
    /// Answer the prompt. Returns false if the mover already gave up waiting.
    pub fn respond(self, decision: ConflictDecision) -> bool {
        self.reply.send(decision).is_ok()
    }

    /// Decline to answer; the waiting move fails immediately
    pub fn cancel(self) {}
}

/// Publishes prompts on a channel for a UI to answer
#[derive(Clone)]
pub struct ChannelResolver {
    requests: Sender<ConflictRequest>,
}

impl ChannelResolver {
    pub fn new() -> (Self, Receiver<ConflictRequest>) {
        let (requests, receiver) = unbounded();
        (Self { requests }, receiver)
    }
}

impl ConflictResolver for ChannelResolver {
    fn decide(&self, prompt: &ConflictPrompt, timeout: Duration) -> Option<ConflictDecision> {
        let (reply, answer) = bounded(1);
        self.requests
            .send(ConflictRequest {
                prompt: prompt.clone(),
                reply,
            })
            .ok()?;
        answer.recv_timeout(timeout).ok()
    }
}
