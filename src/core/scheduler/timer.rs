//! Deadline timers on a single background thread.

use crossbeam_channel::{unbounded, RecvTimeoutError, Sender};
use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Shared flag that disarms a timer
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

enum TimerCommand {
    Arm {
        id: String,
        deadline: Instant,
        token: CancellationToken,
    },
    Shutdown,
}

struct Armed {
    deadline: Instant,
    seq: u64,
    id: String,
    token: CancellationToken,
}

impl PartialEq for Armed {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for Armed {}

impl PartialOrd for Armed {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Armed {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.deadline
            .cmp(&other.deadline)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Fires a callback with the timer's id once its deadline passes
///
/// The callback runs on the timer thread and must not block; hand real work
/// to another thread.
pub(crate) struct TimerWheel {
    commands: Sender<TimerCommand>,
    handle: Option<JoinHandle<()>>,
}

impl TimerWheel {
    pub(crate) fn start<F>(on_fire: F) -> Self
    where
        F: Fn(String) + Send + 'static,
    {
        let (commands, receiver) = unbounded::<TimerCommand>();

        let handle = thread::Builder::new()
            .name("autosort-timers".to_string())
            .spawn(move || {
                let mut heap: BinaryHeap<Reverse<Armed>> = BinaryHeap::new();
                let mut seq = 0u64;

                loop {
                    let command = match heap.peek() {
                        Some(Reverse(next)) => receiver
                            .recv_timeout(next.deadline.saturating_duration_since(Instant::now())),
                        None => receiver
                            .recv()
                            .map_err(|_| RecvTimeoutError::Disconnected),
                    };

                    match command {
                        Ok(TimerCommand::Arm {
                            id,
                            deadline,
                            token,
                        }) => {
                            seq += 1;
                            heap.push(Reverse(Armed {
                                deadline,
                                seq,
                                id,
                                token,
                            }));
                        }
                        Ok(TimerCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {}
                    }

                    let now = Instant::now();
                    while heap
                        .peek()
                        .is_some_and(|Reverse(next)| next.deadline <= now)
                    {
                        if let Some(Reverse(due)) = heap.pop() {
                            if !due.token.is_cancelled() {
                                on_fire(due.id);
                            }
                        }
                    }
                }
            });

        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!("Failed to start timer thread: {}", e);
                None
            }
        };

        Self { commands, handle }
    }

    /// Fire `id` at `deadline` unless `token` is cancelled first
    pub(crate) fn arm(&self, id: String, deadline: Instant, token: CancellationToken) {
        if self.handle.is_none() {
            tracing::error!(id = %id, "Timer thread is not running; entry will only move on demand");
            return;
        }
        let _ = self.commands.send(TimerCommand::Arm {
            id,
            deadline,
            token,
        });
    }
}

impl Drop for TimerWheel {
    fn drop(&mut self) {
        let _ = self.commands.send(TimerCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            // The last owner may be dropped from inside a fire callback
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::time::Duration;

    #[test]
    fn fires_in_deadline_order() {
        let (tx, rx) = unbounded();
        let wheel = TimerWheel::start(move |id| {
            let _ = tx.send(id);
        });

        let now = Instant::now();
        wheel.arm("late".into(), now + Duration::from_millis(60), CancellationToken::new());
        wheel.arm("early".into(), now + Duration::from_millis(10), CancellationToken::new());

        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first, "early");
        assert_eq!(second, "late");
    }

    #[test]
    fn cancelled_timer_does_not_fire() {
        let (tx, rx) = unbounded();
        let wheel = TimerWheel::start(move |id| {
            let _ = tx.send(id);
        });

        let token = CancellationToken::new();
        wheel.arm("gone".into(), Instant::now() + Duration::from_millis(30), token.clone());
        token.cancel();
        wheel.arm("kept".into(), Instant::now() + Duration::from_millis(50), CancellationToken::new());

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), "kept");
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn past_deadline_fires_immediately() {
        let (tx, rx) = unbounded();
        let wheel = TimerWheel::start(move |id| {
            let _ = tx.send(id);
        });

        wheel.arm("now".into(), Instant::now(), CancellationToken::new());
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), "now");
    }

    #[test]
    fn drop_stops_the_thread() {
        let (tx, rx) = unbounded();
        let wheel = TimerWheel::start(move |id| {
            let _ = tx.send(id);
        });
        wheel.arm("never".into(), Instant::now() + Duration::from_secs(60), CancellationToken::new());
        drop(wheel);

        // Sender lives in the closure, so the channel closes once the thread exits
        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(2)),
            Err(RecvTimeoutError::Disconnected)
        ));
    }
}
