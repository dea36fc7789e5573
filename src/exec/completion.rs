// src/exec/completion.rs

//! Completion heuristic as a pure state machine.
//!
//! ```text
//! Streaming ──sentinel──▶ SentinelSeen { deadline } ──tick ≥ deadline──▶ Finished(GracePeriodElapsed)
//!     │                          │
//!     └──────child exited────────┴──────────────────────────────────────▶ Finished(Exited)
//! ```
//!
//! The grace timer is just a deadline stored in the state; whoever drives the
//! machine decides how to wait for it. Child exit cancels a pending timer.
//! No Tokio timers, channels or processes are involved here, so every
//! transition can be tested with synthetic instants.

use std::time::Duration;

use tokio::time::Instant;

use crate::types::FinishReason;

/// Line prefix emitted once the converter has written its final statistics.
pub const DEFAULT_SENTINEL: &str = "final ratefactor:";

/// How long to keep absorbing trailing output after the sentinel.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(60);

// Roughly 30 years.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionPhase {
    Streaming,
    SentinelSeen { deadline: Instant },
    Finished(FinishReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionEvent {
    /// A diagnostic line starting with the sentinel was read.
    SentinelLine,
    /// The child process exited.
    ChildExited,
    /// Time passed; re-evaluate a pending grace deadline.
    Tick,
}

#[derive(Debug, Clone)]
pub struct CompletionTracker {
    grace_period: Duration,
    phase: CompletionPhase,
}

impl CompletionTracker {
    pub fn new(grace_period: Duration) -> Self {
        Self {
            grace_period,
            phase: CompletionPhase::Streaming,
        }
    }

    pub fn phase(&self) -> CompletionPhase {
        self.phase
    }

    /// Pending grace deadline, if the sentinel has been seen.
    pub fn deadline(&self) -> Option<Instant> {
        match self.phase {
            CompletionPhase::SentinelSeen { deadline } => Some(deadline),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, CompletionPhase::Finished(_))
    }

    pub fn handle(&mut self, event: CompletionEvent, now: Instant) -> CompletionPhase {
        self.phase = match (self.phase, event) {
            (CompletionPhase::Finished(reason), _) => CompletionPhase::Finished(reason),
            (_, CompletionEvent::ChildExited) => CompletionPhase::Finished(FinishReason::Exited),
            (CompletionPhase::Streaming, CompletionEvent::SentinelLine) => {
                CompletionPhase::SentinelSeen {
                    deadline: deadline_after(now, self.grace_period),
                }
            }
            // Repeated sentinels do not extend the first timer.
            (phase @ CompletionPhase::SentinelSeen { .. }, CompletionEvent::SentinelLine) => phase,
            (CompletionPhase::SentinelSeen { deadline }, CompletionEvent::Tick)
                if now >= deadline =>
            {
                CompletionPhase::Finished(FinishReason::GracePeriodElapsed)
            }
            (phase, CompletionEvent::Tick) => phase,
        };
        self.phase
    }
}

impl Default for CompletionTracker {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE_PERIOD)
    }
}

/// `now + grace`, saturating to a far-future instant for huge grace periods.
fn deadline_after(now: Instant, grace: Duration) -> Instant {
    now.checked_add(grace)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Whether `line` carries the completion sentinel.
pub fn is_sentinel(line: &str, sentinel: &str) -> bool {
    !sentinel.is_empty() && line.starts_with(sentinel)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: Duration = Duration::from_secs(1);

    #[test]
    fn sentinel_then_trailing_lines_waits_full_grace_period() {
        let t0 = Instant::now();
        let mut tracker = CompletionTracker::default();

        tracker.handle(CompletionEvent::SentinelLine, t0);
        // Three trailing lines over ten seconds; none of them finish the run.
        for secs in [3u32, 6, 10] {
            let phase = tracker.handle(CompletionEvent::Tick, t0 + SEC * secs);
            assert!(matches!(phase, CompletionPhase::SentinelSeen { .. }));
        }
        let phase = tracker.handle(CompletionEvent::Tick, t0 + SEC * 59);
        assert!(!matches!(phase, CompletionPhase::Finished(_)));

        let phase = tracker.handle(CompletionEvent::Tick, t0 + SEC * 60);
        assert_eq!(
            phase,
            CompletionPhase::Finished(FinishReason::GracePeriodElapsed)
        );
    }

    #[test]
    fn unbounded_grace_period_never_elapses_early() {
        let t0 = Instant::now();
        let mut tracker = CompletionTracker::new(Duration::MAX);

        let phase = tracker.handle(CompletionEvent::SentinelLine, t0);
        assert!(matches!(phase, CompletionPhase::SentinelSeen { deadline } if deadline > t0));

        let phase = tracker.handle(CompletionEvent::Tick, t0 + SEC * 3600);
        assert!(matches!(phase, CompletionPhase::SentinelSeen { .. }));
        assert_eq!(
            tracker.handle(CompletionEvent::ChildExited, t0 + SEC * 3601),
            CompletionPhase::Finished(FinishReason::Exited)
        );
    }

    #[test]
    fn repeated_sentinel_keeps_first_deadline() {
        let t0 = Instant::now();
        let mut tracker = CompletionTracker::new(SEC * 10);

        tracker.handle(CompletionEvent::SentinelLine, t0);
        tracker.handle(CompletionEvent::SentinelLine, t0 + SEC * 5);

        assert_eq!(tracker.deadline(), Some(t0 + SEC * 10));
    }

    #[test]
    fn child_exit_cancels_grace_timer() {
        let t0 = Instant::now();
        let mut tracker = CompletionTracker::new(SEC * 10);

        tracker.handle(CompletionEvent::SentinelLine, t0);
        let phase = tracker.handle(CompletionEvent::ChildExited, t0 + SEC);

        assert_eq!(phase, CompletionPhase::Finished(FinishReason::Exited));
        assert_eq!(tracker.deadline(), None);
    }

    #[test]
    fn finished_is_terminal() {
        let t0 = Instant::now();
        let mut tracker = CompletionTracker::new(SEC);

        tracker.handle(CompletionEvent::ChildExited, t0);
        tracker.handle(CompletionEvent::SentinelLine, t0);
        tracker.handle(CompletionEvent::Tick, t0 + SEC * 100);

        assert_eq!(
            tracker.phase(),
            CompletionPhase::Finished(FinishReason::Exited)
        );
    }

    #[test]
    fn ticks_without_sentinel_never_finish() {
        let t0 = Instant::now();
        let mut tracker = CompletionTracker::new(SEC);

        tracker.handle(CompletionEvent::Tick, t0 + SEC * 1000);

        assert_eq!(tracker.phase(), CompletionPhase::Streaming);
    }

    #[test]
    fn sentinel_matches_prefix_only() {
        assert!(is_sentinel("final ratefactor: 23.5", DEFAULT_SENTINEL));
        assert!(!is_sentinel("  final ratefactor: 23.5", DEFAULT_SENTINEL));
        assert!(!is_sentinel("frame=  10 fps=0.0", DEFAULT_SENTINEL));
        assert!(!is_sentinel("anything", ""));
    }
}
