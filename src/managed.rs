// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Managed fonts
//!
//! A managed font is resolved by name through a platform-operated
//! [`ManagedFontProvider`], which matches the name against its catalogue,
//! downloads the font if required and registers it. Resolution progress is
//! observed through a [`Subscription`] yielding [`MatchEvent`]s.
//!
//! Events are interpreted by a [`MatchMachine`]:
//!
//! ```none
//! Idle → Matching → Downloading → Resolved
//!             ↘           ↘
//!              Failed ←────┘
//! ```
//!
//! Failure is sticky: once a session has seen [`MatchEvent::Failed`], no
//! further caller-visible effect is produced.

use crate::conv::percent_to_progress;
use log::{debug, warn};
use smallvec::SmallVec;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use thiserror::Error;

/// Managed font provider errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider does not know this font
    #[error("no managed font named `{0}`")]
    NotFound(String),
    /// Matching or downloading failed
    #[error("managed font resolution failed: {0}")]
    Failed(String),
}

/// Phase events of a resolution session
#[derive(Clone, Debug, PartialEq)]
pub enum MatchEvent {
    /// Matching began
    BeginMatching,
    /// A download is required and began
    BeginDownloading,
    /// Download progress, in percent (`0..=100`)
    Downloading(f64),
    /// The download finished
    FinishedDownloading,
    /// An error occurred
    Failed(ProviderError),
    /// Matching finished; this is the final event of a session
    FinishedMatching,
}

/// Result of polling a [`Subscription`]
#[derive(Clone, Debug, PartialEq)]
pub enum Next {
    /// An event
    Event(MatchEvent),
    /// No event is ready yet
    Pending,
    /// The producer is gone; no more events will arrive
    Closed,
}

/// Create a connected producer/subscription pair
pub fn subscription() -> (MatchSender, Subscription) {
    let (tx, rx) = channel();
    let cancelled = Arc::new(AtomicBool::new(false));
    let sender = MatchSender {
        tx,
        cancelled: cancelled.clone(),
    };
    (sender, Subscription { rx, cancelled })
}

/// Producer side of a [`Subscription`]
///
/// May be moved to another thread.
#[derive(Clone, Debug)]
pub struct MatchSender {
    tx: Sender<MatchEvent>,
    cancelled: Arc<AtomicBool>,
}

impl MatchSender {
    /// Send an event
    ///
    /// Returns false once the subscription was cancelled or dropped; the
    /// producer should then stop work.
    pub fn send(&self, event: MatchEvent) -> bool {
        !self.is_cancelled() && self.tx.send(event).is_ok()
    }

    /// True if the subscriber cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// An explicitly cancellable stream of [`MatchEvent`]s
///
/// Dropping a subscription cancels it.
#[derive(Debug)]
pub struct Subscription {
    rx: Receiver<MatchEvent>,
    cancelled: Arc<AtomicBool>,
}

impl Subscription {
    /// Poll for the next event without blocking
    pub fn try_next(&self) -> Next {
        match self.rx.try_recv() {
            Ok(event) => Next::Event(event),
            Err(TryRecvError::Empty) => Next::Pending,
            Err(TryRecvError::Disconnected) => Next::Closed,
        }
    }

    /// Cancel the subscription
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

/// A platform font distribution service
pub trait ManagedFontProvider {
    /// Begin resolving (matching and, if needed, downloading) font `name`
    fn resolve(&mut self, name: &str) -> Result<Subscription, ProviderError>;

    /// The provider's on-disk path of registered font `name`
    fn font_path(&self, name: &str) -> Option<PathBuf>;
}

/// State of a resolution session
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MatchState {
    #[default]
    Idle,
    Matching,
    Downloading,
    Resolved,
    Failed,
}

/// An effect requested by a [`MatchMachine`] transition
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MatchAction {
    /// Report that downloading started
    Start,
    /// Report progress
    Progress(f32),
    /// Record the resolved path of the font
    Persist,
    /// Report completion
    Complete,
    /// The session is over
    End,
}

/// Interprets the events of one resolution session
#[derive(Clone, Debug, Default)]
pub struct MatchMachine {
    state: MatchState,
    completed: bool,
}

impl MatchMachine {
    /// Construct in the idle state
    pub fn new() -> Self {
        MatchMachine::default()
    }

    /// Current state
    #[inline]
    pub fn state(&self) -> MatchState {
        self.state
    }

    /// Advance on `event`
    ///
    /// `available` is consulted on finishing events to check whether the font
    /// became usable. Completion is reported at most once per session.
    pub fn step(
        &mut self,
        name: &str,
        event: MatchEvent,
        available: impl FnOnce() -> bool,
    ) -> SmallVec<[MatchAction; 4]> {
        let mut actions = SmallVec::new();
        let failed = self.state == MatchState::Failed;

        match event {
            MatchEvent::BeginMatching => {
                debug!("`{name}`: begin matching");
                if self.state == MatchState::Idle {
                    self.state = MatchState::Matching;
                }
            }
            MatchEvent::BeginDownloading => {
                debug!("`{name}`: begin downloading");
                if !failed {
                    self.state = MatchState::Downloading;
                    actions.push(MatchAction::Start);
                }
            }
            MatchEvent::Downloading(percent) => {
                debug!("`{name}`: downloading {percent:.0}% complete");
                if !failed {
                    self.state = MatchState::Downloading;
                    actions.push(MatchAction::Progress(percent_to_progress(percent)));
                }
            }
            MatchEvent::FinishedDownloading => {
                debug!("`{name}`: finished downloading");
                if !failed {
                    actions.push(MatchAction::Progress(1.0));
                    self.finish(name, available, false, &mut actions);
                }
            }
            MatchEvent::Failed(err) => {
                warn!("`{name}`: {err}");
                self.state = MatchState::Failed;
            }
            MatchEvent::FinishedMatching => {
                debug!("`{name}`: finished matching");
                if !failed {
                    actions.push(MatchAction::Progress(1.0));
                    self.finish(name, available, true, &mut actions);
                }
                actions.push(MatchAction::End);
            }
        }
        actions
    }

    fn finish(
        &mut self,
        name: &str,
        available: impl FnOnce() -> bool,
        persist: bool,
        actions: &mut SmallVec<[MatchAction; 4]>,
    ) {
        if !available() {
            warn!("`{name}`: font is unavailable after resolution");
            return;
        }
        self.state = MatchState::Resolved;
        if persist {
            actions.push(MatchAction::Persist);
        }
        if !self.completed {
            self.completed = true;
            actions.push(MatchAction::Complete);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use MatchAction::*;

    fn run(events: Vec<MatchEvent>, available: bool) -> Vec<MatchAction> {
        let mut m = MatchMachine::new();
        events
            .into_iter()
            .flat_map(|e| m.step("Acme", e, || available))
            .collect()
    }

    #[test]
    fn success() {
        let actions = run(
            vec![
                MatchEvent::BeginMatching,
                MatchEvent::BeginDownloading,
                MatchEvent::Downloading(25.0),
                MatchEvent::Downloading(100.0),
                MatchEvent::FinishedDownloading,
                MatchEvent::FinishedMatching,
            ],
            true,
        );
        assert_eq!(
            actions,
            vec![
                Start,
                Progress(0.25),
                Progress(1.0),
                Progress(1.0),
                Complete,
                Progress(1.0),
                Persist,
                End
            ]
        );
    }

    #[test]
    fn already_local() {
        let actions = run(
            vec![MatchEvent::BeginMatching, MatchEvent::FinishedMatching],
            true,
        );
        assert_eq!(actions, vec![Progress(1.0), Persist, Complete, End]);
    }

    #[test]
    fn sticky_failure() {
        let mut m = MatchMachine::new();
        let mut actions = Vec::new();
        for event in [
            MatchEvent::BeginDownloading,
            MatchEvent::Downloading(50.0),
            MatchEvent::Failed(ProviderError::Failed("network".into())),
            MatchEvent::FinishedDownloading,
            MatchEvent::FinishedMatching,
        ] {
            actions.extend(m.step("Acme", event, || true));
        }
        assert_eq!(actions, vec![Start, Progress(0.5), End]);
        assert_eq!(m.state(), MatchState::Failed);
    }

    #[test]
    fn unavailable_after_finish() {
        let actions = run(
            vec![MatchEvent::FinishedDownloading, MatchEvent::FinishedMatching],
            false,
        );
        assert_eq!(actions, vec![Progress(1.0), Progress(1.0), End]);
    }

    #[test]
    fn subscription_cancel() {
        let (tx, sub) = subscription();
        assert!(tx.send(MatchEvent::BeginMatching));
        assert_eq!(sub.try_next(), Next::Event(MatchEvent::BeginMatching));
        assert_eq!(sub.try_next(), Next::Pending);
        sub.cancel();
        assert!(tx.is_cancelled());
        assert!(!tx.send(MatchEvent::FinishedMatching));
    }

    #[test]
    fn subscription_closed() {
        let (tx, sub) = subscription();
        tx.send(MatchEvent::FinishedMatching);
        drop(tx);
        assert_eq!(sub.try_next(), Next::Event(MatchEvent::FinishedMatching));
        assert_eq!(sub.try_next(), Next::Closed);
    }
}
