// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Caller notification

use crate::{DirectoryError, RegisterError, TransportError};

/// How an acquisition ended
///
/// Completion is best effort: only [`Completion::Available`] guarantees that
/// the font was usable when completion was reported.
#[derive(Debug)]
pub enum Completion {
    /// The font is usable
    Available,
    /// The font data was registered but the name is still not usable
    Unavailable,
    /// The font data could not be registered
    RegistrationFailed(RegisterError),
    /// The downloaded data could not be stored
    WriteFailed(DirectoryError),
    /// The transfer failed; nothing was stored
    TransferFailed(TransportError),
    /// The acquisition was superseded or cancelled
    Cancelled,
}

impl Completion {
    /// True if the font was usable on completion
    #[inline]
    pub fn is_available(&self) -> bool {
        matches!(self, Completion::Available)
    }
}

/// Progress and completion callbacks for one acquisition
///
/// All callbacks are optional and are invoked on the thread driving the
/// [`FontAcquisitionService`](crate::FontAcquisitionService).
///
/// ```
/// # use kas_dynfont::Callbacks;
/// let callbacks = Callbacks::new()
///     .on_start(|| println!("downloading"))
///     .on_progress(|p| println!("{:.0}%", p * 100.0))
///     .on_complete(|c| println!("done: {c:?}"));
/// ```
#[derive(Default)]
pub struct Callbacks {
    on_start: Option<Box<dyn FnMut()>>,
    on_progress: Option<Box<dyn FnMut(f32)>>,
    on_complete: Option<Box<dyn FnOnce(Completion)>>,
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_start", &self.on_start.is_some())
            .field("on_progress", &self.on_progress.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

impl Callbacks {
    /// Construct with no callbacks
    pub fn new() -> Self {
        Callbacks::default()
    }

    /// Set the callback invoked when data starts to arrive
    pub fn on_start(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_start = Some(Box::new(f));
        self
    }

    /// Set the callback invoked with progress in `[0, 1]`
    pub fn on_progress(mut self, f: impl FnMut(f32) + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Set the callback invoked on completion
    pub fn on_complete(mut self, f: impl FnOnce(Completion) + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    pub(crate) fn start(&mut self) {
        if let Some(f) = self.on_start.as_mut() {
            f();
        }
    }

    pub(crate) fn progress(&mut self, progress: f32) {
        if let Some(f) = self.on_progress.as_mut() {
            f(progress);
        }
    }

    /// Report completion; later calls do nothing
    pub(crate) fn complete(&mut self, completion: Completion) {
        if let Some(f) = self.on_complete.take() {
            f(completion);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn complete_once() {
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        let mut cb = Callbacks::new().on_complete(move |_| *c.borrow_mut() += 1);
        cb.complete(Completion::Available);
        cb.complete(Completion::Cancelled);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn missing_callbacks() {
        let mut cb = Callbacks::new();
        cb.start();
        cb.progress(0.5);
        cb.complete(Completion::Unavailable);
    }
}
