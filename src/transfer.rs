// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Network transfers of custom fonts
//!
//! A [`Transport`] performs one GET-style request per custom font. It reports
//! events through [`TransferEvents`], tagged with the [`TransferId`] it
//! assigned when the transfer began. Events may be sent from any thread; they
//! are dispatched on the thread owning the
//! [`FontAcquisitionService`](crate::FontAcquisitionService).
//!
//! Each in-flight transfer is tracked by an [`AcquisitionTask`] within a
//! [`TransferRegistry`].

use crate::conv::{progress_ratio, to_expected_size, UNKNOWN_LENGTH};
use std::collections::HashMap;
use std::sync::mpsc::Sender;
use thiserror::Error;

/// Transfer identifier
///
/// Assigned by the [`Transport`]; unique among concurrent transfers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransferId(pub u64);

/// Transport errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request could not be issued
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The transfer was cancelled
    #[error("transfer cancelled")]
    Cancelled,
    /// The transfer failed
    #[error("transfer failed: {0}")]
    Failed(String),
}

/// A request for a custom font
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferRequest {
    /// Source URL
    pub url: String,
    /// Value of the `Referer` header
    pub referer: String,
}

/// Events reported by a [`Transport`]
///
/// For each transfer, events must be reported in order: one `Response`, any
/// number of `Data`, then one `Finished`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// The response was received
    Response {
        /// Declared content length, if any
        content_length: Option<u64>,
    },
    /// A chunk of the body was received
    Data(Vec<u8>),
    /// The transfer reached a terminal state
    Finished(Result<(), TransportError>),
}

/// Event sink handed to a [`Transport`]
#[derive(Clone, Debug)]
pub struct TransferEvents(pub(crate) Sender<(TransferId, TransportEvent)>);

impl TransferEvents {
    /// Report `event` for transfer `id`
    ///
    /// Returns false if the receiving service no longer exists.
    pub fn send(&self, id: TransferId, event: TransportEvent) -> bool {
        self.0.send((id, event)).is_ok()
    }
}

/// A network transport
pub trait Transport {
    /// Begin a transfer
    ///
    /// The returned identifier tags all events sent to `events` for this
    /// transfer. Events must not be expected to be handled before this
    /// method returns.
    fn begin(
        &mut self,
        request: TransferRequest,
        events: TransferEvents,
    ) -> Result<TransferId, TransportError>;

    /// Cancel a transfer
    ///
    /// Events subsequently reported for `id` are ignored.
    fn cancel(&mut self, id: TransferId);
}

/// State of one in-flight transfer
#[derive(Clone, Debug)]
pub struct AcquisitionTask {
    transfer_id: TransferId,
    font_name: String,
    bytes_received: Vec<u8>,
    expected_size: i64,
    progress: f32,
}

impl AcquisitionTask {
    /// Construct for a transfer which just began
    pub fn new(transfer_id: TransferId, font_name: impl Into<String>) -> Self {
        AcquisitionTask {
            transfer_id,
            font_name: font_name.into(),
            bytes_received: Vec::new(),
            expected_size: UNKNOWN_LENGTH,
            progress: 0.0,
        }
    }

    /// Transfer identifier
    #[inline]
    pub fn transfer_id(&self) -> TransferId {
        self.transfer_id
    }

    /// Name of the font being acquired
    #[inline]
    pub fn font_name(&self) -> &str {
        &self.font_name
    }

    /// Bytes received so far
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes_received
    }

    /// Take the received bytes
    pub fn take_bytes(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes_received)
    }

    /// Expected size, or [`UNKNOWN_LENGTH`]
    #[inline]
    pub fn expected_size(&self) -> i64 {
        self.expected_size
    }

    /// Progress in `[0, 1]`
    #[inline]
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// Begin the response body
    ///
    /// Resets the buffer and progress.
    pub fn start_response(&mut self, content_length: Option<u64>) {
        self.expected_size = to_expected_size(content_length);
        self.bytes_received.clear();
        self.progress = 0.0;
    }

    /// Append a chunk, returning the updated progress
    ///
    /// Progress never decreases. With an unknown expected size it stays at
    /// its last value.
    pub fn append(&mut self, chunk: &[u8]) -> f32 {
        self.bytes_received.extend_from_slice(chunk);
        if let Some(p) = progress_ratio(self.bytes_received.len(), self.expected_size) {
            self.progress = self.progress.max(p);
        }
        self.progress
    }

    /// Mark progress as complete
    pub fn finish(&mut self) {
        self.progress = 1.0;
    }
}

/// Table of in-flight transfers
///
/// Tasks are indexed by transfer identifier and by font name. Both indices
/// are always updated together. At most one task exists per font name.
#[derive(Debug, Default)]
pub struct TransferRegistry {
    tasks: HashMap<TransferId, AcquisitionTask>,
    by_name: HashMap<String, TransferId>,
}

impl TransferRegistry {
    /// Construct an empty registry
    pub fn new() -> Self {
        TransferRegistry::default()
    }

    /// Insert a task
    ///
    /// Any task previously indexed under either key is removed and returned.
    pub fn insert(&mut self, task: AcquisitionTask) -> Vec<AcquisitionTask> {
        let mut replaced = Vec::new();
        if let Some(old) = self.remove(task.transfer_id) {
            replaced.push(old);
        }
        if let Some(old) = self.remove_by_name(&task.font_name) {
            replaced.push(old);
        }
        self.by_name
            .insert(task.font_name.clone(), task.transfer_id);
        self.tasks.insert(task.transfer_id, task);
        replaced
    }

    /// Get a task by transfer identifier
    pub fn get(&self, id: TransferId) -> Option<&AcquisitionTask> {
        self.tasks.get(&id)
    }

    /// Get a task by transfer identifier
    pub fn get_mut(&mut self, id: TransferId) -> Option<&mut AcquisitionTask> {
        self.tasks.get_mut(&id)
    }

    /// Get a task by font name
    pub fn get_by_name(&self, name: &str) -> Option<&AcquisitionTask> {
        self.by_name.get(name).and_then(|id| self.tasks.get(id))
    }

    /// Remove a task by transfer identifier
    pub fn remove(&mut self, id: TransferId) -> Option<AcquisitionTask> {
        let task = self.tasks.remove(&id)?;
        self.by_name.remove(&task.font_name);
        Some(task)
    }

    /// Remove a task by font name
    pub fn remove_by_name(&mut self, name: &str) -> Option<AcquisitionTask> {
        let id = self.by_name.remove(name)?;
        self.tasks.remove(&id)
    }

    /// Identifiers of all tasks
    pub fn ids(&self) -> impl Iterator<Item = TransferId> + '_ {
        self.tasks.keys().copied()
    }

    /// Number of tasks
    pub fn len(&self) -> usize {
        debug_assert_eq!(self.tasks.len(), self.by_name.len());
        self.tasks.len()
    }

    /// True if there are no tasks
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
