// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! HTTP transport
//!
//! Each transfer is a blocking `ureq` GET request run on its own worker
//! thread. Events are sent back through [`TransferEvents`] as the response
//! arrives.

use crate::transfer::{
    TransferEvents, TransferId, TransferRequest, Transport, TransportError, TransportEvent,
};
use log::{debug, trace};
use std::collections::HashMap;
use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use ureq::http::header::CONTENT_LENGTH;
use ureq::http::Uri;

/// Size of the buffer each body chunk is read into
const CHUNK_SIZE: usize = 16 * 1024;

/// A [`Transport`] over HTTP(S), using `ureq`
///
/// This is the default transport when the `http` feature is enabled.
/// Dropping the transport cancels all of its transfers.
pub struct HttpTransport {
    agent: ureq::Agent,
    next_id: u64,
    // The worker holds the other reference while it runs
    workers: HashMap<TransferId, Arc<AtomicBool>>,
}

impl Default for HttpTransport {
    fn default() -> Self {
        HttpTransport::new()
    }
}

impl HttpTransport {
    /// Construct with a default agent
    pub fn new() -> Self {
        Self::with_agent(ureq::Agent::new_with_defaults())
    }

    /// Construct over a configured agent
    pub fn with_agent(agent: ureq::Agent) -> Self {
        HttpTransport {
            agent,
            next_id: 0,
            workers: HashMap::new(),
        }
    }
}

fn validate(url: &str) -> Result<(), TransportError> {
    let uri: Uri = url
        .parse()
        .map_err(|_| TransportError::InvalidRequest(url.to_string()))?;
    match (uri.scheme_str(), uri.host()) {
        (Some("http" | "https"), Some(_)) => Ok(()),
        _ => Err(TransportError::InvalidRequest(url.to_string())),
    }
}

impl Transport for HttpTransport {
    fn begin(
        &mut self,
        request: TransferRequest,
        events: TransferEvents,
    ) -> Result<TransferId, TransportError> {
        validate(&request.url)?;

        self.workers.retain(|_, flag| Arc::strong_count(flag) > 1);
        self.next_id += 1;
        let id = TransferId(self.next_id);
        let cancelled = Arc::new(AtomicBool::new(false));

        let agent = self.agent.clone();
        let flag = cancelled.clone();
        thread::Builder::new()
            .name(format!("font-transfer-{}", id.0))
            .spawn(move || {
                let result = fetch(&agent, id, &request, &events, &flag);
                if let Err(err) = &result {
                    debug!("transfer {id:?} of {} ended: {err}", request.url);
                }
                events.send(id, TransportEvent::Finished(result));
            })
            .map_err(|err| TransportError::Failed(err.to_string()))?;

        self.workers.insert(id, cancelled);
        Ok(id)
    }

    fn cancel(&mut self, id: TransferId) {
        if let Some(flag) = self.workers.remove(&id) {
            flag.store(true, Ordering::Release);
        }
    }
}

impl Drop for HttpTransport {
    fn drop(&mut self) {
        for flag in self.workers.values() {
            flag.store(true, Ordering::Release);
        }
    }
}

fn fetch(
    agent: &ureq::Agent,
    id: TransferId,
    request: &TransferRequest,
    events: &TransferEvents,
    cancelled: &AtomicBool,
) -> Result<(), TransportError> {
    let is_cancelled = || cancelled.load(Ordering::Acquire);

    let response = agent
        .get(request.url.as_str())
        .header("Referer", request.referer.as_str())
        .call()
        .map_err(|err| TransportError::Failed(err.to_string()))?;

    let content_length = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());
    trace!("transfer {id:?}: response, content length {content_length:?}");
    if is_cancelled() || !events.send(id, TransportEvent::Response { content_length }) {
        return Err(TransportError::Cancelled);
    }

    let mut reader = response.into_body().into_reader();
    let mut buf = vec![0; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::Failed(err.to_string())),
        };
        if is_cancelled() || !events.send(id, TransportEvent::Data(buf[..n].to_vec())) {
            return Err(TransportError::Cancelled);
        }
    }
}
