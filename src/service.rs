// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Font acquisition service

use crate::fonts::{dynamic_font, is_available, register_file, Font, FontDb, FontRegistry};
use crate::managed::{ManagedFontProvider, MatchAction, MatchEvent, MatchMachine, Next};
use crate::transfer::{
    AcquisitionTask, TransferEvents, TransferId, TransferRegistry, TransferRequest, Transport,
    TransportError, TransportEvent,
};
use crate::{
    Callbacks, Completion, Config, FontDirectory, JsonFileSettings, ProviderError, RegisterError,
    ResolvedFontCache, SettingsStore, Subscription,
};
use log::{debug, info, trace, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};

/// A [`Transport`] which refuses all requests
///
/// This is the default transport without the `http` feature.
#[derive(Debug, Default)]
pub struct NoTransport;

impl Transport for NoTransport {
    fn begin(
        &mut self,
        _: TransferRequest,
        _: TransferEvents,
    ) -> Result<TransferId, TransportError> {
        Err(TransportError::InvalidRequest(
            "no transport configured".to_string(),
        ))
    }

    fn cancel(&mut self, _: TransferId) {}
}

/// A [`ManagedFontProvider`] which knows no fonts
///
/// This is the default when no provider is configured.
#[derive(Debug, Default)]
pub struct NoProvider;

impl ManagedFontProvider for NoProvider {
    fn resolve(&mut self, name: &str) -> Result<Subscription, ProviderError> {
        Err(ProviderError::NotFound(name.to_string()))
    }

    fn font_path(&self, _: &str) -> Option<PathBuf> {
        None
    }
}

enum ManagedSink {
    Acquire(Callbacks),
    Use {
        size: f32,
        callback: Option<Box<dyn FnOnce(Option<Font>)>>,
    },
}

struct ManagedSession {
    subscription: Subscription,
    machine: MatchMachine,
    sink: ManagedSink,
}

impl ManagedSession {
    // Use callbacks must be called exactly once
    fn abandon(mut self) {
        if let ManagedSink::Use { callback, .. } = &mut self.sink {
            if let Some(f) = callback.take() {
                f(None);
            }
        }
    }
}

/// Builder for [`FontAcquisitionService`]
pub struct ServiceBuilder {
    config: Config,
    registry: Option<Box<dyn FontRegistry>>,
    transport: Option<Box<dyn Transport>>,
    provider: Option<Box<dyn ManagedFontProvider>>,
    settings: Option<Box<dyn SettingsStore>>,
}

impl ServiceBuilder {
    /// Use `registry` as the font table
    ///
    /// Default: [`FontDb::with_system_fonts`] (or an empty [`FontDb`]
    /// without the `system-fonts` feature).
    pub fn registry(mut self, registry: impl FontRegistry + 'static) -> Self {
        self.registry = Some(Box::new(registry));
        self
    }

    /// Use `transport` for custom font downloads
    ///
    /// Default: `HttpTransport` (or [`NoTransport`] without the `http`
    /// feature).
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Use `provider` for managed fonts
    ///
    /// Default: [`NoProvider`].
    pub fn provider(mut self, provider: impl ManagedFontProvider + 'static) -> Self {
        self.provider = Some(Box::new(provider));
        self
    }

    /// Use `settings` to persist resolved font paths
    ///
    /// Default: [`JsonFileSettings`] at [`Config::settings_path`].
    pub fn settings(mut self, settings: impl SettingsStore + 'static) -> Self {
        self.settings = Some(Box::new(settings));
        self
    }

    /// Build the service
    ///
    /// This loads the resolved font cache from settings.
    pub fn build(self) -> FontAcquisitionService {
        let registry = self.registry.unwrap_or_else(|| {
            #[cfg(feature = "system-fonts")]
            let db = FontDb::with_system_fonts();
            #[cfg(not(feature = "system-fonts"))]
            let db = FontDb::new();
            Box::new(db)
        });
        let settings = self
            .settings
            .unwrap_or_else(|| Box::new(JsonFileSettings::new(&self.config.settings_path)));
        let (events_tx, events_rx) = channel();

        FontAcquisitionService {
            dir: FontDirectory::new(&self.config.font_dir),
            registry,
            transport: self.transport.unwrap_or_else(|| {
                #[cfg(feature = "http")]
                let transport = crate::HttpTransport::new();
                #[cfg(not(feature = "http"))]
                let transport = NoTransport;
                Box::new(transport)
            }),
            provider: self.provider.unwrap_or_else(|| Box::new(NoProvider)),
            cache: ResolvedFontCache::load(settings),
            transfers: TransferRegistry::new(),
            current: None,
            custom: HashMap::new(),
            managed: HashMap::new(),
            events_tx,
            events_rx,
            config: self.config,
        }
    }
}

/// Acquires fonts by name, from a URL or from a managed font provider
///
/// The service and all callbacks it invokes are confined to one thread.
/// Collaborators may report events from other threads; these are dispatched
/// by [`Self::poll`], which the owner should call from its event loop.
///
/// In-flight state is keyed by font name. Only one custom-font transfer is
/// active at a time: beginning another cancels the first. A second request
/// for a name already being resolved replaces the first request.
///
/// No error is returned from acquisition methods. Custom-font acquisitions
/// always report completion, with a [`Completion`] describing the outcome.
/// Managed-font acquisitions report completion only on success.
pub struct FontAcquisitionService {
    config: Config,
    registry: Box<dyn FontRegistry>,
    transport: Box<dyn Transport>,
    provider: Box<dyn ManagedFontProvider>,
    cache: ResolvedFontCache,
    dir: FontDirectory,
    transfers: TransferRegistry,
    current: Option<TransferId>,
    custom: HashMap<String, Callbacks>,
    managed: HashMap<String, ManagedSession>,
    events_tx: Sender<(TransferId, TransportEvent)>,
    events_rx: Receiver<(TransferId, TransportEvent)>,
}

/// Construction and access
impl FontAcquisitionService {
    /// Start building a service
    pub fn builder(config: Config) -> ServiceBuilder {
        ServiceBuilder {
            config,
            registry: None,
            transport: None,
            provider: None,
            settings: None,
        }
    }

    /// Configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The font table
    pub fn registry(&self) -> &dyn FontRegistry {
        &*self.registry
    }

    /// The custom font directory
    pub fn font_directory(&self) -> &FontDirectory {
        &self.dir
    }

    /// The provider path recorded for managed font `name`
    pub fn resolved_path(&self, name: &str) -> Option<&Path> {
        self.cache.get(name)
    }

    /// True if no transfer or resolution is in flight
    pub fn is_idle(&self) -> bool {
        self.transfers.is_empty() && self.managed.is_empty()
    }

    /// Register every font stored in the font directory
    ///
    /// Call once at startup. Returns the number of files registered;
    /// failures are logged.
    pub fn register_local_fonts(&mut self) -> usize {
        let names = match self.dir.list() {
            Ok(names) => names,
            Err(err) => {
                warn!("failed to list font directory: {err}");
                return 0;
            }
        };
        let n = names
            .iter()
            .filter(|name| register_file(&mut *self.registry, &self.dir, name).is_ok())
            .count();
        info!("registered {n} of {} local font file(s)", names.len());
        n
    }
}

/// Font lookup
impl FontAcquisitionService {
    /// True if `name` is usable for rendering
    pub fn is_available(&self, name: &str) -> bool {
        is_available(&*self.registry, name)
    }

    /// Construct font `name` at `size` if it is usable
    pub fn font_for(&self, name: &str, size: f32) -> Option<Font> {
        if self.is_available(name) {
            self.registry.font(name, size)
        } else {
            None
        }
    }

    /// Construct font `name`, registering from the font directory or
    /// substituting [`Config::fallback_family`] as required
    ///
    /// This never accesses the network. See [`dynamic_font`].
    pub fn dynamic_font(&mut self, name: &str, size: f32) -> Option<Font> {
        dynamic_font(
            &mut *self.registry,
            &self.dir,
            &self.config.fallback_family,
            name,
            size,
        )
    }

    /// Use font `name` at `size`
    ///
    /// If the font is usable, `callback` is called immediately. Otherwise, if
    /// the font was previously resolved through the managed provider, it is
    /// resolved again and `callback` is called once this finishes. In all
    /// other cases `callback` receives `None`.
    ///
    /// `callback` is called exactly once.
    pub fn use_font(
        &mut self,
        name: &str,
        size: f32,
        callback: impl FnOnce(Option<Font>) + 'static,
    ) {
        if let Some(font) = self.font_for(name, size) {
            return callback(Some(font));
        }
        if !self.cache.contains(name) {
            debug!("use_font: `{name}` is unavailable and was never resolved");
            return callback(None);
        }

        let sink = ManagedSink::Use {
            size,
            callback: Some(Box::new(callback)),
        };
        if let Err(sink) = self.begin_resolution(name, sink) {
            sink.abandon();
        }
    }
}

/// Custom fonts
impl FontAcquisitionService {
    /// Download font `name` from `url`
    ///
    /// If the font is usable, or is stored in the font directory, completion
    /// is reported immediately without network access. Otherwise a transfer
    /// of `url` begins and any other custom font transfer is cancelled; the
    /// result is stored in the font directory and registered. If the
    /// transport refuses the request, other transfers are unaffected.
    ///
    /// Completion is always reported.
    pub fn download_custom_font(&mut self, name: &str, url: &str, mut callbacks: Callbacks) {
        if self.is_available(name) {
            callbacks.progress(1.0);
            return callbacks.complete(Completion::Available);
        }

        if self.dir.contains(name) {
            let result = register_file(&mut *self.registry, &self.dir, name);
            let completion = self.registration_outcome(name, result);
            callbacks.progress(1.0);
            return callbacks.complete(completion);
        }

        if let Err(err) = self.dir.path_for(name) {
            return callbacks.complete(Completion::WriteFailed(err));
        }

        let request = TransferRequest {
            url: url.to_string(),
            referer: self.config.referer.clone(),
        };
        let events = TransferEvents(self.events_tx.clone());
        let id = match self.transport.begin(request, events) {
            Ok(id) => id,
            Err(err) => {
                warn!("failed to begin transfer of `{name}` from {url}: {err}");
                return callbacks.complete(Completion::TransferFailed(err));
            }
        };
        debug!("transfer {id:?}: `{name}` from {url}");

        // A refused request leaves the current transfer running
        if let Some(old) = self.current.take() {
            if old != id && self.transfers.get(old).is_some() {
                info!("cancelling transfer {old:?} superseded by `{name}`");
                self.cancel_transfer(old);
            }
        }

        for task in self.transfers.insert(AcquisitionTask::new(id, name)) {
            self.transport.cancel(task.transfer_id());
            self.complete_custom(task.font_name(), Completion::Cancelled);
        }
        if let Some(mut old) = self.custom.insert(name.to_string(), callbacks) {
            old.complete(Completion::Cancelled);
        }
        self.current = Some(id);
    }

    /// Cancel the transfer of custom font `name`
    ///
    /// Returns true if a transfer was cancelled; its completion is reported
    /// as [`Completion::Cancelled`].
    pub fn cancel_download(&mut self, name: &str) -> bool {
        match self.transfers.get_by_name(name) {
            Some(task) => {
                let id = task.transfer_id();
                self.cancel_transfer(id);
                true
            }
            None => false,
        }
    }

    fn cancel_transfer(&mut self, id: TransferId) {
        self.transport.cancel(id);
        if let Some(task) = self.transfers.remove(id) {
            self.complete_custom(task.font_name(), Completion::Cancelled);
        }
        if self.current == Some(id) {
            self.current = None;
        }
    }

    fn complete_custom(&mut self, name: &str, completion: Completion) {
        if let Some(mut callbacks) = self.custom.remove(name) {
            callbacks.complete(completion);
        }
    }

    fn registration_outcome(&self, name: &str, result: Result<(), RegisterError>) -> Completion {
        if self.is_available(name) {
            return Completion::Available;
        }
        match result {
            Ok(()) => {
                warn!("font `{name}` registered but is not available");
                Completion::Unavailable
            }
            Err(err) => Completion::RegistrationFailed(err),
        }
    }

    /// Handle an event of transfer `id`
    ///
    /// Events are normally delivered through [`Self::poll`]. Events for
    /// unknown (finished or cancelled) transfers are ignored.
    pub fn handle_transfer_event(&mut self, id: TransferId, event: TransportEvent) {
        let Some(task) = self.transfers.get_mut(id) else {
            trace!("ignoring event for inactive transfer {id:?}");
            return;
        };

        match event {
            TransportEvent::Response { content_length } => {
                task.start_response(content_length);
                let name = task.font_name().to_string();
                if let Some(callbacks) = self.custom.get_mut(&name) {
                    callbacks.start();
                }
            }
            TransportEvent::Data(chunk) => {
                let progress = task.append(&chunk);
                trace!(
                    "transfer {id:?}: progress {progress:.4}, received {}, expected {}",
                    task.bytes().len(),
                    task.expected_size()
                );
                let name = task.font_name().to_string();
                if let Some(callbacks) = self.custom.get_mut(&name) {
                    callbacks.progress(progress);
                    if progress >= 1.0 {
                        callbacks.progress(1.0);
                    }
                }
            }
            TransportEvent::Finished(result) => self.finish_transfer(id, result),
        }
    }

    fn finish_transfer(&mut self, id: TransferId, result: Result<(), TransportError>) {
        let Some(mut task) = self.transfers.remove(id) else {
            return;
        };
        if self.current == Some(id) {
            self.current = None;
        }
        let name = task.font_name().to_string();

        if let Err(err) = result {
            warn!("transfer of `{name}` failed: {err}");
            let completion = match err {
                TransportError::Cancelled => Completion::Cancelled,
                err => Completion::TransferFailed(err),
            };
            return self.complete_custom(&name, completion);
        }

        if task.progress() < 1.0 {
            task.finish();
            if let Some(callbacks) = self.custom.get_mut(&name) {
                callbacks.progress(1.0);
            }
        }

        let data = task.take_bytes();
        debug!("transfer of `{name}` complete: {} bytes", data.len());
        let completion = match self.dir.write_atomic(&name, &data) {
            Ok(_) => {
                let result = register_file(&mut *self.registry, &self.dir, &name);
                self.registration_outcome(&name, result)
            }
            Err(err) => {
                warn!("failed to store font `{name}`: {err}");
                Completion::WriteFailed(err)
            }
        };
        self.complete_custom(&name, completion);
    }
}

/// Managed fonts
impl FontAcquisitionService {
    /// Resolve font `name` through the managed font provider
    ///
    /// If the font is usable, completion is reported immediately. Otherwise
    /// the provider resolves (and possibly downloads) the font; progress is
    /// reported as events are handled by [`Self::poll`]. Completion is only
    /// reported if the font becomes usable, in which case the provider's
    /// path to the font is recorded.
    ///
    /// Completion is reported at most once per resolution, even though both
    /// the end of downloading and the end of matching may find the font
    /// usable.
    pub fn download_managed_font(&mut self, name: &str, mut callbacks: Callbacks) {
        if self.is_available(name) {
            callbacks.progress(1.0);
            return callbacks.complete(Completion::Available);
        }

        let _ = self.begin_resolution(name, ManagedSink::Acquire(callbacks));
    }

    /// Cancel the managed resolution of `name`
    ///
    /// No further acquisition callbacks are invoked; a pending
    /// [`Self::use_font`] callback receives `None`.
    pub fn cancel_managed(&mut self, name: &str) -> bool {
        match self.managed.remove(name) {
            Some(session) => {
                session.abandon();
                true
            }
            None => false,
        }
    }

    // On failure the sink is returned to the caller
    fn begin_resolution(&mut self, name: &str, sink: ManagedSink) -> Result<(), AbandonedSink> {
        let subscription = match self.provider.resolve(name) {
            Ok(subscription) => subscription,
            Err(err) => {
                warn!("failed to resolve managed font `{name}`: {err}");
                return Err(AbandonedSink(sink));
            }
        };
        debug!("resolving managed font `{name}`");

        let session = ManagedSession {
            subscription,
            machine: MatchMachine::new(),
            sink,
        };
        if let Some(old) = self.managed.insert(name.to_string(), session) {
            debug!("superseded resolution of `{name}`");
            old.abandon();
        }
        Ok(())
    }

    /// Handle an event of the resolution of `name`
    ///
    /// Events are normally delivered through [`Self::poll`]. Events for
    /// names not being resolved are ignored.
    pub fn handle_match_event(&mut self, name: &str, event: MatchEvent) {
        let Some(session) = self.managed.get_mut(name) else {
            trace!("ignoring event for inactive resolution of `{name}`");
            return;
        };

        let registry = &*self.registry;
        let actions = session
            .machine
            .step(name, event, || is_available(registry, name));

        let mut ended = false;
        for action in actions {
            match action {
                MatchAction::Start => {
                    if let ManagedSink::Acquire(callbacks) = &mut session.sink {
                        callbacks.start();
                    }
                }
                MatchAction::Progress(p) => {
                    if let ManagedSink::Acquire(callbacks) = &mut session.sink {
                        callbacks.progress(p);
                    }
                }
                MatchAction::Persist => {
                    persist_resolved_path(&*self.provider, &mut self.cache, name);
                }
                MatchAction::Complete => match &mut session.sink {
                    ManagedSink::Acquire(callbacks) => callbacks.complete(Completion::Available),
                    ManagedSink::Use { size, callback } => {
                        if let Some(f) = callback.take() {
                            f(self.registry.font(name, *size));
                        }
                    }
                },
                MatchAction::End => ended = true,
            }
        }

        if ended {
            if let Some(session) = self.managed.remove(name) {
                session.abandon();
            }
        }
    }

    fn poll_managed(&mut self) -> usize {
        let names: Vec<String> = self.managed.keys().cloned().collect();
        let mut n = 0;
        for name in names {
            loop {
                let next = match self.managed.get(&name) {
                    Some(session) => session.subscription.try_next(),
                    None => break,
                };
                match next {
                    Next::Event(event) => {
                        n += 1;
                        self.handle_match_event(&name, event);
                    }
                    Next::Pending => break,
                    Next::Closed => {
                        debug!("provider closed resolution of `{name}`");
                        if let Some(session) = self.managed.remove(&name) {
                            session.abandon();
                        }
                        break;
                    }
                }
            }
        }
        n
    }
}

/// Event dispatch
impl FontAcquisitionService {
    /// Dispatch all pending transfer and resolution events
    ///
    /// Returns the number of events handled.
    pub fn poll(&mut self) -> usize {
        let mut n = 0;
        while let Ok((id, event)) = self.events_rx.try_recv() {
            n += 1;
            self.handle_transfer_event(id, event);
        }
        n + self.poll_managed()
    }
}

struct AbandonedSink(ManagedSink);

impl AbandonedSink {
    fn abandon(self) {
        if let ManagedSink::Use {
            callback: Some(f), ..
        } = self.0
        {
            f(None);
        }
    }
}

/// Record the provider path of `name`; failures are logged only
fn persist_resolved_path(
    provider: &dyn ManagedFontProvider,
    cache: &mut ResolvedFontCache,
    name: &str,
) {
    let Some(path) = provider.font_path(name) else {
        warn!("no provider path for resolved font `{name}`");
        return;
    };
    debug!("resolved `{name}` at {}", path.display());
    if let Err(err) = cache.insert(name, path) {
        warn!("failed to persist resolved path of `{name}`: {err}");
    }
}
