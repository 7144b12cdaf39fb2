use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::catalog::CatalogClient;
use crate::config::{DEFAULT_COLLECTION, ResolvedConfig};
use crate::domain::{EnabledProviders, Provider, ResourceDescriptor, SelectedResources};
use crate::error::SelectorError;
use crate::loader::{CatalogLoader, Completion, FetchTicket, Generation, LoadState};
use crate::scope::RetrievalScope;
use crate::store::SelectionStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    ProviderToggled { provider: Provider, enabled: bool },
    ResourceToggled { uri: String, selected: bool },
    CatalogState { status: &'static str, generation: Generation },
    StaleResult { generation: Generation },
}

pub trait SelectionSink {
    fn event(&self, event: SelectionEvent);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    pub accepted: usize,
    pub stale: usize,
}

impl PollReport {
    pub fn applied(&self) -> usize {
        self.accepted + self.stale
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub enabled_providers: EnabledProviders,
    pub selected_resources: SelectedResources,
    pub catalog: LoadState,
    pub scope: RetrievalScope,
    pub query_collections: Vec<String>,
}

struct FetchMessage {
    generation: Generation,
    result: Result<Vec<ResourceDescriptor>, SelectorError>,
}

pub struct Session<C: CatalogClient + 'static> {
    store: SelectionStore,
    loader: CatalogLoader,
    client: Arc<C>,
    tx: Sender<FetchMessage>,
    rx: Receiver<FetchMessage>,
    outstanding: usize,
    default_collection: String,
    sinks: Vec<Box<dyn SelectionSink>>,
}

impl<C: CatalogClient + 'static> Session<C> {
    pub fn new(client: C) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            store: SelectionStore::new(),
            loader: CatalogLoader::new(),
            client: Arc::new(client),
            tx,
            rx,
            outstanding: 0,
            default_collection: DEFAULT_COLLECTION.to_string(),
            sinks: Vec::new(),
        }
    }

    pub fn from_config(client: C, config: &ResolvedConfig) -> Self {
        let mut session = Self::new(client);
        session.default_collection = config.default_collection.clone();
        for provider in &config.providers {
            if !session.store.is_enabled(*provider) {
                session.toggle_provider(*provider);
            }
        }
        for uri in &config.resources {
            if !session.store.is_selected(uri) {
                session.toggle_resource(uri);
            }
        }
        session
    }

    pub fn subscribe(&mut self, sink: Box<dyn SelectionSink>) {
        self.sinks.push(sink);
    }

    pub fn toggle_provider(&mut self, provider: Provider) -> EnabledProviders {
        let enabled = self.store.toggle_provider(provider);
        self.notify(SelectionEvent::ProviderToggled {
            provider,
            enabled: enabled.contains(provider),
        });

        let before = self.loader.state().label();
        if let Some(ticket) = self.loader.on_providers_changed(&enabled) {
            self.dispatch(ticket);
        }
        if self.loader.state().label() != before {
            self.notify_state();
        }
        enabled
    }

    pub fn toggle_resource(&mut self, uri: &str) -> SelectedResources {
        let selected = self.store.toggle_resource(uri);
        self.notify(SelectionEvent::ResourceToggled {
            uri: uri.to_string(),
            selected: selected.contains(uri),
        });
        selected
    }

    pub fn enabled_providers(&self) -> EnabledProviders {
        self.store.enabled_providers()
    }

    pub fn selected_resources(&self) -> SelectedResources {
        self.store.selected_resources()
    }

    pub fn load_state(&self) -> &LoadState {
        self.loader.state()
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn poll(&mut self) -> PollReport {
        let mut report = PollReport::default();
        while let Ok(message) = self.rx.try_recv() {
            self.apply(message, &mut report);
        }
        report
    }

    pub fn wait(&mut self, timeout: Duration) -> PollReport {
        let mut report = PollReport::default();
        if self.outstanding == 0 {
            return report;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(message) => self.apply(message, &mut report),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return report,
        }
        let rest = self.poll();
        report.accepted += rest.accepted;
        report.stale += rest.stale;
        report
    }

    // False when the timeout elapses with the catalog still loading.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.poll();
        while self.loader.state().is_loading() {
            let now = Instant::now();
            if now >= deadline || self.outstanding == 0 {
                return false;
            }
            self.wait(deadline - now);
        }
        true
    }

    pub fn selected_descriptors(&self) -> Vec<ResourceDescriptor> {
        let selected = self.store.selected_resources();
        self.loader
            .catalog()
            .map(|catalog| {
                catalog
                    .resources()
                    .iter()
                    .filter(|resource| selected.contains(&resource.uri))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn retrieval_scope(&self) -> RetrievalScope {
        RetrievalScope::from_selection(
            &self.store.enabled_providers(),
            &self.store.selected_resources(),
        )
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let scope = self.retrieval_scope();
        let query_collections = if scope.local_search {
            scope.collections_or_default(&self.default_collection)
        } else {
            Vec::new()
        };
        SessionSnapshot {
            enabled_providers: self.store.enabled_providers(),
            selected_resources: self.store.selected_resources(),
            catalog: self.loader.state().clone(),
            scope,
            query_collections,
        }
    }

    fn dispatch(&mut self, ticket: FetchTicket) {
        let client = Arc::clone(&self.client);
        let tx = self.tx.clone();
        self.outstanding += 1;
        thread::spawn(move || {
            let result = catch_unwind(AssertUnwindSafe(|| client.list_resources(None)))
                .unwrap_or(Err(SelectorError::WorkerPanicked));
            let message = FetchMessage {
                generation: ticket.generation,
                result,
            };
            if tx.send(message).is_err() {
                debug!(generation = %ticket.generation, "session dropped before catalog result");
            }
        });
    }

    fn apply(&mut self, message: FetchMessage, report: &mut PollReport) {
        self.outstanding = self.outstanding.saturating_sub(1);
        match self.loader.complete(message.generation, message.result) {
            Completion::Accepted => {
                report.accepted += 1;
                self.notify_state();
            }
            Completion::Stale => {
                report.stale += 1;
                self.notify(SelectionEvent::StaleResult {
                    generation: message.generation,
                });
            }
        }
    }

    fn notify_state(&self) {
        self.notify(SelectionEvent::CatalogState {
            status: self.loader.state().label(),
            generation: self.loader.current_generation(),
        });
    }

    fn notify(&self, event: SelectionEvent) {
        for sink in &self.sinks {
            sink.event(event.clone());
        }
    }
}
