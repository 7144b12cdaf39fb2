use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{EnabledProviders, ResourceDescriptor};
use crate::error::SelectorError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: Generation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog {
    generation: Generation,
    loaded_at: DateTime<Utc>,
    resources: Vec<ResourceDescriptor>,
}

impl Catalog {
    pub fn new(generation: Generation, resources: Vec<ResourceDescriptor>) -> Self {
        Self {
            generation,
            loaded_at: Utc::now(),
            resources,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn resources(&self) -> &[ResourceDescriptor] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LoadState {
    Idle,
    Loading {
        generation: Generation,
    },
    Loaded {
        catalog: Arc<Catalog>,
    },
    Failed {
        generation: Generation,
        reason: String,
    },
}

impl LoadState {
    pub fn label(&self) -> &'static str {
        match self {
            LoadState::Idle => "idle",
            LoadState::Loading { .. } => "loading",
            LoadState::Loaded { .. } => "loaded",
            LoadState::Failed { .. } => "failed",
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading { .. })
    }

    pub fn catalog(&self) -> Option<&Arc<Catalog>> {
        match self {
            LoadState::Loaded { catalog } => Some(catalog),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Accepted,
    Stale,
}

#[derive(Debug)]
pub struct CatalogLoader {
    generation: Generation,
    tracking: bool,
    state: LoadState,
}

impl Default for CatalogLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogLoader {
    pub fn new() -> Self {
        Self {
            generation: Generation::default(),
            tracking: false,
            state: LoadState::Idle,
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn catalog(&self) -> Option<Arc<Catalog>> {
        self.state.catalog().cloned()
    }

    pub fn current_generation(&self) -> Generation {
        self.generation
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    pub fn on_providers_changed(&mut self, enabled: &EnabledProviders) -> Option<FetchTicket> {
        let now_enabled = enabled.knowledge_store_enabled();
        match (self.tracking, now_enabled) {
            (false, true) => {
                self.tracking = true;
                self.generation = self.generation.next();
                self.state = LoadState::Loading {
                    generation: self.generation,
                };
                info!(generation = %self.generation, "dispatching catalog fetch");
                Some(FetchTicket {
                    generation: self.generation,
                })
            }
            (true, false) => {
                self.tracking = false;
                if !matches!(self.state, LoadState::Idle) {
                    debug!(
                        from = self.state.label(),
                        "knowledge store disabled, releasing catalog"
                    );
                }
                self.state = LoadState::Idle;
                None
            }
            _ => None,
        }
    }

    // Applied only while tracking, for the newest generation, and while that
    // generation is still loading. Anything else is stale and changes nothing.
    pub fn complete(
        &mut self,
        generation: Generation,
        result: Result<Vec<ResourceDescriptor>, SelectorError>,
    ) -> Completion {
        let current = self.tracking
            && generation == self.generation
            && self.state == LoadState::Loading { generation };
        if !current {
            debug!(
                %generation,
                current = %self.generation,
                tracking = self.tracking,
                "discarding stale catalog result"
            );
            return Completion::Stale;
        }

        self.state = match result {
            Ok(resources) => {
                info!(%generation, count = resources.len(), "catalog loaded");
                LoadState::Loaded {
                    catalog: Arc::new(Catalog::new(generation, resources)),
                }
            }
            Err(err) => {
                warn!(%generation, error = %err, "catalog fetch failed");
                LoadState::Failed {
                    generation,
                    reason: err.to_string(),
                }
            }
        };
        Completion::Accepted
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::domain::Provider;

    fn with(providers: &[Provider]) -> EnabledProviders {
        providers.iter().copied().collect()
    }

    fn doc_a() -> Vec<ResourceDescriptor> {
        vec![ResourceDescriptor::new("a", "Doc A")]
    }

    #[test]
    fn enabling_knowledge_store_dispatches() {
        let mut loader = CatalogLoader::new();
        let ticket = loader.on_providers_changed(&with(&[Provider::Mongodb])).unwrap();
        assert_eq!(ticket.generation.value(), 1);
        assert_matches!(
            loader.state(),
            LoadState::Loading { generation } if *generation == ticket.generation
        );
        assert!(loader.is_tracking());
    }

    #[test]
    fn other_providers_do_not_dispatch() {
        let mut loader = CatalogLoader::new();
        assert!(loader.on_providers_changed(&with(&[Provider::Web])).is_none());
        assert_eq!(loader.state(), &LoadState::Idle);
    }

    #[test]
    fn unrelated_toggle_while_enabled_keeps_generation() {
        let mut loader = CatalogLoader::new();
        loader.on_providers_changed(&with(&[Provider::Mongodb]));
        let again = loader.on_providers_changed(&with(&[Provider::Mongodb, Provider::Pubmed]));
        assert!(again.is_none());
        assert_eq!(loader.current_generation().value(), 1);
    }

    #[test]
    fn accepted_success_loads_catalog() {
        let mut loader = CatalogLoader::new();
        let ticket = loader.on_providers_changed(&with(&[Provider::Mongodb])).unwrap();
        let before = Utc::now();
        assert_eq!(loader.complete(ticket.generation, Ok(doc_a())), Completion::Accepted);
        let catalog = loader.catalog().unwrap();
        assert_eq!(catalog.resources(), doc_a().as_slice());
        assert_eq!(catalog.generation(), ticket.generation);
        assert!(catalog.loaded_at() >= before);
    }

    #[test]
    fn disable_before_completion_discards_result() {
        let mut loader = CatalogLoader::new();
        let ticket = loader.on_providers_changed(&with(&[Provider::Mongodb])).unwrap();
        loader.on_providers_changed(&with(&[]));
        assert!(!loader.is_tracking());
        assert_eq!(loader.complete(ticket.generation, Ok(doc_a())), Completion::Stale);
        assert_eq!(loader.state(), &LoadState::Idle);
        assert!(loader.catalog().is_none());
    }

    #[test]
    fn late_result_from_older_generation_is_ignored() {
        let mut loader = CatalogLoader::new();
        let first = loader.on_providers_changed(&with(&[Provider::Mongodb])).unwrap();
        loader.on_providers_changed(&with(&[]));
        let second = loader.on_providers_changed(&with(&[Provider::Mongodb])).unwrap();
        assert!(second.generation > first.generation);

        // The newer fetch is still loading; the old success must not land.
        assert_eq!(loader.complete(first.generation, Ok(doc_a())), Completion::Stale);
        assert_matches!(
            loader.state(),
            LoadState::Loading { generation } if *generation == second.generation
        );

        let fresh = vec![ResourceDescriptor::new("b", "Doc B")];
        assert_eq!(loader.complete(second.generation, Ok(fresh.clone())), Completion::Accepted);
        assert_eq!(
            loader.complete(first.generation, Err(SelectorError::CatalogHttp("late".into()))),
            Completion::Stale
        );
        assert_eq!(loader.catalog().unwrap().resources(), fresh.as_slice());
    }

    #[test]
    fn failure_is_absorbed_into_state() {
        let mut loader = CatalogLoader::new();
        let ticket = loader.on_providers_changed(&with(&[Provider::Mongodb])).unwrap();
        let outcome = loader.complete(
            ticket.generation,
            Err(SelectorError::CatalogHttp("connection refused".into())),
        );
        assert_eq!(outcome, Completion::Accepted);
        assert_matches!(
            loader.state(),
            LoadState::Failed { reason, .. } if reason.contains("connection refused")
        );
    }

    #[test]
    fn duplicate_completion_is_stale() {
        let mut loader = CatalogLoader::new();
        let ticket = loader.on_providers_changed(&with(&[Provider::Mongodb])).unwrap();
        loader.complete(ticket.generation, Ok(doc_a()));
        assert_eq!(loader.complete(ticket.generation, Ok(vec![])), Completion::Stale);
        assert_eq!(loader.catalog().unwrap().len(), 1);
    }

    #[test]
    fn failed_only_leaves_through_disable_enable() {
        let mut loader = CatalogLoader::new();
        let ticket = loader.on_providers_changed(&with(&[Provider::Mongodb])).unwrap();
        loader.complete(ticket.generation, Err(SelectorError::CatalogDecode("bad".into())));

        assert!(loader.on_providers_changed(&with(&[Provider::Mongodb, Provider::Web])).is_none());
        assert_eq!(loader.complete(ticket.generation, Ok(doc_a())), Completion::Stale);
        assert_eq!(loader.state().label(), "failed");

        loader.on_providers_changed(&with(&[Provider::Web]));
        assert_eq!(loader.state(), &LoadState::Idle);
        let retry = loader.on_providers_changed(&with(&[Provider::Web, Provider::Mongodb]));
        assert_eq!(retry.map(|t| t.generation.value()), Some(2));
        assert!(loader.state().is_loading());
    }
}
