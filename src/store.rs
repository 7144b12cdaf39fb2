use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::domain::{EnabledProviders, Provider, SelectedResources};

#[derive(Debug, Default)]
struct Selection {
    providers: EnabledProviders,
    resources: SelectedResources,
}

// One mutex guards both sets so a toggle is never observed half-applied.
#[derive(Debug, Clone, Default)]
pub struct SelectionStore {
    inner: Arc<Mutex<Selection>>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_provider(&self, provider: Provider) -> EnabledProviders {
        let mut selection = self.lock();
        selection.providers.toggle(provider);
        debug!(
            provider = %provider,
            enabled = selection.providers.contains(provider),
            "provider toggled"
        );
        selection.providers.clone()
    }

    pub fn toggle_resource(&self, uri: &str) -> SelectedResources {
        let mut selection = self.lock();
        selection.resources.toggle(uri);
        debug!(
            uri,
            selected = selection.resources.contains(uri),
            "resource toggled"
        );
        selection.resources.clone()
    }

    pub fn enabled_providers(&self) -> EnabledProviders {
        self.lock().providers.clone()
    }

    pub fn selected_resources(&self) -> SelectedResources {
        self.lock().resources.clone()
    }

    pub fn is_enabled(&self, provider: Provider) -> bool {
        self.lock().providers.contains(provider)
    }

    pub fn is_selected(&self, uri: &str) -> bool {
        self.lock().resources.contains(uri)
    }

    // Toggles never leave a half-applied set behind, so a poisoned lock
    // still guards consistent data.
    fn lock(&self) -> MutexGuard<'_, Selection> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
