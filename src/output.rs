use std::io::{self, Write};

use serde::Serialize;
use tracing::info;

use crate::app::{SelectionEvent, SelectionSink, SessionSnapshot};
use crate::domain::{Provider, ResourceDescriptor};

#[derive(Debug, Clone, Serialize)]
pub struct ProviderEntry {
    pub name: Provider,
    pub knowledge_store: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogListing<'a> {
    pub endpoint: &'a str,
    pub query: Option<&'a str>,
    pub resources: &'a [ResourceDescriptor],
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_providers() -> io::Result<()> {
        let entries = Provider::ALL
            .iter()
            .map(|provider| ProviderEntry {
                name: *provider,
                knowledge_store: provider.is_knowledge_store(),
            })
            .collect::<Vec<_>>();
        Self::print_json(&entries)
    }

    pub fn print_catalog(listing: &CatalogListing<'_>) -> io::Result<()> {
        Self::print_json(listing)
    }

    pub fn print_snapshot(snapshot: &SessionSnapshot) -> io::Result<()> {
        Self::print_json(snapshot)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct LogSink;

impl SelectionSink for LogSink {
    fn event(&self, event: SelectionEvent) {
        match event {
            SelectionEvent::ProviderToggled { provider, enabled } => {
                info!(%provider, enabled, "provider");
            }
            SelectionEvent::ResourceToggled { uri, selected } => {
                info!(%uri, selected, "resource");
            }
            SelectionEvent::CatalogState { status, generation } => {
                info!(status, %generation, "catalog");
            }
            SelectionEvent::StaleResult { generation } => {
                info!(%generation, "catalog result discarded");
            }
        }
    }
}
