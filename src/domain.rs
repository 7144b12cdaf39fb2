use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::SelectorError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Web,
    Pubmed,
    Mongodb,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Web, Provider::Pubmed, Provider::Mongodb];

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Web => "web",
            Provider::Pubmed => "pubmed",
            Provider::Mongodb => "mongodb",
        }
    }

    /// The persistent knowledge store whose collections form the resource catalog.
    pub fn is_knowledge_store(self) -> bool {
        matches!(self, Provider::Mongodb)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Provider {
    type Err = SelectorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "web" => Ok(Provider::Web),
            "pubmed" => Ok(Provider::Pubmed),
            "mongodb" => Ok(Provider::Mongodb),
            _ => Err(SelectorError::InvalidProvider(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EnabledProviders(BTreeSet<Provider>);

impl EnabledProviders {
    pub fn contains(&self, provider: Provider) -> bool {
        self.0.contains(&provider)
    }

    pub fn knowledge_store_enabled(&self) -> bool {
        self.0.iter().any(|provider| provider.is_knowledge_store())
    }

    pub fn iter(&self) -> impl Iterator<Item = Provider> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn toggle(&mut self, provider: Provider) {
        if !self.0.remove(&provider) {
            self.0.insert(provider);
        }
    }
}

impl FromIterator<Provider> for EnabledProviders {
    fn from_iter<T: IntoIterator<Item = Provider>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SelectedResources(BTreeSet<String>);

impl SelectedResources {
    pub fn contains(&self, uri: &str) -> bool {
        self.0.contains(uri)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn toggle(&mut self, uri: &str) {
        if !self.0.remove(uri) {
            self.0.insert(uri.to_string());
        }
    }
}

impl<S: Into<String>> FromIterator<S> for SelectedResources {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub uri: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ResourceDescriptor {
    pub fn new(uri: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            title: title.into(),
            description: None,
        }
    }
}
