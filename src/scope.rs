use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::domain::{EnabledProviders, Provider, SelectedResources};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetrievalScope {
    pub web_search: bool,
    pub pubmed: bool,
    pub local_search: bool,
    pub collections: Vec<String>,
}

impl RetrievalScope {
    pub fn from_selection(enabled: &EnabledProviders, selected: &SelectedResources) -> Self {
        let collections = selected
            .iter()
            .filter_map(mongodb_collection)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Self {
            web_search: enabled.contains(Provider::Web),
            pubmed: enabled.contains(Provider::Pubmed),
            local_search: enabled.contains(Provider::Mongodb),
            collections,
        }
    }

    pub fn collections_or_default(&self, default: &str) -> Vec<String> {
        if self.collections.is_empty() {
            vec![default.to_string()]
        } else {
            self.collections.clone()
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.web_search && !self.pubmed && !self.local_search
    }
}

fn mongodb_uri_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^mongodb://(?P<db>[^/]+)/(?P<collection>[^/?#]+)").unwrap()
    })
}

/// Collection name of a `mongodb://<db>/<collection>[/...]` resource URI.
pub fn mongodb_collection(uri: &str) -> Option<String> {
    mongodb_uri_regex()
        .captures(uri.trim())
        .and_then(|caps| caps.name("collection"))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_from_uri() {
        assert_eq!(
            mongodb_collection("mongodb://deep_flow/ACe_Default").as_deref(),
            Some("ACe_Default")
        );
        assert_eq!(
            mongodb_collection("mongodb://deep_flow/papers/file-17").as_deref(),
            Some("papers")
        );
        assert_eq!(mongodb_collection("mongodb://deep_flow"), None);
        assert_eq!(mongodb_collection("rag://dataset/123"), None);
    }

    #[test]
    fn only_knowledge_store_enabled() {
        let enabled: EnabledProviders = [Provider::Mongodb].into_iter().collect();
        let selected: SelectedResources = ["mongodb://test/test"].into_iter().collect();
        let scope = RetrievalScope::from_selection(&enabled, &selected);
        assert!(!scope.web_search);
        assert!(!scope.pubmed);
        assert!(scope.local_search);
        assert_eq!(scope.collections, vec!["test".to_string()]);
    }

    #[test]
    fn collections_deduplicated_and_sorted() {
        let selected: SelectedResources = [
            "mongodb://db/zeta/1",
            "mongodb://db/alpha",
            "mongodb://db/zeta/2",
            "uri:a",
        ]
        .into_iter()
        .collect();
        let scope = RetrievalScope::from_selection(&EnabledProviders::default(), &selected);
        assert_eq!(scope.collections, vec!["alpha", "zeta"]);
        assert!(scope.is_empty());
    }

    #[test]
    fn default_collection_when_none_selected() {
        let scope =
            RetrievalScope::from_selection(&EnabledProviders::default(), &Default::default());
        assert_eq!(scope.collections_or_default("documents"), vec!["documents"]);
    }
}
