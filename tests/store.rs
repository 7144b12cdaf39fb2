use source_selector::domain::Provider;
use source_selector::store::SelectionStore;

#[test]
fn provider_toggle_is_an_involution() {
    let store = SelectionStore::new();
    store.toggle_provider(Provider::Web);
    for provider in Provider::ALL {
        let before = store.enabled_providers();
        store.toggle_provider(provider);
        let after = store.toggle_provider(provider);
        assert_eq!(after, before, "double toggle of {provider}");
    }
}

#[test]
fn resource_toggle_is_an_involution() {
    let store = SelectionStore::new();
    store.toggle_resource("mongodb://deep_flow/papers");
    for uri in ["uri:a", "mongodb://deep_flow/papers", ""] {
        let before = store.selected_resources();
        store.toggle_resource(uri);
        let after = store.toggle_resource(uri);
        assert_eq!(after, before, "double toggle of {uri:?}");
    }
}

#[test]
fn toggling_resource_twice_deselects_it() {
    let store = SelectionStore::new();
    let once = store.toggle_resource("uri:a");
    assert!(once.contains("uri:a"));
    let twice = store.toggle_resource("uri:a");
    assert!(!twice.contains("uri:a"));
}

#[test]
fn providers_and_resources_are_independent() {
    let store = SelectionStore::new();
    store.toggle_resource("mongodb://deep_flow/papers");
    let selected = store.selected_resources();

    store.toggle_provider(Provider::Mongodb);
    store.toggle_provider(Provider::Mongodb);
    store.toggle_provider(Provider::Pubmed);
    assert_eq!(store.selected_resources(), selected);

    let enabled = store.enabled_providers();
    store.toggle_resource("uri:b");
    store.toggle_resource("mongodb://deep_flow/papers");
    assert_eq!(store.enabled_providers(), enabled);
}

#[test]
fn selection_survives_disabling_its_provider() {
    let store = SelectionStore::new();
    store.toggle_provider(Provider::Mongodb);
    store.toggle_resource("mongodb://deep_flow/papers");
    store.toggle_provider(Provider::Mongodb);
    assert!(store.is_selected("mongodb://deep_flow/papers"));
    assert!(!store.is_enabled(Provider::Mongodb));
}
