//! End-to-end resolver scenarios driven purely by the event stream

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;

use rack_topology::resolver::{FeedOutcome, ResolverState, TopologyResolver};
use rack_topology::{AssetOperation, AssetRecord};

use super::helpers::{asset, fixed_addresses, init_tracing, rack_controller};

#[test]
fn discovery_from_scratch() {
    init_tracing();
    let mut resolver =
        TopologyResolver::new().with_address_source(fixed_addresses(&["10.130.38.2"]));

    // an early ancestor record: nothing to do with it yet, but remembered
    let outcome = resolver.feed(asset("grandparent", "Grandparent"));
    assert_matches!(outcome, FeedOutcome::Ignored);
    assert_eq!(resolver.state(), ResolverState::Discovering);
    assert_eq!(resolver.self_identity(), None);

    // the record carrying one of our addresses identifies us, but its
    // parent is not known yet
    let me = rack_controller("me", "RC", &["parent", "grandparent"])
        .with_ext("ip.1", "10.130.38.2");
    let outcome = resolver.feed(me);
    assert_matches!(outcome, FeedOutcome::Unresolved);
    assert_eq!(resolver.self_identity(), Some("me"));
    assert_eq!(resolver.state(), ResolverState::Discovering);

    // the missing parent completes the chain
    let outcome = resolver.feed(asset("parent", "Parent"));
    assert_matches!(outcome, FeedOutcome::Changed);
    assert_eq!(resolver.state(), ResolverState::UpToDate);
    assert_eq!(
        resolver.resolve_chain(),
        vec!["grandparent".to_string(), "parent".to_string()]
    );
    assert_eq!(
        resolver.ancestor_path(" > ").as_deref(),
        Some("Grandparent > Parent")
    );
}

#[test]
fn relocation_to_a_new_parent() {
    init_tracing();
    let mut resolver = TopologyResolver::with_identity("me");

    resolver.feed(asset("bogus", "bogus asset"));
    resolver.feed(asset("grandparent", "my nice grandparent"));
    assert_eq!(resolver.cache().len(), 2);
    assert_eq!(resolver.ancestor_path("->"), None);

    let me = rack_controller("me", "this is me", &["parent", "grandparent"]);
    assert_matches!(resolver.feed(me), FeedOutcome::Unresolved);
    assert_eq!(resolver.cache().len(), 3);
    assert_eq!(resolver.ancestor_path("->"), None);

    let parent = asset("parent", "this is father").with_aux("parent_name.1", "grandparent");
    assert_matches!(resolver.feed(parent), FeedOutcome::Changed);
    assert_eq!(resolver.state(), ResolverState::UpToDate);
    assert_eq!(
        resolver.ancestor_path("->").as_deref(),
        Some("my nice grandparent->this is father")
    );
    // the unrelated asset got purged on the transition
    assert!(!resolver.cache().contains("bogus"));
    assert_eq!(resolver.cache().len(), 3);

    // the device moves: an update to the self record names a new parent
    let moved = AssetRecord::new("me", AssetOperation::Update)
        .with_ext("name", "this is me")
        .with_aux("parent_name.1", "newparent")
        .with_aux("parent_name.2", "grandparent");
    assert_matches!(resolver.feed(moved), FeedOutcome::Unresolved);
    assert_eq!(resolver.state(), ResolverState::Discovering);
    assert_eq!(resolver.ancestor_path("->"), None);

    let newparent = asset("newparent", "this is new father").with_aux("parent_name.1", "grandparent");
    assert_matches!(resolver.feed(newparent), FeedOutcome::Changed);
    assert_eq!(
        resolver.ancestor_path("->").as_deref(),
        Some("my nice grandparent->this is new father")
    );
    // the old parent is no longer on the chain
    assert!(!resolver.cache().contains("parent"));
}

#[test]
fn chain_entries_are_always_cached() {
    let mut resolver = TopologyResolver::with_identity("me");
    resolver.feed(asset("room", "Room"));
    resolver.feed(asset("rack", "Rack"));
    resolver.feed(rack_controller("me", "RC", &["rack", "room"]));

    let chain = resolver.resolve_chain();
    assert_eq!(chain, vec!["room".to_string(), "rack".to_string()]);
    for entry in &chain {
        assert!(resolver.cache().contains(entry));
    }
}

#[test]
fn delete_events_still_update_the_cache() {
    // operation gates identification and inventory handling only; a
    // delete for a cached asset replaces its record like any other event
    let mut resolver = TopologyResolver::with_identity("me");
    resolver.feed(asset("rack", "Rack"));
    resolver.feed(rack_controller("me", "RC", &["rack"]));
    resolver.feed(asset("other", "Other"));
    assert_eq!(resolver.state(), ResolverState::UpToDate);

    let delete = AssetRecord::new("rack", AssetOperation::Delete).with_ext("name", "Rack (gone)");
    assert_matches!(resolver.feed(delete), FeedOutcome::Changed);
    assert_eq!(
        resolver.ancestor_path("/").as_deref(),
        Some("Rack (gone)")
    );
}
