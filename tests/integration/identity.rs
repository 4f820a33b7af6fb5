use super::common::{cache_over, path, workspace};
use jcrgraph::cache::PropertyId;
use jcrgraph::Name;
use std::sync::Arc;

#[test]
fn same_node_handle_while_referenced() {
    let graph = workspace("default");
    let cache = cache_over(&graph);

    let by_path = cache.find_jcr_node_at(None, &path("/a/b")).unwrap();
    let by_uuid = cache.find_jcr_node(by_path.uuid()).unwrap();
    assert!(Arc::ptr_eq(&by_path, &by_uuid));
    assert!(!by_path.is_root());

    let a = graph.uuid_at("/a").unwrap();
    let relative = cache.find_jcr_node_at(Some(a), &path("b")).unwrap();
    assert!(Arc::ptr_eq(&by_path, &relative));
}

#[test]
fn root_handle_is_detected_by_uuid_or_path() {
    let graph = workspace("default");
    let cache = cache_over(&graph);

    let by_uuid = cache.find_jcr_node(graph.root_uuid()).unwrap();
    assert!(by_uuid.is_root());
    let by_path = cache.find_jcr_node_at(None, &path("/")).unwrap();
    assert!(Arc::ptr_eq(&by_uuid, &by_path));
    assert!(Arc::ptr_eq(&by_uuid, &cache.find_jcr_root_node().unwrap()));
}

#[test]
fn same_property_handle_while_referenced() {
    let graph = workspace("default");
    let cache = cache_over(&graph);
    let a = graph.uuid_at("/a").unwrap();
    let id = PropertyId::new(a, Name::from("title"));

    let first = cache.find_jcr_property(&id).unwrap().unwrap();
    let second = cache.find_jcr_property(&id).unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(!first.is_multiple());

    let missing = PropertyId::new(a, Name::from("nope"));
    assert!(cache.find_jcr_property(&missing).unwrap().is_none());
}

#[test]
fn handles_are_reclaimed_after_drop() {
    let graph = workspace("default");
    let cache = cache_over(&graph);
    let b = graph.uuid_at("/a/b").unwrap();

    let first = cache.find_jcr_node(b).unwrap();
    let weak = Arc::downgrade(&first);
    drop(first);
    assert!(weak.upgrade().is_none());

    let again = cache.find_jcr_node(b).unwrap();
    assert_eq!(again.uuid(), b);
}
