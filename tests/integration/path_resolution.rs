use super::common::{cache_over, path, workspace};
use jcrgraph::graph::Value;
use jcrgraph::{Name, RepositoryError};

#[test]
fn batched_resolution_matches_stepwise_resolution() {
    let graph = workspace("default");

    let batched = cache_over(&graph);
    batched.find_node_info_for_root().unwrap();
    graph.reset_round_trips();
    let deep = batched.find_node_info_at(None, &path("/a/b/c/d")).unwrap();
    assert_eq!(graph.round_trips(), 1);

    let stepwise = cache_over(&graph);
    stepwise.find_node_info_for_root().unwrap();
    graph.reset_round_trips();
    let mut current = stepwise.find_node_info_at(None, &path("a")).unwrap();
    for name in ["b", "c", "d"] {
        current = stepwise
            .find_node_info_at(Some(current.uuid()), &path(name))
            .unwrap();
    }
    assert_eq!(graph.round_trips(), 4);

    let mut left = Some(deep);
    let mut right = Some(current);
    while let (Some(l), Some(r)) = (left.take(), right.take()) {
        assert_eq!(l.uuid(), r.uuid());
        assert_eq!(l.primary_type_name(), r.primary_type_name());
        assert_eq!(l.definition_id(), r.definition_id());
        assert_eq!(l.property_names(), r.property_names());
        for (lp, rp) in l.properties().iter().zip(r.properties().iter()) {
            assert_eq!(lp.values(), rp.values());
            assert_eq!(lp.definition_id(), rp.definition_id());
        }
        assert_eq!(
            batched.path_for_info(&l).unwrap(),
            stepwise.path_for_info(&r).unwrap()
        );
        left = l.parent().map(|p| batched.find_node_info(p).unwrap());
        right = r.parent().map(|p| stepwise.find_node_info(p).unwrap());
    }
}

#[test]
fn cached_prefix_is_not_read_again() {
    let graph = workspace("default");
    let cache = cache_over(&graph);
    cache.find_node_info_at(None, &path("/a/b")).unwrap();
    graph.reset_round_trips();

    let d = cache.find_node_info_at(None, &path("/a/b/c/d")).unwrap();
    assert_eq!(graph.round_trips(), 1);
    assert_eq!(d.property(&Name::from("depth")).unwrap().values(), &[Value::Long(4)]);

    graph.reset_round_trips();
    cache.find_node_info_at(None, &path("/a/b/c/d")).unwrap();
    assert_eq!(graph.round_trips(), 0);
}

#[test]
fn parent_references_and_self_references() {
    let graph = workspace("default");
    let cache = cache_over(&graph);
    let c = graph.uuid_at("/a/b/c").unwrap();

    let b = cache.find_node_info_at(Some(c), &path("..")).unwrap();
    assert_eq!(Some(b.uuid()), graph.uuid_at("/a/b"));

    let x = cache.find_node_info_at(Some(c), &path("../../x")).unwrap();
    assert_eq!(Some(x.uuid()), graph.uuid_at("/a/x"));

    let same = cache.find_node_info_at(Some(c), &path(".")).unwrap();
    assert_eq!(same.uuid(), c);

    let normalized = cache.find_node_info_at(None, &path("/a/./b/../b/c")).unwrap();
    assert_eq!(normalized.uuid(), c);
}

#[test]
fn missing_segment_is_reported_relative_to_reference() {
    let graph = workspace("default");
    let cache = cache_over(&graph);
    let b = graph.uuid_at("/a/b").unwrap();
    cache.find_node_info_at(Some(b), &path("c")).unwrap();

    match cache.find_node_info_at(Some(b), &path("c/missing/deeper")) {
        Err(RepositoryError::PathNotFound(message)) => {
            assert!(message.contains("relative to /a/b"), "{}", message);
            assert!(message.contains("default"), "{}", message);
        }
        other => panic!("expected PathNotFound, got {:?}", other.map(|n| n.uuid())),
    }
}

#[test]
fn same_name_siblings_resolve_by_index() {
    let graph = workspace("default");
    let cache = cache_over(&graph);

    let first = cache.find_node_info_at(None, &path("/foo")).unwrap();
    let second = cache.find_node_info_at(None, &path("/foo[2]")).unwrap();
    assert_eq!(first.property(&Name::from("n")).unwrap().values(), &[Value::Long(1)]);
    assert_eq!(second.property(&Name::from("n")).unwrap().values(), &[Value::Long(2)]);
    assert!(matches!(
        cache.find_node_info_at(None, &path("/foo[3]")),
        Err(RepositoryError::PathNotFound(_))
    ));

    let root = cache.find_node_info_for_root().unwrap();
    let names: Vec<String> = root
        .children()
        .as_list()
        .iter()
        .map(|c| c.segment().to_string())
        .collect();
    assert_eq!(names, vec!["a", "foo", "bar", "foo[2]", "tagged"]);
}
