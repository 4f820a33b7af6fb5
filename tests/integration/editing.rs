use super::common::{cache_over, path, workspace};
use jcrgraph::graph::{GraphStore, Location, Request, Value};
use jcrgraph::{Name, RepositoryError};

#[test]
fn saved_edits_are_visible_to_a_fresh_cache() {
    let graph = workspace("default");
    let cache = cache_over(&graph);
    let a = graph.uuid_at("/a").unwrap();
    let root = cache.find_node_info_for_root().unwrap().uuid();

    let editor = cache.editor_for(a).unwrap();
    editor.set_property(Name::from("title"), "renamed").unwrap();
    editor
        .set_multi_property(Name::from("labels"), vec![Value::from("x"), Value::from("y")])
        .unwrap();
    let child = editor.create_child(Name::from("e"), None, None).unwrap();
    cache
        .editor_for(root)
        .unwrap()
        .destroy_child(graph.uuid_at("/bar").unwrap())
        .unwrap();
    assert!(cache.is_changed(a));
    cache.save().unwrap();
    assert!(!cache.has_pending_changes());

    let fresh = cache_over(&graph);
    let reloaded = fresh.find_node_info(a).unwrap();
    assert_eq!(
        reloaded.property(&Name::from("title")).unwrap().values(),
        &[Value::from("renamed")]
    );
    assert!(reloaded.property(&Name::from("labels")).unwrap().is_multi_valued());
    let e = fresh.find_node_info_at(Some(a), &path("e")).unwrap();
    assert_eq!(e.uuid(), child.uuid());
    assert!(matches!(
        fresh.find_node_info_at(None, &path("/bar")),
        Err(RepositoryError::PathNotFound(_))
    ));
}

#[test]
fn moved_subtree_keeps_its_descendants() {
    let graph = workspace("default");
    let cache = cache_over(&graph);
    let b = graph.uuid_at("/a/b").unwrap();
    let d = graph.uuid_at("/a/b/c/d").unwrap();
    let foo = graph.uuid_at("/foo").unwrap();

    cache.find_node_info(d).unwrap();
    cache.editor_for(foo).unwrap().move_to_be_child(b, None).unwrap();
    assert_eq!(cache.path_for(d).unwrap().to_string(), "/foo/b/c/d");
    assert_eq!(
        cache.find_node_info_at(None, &path("/foo/b/c/d")).unwrap().uuid(),
        d
    );

    cache.save().unwrap();
    assert_eq!(graph.uuid_at("/foo/b/c/d"), Some(d));
    assert_eq!(cache.path_for(d).unwrap().to_string(), "/foo/b/c/d");
}

#[test]
fn destroyed_subtree_is_invalid_until_refresh() {
    let graph = workspace("default");
    let cache = cache_over(&graph);
    let a = graph.uuid_at("/a").unwrap();
    let c = graph.uuid_at("/a/b/c").unwrap();
    cache.find_node_info(c).unwrap();

    let root = cache.find_node_info_for_root().unwrap().uuid();
    cache.editor_for(root).unwrap().destroy_child(a).unwrap();
    assert!(matches!(
        cache.find_node_info(c),
        Err(RepositoryError::InvalidItemState(_))
    ));
    assert!(matches!(
        cache.find_jcr_node(a),
        Err(RepositoryError::InvalidItemState(_))
    ));

    cache.refresh(false);
    assert_eq!(cache.find_node_info(c).unwrap().uuid(), c);
    assert!(graph.uuid_at("/a").is_some());
}

#[test]
fn failed_save_keeps_pending_changes() {
    let graph = workspace("default");
    let cache = cache_over(&graph);
    let b = graph.uuid_at("/a/b").unwrap();
    cache
        .editor_for(b)
        .unwrap()
        .set_property(Name::from("note"), "pending")
        .unwrap();

    // another writer removes the node first
    graph
        .execute(vec![Request::Delete(Location::with_uuid(b))])
        .unwrap();
    assert!(matches!(
        cache.save(),
        Err(RepositoryError::InvalidItemState(_))
    ));
    assert!(cache.has_pending_changes());
}
