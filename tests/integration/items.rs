use super::common::{cache_over, path, workspace};
use jcrgraph::cache::PropertyId;
use jcrgraph::lexicon::jcr;
use jcrgraph::{Item, Name, RepositoryError};

#[test]
fn child_node_wins_over_property_with_same_name() {
    let graph = workspace("default");
    let cache = cache_over(&graph);
    let a = graph.uuid_at("/a").unwrap();

    let item = cache.find_jcr_item(Some(a), &path("x")).unwrap();
    assert_eq!(item.as_node().map(|n| n.uuid()), graph.uuid_at("/a/x"));

    match cache.find_jcr_item(Some(a), &path("title")).unwrap() {
        Item::Property(property) => {
            assert_eq!(property.name(), &Name::from("title"));
            assert_eq!(property.node_uuid(), a);
        }
        Item::Node(node) => panic!("expected a property, got node {}", node.uuid()),
    }
}

#[test]
fn sns_index_above_one_always_denotes_a_node() {
    let graph = workspace("default");
    let cache = cache_over(&graph);
    let item = cache.find_jcr_item(None, &path("/foo[2]")).unwrap();
    assert!(item.is_node());
    assert_eq!(item.as_node().map(|n| n.uuid()), graph.uuid_at("/foo[2]"));
}

#[test]
fn self_and_parent_references_denote_nodes() {
    let graph = workspace("default");
    let cache = cache_over(&graph);
    let a = graph.uuid_at("/a").unwrap();

    let same = cache.find_jcr_item(Some(a), &path(".")).unwrap();
    assert_eq!(same.as_node().map(|n| n.uuid()), Some(a));
    let empty = cache.find_jcr_item(Some(a), &path("")).unwrap();
    assert_eq!(empty.as_node().map(|n| n.uuid()), Some(a));
    let parent = cache.find_jcr_item(Some(a), &path("..")).unwrap();
    assert!(parent.as_node().unwrap().is_root());
}

#[test]
fn missing_items_are_reported_with_readable_paths() {
    let graph = workspace("default");
    let cache = cache_over(&graph);
    let a = graph.uuid_at("/a").unwrap();

    match cache.find_jcr_item(None, &path("/a/nothing")) {
        Err(RepositoryError::ItemNotFound(message)) => {
            assert!(message.contains("/a/nothing"), "{}", message)
        }
        other => panic!("expected ItemNotFound, got {:?}", other.map(|i| i.is_node())),
    }
    match cache.find_jcr_item(Some(a), &path("nothing")) {
        Err(RepositoryError::ItemNotFound(message)) => {
            assert!(message.contains("nothing relative to /a"), "{}", message)
        }
        other => panic!("expected ItemNotFound, got {:?}", other.map(|i| i.is_node())),
    }
}

#[test]
fn exposed_properties_of_referenceable_node() {
    let graph = workspace("default");
    let cache = cache_over(&graph);
    let tagged = graph.uuid_at("/tagged").unwrap();

    let properties = cache.find_jcr_properties_for(tagged).unwrap();
    let names: Vec<&str> = properties.iter().map(|p| p.name().as_str()).collect();
    assert_eq!(
        names,
        vec!["jcr:mixinTypes", "jcr:primaryType", "jcr:uuid", "single", "tags"]
    );
    let single = properties.iter().find(|p| p.name().as_str() == "single").unwrap();
    assert!(single.is_multiple());

    let uuid = cache
        .find_property_info(&PropertyId::new(tagged, jcr::UUID))
        .unwrap()
        .unwrap();
    assert_eq!(uuid.values()[0].as_uuid(), Some(tagged));

    let tags = PropertyId::new(tagged, Name::from("tags"));
    assert_eq!(cache.path_for_property_id(&tags).unwrap().to_string(), "/tagged/tags");
}

#[test]
fn names_and_indexes_of_nodes() {
    let graph = workspace("default");
    let cache = cache_over(&graph);
    let second = graph.uuid_at("/foo[2]").unwrap();
    assert_eq!(cache.name_of(second).unwrap(), Name::from("foo"));
    assert_eq!(cache.sns_index_of(second).unwrap(), 2);
    assert_eq!(cache.path_for(second).unwrap().to_string(), "/foo[2]");
    assert_eq!(cache.name_of(graph.root_uuid()).unwrap().as_str(), "");
}

#[test]
fn absolute_paths_resolve_from_the_root_whatever_the_reference() {
    let graph = workspace("default");
    let cache = cache_over(&graph);
    let b = graph.uuid_at("/a/b").unwrap();

    let title = cache.find_jcr_item(Some(b), &path("/a/title")).unwrap();
    assert!(!title.is_node());
    let d = cache.find_jcr_item(Some(b), &path("/a/b/c/d")).unwrap();
    assert_eq!(d.as_node().map(|n| n.uuid()), graph.uuid_at("/a/b/c/d"));
}
