use super::common::{repository, workspace};
use jcrgraph::config::RepositoryConfig;
use jcrgraph::graph::{GraphStore, InMemoryGraph};
use jcrgraph::nodetype::NodeTypes;
use jcrgraph::{Repository, RepositoryError};
use std::sync::Arc;

#[test]
fn login_opens_sessions_on_known_workspaces() {
    let env = repository();
    assert_eq!(env.repository.workspace_names(), vec!["default", "system"]);

    let session = env.repository.login(None, "alice").unwrap();
    assert_eq!(session.workspace_name(), "default");
    assert_eq!(session.user_id(), "alice");
    let other = env.repository.login(Some("default"), "bob").unwrap();
    assert_ne!(session.id(), other.id());

    assert!(matches!(
        env.repository.login(Some("archive"), "alice"),
        Err(RepositoryError::NoSuchWorkspace(_))
    ));
}

#[test]
fn sessions_have_independent_caches() {
    let env = repository();
    let a = env.workspace.uuid_at("/a").unwrap();
    let alice = env.repository.login(None, "alice").unwrap();
    let bob = env.repository.login(None, "bob").unwrap();

    alice
        .cache()
        .editor_for(a)
        .unwrap()
        .set_property(jcrgraph::Name::from("title"), "draft")
        .unwrap();
    let seen = bob.cache().find_node_info(a).unwrap();
    assert_eq!(
        seen.property(&jcrgraph::Name::from("title")).unwrap().values()[0].as_string(),
        "A"
    );

    alice.save().unwrap();
    bob.refresh(true);
    let seen = bob.cache().find_node_info(a).unwrap();
    assert_eq!(
        seen.property(&jcrgraph::Name::from("title")).unwrap().values()[0].as_string(),
        "draft"
    );
}

#[test]
fn mismatched_system_store_is_rejected() {
    let config = RepositoryConfig::default();
    let system: Arc<dyn GraphStore> = Arc::new(InMemoryGraph::new("elsewhere"));
    let stores: Vec<Arc<dyn GraphStore>> = vec![workspace("default")];
    assert!(matches!(
        Repository::new(config, NodeTypes::with_builtins(), system, stores),
        Err(RepositoryError::Config(_))
    ));
}

#[test]
fn duplicate_workspaces_are_rejected() {
    let config = RepositoryConfig::default();
    let system: Arc<dyn GraphStore> = Arc::new(InMemoryGraph::new("system"));
    let stores: Vec<Arc<dyn GraphStore>> = vec![workspace("default"), workspace("default")];
    assert!(matches!(
        Repository::new(config, NodeTypes::with_builtins(), system, stores),
        Err(RepositoryError::Config(_))
    ));
}
