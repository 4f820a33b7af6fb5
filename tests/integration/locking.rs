use super::common::repository;
use jcrgraph::graph::{GraphStore, Location};
use jcrgraph::lexicon::jcr;
use jcrgraph::RepositoryError;

#[test]
fn lock_is_visible_immediately_and_shared_across_sessions() {
    let env = repository();
    let doc = env.workspace.uuid_at("/a").unwrap();
    let alice = env.repository.login(None, "alice").unwrap();
    let bob = env.repository.login(None, "bob").unwrap();

    alice.cache().find_node_info(doc).unwrap();
    let lock = alice.lock(doc, true, false).unwrap();
    assert!(lock.is_live());
    assert_eq!(alice.lock_tokens(), vec![lock.lock_token()]);
    assert!(!alice.cache().has_pending_changes());

    let info = alice.cache().find_node_info(doc).unwrap();
    assert_eq!(
        info.property(&jcr::LOCK_OWNER).unwrap().values()[0].as_string(),
        "alice"
    );
    let stored = env.workspace.node_at(&Location::with_uuid(doc)).unwrap();
    assert!(stored.property(&jcr::LOCK_OWNER).is_some());

    let seen = bob.lock_for_node(doc).unwrap();
    assert_eq!(seen.lock_token(), lock.lock_token());
    assert!(matches!(bob.unlock(doc), Err(RepositoryError::Lock(_))));
    assert!(matches!(
        bob.lock(doc, false, false),
        Err(RepositoryError::Lock(_))
    ));

    alice.unlock(doc).unwrap();
    assert!(!lock.is_live());
    assert!(bob.lock_for_node(doc).is_none());
    assert!(alice.lock_tokens().is_empty());
}

#[test]
fn lock_tokens_move_between_sessions() {
    let env = repository();
    let doc = env.workspace.uuid_at("/bar").unwrap();
    let alice = env.repository.login(None, "alice").unwrap();
    let bob = env.repository.login(None, "bob").unwrap();

    let lock = alice.lock(doc, false, false).unwrap();
    let token = lock.lock_token();
    assert!(matches!(
        bob.add_lock_token(&token),
        Err(RepositoryError::Lock(_))
    ));

    alice.remove_lock_token(&token).unwrap();
    bob.add_lock_token(&token).unwrap();
    assert_eq!(bob.lock_tokens(), vec![token.clone()]);
    bob.unlock(doc).unwrap();
    assert!(matches!(
        bob.add_lock_token(&token),
        Err(RepositoryError::Lock(_))
    ));
}

#[test]
fn logout_releases_only_session_scoped_locks() {
    let env = repository();
    let scoped_node = env.workspace.uuid_at("/foo").unwrap();
    let open_node = env.workspace.uuid_at("/foo[2]").unwrap();

    let alice = env.repository.login(None, "alice").unwrap();
    let scoped = alice.lock(scoped_node, false, true).unwrap();
    let open = alice.lock(open_node, false, false).unwrap();
    alice.logout().unwrap();

    assert!(!scoped.is_live());
    assert!(open.is_live());
    let stored = env.workspace.node_at(&Location::with_uuid(scoped_node)).unwrap();
    assert!(stored.property(&jcr::LOCK_OWNER).is_none());

    let bob = env.repository.login(None, "bob").unwrap();
    bob.add_lock_token(&open.lock_token()).unwrap();
    bob.unlock(open_node).unwrap();
    assert!(!open.is_live());
}

#[test]
fn locks_survive_in_the_system_workspace() {
    let env = repository();
    let doc = env.workspace.uuid_at("/a").unwrap();
    let alice = env.repository.login(None, "alice").unwrap();
    let lock = alice.lock(doc, true, false).unwrap();

    let locks_path = env.repository.config().locks_path().unwrap();
    let locks = env.system.node_at(&Location::at_path(locks_path)).unwrap();
    assert_eq!(locks.children.len(), 1);
    assert_eq!(locks.children[0].uuid, Some(lock.lock_uuid()));
}

#[test]
fn locking_a_node_with_unsaved_changes_fails() {
    let env = repository();
    let doc = env.workspace.uuid_at("/a").unwrap();
    let alice = env.repository.login(None, "alice").unwrap();
    alice
        .cache()
        .editor_for(doc)
        .unwrap()
        .set_property(jcrgraph::Name::from("title"), "draft")
        .unwrap();
    assert!(matches!(
        alice.lock(doc, false, false),
        Err(RepositoryError::InvalidItemState(_))
    ));
}
