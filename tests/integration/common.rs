use jcrgraph::config::RepositoryConfig;
use jcrgraph::graph::{GraphStore, InMemoryGraph};
use jcrgraph::nodetype::NodeTypes;
use jcrgraph::{CacheOptions, Path, Repository, SessionCache};
use std::sync::Arc;

pub const CONTENT: &str = r#"{
    "children": [
        {"name": "a", "properties": {"title": "A", "x": "property"}, "children": [
            {"name": "b", "children": [
                {"name": "c", "children": [
                    {"name": "d", "properties": {"depth": 4}}
                ]}
            ]},
            {"name": "x"}
        ]},
        {"name": "foo", "properties": {"n": 1}},
        {"name": "bar"},
        {"name": "foo", "properties": {"n": 2}},
        {"name": "tagged", "properties": {
            "jcr:mixinTypes": ["mix:referenceable"],
            "tags": ["red", "green"],
            "single": "one",
            "dnaint:multiValuedProperties": "single"
        }}
    ]
}"#;

pub fn workspace(name: &str) -> Arc<InMemoryGraph> {
    Arc::new(InMemoryGraph::from_json(name, CONTENT).unwrap())
}

pub fn cache_over(graph: &Arc<InMemoryGraph>) -> SessionCache {
    SessionCache::new(
        graph.clone(),
        Arc::new(NodeTypes::with_builtins()),
        CacheOptions::default(),
    )
}

pub fn path(text: &str) -> Path {
    Path::parse(text).unwrap()
}

pub struct TestRepository {
    pub repository: Repository,
    pub workspace: Arc<InMemoryGraph>,
    pub system: Arc<InMemoryGraph>,
}

pub fn repository() -> TestRepository {
    let config = RepositoryConfig::default();
    let workspace = workspace(&config.workspace);
    let system = Arc::new(InMemoryGraph::new(config.system_workspace.clone()));
    let stores: Vec<Arc<dyn GraphStore>> = vec![workspace.clone()];
    let repository =
        Repository::new(config, NodeTypes::with_builtins(), system.clone(), stores).unwrap();
    TestRepository {
        repository,
        workspace,
        system,
    }
}
