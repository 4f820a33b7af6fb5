use criterion::{black_box, criterion_group, criterion_main, Criterion};
use jcrgraph::graph::InMemoryGraph;
use jcrgraph::nodetype::NodeTypes;
use jcrgraph::{CacheOptions, Path, SessionCache};
use serde_json::{json, Value};
use std::sync::Arc;

const DEPTH: usize = 8;
const SIBLINGS: usize = 20;

/// A chain `level0/level1/...` where every level also carries filler siblings
fn fixture() -> String {
    let mut node = json!({"name": format!("level{}", DEPTH - 1), "properties": {"leaf": true}});
    for level in (0..DEPTH - 1).rev() {
        let mut children: Vec<Value> = (0..SIBLINGS)
            .map(|i| json!({"name": format!("filler{}", i), "properties": {"n": i}}))
            .collect();
        children.push(node);
        node = json!({"name": format!("level{}", level), "children": children});
    }
    json!({"children": [node]}).to_string()
}

fn deep_path() -> Path {
    let text: Vec<String> = (0..DEPTH).map(|l| format!("level{}", l)).collect();
    Path::parse(&format!("/{}", text.join("/"))).expect("fixture path")
}

fn cache_over(graph: &Arc<InMemoryGraph>, types: &Arc<NodeTypes>) -> SessionCache {
    SessionCache::new(graph.clone(), types.clone(), CacheOptions::default())
}

fn benches_lookup(c: &mut Criterion) {
    let graph = Arc::new(InMemoryGraph::from_json("bench", &fixture()).expect("fixture"));
    let types = Arc::new(NodeTypes::with_builtins());
    let path = deep_path();
    let segments: Vec<Path> = (0..DEPTH)
        .map(|l| Path::parse(&format!("level{}", l)).expect("segment"))
        .collect();

    let mut group = c.benchmark_group("cache.find_node_info_at");

    group.bench_function("batched_cold", |b| {
        b.iter(|| {
            let cache = cache_over(&graph, &types);
            black_box(cache.find_node_info_at(None, black_box(&path)).expect("lookup"))
        })
    });

    group.bench_function("stepwise_cold", |b| {
        b.iter(|| {
            let cache = cache_over(&graph, &types);
            let mut current = cache.find_node_info_for_root().expect("root").uuid();
            for segment in &segments {
                current = cache
                    .find_node_info_at(Some(current), segment)
                    .expect("lookup")
                    .uuid();
            }
            black_box(current)
        })
    });

    let warm = cache_over(&graph, &types);
    warm.find_node_info_at(None, &path).expect("lookup");
    group.bench_function("warm", |b| {
        b.iter(|| black_box(warm.find_node_info_at(None, black_box(&path)).expect("lookup")))
    });

    group.finish();
}

criterion_group!(benches, benches_lookup);
criterion_main!(benches);
