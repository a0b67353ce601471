use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use keyschema::aggregate::Operation;
use keyschema::engine::Engine;
use keyschema::matcher::{DepthPolicy, KeyMatcher, MatchMode};
use keyschema::query::{Query, Selection};
use keyschema::store::{MemoryStore, Store};

const REGIONS: [&str; 4] = ["us", "eu", "asia", "africa"];

fn populated(keys_per_region: usize) -> Engine<MemoryStore> {
    let mut engine = Engine::with_defaults(MemoryStore::new());
    let hosts: Vec<String> = (0..keys_per_region).map(|i| format!("\"h{i}\"")).collect();
    let schema = format!(
        r#"{{"env": ["prod", "dev"], "region": ["us", "eu", "asia", "africa"], "host": [{}]}}"#,
        hosts.join(", ")
    );
    engine.load(&schema).unwrap();
    for env in ["prod", "dev"] {
        for region in REGIONS {
            for i in 0..keys_per_region {
                engine
                    .store_mut()
                    .set(&format!("{env}:{region}:h{i}"), &i.to_string())
                    .unwrap();
            }
        }
    }
    engine
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut env = Selection::new("env", 2);
    env.push("prod");
    let mut region = Selection::new("region", 4);
    region.push("eu");
    region.push("asia");
    let query = Query::from_selections(vec![env, region, Selection::new("host", 100)]);
    let matcher = KeyMatcher::new(":", DepthPolicy::Prefix);
    c.bench_function("match hit", |b| {
        b.iter(|| matcher.matches(black_box("prod:asia:h42"), &query, MatchMode::Wildcard))
    });
    c.bench_function("match miss", |b| {
        b.iter(|| matcher.matches(black_box("dev:asia:h42"), &query, MatchMode::Wildcard))
    });

    let mut engine = populated(100);
    c.bench_function("get 800 keys", |b| b.iter(|| engine.query(Operation::Get, "{}").unwrap()));
    c.bench_function("sum 100 of 800 keys", |b| {
        b.iter(|| {
            engine
                .query(Operation::Sum, r#"{"env": ["prod"], "region": ["eu"]}"#)
                .unwrap()
        })
    });
    let mut engine = populated(1000);
    c.bench_function("sum 1k of 8k keys", |b| {
        b.iter(|| {
            engine
                .query(Operation::Sum, r#"{"env": ["dev"], "region": ["us"]}"#)
                .unwrap()
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
