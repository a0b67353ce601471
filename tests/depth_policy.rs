use keyschema::aggregate::Operation;
use keyschema::config::Settings;
use keyschema::engine::Engine;
use keyschema::matcher::DepthPolicy;
use keyschema::store::{MemoryStore, Store};

fn setup(depth_policy: DepthPolicy) -> Engine<MemoryStore> {
    let settings = Settings { depth_policy, ..Settings::default() };
    let mut engine = Engine::new(MemoryStore::new(), &settings);
    engine.load(r#"{"env": ["prod", "dev"], "region": ["us", "eu"]}"#).expect("load");
    for key in ["prod", "prod:us", "prod:us:web", "dev:eu"] {
        engine.store_mut().set(key, "1").expect("set");
    }
    engine
}

fn get(engine: &mut Engine<MemoryStore>, filter: &str) -> Vec<String> {
    engine.query(Operation::Get, filter).expect("get").keys().to_vec()
}

#[test]
fn prefix_accepts_short_and_long_keys() {
    let mut engine = setup(DepthPolicy::Prefix);
    assert_eq!(get(&mut engine, r#"{"env": ["prod"]}"#), vec!["prod", "prod:us", "prod:us:web"]);
    // the short key has no region segment to reject
    assert_eq!(get(&mut engine, r#"{"region": ["eu"]}"#), vec!["dev:eu", "prod"]);
}

#[test]
fn strict_requires_one_segment_per_dimension() {
    let mut engine = setup(DepthPolicy::Strict);
    assert_eq!(get(&mut engine, r#"{"env": ["prod"]}"#), vec!["prod:us"]);
    assert_eq!(get(&mut engine, "{}"), vec!["dev:eu", "prod:us"]);
}

#[test]
fn strict_assignment_needs_full_keys() {
    let mut engine = setup(DepthPolicy::Strict);
    assert!(engine.set(r#"{"prod": "2"}"#).is_err());
    assert!(engine.set(r#"{"dev:us": "2"}"#).is_ok());
}

#[test]
fn custom_delimiter() {
    let mut settings = Settings::default();
    settings.namespace.delimiter = "/".into();
    let mut engine = Engine::new(MemoryStore::new(), &settings);
    engine.load(r#"{"env": ["prod"], "region": ["us", "eu"]}"#).unwrap();
    engine.set(r#"{"prod/us": "5", "prod/eu": "6"}"#).unwrap();
    assert_eq!(engine.query(Operation::Max, r#"{"region": "us"}"#).unwrap().integer(), Some(5));
}
