use keyschema::aggregate::Operation;
use keyschema::config::Settings;
use keyschema::engine::Engine;
use keyschema::error::{ErrorKind, KeyschemaError};
use keyschema::store::{MemoryStore, Store};

fn setup() -> Engine<MemoryStore> {
    let mut engine = Engine::with_defaults(MemoryStore::new());
    engine.load(r#"{"env": ["prod", "dev"], "region": ["us", "eu"]}"#).expect("load");
    for key in ["prod:us", "dev:eu"] {
        engine.store_mut().set(key, "1").expect("set");
    }
    engine
}

#[test]
fn unknown_dimension_is_not_found() {
    let mut engine = setup();
    let err = engine.query(Operation::Get, r#"{"nonexistent_dim": ["x"]}"#).unwrap_err();
    assert!(matches!(err, KeyschemaError::MemberNotFound { ref member } if member == "nonexistent_dim"));
    assert_eq!(err.kind(), ErrorKind::Semantic);
}

#[test]
fn rejected_filters_never_scan() {
    let mut engine = setup();
    assert!(engine.query(Operation::Clr, r#"{"env": ["qa"]}"#).is_err());
    assert!(engine.query(Operation::Inc, r#"{"nope": []}"#).is_err());
    assert_eq!(engine.store().get("prod:us").unwrap().as_deref(), Some("1"));
    assert_eq!(engine.store().get("dev:eu").unwrap().as_deref(), Some("1"));
}

#[test]
fn unknown_value_is_not_found() {
    let mut engine = setup();
    let err = engine.query(Operation::Get, r#"{"env": ["prod", "qa"]}"#).unwrap_err();
    assert!(matches!(err, KeyschemaError::MemberNotFound { .. }));
}

#[test]
fn more_values_than_the_dimension_declares() {
    let mut engine = setup();
    let err = engine
        .query(Operation::Get, r#"{"env": ["prod", "dev", "prod"]}"#)
        .unwrap_err();
    assert!(matches!(err, KeyschemaError::TooManyValues { ref dimension } if dimension == "env"));
}

#[test]
fn a_repeated_dimension_overwrites_its_selection() {
    let mut engine = setup();
    let reply = engine.query(Operation::Get, r#"{"env": ["prod"], "env": ["dev"]}"#).unwrap();
    assert_eq!(reply.keys(), ["dev:eu".to_string()]);
}

#[test]
fn structural_errors() {
    let mut engine = setup();
    for document in [r#"["env"]"#, r#"{"env": [["prod"]]}"#, r#"{"env": {"prod": true}}"#] {
        let err = engine.query(Operation::Get, document).unwrap_err();
        assert!(matches!(err, KeyschemaError::InvalidInput(_)), "{document}: {err}");
        assert_eq!(err.kind(), ErrorKind::Structural);
    }
    let err = engine.query(Operation::Get, "{\"env\": ").unwrap_err();
    assert!(matches!(err, KeyschemaError::Parse { line: Some(1), .. }));
}

#[test]
fn token_limit() {
    let settings = Settings { max_tokens: 4, ..Settings::default() };
    let mut engine = Engine::new(MemoryStore::new(), &settings);
    let err = engine.load(r#"{"env": ["prod", "dev", "qa"]}"#).unwrap_err();
    assert!(matches!(err, KeyschemaError::TokenLimit { limit: 4 }));
    // nothing was written
    assert!(engine.store().is_empty());
}
