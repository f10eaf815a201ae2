use incidra::{
    ConfigError, FetchConfig, MemoryBroker, OffsetSpec, PartitionSpec, DEFAULT_MAX_MESSAGES,
    DEFAULT_MESSAGE_MAX_BYTES,
};
use serde_json::json;

#[test]
fn parses_a_full_document() {
    let config = FetchConfig::from_value(&json!({
        "topic": "orders",
        "partitions": [0, 1, "2"],
        "default_offset": "latest",
        "max_messages": 10,
        "message_max_bytes": 2048,
    }))
    .expect("well-formed document");
    assert_eq!(config.topic, "orders");
    assert_eq!(config.partitions, PartitionSpec::List(vec![0, 1, 2]));
    assert_eq!(config.default_offset, OffsetSpec::Latest);
    assert_eq!(config.max_messages, 10);
    assert_eq!(config.message_max_bytes, Some(2048));
}

#[test]
fn missing_fields_fall_back_to_collaborator_defaults() {
    let config = FetchConfig::from_value(&json!({"topic": "orders"})).expect("minimal document");
    assert_eq!(config.partitions, PartitionSpec::All);
    assert_eq!(config.default_offset, OffsetSpec::Earliest);
    assert_eq!(config.max_messages, DEFAULT_MAX_MESSAGES);
    assert_eq!(config.message_max_bytes, Some(DEFAULT_MESSAGE_MAX_BYTES));
}

#[test]
fn partitions_accept_all_single_and_comma_separated_forms() {
    let cases = [
        (json!("all"), PartitionSpec::All),
        (json!(""), PartitionSpec::All),
        (json!([]), PartitionSpec::All),
        (json!(3), PartitionSpec::Single(3)),
        (json!("5"), PartitionSpec::Single(5)),
        (json!("0, 2"), PartitionSpec::List(vec![0, 2])),
        (json!([4, 6]), PartitionSpec::List(vec![4, 6])),
    ];
    for (raw, expected) in cases {
        let config = FetchConfig::from_value(&json!({"topic": "orders", "partitions": raw}))
            .expect("supported partition form");
        assert_eq!(config.partitions, expected);
    }
}

#[test]
fn numeric_default_offsets_are_accepted_as_integers_or_strings() {
    let by_number = FetchConfig::from_value(&json!({"topic": "orders", "default_offset": 17}))
        .expect("integer offset");
    assert_eq!(by_number.default_offset, OffsetSpec::Numeric(17));

    let by_token = FetchConfig::from_value(&json!({"topic": "orders", "default_offset": "17"}))
        .expect("numeric token");
    assert_eq!(by_token.default_offset, OffsetSpec::Numeric(17));
}

#[test]
fn malformed_documents_are_rejected() {
    assert!(matches!(
        FetchConfig::from_value(&json!("orders")),
        Err(ConfigError::NotAnObject)
    ));
    assert!(matches!(
        FetchConfig::from_value(&json!({"partitions": "all"})),
        Err(ConfigError::MissingTopic)
    ));
    assert!(matches!(
        FetchConfig::from_value(&json!({"topic": "  "})),
        Err(ConfigError::MissingTopic)
    ));
    assert!(matches!(
        FetchConfig::from_value(&json!({"topic": "orders", "default_offset": "someplace"})),
        Err(ConfigError::InvalidField { field: "default_offset", .. })
    ));
    assert!(matches!(
        FetchConfig::from_value(&json!({"topic": "orders", "max_messages": 0})),
        Err(ConfigError::InvalidField { field: "max_messages", .. })
    ));
    assert!(matches!(
        FetchConfig::from_value(&json!({"topic": "orders", "partitions": {"id": 1}})),
        Err(ConfigError::InvalidField { field: "partitions", .. })
    ));
}

#[test]
fn validate_requires_the_topic_to_exist() {
    let broker = MemoryBroker::new().with_topic("orders", [0, 1]);
    let config = FetchConfig::new("returns");
    let err = config.validate(&broker).expect_err("topic absent");
    assert!(matches!(err, ConfigError::Broker(_)));
}

#[test]
fn validate_rejects_partitions_outside_the_topic() {
    let broker = MemoryBroker::new().with_topic("orders", [0, 1]);
    let config = FetchConfig::new("orders").with_partitions(PartitionSpec::List(vec![0, 9]));
    let err = config.validate(&broker).expect_err("partition 9 absent");
    match err {
        ConfigError::PartitionNotAssigned {
            partition,
            available,
            ..
        } => {
            assert_eq!(partition, 9);
            assert_eq!(available, vec![0, 1]);
        }
        other => panic!("expected PartitionNotAssigned, got {other:?}"),
    }
}

#[test]
fn validate_bounds_checks_numeric_default_offsets() {
    let mut broker = MemoryBroker::new().with_topic("orders", [0]);
    broker.append("orders", 0, "a");
    broker.append("orders", 0, "b");

    let in_bounds = FetchConfig::new("orders")
        .with_partitions(PartitionSpec::Single(0))
        .with_default_offset(OffsetSpec::Numeric(1));
    in_bounds.validate(&broker).expect("offset 1 exists");

    let out_of_bounds = FetchConfig::new("orders")
        .with_partitions(PartitionSpec::Single(0))
        .with_default_offset(OffsetSpec::Numeric(2));
    let err = out_of_bounds
        .validate(&broker)
        .expect_err("offset 2 is past the end");
    assert!(matches!(err, ConfigError::Offset { partition: 0, .. }));
}
