use incidra::{
    AssignError, Assignment, BrokerError, MemoryBroker, OffsetSpec, PartitionAssigner,
    PartitionSpec,
};

fn orders_broker() -> MemoryBroker {
    let mut broker = MemoryBroker::new().with_topic("orders", [0, 1, 2]);
    for partition in 0..=2 {
        broker.append("orders", partition, format!("order-{partition}-a"));
        broker.append("orders", partition, format!("order-{partition}-b"));
    }
    broker
}

#[test]
fn explicit_list_drops_vanished_partitions() {
    let broker = orders_broker();
    let assigner = PartitionAssigner::new(&broker, "orders");
    let assignments = assigner
        .assign(
            &PartitionSpec::List(vec![0, 1, 99]),
            OffsetSpec::Earliest,
        )
        .expect("unknown partition 99 is tolerated in a list");
    assert_eq!(
        assignments,
        vec![
            Assignment {
                partition: 0,
                start_offset: 0,
            },
            Assignment {
                partition: 1,
                start_offset: 0,
            },
        ]
    );
}

#[test]
fn single_missing_partition_fails_loudly() {
    let broker = orders_broker();
    let assigner = PartitionAssigner::new(&broker, "orders");
    let err = assigner
        .assign(&PartitionSpec::Single(99), OffsetSpec::Earliest)
        .expect_err("an explicitly named partition must exist");
    assert!(matches!(
        err,
        AssignError::Broker(BrokerError::UnknownPartition { partition: 99, .. })
    ));
}

#[test]
fn discovery_expands_the_current_partition_set() {
    let broker = orders_broker();
    let assigner = PartitionAssigner::new(&broker, "orders");
    let assignments = assigner
        .assign(&PartitionSpec::All, OffsetSpec::Latest)
        .expect("every known partition resolves");
    let partitions: Vec<i32> = assignments.iter().map(|a| a.partition).collect();
    assert_eq!(partitions, vec![0, 1, 2]);
    // Two messages per partition, so "latest" is offset 1 everywhere.
    assert!(assignments.iter().all(|a| a.start_offset == 1));
}

#[test]
fn discovery_on_an_unknown_topic_is_fatal() {
    let broker = orders_broker();
    let assigner = PartitionAssigner::new(&broker, "returns");
    let err = assigner
        .assign(&PartitionSpec::All, OffsetSpec::Earliest)
        .expect_err("topic is absent from metadata");
    assert!(matches!(
        err,
        AssignError::Broker(BrokerError::UnknownTopic { .. })
    ));
}

#[test]
fn out_of_range_offsets_are_fatal_even_in_tolerant_specs() {
    let broker = orders_broker();
    let assigner = PartitionAssigner::new(&broker, "orders");
    let err = assigner
        .assign(&PartitionSpec::List(vec![0, 1]), OffsetSpec::Numeric(99))
        .expect_err("only unknown partitions are tolerated, not bad offsets");
    assert!(matches!(
        err,
        AssignError::Offset {
            partition: 0,
            ..
        }
    ));
}

#[test]
fn assign_one_reports_topic_and_partition_context() {
    let broker = orders_broker();
    let assigner = PartitionAssigner::new(&broker, "orders");
    let err = assigner
        .assign_one(1, OffsetSpec::Numeric(7))
        .expect_err("offset beyond the two appended messages");
    assert_eq!(
        err.to_string(),
        "partition 1 of topic orders: offset 7 is out of bounds [0, 2)"
    );
}
