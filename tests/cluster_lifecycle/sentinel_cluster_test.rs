use std::collections::HashSet;

use embedded_redis::BuildError;
use embedded_redis::ClusterBuilder;
use embedded_redis::Error;

use crate::common::FakeRedisServer;

/// 1 sentinel, quorum 1, group "m1" with one replica.
#[tokio::test]
async fn test_one_sentinel_one_master_one_replica() {
    crate::enable_logger();
    let fake = FakeRedisServer::ready();

    let cluster = ClusterBuilder::new()
        .resolver(fake.resolver())
        .options(fake.options())
        .ephemeral()
        .sentinel_count(1)
        .quorum(1)
        .replication_group("m1", 1)
        .build()
        .unwrap();

    cluster.start().await.unwrap();

    assert_eq!(cluster.members().count(), 3);
    assert!(cluster.members().all(|m| m.is_active()));
    assert!(cluster.is_active());

    let master_port = cluster.server_ports()[0];
    let configs = fake.sentinel_configs();
    assert_eq!(configs.len(), 1);
    let monitors: Vec<&str> = configs[0]
        .lines()
        .filter(|l| l.starts_with("sentinel monitor"))
        .collect();
    assert_eq!(
        monitors,
        vec![format!("sentinel monitor m1 127.0.0.1 {master_port} 1")]
    );

    cluster.stop().await.unwrap();
    assert!(!cluster.is_active());
    assert!(cluster.members().all(|m| !m.is_active()));
}

#[tokio::test]
async fn quorum_above_sentinel_count_should_fail_before_spawning() {
    crate::enable_logger();
    let fake = FakeRedisServer::ready();

    let result = ClusterBuilder::new()
        .resolver(fake.resolver())
        .sentinel_count(1)
        .quorum(2)
        .replication_group("m1", 1)
        .build();

    assert!(matches!(
        result,
        Err(Error::Build(BuildError::QuorumExceedsSentinelCount { .. }))
    ));
    assert!(fake.launches().is_empty());
}

#[tokio::test]
async fn test_servers_launch_before_sentinels() {
    crate::enable_logger();
    let fake = FakeRedisServer::ready();

    let cluster = ClusterBuilder::new()
        .resolver(fake.resolver())
        .options(fake.options())
        .ephemeral()
        .sentinel_count(2)
        .quorum(2)
        .replication_group("alpha", 1)
        .replication_group("beta", 0)
        .build()
        .unwrap();

    cluster.start().await.unwrap();
    let launches = fake.launches();
    cluster.stop().await.unwrap();

    let sentinel_flags: Vec<bool> = launches.iter().map(|l| l.ends_with("--sentinel")).collect();
    assert_eq!(sentinel_flags, vec![false, false, false, true, true]);

    // every sentinel monitors every group
    for config in fake.sentinel_configs() {
        assert!(config.contains("sentinel monitor alpha "));
        assert!(config.contains("sentinel monitor beta "));
    }
}

#[tokio::test]
async fn test_ephemeral_ports_are_discoverable_and_unique() {
    crate::enable_logger();
    let fake = FakeRedisServer::ready();

    let cluster = ClusterBuilder::new()
        .resolver(fake.resolver())
        .options(fake.options())
        .ephemeral()
        .sentinel_count(3)
        .quorum(2)
        .replication_group("m1", 2)
        .build()
        .unwrap();

    cluster.start().await.unwrap();

    assert_eq!(cluster.sentinel_ports().len(), 3);
    assert_eq!(cluster.server_ports().len(), 3);
    let unique: HashSet<u16> = cluster.ports().into_iter().collect();
    assert_eq!(unique.len(), 6);

    cluster.stop().await.unwrap();
}

#[tokio::test]
async fn failed_member_should_abort_start_and_stop_should_clean_up() {
    crate::enable_logger();
    let fake = FakeRedisServer::crashing();

    let cluster = ClusterBuilder::new()
        .resolver(fake.resolver())
        .options(fake.options())
        .ephemeral()
        .sentinel_count(1)
        .replication_group("m1", 1)
        .build()
        .unwrap();

    let err = cluster.start().await.unwrap_err();
    assert!(err.captured_output().is_some());
    // the master failed first; nothing after it was launched
    assert_eq!(fake.launches().len(), 1);
    assert!(!cluster.is_active());

    cluster.stop().await.unwrap();
}

#[tokio::test]
async fn test_cluster_restart() {
    crate::enable_logger();
    let fake = FakeRedisServer::ready();

    let cluster = ClusterBuilder::new()
        .resolver(fake.resolver())
        .options(fake.options())
        .ephemeral()
        .sentinel_count(1)
        .replication_group("m1", 0)
        .build()
        .unwrap();

    for _ in 0..2 {
        cluster.start().await.unwrap();
        assert!(cluster.is_active());
        cluster.stop().await.unwrap();
        assert!(!cluster.is_active());
    }
    assert_eq!(fake.launches().len(), 4);
}
