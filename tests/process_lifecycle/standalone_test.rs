use embedded_redis::Error;
use embedded_redis::LaunchMode;
use embedded_redis::ManagedProcess;
use embedded_redis::ServerBuilder;
use embedded_redis::StartupError;

use crate::common::is_running;
use crate::common::STARTUP_TIMEOUT;
use crate::common::FakeRedisServer;

#[tokio::test]
async fn test_standalone_server_start_and_stop() {
    crate::enable_logger();
    let fake = FakeRedisServer::ready();

    let server = ServerBuilder::new()
        .resolver(fake.resolver())
        .options(fake.options())
        .port(16400)
        .setting("maxmemory 64M")
        .build()
        .unwrap();

    assert!(!server.is_active());
    server.start().await.unwrap();
    assert!(server.is_active());
    let pid = server.pid().unwrap();
    assert!(is_running(pid));

    server.stop().await.unwrap();
    assert!(!server.is_active());
    assert!(!is_running(pid));

    let launches = fake.launches();
    assert_eq!(launches.len(), 1);
    assert!(launches[0].ends_with("redis.conf"));
}

#[tokio::test]
async fn test_inline_settings_reach_the_command_line() {
    crate::enable_logger();
    let fake = FakeRedisServer::ready();

    let server = ServerBuilder::new()
        .resolver(fake.resolver())
        .options(fake.options())
        .port(16401)
        .launch_mode(LaunchMode::Inline)
        .setting("save 900 1")
        .build()
        .unwrap();

    server.start().await.unwrap();
    server.stop().await.unwrap();

    assert_eq!(
        fake.launches(),
        vec!["--port 16401 --bind 127.0.0.1 --save 900 1"]
    );
}

#[tokio::test]
async fn start_stop_should_be_repeatable_without_leaks() {
    crate::enable_logger();
    let fake = FakeRedisServer::ready();
    let server = ServerBuilder::new()
        .resolver(fake.resolver())
        .options(fake.options())
        .port(16402)
        .build()
        .unwrap();

    let mut pids = Vec::new();
    for _ in 0..5 {
        server.start().await.unwrap();
        pids.push(server.pid().unwrap());
        server.stop().await.unwrap();
    }

    assert_eq!(fake.launches().len(), 5);
    assert!(pids.iter().all(|pid| !is_running(*pid)));
}

#[tokio::test]
async fn second_start_should_not_spawn_another_process() {
    crate::enable_logger();
    let fake = FakeRedisServer::ready();
    let server = ServerBuilder::new()
        .resolver(fake.resolver())
        .options(fake.options())
        .port(16403)
        .build()
        .unwrap();

    server.start().await.unwrap();
    assert!(matches!(server.start().await, Err(Error::Fatal(_))));
    assert_eq!(fake.launches().len(), 1);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn crashing_server_should_report_its_output() {
    crate::enable_logger();
    let fake = FakeRedisServer::crashing();
    let server = ServerBuilder::new()
        .resolver(fake.resolver())
        .options(fake.options())
        .port(16404)
        .build()
        .unwrap();

    let err = server.start().await.unwrap_err();
    match &err {
        Error::Startup(StartupError::Failed { status, .. }) => {
            assert_eq!(status.and_then(|s| s.code()), Some(3));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.captured_output().unwrap().contains("Server initialized"));
    assert!(!server.is_active());
}

/// Needs a real `redis-server` on `PATH`.
#[tokio::test]
#[ignore]
async fn test_real_redis_server() {
    crate::enable_logger();
    let platform = embedded_redis::Platform::detect();
    let resolver = embedded_redis::ExecutableResolver::default().with_override(
        platform.os,
        platform.arch,
        which_redis_server().expect("redis-server on PATH"),
    );

    let server = ServerBuilder::new()
        .resolver(resolver)
        .startup_timeout(STARTUP_TIMEOUT)
        .port(16405)
        .setting("save \"\"")
        .setting("appendonly no")
        .build()
        .unwrap();

    server.start().await.unwrap();
    assert!(tokio::net::TcpStream::connect(("127.0.0.1", 16405)).await.is_ok());
    server.stop().await.unwrap();
}

fn which_redis_server() -> Option<std::path::PathBuf> {
    std::env::var_os("PATH").and_then(|paths| {
        std::env::split_paths(&paths)
            .map(|dir| dir.join("redis-server"))
            .find(|candidate| candidate.is_file())
    })
}
