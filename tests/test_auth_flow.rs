//! End-to-end authentication scenarios against mock backends


use nntp_auth_proxy::config::BackendConfig;
use test_helpers::{
    BACKEND_PASS, BackendBehavior, MockBackend, TestClient, backend, closed_port,
    create_test_config, eventually, start_proxy, user,
};

#[tokio::test]
async fn test_successful_login_relays_commands() {
    let news = MockBackend::spawn("news1").await;
    let config = create_test_config(
        vec![backend("news1", news.port, 10)],
        vec![user("alice", "secret", 1)],
    );
    let (addr, proxy) = start_proxy(config).await;

    let mut client = TestClient::connect(addr).await;
    assert_eq!(client.login("alice", "secret").await, "281 Welcome");
    assert_eq!(proxy.registry().user_active("alice"), Some(1));
    assert_eq!(proxy.registry().backend_active("news1"), Some(1));

    assert_eq!(
        client.command("GROUP alt.test").await,
        "200 news1 got: GROUP alt.test"
    );
    // Relay mode: everything is forwarded verbatim from here on
    assert_eq!(
        client.command("HELP whatever").await,
        "200 news1 got: HELP whatever"
    );

    client.close().await;
    news.wait_until_idle().await;
    let registry = proxy.registry();
    eventually("slots released", || {
        registry.user_active("alice") == Some(0) && registry.backend_active("news1") == Some(0)
    })
    .await;
}

#[tokio::test]
async fn test_wrong_password_keeps_connection_open() {
    let news = MockBackend::spawn("news1").await;
    let config = create_test_config(
        vec![backend("news1", news.port, 10)],
        vec![user("alice", "secret", 1)],
    );
    let (addr, proxy) = start_proxy(config).await;

    let mut client = TestClient::connect(addr).await;
    assert_eq!(
        client.login("alice", "wrong").await,
        "502 Authentication Failed"
    );
    assert_eq!(proxy.registry().user_active("alice"), Some(0));
    assert_eq!(proxy.registry().backend_active("news1"), Some(0));
    assert_eq!(news.accepted_connections(), 0);

    // Same connection may retry
    assert_eq!(client.login("alice", "secret").await, "281 Welcome");
    assert_eq!(news.accepted_connections(), 1);
}

#[tokio::test]
async fn test_unknown_user_rejected_like_wrong_password() {
    let news = MockBackend::spawn("news1").await;
    let config = create_test_config(
        vec![backend("news1", news.port, 10)],
        vec![user("alice", "secret", 1)],
    );
    let (addr, _proxy) = start_proxy(config).await;

    let mut client = TestClient::connect(addr).await;
    assert_eq!(
        client.login("mallory", "secret").await,
        "502 Authentication Failed"
    );
    // Usernames are case-sensitive
    assert_eq!(
        client.login("Alice", "secret").await,
        "502 Authentication Failed"
    );
}

#[tokio::test]
async fn test_password_with_spaces() {
    let news = MockBackend::spawn("news1").await;
    let config = create_test_config(
        vec![backend("news1", news.port, 10)],
        vec![user("alice", "correct horse battery", 1)],
    );
    let (addr, _proxy) = start_proxy(config).await;

    let mut client = TestClient::connect(addr).await;
    assert_eq!(
        client.login("alice", "correct horse battery").await,
        "281 Welcome"
    );
}

#[tokio::test]
async fn test_user_connection_cap() {
    let news = MockBackend::spawn("news1").await;
    let config = create_test_config(
        vec![backend("news1", news.port, 10)],
        vec![user("alice", "secret", 1)],
    );
    let (addr, proxy) = start_proxy(config).await;

    let mut first = TestClient::connect(addr).await;
    assert_eq!(first.login("alice", "secret").await, "281 Welcome");

    let mut second = TestClient::connect(addr).await;
    assert_eq!(
        second.login("alice", "secret").await,
        "502 Too Many Connections"
    );
    assert_eq!(proxy.registry().user_active("alice"), Some(1));
    assert_eq!(proxy.registry().backend_active("news1"), Some(1));

    first.close().await;
    let registry = proxy.registry();
    eventually("first session released", || {
        registry.user_active("alice") == Some(0)
    })
    .await;

    assert_eq!(second.login("alice", "secret").await, "281 Welcome");
}

#[tokio::test]
async fn test_no_free_backend() {
    let news = MockBackend::spawn("news1").await;
    let config = create_test_config(
        vec![backend("news1", news.port, 1)],
        vec![user("alice", "secret", 5), user("bob", "hunter2", 5)],
    );
    let (addr, proxy) = start_proxy(config).await;

    let mut alice = TestClient::connect(addr).await;
    assert_eq!(alice.login("alice", "secret").await, "281 Welcome");

    let mut bob = TestClient::connect(addr).await;
    assert_eq!(
        bob.login("bob", "hunter2").await,
        "502 NO free backend connection!"
    );
    // The user slot taken before backend selection was given back
    assert_eq!(proxy.registry().user_active("bob"), Some(0));
    assert_eq!(proxy.registry().backend_active("news1"), Some(1));
    assert_eq!(news.accepted_connections(), 1);
}

#[tokio::test]
async fn test_backend_auth_failure_releases_slots() {
    let news = MockBackend::spawn_with("news1", BackendBehavior::RejectPassword).await;
    let config = create_test_config(
        vec![backend("news1", news.port, 1)],
        vec![user("alice", "secret", 1)],
    );
    let (addr, proxy) = start_proxy(config).await;

    let mut client = TestClient::connect(addr).await;
    assert_eq!(
        client.login("alice", "secret").await,
        "502 Backend AUTH Failed!"
    );
    assert_eq!(proxy.registry().user_active("alice"), Some(0));
    assert_eq!(proxy.registry().backend_active("news1"), Some(0));
    news.wait_until_idle().await;

    // Failing twice proves nothing leaked at capacity 1
    assert_eq!(
        client.login("alice", "secret").await,
        "502 Backend AUTH Failed!"
    );
    assert_eq!(news.accepted_connections(), 2);
}

#[tokio::test]
async fn test_backend_rejects_username() {
    let news = MockBackend::spawn("news1").await;
    let misconfigured = BackendConfig::builder("127.0.0.1", news.port)
        .name("news1")
        .credentials("stranger", BACKEND_PASS)
        .max_connections(1)
        .build()
        .unwrap();
    let config = create_test_config(vec![misconfigured], vec![user("alice", "secret", 1)]);
    let (addr, proxy) = start_proxy(config).await;

    let mut client = TestClient::connect(addr).await;
    assert_eq!(
        client.login("alice", "secret").await,
        "502 Backend AUTH Failed!"
    );
    assert_eq!(proxy.registry().backend_active("news1"), Some(0));
    assert_eq!(proxy.registry().user_active("alice"), Some(0));

    // The half-authenticated backend transport was closed
    news.wait_until_idle().await;
    assert_eq!(news.accepted_connections(), 1);
}

#[tokio::test]
async fn test_backend_bad_greeting_is_backend_failure() {
    let news = MockBackend::spawn_with("news1", BackendBehavior::Unavailable).await;
    let config = create_test_config(
        vec![backend("news1", news.port, 1)],
        vec![user("alice", "secret", 1)],
    );
    let (addr, proxy) = start_proxy(config).await;

    let mut client = TestClient::connect(addr).await;
    assert_eq!(
        client.login("alice", "secret").await,
        "502 Backend AUTH Failed!"
    );
    assert_eq!(proxy.registry().backend_active("news1"), Some(0));
}

#[tokio::test]
async fn test_unreachable_backend_is_backend_failure() {
    let port = closed_port().await;
    let config = create_test_config(
        vec![backend("down", port, 1)],
        vec![user("alice", "secret", 1)],
    );
    let (addr, proxy) = start_proxy(config).await;

    let mut client = TestClient::connect(addr).await;
    assert_eq!(
        client.login("alice", "secret").await,
        "502 Backend AUTH Failed!"
    );
    assert_eq!(proxy.registry().user_active("alice"), Some(0));
    assert_eq!(proxy.registry().backend_active("down"), Some(0));
}

#[tokio::test]
async fn test_no_failover_to_next_backend() {
    let broken = MockBackend::spawn_with("broken", BackendBehavior::RejectPassword).await;
    let healthy = MockBackend::spawn("healthy").await;
    let config = create_test_config(
        vec![backend("broken", broken.port, 5), backend("healthy", healthy.port, 5)],
        vec![user("alice", "secret", 1)],
    );
    let (addr, _proxy) = start_proxy(config).await;

    let mut client = TestClient::connect(addr).await;
    assert_eq!(
        client.login("alice", "secret").await,
        "502 Backend AUTH Failed!"
    );
    assert_eq!(healthy.accepted_connections(), 0);
}

#[tokio::test]
async fn test_pass_without_user_is_syntax_error() {
    let news = MockBackend::spawn("news1").await;
    let config = create_test_config(
        vec![backend("news1", news.port, 1)],
        vec![user("alice", "secret", 1)],
    );
    let (addr, _proxy) = start_proxy(config).await;

    let mut client = TestClient::connect(addr).await;
    assert_eq!(
        client.command("AUTHINFO PASS secret").await,
        "502 Unknown Syntax!"
    );
}

#[tokio::test]
async fn test_user_followed_by_other_command_aborts_login() {
    let news = MockBackend::spawn("news1").await;
    let config = create_test_config(
        vec![backend("news1", news.port, 1)],
        vec![user("alice", "secret", 1)],
    );
    let (addr, proxy) = start_proxy(config).await;

    let mut client = TestClient::connect(addr).await;
    assert_eq!(client.command("AUTHINFO USER alice").await, "381 Continue");
    assert_eq!(client.command("GROUP alt.test").await, "502 Unknown Syntax!");
    assert_eq!(proxy.registry().user_active("alice"), Some(0));

    assert_eq!(client.login("alice", "secret").await, "281 Welcome");
}

#[tokio::test]
async fn test_client_disconnect_mid_login() {
    let news = MockBackend::spawn("news1").await;
    let config = create_test_config(
        vec![backend("news1", news.port, 1)],
        vec![user("alice", "secret", 1)],
    );
    let (addr, proxy) = start_proxy(config).await;

    let mut client = TestClient::connect(addr).await;
    assert_eq!(client.command("AUTHINFO USER alice").await, "381 Continue");
    client.close().await;

    let registry = proxy.registry();
    eventually("session gone", || proxy.active_clients() == 0).await;
    assert_eq!(registry.user_active("alice"), Some(0));
    assert_eq!(news.accepted_connections(), 0);
}
