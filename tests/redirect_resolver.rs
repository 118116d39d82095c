mod common;

use std::time::Duration;

use linkprobe::http_client::HttpClient;
use linkprobe::models::ChainStop;
use linkprobe::redirect::{RedirectResolver, MAX_HOPS_CAP};

const HOP_TIMEOUT: Duration = Duration::from_secs(3);

async fn resolver() -> (RedirectResolver, String) {
    let base = common::spawn_fixture_server().await;
    let http = HttpClient::from_settings(&common::test_settings().http).unwrap();
    (RedirectResolver::new(http), base)
}

#[tokio::test]
async fn test_three_hop_chain() {
    let (resolver, base) = resolver().await;
    let chain = resolver
        .resolve(&format!("{}/r/1", base), 5, HOP_TIMEOUT)
        .await;

    assert_eq!(chain.len(), 4);
    assert_eq!(chain.origin(), format!("{}/r/1", base));
    assert_eq!(chain.terminal(), format!("{}/final", base));
    assert_eq!(chain.stop(), &ChainStop::Terminal { status: 200 });
}

#[tokio::test]
async fn test_zero_hops_returns_origin_only() {
    let (resolver, base) = resolver().await;
    let chain = resolver
        .resolve(&format!("{}/r/1", base), 0, HOP_TIMEOUT)
        .await;

    assert_eq!(chain.len(), 1);
    assert_eq!(chain.terminal(), format!("{}/r/1", base));
    assert_eq!(chain.stop(), &ChainStop::HopLimit);
}

#[tokio::test]
async fn test_hop_limit_below_chain_length() {
    let (resolver, base) = resolver().await;
    let chain = resolver
        .resolve(&format!("{}/r/1", base), 2, HOP_TIMEOUT)
        .await;

    assert_eq!(chain.len(), 3);
    assert_eq!(chain.terminal(), format!("{}/r/3", base));
    assert_eq!(chain.stop(), &ChainStop::HopLimit);
}

#[tokio::test]
async fn test_loop_is_capped() {
    let (resolver, base) = resolver().await;
    let chain = resolver
        .resolve(&format!("{}/loop", base), 100, HOP_TIMEOUT)
        .await;

    assert_eq!(chain.hops(), MAX_HOPS_CAP);
    assert_eq!(chain.stop(), &ChainStop::HopLimit);
}

#[tokio::test]
async fn test_relative_location_resolved_against_hop() {
    let (resolver, base) = resolver().await;
    let chain = resolver
        .resolve(&format!("{}/rel/start", base), 3, HOP_TIMEOUT)
        .await;

    assert_eq!(chain.terminal(), format!("{}/rel/next", base));
    assert_eq!(chain.len(), 2);
}

#[tokio::test]
async fn test_missing_location_ends_chain() {
    let (resolver, base) = resolver().await;
    let chain = resolver
        .resolve(&format!("{}/noloc", base), 3, HOP_TIMEOUT)
        .await;

    assert_eq!(chain.len(), 1);
    assert_eq!(chain.stop(), &ChainStop::MissingLocation { status: 302 });
}

#[tokio::test]
async fn test_head_rejection_falls_back_to_get() {
    let (resolver, base) = resolver().await;
    let chain = resolver
        .resolve(&format!("{}/headless", base), 3, HOP_TIMEOUT)
        .await;

    assert_eq!(chain.terminal(), format!("{}/final", base));
    assert_eq!(chain.stop(), &ChainStop::Terminal { status: 200 });
}

#[tokio::test]
async fn test_stops_before_requesting_target() {
    let (resolver, base) = resolver().await;
    let chain = resolver
        .resolve_until(&format!("{}/go/profile", base), 5, HOP_TIMEOUT, |u| {
            u.starts_with("https://target.example/")
        })
        .await;

    assert_eq!(chain.terminal(), "https://target.example/bob");
    assert_eq!(chain.stop(), &ChainStop::Matched);
}

#[tokio::test]
async fn test_unreachable_host_is_not_an_error() {
    let (resolver, _base) = resolver().await;
    let chain = resolver
        .resolve("http://127.0.0.1:1/nothing", 3, HOP_TIMEOUT)
        .await;

    assert_eq!(chain.len(), 1);
    assert!(matches!(chain.stop(), ChainStop::Transport { .. }));
}

#[tokio::test]
async fn test_slow_hop_ends_chain_with_timeout() {
    let (resolver, base) = resolver().await;
    let chain = resolver
        .resolve(&format!("{}/r/slow", base), 5, Duration::from_secs(1))
        .await;

    assert_eq!(chain.len(), 2);
    assert_eq!(chain.terminal(), format!("{}/r/stall", base));
    assert_eq!(chain.stop(), &ChainStop::Timeout);
}
