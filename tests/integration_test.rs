use agent_points_runner::config::{Config, RateLimitConfig, UnitMode};
use agent_points_runner::error::{AppError, DiscoveryError};
use agent_points_runner::infrastructure::{ProxyRotation, RateGovernor, RotatingTransport, TransportSettings};
use agent_points_runner::models::{AgentDescriptor, AgentKind, Identity, ProxyDescriptor, QuestionBank};
use agent_points_runner::services::{AgentDiscovery, AgentQueryClient, AuditWriter, ResponseMode, TxFeed, UsageReporter};
use agent_points_runner::workflow::{InteractionFlow, Session, UnitCtx};
use agent_points_runner::orchestrator::{run_unit, ExitReason, UnitSettings};
use agent_points_runner::App;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WALLET: &str = "0x1111111111111111111111111111111111111111";

fn fast_limits(max_retries: u32) -> RateLimitConfig {
    RateLimitConfig {
        max_retries,
        base_delay_ms: 10,
        max_delay_ms: 20,
        requests_per_minute: 0,
    }
}

fn direct_transport() -> RotatingTransport {
    RotatingTransport::new(Arc::new(ProxyRotation::disabled()), TransportSettings::default())
        .expect("构建传输层失败")
}

/// 两个没有监听的本地代理地址，请求一定在连接阶段失败
fn dead_proxies() -> Vec<ProxyDescriptor> {
    let listeners: Vec<std::net::TcpListener> = (0..2)
        .map(|_| std::net::TcpListener::bind("127.0.0.1:0").expect("绑定端口失败"))
        .collect();
    listeners
        .iter()
        .map(|l| {
            let port = l.local_addr().expect("读取端口失败").port();
            format!("http://127.0.0.1:{}", port).parse().expect("代理格式错误")
        })
        .collect()
}

fn proxied_transport(proxies: &[ProxyDescriptor]) -> RotatingTransport {
    RotatingTransport::new(
        Arc::new(ProxyRotation::new(proxies.to_vec(), true)),
        TransportSettings::default(),
    )
    .expect("构建传输层失败")
}

fn agent(server: &MockServer, kind: AgentKind) -> AgentDescriptor {
    AgentDescriptor {
        endpoint_url: format!("{}/agent", server.uri()),
        agent_id: "deployment_test".to_string(),
        display_name: "Test Agent".to_string(),
        candidate_questions: vec!["ping".to_string()],
        kind,
    }
}

fn flow(server: &MockServer, mode: ResponseMode, audit: Option<AuditWriter>) -> InteractionFlow {
    InteractionFlow::from_parts(
        vec![agent(server, AgentKind::Chat)].into(),
        AgentQueryClient::with_mode(mode, &format!("{}/tx", server.uri())),
        UsageReporter::with_url(format!("{}/report", server.uri())),
        audit,
        direct_transport(),
        RateGovernor::new(&fast_limits(2)),
    )
}

#[tokio::test]
async fn test_buffered_interaction_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agent"))
        .and(body_partial_json(json!({ "message": "ping", "stream": false })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "choices": [{ "message": { "content": " pong " } }] })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/report"))
        .and(body_partial_json(json!({
            "wallet_address": WALLET,
            "agent_id": "deployment_test",
            "request_text": "ping",
            "response_text": "pong",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let flow = flow(&server, ResponseMode::Buffered, None);
    let ctx = UnitCtx::new(Identity::new(WALLET), 1);
    let mut session = Session::new(ctx.identity.clone(), 1, Utc::now());

    let result = flow.run_once(&ctx, &mut session).await;

    assert!(result.success);
    assert_eq!(result.answer, "pong");
    assert_eq!(session.daily_points, 10);
    assert_eq!(session.statistics.successful_interactions, 1);
    assert_eq!(session.statistics.failed_interactions, 0);
    assert_eq!(session.statistics.per_agent_interactions.get("Test Agent"), Some(&1));
}

#[tokio::test]
async fn test_streamed_query_concatenates_frames() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: not-json\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/agent"))
        .and(body_partial_json(json!({ "stream": true })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let client = AgentQueryClient::with_mode(ResponseMode::Streamed, &format!("{}/tx", server.uri()));
    let outcome = client
        .query(
            &agent(&server, AgentKind::Chat),
            &direct_transport(),
            &RateGovernor::new(&fast_limits(0)),
        )
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.question, "ping");
    assert_eq!(outcome.answer, "Hello");
}

#[tokio::test]
async fn test_failed_query_is_not_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agent"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/report"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let flow = flow(&server, ResponseMode::Buffered, None);
    let ctx = UnitCtx::new(Identity::new(WALLET), 1);
    let mut session = Session::new(ctx.identity.clone(), 1, Utc::now());

    let result = flow.run_once(&ctx, &mut session).await;

    assert!(!result.success);
    assert_eq!(session.daily_points, 0);
    assert_eq!(session.statistics.failed_interactions, 1);
    assert_eq!(session.statistics.total_interactions, 1);
}

#[tokio::test]
async fn test_report_gives_up_after_max_retries() {
    let server = MockServer::start().await;
    let max_retries = 2;
    Mock::given(method("POST"))
        .and(path("/report"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({ "error": "Rate limit exceeded" })))
        .expect(u64::from(max_retries) + 1)
        .mount(&server)
        .await;

    let reporter = UsageReporter::with_url(format!("{}/report", server.uri()));
    let accepted = reporter
        .report(
            &Identity::new(WALLET),
            &agent(&server, AgentKind::Chat),
            "ping",
            "pong",
            &direct_transport(),
            &RateGovernor::new(&fast_limits(max_retries)),
        )
        .await;

    assert!(!accepted);
}

#[tokio::test]
async fn test_report_recovers_after_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/report"))
        .respond_with(ResponseTemplate::new(400).set_body_string("{\"error\":\"Rate limit exceeded, slow down\"}"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/report"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let reporter = UsageReporter::with_url(format!("{}/report", server.uri()));
    let accepted = reporter
        .report(
            &Identity::new(WALLET),
            &agent(&server, AgentKind::Chat),
            "ping",
            "pong",
            &direct_transport(),
            &RateGovernor::new(&fast_limits(3)),
        )
        .await;

    assert!(accepted);
}

#[tokio::test]
async fn test_transaction_agent_asks_about_live_hashes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tx"))
        .and(query_param("filter", "validated"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [{ "hash": "0xabc" }] })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/agent"))
        .and(body_partial_json(json!({ "message": "Analyze this transaction in detail: 0xabc" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "choices": [{ "message": { "content": "a transfer" } }] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = AgentQueryClient::with_mode(ResponseMode::Buffered, &format!("{}/tx", server.uri()));
    let outcome = client
        .query(
            &agent(&server, AgentKind::TransactionAnalyzer),
            &direct_transport(),
            &RateGovernor::new(&fast_limits(0)),
        )
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.question, "Analyze this transaction in detail: 0xabc");
    assert_eq!(outcome.answer, "a transfer");
}

#[tokio::test]
async fn test_successful_interaction_is_audited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agent"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "choices": [{ "message": { "content": "pong" } }] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/report"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let log_path = std::env::temp_dir().join(format!("interactions_{}.txt", std::process::id()));
    let _ = std::fs::remove_file(&log_path);

    let flow = flow(&server, ResponseMode::Buffered, Some(AuditWriter::new(&log_path)));
    let ctx = UnitCtx::new(Identity::new(WALLET), 1);
    let mut session = Session::new(ctx.identity.clone(), 1, Utc::now());
    assert!(flow.run_once(&ctx, &mut session).await.success);

    let content = std::fs::read_to_string(&log_path).expect("读取交互记录失败");
    let _ = std::fs::remove_file(&log_path);
    assert_eq!(content.lines().count(), 1);
    assert!(content.contains(WALLET));
    assert!(content.contains("Test Agent"));
    assert!(content.contains("ping"));
}

#[tokio::test]
async fn test_discovery_missing_domain_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/discovery"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "other": { "apis": [] } })))
        .mount(&server)
        .await;

    let discovery = AgentDiscovery::new(format!("{}/discovery", server.uri()), "kite", "Transaction Analyzer");
    let result = discovery
        .discover(&TransportSettings::default(), &QuestionBank::builtin())
        .await;

    assert!(matches!(
        result,
        Err(AppError::Discovery(DiscoveryError::MissingDomain { .. }))
    ));
}

#[tokio::test]
async fn test_app_initialize_loads_sources_and_discovers_agents() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/discovery"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kite": { "apis": [
                { "api": format!("{}/agent", server.uri()), "agent_id": "deployment_1", "name": "Kite AI Assistant" },
                { "api": "not a url", "agent_id": "deployment_2", "name": "Broken" }
            ] },
            "copyright": "test"
        })))
        .mount(&server)
        .await;

    let wallets_path = std::env::temp_dir().join(format!("wallets_{}.txt", std::process::id()));
    std::fs::write(&wallets_path, format!("# comment\n\n{}\n", WALLET)).expect("写入钱包文件失败");

    let config = Config {
        wallets_file: wallets_path.display().to_string(),
        use_proxy: false,
        discovery_url: format!("{}/discovery", server.uri()),
        discovery_key: "kite".to_string(),
        ..Config::default()
    };

    let app = App::initialize(config).await;
    let _ = std::fs::remove_file(&wallets_path);
    let app = app.expect("初始化失败");

    assert_eq!(app.identities(), &[Identity::new(WALLET)]);
    assert_eq!(app.agents().len(), 1);
    assert_eq!(app.agents()[0].agent_id, "deployment_1");
}

#[tokio::test]
async fn test_unit_stops_at_daily_quota_in_until_quota_mode() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agent"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "choices": [{ "message": { "content": "pong" } }] })),
        )
        .expect(20)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/report"))
        .respond_with(ResponseTemplate::new(200))
        .expect(20)
        .mount(&server)
        .await;

    let settings = UnitSettings {
        mode: UnitMode::UntilQuota,
        cooldown_min: Duration::ZERO,
        cooldown_max: Duration::ZERO,
    };
    let ctx = UnitCtx::new(Identity::new(WALLET), 1);
    let summary = run_unit(ctx, flow(&server, ResponseMode::Buffered, None), settings, CancellationToken::new())
        .await
        .expect("执行单元出错");

    assert_eq!(summary.reason, ExitReason::QuotaReached);
    assert_eq!(summary.session.daily_points, 200);
    assert_eq!(summary.session.statistics.successful_interactions, 20);
}

#[tokio::test]
async fn test_unit_exits_immediately_when_already_stopped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let stop = CancellationToken::new();
    stop.cancel();
    let settings = UnitSettings {
        mode: UnitMode::Continuous,
        cooldown_min: Duration::from_secs(1),
        cooldown_max: Duration::from_secs(3),
    };
    let ctx = UnitCtx::new(Identity::new(WALLET), 1);
    let summary = run_unit(ctx, flow(&server, ResponseMode::Buffered, None), settings, stop)
        .await
        .expect("执行单元出错");

    assert_eq!(summary.reason, ExitReason::Stopped);
    assert_eq!(summary.session.statistics.total_interactions, 0);
}

#[tokio::test]
async fn test_failed_query_rotates_to_other_proxy() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agent"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let proxies = dead_proxies();
    let transport = proxied_transport(&proxies);
    assert_eq!(transport.current_proxy(), Some(proxies[0].clone()));

    let client = AgentQueryClient::with_mode(ResponseMode::Buffered, &format!("{}/tx", server.uri()));
    let outcome = client
        .query(&agent(&server, AgentKind::Chat), &transport, &RateGovernor::new(&fast_limits(0)))
        .await;

    assert!(!outcome.success);
    assert!(outcome.answer.is_empty());
    assert_eq!(transport.current_proxy(), Some(proxies[1].clone()));

    // 第二个代理也失败后回到第一个
    let outcome = client
        .query(&agent(&server, AgentKind::Chat), &transport, &RateGovernor::new(&fast_limits(0)))
        .await;
    assert!(!outcome.success);
    assert_eq!(transport.current_proxy(), Some(proxies[0].clone()));
}

#[tokio::test]
async fn test_failed_report_rotates_to_other_proxy() {
    let server = MockServer::start().await;
    let proxies = dead_proxies();
    let transport = proxied_transport(&proxies);

    let reporter = UsageReporter::with_url(format!("{}/report", server.uri()));
    let accepted = reporter
        .report(
            &Identity::new(WALLET),
            &agent(&server, AgentKind::Chat),
            "ping",
            "pong",
            &transport,
            &RateGovernor::new(&fast_limits(2)),
        )
        .await;

    assert!(!accepted);
    assert_eq!(transport.current_proxy(), Some(proxies[1].clone()));
}

#[tokio::test]
async fn test_failed_tx_feed_rotates_to_other_proxy() {
    let server = MockServer::start().await;
    let proxies = dead_proxies();
    let transport = proxied_transport(&proxies);

    let hashes = TxFeed::new(format!("{}/tx", server.uri()))
        .recent_hashes(&transport, &RateGovernor::new(&fast_limits(0)))
        .await;

    assert!(hashes.is_empty());
    assert_eq!(transport.current_proxy(), Some(proxies[1].clone()));
}

#[tokio::test]
async fn test_discovery_non_json_document_is_discovery_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/discovery"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let discovery = AgentDiscovery::new(format!("{}/discovery", server.uri()), "kite", "Transaction Analyzer");
    let result = discovery
        .discover(&TransportSettings::default(), &QuestionBank::builtin())
        .await;

    assert!(matches!(
        result,
        Err(AppError::Discovery(DiscoveryError::NotJson { .. }))
    ));
}
