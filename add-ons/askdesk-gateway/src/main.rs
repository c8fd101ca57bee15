//! Axum-based gateway for the askdesk answer router. Config-driven via CoreConfig.

mod handlers;

use askdesk_core::{
    CombinedSource, CoreConfig, DataError, JsonFileSource, KeywordIntentClassifier, KnowledgeStore, Matcher,
    RoutingPolicy, SessionMemory, SledSource,
};
use askdesk_skills::{build_generative, build_search};
use axum::extract::State;
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Loads the static JSON entries, then the admin-managed sled entries when configured.
fn load_knowledge(config: &CoreConfig) -> Result<KnowledgeStore, DataError> {
    let mut source = CombinedSource::new().with_source(Box::new(JsonFileSource::new(&config.knowledge_path)));
    if let Some(db_path) = config.knowledge_db_path.as_deref().filter(|p| !p.trim().is_empty()) {
        source = source.with_source(Box::new(SledSource::open_path(db_path)?));
    }
    KnowledgeStore::load(&source)
}

/// Pre-flight check: config parses, knowledge base loads, port is available.
fn run_verify() -> Result<(), String> {
    let config = CoreConfig::load().map_err(|e| format!("Config load failed: {}", e))?;

    print!("Checking knowledge base ({})... ", config.knowledge_path);
    let store = load_knowledge(&config).map_err(|e| format!("knowledge base unavailable: {}", e))?;
    println!(
        "OK ({} entries, {} eligible)",
        store.len(),
        store.eligible().count()
    );
    drop(store);

    let port = config.port;
    print!("Checking port {}... ", port);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    match std::net::TcpListener::bind(addr) {
        Ok(listener) => {
            drop(listener);
            println!("OK (available)");
        }
        Err(e) => {
            return Err(format!("Port {} BLOCKED: {}", port, e));
        }
    }

    println!("\n✅ SUCCESS: All systems GO. Ready to start gateway.");
    Ok(())
}

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[askdesk-gateway] .env not loaded: {} (using system environment)", e);
    }

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--verify") {
        match run_verify() {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                eprintln!("❌ PRE-FLIGHT FAILED: {}", e);
                std::process::exit(1);
            }
        }
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(CoreConfig::load().expect("load CoreConfig"));
    let knowledge = Arc::new(load_knowledge(&config).expect("load knowledge base"));
    let memory = Arc::new(SessionMemory::new(&config.memory));
    let generator = build_generative(&config.llm).expect("build generative backend");
    let search = build_search(&config.search).expect("build web search backend");

    let policy = Arc::new(RoutingPolicy::new(
        Matcher::new(knowledge),
        Arc::clone(&memory),
        generator,
        search,
        Arc::new(KeywordIntentClassifier::new()),
        config.routing.clone(),
    ));

    tokio::spawn(sweep_loop(Arc::clone(&memory), config.memory.sweep_interval()));

    let app = build_app(AppState {
        config: Arc::clone(&config),
        policy,
    });

    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], config.port));
    tracing::info!(target: "askdesk::gateway", "{} listening on {}", config.app_name, addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await.unwrap(), app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    memory.teardown();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(target: "askdesk::gateway", error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!(target: "askdesk::gateway", "Shutdown requested");
}

/// Periodically drops sessions idle past the TTL.
async fn sweep_loop(memory: Arc<SessionMemory>, tick: Duration) {
    tracing::info!(
        target: "askdesk::gateway",
        interval_secs = tick.as_secs(),
        ttl_secs = memory.ttl().as_secs(),
        "Session sweep started"
    );
    let mut interval = tokio::time::interval(tick);
    // first tick completes immediately
    interval.tick().await;
    loop {
        interval.tick().await;
        memory.expire_stale(Instant::now());
    }
}

fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/v1/status", get(status))
        .route("/api/v1/health", get(health))
        .route("/api/chat", post(handlers::chat::chat))
        .route("/api/session/:user_id/history", get(handlers::session::history))
        .route("/api/session/:user_id", delete(handlers::session::clear))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) config: Arc<CoreConfig>,
    pub(crate) policy: Arc<RoutingPolicy>,
}

/// GET /api/v1/health – liveness check for UI and scripts.
async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

/// GET /v1/status – app identity, knowledge base size, session stats, backends.
async fn status(State(state): State<AppState>) -> axum::Json<serde_json::Value> {
    let store = state.policy.matcher().store();
    axum::Json(serde_json::json!({
        "app_name": state.config.app_name,
        "port": state.config.port,
        "knowledge": {
            "entries": store.len(),
            "eligible": store.eligible().count(),
            "categories": store.categories(),
        },
        "memory": state.policy.memory().stats(),
        "llm_mode": state.policy.generator_name(),
        "search_provider": state.policy.search_name(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use askdesk_core::{KnowledgeEntry, MemorySettings, RoutingSettings};
    use askdesk_skills::{DisabledSearch, MockBackend};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn write_knowledge(dir: &std::path::Path) -> std::path::PathBuf {
        let path = dir.join("knowledge.json");
        std::fs::write(
            &path,
            serde_json::json!([
                { "keyword": "library hours", "answer": "Mon-Fri 8am-10pm, Sat 2pm-6pm", "category": "campus_life" },
                { "question": "tuition fees", "content": "Pay at the bursar before week 4", "priority": 10 }
            ])
            .to_string(),
        )
        .unwrap();
        path
    }

    fn test_config(knowledge_path: &std::path::Path) -> CoreConfig {
        CoreConfig {
            app_name: "Test Desk".to_string(),
            port: 4000,
            knowledge_path: knowledge_path.to_string_lossy().into_owned(),
            ..CoreConfig::default()
        }
    }

    fn test_app(dir: &tempfile::TempDir) -> Router {
        let config = test_config(&write_knowledge(dir.path()));
        let knowledge = Arc::new(load_knowledge(&config).unwrap());
        let policy = Arc::new(RoutingPolicy::new(
            Matcher::new(knowledge),
            Arc::new(SessionMemory::new(&MemorySettings::default())),
            Arc::new(MockBackend::new()),
            Arc::new(DisabledSearch),
            Arc::new(KeywordIntentClassifier::new()),
            RoutingSettings::default(),
        ));
        build_app(AppState {
            config: Arc::new(config),
            policy,
        })
    }

    fn chat_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(res: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_chat_answers_from_knowledge_base() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);
        let res = app
            .oneshot(chat_request(serde_json::json!({ "q": "library hours", "user_id": "u1" })))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = json_body(res).await;
        assert_eq!(json["answer"], "Mon-Fri 8am-10pm, Sat 2pm-6pm");
        assert_eq!(json["source"], "knowledge_base");
        assert_eq!(json["kbMatch"], true);
        assert_eq!(json["error"], false);
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["escalate"], false);
        assert_eq!(json["suggestions"][0], "What clubs and societies are available?");
    }

    #[tokio::test]
    async fn test_chat_confirms_previous_answer() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);
        app.clone()
            .oneshot(chat_request(serde_json::json!({ "q": "tuition fees", "user_id": "u1" })))
            .await
            .unwrap();
        let res = app
            .oneshot(chat_request(serde_json::json!({ "q": "Is that right?", "user_id": "u1" })))
            .await
            .unwrap();
        let json = json_body(res).await;
        assert_eq!(json["answer"], "Yes, that's correct! Pay at the bursar before week 4");
        assert_eq!(json["source"], "knowledge_base");
    }

    #[tokio::test]
    async fn test_chat_rejects_blank_question() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);
        let res = app
            .oneshot(chat_request(serde_json::json!({ "q": "   " })))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let json = json_body(res).await;
        assert_eq!(json["answer"], "Please ask a valid question.");
    }

    #[tokio::test]
    async fn test_chat_assigns_guest_id_and_routes_small_talk() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);
        let res = app
            .oneshot(chat_request(serde_json::json!({ "q": "tell me a joke" })))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = json_body(res).await;
        assert!(json["userId"].as_str().unwrap().starts_with("guest-"));
        assert_eq!(json["source"], "generative");
        assert_eq!(json["kbMatch"], false);
        assert!(json["answer"].as_str().unwrap().contains("Mock LLM"));
    }

    #[tokio::test]
    async fn test_session_history_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);

        let res = app
            .clone()
            .oneshot(chat_request(serde_json::json!({ "q": "tuition fees", "userId": "alice" })))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let history_req = || {
            Request::builder()
                .method("GET")
                .uri("/api/session/alice/history")
                .body(Body::empty())
                .unwrap()
        };
        let res = app.clone().oneshot(history_req()).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = json_body(res).await;
        let turns = json["turns"].as_array().unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0]["role"], "user");
        assert_eq!(turns[0]["text"], "tuition fees");
        assert_eq!(turns[1]["metadata"]["source"], "knowledge_base");
        assert_eq!(turns[1]["metadata"]["keyword"], "tuition fees");
        assert_eq!(json["apiCallCount"], 0);

        let clear_req = Request::builder()
            .method("DELETE")
            .uri("/api/session/alice")
            .body(Body::empty())
            .unwrap();
        let res = app.clone().oneshot(clear_req).await.unwrap();
        assert_eq!(json_body(res).await["cleared"], true);

        let res = app.oneshot(history_req()).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_status_reports_knowledge_and_backends() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);
        let req = Request::builder()
            .method("GET")
            .uri("/v1/status")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = json_body(res).await;
        assert_eq!(json["app_name"], "Test Desk");
        assert_eq!(json["port"], 4000);
        assert_eq!(json["knowledge"]["entries"], 2);
        assert_eq!(json["knowledge"]["categories"], serde_json::json!(["campus_life", "general"]));
        assert_eq!(json["memory"]["active_sessions"], 0);
        assert_eq!(json["llm_mode"], "mock");
        assert_eq!(json["search_provider"], "disabled");
    }

    #[test]
    fn test_load_knowledge_merges_json_and_sled() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("admin_kb");
        {
            let db = SledSource::open_path(&db_path).unwrap();
            db.insert_entry(&KnowledgeEntry::new("hostel", "Apply through the dean of students"))
                .unwrap();
        }
        let config = CoreConfig {
            knowledge_db_path: Some(db_path.to_string_lossy().into_owned()),
            ..test_config(&write_knowledge(dir.path()))
        };
        let store = load_knowledge(&config).unwrap();
        let keywords: Vec<&str> = store.all().iter().map(|e| e.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["tuition fees", "library hours", "hostel"]);
    }

    #[test]
    fn test_load_knowledge_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir.path().join("absent.json"));
        assert!(matches!(load_knowledge(&config), Err(DataError::Missing(_))));
    }
}
