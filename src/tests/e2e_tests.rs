/// End-to-end tests: actions run against an in-process stub of the game API.
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;

use crate::actions::{self, ActionError, CompletionOutcome};
use crate::api::FarmApi;
use crate::config::Config;
use crate::loops;
use crate::model::{ContractState, PlotState};
use crate::render;
use crate::session::ViewSession;
use crate::state::AppState;
use crate::storage::MemoryStore;

#[derive(Debug, Clone)]
struct Recorded {
    path: String,
    csrf: Option<String>,
    body: String,
}

#[derive(Default)]
struct Stub {
    requests: Mutex<Vec<Recorded>>,
    gets: Mutex<Vec<String>>,
    completions: AtomicUsize,
    /// Plant answers with a status object instead of the plot.
    plant_without_plot: AtomicBool,
    /// Number of upcoming `/api/farm/me/` calls that answer 500.
    farm_failures: AtomicUsize,
}

type St = Arc<Stub>;

impl Stub {
    fn record(&self, path: String, headers: &HeaderMap, body: String) {
        let csrf = headers
            .get("x-csrftoken")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push(Recorded { path, csrf, body });
    }

    fn posts_to(&self, path: &str) -> Vec<Recorded> {
        self.requests.lock().unwrap().iter().filter(|r| r.path == path).cloned().collect()
    }

    fn post_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn gets_of(&self, path: &str) -> usize {
        self.gets.lock().unwrap().iter().filter(|p| *p == path).count()
    }
}

async fn stub_plant(
    State(stub): State<St>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    body: String,
) -> Json<serde_json::Value> {
    stub.record(format!("/api/plots/{id}/plant/"), &headers, body);
    if stub.plant_without_plot.load(Ordering::SeqCst) {
        return Json(serde_json::json!({"status": "planted"}));
    }
    let ready_at = Utc::now() + chrono::Duration::seconds(120);
    Json(serde_json::json!({
        "id": id,
        "harvest_ready_at": ready_at.to_rfc3339(),
        "crop_type": {"name": "Wheat"}
    }))
}

async fn stub_harvest(
    State(stub): State<St>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    body: String,
) -> Json<serde_json::Value> {
    stub.record(format!("/api/plots/{id}/harvest/"), &headers, body);
    Json(serde_json::json!({
        "inventory_item": {"id": 1, "crop_type": {"id": 1, "name": "Wheat", "base_price": 4}, "quantity": 6}
    }))
}

async fn stub_sell(State(stub): State<St>, headers: HeaderMap, body: String) -> Response {
    stub.record("/api/inventory/sell-npc/".into(), &headers, body);
    (StatusCode::BAD_REQUEST, Json(serde_json::json!({"detail": "Not enough crops"}))).into_response()
}

async fn stub_listing(State(stub): State<St>, headers: HeaderMap, body: String) -> Response {
    stub.record("/api/market/listings/".into(), &headers, body);
    (StatusCode::INTERNAL_SERVER_ERROR, "<html>boom</html>").into_response()
}

async fn stub_complete(
    State(stub): State<St>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> StatusCode {
    stub.record(format!("/api/contracts/{id}/complete/"), &headers, String::new());
    stub.completions.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(200)).await;
    StatusCode::OK
}

async fn stub_farm(State(stub): State<St>) -> Response {
    stub.gets.lock().unwrap().push("/api/farm/me/".into());
    let failing = stub
        .farm_failures
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        return (StatusCode::INTERNAL_SERVER_ERROR, "down").into_response();
    }
    Json(serde_json::json!({"id": 1, "name": "Green Acres", "balance": 120})).into_response()
}

async fn stub_list(State(stub): State<St>, uri: Uri) -> Json<serde_json::Value> {
    stub.gets.lock().unwrap().push(uri.path().to_string());
    Json(serde_json::json!([]))
}

async fn spawn_stub() -> (String, St) {
    let stub = St::default();
    let router = Router::new()
        .route("/api/plots/{id}/plant/", post(stub_plant))
        .route("/api/plots/{id}/harvest/", post(stub_harvest))
        .route("/api/inventory/sell-npc/", post(stub_sell))
        .route("/api/market/listings/", post(stub_listing).get(stub_list))
        .route("/api/contracts/{id}/complete/", post(stub_complete))
        .route("/api/farm/me/", get(stub_farm))
        .route("/api/crop-types/", get(stub_list))
        .route("/api/plots/", get(stub_list))
        .route("/api/inventory/", get(stub_list))
        .route("/api/contracts/", get(stub_list))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{addr}"), stub)
}

/// A base URL nothing listens on.
async fn dead_base() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn test_config(api_base: &str) -> Config {
    Config {
        api_base: api_base.to_string(),
        session_id: "sess42".into(),
        csrf_token: "tok123".into(),
        countdown_tick_ms: 1000,
        balance_poll_secs: 5,
        contract_reload_delay_ms: 500,
        request_timeout_secs: 5,
        store_path: String::new(),
        log_level: "debug".into(),
        http_port: 0,
    }
}

fn test_app(api_base: &str) -> Arc<AppState> {
    test_app_with(api_base, |_| {})
}

fn test_app_with(api_base: &str, tweak: impl FnOnce(&mut Config)) -> Arc<AppState> {
    let mut config = test_config(api_base);
    tweak(&mut config);
    let api = FarmApi::new(&config).unwrap();
    let session = ViewSession::load(Arc::new(MemoryStore::default()));
    AppState::new(config, api, session)
}

// ── Plant ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn plant_posts_selected_seed_and_renders_growing_plot() {
    let (base, stub) = spawn_stub().await;
    let app = test_app(&base);

    actions::select_seed(&app, Some("7".into()));
    actions::plant(&app, 3).await.unwrap();

    let sent = stub.posts_to("/api/plots/3/plant/");
    assert_eq!(sent.len(), 1);
    let body: serde_json::Value = serde_json::from_str(&sent[0].body).unwrap();
    assert_eq!(body, serde_json::json!({"crop_type_id": "7"}));
    assert_eq!(sent[0].csrf.as_deref(), Some("tok123"));

    let view = app.view.read().unwrap();
    let plot = &view.plots[&3];
    assert_eq!(plot.state, PlotState::Growing);
    assert_eq!(plot.crop_name.as_deref(), Some("Wheat"));

    let rendered = render::plot_view(plot, Utc::now());
    assert!(!rendered.show_harvest);
    assert!(!rendered.show_plant);
    assert_ne!(rendered.timer_label.as_deref(), Some("Ready"));

    assert_eq!(view.balance, Some(120));
}

#[tokio::test]
async fn plant_accepted_without_plot_body_reloads_the_farm() {
    let (base, stub) = spawn_stub().await;
    stub.plant_without_plot.store(true, Ordering::SeqCst);
    let app = test_app(&base);

    actions::select_seed(&app, Some("7".into()));
    actions::plant(&app, 3).await.unwrap();

    assert_eq!(stub.posts_to("/api/plots/3/plant/").len(), 1);
    assert_eq!(stub.gets_of("/api/plots/"), 1);
    let view = app.view.read().unwrap();
    assert!(view.synced_at.is_some());
    assert_eq!(view.balance, Some(120));
}

#[tokio::test]
async fn plant_without_seed_sends_nothing() {
    let (base, stub) = spawn_stub().await;
    let app = test_app(&base);

    let err = actions::plant(&app, 3).await.unwrap_err();
    assert_eq!(err, ActionError::Validation("Choose a seed first".into()));
    assert_eq!(stub.post_count(), 0);
}

// ── Harvest + balance ─────────────────────────────────────────────────────────

#[tokio::test]
async fn harvest_empties_plot_updates_inventory_and_balance() {
    let (base, _stub) = spawn_stub().await;
    let app = test_app(&base);

    actions::harvest(&app, 2).await.unwrap();

    let view = app.view.read().unwrap();
    assert_eq!(view.inventory_quantity(1), 6);
    assert_eq!(render::balance_text(view.balance), "120 coins");
}

#[tokio::test]
async fn balance_refresh_overwrites_display() {
    let (base, _stub) = spawn_stub().await;
    let app = test_app(&base);
    app.view.write().unwrap().set_balance(5);

    assert!(actions::refresh_balance(&app).await);
    assert!(actions::refresh_balance(&app).await);

    let view = app.view.read().unwrap();
    assert_eq!(render::balance_text(view.balance), "120 coins");
    assert_eq!(view.farm_name, "Green Acres");
}

#[tokio::test]
async fn failed_balance_refresh_after_action_falls_back_to_resync() {
    let (base, stub) = spawn_stub().await;
    stub.farm_failures.store(1, Ordering::SeqCst);
    let app = test_app(&base);

    actions::harvest(&app, 2).await.unwrap();

    assert_eq!(stub.gets_of("/api/farm/me/"), 2);
    assert_eq!(stub.gets_of("/api/contracts/"), 1);
    let view = app.view.read().unwrap();
    assert!(view.synced_at.is_some());
    assert_eq!(view.balance, Some(120));
}

#[tokio::test]
async fn balance_poller_overwrites_balance_after_one_interval() {
    let (base, stub) = spawn_stub().await;
    let app = test_app_with(&base, |c| c.balance_poll_secs = 1);
    app.view.write().unwrap().set_balance(5);

    let poller = tokio::spawn(loops::run_balance_poller(app.clone()));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(app.view.read().unwrap().balance, Some(5));

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(app.view.read().unwrap().balance, Some(120));
    assert!(stub.gets_of("/api/farm/me/") >= 1);

    app.shutdown.cancel();
    poller.await.unwrap();
}

// ── Error messages ────────────────────────────────────────────────────────────

#[tokio::test]
async fn rejected_sale_surfaces_server_detail() {
    let (base, stub) = spawn_stub().await;
    let app = test_app(&base);

    let err = actions::sell_npc(&app, 1, 5).await.unwrap_err();
    assert_eq!(err, ActionError::Rejected("Not enough crops".into()));

    let sent = stub.posts_to("/api/inventory/sell-npc/");
    let body: serde_json::Value = serde_json::from_str(&sent[0].body).unwrap();
    assert_eq!(body, serde_json::json!({"crop_type_id": 1, "quantity": 5}));
}

#[tokio::test]
async fn unparsable_error_body_falls_back_to_generic_message() {
    let (base, _stub) = spawn_stub().await;
    let app = test_app(&base);

    let err = actions::create_listing(&app, Some(1), Some(2), Some(3)).await.unwrap_err();
    assert_eq!(err, ActionError::Rejected("Error creating listing".into()));
}

#[tokio::test]
async fn invalid_sale_quantity_sends_nothing() {
    let (base, stub) = spawn_stub().await;
    let app = test_app(&base);

    assert!(matches!(actions::sell_npc(&app, 1, 0).await, Err(ActionError::Validation(_))));
    assert_eq!(stub.post_count(), 0);
}

// ── Contracts ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn contract_completion_is_never_sent_twice_concurrently() {
    let (base, stub) = spawn_stub().await;
    let app = test_app(&base);

    let (a, b) = tokio::join!(
        actions::complete_contract(&app, 9),
        actions::complete_contract(&app, 9),
    );
    let mut outcomes = vec![a.unwrap(), b.unwrap()];
    outcomes.sort_by_key(|o| *o == CompletionOutcome::Completed);
    assert_eq!(outcomes, vec![CompletionOutcome::AlreadyInFlight, CompletionOutcome::Completed]);
    assert_eq!(stub.completions.load(Ordering::SeqCst), 1);
    assert!(!app.busy.is_busy(9));

    assert_eq!(actions::complete_contract(&app, 9).await.unwrap(), CompletionOutcome::Completed);
    assert_eq!(stub.completions.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn different_contracts_complete_in_parallel() {
    let (base, stub) = spawn_stub().await;
    let app = test_app(&base);

    let (a, b) = tokio::join!(
        actions::complete_contract(&app, 1),
        actions::complete_contract(&app, 2),
    );
    assert_eq!(a.unwrap(), CompletionOutcome::Completed);
    assert_eq!(b.unwrap(), CompletionOutcome::Completed);
    assert_eq!(stub.completions.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn transport_failures_in_background_work_are_silent() {
    let app = test_app(&dead_base().await);

    assert!(!actions::refresh_balance(&app).await);
    assert_eq!(app.view.read().unwrap().balance, None);

    let outcome = actions::complete_contract(&app, 4).await.unwrap();
    assert_eq!(outcome, CompletionOutcome::Dropped);
    assert!(!app.busy.is_busy(4));
}

#[tokio::test]
async fn expired_board_schedules_exactly_one_reload() {
    let app = test_app(&dead_base().await);
    let now = Utc::now();
    {
        let mut view = app.view.write().unwrap();
        let expired = now - chrono::Duration::seconds(3);
        let contracts: Vec<crate::types::ContractDto> = serde_json::from_value(serde_json::json!([
            {"id": 1, "crop_type": {"name": "Wheat"}, "quantity_required": 2, "reward_coins": 10,
             "expires_at": expired.to_rfc3339(), "is_active": true, "is_completed": false},
            {"id": 2, "crop_type": {"name": "Corn"}, "quantity_required": 4, "reward_coins": 30,
             "expires_at": expired.to_rfc3339(), "is_active": true, "is_completed": false}
        ]))
        .unwrap();
        view.replace_contracts(contracts);
    }

    let first = loops::on_tick(&app, now);
    assert!(first.schedule_reload);
    assert_eq!(first.newly_expired, vec![1, 2]);

    let second = loops::on_tick(&app, now + chrono::Duration::seconds(1));
    assert!(!second.schedule_reload);

    let view = app.view.read().unwrap();
    assert!(view.contracts.values().all(|c| c.state == ContractState::Expired));
    assert!(view.board.reload_latched);
}

#[tokio::test]
async fn countdown_loop_reloads_once_after_board_expiry() {
    let (base, stub) = spawn_stub().await;
    let app = test_app_with(&base, |c| {
        c.countdown_tick_ms = 20;
        c.contract_reload_delay_ms = 300;
    });
    {
        let expired = Utc::now() - chrono::Duration::seconds(3);
        let contracts: Vec<crate::types::ContractDto> = serde_json::from_value(serde_json::json!([
            {"id": 1, "crop_type": {"name": "Wheat"}, "quantity_required": 2, "reward_coins": 10,
             "expires_at": expired.to_rfc3339(), "is_active": true, "is_completed": false}
        ]))
        .unwrap();
        app.view.write().unwrap().replace_contracts(contracts);
    }

    let countdown = tokio::spawn(loops::run_countdown(app.clone()));

    // Many ticks have passed the expiry, but the reload is still pending.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(stub.gets_of("/api/contracts/"), 0);
    assert_eq!(app.view.read().unwrap().contracts[&1].state, ContractState::Expired);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(stub.gets_of("/api/contracts/"), 1);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(stub.gets_of("/api/contracts/"), 1);
    assert!(app.view.read().unwrap().synced_at.is_some());

    app.shutdown.cancel();
    countdown.await.unwrap();
}

#[tokio::test]
async fn resync_replaces_view_from_api() {
    let (base, _stub) = spawn_stub().await;
    let app = test_app(&base);

    actions::resync(&app).await.unwrap();

    let view = app.view.read().unwrap();
    assert_eq!(view.balance, Some(120));
    assert!(view.plots.is_empty());
    assert!(view.synced_at.is_some());
}
