use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::actions::{self, ActionError, CompletionOutcome};
use crate::render::{self, PageView};
use crate::state::AppState;
use crate::web;

type S = Arc<AppState>;
type Reply = Result<Json<serde_json::Value>, (StatusCode, String)>;

pub fn build_router(state: S) -> Router {
    Router::new()
        .route("/", get(serve_ui))
        .route("/api/view", get(get_view))
        .route("/api/events", get(get_events))
        .route("/api/config", get(get_config))
        .route("/api/settings", post(post_settings))
        .route("/api/seed", post(post_seed))
        .route("/api/plots/{id}/plant", post(post_plant))
        .route("/api/plots/{id}/harvest", post(post_harvest))
        .route("/api/inventory/{crop_id}/sell-qty", post(post_sell_qty))
        .route("/api/inventory/{crop_id}/sell", post(post_sell))
        .route("/api/market/listings", post(post_listing))
        .route("/api/market/listings/{id}/buy", post(post_buy))
        .route("/api/contracts/{id}/complete", post(post_complete))
        .route("/api/reload", post(post_reload))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Maps an action failure to the status + message the page shows in an alert.
fn alert(err: ActionError) -> (StatusCode, String) {
    let status = match &err {
        ActionError::Validation(_) => StatusCode::BAD_REQUEST,
        ActionError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ActionError::Transport(_) => StatusCode::BAD_GATEWAY,
    };
    (status, err.to_string())
}

fn reported(state: &AppState, kind: &str, err: ActionError) -> (StatusCode, String) {
    state.push_event("error", &format!("{kind}: {err}"));
    alert(err)
}

// ── UI ──────────────────────────────────────────────────────────────────────

async fn serve_ui() -> axum::response::Html<&'static str> {
    axum::response::Html(web::INDEX_HTML)
}

// ── View ────────────────────────────────────────────────────────────────────

async fn get_view(State(state): State<S>) -> Json<PageView> {
    let view = state.view.read().unwrap();
    let session = state.session.lock().unwrap();
    Json(render::render_page(&view, &session, &state.busy, chrono::Utc::now()))
}

async fn get_events(State(state): State<S>) -> Json<Vec<crate::state::EventEntry>> {
    let events = state.events.lock().unwrap();
    Json(events.iter().cloned().collect())
}

async fn get_config(State(state): State<S>) -> Json<serde_json::Value> {
    let config = state.config.read().unwrap();
    Json(serde_json::json!({
        "api_base": config.api_base,
        "session_set": config.has_session(),
        "csrf_set": !state.api.csrf_token().is_empty(),
        "balance_poll_secs": config.balance_poll_secs,
        "contract_reload_delay_ms": config.contract_reload_delay_ms,
        "countdown_tick_ms": config.countdown_tick_ms,
    }))
}

#[derive(Deserialize)]
struct SettingsRequest {
    balance_poll_secs: Option<u64>,
    contract_reload_delay_ms: Option<u64>,
}

async fn post_settings(
    State(state): State<S>,
    Json(body): Json<SettingsRequest>,
) -> Reply {
    let mut config = state.config.write().unwrap();
    if let Some(v) = body.balance_poll_secs {
        if v == 0 {
            return Err((StatusCode::BAD_REQUEST, "poll interval must be > 0".into()));
        }
        config.balance_poll_secs = v;
    }
    if let Some(v) = body.contract_reload_delay_ms { config.contract_reload_delay_ms = v; }
    config.persist();
    drop(config);

    state.push_event("settings", "settings updated + saved");
    Ok(Json(serde_json::json!({"ok": true})))
}

// ── Seed + sell quantity (local only) ───────────────────────────────────────

#[derive(Deserialize)]
struct SeedRequest {
    seed_id: Option<String>,
}

async fn post_seed(
    State(state): State<S>,
    Json(body): Json<SeedRequest>,
) -> Json<serde_json::Value> {
    actions::select_seed(&state, body.seed_id);
    Json(serde_json::json!({"ok": true, "seed_id": state.selected_seed()}))
}

#[derive(Deserialize)]
struct SellQtyRequest {
    quantity: i64,
}

async fn post_sell_qty(
    State(state): State<S>,
    Path(crop_id): Path<u64>,
    Json(body): Json<SellQtyRequest>,
) -> Json<serde_json::Value> {
    let stored = actions::set_sell_quantity(&state, crop_id, body.quantity);
    Json(serde_json::json!({"ok": true, "quantity": stored}))
}

// ── Plots ───────────────────────────────────────────────────────────────────

async fn post_plant(State(state): State<S>, Path(plot_id): Path<u64>) -> Reply {
    actions::plant(&state, plot_id)
        .await
        .map_err(|e| reported(&state, "plant", e))?;
    Ok(Json(serde_json::json!({"ok": true})))
}

async fn post_harvest(State(state): State<S>, Path(plot_id): Path<u64>) -> Reply {
    actions::harvest(&state, plot_id)
        .await
        .map_err(|e| reported(&state, "harvest", e))?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// ── Market ──────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SellRequest {
    quantity: Option<i64>,
}

async fn post_sell(
    State(state): State<S>,
    Path(crop_id): Path<u64>,
    Json(body): Json<SellRequest>,
) -> Reply {
    let requested = match body.quantity {
        Some(q) => q,
        None => {
            let available = state.inventory_quantity(crop_id);
            i64::from(state.session.lock().unwrap().sell_quantity(crop_id, available))
        }
    };
    let sold = actions::sell_npc(&state, crop_id, requested)
        .await
        .map_err(|e| reported(&state, "sell", e))?;
    Ok(Json(serde_json::json!({"ok": true, "quantity": sold})))
}

#[derive(Deserialize)]
struct ListingRequest {
    crop_type_id: Option<u64>,
    quantity: Option<i64>,
    unit_price: Option<i64>,
}

async fn post_listing(
    State(state): State<S>,
    Json(body): Json<ListingRequest>,
) -> Reply {
    actions::create_listing(&state, body.crop_type_id, body.quantity, body.unit_price)
        .await
        .map_err(|e| reported(&state, "listing", e))?;
    Ok(Json(serde_json::json!({"ok": true})))
}

async fn post_buy(State(state): State<S>, Path(listing_id): Path<u64>) -> Reply {
    actions::buy_listing(&state, listing_id)
        .await
        .map_err(|e| reported(&state, "buy", e))?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// ── Contracts ───────────────────────────────────────────────────────────────

async fn post_complete(State(state): State<S>, Path(contract_id): Path<u64>) -> Reply {
    let outcome = actions::complete_contract(&state, contract_id)
        .await
        .map_err(|e| reported(&state, "contract", e))?;
    let outcome = match outcome {
        CompletionOutcome::Completed => "completed",
        CompletionOutcome::AlreadyInFlight => "in_flight",
        CompletionOutcome::Dropped => "dropped",
    };
    Ok(Json(serde_json::json!({"ok": true, "outcome": outcome})))
}

// ── Reload ──────────────────────────────────────────────────────────────────

async fn post_reload(State(state): State<S>) -> Reply {
    actions::resync(&state).await.map_err(|e| {
        tracing::warn!(error = %e, "manual reload failed");
        state.push_event("error", &format!("reload: {e}"));
        (StatusCode::BAD_GATEWAY, e.message("Error reloading"))
    })?;
    Ok(Json(serde_json::json!({"ok": true})))
}
