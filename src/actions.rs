use chrono::Utc;

use crate::api::ApiError;
use crate::session::clamp_to_available;
use crate::state::AppState;
use crate::types::CreateListingRequest;

const PLANT_FAILED: &str = "Error planting";
const HARVEST_FAILED: &str = "Error harvesting";
const SELL_FAILED: &str = "Error selling";
const LISTING_FAILED: &str = "Error creating listing";
const BUY_FAILED: &str = "Error buying listing";
const CONTRACT_FAILED: &str = "Error completing contract";

/// Failures a player sees as an alert. Messages are ready for display.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// Pre-flight check failed; nothing was sent.
    #[error("{0}")]
    Validation(String),
    /// The server answered with a non-success status.
    #[error("{0}")]
    Rejected(String),
    /// The request never got an answer.
    #[error("{0}")]
    Transport(String),
}

impl ActionError {
    fn from_api(err: &ApiError, fallback: &str) -> Self {
        match err {
            ApiError::Transport(_) => ActionError::Transport(fallback.to_string()),
            other => ActionError::Rejected(other.message(fallback)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Completed,
    /// Another completion request for the same contract is outstanding.
    AlreadyInFlight,
    /// Transport failure, dropped without telling the player.
    Dropped,
}

/// Parts of the view-model refetched after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slice {
    Balance,
    Inventory,
    Listings,
    Contracts,
}

// ── Pre-flight validation ───────────────────────────────────────────────────

pub fn require_seed(selected: Option<&str>) -> Result<String, ActionError> {
    selected
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ActionError::Validation("Choose a seed first".into()))
}

/// Refuses non-positive quantities, otherwise clamps to what is available.
pub fn sell_quantity(requested: i64, available: u32) -> Result<u32, ActionError> {
    if requested <= 0 {
        return Err(ActionError::Validation("Enter a positive quantity".into()));
    }
    let q = u32::try_from(requested).unwrap_or(u32::MAX);
    Ok(clamp_to_available(q, available))
}

pub fn listing_request(
    crop_type_id: Option<u64>,
    quantity: Option<i64>,
    unit_price: Option<i64>,
    available: u32,
) -> Result<CreateListingRequest, ActionError> {
    let invalid = || ActionError::Validation("Choose a crop, quantity and price".into());

    let crop_type_id = crop_type_id.ok_or_else(invalid)?;
    let quantity = quantity
        .filter(|q| *q > 0)
        .and_then(|q| u32::try_from(q).ok())
        .ok_or_else(invalid)?;
    let unit_price = unit_price
        .filter(|p| *p > 0)
        .and_then(|p| u32::try_from(p).ok())
        .ok_or_else(invalid)?;

    Ok(CreateListingRequest {
        crop_type_id,
        quantity: clamp_to_available(quantity, available),
        unit_price,
    })
}

// ── Actions ─────────────────────────────────────────────────────────────────

pub async fn plant(app: &AppState, plot_id: u64) -> Result<(), ActionError> {
    let seed = require_seed(app.selected_seed().as_deref())?;

    let plot = app.api.plant(plot_id, &seed).await.map_err(|e| {
        tracing::warn!(plot_id, seed, error = %e, "plant failed");
        ActionError::from_api(&e, PLANT_FAILED)
    })?;

    let Some(plot) = plot else {
        tracing::info!(plot_id, seed, "planted, reloading farm");
        app.push_event("plant", &format!("plot {plot_id}: planted"));
        if let Err(e) = resync(app).await {
            tracing::warn!(error = %e, "resync after plant failed");
        }
        return Ok(());
    };

    let crop = plot.crop_type.as_ref().map(|c| c.name.clone()).unwrap_or_default();
    app.view.write().unwrap().apply_planted(plot, Utc::now());
    tracing::info!(plot_id, seed, crop, "planted");
    app.push_event("plant", &format!("plot {plot_id}: planted {crop}"));

    refresh(app, &[Slice::Balance]).await;
    Ok(())
}

pub async fn harvest(app: &AppState, plot_id: u64) -> Result<(), ActionError> {
    let resp = app.api.harvest(plot_id).await.map_err(|e| {
        tracing::warn!(plot_id, error = %e, "harvest failed");
        ActionError::from_api(&e, HARVEST_FAILED)
    })?;

    let gained = resp
        .inventory_item
        .as_ref()
        .map(|i| format!("{} x{}", i.crop_type.name, i.quantity));
    app.view.write().unwrap().apply_harvested(plot_id, resp.inventory_item);
    tracing::info!(plot_id, gained = ?gained, "harvested");
    app.push_event("harvest", &format!("plot {plot_id}: {}", gained.unwrap_or_else(|| "harvested".into())));

    refresh(app, &[Slice::Balance]).await;
    Ok(())
}

pub async fn sell_npc(app: &AppState, crop_type_id: u64, requested: i64) -> Result<u32, ActionError> {
    let quantity = sell_quantity(requested, app.inventory_quantity(crop_type_id))?;

    app.api.sell_npc(crop_type_id, quantity).await.map_err(|e| {
        tracing::warn!(crop_type_id, quantity, error = %e, "NPC sale failed");
        ActionError::from_api(&e, SELL_FAILED)
    })?;

    tracing::info!(crop_type_id, quantity, "sold to NPC");
    app.push_event("sell", &format!("sold {quantity} of crop {crop_type_id} to the market"));

    refresh(app, &[Slice::Inventory, Slice::Balance]).await;
    Ok(quantity)
}

pub async fn create_listing(
    app: &AppState,
    crop_type_id: Option<u64>,
    quantity: Option<i64>,
    unit_price: Option<i64>,
) -> Result<(), ActionError> {
    let available = crop_type_id.map(|id| app.inventory_quantity(id)).unwrap_or(0);
    let req = listing_request(crop_type_id, quantity, unit_price, available)?;

    app.api.create_listing(&req).await.map_err(|e| {
        tracing::warn!(crop_type_id = req.crop_type_id, error = %e, "create listing failed");
        ActionError::from_api(&e, LISTING_FAILED)
    })?;

    tracing::info!(crop_type_id = req.crop_type_id, quantity = req.quantity, unit_price = req.unit_price, "listing posted");
    app.push_event("listing", &format!(
        "listed {} of crop {} at {} each", req.quantity, req.crop_type_id, req.unit_price
    ));

    refresh(app, &[Slice::Inventory, Slice::Listings]).await;
    Ok(())
}

pub async fn buy_listing(app: &AppState, listing_id: u64) -> Result<(), ActionError> {
    app.api.buy_listing(listing_id).await.map_err(|e| {
        tracing::warn!(listing_id, error = %e, "buy listing failed");
        ActionError::from_api(&e, BUY_FAILED)
    })?;

    tracing::info!(listing_id, "listing bought");
    app.push_event("buy", &format!("bought listing {listing_id}"));

    refresh(app, &[Slice::Listings, Slice::Inventory, Slice::Balance]).await;
    Ok(())
}

/// At most one completion request per contract is in flight; repeats while one is
/// outstanding are ignored. Transport failures are dropped silently.
pub async fn complete_contract(app: &AppState, contract_id: u64) -> Result<CompletionOutcome, ActionError> {
    let Some(_busy) = app.busy.try_acquire(contract_id) else {
        tracing::debug!(contract_id, "completion already in flight");
        return Ok(CompletionOutcome::AlreadyInFlight);
    };

    match app.api.complete_contract(contract_id).await {
        Ok(()) => {}
        Err(e) if e.is_transport() => {
            tracing::debug!(contract_id, error = %e, "contract completion dropped");
            return Ok(CompletionOutcome::Dropped);
        }
        Err(e) => {
            tracing::warn!(contract_id, error = %e, "contract completion rejected");
            return Err(ActionError::from_api(&e, CONTRACT_FAILED));
        }
    }

    tracing::info!(contract_id, "contract completed");
    app.push_event("contract", &format!("contract {contract_id} completed"));

    refresh(app, &[Slice::Contracts, Slice::Inventory, Slice::Balance]).await;
    Ok(CompletionOutcome::Completed)
}

pub fn select_seed(app: &AppState, seed: Option<String>) {
    let mut session = app.session.lock().unwrap();
    session.select_seed(seed);
    tracing::debug!(seed = ?session.selected_seed(), "seed selected");
}

/// Stores an edited sell quantity, clamped against the current inventory.
pub fn set_sell_quantity(app: &AppState, crop_type_id: u64, requested: i64) -> u32 {
    let available = app.inventory_quantity(crop_type_id);
    app.session.lock().unwrap().set_sell_quantity(crop_type_id, requested, available)
}

// ── Reconciliation ──────────────────────────────────────────────────────────

/// Fetches the balance and overwrites the displayed value. Failures are silent.
pub async fn refresh_balance(app: &AppState) -> bool {
    match fetch_balance(app).await {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "balance refresh failed");
            false
        }
    }
}

async fn fetch_balance(app: &AppState) -> Result<(), ApiError> {
    let farm = app.api.farm_me().await?;
    let mut view = app.view.write().unwrap();
    view.set_balance(farm.balance);
    if !farm.name.is_empty() {
        view.farm_name = farm.name;
    }
    Ok(())
}

async fn refresh_slice(app: &AppState, slice: Slice) -> Result<(), ApiError> {
    match slice {
        Slice::Balance => fetch_balance(app).await?,
        Slice::Inventory => {
            let items = app.api.inventory().await?;
            app.view.write().unwrap().replace_inventory(items);
        }
        Slice::Listings => {
            let listings = app.api.listings().await?;
            app.view.write().unwrap().replace_listings(listings);
        }
        Slice::Contracts => {
            let contracts = app.api.contracts().await?;
            app.view.write().unwrap().replace_contracts(contracts);
        }
    }
    Ok(())
}

/// Refetches the given slices. If any of them fails, falls back to a full resync.
pub async fn refresh(app: &AppState, slices: &[Slice]) {
    for &slice in slices {
        if let Err(e) = refresh_slice(app, slice).await {
            tracing::warn!(slice = ?slice, error = %e, "partial refresh failed, resyncing");
            if let Err(e) = resync(app).await {
                tracing::warn!(error = %e, "resync failed");
            }
            return;
        }
    }
}

/// Re-fetches every collection and replaces the view-model.
pub async fn resync(app: &AppState) -> Result<(), ApiError> {
    let api = &app.api;
    let (farm, crop_types, plots, inventory, listings, contracts) = tokio::try_join!(
        api.farm_me(),
        api.crop_types(),
        api.plots(),
        api.inventory(),
        api.listings(),
        api.contracts(),
    )?;

    let now = Utc::now();
    {
        let mut view = app.view.write().unwrap();
        view.farm_name = farm.name;
        view.set_balance(farm.balance);
        view.crop_types = crop_types;
        view.replace_plots(plots, now);
        view.replace_inventory(inventory);
        view.replace_listings(listings);
        view.replace_contracts(contracts);
        view.synced_at = Some(now);
    }

    tracing::info!("view resynced");
    app.push_event("sync", "farm state reloaded");
    Ok(())
}
