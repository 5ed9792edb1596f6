//! Pure projection of the view-model into what the dashboard draws.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::busy::BusyContracts;
use crate::countdown::{self, EXPIRED_LABEL, READY_LABEL};
use crate::model::{ContractState, Plot, PlotState, ViewModel};
use crate::session::ViewSession;

#[derive(Debug, Clone, Serialize)]
pub struct SeedOption {
    pub id: String,
    pub name: String,
    pub seed_price: u32,
    pub grow_time_seconds: u64,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlotView {
    pub id: u64,
    pub x: i32,
    pub y: i32,
    pub state: PlotState,
    pub crop_name: Option<String>,
    pub timer_label: Option<String>,
    pub show_plant: bool,
    pub show_harvest: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryView {
    pub crop_id: u64,
    pub name: String,
    pub quantity: u32,
    pub base_price: u32,
    pub sell_quantity: u32,
    pub sell_value: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingView {
    pub id: u64,
    pub seller_name: String,
    pub crop_name: String,
    pub quantity: u32,
    pub unit_price: u32,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContractView {
    pub id: u64,
    pub crop_name: String,
    pub quantity_required: u32,
    pub reward_coins: i64,
    pub unlocks_crop: Option<String>,
    pub state: ContractState,
    pub busy: bool,
    pub timer_label: String,
    pub can_complete: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    pub farm_name: String,
    pub balance_text: String,
    pub seeds: Vec<SeedOption>,
    pub plots: Vec<PlotView>,
    pub inventory: Vec<InventoryView>,
    pub listings: Vec<ListingView>,
    pub contracts: Vec<ContractView>,
    pub board_label: Option<String>,
    pub synced_at: Option<DateTime<Utc>>,
}

pub fn balance_text(balance: Option<i64>) -> String {
    match balance {
        Some(b) => format!("{b} coins"),
        None => String::new(),
    }
}

pub fn plot_view(plot: &Plot, now: DateTime<Utc>) -> PlotView {
    let timer_label = match plot.state {
        PlotState::Empty => None,
        PlotState::Ready => Some(READY_LABEL.to_string()),
        PlotState::Growing => plot.ready_at.map(|t| countdown::label(t, now, READY_LABEL)),
    };
    PlotView {
        id: plot.id,
        x: plot.x,
        y: plot.y,
        state: plot.state,
        crop_name: plot.crop_name.clone(),
        timer_label,
        show_plant: plot.state == PlotState::Empty,
        show_harvest: plot.state == PlotState::Ready,
    }
}

pub fn render_page(
    view: &ViewModel,
    session: &ViewSession,
    busy: &BusyContracts,
    now: DateTime<Utc>,
) -> PageView {
    let selected = session.selected_seed();

    let seeds = view
        .crop_types
        .iter()
        .map(|c| {
            let id = c.id.to_string();
            SeedOption {
                selected: selected == Some(id.as_str()),
                id,
                name: c.name.clone(),
                seed_price: c.seed_price,
                grow_time_seconds: c.grow_time_seconds,
            }
        })
        .collect();

    let inventory = view
        .inventory
        .values()
        .map(|line| {
            let sell_quantity = session.sell_quantity(line.crop_id, line.quantity);
            InventoryView {
                crop_id: line.crop_id,
                name: line.name.clone(),
                quantity: line.quantity,
                base_price: line.base_price,
                sell_quantity,
                sell_value: u64::from(sell_quantity) * u64::from(line.base_price),
            }
        })
        .collect();

    let listings = view
        .listings
        .values()
        .map(|l| ListingView {
            id: l.id,
            seller_name: l.seller_name.clone(),
            crop_name: l.crop_name.clone(),
            quantity: l.quantity,
            unit_price: l.unit_price,
            total: u64::from(l.quantity) * u64::from(l.unit_price),
        })
        .collect();

    let contracts = view
        .contracts
        .values()
        .map(|c| {
            let is_busy = busy.is_busy(c.id);
            let timer_label = match c.state {
                ContractState::Active => countdown::label(c.expires_at, now, EXPIRED_LABEL),
                ContractState::Expired => EXPIRED_LABEL.to_string(),
                ContractState::Completed => "Completed".to_string(),
            };
            ContractView {
                id: c.id,
                crop_name: c.crop_name.clone(),
                quantity_required: c.quantity_required,
                reward_coins: c.reward_coins,
                unlocks_crop: c.unlocks_crop.clone(),
                state: c.state,
                busy: is_busy,
                timer_label,
                can_complete: c.state == ContractState::Active && !is_busy,
            }
        })
        .collect();

    PageView {
        farm_name: view.farm_name.clone(),
        balance_text: balance_text(view.balance),
        seeds,
        plots: view.plots.values().map(|p| plot_view(p, now)).collect(),
        inventory,
        listings,
        contracts,
        board_label: view.board.expires_at.map(|t| countdown::label(t, now, EXPIRED_LABEL)),
        synced_at: view.synced_at,
    }
}
