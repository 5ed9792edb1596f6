use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{ContractDto, CropTypeDto, InventoryItemDto, MarketListingDto, PlotDto};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotState {
    Empty,
    Growing,
    Ready,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plot {
    pub id: u64,
    pub x: i32,
    pub y: i32,
    pub crop_name: Option<String>,
    pub ready_at: Option<DateTime<Utc>>,
    pub state: PlotState,
}

impl Plot {
    pub fn from_dto(dto: PlotDto, now: DateTime<Utc>) -> Self {
        let crop_name = dto.crop_type.map(|c| c.name);
        let state = match (&crop_name, dto.harvest_ready_at) {
            (None, _) => PlotState::Empty,
            (Some(_), Some(ready_at)) if ready_at <= now => PlotState::Ready,
            (Some(_), _) => PlotState::Growing,
        };
        Self {
            id: dto.id,
            x: dto.x,
            y: dto.y,
            crop_name,
            ready_at: dto.harvest_ready_at,
            state,
        }
    }

    pub fn clear(&mut self) {
        self.crop_name = None;
        self.ready_at = None;
        self.state = PlotState::Empty;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InventoryLine {
    pub crop_id: u64,
    pub name: String,
    pub quantity: u32,
    pub base_price: u32,
}

impl From<InventoryItemDto> for InventoryLine {
    fn from(dto: InventoryItemDto) -> Self {
        Self {
            crop_id: dto.crop_type.id,
            name: dto.crop_type.name,
            quantity: dto.quantity,
            base_price: dto.crop_type.base_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub id: u64,
    pub seller_name: String,
    pub crop_name: String,
    pub quantity: u32,
    pub unit_price: u32,
}

impl From<MarketListingDto> for Listing {
    fn from(dto: MarketListingDto) -> Self {
        Self {
            id: dto.id,
            seller_name: dto.seller_name,
            crop_name: dto.crop_type.name,
            quantity: dto.quantity,
            unit_price: dto.unit_price,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractState {
    Active,
    Completed,
    Expired,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Contract {
    pub id: u64,
    pub crop_name: String,
    pub quantity_required: u32,
    pub reward_coins: i64,
    pub unlocks_crop: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub state: ContractState,
}

impl From<ContractDto> for Contract {
    fn from(dto: ContractDto) -> Self {
        let state = if dto.is_completed {
            ContractState::Completed
        } else if dto.is_active {
            ContractState::Active
        } else {
            ContractState::Expired
        };
        Self {
            id: dto.id,
            crop_name: dto.crop_type.name,
            quantity_required: dto.quantity_required,
            reward_coins: dto.reward_coins,
            unlocks_crop: dto.unlocks_crop.map(|c| c.name),
            expires_at: dto.expires_at,
            state,
        }
    }
}

/// Shared expiry of the contract board plus the one-shot reload latch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractBoard {
    pub expires_at: Option<DateTime<Utc>>,
    pub reload_latched: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ViewModel {
    pub farm_name: String,
    pub balance: Option<i64>,
    pub crop_types: Vec<CropTypeDto>,
    pub plots: BTreeMap<u64, Plot>,
    pub inventory: BTreeMap<u64, InventoryLine>,
    pub listings: BTreeMap<u64, Listing>,
    pub contracts: BTreeMap<u64, Contract>,
    pub board: ContractBoard,
    pub synced_at: Option<DateTime<Utc>>,
}

impl ViewModel {
    pub fn set_balance(&mut self, balance: i64) {
        self.balance = Some(balance);
    }

    pub fn inventory_quantity(&self, crop_id: u64) -> u32 {
        self.inventory.get(&crop_id).map(|l| l.quantity).unwrap_or(0)
    }

    pub fn replace_plots(&mut self, plots: Vec<PlotDto>, now: DateTime<Utc>) {
        self.plots = plots
            .into_iter()
            .map(|p| (p.id, Plot::from_dto(p, now)))
            .collect();
    }

    pub fn replace_inventory(&mut self, items: Vec<InventoryItemDto>) {
        self.inventory = items
            .into_iter()
            .filter(|i| i.quantity > 0)
            .map(|i| (i.crop_type.id, InventoryLine::from(i)))
            .collect();
    }

    pub fn replace_listings(&mut self, listings: Vec<MarketListingDto>) {
        self.listings = listings
            .into_iter()
            .filter(|l| l.active)
            .map(|l| (l.id, Listing::from(l)))
            .collect();
    }

    /// Replaces the contract list and recomputes the board expiry (earliest active contract).
    /// The reload latch survives only if the board expiry did not move, so a resync that
    /// returns the same already-past board cannot trigger another reload.
    pub fn replace_contracts(&mut self, contracts: Vec<ContractDto>) {
        self.contracts = contracts
            .into_iter()
            .map(|c| (c.id, Contract::from(c)))
            .collect();

        let expires_at = self
            .contracts
            .values()
            .filter(|c| c.state == ContractState::Active)
            .map(|c| c.expires_at)
            .min();

        let reload_latched = self.board.reload_latched && self.board.expires_at == expires_at;
        self.board = ContractBoard { expires_at, reload_latched };
    }

    /// Applies a successful plant response. Coordinates of a known plot are kept when the
    /// response omits them.
    pub fn apply_planted(&mut self, dto: PlotDto, now: DateTime<Utc>) {
        let mut plot = Plot::from_dto(dto, now);
        if plot.state == PlotState::Empty {
            plot.state = PlotState::Growing;
        }
        if let Some(existing) = self.plots.get(&plot.id) {
            if plot.x == 0 && plot.y == 0 {
                plot.x = existing.x;
                plot.y = existing.y;
            }
        }
        self.plots.insert(plot.id, plot);
    }

    /// Applies a successful harvest: the plot empties and the returned stack, if any,
    /// replaces the matching inventory line. An empty stack removes the line.
    pub fn apply_harvested(&mut self, plot_id: u64, item: Option<InventoryItemDto>) {
        if let Some(plot) = self.plots.get_mut(&plot_id) {
            plot.clear();
        }
        match item {
            Some(item) if item.quantity > 0 => {
                let line = InventoryLine::from(item);
                self.inventory.insert(line.crop_id, line);
            }
            Some(item) => {
                self.inventory.remove(&item.crop_type.id);
            }
            None => {}
        }
    }
}
