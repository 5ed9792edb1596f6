use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Crop catalogue entry as serialised by the game API.
/// Nested copies inside plots may carry only the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropTypeDto {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub grow_time_seconds: u64,
    #[serde(default)]
    pub base_price: u32,
    #[serde(default)]
    pub seed_price: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmDto {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    pub balance: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotDto {
    pub id: u64,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub crop_type: Option<CropTypeDto>,
    #[serde(default)]
    pub harvest_ready_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItemDto {
    #[serde(default)]
    pub id: u64,
    pub crop_type: CropTypeDto,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractDto {
    pub id: u64,
    pub crop_type: CropTypeDto,
    pub quantity_required: u32,
    pub reward_coins: i64,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub unlocks_crop: Option<CropTypeDto>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketListingDto {
    pub id: u64,
    #[serde(default)]
    pub seller_name: String,
    pub crop_type: CropTypeDto,
    pub quantity: u32,
    pub unit_price: u32,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarvestResponse {
    #[serde(default)]
    pub inventory_item: Option<InventoryItemDto>,
}

/// Error body shape returned by the API on non-success statuses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
}

// ── Request bodies ──────────────────────────────────────────────────────────

/// The seed id travels as the string the player picked.
#[derive(Debug, Clone, Serialize)]
pub struct PlantRequest {
    pub crop_type_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SellNpcRequest {
    pub crop_type_id: u64,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateListingRequest {
    pub crop_type_id: u64,
    pub quantity: u32,
    pub unit_price: u32,
}
