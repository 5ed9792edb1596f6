use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::config::Config;
use crate::types::{
    ContractDto, CreateListingRequest, CropTypeDto, ErrorBody, FarmDto, HarvestResponse,
    InventoryItemDto, MarketListingDto, PlantRequest, PlotDto, SellNpcRequest,
};

pub const CSRF_COOKIE: &str = "csrftoken";
pub const SESSION_COOKIE: &str = "sessionid";
const CSRF_HEADER: &str = "X-CSRFToken";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP {status}")]
    Http { status: StatusCode, detail: Option<String> },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Server-supplied `detail` for HTTP rejections, otherwise `fallback`.
    pub fn message(&self, fallback: &str) -> String {
        match self {
            ApiError::Http { detail: Some(d), .. } => d.clone(),
            _ => fallback.to_string(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}

/// Pulls `detail` out of a JSON error body. Absent, unparsable or blank bodies yield `None`.
pub fn detail_from_body(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
        .filter(|d| !d.trim().is_empty())
}

/// Looks up one cookie in a `Cookie` header value (`a=1; b=2`).
/// A name that appears more than once is treated as absent.
pub fn cookie_value(header: &str, name: &str) -> Option<String> {
    let mut matches = header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string());
    let first = matches.next()?;
    if matches.next().is_some() {
        return None;
    }
    Some(first)
}

/// Authenticated client for the farm game API.
/// Session and CSRF cookies live in a shared jar; the CSRF header is re-read from it per request.
#[derive(Debug, Clone)]
pub struct FarmApi {
    http_client: reqwest::Client,
    jar: Arc<Jar>,
    base: Url,
}

impl FarmApi {
    pub fn new(config: &Config) -> Result<Self> {
        let base = Url::parse(&config.api_base)
            .with_context(|| format!("invalid FARM_API_BASE: {}", config.api_base))?;

        let jar = Arc::new(Jar::default());
        if !config.session_id.is_empty() {
            jar.add_cookie_str(&format!("{SESSION_COOKIE}={}; Path=/", config.session_id), &base);
        }
        if !config.csrf_token.is_empty() {
            jar.add_cookie_str(&format!("{CSRF_COOKIE}={}; Path=/", config.csrf_token), &base);
        }

        let http_client = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { http_client, jar, base })
    }

    /// Current anti-forgery token from the cookie jar, empty when the cookie is missing.
    pub fn csrf_token(&self) -> String {
        self.jar
            .cookies(&self.base)
            .and_then(|h| h.to_str().ok().and_then(|s| cookie_value(s, CSRF_COOKIE)))
            .unwrap_or_default()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base.as_str().trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let resp = self.http_client.get(self.url(path)).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            tracing::debug!(path, status = %status, "GET failed");
            return Err(ApiError::Http { status, detail: detail_from_body(&body) });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// POSTs with the CSRF header and returns the raw success body.
    async fn post<B: Serialize>(&self, path: &str, body: Option<&B>) -> Result<String, ApiError> {
        let mut req = self
            .http_client
            .post(self.url(path))
            .header(CSRF_HEADER, self.csrf_token());
        if let Some(b) = body {
            req = req.json(b);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            tracing::warn!(path, status = %status, body = text, "action HTTP error");
            return Err(ApiError::Http { status, detail: detail_from_body(&text) });
        }

        tracing::debug!(path, status = %status, "action accepted");
        Ok(text)
    }

    // ── Actions ─────────────────────────────────────────────────────────────

    /// `None` when the server accepted the plant but the body is not a plot.
    pub async fn plant(&self, plot_id: u64, crop_type_id: &str) -> Result<Option<PlotDto>, ApiError> {
        let body = PlantRequest { crop_type_id: crop_type_id.to_string() };
        let text = self.post(&format!("/api/plots/{plot_id}/plant/"), Some(&body)).await?;
        match serde_json::from_str(&text) {
            Ok(plot) => Ok(Some(plot)),
            Err(e) => {
                tracing::debug!(plot_id, error = %e, "plant response is not a plot");
                Ok(None)
            }
        }
    }

    /// An empty or non-JSON success body is treated as "nothing harvested into inventory".
    pub async fn harvest(&self, plot_id: u64) -> Result<HarvestResponse, ApiError> {
        let text = self.post::<()>(&format!("/api/plots/{plot_id}/harvest/"), None).await?;
        Ok(serde_json::from_str(&text).unwrap_or_default())
    }

    pub async fn sell_npc(&self, crop_type_id: u64, quantity: u32) -> Result<(), ApiError> {
        let body = SellNpcRequest { crop_type_id, quantity };
        self.post("/api/inventory/sell-npc/", Some(&body)).await?;
        Ok(())
    }

    pub async fn create_listing(&self, req: &CreateListingRequest) -> Result<(), ApiError> {
        self.post("/api/market/listings/", Some(req)).await?;
        Ok(())
    }

    pub async fn buy_listing(&self, listing_id: u64) -> Result<(), ApiError> {
        let empty = serde_json::json!({});
        self.post(&format!("/api/market/listings/{listing_id}/buy/"), Some(&empty)).await?;
        Ok(())
    }

    pub async fn complete_contract(&self, contract_id: u64) -> Result<(), ApiError> {
        self.post::<()>(&format!("/api/contracts/{contract_id}/complete/"), None).await?;
        Ok(())
    }

    // ── Reads ───────────────────────────────────────────────────────────────

    pub async fn farm_me(&self) -> Result<FarmDto, ApiError> {
        self.get_json("/api/farm/me/").await
    }

    pub async fn crop_types(&self) -> Result<Vec<CropTypeDto>, ApiError> {
        self.get_json("/api/crop-types/").await
    }

    pub async fn plots(&self) -> Result<Vec<PlotDto>, ApiError> {
        self.get_json("/api/plots/").await
    }

    pub async fn inventory(&self) -> Result<Vec<InventoryItemDto>, ApiError> {
        self.get_json("/api/inventory/").await
    }

    pub async fn listings(&self) -> Result<Vec<MarketListingDto>, ApiError> {
        self.get_json("/api/market/listings/").await
    }

    pub async fn contracts(&self) -> Result<Vec<ContractDto>, ApiError> {
        self.get_json("/api/contracts/").await
    }
}
