use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::api::FarmApi;
use crate::busy::BusyContracts;
use crate::config::Config;
use crate::model::ViewModel;
use crate::session::ViewSession;

#[derive(Debug, Clone, Serialize)]
pub struct EventEntry {
    pub ts: String,
    pub kind: String,
    pub detail: String,
}

pub struct AppState {
    pub config: RwLock<Config>,
    pub api: FarmApi,
    pub view: RwLock<ViewModel>,
    pub session: Mutex<ViewSession>,
    pub busy: BusyContracts,
    pub events: Mutex<VecDeque<EventEntry>>,
    pub shutdown: CancellationToken,
}

const MAX_EVENTS: usize = 200;

impl AppState {
    pub fn new(config: Config, api: FarmApi, session: ViewSession) -> Arc<Self> {
        Arc::new(Self {
            config: RwLock::new(config),
            api,
            view: RwLock::new(ViewModel::default()),
            session: Mutex::new(session),
            busy: BusyContracts::default(),
            events: Mutex::new(VecDeque::with_capacity(MAX_EVENTS)),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn push_event(&self, kind: &str, detail: &str) {
        let entry = EventEntry {
            ts: chrono::Utc::now().format("%H:%M:%S").to_string(),
            kind: kind.to_string(),
            detail: detail.to_string(),
        };
        let mut events = self.events.lock().unwrap();
        if events.len() >= MAX_EVENTS {
            events.pop_front();
        }
        events.push_back(entry);
    }

    pub fn selected_seed(&self) -> Option<String> {
        self.session.lock().unwrap().selected_seed().map(str::to_string)
    }

    pub fn inventory_quantity(&self, crop_id: u64) -> u32 {
        self.view.read().unwrap().inventory_quantity(crop_id)
    }
}
