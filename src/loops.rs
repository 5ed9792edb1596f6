use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::actions;
use crate::countdown::{self, ContractTick};
use crate::state::AppState;

/// Per-second countdown over plots and the contract board. Re-reads the view-model on
/// every tick, so plots added or removed between ticks are picked up.
pub async fn run_countdown(app: Arc<AppState>) {
    let period = Duration::from_millis(app.config.read().unwrap().countdown_tick_ms.max(1));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    tracing::debug!(period_ms = period.as_millis() as u64, "countdown loop started");
    loop {
        tokio::select! {
            _ = interval.tick() => {
                on_tick(&app, Utc::now());
            }
            _ = app.shutdown.cancelled() => {
                tracing::debug!("countdown loop stopped");
                break;
            }
        }
    }
}

/// One countdown step at `now`. Schedules the deferred reload when the board expires.
pub fn on_tick(app: &Arc<AppState>, now: DateTime<Utc>) -> ContractTick {
    let (newly_ready, contracts) = {
        let mut view = app.view.write().unwrap();
        let ready = countdown::tick_plots(&mut view, now);
        (ready, countdown::tick_contracts(&mut view, now))
    };

    for plot_id in newly_ready {
        tracing::info!(plot_id, "plot ready to harvest");
        app.push_event("ready", &format!("plot {plot_id} is ready to harvest"));
    }

    if contracts.schedule_reload {
        tracing::info!(expired = contracts.newly_expired.len(), "contract board expired");
        app.push_event("contract", "contract board expired, reloading");
        schedule_reload(app.clone());
    }

    contracts
}

fn schedule_reload(app: Arc<AppState>) {
    let delay = Duration::from_millis(app.config.read().unwrap().contract_reload_delay_ms);
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = app.shutdown.cancelled() => return,
        }
        if let Err(e) = actions::resync(&app).await {
            tracing::warn!(error = %e, "reload after contract expiry failed");
        }
    });
}

/// Fixed-interval balance poll. Errors are swallowed; the next tick is the retry.
/// The period is re-read every round so a settings change applies without a restart.
pub async fn run_balance_poller(app: Arc<AppState>) {
    loop {
        let period = Duration::from_secs(app.config.read().unwrap().balance_poll_secs.max(1));
        tokio::select! {
            _ = tokio::time::sleep(period) => {
                actions::refresh_balance(&app).await;
            }
            _ = app.shutdown.cancelled() => {
                tracing::debug!("balance poller stopped");
                break;
            }
        }
    }
}
