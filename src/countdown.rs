use chrono::{DateTime, Utc};

use crate::model::{ContractState, PlotState, ViewModel};

pub const READY_LABEL: &str = "Ready";
pub const EXPIRED_LABEL: &str = "Expired";

/// Whole seconds until `target`, floored.
pub fn remaining_secs(target: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (target - now).num_milliseconds().div_euclid(1000)
}

/// `m:ss` for a positive number of seconds. Minutes are not wrapped into hours.
pub fn format_remaining(secs: i64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Countdown text for `target`: `done_label` once reached, `m:ss` before that.
pub fn label(target: DateTime<Utc>, now: DateTime<Utc>, done_label: &str) -> String {
    let secs = remaining_secs(target, now);
    if secs <= 0 {
        done_label.to_string()
    } else {
        format_remaining(secs)
    }
}

/// Flips every growing plot whose timer has run out to `Ready`. Returns the ids flipped on
/// this tick; a plot already flipped is never reported again. Growing plots without a
/// timestamp are skipped.
pub fn tick_plots(view: &mut ViewModel, now: DateTime<Utc>) -> Vec<u64> {
    let mut newly_ready = Vec::new();
    for plot in view.plots.values_mut() {
        if plot.state != PlotState::Growing {
            continue;
        }
        let Some(ready_at) = plot.ready_at else {
            continue;
        };
        if remaining_secs(ready_at, now) <= 0 {
            plot.state = PlotState::Ready;
            newly_ready.push(plot.id);
        }
    }
    newly_ready
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ContractTick {
    pub newly_expired: Vec<u64>,
    pub schedule_reload: bool,
}

/// On the first tick at or past the board expiry, marks every active contract expired and
/// asks for exactly one reload. Later ticks past the same expiry change nothing.
pub fn tick_contracts(view: &mut ViewModel, now: DateTime<Utc>) -> ContractTick {
    let Some(expires_at) = view.board.expires_at else {
        return ContractTick::default();
    };
    if view.board.reload_latched || remaining_secs(expires_at, now) > 0 {
        return ContractTick::default();
    }

    view.board.reload_latched = true;
    let newly_expired = view
        .contracts
        .values_mut()
        .filter(|c| c.state == ContractState::Active)
        .map(|c| {
            c.state = ContractState::Expired;
            c.id
        })
        .collect();

    ContractTick { newly_expired, schedule_reload: true }
}
