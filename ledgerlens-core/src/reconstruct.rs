//! Position reconstruction: groups deal events into round-trip positions.
//!
//! Pure functions over in-memory collections:
//! - [`enrich_events`] annotates every event with its deal role and the
//!   summed PnL of its position
//! - [`build_positions`] folds trade deals into one [`Position`] per group
//!
//! Both group by `(account_id, position_id)` and order each group by
//! ascending close time with a stable sort, so same-instant multi-leg closes
//! keep their source order.

use crate::domain::{DealRole, EnrichedEvent, Position, RawEventRecord};
use crate::normalize::{format_number, num, parse_timestamp};
use std::collections::HashMap;

/// Enriched events plus the positions derived from them.
#[derive(Debug, Clone, Default)]
pub struct Reconstruction {
    pub events: Vec<EnrichedEvent>,
    pub positions: Vec<Position>,
}

/// Run both passes over a freshly loaded raw collection.
pub fn reconstruct(raw: Vec<RawEventRecord>) -> Reconstruction {
    let events = enrich_events(raw);
    let positions = build_positions(&events);
    Reconstruction { events, positions }
}

/// Assign deal roles and broadcast position PnL onto every grouped event.
///
/// All event types take part in grouping. Events with an empty
/// `position_id` get [`DealRole::NotApplicable`] and their own profit as
/// `position_pnl`. Output order matches input order.
pub fn enrich_events(raw: Vec<RawEventRecord>) -> Vec<EnrichedEvent> {
    let groups = group_by_position(&raw, |_| true);

    let mut roles = vec![DealRole::NotApplicable; raw.len()];
    let mut totals: Vec<Option<f64>> = vec![None; raw.len()];

    for members in &groups {
        let total: f64 = members.iter().map(|&i| num(&raw[i].profit)).sum();
        for (rank, &i) in members.iter().enumerate() {
            roles[i] = DealRole::for_rank(rank, members.len());
            totals[i] = Some(total);
        }
    }

    tracing::debug!(
        events = raw.len(),
        positions = groups.len(),
        "enriched deal events"
    );

    raw.into_iter()
        .zip(roles)
        .zip(totals)
        .map(|((event, deal_role), total)| {
            let position_pnl = format_number(total.unwrap_or_else(|| num(&event.profit)));
            EnrichedEvent {
                event,
                deal_role,
                position_pnl,
            }
        })
        .collect()
}

/// Fold trade deals into positions, one per `(account_id, position_id)`.
///
/// Only `event_type == "trade"` rows with a position id count. Positions are
/// emitted in order of first appearance.
pub fn build_positions<E: AsRef<RawEventRecord>>(events: &[E]) -> Vec<Position> {
    let groups = group_by_position(events, |e| e.as_ref().is_trade());

    groups
        .iter()
        .map(|members| {
            let first = events[members[0]].as_ref();
            let last = events[members[members.len() - 1]].as_ref();
            let total: f64 = members
                .iter()
                .map(|&i| num(&events[i].as_ref().profit))
                .sum();

            let trade_date_vn = if last.trade_date_vn.is_empty() {
                first.trade_date_vn.clone()
            } else {
                last.trade_date_vn.clone()
            };

            Position {
                trade_date_vn,
                account_id: first.account_id.clone(),
                position_id: first.position_id.clone(),
                symbol: first.symbol.clone(),
                entry_time: first.close_time_vn.clone(),
                exit_time: last.close_time_vn.clone(),
                entry_price: first.close_price.clone(),
                exit_price: last.close_price.clone(),
                lots: first.lots.clone(),
                deals_count: members.len().to_string(),
                position_pnl: format_number(total),
            }
        })
        .collect()
}

/// Indices of grouped events, groups in first-seen order, each group sorted
/// by ascending close time (stable; unparsable times first).
fn group_by_position<E, F>(events: &[E], include: F) -> Vec<Vec<usize>>
where
    E: AsRef<RawEventRecord>,
    F: Fn(&E) -> bool,
{
    let mut slots: HashMap<(&str, &str), usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for (i, item) in events.iter().enumerate() {
        if !include(item) {
            continue;
        }
        let event = item.as_ref();
        let position_id = event.position_id.trim();
        if position_id.is_empty() {
            continue;
        }
        let key = (event.account_id.as_str(), position_id);
        let slot = *slots.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(i);
    }

    for members in &mut groups {
        members.sort_by_cached_key(|&i| parse_timestamp(&events[i].as_ref().close_time_vn));
    }
    groups
}
