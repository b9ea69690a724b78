use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use storage::alerts::{
    alert_area_map, alert_areas, alert_ids, delete_alert, store_alert, store_alerts_for_area,
};
use storage::KeyValueStore;
use tracing::{debug, info, instrument, warn};
use weather_common::CountryId;

use super::areas::AreaCatalogue;
use super::cap::parse_cap;
use super::feed::{classify, feed_url, parse_feed, FeedEntry};
use crate::download::Fetch;
use crate::error::Result;

/// Outcome of an alert update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertSummary {
    pub added: usize,
    pub removed: usize,
    /// New feed entries that could not be fetched, read or placed
    pub skipped: usize,
    /// Alerts stored after the update
    pub total: usize,
    pub areas_with_alerts: usize,
}

/// Bring the stored alerts of `country` in line with the MeteoAlarm feed.
///
/// New alerts are fetched and stored, alerts gone from the feed are
/// deleted, and the per-area index is rebuilt. A feed that cannot be
/// fetched fails the update; a single bad alert is only skipped.
#[instrument(skip_all, fields(country = %country))]
pub async fn update_alerts<S, F>(
    store: &S,
    fetch: &F,
    country: CountryId,
    areas: &AreaCatalogue,
    now: DateTime<Utc>,
) -> Result<AlertSummary>
where
    S: KeyValueStore + ?Sized,
    F: Fetch + ?Sized,
{
    let feed = fetch.get_text(&feed_url(country)).await?;
    let entries = parse_feed(&feed)?;
    let stored = alert_ids(store, country).await?;
    let plan = classify(&entries, &stored, now);
    info!(
        listed = entries.len(),
        stored = stored.len(),
        new = plan.new.len(),
        obsolete = plan.obsolete.len(),
        "Compared feed with stored alerts"
    );

    let mut summary = AlertSummary::default();

    for entry in &plan.new {
        if add_alert(store, fetch, country, areas, entry).await? {
            summary.added += 1;
        } else {
            summary.skipped += 1;
        }
    }

    let mut touched: BTreeSet<String> = BTreeSet::new();
    for id in &plan.obsolete {
        touched.extend(alert_areas(store, country, id).await?);
        delete_alert(store, country, id).await?;
        summary.removed += 1;
    }

    let current = alert_area_map(store, country).await?;
    touched.extend(areas.codes().map(str::to_string));
    touched.extend(current.values().flatten().cloned());

    let mut by_area: HashMap<&str, HashSet<String>> = HashMap::new();
    for (id, codes) in &current {
        for area in codes {
            by_area.entry(area.as_str()).or_default().insert(id.clone());
        }
    }

    let empty = HashSet::new();
    for area in &touched {
        let ids = by_area.get(area.as_str()).unwrap_or(&empty);
        store_alerts_for_area(store, country, area, ids).await?;
    }

    summary.total = current.len();
    summary.areas_with_alerts = by_area.len();
    info!(
        added = summary.added,
        removed = summary.removed,
        skipped = summary.skipped,
        total = summary.total,
        areas = summary.areas_with_alerts,
        "Alerts updated"
    );
    Ok(summary)
}

/// Fetch, parse and store one alert. `Ok(false)` when it was skipped.
async fn add_alert<S, F>(
    store: &S,
    fetch: &F,
    country: CountryId,
    areas: &AreaCatalogue,
    entry: &FeedEntry,
) -> Result<bool>
where
    S: KeyValueStore + ?Sized,
    F: Fetch + ?Sized,
{
    let alert = match fetch.get_text(&entry.cap_url).await {
        Ok(xml) => parse_cap(&entry.id, &xml, areas),
        Err(e) => Err(e),
    };

    let alert = match alert {
        Ok(alert) => alert,
        Err(e) => {
            warn!(alert = %entry.id, url = %entry.cap_url, error = %e, "Skipping alert");
            return Ok(false);
        }
    };

    if alert.areas.is_empty() {
        warn!(alert = %entry.id, "Skipping alert without known areas");
        return Ok(false);
    }

    store_alert(store, country, &alert).await?;
    debug!(alert = %alert.id, kind = %alert.kind, severity = %alert.severity, "Added alert");
    Ok(true)
}
