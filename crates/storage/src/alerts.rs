//! Alert storage.
//!
//! Key layout per country `c` and alert `id`:
//!
//! - `alert:{c}`: set of alert ids
//! - `alert:{c}:{id}:info`: language-independent fields
//! - `alert:{c}:{id}:areas`: set of EMMA area codes
//! - `alert:{c}:{id}:localised_{lang}`: texts per language
//! - `alert:{c}:{id}:notifications`: notification bookkeeping
//! - `alerts_area:{c}:{area}:alerts`: reverse index of alert ids per area

use std::collections::{BTreeMap, HashSet};

use tracing::debug;
use weather_common::{timestamp_key, AlertInfo, CountryId, LanguageId};

use crate::error::Result;
use crate::store::{CommandPipeline, KeyValueStore};

pub fn alert_set_key(country: CountryId) -> String {
    format!("alert:{}", country)
}

fn alert_key(country: CountryId, id: &str, suffix: &str) -> String {
    format!("alert:{}:{}:{}", country, id, suffix)
}

fn localised_suffix(language: LanguageId) -> String {
    format!("localised_{}", language.code())
}

pub fn area_alerts_key(country: CountryId, area: &str) -> String {
    format!("alerts_area:{}:{}:alerts", country, area)
}

/// Ids of the stored alerts.
pub async fn alert_ids<S: KeyValueStore + ?Sized>(store: &S, country: CountryId) -> Result<HashSet<String>> {
    store.members(&alert_set_key(country)).await
}

/// Write an alert with all its keys in one atomic pipeline.
pub async fn store_alert<S: KeyValueStore + ?Sized>(
    store: &S,
    country: CountryId,
    alert: &AlertInfo,
) -> Result<()> {
    let id = alert.id.as_str();
    let mut pipeline = CommandPipeline::atomic();

    pipeline.sadd(alert_set_key(country), id).hset(
        alert_key(country, id, "info"),
        [
            ("id", id.to_string()),
            ("type", alert.kind.to_string()),
            ("urgency", alert.urgency.to_string()),
            ("severity", alert.severity.to_string()),
            ("certainty", alert.certainty.to_string()),
            ("response_type", alert.response_type.to_string()),
            ("onset", timestamp_key(alert.onset)),
            ("expires", timestamp_key(alert.expires)),
        ],
    );

    for area in &alert.areas {
        pipeline.sadd(alert_key(country, id, "areas"), area.as_str());
    }

    for language in LanguageId::ALL {
        let key = alert_key(country, id, &localised_suffix(language));
        let text = alert.text(language).cloned().unwrap_or_default();
        pipeline.hset(key, text.fields());
    }

    pipeline.hset(
        alert_key(country, id, "notifications"),
        [("announce", "0"), ("onset", "0")],
    );

    store.execute(&pipeline).await?;
    debug!(country = %country, alert = %id, areas = alert.areas.len(), "Stored alert");
    Ok(())
}

/// Remove an alert and all its keys.
pub async fn delete_alert<S: KeyValueStore + ?Sized>(store: &S, country: CountryId, id: &str) -> Result<()> {
    let mut pipeline = CommandPipeline::atomic();
    pipeline
        .srem(alert_set_key(country), id)
        .del(alert_key(country, id, "info"))
        .del(alert_key(country, id, "areas"))
        .del(alert_key(country, id, "notifications"));
    for language in LanguageId::ALL {
        pipeline.del(alert_key(country, id, &localised_suffix(language)));
    }

    store.execute(&pipeline).await?;
    debug!(country = %country, alert = %id, "Deleted alert");
    Ok(())
}

/// Areas of one stored alert.
pub async fn alert_areas<S: KeyValueStore + ?Sized>(
    store: &S,
    country: CountryId,
    id: &str,
) -> Result<HashSet<String>> {
    store.members(&alert_key(country, id, "areas")).await
}

/// Areas of every stored alert, keyed by alert id.
pub async fn alert_area_map<S: KeyValueStore + ?Sized>(
    store: &S,
    country: CountryId,
) -> Result<BTreeMap<String, HashSet<String>>> {
    let mut map = BTreeMap::new();
    for id in alert_ids(store, country).await? {
        let areas = alert_areas(store, country, &id).await?;
        map.insert(id, areas);
    }
    Ok(map)
}

/// Replace the set of alert ids active in an area.
pub async fn store_alerts_for_area<S: KeyValueStore + ?Sized>(
    store: &S,
    country: CountryId,
    area: &str,
    alerts: &HashSet<String>,
) -> Result<()> {
    let key = area_alerts_key(country, area);
    let mut pipeline = CommandPipeline::atomic();
    pipeline.del(key.as_str());

    let mut ids: Vec<&String> = alerts.iter().collect();
    ids.sort();
    for id in ids {
        pipeline.sadd(key.as_str(), id.as_str());
    }

    store.execute(&pipeline).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::{TimeZone, Utc};
    use weather_common::{
        AlertCertainty, AlertResponseType, AlertSeverity, AlertText, AlertType, AlertUrgency,
    };

    fn alert() -> AlertInfo {
        let mut texts = BTreeMap::new();
        texts.insert(
            LanguageId::English,
            AlertText {
                event: "Moderate wind warning".to_string(),
                headline: "Wind".to_string(),
                ..Default::default()
            },
        );
        texts.insert(
            LanguageId::Slovenian,
            AlertText {
                event: "Zmerno opozorilo za veter".to_string(),
                ..Default::default()
            },
        );

        AlertInfo {
            id: "2.49.0.0.705.0.SI.1".to_string(),
            areas: ["SI001".to_string(), "SI002".to_string()].into_iter().collect(),
            kind: AlertType::Wind,
            urgency: AlertUrgency::Future,
            severity: AlertSeverity::Moderate,
            certainty: AlertCertainty::Likely,
            response_type: AlertResponseType::Monitor,
            onset: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            expires: Utc.with_ymd_and_hms(2024, 1, 1, 18, 0, 0).unwrap(),
            texts,
        }
    }

    #[tokio::test]
    async fn test_store_and_delete() {
        let store = MemoryStore::new();
        let alert = alert();
        store_alert(&store, CountryId::Slovenia, &alert).await.unwrap();

        let prefix = "alert:si:2.49.0.0.705.0.SI.1";
        let info = store.hash(&format!("{}:info", prefix)).unwrap();
        assert_eq!(info["type"], "wind");
        assert_eq!(info["severity"], "moderate");
        assert_eq!(info["onset"], "1704110400000");

        let german = store.hash(&format!("{}:localised_de", prefix)).unwrap();
        assert_eq!(german["event"], "Moderate wind warning");
        let slovenian = store.hash(&format!("{}:localised_sl", prefix)).unwrap();
        assert_eq!(slovenian["event"], "Zmerno opozorilo za veter");
        assert_eq!(slovenian["web"], "");

        let notifications = store.hash(&format!("{}:notifications", prefix)).unwrap();
        assert_eq!(notifications["announce"], "0");

        let map = alert_area_map(&store, CountryId::Slovenia).await.unwrap();
        assert_eq!(map[&alert.id].len(), 2);

        delete_alert(&store, CountryId::Slovenia, &alert.id).await.unwrap();
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn test_area_index_is_replaced() {
        let store = MemoryStore::new();
        let first: HashSet<String> = ["a".to_string(), "b".to_string()].into_iter().collect();
        let second: HashSet<String> = ["c".to_string()].into_iter().collect();

        store_alerts_for_area(&store, CountryId::Germany, "DE001", &first).await.unwrap();
        store_alerts_for_area(&store, CountryId::Germany, "DE001", &second).await.unwrap();

        let ids: Vec<String> = store.set("alerts_area:de:DE001:alerts").into_iter().collect();
        assert_eq!(ids, vec!["c"]);

        store_alerts_for_area(&store, CountryId::Germany, "DE001", &HashSet::new()).await.unwrap();
        assert!(!store.contains_key("alerts_area:de:DE001:alerts"));
    }
}
