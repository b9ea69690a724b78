//! Row-wise forecast/observation records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::element::{Condition, Element};

/// One station's values at one instant.
///
/// `values` holds an entry for every element of the producing document's
/// element dictionary; `None` marks a missing or rejected value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub station_id: String,
    /// Producing document, e.g. `MOSMIX_S:2024-01-01T09:00:00.000Z`
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub values: BTreeMap<Element, Option<f64>>,
    /// Derived from [`Element::PresentWeather`] during sanitization
    pub condition: Option<Condition>,
}

impl ForecastPoint {
    pub fn new(station_id: impl Into<String>, source: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            station_id: station_id.into(),
            source: source.into(),
            timestamp,
            values: BTreeMap::new(),
            condition: None,
        }
    }

    /// Value of an element, `None` when missing or not tracked.
    pub fn get(&self, element: Element) -> Option<f64> {
        self.values.get(&element).copied().flatten()
    }

    pub fn set(&mut self, element: Element, value: Option<f64>) {
        self.values.insert(element, value);
    }

    pub fn has_element(&self, element: Element) -> bool {
        self.values.contains_key(&element)
    }
}
