//! Weather alerts as published in CAP documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::country::LanguageId;
use crate::error::WeatherError;

/// Defines a closed enumeration with a fixed wire string per variant.
/// Parsing is case-insensitive; unknown strings are an error.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = WeatherError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($wire => Ok($name::$variant),)+
                    _ => Err(WeatherError::unknown($kind, s)),
                }
            }
        }
    };
}

wire_enum!(
    /// MeteoAlarm awareness type.
    AlertType, "alert type" {
        Generic => "alert",
        Wind => "wind",
        SnowIce => "snow-ice",
        Thunderstorm => "thunderstorm",
        Fog => "fog",
        HighTemperature => "high-temperature",
        LowTemperature => "low-temperature",
        CoastalEvent => "coastalevent",
        ForestFire => "forest-fire",
        Avalanches => "avalanches",
        Rain => "rain",
        Flooding => "flooding",
        RainFlood => "rain-flood",
    }
);

wire_enum!(
    /// Recommended response (CAP `responseType`).
    AlertResponseType, "response type" {
        Shelter => "shelter",
        Evacuate => "evacuate",
        Prepare => "prepare",
        Execute => "execute",
        Avoid => "avoid",
        Monitor => "monitor",
        AllClear => "allclear",
        NoResponse => "none",
    }
);

wire_enum!(
    AlertUrgency, "urgency" {
        Immediate => "immediate",
        Expected => "expected",
        Future => "future",
        Past => "past",
    }
);

wire_enum!(
    /// Minor, moderate, severe and extreme map to yellow, orange, red and violet.
    AlertSeverity, "severity" {
        Minor => "minor",
        Moderate => "moderate",
        Severe => "severe",
        Extreme => "extreme",
    }
);

wire_enum!(
    AlertCertainty, "certainty" {
        Observed => "observed",
        Likely => "likely",
        Possible => "possible",
        Unlikely => "unlikely",
    }
);

/// Localized alert texts for one language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertText {
    pub event: String,
    pub headline: String,
    pub description: String,
    pub instructions: String,
    pub sender_name: String,
    pub web: String,
}

impl AlertText {
    /// Field name and value pairs in storage order.
    pub fn fields(&self) -> [(&'static str, &str); 6] {
        [
            ("event", self.event.as_str()),
            ("headline", self.headline.as_str()),
            ("description", self.description.as_str()),
            ("instructions", self.instructions.as_str()),
            ("sender_name", self.sender_name.as_str()),
            ("web", self.web.as_str()),
        ]
    }
}

/// A parsed alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertInfo {
    pub id: String,
    /// EMMA area codes the alert applies to
    pub areas: BTreeSet<String>,
    pub kind: AlertType,
    pub urgency: AlertUrgency,
    pub severity: AlertSeverity,
    pub certainty: AlertCertainty,
    pub response_type: AlertResponseType,
    pub onset: DateTime<Utc>,
    pub expires: DateTime<Utc>,
    pub texts: BTreeMap<LanguageId, AlertText>,
}

impl AlertInfo {
    /// Texts in `language`, falling back to English.
    pub fn text(&self, language: LanguageId) -> Option<&AlertText> {
        self.texts
            .get(&language)
            .or_else(|| self.texts.get(&LanguageId::English))
    }
}
