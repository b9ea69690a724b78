//! Supported countries and alert languages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::WeatherError;

/// Countries with a configured data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CountryId {
    #[serde(rename = "si")]
    Slovenia,
    #[serde(rename = "de")]
    Germany,
}

impl CountryId {
    /// Two-letter code used in store keys.
    pub fn code(&self) -> &'static str {
        match self {
            CountryId::Slovenia => "si",
            CountryId::Germany => "de",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CountryId::Slovenia => "Slovenia",
            CountryId::Germany => "Germany",
        }
    }

    /// Lowercase name as used by the MeteoAlarm feed URLs.
    pub fn full_name(&self) -> &'static str {
        match self {
            CountryId::Slovenia => "slovenia",
            CountryId::Germany => "germany",
        }
    }
}

impl fmt::Display for CountryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CountryId {
    type Err = WeatherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "si" | "slovenia" => Ok(CountryId::Slovenia),
            "de" | "germany" => Ok(CountryId::Germany),
            _ => Err(WeatherError::unknown("country", s)),
        }
    }
}

/// Languages alert texts are stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LanguageId {
    English,
    German,
    Slovenian,
}

impl LanguageId {
    pub const ALL: [LanguageId; 3] = [LanguageId::English, LanguageId::German, LanguageId::Slovenian];

    pub fn code(&self) -> &'static str {
        match self {
            LanguageId::English => "en",
            LanguageId::German => "de",
            LanguageId::Slovenian => "sl",
        }
    }

    /// Match a CAP language tag such as `en-GB` or `sl` on its first two letters.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let prefix = tag.get(..2)?.to_ascii_lowercase();
        LanguageId::ALL.into_iter().find(|l| l.code() == prefix)
    }
}
