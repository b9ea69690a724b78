use std::collections::HashMap;
use std::io::Read;

use serde::Deserialize;
use tracing::debug;

use crate::error::Result;

/// A MeteoAlarm warning region.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AlertArea {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub polygons: serde_json::Value,
}

/// Known warning regions of a country, used to resolve CAP areas that come
/// without an EMMA geocode.
#[derive(Debug, Clone, Default)]
pub struct AreaCatalogue {
    areas: Vec<AlertArea>,
    by_description: HashMap<String, String>,
}

impl AreaCatalogue {
    pub fn new(areas: Vec<AlertArea>) -> Self {
        let by_description = areas
            .iter()
            .filter(|area| !area.description.is_empty())
            .map(|area| (area.description.clone(), area.code.clone()))
            .collect();
        Self { areas, by_description }
    }

    /// Area code for a CAP `areaDesc`.
    pub fn code_for(&self, description: &str) -> Option<&str> {
        self.by_description.get(description.trim()).map(String::as_str)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.areas.iter().map(|area| area.code.as_str())
    }

    pub fn areas(&self) -> &[AlertArea] {
        &self.areas
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}

/// Read an area list: a JSON array of `{code, name, description, polygons}`.
pub fn read_areas<R: Read>(reader: R) -> Result<AreaCatalogue> {
    let areas: Vec<AlertArea> = serde_json::from_reader(reader)?;
    debug!(areas = areas.len(), "Read alert areas");
    Ok(AreaCatalogue::new(areas))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::meteoalarm_areas_json;

    #[test]
    fn test_read_areas() {
        let catalogue = read_areas(meteoalarm_areas_json().as_bytes()).unwrap();
        assert_eq!(catalogue.codes().collect::<Vec<_>>(), vec!["SI006", "SI009", "SI801"]);
        assert_eq!(catalogue.code_for("Slovenia / Central"), Some("SI009"));
        assert_eq!(catalogue.code_for("Nowhere"), None);
        assert!(AreaCatalogue::default().is_empty());
    }
}
