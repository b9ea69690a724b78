//! CAP 1.2 alert documents.
//!
//! An alert carries one `info` block per language. Alert-wide values
//! (type, severity, validity) are taken from the blocks in document order,
//! later blocks overriding earlier ones; texts are kept per language and
//! areas are merged. Blocks in languages that are not stored are ignored.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use tracing::debug;
use weather_common::{
    parse_timestamp, AlertCertainty, AlertInfo, AlertResponseType, AlertSeverity, AlertText,
    AlertType, AlertUrgency, LanguageId,
};

use super::areas::AreaCatalogue;
use super::xml::{Node, XmlNodes};
use crate::error::{IngestionError, Result};

const EMMA_ID: &str = "EMMA_ID";
const AWARENESS_TYPE: &str = "awareness_type";

#[derive(Debug, Default)]
struct InfoBlock {
    language: Option<String>,
    values: BTreeMap<String, String>,
    text: AlertText,
    parameters: Vec<(String, String)>,
    areas: Vec<AreaBlock>,
}

#[derive(Debug, Default)]
struct AreaBlock {
    description: String,
    geocodes: Vec<(String, String)>,
}

/// Key and value of a `parameter` or `geocode` element being read.
#[derive(Debug, Default)]
struct Pair {
    name: String,
    value: String,
}

/// Parse a CAP document into the alert `id`.
///
/// Missing enumerations fall back to a generic, expected, minor and
/// unlikely alert without recommended response; unknown ones are errors.
pub fn parse_cap(id: &str, xml: &str, areas: &AreaCatalogue) -> Result<AlertInfo> {
    let blocks = read_info_blocks(truncate_trailing(xml))?;

    let mut kind = None;
    let mut urgency = None;
    let mut severity = None;
    let mut certainty = None;
    let mut response_type = None;
    let mut onset = None;
    let mut expires = None;
    let mut texts = BTreeMap::new();
    let mut codes = BTreeSet::new();

    for block in blocks {
        let language = match block.language.as_deref() {
            None => LanguageId::English,
            Some(tag) => match LanguageId::from_tag(tag) {
                Some(language) => language,
                None => {
                    debug!(alert = %id, language = tag, "Ignoring info block");
                    continue;
                }
            },
        };

        if let Some(value) = block.values.get("onset") {
            onset = Some(parse_timestamp(value)?);
        }
        if let Some(value) = block.values.get("expires") {
            expires = Some(parse_timestamp(value)?);
        }
        if let Some(value) = block.values.get("urgency") {
            urgency = Some(value.parse::<AlertUrgency>()?);
        }
        if let Some(value) = block.values.get("severity") {
            severity = Some(value.parse::<AlertSeverity>()?);
        }
        if let Some(value) = block.values.get("certainty") {
            certainty = Some(value.parse::<AlertCertainty>()?);
        }
        if let Some(value) = block.values.get("responseType") {
            response_type = Some(value.parse::<AlertResponseType>()?);
        }

        for (name, value) in &block.parameters {
            if name == AWARENESS_TYPE {
                kind = Some(awareness_type(value)?);
            }
        }

        for area in &block.areas {
            match area_code(area, areas) {
                Some(code) => {
                    codes.insert(code);
                }
                None => debug!(alert = %id, area = %area.description, "Unresolved alert area"),
            }
        }

        texts.insert(language, block.text);
    }

    if texts.is_empty() {
        return Err(IngestionError::invalid(format!("alert {} has no usable info block", id)));
    }

    Ok(AlertInfo {
        id: id.to_string(),
        areas: codes,
        kind: kind.unwrap_or(AlertType::Generic),
        urgency: urgency.unwrap_or(AlertUrgency::Expected),
        severity: severity.unwrap_or(AlertSeverity::Minor),
        certainty: certainty.unwrap_or(AlertCertainty::Unlikely),
        response_type: response_type.unwrap_or(AlertResponseType::NoResponse),
        onset: required_time(id, "onset", onset)?,
        expires: required_time(id, "expires", expires)?,
        texts,
    })
}

/// Documents are sometimes followed by garbage; keep everything up to the
/// last closing bracket.
fn truncate_trailing(xml: &str) -> &str {
    match xml.rfind('>') {
        Some(end) => &xml[..=end],
        None => xml,
    }
}

/// `"2; Snow/Ice"` style values: the last part names the type.
fn awareness_type(value: &str) -> Result<AlertType> {
    let name = value.rsplit("; ").next().unwrap_or(value);
    Ok(name.trim().to_lowercase().parse::<AlertType>()?)
}

fn area_code(area: &AreaBlock, catalogue: &AreaCatalogue) -> Option<String> {
    area.geocodes
        .iter()
        .find(|(name, _)| name == EMMA_ID)
        .map(|(_, value)| value.clone())
        .or_else(|| catalogue.code_for(&area.description).map(str::to_string))
}

fn required_time(id: &str, field: &str, value: Option<DateTime<Utc>>) -> Result<DateTime<Utc>> {
    value.ok_or_else(|| IngestionError::invalid(format!("alert {} has no {}", id, field)))
}

fn read_info_blocks(xml: &str) -> Result<Vec<InfoBlock>> {
    let mut nodes = XmlNodes::new(xml);
    let mut path: Vec<String> = Vec::new();
    let mut blocks = Vec::new();
    let mut info: Option<InfoBlock> = None;
    let mut area: Option<AreaBlock> = None;
    let mut pair: Option<Pair> = None;

    while let Some(node) = nodes.next_node()? {
        match node {
            Node::Open { name, .. } => {
                match name.as_str() {
                    "info" => info = Some(InfoBlock::default()),
                    "area" if info.is_some() => area = Some(AreaBlock::default()),
                    "parameter" | "geocode" if info.is_some() => pair = Some(Pair::default()),
                    _ => {}
                }
                path.push(name);
            }
            Node::Text(text) => {
                let Some(block) = info.as_mut() else { continue };
                let element = path.last().map(String::as_str).unwrap_or_default();
                let text = text.trim().to_string();

                if let Some(pair) = pair.as_mut() {
                    match element {
                        "valueName" => pair.name = text,
                        "value" => pair.value = text,
                        _ => {}
                    }
                } else if let Some(area) = area.as_mut() {
                    if element == "areaDesc" {
                        area.description = text;
                    }
                } else {
                    match element {
                        "language" => block.language = Some(text),
                        "event" => block.text.event = text,
                        "headline" => block.text.headline = text,
                        "description" => block.text.description = text,
                        "instruction" => block.text.instructions = text,
                        "senderName" => block.text.sender_name = text,
                        "web" => block.text.web = text,
                        "onset" | "expires" | "urgency" | "severity" | "certainty" => {
                            block.values.insert(element.to_string(), text);
                        }
                        "responseType" => {
                            block.values.insert(element.to_string(), text.to_lowercase());
                        }
                        _ => {}
                    }
                }
            }
            Node::Close(name) => {
                path.pop();
                match name.as_str() {
                    "parameter" => {
                        if let (Some(done), Some(block)) = (pair.take(), info.as_mut()) {
                            block.parameters.push((done.name, done.value));
                        }
                    }
                    "geocode" => {
                        if let (Some(done), Some(area)) = (pair.take(), area.as_mut()) {
                            area.geocodes.push((done.name, done.value));
                        }
                    }
                    "area" => {
                        if let (Some(done), Some(block)) = (area.take(), info.as_mut()) {
                            block.areas.push(done);
                        }
                    }
                    "info" => blocks.extend(info.take()),
                    _ => {}
                }
            }
        }
    }

    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_utils::{cap_alert, meteoalarm_areas_json};

    use crate::meteoalarm::areas::read_areas;

    fn catalogue() -> AreaCatalogue {
        read_areas(meteoalarm_areas_json().as_bytes()).unwrap()
    }

    #[test]
    fn test_parse_alert() {
        let xml = cap_alert("cap-1", "1; Wind", "Moderate", &["SI009", "SI006"]);
        let alert = parse_cap("cap-1", &xml, &catalogue()).unwrap();

        assert_eq!(alert.id, "cap-1");
        assert_eq!(alert.kind, AlertType::Wind);
        assert_eq!(alert.severity, AlertSeverity::Moderate);
        assert_eq!(alert.urgency, AlertUrgency::Future);
        assert_eq!(alert.certainty, AlertCertainty::Likely);
        assert_eq!(alert.response_type, AlertResponseType::Monitor);
        assert_eq!(alert.onset, Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap());
        assert_eq!(alert.expires, Utc.with_ymd_and_hms(2024, 1, 15, 18, 0, 0).unwrap());
        assert_eq!(alert.areas.iter().collect::<Vec<_>>(), vec!["SI006", "SI009"]);

        let english = &alert.texts[&LanguageId::English];
        assert_eq!(english.event, "Wind");
        assert_eq!(english.headline, "Wind warning");
        assert_eq!(english.description, "Wind gusts up to 70 km/h.");
        assert_eq!(english.sender_name, "ARSO");
        assert_eq!(alert.texts[&LanguageId::Slovenian].event, "Veter");
        assert!(!alert.texts.contains_key(&LanguageId::German));
    }

    #[test]
    fn test_awareness_type() {
        assert_eq!(awareness_type("2; snow-ice").unwrap(), AlertType::SnowIce);
        assert_eq!(awareness_type("10; Rain").unwrap(), AlertType::Rain);
        assert!(awareness_type("99; Meteorites").is_err());
    }

    #[test]
    fn test_area_from_description() {
        let xml = cap_alert("cap-2", "1; Wind", "Minor", &["SI009"]).replace(
            "<geocode>\n        <valueName>EMMA_ID</valueName>\n        <value>SI009</value>\n      </geocode>\n",
            "",
        );
        let xml = xml.replace("Area SI009", "Slovenia / Central");

        let alert = parse_cap("cap-2", &xml, &catalogue()).unwrap();
        assert_eq!(alert.areas.iter().collect::<Vec<_>>(), vec!["SI009"]);

        let unresolved = parse_cap("cap-2", &xml, &AreaCatalogue::default()).unwrap();
        assert!(unresolved.areas.is_empty());
    }

    #[test]
    fn test_trailing_garbage_and_unknown_language() {
        let xml = cap_alert("cap-3", "1; Wind", "Severe", &["SI801"]).replace("<language>sl</language>", "<language>fr-FR</language>");
        let alert = parse_cap("cap-3", &format!("{}\u{0}\u{0}", xml), &catalogue()).unwrap();

        assert_eq!(alert.severity, AlertSeverity::Severe);
        assert_eq!(alert.texts.len(), 1);
        assert!(alert.texts.contains_key(&LanguageId::English));
    }

    #[test]
    fn test_unknown_severity() {
        let xml = cap_alert("cap-4", "1; Wind", "Apocalyptic", &["SI801"]);
        assert!(parse_cap("cap-4", &xml, &catalogue()).is_err());
    }
}
