use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use tracing::warn;
use weather_common::{parse_timestamp, CountryId};

use super::xml::{attribute, Node, XmlNodes};
use crate::error::Result;

const CAP_MEDIA_TYPE: &str = "application/cap+xml";

/// Atom feed of a country's active warnings.
pub fn feed_url(country: CountryId) -> String {
    format!(
        "https://feeds.meteoalarm.org/feeds/meteoalarm-legacy-atom-{}",
        country.full_name()
    )
}

/// An alert listed in the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub id: String,
    pub expires: DateTime<Utc>,
    pub cap_url: String,
}

#[derive(Debug, Default)]
struct PendingEntry {
    id: Option<String>,
    expires: Option<String>,
    cap_url: Option<String>,
}

impl PendingEntry {
    fn finish(self) -> Option<FeedEntry> {
        let (Some(id), Some(expires), Some(cap_url)) = (self.id, self.expires, self.cap_url) else {
            warn!("Feed entry without identifier, expiry or CAP link");
            return None;
        };

        match parse_timestamp(&expires) {
            Ok(expires) => Some(FeedEntry { id, expires, cap_url }),
            Err(e) => {
                warn!(alert = %id, error = %e, "Feed entry with unreadable expiry");
                None
            }
        }
    }
}

/// Entries of a MeteoAlarm Atom feed in document order. Incomplete entries
/// are dropped with a warning.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>> {
    let mut nodes = XmlNodes::new(xml);
    let mut path: Vec<String> = Vec::new();
    let mut entry: Option<PendingEntry> = None;
    let mut entries = Vec::new();

    while let Some(node) = nodes.next_node()? {
        match node {
            Node::Open { name, attributes } => {
                if name == "entry" {
                    entry = Some(PendingEntry::default());
                } else if name == "link" && attribute(&attributes, "type") == Some(CAP_MEDIA_TYPE) {
                    if let Some(entry) = entry.as_mut() {
                        entry.cap_url = attribute(&attributes, "href").map(str::to_string);
                    }
                }
                path.push(name);
            }
            Node::Text(text) => {
                let Some(entry) = entry.as_mut() else { continue };
                match path.last().map(String::as_str) {
                    Some("identifier") => entry.id = Some(text.trim().to_string()),
                    Some("expires") => entry.expires = Some(text.trim().to_string()),
                    _ => {}
                }
            }
            Node::Close(name) => {
                path.pop();
                if name == "entry" {
                    if let Some(finished) = entry.take().and_then(PendingEntry::finish) {
                        entries.push(finished);
                    }
                }
            }
        }
    }

    Ok(entries)
}

/// What an update has to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedPlan {
    /// Entries neither stored yet nor expired
    pub new: Vec<FeedEntry>,
    /// Stored alerts no longer in the feed
    pub obsolete: BTreeSet<String>,
}

/// Compare the feed with the stored alert ids.
pub fn classify(entries: &[FeedEntry], stored: &HashSet<String>, now: DateTime<Utc>) -> FeedPlan {
    let listed: HashSet<&str> = entries.iter().map(|e| e.id.as_str()).collect();

    let new = entries
        .iter()
        .filter(|e| !stored.contains(&e.id) && e.expires >= now)
        .cloned()
        .collect();

    let obsolete = stored
        .iter()
        .filter(|id| !listed.contains(id.as_str()))
        .cloned()
        .collect();

    FeedPlan { new, obsolete }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_utils::meteoalarm_feed;

    fn feed() -> String {
        meteoalarm_feed(&[
            ("alert-1", "2024-01-15T18:00:00+00:00", "https://example.org/1.cap"),
            ("alert-2", "2024-01-15T09:00:00+00:00", "https://example.org/2.cap"),
            ("alert-3", "2024-01-16T06:00:00+00:00", "https://example.org/3.cap"),
        ])
    }

    #[test]
    fn test_feed_url() {
        assert_eq!(
            feed_url(CountryId::Slovenia),
            "https://feeds.meteoalarm.org/feeds/meteoalarm-legacy-atom-slovenia"
        );
    }

    #[test]
    fn test_parse_feed() {
        let entries = parse_feed(&feed()).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].id, "alert-1");
        assert_eq!(entries[0].cap_url, "https://example.org/1.cap");
        assert_eq!(entries[1].expires, Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_entry_without_cap_link() {
        let feed = feed().replace(r#"<link type="application/cap+xml" href="https://example.org/2.cap"/>"#, "");
        let entries = parse_feed(&feed).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.id != "alert-2"));
    }

    #[test]
    fn test_classify() {
        let entries = parse_feed(&feed()).unwrap();
        let stored: HashSet<String> = ["alert-3", "gone"].iter().map(|s| s.to_string()).collect();
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();

        let plan = classify(&entries, &stored, now);
        let new: Vec<&str> = plan.new.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(new, vec!["alert-1"]);
        assert_eq!(plan.obsolete.into_iter().collect::<Vec<_>>(), vec!["gone"]);
    }
}
