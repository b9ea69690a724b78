//! MeteoAlarm warnings: the Atom feed of active alerts, CAP alert
//! documents and the per-area alert index.

mod areas;
mod cap;
mod feed;
mod steering;
mod xml;

pub use areas::{read_areas, AlertArea, AreaCatalogue};
pub use cap::parse_cap;
pub use feed::{classify, feed_url, parse_feed, FeedEntry, FeedPlan};
pub use steering::{update_alerts, AlertSummary};
