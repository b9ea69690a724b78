//! Station-at-a-time drivers over a [`DocumentCursor`].

use std::io::BufRead;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use weather_common::{ForecastPoint, StationRecord};

use crate::cursor::{DocumentCursor, DocumentEvent};
use crate::error::{ParseError, Result};
use crate::extract::{extract_forecast, extract_station, StationFilter, TimeContext};

/// Counters reported by the readers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    /// Stations that produced output
    pub stations: usize,
    /// Stations excluded by the allow-list
    pub filtered: usize,
    /// Forecast points produced
    pub points: usize,
}

/// Reads forecast points one station at a time.
pub struct ForecastReader<R: BufRead> {
    cursor: DocumentCursor<R>,
    filter: StationFilter,
    now: DateTime<Utc>,
    product_id: Option<String>,
    issue_time: Option<String>,
    context: Option<TimeContext>,
    stats: ReaderStats,
    finished: bool,
}

impl<R: BufRead> ForecastReader<R> {
    pub fn new(cursor: DocumentCursor<R>, filter: StationFilter, now: DateTime<Utc>) -> Self {
        Self {
            cursor,
            filter,
            now,
            product_id: None,
            issue_time: None,
            context: None,
            stats: ReaderStats::default(),
            finished: false,
        }
    }

    /// Forecast points of the next accepted station, `Ok(None)` at the end.
    ///
    /// Stations excluded by the filter are skipped without parsing their
    /// value arrays.
    pub fn next_station(&mut self) -> Result<Option<Vec<ForecastPoint>>> {
        if self.finished {
            return Ok(None);
        }

        loop {
            let event = match self.cursor.next_event()? {
                Some(event) => event,
                None => {
                    self.finish();
                    return Ok(None);
                }
            };

            match event {
                DocumentEvent::ProductId(id) => self.product_id = Some(id),
                DocumentEvent::IssueTime(time) => self.issue_time = Some(time),
                DocumentEvent::TimeSteps(all) => {
                    let context = TimeContext::new(self.source(), all, self.now);
                    info!(
                        source = %context.source,
                        timestamps = context.all.len(),
                        selected = context.selected_count(),
                        "Read forecast time steps"
                    );
                    self.context = Some(context);
                }
                DocumentEvent::Placemark(placemark) => {
                    let context = self
                        .context
                        .as_ref()
                        .ok_or_else(|| ParseError::MissingTimeSteps(placemark.name.clone()))?;

                    match extract_forecast(&placemark, context, &self.filter)? {
                        Some(points) => {
                            self.stats.stations += 1;
                            self.stats.points += points.len();
                            debug!(station = %placemark.name, points = points.len(), "Extracted station forecast");
                            return Ok(Some(points));
                        }
                        None => self.stats.filtered += 1,
                    }
                }
            }
        }
    }

    /// Source string of the document, `"{product_id}:{issue_time}"`.
    pub fn source(&self) -> String {
        format!(
            "{}:{}",
            self.product_id.as_deref().unwrap_or_default(),
            self.issue_time.as_deref().unwrap_or_default()
        )
    }

    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    pub fn cursor(&self) -> &DocumentCursor<R> {
        &self.cursor
    }

    fn finish(&mut self) {
        self.finished = true;
        if self.stats.filtered > 0 {
            warn!(
                skipped = self.stats.filtered,
                "Skipped stations not in the allow-list"
            );
        }
        info!(
            stations = self.stats.stations,
            points = self.stats.points,
            dropped = self.cursor.placemarks_dropped(),
            "Finished reading forecast document"
        );
    }
}

/// Reads station identities, ignoring forecast values.
pub struct StationReader<R: BufRead> {
    cursor: DocumentCursor<R>,
    stations: usize,
}

impl<R: BufRead> StationReader<R> {
    pub fn new(cursor: DocumentCursor<R>) -> Self {
        Self { cursor, stations: 0 }
    }

    /// Next station record, `Ok(None)` at the end.
    pub fn next_station(&mut self) -> Result<Option<StationRecord>> {
        while let Some(event) = self.cursor.next_event()? {
            if let DocumentEvent::Placemark(placemark) = event {
                self.stations += 1;
                return extract_station(&placemark).map(Some);
            }
        }

        debug!(stations = self.stations, "Finished reading station catalogue");
        Ok(None)
    }

    pub fn stations_read(&self) -> usize {
        self.stations
    }
}
