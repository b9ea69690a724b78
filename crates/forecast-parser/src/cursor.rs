//! Pull-based event cursor over a MOSMIX KML document.
//!
//! The cursor reads XML events one at a time and only ever holds the
//! placemark currently being assembled. Once a placemark is complete it is
//! moved out to the caller, so memory use does not depend on how many
//! stations the document contains.

use std::io::BufRead;

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};
use weather_common::parse_timestamp;

use crate::error::{ParseError, Result};

/// Top-level items of a forecast document, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentEvent {
    ProductId(String),
    IssueTime(String),
    /// The shared forecast time-step list.
    TimeSteps(Vec<DateTime<Utc>>),
    Placemark(Placemark),
}

/// One station's placemark with its raw, unparsed forecast arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct Placemark {
    /// Station identifier (`kml:name`)
    pub name: String,
    /// Station display name (`kml:description`)
    pub description: Option<String>,
    /// Raw `lon,lat,alt` triple
    pub coordinates: String,
    pub forecasts: Vec<ForecastBlock>,
}

/// A `dwd:Forecast` block: element code and its whitespace separated values.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastBlock {
    pub element: String,
    pub values: String,
}

impl Placemark {
    /// Raw value array for an element code.
    pub fn forecast(&self, element: &str) -> Option<&str> {
        self.forecasts
            .iter()
            .find(|block| block.element == element)
            .map(|block| block.values.as_str())
    }
}

#[derive(Debug, Default)]
struct PendingPlacemark {
    name: String,
    description: Option<String>,
    coordinates: Option<String>,
    forecasts: Vec<ForecastBlock>,
}

impl PendingPlacemark {
    /// Heap bytes held by the placemark under construction.
    fn buffered_bytes(&self) -> usize {
        let blocks: usize = self
            .forecasts
            .iter()
            .map(|block| block.element.capacity() + block.values.capacity())
            .sum();
        self.name.capacity()
            + self.description.as_ref().map_or(0, String::capacity)
            + self.coordinates.as_ref().map_or(0, String::capacity)
            + self.forecasts.capacity() * std::mem::size_of::<ForecastBlock>()
            + blocks
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    ProductId,
    IssueTime,
    TimeSteps,
    TimeStep,
    Placemark,
    Name,
    Description,
    Coordinates,
    Forecast,
    Value,
    Other,
}

impl Tag {
    fn from_local_name(name: &[u8]) -> Self {
        match name {
            b"ProductID" => Tag::ProductId,
            b"IssueTime" => Tag::IssueTime,
            b"ForecastTimeSteps" => Tag::TimeSteps,
            b"TimeStep" => Tag::TimeStep,
            b"Placemark" => Tag::Placemark,
            b"name" => Tag::Name,
            b"description" => Tag::Description,
            b"coordinates" => Tag::Coordinates,
            b"Forecast" => Tag::Forecast,
            b"value" => Tag::Value,
            _ => Tag::Other,
        }
    }
}

/// Which text node is being collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    Nothing,
    ProductId,
    IssueTime,
    TimeStep,
    Name,
    Description,
    Coordinates,
    Value,
}

enum Step {
    Start(Tag, Option<String>),
    End(Tag),
    Eof,
    Skip,
}

/// Streaming cursor producing [`DocumentEvent`]s.
pub struct DocumentCursor<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    text: String,
    capture: Capture,
    time_steps: Option<Vec<DateTime<Utc>>>,
    time_steps_seen: bool,
    placemark: Option<PendingPlacemark>,
    forecast_element: Option<String>,
    placemarks_seen: usize,
    placemarks_dropped: usize,
    peak_placemark_bytes: usize,
}

impl<'a> DocumentCursor<&'a [u8]> {
    /// Cursor over an in-memory KML document.
    pub fn from_xml(xml: &'a str) -> Self {
        Self::from_reader(xml.as_bytes())
    }
}

impl<R: BufRead> DocumentCursor<R> {
    pub fn from_reader(source: R) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.trim_text(true);

        Self {
            reader,
            buf: Vec::with_capacity(4096),
            text: String::new(),
            capture: Capture::Nothing,
            time_steps: None,
            time_steps_seen: false,
            placemark: None,
            forecast_element: None,
            placemarks_seen: 0,
            placemarks_dropped: 0,
            peak_placemark_bytes: 0,
        }
    }

    /// Advance to the next document item. `Ok(None)` marks the end.
    pub fn next_event(&mut self) -> Result<Option<DocumentEvent>> {
        loop {
            self.buf.clear();

            let step = match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(e)) => {
                    let tag = Tag::from_local_name(e.local_name().as_ref());
                    let element = if tag == Tag::Forecast {
                        element_name(&e, &self.reader).map_err(|source| ParseError::Xml {
                            position: self.reader.buffer_position(),
                            source,
                        })?
                    } else {
                        None
                    };
                    Step::Start(tag, element)
                }
                Ok(Event::End(e)) => Step::End(Tag::from_local_name(e.local_name().as_ref())),
                Ok(Event::Text(t)) => {
                    if self.capture != Capture::Nothing {
                        let text = t.unescape().map_err(|source| ParseError::Xml {
                            position: self.reader.buffer_position(),
                            source,
                        })?;
                        self.text.push_str(&text);
                    }
                    Step::Skip
                }
                Ok(Event::CData(c)) => {
                    if self.capture != Capture::Nothing {
                        self.text.push_str(&String::from_utf8_lossy(&c));
                    }
                    Step::Skip
                }
                Ok(Event::Eof) => Step::Eof,
                Ok(_) => Step::Skip,
                Err(source) => {
                    return Err(ParseError::Xml {
                        position: self.reader.buffer_position(),
                        source,
                    })
                }
            };

            match step {
                Step::Start(tag, element) => self.open(tag, element)?,
                Step::End(tag) => {
                    if let Some(event) = self.close(tag)? {
                        return Ok(Some(event));
                    }
                }
                Step::Eof => {
                    if let Some(pending) = self.placemark.take() {
                        warn!(station = %pending.name, "Document ended inside a placemark");
                    }
                    debug!(
                        placemarks = self.placemarks_seen,
                        dropped = self.placemarks_dropped,
                        "Reached end of document"
                    );
                    return Ok(None);
                }
                Step::Skip => {}
            }
        }
    }

    /// Capacity held by the cursor's scratch buffers.
    pub fn retained_bytes(&self) -> usize {
        self.buf.capacity() + self.text.capacity()
    }

    /// Largest placemark buffered so far, in heap bytes. Bounded by the
    /// size of one station's data, whatever the document length.
    pub fn peak_placemark_bytes(&self) -> usize {
        self.peak_placemark_bytes
    }

    /// Placemarks encountered so far, including dropped ones.
    pub fn placemarks_seen(&self) -> usize {
        self.placemarks_seen
    }

    /// Placemarks dropped for lacking coordinates.
    pub fn placemarks_dropped(&self) -> usize {
        self.placemarks_dropped
    }

    fn open(&mut self, tag: Tag, element: Option<String>) -> Result<()> {
        let in_placemark = self.placemark.is_some();

        match tag {
            Tag::ProductId => self.begin(Capture::ProductId),
            Tag::IssueTime => self.begin(Capture::IssueTime),
            Tag::TimeSteps => {
                if self.time_steps_seen {
                    return Err(ParseError::DuplicateTimeSteps);
                }
                self.time_steps_seen = true;
                self.time_steps = Some(Vec::new());
            }
            Tag::TimeStep if self.time_steps.is_some() => self.begin(Capture::TimeStep),
            Tag::Placemark => self.placemark = Some(PendingPlacemark::default()),
            Tag::Name if in_placemark => self.begin(Capture::Name),
            Tag::Description if in_placemark => self.begin(Capture::Description),
            Tag::Coordinates if in_placemark => self.begin(Capture::Coordinates),
            Tag::Forecast if in_placemark => self.forecast_element = element,
            Tag::Value if self.forecast_element.is_some() => self.begin(Capture::Value),
            _ => {}
        }

        Ok(())
    }

    fn close(&mut self, tag: Tag) -> Result<Option<DocumentEvent>> {
        match (tag, self.capture) {
            (Tag::ProductId, Capture::ProductId) => {
                return Ok(Some(DocumentEvent::ProductId(self.take_text())));
            }
            (Tag::IssueTime, Capture::IssueTime) => {
                return Ok(Some(DocumentEvent::IssueTime(self.take_text())));
            }
            (Tag::TimeStep, Capture::TimeStep) => {
                let raw = self.take_text();
                let timestamp =
                    parse_timestamp(&raw).map_err(|_| ParseError::InvalidTimestamp(raw.clone()))?;
                if let Some(steps) = self.time_steps.as_mut() {
                    steps.push(timestamp);
                }
            }
            (Tag::TimeSteps, _) => {
                if let Some(steps) = self.time_steps.take() {
                    debug!(count = steps.len(), "Read forecast time steps");
                    return Ok(Some(DocumentEvent::TimeSteps(steps)));
                }
            }
            (Tag::Name, Capture::Name) => {
                let text = self.take_text();
                if let Some(pending) = self.placemark.as_mut() {
                    pending.name = text;
                }
            }
            (Tag::Description, Capture::Description) => {
                let text = self.take_text();
                if let Some(pending) = self.placemark.as_mut() {
                    pending.description = Some(text);
                }
            }
            (Tag::Coordinates, Capture::Coordinates) => {
                let text = self.take_text();
                if let Some(pending) = self.placemark.as_mut() {
                    if !text.is_empty() {
                        pending.coordinates = Some(text);
                    }
                }
            }
            (Tag::Value, Capture::Value) => {
                let values = self.take_text();
                if let (Some(pending), Some(element)) =
                    (self.placemark.as_mut(), self.forecast_element.as_ref())
                {
                    pending.forecasts.push(ForecastBlock {
                        element: element.clone(),
                        values,
                    });
                }
            }
            (Tag::Forecast, _) => self.forecast_element = None,
            (Tag::Placemark, _) => return Ok(self.finish_placemark()),
            _ => {}
        }

        Ok(None)
    }

    fn finish_placemark(&mut self) -> Option<DocumentEvent> {
        let pending = self.placemark.take()?;
        self.forecast_element = None;
        self.peak_placemark_bytes = self.peak_placemark_bytes.max(pending.buffered_bytes());
        self.placemarks_seen += 1;

        match pending.coordinates {
            Some(coordinates) => Some(DocumentEvent::Placemark(Placemark {
                name: pending.name,
                description: pending.description,
                coordinates,
                forecasts: pending.forecasts,
            })),
            None => {
                warn!(station = %pending.name, "Placemark has no coordinates, skipping");
                self.placemarks_dropped += 1;
                None
            }
        }
    }

    fn begin(&mut self, capture: Capture) {
        self.capture = capture;
        self.text.clear();
    }

    fn take_text(&mut self) -> String {
        self.capture = Capture::Nothing;
        let text = self.text.trim().to_string();
        self.text.clear();
        text
    }
}

/// The `dwd:elementName` attribute of a forecast block.
fn element_name<R>(
    start: &BytesStart<'_>,
    reader: &Reader<R>,
) -> std::result::Result<Option<String>, quick_xml::Error> {
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == b"elementName" {
            return Ok(Some(attr.decode_and_unescape_value(reader)?.into_owned()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="ISO-8859-1" standalone="yes"?>
<kml:kml xmlns:dwd="https://opendata.dwd.de/weather/lib/pointforecast_dwd_extension_V1_0.xsd" xmlns:kml="http://www.opengis.net/kml/2.2">
  <kml:Document>
    <kml:ExtendedData>
      <dwd:ProductDefinition>
        <dwd:Issuer>Deutscher Wetterdienst</dwd:Issuer>
        <dwd:ProductID>MOSMIX</dwd:ProductID>
        <dwd:IssueTime>2024-01-01T09:00:00.000Z</dwd:IssueTime>
        <dwd:ForecastTimeSteps>
          <dwd:TimeStep>2024-01-01T10:00:00.000Z</dwd:TimeStep>
          <dwd:TimeStep>2024-01-01T11:00:00.000Z</dwd:TimeStep>
        </dwd:ForecastTimeSteps>
      </dwd:ProductDefinition>
    </kml:ExtendedData>
    <kml:Placemark>
      <kml:name>10637</kml:name>
      <kml:description>FRANKFURT/M</kml:description>
      <kml:ExtendedData>
        <dwd:Forecast dwd:elementName="TTT">
          <dwd:value>     280.15     281.25</dwd:value>
        </dwd:Forecast>
      </kml:ExtendedData>
      <kml:Point>
        <kml:coordinates>8.6,50.05,111.0</kml:coordinates>
      </kml:Point>
    </kml:Placemark>
    <kml:Placemark>
      <kml:name>X0001</kml:name>
      <kml:description>NOWHERE</kml:description>
    </kml:Placemark>
  </kml:Document>
</kml:kml>"#;

    #[test]
    fn test_event_sequence() {
        let mut cursor = DocumentCursor::from_xml(DOC);

        assert_eq!(
            cursor.next_event().unwrap(),
            Some(DocumentEvent::ProductId("MOSMIX".to_string()))
        );
        assert_eq!(
            cursor.next_event().unwrap(),
            Some(DocumentEvent::IssueTime("2024-01-01T09:00:00.000Z".to_string()))
        );

        match cursor.next_event().unwrap() {
            Some(DocumentEvent::TimeSteps(steps)) => assert_eq!(steps.len(), 2),
            other => panic!("expected time steps, got {:?}", other),
        }

        match cursor.next_event().unwrap() {
            Some(DocumentEvent::Placemark(p)) => {
                assert_eq!(p.name, "10637");
                assert_eq!(p.description.as_deref(), Some("FRANKFURT/M"));
                assert_eq!(p.coordinates, "8.6,50.05,111.0");
                assert_eq!(p.forecast("TTT"), Some("280.15     281.25"));
                assert_eq!(p.forecast("FF"), None);
            }
            other => panic!("expected placemark, got {:?}", other),
        }

        // the second placemark has no coordinates and is dropped
        assert_eq!(cursor.next_event().unwrap(), None);
        assert_eq!(cursor.placemarks_seen(), 2);
        assert_eq!(cursor.placemarks_dropped(), 1);
    }

    #[test]
    fn test_latin1_document() {
        let mut bytes = br#"<?xml version="1.0" encoding="ISO-8859-1"?>
<kml><Document><Placemark><name>10865</name><description>M"#
            .to_vec();
        bytes.push(0xDC);
        bytes.extend_from_slice(
            br#"NCHEN</description><ExtendedData><Forecast elementName="R&#82;1c"><value>0.1</value></Forecast></ExtendedData>
<Point><coordinates>11.55,48.13,515.0</coordinates></Point></Placemark></Document></kml>"#,
        );
        let mut cursor = DocumentCursor::from_reader(bytes.as_slice());

        match cursor.next_event().unwrap() {
            Some(DocumentEvent::Placemark(p)) => {
                assert_eq!(p.description.as_deref(), Some("M\u{dc}NCHEN"));
                assert_eq!(p.forecast("RR1c"), Some("0.1"));
            }
            other => panic!("expected placemark, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_time_steps() {
        let xml = r#"<kml><dwd:ForecastTimeSteps><dwd:TimeStep>2024-01-01T10:00:00Z</dwd:TimeStep></dwd:ForecastTimeSteps>
            <dwd:ForecastTimeSteps><dwd:TimeStep>2024-01-01T11:00:00Z</dwd:TimeStep></dwd:ForecastTimeSteps></kml>"#;
        let mut cursor = DocumentCursor::from_xml(xml);

        assert!(matches!(cursor.next_event(), Ok(Some(DocumentEvent::TimeSteps(_)))));
        assert!(matches!(cursor.next_event(), Err(ParseError::DuplicateTimeSteps)));
    }

    #[test]
    fn test_invalid_time_step() {
        let xml = "<kml><ForecastTimeSteps><TimeStep>yesterday</TimeStep></ForecastTimeSteps></kml>";
        let mut cursor = DocumentCursor::from_xml(xml);

        assert!(matches!(cursor.next_event(), Err(ParseError::InvalidTimestamp(raw)) if raw == "yesterday"));
    }

    #[test]
    fn test_malformed_xml() {
        let xml = "<kml><Placemark><name>1</nam></Placemark></kml>";
        let mut cursor = DocumentCursor::from_xml(xml);

        assert!(matches!(cursor.next_event(), Err(ParseError::Xml { .. })));
    }
}
