//! Synthetic MOSMIX documents.
//!
//! The generated KML follows the layout of the DWD point-forecast product:
//! a `dwd:ProductDefinition` with the time-step list, then one
//! `kml:Placemark` per station with a `dwd:Forecast` block per element.
//! Values are predictable so tests can check them after parsing.

use std::io::{self, Cursor, Write};

use chrono::{DateTime, TimeDelta, Utc};
use zip::write::FileOptions;
use zip::ZipWriter;

/// Element codes in the order DWD publishes them.
pub const MOSMIX_CODES: [&str; 11] = [
    "DD", "FF", "FX1", "N", "PPPP", "RR1c", "SunD1", "Td", "TTT", "VV", "ww",
];

const KML_HEADER: &str = r#"<?xml version="1.0" encoding="ISO-8859-1" standalone="yes"?>
<kml:kml xmlns:dwd="https://opendata.dwd.de/weather/lib/pointforecast_dwd_extension_V1_0.xsd" xmlns:gx="http://www.google.com/kml/ext/2.2" xmlns:xal="urn:oasis:names:tc:ciq:xsdschema:xAL:2.0" xmlns:kml="http://www.opengis.net/kml/2.2" xmlns:atom="http://www.w3.org/2005/Atom">
    <kml:Document>
"#;

const KML_FOOTER: &str = "    </kml:Document>\n</kml:kml>\n";

/// A station to place in a synthetic document.
#[derive(Debug, Clone)]
pub struct SyntheticStation {
    pub id: String,
    pub name: String,
    pub lon: f64,
    pub lat: f64,
    pub altitude: f64,
    /// Omit `kml:Point` entirely
    pub without_coordinates: bool,
    /// Emit this many values per element instead of one per time step
    pub value_count: Option<usize>,
    /// Replace every value array with this text
    pub raw_values: Option<String>,
}

impl SyntheticStation {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            lon: 8.6,
            lat: 50.05,
            altitude: 111.0,
            without_coordinates: false,
            value_count: None,
            raw_values: None,
        }
    }

    pub fn at(mut self, lon: f64, lat: f64, altitude: f64) -> Self {
        self.lon = lon;
        self.lat = lat;
        self.altitude = altitude;
        self
    }

    pub fn without_coordinates(mut self) -> Self {
        self.without_coordinates = true;
        self
    }

    pub fn with_value_count(mut self, count: usize) -> Self {
        self.value_count = Some(count);
        self
    }

    pub fn with_raw_values(mut self, values: impl Into<String>) -> Self {
        self.raw_values = Some(values.into());
        self
    }
}

/// `count` numbered stations, ids starting at `10000`.
pub fn numbered_stations(count: usize) -> Vec<SyntheticStation> {
    (0..count)
        .map(|i| {
            SyntheticStation::new(format!("{}", 10000 + i), format!("STATION {}", i))
                .at(6.0 + (i % 90) as f64 * 0.1, 47.0 + (i / 90 % 80) as f64 * 0.1, 100.0)
        })
        .collect()
}

/// `count` hourly instants starting at `start`.
pub fn hourly_steps(start: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
    (0..count as i64).map(|i| start + TimeDelta::hours(i)).collect()
}

/// Predictable value of an element at a step.
///
/// Every element gets a plausible SI magnitude plus the step index, so the
/// sanitizer leaves the values alone. Every tenth precipitation value is the
/// missing sentinel.
pub fn synthetic_value(code: &str, step: usize) -> String {
    let s = step as f64;
    match code {
        "DD" => format!("{:.0}", (s * 10.0) % 360.0),
        "FF" => format!("{:.2}", 2.0 + s * 0.1),
        "FX1" => format!("{:.2}", 5.0 + s * 0.1),
        "N" => format!("{:.0}", s % 100.0),
        "PPPP" => format!("{:.0}", 101300.0 + s),
        "RR1c" if step % 10 == 9 => "-".to_string(),
        "RR1c" => format!("{:.2}", s * 0.01),
        "SunD1" => format!("{:.0}", (s * 60.0) % 3600.0),
        "Td" => format!("{:.2}", 270.0 + s * 0.1),
        "TTT" => format!("{:.2}", 280.15 + s * 0.1),
        "VV" => format!("{:.0}", 20000.0 + s),
        "ww" => format!("{:.0}", step % 100),
        _ => "0".to_string(),
    }
}

/// Builder for synthetic MOSMIX KML documents.
#[derive(Debug, Clone)]
pub struct MosmixDocument {
    pub product_id: String,
    pub issue_time: DateTime<Utc>,
    pub time_steps: Vec<DateTime<Utc>>,
    pub stations: Vec<SyntheticStation>,
    /// Emit the time-step list a second time
    pub duplicate_time_steps: bool,
}

impl MosmixDocument {
    pub fn new(issue_time: DateTime<Utc>, time_steps: Vec<DateTime<Utc>>) -> Self {
        Self {
            product_id: "MOSMIX".to_string(),
            issue_time,
            time_steps,
            stations: Vec::new(),
            duplicate_time_steps: false,
        }
    }

    pub fn with_stations(mut self, stations: Vec<SyntheticStation>) -> Self {
        self.stations = stations;
        self
    }

    pub fn with_duplicate_time_steps(mut self) -> Self {
        self.duplicate_time_steps = true;
        self
    }

    /// Source string a parser should report for this document.
    pub fn source(&self) -> String {
        format!("{}:{}", self.product_id, format_instant(self.issue_time))
    }

    /// Stream the KML text into `out`.
    pub fn write_kml<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(KML_HEADER.as_bytes())?;
        writeln!(out, "        <kml:ExtendedData>")?;
        writeln!(out, "            <dwd:ProductDefinition>")?;
        writeln!(out, "                <dwd:Issuer>Deutscher Wetterdienst</dwd:Issuer>")?;
        writeln!(out, "                <dwd:ProductID>{}</dwd:ProductID>", self.product_id)?;
        writeln!(out, "                <dwd:GeneratingProcess>SYNTHETIC</dwd:GeneratingProcess>")?;
        writeln!(out, "                <dwd:IssueTime>{}</dwd:IssueTime>", format_instant(self.issue_time))?;
        self.write_time_steps(out)?;
        if self.duplicate_time_steps {
            self.write_time_steps(out)?;
        }
        writeln!(out, "            </dwd:ProductDefinition>")?;
        writeln!(out, "        </kml:ExtendedData>")?;

        for station in &self.stations {
            self.write_placemark(out, station)?;
        }

        out.write_all(KML_FOOTER.as_bytes())
    }

    pub fn to_kml(&self) -> String {
        let mut out = Vec::new();
        self.write_kml(&mut out).expect("writing to a Vec cannot fail");
        String::from_utf8(out).expect("generated KML is ASCII")
    }

    /// The document packed as a single-entry KMZ archive.
    pub fn to_kmz(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("MOSMIX_S_2024010109_240.kml", FileOptions::default())
            .expect("start zip entry");
        self.write_kml(&mut zip).expect("write zip entry");
        zip.finish().expect("finish zip archive").into_inner()
    }

    fn write_time_steps<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "                <dwd:ForecastTimeSteps>")?;
        for step in &self.time_steps {
            writeln!(out, "                    <dwd:TimeStep>{}</dwd:TimeStep>", format_instant(*step))?;
        }
        writeln!(out, "                </dwd:ForecastTimeSteps>")
    }

    fn write_placemark<W: Write>(&self, out: &mut W, station: &SyntheticStation) -> io::Result<()> {
        let count = station.value_count.unwrap_or(self.time_steps.len());

        writeln!(out, "        <kml:Placemark>")?;
        writeln!(out, "            <kml:name>{}</kml:name>", station.id)?;
        writeln!(out, "            <kml:description>{}</kml:description>", station.name)?;
        writeln!(out, "            <kml:ExtendedData>")?;
        for code in MOSMIX_CODES {
            writeln!(out, "                <dwd:Forecast dwd:elementName=\"{}\">", code)?;
            write!(out, "                    <dwd:value>")?;
            match &station.raw_values {
                Some(raw) => write!(out, "{}", raw)?,
                None => {
                    for step in 0..count {
                        write!(out, "{:>11}", synthetic_value(code, step))?;
                    }
                }
            }
            writeln!(out, "</dwd:value>")?;
            writeln!(out, "                </dwd:Forecast>")?;
        }
        writeln!(out, "            </kml:ExtendedData>")?;
        if !station.without_coordinates {
            writeln!(out, "            <kml:Point>")?;
            writeln!(
                out,
                "                <kml:coordinates>{},{},{}</kml:coordinates>",
                station.lon, station.lat, station.altitude
            )?;
            writeln!(out, "            </kml:Point>")?;
        }
        writeln!(out, "        </kml:Placemark>")
    }
}

/// A KMZ archive with the given `(name, content)` entries.
pub fn kmz_with_entries(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        zip.start_file(*name, FileOptions::default())
            .expect("start zip entry");
        zip.write_all(content.as_bytes()).expect("write zip entry");
    }
    zip.finish().expect("finish zip archive").into_inner()
}

fn format_instant(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
