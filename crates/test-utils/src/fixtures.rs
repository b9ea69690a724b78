//! Source payload fixtures.
//!
//! Small, hand-written samples of every upstream format besides MOSMIX
//! (see [`crate::generators`] for that). Values are chosen so tests can
//! assert on converted results.

/// DWD station catalogue: Frankfurt reports observations, Hamburg is
/// forecast-only, Duesseldorf is a city at admin level 6.
pub fn dwd_station_csv() -> &'static str {
    "10637,1420,1,FRANKFURT/M-FLUGHAFEN,Frankfurt am Main,50.05,8.6,111.0,town,8,active\n\
     P0489,,0,HAMBURG INNENSTADT,Hamburg,53.55,9.98,8.0,city,4,active\n\
     10400,1078,1,DUESSELDORF,Duesseldorf,51.3,6.77,37.0,city,6,active\n"
}

/// ARSO station list with one station on the coast.
pub fn arso_stations_json() -> &'static str {
    r#"[
  {
    "id": "_LJUBL-ANA_BEZIGRAD_",
    "title": "Ljubljana",
    "latitude": 46.0658,
    "longitude": 14.5172,
    "altitude": "299",
    "zoomLevel": 5,
    "country": "SI",
    "parentId": "_SI_OSREDNJESLOVENSKA_"
  },
  {
    "id": "KOPER_KAPITANIJA",
    "title": "Koper",
    "latitude": "45.5482",
    "longitude": "13.7295",
    "altitude": 3,
    "zoomLevel": 3,
    "country": "SI",
    "parentId": "_SI_PRIMORSKA_"
  }
]"#
}

/// Header of a DWD `-BEOB.csv` observation report.
const BEOB_HEADER: &str = "surface observations;Parameter description;cloud_cover_total;\
dew_point_temperature_at_2_meter_above_ground;dry_bulb_temperature_at_2_meter_above_ground;\
horizontal_visibility;maximum_wind_speed_last_hour;\
mean_wind_direction_during_last_10 min_at_10_meters_above_ground;\
mean_wind_speed_during last_10_min_at_10_meters_above_ground;precipitation_amount_last_hour;\
present_weather;pressure_reduced_to_mean_sea_level;relative_humidity;\
total_time_of_sunshine_during_last_hour";

/// Observation report for `station`. The newest row is 15 Jan 2024 12:00
/// UTC with 3,4 °C, a 370° wind direction and missing visibility.
pub fn beob_csv(station: &str) -> String {
    format!(
        "{header}\n\
         {station}_;Einheit;%;Grad C;Grad C;km;km/h;Grad;km/h;mm;CODE_TABLE;hPa;%;min\n\
         Datum;Uhrzeit (UTC);Wolkenbedeckung;Taupunkttemperatur (2m);Temperatur (2m);Sichtweite;\
         Windboen (letzte Stunde);Windrichtung;Windgeschwindigkeit;Niederschlag (letzte Stunde);\
         aktuelles Wetter;Druck (auf Meereshoehe);Relative Feuchte;Sonnenscheindauer (letzte Stunde)\n\
         15.01.24;12:00;75;-1,2;3,4;---;36;370;18;0,0;2;1013,2;80;30\n\
         15.01.24;11:00;100;-1,4;2,9;20,0;29;250;14;0,3;61;1013,6;86;0\n",
        header = BEOB_HEADER,
        station = station,
    )
}

/// ARSO nowcast snapshot with one listed and one unlisted station.
pub fn arso_nowcast_json() -> &'static str {
    r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "geometry": { "type": "Point", "coordinates": [14.5172, 46.0658] },
      "properties": {
        "id": "_LJUBL-ANA_BEZIGRAD_",
        "title": "Ljubljana",
        "days": [
          {
            "date": "2024-01-15",
            "timeline": [
              {
                "valid": "2024-01-15T12:00:00+0000",
                "clouds_icon_wwsyn_icon": "prevCloudy_day",
                "t": "3",
                "rh": "80",
                "msl": "1021",
                "ff_val": "2",
                "dd_shortText": "JZ"
              }
            ]
          }
        ]
      }
    },
    {
      "type": "Feature",
      "geometry": { "type": "Point", "coordinates": [15.0, 46.0] },
      "properties": {
        "id": "_UNLISTED_",
        "days": [
          {
            "timeline": [
              {
                "valid": "2024-01-15T12:00:00+0000",
                "t": "1",
                "rh": "",
                "msl": "",
                "ff_val": "",
                "dd_shortText": ""
              }
            ]
          }
        ]
      }
    },
    {
      "type": "Feature"
    }
  ]
}"#
}

/// ARSO daily forecast snapshot with a temperature range and calm wind.
pub fn arso_forecast_json() -> &'static str {
    r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": {
        "id": "KOPER_KAPITANIJA",
        "days": [
          {
            "timeline": [
              {
                "valid": "2024-01-17T00:00:00+0000",
                "clouds_icon_wwsyn_icon": "clear_day",
                "txsyn": "12",
                "tnsyn": "4",
                "t": "",
                "rh": "",
                "msl": "1018",
                "ff_val": "",
                "dd_shortText": ""
              }
            ]
          }
        ]
      }
    }
  ]
}"#
}

/// MeteoAlarm Atom feed with `(identifier, expires, cap_url)` entries.
pub fn meteoalarm_feed(entries: &[(&str, &str, &str)]) -> String {
    let mut feed = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:cap="urn:oasis:names:tc:emergency:cap:1.2">
  <id>https://feeds.meteoalarm.org/feeds/meteoalarm-legacy-atom-slovenia</id>
  <title>MeteoAlarm Slovenia</title>
  <updated>2024-01-15T06:00:00Z</updated>
"#,
    );

    for (identifier, expires, cap_url) in entries {
        feed.push_str(&format!(
            r#"  <entry>
    <cap:areaDesc>Osrednja Slovenija</cap:areaDesc>
    <cap:event>Wind warning</cap:event>
    <cap:expires>{expires}</cap:expires>
    <cap:identifier>{identifier}</cap:identifier>
    <id>https://feeds.meteoalarm.org/api/v1/warnings/feeds-slovenia/{identifier}</id>
    <link href="https://feeds.meteoalarm.org/api/v1/warnings/feeds-slovenia/{identifier}" hreflang="en" title="Wind warning"/>
    <link type="application/cap+xml" href="{cap_url}"/>
    <title>Wind warning</title>
    <updated>2024-01-15T06:00:00Z</updated>
  </entry>
"#
        ));
    }

    feed.push_str("</feed>\n");
    feed
}

/// CAP alert with Slovenian and English info blocks, valid on 15 Jan 2024
/// 12:00 to 18:00 UTC.
pub fn cap_alert(identifier: &str, awareness_type: &str, severity: &str, emma_ids: &[&str]) -> String {
    let areas: String = emma_ids
        .iter()
        .map(|code| {
            format!(
                "    <area>\n      <areaDesc>Area {code}</areaDesc>\n      <geocode>\n        <valueName>EMMA_ID</valueName>\n        <value>{code}</value>\n      </geocode>\n    </area>\n"
            )
        })
        .collect();

    let info = |language: &str, event: &str, headline: &str, description: &str| {
        format!(
            r#"  <info>
    <language>{language}</language>
    <category>Met</category>
    <event>{event}</event>
    <responseType>Monitor</responseType>
    <urgency>Future</urgency>
    <severity>{severity}</severity>
    <certainty>Likely</certainty>
    <onset>2024-01-15T12:00:00+00:00</onset>
    <expires>2024-01-15T18:00:00+00:00</expires>
    <senderName>ARSO</senderName>
    <headline>{headline}</headline>
    <description> {description} </description>
    <web>https://meteo.arso.gov.si</web>
    <parameter>
      <valueName>awareness_level</valueName>
      <value>2; yellow; Moderate</value>
    </parameter>
    <parameter>
      <valueName>awareness_type</valueName>
      <value>{awareness_type}</value>
    </parameter>
{areas}  </info>
"#
        )
    };

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<alert xmlns="urn:oasis:names:tc:emergency:cap:1.2">
  <identifier>{identifier}</identifier>
  <sender>meteo@arso.gov.si</sender>
  <sent>2024-01-15T06:00:00+00:00</sent>
  <status>Actual</status>
  <msgType>Alert</msgType>
  <scope>Public</scope>
{sl}{en}</alert>
"#,
        sl = info("sl", "Veter", "Opozorilo za veter", "Sunki vetra do 70 km/h."),
        en = info("en-GB", "Wind", "Wind warning", "Wind gusts up to 70 km/h."),
    )
}

/// MeteoAlarm area list for Slovenia (polygons omitted).
pub fn meteoalarm_areas_json() -> &'static str {
    r#"[
  {"code": "SI006", "name": "Severovzhodna Slovenija", "description": "Slovenia / North-East", "polygons": []},
  {"code": "SI009", "name": "Osrednja Slovenija", "description": "Slovenia / Central", "polygons": []},
  {"code": "SI801", "name": "Obala Slovenije", "description": "Slovenia / Sea", "polygons": []}
]"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beob_shape() {
        let csv = beob_csv("10637");
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 5);

        let columns = lines[0].split(';').count();
        assert!(lines.iter().all(|line| line.split(';').count() == columns));
        assert!(lines[1].starts_with("10637_;"));
    }

    #[test]
    fn test_feed_entries() {
        let feed = meteoalarm_feed(&[
            ("a", "2024-01-15T18:00:00+00:00", "https://example.org/a.cap"),
            ("b", "2024-01-15T18:00:00+00:00", "https://example.org/b.cap"),
        ]);
        assert_eq!(feed.matches("<entry>").count(), 2);
        assert!(feed.contains("application/cap+xml"));
    }

    #[test]
    fn test_cap_areas() {
        let cap = cap_alert("id", "1; Wind", "Moderate", &["SI009", "SI010"]);
        assert_eq!(cap.matches("<info>").count(), 2);
        assert_eq!(cap.matches("EMMA_ID").count(), 4);
    }
}
