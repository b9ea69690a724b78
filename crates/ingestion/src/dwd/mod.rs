//! DWD (Deutscher Wetterdienst) sources: MOSMIX point forecasts, current
//! station observations and the station catalogue built from MOSMIX.

mod current;
mod mosmix;
mod stations;

pub use current::{beob_url, ingest_current, parse_observations};
pub use mosmix::{download_mosmix, ingest_mosmix, MOSMIX_URL};
pub use stations::{
    build_catalogue, read_id_list, read_station_csv, write_station_csv, zoom_level, Catalogue,
    DwdStation, StationLists,
};
