//! MOSMIX element dictionary.

use weather_common::Element;

/// Token marking a missing value in a forecast value array.
pub const MISSING_VALUE: &str = "-";

/// Forecast elements extracted from every placemark, keyed by their
/// `dwd:elementName` attribute, in extraction order.
///
/// MOSMIX already publishes SI units (K, Pa, m/s, m, s, kg/m²), so the
/// values are stored without conversion.
pub const MOSMIX_ELEMENTS: [(&str, Element); 11] = [
    ("DD", Element::WindDirection),
    ("FF", Element::WindSpeed),
    ("FX1", Element::WindGustSpeed),
    ("N", Element::CloudCover),
    ("PPPP", Element::PressureMsl),
    ("RR1c", Element::Precipitation),
    ("SunD1", Element::Sunshine),
    ("Td", Element::DewPoint),
    ("TTT", Element::Temperature),
    ("VV", Element::Visibility),
    ("ww", Element::PresentWeather),
];
