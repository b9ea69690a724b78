//! Unit conversions to the stored SI units.

pub fn celsius_to_kelvin(temperature: f64) -> f64 {
    round_to(temperature + 273.15, 2)
}

pub fn hpa_to_pa(pressure: f64) -> f64 {
    (pressure * 100.0).trunc()
}

pub fn km_to_m(distance: f64) -> f64 {
    distance * 1000.0
}

pub fn kmh_to_ms(speed: f64) -> f64 {
    round_to(speed / 3.6, 1)
}

pub fn minutes_to_seconds(duration: f64) -> f64 {
    (duration * 60.0).trunc()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_temperature() {
        assert_approx_eq!(celsius_to_kelvin(31.4), 304.55, 1e-9);
        assert_approx_eq!(celsius_to_kelvin(-5.0), 268.15, 1e-9);
    }

    #[test]
    fn test_speed() {
        assert_approx_eq!(kmh_to_ms(100.0), 27.8, 1e-9);
        assert_approx_eq!(kmh_to_ms(0.0), 0.0, 1e-9);
    }

    #[test]
    fn test_truncating_conversions() {
        assert_eq!(hpa_to_pa(1013.25), 101325.0);
        assert_eq!(hpa_to_pa(1008.7), 100870.0);
        assert_eq!(minutes_to_seconds(0.5), 30.0);
        assert_eq!(km_to_m(12.5), 12500.0);
    }
}
