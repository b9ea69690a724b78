//! Weather code to [`Condition`] lookup tables.
//!
//! Each table lists ascending thresholds; a code maps to the entry with the
//! largest threshold not above it. Codes below the first threshold have no
//! condition.

use weather_common::Condition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionTable {
    name: &'static str,
    entries: &'static [(i64, Option<Condition>)],
}

/// SYNOP past weather (MOSMIX `ww`).
pub const SYNOP_PAST_WEATHER: ConditionTable = ConditionTable {
    name: "synop_past_weather",
    entries: &[
        (0, Some(Condition::Dry)),
        (4, Some(Condition::Fog)),
        (5, Some(Condition::Rain)),
        (7, Some(Condition::Snow)),
        (8, Some(Condition::Rain)),
        (9, Some(Condition::Thunderstorm)),
        (10, Some(Condition::Dry)),
        (11, Some(Condition::Fog)),
        (14, Some(Condition::Rain)),
        (17, Some(Condition::Snow)),
        (18, Some(Condition::Rain)),
        (19, Some(Condition::Thunderstorm)),
        (20, None),
    ],
};

/// Present weather as reported in DWD station observations.
pub const CURRENT_OBSERVATIONS: ConditionTable = ConditionTable {
    name: "current_observations",
    entries: &[
        (1, Some(Condition::Dry)),
        (5, Some(Condition::Fog)),
        (7, Some(Condition::Rain)),
        (10, Some(Condition::Sleet)),
        (14, Some(Condition::Snow)),
        (18, Some(Condition::Rain)),
        (20, Some(Condition::Sleet)),
        (22, Some(Condition::Snow)),
        (26, Some(Condition::Thunderstorm)),
        (29, Some(Condition::Hail)),
        (31, Some(Condition::Dry)),
        (32, None),
    ],
};

impl ConditionTable {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Condition for a weather code; fractional codes are truncated.
    pub fn lookup(&self, code: f64) -> Option<Condition> {
        let code = code.trunc() as i64;
        let mut condition = None;
        for (threshold, value) in self.entries {
            if *threshold > code {
                break;
            }
            condition = *value;
        }
        condition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synop_past_weather() {
        assert_eq!(SYNOP_PAST_WEATHER.lookup(0.0), Some(Condition::Dry));
        assert_eq!(SYNOP_PAST_WEATHER.lookup(3.0), Some(Condition::Dry));
        assert_eq!(SYNOP_PAST_WEATHER.lookup(4.0), Some(Condition::Fog));
        assert_eq!(SYNOP_PAST_WEATHER.lookup(6.0), Some(Condition::Rain));
        assert_eq!(SYNOP_PAST_WEATHER.lookup(19.0), Some(Condition::Thunderstorm));
        assert_eq!(SYNOP_PAST_WEATHER.lookup(61.0), None);
        assert_eq!(SYNOP_PAST_WEATHER.lookup(-1.0), None);
    }

    #[test]
    fn test_current_observations() {
        assert_eq!(CURRENT_OBSERVATIONS.lookup(0.0), None);
        assert_eq!(CURRENT_OBSERVATIONS.lookup(1.0), Some(Condition::Dry));
        assert_eq!(CURRENT_OBSERVATIONS.lookup(12.0), Some(Condition::Sleet));
        assert_eq!(CURRENT_OBSERVATIONS.lookup(27.0), Some(Condition::Thunderstorm));
        assert_eq!(CURRENT_OBSERVATIONS.lookup(29.5), Some(Condition::Hail));
        assert_eq!(CURRENT_OBSERVATIONS.lookup(31.0), Some(Condition::Dry));
        assert_eq!(CURRENT_OBSERVATIONS.lookup(40.0), None);
    }
}
