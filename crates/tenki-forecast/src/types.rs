use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Normalized forecasts keyed by calendar date (`YYYY-MM-DD`).
///
/// ISO dates sort lexicographically, so iteration is in date order.
pub type DailyForecasts = BTreeMap<String, NormalizedDayRecord>;

/// Forecast confidence attached to week-range entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReliabilityGrade {
    A,
    B,
    C,
}

impl ReliabilityGrade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::A => "High confidence",
            Self::B => "Moderate confidence",
            Self::C => "Low confidence",
        }
    }
}

impl std::fmt::Display for ReliabilityGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown reliability grade: {0:?}")]
pub struct UnknownGrade(pub String);

impl FromStr for ReliabilityGrade {
    type Err = UnknownGrade;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            other => Err(UnknownGrade(other.to_string())),
        }
    }
}

/// Coarse weather category derived from a JMA weather code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCategory {
    #[default]
    Sunny,
    Cloudy,
    Rainy,
    Snowy,
}

impl WeatherCategory {
    /// Classify a JMA weather code by its hundreds digit.
    ///
    /// 1xx is fair, 2xx cloudy, 3xx rain, anything from 400 up snow.
    /// Empty or non-numeric codes fall back to sunny.
    pub fn from_code(code: &str) -> Self {
        let Ok(num) = code.parse::<u32>() else {
            return Self::Sunny;
        };
        match num {
            0..=199 => Self::Sunny,
            200..=299 => Self::Cloudy,
            300..=399 => Self::Rainy,
            _ => Self::Snowy,
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Sunny => "Sunny",
            Self::Cloudy => "Cloudy",
            Self::Rainy => "Rainy",
            Self::Snowy => "Snowy",
        }
    }
}

/// Weather for one calendar date, merged from both feed documents.
///
/// Every field is optional: `None` means the feed supplied nothing usable,
/// which is not the same as a zero value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedDayRecord {
    pub weather_code: Option<String>,
    pub weather: Option<String>,
    pub wind: Option<String>,
    pub wave: Option<String>,
    /// Probability of precipitation, percent
    pub pop: Option<String>,
    pub temp_min: Option<String>,
    pub temp_max: Option<String>,
    pub reliability: Option<ReliabilityGrade>,
}

impl NormalizedDayRecord {
    pub fn category(&self) -> Option<WeatherCategory> {
        self.weather_code.as_deref().map(WeatherCategory::from_code)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A stored day record together with its date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayEntry {
    pub date: String,
    #[serde(flatten)]
    pub record: NormalizedDayRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_sunny() {
        assert_eq!(WeatherCategory::from_code("100"), WeatherCategory::Sunny);
        assert_eq!(WeatherCategory::from_code("119"), WeatherCategory::Sunny);
    }

    #[test]
    fn test_category_cloudy() {
        assert_eq!(WeatherCategory::from_code("200"), WeatherCategory::Cloudy);
        assert_eq!(WeatherCategory::from_code("281"), WeatherCategory::Cloudy);
    }

    #[test]
    fn test_category_rainy() {
        assert_eq!(WeatherCategory::from_code("300"), WeatherCategory::Rainy);
        assert_eq!(WeatherCategory::from_code("371"), WeatherCategory::Rainy);
    }

    #[test]
    fn test_category_snowy() {
        assert_eq!(WeatherCategory::from_code("400"), WeatherCategory::Snowy);
        assert_eq!(WeatherCategory::from_code("450"), WeatherCategory::Snowy);
    }

    #[test]
    fn test_category_unparseable_defaults_to_sunny() {
        assert_eq!(WeatherCategory::from_code(""), WeatherCategory::Sunny);
        assert_eq!(WeatherCategory::from_code("abc"), WeatherCategory::Sunny);
    }

    #[test]
    fn test_reliability_parse() {
        assert_eq!("A".parse::<ReliabilityGrade>(), Ok(ReliabilityGrade::A));
        assert_eq!("C".parse::<ReliabilityGrade>(), Ok(ReliabilityGrade::C));
        assert!("D".parse::<ReliabilityGrade>().is_err());
        assert!("".parse::<ReliabilityGrade>().is_err());
    }

    #[test]
    fn test_reliability_description() {
        assert_eq!(ReliabilityGrade::A.description(), "High confidence");
        assert_eq!(ReliabilityGrade::C.description(), "Low confidence");
    }

    #[test]
    fn test_record_category_absent_without_code() {
        let record = NormalizedDayRecord::default();
        assert!(record.is_empty());
        assert_eq!(record.category(), None);
    }

    #[test]
    fn test_day_entry_serializes_flat() {
        let entry = DayEntry {
            date: "2025-12-18".to_string(),
            record: NormalizedDayRecord {
                weather_code: Some("101".to_string()),
                reliability: Some(ReliabilityGrade::B),
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["date"], "2025-12-18");
        assert_eq!(json["weather_code"], "101");
        assert_eq!(json["reliability"], "B");
        assert!(json["wind"].is_null());
    }
}
