//! Merges the two JMA forecast documents into one record per calendar date.
//!
//! The feed delivers a JSON array of two documents:
//! - index 0, short range (~3 days): weather/wind/wave per day, precipitation
//!   in 6-hour slots, and min/max temperature for tomorrow
//! - index 1, week range (~7 days): weather code, precipitation and
//!   reliability per day, plus min/max temperatures per day
//!
//! Fields from the short-range document take precedence; the week-range
//! document only fills fields that are still empty. Missing or malformed
//! nodes anywhere in the tree read as absent, so normalization never fails.

use serde_json::Value;

use crate::types::{DailyForecasts, ReliabilityGrade};

/// The forecast feed body: short-range document first, week-range second.
pub type RawForecastPayload = Vec<Value>;

/// Normalize a forecast payload into per-date records.
///
/// Only the first two documents are read. An empty payload gives an empty map.
pub fn normalize(payload: &[Value]) -> DailyForecasts {
    let mut days = DailyForecasts::new();

    if let Some(short_range) = payload.first() {
        merge_short_range(short_range, &mut days);
    }
    if let Some(week_range) = payload.get(1) {
        merge_week_range(week_range, &mut days);
    }

    days
}

fn merge_short_range(doc: &Value, days: &mut DailyForecasts) {
    let weather = Series::from_document(doc, 0);
    if weather.has_area() {
        for (i, date) in weather.dates() {
            let record = days.entry(date.to_owned()).or_default();
            set(&mut record.weather_code, weather.value("weatherCodes", i));
            set(&mut record.weather, weather.value("weathers", i));
            set(&mut record.wind, weather.value("winds", i));
            set(&mut record.wave, weather.value("waves", i));
        }
    }

    // 6-hour slots: the first non-empty slot of a date wins
    let pops = Series::from_document(doc, 1);
    if pops.has_area() {
        for (i, date) in pops.dates() {
            let record = days.entry(date.to_owned()).or_default();
            fill(&mut record.pop, pops.value("pops", i));
        }
    }

    // temps[0] is tomorrow's minimum and temps[1] tomorrow's maximum
    let temps = Series::from_document(doc, 2);
    if temps.has_area() && temps.len() >= 2 {
        if let Some((_, tomorrow)) = temps.dates().next() {
            let record = days.entry(tomorrow.to_owned()).or_default();
            set(&mut record.temp_min, temps.value("temps", 0));
            set(&mut record.temp_max, temps.value("temps", 1));
        }
    }
}

fn merge_week_range(doc: &Value, days: &mut DailyForecasts) {
    let weekly = Series::from_document(doc, 0);
    if weekly.has_area() {
        for (i, date) in weekly.dates() {
            let record = days.entry(date.to_owned()).or_default();
            fill(&mut record.weather_code, weekly.value("weatherCodes", i));
            fill(&mut record.pop, weekly.value("pops", i));
            if let Some(grade) = weekly.value("reliabilities", i) {
                match grade.parse::<ReliabilityGrade>() {
                    Ok(grade) => record.reliability = Some(grade),
                    Err(e) => tracing::debug!("Ignoring reliability for {}: {}", date, e),
                }
            }
        }
    }

    let temps = Series::from_document(doc, 1);
    if temps.has_area() {
        for (i, date) in temps.dates() {
            let record = days.entry(date.to_owned()).or_default();
            fill(&mut record.temp_min, temps.value("tempsMin", i));
            fill(&mut record.temp_max, temps.value("tempsMax", i));
        }
    }
}

/// Overwrite `slot` when the source has a value.
fn set(slot: &mut Option<String>, value: Option<&str>) {
    if let Some(v) = value {
        *slot = Some(v.to_owned());
    }
}

/// Populate `slot` only while it is still absent.
fn fill(slot: &mut Option<String>, value: Option<&str>) {
    if slot.is_none() {
        set(slot, value);
    }
}

/// Calendar date part of an ISO-8601 timestamp.
fn date_of(time_define: &str) -> &str {
    time_define.get(..10).unwrap_or(time_define)
}

/// One `timeSeries` entry: its `timeDefines` and the first entry of `areas`.
struct Series<'a> {
    time_defines: &'a [Value],
    area: Option<&'a Value>,
}

impl<'a> Series<'a> {
    fn from_document(doc: &'a Value, index: usize) -> Self {
        let series = doc.get("timeSeries").and_then(|ts| ts.get(index));
        let time_defines = series
            .and_then(|s| s.get("timeDefines"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let area = series
            .and_then(|s| s.get("areas"))
            .and_then(|areas| areas.get(0));

        Self { time_defines, area }
    }

    fn has_area(&self) -> bool {
        self.area.is_some()
    }

    fn len(&self) -> usize {
        self.time_defines.len()
    }

    /// `(index, date)` for every string entry of `timeDefines`.
    fn dates(&self) -> impl Iterator<Item = (usize, &'a str)> + 'a {
        let defines = self.time_defines;
        defines
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.as_str().map(|s| (i, date_of(s))))
    }

    /// Non-empty string at `index` of the area's `field` array.
    fn value(&self, field: &str, index: usize) -> Option<&'a str> {
        self.area?
            .get(field)?
            .get(index)?
            .as_str()
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use serde_json::json;

    fn short_range() -> Value {
        json!({
            "publishingOffice": "気象庁",
            "timeSeries": [
                {
                    "timeDefines": [
                        "2025-12-18T17:00:00+09:00",
                        "2025-12-19T00:00:00+09:00",
                        "2025-12-20T00:00:00+09:00"
                    ],
                    "areas": [{
                        "area": { "name": "東京地方", "code": "130010" },
                        "weatherCodes": ["101", "200", "300"],
                        "weathers": ["晴れ", "くもり", "雨"],
                        "winds": ["北の風", "北の風　やや強く", "南の風"],
                        "waves": ["０．５メートル", "１メートル", ""]
                    }]
                },
                {
                    "timeDefines": [
                        "2025-12-18T18:00:00+09:00",
                        "2025-12-19T00:00:00+09:00",
                        "2025-12-19T06:00:00+09:00",
                        "2025-12-19T12:00:00+09:00",
                        "2025-12-19T18:00:00+09:00"
                    ],
                    "areas": [{ "pops": ["10", "20", "30", "40", "50"] }]
                },
                {
                    "timeDefines": [
                        "2025-12-19T00:00:00+09:00",
                        "2025-12-19T09:00:00+09:00"
                    ],
                    "areas": [{ "temps": ["5", "13"] }]
                }
            ]
        })
    }

    fn week_range() -> Value {
        json!({
            "timeSeries": [
                {
                    "timeDefines": [
                        "2025-12-19T00:00:00+09:00",
                        "2025-12-20T00:00:00+09:00",
                        "2025-12-21T00:00:00+09:00"
                    ],
                    "areas": [{
                        "weatherCodes": ["400", "201", "101"],
                        "pops": ["90", "", "10"],
                        "reliabilities": ["", "A", "C"]
                    }]
                },
                {
                    "timeDefines": [
                        "2025-12-19T00:00:00+09:00",
                        "2025-12-20T00:00:00+09:00",
                        "2025-12-21T00:00:00+09:00"
                    ],
                    "areas": [{
                        "tempsMin": ["-1", "6", "4"],
                        "tempsMax": ["20", "14", ""]
                    }]
                }
            ]
        })
    }

    #[test]
    fn test_end_to_end_minimal_payload() {
        let payload: RawForecastPayload = serde_json::from_str(
            r#"[{"timeSeries":[{"timeDefines":["2025-12-18T17:00:00+09:00"],"areas":[{"weatherCodes":["101"],"weathers":["晴れ"],"winds":[""],"waves":[""]}]}]},{"timeSeries":[]}]"#,
        )
        .unwrap();

        let days = normalize(&payload);

        assert_eq!(days.len(), 1);
        let record = &days["2025-12-18"];
        assert_eq!(record.weather_code.as_deref(), Some("101"));
        assert_eq!(record.weather.as_deref(), Some("晴れ"));
        assert_eq!(record.wind, None);
        assert_eq!(record.wave, None);
        assert_eq!(record.reliability, None);
    }

    #[test]
    fn test_short_range_wins_over_week_range() {
        let days = normalize(&[short_range(), week_range()]);

        // 2025-12-19 has "200" short range and "400" week range
        assert_eq!(days["2025-12-19"].weather_code.as_deref(), Some("200"));
        assert_eq!(days["2025-12-20"].weather_code.as_deref(), Some("300"));
        // Only in the week range
        assert_eq!(days["2025-12-21"].weather_code.as_deref(), Some("101"));
    }

    #[test]
    fn test_tomorrow_temperatures_come_from_short_range() {
        let days = normalize(&[short_range(), week_range()]);

        let tomorrow = &days["2025-12-19"];
        assert_eq!(tomorrow.temp_min.as_deref(), Some("5"));
        assert_eq!(tomorrow.temp_max.as_deref(), Some("13"));

        let later = &days["2025-12-20"];
        assert_eq!(later.temp_min.as_deref(), Some("6"));
        assert_eq!(later.temp_max.as_deref(), Some("14"));
    }

    #[test]
    fn test_first_precipitation_slot_of_a_day_wins() {
        let days = normalize(&[short_range(), week_range()]);

        assert_eq!(days["2025-12-18"].pop.as_deref(), Some("10"));
        // 00:00 slot wins over 06:00/12:00/18:00 and over the week range's "90"
        assert_eq!(days["2025-12-19"].pop.as_deref(), Some("20"));
    }

    #[test]
    fn test_empty_precipitation_values_stay_absent() {
        let doc = json!({
            "timeSeries": [
                { "timeDefines": [], "areas": [{}] },
                {
                    "timeDefines": ["2025-12-18T12:00:00+09:00", "2025-12-19T00:00:00+09:00"],
                    "areas": [{ "pops": ["", "30"] }]
                }
            ]
        });

        let days = normalize(&[doc]);

        assert_eq!(days["2025-12-18"].pop, None);
        assert_eq!(days["2025-12-19"].pop.as_deref(), Some("30"));
    }

    #[test]
    fn test_later_empty_slot_does_not_block_week_range_fill() {
        let days = normalize(&[short_range(), week_range()]);

        // Week range pop for 2025-12-20 is empty and the short range has no slot
        assert_eq!(days["2025-12-20"].pop, None);
        assert_eq!(days["2025-12-21"].pop.as_deref(), Some("10"));
    }

    #[test]
    fn test_reliability_only_from_week_range() {
        let days = normalize(&[short_range(), week_range()]);

        assert_eq!(days["2025-12-18"].reliability, None);
        assert_eq!(days["2025-12-19"].reliability, None);
        assert_eq!(days["2025-12-20"].reliability, Some(ReliabilityGrade::A));
        assert_eq!(days["2025-12-21"].reliability, Some(ReliabilityGrade::C));
    }

    #[test]
    fn test_unknown_reliability_grade_is_absent() {
        let week = json!({
            "timeSeries": [{
                "timeDefines": ["2025-12-21T00:00:00+09:00"],
                "areas": [{ "weatherCodes": ["101"], "reliabilities": ["Z"] }]
            }]
        });

        let days = normalize(&[json!({}), week]);

        assert_eq!(days["2025-12-21"].weather_code.as_deref(), Some("101"));
        assert_eq!(days["2025-12-21"].reliability, None);
    }

    #[test]
    fn test_empty_week_range_temperature_stays_absent() {
        let days = normalize(&[short_range(), week_range()]);
        assert_eq!(days["2025-12-21"].temp_min.as_deref(), Some("4"));
        assert_eq!(days["2025-12-21"].temp_max, None);
    }

    #[test]
    fn test_short_arrays_yield_absent_fields() {
        let doc = json!({
            "timeSeries": [{
                "timeDefines": [
                    "2025-12-18T17:00:00+09:00",
                    "2025-12-19T00:00:00+09:00"
                ],
                "areas": [{ "weatherCodes": ["101"], "weathers": ["晴れ"] }]
            }]
        });

        let days = normalize(&[doc]);

        assert_eq!(days.len(), 2);
        assert_eq!(days["2025-12-19"].weather_code, None);
        assert!(days["2025-12-19"].is_empty());
    }

    #[test]
    fn test_single_temperature_entry_is_ignored() {
        let doc = json!({
            "timeSeries": [
                { "timeDefines": [], "areas": [{}] },
                { "timeDefines": [], "areas": [{}] },
                {
                    "timeDefines": ["2025-12-19T00:00:00+09:00"],
                    "areas": [{ "temps": ["5"] }]
                }
            ]
        });

        assert!(normalize(&[doc]).is_empty());
    }

    #[test]
    fn test_empty_payload_gives_empty_map() {
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn test_short_range_only_has_no_reliability() {
        let days = normalize(&[short_range()]);

        assert_eq!(days.len(), 3);
        assert!(days.values().all(|r| r.reliability.is_none()));
        assert_eq!(days["2025-12-20"].temp_min, None);
    }

    #[test]
    fn test_malformed_nodes_are_tolerated() {
        let payload = vec![
            json!({ "timeSeries": "not an array" }),
            json!({
                "timeSeries": [
                    { "timeDefines": [42, null, "2025-12-22T00:00:00+09:00"],
                      "areas": [{ "weatherCodes": ["101", "102", 103] }] },
                    { "areas": "broken" }
                ]
            }),
        ];

        let days = normalize(&payload);

        // Only the string timeDefine produces a date, and its value is a number
        assert_eq!(days.len(), 1);
        assert_eq!(days["2025-12-22"].weather_code, None);
    }

    #[test]
    fn test_series_without_areas_creates_no_dates() {
        let doc = json!({
            "timeSeries": [{ "timeDefines": ["2025-12-18T17:00:00+09:00"], "areas": [] }]
        });
        assert!(normalize(&[doc]).is_empty());
    }

    #[test]
    fn test_extra_documents_are_ignored() {
        let with_extra = vec![short_range(), week_range(), week_range()];
        assert_eq!(normalize(&with_extra), normalize(&[short_range(), week_range()]));
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let payload = vec![short_range(), week_range()];
        let first = normalize(&payload);
        let second = normalize(&payload);
        assert_eq!(first, second);

        let dates: Vec<&String> = first.keys().collect();
        assert_eq!(dates, ["2025-12-18", "2025-12-19", "2025-12-20", "2025-12-21"]);
    }

    #[test]
    fn test_date_of_short_string() {
        assert_eq!(date_of("2025-12"), "2025-12");
        assert_eq!(date_of("2025-12-18T17:00:00+09:00"), "2025-12-18");
    }
}
