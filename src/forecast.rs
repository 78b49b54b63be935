//! Forecast samples and their extraction from the provider's hourly JSON.
//!
//! Only the handful of fields the light needs are read. The provider sends
//! most numbers as strings (`"temp": {"metric": "12"}`), so every field goes
//! through an explicit, fallible conversion instead of a key lookup at the
//! point of use.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ExtractError;

/// The forecast values for one hour, as consumed by the mapper.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSample {
    /// When the forecast was retrieved.
    pub retrieved_at: DateTime<Utc>,

    /// Hour the forecast applies to.
    pub forecast_at: DateTime<Utc>,

    /// Temperature in degrees Celsius.
    pub temperature_c: f64,

    /// Wind speed in km/h.
    pub wind_kph: f64,

    /// Provider condition phrase, e.g. "Light Rain".
    pub condition: String,

    /// Probability of precipitation, 0-100.
    pub pop: u8,

    /// Quantitative precipitation forecast in cm. Zero when the provider
    /// leaves it blank or unparsable.
    pub qpf_cm: f64,
}

/// Top level of the hourly forecast response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HourlyResponse {
    #[serde(default)]
    pub response: Option<ResponseMeta>,

    #[serde(default)]
    pub hourly_forecast: Vec<HourlyEntry>,
}

/// Response metadata; carries the provider's error object on failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMeta {
    #[serde(default)]
    pub error: Option<ProviderError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderError {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub description: String,
}

/// One hour of the forecast. Fields are optional so a missing one becomes a
/// typed [`ExtractError`] instead of a decode failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HourlyEntry {
    #[serde(rename = "FCTTIME", default)]
    pub fcttime: Option<ForecastTime>,

    #[serde(default)]
    pub temp: Option<Measure>,

    #[serde(default)]
    pub wspd: Option<Measure>,

    #[serde(default)]
    pub condition: Option<String>,

    #[serde(default)]
    pub pop: Option<Scalar>,

    #[serde(default)]
    pub qpf: Option<Measure>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastTime {
    pub epoch: Scalar,
}

/// A value reported in both unit systems; only the metric one is used.
#[derive(Debug, Clone, Deserialize)]
pub struct Measure {
    pub metric: Scalar,
}

/// A number the provider may send either as a string or as a JSON number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Text(String),
}

impl Scalar {
    fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Scalar::Number(value) => Some(*value),
            Scalar::Text(text) => text.trim().parse::<f64>().ok(),
        };
        value.filter(|value| value.is_finite())
    }

    fn describe(&self) -> String {
        match self {
            Scalar::Number(value) => value.to_string(),
            Scalar::Text(text) => text.clone(),
        }
    }
}

impl HourlyResponse {
    /// Returns the provider's error object as an [`ExtractError`], if any.
    pub fn provider_error(&self) -> Option<ExtractError> {
        let error = self.response.as_ref()?.error.as_ref()?;
        Some(ExtractError::Provider {
            kind: error.kind.clone(),
            description: error.description.clone(),
        })
    }

    /// Extracts the forecast `hours_ahead` hours from now.
    ///
    /// # Errors
    /// * `Provider` - The response is a provider error
    /// * `MissingHour` - No entry for the requested hour
    /// * `MissingField` / `InvalidField` - A required value is absent or unusable
    pub fn sample(
        &self,
        hours_ahead: usize,
        retrieved_at: DateTime<Utc>,
    ) -> Result<ForecastSample, ExtractError> {
        if let Some(err) = self.provider_error() {
            return Err(err);
        }

        let entry = self
            .hourly_forecast
            .get(hours_ahead)
            .ok_or(ExtractError::MissingHour {
                index: hours_ahead,
                available: self.hourly_forecast.len(),
            })?;

        entry.to_sample(retrieved_at)
    }
}

fn number(field: &'static str, value: Option<&Scalar>) -> Result<f64, ExtractError> {
    let value = value.ok_or(ExtractError::MissingField(field))?;
    value.as_f64().ok_or_else(|| ExtractError::InvalidField {
        field,
        value: value.describe(),
    })
}

impl HourlyEntry {
    /// Converts this hour into a [`ForecastSample`].
    pub fn to_sample(&self, retrieved_at: DateTime<Utc>) -> Result<ForecastSample, ExtractError> {
        let epoch = self.fcttime.as_ref().map(|time| &time.epoch);
        let epoch_value = number("FCTTIME.epoch", epoch)?;
        let forecast_at = DateTime::from_timestamp(epoch_value as i64, 0).ok_or_else(|| {
            ExtractError::InvalidField {
                field: "FCTTIME.epoch",
                value: epoch_value.to_string(),
            }
        })?;

        let temperature_c = number("temp.metric", self.temp.as_ref().map(|m| &m.metric))?;
        let wind_kph = number("wspd.metric", self.wspd.as_ref().map(|m| &m.metric))?;

        let condition = self
            .condition
            .clone()
            .ok_or(ExtractError::MissingField("condition"))?;

        let pop_value = number("pop", self.pop.as_ref())?;
        if !(0.0..=100.0).contains(&pop_value) {
            return Err(ExtractError::InvalidField {
                field: "pop",
                value: pop_value.to_string(),
            });
        }
        let pop = pop_value.round() as u8;

        // Often an empty string when no precipitation is expected.
        let qpf_cm = self
            .qpf
            .as_ref()
            .and_then(|m| m.metric.as_f64())
            .unwrap_or(0.0);

        Ok(ForecastSample {
            retrieved_at,
            forecast_at,
            temperature_c,
            wind_kph,
            condition,
            pop,
            qpf_cm,
        })
    }
}

/// Parses a response body and extracts the forecast `hours_ahead` hours out.
pub fn extract(
    body: &str,
    hours_ahead: usize,
    retrieved_at: DateTime<Utc>,
) -> Result<ForecastSample, crate::error::FetchError> {
    let response: HourlyResponse = serde_json::from_str(body)?;
    Ok(response.sample(hours_ahead, retrieved_at)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;

    const BODY: &str = r#"{
        "response": {"version": "0.1"},
        "hourly_forecast": [
            {"FCTTIME": {"epoch": "1456786800"}, "temp": {"english": "50", "metric": "10"},
             "wspd": {"english": "9", "metric": "14"}, "condition": "Clear", "pop": "0",
             "qpf": {"english": "0.0", "metric": "0"}},
            {"FCTTIME": {"epoch": "1456790400"}, "temp": {"english": "48", "metric": "-2.5"},
             "wspd": {"english": "10", "metric": "16"}, "condition": "Light Snow", "pop": "50",
             "qpf": {"english": "", "metric": ""}}
        ]
    }"#;

    fn retrieved() -> DateTime<Utc> {
        DateTime::from_timestamp(1_456_780_000, 0).unwrap()
    }

    #[test]
    fn extracts_requested_hour() {
        let sample = extract(BODY, 1, retrieved()).unwrap();

        assert_eq!(sample.forecast_at.timestamp(), 1_456_790_400);
        assert_eq!(sample.temperature_c, -2.5);
        assert_eq!(sample.wind_kph, 16.0);
        assert_eq!(sample.condition, "Light Snow");
        assert_eq!(sample.pop, 50);
        assert_eq!(sample.retrieved_at, retrieved());
    }

    #[test]
    fn blank_qpf_defaults_to_zero() {
        let sample = extract(BODY, 1, retrieved()).unwrap();
        assert_eq!(sample.qpf_cm, 0.0);
    }

    #[test]
    fn numeric_json_values_are_accepted() {
        let body = r#"{"hourly_forecast": [{"FCTTIME": {"epoch": 1456786800},
            "temp": {"metric": 21.5}, "wspd": {"metric": 3}, "condition": "Rain",
            "pop": 80, "qpf": {"metric": 0.4}}]}"#;
        let sample = extract(body, 0, retrieved()).unwrap();

        assert_eq!(sample.temperature_c, 21.5);
        assert_eq!(sample.pop, 80);
        assert_eq!(sample.qpf_cm, 0.4);
    }

    #[test]
    fn missing_hour_is_reported() {
        let err = extract(BODY, 5, retrieved()).unwrap_err();
        assert!(matches!(
            err,
            FetchError::Malformed(ExtractError::MissingHour {
                index: 5,
                available: 2
            })
        ));
    }

    #[test]
    fn provider_error_object_is_terminal() {
        let body = r#"{"response": {"error": {"type": "keynotfound",
            "description": "this key does not exist"}}}"#;
        let err = extract(body, 0, retrieved()).unwrap_err();

        assert!(matches!(
            err,
            FetchError::Malformed(ExtractError::Provider { ref kind, .. }) if kind == "keynotfound"
        ));
        assert!(!err.is_transient());
    }

    #[test]
    fn missing_and_invalid_fields_are_typed() {
        let body = r#"{"hourly_forecast": [{"FCTTIME": {"epoch": "1"},
            "wspd": {"metric": "3"}, "condition": "Rain", "pop": "10"}]}"#;
        let err = extract(body, 0, retrieved()).unwrap_err();
        assert!(matches!(
            err,
            FetchError::Malformed(ExtractError::MissingField("temp.metric"))
        ));

        let body = r#"{"hourly_forecast": [{"FCTTIME": {"epoch": "1"},
            "temp": {"metric": "warm"}, "wspd": {"metric": "3"}, "condition": "Rain", "pop": "10"}]}"#;
        let err = extract(body, 0, retrieved()).unwrap_err();
        assert!(matches!(
            err,
            FetchError::Malformed(ExtractError::InvalidField { field: "temp.metric", .. })
        ));

        let body = r#"{"hourly_forecast": [{"FCTTIME": {"epoch": "1"},
            "temp": {"metric": "3"}, "wspd": {"metric": "3"}, "condition": "Rain", "pop": "140"}]}"#;
        let err = extract(body, 0, retrieved()).unwrap_err();
        assert!(matches!(
            err,
            FetchError::Malformed(ExtractError::InvalidField { field: "pop", .. })
        ));
    }

    #[test]
    fn garbage_body_is_a_decode_error() {
        let err = extract("<html>503</html>", 0, retrieved()).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }
}
