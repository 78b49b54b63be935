//! Weather provider and connectivity probe.
//!
//! The control loop only sees the [`WeatherSource`] and [`ConnectivityProbe`]
//! traits. [`WundergroundClient`] and [`HttpProbe`] implement them with
//! blocking `reqwest` calls; each request is bounded by the client timeout,
//! and a timeout is the only failure reported as transient.

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::forecast::{self, ForecastSample};

/// Trait for anything that can produce forecast samples.
pub trait WeatherSource {
    /// Fetches the forecast for `hours_ahead` hours from now, stamping the
    /// sample with `retrieved_at`.
    ///
    /// A [`FetchError`] for which [`is_transient`](FetchError::is_transient)
    /// holds should be retried later; any other error is terminal.
    fn fetch(
        &mut self,
        hours_ahead: u8,
        retrieved_at: DateTime<Utc>,
    ) -> Result<ForecastSample, FetchError>;
}

/// Trait for the startup connectivity check.
pub trait ConnectivityProbe {
    fn is_reachable(&self) -> bool;
}

/// A forecast location in `region/city` form, e.g. `UK/Bristol` or
/// `TX/El_Paso`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub region: String,
    pub city: String,
}

impl FromStr for Location {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((region, city))
                if !region.is_empty() && !city.is_empty() && !city.contains('/') =>
            {
                Ok(Self {
                    region: region.to_string(),
                    city: city.to_string(),
                })
            }
            _ => Err(format!("location `{s}` is not in region/city form")),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.region, self.city)
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(err.to_string())
    } else {
        FetchError::Request(err.to_string())
    }
}

/// Hourly forecast client for the wunderground-style API.
pub struct WundergroundClient {
    client: Client,
    base_url: String,
    api_key: String,
    location: Location,
}

impl WundergroundClient {
    /// Creates a client. Every request is bounded by `timeout`.
    pub fn new(
        base_url: &str,
        api_key: String,
        location: Location,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build().map_err(classify)?;

        Ok(Self {
            client,
            base_url: format!("{}/", base_url.trim_end_matches('/')),
            api_key,
            location,
        })
    }

    /// Request url for the hourly forecast.
    pub fn url(&self) -> String {
        format!("{}{}/hourly/q/{}.json", self.base_url, self.api_key, self.location)
    }
}

impl WeatherSource for WundergroundClient {
    fn fetch(
        &mut self,
        hours_ahead: u8,
        retrieved_at: DateTime<Utc>,
    ) -> Result<ForecastSample, FetchError> {
        debug!(location = %self.location, hours_ahead, "fetching hourly forecast");

        let response = self.client.get(self.url()).send().map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            warn!(%status, "forecast request rejected");
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().map_err(classify)?;
        let sample = forecast::extract(&body, usize::from(hours_ahead), retrieved_at)?;

        info!(location = %self.location, "forecast loaded");
        Ok(sample)
    }
}

/// Connectivity check that requests a url and expects a non-error status.
pub struct HttpProbe {
    client: Client,
    url: String,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build().map_err(classify)?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl ConnectivityProbe for HttpProbe {
    fn is_reachable(&self) -> bool {
        match self.client.get(&self.url).send().and_then(|r| r.error_for_status()) {
            Ok(_) => true,
            Err(err) => {
                debug!("connectivity probe failed: {}", err);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_parses_region_and_city() {
        let location: Location = "UK/Bristol".parse().unwrap();
        assert_eq!(location.region, "UK");
        assert_eq!(location.city, "Bristol");
        assert_eq!(location.to_string(), "UK/Bristol");
    }

    #[test]
    fn location_requires_two_parts() {
        assert!("Bristol".parse::<Location>().is_err());
        assert!("/Bristol".parse::<Location>().is_err());
        assert!("UK/".parse::<Location>().is_err());
        assert!("UK/England/Bristol".parse::<Location>().is_err());
    }

    #[test]
    fn url_includes_key_and_location() {
        let client = WundergroundClient::new(
            "http://api.example.com/api",
            "0123456789abcdef".into(),
            "TX/El_Paso".parse().unwrap(),
            Duration::from_secs(2),
        )
        .unwrap();

        assert_eq!(
            client.url(),
            "http://api.example.com/api/0123456789abcdef/hourly/q/TX/El_Paso.json"
        );
    }
}
