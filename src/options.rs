// Copyright (C) 2018 Stephane Raux. Distributed under the MIT license.

use serde::{Deserialize, Deserializer};
use serde::de::Error as _;
use serde_derive::{Deserialize, Serialize};
use std::fmt::{Display, self};
use std::time::Duration;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Scheme::Http => f.write_str("http"),
            Scheme::Https => f.write_str("https"),
        }
    }
}

/// Settings shared by every geocoder.
///
/// Deserializes from JSON such as
/// `{"scheme": "https", "timeout": 2.5, "user_agent": "my-app/1.0"}`, every
/// field being optional.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Options {
    scheme: Option<Scheme>,
    #[serde(deserialize_with = "deserialize_secs")]
    timeout: Duration,
    user_agent: Option<String>,
}

impl Options {
    pub const DEFAULT_SCHEME: Scheme = Scheme::Https;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);
    pub const DEFAULT_USER_AGENT: &'static str =
        concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = Some(scheme);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Scheme explicitly requested, if any. Each geocoder picks its own
    /// default otherwise.
    pub fn get_scheme(&self) -> Option<Scheme> {
        self.scheme
    }

    pub fn get_timeout(&self) -> Duration {
        self.timeout
    }

    pub fn get_user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(Self::DEFAULT_USER_AGENT)
    }
}

impl Default for Options {
    fn default() -> Self {
        Options {
            scheme: None,
            timeout: Self::DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }
}

fn deserialize_secs<'de, D>(d: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(d)?;
    Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = Options::default();
        assert_eq!(options.get_scheme(), None);
        assert_eq!(options.get_timeout(), Duration::from_secs(1));
        assert!(options.get_user_agent().starts_with("geocoders/"));
    }

    #[test]
    fn builder_overrides() {
        let options = Options::default()
            .scheme(Scheme::Http)
            .timeout(Duration::from_millis(250))
            .user_agent("my_user_agent/1.0");
        assert_eq!(options.get_scheme(), Some(Scheme::Http));
        assert_eq!(options.get_timeout(), Duration::from_millis(250));
        assert_eq!(options.get_user_agent(), "my_user_agent/1.0");
    }

    #[test]
    fn from_json() {
        let options: Options = serde_json::from_str(
            r#"{"scheme": "http", "timeout": 2.5}"#).unwrap();
        assert_eq!(options.get_scheme(), Some(Scheme::Http));
        assert_eq!(options.get_timeout(), Duration::from_millis(2500));
        assert_eq!(options.get_user_agent(), Options::DEFAULT_USER_AGENT);
        assert!(serde_json::from_str::<Options>(r#"{"timeout": -1}"#).is_err());
    }
}
