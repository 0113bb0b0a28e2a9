// Copyright (C) 2018 Stephane Raux. Distributed under the MIT license.

pub mod geonames;
pub mod here;
pub mod mapquest;
pub mod what3words;

use self::geonames::GeoNames;
use self::here::Here;
use self::mapquest::MapQuest;
use self::what3words::What3Words;
use crate::{Error, ErrorKind, Location, Options, Point, Timezone};
use futures::future::BoxFuture;
use futures::TryFutureExt;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, self};
use std::str::FromStr;

/// Uniform interface over geocoding services.
///
/// With `exactly_one` set, at most one location is returned. An empty result
/// is not an error.
pub trait Geocoder: Send + Sync {
    fn name(&self) -> &'static str;

    fn geocode<'a>(&'a self, query: &'a str, exactly_one: bool)
        -> BoxFuture<'a, Result<Vec<Location>, Error>>;

    fn reverse<'a>(&'a self, point: Point, exactly_one: bool)
        -> BoxFuture<'a, Result<Vec<Location>, Error>>;

    fn reverse_timezone<'a>(&'a self, _point: Point)
        -> BoxFuture<'a, Result<Timezone, Error>>
    {
        let name = self.name();
        Box::pin(async move {
            Err(Error::new(ErrorKind::Unsupported,
                format!("{} does not support timezone lookups", name)))
        })
    }

    fn geocode_one<'a>(&'a self, query: &'a str)
        -> BoxFuture<'a, Result<Option<Location>, Error>>
    {
        Box::pin(self.geocode(query, true).map_ok(|found| found.into_iter().next()))
    }

    fn reverse_one<'a>(&'a self, point: Point)
        -> BoxFuture<'a, Result<Option<Location>, Error>>
    {
        Box::pin(self.reverse(point, true).map_ok(|found| found.into_iter().next()))
    }
}

/// Kinds of geocoders this crate knows about.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Provider {
    GeoNames,
    Here,
    MapQuest,
    What3Words,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::GeoNames,
        Provider::Here,
        Provider::MapQuest,
        Provider::What3Words,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Provider::GeoNames => "geonames",
            Provider::Here => "here",
            Provider::MapQuest => "mapquest",
            Provider::What3Words => "what3words",
        }
    }
}

impl Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let wanted = s.to_lowercase();
        Provider::ALL.iter()
            .copied()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| {
                let known = Provider::ALL.iter()
                    .map(|p| p.name())
                    .collect::<Vec<_>>()
                    .join(", ");
                Error::new(ErrorKind::NotFound,
                    format!("Unknown geocoder `{}`; options are: {}", s, known))
            })
    }
}

/// Looks up a geocoder kind by service name, ignoring case.
pub fn geocoder_for_service(name: &str) -> Result<Provider, Error> {
    name.parse()
}

/// Credentials and endpoint for one geocoder, as found in configuration files.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub enum ProviderConfig {
    GeoNames {
        username: String,
        #[serde(default)]
        domain: Option<String>,
    },
    Here {
        #[serde(default)]
        app_id: Option<String>,
        #[serde(default)]
        app_code: Option<String>,
        #[serde(default)]
        apikey: Option<String>,
    },
    MapQuest {
        key: String,
        #[serde(default)]
        domain: Option<String>,
    },
    What3Words {
        api_key: String,
    },
}

impl ProviderConfig {
    pub fn provider(&self) -> Provider {
        match self {
            ProviderConfig::GeoNames {..} => Provider::GeoNames,
            ProviderConfig::Here {..} => Provider::Here,
            ProviderConfig::MapQuest {..} => Provider::MapQuest,
            ProviderConfig::What3Words {..} => Provider::What3Words,
        }
    }

    pub fn build(&self, options: &Options) -> Result<AnyGeocoder, Error> {
        let options = options.clone();
        let geocoder = match self {
            ProviderConfig::GeoNames {username, domain} => {
                let mut g = GeoNames::with_options(username.clone(), options)?;
                if let Some(domain) = domain {
                    g = g.domain(domain.clone());
                }
                AnyGeocoder::from(g)
            }
            ProviderConfig::Here {app_id, app_code, apikey} => {
                let g = match (apikey, app_id, app_code) {
                    (Some(apikey), _, _) =>
                        Here::with_api_key(apikey.clone(), options)?,
                    (None, Some(app_id), Some(app_code)) =>
                        Here::with_app_code(app_id.clone(), app_code.clone(),
                            options)?,
                    _ => return Err(Error::new(ErrorKind::Configuration,
                        "HERE geocoder requires authentication, either \
                        `apikey` or `app_id`+`app_code` must be set")),
                };
                AnyGeocoder::from(g)
            }
            ProviderConfig::MapQuest {key, domain} => {
                let mut g = MapQuest::with_options(key.clone(), options)?;
                if let Some(domain) = domain {
                    g = g.domain(domain.clone());
                }
                AnyGeocoder::from(g)
            }
            ProviderConfig::What3Words {api_key} => {
                AnyGeocoder::from(What3Words::with_options(api_key.clone(),
                    options)?)
            }
        };
        Ok(geocoder)
    }
}

/// Any of the supported geocoders.
#[derive(Clone, Debug)]
pub enum AnyGeocoder {
    GeoNames(GeoNames),
    Here(Here),
    MapQuest(MapQuest),
    What3Words(What3Words),
}

impl AnyGeocoder {
    pub fn provider(&self) -> Provider {
        match self {
            AnyGeocoder::GeoNames(_) => Provider::GeoNames,
            AnyGeocoder::Here(_) => Provider::Here,
            AnyGeocoder::MapQuest(_) => Provider::MapQuest,
            AnyGeocoder::What3Words(_) => Provider::What3Words,
        }
    }

    fn inner(&self) -> &dyn Geocoder {
        match self {
            AnyGeocoder::GeoNames(g) => g,
            AnyGeocoder::Here(g) => g,
            AnyGeocoder::MapQuest(g) => g,
            AnyGeocoder::What3Words(g) => g,
        }
    }
}

impl Geocoder for AnyGeocoder {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn geocode<'a>(&'a self, query: &'a str, exactly_one: bool)
        -> BoxFuture<'a, Result<Vec<Location>, Error>>
    {
        self.inner().geocode(query, exactly_one)
    }

    fn reverse<'a>(&'a self, point: Point, exactly_one: bool)
        -> BoxFuture<'a, Result<Vec<Location>, Error>>
    {
        self.inner().reverse(point, exactly_one)
    }

    fn reverse_timezone<'a>(&'a self, point: Point)
        -> BoxFuture<'a, Result<Timezone, Error>>
    {
        self.inner().reverse_timezone(point)
    }
}

impl From<GeoNames> for AnyGeocoder {
    fn from(g: GeoNames) -> Self {AnyGeocoder::GeoNames(g)}
}

impl From<Here> for AnyGeocoder {
    fn from(g: Here) -> Self {AnyGeocoder::Here(g)}
}

impl From<MapQuest> for AnyGeocoder {
    fn from(g: MapQuest) -> Self {AnyGeocoder::MapQuest(g)}
}

impl From<What3Words> for AnyGeocoder {
    fn from(g: What3Words) -> Self {AnyGeocoder::What3Words(g)}
}

/// Reads a coordinate that vendors send either as a number or a string.
pub(crate) fn as_degrees(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Joins the non-blank parts with `sep`.
pub(crate) fn join_non_empty<'a, I>(sep: &str, parts: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    parts.into_iter()
        .filter(|p| !p.trim().is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

pub(crate) fn parse_error(message: &str) -> Error {
    Error::new(ErrorKind::Parse, message.to_string())
}
