// Copyright (C) 2018 Stephane Raux. Distributed under the MIT license.

//! [GeoNames](https://www.geonames.org/export/geonames-search.html) web
//! services.
//!
//! Free accounts are served over plain HTTP, so this geocoder defaults to
//! `http` unless [`Options`] asks otherwise.

use crate::protocol::{as_degrees, join_non_empty, parse_error};
use crate::{Client, Error, ErrorKind, Geocoder, Location, Options, Point,
    Scheme, Timezone};
use futures::future::BoxFuture;
use serde_json::Value;
use std::str::FromStr;
use tracing::debug;
use url::Url;

const DOMAIN: &str = "api.geonames.org";
const GEOCODE_PATH: &str = "/searchJSON";
const TIMEZONE_PATH: &str = "/timezoneJSON";

/// Web service answering reverse lookups.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FindNearbyType {
    /// `findNearbyPlaceName`: closest populated place.
    NearbyPlaceName,
    /// `findNearby`: closest toponym, optionally filtered by feature code.
    Nearby,
}

impl FindNearbyType {
    fn path(self) -> &'static str {
        match self {
            FindNearbyType::NearbyPlaceName => "/findNearbyPlaceNameJSON",
            FindNearbyType::Nearby => "/findNearbyJSON",
        }
    }
}

impl Default for FindNearbyType {
    fn default() -> Self {FindNearbyType::NearbyPlaceName}
}

impl FromStr for FindNearbyType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "findNearbyPlaceName" => Ok(FindNearbyType::NearbyPlaceName),
            "findNearby" => Ok(FindNearbyType::Nearby),
            _ => Err(Error::new(ErrorKind::Query,
                format!("`{}` find_nearby_type is not supported", s))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct GeocodeParams {
    /// ISO-3166 country codes restricting the search.
    pub country: Vec<String>,
    /// Country whose records rank first.
    pub country_bias: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ReverseParams {
    pub find_nearby_type: FindNearbyType,
    /// Only with [`FindNearbyType::Nearby`].
    pub feature_code: Option<String>,
    /// Only with [`FindNearbyType::NearbyPlaceName`].
    pub lang: Option<String>,
}

#[derive(Clone, Debug)]
pub struct GeoNames {
    username: String,
    domain: String,
    scheme: Scheme,
    client: Client,
}

impl GeoNames {
    pub fn new<S: Into<String>>(username: S) -> Result<Self, Error> {
        Self::with_options(username, Options::default())
    }

    /// Fails with `Configuration` if the TLS backend cannot be initialized.
    pub fn with_options<S: Into<String>>(username: S, options: Options)
        -> Result<Self, Error>
    {
        Ok(GeoNames {
            username: username.into(),
            domain: DOMAIN.to_string(),
            scheme: options.get_scheme().unwrap_or(Scheme::Http),
            client: Client::new(options)?,
        })
    }

    /// Sends requests to `domain` (`host[:port]`) instead of the public API.
    pub fn domain<S: Into<String>>(mut self, domain: S) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn username(&self) -> &str {&self.username}
    pub fn scheme(&self) -> Scheme {self.scheme}
    pub fn options(&self) -> &Options {self.client.options()}

    pub fn geocode_url(&self, query: &str, exactly_one: bool,
        params: &GeocodeParams) -> Result<Url, Error>
    {
        let mut pairs = vec![("q", query), ("username", self.username.as_str())];
        if exactly_one {
            pairs.push(("maxRows", "1"));
        }
        if let Some(bias) = &params.country_bias {
            pairs.push(("countryBias", bias.as_str()));
        }
        for country in &params.country {
            pairs.push(("country", country.as_str()));
        }
        self.url(GEOCODE_PATH, &pairs)
    }

    /// Fails with `InvalidArgument` when the parameters do not suit the
    /// chosen web service.
    pub fn reverse_url(&self, point: &Point, params: &ReverseParams)
        -> Result<Url, Error>
    {
        let lat = point.latitude().to_string();
        let lng = point.longitude().to_string();
        let mut pairs = vec![
            ("lat", lat.as_str()),
            ("lng", lng.as_str()),
            ("username", self.username.as_str()),
        ];
        match params.find_nearby_type {
            FindNearbyType::NearbyPlaceName => {
                if params.feature_code.is_some() {
                    return Err(Error::new(ErrorKind::InvalidArgument,
                        "find_nearby_type=findNearbyPlaceName doesn't support \
                        the `feature_code` param"));
                }
                if let Some(lang) = &params.lang {
                    pairs.push(("lang", lang.as_str()));
                }
            }
            FindNearbyType::Nearby => {
                if params.lang.is_some() {
                    return Err(Error::new(ErrorKind::InvalidArgument,
                        "find_nearby_type=findNearby doesn't support the \
                        `lang` param"));
                }
                if let Some(feature_code) = &params.feature_code {
                    pairs.push(("featureCode", feature_code.as_str()));
                }
            }
        }
        self.url(params.find_nearby_type.path(), &pairs)
    }

    pub fn timezone_url(&self, point: &Point) -> Result<Url, Error> {
        let lat = point.latitude().to_string();
        let lng = point.longitude().to_string();
        self.url(TIMEZONE_PATH, &[
            ("lat", lat.as_str()),
            ("lng", lng.as_str()),
            ("username", self.username.as_str()),
        ])
    }

    fn url(&self, path: &str, pairs: &[(&str, &str)]) -> Result<Url, Error> {
        let base = format!("{}://{}{}", self.scheme, self.domain, path);
        Url::parse_with_params(&base, pairs)
            .map_err(|e| Error::new(ErrorKind::Configuration, e))
    }

    pub async fn geocode_with(&self, query: &str, exactly_one: bool,
        params: &GeocodeParams) -> Result<Vec<Location>, Error>
    {
        let url = self.geocode_url(query, exactly_one, params)?;
        debug!(query, "GeoNames.geocode");
        let doc = self.client.get_json(url).await?;
        parse_places(&doc, exactly_one)
    }

    pub async fn reverse_with(&self, point: &Point, exactly_one: bool,
        params: &ReverseParams) -> Result<Vec<Location>, Error>
    {
        let url = self.reverse_url(point, params)?;
        debug!(point = %point.to_query(), "GeoNames.reverse");
        let doc = self.client.get_json(url).await?;
        parse_places(&doc, exactly_one)
    }

    /// Timezone at `point`.
    ///
    /// Points without an IANA zone (Antarctica, open sea) get a fixed offset.
    pub async fn timezone(&self, point: &Point) -> Result<Timezone, Error> {
        let url = self.timezone_url(point)?;
        debug!(point = %point.to_query(), "GeoNames.reverse_timezone");
        let doc = self.client.get_json(url).await?;
        parse_timezone(doc)
    }
}

impl Geocoder for GeoNames {
    fn name(&self) -> &'static str {"GeoNames"}

    fn geocode<'a>(&'a self, query: &'a str, exactly_one: bool)
        -> BoxFuture<'a, Result<Vec<Location>, Error>>
    {
        Box::pin(async move {
            self.geocode_with(query, exactly_one, &GeocodeParams::default()).await
        })
    }

    fn reverse<'a>(&'a self, point: Point, exactly_one: bool)
        -> BoxFuture<'a, Result<Vec<Location>, Error>>
    {
        Box::pin(async move {
            self.reverse_with(&point, exactly_one, &ReverseParams::default())
                .await
        })
    }

    fn reverse_timezone<'a>(&'a self, point: Point)
        -> BoxFuture<'a, Result<Timezone, Error>>
    {
        Box::pin(async move {self.timezone(&point).await})
    }
}

/// Turns an error document (`{"status": {"message", "value"}}`) into an
/// error.
///
/// See <http://www.geonames.org/export/webservice-exception.html>.
fn raise_for_error(doc: &Value) -> Result<(), Error> {
    let status = match doc.get("status") {
        Some(status) if !status.is_null() => status,
        _ => return Ok(()),
    };
    let message = status.get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let kind = if message.starts_with("user account not enabled to use") {
        ErrorKind::InsufficientPrivileges
    } else {
        match status.get("value").and_then(Value::as_i64) {
            Some(10) => ErrorKind::AuthenticationFailure,
            Some(18..=20) => ErrorKind::QuotaExceeded,
            _ => ErrorKind::Service,
        }
    };
    Err(Error::new(kind, message))
}

pub fn parse_places(doc: &Value, exactly_one: bool)
    -> Result<Vec<Location>, Error>
{
    raise_for_error(doc)?;
    let places = match doc.get("geonames").and_then(Value::as_array) {
        Some(places) => places,
        None => return Ok(Vec::new()),
    };
    let places = if exactly_one {
        &places[..places.len().min(1)]
    } else {
        &places[..]
    };
    Ok(places.iter().filter_map(parse_place).collect())
}

fn parse_place(place: &Value) -> Option<Location> {
    let latitude = as_degrees(place.get("lat")?)?;
    let longitude = as_degrees(place.get("lng")?)?;
    let point = Point::new(latitude, longitude).ok()?;
    let address = join_non_empty(", ", ["name", "adminName1", "countryName"]
        .iter()
        .filter_map(|k| place.get(*k).and_then(Value::as_str)));
    Some(Location::new(address, point, place.clone()))
}

pub fn parse_timezone(doc: Value) -> Result<Timezone, Error> {
    raise_for_error(&doc)?;
    let name = doc.get("timezoneId")
        .and_then(Value::as_str)
        .map(str::to_string);
    match name {
        Some(name) => Timezone::from_name(&name, doc),
        None => {
            let offset = doc.get("rawOffset")
                .and_then(as_degrees)
                .ok_or_else(|| parse_error("Missing `rawOffset` in timezone response"))?;
            Timezone::from_fixed_gmt_offset(offset, doc)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Zone;
    use serde_json::json;

    fn geocoder() -> GeoNames {
        GeoNames::new("DUMMYUSER_NORBERT").unwrap()
    }

    fn times_square() -> Point {
        Point::new(40.75376406311989, -73.98489005863667).unwrap()
    }

    fn query_pairs(url: &Url) -> Vec<(String, String)> {
        url.query_pairs().into_owned().collect()
    }

    #[test]
    fn user_agent_custom() {
        let g = GeoNames::with_options("DUMMYUSER_NORBERT",
            Options::default().user_agent("my_user_agent/1.0")).unwrap();
        assert_eq!(g.options().get_user_agent(), "my_user_agent/1.0");
    }

    #[test]
    fn defaults_to_http() {
        assert_eq!(geocoder().scheme(), Scheme::Http);
        let g = GeoNames::with_options("u", Options::default().scheme(Scheme::Https))
            .unwrap();
        assert_eq!(g.scheme(), Scheme::Https);
    }

    #[test]
    fn geocode_url_lists_countries() {
        let params = GeocodeParams {
            country: vec!["CN".into(), "TR".into(), "JP".into()],
            country_bias: Some("TR".into()),
        };
        let url = geocoder().geocode_url("Ryūō", false, &params).unwrap();
        assert_eq!(url.path(), "/searchJSON");
        assert_eq!(url.host_str(), Some("api.geonames.org"));
        assert_eq!(query_pairs(&url), vec![
            ("q".to_string(), "Ryūō".to_string()),
            ("username".to_string(), "DUMMYUSER_NORBERT".to_string()),
            ("countryBias".to_string(), "TR".to_string()),
            ("country".to_string(), "CN".to_string()),
            ("country".to_string(), "TR".to_string()),
            ("country".to_string(), "JP".to_string()),
        ]);
    }

    #[test]
    fn exactly_one_limits_search_rows() {
        let params = GeocodeParams::default();
        let url = geocoder().geocode_url("Kazan", true, &params).unwrap();
        assert!(query_pairs(&url).contains(&("maxRows".into(), "1".into())));
        let url = geocoder().geocode_url("Kazan", false, &params).unwrap();
        assert!(query_pairs(&url).iter().all(|(k, _)| k != "maxRows"));
    }

    #[test]
    fn reverse_rejects_feature_code_for_place_name() {
        let params = ReverseParams {
            feature_code: Some("ADM1".into()),
            ..ReverseParams::default()
        };
        let e = geocoder().reverse_url(&times_square(), &params).unwrap_err();
        assert_eq!(e.kind(), &ErrorKind::InvalidArgument);
    }

    #[test]
    fn reverse_rejects_lang_for_find_nearby() {
        let params = ReverseParams {
            find_nearby_type: FindNearbyType::Nearby,
            lang: Some("en".into()),
            ..ReverseParams::default()
        };
        let e = geocoder().reverse_url(&times_square(), &params).unwrap_err();
        assert_eq!(e.kind(), &ErrorKind::InvalidArgument);
    }

    #[test]
    fn reverse_urls() {
        let params = ReverseParams {
            lang: Some("ru".into()),
            ..ReverseParams::default()
        };
        let point = Point::new(52.5, 13.41).unwrap();
        let url = geocoder().reverse_url(&point, &params).unwrap();
        assert_eq!(url.path(), "/findNearbyPlaceNameJSON");
        assert!(query_pairs(&url).contains(&("lang".into(), "ru".into())));
        assert!(query_pairs(&url).contains(&("lat".into(), "52.5".into())));

        let params = ReverseParams {
            find_nearby_type: FindNearbyType::Nearby,
            feature_code: Some("ADM1".into()),
            ..ReverseParams::default()
        };
        let url = geocoder().reverse_url(&point, &params).unwrap();
        assert_eq!(url.path(), "/findNearbyJSON");
        assert!(query_pairs(&url).contains(&("featureCode".into(), "ADM1".into())));
    }

    #[test]
    fn unknown_find_nearby_type_is_a_query_error() {
        let e = "findSomethingNonExisting".parse::<FindNearbyType>().unwrap_err();
        assert_eq!(e.kind(), &ErrorKind::Query);
        assert_eq!("findNearby".parse::<FindNearbyType>().unwrap(),
            FindNearbyType::Nearby);
    }

    #[test]
    fn parses_places() {
        let doc = json!({
            "totalResultsCount": 2,
            "geonames": [
                {"lat": "40.2317", "lng": "32.6839", "name": "Kazan",
                    "adminName1": "Ankara", "countryName": "Turkey"},
                {"lat": "55.78874", "lng": "49.12214", "name": "Kazan",
                    "adminName1": "", "countryName": "Russia"},
                {"name": "No coordinates"},
            ],
        });
        let found = parse_places(&doc, false).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].address(), "Kazan, Ankara, Turkey");
        assert_eq!(found[1].address(), "Kazan, Russia");
        assert_eq!(found[0].latitude(), 40.2317);
        assert_eq!(found[0].raw()["countryName"], "Turkey");

        let one = parse_places(&doc, true).unwrap();
        assert_eq!(one.len(), 1);
    }

    #[test]
    fn empty_results_are_not_errors() {
        let doc = json!({"totalResultsCount": 0, "geonames": []});
        assert!(parse_places(&doc, true).unwrap().is_empty());
        assert!(parse_places(&json!({}), false).unwrap().is_empty());
    }

    #[test]
    fn classifies_error_documents() {
        let cases = vec![
            (10, "user does not exist.", ErrorKind::AuthenticationFailure),
            (19, "the hourly limit of 1000 credits has been exceeded",
                ErrorKind::QuotaExceeded),
            (10, "user account not enabled to use the free webservice.",
                ErrorKind::InsufficientPrivileges),
            (12, "other error", ErrorKind::Service),
        ];
        for (value, message, kind) in cases {
            let doc = json!({"status": {"message": message, "value": value}});
            let e = parse_places(&doc, true).unwrap_err();
            assert_eq!(e.kind(), &kind, "{}", message);
            let e = parse_timezone(doc).unwrap_err();
            assert_eq!(e.kind(), &kind, "{}", message);
        }
    }

    #[test]
    fn parses_named_timezone() {
        let doc = json!({
            "countryCode": "US",
            "timezoneId": "America/New_York",
            "rawOffset": -5,
            "lat": 40.75,
            "lng": -73.98,
        });
        let tz = parse_timezone(doc).unwrap();
        assert_eq!(tz.zone(), &Zone::Named(chrono_tz::America::New_York));
        assert_eq!(tz.raw()["countryCode"], "US");
    }

    #[test]
    fn falls_back_to_raw_offset() {
        let tz = parse_timezone(json!({"rawOffset": 5, "lat": 89, "lng": 80}))
            .unwrap();
        assert_eq!(tz.to_string(), "+05:00");
        let tz = parse_timezone(json!({"rawOffset": 0})).unwrap();
        assert_eq!(tz.to_string(), "+00:00");
        let e = parse_timezone(json!({"lat": 89})).unwrap_err();
        assert_eq!(e.kind(), &ErrorKind::Parse);
    }
}
