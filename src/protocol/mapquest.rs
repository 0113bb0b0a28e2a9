// Copyright (C) 2018 Stephane Raux. Distributed under the MIT license.

use crate::point::bounding_box;
use crate::protocol::{join_non_empty, parse_error};
use crate::{Client, Error, ErrorKind, Geocoder, Location, Options, Point,
    Scheme};
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::debug;
use url::Url;

const DOMAIN: &str = "www.mapquestapi.com";
const GEOCODE_PATH: &str = "/geocoding/v1/address";
const REVERSE_PATH: &str = "/geocoding/v1/reverse";

#[derive(Clone, Debug, Default)]
pub struct GeocodeParams {
    pub limit: Option<u32>,
    /// Two opposite corners of the area to favor.
    pub bounds: Option<(Point, Point)>,
}

#[derive(Clone, Debug)]
pub struct MapQuest {
    key: String,
    domain: String,
    scheme: Scheme,
    client: Client,
}

impl MapQuest {
    pub fn new<S: Into<String>>(key: S) -> Result<Self, Error> {
        Self::with_options(key, Options::default())
    }

    pub fn with_options<S: Into<String>>(key: S, options: Options)
        -> Result<Self, Error>
    {
        Ok(MapQuest {
            key: key.into(),
            domain: DOMAIN.to_string(),
            scheme: options.get_scheme().unwrap_or(Options::DEFAULT_SCHEME),
            client: Client::new(options)?,
        })
    }

    pub fn domain<S: Into<String>>(mut self, domain: S) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn scheme(&self) -> Scheme {self.scheme}
    pub fn options(&self) -> &Options {self.client.options()}

    pub fn geocode_url(&self, query: &str, exactly_one: bool,
        params: &GeocodeParams) -> Result<Url, Error>
    {
        let mut pairs = vec![
            ("key".to_string(), self.key.clone()),
            ("location".to_string(), query.to_string()),
        ];
        let limit = if exactly_one {Some(1)} else {params.limit};
        if let Some(limit) = limit {
            pairs.push(("maxResults".to_string(), limit.to_string()));
        }
        if let Some((a, b)) = &params.bounds {
            let corners = bounding_box(a, b);
            let corners = corners.iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("boundingBox".to_string(), corners));
        }
        self.url(GEOCODE_PATH, &pairs)
    }

    pub fn reverse_url(&self, point: &Point) -> Result<Url, Error> {
        self.url(REVERSE_PATH, &[
            ("key".to_string(), self.key.clone()),
            ("location".to_string(), point.to_query()),
        ])
    }

    fn url(&self, path: &str, pairs: &[(String, String)]) -> Result<Url, Error> {
        let base = format!("{}://{}{}", self.scheme, self.domain, path);
        Url::parse_with_params(&base, pairs)
            .map_err(|e| Error::new(ErrorKind::Configuration, e))
    }

    pub async fn geocode_with(&self, query: &str, exactly_one: bool,
        params: &GeocodeParams) -> Result<Vec<Location>, Error>
    {
        let url = self.geocode_url(query, exactly_one, params)?;
        debug!(query, "MapQuest.geocode");
        let doc = self.client.get_json(url).await?;
        parse_locations(&doc, exactly_one)
    }

    pub async fn reverse_with(&self, point: &Point, exactly_one: bool)
        -> Result<Vec<Location>, Error>
    {
        let url = self.reverse_url(point)?;
        debug!(point = %point.to_query(), "MapQuest.reverse");
        let doc = self.client.get_json(url).await?;
        parse_locations(&doc, exactly_one)
    }
}

impl Geocoder for MapQuest {
    fn name(&self) -> &'static str {"MapQuest"}

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
        Box::pin(async move {self.reverse_with(&point, exactly_one).await})
    }
}

pub fn parse_locations(doc: &Value, exactly_one: bool)
    -> Result<Vec<Location>, Error>
{
    let status = doc.pointer("/info/statuscode")
        .and_then(Value::as_i64)
        .ok_or_else(|| parse_error("Missing `info.statuscode` in MapQuest response"))?;
    if status != 0 {
        let messages = doc.pointer("/info/messages")
            .and_then(Value::as_array)
            .map(|m| m.iter().filter_map(Value::as_str).collect::<Vec<_>>().join("; "))
            .unwrap_or_default();
        let kind = match status {
            400 => ErrorKind::Query,
            401 | 403 => ErrorKind::AuthenticationFailure,
            _ => ErrorKind::Service,
        };
        return Err(Error::new(kind, messages));
    }
    let locations = match doc.pointer("/results/0/locations")
        .and_then(Value::as_array)
    {
        Some(locations) => locations,
        None => return Ok(Vec::new()),
    };
    let locations = if exactly_one {
        &locations[..locations.len().min(1)]
    } else {
        &locations[..]
    };
    locations.iter().map(parse_location).collect()
}

fn parse_location(location: &Value) -> Result<Location, Error> {
    let address = join_non_empty(", ", ["street", "adminArea6", "adminArea5",
        "adminArea4", "adminArea3", "adminArea2", "adminArea1", "postalCode"]
        .iter()
        .filter_map(|k| location.get(*k).and_then(Value::as_str)));
    let point = location.get("latLng")
        .and_then(|pos| {
            let lat = pos.get("lat").and_then(|lat| lat.as_f64());
            let long = pos.get("lng").and_then(|long| long.as_f64());
            lat.and_then(|lat| long.map(|long| (lat, long)))
        })
        .ok_or_else(|| parse_error("Missing `latLng` in MapQuest location"))?;
    let point = Point::new(point.0, point.1)
        .map_err(|e| Error::new(ErrorKind::Parse, e))?;
    Ok(Location::new(address, point, location.clone()))
}
