// Copyright (C) 2018 Stephane Raux. Distributed under the MIT license.

use crate::point::bounding_box;
use crate::protocol::{join_non_empty, parse_error};
use crate::{Client, Error, ErrorKind, Geocoder, Location, Options, Point,
    Scheme};
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::debug;
use url::Url;

const APP_CODE_DOMAIN: &str = "geocoder.api.here.com";
const API_KEY_DOMAIN: &str = "geocoder.ls.hereapi.com";
const GEOCODE_PATH: &str = "/6.2/geocode.json";
const REVERSE_PATH: &str = "/6.2/reversegeocode.json";

#[derive(Clone, Debug)]
enum Credentials {
    AppCode {app_id: String, app_code: String},
    ApiKey(String),
}

#[derive(Clone, Debug, Default)]
pub struct GeocodeParams {
    /// Two opposite corners of the area to search in.
    pub bbox: Option<(Point, Point)>,
    pub max_results: Option<u32>,
    pub language: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ReverseParams {
    /// Search radius in meters around the point.
    pub radius: Option<f64>,
    pub max_results: Option<u32>,
    pub language: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Here {
    credentials: Credentials,
    scheme: Scheme,
    client: Client,
}

impl Here {
    /// Legacy `app_id` + `app_code` authentication.
    pub fn with_app_code<S, T>(app_id: S, app_code: T, options: Options)
        -> Result<Self, Error>
    where
        S: Into<String>,
        T: Into<String>,
    {
        let credentials = Credentials::AppCode {
            app_id: app_id.into(),
            app_code: app_code.into(),
        };
        Self::with_credentials(credentials, options)
    }

    pub fn with_api_key<S: Into<String>>(apikey: S, options: Options)
        -> Result<Self, Error>
    {
        Self::with_credentials(Credentials::ApiKey(apikey.into()), options)
    }

    fn with_credentials(credentials: Credentials, options: Options)
        -> Result<Self, Error>
    {
        Ok(Here {
            credentials,
            scheme: options.get_scheme().unwrap_or(Options::DEFAULT_SCHEME),
            client: Client::new(options)?,
        })
    }

    pub fn scheme(&self) -> Scheme {self.scheme}
    pub fn options(&self) -> &Options {self.client.options()}

    fn domain(&self) -> &'static str {
        match self.credentials {
            Credentials::AppCode {..} => APP_CODE_DOMAIN,
            Credentials::ApiKey(_) => API_KEY_DOMAIN,
        }
    }

    pub fn geocode_url(&self, query: &str, exactly_one: bool,
        params: &GeocodeParams) -> Result<Url, Error>
    {
        let mut pairs = vec![("searchtext".to_string(), query.to_string())];
        if let Some((a, b)) = &params.bbox {
            let [lat_max, lon_min, lat_min, lon_max] = bounding_box(a, b);
            pairs.push(("bbox".to_string(),
                format!("{},{};{},{}", lat_max, lon_min, lat_min, lon_max)));
        }
        let max_results = if exactly_one {Some(1)} else {params.max_results};
        if let Some(n) = max_results {
            pairs.push(("maxresults".to_string(), n.to_string()));
        }
        if let Some(language) = &params.language {
            pairs.push(("language".to_string(), language.clone()));
        }
        let base = format!("{}://{}{}", self.scheme, self.domain(), GEOCODE_PATH);
        self.url(&base, pairs)
    }

    pub fn reverse_url(&self, point: &Point, exactly_one: bool,
        params: &ReverseParams) -> Result<Url, Error>
    {
        let prox = match params.radius {
            Some(radius) => format!("{},{}", point.to_query(), radius),
            None => point.to_query(),
        };
        let mut pairs = vec![
            ("prox".to_string(), prox),
            ("mode".to_string(), "retrieveAddresses".to_string()),
        ];
        let max_results = if exactly_one {Some(1)} else {params.max_results};
        if let Some(n) = max_results {
            pairs.push(("maxresults".to_string(), n.to_string()));
        }
        if let Some(language) = &params.language {
            pairs.push(("language".to_string(), language.clone()));
        }
        let base = format!("{}://reverse.{}{}", self.scheme, self.domain(),
            REVERSE_PATH);
        self.url(&base, pairs)
    }

    fn url(&self, base: &str, mut pairs: Vec<(String, String)>)
        -> Result<Url, Error>
    {
        match &self.credentials {
            Credentials::AppCode {app_id, app_code} => {
                pairs.push(("app_id".to_string(), app_id.clone()));
                pairs.push(("app_code".to_string(), app_code.clone()));
            }
            Credentials::ApiKey(apikey) => {
                pairs.push(("apiKey".to_string(), apikey.clone()));
            }
        }
        Url::parse_with_params(base, &pairs)
            .map_err(|e| Error::new(ErrorKind::Configuration, e))
    }

    pub async fn geocode_with(&self, query: &str, exactly_one: bool,
        params: &GeocodeParams) -> Result<Vec<Location>, Error>
    {
        let url = self.geocode_url(query, exactly_one, params)?;
        debug!(query, "Here.geocode");
        let doc = self.client.get_json(url).await?;
        parse_view(&doc, exactly_one)
    }

    pub async fn reverse_with(&self, point: &Point, exactly_one: bool,
        params: &ReverseParams) -> Result<Vec<Location>, Error>
    {
        let url = self.reverse_url(point, exactly_one, params)?;
        debug!(point = %point.to_query(), "Here.reverse");
        let doc = self.client.get_json(url).await?;
        parse_view(&doc, exactly_one)
    }
}

impl Geocoder for Here {
    fn name(&self) -> &'static str {"Here"}

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
}

pub fn parse_view(doc: &Value, exactly_one: bool)
    -> Result<Vec<Location>, Error>
{
    let status = doc.get("statusCode").and_then(Value::as_i64).unwrap_or(200);
    if status != 200 {
        let details = doc.get("errorDetails")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let kind = match status {
            401 => ErrorKind::AuthenticationFailure,
            403 => ErrorKind::InsufficientPrivileges,
            429 => ErrorKind::QuotaExceeded,
            503 => ErrorKind::Unavailable,
            _ => ErrorKind::Service,
        };
        return Err(Error::new(kind, details));
    }
    let results = match doc.pointer("/Response/View/0/Result")
        .and_then(Value::as_array)
    {
        Some(results) => results,
        None => return Ok(Vec::new()),
    };
    let results = if exactly_one {
        &results[..results.len().min(1)]
    } else {
        &results[..]
    };
    results.iter().map(parse_result).collect()
}

fn parse_result(result: &Value) -> Result<Location, Error> {
    let field = |name: &str| -> String {
        result.pointer(&format!("/Location/Address/{}", name))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim_matches(|c: char| c == ',' || c == ' ' || c == '\n')
            .to_string()
    };
    let label = field("Label");
    let city_state = join_non_empty(", ", vec![field("City").as_str(),
        field("State").as_str()]);
    let place = join_non_empty(" ", vec![city_state.as_str(),
        field("PostalCode").as_str()]);
    let address = join_non_empty(", ", vec![label.as_str(), place.as_str(),
        field("Country").as_str()]);
    let point = result.pointer("/Location/DisplayPosition")
        .and_then(|pos| {
            let lat = pos.get("Latitude").and_then(|lat| lat.as_f64());
            let long = pos.get("Longitude").and_then(|long| long.as_f64());
            lat.and_then(|lat| long.map(|long| (lat, long)))
        })
        .ok_or_else(|| parse_error("Missing DisplayPosition in HERE result"))?;
    let point = Point::new(point.0, point.1)
        .map_err(|e| Error::new(ErrorKind::Parse, e))?;
    Ok(Location::new(address, point, result.clone()))
}
