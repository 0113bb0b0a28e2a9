// Copyright (C) 2018 Stephane Raux. Distributed under the MIT license.

use crate::{AnyGeocoder, Error, ErrorKind, Geocoder, Location, Options, Point,
    ProviderConfig, Timezone};
use futures::future::BoxFuture;
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use serde::Serialize;
use serde_derive::Deserialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::io::Read;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, Deserialize)]
pub struct ServiceBuilder {
    #[serde(default = "ServiceBuilder::default_sock_addr")]
    sock_addr: SocketAddr,
    #[serde(default)]
    options: Options,
    #[serde(default)]
    providers: Vec<ProviderConfig>,
}

impl ServiceBuilder {
    pub const DEFAULT_IP: Ipv4Addr = Ipv4Addr::UNSPECIFIED;
    pub const DEFAULT_PORT: u16 = 8080;

    pub fn new() -> Self {
        ServiceBuilder {
            sock_addr: Self::default_sock_addr(),
            options: Options::default(),
            providers: Vec::new(),
        }
    }

    fn default_sock_addr() -> SocketAddr {
        (Self::DEFAULT_IP, Self::DEFAULT_PORT).into()
    }

    pub fn address(mut self, a: SocketAddr) -> Self {
        self.sock_addr = a;
        self
    }

    pub fn ip(mut self, a: IpAddr) -> Self {
        self.sock_addr.set_ip(a);
        self
    }

    pub fn port(mut self, p: u16) -> Self {
        self.sock_addr.set_port(p);
        self
    }

    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Appends a geocoder to the fallback chain.
    pub fn provider(mut self, provider: ProviderConfig) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn get_address(&self) -> &SocketAddr {
        &self.sock_addr
    }

    pub fn from_config<R: Read>(config: R) -> Result<Self, serde_json::Error> {
        serde_json::from_reader(config)
    }

    /// Builds the geocoders and binds the listening socket.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(self) -> Result<BoundService, Error> {
        let geocoders = self.providers.iter()
            .map(|p| p.build(&self.options))
            .collect::<Result<Vec<_>, _>>()?;
        let finder = Arc::new(Finder::new(geocoders));
        let builder = Server::try_bind(&self.sock_addr)
            .map_err(|e| Error::new(ErrorKind::Configuration, e))?;
        let make_service = make_service_fn(move |_| {
            let finder = finder.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    let finder = finder.clone();
                    async move {Ok::<_, Infallible>(reply(&finder, req).await)}
                }))
            }
        });
        let server = builder.serve(make_service);
        let local_addr = server.local_addr();
        Ok(BoundService {local_addr, server: Box::pin(server)})
    }
}

impl Default for ServiceBuilder {
    fn default() -> Self {Self::new()}
}

/// A proxy listening on its socket, ready to serve.
pub struct BoundService {
    local_addr: SocketAddr,
    server: BoxFuture<'static, Result<(), hyper::Error>>,
}

impl BoundService {
    pub fn local_addr(&self) -> SocketAddr {self.local_addr}

    pub async fn run(self) -> Result<(), Error> {
        info!(address = %self.local_addr, "Geocoding service listening");
        self.server.await.map_err(Error::from)
    }
}

impl fmt::Debug for BoundService {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BoundService")
            .field("local_addr", &self.local_addr)
            .finish()
    }
}

/// Geocoders tried in order until one of them answers.
#[derive(Clone, Debug, Default)]
pub struct Finder {
    geocoders: Vec<AnyGeocoder>,
}

impl Finder {
    pub fn new(geocoders: Vec<AnyGeocoder>) -> Self {
        Finder {geocoders}
    }

    pub fn geocoders(&self) -> &[AnyGeocoder] {&self.geocoders}

    pub async fn geocode(&self, query: &str, exactly_one: bool)
        -> Result<Vec<Location>, Error>
    {
        self.first_found(|g| g.geocode(query, exactly_one)).await
    }

    pub async fn reverse(&self, point: Point, exactly_one: bool)
        -> Result<Vec<Location>, Error>
    {
        self.first_found(|g| g.reverse(point, exactly_one)).await
    }

    /// Geocoders without timezone support are skipped.
    pub async fn reverse_timezone(&self, point: Point) -> Result<Timezone, Error> {
        let mut unsupported = None;
        let mut last_error = None;
        for g in self.configured()? {
            match g.reverse_timezone(point).await {
                Ok(tz) => return Ok(tz),
                Err(e) if e.kind() == &ErrorKind::Unsupported => {
                    debug!(geocoder = g.name(), "No timezone support, skipping");
                    unsupported = Some(e);
                }
                Err(e) => {
                    warn!(geocoder = g.name(), error = %e, "Timezone lookup failed");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.or(unsupported).unwrap_or_else(no_geocoder))
    }

    /// An empty answer from any geocoder wins over errors from the others.
    async fn first_found<'a, F>(&'a self, op: F) -> Result<Vec<Location>, Error>
    where
        F: Fn(&'a AnyGeocoder) -> BoxFuture<'a, Result<Vec<Location>, Error>>,
    {
        let mut answered_empty = false;
        let mut last_error = None;
        for g in self.configured()? {
            match op(g).await {
                Ok(found) if found.is_empty() => {
                    debug!(geocoder = g.name(), "No result");
                    answered_empty = true;
                }
                Ok(found) => return Ok(found),
                Err(e) => {
                    warn!(geocoder = g.name(), error = %e, "Geocoder failed");
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) if !answered_empty => Err(e),
            _ => Ok(Vec::new()),
        }
    }

    fn configured(&self) -> Result<&[AnyGeocoder], Error> {
        if self.geocoders.is_empty() {
            Err(no_geocoder())
        } else {
            Ok(&self.geocoders)
        }
    }
}

fn no_geocoder() -> Error {
    Error::new(ErrorKind::Configuration, "No geocoder configured")
}

async fn reply(finder: &Finder, req: Request<Body>) -> Response<Body> {
    if req.method() != Method::GET {
        return respond::<()>(&Err(Error::new(ErrorKind::InvalidArgument,
            format!("Unsupported method {}", req.method()))));
    }
    let params = req.uri()
        .query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_else(HashMap::new);
    let path = req.uri().path().to_string();
    debug!(path = path.as_str(), "Request");
    match path.as_str() {
        "/geocode" => respond(&geocode(finder, &params).await),
        "/reverse" => respond(&reverse(finder, &params).await),
        "/timezone" => respond(&timezone(finder, &params).await),
        path => respond::<()>(&Err(Error::new(ErrorKind::NotFound,
            format!("No such endpoint: {}", path)))),
    }
}

async fn geocode(finder: &Finder, params: &HashMap<String, String>)
    -> Result<Vec<Location>, Error>
{
    let query = query_param(params)?;
    finder.geocode(query, exactly_one_param(params)?).await
}

async fn reverse(finder: &Finder, params: &HashMap<String, String>)
    -> Result<Vec<Location>, Error>
{
    let point = point_param(params)?;
    finder.reverse(point, exactly_one_param(params)?).await
}

async fn timezone(finder: &Finder, params: &HashMap<String, String>)
    -> Result<Timezone, Error>
{
    finder.reverse_timezone(point_param(params)?).await
}

fn query_param(params: &HashMap<String, String>) -> Result<&str, Error> {
    params.get("query")
        .map(String::as_str)
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| Error::new(ErrorKind::InvalidArgument,
            "Missing query parameter"))
}

fn point_param(params: &HashMap<String, String>) -> Result<Point, Error> {
    query_param(params)?.parse()
}

fn exactly_one_param(params: &HashMap<String, String>) -> Result<bool, Error> {
    match params.get("exactly_one").map(String::as_str) {
        None | Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") => Ok(false),
        Some(other) => Err(Error::new(ErrorKind::InvalidArgument,
            format!("Invalid exactly_one value `{}`", other))),
    }
}

fn status_for(kind: &ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidArgument | ErrorKind::Query => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Unsupported => StatusCode::NOT_IMPLEMENTED,
        ErrorKind::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::TimedOut => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn respond<T: Serialize>(r: &Result<T, Error>) -> Response<Body> {
    let mut status = match r {
        Ok(_) => StatusCode::OK,
        Err(e) => status_for(e.kind()),
    };
    let body = serde_json::to_string_pretty(r).unwrap_or_else(|e| {
        status = StatusCode::INTERNAL_SERVER_ERROR;
        format!("{{\"Err\": {:?}}}", e.to_string())
    });
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"));
    response
}
