// Copyright (C) 2018 Stephane Raux. Distributed under the MIT license.

use crate::{Error, ErrorKind, Options};
use hyper::client::HttpConnector;
use hyper::header::{RETRY_AFTER, USER_AGENT};
use hyper::{Body, Request};
use hyper_tls::HttpsConnector;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

/// HTTP plumbing shared by all geocoders.
#[derive(Clone, Debug)]
pub(crate) struct Client {
    http: hyper::Client<HttpsConnector<HttpConnector>>,
    options: Options,
}

impl Client {
    pub(crate) fn new(options: Options) -> Result<Self, Error> {
        let tls = native_tls::TlsConnector::new()?;
        let mut connector = HttpConnector::new();
        connector.enforce_http(false);
        let http = hyper::Client::builder()
            .build::<_, Body>(HttpsConnector::from((connector, tls.into())));
        Ok(Client {http, options})
    }

    pub(crate) fn options(&self) -> &Options {&self.options}

    /// Fetches `url` and decodes the body as JSON.
    ///
    /// The timeout covers both the response head and the body.
    pub(crate) async fn get_json(&self, url: Url) -> Result<Value, Error> {
        let request = Request::get(url.as_str())
            .header(USER_AGENT, self.options.get_user_agent())
            .body(Body::empty())
            .map_err(|e| Error::new(ErrorKind::Configuration, e))?;
        let timeout = self.options.get_timeout();
        let fetch = async {
            let response = self.http.request(request).await?;
            let status = response.status();
            let retry_after = response.headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = hyper::body::to_bytes(response.into_body()).await?;
            Ok::<_, Error>((status, retry_after, body))
        };
        let (status, retry_after, body) = tokio::time::timeout(timeout, fetch)
            .await
            .map_err(|_| {
                Error::new(ErrorKind::TimedOut,
                    format!("Service timed out after {:?}", timeout))
            })??;
        debug!(status = status.as_u16(), host = ?url.host_str(),
            "geocoder response");
        if !status.is_success() {
            warn!(status = status.as_u16(), host = ?url.host_str(),
                "geocoder returned an error status");
            let kind = ErrorKind::from_status(status.as_u16(), retry_after);
            let message = String::from_utf8_lossy(&body).trim().to_string();
            let message = if message.is_empty() {
                status.to_string()
            } else {
                message
            };
            return Err(Error::new(kind, message));
        }
        Ok(serde_json::from_slice(&body)?)
    }
}
