// Copyright (C) 2018 Stephane Raux. Distributed under the MIT license.

//! [what3words](https://docs.what3words.com/api/v2/) three word addresses.

use crate::protocol::{as_degrees, parse_error};
use crate::{Client, Error, ErrorKind, Geocoder, Location, Options, Point,
    Scheme};
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::debug;
use url::Url;

const DOMAIN: &str = "api.what3words.com";
const GEOCODE_PATH: &str = "/v2/forward";
const REVERSE_PATH: &str = "/v2/reverse";
const DEFAULT_LANG: &str = "en";

/// Checks that `query` looks like `word.word.word`.
pub fn is_three_word_address(query: &str) -> bool {
    let words = query.split('.').collect::<Vec<_>>();
    words.len() == 3 && words.iter().all(|w| {
        !w.is_empty() && w.chars().all(char::is_alphabetic)
    })
}

#[derive(Clone, Debug)]
pub struct What3Words {
    api_key: String,
    client: Client,
}

impl What3Words {
    pub fn new<S: Into<String>>(api_key: S) -> Result<Self, Error> {
        Self::with_options(api_key, Options::default())
    }

    /// The API is only served over HTTPS: a scheme set in `options` is
    /// ignored.
    pub fn with_options<S: Into<String>>(api_key: S, options: Options)
        -> Result<Self, Error>
    {
        Ok(What3Words {api_key: api_key.into(), client: Client::new(options)?})
    }

    pub fn scheme(&self) -> Scheme {Scheme::Https}
    pub fn options(&self) -> &Options {self.client.options()}

    /// Fails with a `Query` error if `query` is not a three word address.
    pub fn geocode_url(&self, query: &str, lang: &str) -> Result<Url, Error> {
        if !is_three_word_address(query) {
            return Err(Error::new(ErrorKind::Query,
                "Search string must be 'word.word.word'"));
        }
        let lang = lang.to_lowercase();
        self.url(GEOCODE_PATH, &[
            ("addr", query),
            ("lang", lang.as_str()),
            ("key", self.api_key.as_str()),
        ])
    }

    pub fn reverse_url(&self, point: &Point, lang: &str) -> Result<Url, Error> {
        let coords = point.to_query();
        let lang = lang.to_lowercase();
        self.url(REVERSE_PATH, &[
            ("coords", coords.as_str()),
            ("lang", lang.as_str()),
            ("key", self.api_key.as_str()),
        ])
    }

    fn url(&self, path: &str, pairs: &[(&str, &str)]) -> Result<Url, Error> {
        let base = format!("{}://{}{}", self.scheme(), DOMAIN, path);
        Url::parse_with_params(&base, pairs)
            .map_err(|e| Error::new(ErrorKind::Configuration, e))
    }

    /// Resolves a three word address; `lang` picks the language of the
    /// returned words.
    pub async fn geocode_with(&self, query: &str, lang: &str)
        -> Result<Vec<Location>, Error>
    {
        let url = self.geocode_url(query, lang)?;
        debug!(query, "What3Words.geocode");
        let doc = self.client.get_json(url).await?;
        parse_square(doc)
    }

    pub async fn reverse_with(&self, point: &Point, lang: &str)
        -> Result<Vec<Location>, Error>
    {
        let url = self.reverse_url(point, lang)?;
        debug!(point = %point.to_query(), "What3Words.reverse");
        let doc = self.client.get_json(url).await?;
        parse_square(doc)
    }
}

impl Geocoder for What3Words {
    fn name(&self) -> &'static str {"What3Words"}

    fn geocode<'a>(&'a self, query: &'a str, _exactly_one: bool)
        -> BoxFuture<'a, Result<Vec<Location>, Error>>
    {
        Box::pin(self.geocode_with(query, DEFAULT_LANG))
    }

    fn reverse<'a>(&'a self, point: Point, _exactly_one: bool)
        -> BoxFuture<'a, Result<Vec<Location>, Error>>
    {
        Box::pin(async move {
            self.reverse_with(&point, DEFAULT_LANG).await
        })
    }
}

/// Decodes a forward or reverse answer, which carries a single square.
pub fn parse_square(doc: Value) -> Result<Vec<Location>, Error> {
    let status = doc.get("status")
        .ok_or_else(|| parse_error("Missing `status` in What3Words response"))?;
    if let Some(code) = status.get("code").filter(|c| !c.is_null()) {
        let message = format!("Error returned by What3Words: {}",
            status.get("message").and_then(Value::as_str).unwrap_or_default());
        let kind = if code.as_i64() == Some(401) {
            ErrorKind::AuthenticationFailure
        } else {
            ErrorKind::Query
        };
        return Err(Error::new(kind, message));
    }
    let geometry = doc.get("geometry")
        .ok_or_else(|| parse_error("Error parsing result"))?;
    let latitude = geometry.get("lat").and_then(as_degrees);
    let longitude = geometry.get("lng").and_then(as_degrees);
    let (latitude, longitude) = latitude.zip(longitude)
        .ok_or_else(|| parse_error("Error parsing result"))?;
    let point = Point::new(latitude, longitude)
        .map_err(|e| Error::new(ErrorKind::Parse, e))?;
    let words = doc.get("words")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok(vec![Location::new(words, point, doc)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DUMMY_KEY: &str = "DUMMYKEY1234";

    #[test]
    fn user_agent_custom() {
        let g = What3Words::with_options(DUMMY_KEY,
            Options::default().user_agent("my_user_agent/1.0")).unwrap();
        assert_eq!(g.options().get_user_agent(), "my_user_agent/1.0");
    }

    #[test]
    fn scheme_in_options_is_ignored() {
        let g = What3Words::with_options(DUMMY_KEY,
            Options::default().scheme(Scheme::Http)).unwrap();
        assert_eq!(g.scheme(), Scheme::Https);
        let url = g.geocode_url("piped.gains.jangle", "en").unwrap();
        assert_eq!(url.scheme(), "https");
    }

    #[test]
    fn checks_three_word_addresses() {
        assert!(is_three_word_address("piped.gains.jangle"));
        assert!(is_three_word_address("fahrpreis.lügner.kutsche"));
        assert!(!is_three_word_address("piped.gains"));
        assert!(!is_three_word_address("piped..jangle"));
        assert!(!is_three_word_address("piped.gains.jangle.extra"));
        assert!(!is_three_word_address("piped.ga1ns.jangle"));
        assert!(!is_three_word_address("piped.gains_.jangle"));
        assert!(!is_three_word_address("Times Square, New York"));
    }

    #[test]
    fn rejects_malformed_query_before_any_request() {
        let g = What3Words::new(DUMMY_KEY).unwrap();
        let e = g.geocode_url("Berlin", "en").unwrap_err();
        assert_eq!(e.kind(), &ErrorKind::Query);
    }

    #[test]
    fn urls_lowercase_the_language() {
        let g = What3Words::new(DUMMY_KEY).unwrap();
        let url = g.geocode_url("piped.gains.jangle", "DE").unwrap();
        assert_eq!(url.path(), "/v2/forward");
        assert_eq!(url.query(),
            Some("addr=piped.gains.jangle&lang=de&key=DUMMYKEY1234"));
        let point = Point::new(53.037611, 11.565012).unwrap();
        let url = g.reverse_url(&point, "DE").unwrap();
        assert_eq!(url.path(), "/v2/reverse");
        assert_eq!(url.query(),
            Some("coords=53.037611%2C11.565012&lang=de&key=DUMMYKEY1234"));
    }

    #[test]
    fn parses_square() {
        let doc = json!({
            "words": "piped.gains.jangle",
            "geometry": {"lat": 53.037611, "lng": 11.565012},
            "language": "en",
            "status": {"reason": "OK", "status": 200},
        });
        let found = parse_square(doc.clone()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].address(), "piped.gains.jangle");
        assert_eq!(found[0].latitude(), 53.037611);
        assert_eq!(found[0].longitude(), 11.565012);
        assert_eq!(parse_square(doc).unwrap().len(), 1);
    }

    #[test]
    fn classifies_status_codes() {
        let doc = json!({"status": {"code": 300,
            "message": "Invalid or non-existent 3 word address"}});
        assert_eq!(parse_square(doc).unwrap_err().kind(), &ErrorKind::Query);
        let doc = json!({"status": {"code": 401, "message": "Invalid key"}});
        assert_eq!(parse_square(doc).unwrap_err().kind(),
            &ErrorKind::AuthenticationFailure);
    }

    #[test]
    fn missing_geometry_is_a_parse_error() {
        let doc = json!({"status": {"status": 200}, "words": "a.b.c"});
        assert_eq!(parse_square(doc).unwrap_err().kind(), &ErrorKind::Parse);
        assert_eq!(parse_square(json!({})).unwrap_err().kind(),
            &ErrorKind::Parse);
    }
}
