// Copyright (C) 2018 Stephane Raux. Distributed under the MIT license.

mod common;

use common::{closed_port, json_response, MockServer};
use geocoders::{Options, ProviderConfig, Scheme, ServiceBuilder};
use hyper::StatusCode;
use serde_json::{json, Value};
use std::net::SocketAddr;

fn geonames(domain: String) -> ProviderConfig {
    ProviderConfig::GeoNames {username: "demo".into(), domain: Some(domain)}
}

fn start(providers: Vec<ProviderConfig>) -> SocketAddr {
    let builder = providers.into_iter().fold(
        ServiceBuilder::new()
            .address("127.0.0.1:0".parse().unwrap())
            .options(Options::default().scheme(Scheme::Http)),
        ServiceBuilder::provider,
    );
    let service = builder.bind().unwrap();
    let addr = service.local_addr();
    tokio::spawn(service.run());
    addr
}

async fn get(addr: SocketAddr, path_and_query: &str) -> (StatusCode, Value) {
    let uri = format!("http://{}{}", addr, path_and_query).parse().unwrap();
    let resp = hyper::Client::new().get(uri).await.unwrap();
    let status = resp.status();
    let body = hyper::body::to_bytes(resp.into_body()).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn kazan() -> MockServer {
    MockServer::start(|req| match req.uri().path() {
        "/searchJSON" => json_response(200, json!({"geonames": [
            {"lat": "55.78874", "lng": "49.12214", "name": "Kazan",
                "adminName1": "Tatarstan", "countryName": "Russia"},
            {"lat": "40.2317", "lng": "32.6839", "name": "Kazan",
                "adminName1": "Ankara", "countryName": "Turkey"},
        ]})),
        "/timezoneJSON" => json_response(200, json!({
            "timezoneId": "Europe/Moscow", "rawOffset": 3,
        })),
        _ => json_response(200, json!({"geonames": []})),
    })
}

#[tokio::test]
async fn geocode_falls_back_to_next_provider() {
    let upstream = kazan();
    let addr = start(vec![geonames(closed_port()), geonames(upstream.domain())]);
    let (status, body) = get(addr, "/geocode?query=Kazan").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Ok"].as_array().unwrap().len(), 1);
    assert_eq!(body["Ok"][0]["address"], "Kazan, Tatarstan, Russia");
    assert_eq!(upstream.last_request().param("q").as_deref(), Some("Kazan"));

    let (status, body) = get(addr, "/geocode?query=Kazan&exactly_one=false").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Ok"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn empty_answer_wins_over_errors() {
    let upstream = kazan();
    let addr = start(vec![geonames(upstream.domain()), geonames(closed_port())]);
    let (status, body) = get(addr, "/reverse?query=55.78%2C49.12").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Ok"], json!([]));
}

#[tokio::test]
async fn all_failures_report_last_error() {
    let addr = start(vec![geonames(closed_port())]);
    let (status, body) = get(addr, "/geocode?query=Kazan").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["Err"]["kind"], "Unavailable");
}

#[tokio::test]
async fn timezone_skips_providers_without_support() {
    let upstream = kazan();
    let addr = start(vec![
        ProviderConfig::What3Words {api_key: "k".into()},
        geonames(upstream.domain()),
    ]);
    let (status, body) = get(addr, "/timezone?query=55.78%2C49.12").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Ok"]["zone"], "Europe/Moscow");
}

#[tokio::test]
async fn no_provider_is_a_configuration_error() {
    let addr = start(Vec::new());
    let (status, body) = get(addr, "/geocode?query=Kazan").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["Err"]["kind"], "Configuration");
}
