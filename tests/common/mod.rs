// Copyright (C) 2018 Stephane Raux. Distributed under the MIT license.

#![allow(dead_code)]

use hyper::header::USER_AGENT;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode, Uri};
use serde_json::Value;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// What the mock server saw of a request.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub uri: Uri,
    pub user_agent: Option<String>,
}

impl Recorded {
    pub fn param(&self, name: &str) -> Option<String> {
        let query = self.uri.query().unwrap_or_default();
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }
}

/// Local HTTP server answering every request with `respond`.
pub struct MockServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
    task: JoinHandle<()>,
}

impl MockServer {
    pub fn start<F>(respond: F) -> Self
    where
        F: Fn(&Request<Body>) -> Response<Body> + Send + Sync + 'static,
    {
        let respond = Arc::new(respond);
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorder = requests.clone();
        let make_service = make_service_fn(move |_| {
            let respond = respond.clone();
            let recorder = recorder.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                    recorder.lock().unwrap().push(Recorded {
                        uri: req.uri().clone(),
                        user_agent: req.headers()
                            .get(USER_AGENT)
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string),
                    });
                    let response = respond(&req);
                    async move {Ok::<_, Infallible>(response)}
                }))
            }
        });
        let server = Server::bind(&([127, 0, 0, 1], 0).into()).serve(make_service);
        let addr = server.local_addr();
        let task = tokio::spawn(async move {
            let _ = server.await;
        });
        MockServer {addr, requests, task}
    }

    /// `host:port`, suitable as a geocoder domain.
    pub fn domain(&self) -> String {
        self.addr.to_string()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Recorded {
        self.requests().pop().expect("no request reached the mock server")
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub fn json_response(status: u16, body: Value) -> Response<Body> {
    let mut response = Response::new(Body::from(body.to_string()));
    *response.status_mut() = StatusCode::from_u16(status).unwrap();
    response
}

pub fn text_response(status: u16, body: &str) -> Response<Body> {
    let mut response = Response::new(Body::from(body.to_string()));
    *response.status_mut() = StatusCode::from_u16(status).unwrap();
    response
}

/// Accepts connections and never answers.
pub async fn silent_server() -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    (addr.to_string(), task)
}

/// An address nothing listens on.
pub fn closed_port() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}
