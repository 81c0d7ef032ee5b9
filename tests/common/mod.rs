//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::StatusCode;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

use edge_gateway::http::{GatewayResponse, Transport, TransportError, UpstreamRequest};

/// What the scripted transport does for one call.
#[derive(Debug, Clone)]
pub enum Outcome {
    Respond(u16, &'static str),
    Fail(&'static str),
    /// Synthetic latency, then respond.
    Delay(Duration, u16),
}

/// In-memory transport replaying a script of outcomes, then a default.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Outcome>>,
    default: Outcome,
    calls: AtomicU32,
    requests: Mutex<Vec<UpstreamRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Outcome>) -> Arc<Self> {
        Self::with_default(script, Outcome::Respond(200, "ok"))
    }

    pub fn with_default(script: Vec<Outcome>, default: Outcome) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            default,
            calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<UpstreamRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<UpstreamRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

fn respond(status: u16, body: &str) -> GatewayResponse {
    let mut response = GatewayResponse::new(StatusCode::from_u16(status).unwrap());
    response.body = Bytes::from(body.to_string());
    response
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: UpstreamRequest) -> Result<GatewayResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default.clone());

        match outcome {
            Outcome::Respond(status, body) => Ok(respond(status, body)),
            Outcome::Fail(reason) => Err(TransportError::Request(reason.to_string())),
            Outcome::Delay(latency, status) => {
                tokio::time::sleep(latency).await;
                Ok(respond(status, "delayed"))
            }
        }
    }
}

/// Start a programmable mock backend with async support.
pub async fn start_programmable_backend<F, Fut>(addr: SocketAddr, f: F)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Client that opens a fresh connection per request.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
