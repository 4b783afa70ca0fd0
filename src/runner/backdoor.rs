//! Diagnostic HTTP endpoint for a running worker set.
//!
//! `GET /` on `127.0.0.1:<port>` returns the set's workers and how many
//! units each has processed, as JSON. Lives exactly as long as the runner.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};

use serde::Serialize;
use tiny_http::{Header, Response, Server};

use super::RunnerError;
use super::thread::WorkerStats;

#[derive(Debug, Serialize)]
struct WorkerReport<'a> {
    name: &'a str,
    queue: &'a str,
    concurrency: usize,
    processed: u64,
}

pub struct Backdoor {
    server: Arc<Server>,
    handle: Option<JoinHandle<()>>,
}

impl Backdoor {
    pub fn bind(port: u16, stats: Arc<Vec<WorkerStats>>) -> Result<Self, RunnerError> {
        let addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), port);
        let server = Server::http(addr).map_err(|err| RunnerError::Backdoor {
            port,
            reason: err.to_string(),
        })?;
        let server = Arc::new(server);

        let serving = Arc::clone(&server);
        let handle = thread::Builder::new()
            .name("backdoor".into())
            .spawn(move || serve(&serving, &stats))
            .map_err(|err| RunnerError::Spawn("backdoor".into(), err))?;

        crate::debug!("runner"; "backdoor listening on http://{}", addr);
        Ok(Self {
            server,
            handle: Some(handle),
        })
    }

    /// Make `incoming_requests` return so the serving thread can exit.
    pub fn unblock(&self) {
        self.server.unblock();
    }

    pub fn join(mut self) {
        self.unblock();
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

fn serve(server: &Server, stats: &[WorkerStats]) {
    for request in server.incoming_requests() {
        let body = render(stats);
        let response = Response::from_string(body).with_header(json_header());
        if let Err(err) = request.respond(response) {
            crate::debug!("runner"; "backdoor response failed: {}", err);
        }
    }
}

fn render(stats: &[WorkerStats]) -> String {
    let reports: Vec<_> = stats
        .iter()
        .map(|s| WorkerReport {
            name: &s.name,
            queue: &s.queue,
            concurrency: s.concurrency,
            processed: s.processed.load(Ordering::Relaxed),
        })
        .collect();
    serde_json::to_string_pretty(&reports).unwrap_or_else(|_| "[]".to_string())
}

fn json_header() -> Header {
    Header::from_bytes("Content-Type", "application/json").expect("static header is valid")
}
