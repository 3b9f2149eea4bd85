//! Static JSON fixture server backing manual runs and transport tests.
//!
//! Serves `GET /<path>` from files below a root directory. Anything that is
//! not a plain relative path resolves to 404.

use std::fs;
use std::io::{Cursor, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result, anyhow};
use parking_lot::Mutex;
use percent_encoding::percent_decode_str;
use serde_json::json;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};
use tracing::{debug, info, warn};

use crate::address::Address;

pub struct FixtureServer {
    server: Server,
    root: PathBuf,
    served: Mutex<Vec<String>>,
}

impl FixtureServer {
    pub fn bind(listen: &str, root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(anyhow!("fixture root {} is not a directory", root.display()));
        }
        let server =
            Server::http(listen).map_err(|err| anyhow!("failed to bind {listen}: {err}"))?;
        Ok(FixtureServer {
            server,
            root,
            served: Mutex::new(Vec::new()),
        })
    }

    /// `http://ip:port` of the bound socket.
    pub fn base_address(&self) -> Result<Address> {
        let addr = self
            .server
            .server_addr()
            .to_ip()
            .ok_or_else(|| anyhow!("fixture server is not bound to an IP socket"))?;
        Address::parse(&format!("http://{addr}"))
    }

    /// Paths requested so far, in arrival order.
    pub fn served(&self) -> Vec<String> {
        self.served.lock().clone()
    }

    /// Handle requests until [`FixtureServer::unblock`] is called.
    pub fn serve(&self) {
        for request in self.server.incoming_requests() {
            if let Err(err) = self.handle_request(request) {
                warn!("error handling fixture request: {err:#}");
            }
        }
    }

    pub fn unblock(&self) {
        self.server.unblock();
    }

    /// Serve on a background thread until the returned handle is dropped.
    pub fn spawn(self) -> Result<BackgroundFixtures> {
        let base = self.base_address()?;
        let fixtures = Arc::new(self);
        let worker = {
            let fixtures = Arc::clone(&fixtures);
            thread::Builder::new()
                .name("fetchchain-fixtures".into())
                .spawn(move || fixtures.serve())
                .context("failed to start fixture server thread")?
        };
        info!(%base, "fixture server running");
        Ok(BackgroundFixtures {
            fixtures,
            base,
            worker: Some(worker),
        })
    }

    fn handle_request(&self, request: Request) -> Result<()> {
        if *request.method() != Method::Get {
            let response = Response::from_string("Only GET supported")
                .with_status_code(StatusCode(405))
                .with_header(content_type("text/plain"));
            request.respond(response)?;
            return Ok(());
        }

        let path = strip_query(request.url()).to_string();
        self.served.lock().push(path.clone());
        let response = match resolve(&self.root, &path) {
            Some(file) => match fs::read(&file) {
                Ok(body) => {
                    debug!(%path, bytes = body.len(), "serving fixture");
                    data_response(body, guess_content_type(&file))
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    error_response(404, anyhow!("no fixture at {path}"))
                }
                Err(err) => error_response(500, anyhow!("reading {}: {err}", file.display())),
            },
            None => error_response(404, anyhow!("unrecognised path")),
        };

        request.respond(response)?;
        Ok(())
    }
}

/// Handle to a fixture server running on its own thread.
pub struct BackgroundFixtures {
    fixtures: Arc<FixtureServer>,
    base: Address,
    worker: Option<JoinHandle<()>>,
}

impl BackgroundFixtures {
    pub fn base(&self) -> &Address {
        &self.base
    }

    pub fn served(&self) -> Vec<String> {
        self.fixtures.served()
    }
}

impl Drop for BackgroundFixtures {
    fn drop(&mut self) {
        self.fixtures.unblock();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Map a request path onto a file below `root`, refusing traversal.
fn resolve(root: &Path, path: &str) -> Option<PathBuf> {
    let mut file = root.to_path_buf();
    let mut segments = 0;
    for raw in path.split('/').filter(|s| !s.is_empty()) {
        let segment = percent_decode_str(raw).decode_utf8().ok()?;
        if segment == "." || segment == ".." || segment.contains(['/', '\\']) {
            return None;
        }
        file.push(segment.as_ref());
        segments += 1;
    }
    (segments > 0).then_some(file)
}

fn guess_content_type(file: &Path) -> &'static str {
    match file.extension().and_then(|ext| ext.to_str()) {
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

fn data_response(body: Vec<u8>, mime: &'static str) -> Response<Cursor<Vec<u8>>> {
    Response::from_data(body)
        .with_header(content_type(mime))
        .with_status_code(StatusCode(200))
}

fn error_response(status: u16, err: anyhow::Error) -> Response<Cursor<Vec<u8>>> {
    let body = json!({ "error": err.to_string() }).to_string();
    Response::from_string(body)
        .with_header(content_type("application/json"))
        .with_status_code(StatusCode(status))
}

fn content_type(value: &'static str) -> Header {
    Header::from_bytes(&b"Content-Type"[..], value.as_bytes()).expect("content type is ASCII")
}

fn strip_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(path, _)| path)
}
