//! Raw fetches wrapped as futures.

use std::collections::HashMap;
use std::io::Read;
use std::thread;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::address::Address;
use crate::future::{Completer, Future};
use crate::result::{Cause, Result, wrap};

/// Upper bound on a single response body.
pub const DEFAULT_MAX_BODY_BYTES: u64 = 10 * 1024 * 1024;

/// Descriptive data returned alongside a payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Metadata {
    pub address: Address,
    pub status: Option<u16>,
    pub content_type: Option<String>,
}

/// Raw bytes plus metadata produced by one successful fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payload {
    pub bytes: Vec<u8>,
    pub metadata: Metadata,
}

/// Performs one raw fetch of an address.
///
/// Implementations start exactly one I/O operation per call and never retry.
/// The returned future fails when the fetch fails or yields an empty body.
pub trait Transport: Send + Sync {
    fn fetch(&self, address: &Address) -> Future<Payload>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn fetch(&self, address: &Address) -> Future<Payload> {
        (**self).fetch(address)
    }
}

/// Build the outcome for a fetch that returned `bytes`.
fn non_empty(bytes: Vec<u8>, metadata: Metadata) -> Result<Payload> {
    let bytes = wrap(Some(bytes).filter(|b| !b.is_empty()), Cause::no_data())?;
    Ok(Payload { bytes, metadata })
}

fn report(address: &Address, done: &Completer<Payload>, outcome: Result<Payload>) {
    match &outcome {
        Ok(payload) => debug!(
            %address,
            bytes = payload.bytes.len(),
            status = ?payload.metadata.status,
            "fetch succeeded"
        ),
        Err(cause) => warn!(%address, %cause, "fetch failed"),
    }
    done.complete(outcome);
}

/// HTTP GET transport running each request on its own worker thread.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    agent: ureq::Agent,
    max_body_bytes: u64,
}

impl HttpTransport {
    pub fn new() -> Self {
        HttpTransport::with_user_agent(concat!("fetchchain/", env!("CARGO_PKG_VERSION")))
    }

    pub fn with_user_agent(user_agent: &str) -> Self {
        let agent = ureq::AgentBuilder::new().user_agent(user_agent).build();
        HttpTransport {
            agent,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn max_body_bytes(mut self, limit: u64) -> Self {
        self.max_body_bytes = limit;
        self
    }

    fn get(agent: &ureq::Agent, address: &Address, limit: u64) -> Result<Payload> {
        let response = match agent.get(address.as_str()).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                return Err(Cause::transport(format!(
                    "GET {address} returned HTTP {code} {}",
                    response.status_text()
                )));
            }
            Err(err) => return Err(Cause::transport(format!("GET {address} failed: {err}"))),
        };
        let metadata = Metadata {
            address: address.clone(),
            status: Some(response.status()),
            content_type: response.header("content-type").map(str::to_owned),
        };
        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(limit.saturating_add(1))
            .read_to_end(&mut bytes)
            .map_err(|err| Cause::transport(format!("reading body of {address} failed: {err}")))?;
        if bytes.len() as u64 > limit {
            return Err(Cause::transport(format!(
                "response body of {address} exceeds {limit} bytes"
            )));
        }
        non_empty(bytes, metadata)
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        HttpTransport::new()
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, address: &Address) -> Future<Payload> {
        let agent = self.agent.clone();
        let limit = self.max_body_bytes;
        let address = address.clone();
        Future::new(move |done| {
            debug!(%address, "fetch started");
            let worker_done = done.clone();
            let worker_address = address.clone();
            let spawned = thread::Builder::new()
                .name("fetchchain-get".into())
                .spawn(move || {
                    let outcome = HttpTransport::get(&agent, &worker_address, limit);
                    report(&worker_address, &worker_done, outcome);
                });
            if let Err(err) = spawned {
                report(
                    &address,
                    &done,
                    Err(Cause::transport(format!("could not start fetch worker: {err}"))),
                );
            }
        })
    }
}

#[derive(Clone, Debug)]
enum Route {
    Body(Vec<u8>),
    Failure(Cause),
}

/// In-process transport serving registered payloads synchronously.
///
/// Every requested address is recorded, which lets callers check which
/// fetches a chain actually issued.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    routes: Mutex<HashMap<Address, Route>>,
    requests: Mutex<Vec<Address>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        MemoryTransport::default()
    }

    pub fn insert(&self, address: Address, body: impl Into<Vec<u8>>) {
        self.routes.lock().insert(address, Route::Body(body.into()));
    }

    /// Make fetches of `address` fail with `cause`.
    pub fn fail(&self, address: Address, cause: Cause) {
        self.routes.lock().insert(address, Route::Failure(cause));
    }

    pub fn with(self, address: Address, body: impl Into<Vec<u8>>) -> Self {
        self.insert(address, body);
        self
    }

    pub fn requests(&self) -> Vec<Address> {
        self.requests.lock().clone()
    }
}

impl Transport for MemoryTransport {
    fn fetch(&self, address: &Address) -> Future<Payload> {
        self.requests.lock().push(address.clone());
        let route = self.routes.lock().get(address).cloned();
        let outcome = match route {
            Some(Route::Body(bytes)) => non_empty(
                bytes,
                Metadata {
                    address: address.clone(),
                    status: None,
                    content_type: None,
                },
            ),
            Some(Route::Failure(cause)) => Err(cause),
            None => Err(Cause::transport(format!("nothing registered at {address}"))),
        };
        Future::new(|done| report(address, &done, outcome))
    }
}
