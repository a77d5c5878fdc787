//! Test doubles shared by the module tests.

use std::{collections::VecDeque, sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{oneshot, Notify};

use crate::{
    controller::{Controller, ControllerState, LoadRequest, StateCell},
    error::FetchError,
    transport::{RawResponse, Request, Transport},
};

pub(crate) struct PendingRequest {
    pub request: Request,
    responder: oneshot::Sender<Result<RawResponse, FetchError>>,
}

impl PendingRequest {
    /// Returns false when the requesting task is gone (cancelled).
    pub fn respond(self, response: Result<RawResponse, FetchError>) -> bool {
        self.responder.send(response).is_ok()
    }

    pub fn respond_html(self, html: &str) -> bool {
        self.respond(Ok(RawResponse::html(200, html)))
    }

    pub fn respond_json(self, status: u16, body: Value) -> bool {
        self.respond(Ok(RawResponse::json(status, &body)))
    }
}

/// Transport whose requests stay pending until the test resolves them, in
/// whatever order it likes.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    pending: Mutex<VecDeque<PendingRequest>>,
    requests: Mutex<Vec<Request>>,
    arrived: Notify,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn next_request(&self) -> PendingRequest {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(pending) = self.pending.lock().pop_front() {
                    return pending;
                }
                self.arrived.notified().await;
            }
        })
        .await
        .expect("a request should have been issued")
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&self, request: Request) -> Result<RawResponse, FetchError> {
        let (responder, rx) = oneshot::channel();
        self.requests.lock().push(request.clone());
        self.pending
            .lock()
            .push_back(PendingRequest { request, responder });
        self.arrived.notify_one();
        rx.await.unwrap_or(Err(FetchError::Cancelled))
    }
}

/// Controller that only records the lifecycle calls it receives.
pub(crate) struct RecordingController {
    name: String,
    log: Arc<Mutex<Vec<String>>>,
    state: StateCell,
}

impl RecordingController {
    pub fn new(name: &str, log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            log: Arc::clone(log),
            state: StateCell::new(),
        })
    }
}

#[async_trait]
impl Controller for RecordingController {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> ControllerState {
        self.state.get()
    }

    async fn load(&self, request: LoadRequest) {
        let groups = request
            .groups
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        self.log.lock().push(format!(
            "{}:load:{groups}:{}",
            self.name,
            request.query.unwrap_or_default()
        ));
        self.state.set(ControllerState::Loaded);
    }

    async fn unload(&self) {
        self.log.lock().push(format!("{}:unload", self.name));
        self.state.set(ControllerState::Idle);
    }

    async fn settled(&self) {
        self.state.settled().await;
    }
}
