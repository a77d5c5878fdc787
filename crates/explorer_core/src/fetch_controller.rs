//! Reusable controller that fetches partial content for a matched URL and
//! injects it into the sidebar.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, warn};

use crate::{
    controller::{Controller, ControllerState, LoadRequest, RequestSequence, StateCell, Ticket},
    error::FetchError,
    pagination::{PageContainer, Pagination},
    render::{error_fragment, FocusLayer, RenderTarget},
    transport::{decode_partial, PartialContent, Request, Transport},
};

/// The shared resources a controller owns while it is active.
#[derive(Clone)]
pub struct Surfaces {
    pub sidebar: Arc<dyn RenderTarget>,
    pub focus: Arc<dyn FocusLayer>,
    /// Container for a paginated list nested in the sidebar content.
    pub list: Option<PageContainer>,
}

impl Surfaces {
    pub fn new(sidebar: Arc<dyn RenderTarget>, focus: Arc<dyn FocusLayer>) -> Self {
        Self {
            sidebar,
            focus,
            list: None,
        }
    }

    pub fn with_list(mut self, list: PageContainer) -> Self {
        self.list = Some(list);
        self
    }
}

/// Handed to the content-ready callback after content has been injected, so
/// the caller can wire nested forms and pagination and highlight geometry.
pub struct ContentReady<'a> {
    pub request: &'a LoadRequest,
    pub content: &'a PartialContent,
    pub surfaces: &'a Surfaces,
    pub transport: &'a Arc<dyn Transport>,
    nested: &'a mut Vec<Pagination>,
}

impl ContentReady<'_> {
    /// Binds `pagination` to the controller: it is unmounted when the
    /// controller reloads or unloads.
    pub fn attach(&mut self, pagination: Pagination) {
        self.nested.push(pagination);
    }
}

pub type EndpointFn = Arc<dyn Fn(&LoadRequest) -> String + Send + Sync>;
pub type ContentReadyFn = Arc<dyn Fn(ContentReady<'_>) + Send + Sync>;

struct Inflight {
    sequence: RequestSequence,
    task: Option<JoinHandle<()>>,
    nested: Vec<Pagination>,
}

impl Inflight {
    /// Stops the pending fetch and everything mounted from earlier content.
    fn release(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        for pagination in self.nested.drain(..) {
            pagination.unmount();
        }
    }
}

struct Shared {
    name: String,
    transport: Arc<dyn Transport>,
    surfaces: Surfaces,
    endpoint: EndpointFn,
    on_ready: ContentReadyFn,
    state: StateCell,
    inflight: Mutex<Inflight>,
}

pub struct FetchController {
    shared: Arc<Shared>,
}

impl FetchController {
    pub fn new(
        name: impl Into<String>,
        transport: Arc<dyn Transport>,
        surfaces: Surfaces,
        endpoint: impl Fn(&LoadRequest) -> String + Send + Sync + 'static,
        on_ready: impl Fn(ContentReady<'_>) + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            shared: Arc::new(Shared {
                name: name.into(),
                transport,
                surfaces,
                endpoint: Arc::new(endpoint),
                on_ready: Arc::new(on_ready),
                state: StateCell::new(),
                inflight: Mutex::new(Inflight {
                    sequence: RequestSequence::default(),
                    task: None,
                    nested: Vec::new(),
                }),
            }),
        })
    }

    /// Endpoint URL the controller would fetch for `request`.
    pub fn endpoint_for(&self, request: &LoadRequest) -> String {
        (self.shared.endpoint)(request)
    }
}

impl Shared {
    async fn apply(
        &self,
        ticket: Ticket,
        request: &LoadRequest,
        result: Result<PartialContent, FetchError>,
    ) {
        let mut inflight = self.inflight.lock().await;
        if !inflight.sequence.is_current(ticket) {
            debug!(
                controller = %self.name,
                seq = ticket.value(),
                current = inflight.sequence.current(),
                "discarding stale response"
            );
            return;
        }
        inflight.task = None;

        match result {
            Ok(content) => {
                self.surfaces.sidebar.replace(content.html());
                self.surfaces.focus.clear();
                (self.on_ready)(ContentReady {
                    request,
                    content: &content,
                    surfaces: &self.surfaces,
                    transport: &self.transport,
                    nested: &mut inflight.nested,
                });
            }
            Err(err) if err.is_cancellation() => {
                debug!(controller = %self.name, seq = ticket.value(), "request cancelled");
            }
            Err(err) => {
                warn!(controller = %self.name, seq = ticket.value(), %err, "failed to load content");
                self.surfaces.focus.clear();
                self.surfaces
                    .sidebar
                    .replace(&error_fragment(&format!("Failed to load content: {err}")));
            }
        }
        self.state.set(ControllerState::Loaded);
    }
}

#[async_trait]
impl Controller for FetchController {
    fn name(&self) -> &str {
        &self.shared.name
    }

    fn state(&self) -> ControllerState {
        self.shared.state.get()
    }

    async fn load(&self, request: LoadRequest) {
        let url = (self.shared.endpoint)(&request);
        let mut inflight = self.shared.inflight.lock().await;
        inflight.release();
        let ticket = inflight.sequence.issue();
        self.shared.state.set(ControllerState::Loading);
        debug!(controller = %self.shared.name, seq = ticket.value(), %url, "issuing fetch");

        let shared = Arc::clone(&self.shared);
        inflight.task = Some(tokio::spawn(async move {
            let result = shared
                .transport
                .fetch(Request::get(url))
                .await
                .and_then(decode_partial);
            shared.apply(ticket, &request, result).await;
        }));
    }

    async fn unload(&self) {
        let mut inflight = self.shared.inflight.lock().await;
        inflight.release();
        inflight.sequence.invalidate();
        if self.shared.state.get() == ControllerState::Idle {
            return;
        }

        self.shared.state.set(ControllerState::Unloading);
        self.shared.surfaces.sidebar.clear();
        self.shared.surfaces.focus.clear();
        self.shared.state.set(ControllerState::Idle);
        debug!(controller = %self.shared.name, "unloaded");
    }

    async fn settled(&self) {
        self.shared.state.settled().await;
    }
}

#[cfg(test)]
#[path = "tests/fetch_controller_tests.rs"]
mod tests;
