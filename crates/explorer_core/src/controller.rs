//! Controller lifecycle shared by every sidebar content type.
//!
//! ```text
//! Idle --load()--> Loading --response(current)--> Loaded
//!                  Loading --response(stale)----> (discarded)
//! Loaded --load()--> Loading
//! (any) --unload()--> Unloading --> Idle
//! ```

use async_trait::async_trait;
use tokio::sync::watch;
use url::form_urlencoded;

use crate::router::MatchGroups;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Loading,
    Loaded,
    Unloading,
}

/// Identifies one issued request. Only the ticket matching the sequence's
/// current value may mutate rendered state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Per-owner monotonically increasing request counter.
#[derive(Debug, Default)]
pub struct RequestSequence {
    current: u64,
}

impl RequestSequence {
    /// Issues a new ticket, making every previously issued one stale.
    pub fn issue(&mut self) -> Ticket {
        self.current += 1;
        Ticket(self.current)
    }

    /// Makes every issued ticket stale without issuing a new one.
    pub fn invalidate(&mut self) {
        self.current += 1;
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.current
    }

    pub fn current(&self) -> u64 {
        self.current
    }
}

/// Everything a controller receives from a dispatched URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadRequest {
    pub groups: MatchGroups,
    /// Raw query string without the leading `?`, passed through unchanged.
    pub query: Option<String>,
    /// Raw fragment without the leading `#`, passed through unchanged.
    pub fragment: Option<String>,
}

impl LoadRequest {
    pub fn new(groups: MatchGroups) -> Self {
        Self {
            groups,
            query: None,
            fragment: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn group(&self, name: &str) -> Option<&str> {
        self.groups.get(name)
    }

    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.query
            .as_deref()
            .map(|query| {
                form_urlencoded::parse(query.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query_pairs()
            .into_iter()
            .find_map(|(key, value)| (key == name).then_some(value))
    }
}

#[async_trait]
pub trait Controller: Send + Sync {
    fn name(&self) -> &str;

    fn state(&self) -> ControllerState;

    /// Cancels any pending fetch of this instance and issues a new one.
    async fn load(&self, request: LoadRequest);

    /// Cancels any in-flight fetch and releases the sidebar and focus layer.
    /// Idempotent.
    async fn unload(&self);

    /// Resolves once the controller is no longer `Loading`.
    async fn settled(&self);
}

/// Observable controller state.
pub struct StateCell {
    tx: watch::Sender<ControllerState>,
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

impl StateCell {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ControllerState::Idle);
        Self { tx }
    }

    pub fn get(&self) -> ControllerState {
        *self.tx.borrow()
    }

    pub fn set(&self, state: ControllerState) {
        self.tx.send_replace(state);
    }

    pub async fn settled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|state| *state != ControllerState::Loading).await;
    }
}

/// Plain map browsing: no sidebar content, nothing to fetch.
#[derive(Default)]
pub struct IdleController {
    state: StateCell,
}

impl IdleController {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Controller for IdleController {
    fn name(&self) -> &str {
        "index"
    }

    fn state(&self) -> ControllerState {
        self.state.get()
    }

    async fn load(&self, _request: LoadRequest) {
        self.state.set(ControllerState::Loaded);
    }

    async fn unload(&self) {
        self.state.set(ControllerState::Idle);
    }

    async fn settled(&self) {
        self.state.settled().await;
    }
}
