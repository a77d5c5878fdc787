//! Client-side navigation engine of the map explorer: URL routing onto
//! sidebar controllers, partial-content loading, form submission feedback
//! and paginated lists.

pub mod config;
pub mod controller;
pub mod error;
pub mod fetch_controller;
pub mod form;
pub mod pagination;
pub mod render;
pub mod router;
pub mod routes;
pub mod transport;

pub use config::{load_settings, Settings};
pub use controller::{Controller, ControllerState, IdleController, LoadRequest};
pub use error::{FetchError, RouteError, ValidationError};
pub use fetch_controller::{ContentReady, FetchController, Surfaces};
pub use form::{configure, Form, FormOptions, SubmitOutcome};
pub use pagination::{Pagination, PaginationOptions};
pub use router::{Dispatch, Router};
pub use routes::standard_router;
pub use transport::{HttpTransport, Transport};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
