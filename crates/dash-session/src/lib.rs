//! Dash Session Lifecycle
//!
//! Provisions backend sessions over HTTP and drives the connection
//! lifecycle: create, attach, relay, detect loss, retry. The lifecycle is
//! a synchronous state machine that answers every event with a list of
//! actions; the caller performs the IO.

mod api;
mod error;
mod lifecycle;
mod session;
mod state;

pub use api::SessionApi;
pub use error::SessionError;
pub use lifecycle::{
    Action, LifecycleOptions, Outgoing, ProvisioningMode, SessionLifecycle, StatusIndicator,
};
pub use session::Session;
pub use state::LifecycleState;

pub type Result<T> = std::result::Result<T, SessionError>;
