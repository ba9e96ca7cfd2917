//! Dash Tab Registry
//!
//! Two independent tab sets, one for sessions and one for windows.
//! Each set keeps at most one active tab and reports selections and
//! creations on a typed channel. Tab sets never touch the network.

mod error;
mod kind;
mod set;
mod tab;

pub use error::TabError;
pub use kind::{TabKind, TabOrigin};
pub use set::{TabEvent, TabRegistry, TabSet};
pub use tab::Tab;

pub type Result<T> = std::result::Result<T, TabError>;
