//! Dialog actions around the product configuration core.
//!
//! The crate turns one user turn into tracker events and outbound
//! utterances:
//! - `actions` holds every registered action: the product form, the
//!   product-aware queries over the session cache, reset and fallbacks
//! - `registry` maps action names to `Action` trait objects
//! - `runtime` picks the action for an intent and chains follow-ups
//!   (form activation, re-running a query once the form has submitted)
//! - `tracker` is an in-memory conversation state used by the CLI and tests
//!
//! Prices, packages and scopes are always decided by `dealbot-core`; the
//! actions only phrase what the catalog and the session cache hold.

pub mod actions;
pub mod context;
pub mod labels;
pub mod promotions;
pub mod registry;
pub mod runtime;
pub mod tracker;

pub use context::ActionContext;
pub use registry::{Action, ActionRegistry, ActionResponse};
pub use runtime::{DialogRuntime, IntentPolicy};
pub use tracker::{InMemoryTracker, UserMessage};
