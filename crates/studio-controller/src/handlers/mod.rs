//! HTTP request handlers for the Studio Controller.

pub mod metrics;
pub mod routing;
pub mod signaling;

pub use metrics::metrics_handler;
pub use signaling::ws_upgrade;
