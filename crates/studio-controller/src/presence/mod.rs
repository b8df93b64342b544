//! Presence state: who is connected and which rooms they have joined.

pub mod membership;
pub mod registry;

pub use membership::MembershipTable;
pub use registry::{ConnectionRegistry, DeliveryError};
