//! Background tasks.
//!
//! - Room reaper: deletes rooms that stayed empty past the TTL
//! - Auto-router: turns participant joins into routes
//!
//! Both take a `CancellationToken` tied to process shutdown.

pub mod auto_router;
pub mod room_reaper;

pub use auto_router::start_auto_router;
pub use room_reaper::{reap_once, start_room_reaper, RoomReaperConfig, RoomReaperHandle};
