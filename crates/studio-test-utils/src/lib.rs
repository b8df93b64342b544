//! # Studio Test Utilities
//!
//! Shared test utilities for the Studio Controller.
//!
//! ## Modules
//!
//! - `fixtures` - Seeded rooms with participants and sources
//! - `mock_store` - Collaborator stores that always fail
//! - `server_harness` - Spawn a real Studio Controller on a random port
//!
//! ## Usage
//!
//! ```rust,ignore
//! use studio_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let room = TestRoom::new("studio-a")
//!         .with_participant("alice", "Alice")
//!         .with_microphone("mic-alice", "alice");
//!
//!     let server = TestStudioServer::spawn(room.into_store()).await?;
//!     // Connect to server.ws_url(), call server.url() ...
//!     Ok(())
//! }
//! ```

pub mod fixtures;
pub mod mock_store;
pub mod server_harness;

pub use fixtures::*;
pub use mock_store::*;
pub use server_harness::*;
