//! Audio/video routing: the per-room matrix and level handling.

pub mod levels;
pub mod matrix;

pub use levels::Level;
pub use matrix::RoutingMatrix;
