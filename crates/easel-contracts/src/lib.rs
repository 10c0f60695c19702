pub mod asset;
pub mod error;
pub mod events;
pub mod geometry;
pub mod score;
pub mod state;
