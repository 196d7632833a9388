//! TrackBridge Server Library
//!
//! Exposes bridge components for integration testing.

pub mod config;
pub mod feed;
pub mod poller;
pub mod registry;
pub mod relay;
pub mod state;
