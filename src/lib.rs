//! Library crate for locked-dungeon-back, exposing modules for the binary and
//! integration tests.

pub mod analytics;
pub mod config;
pub mod dto;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
