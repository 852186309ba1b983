// huntwarden/src/lib.rs
//
// Library root. The binary in main.rs wires these together; integration
// tests drive the HTTP router directly.

pub mod anomaly;
pub mod api;
pub mod clue;
pub mod config;
pub mod engine;
pub mod error;
pub mod eval;
pub mod events;
pub mod fraud;
pub mod geo;
pub mod location;
pub mod npc;
pub mod otel;
pub mod redis_state;
pub mod state;
pub mod trust;
pub mod workers;
pub mod world;
