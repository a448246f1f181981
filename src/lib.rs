//! Load planning for truck shipments.
//!
//! Packs a queue of shipments into a container with a deterministic shelf
//! heuristic, estimates route costs and driver shifts, and merges both into
//! a load report. The `api` module serves all of it over HTTP.

pub mod api;
pub mod config;
pub mod cost;
pub mod fleet;
pub mod geometry;
pub mod model;
pub mod packing;
pub mod planner;
pub mod report;
pub mod route;
pub mod types;
