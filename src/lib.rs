//! routekit: integration route definitions as a typed, schema-driven tree
//!
//! Layers, innermost first: `domain` (element model, codec, mutation, topology,
//! validation), `application` (services over files), `infrastructure` (I/O, catalog,
//! wiring) and `cli`.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
