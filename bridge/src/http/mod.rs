//! Cloud HTTP API

pub mod client;
pub mod devices;
pub mod endpoints;
pub mod scenarios;
pub mod transport;
