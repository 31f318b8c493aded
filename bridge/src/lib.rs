//! yadevices library
//!
//! Core modules for the Yandex smart-home cloud bridge.

pub mod app;
pub mod authn;
pub mod codec;
pub mod commands;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod notify;
pub mod objects;
pub mod storage;
pub mod store;
pub mod sync;
pub mod utils;
pub mod workers;
