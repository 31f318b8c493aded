//! On-disk storage

pub mod layout;
pub mod session;
pub mod settings;
