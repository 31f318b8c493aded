//! Domain records

pub mod device;
pub mod station;
