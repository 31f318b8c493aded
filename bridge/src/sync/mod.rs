//! Cloud to local synchronization

pub mod device_state;
pub mod directory;
pub mod stations;
