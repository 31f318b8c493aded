//! Cloud session and login

pub mod csrf;
pub mod qr_login;
pub mod session_mngr;
