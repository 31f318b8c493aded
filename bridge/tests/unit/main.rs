//! Integration tests against a scripted cloud

mod common;

mod test_client;
mod test_login;
mod test_session;
mod test_stations;
