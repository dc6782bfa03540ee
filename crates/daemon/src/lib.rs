#![forbid(unsafe_code)]

//! Archive validation daemon: bridges the test-bed protocol to the
//! validation backend's upload/report REST API.

pub mod api;
pub mod archive;
pub mod backend;
pub mod config;
pub mod service;
pub mod session;
