#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Shared models and pure logic for the archive validation bridge.
//!
//! The daemon speaks a test-bed style protocol on its front-end and a two-call
//! REST protocol (upload, then fetch report) towards the validation backend.
//! Everything in this crate is free of I/O.

pub mod api;
pub mod definition;
pub mod model;
pub mod report;
pub mod request;

mod util;

pub use util::{new_token, normalize_quotes, now_ms};
