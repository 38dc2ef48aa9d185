#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Kiosk binary support: CLI, logging, device assembly, HTTP surface and the
//! remote kiosk client. `main.rs` only wires these together.

pub mod cli;
pub mod devices;
pub mod error_fmt;
pub mod http;
pub mod logging;
pub mod qr;
pub mod remote;
pub mod tools;
