//! Core drive logic for a six-motor differential-drive competition robot on
//! no-std platforms.
//!
//! For a host-side run against a simulated motor bus, see `ddb-app/sim-robot`.
#![no_std]

pub mod utils;
