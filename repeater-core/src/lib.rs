#![no_std]

// Shared logic for the low-duty-cycle repeater feature set.
//
// This crate stays portable across MCU firmware and host tooling by avoiding
// the Rust standard library and exposing capability traits the surrounding
// application implements for its board.

pub mod console;
pub mod diagnostics;
pub mod lifecycle;
pub mod platform;
pub mod standby;
pub mod taps;
