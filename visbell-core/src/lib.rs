#![no_std]

// Visual bell core: turns audible alert events into indicator blink sessions.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library and exposing abstractions the other crates can adopt.

pub mod alert;
pub mod console;
pub mod event;
pub mod pattern;
pub mod telemetry;
