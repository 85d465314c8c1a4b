#![no_std]

// Power sequencing logic for the AirSensEUR power control unit.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library and exposing the pin, flash and tick seams as traits.

pub mod console;
pub mod counter;
pub mod driver;
pub mod persistence;
pub mod rail;
pub mod sequencer;
pub mod telemetry;
pub mod timing;
