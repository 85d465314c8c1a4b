#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Log lines emitted by the sequencer task.
//!
//! Target builds go through `defmt`; host builds print the same lines so the
//! formatting can be exercised without hardware.

use core::fmt;

use pcu_core::persistence::PowerIntent;
use pcu_core::sequencer::Transition;

use crate::status::StatusSnapshot;

#[cfg(target_os = "none")]
pub fn log_boot(revision: &'static str, intent: PowerIntent) {
    defmt::info!(
        "pcu: firmware {} booted, stored intent {}",
        revision,
        intent_label(intent)
    );
}

#[cfg(not(target_os = "none"))]
pub fn log_boot(revision: &'static str, intent: PowerIntent) {
    println!(
        "pcu: firmware {} booted, stored intent {}",
        revision,
        intent_label(intent)
    );
}

#[cfg(target_os = "none")]
pub fn log_transition(tick: u32, transition: Transition) {
    defmt::info!(
        "sequencer: {} -> {} t={}",
        transition.from.as_str(),
        transition.to.as_str(),
        tick
    );
}

#[cfg(not(target_os = "none"))]
pub fn log_transition(tick: u32, transition: Transition) {
    println!(
        "sequencer: {} -> {} t={}",
        transition.from.as_str(),
        transition.to.as_str(),
        tick
    );
}

#[cfg(target_os = "none")]
pub fn log_drive_error<E: fmt::Display>(tick: u32, error: &E) {
    defmt::warn!(
        "sequencer: {} t={}",
        defmt::Display2Format(error),
        tick
    );
}

#[cfg(not(target_os = "none"))]
pub fn log_drive_error<E: fmt::Display>(tick: u32, error: &E) {
    println!("sequencer: {error} t={tick}");
}

#[cfg(target_os = "none")]
pub fn log_low_power_entry(status: StatusSnapshot) {
    defmt::info!(
        "sequencer: waiting for button t={} intent={} persist_failures={} output_failures={}",
        status.ticks,
        intent_label(status.intent),
        status.persist_failures,
        status.output_failures
    );
}

#[cfg(not(target_os = "none"))]
pub fn log_low_power_entry(status: StatusSnapshot) {
    println!(
        "sequencer: waiting for button t={} intent={} persist_failures={} output_failures={}",
        status.ticks,
        intent_label(status.intent),
        status.persist_failures,
        status.output_failures
    );
}

const fn intent_label(intent: PowerIntent) -> &'static str {
    match intent {
        PowerIntent::On => "on",
        PowerIntent::Off => "off",
    }
}
