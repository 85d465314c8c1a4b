use pcu_core::driver::{NoopOutputs, PowerSequencer};
use pcu_core::persistence::{IntentStore, MemoryIntentStore, PowerIntent};
use pcu_core::sequencer::{Inputs, Mode, OutputLevels, SequencerState, tick};
use pcu_core::timing::SequencerTimings;

const PRESSED: Inputs = Inputs::new(true, true);
const RELEASED: Inputs = Inputs::new(false, true);

/// Steps until `mode` is reached, returning the number of ticks taken.
fn run_until(state: &mut SequencerState, inputs: Inputs, mode: Mode, limit: u32) -> u32 {
    for elapsed in 1..=limit {
        tick(state, inputs);
        if state.mode() == mode {
            return elapsed;
        }
    }
    panic!("{mode} not reached within {limit} ticks, stuck in {}", state.mode());
}

#[test]
fn boot_with_on_intent_evaluates_power_on_requested_first() {
    let mut state = SequencerState::boot(PowerIntent::On);
    assert_eq!(state.mode(), Mode::PowerOnRequested);

    // A button still held across the power loss must not count as a press.
    let outcome = tick(&mut state, PRESSED);
    assert_eq!(state.mode(), Mode::PowerOnRequested);
    assert_eq!(outcome.transition, None);
    assert_eq!(state.press_ticks(), 0);
    assert!(outcome.outputs.power_rail);
}

#[test]
fn power_on_press_triggers_exactly_once() {
    let timings = SequencerTimings::DEFAULT;
    let mut state = SequencerState::new(timings);
    let mut transitions = 0;

    for elapsed in 1..=u32::from(timings.power_on_threshold) + 1 {
        let outcome = tick(&mut state, Inputs::new(true, false));
        if outcome.transition.is_some() {
            transitions += 1;
            assert_eq!(elapsed, u32::from(timings.power_on_threshold) + 1);
        }
    }
    assert_eq!(transitions, 1);
    assert_eq!(state.mode(), Mode::PowerOnRequested);

    // Keep holding through the whole power-up; the latch keeps the press
    // timer at zero, so no shutdown is requested.
    let mut persisted = 0;
    for _ in 0..1_000 {
        let outcome = tick(&mut state, PRESSED);
        persisted += usize::from(outcome.persist.is_some());
        assert_eq!(state.press_ticks(), 0);
    }
    assert_eq!(persisted, 0);
    assert_eq!(state.mode(), Mode::Running);
}

#[test]
fn full_lifecycle_with_default_timings() {
    let timings = SequencerTimings::DEFAULT;
    let mut state = SequencerState::new(timings);

    let pressed = run_until(&mut state, PRESSED, Mode::PowerOnRequested, 100);
    assert_eq!(pressed, u32::from(timings.power_on_threshold) + 1);

    let settle = run_until(&mut state, RELEASED, Mode::PreRunning, 100);
    assert_eq!(settle, u32::from(timings.rail_stabilization_delay) + 1);

    let grace = run_until(&mut state, RELEASED, Mode::Running, 1_000);
    assert_eq!(grace, u32::from(timings.pre_running_delay) + 1);

    let shutdown = run_until(&mut state, PRESSED, Mode::ShutdownPulse, 100);
    assert_eq!(shutdown, u32::from(timings.shutdown_threshold) + 1);
    assert!(state.outputs().shutdown_pulse);

    let pulse = run_until(&mut state, RELEASED, Mode::ShutdownRequested, 100);
    assert_eq!(pulse, u32::from(timings.shutdown_pulse_time) + 1);
    assert!(!state.outputs().shutdown_pulse);

    // CPU drops its rail once it has halted.
    let outcome = tick(&mut state, Inputs::new(false, false));
    assert_eq!(state.mode(), Mode::Sleeping);
    assert_eq!(outcome.outputs, OutputLevels::IDLE);
    assert!(state.wants_sleep());
}

#[test]
fn shutdown_timeout_forces_sleep_with_rail_present() {
    let timings = SequencerTimings::DEFAULT;
    let mut state = SequencerState::new(timings);
    run_until(&mut state, PRESSED, Mode::PowerOnRequested, 100);
    run_until(&mut state, RELEASED, Mode::Running, 1_000);
    run_until(&mut state, PRESSED, Mode::ShutdownPulse, 100);
    run_until(&mut state, RELEASED, Mode::ShutdownRequested, 100);

    for _ in 0..timings.shutdown_timeout {
        tick(&mut state, RELEASED);
    }
    assert_eq!(state.mode(), Mode::ShutdownRequested);

    tick(&mut state, RELEASED);
    assert_eq!(state.mode(), Mode::Sleeping);
    assert_eq!(state.press_ticks(), 0);
}

#[test]
fn running_is_stable_without_input() {
    let mut state = SequencerState::new(SequencerTimings::FAST);
    run_until(&mut state, PRESSED, Mode::PowerOnRequested, 100);
    run_until(&mut state, RELEASED, Mode::Running, 100);

    for _ in 0..10_000 {
        let outcome = tick(&mut state, RELEASED);
        assert_eq!(outcome.transition, None);
        assert_eq!(outcome.persist, None);
    }
    assert_eq!(state.mode(), Mode::Running);
}

#[test]
fn power_loss_resumes_from_stored_intent() {
    let timings = SequencerTimings::FAST;
    let (mut sequencer, error) =
        PowerSequencer::boot(MemoryIntentStore::erased(), NoopOutputs::new(), timings);
    assert!(error.is_none());

    for _ in 0..=timings.power_on_threshold {
        sequencer.step(PRESSED).unwrap();
    }
    assert_eq!(sequencer.mode(), Mode::PowerOnRequested);

    // Supply drops before the system finished booting.
    let (mut store, outputs) = sequencer.into_parts();
    assert_eq!(store.load(), Ok(PowerIntent::On));

    let (sequencer, error) = PowerSequencer::boot(store, outputs, timings);
    assert!(error.is_none());
    assert_eq!(sequencer.mode(), Mode::PowerOnRequested);
    assert!(sequencer.state().press_suppressed());
}
