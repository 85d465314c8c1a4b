//! Property tests over random button and rail histories.

use pcu_core::counter::{TickCounter, WideTickCounter};
use pcu_core::persistence::PowerIntent;
use pcu_core::sequencer::{Inputs, Mode, OutputLevels, SequencerState, Transition, tick};
use pcu_core::timing::SequencerTimings;
use proptest::prelude::*;

const ALLOWED_EDGES: [(Mode, Mode); 11] = [
    (Mode::Sleeping, Mode::PowerOnRequested),
    (Mode::PowerOnRequested, Mode::PreRunning),
    (Mode::PowerOnRequested, Mode::WakeupPulse),
    (Mode::WakeupPulse, Mode::PreRunning),
    (Mode::PreRunning, Mode::Running),
    (Mode::Running, Mode::ShutdownPulse),
    (Mode::Running, Mode::VoltageLossCheck),
    (Mode::VoltageLossCheck, Mode::Sleeping),
    (Mode::VoltageLossCheck, Mode::Running),
    (Mode::ShutdownPulse, Mode::ShutdownRequested),
    (Mode::ShutdownRequested, Mode::Sleeping),
];

/// Runs of identical inputs, long enough to cross the fast thresholds.
fn input_runs() -> impl Strategy<Value = Vec<(bool, bool, u8)>> {
    proptest::collection::vec((any::<bool>(), any::<bool>(), 1u8..16), 0..80)
}

fn boot_intent() -> impl Strategy<Value = PowerIntent> {
    prop_oneof![Just(PowerIntent::On), Just(PowerIntent::Off)]
}

proptest! {
    #[test]
    fn transitions_follow_the_table(intent in boot_intent(), runs in input_runs()) {
        let mut state = SequencerState::boot_with(intent, SequencerTimings::FAST);

        for (button_pressed, rail_voltage_present, ticks) in runs {
            for _ in 0..ticks {
                let before = state.mode();
                let outcome = tick(&mut state, Inputs::new(button_pressed, rail_voltage_present));

                prop_assert_eq!(outcome.outputs, OutputLevels::for_mode(state.mode()));
                match outcome.transition {
                    Some(Transition { from, to }) => {
                        prop_assert_eq!(from, before);
                        prop_assert!(
                            ALLOWED_EDGES.contains(&(from, to)),
                            "unexpected edge {} -> {}", from, to
                        );
                    }
                    None => prop_assert_eq!(state.mode(), before),
                }

                let expected_persist = match outcome.transition {
                    Some(Transition { from: Mode::Sleeping, to: Mode::PowerOnRequested }) => {
                        Some(PowerIntent::On)
                    }
                    Some(Transition { from: Mode::Running, to: Mode::ShutdownPulse }) => {
                        Some(PowerIntent::Off)
                    }
                    _ => None,
                };
                prop_assert_eq!(outcome.persist, expected_persist);
            }
        }
    }

    #[test]
    fn press_timer_is_zero_while_released(runs in input_runs()) {
        let mut state = SequencerState::new(SequencerTimings::FAST);

        for (button_pressed, rail_voltage_present, ticks) in runs {
            for _ in 0..ticks {
                tick(&mut state, Inputs::new(button_pressed, rail_voltage_present));
                if !button_pressed {
                    prop_assert_eq!(state.press_ticks(), 0);
                    prop_assert!(!state.press_suppressed());
                }
            }
        }
    }

    #[test]
    fn running_is_idempotent_without_input(ticks in 1u32..5_000) {
        let mut state = SequencerState::boot_with(PowerIntent::On, SequencerTimings::FAST);
        while state.mode() != Mode::Running {
            tick(&mut state, Inputs::new(false, true));
        }

        for _ in 0..ticks {
            let outcome = tick(&mut state, Inputs::new(false, true));
            prop_assert_eq!(outcome.transition, None);
        }
        prop_assert_eq!(state.mode(), Mode::Running);
    }

    #[test]
    fn narrow_counter_saturates(ticks in 0u32..1_000) {
        let mut counter = TickCounter::default();
        for _ in 0..ticks {
            counter.advance();
        }
        prop_assert_eq!(u32::from(counter.value()), ticks.min(u32::from(u8::MAX)));
    }

    #[test]
    fn wide_counter_saturates(start in any::<u16>(), ticks in 0u32..1_000) {
        let mut counter = WideTickCounter::starting_at(start);
        for _ in 0..ticks {
            counter.advance();
        }
        let expected = (u32::from(start) + ticks).min(u32::from(u16::MAX));
        prop_assert_eq!(u32::from(counter.value()), expected);
    }
}
