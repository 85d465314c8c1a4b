use std::convert::Infallible;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::mem;
use std::path::Path;
use std::time::Duration;

use pcu_core::console::{self, CommandKeyword, ConsoleCommand};
use pcu_core::driver::{DriveError, PowerOutputs, PowerSequencer};
use pcu_core::persistence::{MemoryIntentStore, MemoryStoreError, PowerIntent};
use pcu_core::sequencer::{Inputs, OutputLevels};
use pcu_core::timing::{FIRMWARE_REVISION, SequencerTimings, TICK_PERIOD};

/// Output sink that remembers the last level driven on each line.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct SimulatedOutputs {
    levels: OutputLevels,
}

impl SimulatedOutputs {
    pub fn levels(&self) -> OutputLevels {
        self.levels
    }
}

impl PowerOutputs for SimulatedOutputs {
    type Error = Infallible;

    fn set_power_rail(&mut self, on: bool) -> Result<(), Self::Error> {
        self.levels.power_rail = on;
        Ok(())
    }

    fn set_wake_pulse(&mut self, asserted: bool) -> Result<(), Self::Error> {
        self.levels.wake_pulse = asserted;
        Ok(())
    }

    fn set_shutdown_pulse(&mut self, asserted: bool) -> Result<(), Self::Error> {
        self.levels.shutdown_pulse = asserted;
        Ok(())
    }
}

type SimulatedSequencer = PowerSequencer<MemoryIntentStore, SimulatedOutputs>;
type SimulatedError = DriveError<MemoryStoreError, Infallible>;

/// Input levels of the simulated board.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
struct Board {
    button_pressed: bool,
    rail_present: bool,
}

impl Board {
    fn inputs(self) -> Inputs {
        Inputs::new(self.button_pressed, self.rail_present)
    }
}

/// Interactive session driving the core sequencer against a simulated board.
pub struct Session {
    sequencer: SimulatedSequencer,
    board: Board,
    timings: SequencerTimings,
    power_cycles: u32,
    transcript: Option<TranscriptLogger>,
}

impl Session {
    /// Boots a fresh board with an erased intent store.
    pub fn new(timings: SequencerTimings) -> Self {
        Self {
            sequencer: boot_erased(timings),
            board: Board::default(),
            timings,
            power_cycles: 0,
            transcript: None,
        }
    }

    /// Mirrors every command and response into a transcript file at `path`.
    pub fn with_transcript(mut self, path: &Path) -> io::Result<Self> {
        self.transcript = Some(TranscriptLogger::new(path, self.timings)?);
        Ok(self)
    }

    /// Parses and executes one console line, returning the lines to print.
    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let elapsed = self.elapsed();
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.append_line(elapsed, TranscriptRole::Host, trimmed)?;
        }

        let lines = match console::parse(trimmed) {
            Ok(command) => self.execute(command),
            Err(error) => vec![format!("ERR syntax {error}")],
        };

        let elapsed = self.elapsed();
        if let Some(transcript) = self.transcript.as_mut() {
            for response in &lines {
                transcript.append_line(elapsed, TranscriptRole::Emulator, response)?;
            }
        }

        Ok(lines)
    }

    fn execute(&mut self, command: ConsoleCommand) -> Vec<String> {
        match command {
            ConsoleCommand::Tick(count) => {
                let mut lines = self.run_ticks(count);
                lines.push(format!(
                    "OK tick {count} t={} mode={}",
                    self.sequencer.ticks(),
                    self.sequencer.mode()
                ));
                lines
            }
            ConsoleCommand::Press => {
                self.board.button_pressed = true;
                vec!["OK button pressed".to_string()]
            }
            ConsoleCommand::Release => {
                self.board.button_pressed = false;
                vec!["OK button released".to_string()]
            }
            ConsoleCommand::Hold(count) => {
                self.board.button_pressed = true;
                let mut lines = self.run_ticks(count);
                self.board.button_pressed = false;
                lines.push(format!(
                    "OK held {count} ticks ({} ms) mode={}",
                    SequencerTimings::duration_of(count).as_millis(),
                    self.sequencer.mode()
                ));
                lines
            }
            ConsoleCommand::Rail(present) => {
                self.board.rail_present = present;
                vec![format!("OK rail {}", on_off(present))]
            }
            ConsoleCommand::Status => self.status_lines(),
            ConsoleCommand::History => self.history_lines(),
            ConsoleCommand::PowerCycle => self.power_cycle(),
            ConsoleCommand::Help(topic) => help_lines(topic),
        }
    }

    fn run_ticks(&mut self, count: u32) -> Vec<String> {
        let mut lines = Vec::new();
        for _ in 0..count {
            let before = self.sequencer.mode();
            let result = self.sequencer.step(self.board.inputs());
            let after = self.sequencer.mode();
            let tick = self.sequencer.ticks();

            if before != after {
                lines.push(format!("t={tick} {before} -> {after}"));
            }

            match result {
                Ok(report) => {
                    if let Some(intent) = report.outcome.persist {
                        lines.push(format!("t={tick} intent {intent} stored"));
                    }
                }
                Err(error) => lines.push(describe_error(tick, &error)),
            }
        }
        lines
    }

    fn status_lines(&self) -> Vec<String> {
        let state = self.sequencer.state();
        let outputs = self.sequencer.outputs().levels();
        let stored = PowerIntent::from_stored_byte(self.sequencer.store().raw());

        vec![
            format!(
                "OK mode={} t={} press={}{}",
                state.mode(),
                self.sequencer.ticks(),
                state.press_ticks(),
                if state.press_suppressed() {
                    " (suppressed)"
                } else {
                    ""
                }
            ),
            format!(
                "  inputs button={} rail={}",
                if self.board.button_pressed {
                    "pressed"
                } else {
                    "released"
                },
                on_off(self.board.rail_present)
            ),
            format!(
                "  outputs rail={} wake={} shutdown={}",
                on_off(outputs.power_rail),
                on_off(outputs.wake_pulse),
                on_off(outputs.shutdown_pulse)
            ),
            format!(
                "  intent={stored} power-cycles={} firmware={FIRMWARE_REVISION}",
                self.power_cycles
            ),
        ]
    }

    fn history_lines(&self) -> Vec<String> {
        let telemetry = self.sequencer.telemetry();
        let mut lines: Vec<String> = telemetry
            .oldest_first()
            .map(|record| format!("  {record}"))
            .collect();
        lines.push(format!(
            "OK {} records ({} total)",
            telemetry.len(),
            telemetry.total_recorded()
        ));
        lines
    }

    /// Drops supply to the whole board and boots again from the stored intent.
    ///
    /// The CPU rail collapses with the supply and the button is let go.
    fn power_cycle(&mut self) -> Vec<String> {
        let placeholder = boot_erased(self.timings);
        let (store, _) = mem::replace(&mut self.sequencer, placeholder).into_parts();

        let (sequencer, error) =
            PowerSequencer::boot(store, SimulatedOutputs::default(), self.timings);
        self.sequencer = sequencer;
        self.board = Board::default();
        self.power_cycles += 1;

        let intent = PowerIntent::from_stored_byte(self.sequencer.store().raw());
        let mut lines = Vec::new();
        if let Some(error) = error {
            lines.push(describe_error(0, &error));
        }
        lines.push(format!(
            "OK power-cycled intent={intent} mode={}",
            self.sequencer.mode()
        ));
        lines
    }

    fn elapsed(&self) -> Duration {
        TICK_PERIOD * self.sequencer.ticks()
    }

    #[cfg(test)]
    fn sequencer(&self) -> &SimulatedSequencer {
        &self.sequencer
    }

    #[cfg(test)]
    fn store_mut(&mut self) -> &mut MemoryIntentStore {
        self.sequencer.store_mut()
    }
}

fn boot_erased(timings: SequencerTimings) -> SimulatedSequencer {
    PowerSequencer::boot(MemoryIntentStore::erased(), SimulatedOutputs::default(), timings).0
}

fn describe_error(tick: u32, error: &SimulatedError) -> String {
    match error {
        DriveError::Persist(inner) => format!("ERR t={tick} persist {inner}"),
        DriveError::Output(inner) => match *inner {},
    }
}

fn on_off(level: bool) -> &'static str {
    if level { "on" } else { "off" }
}

fn help_lines(topic: Option<CommandKeyword>) -> Vec<String> {
    match topic {
        Some(keyword) => vec![format!("  {:<14} - {}", keyword.usage(), keyword.summary())],
        None => {
            let mut lines = vec!["Available commands:".to_string()];
            for keyword in CommandKeyword::ALL {
                lines.push(format!("  {:<14} - {}", keyword.usage(), keyword.summary()));
            }
            lines.push("Type `help <topic>` for a specific command.".to_string());
            lines
        }
    }
}

struct TranscriptLogger {
    writer: BufWriter<fs::File>,
}

impl TranscriptLogger {
    fn new(path: &Path, timings: SequencerTimings) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };

        writeln!(logger.writer, "# PCU emulator transcript ({FIRMWARE_REVISION})")?;
        writeln!(
            logger.writer,
            "# Timestamps are simulated milliseconds; thresholds {timings:?}"
        )?;
        writeln!(logger.writer)?;
        logger.writer.flush()?;
        Ok(logger)
    }

    fn append_line(
        &mut self,
        elapsed: Duration,
        role: TranscriptRole,
        line: &str,
    ) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>8} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcu_core::sequencer::Mode;

    fn run(session: &mut Session, line: &str) -> Vec<String> {
        session.handle_command(line).expect("session io")
    }

    fn powered_session() -> Session {
        let mut session = Session::new(SequencerTimings::FAST);
        run(&mut session, "rail on");
        run(&mut session, "hold 3");
        run(&mut session, "tick 20");
        session
    }

    #[test]
    fn hold_powers_on_and_stores_intent() {
        let mut session = Session::new(SequencerTimings::FAST);
        run(&mut session, "rail on");
        let lines = run(&mut session, "hold 3");

        assert!(lines.contains(&"t=3 sleeping -> power-on-requested".to_string()));
        assert!(lines.contains(&"t=3 intent on stored".to_string()));
        assert_eq!(session.sequencer().store().raw(), 0x00);
    }

    #[test]
    fn ticking_reaches_running_with_rail_up() {
        let session = powered_session();
        assert_eq!(session.sequencer().mode(), Mode::Running);
        assert!(session.sequencer().outputs().levels().power_rail);
    }

    #[test]
    fn long_hold_shuts_down_and_clears_intent() {
        let mut session = powered_session();
        let lines = run(&mut session, "hold 6");
        assert!(lines.iter().any(|line| line.ends_with("running -> shutdown-pulse")));
        assert!(lines.iter().any(|line| line.ends_with("intent off stored")));

        run(&mut session, "rail off");
        run(&mut session, "tick 5");
        assert_eq!(session.sequencer().mode(), Mode::Sleeping);
        assert_eq!(session.sequencer().store().raw(), 0xFF);
    }

    #[test]
    fn power_cycle_boots_from_stored_intent() {
        let mut session = powered_session();
        let lines = run(&mut session, "power-cycle");
        assert!(
            lines
                .last()
                .is_some_and(|line| line.starts_with("OK power-cycled intent=on"))
        );

        run(&mut session, "rail on");
        run(&mut session, "tick 20");
        assert_eq!(session.sequencer().mode(), Mode::Running);

        let status = run(&mut session, "status");
        assert!(status[3].contains("power-cycles=1"));
    }

    #[test]
    fn persist_failure_is_reported_and_outputs_still_follow() {
        let mut session = Session::new(SequencerTimings::FAST);
        session.store_mut().fail_next_store();
        run(&mut session, "rail on");
        let lines = run(&mut session, "hold 3");

        assert!(lines.iter().any(|line| line.starts_with("ERR t=3 persist")));
        assert_eq!(session.sequencer().mode(), Mode::PowerOnRequested);
        assert!(session.sequencer().outputs().levels().power_rail);
        assert_eq!(session.sequencer().store().raw(), 0xFF);
    }

    #[test]
    fn syntax_errors_are_reported() {
        let mut session = Session::new(SequencerTimings::FAST);
        let lines = run(&mut session, "bogus");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("ERR syntax"));
    }

    #[test]
    fn help_lists_every_command() {
        let mut session = Session::new(SequencerTimings::FAST);
        let lines = run(&mut session, "help");
        for keyword in CommandKeyword::ALL {
            assert!(lines.iter().any(|line| line.contains(keyword.usage())));
        }
    }

    #[test]
    fn history_ends_with_record_count() {
        let mut session = powered_session();
        let lines = run(&mut session, "history");
        assert!(lines[0].contains("booted intent=off"));
        assert!(lines.last().is_some_and(|line| line.starts_with("OK ")));
    }
}
