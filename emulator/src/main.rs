mod session;

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use pcu_core::timing::SequencerTimings;
use session::Session;

struct Options {
    timings: SequencerTimings,
    transcript: Option<PathBuf>,
}

fn main() -> io::Result<()> {
    let options = parse_options().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("Usage: pcu-emulator [--timings <default|fast>] [--transcript <path>]");
        process::exit(2);
    });

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut session = Session::new(options.timings);
    if let Some(path) = options.transcript.as_deref() {
        session = session.with_transcript(path)?;
    }
    let mut line = String::new();

    writeln!(
        writer,
        "PCU emulator ready. Type `help` for commands or `exit` to quit."
    )?;

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        for response in session.handle_command(trimmed)? {
            writeln!(writer, "{response}")?;
        }
    }

    Ok(())
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_timings(tag: &str) -> Result<SequencerTimings, String> {
    if tag.eq_ignore_ascii_case("default") {
        Ok(SequencerTimings::DEFAULT)
    } else if tag.eq_ignore_ascii_case("fast") {
        Ok(SequencerTimings::FAST)
    } else {
        Err(format!("Unknown timing set `{tag}`"))
    }
}

fn parse_options() -> Result<Options, String> {
    let mut options = Options {
        timings: SequencerTimings::DEFAULT,
        transcript: None,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if let Some(value) = arg.strip_prefix("--timings=") {
            options.timings = parse_timings(value)?;
        } else if arg == "--timings" {
            let value = args
                .next()
                .ok_or_else(|| "Expected value after --timings".to_string())?;
            options.timings = parse_timings(&value)?;
        } else if let Some(value) = arg.strip_prefix("--transcript=") {
            options.transcript = Some(PathBuf::from(value));
        } else if arg == "--transcript" {
            let value = args
                .next()
                .ok_or_else(|| "Expected value after --transcript".to_string())?;
            options.transcript = Some(PathBuf::from(value));
        } else {
            return Err(format!("Unexpected argument `{arg}`"));
        }
    }

    Ok(options)
}
