mod host;
mod session;

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use session::{Session, SessionOptions};
use visbell_core::event::{OutOfRangePolicy, VISUAL_BELL_IDENTITY};

const USAGE: &str = "Usage: visbell-emulator [--window <ms>] [--transcript <path>] [--turn-off-out-of-range]";

fn main() -> io::Result<()> {
    let options = parse_options(env::args().skip(1)).unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut session = Session::new(options)?;
    let mut line = String::new();

    writeln!(writer, "Visual bell emulator ready: {VISUAL_BELL_IDENTITY}")?;
    writeln!(writer, "Type `help` for commands or `exit` to quit.")?;

    loop {
        for background in session.background_lines()? {
            writeln!(writer, "{background}")?;
        }

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

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<SessionOptions, String> {
    let mut options = SessionOptions::default();

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg, None),
        };

        match flag.as_str() {
            "--window" => {
                let value = inline
                    .or_else(|| args.next())
                    .ok_or("Expected value after --window")?;
                let millis: u64 = value
                    .parse()
                    .map_err(|_| format!("Invalid blink window `{value}`"))?;
                if millis == 0 {
                    return Err("Blink window must be positive".to_string());
                }
                options.alert = options
                    .alert
                    .with_blink_window(Duration::from_millis(millis));
            }
            "--transcript" => {
                let value = inline
                    .or_else(|| args.next())
                    .ok_or("Expected value after --transcript")?;
                options.transcript = Some(PathBuf::from(value));
            }
            "--turn-off-out-of-range" => {
                options.alert = options.alert.with_out_of_range(OutOfRangePolicy::TurnOff);
            }
            other => return Err(format!("Unknown argument `{other}`")),
        }
    }

    Ok(options)
}
