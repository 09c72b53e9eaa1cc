use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use visbell_core::alert::{AlertConfig, Transition};
use visbell_core::console::{self, ConsoleCommand, HELP_TOPICS, StatusFormatter};
use visbell_core::event::{ENODEV, STATUS_OK};

use crate::host::{self, HostDevice, HostInstant, LedFeed};

/// Telemetry records shown by `status`.
const STATUS_HISTORY: usize = 8;

/// Startup options for an emulator session.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub alert: AlertConfig,
    pub transcript: Option<PathBuf>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            alert: AlertConfig::DEFAULT,
            transcript: None,
        }
    }
}

pub struct Session {
    device: Arc<HostDevice>,
    feed: LedFeed,
    config: AlertConfig,
    transcript: Option<TranscriptLogger>,
    started_at: Instant,
}

impl Session {
    /// Creates a session with the indicator already bound.
    pub fn new(options: SessionOptions) -> io::Result<Self> {
        let transcript = options
            .transcript
            .as_deref()
            .map(TranscriptLogger::create)
            .transpose()?;

        let device = Arc::new(HostDevice::new());
        let feed = LedFeed::default();
        host::bind(&device, &feed, options.alert)?;

        Ok(Self {
            device,
            feed,
            config: options.alert,
            transcript,
            started_at: Instant::now(),
        })
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let elapsed = self.started_at.elapsed();
        self.record(elapsed, TranscriptRole::Host, &[trimmed.to_string()])?;

        // Indicator activity from the deadline thread since the last command.
        let mut lines = self.feed.drain();
        match console::parse(trimmed) {
            Ok(command) => lines.extend(self.dispatch(command)?),
            Err(err) => lines.push(format!("ERR syntax {err}")),
        }
        lines.extend(self.feed.drain());

        self.record(elapsed, TranscriptRole::Emulator, &lines)?;
        Ok(lines)
    }

    /// Indicator activity that happened while the operator was idle.
    pub fn background_lines(&mut self) -> io::Result<Vec<String>> {
        let lines = self.feed.drain();
        self.record(self.started_at.elapsed(), TranscriptRole::Emulator, &lines)?;
        Ok(lines)
    }

    fn dispatch(&mut self, command: ConsoleCommand<'_>) -> io::Result<Vec<String>> {
        let now = HostInstant::now();
        let line = match command {
            ConsoleCommand::Tone(_) | ConsoleCommand::Bell(_) | ConsoleCommand::Raw { .. } => {
                let Some((event_type, code, value)) = command.raw_event() else {
                    return Ok(Vec::new());
                };
                describe_status(self.device.event(event_type, code, value, now))
            }
            ConsoleCommand::Init => {
                host::bind(&self.device, &self.feed, self.config)?;
                let window = self
                    .device
                    .inspect(|controller| controller.config().blink_window)
                    .unwrap_or(self.config.blink_window);
                format!("OK bound window={}ms", window.as_millis())
            }
            ConsoleCommand::Suspend => describe_transition("suspend", self.device.on_suspend(now)),
            ConsoleCommand::Shutdown => {
                describe_transition("shutdown", self.device.on_shutdown(now))
            }
            ConsoleCommand::Remove => describe_transition("remove", self.device.on_remove(now)),
            ConsoleCommand::Status => return Ok(self.status_lines(now)),
            ConsoleCommand::Help(topic) => return Ok(help_lines(topic)),
        };
        Ok(vec![line])
    }

    fn status_lines(&self, now: HostInstant) -> Vec<String> {
        let snapshot = self.device.snapshot();
        let formatter = StatusFormatter::new(snapshot.as_ref(), now);

        let mut lines = Vec::new();
        let mut line = String::new();
        if formatter.write_session_line(&mut line).is_ok() {
            lines.push(line);
        }

        let history = self
            .device
            .inspect(|controller| {
                let telemetry = controller.telemetry();
                let skip = telemetry.len().saturating_sub(STATUS_HISTORY);
                let mut history = telemetry
                    .oldest_first()
                    .skip(skip)
                    .filter_map(|record| {
                        let mut line = String::from("  ");
                        formatter.write_record_line(&mut line, record).ok()?;
                        Some(line)
                    })
                    .collect::<Vec<_>>();

                let mut footer = String::new();
                if formatter
                    .write_history_line(&mut footer, history.len(), telemetry.total_recorded())
                    .is_ok()
                {
                    history.push(footer);
                }
                history
            })
            .unwrap_or_default();
        lines.extend(history);
        lines
    }

    fn record(&mut self, elapsed: Duration, role: TranscriptRole, lines: &[String]) -> io::Result<()> {
        if let Some(transcript) = self.transcript.as_mut() {
            for line in lines {
                transcript.append_line(elapsed, role, line)?;
            }
        }
        Ok(())
    }
}

fn describe_status(status: i32) -> String {
    match status {
        STATUS_OK => "OK".to_string(),
        ENODEV => format!("ERR status={status} (no indicator bound; run `init`)"),
        _ => format!("ERR status={status} (invalid event)"),
    }
}

fn describe_transition(hook: &str, transition: Transition) -> String {
    match transition {
        Transition::Stopped => format!("OK {hook}: blink stopped"),
        _ => format!("OK {hook}: already idle"),
    }
}

fn help_lines(topic: Option<&str>) -> Vec<String> {
    match topic {
        Some(target) => match console::help_for(target) {
            Some(detail) => vec![detail.to_string()],
            None => vec![
                format!("No help available for `{target}`."),
                format!("Available topics: {}", help_topic_list()),
            ],
        },
        None => {
            let mut lines = vec!["Available commands:".to_string()];
            lines.extend(HELP_TOPICS.iter().map(|(_, detail)| format!("  {detail}")));
            lines.push("Type `help <topic>` for a specific command.".to_string());
            lines
        }
    }
}

fn help_topic_list() -> String {
    HELP_TOPICS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn create(path: &Path) -> io::Result<Self> {
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

        logger.write_header()?;
        Ok(logger)
    }

    fn write_header(&mut self) -> io::Result<()> {
        writeln!(self.writer, "# Visual bell emulator transcript")?;
        writeln!(
            self.writer,
            "# Timestamps are milliseconds since session start"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(
        &mut self,
        elapsed: Duration,
        role: TranscriptRole,
        line: &str,
    ) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

#[derive(Clone, Copy)]
enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}
