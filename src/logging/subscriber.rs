//! `tracing` subscriber: one event format rendered for the console and for
//! the per-command log file.
use std::fmt;
use std::fs::{self, File};
use std::path::Path;
use std::sync::Mutex;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use super::utils::{format_utc_datetime, format_utc_time, log_file_path, strip_ansi};

/// Target of stage headers.
pub(super) const STAGE_TARGET: &str = "dots::stage";
/// Target of dry-run lines.
pub(super) const DRY_RUN_TARGET: &str = "dots::dry_run";

#[derive(Default)]
struct Message(String);

impl tracing::field::Visit for Message {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            value.clone_into(&mut self.0);
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

/// Where a [`DotsFormat`] renders to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sink {
    Console,
    File,
}

/// Event format shared by the console and file layers.
#[derive(Debug, Clone, Copy)]
struct DotsFormat(Sink);

impl<S, N> FormatEvent<S, N> for DotsFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let mut message = Message::default();
        event.record(&mut message);

        match self.0 {
            Sink::Console => writeln!(
                writer,
                "{}",
                console_line(*metadata.level(), metadata.target(), &message.0)
            ),
            Sink::File => writeln!(
                writer,
                "[{}] {}",
                format_utc_time(),
                file_line(*metadata.level(), metadata.target(), &strip_ansi(&message.0))
            ),
        }
    }
}

fn console_line(level: Level, target: &str, msg: &str) -> String {
    match (level, target) {
        (Level::ERROR, _) => format!("\x1b[31mERROR\x1b[0m {msg}"),
        (Level::WARN, _) => format!("\x1b[33mWARN\x1b[0m  {msg}"),
        (Level::INFO, STAGE_TARGET) => format!("\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m"),
        (Level::INFO, DRY_RUN_TARGET) => format!("  \x1b[33m[dry run]\x1b[0m {msg}"),
        (Level::INFO, _) => format!("  {msg}"),
        _ => format!("  \x1b[2m{msg}\x1b[0m"),
    }
}

fn file_line(level: Level, target: &str, msg: &str) -> String {
    match (level, target) {
        (Level::ERROR, _) => format!("    [error] {msg}"),
        (Level::WARN, _) => format!("    [warn] {msg}"),
        (Level::INFO, STAGE_TARGET) => format!("==> {msg}"),
        (Level::INFO, DRY_RUN_TARGET) => format!("    [dry run] {msg}"),
        (Level::INFO, _) => format!("    {msg}"),
        _ => format!("    [debug] {target}: {msg}"),
    }
}

/// Truncate `path`, write the run header and reopen it for appending.
pub(super) fn open_log_file(path: &Path) -> Option<File> {
    let rule = "=".repeat(42);
    let header = format!(
        "{rule}\ndots {} {}\n{rule}\n",
        env!("DOTS_VERSION"),
        format_utc_datetime()
    );
    fs::write(path, header).ok()?;
    fs::OpenOptions::new().append(true).open(path).ok()
}

/// Layer appending every event at DEBUG and above to `file`.
pub(super) fn file_layer<S>(file: File) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .event_format(DotsFormat(Sink::File))
        .with_writer(Mutex::new(file))
        .with_filter(LevelFilter::DEBUG)
}

/// Install the global subscriber.
///
/// The console shows INFO and above (DEBUG with `verbose`), with warnings
/// and errors on stderr. The log file at `$XDG_CACHE_HOME/dots/<command>.log`
/// receives everything from DEBUG up. Call once, before any logging.
pub fn init_subscriber(verbose: bool, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

    let console_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let console_writer = std::io::stderr
        .with_max_level(Level::WARN)
        .and(std::io::stdout.with_min_level(Level::INFO));
    let console_layer = tracing_subscriber::fmt::layer()
        .event_format(DotsFormat(Sink::Console))
        .with_writer(console_writer)
        .with_filter(console_level);

    let file_layer = log_file_path(command)
        .and_then(|path| open_log_file(&path))
        .map(file_layer);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}
