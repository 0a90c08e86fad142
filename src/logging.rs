//! Diagnostic logging setup.
//!
//! All diagnostics go to standard error through tracing-subscriber, leaving
//! standard output for `DATA:` lines. The plain format prints one
//! `Log: <message>` or `Error: <message>` line per event.

use crate::config::{LogFormat, Settings};
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::registry::LookupSpan;

/// `Log:` / `Error:` line format
pub struct PrefixFormat;

impl<S, N> FormatEvent<S, N> for PrefixFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let prefix = if *event.metadata().level() == Level::ERROR {
            "Error"
        } else {
            "Log"
        };
        write!(writer, "{}: ", prefix)?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Build a subscriber writing to `writer` with the given filter directive.
pub fn subscriber<W>(directive: &str, format: LogFormat, writer: W) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);

    match format {
        LogFormat::Plain => Box::new(builder.event_format(PrefixFormat).finish()),
        LogFormat::Json => Box::new(builder.json().finish()),
    }
}

/// Pick the filter directive: `RUST_LOG` when it parses, else the
/// configured level. The second value is a rejected `RUST_LOG`, if any.
fn choose_directive(env: Option<String>, configured: &str) -> (String, Option<String>) {
    match env {
        Some(env) if EnvFilter::try_new(&env).is_ok() => (env, None),
        Some(env) => (configured.to_string(), Some(env)),
        None => (configured.to_string(), None),
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level.
pub fn init(settings: &Settings) -> anyhow::Result<()> {
    let (directive, rejected) =
        choose_directive(std::env::var(EnvFilter::DEFAULT_ENV).ok(), &settings.log_level);
    tracing::subscriber::set_global_default(subscriber(&directive, settings.log_format, std::io::stderr))
        .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {}", e))?;

    if let Some(env) = rejected {
        tracing::warn!(
            "Ignoring invalid {} filter '{}'; using '{}'",
            EnvFilter::DEFAULT_ENV,
            env,
            directive
        );
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::capture::SharedBuffer;

    #[test]
    fn test_plain_format_prefixes() {
        let buffer = SharedBuffer::default();
        let subscriber = subscriber("info", LogFormat::Plain, buffer.clone());

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("Using polling interval: {:?} seconds", 2.0);
            tracing::error!("Reading error: {}", "Checksum did not validate. Try again.");
            tracing::debug!("filtered out");
        });

        assert_eq!(
            buffer.contents(),
            "Log: Using polling interval: 2.0 seconds\n\
             Error: Reading error: Checksum did not validate. Try again.\n"
        );
    }

    #[test]
    fn test_level_directive_applies() {
        let buffer = SharedBuffer::default();
        let subscriber = subscriber("error", LogFormat::Plain, buffer.clone());

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("quiet");
            tracing::error!("loud");
        });

        assert_eq!(buffer.contents(), "Error: loud\n");
    }

    #[test]
    fn test_json_format() {
        let buffer = SharedBuffer::default();
        let subscriber = subscriber("info", LogFormat::Json, buffer.clone());

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("Script finished.");
        });

        let output = buffer.contents();
        assert!(output.contains("\"level\":\"INFO\""));
        assert!(output.contains("\"message\":\"Script finished.\""));
    }

    #[test]
    fn test_valid_rust_log_wins() {
        let (directive, rejected) = choose_directive(Some("debug".to_string()), "info");
        assert_eq!(directive, "debug");
        assert_eq!(rejected, None);
    }

    #[test]
    fn test_invalid_rust_log_is_reported() {
        let (directive, rejected) = choose_directive(Some("dht_poller=loud".to_string()), "warn");
        assert_eq!(directive, "warn");
        assert_eq!(rejected.as_deref(), Some("dht_poller=loud"));
    }

    #[test]
    fn test_configured_level_without_rust_log() {
        assert_eq!(choose_directive(None, "error"), ("error".to_string(), None));
    }
}
