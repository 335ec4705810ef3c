// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log formatting for the plugin's own diagnostics.
//!
//! Every line is prefixed with `NR_FLUENT_BIT` so it can be told apart from
//! the records the plugin forwards:
//!
//! ```text
//! NR_FLUENT_BIT | INFO | LOGS | 3 units written
//! NR_FLUENT_BIT | WARN | flush{units=4}: LOGS | Failed to send unit status=503
//! ```

use std::fmt;

use tracing_core::{Event, Subscriber};
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext, FormattedFields,
};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

use crate::config::log_level::LogLevel;

#[derive(Debug, Clone, Copy)]
pub struct Formatter;

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        write!(&mut writer, "NR_FLUENT_BIT | {} | ", metadata.level())?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;

                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Filter directive for `level`, with the HTTP stack silenced.
#[must_use]
pub fn env_filter_directive(level: LogLevel) -> String {
    format!("h2=off,hyper=off,rustls=off,{}", level.as_directive())
}

/// Installs the global subscriber writing to stderr, leaving stdout free.
pub fn init(level: LogLevel) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_new(env_filter_directive(level))?)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .event_format(Formatter)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing::{info, info_span, warn};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(level: LogLevel, emit: impl FnOnce()) -> String {
        let buffer = SharedBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt::Subscriber::builder()
            .with_env_filter(EnvFilter::try_new(env_filter_directive(level)).unwrap())
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .event_format(Formatter)
            .finish();

        tracing::subscriber::with_default(subscriber, emit);

        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_format_prefix_and_level() {
        let output = capture(LogLevel::Info, || info!("LOGS | 3 units written"));
        assert_eq!(output, "NR_FLUENT_BIT | INFO | LOGS | 3 units written\n");
    }

    #[test]
    fn test_format_includes_spans_and_fields() {
        let output = capture(LogLevel::Info, || {
            let span = info_span!("flush", units = 4);
            let _guard = span.enter();
            warn!("LOGS | Failed to send unit");
        });
        assert_eq!(
            output,
            "NR_FLUENT_BIT | WARN | flush{units=4}: LOGS | Failed to send unit\n"
        );
        assert!(!output.contains('\u{1b}'));
    }

    #[test]
    fn test_level_filters_events() {
        let output = capture(LogLevel::Warn, || info!("hidden"));
        assert!(output.is_empty());
    }

    #[test]
    fn test_env_filter_directive() {
        assert_eq!(
            env_filter_directive(LogLevel::Trace),
            "h2=off,hyper=off,rustls=off,trace"
        );
    }
}
