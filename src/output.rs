use std::io::{self, Write};

use serde::Serialize;
use tracing::info;

use crate::app::{AggregateResult, ProgressEvent, ProgressSink, StructuresResult};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_aggregate(result: &AggregateResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_structures(result: &StructuresResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Forwards progress events to the tracing subscriber.
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => info!("{} ({} ms)", event.message, elapsed.as_millis()),
            None => info!("{}", event.message),
        }
    }
}
