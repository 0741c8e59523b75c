//! Console sink: one formatted line per event on stdout.

use async_trait::async_trait;
use tokio::io::{self, AsyncWriteExt};

use vigil_stream::{EventRecord, Sink, SinkError, format_line};

/// Writes each emitted record to standard output.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    /// Create a console sink.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Sink for ConsoleSink {
    async fn forward(&self, record: &EventRecord) -> Result<(), SinkError> {
        let mut line = format_line(record);
        line.push('\n');

        let mut stdout = io::stdout();
        stdout
            .write_all(line.as_bytes())
            .await
            .map_err(|e| SinkError::Write(e.to_string()))?;
        stdout
            .flush()
            .await
            .map_err(|e| SinkError::Write(e.to_string()))
    }

    fn name(&self) -> &str {
        "console"
    }
}
