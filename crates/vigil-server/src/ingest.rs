//! Graphite plaintext ingest: `<metric.path> <value> <unix-timestamp>` per line.

use anyhow::{bail, Context, Result};
use std::io::BufRead;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use vigil_common::types::MetricValue;
use vigil_storage::TriggerStore;
use vigil_target::matches_pattern;

const BATCH_LINES: usize = 512;

/// Counts of one ingest run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub accepted: usize,
    pub rejected: usize,
}

impl std::ops::AddAssign for IngestSummary {
    fn add_assign(&mut self, other: Self) {
        self.accepted += other.accepted;
        self.rejected += other.rejected;
    }
}

/// Parses one plaintext line.
///
/// ```
/// use vigil_server::ingest::parse_line;
///
/// let (metric, value) = parse_line("servers.web-01.cpu 42.5 1700000000").unwrap();
/// assert_eq!(metric, "servers.web-01.cpu");
/// assert_eq!(value.value, 42.5);
/// assert_eq!(value.timestamp, 1_700_000_000);
/// ```
pub fn parse_line(line: &str) -> Result<(String, MetricValue)> {
    let mut fields = line.split_whitespace();
    let (Some(metric), Some(value), Some(timestamp), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        bail!("expected '<metric> <value> <timestamp>', got '{line}'");
    };
    let value: f64 = value
        .parse()
        .with_context(|| format!("invalid value '{value}'"))?;
    if !value.is_finite() {
        bail!("value '{value}' is not finite");
    }
    let raw_timestamp = timestamp;
    let timestamp: f64 = raw_timestamp
        .parse()
        .with_context(|| format!("invalid timestamp '{raw_timestamp}'"))?;
    if !timestamp.is_finite() || timestamp < i64::MIN as f64 || timestamp >= i64::MAX as f64 {
        bail!("timestamp '{raw_timestamp}' is out of range");
    }
    let timestamp = timestamp as i64;
    Ok((metric.to_string(), MetricValue { timestamp, value }))
}

/// Stores metric values and keeps the pattern index of the configured
/// triggers up to date.
#[derive(Clone)]
pub struct Ingester {
    store: Arc<dyn TriggerStore>,
    patterns: Arc<Vec<String>>,
}

impl Ingester {
    pub fn new(store: Arc<dyn TriggerStore>, patterns: Vec<String>) -> Self {
        let mut patterns = patterns;
        patterns.sort();
        patterns.dedup();
        Self {
            store,
            patterns: Arc::new(patterns),
        }
    }

    /// Ingests one line. Blank lines and `#` comments are ignored.
    pub fn ingest_line(&self, line: &str) -> Result<bool> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(false);
        }
        let (metric, value) = parse_line(line)?;
        self.store.save_metric_value(&metric, value)?;
        for pattern in self.patterns.iter().filter(|p| matches_pattern(p, &metric)) {
            self.store.add_pattern_metric(pattern, &metric)?;
        }
        Ok(true)
    }

    /// Ingests a batch of lines, logging and counting malformed ones.
    pub fn ingest_lines<I, S>(&self, lines: I) -> IngestSummary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut summary = IngestSummary::default();
        for line in lines {
            let line = line.as_ref();
            match self.ingest_line(line) {
                Ok(true) => summary.accepted += 1,
                Ok(false) => {}
                Err(e) => {
                    summary.rejected += 1;
                    tracing::warn!(line, error = %e, "Rejected metric line");
                }
            }
        }
        summary
    }

    /// Ingests every line of `reader`.
    pub fn ingest_reader<R: BufRead>(&self, reader: R) -> Result<IngestSummary> {
        let lines = reader.lines().collect::<std::io::Result<Vec<_>>>()?;
        Ok(self.ingest_lines(lines))
    }

    /// Accepts Graphite plaintext connections until the listener fails.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        tracing::info!(addr = %listener.local_addr()?, "Graphite plaintext listener started");
        loop {
            let (socket, peer) = listener.accept().await?;
            let ingester = self.clone();
            tokio::spawn(async move {
                match ingester.handle_connection(socket).await {
                    Ok(summary) => tracing::debug!(
                        peer = %peer,
                        accepted = summary.accepted,
                        rejected = summary.rejected,
                        "Graphite connection closed"
                    ),
                    Err(e) => tracing::warn!(peer = %peer, error = %e, "Graphite connection failed"),
                }
            });
        }
    }

    async fn handle_connection(&self, socket: tokio::net::TcpStream) -> Result<IngestSummary> {
        let mut lines = BufReader::new(socket).lines();
        let mut summary = IngestSummary::default();
        let mut batch = Vec::with_capacity(BATCH_LINES);
        loop {
            let line = lines.next_line().await?;
            let done = line.is_none();
            if let Some(line) = line {
                batch.push(line);
            }
            if batch.len() >= BATCH_LINES || (done && !batch.is_empty()) {
                let ingester = self.clone();
                let chunk = std::mem::replace(&mut batch, Vec::with_capacity(BATCH_LINES));
                summary += tokio::task::spawn_blocking(move || ingester.ingest_lines(chunk)).await?;
            }
            if done {
                return Ok(summary);
            }
        }
    }
}
