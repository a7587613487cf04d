use serde::Serialize;

use crate::error::RecordError;
use crate::rank::{Rank, RANK_COUNT};

/// Per-client histogram plus the time of the last accepted draw.
///
/// Encoded as two lines: the 18 bucket counts comma separated, then the
/// last-draw Unix timestamp (`0` when the client has never drawn).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientRecord {
    pub histogram: [u64; RANK_COUNT],
    pub last_draw_time: Option<f64>,
}

impl Default for ClientRecord {
    fn default() -> Self {
        Self { histogram: [0; RANK_COUNT], last_draw_time: None }
    }
}

impl ClientRecord {
    pub fn cooldown_active(&self, now: f64, cooldown_secs: f64) -> bool {
        match self.last_draw_time {
            Some(last) => now < last + cooldown_secs,
            None => false,
        }
    }

    pub fn record_draw(&mut self, rank: Rank, now: f64) {
        self.histogram[rank.index()] += 1;
        self.last_draw_time = Some(now);
    }

    pub fn total_draws(&self) -> u64 {
        self.histogram.iter().sum()
    }

    pub fn encode(&self) -> String {
        let counts = self.histogram.iter().map(u64::to_string).collect::<Vec<_>>().join(",");
        let last = self.last_draw_time.map_or_else(|| "0".to_string(), |t| t.to_string());
        format!("{}\n{}\n", counts, last)
    }

    /// A record holding only the counts line is read as never having drawn.
    pub fn decode(raw: &str) -> Result<Self, RecordError> {
        let mut lines = raw.lines();
        let counts_line = lines.next().unwrap_or_default().trim();

        let counts = counts_line
            .split(',')
            .map(|field| field.trim().parse::<u64>().map_err(|_| RecordError::Count(field.to_string())))
            .collect::<Result<Vec<_>, _>>()?;

        let histogram: [u64; RANK_COUNT] = counts
            .try_into()
            .map_err(|v: Vec<u64>| RecordError::BucketCount { expected: RANK_COUNT, found: v.len() })?;

        let last_draw_time = match lines.next().map(str::trim).filter(|l| !l.is_empty()) {
            None => None,
            Some(field) => {
                let secs = field.parse::<f64>().map_err(|_| RecordError::Timestamp(field.to_string()))?;
                if !secs.is_finite() || secs < 0.0 {
                    return Err(RecordError::Timestamp(field.to_string()));
                }
                (secs > 0.0).then_some(secs)
            }
        };

        Ok(Self { histogram, last_draw_time })
    }
}
