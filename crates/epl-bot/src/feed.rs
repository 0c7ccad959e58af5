//! JSON-lines candidate feed.
//!
//! One candidate per line. `id` and `created_at` are optional and filled in
//! on arrival. Blank lines and lines starting with `#` are skipped; malformed
//! lines are logged and skipped.

use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use epl_core::{CandidateId, Direction, SignalCandidate};
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tracing::{info, warn};

/// Wire form of a candidate.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub symbol: String,
    pub direction: Direction,
    pub confidence: Decimal,
    pub quality_score: Decimal,
    #[serde(default)]
    pub indicators: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub market_context: serde_json::Value,
}

impl FeedRecord {
    pub fn into_candidate(self) -> SignalCandidate {
        let mut candidate = SignalCandidate::new(
            self.symbol,
            self.direction,
            self.confidence,
            self.quality_score,
            self.indicators,
        )
        .with_market_context(self.market_context);
        if let Some(id) = self.id {
            candidate = candidate.with_id(CandidateId::from_string(id));
        }
        if let Some(created_at) = self.created_at {
            candidate = candidate.with_created_at(created_at);
        }
        candidate
    }
}

/// Parse one line. `Ok(None)` for blank and comment lines.
pub fn parse_line(line: &str) -> AppResult<Option<SignalCandidate>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let record: FeedRecord = serde_json::from_str(trimmed)
        .map_err(|e| AppError::Feed(format!("invalid candidate: {e}")))?;
    Ok(Some(record.into_candidate()))
}

type BoxedReader = Box<dyn AsyncRead + Unpin + Send>;

pub struct CandidateFeed {
    lines: Lines<BufReader<BoxedReader>>,
    line_no: u64,
    malformed: u64,
}

impl CandidateFeed {
    /// Open `path`, or stdin when `None`.
    pub async fn open(path: Option<&str>) -> AppResult<Self> {
        let reader: BoxedReader = match path {
            Some(path) => {
                info!(path = %path, "Reading candidates from file");
                Box::new(tokio::fs::File::open(path).await?)
            }
            None => {
                info!("Reading candidates from stdin");
                Box::new(tokio::io::stdin())
            }
        };
        Ok(Self::from_reader(reader))
    }

    pub fn from_reader(reader: BoxedReader) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
            line_no: 0,
            malformed: 0,
        }
    }

    /// Next candidate, `Ok(None)` at end of input.
    ///
    /// Cancel safe: a line is consumed only when this returns.
    pub async fn next(&mut self) -> AppResult<Option<SignalCandidate>> {
        while let Some(line) = self.lines.next_line().await? {
            self.line_no += 1;
            match parse_line(&line) {
                Ok(Some(candidate)) => return Ok(Some(candidate)),
                Ok(None) => {}
                Err(e) => {
                    self.malformed += 1;
                    warn!(line = self.line_no, error = %e, "Skipping malformed feed line");
                }
            }
        }
        Ok(None)
    }

    pub fn lines_read(&self) -> u64 {
        self.line_no
    }

    pub fn malformed(&self) -> u64 {
        self.malformed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_minimal_line() {
        let c = parse_line(
            r#"{"symbol":"BTCUSDT","direction":"long","confidence":"0.80","quality_score":85,"indicators":["rsi","macd"]}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(c.symbol, "BTCUSDT");
        assert_eq!(c.direction, Direction::Long);
        assert_eq!(c.confidence, dec!(0.80));
        assert_eq!(c.quality_score, dec!(85));
        assert_eq!(c.indicators.len(), 2);
        assert!(c.id.as_str().starts_with("sig_"));
    }

    #[test]
    fn test_parse_keeps_supplied_id_and_timestamp() {
        let c = parse_line(
            r#"{"id":"abc","symbol":"ETHUSDT","direction":"SELL","confidence":"0.5","quality_score":"40","created_at":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(c.id.as_str(), "abc");
        assert_eq!(c.direction, Direction::Short);
        assert_eq!(c.created_at.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_blank_and_comment_lines_skipped() {
        assert!(parse_line("   ").unwrap().is_none());
        assert!(parse_line("# header").unwrap().is_none());
        assert!(parse_line("{not json").is_err());
    }

    #[tokio::test]
    async fn test_feed_skips_malformed_lines() {
        let input = concat!(
            "{\"symbol\":\"BTCUSDT\",\"direction\":\"LONG\",\"confidence\":\"0.8\",\"quality_score\":\"85\"}\n",
            "garbage\n",
            "\n",
            "{\"symbol\":\"ETHUSDT\",\"direction\":\"SHORT\",\"confidence\":\"0.6\",\"quality_score\":\"72\"}\n",
        );
        let mut feed = CandidateFeed::from_reader(Box::new(std::io::Cursor::new(input.as_bytes().to_vec())));

        assert_eq!(feed.next().await.unwrap().unwrap().symbol, "BTCUSDT");
        assert_eq!(feed.next().await.unwrap().unwrap().symbol, "ETHUSDT");
        assert!(feed.next().await.unwrap().is_none());
        assert_eq!(feed.malformed(), 1);
        assert_eq!(feed.lines_read(), 4);
    }
}
