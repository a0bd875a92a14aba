use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::locator::Locator;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_poll_timeout_ms() -> Option<u64> {
    Some(30_000)
}

fn default_delay_ms() -> u64 {
    2_000
}

fn default_party_attribute() -> String {
    "style".to_string()
}

fn default_party_pattern() -> String {
    r"(?:background-|border-left-)?colou?r\s*:\s*([^;]+)".to_string()
}

fn default_share_column() -> Option<usize> {
    Some(2)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupConfig {
    pub page_url: String,
    #[serde(default)]
    pub consent: Option<ConsentOverlay>,
    pub search_input: Locator,
    pub suggestions: Locator,
    pub submit: Locator,
    pub results: Locator,
    pub party: PartyMarkers,
    #[serde(default)]
    pub columns: ResultColumns,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// `null` waits forever.
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: Option<u64>,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl LookupConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_timeout(&self) -> Option<Duration> {
        self.poll_timeout_ms.map(Duration::from_millis)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentOverlay {
    /// Frame hosting the overlay, if it is not in the top-level document.
    #[serde(default)]
    pub frame: Option<Locator>,
    pub accept: Locator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyMarkers {
    pub marker: Locator,
    #[serde(default = "default_party_attribute")]
    pub attribute: String,
    #[serde(default = "default_party_pattern")]
    pub pattern: String,
    #[serde(default)]
    pub colours: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultColumns {
    #[serde(default)]
    pub candidate: usize,
    #[serde(default = "ResultColumns::default_votes")]
    pub votes: usize,
    #[serde(default = "default_share_column")]
    pub share: Option<usize>,
}

impl ResultColumns {
    fn default_votes() -> usize {
        1
    }
}

impl Default for ResultColumns {
    fn default() -> Self {
        Self {
            candidate: 0,
            votes: Self::default_votes(),
            share: default_share_column(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub constituency: String,
    pub party: Option<String>,
    pub candidate: String,
    pub votes: Option<u64>,
    pub vote_share: Option<f64>,
}

impl Display for CandidateResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({})",
            self.candidate,
            self.party.as_deref().unwrap_or("unknown party")
        )?;
        if let Some(votes) = self.votes {
            write!(f, " — {} votes", votes)?;
        }
        if let Some(share) = self.vote_share {
            write!(f, " ({:.1}%)", share)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub scraped_at: DateTime<Utc>,
    pub records: Vec<CandidateResult>,
    pub failed: Vec<String>,
}

impl Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut current: Option<&str> = None;
        for record in &self.records {
            if current != Some(record.constituency.as_str()) {
                writeln!(f, "── {}", record.constituency)?;
                current = Some(record.constituency.as_str());
            }
            writeln!(f, "  ▸ {}", record)?;
        }
        if !self.failed.is_empty() {
            writeln!(f, "Failed lookups: {}", self.failed.join(", "))?;
        }
        Ok(())
    }
}
