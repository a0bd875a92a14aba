use std::collections::HashMap;
use std::fmt::Display;
use std::time::Duration;

use chrono::Utc;
use regex::Regex;
use tokio::time::sleep;

use super::driver::{BrowserError, Driver};
use super::poll::{PollError, poll_until};
use super::types::{CandidateResult, Dataset, LookupConfig};
use crate::table::{Table, parse_tables};

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),
    #[error("Polling failed: {0}")]
    Poll(#[from] PollError),
    #[error("Results panel held no table")]
    NoResultsTable,
    #[error("Results table has {width} column(s) but {field} is configured at column {index}")]
    MissingColumn {
        field: &'static str,
        index: usize,
        width: usize,
    },
    #[error("Invalid party pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("Lookup for '{query}' failed while {state}: {source}")]
    Query {
        query: String,
        state: LookupState,
        #[source]
        source: Box<LookupError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupState {
    SessionStarted,
    Navigated,
    OverlayDismissed,
    QuerySubmitted,
    SuggestionsPending,
    SuggestionsReady,
    ResultsLoaded,
    Extracted,
}

impl LookupState {
    fn advance(&mut self, next: LookupState, query: &str) {
        log::debug!("[{}] {} -> {}", query, self, next);
        *self = next;
    }
}

impl Display for LookupState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LookupState::SessionStarted => "session started",
            LookupState::Navigated => "navigated",
            LookupState::OverlayDismissed => "overlay dismissed",
            LookupState::QuerySubmitted => "query submitted",
            LookupState::SuggestionsPending => "suggestions pending",
            LookupState::SuggestionsReady => "suggestions ready",
            LookupState::ResultsLoaded => "results loaded",
            LookupState::Extracted => "extracted",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub delay: Duration,
    pub keep_going: bool,
}

impl BatchOptions {
    pub fn from_config(config: &LookupConfig) -> Self {
        Self {
            delay: config.delay(),
            keep_going: false,
        }
    }
}

fn colour_key(raw: &str) -> String {
    raw.split_whitespace().collect::<String>().to_lowercase()
}

#[derive(Debug, Clone)]
pub struct FormLookup {
    config: LookupConfig,
    party_pattern: Regex,
    colours: HashMap<String, String>,
}

impl FormLookup {
    pub fn new(config: LookupConfig) -> Result<Self, LookupError> {
        let party_pattern = Regex::new(&config.party.pattern)?;
        let colours = config
            .party
            .colours
            .iter()
            .map(|(colour, party)| (colour_key(colour), party.clone()))
            .collect();

        Ok(Self {
            config,
            party_pattern,
            colours,
        })
    }

    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    pub async fn lookup<D: Driver>(
        &self,
        driver: &D,
        query: &str,
    ) -> Result<Vec<CandidateResult>, LookupError> {
        let mut state = LookupState::SessionStarted;
        let result = self.run(driver, query, &mut state).await;
        result.map_err(|e| LookupError::Query {
            query: query.to_string(),
            state,
            source: Box::new(e),
        })
    }

    pub async fn lookup_all<D: Driver>(
        &self,
        driver: &D,
        queries: &[String],
        options: &BatchOptions,
    ) -> Result<Dataset, LookupError> {
        let mut records = Vec::new();
        let mut failed = Vec::new();

        for (i, query) in queries.iter().enumerate() {
            log::info!("[{}/{}] Looking up '{}'...", i + 1, queries.len(), query);

            match self.lookup(driver, query).await {
                Ok(rows) => {
                    log::info!("'{}': {} candidate(s)", query, rows.len());
                    records.extend(rows);
                }
                Err(e) if options.keep_going => {
                    log::warn!("Skipping: {}", e);
                    failed.push(query.clone());
                }
                Err(e) => return Err(e),
            }

            if i + 1 < queries.len() && !options.delay.is_zero() {
                sleep(options.delay).await;
            }
        }

        Ok(Dataset {
            scraped_at: Utc::now(),
            records,
            failed,
        })
    }

    async fn run<D: Driver>(
        &self,
        driver: &D,
        query: &str,
        state: &mut LookupState,
    ) -> Result<Vec<CandidateResult>, LookupError> {
        let config = &self.config;
        let interval = config.poll_interval();
        let timeout = config.poll_timeout();

        driver.goto(&config.page_url).await?;
        state.advance(LookupState::Navigated, query);

        self.dismiss_consent(driver).await?;
        state.advance(LookupState::OverlayDismissed, query);

        driver.clear(&config.search_input).await?;
        driver.send_keys(&config.search_input, query).await?;
        state.advance(LookupState::QuerySubmitted, query);

        state.advance(LookupState::SuggestionsPending, query);
        let panel = &config.suggestions;
        let suggestions = poll_until("suggestions", interval, timeout, move || async move {
            let text = driver.text(panel).await?;
            Ok::<_, BrowserError>(text.filter(|t| !t.trim().is_empty()))
        })
        .await?;
        log::trace!("[{}] suggestions: {}", query, suggestions.trim());
        state.advance(LookupState::SuggestionsReady, query);

        driver.click(&config.submit).await?;
        let results = &config.results;
        let markup = poll_until("results table", interval, timeout, move || async move {
            let html = driver.inner_html(results).await?;
            Ok::<_, BrowserError>(html.filter(|h| h.to_ascii_lowercase().contains("<table")))
        })
        .await?;
        state.advance(LookupState::ResultsLoaded, query);

        let table = parse_tables(&markup)
            .into_iter()
            .next()
            .ok_or(LookupError::NoResultsTable)?;
        let markers = driver
            .attributes(&config.party.marker, &config.party.attribute)
            .await?;
        let records = self.build_records(query, &table, &markers)?;
        state.advance(LookupState::Extracted, query);

        Ok(records)
    }

    async fn dismiss_consent<D: Driver>(&self, driver: &D) -> Result<(), LookupError> {
        let Some(consent) = &self.config.consent else {
            return Ok(());
        };

        if let Some(frame) = &consent.frame {
            if driver.find_count(frame).await? == 0 {
                log::debug!("Consent frame {} not present", frame);
                return Ok(());
            }
            driver.enter_frame(frame).await?;
        }

        let clicked = match driver.find_count(&consent.accept).await {
            Ok(0) => Ok(false),
            Ok(_) => driver.click(&consent.accept).await.map(|_| true),
            Err(e) => Err(e),
        };

        if consent.frame.is_some() {
            driver.leave_frame().await?;
        }

        if clicked? {
            log::debug!("Dismissed consent overlay");
        } else {
            log::debug!("Consent button {} not present", consent.accept);
        }
        Ok(())
    }

    /// Zips the results table with the party markers by position: row `i`
    /// gets the party of marker `i`.
    pub fn build_records(
        &self,
        constituency: &str,
        table: &Table,
        markers: &[Option<String>],
    ) -> Result<Vec<CandidateResult>, LookupError> {
        let columns = &self.config.columns;
        let width = table.width();
        let fields = [
            ("candidate", Some(columns.candidate)),
            ("votes", Some(columns.votes)),
            ("share", columns.share),
        ];
        for (field, index) in fields {
            if let Some(index) = index
                && index >= width
            {
                return Err(LookupError::MissingColumn {
                    field,
                    index,
                    width,
                });
            }
        }

        if markers.len() != table.len() {
            log::warn!(
                "'{}': {} result row(s) but {} party marker(s); parties are assigned by position",
                constituency,
                table.len(),
                markers.len()
            );
        }

        Ok(table
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| CandidateResult {
                constituency: constituency.to_string(),
                party: markers
                    .get(i)
                    .and_then(|m| m.as_deref())
                    .and_then(|m| self.party_for(m)),
                candidate: row[columns.candidate].to_string(),
                votes: row[columns.votes]
                    .as_number()
                    .filter(|v| *v >= 0.0)
                    .map(|v| v.round() as u64),
                vote_share: columns.share.and_then(|c| row[c].as_number()),
            })
            .collect())
    }

    pub fn party_for(&self, marker: &str) -> Option<String> {
        let caps = self.party_pattern.captures(marker)?;
        let raw = caps.get(1).or_else(|| caps.get(0))?.as_str();
        let key = colour_key(raw);
        if key.is_empty() {
            return None;
        }
        Some(self.colours.get(&key).cloned().unwrap_or(key))
    }
}
