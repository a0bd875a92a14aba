use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::browser::types::{CandidateResult, Dataset};
use crate::table::clean::strip_footnotes;
use crate::table::{ParseError, Table};

const UNKNOWN_PARTY: &str = "Unknown";

pub fn parse_query_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn queries_from_table(table: &Table, column: &str) -> Result<Vec<String>, ParseError> {
    Ok(table
        .text_column(column)?
        .iter()
        .map(|cell| strip_footnotes(cell))
        .filter(|term| !term.is_empty())
        .collect())
}

pub fn dedupe_queries(queries: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    queries
        .into_iter()
        .filter(|q| seen.insert(q.to_lowercase()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartyTally {
    pub party: String,
    pub candidates: usize,
    pub votes: u64,
    pub seats: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetStats {
    pub constituencies: usize,
    pub candidates: usize,
    pub total_votes: u64,
    pub failed: usize,
    pub parties: Vec<PartyTally>,
}

impl DatasetStats {
    pub fn from_dataset(dataset: &Dataset) -> DatasetStats {
        let mut tallies: BTreeMap<&str, PartyTally> = BTreeMap::new();
        let mut winners: Vec<(&str, &CandidateResult)> = Vec::new();

        for record in &dataset.records {
            let party = record.party.as_deref().unwrap_or(UNKNOWN_PARTY);
            let tally = tallies.entry(party).or_insert_with(|| PartyTally {
                party: party.to_string(),
                candidates: 0,
                votes: 0,
                seats: 0,
            });
            tally.candidates += 1;
            tally.votes += record.votes.unwrap_or(0);

            let Some(votes) = record.votes else {
                continue;
            };
            match winners
                .iter_mut()
                .find(|(constituency, _)| *constituency == record.constituency)
            {
                Some((_, best)) => {
                    // ties keep the first listed candidate
                    if best.votes.is_none_or(|b| votes > b) {
                        *best = record;
                    }
                }
                None => winners.push((record.constituency.as_str(), record)),
            }
        }

        for (_, winner) in &winners {
            let party = winner.party.as_deref().unwrap_or(UNKNOWN_PARTY);
            if let Some(tally) = tallies.get_mut(party) {
                tally.seats += 1;
            }
        }

        let constituencies = dataset
            .records
            .iter()
            .map(|r| r.constituency.as_str())
            .collect::<HashSet<_>>()
            .len();

        let mut parties: Vec<PartyTally> = tallies.into_values().collect();
        parties.sort_by(|a, b| b.seats.cmp(&a.seats).then(b.votes.cmp(&a.votes)));

        DatasetStats {
            constituencies,
            candidates: dataset.records.len(),
            total_votes: parties.iter().map(|p| p.votes).sum(),
            failed: dataset.failed.len(),
            parties,
        }
    }
}

impl std::fmt::Display for DatasetStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nStatistics:")?;
        writeln!(f, "  Constituencies:   {}", self.constituencies)?;
        writeln!(f, "  Candidates:       {}", self.candidates)?;
        writeln!(f, "  Total votes:      {}", self.total_votes)?;
        if self.failed > 0 {
            writeln!(f, "  Failed lookups:   {}", self.failed)?;
        }
        if !self.parties.is_empty() {
            writeln!(f, "\n  {:<24} {:>6} {:>12} {:>10}", "Party", "Seats", "Votes", "Candidates")?;
            for p in &self.parties {
                writeln!(
                    f,
                    "  {:<24} {:>6} {:>12} {:>10}",
                    p.party, p.seats, p.votes, p.candidates
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;
    use chrono::Utc;

    fn record(constituency: &str, party: Option<&str>, candidate: &str, votes: Option<u64>) -> CandidateResult {
        CandidateResult {
            constituency: constituency.to_string(),
            party: party.map(str::to_string),
            candidate: candidate.to_string(),
            votes,
            vote_share: None,
        }
    }

    #[test]
    fn test_parse_query_list() {
        let text = "# Nairobi County\nWestlands\n\n  Kibra  \n#Langata\nRoysambu\n";
        assert_eq!(parse_query_list(text), vec!["Westlands", "Kibra", "Roysambu"]);
    }

    #[test]
    fn test_dedupe_queries_preserves_order() {
        let queries = vec!["Kibra".into(), "Westlands".into(), "kibra".into(), "Embakasi".into()];
        assert_eq!(dedupe_queries(queries), vec!["Kibra", "Westlands", "Embakasi"]);
    }

    #[test]
    fn test_queries_from_table() {
        let table = Table::new(
            vec!["No.".into(), "Constituency".into()],
            vec![
                vec![Cell::Text("1".into()), Cell::Text("Changamwe[a]".into())],
                vec![Cell::Text("2".into()), Cell::Missing],
                vec![Cell::Text("3".into()), Cell::Text("Jomvu".into())],
            ],
        );

        assert_eq!(
            queries_from_table(&table, "constituency").unwrap(),
            vec!["Changamwe", "Jomvu"]
        );
        assert!(queries_from_table(&table, "County").is_err());
    }

    #[test]
    fn test_dataset_stats() {
        let dataset = Dataset {
            scraped_at: Utc::now(),
            records: vec![
                record("Kibra", Some("ODM"), "A", Some(24_108)),
                record("Kibra", Some("UDA"), "B", Some(17_000)),
                record("Kibra", None, "C", None),
                record("Westlands", Some("UDA"), "D", Some(53_000)),
                record("Westlands", Some("ODM"), "E", Some(53_000)),
                record("Roysambu", Some("UDA"), "F", Some(30_000)),
            ],
            failed: vec!["Atlantis".to_string()],
        };

        let stats = DatasetStats::from_dataset(&dataset);

        assert_eq!(stats.constituencies, 3);
        assert_eq!(stats.candidates, 6);
        assert_eq!(stats.total_votes, 177_108);
        assert_eq!(stats.failed, 1);

        assert_eq!(stats.parties[0].party, "UDA");
        assert_eq!(stats.parties[0].seats, 2, "Westlands tie goes to first listed");
        assert_eq!(stats.parties[0].votes, 100_000);
        assert_eq!(stats.parties[1].party, "ODM");
        assert_eq!(stats.parties[1].seats, 1);
        assert_eq!(stats.parties[2].party, "Unknown");
        assert_eq!(stats.parties[2].candidates, 1);

        let rendered = stats.to_string();
        assert!(rendered.contains("Constituencies:   3"));
        assert!(rendered.contains("Failed lookups:   1"));
    }
}
