use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use super::{CandidateSource, SourceError};
use crate::search::domain::{
    CandidateId, CandidateRecord, RoleProfile, SourceProvenance, WorkEntry,
};

const LIST_SEPARATOR: char = '|';

/// Serves candidates from a CSV export with one row per work-history entry.
///
/// Rows sharing a `candidate_id` are grouped into one record, in first-seen order.
#[derive(Debug, Clone)]
pub struct CsvCandidateSource {
    path: PathBuf,
}

impl CsvCandidateSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CandidateSource for CsvCandidateSource {
    async fn fetch(
        &self,
        profile: &RoleProfile,
        count: usize,
    ) -> Result<Vec<CandidateRecord>, SourceError> {
        let contents = tokio::fs::read(&self.path).await.map_err(|err| {
            SourceError::Unavailable(format!("failed to read {}: {err}", self.path.display()))
        })?;

        let mut records = parse_export(contents.as_slice())?;
        records.truncate(count);
        debug!(
            path = %self.path.display(),
            role = %profile.role,
            candidates = records.len(),
            "loaded candidate export"
        );
        Ok(records)
    }
}

pub(crate) fn parse_export<R: Read>(reader: R) -> Result<Vec<CandidateRecord>, SourceError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records: Vec<CandidateRecord> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (index, row) in csv_reader.deserialize::<ExportRow>().enumerate() {
        // Header is line 1.
        let line = index + 2;
        let row = row.map_err(|err| SourceError::InvalidRecord {
            row: line,
            reason: err.to_string(),
        })?;

        let entry = row.work_entry(line)?;
        let position = match positions.get(&row.candidate_id) {
            Some(position) => *position,
            None => {
                let as_of = parse_date(&row.as_of, "as_of", line)?;
                records.push(CandidateRecord {
                    id: CandidateId::new(row.candidate_id.clone()),
                    name: row.name.clone(),
                    provenance: SourceProvenance::Live,
                    as_of,
                    summary: row.summary.clone().unwrap_or_default(),
                    history: Vec::new(),
                    skills: BTreeSet::new(),
                });
                positions.insert(row.candidate_id.clone(), records.len() - 1);
                records.len() - 1
            }
        };

        let record = &mut records[position];
        record.skills.extend(split_list(row.skills.as_deref()));
        record.history.push(entry);
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct ExportRow {
    candidate_id: String,
    name: String,
    as_of: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    summary: Option<String>,
    employer: String,
    title: String,
    start_date: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    end_date: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    full_time: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    description: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    claims: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    skills: Option<String>,
}

impl ExportRow {
    fn work_entry(&self, line: usize) -> Result<WorkEntry, SourceError> {
        let start = parse_date(&self.start_date, "start_date", line)?;
        let end = match self.end_date.as_deref() {
            None => None,
            Some(value) if value.eq_ignore_ascii_case("present") => None,
            Some(value) => Some(parse_date(value, "end_date", line)?),
        };
        let full_time = match self.full_time.as_deref().map(str::to_ascii_lowercase) {
            None => true,
            Some(value) => match value.as_str() {
                "true" | "yes" | "y" | "1" => true,
                "false" | "no" | "n" | "0" => false,
                other => {
                    return Err(SourceError::InvalidRecord {
                        row: line,
                        reason: format!("full_time must be true or false, got '{other}'"),
                    })
                }
            },
        };

        Ok(WorkEntry {
            employer: self.employer.clone(),
            title: self.title.clone(),
            start,
            end,
            full_time,
            description: self.description.clone().unwrap_or_default(),
            claims: split_list(self.claims.as_deref()).collect(),
        })
    }
}

fn split_list(value: Option<&str>) -> impl Iterator<Item = String> + '_ {
    value
        .into_iter()
        .flat_map(|list| list.split(LIST_SEPARATOR))
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
}

fn parse_date(value: &str, column: &str, line: usize) -> Result<NaiveDate, SourceError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|err| {
        SourceError::InvalidRecord {
            row: line,
            reason: format!("{column} '{value}' is not a YYYY-MM-DD date: {err}"),
        }
    })
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
