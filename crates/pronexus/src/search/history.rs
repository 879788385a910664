use chrono::NaiveDate;

use super::domain::{CandidateRecord, WorkEntry};

/// Lower-case, punctuation-free form of `text`, padded so whole-word lookups can use
/// `contains(" term ")`.
pub(crate) fn normalize(text: &str) -> String {
    let mapped: String = text
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();

    let mut normalized = String::with_capacity(mapped.len() + 2);
    normalized.push(' ');
    for word in mapped.split_whitespace() {
        normalized.push_str(word);
        normalized.push(' ');
    }
    normalized
}

pub(crate) fn contains_term(normalized: &str, term: &str) -> bool {
    let needle = normalize(term);
    if needle.trim().is_empty() {
        return false;
    }
    normalized.contains(&needle)
}

fn strip_terms(normalized: &str, terms: &[&str]) -> String {
    terms.iter().fold(normalized.to_string(), |text, term| {
        let needle = normalize(term);
        if needle.trim().is_empty() {
            text
        } else {
            text.replace(&needle, " ")
        }
    })
}

pub(crate) fn has_figure(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
}

/// A single description or claim, pre-normalized.
pub(crate) struct Statement<'a> {
    pub raw: &'a str,
    pub normalized: String,
    pub quantified: bool,
}

/// Gap between two consecutive employment periods.
pub(crate) struct Gap<'a> {
    pub before: &'a WorkEntry,
    pub after: &'a WorkEntry,
    pub covered_until: NaiveDate,
    pub days: i64,
}

/// Read-only, pre-computed view over a candidate's history used by every rule.
pub(crate) struct HistoryView<'a> {
    pub candidate: &'a CandidateRecord,
    corpus: String,
    statements: Vec<Statement<'a>>,
    titles: Vec<String>,
}

impl<'a> HistoryView<'a> {
    pub(crate) fn new(candidate: &'a CandidateRecord) -> Self {
        let mut statements = Vec::new();
        let mut titles = Vec::new();
        let mut corpus = normalize(&candidate.summary);

        for entry in &candidate.history {
            let title = normalize(&entry.title);
            corpus.push_str(&title);
            titles.push(title);

            for raw in std::iter::once(entry.description.as_str())
                .chain(entry.claims.iter().map(String::as_str))
                .filter(|raw| !raw.trim().is_empty())
            {
                let normalized = normalize(raw);
                corpus.push_str(&normalized);
                statements.push(Statement {
                    raw,
                    normalized,
                    quantified: has_figure(raw),
                });
            }
        }

        for skill in &candidate.skills {
            corpus.push_str(&normalize(skill));
        }

        Self {
            candidate,
            corpus,
            statements,
            titles,
        }
    }

    pub(crate) fn as_of(&self) -> NaiveDate {
        self.candidate.as_of
    }

    pub(crate) fn mentions(&self, term: &str) -> bool {
        contains_term(&self.corpus, term)
    }

    pub(crate) fn mentions_any(&self, terms: &[&str]) -> bool {
        terms.iter().any(|term| self.mentions(term))
    }

    /// Distinct terms from `terms` that appear anywhere in the record, in rubric order.
    pub(crate) fn matched_terms<'t>(&self, terms: &[&'t str]) -> Vec<&'t str> {
        terms
            .iter()
            .copied()
            .filter(|term| self.mentions(term))
            .collect()
    }

    /// True when a description or claim mentions one of `terms` alongside a figure that is
    /// not part of any of the terms (so "ASC 606" alone does not count).
    pub(crate) fn quantified_mention(&self, terms: &[&str]) -> bool {
        self.statements.iter().any(|statement| {
            statement.quantified
                && terms.iter().any(|term| contains_term(&statement.normalized, term))
                && has_figure(&strip_terms(&statement.normalized, terms))
        })
    }

    pub(crate) fn statements(&self) -> &[Statement<'a>] {
        &self.statements
    }

    pub(crate) fn title_matches(&self, index: usize, terms: &[&str]) -> bool {
        self.titles
            .get(index)
            .map(|title| terms.iter().any(|term| contains_term(title, term)))
            .unwrap_or(false)
    }

    /// History entries ordered by start date, then end date.
    pub(crate) fn chronological(&self) -> Vec<&'a WorkEntry> {
        let as_of = self.as_of();
        let mut entries: Vec<&WorkEntry> = self.candidate.history.iter().collect();
        entries.sort_by_key(|entry| (entry.start, entry.end_or(as_of)));
        entries
    }

    /// Uncovered periods between consecutive entries, ignoring periods covered by an
    /// earlier, longer role.
    pub(crate) fn gaps(&self) -> Vec<Gap<'a>> {
        let as_of = self.as_of();
        let entries = self.chronological();
        let mut gaps = Vec::new();

        let Some(first) = entries.first() else {
            return gaps;
        };
        let mut covering = *first;
        let mut covered_until = first.end_or(as_of);

        for entry in entries.iter().skip(1) {
            let days = (entry.start - covered_until).num_days() - 1;
            if days > 0 {
                gaps.push(Gap {
                    before: covering,
                    after: entry,
                    covered_until,
                    days,
                });
            }
            let end = entry.end_or(as_of);
            if end > covered_until {
                covered_until = end;
                covering = entry;
            }
        }

        gaps
    }

    pub(crate) fn longest_gap(&self) -> Option<Gap<'a>> {
        self.gaps().into_iter().max_by_key(|gap| gap.days)
    }
}
