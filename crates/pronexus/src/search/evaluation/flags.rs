use crate::search::history::{contains_term, normalize, HistoryView};
use crate::search::rubric::{RedFlagPredicate, Rubric};

use super::config::EvaluationConfig;
use super::TriggeredRedFlag;

pub(crate) fn detect_red_flags(
    view: &HistoryView<'_>,
    rubric: &Rubric,
    config: &EvaluationConfig,
) -> Vec<TriggeredRedFlag> {
    rubric
        .red_flags
        .iter()
        .filter_map(|rule| {
            matches(view, &rule.predicate, config).map(|detail| TriggeredRedFlag {
                name: rule.name.to_string(),
                severity: rule.severity,
                detail,
            })
        })
        .collect()
}

/// Returns a human-readable detail when the predicate fires.
fn matches(
    view: &HistoryView<'_>,
    predicate: &RedFlagPredicate,
    config: &EvaluationConfig,
) -> Option<String> {
    match predicate {
        RedFlagPredicate::TermsPresent { terms } => {
            let found = view.matched_terms(terms);
            (!found.is_empty()).then(|| format!("history mentions {}", found.join(", ")))
        }
        RedFlagPredicate::TermsAbsent { terms } => (!view.mentions_any(terms))
            .then(|| format!("no mention of {}", terms.join(", "))),
        RedFlagPredicate::ConflictingTerms { left, right } => {
            let left_found = view.matched_terms(left);
            let right_found = view.matched_terms(right);
            (!left_found.is_empty() && !right_found.is_empty()).then(|| {
                format!(
                    "claims both {} and {}",
                    left_found.join(", "),
                    right_found.join(", ")
                )
            })
        }
        RedFlagPredicate::Unsupported { present, support } => {
            let found = view.matched_terms(present);
            (!found.is_empty() && !view.mentions_any(support)).then(|| {
                format!(
                    "cites {} without any of {}",
                    found.join(", "),
                    support.join(", ")
                )
            })
        }
        RedFlagPredicate::EmploymentGap => view
            .longest_gap()
            .filter(|gap| gap.days > config.red_flag_gap_days)
            .map(|gap| {
                format!(
                    "{} days uncovered between {} ({}) and {} ({})",
                    gap.days,
                    gap.before.employer,
                    gap.covered_until,
                    gap.after.employer,
                    gap.after.start
                )
            }),
        RedFlagPredicate::ShortTenure {
            titles,
            max_months,
            exempt,
        } => {
            let as_of = view.as_of();
            view.candidate
                .history
                .iter()
                .enumerate()
                .filter(|(_, entry)| !entry.is_ongoing())
                .filter(|(index, _)| view.title_matches(*index, titles))
                .filter(|(_, entry)| {
                    let context = normalize(&format!("{} {}", entry.title, entry.description));
                    !exempt.iter().any(|term| contains_term(&context, term))
                })
                .find(|(_, entry)| entry.tenure_months(as_of) < i64::from(*max_months))
                .map(|(_, entry)| {
                    format!(
                        "{} at {} lasted {} months",
                        entry.title,
                        entry.employer,
                        entry.tenure_months(as_of)
                    )
                })
        }
        RedFlagPredicate::UnquantifiedClaims { terms } => {
            let found = view.matched_terms(terms);
            (!found.is_empty() && !view.quantified_mention(terms))
                .then(|| format!("claims {} without figures", found.join(", ")))
        }
        RedFlagPredicate::VagueHistory => (!view
            .statements()
            .iter()
            .any(|statement| statement.quantified))
        .then(|| "no role description or claim cites a measurable outcome".to_string()),
        RedFlagPredicate::MissingCredential {
            titles,
            credentials,
        } => {
            let senior = (0..view.candidate.history.len())
                .find(|index| view.title_matches(*index, titles))
                .map(|index| &view.candidate.history[index]);
            senior
                .filter(|_| !view.mentions_any(credentials))
                .map(|entry| {
                    format!(
                        "{} role without {}",
                        entry.title,
                        credentials.join("/")
                    )
                })
        }
    }
}
