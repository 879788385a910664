use crate::search::domain::round2;
use crate::search::history::HistoryView;
use crate::search::rubric::{Criterion, EvaluationRule, Rubric};

use super::CriterionScore;

const COVERAGE_POINTS: f64 = 70.0;
const QUANTIFIED_POINTS: u8 = 30;

pub(crate) fn score_criteria(view: &HistoryView<'_>, rubric: &Rubric) -> (Vec<CriterionScore>, f64) {
    let scores: Vec<CriterionScore> = rubric
        .criteria
        .iter()
        .map(|criterion| score_criterion(view, criterion))
        .collect();

    let composite = scores
        .iter()
        .map(|score| score.weight * f64::from(score.score))
        .sum::<f64>();

    (scores, round2(composite))
}

fn score_criterion(view: &HistoryView<'_>, criterion: &Criterion) -> CriterionScore {
    let (score, notes) = match &criterion.rule {
        EvaluationRule::Evidence {
            terms,
            saturation,
            quantified_bonus,
        } => evidence(view, terms, *saturation, *quantified_bonus),
        EvaluationRule::Tenure {
            titles,
            target_months,
        } => tenure(view, titles, *target_months),
    };

    CriterionScore {
        criterion: criterion.name.to_string(),
        weight: criterion.weight,
        score,
        notes,
    }
}

fn evidence(
    view: &HistoryView<'_>,
    terms: &[&str],
    saturation: usize,
    quantified_bonus: bool,
) -> (u8, String) {
    let matched = view.matched_terms(terms);
    if matched.is_empty() {
        return (0, format!("no evidence of {}", terms.join(", ")));
    }

    let saturation = saturation.max(1);
    let ratio = matched.len().min(saturation) as f64 / saturation as f64;
    let ceiling = if quantified_bonus {
        COVERAGE_POINTS
    } else {
        100.0
    };
    let mut score = (ratio * ceiling).round() as u8;
    let mut notes = format!("matched {}", matched.join(", "));

    if quantified_bonus {
        if view.quantified_mention(terms) {
            score += QUANTIFIED_POINTS;
            notes.push_str("; quantified outcome cited");
        } else {
            notes.push_str("; no quantified outcome");
        }
    }

    (score, notes)
}

fn tenure(view: &HistoryView<'_>, titles: &[&str], target_months: u32) -> (u8, String) {
    let as_of = view.as_of();
    let months: i64 = view
        .candidate
        .history
        .iter()
        .enumerate()
        .filter(|(index, _)| view.title_matches(*index, titles))
        .map(|(_, entry)| entry.tenure_months(as_of))
        .sum();

    if months == 0 {
        return (0, format!("no tenure in {} roles", titles.join("/")));
    }

    let target = f64::from(target_months.max(1));
    let score = ((months as f64 / target).min(1.0) * 100.0).round() as u8;
    (
        score,
        format!("{months} months in leadership roles against a {target_months}-month target"),
    )
}
