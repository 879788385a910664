use crate::infra::{candidate_source, parse_date, parse_role, DEFAULT_SEED};
use chrono::{Local, NaiveDate};
use clap::Args;
use pronexus::config::AppConfig;
use pronexus::error::AppError;
use pronexus::search::rubric::{EvaluationRule, Rubric};
use pronexus::search::{
    get_rubric, RoleId, RoleProfile, RunErrorEntry, SearchOrchestrator, SearchRun, ShortlistView,
};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct SearchArgs {
    /// Free-text search, e.g. "Interim CFO for $50M SaaS, ASC 606 required"
    #[arg(long, required_unless_present = "role", conflicts_with = "role")]
    pub(crate) query: Option<String>,
    /// Role identifier (interim_cfo, healthcare_ops_lead, project_manager)
    #[arg(long, value_parser = parse_role)]
    pub(crate) role: Option<RoleId>,
    /// Additional hard requirement; repeatable
    #[arg(long = "requirement")]
    pub(crate) requirements: Vec<String>,
    /// Number of candidates to source (overrides SEARCH_CANDIDATE_COUNT)
    #[arg(long)]
    pub(crate) count: Option<usize>,
    /// Seed for the synthetic candidate generator
    #[arg(long)]
    pub(crate) seed: Option<u64>,
    /// Read candidates from a CSV export instead of generating them
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
    /// Reference date for synthetic histories (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Print the shortlist as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct RubricArgs {
    /// Role identifier or label
    #[arg(value_parser = parse_role)]
    pub(crate) role: RoleId,
}

#[derive(Debug, Serialize)]
struct SearchReport<'a> {
    profile: &'a RoleProfile,
    shortlist: ShortlistView,
    errors: &'a [RunErrorEntry],
}

pub(crate) async fn run_search(args: SearchArgs) -> Result<(), AppError> {
    let SearchArgs {
        query,
        role,
        requirements,
        count,
        seed,
        csv,
        as_of,
        json,
    } = args;

    let mut config = AppConfig::load()?.search;
    if let Some(count) = count {
        config.candidate_count = count;
    }

    let mut profile = match (role, query) {
        (Some(role), _) => RoleProfile::new(role, Vec::new()),
        (None, Some(query)) => RoleProfile::from_query(&query),
        (None, None) => RoleProfile::new(RoleId::InterimCfo, Vec::new()),
    };
    profile.requirements.extend(requirements);

    let as_of = as_of.unwrap_or_else(|| Local::now().date_naive());
    let source = candidate_source(csv, seed.unwrap_or(DEFAULT_SEED), as_of);
    let orchestrator = SearchOrchestrator::new(source, config)?;

    let run_id = orchestrator.start(profile)?;
    let run = orchestrator.wait(&run_id).await?;

    if json {
        let report = SearchReport {
            profile: run.profile(),
            shortlist: run.shortlist(),
            errors: run.error_log(),
        };
        let rendered = serde_json::to_string_pretty(&report).map_err(std::io::Error::from)?;
        println!("{rendered}");
    } else {
        print!("{}", render_run(&run));
    }

    Ok(())
}

pub(crate) fn run_rubric(args: RubricArgs) -> Result<(), AppError> {
    let rubric = get_rubric(args.role).map_err(pronexus::search::OrchestratorError::from)?;
    print!("{}", render_rubric(&rubric));
    Ok(())
}

fn render_run(run: &SearchRun) -> String {
    let summary = run.summary();
    let profile = run.profile();
    let mut out = String::new();

    out.push_str(&format!(
        "Search {} for {}: {}\n",
        summary.run_id,
        profile.role.label(),
        summary.state
    ));
    if !profile.query.is_empty() {
        out.push_str(&format!("Query: {}\n", profile.query));
    }
    if !profile.requirements.is_empty() {
        out.push_str(&format!("Requirements: {}\n", profile.requirements.join("; ")));
    }
    out.push_str(&format!(
        "Candidates: {} sourced, {} excluded, {} shortlisted\n",
        summary.candidates, summary.excluded, summary.recommendations
    ));

    let shortlist = run.shortlist();
    if shortlist.entries.is_empty() {
        out.push_str("\nNo candidates were shortlisted.\n");
    }
    for entry in &shortlist.entries {
        out.push_str(&format!(
            "\n#{} {} ({}) {} final {:.2}\n",
            entry.rank, entry.name, entry.candidate_id, entry.tier, entry.final_score
        ));
        for line in &entry.justification {
            out.push_str(&format!("    - {line}\n"));
        }
    }

    if !run.error_log().is_empty() {
        out.push_str("\nErrors\n");
        for entry in run.error_log() {
            let candidate = entry
                .candidate_id
                .as_ref()
                .map(|id| format!(" [{id}]"))
                .unwrap_or_default();
            out.push_str(&format!(
                "  {} {}{}: {}\n",
                entry.stage, entry.code, candidate, entry.message
            ));
        }
    }

    out
}

fn render_rubric(rubric: &Rubric) -> String {
    let mut out = format!("{} rubric ({})\n\nCriteria\n", rubric.role.label(), rubric.role);

    for criterion in &rubric.criteria {
        out.push_str(&format!(
            "  {:>3.0}%  {}\n",
            criterion.weight * 100.0,
            criterion.name
        ));
        let detail = match &criterion.rule {
            EvaluationRule::Evidence {
                terms,
                saturation,
                quantified_bonus,
            } => {
                let bonus = if *quantified_bonus {
                    ", bonus for quantified outcomes"
                } else {
                    ""
                };
                format!(
                    "evidence of {} (full coverage at {saturation}{bonus})",
                    terms.join(", ")
                )
            }
            EvaluationRule::Tenure {
                titles,
                target_months,
            } => format!(
                "{target_months} months as {}",
                titles.join(" / ")
            ),
        };
        out.push_str(&format!("        {detail}\n"));
    }

    out.push_str("\nRed flags\n");
    for flag in &rubric.red_flags {
        out.push_str(&format!("  [{}] {}\n", flag.severity.label(), flag.name));
    }
    out
}
