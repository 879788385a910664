use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::config::SearchConfig;
use crate::search::audit::{AuditConfig, AuditFinding, ForensicAuditor, TimelineAuditor};
use crate::search::domain::{
    CandidateError, CandidateId, CandidateRecord, RoleProfile, SourceProvenance, WorkEntry,
};
use crate::search::evaluation::{DomainEvaluator, EvaluationResult, RubricEvaluator};
use crate::search::matchmaker::{Aggregator, Recommendation};
use crate::search::orchestrator::SearchOrchestrator;
use crate::search::rubric::Rubric;
use crate::search::source::{CandidateSource, SourceError};

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn as_of() -> NaiveDate {
    date(2025, 6, 30)
}

pub(super) fn role(
    title: &str,
    employer: &str,
    start: NaiveDate,
    end: Option<NaiveDate>,
    description: &str,
    claims: &[&str],
) -> WorkEntry {
    WorkEntry {
        employer: employer.to_string(),
        title: title.to_string(),
        start,
        end,
        full_time: true,
        description: description.to_string(),
        claims: claims.iter().map(|claim| claim.to_string()).collect(),
    }
}

pub(super) fn candidate(id: &str, history: Vec<WorkEntry>) -> CandidateRecord {
    CandidateRecord {
        id: CandidateId::new(id),
        name: format!("Candidate {id}"),
        provenance: SourceProvenance::Live,
        as_of: as_of(),
        summary: String::new(),
        history,
        skills: BTreeSet::new(),
    }
}

/// Interim CFO whose history covers every criterion with figures and no audit findings.
pub(super) fn strong_cfo(id: &str) -> CandidateRecord {
    candidate(
        id,
        vec![
            role(
                "Controller",
                "Northwind Software",
                date(2014, 1, 1),
                Some(date(2018, 12, 31)),
                "Ran GAAP monthly close with weekly bank reconciliation across 3 entities",
                &[],
            ),
            role(
                "Interim CFO",
                "Brightline SaaS",
                date(2019, 1, 1),
                None,
                "Led ASC 606 revenue recognition and deferred revenue policy for 40 contracts",
                &[
                    "Improved NRR from 98% to 115% while tracking CAC payback and LTV",
                    "Automated billing on Zuora, saving 120 hours per month",
                ],
            ),
        ],
    )
}

/// CFO candidate with cash-basis bookkeeping and no revenue-recognition background.
pub(super) fn cash_basis_cfo(id: &str) -> CandidateRecord {
    candidate(
        id,
        vec![role(
            "Controller",
            "Main Street Retail",
            date(2016, 3, 1),
            None,
            "Managed cash basis accounting and vendor payments for 12 stores",
            &[],
        )],
    )
}

/// CFO candidate with an eight-month hole between two otherwise clean roles.
pub(super) fn gapped_cfo(id: &str) -> CandidateRecord {
    candidate(
        id,
        vec![
            role(
                "VP Finance",
                "Harbor Analytics",
                date(2018, 1, 1),
                Some(date(2021, 12, 31)),
                "Owned GAAP financial reporting and bank reconciliation",
                &[],
            ),
            role(
                "Interim CFO",
                "Copperline Health",
                date(2022, 9, 1),
                None,
                "Implemented ASC 606 revenue recognition",
                &[],
            ),
        ],
    )
}

pub(super) fn malformed(id: &str) -> CandidateRecord {
    candidate(id, Vec::new())
}

pub(super) fn cfo_profile() -> RoleProfile {
    RoleProfile::new(crate::search::RoleId::InterimCfo, Vec::new())
}

pub(super) fn test_config() -> SearchConfig {
    SearchConfig {
        source_timeout: Duration::from_secs(2),
        candidate_timeout: Duration::from_secs(1),
        ..SearchConfig::default()
    }
}

pub(super) fn orchestrator(source: impl CandidateSource + 'static) -> SearchOrchestrator {
    SearchOrchestrator::new(Arc::new(source), test_config()).expect("valid config")
}

pub(super) struct StaticSource {
    records: Vec<CandidateRecord>,
}

impl StaticSource {
    pub(super) fn new(records: Vec<CandidateRecord>) -> Self {
        Self { records }
    }

    pub(super) fn empty() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl CandidateSource for StaticSource {
    async fn fetch(
        &self,
        _profile: &RoleProfile,
        count: usize,
    ) -> Result<Vec<CandidateRecord>, SourceError> {
        Ok(self.records.iter().take(count).cloned().collect())
    }
}

pub(super) struct FailingSource;

#[async_trait]
impl CandidateSource for FailingSource {
    async fn fetch(
        &self,
        _profile: &RoleProfile,
        _count: usize,
    ) -> Result<Vec<CandidateRecord>, SourceError> {
        Err(SourceError::Unavailable("provider outage".to_string()))
    }
}

pub(super) struct SlowSource {
    pub(super) delay: Duration,
}

#[async_trait]
impl CandidateSource for SlowSource {
    async fn fetch(
        &self,
        _profile: &RoleProfile,
        _count: usize,
    ) -> Result<Vec<CandidateRecord>, SourceError> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }
}

pub(super) struct PanickingSource;

#[async_trait]
impl CandidateSource for PanickingSource {
    async fn fetch(
        &self,
        _profile: &RoleProfile,
        _count: usize,
    ) -> Result<Vec<CandidateRecord>, SourceError> {
        panic!("provider client crashed")
    }
}

pub(super) struct PanickingAggregator;

impl Aggregator for PanickingAggregator {
    fn aggregate(
        &self,
        _evaluations: &BTreeMap<CandidateId, EvaluationResult>,
        _audits: &BTreeMap<CandidateId, AuditFinding>,
    ) -> Vec<Recommendation> {
        panic!("ranking model crashed")
    }
}

/// Evaluator that rejects one candidate and scores the rest with the rubric evaluator.
pub(super) struct RejectingEvaluator {
    reject: CandidateId,
    inner: RubricEvaluator,
}

impl RejectingEvaluator {
    pub(super) fn new(reject: &str) -> Self {
        Self {
            reject: CandidateId::new(reject),
            inner: RubricEvaluator::default(),
        }
    }
}

#[async_trait]
impl DomainEvaluator for RejectingEvaluator {
    async fn evaluate(
        &self,
        candidate: &CandidateRecord,
        rubric: &Rubric,
    ) -> Result<EvaluationResult, CandidateError> {
        if candidate.id == self.reject {
            return Err(CandidateError::Malformed {
                candidate_id: candidate.id.clone(),
                reason: "claims could not be parsed".to_string(),
            });
        }
        self.inner.score(candidate, rubric)
    }
}

/// Auditor that stalls on one candidate and defers to the rule-based auditor otherwise.
pub(super) struct StallingAuditor {
    pub(super) stall_on: CandidateId,
    pub(super) delay: Duration,
    inner: TimelineAuditor,
}

impl StallingAuditor {
    pub(super) fn new(stall_on: &str, delay: Duration) -> Self {
        Self {
            stall_on: CandidateId::new(stall_on),
            delay,
            inner: TimelineAuditor::new(AuditConfig::default()),
        }
    }
}

#[async_trait]
impl ForensicAuditor for StallingAuditor {
    async fn audit(&self, candidate: &CandidateRecord) -> Result<AuditFinding, CandidateError> {
        if candidate.id == self.stall_on {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.inspect(candidate)
    }
}

/// Auditor that records the peak number of concurrent calls.
#[derive(Default)]
pub(super) struct CountingAuditor {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    inner: TimelineAuditor,
}

impl CountingAuditor {
    pub(super) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ForensicAuditor for CountingAuditor {
    async fn audit(&self, candidate: &CandidateRecord) -> Result<AuditFinding, CandidateError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.inner.inspect(candidate)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
