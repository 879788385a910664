use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{CandidateSource, SourceError};
use crate::search::domain::{
    CandidateId, CandidateRecord, RoleId, RoleProfile, SourceProvenance, WorkEntry,
};

const FIRST_NAMES: &[&str] = &[
    "Avery", "Jordan", "Morgan", "Riley", "Casey", "Quinn", "Harper", "Rowan", "Emerson",
    "Sasha", "Devon", "Kendall", "Reese", "Parker", "Skyler", "Dakota",
];
const LAST_NAMES: &[&str] = &[
    "Chen", "Okafor", "Lindqvist", "Patel", "Moreau", "Haddad", "Nakamura", "Alvarez",
    "Brennan", "Kowalski", "Osei", "Whitfield", "Castillo", "Iverson", "Farrow", "Delgado",
];
const COMPANIES: &[&str] = &[
    "Northwind Analytics",
    "Bluefin Software",
    "Cedar Ridge Holdings",
    "Harborview Systems",
    "Lumen Peak",
    "Ironwood Partners",
    "Silverline Cloud",
    "Meridian Works",
    "Brightwater Labs",
    "Keystone Digital",
    "Granite Bay Group",
    "Tidewater Logistics",
];

/// Persona shapes reproduced by the generator, weighted 30/40/30.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Persona {
    Golden,
    NearMiss,
    RedFlag,
}

impl Persona {
    fn draw(rng: &mut StdRng) -> Self {
        match rng.random_range(0..100) {
            0..=29 => Persona::Golden,
            30..=69 => Persona::NearMiss,
            _ => Persona::RedFlag,
        }
    }
}

/// Seeded generator of realistic executive histories.
///
/// The same seed, reference date, role and count always produce the same records.
#[derive(Debug, Clone)]
pub struct SyntheticCandidateSource {
    seed: u64,
    as_of: NaiveDate,
}

impl SyntheticCandidateSource {
    pub fn new(seed: u64, as_of: NaiveDate) -> Self {
        Self { seed, as_of }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn generate(&self, role: RoleId, count: usize) -> Vec<CandidateRecord> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        (0..count)
            .map(|index| {
                let persona = Persona::draw(&mut rng);
                self.candidate(&mut rng, role, persona, index)
            })
            .collect()
    }

    fn candidate(
        &self,
        rng: &mut StdRng,
        role: RoleId,
        persona: Persona,
        index: usize,
    ) -> CandidateRecord {
        let name = format!("{} {}", pick(rng, FIRST_NAMES), pick(rng, LAST_NAMES));
        let (summary, history) = match persona {
            Persona::Golden => (golden_summary(role), golden_history(rng, role)),
            Persona::NearMiss => (near_miss_summary(role), near_miss_history(rng, role)),
            Persona::RedFlag => (red_flag_summary(role), red_flag_history(rng, role)),
        };

        CandidateRecord {
            id: CandidateId::new(format!("syn-{:x}-{index:03}", self.seed)),
            name,
            provenance: SourceProvenance::Synthetic,
            as_of: self.as_of,
            summary,
            history,
            skills: skills(role, persona),
        }
    }
}

#[async_trait]
impl CandidateSource for SyntheticCandidateSource {
    async fn fetch(
        &self,
        profile: &RoleProfile,
        count: usize,
    ) -> Result<Vec<CandidateRecord>, SourceError> {
        Ok(self.generate(profile.role, count))
    }
}

fn pick<'a>(rng: &mut StdRng, values: &[&'a str]) -> &'a str {
    values[rng.random_range(0..values.len())]
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

fn role_entry(
    employer: String,
    title: &str,
    start: NaiveDate,
    end: Option<NaiveDate>,
    description: &str,
    claims: &[&str],
) -> WorkEntry {
    WorkEntry {
        employer,
        title: title.to_string(),
        start,
        end,
        full_time: true,
        description: description.to_string(),
        claims: claims.iter().map(|claim| claim.to_string()).collect(),
    }
}

fn golden_history(rng: &mut StdRng, role: RoleId) -> Vec<WorkEntry> {
    match role {
        RoleId::InterimCfo => vec![
            role_entry(
                pick(rng, COMPANIES).to_string(),
                "Interim CFO",
                date(2022, 1, 1),
                None,
                "Led finance transformation for a $50M+ ARR SaaS company. Implemented ASC 606 \
                 revenue recognition automation using Maxio.",
                &[
                    "Implemented ASC 606 compliance across all revenue streams",
                    "Reduced monthly close time from 15 to 5 days",
                    "Cut CAC payback from 22 to 14 months",
                    "Managed Big 4 audit relationships",
                ],
            ),
            role_entry(
                pick(rng, COMPANIES).to_string(),
                "VP Finance",
                date(2018, 6, 1),
                Some(date(2021, 12, 31)),
                "Built the finance function for a Series B SaaS startup.",
                &[
                    "Established GAAP-compliant financial reporting and monthly bank reconciliation",
                    "Implemented Zuora billing system",
                    "Improved NRR from 104% to 118% while holding LTV to CAC above 3x",
                ],
            ),
            role_entry(
                "Big 4 Accounting Firm".to_string(),
                "Senior Manager",
                date(2013, 1, 1),
                Some(date(2018, 5, 31)),
                "Audited SaaS and technology companies.",
                &[
                    "Led ASC 606 implementation projects",
                    "Managed audit teams of 5-10 professionals",
                ],
            ),
        ],
        RoleId::HealthcareOpsLead => vec![
            role_entry(
                format!("{} Hospital", pick(rng, COMPANIES)),
                "Interim Clinical Operations Lead",
                date(2021, 3, 1),
                None,
                "Led clinical operations transformation for a 300-bed hospital.",
                &[
                    "Reduced ED wait times by 25%",
                    "Cut ED boarding hours by 18%",
                    "Achieved JCAHO survey readiness",
                    "Reduced contract labor costs by 30%",
                ],
            ),
            role_entry(
                format!("{} Health System", pick(rng, COMPANIES)),
                "Director of Clinical Operations",
                date(2017, 1, 1),
                Some(date(2021, 2, 28)),
                "Managed clinical throughput and patient flow.",
                &[
                    "Reduced LOS by 15%",
                    "Improved CMS star rating from 3 to 4",
                    "Rebuilt the staffing grid and cut overtime by 12%",
                ],
            ),
        ],
        RoleId::ProjectManager => vec![
            role_entry(
                pick(rng, COMPANIES).to_string(),
                "Senior Project Manager",
                date(2020, 1, 1),
                None,
                "Led enterprise digital transformation projects.",
                &[
                    "Delivered $5M project on-time and on-budget",
                    "Chaired C-level steering committee for 12 stakeholders",
                    "PMP certified, SAFe 5.0 certified",
                    "Reduced project risk by 40%",
                ],
            ),
            role_entry(
                pick(rng, COMPANIES).to_string(),
                "Project Manager",
                date(2014, 3, 1),
                Some(date(2019, 12, 31)),
                "Ran Agile and Waterfall programs for a regional bank.",
                &[
                    "Held budget variance under 3% across 14 releases",
                    "Maintained the risk register and communication plan for the executive sponsor",
                ],
            ),
        ],
    }
}

/// Four contract roles in consecutive years, each inside a single calendar year.
fn near_miss_history(rng: &mut StdRng, role: RoleId) -> Vec<WorkEntry> {
    let title = format!("{} (Contract)", role.label());
    (0..4)
        .map(|offset| {
            let year = 2020 + offset;
            let start_month = rng.random_range(1..=6);
            let end_month = rng.random_range(7..=12);
            let employer = pick(rng, COMPANIES);
            role_entry(
                employer.to_string(),
                &title,
                date(year, start_month, 1),
                Some(date(year, end_month, 28)),
                &format!("Contract role at {employer}."),
                &["Completed assigned projects"],
            )
        })
        .collect()
}

fn red_flag_history(rng: &mut StdRng, role: RoleId) -> Vec<WorkEntry> {
    match role {
        RoleId::InterimCfo => vec![
            role_entry(
                pick(rng, COMPANIES).to_string(),
                "CFO",
                date(2020, 1, 1),
                Some(date(2022, 6, 30)),
                "Managed finance using cash-basis accounting for a $10M ARR SaaS company.",
                &["Maintained cash flow", "Grew revenue to $10M ARR"],
            ),
            role_entry(
                pick(rng, COMPANIES).to_string(),
                "VP Finance",
                date(2021, 12, 1),
                Some(date(2023, 12, 31)),
                "Finance leadership role.",
                &["Led finance team"],
            ),
        ],
        RoleId::HealthcareOpsLead | RoleId::ProjectManager => vec![
            role_entry(
                pick(rng, COMPANIES).to_string(),
                role.label(),
                date(2016, 1, 1),
                Some(date(2018, 9, 30)),
                "Operations role.",
                &["Supported department initiatives"],
            ),
            role_entry(
                pick(rng, COMPANIES).to_string(),
                role.label(),
                date(2020, 1, 1),
                Some(date(2020, 6, 30)),
                "Brief role.",
                &["Reduced costs by 120%"],
            ),
        ],
    }
}

fn golden_summary(role: RoleId) -> String {
    match role {
        RoleId::InterimCfo => "Results-driven Interim CFO with 15+ years in SaaS finance. Expert in \
                               ASC 606 revenue recognition, IPO readiness and Big 4 audit \
                               management."
            .to_string(),
        RoleId::HealthcareOpsLead => "Healthcare operations executive with 12+ years optimizing \
                                      clinical throughput. Expert in Epic/Cerner EMR systems, \
                                      JCAHO compliance and value-based care."
            .to_string(),
        RoleId::ProjectManager => "PMP-certified project manager with 10+ years delivering \
                                   enterprise programs in Agile, Waterfall and SAFe."
            .to_string(),
    }
}

fn near_miss_summary(role: RoleId) -> String {
    format!(
        "Experienced {} with a diverse background across multiple industries. Strong track \
         record of delivering results in fast-paced environments.",
        role.label()
    )
}

fn red_flag_summary(role: RoleId) -> String {
    format!(
        "{} with experience in various roles. Adaptable professional seeking new opportunities.",
        role.label()
    )
}

fn skills(role: RoleId, persona: Persona) -> BTreeSet<String> {
    let (base, extra): (&[&str], &[&str]) = match (role, persona) {
        (RoleId::InterimCfo, Persona::Golden) => (
            &["Financial Analysis", "GAAP", "Financial Reporting"],
            &[
                "ASC 606",
                "Revenue Recognition",
                "IPO Readiness",
                "Maxio",
                "Zuora",
                "Big 4 Audit",
            ],
        ),
        (RoleId::InterimCfo, Persona::RedFlag) => (
            &["Financial Analysis", "GAAP", "Financial Reporting"],
            &["Cash Basis Accounting", "QuickBooks"],
        ),
        (RoleId::InterimCfo, Persona::NearMiss) => (
            &["Financial Analysis", "GAAP", "Financial Reporting"],
            &["Budget Management"],
        ),
        (RoleId::HealthcareOpsLead, Persona::Golden) => (
            &["Clinical Operations", "Patient Care"],
            &[
                "Epic EMR",
                "Cerner",
                "JCAHO",
                "CMS Compliance",
                "Throughput Optimization",
            ],
        ),
        (RoleId::HealthcareOpsLead, _) => (&["Clinical Operations", "Patient Care"], &[]),
        (RoleId::ProjectManager, Persona::Golden) => (
            &["Project Management", "Stakeholder Management"],
            &["PMP", "SAFe", "Agile", "Budget Control", "Risk Management"],
        ),
        (RoleId::ProjectManager, _) => (&["Project Management", "Stakeholder Management"], &[]),
    };

    base.iter()
        .chain(extra.iter())
        .map(|skill| skill.to_string())
        .collect()
}
