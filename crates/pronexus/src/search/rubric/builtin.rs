use super::{Criterion, EvaluationRule, RedFlagPredicate, RedFlagRule, Rubric};
use crate::search::domain::{RoleId, Severity};

pub(super) fn rubrics() -> Vec<Rubric> {
    vec![interim_cfo(), healthcare_ops_lead(), project_manager()]
}

fn employment_gap() -> RedFlagRule {
    RedFlagRule {
        name: "Extended Employment Gap",
        severity: Severity::Medium,
        predicate: RedFlagPredicate::EmploymentGap,
    }
}

pub(super) fn interim_cfo() -> Rubric {
    Rubric {
        role: RoleId::InterimCfo,
        criteria: vec![
            Criterion {
                name: "Revenue Recognition Compliance (ASC 606)",
                weight: 0.30,
                rule: EvaluationRule::Evidence {
                    terms: &[
                        "revenue recognition",
                        "asc 606",
                        "deferred revenue",
                        "rpo",
                        "remaining performance obligations",
                    ],
                    saturation: 2,
                    quantified_bonus: true,
                },
            },
            Criterion {
                name: "SaaS Unit Economics (CAC, LTV, NRR)",
                weight: 0.25,
                rule: EvaluationRule::Evidence {
                    terms: &[
                        "cac",
                        "ltv",
                        "nrr",
                        "net revenue retention",
                        "magic number",
                        "customer acquisition cost",
                        "lifetime value",
                    ],
                    saturation: 3,
                    quantified_bonus: true,
                },
            },
            Criterion {
                name: "Billing Automation",
                weight: 0.15,
                rule: EvaluationRule::Evidence {
                    terms: &["automated", "automation", "billing system", "zuora", "maxio"],
                    saturation: 2,
                    quantified_bonus: true,
                },
            },
            Criterion {
                name: "Financial Controls and Reporting",
                weight: 0.15,
                rule: EvaluationRule::Evidence {
                    terms: &[
                        "gaap",
                        "bank reconciliation",
                        "financial statements",
                        "financial reporting",
                        "audit",
                        "monthly close",
                    ],
                    saturation: 3,
                    quantified_bonus: true,
                },
            },
            Criterion {
                name: "Finance Leadership Tenure",
                weight: 0.15,
                rule: EvaluationRule::Tenure {
                    titles: &["cfo", "chief financial officer", "vp finance", "controller"],
                    target_months: 60,
                },
            },
        ],
        red_flags: vec![
            RedFlagRule {
                name: "Cash-Basis Accounting",
                severity: Severity::High,
                predicate: RedFlagPredicate::TermsPresent {
                    terms: &["cash basis", "cash basis accounting"],
                },
            },
            RedFlagRule {
                name: "Mixed Cash and Accrual Methods",
                severity: Severity::Medium,
                predicate: RedFlagPredicate::ConflictingTerms {
                    left: &["cash basis"],
                    right: &["accrual", "gaap"],
                },
            },
            RedFlagRule {
                name: "Growth Without Efficiency Metrics",
                severity: Severity::Medium,
                predicate: RedFlagPredicate::Unsupported {
                    present: &["revenue growth", "grew revenue", "scaled revenue"],
                    support: &["cac", "ltv", "nrr", "net revenue retention", "magic number"],
                },
            },
            RedFlagRule {
                name: "No Bank Reconciliation Oversight",
                severity: Severity::Low,
                predicate: RedFlagPredicate::TermsAbsent {
                    terms: &["bank reconciliation", "reconciliation", "reconciliations"],
                },
            },
            employment_gap(),
            RedFlagRule {
                name: "Short C-Suite Tenure",
                severity: Severity::Medium,
                predicate: RedFlagPredicate::ShortTenure {
                    titles: &["cfo", "chief financial officer"],
                    max_months: 18,
                    exempt: &["interim", "fractional"],
                },
            },
        ],
    }
}

pub(super) fn healthcare_ops_lead() -> Rubric {
    Rubric {
        role: RoleId::HealthcareOpsLead,
        criteria: vec![
            Criterion {
                name: "Patient Flow and Throughput",
                weight: 0.40,
                rule: EvaluationRule::Evidence {
                    terms: &[
                        "length of stay",
                        "los",
                        "ed boarding",
                        "discharge planning",
                        "patient flow",
                        "throughput",
                        "ed wait",
                    ],
                    saturation: 3,
                    quantified_bonus: true,
                },
            },
            Criterion {
                name: "Regulatory Stabilization",
                weight: 0.35,
                rule: EvaluationRule::Evidence {
                    terms: &[
                        "joint commission",
                        "tjc",
                        "jcaho",
                        "cms",
                        "star rating",
                        "corrective action plan",
                        "survey readiness",
                    ],
                    saturation: 2,
                    quantified_bonus: true,
                },
            },
            Criterion {
                name: "Workforce and Labor Management",
                weight: 0.25,
                rule: EvaluationRule::Evidence {
                    terms: &["contract labor", "overtime", "staffing grid", "staffing"],
                    saturation: 2,
                    quantified_bonus: true,
                },
            },
        ],
        red_flags: vec![
            RedFlagRule {
                name: "No Regulatory Survey Exposure",
                severity: Severity::Medium,
                predicate: RedFlagPredicate::TermsAbsent {
                    terms: &["joint commission", "tjc", "jcaho", "cms", "survey"],
                },
            },
            RedFlagRule {
                name: "Unquantified Throughput Claims",
                severity: Severity::Low,
                predicate: RedFlagPredicate::UnquantifiedClaims {
                    terms: &["length of stay", "los", "patient flow", "throughput", "ed wait"],
                },
            },
            employment_gap(),
        ],
    }
}

pub(super) fn project_manager() -> Rubric {
    Rubric {
        role: RoleId::ProjectManager,
        criteria: vec![
            Criterion {
                name: "Methodology Fluency",
                weight: 0.20,
                rule: EvaluationRule::Evidence {
                    terms: &["agile", "waterfall", "safe", "scrum", "kanban", "hybrid"],
                    saturation: 2,
                    quantified_bonus: false,
                },
            },
            Criterion {
                name: "Budget Variance Control",
                weight: 0.35,
                rule: EvaluationRule::Evidence {
                    terms: &[
                        "budget variance",
                        "under budget",
                        "on budget",
                        "cost variance",
                        "scope creep",
                        "change orders",
                        "budget",
                    ],
                    saturation: 2,
                    quantified_bonus: true,
                },
            },
            Criterion {
                name: "Stakeholder Management",
                weight: 0.30,
                rule: EvaluationRule::Evidence {
                    terms: &[
                        "stakeholder",
                        "stakeholders",
                        "steering committee",
                        "change management",
                        "communication plan",
                        "risk register",
                        "executive sponsor",
                    ],
                    saturation: 2,
                    quantified_bonus: true,
                },
            },
            Criterion {
                name: "Professional Certification",
                weight: 0.15,
                rule: EvaluationRule::Evidence {
                    terms: &["pmp", "csm", "prince2", "pgmp"],
                    saturation: 1,
                    quantified_bonus: false,
                },
            },
        ],
        red_flags: vec![
            RedFlagRule {
                name: "Vague Project History",
                severity: Severity::Medium,
                predicate: RedFlagPredicate::VagueHistory,
            },
            RedFlagRule {
                name: "Missing Certification for Senior Role",
                severity: Severity::Low,
                predicate: RedFlagPredicate::MissingCredential {
                    titles: &["senior", "director", "head", "principal", "program manager"],
                    credentials: &["pmp", "csm", "pgmp", "prince2"],
                },
            },
            employment_gap(),
        ],
    }
}
