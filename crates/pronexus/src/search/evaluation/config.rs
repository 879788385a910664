use serde::{Deserialize, Serialize};

/// Tunables consumed by rubric red-flag predicates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Uncovered days between roles before the "Extended Employment Gap" flag fires.
    pub red_flag_gap_days: i64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            red_flag_gap_days: 180,
        }
    }
}
