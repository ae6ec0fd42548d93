use crate::model::{Category, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolidScores {
    pub srp: f64,
    pub ocp: f64,
    pub lsp: f64,
    pub isp: f64,
    pub dip: f64,
    /// Mean of the five principle scores.
    pub overall: f64,
}

impl Default for SolidScores {
    fn default() -> Self {
        Self {
            srp: 100.0,
            ocp: 100.0,
            lsp: 100.0,
            isp: 100.0,
            dip: 100.0,
            overall: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModuleCoupling {
    pub path: PathBuf,
    pub fan_in: usize,
    pub fan_out: usize,
    /// Distinct imports that did not resolve to an analyzed module.
    pub external_fan_out: usize,
    pub instability: f64,
}

impl ModuleCoupling {
    pub fn total_fan_out(&self) -> usize {
        self.fan_out + self.external_fan_out
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CouplingMetrics {
    pub avg_fan_out: f64,
    pub max_fan_out: usize,
    pub top_coupled_modules: Vec<ModuleCoupling>,
    pub edge_count: usize,
    pub cycle_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectMetrics {
    /// `100 - (10*critical + 7*high + 4*medium + 1*low)`, floored at 0.
    pub overall_score: u32,
    pub solid_scores: SolidScores,
    pub coupling: CouplingMetrics,
    pub files_analyzed: usize,
    pub files_failed: usize,
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_category: BTreeMap<Category, usize>,
}
