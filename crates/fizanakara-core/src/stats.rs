//! Dashboard aggregation over members and one year's contributions.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{Contribution, Person};

/// Number of overdue contributions highlighted on the dashboard
pub const AT_RISK_LIMIT: usize = 5;

#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardStats {
    pub total_members: usize,
    pub total_paid: f64,
    pub total_remaining: f64,
    /// Paid plus remaining
    pub total_expected: f64,
    /// 0 to 100, zero when nothing is expected
    pub progress_percent: f64,
    pub up_to_date: usize,
    pub late: usize,
    /// Largest outstanding balances first
    pub at_risk: Vec<Contribution>,
    pub average_contribution: f64,
    pub district_counts: BTreeMap<String, usize>,
    pub top_district: Option<(String, usize)>,
    /// Distinct tribute names in first-seen order
    pub tributes: Vec<String>,
}

impl DashboardStats {
    pub fn compute(members: &[Person], contributions: &[Contribution]) -> Self {
        let total_paid: f64 = contributions.iter().map(|c| c.total_paid).sum();
        let total_remaining: f64 = contributions.iter().map(|c| c.remaining).sum();
        let total_expected = total_paid + total_remaining;
        let progress_percent = if total_expected > 0.0 {
            total_paid / total_expected * 100.0
        } else {
            0.0
        };

        let up_to_date = contributions.iter().filter(|c| c.is_fully_paid()).count();
        let late = contributions.len() - up_to_date;

        let mut at_risk: Vec<Contribution> = contributions
            .iter()
            .filter(|c| !c.is_fully_paid())
            .cloned()
            .collect();
        at_risk.sort_by(|a, b| b.remaining.total_cmp(&a.remaining));
        at_risk.truncate(AT_RISK_LIMIT);

        let average_contribution = if members.is_empty() {
            0.0
        } else {
            total_expected / members.len() as f64
        };

        let mut district_counts: BTreeMap<String, usize> = BTreeMap::new();
        for name in members.iter().filter_map(|m| m.district_name.as_deref()) {
            if !name.is_empty() {
                *district_counts.entry(name.to_string()).or_default() += 1;
            }
        }

        // Ties go to the alphabetically first district
        let top_district = district_counts
            .iter()
            .fold(None, |best: Option<(&String, usize)>, (name, &count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((name, count)),
            })
            .map(|(name, count)| (name.clone(), count));

        let mut tributes: Vec<String> = Vec::new();
        for name in members.iter().filter_map(|m| m.tribute_name.as_deref()) {
            if !name.is_empty() && !tributes.iter().any(|t| t == name) {
                tributes.push(name.to_string());
            }
        }

        Self {
            total_members: members.len(),
            total_paid,
            total_remaining,
            total_expected,
            progress_percent,
            up_to_date,
            late,
            at_risk,
            average_contribution,
            district_counts,
            top_district,
            tributes,
        }
    }
}
