//! Budget alert evaluation.
//!
//! The breach boundary is inclusive: spending that reaches the limit counts as
//! a breach. A missing budget is evaluated with a limit of zero, so a month
//! without a budget always reads as breached, even with no spending at all.

use serde::{Deserialize, Serialize};

use crate::{CategoryLimit, MoneyCents, MonthKey, ledger::CategoryTotal};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub month: MonthKey,
    pub total_spent: MoneyCents,
    pub limit: MoneyCents,
    pub breached: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category_breaches: Vec<CategoryBreach>,
}

/// A category whose spending reached its sub-limit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBreach {
    pub category: String,
    pub spent: MoneyCents,
    pub limit: MoneyCents,
}

/// Computes the alert for a month. Pure: no I/O.
pub fn evaluate(month: MonthKey, total_spent: MoneyCents, limit: MoneyCents) -> Alert {
    Alert {
        month,
        total_spent,
        limit,
        breached: total_spent >= limit,
        category_breaches: Vec::new(),
    }
}

/// Returns the sub-limits reached by the month's category totals, in the
/// order the limits are given. Categories without spending count as zero.
pub fn category_breaches(
    totals: &[CategoryTotal],
    limits: &[CategoryLimit],
) -> Vec<CategoryBreach> {
    limits
        .iter()
        .filter_map(|limit| {
            let spent = totals
                .iter()
                .find(|t| t.category == limit.category)
                .map_or(MoneyCents::ZERO, |t| t.total);
            (spent >= limit.limit).then(|| CategoryBreach {
                category: limit.category.clone(),
                spent,
                limit: limit.limit,
            })
        })
        .collect()
}
