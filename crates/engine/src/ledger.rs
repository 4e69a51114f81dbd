//! Ledger query engine: monthly aggregates computed straight from the
//! `expenses` table.
//!
//! Nothing here writes or caches; every call reflects the current ledger
//! state, and storage errors are propagated unchanged.

use sea_orm::{
    ConnectionTrait, DatabaseConnection, EntityTrait, FromQueryResult, QueryFilter, QuerySelect,
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};

use crate::{MoneyCents, MonthKey, ResultEngine, Scope, expenses};

/// Spending of one category in a month.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: MoneyCents,
    pub count: i64,
}

/// Spending recorded by one team member in a month.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberTotal {
    pub member: String,
    pub total: MoneyCents,
    pub count: i64,
}

/// Category breakdown of a month, sorted by descending total.
///
/// Team summaries also carry the per-member breakdown and, when a budget
/// exists, its limit and what remains of it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub month: MonthKey,
    pub total_spent: MoneyCents,
    pub categories: Vec<CategoryTotal>,
    pub expense_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<MemberTotal>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<MoneyCents>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining: Option<MoneyCents>,
}

#[derive(Debug, FromQueryResult)]
struct GroupRow {
    key: String,
    total: i64,
    count: i64,
}

/// Read-only aggregation over the expense ledger.
#[derive(Clone, Debug)]
pub struct Ledger {
    database: DatabaseConnection,
}

impl Ledger {
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }

    /// Sum of all expense amounts of `scope` dated within `month`. Zero when
    /// nothing matches.
    pub async fn monthly_total(&self, scope: &Scope, month: MonthKey) -> ResultEngine<MoneyCents> {
        monthly_total(&self.database, scope, month).await
    }

    /// Per-category totals and counts, largest total first.
    pub async fn category_totals(
        &self,
        scope: &Scope,
        month: MonthKey,
    ) -> ResultEngine<Vec<CategoryTotal>> {
        let rows = grouped(&self.database, scope, month, expenses::Column::Category).await?;
        Ok(rows
            .into_iter()
            .map(|row| CategoryTotal {
                category: row.key,
                total: MoneyCents::new(row.total),
                count: row.count,
            })
            .collect())
    }

    /// Per-member totals and counts, largest total first.
    pub async fn member_totals(
        &self,
        scope: &Scope,
        month: MonthKey,
    ) -> ResultEngine<Vec<MemberTotal>> {
        let rows = grouped(&self.database, scope, month, expenses::Column::CreatedBy).await?;
        Ok(rows
            .into_iter()
            .map(|row| MemberTotal {
                member: row.key,
                total: MoneyCents::new(row.total),
                count: row.count,
            })
            .collect())
    }

    /// Category breakdown of the month. `total_spent` is the sum of the
    /// category totals. Team scopes also get the member breakdown.
    pub async fn monthly_summary(
        &self,
        scope: &Scope,
        month: MonthKey,
    ) -> ResultEngine<MonthlySummary> {
        let categories = self.category_totals(scope, month).await?;
        let total_spent = MoneyCents::checked_sum(categories.iter().map(|c| c.total))?;
        let expense_count = categories.iter().map(|c| c.count).sum();
        let members = if scope.is_team() {
            Some(self.member_totals(scope, month).await?)
        } else {
            None
        };

        Ok(MonthlySummary {
            month,
            total_spent,
            categories,
            expense_count,
            members,
            limit: None,
            remaining: None,
        })
    }
}

async fn monthly_total<C: ConnectionTrait>(
    db: &C,
    scope: &Scope,
    month: MonthKey,
) -> ResultEngine<MoneyCents> {
    let total: Option<Option<i64>> = expenses::Entity::find()
        .select_only()
        .column_as(Expr::col(expenses::Column::AmountMinor).sum(), "total")
        .filter(expenses::month_condition(scope, month))
        .into_tuple()
        .one(db)
        .await?;
    Ok(MoneyCents::new(total.flatten().unwrap_or(0)))
}

async fn grouped<C: ConnectionTrait>(
    db: &C,
    scope: &Scope,
    month: MonthKey,
    by: expenses::Column,
) -> ResultEngine<Vec<GroupRow>> {
    let mut rows = expenses::Entity::find()
        .select_only()
        .column_as(by, "key")
        .column_as(Expr::col(expenses::Column::AmountMinor).sum(), "total")
        .column_as(Expr::col(expenses::Column::Id).count(), "count")
        .filter(expenses::month_condition(scope, month))
        .group_by(by)
        .into_model::<GroupRow>()
        .all(db)
        .await?;
    // Ties are broken by name so repeated computations agree.
    rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.key.cmp(&b.key)));
    Ok(rows)
}
