use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, prelude::*, sea_query::OnConflict};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Alert, Budget, CategoryLimit, EngineError, MoneyCents, MonthKey, ResultEngine, Scope,
    budget_category_limits, budgets, budgets::validate_category_limits,
};

use super::Engine;

/// Result of [`Engine::set_budget`]: the stored budget and the alert
/// recomputed against it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetWrite {
    pub budget: Budget,
    pub alert: Alert,
}

/// The budget of a month (if any) with the spending so far.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub month: MonthKey,
    pub budget: Option<Budget>,
    pub total_spent: MoneyCents,
}

impl Engine {
    /// Creates or replaces the budget of `(scope, month)`.
    ///
    /// Category sub-limits are replaced as a whole. After the write the
    /// month's cache entries are invalidated and the alert is recomputed.
    pub async fn set_budget(
        &self,
        scope: &Scope,
        month: MonthKey,
        limit: MoneyCents,
        category_limits: Vec<CategoryLimit>,
        actor: &str,
    ) -> ResultEngine<BudgetWrite> {
        let limit = limit.bounded("limit")?;
        let category_limits = validate_category_limits(scope, category_limits)?;
        self.require_budget_admin(&self.database, scope, actor).await?;

        let scope_owned = scope.clone();
        let budget = self
            .with_tx(|engine, db_tx| {
                Box::pin(async move {
                    let candidate = Budget {
                        id: Uuid::new_v4(),
                        scope: scope_owned,
                        month,
                        limit,
                        category_limits,
                    };

                    // Keeps the id of an existing budget and only replaces its limit.
                    budgets::Entity::insert(budgets::ActiveModel::from(&candidate))
                        .on_conflict(
                            OnConflict::columns([
                                budgets::Column::ScopeKind,
                                budgets::Column::ScopeId,
                                budgets::Column::Month,
                            ])
                            .update_column(budgets::Column::LimitMinor)
                            .to_owned(),
                        )
                        .exec_without_returning(db_tx)
                        .await?;
                    let stored = engine
                        .find_budget(db_tx, &candidate.scope, month)
                        .await?
                        .ok_or_else(|| EngineError::KeyNotFound("budget not exists".to_string()))?;
                    let budget = Budget {
                        id: stored.id,
                        ..candidate
                    };

                    budget_category_limits::Entity::delete_many()
                        .filter(budget_category_limits::Column::BudgetId.eq(budget.id.to_string()))
                        .exec(db_tx)
                        .await?;
                    for entry in &budget.category_limits {
                        budget_category_limits::ActiveModel {
                            budget_id: ActiveValue::Set(budget.id.to_string()),
                            category: ActiveValue::Set(entry.category.clone()),
                            limit_minor: ActiveValue::Set(entry.limit.cents()),
                        }
                        .insert(db_tx)
                        .await?;
                    }

                    Ok(budget)
                })
            })
            .await?;

        tracing::info!(scope = %scope, month = %month, limit = %limit, "budget set");
        let (alert, stored) = self.refresh_month(scope, month).await?;
        Ok(BudgetWrite {
            budget: stored.unwrap_or(budget),
            alert,
        })
    }

    /// The budget of `(scope, month)`, if one was set, and the month's total
    /// spending.
    pub async fn budget(
        &self,
        scope: &Scope,
        month: MonthKey,
        actor: &str,
    ) -> ResultEngine<BudgetStatus> {
        self.require_read(&self.database, scope, actor).await?;
        let budget = self.find_budget(&self.database, scope, month).await?;
        let total_spent = self.ledger.monthly_total(scope, month).await?;
        Ok(BudgetStatus {
            month,
            budget,
            total_spent,
        })
    }

    pub(super) async fn find_budget<C: ConnectionTrait>(
        &self,
        db: &C,
        scope: &Scope,
        month: MonthKey,
    ) -> ResultEngine<Option<Budget>> {
        let rows = budgets::Entity::find()
            .filter(budgets::Column::ScopeKind.eq(scope.kind()))
            .filter(budgets::Column::ScopeId.eq(scope.id()))
            .filter(budgets::Column::Month.eq(month.to_string()))
            .find_with_related(budget_category_limits::Entity)
            .all(db)
            .await?;
        rows.into_iter().next().map(Budget::try_from).transpose()
    }
}
