use chrono::{DateTime, Utc};
use sea_orm::{QueryFilter, QueryOrder, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Alert, Budget, EngineError, Expense, ExpensePatch, MoneyCents, MonthKey, ResultEngine, Scope,
    expenses,
};

use super::Engine;

/// Input of [`Engine::create_expense`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExpense {
    pub title: String,
    pub amount: MoneyCents,
    pub category: String,
    pub occurred_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Result of an expense write: the stored expense with the freshly
/// recomputed aggregates of its month.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseWrite {
    pub expense: Expense,
    pub total_spent: MoneyCents,
    pub budget: Option<Budget>,
    pub alert: Alert,
}

impl Engine {
    /// Records an expense in `scope`.
    pub async fn create_expense(
        &self,
        scope: &Scope,
        actor: &str,
        new: NewExpense,
    ) -> ResultEngine<ExpenseWrite> {
        let expense = Expense::new(
            scope.clone(),
            &new.title,
            new.amount,
            &new.category,
            new.occurred_at,
            new.notes.as_deref(),
            actor,
        )?;
        let month = expense.month()?;
        self.require_record(&self.database, scope, actor).await?;
        self.ensure_month_headroom(scope, month, expense.amount).await?;

        expenses::ActiveModel::from(&expense)
            .insert(&self.database)
            .await?;
        tracing::info!(
            scope = %scope,
            month = %month,
            expense_id = %expense.id,
            amount = %expense.amount,
            "expense created"
        );

        self.expense_written(expense, month).await
    }

    /// Applies a partial update to an expense of `scope`.
    ///
    /// When the date moves the expense to another month, both months are
    /// refreshed; the result carries the aggregates of the new month.
    pub async fn update_expense(
        &self,
        scope: &Scope,
        actor: &str,
        expense_id: Uuid,
        patch: ExpensePatch,
    ) -> ResultEngine<ExpenseWrite> {
        let patch = patch.validate()?;
        self.require_read(&self.database, scope, actor).await?;
        let mut expense = self.find_expense(scope, expense_id).await?;
        self.require_edit(&self.database, &expense, actor).await?;

        let previous_month = expense.month()?;
        let previous_amount = expense.amount;
        expense.apply(patch);
        let month = expense.month()?;
        if month != previous_month || expense.amount > previous_amount {
            self.ensure_month_headroom(scope, month, expense.amount).await?;
        }

        expenses::ActiveModel::from(&expense)
            .update(&self.database)
            .await?;
        tracing::info!(scope = %scope, month = %month, expense_id = %expense.id, "expense updated");

        if previous_month != month {
            self.refresh_month(scope, previous_month).await?;
        }
        self.expense_written(expense, month).await
    }

    /// Deletes an expense of `scope` and returns the recomputed alert of its
    /// month.
    pub async fn delete_expense(
        &self,
        scope: &Scope,
        actor: &str,
        expense_id: Uuid,
    ) -> ResultEngine<Alert> {
        self.require_read(&self.database, scope, actor).await?;
        let expense = self.find_expense(scope, expense_id).await?;
        self.require_edit(&self.database, &expense, actor).await?;
        let month = expense.month()?;

        expenses::Entity::delete_by_id(expense.id.to_string())
            .exec(&self.database)
            .await?;
        tracing::info!(scope = %scope, month = %month, expense_id = %expense.id, "expense deleted");

        let (alert, _) = self.refresh_month(scope, month).await?;
        Ok(alert)
    }

    /// Expenses of `scope`, newest first, optionally restricted to a month.
    pub async fn list_expenses(
        &self,
        scope: &Scope,
        actor: &str,
        month: Option<MonthKey>,
    ) -> ResultEngine<Vec<Expense>> {
        self.require_read(&self.database, scope, actor).await?;

        let condition = match month {
            Some(month) => expenses::month_condition(scope, month),
            None => expenses::scope_condition(scope),
        };
        let models = expenses::Entity::find()
            .filter(condition)
            .order_by_desc(expenses::Column::OccurredAt)
            .order_by_asc(expenses::Column::Id)
            .all(&self.database)
            .await?;
        models.into_iter().map(Expense::try_from).collect()
    }

    async fn find_expense(&self, scope: &Scope, expense_id: Uuid) -> ResultEngine<Expense> {
        let model = expenses::Entity::find_by_id(expense_id.to_string())
            .filter(expenses::scope_condition(scope))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;
        Expense::try_from(model)
    }

    /// Rejects a write that would push the month total of `scope` out of
    /// range, before anything is stored.
    async fn ensure_month_headroom(
        &self,
        scope: &Scope,
        month: MonthKey,
        amount: MoneyCents,
    ) -> ResultEngine<()> {
        let total = self.ledger.monthly_total(scope, month).await?;
        MoneyCents::checked_sum([total, amount])?;
        Ok(())
    }

    async fn expense_written(&self, expense: Expense, month: MonthKey) -> ResultEngine<ExpenseWrite> {
        let (alert, budget) = self.refresh_month(&expense.scope, month).await?;
        Ok(ExpenseWrite {
            total_spent: alert.total_spent,
            expense,
            budget,
            alert,
        })
    }
}
