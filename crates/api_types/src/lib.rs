use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Query string shared by every month-scoped read (`?month=YYYY-MM`).
#[derive(Debug, Serialize, Deserialize)]
pub struct MonthQuery {
    pub month: String,
}

pub mod expense {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub title: String,
        pub amount_minor: i64,
        pub category: String,
        /// Any offset is accepted; the expense is filed under the UTC month.
        pub occurred_at: DateTime<FixedOffset>,
        pub notes: Option<String>,
    }

    /// Partial update: absent fields keep their value.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExpenseUpdate {
        pub title: Option<String>,
        pub amount_minor: Option<i64>,
        pub category: Option<String>,
        pub occurred_at: Option<DateTime<FixedOffset>>,
        pub notes: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExpenseListQuery {
        pub month: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseView {
        pub id: Uuid,
        pub title: String,
        pub amount_minor: i64,
        pub category: String,
        pub occurred_at: DateTime<Utc>,
        pub notes: Option<String>,
        pub created_by: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseList {
        pub expenses: Vec<ExpenseView>,
    }

    /// Response of a create or update: the expense with the refreshed
    /// aggregates of its month.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseWriteResponse {
        pub expense: ExpenseView,
        pub total_spent_minor: i64,
        pub budget: Option<super::budget::BudgetView>,
        pub alert: super::report::AlertView,
    }
}

pub mod budget {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CategoryLimitView {
        pub category: String,
        pub limit_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetSet {
        pub month: String,
        pub limit_minor: i64,
        /// Team budgets only.
        #[serde(default)]
        pub category_limits: Vec<CategoryLimitView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetView {
        pub id: Uuid,
        pub month: String,
        pub limit_minor: i64,
        #[serde(default)]
        pub category_limits: Vec<CategoryLimitView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetStatusResponse {
        pub month: String,
        pub budget: Option<BudgetView>,
        pub total_spent_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetWriteResponse {
        pub budget: BudgetView,
        pub alert: super::report::AlertView,
    }
}

pub mod report {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryTotalView {
        pub category: String,
        pub total_minor: i64,
        pub count: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberTotalView {
        pub member: String,
        pub total_minor: i64,
        pub count: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MonthlySummaryView {
        pub month: String,
        pub total_spent_minor: i64,
        pub expense_count: i64,
        pub categories: Vec<CategoryTotalView>,
        /// Team summaries only.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub members: Option<Vec<MemberTotalView>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub limit_minor: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub remaining_minor: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryBreachView {
        pub category: String,
        pub spent_minor: i64,
        pub limit_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AlertView {
        pub month: String,
        pub total_spent_minor: i64,
        pub limit_minor: i64,
        pub breached: bool,
        #[serde(default)]
        pub category_breaches: Vec<CategoryBreachView>,
    }
}

pub mod team {
    use super::*;

    /// Role of a user in a team.
    ///
    /// - `manager`: full access, sets budgets, edits any expense.
    /// - `member`: records expenses and edits their own.
    /// - `viewer`: read-only.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TeamRole {
        Manager,
        Member,
        Viewer,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TeamView {
        pub id: Uuid,
        pub name: String,
        pub department: String,
        pub manager: String,
        /// Role of the caller.
        pub role: TeamRole,
    }
}
