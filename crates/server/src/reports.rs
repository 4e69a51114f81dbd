//! Monthly summary and budget alert endpoints

use api_types::{
    MonthQuery,
    report::{AlertView, CategoryBreachView, CategoryTotalView, MemberTotalView, MonthlySummaryView},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use engine::{Alert, MonthKey, MonthlySummary, Scope};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user::CurrentUser};

pub(crate) fn alert_view(alert: Alert) -> AlertView {
    AlertView {
        month: alert.month.to_string(),
        total_spent_minor: alert.total_spent.cents(),
        limit_minor: alert.limit.cents(),
        breached: alert.breached,
        category_breaches: alert
            .category_breaches
            .into_iter()
            .map(|b| CategoryBreachView {
                category: b.category,
                spent_minor: b.spent.cents(),
                limit_minor: b.limit.cents(),
            })
            .collect(),
    }
}

fn summary_view(summary: MonthlySummary) -> MonthlySummaryView {
    MonthlySummaryView {
        month: summary.month.to_string(),
        total_spent_minor: summary.total_spent.cents(),
        expense_count: summary.expense_count,
        categories: summary
            .categories
            .into_iter()
            .map(|c| CategoryTotalView {
                category: c.category,
                total_minor: c.total.cents(),
                count: c.count,
            })
            .collect(),
        members: summary.members.map(|members| {
            members
                .into_iter()
                .map(|m| MemberTotalView {
                    member: m.member,
                    total_minor: m.total.cents(),
                    count: m.count,
                })
                .collect()
        }),
        limit_minor: summary.limit.map(|l| l.cents()),
        remaining_minor: summary.remaining.map(|r| r.cents()),
    }
}

async fn summary_in(
    state: &ServerState,
    scope: Scope,
    user: &CurrentUser,
    query: MonthQuery,
) -> Result<Json<MonthlySummaryView>, ServerError> {
    let month: MonthKey = query.month.parse()?;
    let summary = state
        .engine
        .monthly_summary(&scope, month, &user.username)
        .await?;
    Ok(Json(summary_view(summary)))
}

async fn alert_in(
    state: &ServerState,
    scope: Scope,
    user: &CurrentUser,
    query: MonthQuery,
) -> Result<Json<AlertView>, ServerError> {
    let month: MonthKey = query.month.parse()?;
    let alert = state
        .engine
        .budget_alert(&scope, month, &user.username)
        .await?;
    Ok(Json(alert_view(alert)))
}

/// Category breakdown of the caller's month
pub async fn monthly(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<MonthlySummaryView>, ServerError> {
    summary_in(&state, user.scope(), &user, query).await
}

/// Budget alert of the caller's month
pub async fn alert(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<AlertView>, ServerError> {
    alert_in(&state, user.scope(), &user, query).await
}

/// Category and member breakdown of a team month
pub async fn team_monthly(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Path(team_id): Path<Uuid>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<MonthlySummaryView>, ServerError> {
    summary_in(&state, Scope::Team(team_id), &user, query).await
}

/// Budget alert of a team month, with category breaches
pub async fn team_alert(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Path(team_id): Path<Uuid>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<AlertView>, ServerError> {
    alert_in(&state, Scope::Team(team_id), &user, query).await
}
