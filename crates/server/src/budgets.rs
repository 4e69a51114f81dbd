//! Budget API endpoints

use api_types::{
    MonthQuery,
    budget::{BudgetSet, BudgetStatusResponse, BudgetView, BudgetWriteResponse, CategoryLimitView},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use engine::{Budget, CategoryLimit, MoneyCents, MonthKey, Scope};
use uuid::Uuid;

use crate::{ServerError, reports::alert_view, server::ServerState, user::CurrentUser};

pub(crate) fn budget_view(budget: Budget) -> BudgetView {
    BudgetView {
        id: budget.id,
        month: budget.month.to_string(),
        limit_minor: budget.limit.cents(),
        category_limits: budget
            .category_limits
            .into_iter()
            .map(|c| CategoryLimitView {
                category: c.category,
                limit_minor: c.limit.cents(),
            })
            .collect(),
    }
}

async fn set_in(
    state: &ServerState,
    scope: Scope,
    user: &CurrentUser,
    payload: BudgetSet,
) -> Result<Json<BudgetWriteResponse>, ServerError> {
    let month: MonthKey = payload.month.parse()?;
    let category_limits = payload
        .category_limits
        .into_iter()
        .map(|c| CategoryLimit {
            category: c.category,
            limit: MoneyCents::new(c.limit_minor),
        })
        .collect();

    let written = state
        .engine
        .set_budget(
            &scope,
            month,
            MoneyCents::new(payload.limit_minor),
            category_limits,
            &user.username,
        )
        .await?;

    Ok(Json(BudgetWriteResponse {
        budget: budget_view(written.budget),
        alert: alert_view(written.alert),
    }))
}

async fn get_in(
    state: &ServerState,
    scope: Scope,
    user: &CurrentUser,
    query: MonthQuery,
) -> Result<Json<BudgetStatusResponse>, ServerError> {
    let month: MonthKey = query.month.parse()?;
    let status = state.engine.budget(&scope, month, &user.username).await?;
    Ok(Json(BudgetStatusResponse {
        month: status.month.to_string(),
        budget: status.budget.map(budget_view),
        total_spent_minor: status.total_spent.cents(),
    }))
}

/// Set the caller's budget for a month
pub async fn set(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Json(payload): Json<BudgetSet>,
) -> Result<Json<BudgetWriteResponse>, ServerError> {
    set_in(&state, user.scope(), &user, payload).await
}

pub async fn get(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<BudgetStatusResponse>, ServerError> {
    get_in(&state, user.scope(), &user, query).await
}

/// Set a team budget (manager only)
pub async fn team_set(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Path(team_id): Path<Uuid>,
    Json(payload): Json<BudgetSet>,
) -> Result<Json<BudgetWriteResponse>, ServerError> {
    set_in(&state, Scope::Team(team_id), &user, payload).await
}

pub async fn team_get(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Path(team_id): Path<Uuid>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<BudgetStatusResponse>, ServerError> {
    get_in(&state, Scope::Team(team_id), &user, query).await
}
