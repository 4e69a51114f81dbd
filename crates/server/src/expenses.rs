//! Expense API endpoints

use api_types::expense::{
    ExpenseList, ExpenseListQuery, ExpenseNew, ExpenseUpdate, ExpenseView, ExpenseWriteResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{Expense, ExpensePatch, ExpenseWrite, MoneyCents, MonthKey, NewExpense, Scope};
use uuid::Uuid;

use crate::{
    ServerError, budgets::budget_view, reports::alert_view, server::ServerState,
    user::CurrentUser,
};

fn expense_view(expense: Expense) -> ExpenseView {
    ExpenseView {
        id: expense.id,
        title: expense.title,
        amount_minor: expense.amount.cents(),
        category: expense.category,
        occurred_at: expense.occurred_at,
        notes: expense.notes,
        created_by: expense.created_by,
    }
}

fn write_response(written: ExpenseWrite) -> ExpenseWriteResponse {
    ExpenseWriteResponse {
        expense: expense_view(written.expense),
        total_spent_minor: written.total_spent.cents(),
        budget: written.budget.map(budget_view),
        alert: alert_view(written.alert),
    }
}

async fn list_in(
    state: &ServerState,
    scope: Scope,
    user: &CurrentUser,
    query: ExpenseListQuery,
) -> Result<Json<ExpenseList>, ServerError> {
    let month = query
        .month
        .as_deref()
        .map(str::parse::<MonthKey>)
        .transpose()?;
    let expenses = state
        .engine
        .list_expenses(&scope, &user.username, month)
        .await?;
    Ok(Json(ExpenseList {
        expenses: expenses.into_iter().map(expense_view).collect(),
    }))
}

async fn create_in(
    state: &ServerState,
    scope: Scope,
    user: &CurrentUser,
    payload: ExpenseNew,
) -> Result<(StatusCode, Json<ExpenseWriteResponse>), ServerError> {
    let new = NewExpense {
        title: payload.title,
        amount: MoneyCents::new(payload.amount_minor),
        category: payload.category,
        occurred_at: payload.occurred_at.with_timezone(&Utc),
        notes: payload.notes,
    };
    let written = state
        .engine
        .create_expense(&scope, &user.username, new)
        .await?;
    Ok((StatusCode::CREATED, Json(write_response(written))))
}

async fn update_in(
    state: &ServerState,
    scope: Scope,
    user: &CurrentUser,
    id: Uuid,
    payload: ExpenseUpdate,
) -> Result<Json<ExpenseWriteResponse>, ServerError> {
    if payload.title.is_none()
        && payload.amount_minor.is_none()
        && payload.category.is_none()
        && payload.occurred_at.is_none()
        && payload.notes.is_none()
    {
        return Err(ServerError::Generic("nothing to update".to_string()));
    }

    let patch = ExpensePatch {
        title: payload.title,
        amount: payload.amount_minor.map(MoneyCents::new),
        category: payload.category,
        occurred_at: payload.occurred_at.map(|dt| dt.with_timezone(&Utc)),
        notes: payload.notes,
    };
    let written = state
        .engine
        .update_expense(&scope, &user.username, id, patch)
        .await?;
    Ok(Json(write_response(written)))
}

async fn remove_in(
    state: &ServerState,
    scope: Scope,
    user: &CurrentUser,
    id: Uuid,
) -> Result<Json<api_types::report::AlertView>, ServerError> {
    let alert = state
        .engine
        .delete_expense(&scope, &user.username, id)
        .await?;
    Ok(Json(alert_view(alert)))
}

/// List the caller's expenses, newest first
pub async fn list(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Query(query): Query<ExpenseListQuery>,
) -> Result<Json<ExpenseList>, ServerError> {
    list_in(&state, user.scope(), &user, query).await
}

pub async fn create(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<ExpenseWriteResponse>), ServerError> {
    create_in(&state, user.scope(), &user, payload).await
}

pub async fn update(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ExpenseUpdate>,
) -> Result<Json<ExpenseWriteResponse>, ServerError> {
    update_in(&state, user.scope(), &user, id, payload).await
}

pub async fn remove(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<api_types::report::AlertView>, ServerError> {
    remove_in(&state, user.scope(), &user, id).await
}

pub async fn team_list(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Path(team_id): Path<Uuid>,
    Query(query): Query<ExpenseListQuery>,
) -> Result<Json<ExpenseList>, ServerError> {
    list_in(&state, Scope::Team(team_id), &user, query).await
}

/// Record a team expense (manager or member)
pub async fn team_create(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Path(team_id): Path<Uuid>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<ExpenseWriteResponse>), ServerError> {
    create_in(&state, Scope::Team(team_id), &user, payload).await
}

pub async fn team_update(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Path((team_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ExpenseUpdate>,
) -> Result<Json<ExpenseWriteResponse>, ServerError> {
    update_in(&state, Scope::Team(team_id), &user, id, payload).await
}

pub async fn team_remove(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Path((team_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<api_types::report::AlertView>, ServerError> {
    remove_in(&state, Scope::Team(team_id), &user, id).await
}
