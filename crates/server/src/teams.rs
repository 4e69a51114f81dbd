//! Team API endpoints

use api_types::team::{TeamRole as ApiRole, TeamView};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use engine::{EngineError, TeamRole};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user::CurrentUser};

fn map_role(role: TeamRole) -> ApiRole {
    match role {
        TeamRole::Manager => ApiRole::Manager,
        TeamRole::Member => ApiRole::Member,
        TeamRole::Viewer => ApiRole::Viewer,
    }
}

/// The team with the caller's role in it
pub async fn get(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Path(team_id): Path<Uuid>,
) -> Result<Json<TeamView>, ServerError> {
    let team = state.engine.team(team_id, &user.username).await?;
    let role = state
        .engine
        .role_in_team(team_id, &user.username)
        .await?
        .ok_or_else(|| EngineError::Forbidden("access denied".to_string()))?;

    Ok(Json(TeamView {
        id: team.id,
        name: team.name,
        department: team.department,
        manager: team.manager,
        role: map_role(role),
    }))
}
