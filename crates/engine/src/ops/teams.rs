use sea_orm::{ActiveValue, QueryFilter, prelude::*, sea_query::OnConflict};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, Scope, Team, TeamRole, team_members, teams, users,
    util::normalize_required_text,
};

use super::Engine;

impl Engine {
    /// Registers a user. Usernames are unique.
    pub async fn create_user(&self, username: &str, password: &str) -> ResultEngine<()> {
        let username = normalize_required_text(username, "username")?;
        if password.is_empty() {
            return Err(EngineError::InvalidInput(
                "password must not be empty".to_string(),
            ));
        }
        if users::Entity::find_by_id(username.clone())
            .one(&self.database)
            .await?
            .is_some()
        {
            return Err(EngineError::ExistingKey(username));
        }

        users::ActiveModel {
            username: ActiveValue::Set(username.clone()),
            password: ActiveValue::Set(password.to_string()),
        }
        .insert(&self.database)
        .await?;
        tracing::info!(username = %username, "user created");
        Ok(())
    }

    /// Returns `true` when the credentials match a registered user.
    pub async fn authenticate(&self, username: &str, password: &str) -> ResultEngine<bool> {
        if username.is_empty() || password.is_empty() {
            return Ok(false);
        }
        let found = users::Entity::find_by_id(username.to_string())
            .filter(users::Column::Password.eq(password))
            .one(&self.database)
            .await?;
        Ok(found.is_some())
    }

    /// Creates a team managed by `manager`, who must be a registered user.
    pub async fn new_team(&self, name: &str, department: &str, manager: &str) -> ResultEngine<Team> {
        let team = Team {
            id: Uuid::new_v4(),
            name: normalize_required_text(name, "name")?,
            department: normalize_required_text(department, "department")?,
            manager: manager.to_string(),
        };
        self.require_user_exists(&self.database, manager).await?;

        teams::ActiveModel {
            id: ActiveValue::Set(team.id.to_string()),
            name: ActiveValue::Set(team.name.clone()),
            department: ActiveValue::Set(team.department.clone()),
            manager_id: ActiveValue::Set(team.manager.clone()),
        }
        .insert(&self.database)
        .await?;
        tracing::info!(team_id = %team.id, manager, "team created");
        Ok(team)
    }

    /// Adds `username` to the team with `role`, or changes the role of an
    /// existing member. The manager is fixed on the team itself.
    pub async fn upsert_team_member(
        &self,
        team_id: Uuid,
        username: &str,
        role: TeamRole,
    ) -> ResultEngine<()> {
        if role == TeamRole::Manager {
            return Err(EngineError::InvalidRole(
                "the manager is set when the team is created".to_string(),
            ));
        }
        let team = self.find_team(team_id).await?;
        if team.manager == username {
            return Err(EngineError::InvalidInput(
                "the manager is already part of the team".to_string(),
            ));
        }
        self.require_user_exists(&self.database, username).await?;

        team_members::Entity::insert(team_members::ActiveModel {
            team_id: ActiveValue::Set(team_id.to_string()),
            user_id: ActiveValue::Set(username.to_string()),
            role: ActiveValue::Set(role.as_str().to_string()),
        })
        .on_conflict(
            OnConflict::columns([team_members::Column::TeamId, team_members::Column::UserId])
                .update_column(team_members::Column::Role)
                .to_owned(),
        )
        .exec(&self.database)
        .await?;
        tracing::info!(team_id = %team_id, username, role = %role, "team member set");
        Ok(())
    }

    /// The team, visible to its manager and members.
    pub async fn team(&self, team_id: Uuid, actor: &str) -> ResultEngine<Team> {
        self.require_read(&self.database, &Scope::Team(team_id), actor)
            .await?;
        self.find_team(team_id).await
    }

    /// Role of `actor` in the team, if any.
    pub async fn role_in_team(&self, team_id: Uuid, actor: &str) -> ResultEngine<Option<TeamRole>> {
        self.team_role(&self.database, team_id, actor).await
    }

    async fn find_team(&self, team_id: Uuid) -> ResultEngine<Team> {
        let model = teams::Entity::find_by_id(team_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("team not exists".to_string()))?;
        Team::try_from(model)
    }
}
