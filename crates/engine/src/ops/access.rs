use sea_orm::{ConnectionTrait, prelude::*};
use uuid::Uuid;

use crate::{EngineError, Expense, ResultEngine, Scope, TeamRole, team_members, teams, users};

use super::Engine;

fn forbidden(reason: &str) -> EngineError {
    EngineError::Forbidden(reason.to_string())
}

impl Engine {
    /// Role of `user_id` in the team: the team's manager, a member row, or
    /// nothing.
    pub(super) async fn team_role<C: ConnectionTrait>(
        &self,
        db: &C,
        team_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Option<TeamRole>> {
        let team = teams::Entity::find_by_id(team_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("team not exists".to_string()))?;
        if team.manager_id == user_id {
            return Ok(Some(TeamRole::Manager));
        }

        let row = team_members::Entity::find_by_id((team_id.to_string(), user_id.to_string()))
            .one(db)
            .await?;
        row.as_ref()
            .map(|m| TeamRole::try_from(m.role.as_str()))
            .transpose()
    }

    async fn require_team_role<C: ConnectionTrait>(
        &self,
        db: &C,
        team_id: Uuid,
        actor: &str,
    ) -> ResultEngine<TeamRole> {
        self.team_role(db, team_id, actor)
            .await?
            .ok_or_else(|| forbidden("access denied"))
    }

    /// Reading a scope: its owner, or any member of the team.
    pub(super) async fn require_read<C: ConnectionTrait>(
        &self,
        db: &C,
        scope: &Scope,
        actor: &str,
    ) -> ResultEngine<()> {
        match scope {
            Scope::User(owner) if owner == actor => Ok(()),
            Scope::User(_) => Err(forbidden("access denied")),
            Scope::Team(team_id) => self.require_team_role(db, *team_id, actor).await.map(|_| ()),
        }
    }

    /// Recording an expense: the owner, or a team member that is not a viewer.
    pub(super) async fn require_record<C: ConnectionTrait>(
        &self,
        db: &C,
        scope: &Scope,
        actor: &str,
    ) -> ResultEngine<()> {
        match scope {
            Scope::User(owner) if owner == actor => Ok(()),
            Scope::User(_) => Err(forbidden("access denied")),
            Scope::Team(team_id) => {
                let role = self.require_team_role(db, *team_id, actor).await?;
                if !role.can_record() {
                    return Err(forbidden("viewers cannot create expenses"));
                }
                Ok(())
            }
        }
    }

    /// Editing or deleting an expense: the owner, or in a team the creator
    /// of the expense or the manager.
    pub(super) async fn require_edit<C: ConnectionTrait>(
        &self,
        db: &C,
        expense: &Expense,
        actor: &str,
    ) -> ResultEngine<()> {
        match &expense.scope {
            Scope::User(owner) if owner == actor => Ok(()),
            Scope::User(_) => Err(forbidden("access denied")),
            Scope::Team(team_id) => {
                let role = self.require_team_role(db, *team_id, actor).await?;
                if expense.created_by == actor || role == TeamRole::Manager {
                    return Ok(());
                }
                Err(forbidden("only the creator or the manager can change this expense"))
            }
        }
    }

    /// Setting a budget: the owner, or the team manager.
    pub(super) async fn require_budget_admin<C: ConnectionTrait>(
        &self,
        db: &C,
        scope: &Scope,
        actor: &str,
    ) -> ResultEngine<()> {
        match scope {
            Scope::User(owner) if owner == actor => Ok(()),
            Scope::User(_) => Err(forbidden("access denied")),
            Scope::Team(team_id) => {
                let role = self.require_team_role(db, *team_id, actor).await?;
                if role != TeamRole::Manager {
                    return Err(forbidden("only the team manager can set the budget"));
                }
                Ok(())
            }
        }
    }

    pub(super) async fn require_user_exists<C: ConnectionTrait>(
        &self,
        db: &C,
        username: &str,
    ) -> ResultEngine<()> {
        let exists = users::Entity::find_by_id(username.to_string())
            .one(db)
            .await?
            .is_some();
        if !exists {
            return Err(EngineError::KeyNotFound("user not exists".to_string()));
        }
        Ok(())
    }
}
