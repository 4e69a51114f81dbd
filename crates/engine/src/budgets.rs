//! Monthly budgets. One budget per `(scope, month)`; the uniqueness is
//! enforced by a unique index on the table.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents, MonthKey, ResultEngine, Scope, budget_category_limits,
    util::{normalize_required_text, parse_uuid},
};

/// A spending sub-limit for a single category (team budgets only).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryLimit {
    pub category: String,
    pub limit: MoneyCents,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub scope: Scope,
    pub month: MonthKey,
    pub limit: MoneyCents,
    pub category_limits: Vec<CategoryLimit>,
}

/// Validates the sub-limits accepted for `scope`.
///
/// Personal budgets carry no sub-limits; team sub-limits must be
/// non-negative and name each category once.
pub(crate) fn validate_category_limits(
    scope: &Scope,
    limits: Vec<CategoryLimit>,
) -> ResultEngine<Vec<CategoryLimit>> {
    if !scope.is_team() && !limits.is_empty() {
        return Err(EngineError::InvalidInput(
            "category limits are only supported for team budgets".to_string(),
        ));
    }

    let mut normalized: Vec<CategoryLimit> = Vec::with_capacity(limits.len());
    for entry in limits {
        let category = normalize_required_text(&entry.category, "category")?;
        if normalized.iter().any(|c| c.category == category) {
            return Err(EngineError::InvalidInput(format!(
                "duplicate category limit: {category}"
            )));
        }
        normalized.push(CategoryLimit {
            category,
            limit: entry.limit.bounded("category limit")?,
        });
    }
    Ok(normalized)
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub scope_kind: String,
    pub scope_id: String,
    pub month: String,
    pub limit_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::budget_category_limits::Entity")]
    CategoryLimits,
}

impl Related<super::budget_category_limits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CategoryLimits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Budget> for ActiveModel {
    fn from(budget: &Budget) -> Self {
        Self {
            id: ActiveValue::Set(budget.id.to_string()),
            scope_kind: ActiveValue::Set(budget.scope.kind().to_string()),
            scope_id: ActiveValue::Set(budget.scope.id()),
            month: ActiveValue::Set(budget.month.to_string()),
            limit_minor: ActiveValue::Set(budget.limit.cents()),
        }
    }
}

impl TryFrom<(Model, Vec<budget_category_limits::Model>)> for Budget {
    type Error = EngineError;

    fn try_from(
        (model, limits): (Model, Vec<budget_category_limits::Model>),
    ) -> Result<Self, Self::Error> {
        let mut category_limits: Vec<CategoryLimit> = limits
            .into_iter()
            .map(|row| CategoryLimit {
                category: row.category,
                limit: MoneyCents::new(row.limit_minor),
            })
            .collect();
        category_limits.sort_by(|a, b| a.category.cmp(&b.category));

        Ok(Self {
            id: parse_uuid(&model.id, "budget")?,
            scope: Scope::from_parts(&model.scope_kind, &model.scope_id)?,
            month: model.month.parse()?,
            limit: MoneyCents::new(model.limit_minor),
            category_limits,
        })
    }
}
