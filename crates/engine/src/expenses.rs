//! Expense records: the mutable ledger every aggregate is computed from.
//!
//! An `Expense` belongs to exactly one [`Scope`] and, through `occurred_at`,
//! to exactly one [`MonthKey`].

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents, MonthKey, ResultEngine, Scope,
    util::{normalize_optional_text, normalize_required_text, parse_uuid, truncate_to_millis},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub scope: Scope,
    pub title: String,
    pub amount: MoneyCents,
    pub category: String,
    pub occurred_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_by: String,
}

impl Expense {
    /// Validates and normalizes a new expense.
    pub fn new(
        scope: Scope,
        title: &str,
        amount: MoneyCents,
        category: &str,
        occurred_at: DateTime<Utc>,
        notes: Option<&str>,
        created_by: &str,
    ) -> ResultEngine<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            scope,
            title: normalize_required_text(title, "title")?,
            amount: amount.bounded("amount")?,
            category: normalize_required_text(category, "category")?,
            occurred_at: truncate_to_millis(occurred_at)?,
            notes: normalize_optional_text(notes),
            created_by: created_by.to_string(),
        })
    }

    /// The month this expense is aggregated into.
    pub fn month(&self) -> ResultEngine<MonthKey> {
        MonthKey::of(self.occurred_at)
    }

    /// Applies a validated patch; fields left as `None` keep their value.
    pub fn apply(&mut self, patch: ValidPatch) {
        let ValidPatch(patch) = patch;
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(occurred_at) = patch.occurred_at {
            self.occurred_at = occurred_at;
        }
        if let Some(notes) = patch.notes {
            self.notes = Some(notes).filter(|n| !n.is_empty());
        }
    }
}

/// Fields accepted by an expense update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpensePatch {
    pub title: Option<String>,
    pub amount: Option<MoneyCents>,
    pub category: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// An [`ExpensePatch`] whose fields passed validation and normalization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidPatch(ExpensePatch);

impl ExpensePatch {
    /// Validates and normalizes the provided fields, touching no storage.
    pub fn validate(self) -> ResultEngine<ValidPatch> {
        Ok(ValidPatch(ExpensePatch {
            title: self
                .title
                .map(|t| normalize_required_text(&t, "title"))
                .transpose()?,
            amount: self.amount.map(|a| a.bounded("amount")).transpose()?,
            category: self
                .category
                .map(|c| normalize_required_text(&c, "category"))
                .transpose()?,
            occurred_at: self.occurred_at.map(truncate_to_millis).transpose()?,
            notes: self
                .notes
                .map(|n| normalize_optional_text(Some(&n)).unwrap_or_default()),
        }))
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub scope_kind: String,
    pub scope_id: String,
    pub title: String,
    pub amount_minor: i64,
    pub category: String,
    pub occurred_at: DateTimeUtc,
    pub notes: Option<String>,
    pub created_by: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id.to_string()),
            scope_kind: ActiveValue::Set(expense.scope.kind().to_string()),
            scope_id: ActiveValue::Set(expense.scope.id()),
            title: ActiveValue::Set(expense.title.clone()),
            amount_minor: ActiveValue::Set(expense.amount.cents()),
            category: ActiveValue::Set(expense.category.clone()),
            occurred_at: ActiveValue::Set(expense.occurred_at),
            notes: ActiveValue::Set(expense.notes.clone()),
            created_by: ActiveValue::Set(expense.created_by.clone()),
        }
    }
}

impl TryFrom<Model> for Expense {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "expense")?,
            scope: Scope::from_parts(&model.scope_kind, &model.scope_id)?,
            title: model.title,
            amount: MoneyCents::new(model.amount_minor),
            category: model.category,
            occurred_at: model.occurred_at,
            notes: model.notes,
            created_by: model.created_by,
        })
    }
}

/// Filter matching every expense of `scope`.
pub(crate) fn scope_condition(scope: &Scope) -> sea_orm::Condition {
    sea_orm::Condition::all()
        .add(Column::ScopeKind.eq(scope.kind()))
        .add(Column::ScopeId.eq(scope.id()))
}

/// Filter matching every expense of `scope` dated within `month` (inclusive
/// bounds, UTC).
pub(crate) fn month_condition(scope: &Scope, month: MonthKey) -> sea_orm::Condition {
    let (start, end) = month.bounds();
    scope_condition(scope).add(Column::OccurredAt.between(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn lunch() -> Expense {
        Expense::new(
            Scope::User("alice".to_string()),
            " Lunch ",
            MoneyCents::new(1250),
            "Food",
            at("2024-06-10T12:00:00Z"),
            Some(""),
            "alice",
        )
        .unwrap()
    }

    #[test]
    fn new_normalizes_fields() {
        let expense = lunch();
        assert_eq!(expense.title, "Lunch");
        assert_eq!(expense.notes, None);
        assert_eq!(expense.month().unwrap().to_string(), "2024-06");
    }

    #[test]
    fn new_rejects_negative_amounts_and_blank_category() {
        let scope = Scope::User("alice".to_string());
        let when = at("2024-06-10T12:00:00Z");
        assert!(matches!(
            Expense::new(scope.clone(), "x", MoneyCents::new(-1), "Food", when, None, "alice"),
            Err(EngineError::InvalidAmount(_))
        ));
        assert!(matches!(
            Expense::new(scope, "x", MoneyCents::new(1), " ", when, None, "alice"),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn apply_only_touches_provided_fields() {
        let mut expense = lunch();
        let patch = ExpensePatch {
            amount: Some(MoneyCents::new(900)),
            occurred_at: Some(at("2024-07-01T00:00:00Z")),
            ..Default::default()
        };
        expense.apply(patch.validate().unwrap());
        assert_eq!(expense.amount, MoneyCents::new(900));
        assert_eq!(expense.category, "Food");
        assert_eq!(expense.month().unwrap().to_string(), "2024-07");
    }

    #[test]
    fn validate_rejects_bad_fields_and_normalizes_the_rest() {
        let negative = ExpensePatch {
            amount: Some(MoneyCents::new(-5)),
            ..Default::default()
        };
        assert!(matches!(negative.validate(), Err(EngineError::InvalidAmount(_))));

        let blank = ExpensePatch {
            category: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(matches!(blank.validate(), Err(EngineError::InvalidInput(_))));

        let mut expense = lunch();
        let patch = ExpensePatch {
            title: Some("  Dinner ".to_string()),
            notes: Some(" ".to_string()),
            ..Default::default()
        };
        expense.apply(patch.validate().unwrap());
        assert_eq!(expense.title, "Dinner");
        assert_eq!(expense.notes, None);
    }

    #[test]
    fn model_round_trip_keeps_scope() {
        let expense = lunch();
        let model = Model {
            id: expense.id.to_string(),
            scope_kind: "user".to_string(),
            scope_id: "alice".to_string(),
            title: expense.title.clone(),
            amount_minor: expense.amount.cents(),
            category: expense.category.clone(),
            occurred_at: expense.occurred_at,
            notes: None,
            created_by: "alice".to_string(),
        };
        assert_eq!(Expense::try_from(model).unwrap(), expense);
    }
}
