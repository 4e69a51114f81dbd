//! Cached monthly reports and the post-write refresh protocol.

use crate::{Alert, Budget, CacheKind, MonthKey, MonthlySummary, ResultEngine, Scope, alert};

use super::Engine;

impl Engine {
    /// Monthly category breakdown of `scope`, served from the cache when
    /// possible.
    pub async fn monthly_summary(
        &self,
        scope: &Scope,
        month: MonthKey,
        actor: &str,
    ) -> ResultEngine<MonthlySummary> {
        self.require_read(&self.database, scope, actor).await?;
        let key = scope.cache_key(CacheKind::Report, month);
        self.cache
            .get_or_compute(&key, self.cache.ttl().report, || {
                self.compute_summary(scope, month)
            })
            .await
    }

    /// Budget alert of `scope` for `month`, served from the cache when
    /// possible.
    pub async fn budget_alert(
        &self,
        scope: &Scope,
        month: MonthKey,
        actor: &str,
    ) -> ResultEngine<Alert> {
        self.require_read(&self.database, scope, actor).await?;
        let key = scope.cache_key(CacheKind::Alert, month);
        self.cache
            .get_or_compute(&key, self.cache.ttl().alert, || async {
                self.compute_alert(scope, month).await.map(|(alert, _)| alert)
            })
            .await
    }

    /// Drops the cached aggregates of `(scope, month)` without recomputing.
    pub async fn invalidate_month_cache(&self, scope: &Scope, month: MonthKey) {
        self.cache.invalidate(scope, month).await;
    }

    /// Invalidates the month's cache entries, recomputes the alert from the
    /// ledger and caches it again.
    ///
    /// Must run after the ledger write has been committed. The alert is
    /// cached whether or not it is breached, so the next read is a hit.
    pub(super) async fn refresh_month(
        &self,
        scope: &Scope,
        month: MonthKey,
    ) -> ResultEngine<(Alert, Option<Budget>)> {
        self.cache.invalidate(scope, month).await;

        let (alert, budget) = self.compute_alert(scope, month).await?;
        let key = scope.cache_key(CacheKind::Alert, month);
        self.cache
            .set_and_cache(&key, &alert, self.cache.ttl().alert)
            .await;

        tracing::debug!(
            scope = %scope,
            month = %month,
            total_spent = %alert.total_spent,
            breached = alert.breached,
            "alert refreshed"
        );
        Ok((alert, budget))
    }

    async fn compute_summary(&self, scope: &Scope, month: MonthKey) -> ResultEngine<MonthlySummary> {
        let mut summary = self.ledger.monthly_summary(scope, month).await?;
        if scope.is_team() {
            let budget = self.find_budget(&self.database, scope, month).await?;
            summary.limit = Some(budget.as_ref().map(|b| b.limit).unwrap_or_default());
            summary.remaining = budget.map(|b| b.limit - summary.total_spent);
        }
        Ok(summary)
    }

    /// Computes the alert straight from the ledger. A missing budget counts
    /// as a limit of zero.
    async fn compute_alert(
        &self,
        scope: &Scope,
        month: MonthKey,
    ) -> ResultEngine<(Alert, Option<Budget>)> {
        let total_spent = self.ledger.monthly_total(scope, month).await?;
        let budget = self.find_budget(&self.database, scope, month).await?;
        let limit = budget.as_ref().map(|b| b.limit).unwrap_or_default();

        let mut alert = alert::evaluate(month, total_spent, limit);
        if let Some(budget) = &budget
            && !budget.category_limits.is_empty()
        {
            let totals = self.ledger.category_totals(scope, month).await?;
            alert.category_breaches = alert::category_breaches(&totals, &budget.category_limits);
        }
        Ok((alert, budget))
    }
}
