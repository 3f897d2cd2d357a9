// Unit of Work - a two-phase operation

use crate::application::scope::TransactionScope;
use crate::domain::CollateralAction;
use crate::error::Result;
use async_trait::async_trait;

/// Composable operation with a store-mutation phase and a post-commit phase
///
/// `transaction` runs immediately inside the scope's metadata transaction. It
/// may read and write through `scope.store()` and run other units against the
/// same scope, but must not call any external system. The returned action,
/// if any, is the unit's side-effect phase: it is queued on the scope and
/// executed only after the transaction commits.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Stable name used in logs, reports and the collateral ledger
    fn name(&self) -> &'static str;

    async fn transaction(&self, scope: &mut TransactionScope) -> Result<Option<CollateralAction>>;
}
