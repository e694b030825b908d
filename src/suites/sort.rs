//! Sort suite - `sort$` ascending and descending

use crate::check_eq;
use crate::harness::{StepContext, StepResult, Suite};
use crate::storage::{Entity, Namespace, Selector, SortOrder};

use super::p1_values;

pub const SUITE_NAME: &str = "sort";

const SORT: &str = "[Sort tests]";

pub fn suite() -> Suite<()> {
    Suite::new(SUITE_NAME)
        .clears(Namespace::named("foo"))
        .step(SORT, "insert1st", |ctx| Box::pin(insert(ctx, "v2")))
        .step(SORT, "insert2nd", |ctx| Box::pin(insert(ctx, "v1")))
        .step(SORT, "insert3rd", |ctx| Box::pin(insert(ctx, "v3")))
        .step(SORT, "listasc", |ctx| {
            Box::pin(list_sorted(ctx, SortOrder::Ascending, ["v1", "v2", "v3"]))
        })
        .step(SORT, "listdesc", |ctx| {
            Box::pin(list_sorted(ctx, SortOrder::Descending, ["v3", "v2", "v1"]))
        })
}

async fn insert(ctx: &mut StepContext<()>, value: &'static str) -> StepResult {
    ctx.store
        .save(&Entity::make("foo").with("p1", value).with("p2", value))
        .await?;
    Ok(())
}

async fn list_sorted(
    ctx: &mut StepContext<()>,
    order: SortOrder,
    expected: [&'static str; 3],
) -> StepResult {
    let selector = Selector::new().with_sort("p1", order);
    let foos = ctx
        .store
        .list(&Namespace::named("foo"), &selector.into())
        .await?;
    check_eq!(p1_values(&foos), expected.to_vec(), "{order:?} by p1");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::SuiteSettings;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_memory_store_sorts() {
        let report = suite()
            .run(Arc::new(MemoryStore::new()), SuiteSettings::default())
            .await;
        assert!(report.passed(), "{:?}", report.failure);
        assert_eq!(report.steps.len(), 6);
    }
}
