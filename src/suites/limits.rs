//! Limits suite - `skip$` and `limit$` composed with `sort$`
//!
//! Sorting applies first, then `skip$`, then `limit$`.

use crate::check_eq;
use crate::harness::{StepContext, StepResult, Suite};
use crate::storage::{Entity, Namespace, Query, Selector, SortOrder};

use super::p1_values;

pub const SUITE_NAME: &str = "limits";

const LIMITS: &str = "[Limits tests]";

pub fn suite() -> Suite<()> {
    Suite::new(SUITE_NAME)
        .clears(foo())
        .step(LIMITS, "insert1st", |ctx| Box::pin(insert(ctx, "v1")))
        .step(LIMITS, "insert2nd", |ctx| Box::pin(insert(ctx, "v2")))
        .step(LIMITS, "insert3rd", |ctx| Box::pin(insert(ctx, "v3")))
        .step(LIMITS, "listall", |ctx| Box::pin(list_all(ctx)))
        .step(LIMITS, "listlimit1skip1", |ctx| Box::pin(limit1_skip1(ctx)))
        .step(LIMITS, "listlimit2skip3", |ctx| Box::pin(limit2_skip3(ctx)))
        .step(LIMITS, "listlimit5skip2", |ctx| Box::pin(limit5_skip2(ctx)))
}

fn foo() -> Namespace {
    Namespace::named("foo")
}

fn by_p1() -> Selector {
    Selector::new().with_sort("p1", SortOrder::Ascending)
}

async fn insert(ctx: &mut StepContext<()>, value: &'static str) -> StepResult {
    ctx.store.save(&Entity::make("foo").with("p1", value)).await?;
    Ok(())
}

async fn list_all(ctx: &mut StepContext<()>) -> StepResult {
    let foos = ctx.store.list(&foo(), &Query::default()).await?;
    check_eq!(foos.len(), 3);
    Ok(())
}

async fn limit1_skip1(ctx: &mut StepContext<()>) -> StepResult {
    let selector = by_p1().with_limit(1).with_skip(1);
    let foos = ctx.store.list(&foo(), &selector.into()).await?;
    check_eq!(p1_values(&foos), vec!["v2"]);
    Ok(())
}

async fn limit2_skip3(ctx: &mut StepContext<()>) -> StepResult {
    let selector = Selector::new().with_limit(2).with_skip(3);
    let foos = ctx.store.list(&foo(), &selector.into()).await?;
    check_eq!(foos.len(), 0, "skip past the end yields nothing");
    Ok(())
}

async fn limit5_skip2(ctx: &mut StepContext<()>) -> StepResult {
    let selector = by_p1().with_limit(5).with_skip(2);
    let foos = ctx.store.list(&foo(), &selector.into()).await?;
    check_eq!(p1_values(&foos), vec!["v3"], "limit past the end yields the rest");
    Ok(())
}
