//! Raw query suite - backend-native query passthrough
//!
//! Saves two products, lists them with a plain and a parameterized native
//! query, and checks both result sets against the canonical pattern. Only
//! meaningful for backends that report `supports_raw_queries()`.

use crate::harness::fixture::require;
use crate::harness::{StepContext, StepResult, Suite};
use crate::storage::{matches_pattern, Entity, Namespace, Query, Selector};
use crate::{check, check_eq};

pub const SUITE_NAME: &str = "raw_query";

/// Both products in price order; ids vary per run.
pub const PRODUCTS_PATTERN: &str =
    "$-/-/product:{id=*;name=apple;price=100},$-/-/product:{id=*;name=pear;price=200}";

const RAW: &str = "[Raw query tests]";

/// Carryover between raw query steps.
#[derive(Debug, Default)]
pub struct RawQueryFixture {
    products: Vec<Entity>,
    text_result: Option<String>,
}

pub fn suite() -> Suite<RawQueryFixture> {
    Suite::new(SUITE_NAME)
        .clears(product())
        .step(RAW, "setup", |ctx| Box::pin(save_products(ctx)))
        .step(RAW, "query_string", |ctx| Box::pin(query_text(ctx)))
        .step(RAW, "query_params", |ctx| Box::pin(query_params(ctx)))
        .step(RAW, "teardown", |ctx| Box::pin(remove_products(ctx)))
}

fn product() -> Namespace {
    Namespace::named("product")
}

/// Comma-joined canonical forms, the shape matched against the pattern.
#[must_use]
pub fn canonical_list(entities: &[Entity]) -> String {
    entities
        .iter()
        .map(Entity::to_canonical)
        .collect::<Vec<_>>()
        .join(",")
}

async fn save_products(ctx: &mut StepContext<RawQueryFixture>) -> StepResult {
    let template = Entity::make("product");
    for (name, price) in [("apple", 100), ("pear", 200)] {
        let saved = ctx
            .store
            .save(&template.fresh().with("name", name).with("price", price))
            .await?;
        ctx.fixture.products.push(saved);
    }
    Ok(())
}

async fn query_text(ctx: &mut StepContext<RawQueryFixture>) -> StepResult {
    let query = Query::raw(ctx.settings.raw_queries.text.clone());
    let products = ctx.store.list(&product(), &query).await?;

    let listed = canonical_list(&products);
    check!(
        matches_pattern(PRODUCTS_PATTERN, &listed),
        "raw query returned {listed}"
    );

    ctx.fixture.text_result = Some(listed);
    Ok(())
}

async fn query_params(ctx: &mut StepContext<RawQueryFixture>) -> StepResult {
    let raw = &ctx.settings.raw_queries;
    let query = Query::parameterized(raw.parameterized.clone(), raw.params.clone());
    let products = ctx.store.list(&product(), &query).await?;

    let listed = canonical_list(&products);
    check!(
        matches_pattern(PRODUCTS_PATTERN, &listed),
        "parameterized query returned {listed}"
    );

    let text_result = require(&ctx.fixture.text_result, "text_result")?;
    check_eq!(&listed, text_result, "both query forms return the same records");
    Ok(())
}

async fn remove_products(ctx: &mut StepContext<RawQueryFixture>) -> StepResult {
    for saved in ctx.fixture.products.drain(..) {
        if let Some(id) = saved.id() {
            ctx.store.remove(&product(), &Selector::by_id(id)).await?;
        }
    }

    let left = ctx.store.list(&product(), &Query::default()).await?;
    check_eq!(left.len(), 0);
    Ok(())
}
