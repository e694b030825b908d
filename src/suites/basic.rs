//! Basic suite - CRUD, merge policy, field deletion, copy isolation
//!
//! Data set built up by the steps:
//!
//! ```text
//! -/-/foo       foo1 {p1, p2}   foo2 {p2}   {id = FIXED_ID}
//! zen/moon/bar  bar  {str, int, dec, bol, wen, arr, obj, mark}
//! ```

use std::time::{Duration, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::harness::fixture::{found, require, require_mut};
use crate::harness::{StepContext, StepResult, Suite};
use crate::storage::{Entity, LoadCriteria, Namespace, Query, Selector, Value};
use crate::{check, check_eq};

pub const SUITE_NAME: &str = "basic";

/// Id handed to `id$` in the explicit-id save
pub const FIXED_ID: &str = "0201775f-27c4-7428-b380-44b8f4c529f3";

/// 2020-02-01T00:00:00Z
const BAR_WEN_UNIX_SECONDS: u64 = 1_580_515_200;

const DATA: &str = "[Data tests]";
const SAVE: &str = "[Save tests]";
const LOAD: &str = "[Load tests]";
const FIELD: &str = "[Field tests]";
const REMOVE: &str = "[Remove tests]";

/// Carryover between basic steps.
#[derive(Debug, Default)]
pub struct BasicFixture {
    foo1: Option<Entity>,
    bar: Option<Entity>,
    mark: Option<f64>,
    foo2: Option<Entity>,
}

pub fn suite() -> Suite<BasicFixture> {
    Suite::new(SUITE_NAME)
        .clears(foo())
        .clears(bar_namespace())
        .step(DATA, "load0", |ctx| Box::pin(load_missing(ctx)))
        .step(DATA, "save1", |ctx| Box::pin(save_first(ctx)))
        .step(DATA, "load1", |ctx| Box::pin(load_first(ctx)))
        .step(DATA, "save2", |ctx| Box::pin(resave_first(ctx)))
        .step(DATA, "load2", |ctx| Box::pin(reload_first(ctx)))
        .step(SAVE, "save3", |ctx| Box::pin(save_bar(ctx)))
        .step(SAVE, "save4", |ctx| Box::pin(save_second_foo(ctx)))
        .step(SAVE, "save5", |ctx| Box::pin(save_with_id(ctx)))
        .step(LOAD, "query1", |ctx| Box::pin(list_bars(ctx)))
        .step(LOAD, "query2", |ctx| Box::pin(list_foos(ctx)))
        .step(LOAD, "query3", |ctx| Box::pin(list_by_id(ctx)))
        .step(LOAD, "query4", |ctx| Box::pin(list_by_mark(ctx)))
        .step(LOAD, "query5", |ctx| Box::pin(list_by_string(ctx)))
        .step(LOAD, "query6", |ctx| Box::pin(list_by_two_fields(ctx)))
        .step(LOAD, "query7", |ctx| Box::pin(list_by_structured_fields(ctx)))
        .step(LOAD, "load3", |ctx| Box::pin(load_by_selector(ctx)))
        .step(FIELD, "field1", |ctx| Box::pin(delete_field(ctx)))
        .step(FIELD, "field2", |ctx| Box::pin(copies_are_isolated(ctx)))
        .step(REMOVE, "remove1", |ctx| Box::pin(remove_all_foos(ctx)))
        .step(REMOVE, "remove_partial", |ctx| Box::pin(remove_by_partial_array(ctx)))
        .step(REMOVE, "remove2", |ctx| Box::pin(remove_bar_by_mark(ctx)))
}

fn foo() -> Namespace {
    Namespace::named("foo")
}

fn bar_namespace() -> Namespace {
    Namespace::qualified("zen", "moon", "bar")
}

fn bar_wen() -> DateTime<Utc> {
    DateTime::from(UNIX_EPOCH + Duration::from_secs(BAR_WEN_UNIX_SECONDS))
}

/// A `zen/moon/bar` entity with one field of every kind.
pub fn bar_template() -> Entity {
    Entity::from_json(json!({
        "name$": "bar",
        "base$": "moon",
        "zone$": "zen",
        "str": "aaa",
        "int": 11,
        "dec": 33.33,
        "bol": false,
        "arr": [2, 3],
        "obj": {"a": 1, "b": [2], "c": {"d": 3}}
    }))
    .with("wen", bar_wen())
}

/// Check every template field survived storage. Dates may come back as
/// RFC 3339 text.
fn bar_verify(bar: &Entity) -> StepResult {
    check_eq!(bar.get("str"), Some(&Value::from("aaa")));
    check_eq!(bar.get("int"), Some(&Value::from(11)));
    check_eq!(bar.get("dec"), Some(&Value::from(33.33)));
    check_eq!(bar.get("bol"), Some(&Value::from(false)));

    let wen = match bar.get("wen") {
        Some(Value::Date(d)) => Some(*d),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|d| d.with_timezone(&Utc)),
        _ => None,
    };
    check_eq!(wen, Some(bar_wen()));

    check_eq!(bar.get("arr").map(Value::to_string), Some("[2,3]".to_string()));
    check_eq!(
        bar.get("obj"),
        Some(&Value::from(json!({"a": 1, "b": [2], "c": {"d": 3}})))
    );
    Ok(())
}

fn check_p3(entity: &Entity, must_merge: bool) -> StepResult {
    if must_merge {
        check_eq!(entity.get("p3"), Some(&Value::from("v3")), "merge keeps p3");
    } else {
        check!(entity.get("p3").is_none(), "replace drops p3: {entity}");
    }
    Ok(())
}

// =============================================================================
// Data tests
// =============================================================================

async fn load_missing(ctx: &mut StepContext<BasicFixture>) -> StepResult {
    let missing = ctx
        .store
        .load(&foo(), &LoadCriteria::from("does-not-exist-at-all-at-all"))
        .await?;
    check!(missing.is_none(), "expected nothing, got {missing:?}");
    Ok(())
}

async fn save_first(ctx: &mut StepContext<BasicFixture>) -> StepResult {
    let mut foo1 = Entity::make("foo");
    foo1.set("p1", "v1").set("p3", "v3");

    let saved = ctx.store.save(&foo1).await?;
    check!(saved.id().is_some());
    check_eq!(saved.get("p1"), Some(&Value::from("v1")));
    check_eq!(saved.get("p3"), Some(&Value::from("v3")));

    ctx.fixture.foo1 = Some(saved);
    Ok(())
}

async fn load_first(ctx: &mut StepContext<BasicFixture>) -> StepResult {
    let id = require(&ctx.fixture.foo1, "foo1")?.id().unwrap_or_default().to_string();

    let loaded = ctx.store.load(&foo(), &LoadCriteria::from(id.as_str())).await?;
    let loaded = found(loaded, "foo1")?;
    check_eq!(loaded.id(), Some(id.as_str()));
    check_eq!(loaded.get("p1"), Some(&Value::from("v1")));

    ctx.fixture.foo1 = Some(loaded);
    Ok(())
}

async fn resave_first(ctx: &mut StepContext<BasicFixture>) -> StepResult {
    let foo1 = require_mut(&mut ctx.fixture.foo1, "foo1")?;
    foo1.set("p1", "v1x").set("p2", "v2");
    foo1.remove("p3");

    let saved = ctx.store.save(foo1).await?;
    check_eq!(saved.id(), foo1.id());
    check_eq!(saved.get("p1"), Some(&Value::from("v1x")));
    check_eq!(saved.get("p2"), Some(&Value::from("v2")));
    check_p3(&saved, ctx.settings.must_merge)?;

    ctx.fixture.foo1 = Some(saved);
    Ok(())
}

async fn reload_first(ctx: &mut StepContext<BasicFixture>) -> StepResult {
    let id = require(&ctx.fixture.foo1, "foo1")?.id().unwrap_or_default().to_string();

    let loaded = ctx.store.load(&foo(), &LoadCriteria::from(id.as_str())).await?;
    let loaded = found(loaded, "re-saved foo1")?;
    check_eq!(loaded.get("p1"), Some(&Value::from("v1x")));
    check_eq!(loaded.get("p2"), Some(&Value::from("v2")));
    check_p3(&loaded, ctx.settings.must_merge)?;

    ctx.fixture.foo1 = Some(loaded);
    Ok(())
}

// =============================================================================
// Save tests
// =============================================================================

async fn save_bar(ctx: &mut StepContext<BasicFixture>) -> StepResult {
    let mark: f64 = rand::random();
    let bar = bar_template().with("mark", mark);

    let saved = ctx.store.save(&bar).await?;
    check!(saved.id().is_some());
    check_eq!(saved.namespace(), &bar_namespace());
    bar_verify(&saved)?;
    check_eq!(saved.get("mark"), Some(&Value::from(mark)));

    ctx.fixture.mark = Some(mark);
    ctx.fixture.bar = Some(saved);
    Ok(())
}

async fn save_second_foo(ctx: &mut StepContext<BasicFixture>) -> StepResult {
    let saved = ctx.store.save(&Entity::make("foo").with("p2", "v2")).await?;
    check!(saved.id().is_some());
    check_eq!(saved.get("p2"), Some(&Value::from("v2")));

    ctx.fixture.foo2 = Some(saved);
    Ok(())
}

async fn save_with_id(ctx: &mut StepContext<BasicFixture>) -> StepResult {
    let entity = Entity::make("foo").with_id_hint(FIXED_ID);

    let saved = ctx.store.save(&entity).await?;
    check_eq!(saved.id(), Some(FIXED_ID));
    Ok(())
}

// =============================================================================
// Load tests
// =============================================================================

async fn list_bars(ctx: &mut StepContext<BasicFixture>) -> StepResult {
    let bars = ctx.store.list(&bar_namespace(), &Query::default()).await?;
    check_eq!(bars.len(), 1);
    bar_verify(&bars[0])
}

async fn list_foos(ctx: &mut StepContext<BasicFixture>) -> StepResult {
    let foos = ctx.store.list(&foo(), &Query::default()).await?;
    check_eq!(foos.len(), 3, "foo1, foo2 and the fixed-id foo");
    Ok(())
}

async fn list_by_id(ctx: &mut StepContext<BasicFixture>) -> StepResult {
    let id = require(&ctx.fixture.bar, "bar")?.id().unwrap_or_default().to_string();

    let bars = ctx
        .store
        .list(&bar_namespace(), &Selector::by_id(id.as_str()).into())
        .await?;
    check_eq!(bars.len(), 1);
    check_eq!(bars[0].id(), Some(id.as_str()));
    bar_verify(&bars[0])
}

async fn list_by_mark(ctx: &mut StepContext<BasicFixture>) -> StepResult {
    let mark = *require(&ctx.fixture.mark, "mark")?;

    let bars = ctx
        .store
        .list(&bar_namespace(), &Selector::new().matching("mark", mark).into())
        .await?;
    check_eq!(bars.len(), 1);
    bar_verify(&bars[0])
}

async fn list_by_string(ctx: &mut StepContext<BasicFixture>) -> StepResult {
    let foo2 = require(&ctx.fixture.foo2, "foo2")?.id().map(str::to_string);

    let foos = ctx
        .store
        .list(&foo(), &Selector::new().matching("p2", "v2").into())
        .await?;
    check_eq!(foos.len(), 2, "foo1 and foo2 carry p2=v2");
    check!(
        foos.iter().any(|e| e.id().map(str::to_string) == foo2),
        "foo2 missing from p2=v2 results"
    );
    Ok(())
}

async fn list_by_two_fields(ctx: &mut StepContext<BasicFixture>) -> StepResult {
    let selector = Selector::new().matching("p2", "v2").matching("p1", "v1x");

    let foos = ctx.store.list(&foo(), &selector.into()).await?;
    check_eq!(foos.len(), 1, "only foo1 matches both fields");
    for entity in &foos {
        check_eq!(entity.get("p2"), Some(&Value::from("v2")));
        check_eq!(entity.get("p1"), Some(&Value::from("v1x")));
    }
    Ok(())
}

/// Lists and maps match whole values only: no subsets, no reordering.
async fn list_by_structured_fields(ctx: &mut StepContext<BasicFixture>) -> StepResult {
    for (field, expected, hits) in [
        ("arr", json!([2, 3]), 1),
        ("arr", json!([2]), 0),
        ("arr", json!([3, 2]), 0),
        ("obj", json!({"a": 1, "b": [2], "c": {"d": 3}}), 1),
        ("obj", json!({"a": 1}), 0),
    ] {
        let selector = Selector::new().matching(field, Value::from(expected.clone()));
        let bars = ctx.store.list(&bar_namespace(), &selector.into()).await?;
        check_eq!(bars.len(), hits, "{field}={expected}");
    }
    Ok(())
}

async fn load_by_selector(ctx: &mut StepContext<BasicFixture>) -> StepResult {
    let expected = require(&ctx.fixture.foo1, "foo1")?.id().map(str::to_string);

    let criteria = LoadCriteria::from(Selector::new().matching("p1", "v1x"));
    let found = ctx.store.load(&foo(), &criteria).await?;
    check_eq!(found.as_ref().and_then(Entity::id), expected.as_deref());

    let none = ctx
        .store
        .load(&foo(), &Selector::new().matching("p1", "nope").into())
        .await?;
    check!(none.is_none());
    Ok(())
}

// =============================================================================
// Field tests
// =============================================================================

async fn delete_field(ctx: &mut StepContext<BasicFixture>) -> StepResult {
    let mut saved = ctx
        .store
        .save(&Entity::make("foo").with("bar", "baz").with("keep", 1))
        .await?;
    saved.remove("bar");
    ctx.store.save(&saved).await?;

    let id = saved.id().unwrap_or_default().to_string();
    let loaded = ctx.store.load(&foo(), &LoadCriteria::from(id.as_str())).await?;
    let loaded = found(loaded, "re-saved entity")?;

    if ctx.settings.must_merge {
        check_eq!(loaded.get("bar"), Some(&Value::from("baz")), "merge keeps bar");
    } else {
        check!(loaded.get("bar").is_none(), "bar must be absent, got {loaded}");
    }
    check_eq!(loaded.get("keep"), Some(&Value::from(1)));
    Ok(())
}

async fn copies_are_isolated(ctx: &mut StepContext<BasicFixture>) -> StepResult {
    let mut original = Entity::make("foo").with("arr", Value::from_iter([2, 3]));
    let mut saved = ctx.store.save(&original).await?;

    if let Some(arr) = original.get_mut("arr").and_then(Value::as_list_mut) {
        arr.push(Value::from(4));
    }
    check_eq!(saved.get("arr"), Some(&Value::from_iter([2, 3])), "saved copy unchanged");

    if let Some(arr) = saved.get_mut("arr").and_then(Value::as_list_mut) {
        arr.push(Value::from(5));
    }
    check_eq!(
        original.get("arr"),
        Some(&Value::from_iter([2, 3, 4])),
        "original unchanged by saved copy"
    );

    let id = saved.id().unwrap_or_default().to_string();
    let loaded = ctx.store.load(&foo(), &LoadCriteria::from(id.as_str())).await?;
    check_eq!(
        loaded.as_ref().and_then(|e| e.get("arr")),
        Some(&Value::from_iter([2, 3])),
        "stored record unchanged"
    );
    Ok(())
}

// =============================================================================
// Remove tests
// =============================================================================

async fn remove_all_foos(ctx: &mut StepContext<BasicFixture>) -> StepResult {
    ctx.store.remove(&foo(), &Selector::everything()).await?;

    let left = ctx.store.list(&foo(), &Query::default()).await?;
    check_eq!(left.len(), 0);
    Ok(())
}

async fn remove_by_partial_array(ctx: &mut StepContext<BasicFixture>) -> StepResult {
    let partial = Selector::new().matching("arr", Value::from(json!([2])));
    ctx.store.remove(&bar_namespace(), &partial).await?;

    let left = ctx.store.list(&bar_namespace(), &Query::default()).await?;
    check_eq!(left.len(), 1, "arr=[2] must not remove arr=[2,3]");
    Ok(())
}

async fn remove_bar_by_mark(ctx: &mut StepContext<BasicFixture>) -> StepResult {
    let mark = *require(&ctx.fixture.mark, "mark")?;
    let by_mark = Selector::new().matching("mark", mark);

    ctx.store.remove(&bar_namespace(), &by_mark).await?;

    let left = ctx.store.list(&bar_namespace(), &by_mark.into()).await?;
    check_eq!(left.len(), 0);
    Ok(())
}
