#![allow(dead_code)]

use docsql_core::{
    schema::{Field, JoinAlias, JoinBase, JoinKind, Resolver, SqlResolverContext, Table, Type},
    stmt::Value,
    Schema,
};
use std::sync::Arc;

fn test_collection_table() -> Table {
    Table::builder("TestCollection")
        .field(Field::new("a", Type::Float))
        .field(Field::new("b", Type::String))
        .field(Field::new("c", Type::Json))
        .field(Field::new("schemaVersion", Type::Float))
        .build()
        .unwrap()
}

fn test_collection2_table() -> Table {
    Table::builder("TestCollection2")
        .field(Field::new("data", Type::String))
        .build()
        .unwrap()
}

pub fn test_collection() -> Arc<Table> {
    Arc::new(test_collection_table())
}

pub fn test_collection2() -> Arc<Table> {
    Arc::new(test_collection2_table())
}

fn author(ctx: &mut dyn SqlResolverContext) -> JoinAlias {
    let user_id = ctx.field("userId");
    ctx.join(JoinBase::new("Users", JoinKind::Left).on("_id", user_id))
}

/// Integer columns.
pub fn counters() -> Arc<Table> {
    Arc::new(
        Table::builder("Counters")
            .field(Field::new("n", Type::Int))
            .field(Field::new("total", Type::BigInt))
            .build()
            .unwrap(),
    )
}

/// Native array and date columns, plus resolver-backed fields.
pub fn posts() -> Arc<Table> {
    Arc::new(
        Table::builder("Posts")
            .field(Field::new("userId", Type::String))
            .field(Field::new("title", Type::String))
            .field(Field::new("tags", Type::array(Type::String)))
            .field(Field::new("createdAt", Type::Date))
            .field(Field::new("score", Type::Float))
            .field(
                Field::new("status", Type::String)
                    .not_null()
                    .default_value("draft"),
            )
            .resolver(
                "authorName",
                Resolver::sql(|ctx| Ok(author(ctx).field("displayName"))),
            )
            .resolver(
                "authorAvatar",
                Resolver::sql(|ctx| Ok(author(ctx).field("avatar"))).field_name("avatar"),
            )
            .resolver(
                "isMine",
                Resolver::sql(|ctx| {
                    Ok(format!(
                        "{} = {}",
                        ctx.field("userId"),
                        ctx.current_user_field("_id")
                    ))
                }),
            )
            .resolver(
                "isPopular",
                Resolver::sql(|ctx| {
                    let score = ctx.field("score");
                    let threshold = ctx.arg(Value::from(10));
                    Ok(format!("{score} > {threshold}"))
                }),
            )
            .resolver(
                "titleLength",
                Resolver::code(|row| {
                    let len = row.get("title").and_then(Value::as_str).map_or(0, str::len);
                    Ok(Value::from(len as i64))
                }),
            )
            .build()
            .unwrap(),
    )
}

pub fn schema() -> Arc<Schema> {
    let schema = Schema::new()
        .with_table(test_collection_table())
        .unwrap()
        .with_table(test_collection2_table())
        .unwrap();
    Arc::new(schema)
}
