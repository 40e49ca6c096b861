mod support;

use docsql::{
    doc,
    schema::IndexOptions,
    sql::ADD_TO_SET_FUNCTION,
    stmt::{FindOptions, RemoveOptions, ReturnCount, UpdateOptions, Value},
    FindOneAndUpdateResult, RemoveResult, UpdateResult,
};
use pretty_assertions::assert_eq;
use std_util::prelude::*;
use support::RecordingDriver;

// ------ lookup ------

#[test]
fn collections_are_found_ignoring_case() {
    let db = support::db(&RecordingDriver::new());
    assert_eq!(db.collection("posts").unwrap().name(), "Posts");

    let err = assert_err!(db.collection("Comments"));
    assert!(err.is_invalid_schema());
    assert_eq!(db.collections().count(), 2);
}

// ------ reads ------

#[tokio::test]
async fn find_fetches_rows() {
    let driver = RecordingDriver::new();
    driver.respond(vec![doc!({ "_id": "p1", "title": "a" })]);
    let posts = support::db(&driver).collection("Posts").unwrap();

    let rows = posts
        .find(doc!({ "title": "a" }), FindOptions::new())
        .fetch()
        .await
        .unwrap();

    assert_eq!(rows, vec![doc!({ "_id": "p1", "title": "a" })]);
    let call = driver.last();
    assert_eq!(call.sql, "SELECT \"Posts\".* FROM \"Posts\" WHERE \"title\" = $1");
    assert_eq!(call.args, vec![Value::from("a")]);
    assert!(!call.batch);
}

#[tokio::test]
async fn count_reads_the_count_column() {
    let driver = RecordingDriver::new();
    driver.respond(vec![doc!({ "count": 3 })]);
    let posts = support::db(&driver).collection("Posts").unwrap();

    let count = posts
        .find(doc!({ "score": { "$gt": 2 } }), FindOptions::new())
        .count()
        .await
        .unwrap();

    assert_eq!(count, 3);
    assert_eq!(
        driver.last().sql,
        "SELECT count(*) FROM \"Posts\" WHERE \"score\" > $1"
    );
}

#[tokio::test]
async fn count_of_nothing_is_zero() {
    let driver = RecordingDriver::new();
    let posts = support::db(&driver).collection("Posts").unwrap();
    assert_eq!(posts.find((), FindOptions::new()).count().await.unwrap(), 0);
}

#[tokio::test]
async fn find_one_limits_to_one_row() {
    let driver = RecordingDriver::new();
    driver.respond(vec![doc!({ "_id": "p1" })]);
    let posts = support::db(&driver).collection("Posts").unwrap();

    let row = posts.find_one("p1", FindOptions::new()).await.unwrap();
    assert_eq!(row, Some(doc!({ "_id": "p1" })));

    let call = driver.last();
    assert_eq!(
        call.sql,
        "SELECT \"Posts\".* FROM \"Posts\" WHERE \"_id\" = $1 LIMIT $2"
    );
    assert_eq!(call.args, vec![Value::from("p1"), Value::I64(1)]);

    // a caller's own limit wins
    posts
        .find_one("p1", FindOptions::new().limit(5))
        .await
        .unwrap();
    assert_eq!(driver.last().args[1], Value::I64(5));
}

#[tokio::test]
async fn find_one_without_rows_is_none() {
    let driver = RecordingDriver::new();
    let posts = support::db(&driver).collection("Posts").unwrap();

    assert_eq!(posts.find_one_arbitrary().await.unwrap(), None);
    assert_eq!(driver.last().sql, "SELECT \"Posts\".* FROM \"Posts\" LIMIT $1");
}

#[tokio::test]
async fn compile_errors_run_nothing() {
    let driver = RecordingDriver::new();
    let posts = support::db(&driver).collection("Posts").unwrap();

    let err = assert_err!(
        posts
            .find(doc!({ "nope": 1 }), FindOptions::new())
            .fetch()
            .await
    );
    assert!(err.is_unrecognized_field());

    assert_err_contains!(
        posts
            .find((), FindOptions::new().collation(doc!({ "locale": "en" })))
            .fetch()
            .await,
        "collation not implemented"
    );
    assert!(driver.calls().is_empty());
}

// ------ inserts ------

#[tokio::test]
async fn insert_returns_the_id() {
    let driver = RecordingDriver::new();
    driver.respond(vec![doc!({ "_id": "generated", "title": "hello" })]);
    let posts = support::db(&driver).collection("Posts").unwrap();

    let id = posts.insert(doc!({ "title": "hello" })).await.unwrap();
    assert_eq!(id, "generated");

    let call = driver.last();
    assert_eq!(
        call.sql,
        "INSERT INTO \"Posts\" ( \"_id\", \"title\" ) VALUES ( $1 , $2 ) RETURNING *"
    );
    assert_eq!(call.args[0].as_str().map(str::len), Some(docsql::sql::stmt::ID_LENGTH));
    assert_eq!(call.args[1], Value::from("hello"));
}

#[tokio::test]
async fn insert_without_returned_row_fails() {
    let driver = RecordingDriver::new();
    let posts = support::db(&driver).collection("Posts").unwrap();

    assert_err_contains!(
        posts.insert(doc!({ "title": "hello" })).await,
        "insert into \"Posts\" returned no _id"
    );
}

#[tokio::test]
async fn insert_many_collects_ids() {
    let driver = RecordingDriver::new();
    driver.respond(vec![doc!({ "_id": "a" }), doc!({ "_id": "b" })]);
    let posts = support::db(&driver).collection("Posts").unwrap();

    let ids = posts
        .insert_many(&[doc!({ "_id": "a" }), doc!({ "_id": "b", "score": 1 })])
        .await
        .unwrap();

    assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(
        driver.last().sql,
        "INSERT INTO \"Posts\" ( \"_id\", \"score\" ) VALUES ( $1 , DEFAULT ) , ( $2 , $3 ) RETURNING \"_id\""
    );
}

// ------ updates ------

#[tokio::test]
async fn update_one_touches_at_most_one_row() {
    let driver = RecordingDriver::new();
    driver.respond(vec![doc!({ "_id": "p1" })]);
    let posts = support::db(&driver).collection("Posts").unwrap();

    let result = posts
        .update_one("p1", &doc!({ "$set": { "title": "b" } }), UpdateOptions::new())
        .await
        .unwrap();

    assert_eq!(
        result,
        UpdateResult {
            matched_count: 1,
            modified_count: 1
        }
    );
    let call = driver.last();
    assert_eq!(
        call.sql,
        "UPDATE \"Posts\" SET \"title\" = $1 WHERE \"_id\" IN ( SELECT \"_id\" FROM \"Posts\" WHERE \"_id\" = $2 LIMIT $3 FOR UPDATE ) RETURNING \"_id\""
    );
    assert_eq!(
        call.args,
        vec![Value::from("b"), Value::from("p1"), Value::I64(1)]
    );
}

#[tokio::test]
async fn update_many_counts_every_row() {
    let driver = RecordingDriver::new();
    driver.respond(vec![doc!({ "_id": "p1" }), doc!({ "_id": "p2" })]);
    let posts = support::db(&driver).collection("Posts").unwrap();

    let result = posts
        .update_many(
            doc!({ "userId": "u1" }),
            &doc!({ "$inc": { "score": 1 } }),
            UpdateOptions::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.matched_count, 2);
    assert_eq!(
        driver.last().sql,
        "UPDATE \"Posts\" SET \"score\" = COALESCE( \"score\" , 0 ) + $1 WHERE \"userId\" = $2 RETURNING \"_id\""
    );
}

#[tokio::test]
async fn update_many_rejects_upserts() {
    let driver = RecordingDriver::new();
    let posts = support::db(&driver).collection("Posts").unwrap();

    assert_err_contains!(
        posts
            .update_many(
                doc!({ "userId": "u1" }),
                &doc!({ "$set": { "title": "b" } }),
                UpdateOptions::new().upsert(true),
            )
            .await,
        "use an InsertQuery with conflict strategy upsert"
    );
    assert!(driver.calls().is_empty());
}

#[tokio::test]
async fn upserts_route_through_insert() {
    let driver = RecordingDriver::new();
    driver.respond(vec![doc!({ "_id": "p1", "action": "updated" })]);
    let posts = support::db(&driver).collection("Posts").unwrap();

    let result = posts
        .update_one(
            doc!({ "title": "t" }),
            &doc!({ "$set": { "score": 2 } }),
            UpdateOptions::new().upsert(true),
        )
        .await
        .unwrap();
    assert_eq!(result.matched_count, 1);

    let sql = driver.last().sql;
    assert!(sql.starts_with("INSERT INTO \"Posts\" ( \"_id\", \"title\", \"score\" )"), "{sql}");
    assert!(
        sql.contains("ON CONFLICT ( \"title\" ) DO UPDATE SET \"score\" = EXCLUDED.\"score\""),
        "{sql}"
    );
}

#[tokio::test]
async fn upsert_counts_follow_return_count() {
    let driver = RecordingDriver::new();
    let posts = support::db(&driver).collection("Posts").unwrap();
    let update = |return_count: ReturnCount| {
        let posts = posts.clone();
        async move {
            posts
                .update_one(
                    doc!({ "title": "t" }),
                    &doc!({ "$set": { "score": 2 } }),
                    UpdateOptions::new().upsert(true).return_count(return_count),
                )
                .await
                .unwrap()
                .matched_count
        }
    };

    driver.respond(vec![doc!({ "_id": "p1", "action": "inserted" })]);
    assert_eq!(update(ReturnCount::Upserted).await, 1);

    driver.respond(vec![doc!({ "_id": "p1", "action": "inserted" })]);
    assert_eq!(update(ReturnCount::Matched).await, 0);

    driver.respond(vec![doc!({ "_id": "p1", "action": "updated" })]);
    assert_eq!(update(ReturnCount::Upserted).await, 0);

    // no row back at all
    assert_eq!(update(ReturnCount::Matched).await, 0);
}

#[tokio::test]
async fn find_one_and_update_returns_the_row() {
    let driver = RecordingDriver::new();
    driver.respond(vec![doc!({ "_id": "p1", "title": "b" })]);
    let posts = support::db(&driver).collection("Posts").unwrap();

    let result = posts
        .find_one_and_update("p1", &doc!({ "$set": { "title": "b" } }), UpdateOptions::new())
        .await
        .unwrap();

    assert_eq!(
        result,
        FindOneAndUpdateResult {
            ok: true,
            value: Some(doc!({ "_id": "p1", "title": "b" })),
        }
    );
    assert!(driver.last().sql.ends_with("FOR UPDATE ) RETURNING *"));
}

// ------ removes ------

#[tokio::test]
async fn remove_allows_empty_selectors_by_default() {
    let driver = RecordingDriver::new();
    driver.respond(vec![doc!({ "_id": "p1" }), doc!({ "_id": "p2" })]);
    let posts = support::db(&driver).collection("Posts").unwrap();

    let result = posts.remove((), RemoveOptions::new()).await.unwrap();
    assert_eq!(result, RemoveResult { deleted_count: 2 });
    assert_eq!(driver.last().sql, "DELETE FROM \"Posts\" RETURNING \"_id\"");
}

#[tokio::test]
async fn remove_keeps_an_explicit_safety_harness() {
    let driver = RecordingDriver::new();
    let posts = support::db(&driver).collection("Posts").unwrap();

    let err = assert_err!(
        posts
            .remove((), RemoveOptions::new().no_safety_harness(false))
            .await
    );
    assert!(err.is_invalid_statement());
    assert!(driver.calls().is_empty());
}

// ------ indexes and tables ------

#[tokio::test]
async fn ensure_index_registers_once() {
    let driver = RecordingDriver::new();
    let posts = support::db(&driver).collection("Posts").unwrap();

    let index = posts
        .ensure_index(&doc!({ "score": 1 }), IndexOptions::new())
        .await
        .unwrap();
    assert_eq!(index.name, "idx_Posts_score");

    posts
        .ensure_index(&doc!({ "score": 1 }), IndexOptions::new())
        .await
        .unwrap();

    let calls = driver.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|call| call.batch));
    assert_eq!(
        calls[0].sql,
        "CREATE INDEX IF NOT EXISTS \"idx_Posts_score\" ON \"Posts\" USING btree ( \"score\" )"
    );

    let indexes = posts.indexes();
    assert_eq!(indexes.len(), 1);
    assert_eq!(indexes[0].get("name"), Some(&Value::from("idx_Posts_score")));
}

#[tokio::test]
async fn ensure_index_rejects_unknown_fields() {
    let driver = RecordingDriver::new();
    let posts = support::db(&driver).collection("Posts").unwrap();

    assert_err!(
        posts
            .ensure_index(&doc!({ "nope": 1 }), IndexOptions::new())
            .await
    );
    assert!(posts.indexes().is_empty());
    assert!(driver.calls().is_empty());
}

#[tokio::test]
async fn drop_index_unregisters() {
    let driver = RecordingDriver::new();
    let posts = support::db(&driver).collection("Posts").unwrap();

    posts
        .ensure_index(&doc!({ "title": -1 }), IndexOptions::new().name("by_title"))
        .await
        .unwrap();
    posts.drop_index("by_title").await.unwrap();

    assert_eq!(driver.last().sql, "DROP INDEX IF EXISTS \"by_title\"");
    assert!(posts.indexes().is_empty());
}

#[tokio::test]
async fn ensure_table_creates_table_then_indexes() {
    let driver = RecordingDriver::new();
    let posts = support::db(&driver).collection("Posts").unwrap();
    posts
        .ensure_index(&doc!({ "userId": 1 }), IndexOptions::new())
        .await
        .unwrap();

    posts.ensure_table().await.unwrap();

    let sql = driver.sql();
    assert_eq!(sql.len(), 3);
    assert_eq!(
        sql[1],
        "CREATE TABLE IF NOT EXISTS \"Posts\" ( \"_id\" VARCHAR(27) PRIMARY KEY, \"userId\" TEXT, \"title\" TEXT, \"tags\" TEXT[], \"score\" DOUBLE PRECISION, \"meta\" JSONB )"
    );
    assert_eq!(sql[2], sql[0]);
}

#[tokio::test]
async fn db_level_ddl() {
    let driver = RecordingDriver::new();
    let db = support::db(&driver);

    db.install_functions().await.unwrap();
    assert_eq!(driver.last().sql, ADD_TO_SET_FUNCTION);

    db.ensure_tables().await.unwrap();
    let sql = driver.sql();
    assert!(sql[1].starts_with("CREATE TABLE IF NOT EXISTS \"Posts\""));
    assert!(sql[2].starts_with("CREATE TABLE IF NOT EXISTS \"Users\""));
}

#[tokio::test]
async fn add_field_checks_the_declaration() {
    let driver = RecordingDriver::new();
    let posts = support::db(&driver).collection("Posts").unwrap();

    posts.add_field("score").await.unwrap();
    assert!(driver.last().sql.starts_with("ALTER TABLE \"Posts\" ADD COLUMN"));

    assert_err!(posts.add_field("nope").await);
    assert_eq!(driver.calls().len(), 1);
}

#[tokio::test]
async fn update_default_value_without_default_drops_it() {
    let driver = RecordingDriver::new();
    let posts = support::db(&driver).collection("Posts").unwrap();

    posts.update_default_value("title").await.unwrap();
    let call = driver.last();
    assert_eq!(
        call.sql,
        "ALTER TABLE \"Posts\" ALTER COLUMN \"title\" DROP DEFAULT"
    );
    assert!(call.batch);
}

// ------ aggregation ------

#[tokio::test]
async fn aggregate_folds_stages() {
    let driver = RecordingDriver::new();
    driver.respond(vec![doc!({ "_id": "p1" })]);
    let posts = support::db(&driver).collection("Posts").unwrap();

    let rows = posts
        .aggregate(vec![
            doc!({ "$match": { "title": "a" } }),
            doc!({ "$limit": 2 }),
        ])
        .to_array()
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    let call = driver.last();
    assert_eq!(
        call.sql,
        "SELECT \"Posts\".* FROM \"Posts\" WHERE \"title\" = $1 LIMIT $2"
    );
    assert_eq!(call.args, vec![Value::from("a"), Value::I64(2)]);
}

#[tokio::test]
async fn aggregate_rejects_unsupported_stages() {
    let driver = RecordingDriver::new();
    let posts = support::db(&driver).collection("Posts").unwrap();

    assert_err!(
        posts
            .aggregate(vec![doc!({ "$unwind": "$tags" })])
            .quiet(true)
            .to_array()
            .await
    );
    assert!(driver.calls().is_empty());
}

// ------ projections ------

#[tokio::test]
async fn fetch_projected_runs_code_resolvers() {
    let driver = RecordingDriver::new();
    driver.respond(vec![doc!({ "title": "hello" })]);
    let posts = support::db(&driver).collection("Posts").unwrap();

    let rows = posts
        .fetch_projected(&["title", "titleLength"], (), None)
        .await
        .unwrap();

    assert_eq!(rows, vec![doc!({ "title": "hello", "titleLength": 5 })]);
    assert_eq!(driver.last().sql, "SELECT p.\"title\" FROM \"Posts\" p");
}

#[tokio::test]
async fn fetch_projected_binds_the_current_user_first() {
    let driver = RecordingDriver::new();
    let posts = support::db(&driver).collection("Posts").unwrap();

    posts
        .fetch_projected(&["authorName"], doc!({ "title": "a" }), Some("u1"))
        .await
        .unwrap();

    let call = driver.last();
    assert!(call.sql.contains("LEFT JOIN \"Users\" \"currentUser\""), "{}", call.sql);
    assert_eq!(call.args, vec![Value::from("u1"), Value::from("a")]);
}

// ------ failures ------

#[tokio::test]
async fn failures_carry_query_context() {
    let driver = RecordingDriver::new();
    driver.fail("relation \"Posts\" does not exist");
    let posts = support::db(&driver).collection("Posts").unwrap();

    let err = assert_err!(
        posts
            .find(doc!({ "title": "a" }), FindOptions::new().quiet(true))
            .fetch()
            .await
    );

    assert!(err.is_query_failed());
    assert!(err.is_driver());

    let message = err.to_string();
    assert!(
        message.starts_with(
            "SQL error for Posts: `SELECT \"Posts\".* FROM \"Posts\" WHERE \"title\" = $1`: [\"a\"]: selector: "
        ),
        "{message}"
    );
    assert!(message.ends_with(": relation \"Posts\" does not exist"), "{message}");
}
