mod support;

use docsql::{doc, BulkWriteResult};
use pretty_assertions::assert_eq;
use std_util::prelude::*;
use support::RecordingDriver;

#[tokio::test]
async fn mixed_operations_sum_their_counts() {
    let driver = RecordingDriver::new();
    driver.respond(vec![doc!({ "_id": "p1" })]);
    driver.respond(vec![doc!({ "_id": "p2" }), doc!({ "_id": "p3" })]);
    driver.respond(vec![doc!({ "_id": "p4", "action": "inserted" })]);
    driver.respond(vec![doc!({ "_id": "p1" })]);
    let posts = support::db(&driver).collection("Posts").unwrap();

    let result = posts
        .bulk_write(&[
            doc!({ "insertOne": { "document": { "_id": "p1", "title": "a" } } }),
            doc!({ "updateMany": {
                "filter": { "userId": "u1" },
                "update": { "$set": { "score": 1 } },
            } }),
            doc!({ "updateOne": {
                "filter": { "title": "b" },
                "update": { "$set": { "score": 2 } },
                "upsert": true,
            } }),
            doc!({ "deleteOne": { "filter": { "_id": "p1" } } }),
        ])
        .await
        .unwrap();

    assert_eq!(
        result,
        BulkWriteResult {
            inserted_count: 1,
            matched_count: 2,
            modified_count: 2,
            deleted_count: 1,
            upserted_count: 1,
            upserted_ids: vec![(2, "p4".to_string())],
        }
    );

    let sql = driver.sql();
    assert_eq!(sql.len(), 4);
    assert!(sql[0].starts_with("INSERT INTO \"Posts\""));
    assert!(sql[1].starts_with("UPDATE \"Posts\""));
    assert!(sql[2].contains("ON CONFLICT ( \"title\" )"));
    assert!(sql[3].starts_with("DELETE FROM \"Posts\""));
}

#[tokio::test]
async fn replace_one_sets_the_replacement() {
    let driver = RecordingDriver::new();
    driver.respond(vec![doc!({ "_id": "p1" })]);
    let posts = support::db(&driver).collection("Posts").unwrap();

    let result = posts
        .bulk_write(&[doc!({ "replaceOne": {
            "filter": { "_id": "p1" },
            "replacement": { "_id": "ignored", "title": "c" },
        } })])
        .await
        .unwrap();

    assert_eq!(result.matched_count, 1);
    let call = driver.last();
    assert!(call.sql.starts_with("UPDATE \"Posts\" SET \"title\" = $1"), "{}", call.sql);
    assert!(!call.args.iter().any(|arg| arg.as_str() == Some("ignored")));
}

#[tokio::test]
async fn compile_failures_run_nothing() {
    let driver = RecordingDriver::new();
    let posts = support::db(&driver).collection("Posts").unwrap();

    let err = assert_err!(
        posts
            .bulk_write(&[
                doc!({ "insertOne": { "document": { "title": "a" } } }),
                doc!({ "updateOne": {
                    "filter": { "_id": "p1" },
                    "update": { "$set": { "nope": 1 } },
                } }),
            ])
            .await
    );

    assert!(err.is_bulk_write_failed());
    assert!(err.is_unrecognized_field());
    assert!(
        err.to_string()
            .starts_with("bulk write operation #1 (updateOne) failed after 0 completed operations"),
        "{err}"
    );
    assert!(driver.calls().is_empty());
}

#[tokio::test]
async fn unknown_operations_are_invalid() {
    let driver = RecordingDriver::new();
    let posts = support::db(&driver).collection("Posts").unwrap();

    let err = assert_err_contains!(
        posts
            .bulk_write(&[doc!({ "upsertOne": { "filter": {} } })])
            .await,
        "bulk write operation #0 (invalid) failed"
    );
    assert!(err.is_bulk_write_failed());
    assert!(driver.calls().is_empty());
}

#[tokio::test]
async fn execution_failures_stop_the_batch() {
    let driver = RecordingDriver::new();
    driver.respond(vec![doc!({ "_id": "p1" })]);
    driver.fail("deadlock detected");
    let posts = support::db(&driver).collection("Posts").unwrap();

    let err = assert_err!(
        posts
            .bulk_write(&[
                doc!({ "insertOne": { "document": { "title": "a" } } }),
                doc!({ "deleteOne": { "filter": { "title": "a" } } }),
                doc!({ "deleteMany": { "filter": { "title": "b" } } }),
            ])
            .await
    );

    assert!(err.is_bulk_write_failed());
    assert!(err.is_query_failed());
    assert!(err.is_driver());

    let message = err.to_string();
    assert!(
        message.starts_with("bulk write operation #1 (deleteOne) failed after 1 completed operations: SQL error for Posts"),
        "{message}"
    );
    assert!(message.ends_with("deadlock detected"), "{message}");
    assert_eq!(driver.calls().len(), 2);
}

#[tokio::test]
async fn delete_one_is_limited() {
    let driver = RecordingDriver::new();
    let posts = support::db(&driver).collection("Posts").unwrap();

    posts
        .bulk_write(&[doc!({ "deleteOne": { "filter": { "title": "a" } } })])
        .await
        .unwrap();

    let call = driver.last();
    assert!(call.sql.contains("LIMIT $2"), "{}", call.sql);
    assert_eq!(call.args.len(), 2);
}
