mod support;

use docsql_core::{
    doc,
    stmt::{Document, Stage, Value},
};
use docsql_sql::stmt::Pipeline;
use pretty_assertions::assert_eq;
use std_util::prelude::*;

fn compile(stages: &[Document]) -> (String, Vec<Value>) {
    let compiled = Pipeline::new(&support::test_collection(), stages)
        .unwrap()
        .with_schema(support::schema())
        .to_query()
        .unwrap()
        .compile();
    (compiled.sql, compiled.args)
}

#[test]
fn match_sort_limit_fold_into_one_select() {
    let (sql, args) = compile(&[
        doc!({ "$match": { "a": 1 } }),
        doc!({ "$sort": { "a": -1 } }),
        doc!({ "$limit": 5 }),
    ]);
    assert_eq!(
        sql,
        "SELECT \"TestCollection\".* FROM \"TestCollection\" WHERE \"a\" = $1 ORDER BY \"a\" DESC LIMIT $2"
    );
    assert_eq!(args, vec![Value::I64(1), Value::I64(5)]);
}

#[test]
fn consecutive_matches_are_combined() {
    let (sql, _) = compile(&[
        doc!({ "$match": { "a": 1 } }),
        doc!({ "$match": { "b": "x" } }),
    ]);
    assert_eq!(
        sql,
        "SELECT \"TestCollection\".* FROM \"TestCollection\" WHERE ( \"a\" = $1 AND \"b\" = $2 )"
    );
}

#[test]
fn match_after_limit_wraps_a_subquery() {
    let (sql, args) = compile(&[doc!({ "$limit": 5 }), doc!({ "$match": { "a": 1 } })]);
    assert_eq!(
        sql,
        "SELECT * FROM ( SELECT \"TestCollection\".* FROM \"TestCollection\" LIMIT $1 ) A WHERE \"a\" = $2"
    );
    assert_eq!(args, vec![Value::I64(5), Value::I64(1)]);
}

#[test]
fn skip_then_limit() {
    let (sql, args) = compile(&[doc!({ "$skip": 2 }), doc!({ "$limit": 3 })]);
    assert_eq!(
        sql,
        "SELECT \"TestCollection\".* FROM \"TestCollection\" LIMIT $1 OFFSET $2"
    );
    assert_eq!(args, vec![Value::I64(3), Value::I64(2)]);
}

#[test]
fn limit_then_skip() {
    let (sql, _) = compile(&[doc!({ "$limit": 3 }), doc!({ "$skip": 2 })]);
    assert_eq!(
        sql,
        "SELECT * FROM ( SELECT \"TestCollection\".* FROM \"TestCollection\" LIMIT $1 ) A OFFSET $2"
    );
}

#[test]
fn group_then_sort_by_aggregate() {
    let (sql, _) = compile(&[
        doc!({ "$match": { "b": "x" } }),
        doc!({ "$group": { "_id": "$b", "total": { "$sum": "$a" } } }),
        doc!({ "$sort": { "total": -1 } }),
    ]);
    assert_eq!(
        sql,
        "SELECT \"b\" AS \"_id\" , SUM( \"a\" ) AS \"total\" FROM \"TestCollection\" WHERE \"b\" = $1 GROUP BY \"b\" ORDER BY \"total\" DESC"
    );
}

#[test]
fn match_on_group_output() {
    let (sql, _) = compile(&[
        doc!({ "$group": { "_id": "$b", "total": { "$sum": "$a" } } }),
        doc!({ "$match": { "total": { "$gt": 10 } } }),
    ]);
    assert_eq!(
        sql,
        "SELECT * FROM ( SELECT \"b\" AS \"_id\" , SUM( \"a\" ) AS \"total\" FROM \"TestCollection\" GROUP BY \"b\" ) A WHERE \"total\" > $1"
    );
}

#[test]
fn count_stage() {
    let (sql, _) = compile(&[doc!({ "$match": { "a": 1 } }), doc!({ "$count": "n" })]);
    assert_eq!(
        sql,
        "SELECT COUNT(*) AS \"n\" FROM \"TestCollection\" WHERE \"a\" = $1"
    );
}

#[test]
fn count_after_limit() {
    let (sql, _) = compile(&[doc!({ "$limit": 10 }), doc!({ "$count": "n" })]);
    assert_eq!(
        sql,
        "SELECT COUNT(*) AS \"n\" FROM ( SELECT \"TestCollection\".* FROM \"TestCollection\" LIMIT $1 ) A"
    );
}

#[test]
fn match_on_added_field() {
    let (sql, args) = compile(&[
        doc!({ "$addFields": { "double": { "$multiply": ["$a", 2] } } }),
        doc!({ "$match": { "double": { "$gt": 4 } } }),
    ]);
    assert_eq!(
        sql,
        "SELECT * FROM ( SELECT \"TestCollection\".* , ( \"a\" * $1 ) AS \"double\" FROM \"TestCollection\" ) A WHERE \"double\" > $2"
    );
    assert_eq!(args, vec![Value::I64(2), Value::I64(4)]);
}

#[test]
fn added_literals_keep_their_type() {
    let (sql, args) = compile(&[doc!({ "$addFields": { "k": 5, "label": "x", "ratio": 0.5 } })]);
    assert!(
        sql.contains(", $1::INTEGER AS \"k\" , $2::TEXT AS \"label\" , $3::REAL AS \"ratio\" FROM"),
        "{sql}"
    );
    assert_eq!(args, vec![Value::I64(5), Value::from("x"), Value::F64(0.5)]);
}

#[test]
fn lookup_then_project() {
    let (sql, _) = compile(&[
        doc!({
            "$lookup": {
                "from": "TestCollection2",
                "localField": "b",
                "foreignField": "data",
                "as": "joined"
            }
        }),
        doc!({ "$project": { "joined": 1 } }),
    ]);
    assert_eq!(
        sql,
        "SELECT \"joined\", \"_id\" FROM \"TestCollection\" , LATERAL (SELECT jsonb_agg(\"TestCollection2\".*) AS \"joined\" FROM \"TestCollection2\" WHERE \"TestCollection\".\"b\" = \"TestCollection2\".\"data\") Q"
    );
}

#[test]
fn nested_subqueries_are_lettered() {
    let (sql, _) = compile(&[
        doc!({ "$limit": 10 }),
        doc!({ "$skip": 1 }),
        doc!({ "$match": { "a": 1 } }),
    ]);
    assert_eq!(
        sql,
        "SELECT * FROM ( SELECT * FROM ( SELECT \"TestCollection\".* FROM \"TestCollection\" LIMIT $1 ) B OFFSET $2 ) A WHERE \"a\" = $3"
    );
}

#[test]
fn unknown_field_after_project() {
    let pipeline = Pipeline::new(
        &support::test_collection(),
        &[
            doc!({ "$project": { "a": 1 } }),
            doc!({ "$match": { "b": "x" } }),
        ],
    )
    .unwrap();
    let err = assert_err!(pipeline.to_query());
    assert!(err.is_unrecognized_field());
}

#[test]
fn unsupported_stages() {
    let err = assert_err!(Pipeline::new(
        &support::test_collection(),
        &[doc!({ "$unwind": "$c" })]
    ));
    assert!(err.is_not_implemented());

    let err = assert_err!(Pipeline::new(
        &support::test_collection(),
        &[doc!({ "$match": {}, "$limit": 1 })]
    ));
    assert!(err.is_invalid_statement());
}

#[test]
fn stages_are_kept_in_order() {
    let pipeline = Pipeline::new(
        &support::test_collection(),
        &[doc!({ "$skip": 1 }), doc!({ "$count": "n" })],
    )
    .unwrap();
    assert_eq!(
        pipeline.stages(),
        &[Stage::Skip(1), Stage::Count("n".to_string())]
    );
}
