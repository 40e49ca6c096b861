#![allow(dead_code)]

use docsql::{
    async_trait,
    schema::{Field, JoinBase, JoinKind, Resolver, SqlResolverContext, Table, Type},
    stmt::{Document, Value},
    Config, Db, Driver, Error, Result, Schema,
};
use parking_lot::Mutex;
use std::{collections::VecDeque, sync::Arc, time::Duration};

/// One statement the driver received.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub sql: String,
    pub args: Vec<Value>,

    /// Sent through `batch_execute`
    pub batch: bool,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Call>,
    responses: VecDeque<Result<Vec<Document>>>,
    delay: Option<Duration>,
}

/// Answers queries with queued responses, empty by default, and records
/// every statement it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingDriver {
    state: Arc<Mutex<State>>,
}

impl RecordingDriver {
    pub fn new() -> RecordingDriver {
        RecordingDriver::default()
    }

    /// Queues the rows returned by the next statement.
    pub fn respond(&self, rows: Vec<Document>) {
        self.state.lock().responses.push_back(Ok(rows));
    }

    /// Queues a failure of the next statement.
    pub fn fail(&self, message: &str) {
        let err = Error::driver(std::io::Error::new(std::io::ErrorKind::Other, message.to_string()));
        self.state.lock().responses.push_back(Err(err));
    }

    pub fn delay(&self, delay: Duration) {
        self.state.lock().delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn sql(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.sql).collect()
    }

    pub fn last(&self) -> Call {
        self.calls().pop().expect("no statement was executed")
    }

    async fn record(&self, sql: &str, args: &[Value], batch: bool) -> Result<Vec<Document>> {
        let (delay, response) = {
            let mut state = self.state.lock();
            state.calls.push(Call {
                sql: sql.to_string(),
                args: args.to_vec(),
                batch,
            });
            (state.delay, state.responses.pop_front())
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        response.unwrap_or_else(|| Ok(vec![]))
    }
}

#[async_trait]
impl Driver for RecordingDriver {
    async fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Document>> {
        self.record(sql, args, false).await
    }

    async fn batch_execute(&self, sql: &str) -> Result<()> {
        self.record(sql, &[], true).await.map(|_| ())
    }
}

fn posts() -> Table {
    Table::builder("Posts")
        .field(Field::new("userId", Type::String))
        .field(Field::new("title", Type::String))
        .field(Field::new("tags", Type::array(Type::String)))
        .field(Field::new("score", Type::Float))
        .field(Field::new("meta", Type::Json))
        .resolver(
            "authorName",
            Resolver::sql(|ctx| {
                let user_id = ctx.field("userId");
                let author = ctx.join(JoinBase::new("Users", JoinKind::Left).on("_id", user_id));
                Ok(author.field("displayName"))
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
        .unwrap()
}

fn users() -> Table {
    Table::builder("Users")
        .field(Field::new("displayName", Type::String))
        .build()
        .unwrap()
}

pub fn schema() -> Schema {
    Schema::new()
        .with_table(posts())
        .unwrap()
        .with_table(users())
        .unwrap()
}

/// A database over a fresh schema with slow-query reporting off.
pub fn db(driver: &RecordingDriver) -> Db {
    db_with_config(driver, Config::new().log_slow_queries(false))
}

pub fn db_with_config(driver: &RecordingDriver, config: Config) -> Db {
    Db::with_config(driver.clone(), schema(), config)
}
