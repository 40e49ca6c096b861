mod connect;

use crate::{
    execute::{ExecuteData, InFlight},
    Collection, Config,
};

use docsql_core::{
    stmt::{Document, Value},
    Driver, Error, Result, Schema,
};
use docsql_sql::{Compiled, Statement, ADD_TO_SET_FUNCTION};

use std::{fmt, sync::Arc, time::Instant};

/// Shared state between all `Db` clones.
struct Shared {
    driver: Box<dyn Driver>,
    schema: Arc<Schema>,
    config: Config,
}

/// A database handle: a driver, the schema of its tables and the execution
/// settings. Cloning is cheap and shares all three.
#[derive(Clone)]
pub struct Db {
    shared: Arc<Shared>,
}

impl Db {
    pub fn new(driver: impl Driver, schema: impl Into<Arc<Schema>>) -> Db {
        Db::with_config(driver, schema, Config::new())
    }

    pub fn with_config(driver: impl Driver, schema: impl Into<Arc<Schema>>, config: Config) -> Db {
        Db {
            shared: Arc::new(Shared {
                driver: Box::new(driver),
                schema: schema.into(),
                config,
            }),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.shared.schema
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    pub fn driver(&self) -> &dyn Driver {
        &*self.shared.driver
    }

    /// Looks a collection up by name, ignoring case.
    pub fn collection(&self, name: &str) -> Result<Collection> {
        let table = self
            .schema()
            .collection(name)
            .ok_or_else(|| Error::invalid_schema(format!("no collection named {name:?}")))?;
        Ok(Collection::new(self.clone(), table.clone()))
    }

    pub fn collections(&self) -> impl Iterator<Item = Collection> + '_ {
        self.schema()
            .tables()
            .map(|table| Collection::new(self.clone(), table.clone()))
    }

    /// Installs the SQL functions compiled updates may call.
    pub async fn install_functions(&self) -> Result<()> {
        Self::run_ddl(self.driver(), ADD_TO_SET_FUNCTION).await
    }

    /// Creates every table of the schema and its indexes.
    pub async fn ensure_tables(&self) -> Result<()> {
        for collection in self.collections() {
            collection.ensure_table().await?;
        }
        Ok(())
    }

    async fn run_ddl(driver: &dyn Driver, sql: &str) -> Result<()> {
        let _in_flight = InFlight::enter();
        tracing::debug!(sql, "executing DDL");
        driver.batch_execute(sql).await.map_err(|err| {
            let err = err.context(Error::query_failed("(db)", sql, vec![], ""));
            tracing::error!(target: "docsql::query", "{err}");
            err
        })
    }

    /// Runs one statement on behalf of `collection`.
    ///
    /// The call is counted as in flight until it returns. Slow executions
    /// are reported under `docsql::slow_query` and failures under
    /// `docsql::query`, both unless `data` is quiet. Failures keep the
    /// driver error as their cause.
    pub(crate) async fn execute(
        &self,
        collection: &str,
        statement: &Statement,
        data: &ExecuteData,
    ) -> Result<Vec<Document>> {
        let _in_flight = InFlight::enter();

        let Compiled { sql, args } = statement.compile();
        let quiet = data.is_quiet();

        tracing::debug!(
            collection,
            statement = statement.name(),
            sql = %sql,
            args = args.len(),
            "executing query"
        );

        let start = Instant::now();
        let result = if statement.is_ddl() {
            self.driver().batch_execute(&sql).await.map(|()| vec![])
        } else {
            self.driver().query(&sql, &args).await
        };
        let elapsed = start.elapsed();

        match result {
            Ok(rows) => {
                let config = self.config();
                if config.log_slow_queries && !quiet && elapsed > config.slow_query_threshold {
                    let args = Value::from(args);
                    tracing::warn!(
                        target: "docsql::slow_query",
                        collection,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "slow query detected ({} ms): {sql}: {}",
                        elapsed.as_millis(),
                        args,
                    );
                }
                Ok(rows)
            }
            Err(err) => {
                let err = err.context(Error::query_failed(collection, sql, args, data.render()));
                if !quiet {
                    tracing::error!(target: "docsql::query", collection, "{err}");
                }
                Err(err)
            }
        }
    }
}

impl fmt::Debug for Db {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Db")
            .field("driver", &self.shared.driver)
            .field("schema", &self.shared.schema)
            .field("config", &self.shared.config)
            .finish()
    }
}
