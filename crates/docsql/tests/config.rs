use docsql::{Config, DEFAULT_SLOW_QUERY_THRESHOLD};
use pretty_assertions::assert_eq;
use std::{collections::HashMap, time::Duration};
use std_util::prelude::*;

fn from(vars: &[(&str, &str)]) -> docsql::Result<Config> {
    let vars = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect::<HashMap<_, _>>();
    Config::from_vars(|name| vars.get(name).cloned())
}

#[test]
fn unset_variables_keep_defaults() {
    let config = from(&[]).unwrap();
    assert_eq!(config, Config::new());
    assert_eq!(config.slow_query_threshold, DEFAULT_SLOW_QUERY_THRESHOLD);
    assert!(config.log_slow_queries);
}

#[test]
fn variables_are_read() {
    let config = from(&[
        ("DATABASE_URL", "postgresql://localhost/app"),
        ("DOCSQL_SLOW_QUERY_MS", " 250 "),
        ("DOCSQL_POOL_MAX_SIZE", "4"),
    ])
    .unwrap();

    assert_eq!(
        config,
        Config::new()
            .url("postgresql://localhost/app")
            .slow_query_threshold(Duration::from_millis(250))
            .pool_max_size(4)
    );
    assert_eq!(config.parsed_url().unwrap().path(), "/app");
}

#[test]
fn bad_values_are_rejected() {
    assert_err_contains!(
        from(&[("DOCSQL_SLOW_QUERY_MS", "soon")]),
        "invalid DOCSQL_SLOW_QUERY_MS \"soon\""
    );
    assert_err_contains!(
        from(&[("DOCSQL_POOL_MAX_SIZE", "-1")]),
        "invalid DOCSQL_POOL_MAX_SIZE \"-1\""
    );
    assert_err_contains!(
        from(&[("DOCSQL_POOL_MAX_SIZE", "0")]),
        "DOCSQL_POOL_MAX_SIZE must be at least 1"
    );
}

#[test]
fn urls_are_validated() {
    let err = assert_err!(Config::new().parsed_url());
    assert!(err.is_invalid_connection_url());

    let err = assert_err!(Config::new().url("not a url").parsed_url());
    assert!(err.is_invalid_connection_url());
}

#[tokio::test]
async fn connect_picks_the_driver_by_scheme() {
    let err = assert_err!(
        docsql::Db::connect(Config::new().url("mysql://localhost/app"), docsql::Schema::new()).await
    );
    assert!(err.is_invalid_connection_url());
    assert!(err.to_string().contains("unsupported database; scheme=mysql"));
}
