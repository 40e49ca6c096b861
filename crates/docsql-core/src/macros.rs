/// Builds a [`Document`](crate::stmt::Document) from a JSON object literal.
///
/// Keys keep their literal order, which matters: compiled argument lists
/// follow the order of the fields in the source document.
///
/// ```
/// let selector = docsql_core::doc!({ "a": 3, "b": { "$gt": 2 } });
/// assert_eq!(selector.len(), 2);
/// ```
#[macro_export]
macro_rules! doc {
    ({ $($tt:tt)* }) => {{
        match $crate::serde_json::json!({ $($tt)* }) {
            $crate::serde_json::Value::Object(map) => $crate::stmt::Document::from(map),
            _ => unreachable!("object literal"),
        }
    }};
}
