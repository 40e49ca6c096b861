/// Appends `value` to the JSON array at `path` inside `target` unless the
/// array already contains it. An empty path addresses `target` itself.
pub const ADD_TO_SET_FUNCTION: &str = r#"CREATE OR REPLACE FUNCTION fm_add_to_set(target JSONB, path TEXT[], value JSONB)
RETURNS JSONB LANGUAGE sql IMMUTABLE AS $$
  SELECT CASE
    WHEN COALESCE(target #> path, '[]'::JSONB) @> jsonb_build_array(value) THEN target
    WHEN cardinality(path) = 0 THEN COALESCE(target, '[]'::JSONB) || jsonb_build_array(value)
    ELSE jsonb_set(
      COALESCE(target, '{}'::JSONB),
      path,
      COALESCE(target #> path, '[]'::JSONB) || jsonb_build_array(value),
      TRUE
    )
  END
$$"#;
