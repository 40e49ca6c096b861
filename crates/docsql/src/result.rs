use docsql_core::stmt::Document;

/// Outcome of `update_one` and `update_many`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
}

impl UpdateResult {
    /// Rows are counted as both matched and modified.
    pub(crate) fn new(count: u64) -> UpdateResult {
        UpdateResult {
            matched_count: count,
            modified_count: count,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FindOneAndUpdateResult {
    pub ok: bool,

    /// The updated row, if one matched
    pub value: Option<Document>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RemoveResult {
    pub deleted_count: u64,
}

/// Totals of a bulk write.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BulkWriteResult {
    pub inserted_count: u64,
    pub matched_count: u64,
    pub modified_count: u64,
    pub deleted_count: u64,
    pub upserted_count: u64,

    /// Operation index and `_id` of each upserted row
    pub upserted_ids: Vec<(usize, String)>,
}
