use super::Document;

/// Options accepted by `find`, `findOne` and `count`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FindOptions {
    pub sort: Option<Document>,
    pub limit: Option<u64>,
    pub skip: Option<u64>,
    pub projection: Option<Document>,
    /// Always rejected; kept so callers get a clear error instead of silently
    /// ignored collation rules.
    pub collation: Option<Document>,
    /// Suppresses slow-query and failure logging.
    pub quiet: bool,
}

impl FindOptions {
    pub fn new() -> FindOptions {
        FindOptions::default()
    }

    pub fn sort(mut self, sort: Document) -> FindOptions {
        self.sort = Some(sort);
        self
    }

    pub fn limit(mut self, limit: u64) -> FindOptions {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u64) -> FindOptions {
        self.skip = Some(skip);
        self
    }

    pub fn projection(mut self, projection: Document) -> FindOptions {
        self.projection = Some(projection);
        self
    }

    pub fn collation(mut self, collation: Document) -> FindOptions {
        self.collation = Some(collation);
        self
    }

    pub fn quiet(mut self, quiet: bool) -> FindOptions {
        self.quiet = quiet;
        self
    }
}

/// Which count an upserting update reports as its result.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ReturnCount {
    #[default]
    Matched,
    Upserted,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct UpdateOptions {
    pub upsert: bool,
    pub return_count: ReturnCount,
    pub quiet: bool,
}

impl UpdateOptions {
    pub fn new() -> UpdateOptions {
        UpdateOptions::default()
    }

    pub fn upsert(mut self, upsert: bool) -> UpdateOptions {
        self.upsert = upsert;
        self
    }

    pub fn return_count(mut self, return_count: ReturnCount) -> UpdateOptions {
        self.return_count = return_count;
        self
    }

    pub fn quiet(mut self, quiet: bool) -> UpdateOptions {
        self.quiet = quiet;
        self
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RemoveOptions {
    /// Allows deleting with an empty selector. `None` lets the caller pick
    /// its own default.
    pub no_safety_harness: Option<bool>,
    pub limit: Option<u64>,
    pub quiet: bool,
}

impl RemoveOptions {
    pub fn new() -> RemoveOptions {
        RemoveOptions::default()
    }

    pub fn no_safety_harness(mut self, no_safety_harness: bool) -> RemoveOptions {
        self.no_safety_harness = Some(no_safety_harness);
        self
    }

    pub fn limit(mut self, limit: u64) -> RemoveOptions {
        self.limit = Some(limit);
        self
    }

    pub fn quiet(mut self, quiet: bool) -> RemoveOptions {
        self.quiet = quiet;
        self
    }
}
