use super::Error;

/// Context attached when one operation of a bulk write fails.
#[derive(Debug)]
pub(super) struct BulkWriteFailed {
    index: usize,
    operation: &'static str,
    completed: usize,
}

impl std::error::Error for BulkWriteFailed {}

impl core::fmt::Display for BulkWriteFailed {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "bulk write operation #{} ({}) failed after {} completed operations",
            self.index, self.operation, self.completed
        )
    }
}

impl Error {
    pub fn bulk_write_failed(index: usize, operation: &'static str, completed: usize) -> Error {
        Error::from(super::ErrorKind::BulkWriteFailed(BulkWriteFailed {
            index,
            operation,
            completed,
        }))
    }

    pub fn is_bulk_write_failed(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::BulkWriteFailed(_)))
    }
}
