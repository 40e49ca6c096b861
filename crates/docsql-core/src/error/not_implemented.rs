use super::Error;

/// Error for constructs of the document query language that have no SQL
/// translation: collations, pipeline-style lookups, unknown operators and
/// pipeline stages.
#[derive(Debug)]
pub(super) struct NotImplemented {
    what: Box<str>,
}

impl std::error::Error for NotImplemented {}

impl core::fmt::Display for NotImplemented {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{} not implemented", self.what)
    }
}

impl Error {
    /// Creates a not-implemented error; `what` names the construct, e.g.
    /// `"collation"` or `"update operator $pull"`.
    pub fn not_implemented(what: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::NotImplemented(NotImplemented {
            what: what.into().into(),
        }))
    }

    /// Returns `true` if this error, or any error it wraps, is a
    /// not-implemented error.
    pub fn is_not_implemented(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::NotImplemented(_)))
    }
}
