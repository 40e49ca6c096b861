use super::Error;

/// Error when a selector, modifier, projection or sort references a field the
/// table does not declare.
#[derive(Debug)]
pub(super) struct UnrecognizedField {
    field: Box<str>,
    operation: Box<str>,
}

impl std::error::Error for UnrecognizedField {}

impl core::fmt::Display for UnrecognizedField {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "field \"{}\" is not recognized - is it missing from the schema? ({})",
            self.field, self.operation
        )
    }
}

impl Error {
    /// Creates an unrecognized field error. `operation` describes the query
    /// that referenced the field, e.g. `SelectQuery on "Posts"`.
    pub fn unrecognized_field(field: impl Into<String>, operation: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::UnrecognizedField(UnrecognizedField {
            field: field.into().into(),
            operation: operation.into().into(),
        }))
    }

    /// Returns `true` if this error, or any error it wraps, is an
    /// unrecognized field error.
    pub fn is_unrecognized_field(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::UnrecognizedField(_)))
    }
}
