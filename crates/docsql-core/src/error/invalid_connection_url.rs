use super::Error;

/// The configured connection URL is unusable.
#[derive(Debug)]
pub(super) struct InvalidConnectionUrl {
    pub(super) reason: Box<str>,
}

impl std::error::Error for InvalidConnectionUrl {}

impl core::fmt::Display for InvalidConnectionUrl {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "connection URL {}", self.reason)
    }
}

impl Error {
    pub fn invalid_connection_url(reason: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::InvalidConnectionUrl(InvalidConnectionUrl {
            reason: reason.into().into(),
        }))
    }

    /// Connection setup failed before reaching the server.
    pub fn is_invalid_connection_url(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::InvalidConnectionUrl(_)))
    }
}
