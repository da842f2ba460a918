//! User-facing failures and the bootstrap error boundary

use thiserror::Error;

/// An anticipated failure whose message is shown to the user as-is.
///
/// Bad spec files, missing font assets and unreadable scripts all end up
/// here. Anything else travelling through `anyhow` is treated as a bug.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UserError {
    pub message: String,
}

impl UserError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Build a [`UserError`] from format arguments.
#[macro_export]
macro_rules! user_error {
    ($($arg:tt)*) => {
        $crate::error::UserError::new(format!($($arg)*))
    };
}

/// Outcome of a failed run, split at the one place errors are caught.
#[derive(Debug, Error)]
pub enum Failure {
    /// Reported on the console; the process should exit with a non-zero code.
    #[error(transparent)]
    User(UserError),
    /// Not caught by the boundary; carries the full error chain.
    #[error(transparent)]
    Internal(anyhow::Error),
}

impl Failure {
    pub fn exit_code(&self) -> i32 {
        match self {
            Failure::User(_) => 1,
            Failure::Internal(_) => 2,
        }
    }
}

impl From<UserError> for Failure {
    fn from(err: UserError) -> Self {
        Failure::User(err)
    }
}

impl From<anyhow::Error> for Failure {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<UserError>() {
            Ok(user) => Failure::User(user),
            Err(other) => Failure::Internal(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn anyhow_wrapping_a_user_error_is_classified_as_user() {
        let err: anyhow::Error = user_error!("missing field: {}", "text").into();
        match Failure::from(err) {
            Failure::User(user) => assert_eq!(user.message, "missing field: text"),
            Failure::Internal(other) => panic!("expected user error, got {other:?}"),
        }
    }

    #[test]
    fn other_errors_stay_internal() {
        let failure = Failure::from(anyhow!("serializer exploded"));
        assert!(matches!(failure, Failure::Internal(_)));
        assert_eq!(failure.exit_code(), 2);
    }

    #[test]
    fn user_error_displays_only_its_message() {
        let err = UserError::new("no font asset for character 'Ω'");
        assert_eq!(err.to_string(), "no font asset for character 'Ω'");
        assert_eq!(Failure::from(err).exit_code(), 1);
    }
}
