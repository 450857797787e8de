// Error types for route compilation, matching and URL building

use thiserror::Error;

/// Result type for routing operations.
pub type RouteResult<T> = Result<T, RouteError>;

/// Routing errors.
///
/// A path that matches no route is not an error; matching returns `None`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("Invalid route template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("Duplicate variable '{variable}' in route template '{template}'")]
    DuplicateVariable { template: String, variable: String },

    #[error("Invalid regex for variable '{variable}' in route template '{template}': {message}")]
    InvalidRegex {
        template: String,
        variable: String,
        message: String,
    },

    /// A required variable had neither an argument nor a default.
    #[error("Missing argument '{argument}' to build route '{route}'")]
    MissingArgument { route: String, argument: String },

    /// The supplied value would not be matched back by the variable's regex.
    #[error("Value '{value}' for argument '{argument}' is not accepted by route '{route}'")]
    InvalidArgument {
        route: String,
        argument: String,
        value: String,
    },

    #[error("Route not found: {0}")]
    RouteNotFound(String),
}

impl RouteError {
    /// True for errors caused by the arguments given to a build call.
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            RouteError::MissingArgument { .. } | RouteError::InvalidArgument { .. }
        )
    }
}
