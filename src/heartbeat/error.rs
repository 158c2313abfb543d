// src/heartbeat/error.rs

/// A check identifier that cannot be resolved. Always an operator mistake,
/// so it aborts the dispatch instead of becoming a failed check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Check identifier \"{0}\" must have the form <module>.<callable>")]
    MissingSeparator(String),

    #[error("Error importing module {locator}: \"module not found\"")]
    ModuleNotFound { locator: String },

    #[error("Module \"{locator}\" does not define a \"{attribute}\" callable")]
    CallableNotDefined { locator: String, attribute: String },
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("check {name} faulted: {message}")]
    CheckFaulted { name: String, message: String },
}
