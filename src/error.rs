use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuditError>;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Compliance catalog error ({path}): {message}")]
    Catalog { path: String, message: String },

    #[error("Failed to initialize AWS client: {0}")]
    Client(String),

    #[error("Unknown control: {0}")]
    UnknownControl(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AuditError {
    /// Process exit code for errors that abort the CLI. Control verdicts
    /// never reach this path; FAIL and NA both exit 0.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UnknownControl(_) => 64,
            _ => 2,
        }
    }
}
