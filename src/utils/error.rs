use thiserror::Error;

/// Failures turning element text into a price.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("no numeric pattern in '{text}'")]
    NoNumberFound { text: String },

    #[error("could not convert '{candidate}' to a price")]
    MalformedNumber { candidate: String },
}

/// Per-site extraction failures. These are captured into the batch's failure
/// map and never abort the surrounding cycle.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("request failed: {0}")]
    Fetch(String),

    #[error("page never exposed locator '{locator}' within {waited_ms}ms")]
    RenderTimeout { locator: String, waited_ms: u64 },

    #[error("invalid locator '{locator}'")]
    Selector { locator: String },

    #[error("locator '{locator}' matched nothing")]
    NoMatch { locator: String },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("all locators exhausted for {site}: {last}")]
    LocatorsExhausted { site: String, last: String },

    #[error("site check exceeded {budget_secs}s budget")]
    DeadlineExceeded { budget_secs: u64 },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("no sites configured")]
    NoSitesConfigured,

    #[error("a refresh cycle is already running")]
    SchedulerBusy,

    #[error("scheduler is shut down")]
    SchedulerStopped,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("mail error: {0}")]
    Mail(#[from] lettre::transport::smtp::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
