use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod alert;
pub mod batch;
pub mod history;
pub mod observation;
pub mod site;

// Re-exports for convenience
pub use alert::*;
pub use batch::*;
pub use history::*;
pub use observation::*;
pub use site::*;

/// How a site's page content is retrieved.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Single HTTP GET, no script execution.
    #[default]
    Static,
    /// Browser-automation session that executes page scripts.
    Rendered,
}

/// Which configured locator produced an observation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LocatorSource {
    Primary,
    Backup,
}

impl std::fmt::Display for FetchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchMode::Static => write!(f, "static"),
            FetchMode::Rendered => write!(f, "rendered"),
        }
    }
}

impl std::fmt::Display for LocatorSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocatorSource::Primary => write!(f, "primary"),
            LocatorSource::Backup => write!(f, "backup"),
        }
    }
}

pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}
