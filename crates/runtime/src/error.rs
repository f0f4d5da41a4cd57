use crate::model::ModelError;
use thiserror::Error;

/// Shown to the user when a run fails before or during planning.
pub const APOLOGY: &str =
    "Sorry, I ran into a problem while working on that. Please try again in a moment.";

/// Shown to the user when a run is cut off by the cycle bound.
pub const CYCLE_LIMIT_APOLOGY: &str =
    "Sorry, that request needed more steps than I'm allowed to take. Try breaking it into smaller requests.";

/// Fatal errors for one orchestration run.
///
/// Tool failures are deliberately absent: they are reported back to the
/// model as tool results and never end a run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("category selection failed: {0}")]
    Selection(#[source] ModelError),

    #[error("plan generation failed: {0}")]
    Planning(#[source] ModelError),

    #[error("model call failed: {0}")]
    Model(#[from] ModelError),

    #[error("execution exceeded {max_cycles} model cycles")]
    CycleLimit { max_cycles: usize },

    #[error("duplicate tool name: {0}")]
    DuplicateTool(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl Error {
    /// Text suitable for the end user.
    pub fn apology(&self) -> &'static str {
        match self {
            Self::CycleLimit { .. } => CYCLE_LIMIT_APOLOGY,
            _ => APOLOGY,
        }
    }
}

/// Errors from the external tool bridge.
///
/// Each one concerns a single provider; other providers stay usable.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to initialize tool provider {provider}: {source}")]
    Initialization {
        provider: String,
        #[source]
        source: mcp::Error,
    },

    #[error("unknown tool provider: {0}")]
    UnknownProvider(String),
}

impl BridgeError {
    /// The provider this error concerns.
    pub fn provider(&self) -> &str {
        match self {
            Self::Initialization { provider, .. } => provider,
            Self::UnknownProvider(provider) => provider,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
