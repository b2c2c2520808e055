//! CLI error types.

use std::path::PathBuf;

use tei2dts_build::BuildError;
use tei2dts_config::ConfigError;
use tei2dts_core::ConvertError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("cannot read {}: {source}", path.display())]
    Input {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0}")]
    Convert(#[from] ConvertError),

    #[error("{0}")]
    Build(#[from] BuildError),

    #[error("{0}")]
    Validation(String),
}
