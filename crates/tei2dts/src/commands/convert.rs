//! Conversion of one TEI file into a DTS output tree.

use std::path::{Path, PathBuf};

use clap::Args;
use tei2dts_build::{BuildConfig, OutputAssembler, UrlScheme};
use tei2dts_config::{CliSettings, Config};
use tei2dts_core::{LeadingContent, NavigationMode, convert};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the conversion.
#[derive(Args)]
pub(crate) struct ConvertArgs {
    /// TEI XML input file.
    input: PathBuf,

    /// Navigation mode: hierarchical or flat (overrides config).
    #[arg(short, long)]
    mode: Option<NavigationMode>,

    /// Output directory (overrides config, default: ./dts).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Document identifier (default: input file name without extension).
    #[arg(long)]
    document_id: Option<String>,

    /// Prefix of generated unit identifiers (overrides config).
    #[arg(long)]
    id_prefix: Option<String>,

    /// Content before the first page break in flat mode: keep or drop.
    #[arg(long)]
    leading_content: Option<LeadingContent>,

    /// Base URL of the published API (overrides config).
    #[arg(long)]
    api_base: Option<String>,

    /// Document endpoint sub-path (overrides config, default: document).
    #[arg(long)]
    document_path: Option<String>,

    /// Navigation endpoint sub-path (overrides config, default: navigation).
    #[arg(long)]
    navigation_path: Option<String>,

    /// Path to configuration file (default: auto-discover tei2dts.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Replace an existing non-empty output directory.
    #[arg(short, long)]
    force: bool,
}

impl ConvertArgs {
    /// Execute the conversion.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, parsing, identifier assignment or
    /// writing fails. Nothing is written in that case.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let doc_id = match self.document_id {
            Some(id) => id,
            None => document_id_from_path(&self.input)?,
        };

        let cli_settings = CliSettings {
            mode: self.mode,
            id_prefix: self.id_prefix,
            leading_content: self.leading_content,
            output_dir: self.output_dir,
            api_base: self.api_base,
            document_path: self.document_path,
            navigation_path: self.navigation_path,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        if let Some(path) = &config.config_path {
            tracing::info!(config = %path.display(), "Loaded configuration");
        }

        let options = config.convert_options();
        output.info(&format!("Input: {}", self.input.display()));
        output.info(&format!("Mode: {}", options.mode));

        let source = std::fs::read_to_string(&self.input).map_err(|source| CliError::Input {
            path: self.input.clone(),
            source,
        })?;
        let conversion = convert(&source, &options)?;
        if conversion.navigation.is_empty() {
            output.warning(&format!(
                "No {} units found; only the whole document is published",
                options.mode
            ));
        }

        let resolved = &config.output_resolved;
        let assembler = OutputAssembler::new(BuildConfig {
            output_dir: resolved.dir.clone(),
            force: self.force,
            urls: UrlScheme::new(
                resolved.api_base.as_str(),
                resolved.document_path.as_str(),
                resolved.navigation_path.as_str(),
            ),
        });
        let report = assembler.assemble(&doc_id, &conversion)?;

        output.success(&format!(
            "Published {} units of '{doc_id}' ({} files) to {}",
            report.units,
            report.files,
            report.output_dir.display()
        ));
        Ok(())
    }
}

/// Document identifier derived from the input file stem.
fn document_id_from_path(path: &Path) -> Result<String, CliError> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| {
            CliError::Validation(format!(
                "cannot derive a document id from {}; use --document-id",
                path.display()
            ))
        })
}
