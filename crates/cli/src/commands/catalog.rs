//! Headless spreadsheet import and export.
//!
//! # Usage
//!
//! ```bash
//! # Import products, writing failed rows to a workbook
//! kawn import products catalog.xlsx --errors errors.xlsx
//!
//! # Export every category
//! kawn export categories --out categories.xlsx
//! ```
//!
//! # Environment Variables
//!
//! - `KAWN_API_URL` - Backend base URL
//! - `KAWN_MERCHANT_TOKEN` - Merchant bearer token (or `--token`)
//! - `IMPORT_BATCH_SIZE`, `IMPORT_MAX_BYTES` - Same limits as the admin service

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use kawn_admin::api::{ApiError, BackendClient, MerchantToken};
use kawn_admin::config::{BackendApiConfig, ConfigError, ImportConfig};
use kawn_admin::export::{self, ExportError};
use kawn_admin::import::{ImportError, ImportReport, Importer};
use thiserror::Error;

/// Entity a spreadsheet holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Entity {
    Categories,
    Products,
}

impl Entity {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::Products => "products",
        }
    }
}

/// Errors that can occur during catalog commands.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend error: {0}")]
    Api(#[from] ApiError),

    #[error("Import failed: {0}")]
    Import(#[from] ImportError),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} row(s) failed")]
    RowsFailed(usize),
}

/// Import a spreadsheet through the backend and print the report.
///
/// # Errors
///
/// Returns an error if the file cannot be read or processed, and
/// [`CatalogError::RowsFailed`] when some rows were rejected.
pub async fn import(
    entity: Entity,
    file: &Path,
    token: &MerchantToken,
    errors_out: Option<&Path>,
) -> Result<ImportReport, CatalogError> {
    let _ = dotenvy::dotenv();
    let limits = ImportConfig::from_env()?;
    let client = BackendClient::new(&BackendApiConfig::from_env()?)?;

    let bytes = tokio::fs::read(file).await?;
    if bytes.len() > limits.max_bytes {
        return Err(ImportError::TooLarge(limits.max_bytes).into());
    }

    tracing::info!(file = %file.display(), entity = entity.as_str(), "Importing...");
    let importer = Importer::new(&client, token, limits.batch_size);
    let report = match entity {
        Entity::Categories => importer.import_categories(&bytes).await?,
        Entity::Products => importer.import_products(&bytes).await?,
    };

    tracing::info!(
        total = report.total,
        created = report.created,
        updated = report.updated,
        failed = report.failed,
        "Import finished"
    );
    for error in &report.errors {
        tracing::warn!(
            row = error.row,
            column = error.column.as_deref().unwrap_or("-"),
            "{}",
            error.message
        );
    }

    if report.is_clean() {
        return Ok(report);
    }
    if let Some(path) = errors_out {
        tokio::fs::write(path, report.to_xlsx()?).await?;
        tracing::info!(path = %path.display(), "Error report written");
    }
    Err(CatalogError::RowsFailed(report.failed))
}

/// Export every entity of a kind to an `.xlsx` file.
///
/// Returns the path written.
///
/// # Errors
///
/// Returns an error if the backend call fails or the file cannot be written.
pub async fn export(
    entity: Entity,
    token: &MerchantToken,
    out: Option<PathBuf>,
) -> Result<PathBuf, CatalogError> {
    let _ = dotenvy::dotenv();
    let client = BackendClient::new(&BackendApiConfig::from_env()?)?;

    let bytes = match entity {
        Entity::Categories => export::export_categories(&client, token).await?,
        Entity::Products => export::export_products(&client, token).await?,
    };

    let path = out.unwrap_or_else(|| default_export_path(entity));
    tokio::fs::write(&path, bytes).await?;
    tracing::info!(path = %path.display(), "Export written");
    Ok(path)
}

fn default_export_path(entity: Entity) -> PathBuf {
    PathBuf::from(format!("{}.xlsx", entity.as_str()))
}
