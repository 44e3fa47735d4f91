//! Bulk spreadsheet import of categories and products.
//!
//! # Pipeline
//!
//! 1. Read the first worksheet and check the required headers.
//! 2. Validate every row against the store's current catalog, collecting
//!    all errors instead of stopping at the first one.
//! 3. Send the rows that passed to the backend in fixed-size concurrent
//!    batches. A row whose key matches an existing entity is updated,
//!    anything else is created.
//!
//! There is no rollback: rows that succeed stay applied when others fail,
//! and the [`ImportReport`] says which rows need fixing.

pub mod categories;
pub mod products;
pub mod sheet;

use std::collections::BTreeSet;

use kawn_core::{CategoryId, ProductId};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

use crate::api::{ApiError, CategoryInput, MerchantApi, MerchantToken, ProductInput};
use crate::batch::in_batches;

pub use sheet::{RowView, Sheet, write_sheet};

/// Failures that stop an import before any row is sent.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The upload is not a readable workbook.
    #[error("Could not read spreadsheet: {0}")]
    Unreadable(#[from] calamine::Error),

    /// The workbook has no worksheets.
    #[error("Spreadsheet has no worksheets")]
    NoWorksheet,

    /// The first worksheet has no header row.
    #[error("Spreadsheet has no header row")]
    Empty,

    /// Required headers are absent.
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// The upload exceeds the size limit.
    #[error("File exceeds the {0} byte limit")]
    TooLarge(usize),

    /// Rendering the error report failed.
    #[error("Could not write spreadsheet: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    /// Loading the current catalog failed.
    #[error("Backend error: {0}")]
    Backend(#[from] ApiError),
}

impl ImportError {
    /// Whether the problem is with the uploaded file rather than the service.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        match self {
            Self::Unreadable(_)
            | Self::NoWorksheet
            | Self::Empty
            | Self::MissingColumns(_)
            | Self::TooLarge(_) => true,
            Self::Backend(err) => err.is_client_error(),
            Self::Write(_) => false,
        }
    }
}

/// One problem with one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    /// Sheet row number (the first data row is 2).
    pub row: usize,
    /// Column at fault, when the problem is a single cell.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub message: String,
}

impl RowError {
    pub(crate) fn cell(row: usize, column: &str, message: impl Into<String>) -> Self {
        Self {
            row,
            column: Some(column.to_string()),
            message: message.into(),
        }
    }

    pub(crate) fn row(row: usize, message: impl Into<String>) -> Self {
        Self {
            row,
            column: None,
            message: message.into(),
        }
    }
}

/// Outcome of an import.
///
/// `total == succeeded + failed`, and `succeeded == created + updated`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub created: usize,
    pub updated: usize,
    /// Sorted by row.
    pub errors: Vec<RowError>,
}

impl ImportReport {
    /// Whether every row was applied.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.failed == 0
    }

    /// Render the errors as a downloadable workbook (`Row, Column, Error`).
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Write`] if the workbook cannot be built.
    pub fn to_xlsx(&self) -> Result<Vec<u8>, ImportError> {
        let rows: Vec<Vec<String>> = self
            .errors
            .iter()
            .map(|e| {
                vec![
                    e.row.to_string(),
                    e.column.clone().unwrap_or_default(),
                    e.message.clone(),
                ]
            })
            .collect();
        Ok(write_sheet("Errors", &["Row", "Column", "Error"], &rows)?)
    }
}

// =============================================================================
// Planning
// =============================================================================

/// A backend write for one validated row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Operation {
    CreateCategory(CategoryInput),
    UpdateCategory(CategoryId, CategoryInput),
    CreateProduct(ProductInput),
    UpdateProduct(ProductId, ProductInput),
}

impl Operation {
    const fn is_update(&self) -> bool {
        matches!(self, Self::UpdateCategory(..) | Self::UpdateProduct(..))
    }

    async fn apply(&self, api: &dyn MerchantApi, token: &MerchantToken) -> Result<(), ApiError> {
        match self {
            Self::CreateCategory(input) => api.create_category(token, input).await.map(drop),
            Self::UpdateCategory(id, input) => {
                api.update_category(token, *id, input).await.map(drop)
            }
            Self::CreateProduct(input) => api.create_product(token, input).await.map(drop),
            Self::UpdateProduct(id, input) => api.update_product(token, *id, input).await.map(drop),
        }
    }
}

/// A row that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlannedRow {
    pub row: usize,
    pub operation: Operation,
}

/// Validation result for a whole sheet.
#[derive(Debug, Default)]
pub(crate) struct Plan {
    pub rows: Vec<PlannedRow>,
    pub errors: Vec<RowError>,
}

/// Case-insensitive match of a spreadsheet reference against an entity's
/// name, Arabic name or slug.
pub(crate) fn matches_label(label: &str, candidates: &[Option<&str>]) -> bool {
    let label = label.trim().to_lowercase();
    candidates
        .iter()
        .flatten()
        .any(|candidate| candidate.trim().to_lowercase() == label)
}

// =============================================================================
// Importer
// =============================================================================

/// Runs imports for one merchant.
pub struct Importer<'a> {
    api: &'a dyn MerchantApi,
    token: &'a MerchantToken,
    batch_size: usize,
}

impl<'a> Importer<'a> {
    #[must_use]
    pub fn new(api: &'a dyn MerchantApi, token: &'a MerchantToken, batch_size: usize) -> Self {
        Self {
            api,
            token,
            batch_size,
        }
    }

    /// Import categories (`Name, NameAr, Description, DescriptionAr, Slug, Parent`).
    ///
    /// # Errors
    ///
    /// Returns [`ImportError`] if the file is unreadable, lacks required
    /// columns, or the current categories cannot be loaded. Per-row problems
    /// are reported in the [`ImportReport`] instead.
    #[instrument(skip_all, fields(bytes = bytes.len()))]
    pub async fn import_categories(&self, bytes: &[u8]) -> Result<ImportReport, ImportError> {
        let sheet = Sheet::read(bytes)?;
        sheet.require_columns(categories::REQUIRED_COLUMNS)?;
        let existing = self.api.list_categories(self.token).await?;
        let plan = categories::plan(&sheet, &existing);
        Ok(self.execute(sheet.len(), plan).await)
    }

    /// Import products (`Name, NameAr, Description, DescriptionAr, SKU,
    /// Price, Stock, Category, Brand, Active`).
    ///
    /// # Errors
    ///
    /// Same as [`Importer::import_categories`].
    #[instrument(skip_all, fields(bytes = bytes.len()))]
    pub async fn import_products(&self, bytes: &[u8]) -> Result<ImportReport, ImportError> {
        let sheet = Sheet::read(bytes)?;
        sheet.require_columns(products::REQUIRED_COLUMNS)?;
        let (existing, categories, brands) = futures::try_join!(
            self.api.list_products(self.token),
            self.api.list_categories(self.token),
            self.api.list_brands(self.token),
        )?;
        let plan = products::plan(
            &sheet,
            &products::Catalog {
                products: &existing,
                categories: &categories,
                brands: &brands,
            },
        );
        Ok(self.execute(sheet.len(), plan).await)
    }

    /// Send validated rows and fold everything into a report.
    async fn execute(&self, total: usize, plan: Plan) -> ImportReport {
        let Plan { rows, mut errors } = plan;

        let results = in_batches(&rows, self.batch_size, |planned| {
            planned.operation.apply(self.api, self.token)
        })
        .await;

        let mut report = ImportReport {
            total,
            ..ImportReport::default()
        };
        for (planned, result) in rows.iter().zip(results) {
            match result {
                Ok(()) if planned.operation.is_update() => report.updated += 1,
                Ok(()) => report.created += 1,
                Err(err) => {
                    tracing::warn!(row = planned.row, error = %err, "Import row failed");
                    errors.push(RowError::row(planned.row, err.public_message()));
                }
            }
        }

        errors.sort_by_key(|e| e.row);
        report.succeeded = report.created + report.updated;
        report.failed = errors.iter().map(|e| e.row).collect::<BTreeSet<_>>().len();
        report.errors = errors;

        info!(
            total = report.total,
            created = report.created,
            updated = report.updated,
            failed = report.failed,
            "Import finished"
        );
        report
    }
}
