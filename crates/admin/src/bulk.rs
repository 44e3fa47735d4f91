//! Bulk delete.

use kawn_core::{CategoryId, ProductId};
use serde::Serialize;
use tracing::instrument;

use crate::api::{ApiError, MerchantApi, MerchantToken};
use crate::batch::in_batches;

/// One ID the backend refused to delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteFailure {
    pub id: i64,
    pub message: String,
}

/// Outcome of a bulk delete. Failures never undo successful deletes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkDeleteReport {
    pub total: usize,
    pub deleted: usize,
    pub failed: Vec<DeleteFailure>,
}

/// Delete categories in batches.
#[instrument(skip(api, token, ids), fields(count = ids.len()))]
pub async fn delete_categories(
    api: &dyn MerchantApi,
    token: &MerchantToken,
    ids: &[i64],
    batch_size: usize,
) -> BulkDeleteReport {
    let ids = unique(ids);
    let results = in_batches(&ids, batch_size, |id| {
        api.delete_category(token, CategoryId::new(*id))
    })
    .await;
    report(&ids, results)
}

/// Delete products in batches.
#[instrument(skip(api, token, ids), fields(count = ids.len()))]
pub async fn delete_products(
    api: &dyn MerchantApi,
    token: &MerchantToken,
    ids: &[i64],
    batch_size: usize,
) -> BulkDeleteReport {
    let ids = unique(ids);
    let results = in_batches(&ids, batch_size, |id| {
        api.delete_product(token, ProductId::new(*id))
    })
    .await;
    report(&ids, results)
}

/// Drop repeated IDs, keeping first-seen order.
fn unique(ids: &[i64]) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

fn report(ids: &[i64], results: Vec<Result<(), ApiError>>) -> BulkDeleteReport {
    let failed: Vec<DeleteFailure> = ids
        .iter()
        .zip(results)
        .filter_map(|(id, result)| {
            result.err().map(|err| {
                tracing::warn!(id, error = %err, "Delete failed");
                DeleteFailure {
                    id: *id,
                    message: err.public_message(),
                }
            })
        })
        .collect();
    BulkDeleteReport {
        total: ids.len(),
        deleted: ids.len() - failed.len(),
        failed,
    }
}
