//! Batch conversion with bounded concurrency.
//!
//! Documents run concurrently under a semaphore sized from
//! `config.max_concurrent_jobs`. Each item carries its own outcome; one
//! failing (or panicking) document never affects the others. Results are
//! placed by input index, so output order always equals input order and
//! `items.len() == documents.len()` holds unconditionally.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::core::config::Config;
use crate::core::convert::{DocumentRequest, convert_request};
use crate::core::resolver::RawOptions;
use crate::types::Conversion;
use crate::{Any2mdError, Result};

/// Per-document batch outcome, in input order.
#[derive(Debug)]
pub struct BatchItem {
    pub index: usize,
    pub filename: String,
    pub outcome: Result<Conversion>,
}

/// Aggregate counters for a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub processing_time_ms: u64,
}

/// Full batch result: per-item outcomes plus the summary.
#[derive(Debug)]
pub struct BatchOutcome {
    pub items: Vec<BatchItem>,
    pub summary: BatchSummary,
}

/// Convert many documents concurrently.
///
/// Concurrency is bounded by [`Config::effective_concurrency`]. A document
/// that fails conversion yields an `Err` outcome for its index; a panicked
/// task yields `Internal`.
pub async fn batch_convert(
    documents: Vec<DocumentRequest>,
    global_options: Option<RawOptions>,
    config: Arc<Config>,
) -> BatchOutcome {
    let started = Instant::now();
    let total = documents.len();

    let semaphore = Arc::new(Semaphore::new(config.effective_concurrency().max(1)));
    let global_options = Arc::new(global_options);

    let mut join_set = JoinSet::new();
    let mut filenames = Vec::with_capacity(total);
    let mut index_by_task: HashMap<tokio::task::Id, usize> = HashMap::with_capacity(total);

    for (index, request) in documents.into_iter().enumerate() {
        filenames.push(request.filename.clone());
        let semaphore = Arc::clone(&semaphore);
        let config = Arc::clone(&config);
        let global_options = Arc::clone(&global_options);

        let handle = join_set.spawn(async move {
            // a closed semaphore cannot happen here; treat it as an error anyway
            let _permit = match semaphore.acquire().await {
                Ok(permit) => permit,
                Err(e) => {
                    return (
                        index,
                        Err(Any2mdError::Internal(format!("semaphore closed: {}", e))),
                    );
                }
            };
            let outcome = convert_request(&request, (*global_options).as_ref(), &config).await;
            (index, outcome)
        });
        index_by_task.insert(handle.id(), index);
    }

    let mut slots: Vec<Option<Result<Conversion>>> = (0..total).map(|_| None).collect();
    while let Some(joined) = join_set.join_next_with_id().await {
        match joined {
            Ok((_, (index, outcome))) => slots[index] = Some(outcome),
            Err(e) => {
                // the task id maps the panic back to its input index
                tracing::error!("Batch conversion task panicked: {}", e);
                if let Some(&index) = index_by_task.get(&e.id()) {
                    slots[index] = Some(Err(Any2mdError::Internal(format!("task panicked: {}", e))));
                }
            }
        }
    }

    let mut items = Vec::with_capacity(total);
    let mut successful = 0usize;
    for (index, slot) in slots.into_iter().enumerate() {
        let outcome =
            slot.unwrap_or_else(|| Err(Any2mdError::Internal("task produced no result".to_string())));
        if outcome.is_ok() {
            successful += 1;
        } else if let Err(e) = &outcome {
            tracing::error!(index, filename = %filenames[index], error = %e, "Batch item failed");
        }
        items.push(BatchItem {
            index,
            filename: filenames[index].clone(),
            outcome,
        });
    }

    let summary = BatchSummary {
        total,
        successful,
        failed: total - successful,
        processing_time_ms: started.elapsed().as_millis() as u64,
    };
    tracing::info!(
        total = summary.total,
        successful = summary.successful,
        failed = summary.failed,
        elapsed_ms = summary.processing_time_ms,
        "Batch conversion finished"
    );

    BatchOutcome { items, summary }
}
