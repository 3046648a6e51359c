//! End-to-end join pipeline: tag, partition, group, join, emit.
//!
//! Partitioning is the barrier: every input record is routed to its bucket
//! before any bucket is processed. Buckets are then handled by independent
//! workers with no shared mutable state between them; within a bucket,
//! grouping and joining run sequentially because joining needs the total
//! view of the bucket's records.

use crate::emit::{emit_with_deadline, Emitter};
use crate::error::{JoinError, JoinResult};
use crate::group::group_bucket;
use crate::join::{JoinMode, Joiner};
use crate::partition::Partitioner;
use crate::tagger::{tag_line, TaggerConfig};
use crate::types::Bucket;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

/// Job-wide configuration, fixed at start. Nothing here mutates at
/// runtime; every component receives what it needs at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinConfig {
    /// Number of buckets records are hashed into.
    pub partitions: usize,

    /// Join mode applied to every key group.
    pub mode: JoinMode,

    pub tagger: TaggerConfig,

    /// Field count of left-table records when known up front. Only needed
    /// to null-fill the left side of a right-outer join for keys whose
    /// left side never appears.
    pub left_table_width: Option<usize>,

    /// Maximum buckets processed concurrently.
    pub max_parallel: usize,

    /// Deadline for a single emit call.
    #[serde(with = "humantime_serde")]
    pub emit_timeout: Duration,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            partitions: 8,
            mode: JoinMode::default(),
            tagger: TaggerConfig::default(),
            left_table_width: None,
            max_parallel: 4,
            emit_timeout: Duration::from_secs(30),
        }
    }
}

impl JoinConfig {
    pub fn validate(&self) -> JoinResult<()> {
        if self.partitions == 0 {
            return Err(JoinError::InvalidConfiguration {
                field: "partitions",
                reason: "partition count must be at least 1".to_string(),
            });
        }
        self.tagger.validate()?;
        if self.emit_timeout.is_zero() {
            return Err(JoinError::InvalidConfiguration {
                field: "emit-timeout",
                reason: "deadline must be non-zero".to_string(),
            });
        }
        Ok(())
    }

    /// Payload width of right-table records: total columns minus the key.
    fn right_payload_width(&self) -> usize {
        self.tagger.right_table_width - 1
    }
}

/// Final account of one run, reported to the operator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub records_in: usize,
    pub tagged: usize,
    pub skipped: usize,
    pub groups: usize,
    pub emitted: usize,
}

#[derive(Debug, Default)]
struct BucketStats {
    groups: usize,
    emitted: usize,
    skipped_records: usize,
}

/// Run the full pipeline over newline-delimited CSV input.
///
/// Record-level failures are skipped and logged to preserve throughput on
/// dirty input; a schema mismatch drops its key group; sink and deadline
/// failures abort the run.
pub async fn run_pipeline<R>(
    input: R,
    config: &JoinConfig,
    emitter: Arc<Mutex<dyn Emitter>>,
) -> JoinResult<RunSummary>
where
    R: AsyncBufRead + Unpin,
{
    config.validate()?;
    let partitioner = Partitioner::new(config.partitions)?;

    let mut buckets: Vec<Bucket> = vec![Bucket::default(); config.partitions];
    let mut summary = RunSummary::default();

    let mut lines = input.lines();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        summary.records_in += 1;
        match tag_line(&line, line_no, &config.tagger) {
            Ok(record) => {
                let index = partitioner.bucket_for(&record.join_key);
                buckets[index].records.push(record);
                summary.tagged += 1;
            }
            Err(e) if !e.is_fatal() => {
                warn!("skipping record: {}", e);
                summary.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    let occupied = buckets.iter().filter(|b| !b.records.is_empty()).count();
    info!(
        "partitioned {} records into {} of {} buckets (max parallel: {})",
        summary.tagged, occupied, config.partitions, config.max_parallel
    );

    // All records are routed; buckets can now run independently.
    let semaphore = Arc::new(Semaphore::new(config.max_parallel.max(1)));
    let mut workers = FuturesUnordered::new();
    let mut abort_handles = Vec::new();
    for (index, bucket) in buckets.into_iter().enumerate() {
        if bucket.records.is_empty() {
            continue;
        }
        let permit = semaphore.clone().acquire_owned().await.unwrap();
        let emitter = emitter.clone();
        let mode = config.mode;
        let left_width = config.left_table_width;
        let right_width = config.right_payload_width();
        let emit_timeout = config.emit_timeout;

        let handle = tokio::spawn(async move {
            let result = process_bucket(
                index,
                bucket,
                mode,
                left_width,
                right_width,
                emit_timeout,
                emitter,
            )
            .await;
            drop(permit);
            result
        });
        abort_handles.push(handle.abort_handle());
        workers.push(handle);
    }

    while let Some(joined) = workers.next().await {
        let stats = match joined {
            Ok(Ok(stats)) => stats,
            Ok(Err(e)) => {
                abort_workers(&mut workers, &abort_handles).await;
                return Err(e);
            }
            Err(e) => {
                abort_workers(&mut workers, &abort_handles).await;
                return Err(JoinError::Worker {
                    reason: e.to_string(),
                });
            }
        };
        summary.groups += stats.groups;
        summary.emitted += stats.emitted;
        summary.skipped += stats.skipped_records;
    }

    emitter.lock().await.flush().await?;
    Ok(summary)
}

/// Stop outstanding bucket workers and wait for every one to wind down.
/// A fatal error must abort the whole run: without the drain, detached
/// tasks would keep emitting into the shared sink after the caller has
/// already seen the failure.
async fn abort_workers(
    workers: &mut FuturesUnordered<JoinHandle<JoinResult<BucketStats>>>,
    abort_handles: &[AbortHandle],
) {
    for handle in abort_handles {
        handle.abort();
    }
    while workers.next().await.is_some() {}
}

/// Group and join one bucket, emitting as key groups complete. Key groups
/// come out in sorted-key order, so per-bucket output is deterministic.
async fn process_bucket(
    index: usize,
    bucket: Bucket,
    mode: JoinMode,
    left_width: Option<usize>,
    right_width: usize,
    emit_timeout: Duration,
    emitter: Arc<Mutex<dyn Emitter>>,
) -> JoinResult<BucketStats> {
    debug!("bucket {}: {} records", index, bucket.records.len());

    let mut joiner = Joiner::with_widths(mode, left_width, Some(right_width));
    let mut stats = BucketStats::default();

    for group in group_bucket(bucket) {
        let group_size = group.left.len() + group.right.len();
        match joiner.join_group(&group) {
            Ok(tuples) => {
                stats.groups += 1;
                let mut sink = emitter.lock().await;
                for tuple in &tuples {
                    emit_with_deadline(&mut *sink, tuple, emit_timeout).await?;
                }
                stats.emitted += tuples.len();
            }
            // The schema cannot be guessed, so the whole group is dropped
            // and its records counted against the run.
            Err(e @ JoinError::SchemaMismatch { .. }) => {
                warn!("bucket {}: dropping key group: {}", index, e);
                stats.skipped_records += group_size;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(stats)
}
