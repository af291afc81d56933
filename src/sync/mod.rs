//! Background write-back.
//!
//! Lookups never wait on the cache. After a live fetch the source selector
//! hands the bundle to [`BackgroundTasks`], which runs one of two detached jobs:
//! 1. Reconcile an existing member from the bundle ([`reconcile`])
//! 2. Provision clan + member rows for a first-seen player ([`provision`])
//!
//! Job failures are logged and dropped; nothing reaches the request.

pub mod provision;
pub mod reconcile;

pub use provision::{provision, ProvisionOutcome};
pub use reconcile::{reconcile, ReconcileReport};

use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, info_span, warn, Instrument};

use crate::models::{MemberId, PlayerBundle};
use crate::storage::CacheStore;

/// Default bound on concurrently running background jobs.
pub const DEFAULT_MAX_CONCURRENT_TASKS: usize = 8;

struct Inner {
    store: Arc<dyn CacheStore>,
    tasks: Mutex<JoinSet<()>>,
    permits: Arc<Semaphore>,
}

/// Detached task runner for reconciliation and provisioning.
///
/// Spawning never blocks. At most `max_concurrent` jobs touch the store at
/// once; the rest wait for a permit inside their own task.
#[derive(Clone)]
pub struct BackgroundTasks {
    inner: Arc<Inner>,
}

impl BackgroundTasks {
    pub fn new(store: Arc<dyn CacheStore>, max_concurrent: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                tasks: Mutex::new(JoinSet::new()),
                permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            }),
        }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.inner.store
    }

    /// Number of jobs spawned and not yet reaped.
    pub fn pending(&self) -> usize {
        self.inner
            .tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn spawn<F>(&self, job: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let permits = self.inner.permits.clone();
        let mut tasks = self
            .inner
            .tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Reap finished jobs so the set does not grow without bound.
        while let Some(result) = tasks.try_join_next() {
            log_join(result);
        }

        tasks.spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    warn!("Background task runner closed, dropping job");
                    return;
                }
            };
            job.await;
        });
    }

    /// Reconcile an existing member from a freshly fetched bundle.
    pub fn spawn_reconcile(&self, member_id: MemberId, bundle: PlayerBundle) {
        let store = self.inner.store.clone();
        let span = info_span!("background", task = "reconcile", member_id = %member_id);

        self.spawn(
            async move {
                let report = reconcile(store.as_ref(), &member_id, &bundle).await;
                if report.is_complete() {
                    info!(
                        matches = report.matches_written.unwrap_or(0),
                        mode_stats = report.mode_stats_written.unwrap_or(0),
                        "Reconciled member"
                    );
                } else {
                    warn!(failures = ?report.failures, "Reconciliation finished with failures");
                }
            }
            .instrument(span),
        );
    }

    /// Create clan and member rows for a first-seen player, then reconcile.
    pub fn spawn_provision(&self, bundle: PlayerBundle) {
        let tasks = self.clone();
        let span = info_span!(
            "background",
            task = "provision",
            shard = %bundle.profile.shard,
            nickname = %bundle.profile.nickname
        );

        self.spawn(
            async move {
                let store = tasks.store().clone();
                match provision(store.as_ref(), &tasks, bundle).await {
                    Ok(outcome) => info!(
                        clan_id = %outcome.clan.id,
                        member_id = %outcome.member.id,
                        created = outcome.member_created,
                        "Provisioned player"
                    ),
                    Err(e) => error!("Provisioning failed: {}", e),
                }
            }
            .instrument(span),
        );
    }

    /// Wait until every spawned job, including jobs spawned by jobs, has finished.
    pub async fn wait_idle(&self) {
        loop {
            let mut drained = {
                let mut tasks = self
                    .inner
                    .tasks
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                std::mem::take(&mut *tasks)
            };

            if drained.is_empty() {
                return;
            }

            while let Some(result) = drained.join_next().await {
                log_join(result);
            }
        }
    }
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        error!("Background task panicked: {}", e);
    }
}
