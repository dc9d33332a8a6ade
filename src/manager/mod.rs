//! Coordination of the mirrors of one artifact
//!
//! The manager initializes every mirror concurrently, keeps only the mirrors
//! that agree on the newest version, ranks them by speed and downloads from
//! the fastest one, falling back to the next mirror whenever a download or
//! its verification fails. A mirror that fails once is dropped for the rest
//! of the run, so the list only shrinks.
//!
//! # Modules
//!
//! - [`error`]: `NoMirrors` aggregate error

pub mod error;

use std::path::Path;
use std::time::Duration;

use futures::future::{BoxFuture, join_all};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::FETCH_STAGGER_DELAY_MS;
use crate::fetch::FetchSession;
use crate::mirror::{Mirror, MirrorError};
use crate::version::Version;

pub use error::{ManagerError, MirrorFailure};

struct Entry {
    id: usize,
    mirror: Mirror,
}

/// Surviving mirrors of one artifact, fastest first
pub struct MirrorManager {
    entries: Vec<Entry>,
    session: FetchSession,
}

impl MirrorManager {
    /// Initialize `mirrors`, keep those serving the latest version and rank
    /// them by speed.
    pub async fn new(mirrors: Vec<Mirror>, session: FetchSession) -> Result<Self, ManagerError> {
        let mut manager = Self::unresolved(mirrors, session);
        if manager.entries.is_empty() {
            return Err(ManagerError::NoMirrors {
                operation: "initialize".to_string(),
                failures: Vec::new(),
            });
        }

        manager.initialize_all().await?;
        manager.filter_to_latest_version().await?;
        manager.rank_by_speed();

        if let Some(mirror) = manager.current_mirror() {
            info!(
                "Selected {} for version {} ({} mirror(s) left)",
                mirror.url(),
                mirror.version().map(ToString::to_string).unwrap_or_default(),
                manager.len()
            );
        }
        Ok(manager)
    }

    /// Manager over mirrors that have not been initialized yet
    fn unresolved(mirrors: Vec<Mirror>, session: FetchSession) -> Self {
        let entries = mirrors
            .into_iter()
            .enumerate()
            .map(|(id, mirror)| Entry { id, mirror })
            .collect();
        Self { entries, session }
    }

    /// Fastest surviving mirror
    pub fn current_mirror(&self) -> Option<&Mirror> {
        self.entries.first().map(|entry| &entry.mirror)
    }

    /// Surviving mirrors in speed order
    pub fn mirrors(&self) -> impl Iterator<Item = &Mirror> {
        self.entries.iter().map(|entry| &entry.mirror)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Version every surviving mirror agrees on
    pub fn version(&self) -> Option<&Version> {
        self.current_mirror().and_then(Mirror::version)
    }

    pub fn session(&self) -> &FetchSession {
        &self.session
    }

    /// Run `op` on each mirror of a snapshot of the current list.
    ///
    /// A mirror whose operation fails, or reports `false` when
    /// `treat_false_as_failure` is set, is removed from the live list. With
    /// `stop_after_first_success` the pass ends at the first success.
    pub async fn try_for_all<F>(
        &mut self,
        operation: &str,
        mut op: F,
        stop_after_first_success: bool,
        treat_false_as_failure: bool,
    ) -> Result<(), ManagerError>
    where
        F: for<'a> FnMut(&'a mut Mirror) -> BoxFuture<'a, Result<bool, MirrorError>>,
    {
        let snapshot: Vec<usize> = self.entries.iter().map(|entry| entry.id).collect();
        let mut failures = Vec::new();

        for id in snapshot {
            let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) else {
                continue;
            };

            let outcome = match op(&mut entry.mirror).await {
                Ok(false) if treat_false_as_failure => Err(MirrorError::Rejected(operation.to_string())),
                Ok(_) => Ok(()),
                Err(error) => Err(error),
            };

            match outcome {
                Ok(()) => {
                    debug!("{} succeeded on {}", operation, entry.mirror.url());
                    if stop_after_first_success {
                        break;
                    }
                }
                Err(error) => failures.push(self.drop_mirror(id, error)),
            }
        }

        self.ensure_not_empty(operation, failures)
    }

    /// Initialize every mirror concurrently with staggered starts
    pub async fn initialize_all(&mut self) -> Result<(), ManagerError> {
        let session = self.session.clone();
        let futures = self.entries.iter_mut().enumerate().map(|(i, entry)| {
            let delay = Duration::from_millis(FETCH_STAGGER_DELAY_MS * i as u64);
            let session = &session;
            async move {
                sleep(delay).await;
                (entry.id, entry.mirror.initialize(session).await)
            }
        });
        let results = join_all(futures).await;

        let failures = results
            .into_iter()
            .filter_map(|(id, result)| result.err().map(|error| self.drop_mirror(id, error)))
            .collect();

        self.ensure_not_empty("initialize", failures)
    }

    /// Drop every mirror whose version differs from the newest one seen
    pub async fn filter_to_latest_version(&mut self) -> Result<(), ManagerError> {
        let Some(latest) = self.entries.iter().filter_map(|entry| entry.mirror.version()).max().cloned() else {
            return Ok(());
        };
        debug!("Latest version is {}", latest);

        self.try_for_all(
            "filter to latest version",
            move |mirror| {
                let latest = latest.clone();
                Box::pin(async move {
                    match mirror.version() {
                        Some(version) if *version == latest => Ok(true),
                        Some(version) => Err(MirrorError::StaleVersion {
                            found: version.to_string(),
                            latest: latest.to_string(),
                        }),
                        None => Err(MirrorError::NotInitialized(mirror.url().to_string())),
                    }
                })
            },
            false,
            true,
        )
        .await
    }

    /// Order surviving mirrors by descending speed; ties keep their order
    pub fn rank_by_speed(&mut self) {
        self.entries.sort_by(|a, b| match (b.mirror.speed(), a.mirror.speed()) {
            (Some(b), Some(a)) => b.total_cmp(&a),
            (b, a) => b.is_some().cmp(&a.is_some()),
        });
    }

    /// Download to `target` from the fastest mirror that succeeds.
    ///
    /// Each failing mirror is dropped before the next one is tried.
    pub async fn attempt_download(&mut self, target: &Path) -> Result<(), ManagerError> {
        let target = target.to_path_buf();
        let session = self.session.clone();

        self.try_for_all(
            "download",
            move |mirror| {
                let target = target.clone();
                let session = session.clone();
                Box::pin(async move {
                    info!("Downloading {} from {}", target.display(), mirror.url());
                    mirror.download_and_verify(&target, &session).await.map(|()| true)
                })
            },
            true,
            true,
        )
        .await
    }

    fn drop_mirror(&mut self, id: usize, error: MirrorError) -> MirrorFailure {
        let url = match self.entries.iter().position(|entry| entry.id == id) {
            Some(index) => self.entries.remove(index).mirror.url().to_string(),
            None => String::new(),
        };
        warn!("Dropping mirror {}: {}", url, error);
        MirrorFailure { url, error }
    }

    fn ensure_not_empty(&self, operation: &str, failures: Vec<MirrorFailure>) -> Result<(), ManagerError> {
        if self.entries.is_empty() {
            Err(ManagerError::NoMirrors {
                operation: operation.to_string(),
                failures,
            })
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for MirrorManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorManager")
            .field("mirrors", &self.mirrors().collect::<Vec<_>>())
            .finish()
    }
}
