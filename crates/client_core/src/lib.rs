use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use shared::{domain::Course, qpa::QpaSummary};
use tokio::{
    sync::{broadcast, Mutex, RwLock},
    task::JoinHandle,
};
use tracing::{debug, warn};

pub mod aggregator;
pub mod persistence;
pub mod store;

pub use aggregator::{Aggregator, HttpCalculator, RemoteCalculator};
pub use persistence::{CourseArchive, DEFAULT_SLOT_KEY};
pub use store::{
    CourseCommand, CourseStore, Effects, IdAllocator, StoreError, MAX_COURSE_ID,
};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The list changed in a way a view should redraw.
    CoursesChanged(Vec<Course>),
    TotalsUpdated(QpaSummary),
}

/// Wires the course store to persistence and the aggregator.
///
/// Commands are applied one at a time. Recalculations run as spawned tasks;
/// each is tagged with a sequence number and only the most recently issued
/// one may publish its totals.
pub struct QpaSession {
    store: Mutex<CourseStore>,
    archive: CourseArchive,
    aggregator: Aggregator,
    issued: AtomicU64,
    totals: RwLock<QpaSummary>,
    events: broadcast::Sender<SessionEvent>,
}

struct PendingCalculation {
    ticket: u64,
    courses: Vec<Course>,
}

impl QpaSession {
    pub async fn open(archive: CourseArchive, aggregator: Aggregator) -> Arc<Self> {
        let mut ids = IdAllocator::default();
        let courses = archive.load(&mut ids).await;
        Self::with_store(CourseStore::from_parts(courses, ids), archive, aggregator)
    }

    pub fn with_store(
        store: CourseStore,
        archive: CourseArchive,
        aggregator: Aggregator,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            store: Mutex::new(store),
            archive,
            aggregator,
            issued: AtomicU64::new(0),
            totals: RwLock::new(QpaSummary::zero()),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn courses(&self) -> Vec<Course> {
        self.store.lock().await.courses().to_vec()
    }

    pub async fn totals(&self) -> QpaSummary {
        *self.totals.read().await
    }

    /// Applies one command and runs the side effects it calls for.
    ///
    /// Returns the handle of the recalculation it started, if any. A failed
    /// save is logged and the in-memory change stands.
    pub async fn dispatch(
        self: &Arc<Self>,
        command: CourseCommand,
    ) -> Result<Option<JoinHandle<Option<QpaSummary>>>, StoreError> {
        let mut store = self.store.lock().await;
        let effects = store.apply(command)?;
        if effects.is_none() {
            return Ok(None);
        }

        if effects.render {
            let _ = self
                .events
                .send(SessionEvent::CoursesChanged(store.courses().to_vec()));
        }

        if effects.persist {
            if let Err(error) = self.archive.save(store.courses()).await {
                warn!(
                    slot = self.archive.key(),
                    error = %format!("{error:#}"),
                    "failed to save courses"
                );
            }
        }

        if !effects.recalculate {
            return Ok(None);
        }
        let pending = self.begin_calculation(&store);
        drop(store);

        let session = Arc::clone(self);
        Ok(Some(tokio::spawn(async move {
            session.finish_calculation(pending).await
        })))
    }

    /// Recomputes the totals in place. Returns `None` when a newer
    /// calculation was issued while this one was in flight.
    pub async fn recalculate(&self) -> Option<QpaSummary> {
        let pending = {
            let store = self.store.lock().await;
            self.begin_calculation(&store)
        };
        self.finish_calculation(pending).await
    }

    fn begin_calculation(&self, store: &CourseStore) -> PendingCalculation {
        PendingCalculation {
            ticket: self.issued.fetch_add(1, Ordering::SeqCst) + 1,
            courses: store.active_courses().cloned().collect(),
        }
    }

    async fn finish_calculation(&self, pending: PendingCalculation) -> Option<QpaSummary> {
        let summary = self.aggregator.calculate(&pending.courses).await;

        let mut totals = self.totals.write().await;
        let latest = self.issued.load(Ordering::SeqCst);
        if pending.ticket != latest {
            debug!(ticket = pending.ticket, latest, "discarding stale QPA result");
            return None;
        }
        *totals = summary;
        let _ = self.events.send(SessionEvent::TotalsUpdated(summary));
        Some(summary)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
