use super::*;
use anyhow::{bail, Result};
use async_trait::async_trait;
use shared::{
    domain::{CourseId, Grade},
    protocol::CalculateQpaRequest,
};
use std::sync::atomic::AtomicUsize;
use storage::{SlotStore, Storage};
use tokio::sync::Notify;

/// Holds back any request that contains a one-unit course until released.
struct GatedCalculator {
    gate: Notify,
    calls: AtomicUsize,
}

impl GatedCalculator {
    fn new() -> Self {
        Self {
            gate: Notify::new(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RemoteCalculator for GatedCalculator {
    async fn calculate(&self, request: &CalculateQpaRequest) -> Result<QpaSummary> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if request.entries().any(|(units, _)| units == 1) {
            self.gate.notified().await;
        }
        Ok(shared::qpa::calculate(request.entries()).summary)
    }
}

struct UnavailableSlotStore;

#[async_trait]
impl SlotStore for UnavailableSlotStore {
    async fn read_slot(&self, _name: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn write_slot(&self, _name: &str, _value: &str) -> Result<()> {
        bail!("quota exceeded")
    }

    async fn clear_slot(&self, _name: &str) -> Result<bool> {
        Ok(false)
    }
}

async fn open_session(aggregator: Aggregator) -> (Arc<QpaSession>, CourseArchive) {
    let storage = Arc::new(Storage::new("sqlite::memory:").await.expect("db"));
    let archive = CourseArchive::with_default_key(storage);
    let session = QpaSession::open(archive.clone(), aggregator).await;
    (session, archive)
}

async fn ids_of(session: &QpaSession) -> Vec<CourseId> {
    session
        .courses()
        .await
        .into_iter()
        .map(|course| course.id)
        .collect()
}

#[tokio::test]
async fn opening_an_empty_archive_starts_from_the_seed() {
    let (session, _archive) = open_session(Aggregator::local_only()).await;
    let courses = session.courses().await;
    assert_eq!(courses.len(), 2);
    assert_eq!(session.totals().await, QpaSummary::zero());

    let mut events = session.subscribe();
    let totals = session.recalculate().await.expect("latest");
    assert_eq!(totals.qpa, 4.0);
    assert_eq!(totals.total_units, 24);
    assert_eq!(session.totals().await, totals);
    assert_eq!(
        events.recv().await.expect("event"),
        SessionEvent::TotalsUpdated(totals)
    );
}

#[tokio::test]
async fn add_renders_persists_and_recalculates() {
    let (session, archive) = open_session(Aggregator::local_only()).await;
    let mut events = session.subscribe();

    let handle = session
        .dispatch(CourseCommand::Add)
        .await
        .expect("dispatch")
        .expect("recalculation started");
    let totals = handle.await.expect("join").expect("latest");
    assert_eq!(totals.total_units, 36);

    match events.recv().await.expect("event") {
        SessionEvent::CoursesChanged(courses) => assert_eq!(courses.len(), 3),
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(
        events.recv().await.expect("event"),
        SessionEvent::TotalsUpdated(totals)
    );

    let saved = archive.load(&mut IdAllocator::default()).await;
    assert_eq!(saved, session.courses().await);
}

#[tokio::test]
async fn code_edits_persist_without_recalculating() {
    let (session, archive) = open_session(Aggregator::local_only()).await;
    let id = ids_of(&session).await[0];

    let handle = session
        .dispatch(CourseCommand::SetCode(id, "15-213".into()))
        .await
        .expect("dispatch");
    assert!(handle.is_none());

    let saved = archive.load(&mut IdAllocator::default()).await;
    assert_eq!(saved[0].code, "15-213");
}

#[tokio::test]
async fn reorder_persists_new_order() {
    let (session, archive) = open_session(Aggregator::local_only()).await;
    let ids = ids_of(&session).await;
    let mut events = session.subscribe();

    let handle = session
        .dispatch(CourseCommand::Reorder(ids[1], 0))
        .await
        .expect("dispatch");
    assert!(handle.is_none());
    assert!(matches!(
        events.recv().await.expect("event"),
        SessionEvent::CoursesChanged(_)
    ));

    let saved: Vec<CourseId> = archive
        .load(&mut IdAllocator::default())
        .await
        .into_iter()
        .map(|course| course.id)
        .collect();
    assert_eq!(saved, vec![ids[1], ids[0]]);
}

#[tokio::test]
async fn unknown_grade_is_reported_and_changes_nothing() {
    let (session, archive) = open_session(Aggregator::local_only()).await;
    let id = ids_of(&session).await[0];
    session
        .dispatch(CourseCommand::SetCode(id, "saved".into()))
        .await
        .expect("dispatch");

    let err = session
        .dispatch(CourseCommand::SetGrade(id, "Z".into()))
        .await
        .expect_err("must reject");
    assert!(matches!(err, StoreError::UnknownGrade(_)));
    assert_eq!(session.courses().await[0].grade, Grade::A);
    assert_eq!(
        archive.load(&mut IdAllocator::default()).await[0].grade,
        Grade::A
    );
}

#[tokio::test]
async fn commands_for_missing_ids_do_nothing() {
    let (session, _archive) = open_session(Aggregator::local_only()).await;
    let before = session.courses().await;
    let handle = session
        .dispatch(CourseCommand::Remove(CourseId(1)))
        .await
        .expect("dispatch");
    assert!(handle.is_none());
    assert_eq!(session.courses().await, before);
}

#[tokio::test]
async fn failed_saves_keep_the_in_memory_change() {
    let archive = CourseArchive::with_default_key(Arc::new(UnavailableSlotStore));
    let session = QpaSession::open(archive, Aggregator::local_only()).await;

    let handle = session
        .dispatch(CourseCommand::Add)
        .await
        .expect("dispatch survives save failure")
        .expect("recalculation started");
    assert_eq!(session.courses().await.len(), 3);
    assert_eq!(
        handle.await.expect("join").expect("latest").total_units,
        36
    );
}

#[tokio::test]
async fn stale_results_are_discarded() {
    let remote = Arc::new(GatedCalculator::new());
    let (session, _archive) = open_session(Aggregator::new(remote.clone())).await;
    let ids = ids_of(&session).await;

    let slow = session
        .dispatch(CourseCommand::SetUnits(ids[0], 1))
        .await
        .expect("dispatch")
        .expect("recalculation started");
    let fast = session
        .dispatch(CourseCommand::SetUnits(ids[0], 6))
        .await
        .expect("dispatch")
        .expect("recalculation started");

    let latest = fast.await.expect("join").expect("latest result applies");
    assert_eq!(latest.total_units, 18);

    remote.gate.notify_one();
    assert_eq!(slow.await.expect("join"), None);
    assert_eq!(session.totals().await, latest);
    assert_eq!(remote.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn deactivating_everything_zeroes_the_totals() {
    let (session, _archive) = open_session(Aggregator::local_only()).await;
    let ids = ids_of(&session).await;

    let mut last = None;
    for id in ids {
        last = session
            .dispatch(CourseCommand::ToggleActive(id))
            .await
            .expect("dispatch");
    }
    let totals = last
        .expect("recalculation started")
        .await
        .expect("join")
        .expect("latest");
    assert_eq!(totals, QpaSummary::zero());
}
