//! End-to-end provider/store behavior: change detection against the
//! cheap projection, cache invalidation on genuine change only, and the
//! firing-exercise merge surfacing through a served view.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};

use navwarn_client::legacy::{
    ActiveKind, ActiveRow, AreaRow, FiringExerciseRow, LegacyProvider, LegacySource, WarningRow,
};
use navwarn_core::{Error, MessageCache, MessageFilter, MessageStore};

fn dt(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// In-memory legacy database with call counting.
struct FakeDb {
    warnings: Mutex<Vec<WarningRow>>,
    exercises: Mutex<Vec<FiringExerciseRow>>,
    materializations: AtomicUsize,
}

impl FakeDb {
    fn new() -> Self {
        Self {
            warnings: Mutex::new(Vec::new()),
            exercises: Mutex::new(Vec::new()),
            materializations: AtomicUsize::new(0),
        }
    }

    fn put_warning(&self, id: i64, updated: DateTime<Utc>) {
        let mut warnings = self.warnings.lock().unwrap();
        warnings.retain(|w| w.id != id);
        warnings.push(WarningRow {
            id,
            updated: Some(updated),
            title: Some(format!("Warning {id}")),
            description_en: Some("Description".into()),
            description_da: Some("Beskrivelse".into()),
            ..Default::default()
        });
        warnings.sort_by_key(|w| w.id);
    }
}

impl LegacySource for FakeDb {
    fn active_rows(&self) -> Result<Vec<ActiveRow>, Error> {
        let mut rows: Vec<ActiveRow> = self
            .warnings
            .lock()
            .unwrap()
            .iter()
            .map(|w| ActiveRow {
                id: w.id,
                kind: ActiveKind::Warning,
                updated: w.updated,
                valid_from: w.valid_from,
                valid_to: w.valid_to,
            })
            .collect();
        rows.extend(self.exercises.lock().unwrap().iter().map(|f| ActiveRow {
            id: f.id,
            kind: ActiveKind::FiringExercise,
            updated: None,
            valid_from: f.valid_from,
            valid_to: f.valid_to,
        }));
        Ok(rows)
    }

    fn warning_row(&self, id: i64) -> Result<Option<WarningRow>, Error> {
        self.materializations.fetch_add(1, Ordering::SeqCst);
        Ok(self.warnings.lock().unwrap().iter().find(|w| w.id == id).cloned())
    }

    fn firing_exercise_row(&self, id: i64) -> Result<Option<FiringExerciseRow>, Error> {
        self.materializations.fetch_add(1, Ordering::SeqCst);
        Ok(self.exercises.lock().unwrap().iter().find(|f| f.id == id).cloned())
    }
}

fn store_for(db: Arc<FakeDb>) -> MessageStore {
    let provider = Arc::new(LegacyProvider::new(db));
    MessageStore::new(provider, Arc::new(MessageCache::default()))
}

#[tokio::test]
async fn unchanged_database_skips_materialization_and_keeps_etag() {
    let db = Arc::new(FakeDb::new());
    db.put_warning(42, dt(1_000));
    let store = store_for(db.clone());

    // Initial load materializes once.
    store.load_messages().await.unwrap();
    assert_eq!(db.materializations.load(Ordering::SeqCst), 1);

    let filter = MessageFilter::new().lang("da");
    let view = store.cached_messages(&filter);
    assert_eq!(view.len(), 1);
    let etag = store.etag_token("json", &filter, &view);

    // Second load: projection unchanged, nothing is re-read.
    store.load_messages().await.unwrap();
    assert_eq!(db.materializations.load(Ordering::SeqCst), 1);

    let view = store.cached_messages(&filter);
    assert_eq!(store.etag_token("json", &filter, &view), etag);
}

#[tokio::test]
async fn advanced_watermark_reloads_and_changes_etag() {
    let db = Arc::new(FakeDb::new());
    db.put_warning(42, dt(1_000));
    let store = store_for(db.clone());

    store.load_messages().await.unwrap();
    let filter = MessageFilter::new().lang("en");
    let etag_before =
        store.etag_token("json", &filter, &store.cached_messages(&filter));

    db.put_warning(42, dt(2_000));
    store.load_messages().await.unwrap();

    assert_eq!(db.materializations.load(Ordering::SeqCst), 2);
    let etag_after = store.etag_token("json", &filter, &store.cached_messages(&filter));
    assert_ne!(etag_before, etag_after);
}

#[tokio::test]
async fn merged_firing_exercises_serve_one_message() {
    let db = Arc::new(FakeDb::new());
    let area = vec![AreaRow {
        id: 9,
        name_en: Some("Firing area".into()),
        name_da: Some("Skydeområde".into()),
    }];
    {
        let mut exercises = db.exercises.lock().unwrap();
        exercises.push(FiringExerciseRow {
            id: 11,
            updated: Some(dt(1_000)),
            valid_from: Some(Utc.with_ymd_and_hms(2014, 8, 5, 9, 0, 0).unwrap()),
            valid_to: Some(Utc.with_ymd_and_hms(2014, 8, 5, 17, 0, 0).unwrap()),
            areas: area.clone(),
            ..Default::default()
        });
        exercises.push(FiringExerciseRow {
            id: 12,
            updated: Some(dt(2_000)),
            valid_from: Some(Utc.with_ymd_and_hms(2014, 8, 6, 9, 0, 0).unwrap()),
            valid_to: Some(Utc.with_ymd_and_hms(2014, 8, 6, 17, 0, 0).unwrap()),
            areas: area.clone(),
            ..Default::default()
        });
    }
    let store = store_for(db);

    let snapshot = store.load_messages().await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, 11);
    assert_eq!(snapshot[0].provider.as_deref(), Some("legacy"));

    // Both exercise days survive in the merged time text.
    let view = store.cached_messages(&MessageFilter::new().lang("en"));
    let time = view[0].descs[0].time.as_deref().unwrap();
    assert!(time.contains("5 August 2014"));
    assert!(time.contains("6 August 2014"));
}

#[tokio::test]
async fn area_filter_serves_from_cache() {
    let db = Arc::new(FakeDb::new());
    db.put_warning(1, dt(1_000));
    let store = store_for(db);
    store.load_messages().await.unwrap();

    // The warning has no area, so an active area filter excludes it.
    let filtered = store.cached_messages(&MessageFilter::new().area(5));
    assert!(filtered.is_empty());

    // The empty filter returns the live list itself.
    let all = store.cached_messages(&MessageFilter::new());
    assert_eq!(all.len(), 1);
}
