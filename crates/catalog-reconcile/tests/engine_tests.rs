//! Reconciliation engine tests against an in-memory catalog.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use catalog_core::{AttributeBinding, DesiredEntry, ObservedEntry};
use catalog_reconcile::{
    reconcile_entries, BoxError, CreateEntry, EntriesClient, NoopProgress, PartialEntry,
    ProgressSink, ReconcileError, ReconcileOptions, ReconcileTarget,
};

// ============================================================================
// In-memory catalog
// ============================================================================

#[derive(Debug, Clone)]
struct BulkCall {
    size: usize,
    update_attributes: Vec<String>,
    entries: Vec<PartialEntry>,
}

#[derive(Default)]
struct MockCatalog {
    entries: Mutex<Vec<ObservedEntry>>,
    next_id: AtomicUsize,
    page_sizes: Mutex<Vec<usize>>,
    cursors: Mutex<Vec<Option<String>>>,
    created: Mutex<Vec<CreateEntry>>,
    deleted: Mutex<Vec<String>>,
    bulk_calls: Mutex<Vec<BulkCall>>,
    fail_create_for: Option<String>,
    /// Entry id whose delete fails.
    fail_delete_for: Option<String>,
    /// 1-based bulk update call that fails.
    fail_bulk_batch: Option<usize>,
    fail_fetch: bool,
    create_attempts: AtomicUsize,
    bulk_attempts: AtomicUsize,
}

impl MockCatalog {
    fn with_entries(entries: Vec<ObservedEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
            ..Self::default()
        }
    }

    fn created_external_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self
            .created
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.external_id.clone())
            .collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl EntriesClient for MockCatalog {
    async fn fetch_page(
        &self,
        _catalog_type_id: &str,
        page_size: usize,
        after: Option<&str>,
    ) -> Result<Vec<ObservedEntry>, BoxError> {
        if self.fail_fetch {
            return Err("HTTP 500".into());
        }
        self.page_sizes.lock().unwrap().push(page_size);
        self.cursors.lock().unwrap().push(after.map(str::to_string));

        let entries = self.entries.lock().unwrap();
        let start = match after {
            Some(after) => entries
                .iter()
                .position(|e| e.id == after)
                .map_or(entries.len(), |i| i + 1),
            None => 0,
        };
        Ok(entries.iter().skip(start).take(page_size).cloned().collect())
    }

    async fn create(&self, payload: CreateEntry) -> Result<ObservedEntry, BoxError> {
        self.create_attempts.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail_create_for.as_deref() == Some(payload.external_id.as_str()) {
            return Err("HTTP 422: invalid attribute".into());
        }

        let id = format!("new-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut entry = ObservedEntry::new(&id, Some(payload.external_id.as_str()), &payload.name);
        entry.rank = payload.rank;
        entry.aliases = payload.aliases.clone();
        entry.attribute_values = payload.attribute_values.clone();
        self.entries.lock().unwrap().push(entry.clone());
        self.created.lock().unwrap().push(payload);
        Ok(entry)
    }

    async fn delete(&self, entry: &ObservedEntry) -> Result<(), BoxError> {
        if self.fail_delete_for.as_deref() == Some(entry.id.as_str()) {
            return Err("HTTP 409: entry is referenced".into());
        }
        self.entries.lock().unwrap().retain(|e| e.id != entry.id);
        self.deleted.lock().unwrap().push(entry.id.clone());
        Ok(())
    }

    async fn bulk_update(
        &self,
        _catalog_type_id: &str,
        entries: Vec<PartialEntry>,
        update_attributes: &[String],
    ) -> Result<(), BoxError> {
        let attempt = self.bulk_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_bulk_batch == Some(attempt) {
            return Err("HTTP 500: internal error".into());
        }
        let mut stored = self.entries.lock().unwrap();
        for update in &entries {
            if let Some(entry) = stored.iter_mut().find(|e| e.id == update.entry_id) {
                entry.name = update.name.clone();
                entry.rank = update.rank;
                entry.aliases = update.aliases.clone();
                for id in update_attributes {
                    match update.attribute_values.get(id) {
                        Some(binding) => {
                            entry.attribute_values.insert(id.clone(), binding.clone());
                        }
                        None => {
                            entry.attribute_values.remove(id);
                        }
                    }
                }
            }
        }
        self.bulk_calls.lock().unwrap().push(BulkCall {
            size: entries.len(),
            update_attributes: update_attributes.to_vec(),
            entries,
        });
        Ok(())
    }
}

#[derive(Default)]
struct CountingProgress {
    delete_total: Mutex<Option<usize>>,
    create_total: Mutex<Option<usize>>,
    update_total: Mutex<Option<usize>>,
    deletes: AtomicUsize,
    creates: AtomicUsize,
    updates: AtomicUsize,
}

impl ProgressSink for CountingProgress {
    fn on_delete_start(&self, total: usize) {
        *self.delete_total.lock().unwrap() = Some(total);
    }
    fn on_delete_progress(&self) {
        self.deletes.fetch_add(1, Ordering::SeqCst);
    }
    fn on_create_start(&self, total: usize) {
        *self.create_total.lock().unwrap() = Some(total);
    }
    fn on_create_progress(&self) {
        self.creates.fetch_add(1, Ordering::SeqCst);
    }
    fn on_update_start(&self, total: usize) {
        *self.update_total.lock().unwrap() = Some(total);
    }
    fn on_update_progress(&self) {
        self.updates.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn target() -> ReconcileTarget {
    ReconcileTarget {
        catalog_type_id: "type-1".to_string(),
        type_name: r#"Custom["Service"]"#.to_string(),
        writable_attribute_ids: vec!["tier".to_string(), "tags".to_string()],
    }
}

fn single(value: &str) -> AttributeBinding {
    AttributeBinding::Single(value.to_string())
}

async fn run(
    catalog: &Arc<MockCatalog>,
    desired: &[DesiredEntry],
    options: &ReconcileOptions,
) -> Result<catalog_reconcile::ReconcileSummary, ReconcileError> {
    let client: Arc<dyn EntriesClient> = Arc::clone(catalog) as Arc<dyn EntriesClient>;
    reconcile_entries(client, &target(), desired, &NoopProgress, options).await
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_name_change_sends_single_update() {
    let mut observed = ObservedEntry::new("e1", Some("x"), "A");
    observed.rank = Some(0);
    let catalog = Arc::new(MockCatalog::with_entries(vec![observed]));

    let desired = vec![DesiredEntry::new("x", "B")];
    let summary = run(&catalog, &desired, &ReconcileOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.updated, 1);
    assert_eq!(summary.created, 0);
    assert_eq!(summary.deleted, 0);

    let calls = catalog.bulk_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].entries[0].entry_id, "e1");
    assert_eq!(calls[0].entries[0].name, "B");
    assert!(catalog.created.lock().unwrap().is_empty());
    assert!(catalog.deleted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_prune_deletes_only_undesired() {
    let catalog = Arc::new(MockCatalog::with_entries(vec![
        ObservedEntry::new("e-a", Some("a"), "A"),
        ObservedEntry::new("e-b", Some("b"), "B"),
    ]));

    let desired = vec![DesiredEntry::new("a", "A")];
    let summary = run(&catalog, &desired, &ReconcileOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(*catalog.deleted.lock().unwrap(), vec!["e-b".to_string()]);
    assert!(catalog.created.lock().unwrap().is_empty());
    assert!(catalog.bulk_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unmanaged_entries_are_pruned() {
    let catalog = Arc::new(MockCatalog::with_entries(vec![ObservedEntry::new(
        "e-manual", None, "Manual",
    )]));

    let summary = run(&catalog, &[], &ReconcileOptions::default())
        .await
        .unwrap();
    assert_eq!(summary.deleted, 1);
}

#[tokio::test]
async fn test_without_prune_nothing_is_deleted() {
    let catalog = Arc::new(MockCatalog::with_entries(vec![
        ObservedEntry::new("e-a", Some("a"), "A"),
        ObservedEntry::new("e-b", Some("b"), "B"),
    ]));
    let progress = CountingProgress::default();
    let client: Arc<dyn EntriesClient> = Arc::clone(&catalog) as Arc<dyn EntriesClient>;

    let summary = reconcile_entries(
        client,
        &target(),
        &[DesiredEntry::new("a", "A")],
        &progress,
        &ReconcileOptions::default().with_prune(false),
    )
    .await
    .unwrap();

    assert_eq!(summary.deleted, 0);
    assert!(catalog.deleted.lock().unwrap().is_empty());
    assert_eq!(*progress.delete_total.lock().unwrap(), Some(0));
}

#[tokio::test]
async fn test_duplicate_external_ids_are_all_created() {
    let catalog = Arc::new(MockCatalog::default());
    let desired = vec![
        DesiredEntry::new("dup", "First"),
        DesiredEntry::new("dup", "Second"),
        DesiredEntry::new("solo", "Third"),
    ];

    let summary = run(&catalog, &desired, &ReconcileOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.created, 3);
    assert_eq!(
        catalog.created_external_ids(),
        vec!["dup".to_string(), "dup".to_string(), "solo".to_string()]
    );
}

#[tokio::test]
async fn test_second_run_is_a_no_op() {
    let catalog = Arc::new(MockCatalog::with_entries(vec![
        ObservedEntry::new("e-old", Some("old"), "Old"),
        ObservedEntry::new("e-x", Some("x"), "Stale name"),
    ]));
    let desired = vec![
        DesiredEntry::new("x", "X")
            .with_rank(3)
            .with_aliases(vec!["ex".into()])
            .with_attribute("tier", single("1")),
        DesiredEntry::new("y", "Y").with_attribute(
            "tags",
            AttributeBinding::List(vec!["a".into(), "b".into()]),
        ),
    ];

    let first = run(&catalog, &desired, &ReconcileOptions::default())
        .await
        .unwrap();
    assert_eq!((first.deleted, first.created, first.updated), (1, 1, 1));

    let second = run(&catalog, &desired, &ReconcileOptions::default())
        .await
        .unwrap();
    assert_eq!((second.deleted, second.created, second.updated), (0, 0, 0));
    assert_eq!(second.unchanged, 2);
}

#[tokio::test]
async fn test_non_writable_attributes_are_never_sent() {
    let mut observed = ObservedEntry::new("e-x", Some("x"), "X");
    observed
        .attribute_values
        .insert("owners".into(), single("from-backlink"));
    let catalog = Arc::new(MockCatalog::with_entries(vec![observed]));

    let desired = vec![
        DesiredEntry::new("x", "X")
            .with_attribute("tier", single("2"))
            .with_attribute("owners", single("ignored")),
        DesiredEntry::new("y", "Y").with_attribute("owners", single("ignored")),
    ];
    run(&catalog, &desired, &ReconcileOptions::default())
        .await
        .unwrap();

    let calls = catalog.bulk_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].update_attributes,
        vec!["tier".to_string(), "tags".to_string()]
    );
    assert!(!calls[0].entries[0].attribute_values.contains_key("owners"));

    let created = catalog.created.lock().unwrap();
    assert!(!created[0].attribute_values.contains_key("owners"));

    let stored = catalog.entries.lock().unwrap();
    let kept = stored.iter().find(|e| e.id == "e-x").unwrap();
    assert_eq!(kept.attribute_values.get("owners"), Some(&single("from-backlink")));
}

#[tokio::test]
async fn test_updates_are_batched_with_per_entry_progress() {
    let observed: Vec<_> = (0..250)
        .map(|i| ObservedEntry::new(format!("e-{i}"), Some(format!("x-{i}").as_str()), "old"))
        .collect();
    let desired: Vec<_> = (0..250)
        .map(|i| DesiredEntry::new(format!("x-{i}"), "new"))
        .collect();
    let catalog = Arc::new(MockCatalog::with_entries(observed));
    let progress = CountingProgress::default();
    let client: Arc<dyn EntriesClient> = Arc::clone(&catalog) as Arc<dyn EntriesClient>;

    let summary = reconcile_entries(
        client,
        &target(),
        &desired,
        &progress,
        &ReconcileOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(summary.updated, 250);
    let sizes: Vec<_> = catalog
        .bulk_calls
        .lock()
        .unwrap()
        .iter()
        .map(|c| c.size)
        .collect();
    assert_eq!(sizes, vec![100, 100, 50]);
    assert_eq!(*progress.update_total.lock().unwrap(), Some(250));
    assert_eq!(progress.updates.load(Ordering::SeqCst), 250);
    assert_eq!(*progress.create_total.lock().unwrap(), Some(0));
}

#[tokio::test]
async fn test_empty_list_matches_absent_binding() {
    let mut observed = ObservedEntry::new("e-x", Some("x"), "X");
    observed
        .attribute_values
        .insert("tags".into(), AttributeBinding::List(vec![]));
    let catalog = Arc::new(MockCatalog::with_entries(vec![observed]));

    let summary = run(
        &catalog,
        &[DesiredEntry::new("x", "X")],
        &ReconcileOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(summary.updated, 0);
    assert_eq!(summary.unchanged, 1);
}

#[tokio::test]
async fn test_create_failure_stops_launching_new_work() {
    let catalog = Arc::new(MockCatalog {
        fail_create_for: Some("x-1".to_string()),
        ..MockCatalog::default()
    });
    let desired: Vec<_> = (0..100)
        .map(|i| DesiredEntry::new(format!("x-{i}"), "entry"))
        .collect();

    let err = run(
        &catalog,
        &desired,
        &ReconcileOptions::default().with_concurrency(1),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ReconcileError::Create { .. }));
    assert_eq!(err.external_id(), Some("x-1"));
    assert!(err.to_string().contains("external_id=x-1"));
    assert!(catalog.create_attempts.load(Ordering::SeqCst) < 100);
    assert!(catalog.bulk_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_fetch_follows_after_cursor() {
    let observed: Vec<_> = (0..5)
        .map(|i| ObservedEntry::new(format!("e-{i}"), Some(format!("x-{i}").as_str()), "same"))
        .collect();
    let desired: Vec<_> = (0..5)
        .map(|i| DesiredEntry::new(format!("x-{i}"), "same"))
        .collect();
    let catalog = Arc::new(MockCatalog::with_entries(observed));

    let summary = run(
        &catalog,
        &desired,
        &ReconcileOptions::default().with_page_size(2),
    )
    .await
    .unwrap();

    assert_eq!(summary.observed, 5);
    assert_eq!(summary.unchanged, 5);
    assert_eq!(*catalog.page_sizes.lock().unwrap(), vec![2, 2, 2, 2]);
    assert_eq!(
        *catalog.cursors.lock().unwrap(),
        vec![
            None,
            Some("e-1".to_string()),
            Some("e-3".to_string()),
            Some("e-4".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_fetch_error_names_type() {
    let catalog = Arc::new(MockCatalog {
        fail_fetch: true,
        ..MockCatalog::default()
    });

    let err = run(&catalog, &[], &ReconcileOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::Fetch { .. }));
    assert!(err.to_string().contains(r#"Custom["Service"]"#));
    assert!(catalog.deleted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_rank_and_aliases_round_trip_into_payloads() {
    let catalog = Arc::new(MockCatalog::default());
    let mut attributes = BTreeMap::new();
    attributes.insert("tier".to_string(), single("1"));
    let mut entry = DesiredEntry::new("x", "X").with_rank(7);
    entry.aliases = vec!["first".into(), "second".into()];
    entry.attribute_values = attributes;

    run(&catalog, &[entry], &ReconcileOptions::default())
        .await
        .unwrap();

    let created = catalog.created.lock().unwrap();
    assert_eq!(created[0].catalog_type_id, "type-1");
    assert_eq!(created[0].rank, Some(7));
    assert_eq!(created[0].aliases, vec!["first".to_string(), "second".to_string()]);
}

#[tokio::test]
async fn test_delete_failure_aborts_before_create() {
    let catalog = Arc::new(MockCatalog {
        entries: Mutex::new(vec![
            ObservedEntry::new("e-gone", Some("gone"), "Gone"),
            ObservedEntry::new("e-x", Some("x"), "Stale"),
        ]),
        fail_delete_for: Some("e-gone".to_string()),
        ..MockCatalog::default()
    });
    let progress = CountingProgress::default();
    let client: Arc<dyn EntriesClient> = Arc::clone(&catalog) as Arc<dyn EntriesClient>;

    let err = reconcile_entries(
        client,
        &target(),
        &[DesiredEntry::new("x", "X"), DesiredEntry::new("new", "New")],
        &progress,
        &ReconcileOptions::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ReconcileError::Delete { .. }));
    assert_eq!(err.external_id(), Some("gone"));
    assert_eq!(
        err.to_string(),
        "destroying catalog entries: unable to destroy entry id=e-gone external_id=gone: HTTP 409: entry is referenced"
    );
    assert_eq!(catalog.create_attempts.load(Ordering::SeqCst), 0);
    assert_eq!(catalog.bulk_attempts.load(Ordering::SeqCst), 0);
    assert_eq!(*progress.create_total.lock().unwrap(), None);
}

#[tokio::test]
async fn test_failed_bulk_batch_stops_later_batches() {
    let observed: Vec<_> = (0..5)
        .map(|i| ObservedEntry::new(format!("e-{i}"), Some(format!("x-{i}").as_str()), "old"))
        .collect();
    let desired: Vec<_> = (0..5)
        .map(|i| DesiredEntry::new(format!("x-{i}"), "new"))
        .collect();
    let catalog = Arc::new(MockCatalog {
        entries: Mutex::new(observed),
        fail_bulk_batch: Some(2),
        ..MockCatalog::default()
    });
    let progress = CountingProgress::default();
    let client: Arc<dyn EntriesClient> = Arc::clone(&catalog) as Arc<dyn EntriesClient>;

    let err = reconcile_entries(
        client,
        &target(),
        &desired,
        &progress,
        &ReconcileOptions::default().with_update_batch_size(2),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ReconcileError::BulkUpdate { batch: 2, size: 2, .. }));
    assert_eq!(err.external_id(), Some("x-2"));
    assert_eq!(
        err.to_string(),
        "updating catalog entries: bulk update batch 2 (2 entries, first external_id=x-2): HTTP 500: internal error"
    );
    assert_eq!(catalog.bulk_attempts.load(Ordering::SeqCst), 2);
    assert_eq!(catalog.bulk_calls.lock().unwrap().len(), 1);
    assert_eq!(progress.updates.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_rank_set_elsewhere_is_reset_once() {
    let mut observed = ObservedEntry::new("e-x", Some("x"), "X");
    observed.rank = Some(5);
    let catalog = Arc::new(MockCatalog::with_entries(vec![observed]));
    let desired = vec![DesiredEntry::new("x", "X")];

    let first = run(&catalog, &desired, &ReconcileOptions::default())
        .await
        .unwrap();
    assert_eq!(first.updated, 1);
    assert_eq!(catalog.bulk_calls.lock().unwrap()[0].entries[0].rank, Some(0));

    let second = run(&catalog, &desired, &ReconcileOptions::default())
        .await
        .unwrap();
    assert_eq!((second.updated, second.unchanged), (0, 1));
}
