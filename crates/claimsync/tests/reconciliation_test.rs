//! Replace-policy and safety behaviour of reconciliation, driven through the
//! public API.

use claimsync::reconcile::Skip;
use claimsync::submit::SubmitterConfig;
use claimsync::{
    AssetCandidate, CatalogNormalizer, ContentIdentity, DuplicateLedger, EngineConfig, FactSet,
    MemoryStore, MutationOp, PropertyKey, RawObservation, ReconciliationEngine, ReplacePolicy,
    SkipReason, Statement, Stores, Subject, SubjectOutcome, SyncConfig, Syncer, Value,
};

const SMALL: &str = "Small scan.jpg";
const SMALL_SIZE: usize = 100;

fn with_small_image() -> Subject {
    Subject::empty("SK-A-1")
        .with_id("Q100")
        .with_statement(Statement::new("P18", Value::asset(SMALL)).with_id("Q100$1"))
}

fn store() -> MemoryStore {
    MemoryStore::new()
        .with_subject(with_small_image())
        .with_asset(SMALL, vec![1u8; SMALL_SIZE])
}

fn image_facts(size: usize) -> FactSet {
    let mut facts = FactSet::new("SK-A-1");
    facts
        .insert_asset(
            Statement::new("P18", Value::asset("Large scan.jpg")),
            AssetCandidate::new("Large scan.jpg", vec![2u8; size]),
        )
        .unwrap();
    facts
}

fn reconcile_image(size: usize) -> (claimsync::Reconciliation, MemoryStore) {
    let store = store();
    let engine = ReconciliationEngine::new(ContentIdentity::new(&store));
    let result = engine.reconcile(&with_small_image(), &image_facts(size), &mut DuplicateLedger::new());
    (result, store)
}

// =============================================================================
// Replace Threshold
// =============================================================================

#[test]
fn test_just_below_threshold_is_skipped() {
    let (result, _) = reconcile_image(399);
    assert!(result.is_noop());
    assert_eq!(
        result.skipped[0].reason,
        SkipReason::BelowThreshold {
            existing: 100,
            candidate: 399
        }
    );
}

#[test]
fn test_exactly_at_threshold_is_skipped() {
    let (result, _) = reconcile_image(400);
    assert!(result.is_noop());
    assert_eq!(result.skipped_with("below-threshold").count(), 1);
}

#[test]
fn test_above_threshold_replaces() {
    let (result, store) = reconcile_image(401);
    assert_eq!(result.ops.len(), 2);
    assert!(matches!(&result.ops[0], MutationOp::CreateAsset(c) if c.size() == 401));
    assert!(matches!(
        &result.ops[1],
        MutationOp::Replace { old, new }
            if old.value == Value::asset(SMALL) && new.value == Value::asset("Large scan.jpg")
    ));
    // Planning never writes
    assert_eq!(store.calls().submits, 0);
    assert_eq!(store.asset_count(), 1);
}

#[test]
fn test_add_only_config_never_replaces() {
    let store = store();
    let engine = ReconciliationEngine::new(ContentIdentity::new(&store)).with_config(EngineConfig::add_only());
    let result = engine.reconcile(&with_small_image(), &image_facts(10_000), &mut DuplicateLedger::new());
    assert!(result.is_noop());
    assert_eq!(result.skipped[0].reason, SkipReason::NoReplacePolicy);
}

#[test]
fn test_custom_factor() {
    let store = store();
    let config = EngineConfig::add_only().with_policy("P18", ReplacePolicy::LargerAsset { factor: 1.5 });
    let engine = ReconciliationEngine::new(ContentIdentity::new(&store)).with_config(config);
    let result = engine.reconcile(&with_small_image(), &image_facts(151), &mut DuplicateLedger::new());
    assert_eq!(result.ops.len(), 2);
}

#[test]
fn test_replacement_keeps_statement_id_in_store() {
    let store = store();
    let mut config = SyncConfig::default();
    config.submitter = SubmitterConfig::immediate();
    let normalizer = CatalogNormalizer::new(config.catalog.clone());
    let mut syncer = Syncer::new(&config, &normalizer, Stores::single(&store));

    let observation = RawObservation::new("Q100").with_asset(
        "image",
        AssetCandidate::new("Large scan.jpg", vec![2u8; 4096]),
    );
    let outcome = syncer.sync_one(&observation).unwrap();
    assert!(matches!(outcome, SubjectOutcome::Updated { ops: 2, .. }));

    let images = store.subject("Q100").unwrap().statements_for(&PropertyKey::new("P18")).to_vec();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].value, Value::asset("Large scan.jpg"));
    assert_eq!(images[0].id.as_deref(), Some("Q100$1"));
    assert_eq!(store.asset_count(), 2);
}

// =============================================================================
// Multi-valued Safety
// =============================================================================

#[test]
fn test_multi_valued_property_is_never_touched() {
    let store = store();
    let current = with_small_image().with_statement(Statement::new("P18", Value::asset("Detail.jpg")));
    let engine = ReconciliationEngine::new(ContentIdentity::new(&store));

    let result = engine.reconcile(&current, &image_facts(100_000), &mut DuplicateLedger::new());
    assert!(result.is_noop());
    assert_eq!(
        result.skipped,
        vec![Skip {
            property: PropertyKey::new("P18"),
            reason: SkipReason::Ambiguous { existing: 2 },
        }]
    );
    // Ambiguity is decided before any asset lookup
    assert_eq!(store.calls().asset_lookups, 0);
}

#[test]
fn test_other_properties_proceed_next_to_ambiguous_one() {
    let store = store();
    let current = with_small_image()
        .with_statement(Statement::new("P31", Value::item("Q3305213")))
        .with_statement(Statement::new("P31", Value::item("Q93184")));
    let facts = FactSet::new("SK-A-1")
        .with(Statement::new("P31", Value::item("Q3305213")))
        .unwrap()
        .with(Statement::new("P217", Value::string("SK-A-1")))
        .unwrap();
    let engine = ReconciliationEngine::new(ContentIdentity::new(&store));

    let result = engine.reconcile(&current, &facts, &mut DuplicateLedger::new());
    assert_eq!(result.ops, vec![MutationOp::Add(Statement::new("P217", Value::string("SK-A-1")))]);
    assert_eq!(result.skipped_with("ambiguous").count(), 1);
}
