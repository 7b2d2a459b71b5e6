//! Reconciliation of desired facts against current subject state.
//!
//! For each desired property the engine picks exactly one outcome:
//!
//! | Current statements | Values | Outcome |
//! |---|---|---|
//! | none | - | `Add` |
//! | one | equal | skip (already present) |
//! | one | differ, policy allows | `Replace` |
//! | one | differ, no policy or below threshold | skip |
//! | several | - | skip (ambiguous) |
//!
//! Value equality ignores qualifiers and references. Asset facts are looked
//! up by content first: a match under another name links the existing asset
//! and records a duplicate, a miss schedules a `CreateAsset` ahead of the op
//! that uses it.

mod engine;
mod ops;

pub use engine::{EngineConfig, ReconciliationEngine, ReplacePolicy};
pub use ops::{MutationOp, Reconciliation, Skip, SkipReason};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::FactSet;
    use crate::identity::{AssetCandidate, ContentIdentity};
    use crate::ledger::DuplicateLedger;
    use crate::model::{AssetRef, PropertyKey, Statement, Subject, Value};
    use crate::store::MemoryStore;
    use crate::temporal::TemporalValue;

    fn painting() -> Subject {
        Subject::empty("SK-A-1")
            .with_id("Q100")
            .with_statement(Statement::new("P31", Value::item("Q3305213")).with_id("Q100$1"))
    }

    fn image_facts(name: &str, bytes: Vec<u8>) -> FactSet {
        let mut facts = FactSet::new("SK-A-1");
        facts
            .insert_asset(
                Statement::new("P18", Value::asset(name)),
                AssetCandidate::new(name, bytes).with_source_url("https://museum.example/1.jpg"),
            )
            .unwrap();
        facts
    }

    #[test]
    fn test_absent_property_is_added() {
        let store = MemoryStore::new();
        let engine = ReconciliationEngine::new(ContentIdentity::new(&store));
        let facts = FactSet::new("SK-A-1")
            .with(Statement::new("P571", Value::Time(TemporalValue::year(1642))))
            .unwrap();

        let result = engine.reconcile(&painting(), &facts, &mut DuplicateLedger::new());
        assert_eq!(result.ops.len(), 1);
        assert!(matches!(&result.ops[0], MutationOp::Add(s) if s.property.as_str() == "P571"));
    }

    #[test]
    fn test_equal_value_ignores_qualifiers() {
        let store = MemoryStore::new();
        let engine = ReconciliationEngine::new(ContentIdentity::new(&store));
        let facts = FactSet::new("SK-A-1")
            .with(Statement::new("P31", Value::item("Q3305213")).with_qualifier("P518", Value::item("Q1")))
            .unwrap();

        let result = engine.reconcile(&painting(), &facts, &mut DuplicateLedger::new());
        assert!(result.is_noop());
        assert_eq!(result.skipped[0].reason, SkipReason::AlreadyPresent);
    }

    #[test]
    fn test_different_value_without_policy_is_left_alone() {
        let store = MemoryStore::new();
        let engine = ReconciliationEngine::new(ContentIdentity::new(&store));
        let facts = FactSet::new("SK-A-1")
            .with(Statement::new("P31", Value::item("Q93184")))
            .unwrap();

        let result = engine.reconcile(&painting(), &facts, &mut DuplicateLedger::new());
        assert!(result.is_noop());
        assert_eq!(result.skipped[0].reason, SkipReason::NoReplacePolicy);
    }

    #[test]
    fn test_circa_does_not_match_exact_year() {
        let store = MemoryStore::new();
        let engine = ReconciliationEngine::new(ContentIdentity::new(&store));
        let current = painting().with_statement(Statement::new("P571", Value::Time(TemporalValue::year(1780))));
        let facts = FactSet::new("SK-A-1")
            .with(Statement::new("P571", Value::Time(TemporalValue::circa(1780))))
            .unwrap();

        let result = engine.reconcile(&current, &facts, &mut DuplicateLedger::new());
        assert!(result.is_noop());
        assert_eq!(result.skipped[0].reason, SkipReason::NoReplacePolicy);
    }

    #[test]
    fn test_multi_valued_property_is_ambiguous() {
        let store = MemoryStore::new();
        let engine = ReconciliationEngine::new(ContentIdentity::new(&store));
        let current = painting().with_statement(Statement::new("P31", Value::item("Q93184")));
        let facts = FactSet::new("SK-A-1")
            .with(Statement::new("P31", Value::item("Q3305213")))
            .unwrap();

        let result = engine.reconcile(&current, &facts, &mut DuplicateLedger::new());
        assert!(result.is_noop());
        assert_eq!(result.skipped[0].reason, SkipReason::Ambiguous { existing: 2 });
    }

    #[test]
    fn test_new_asset_is_created_before_add() {
        let store = MemoryStore::new();
        let engine = ReconciliationEngine::new(ContentIdentity::new(&store));
        let mut ledger = DuplicateLedger::new();

        let result = engine.reconcile(&painting(), &image_facts("SK-A-1.jpg", vec![1; 10]), &mut ledger);
        assert_eq!(result.ops.len(), 2);
        assert_eq!(result.ops[0].label(), "create-asset");
        assert_eq!(result.ops[1].label(), "add");
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_duplicate_asset_is_linked_and_recorded() {
        let store = MemoryStore::new().with_asset("Existing painting.jpg", vec![1; 10]);
        let engine = ReconciliationEngine::new(ContentIdentity::new(&store));
        let mut ledger = DuplicateLedger::new();

        let result = engine.reconcile(&painting(), &image_facts("SK-A-1.jpg", vec![1; 10]), &mut ledger);
        assert_eq!(
            result.ops,
            vec![MutationOp::Add(
                Statement::new("P18", Value::asset("Existing painting.jpg"))
            )]
        );
        assert_eq!(result.duplicates, 1);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.records()[0].existing_asset, AssetRef::new("Existing painting.jpg"));
        assert_eq!(ledger.records()[0].subject, "Q100");
    }

    #[test]
    fn test_same_name_asset_is_reused_without_record() {
        let store = MemoryStore::new().with_asset("SK-A-1.jpg", vec![1; 10]);
        let engine = ReconciliationEngine::new(ContentIdentity::new(&store));
        let mut ledger = DuplicateLedger::new();

        let result = engine.reconcile(&painting(), &image_facts("SK-A-1.jpg", vec![1; 10]), &mut ledger);
        assert_eq!(result.ops.len(), 1);
        assert_eq!(result.ops[0].label(), "add");
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_replace_threshold_is_strict() {
        let store = MemoryStore::new().with_asset("Small.jpg", vec![0; 100]);
        let engine = ReconciliationEngine::new(ContentIdentity::new(&store));
        let current = painting().with_statement(Statement::new("P18", Value::asset("Small.jpg")));

        let result = engine.reconcile(&current, &image_facts("Large.jpg", vec![1; 400]), &mut DuplicateLedger::new());
        assert!(result.is_noop());
        assert_eq!(
            result.skipped[0].reason,
            SkipReason::BelowThreshold { existing: 100, candidate: 400 }
        );

        let result = engine.reconcile(&current, &image_facts("Large.jpg", vec![1; 401]), &mut DuplicateLedger::new());
        assert_eq!(result.ops.len(), 2);
        assert!(matches!(&result.ops[1], MutationOp::Replace { old, .. } if old.value == Value::asset("Small.jpg")));
    }

    #[test]
    fn test_policy_is_per_property() {
        let store = MemoryStore::new().with_asset("Small.jpg", vec![0; 100]);
        let engine =
            ReconciliationEngine::new(ContentIdentity::new(&store)).with_config(EngineConfig::add_only());
        let current = painting().with_statement(Statement::new("P18", Value::asset("Small.jpg")));

        let result = engine.reconcile(&current, &image_facts("Large.jpg", vec![1; 1000]), &mut DuplicateLedger::new());
        assert!(result.is_noop());
        assert_eq!(result.skipped[0].reason, SkipReason::NoReplacePolicy);
        assert_eq!(result.skipped[0].property, PropertyKey::new("P18"));
    }

    #[test]
    fn test_ops_follow_declaration_order() {
        let store = MemoryStore::new();
        let engine = ReconciliationEngine::new(ContentIdentity::new(&store));
        let facts = FactSet::new("SK-A-1")
            .with(Statement::new("P217", Value::string("SK-A-1")))
            .and_then(|f| f.with(Statement::new("P195", Value::item("Q190804"))))
            .and_then(|f| f.with(Statement::new("P170", Value::item("Q5598"))))
            .unwrap();

        let result = engine.reconcile(&Subject::empty("SK-A-1"), &facts, &mut DuplicateLedger::new());
        let order: Vec<_> = result.ops.iter().filter_map(|op| op.property()).map(|p| p.as_str()).collect();
        assert_eq!(order, vec!["P217", "P195", "P170"]);
    }

    #[test]
    fn test_replace_policy_from_toml() {
        let config: EngineConfig = toml::from_str(
            r#"
            [replace_policies]
            P18 = { policy = "larger_asset", factor = 2.5 }
            "#,
        )
        .unwrap();
        let policy = config.replace_policies.get(&PropertyKey::new("P18")).unwrap();
        assert!(policy.allows(100, 251));
        assert!(!policy.allows(100, 250));
    }
}
