//! Property tests for mutation logs.
//!
//! Replaying a log onto a copy of the starting state must reproduce the state
//! the tracked operations produced, whether or not the log was compacted, and
//! a log must survive a serialization round trip unchanged.

use rest_collection::mutations::{Mutation, MutationTarget, MutationTracker};
use rest_collection::{TrackingOptions, Variable, VariableList, VariableScope, VariableType};
use proptest::prelude::*;
use serde_json::Value;

use super::init_test_env;

/// The empty key exercises assignments that are refused.
const KEYS: &[&str] = &["a", "b", "c", "d", ""];

fn initial_variables() -> Vec<Variable> {
    vec![
        Variable::new("a", 1),
        Variable::new("", "orphan"),
        Variable::with_type("c", "x", VariableType::String),
    ]
}

fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        (-100i64..100).prop_map(Value::from),
        "[a-z0-9]{0,4}".prop_map(Value::from),
    ]
}

fn type_strategy() -> impl Strategy<Value = Option<VariableType>> {
    prop::option::of(prop_oneof![
        Just(VariableType::String),
        Just(VariableType::Number),
        Just(VariableType::Boolean),
        Just(VariableType::Json),
        Just(VariableType::Any),
    ])
}

fn key_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(KEYS)
}

fn mutation_strategy() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        6 => (key_strategy(), value_strategy(), type_strategy())
            .prop_map(|(key, value, value_type)| Mutation::set(key, value, value_type)),
        3 => key_strategy().prop_map(Mutation::unset),
        1 => Just(Mutation::Clear),
    ]
}

#[derive(Debug, Clone)]
enum ScopeOp {
    Set(&'static str, Value, Option<VariableType>),
    Unset(&'static str),
    Clear,
}

fn scope_op_strategy() -> impl Strategy<Value = ScopeOp> {
    prop_oneof![
        6 => (key_strategy(), value_strategy(), type_strategy())
            .prop_map(|(key, value, value_type)| ScopeOp::Set(key, value, value_type)),
        3 => key_strategy().prop_map(ScopeOp::Unset),
        1 => Just(ScopeOp::Clear),
    ]
}

fn snapshot(list: &VariableList) -> String {
    serde_json::to_string(list).unwrap()
}

fn replayed(tracker: &MutationTracker) -> VariableList {
    let mut list = VariableList::from_variables(initial_variables());
    tracker.apply_on(&mut list);
    list
}

proptest! {
    #[test]
    fn prop_replay_matches_direct_application(
        mutations in prop::collection::vec(mutation_strategy(), 0..40)
    ) {
        init_test_env();

        let mut direct = VariableList::from_variables(initial_variables());
        let mut plain = MutationTracker::new(TrackingOptions::default());
        let mut compacting = MutationTracker::new(TrackingOptions::compacting());

        for mutation in &mutations {
            direct.apply_mutation(mutation);
            plain.track(mutation.clone());
            compacting.track(mutation.clone());
        }

        prop_assert_eq!(plain.len(), mutations.len());
        prop_assert!(compacting.len() <= mutations.len());
        prop_assert_eq!(snapshot(&replayed(&plain)), snapshot(&direct));
        prop_assert_eq!(snapshot(&replayed(&compacting)), snapshot(&direct));

        plain.compact();
        prop_assert_eq!(snapshot(&replayed(&plain)), snapshot(&direct));
    }

    #[test]
    fn prop_compaction_is_idempotent(
        mutations in prop::collection::vec(mutation_strategy(), 0..40)
    ) {
        let mut tracker = MutationTracker::new(TrackingOptions::default());
        for mutation in mutations {
            tracker.track(mutation);
        }

        tracker.compact();
        let once = tracker.clone();
        tracker.compact();
        prop_assert_eq!(tracker, once);
    }

    #[test]
    fn prop_log_serialization_round_trips(
        mutations in prop::collection::vec(mutation_strategy(), 0..20),
        auto_compact in any::<bool>()
    ) {
        let mut tracker = MutationTracker::new(TrackingOptions { auto_compact });
        for mutation in mutations {
            tracker.track(mutation);
        }

        let first = serde_json::to_string(&tracker).unwrap();
        let restored: MutationTracker = serde_json::from_str(&first).unwrap();
        prop_assert_eq!(serde_json::to_string(&restored).unwrap(), first);
        prop_assert_eq!(restored, tracker);
    }

    #[test]
    fn prop_tracked_scope_replays_onto_copy(
        ops in prop::collection::vec(scope_op_strategy(), 0..30),
        auto_compact in any::<bool>()
    ) {
        init_test_env();

        let mut scope = VariableScope::from(initial_variables());
        scope.enable_tracking(TrackingOptions { auto_compact });

        for op in ops {
            match op {
                ScopeOp::Set(key, value, value_type) => scope.set(key, value, value_type),
                ScopeOp::Unset(key) => scope.unset(key),
                ScopeOp::Clear => scope.clear(),
            }
        }

        let mut copy = VariableScope::from(initial_variables());
        scope.mutations().unwrap().apply_on(&mut copy);

        prop_assert_eq!(snapshot(&copy.values()), snapshot(&scope.values()));

        let saved = serde_json::to_string(&scope).unwrap();
        let restored: VariableScope = serde_json::from_str(&saved).unwrap();
        prop_assert_eq!(serde_json::to_string(&restored).unwrap(), saved);
    }
}
