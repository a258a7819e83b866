//! Shared setup for the integration scenarios.

pub mod collection_workflow_test;
pub mod mutation_replay_test;
pub mod ordering_properties_test;

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize test environment (run once)
pub fn init_test_env() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}
