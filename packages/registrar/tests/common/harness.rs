//! Test harness wiring the registration workflow to in-memory collaborators.

use std::sync::Arc;

use registrar_core::domains::registration::RegistrationWorkflow;
use registrar_core::kernel::test_dependencies::{
    CallLog, MockMemberDirectory, MockMessenger, MockRecordStore,
};
use registrar_core::kernel::{ServerDeps, TestDependencies};
use test_context::AsyncTestContext;

use super::test_config;

pub struct TestHarness {
    pub deps: TestDependencies,
    pub server_deps: Arc<ServerDeps>,
    pub workflow: RegistrationWorkflow,
}

impl TestHarness {
    pub fn directory(&self) -> &MockMemberDirectory {
        &self.deps.directory
    }

    pub fn store(&self) -> &MockRecordStore {
        &self.deps.store
    }

    pub fn messenger(&self) -> &MockMessenger {
        &self.deps.messenger
    }

    pub fn log(&self) -> &CallLog {
        &self.deps.log
    }
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> TestHarness {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let deps = TestDependencies::new();
        let server_deps = Arc::new(deps.server_deps());
        let workflow = RegistrationWorkflow::new(server_deps.clone(), test_config());

        TestHarness {
            deps,
            server_deps,
            workflow,
        }
    }
}
