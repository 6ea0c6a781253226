use std::sync::Arc;

use aeroguard_core::{
    Authenticator, Config, DispatchRunner, DispatchWorker, JobQueue, SanitizedConfig,
    StatusReporter, StatusStore, SubmissionService,
};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    store: Arc<dyn StatusStore>,
    reporter: Arc<dyn StatusReporter>,
    queue: Arc<dyn JobQueue>,
    submission: SubmissionService,
    /// Present when an optimizer is configured; serves the push endpoint.
    worker: Option<Arc<DispatchWorker>>,
    /// Present when pull consumers run in this process.
    runner: Option<Arc<DispatchRunner>>,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        store: Arc<dyn StatusStore>,
        reporter: Arc<dyn StatusReporter>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        let submission = SubmissionService::new(
            Arc::clone(&reporter),
            Arc::clone(&queue),
            config.submission.schemes.clone(),
        );

        Self {
            config,
            authenticator,
            store,
            reporter,
            queue,
            submission,
            worker: None,
            runner: None,
        }
    }

    pub fn with_worker(mut self, worker: Arc<DispatchWorker>) -> Self {
        self.worker = Some(worker);
        self
    }

    pub fn with_runner(mut self, runner: Arc<DispatchRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn store(&self) -> &Arc<dyn StatusStore> {
        &self.store
    }

    /// Reporter writing to this process's store.
    pub fn reporter(&self) -> &Arc<dyn StatusReporter> {
        &self.reporter
    }

    pub fn queue(&self) -> &Arc<dyn JobQueue> {
        &self.queue
    }

    pub fn submission(&self) -> &SubmissionService {
        &self.submission
    }

    pub fn worker(&self) -> Option<&Arc<DispatchWorker>> {
        self.worker.as_ref()
    }

    pub fn runner(&self) -> Option<&Arc<DispatchRunner>> {
        self.runner.as_ref()
    }
}
