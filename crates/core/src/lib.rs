pub mod auth;
pub mod config;
pub mod dispatch;
pub mod job;
pub mod metrics;
pub mod optimizer;
pub mod queue;
pub mod reporter;
pub mod status;
pub mod submission;
pub mod testing;

pub use auth::{
    create_authenticator, ApiKeyAuthenticator, AuthError, Authenticator, Caller, Credentials,
    OpenAuthenticator,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthConfig, AuthMethod, Backend, Config,
    ConfigError, OptimizerConfig, QueueConfig, SanitizedConfig, ServerConfig, StoreConfig,
    SubmissionConfig, WorkerConfig,
};
pub use dispatch::{DeliveryOutcome, DispatchRunner, DispatchWorker, RunnerStatus};
pub use job::{DecodeError, Job, JobRequest, PushRequest, QueueMessage, ValidationError};
pub use optimizer::{HttpOptimizer, OptimizeRequest, OptimizeResult, Optimizer, OptimizerError};
pub use queue::{open_queue, Delivery, InMemoryQueue, JobQueue, QueueError, SqliteQueue};
pub use reporter::{HttpStatusReporter, LocalStatusReporter, ReportError, StatusReporter};
pub use status::{
    open_store, JobState, JobStatus, MemoryStatusStore, SqliteStatusStore, StatusCounts,
    StatusError, StatusStore, StatusUpdate, WriteOutcome,
};
pub use submission::{SubmissionService, SubmitError, SubmittedJob};
