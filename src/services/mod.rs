// Veritext Core Services

pub mod accounts;
pub mod analysis;
pub mod config_store;
pub mod providers;
pub mod retry;

pub use accounts::{AccountService, DocumentStore, HttpDocumentStore, MemoryDocumentStore, SignIn};
pub use config_store::{AppConfig, ConfigStore, SharedConfig};
pub use providers::{AnalysisError, ChatResult, ProviderClient, SamplingParams};
pub use retry::{run_with_retry, RetryPolicy, RetryState};

// Re-export analysis module surface
pub use analysis::{
    compare_all,
    provider_for,
    provider_from_config,
    ComparisonOutcome,
    ContentAnalysisProvider,
    GeminiProvider,
    MockProvider,
    OpenRouterProvider,
    ProviderKind,
};
