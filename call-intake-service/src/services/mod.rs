pub mod credentials;
pub mod media;
pub mod metrics;
pub mod providers;
pub mod subscriptions;

pub use credentials::{Credential, CredentialProvider};
pub use media::CallMediaService;
pub use metrics::init_metrics;
pub use subscriptions::SubscriptionManager;
