//! Logo providers and the failover pass over them
//!
//! A provider is one external source of logos (a brand database, a favicon
//! service, the site itself). Providers are an explicit, closed set
//! ([`ProviderKind`]) behind one capability trait ([`LogoProvider`]), built
//! once at startup in the configured order by [`ProviderRegistry`].
//!
//! [`ProviderOrchestrator`] walks the registry sequentially, collecting every
//! success; [`ResultRanker`] then picks exactly one winner.

pub mod factory;
pub mod http;
pub mod orchestrator;
pub mod ranker;
pub mod traits;

pub use factory::ProviderRegistry;
pub use http::{HttpLogoProvider, build_http_client};
pub use orchestrator::{OrchestrationOutcome, ProviderOrchestrator};
pub use ranker::ResultRanker;
pub use traits::{LogoProvider, ProviderKind};
