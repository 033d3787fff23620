// # netalert-core
//
// Core library for managing network-monitoring alerts on a remote alert
// service.
//
// ## Architecture Overview
//
// - **Transport**: Trait for one HTTP exchange with the remote service
// - **NameResolver**: Trait for turning a domain into IP addresses
// - **Dispatcher**: Serializes requests under a shared rate limit (Throttle)
// - **AlertClient**: Typed remote operations (create, fetch, replace filters,
//   delete, add trigger, add notifier, domain info)
// - **AlertEngine**: Reconciles desired alert configuration against the
//   remote service and reports lifecycle events
//
// ## Design Principles
//
// 1. **One lane per quota**: Every request passes one throttle; dispatchers
//    sharing a throttle never overlap
// 2. **Identity before annotations**: An alert id, once assigned, is never
//    lost to a failing follow-up call
// 3. **Library-First**: The HTTP transport lives in its own crate; the core
//    runs against any Transport implementation

pub mod client;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod model;
pub mod resolve;
pub mod traits;

// Re-export core types for convenience
pub use client::AlertClient;
pub use config::{AlertConfig, ClientConfig, DomainAlertConfig, EngineConfig, NetalertConfig};
pub use dispatch::{Dispatcher, Throttle};
pub use engine::{
    AlertEngine, AlertSnapshot, AlertSummary, DomainAlertSnapshot, Outcome, Phase,
    ReconcileEvent, Warning, WarningKind,
};
pub use error::{Error, Operation, Result};
pub use model::{AlertRecord, DomainInfo, DomainRecord, FilterSet};
pub use resolve::SystemResolver;
pub use traits::{ApiRequest, ApiResponse, Method, NameResolver, Transport};
