//! focusscroll-core: scroll-linked section activation.
//!
//! Decides which block of a scrolling section is active, whether the
//! companion panel is pinned, and when to tell the rendering layer. Pure and
//! single-threaded: geometry comes in through [`metrics::ViewportMetricsProvider`],
//! state changes go out through listeners on [`engine::ActivationEngine`].

pub mod config;
pub mod dwell;
pub mod engine;
pub mod error;
pub mod layout;
pub mod metrics;
pub mod pinned;
pub mod resolver;
pub mod scenario;
pub mod skip_guard;
pub mod types;

pub use config::EngineConfig;
pub use engine::{ActivationEngine, CycleOutcome, EngineStats, ListenerId, UnchangedReason};
pub use error::{ActivationError, ConfigError, SnapshotError};
pub use layout::{LayoutBlock, PageLayout, SectionSpan};
pub use metrics::{BlockArena, ViewportMetrics, ViewportMetricsProvider};
pub use scenario::{HostEvent, LayoutHost, Scenario};
pub use types::{
    ActivationChange, ActivationState, Block, BlockId, BlockRect, ChangeKind, GeometryRef, Trigger,
    ViewportSnapshot,
};
