//! # gdb-freight
//!
//! Geodatabase freight exchange library.
//!
//! Replicates ("pushes/pulls") data objects (feature classes, tables, and
//! raster datasets) from a source geodatabase-like store to a target one,
//! following a fixed exchange protocol:
//!
//! - **Catalog reconciliation** producing an ordered transfer plan
//! - **Directive-driven planning** from a spoke's exception table, including
//!   change-detection (compare before overwrite)
//! - **Best-effort execution**: unresolvable or failing objects are skipped
//!   and logged, never aborting the run
//! - **Hub log records** for every completed transfer
//!
//! ## Example
//!
//! ```rust,no_run
//! use gdb_freight::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> gdb_freight::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let orchestrator = Orchestrator::from_config(config)?;
//!     let result = orchestrator.run(false).await?;
//!     println!("Transferred {} objects", result.objects_transferred);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod notify;
pub mod orchestrator;
pub mod plan;
pub mod protocol;
pub mod report;
pub mod store;
pub mod transfer;

// Re-exports for convenient access
pub use config::{Config, ExchangeConfig, WorkspaceConfig};
pub use core::{Catalog, CatalogEntry, ObjectKind, QualifiedName};
pub use error::{ExchangeError, Result};
pub use notify::{Notifier, TracingNotifier};
pub use orchestrator::{ExchangeResult, Orchestrator};
pub use plan::{PlanOutcome, Reconciler, TransferDirective, TransferPlan};
pub use protocol::{DirectiveKeyword, DirectiveRow, Role};
pub use report::RunReport;
pub use store::{CompareOutcome, Courier, GeoWorkspace, ObjectPath};
pub use transfer::{TransferAction, TransferExecutor, TransferSummary};
