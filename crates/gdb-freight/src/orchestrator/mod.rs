//! Run orchestration.
//!
//! The orchestrator wires the pieces into one run: verify both stores and
//! their protocol tables, read the spoke's directives, enumerate both
//! catalogs, reconcile them into a plan, create missing containers, execute,
//! persist, and deliver the report. Precondition failures abort before
//! anything is written; failures after that still deliver the accumulated
//! report before surfacing the error.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{Config, ExchangeConfig};
use crate::core::Catalog;
use crate::error::{ExchangeError, Result};
use crate::notify::{Notifier, TracingNotifier};
use crate::plan::{Reconciler, TransferPlan};
use crate::protocol::{
    parse_readme_row, DirectiveRow, Role, LOG_TABLE, PARAMS_FIELDS, PARAMS_TABLE, README_FIELDS,
    README_TABLE,
};
use crate::report::RunReport;
use crate::store::{self, find_control_table, load_catalog, Courier, GeoWorkspace};
use crate::transfer::{TransferExecutor, TransferRecord, TransferSummary};

/// Outcome of one exchange run.
#[derive(Debug, Clone, Serialize)]
pub struct ExchangeResult {
    pub run_id: String,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub source_role: Role,
    pub target_role: Role,
    /// The reconciled plan, directives and planning outcomes included.
    pub plan: TransferPlan,
    pub objects_planned: usize,
    /// Objects actually written (created plus refreshed).
    pub objects_transferred: usize,
    pub objects_created: usize,
    pub objects_refreshed: usize,
    pub objects_unchanged: usize,
    pub objects_skipped: usize,
    /// What happened to each executed directive, in plan order.
    pub actions: Vec<TransferRecord>,
    /// The run report, one timestamped line per event.
    pub report: String,
}

/// Coordinates one source-to-target exchange.
pub struct Orchestrator {
    source: Arc<dyn GeoWorkspace>,
    target: Arc<dyn GeoWorkspace>,
    courier: Arc<dyn Courier>,
    exchange: ExchangeConfig,
    notifier: Arc<dyn Notifier>,
    persist: Option<Box<dyn Fn() -> Result<()> + Send + Sync>>,
}

impl Orchestrator {
    /// Build from a configuration file's worth of settings, with both sides
    /// backed by workspace snapshot files.
    pub fn from_config(config: Config) -> Result<Orchestrator> {
        let source = store::load_workspace(&config.source.workspace)?;
        let target = store::load_workspace(&config.target.workspace)?;
        let courier = source.courier_to(&target);

        let persist: Option<Box<dyn Fn() -> Result<()> + Send + Sync>> =
            if config.exchange.persist_target {
                let ws = target.clone();
                let path = config.target.workspace.clone();
                Some(Box::new(move || store::save_workspace(&ws, &path)))
            } else {
                None
            };

        Ok(Self {
            source: Arc::new(source),
            target: Arc::new(target),
            courier: Arc::new(courier),
            exchange: config.exchange,
            notifier: Arc::new(TracingNotifier),
            persist,
        })
    }

    /// Build over arbitrary workspace implementations. No persistence hook;
    /// the caller owns the stores.
    pub fn new(
        source: Arc<dyn GeoWorkspace>,
        target: Arc<dyn GeoWorkspace>,
        courier: Arc<dyn Courier>,
        exchange: ExchangeConfig,
    ) -> Self {
        Self {
            source,
            target,
            courier,
            exchange,
            notifier: Arc::new(TracingNotifier),
            persist: None,
        }
    }

    /// Replace the notification sink.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Execute one run. With `dry_run` the plan is built and reported but
    /// nothing is written to the target.
    pub async fn run(&self, dry_run: bool) -> Result<ExchangeResult> {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        info!(run_id = %run_id, dry_run, "starting exchange run");

        let mut report = RunReport::new();
        match self.run_inner(dry_run, &mut report).await {
            Ok((source_role, target_role, plan, summary)) => {
                report.note("Run completed.");
                self.deliver(&report, "REPORT");

                let completed_at = Utc::now();
                Ok(ExchangeResult {
                    run_id,
                    dry_run,
                    started_at,
                    completed_at,
                    duration_seconds: (completed_at - started_at).num_milliseconds() as f64
                        / 1000.0,
                    source_role,
                    target_role,
                    objects_planned: plan.directives.len(),
                    objects_transferred: summary.transferred(),
                    objects_created: summary.created(),
                    objects_refreshed: summary.refreshed(),
                    objects_unchanged: summary.unchanged(),
                    objects_skipped: summary.skipped(),
                    actions: summary.records,
                    plan,
                    report: report.body(),
                })
            }
            Err(e) => {
                report.warn(format!("Run terminated by an error: {}", e));
                self.deliver(&report, "ERROR");
                Err(e)
            }
        }
    }

    /// Verify reachability and protocol attribution on both sides without
    /// transferring anything.
    pub async fn health_check(&self) -> Result<(Role, Role)> {
        self.check_reachable().await?;
        let (source_role, target_role) = self.verify_protocol().await?;
        if source_role == Role::Spoke {
            self.require_table(&*self.source, "source", PARAMS_TABLE)
                .await?;
        }
        if target_role == Role::Hub {
            self.require_table(&*self.target, "target", LOG_TABLE).await?;
        }
        Ok((source_role, target_role))
    }

    async fn run_inner(
        &self,
        dry_run: bool,
        report: &mut RunReport,
    ) -> Result<(Role, Role, TransferPlan, TransferSummary)> {
        report.note(format!("Source store: {}", self.source.location()));
        report.note(format!("Target store: {}", self.target.location()));
        self.check_reachable().await?;

        let (source_role, target_role) = self.verify_protocol().await?;
        report.note(format!(
            "Protocol verified; source is a {}, target is a {}",
            source_role.as_str(),
            target_role.as_str()
        ));

        // A spoke source decides per object through its directive table; a
        // hub source ships everything it has.
        let directives = if source_role == Role::Spoke {
            let params = self
                .require_table(&*self.source, "source", PARAMS_TABLE)
                .await?;
            let rows = self.source.read_rows(&params, &PARAMS_FIELDS).await?;
            rows.iter()
                .map(|r| DirectiveRow::from_values(r))
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        let hub_log = if target_role == Role::Hub {
            Some(self.require_table(&*self.target, "target", LOG_TABLE).await?)
        } else {
            None
        };

        let source_catalog = load_catalog(&*self.source).await?;
        let target_catalog = load_catalog(&*self.target).await?;
        report.note(format!(
            "Enumerated {} source objects and {} target objects",
            source_catalog.len(),
            target_catalog.len()
        ));

        let plan = self.build_plan(&source_catalog, &target_catalog, &directives, report);

        if dry_run {
            report.note(format!(
                "Dry run: {} directive(s) planned, nothing written",
                plan.directives.len()
            ));
            return Ok((source_role, target_role, plan, TransferSummary::default()));
        }

        for dataset in &plan.datasets_to_create {
            report.note(format!(
                "Feature dataset {} isn't on the target yet; creating it",
                dataset
            ));
            self.target.create_dataset(dataset).await?;
        }

        let executor = TransferExecutor::new(
            &*self.source,
            &*self.target,
            &*self.courier,
            &source_catalog,
            &target_catalog,
            hub_log,
        );
        let summary = executor.execute(&plan, report).await?;

        if let Some(persist) = &self.persist {
            persist()?;
        }

        Ok((source_role, target_role, plan, summary))
    }

    fn build_plan(
        &self,
        source_catalog: &Catalog,
        target_catalog: &Catalog,
        directives: &[DirectiveRow],
        report: &mut RunReport,
    ) -> TransferPlan {
        let reconciler = Reconciler::new(source_catalog, target_catalog);
        let plan = if directives.is_empty() {
            report.note("No directives; planning a full transfer of every source object");
            reconciler.plan_default()
        } else {
            report.note(format!(
                "Planning from {} directive row(s)",
                directives.len()
            ));
            reconciler.plan_with_directives(directives)
        };

        for name in plan.skipped_not_found() {
            report.warn(format!(
                "{} couldn't be resolved on the source side and was not planned",
                name
            ));
        }
        plan
    }

    async fn check_reachable(&self) -> Result<()> {
        if !self.source.exists().await {
            return Err(ExchangeError::Precondition(format!(
                "source store {} doesn't exist or isn't reachable",
                self.source.location()
            )));
        }
        if !self.target.exists().await {
            return Err(ExchangeError::Precondition(format!(
                "target store {} doesn't exist or isn't reachable",
                self.target.location()
            )));
        }
        Ok(())
    }

    async fn verify_protocol(&self) -> Result<(Role, Role)> {
        let source_role = self.read_role(&*self.source, "source").await?;
        let target_role = self.read_role(&*self.target, "target").await?;
        Ok((source_role, target_role))
    }

    async fn read_role(&self, ws: &dyn GeoWorkspace, side: &str) -> Result<Role> {
        let readme = self.require_table(ws, side, README_TABLE).await?;
        let rows = ws.read_rows(&readme, &README_FIELDS).await?;
        let row = rows.first().ok_or_else(|| {
            ExchangeError::Precondition(format!(
                "{} store's {} table has no rows",
                side, README_TABLE
            ))
        })?;
        parse_readme_row(side, row)
    }

    async fn require_table(
        &self,
        ws: &dyn GeoWorkspace,
        side: &str,
        local: &str,
    ) -> Result<String> {
        find_control_table(ws, local).await?.ok_or_else(|| {
            ExchangeError::Precondition(format!(
                "{} store has no {} control table; it isn't set up for the exchange protocol",
                side, local
            ))
        })
    }

    /// Append the report to the log file and, when configured, hand it to the
    /// notifier. Delivery trouble is logged but never masks the run outcome.
    fn deliver(&self, report: &RunReport, tag: &str) {
        if let Err(e) = report.append_to_file(&self.exchange.log_file) {
            warn!("couldn't append the run report to the log file: {}", e);
        }
        if self.exchange.notify {
            let subject = format!("{} - {}", self.exchange.subject_prefix, tag);
            if let Err(e) = self.notifier.send_message(&subject, &report.body()) {
                warn!("couldn't deliver the run notification: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PROTOCOL_ID;
    use crate::store::memory::{FeatureClassData, MemoryGdb, MemoryWorkspace, TableData};
    use crate::store::ObjectPath;

    fn table(fields: &[&str], rows: &[&[&str]]) -> TableData {
        TableData {
            fields: fields.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|v| Some(v.to_string())).collect())
                .collect(),
        }
    }

    fn readme(role: &str) -> TableData {
        table(
            &["PROTOCOL", "DB_TYPE", "CONSTRAINTS", "NOTE"],
            &[&[PROTOCOL_ID, role, "", ""]],
        )
    }

    fn spoke_gdb() -> MemoryGdb {
        let mut gdb = MemoryGdb {
            prefix: "GIS.".to_string(),
            ..Default::default()
        };
        gdb.tables.insert("A_README".to_string(), readme("spoke"));
        gdb.tables.insert(
            "A_XCHANGE_PARAMETERS".to_string(),
            table(
                &["OBJECT_NAME", "IS_FDATASET", "DIRECTIVE", "SORT_FIELD", "NOTE"],
                &[&["GIS.zoning", "0", "", "", ""]],
            ),
        );
        gdb.tables
            .insert("zoning".to_string(), table(&["ZONE_ID"], &[&["A"], &["B"]]));
        gdb.feature_classes.insert(
            "towns".to_string(),
            FeatureClassData {
                dataset: None,
                table: table(&["TOWN_ID"], &[&["7"]]),
            },
        );
        gdb
    }

    fn hub_gdb() -> MemoryGdb {
        let mut gdb = MemoryGdb::default();
        gdb.tables.insert("A_README".to_string(), readme("hub"));
        gdb.tables
            .insert("A_XCHANGE_LOG".to_string(), table(&["DATE", "NOTE"], &[]));
        gdb
    }

    fn orchestrate(source: MemoryGdb, target: MemoryGdb) -> (Orchestrator, MemoryWorkspace) {
        let source = MemoryWorkspace::new("spoke", source);
        let target = MemoryWorkspace::new("hub", target);
        let courier = source.courier_to(&target);
        let exchange = ExchangeConfig {
            log_file: std::env::temp_dir().join(format!("gdb-freight-test-{}.log", Uuid::new_v4())),
            ..Default::default()
        };
        (
            Orchestrator::new(
                Arc::new(source),
                Arc::new(target.clone()),
                Arc::new(courier),
                exchange,
            ),
            target,
        )
    }

    #[tokio::test]
    async fn test_spoke_to_hub_run_end_to_end() {
        let (orchestrator, hub) = orchestrate(spoke_gdb(), hub_gdb());
        let result = orchestrator.run(false).await.unwrap();

        assert_eq!(result.source_role, Role::Spoke);
        assert_eq!(result.target_role, Role::Hub);
        assert_eq!(result.objects_planned, 1);
        assert_eq!(result.objects_transferred, 1);
        assert_eq!(result.objects_created, 1);
        assert!(result.report.contains("Run completed."));

        assert_eq!(
            hub.row_count(&ObjectPath::standalone("zoning")).await.unwrap(),
            2
        );
        // The hub's log table picked up one row for the copy.
        let log = hub.read_rows("A_XCHANGE_LOG", &["DATE", "NOTE"]).await.unwrap();
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn test_hub_source_ships_everything() {
        // A hub source has no directive table; every object goes.
        let mut source = spoke_gdb();
        source.tables.insert("A_README".to_string(), readme("hub"));
        source.tables.remove("A_XCHANGE_PARAMETERS");

        let (orchestrator, _) = orchestrate(source, hub_gdb());
        let result = orchestrator.run(false).await.unwrap();
        // towns and zoning; control tables never count.
        assert_eq!(result.objects_planned, 2);
    }

    #[tokio::test]
    async fn test_empty_directive_table_falls_back_to_full_transfer() {
        let mut source = spoke_gdb();
        source.tables.insert(
            "A_XCHANGE_PARAMETERS".to_string(),
            table(
                &["OBJECT_NAME", "IS_FDATASET", "DIRECTIVE", "SORT_FIELD", "NOTE"],
                &[],
            ),
        );
        let (orchestrator, _) = orchestrate(source, hub_gdb());
        let result = orchestrator.run(false).await.unwrap();
        assert_eq!(result.objects_planned, 2);
        assert!(result.report.contains("full transfer"));
    }

    #[tokio::test]
    async fn test_missing_readme_is_fatal_before_any_write() {
        let mut target = hub_gdb();
        target.tables.remove("A_README");
        let (orchestrator, hub) = orchestrate(spoke_gdb(), target);

        let err = orchestrator.run(false).await.unwrap_err();
        assert!(matches!(err, ExchangeError::Precondition(_)));
        assert!(err.to_string().contains("A_README"));
        assert!(hub
            .row_count(&ObjectPath::standalone("zoning"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_wrong_protocol_id_is_fatal() {
        let mut source = spoke_gdb();
        source.tables.insert(
            "A_README".to_string(),
            table(
                &["PROTOCOL", "DB_TYPE", "CONSTRAINTS", "NOTE"],
                &[&["SOMEBODY ELSES PROTOCOL", "spoke", "", ""]],
            ),
        );
        let (orchestrator, _) = orchestrate(source, hub_gdb());
        let err = orchestrator.run(false).await.unwrap_err();
        assert!(err.to_string().contains("PROTOCOL"));
    }

    #[tokio::test]
    async fn test_spoke_without_directive_table_is_fatal() {
        let mut source = spoke_gdb();
        source.tables.remove("A_XCHANGE_PARAMETERS");
        let (orchestrator, _) = orchestrate(source, hub_gdb());
        let err = orchestrator.run(false).await.unwrap_err();
        assert!(err.to_string().contains("A_XCHANGE_PARAMETERS"));
    }

    #[tokio::test]
    async fn test_hub_target_without_log_table_is_fatal() {
        let mut target = hub_gdb();
        target.tables.remove("A_XCHANGE_LOG");
        let (orchestrator, _) = orchestrate(spoke_gdb(), target);
        let err = orchestrator.run(false).await.unwrap_err();
        assert!(err.to_string().contains("A_XCHANGE_LOG"));
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let (orchestrator, hub) = orchestrate(spoke_gdb(), hub_gdb());
        let result = orchestrator.run(true).await.unwrap();

        assert!(result.dry_run);
        assert_eq!(result.objects_planned, 1);
        assert_eq!(result.objects_transferred, 0);
        assert!(hub
            .row_count(&ObjectPath::standalone("zoning"))
            .await
            .is_err());
        let log = hub.read_rows("A_XCHANGE_LOG", &["DATE", "NOTE"]).await.unwrap();
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_health_check_reports_roles() {
        let (orchestrator, _) = orchestrate(spoke_gdb(), hub_gdb());
        let (s, t) = orchestrator.health_check().await.unwrap();
        assert_eq!(s, Role::Spoke);
        assert_eq!(t, Role::Hub);
    }
}
