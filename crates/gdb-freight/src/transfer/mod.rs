//! Plan execution: moving data objects between the two workspaces.
//!
//! The executor consumes an ordered [`TransferPlan`] directive by directive.
//! Absent objects are copied whole; present ones have their rows replaced
//! (optionally guarded by a compare when the directive asks for change
//! detection); rasters are dropped and recopied. Per-object trouble (a failed
//! compare, a raster held by another session) degrades to a logged skip, the
//! run keeps going.

use tracing::{debug, info};

use crate::core::{Catalog, ObjectKind};
use crate::error::Result;
use crate::plan::{TransferDirective, TransferPlan};
use crate::protocol::LOG_FIELDS;
use crate::report::{self, RunReport};
use crate::store::{CompareOutcome, Courier, GeoWorkspace, ObjectPath};

/// What happened to one directive during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferAction {
    /// The object didn't exist on the target and was copied whole.
    Created,
    /// The target rows were replaced (or the raster recopied).
    Refreshed,
    /// Change detection found the sides identical; nothing written.
    Unchanged,
    /// The pre-write compare failed; the object was left alone.
    SkippedCompareError,
    /// The target raster couldn't be removed (held by another session).
    SkippedLocked,
}

/// Per-directive execution record.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TransferRecord {
    pub name: String,
    pub kind: ObjectKind,
    pub action: TransferAction,
}

/// Tally of one run's execution.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TransferSummary {
    pub records: Vec<TransferRecord>,
}

impl TransferSummary {
    fn count(&self, action: TransferAction) -> usize {
        self.records.iter().filter(|r| r.action == action).count()
    }

    pub fn created(&self) -> usize {
        self.count(TransferAction::Created)
    }

    pub fn refreshed(&self) -> usize {
        self.count(TransferAction::Refreshed)
    }

    pub fn unchanged(&self) -> usize {
        self.count(TransferAction::Unchanged)
    }

    pub fn skipped(&self) -> usize {
        self.count(TransferAction::SkippedCompareError)
            + self.count(TransferAction::SkippedLocked)
    }

    /// Objects actually written to the target.
    pub fn transferred(&self) -> usize {
        self.created() + self.refreshed()
    }
}

/// Executes a [`TransferPlan`] against a source/target workspace pair.
pub struct TransferExecutor<'a> {
    source: &'a dyn GeoWorkspace,
    target: &'a dyn GeoWorkspace,
    courier: &'a dyn Courier,
    source_catalog: &'a Catalog,
    target_catalog: &'a Catalog,
    /// Qualified name of the hub's log table, when the target is a hub.
    hub_log: Option<String>,
}

impl<'a> TransferExecutor<'a> {
    pub fn new(
        source: &'a dyn GeoWorkspace,
        target: &'a dyn GeoWorkspace,
        courier: &'a dyn Courier,
        source_catalog: &'a Catalog,
        target_catalog: &'a Catalog,
        hub_log: Option<String>,
    ) -> Self {
        Self {
            source,
            target,
            courier,
            source_catalog,
            target_catalog,
            hub_log,
        }
    }

    /// Run every directive in plan order.
    pub async fn execute(
        &self,
        plan: &TransferPlan,
        report: &mut RunReport,
    ) -> Result<TransferSummary> {
        let mut summary = TransferSummary::default();

        for directive in &plan.directives {
            debug!(name = %directive.name, kind = directive.kind.label(), "executing directive");
            let action = match directive.kind {
                ObjectKind::Raster => self.transfer_raster(directive, report).await?,
                _ => self.transfer_rows(directive, report).await?,
            };
            summary.records.push(TransferRecord {
                name: directive.name.clone(),
                kind: directive.kind,
                action,
            });
        }

        info!(
            created = summary.created(),
            refreshed = summary.refreshed(),
            unchanged = summary.unchanged(),
            skipped = summary.skipped(),
            "plan executed"
        );
        Ok(summary)
    }

    /// Feature classes and tables: copy when absent, replace rows when present.
    async fn transfer_rows(
        &self,
        d: &TransferDirective,
        report: &mut RunReport,
    ) -> Result<TransferAction> {
        let label = d.kind.label();
        let src = self.source_path(d);

        if !d.already_there {
            let dst = self.new_target_path(d);
            self.courier.copy_object(&src, &dst).await?;
            self.check_counts(d, &src, &dst, report).await?;
            self.log_and_note(
                report,
                format!("Copied in new {} {} to the target", label, d.name),
            )
            .await?;
            return Ok(TransferAction::Created);
        }

        let dst = self.existing_target_path(d);
        if d.detect_changes {
            let sort_field = d.sort_field.as_deref().unwrap_or_default();
            let non_spatial = d.kind == ObjectKind::Table;
            match self
                .courier
                .compare_objects(&src, &dst, sort_field, non_spatial)
                .await
            {
                CompareOutcome::Same => {
                    report.note(format!(
                        "Change NOT detected for {} {}; leaving it as-is",
                        label, d.name
                    ));
                    return Ok(TransferAction::Unchanged);
                }
                CompareOutcome::Different => {
                    report.note(format!("Change detected for {} {}", label, d.name));
                }
                CompareOutcome::Error(msg) => {
                    report.warn(format!(
                        "Couldn't compare {} {} ({}); skipping its update",
                        label, d.name, msg
                    ));
                    return Ok(TransferAction::SkippedCompareError);
                }
            }
        }

        self.target.delete_rows(&dst).await?;
        self.courier.append_rows(&src, &dst).await?;
        self.check_counts(d, &src, &dst, report).await?;
        self.log_and_note(
            report,
            format!("Refreshed the rows of {} {} on the target", label, d.name),
        )
        .await?;
        Ok(TransferAction::Refreshed)
    }

    /// Rasters have no row-level operations; a present raster is dropped and
    /// recopied whole.
    async fn transfer_raster(
        &self,
        d: &TransferDirective,
        report: &mut RunReport,
    ) -> Result<TransferAction> {
        let src = self.source_path(d);

        if !d.already_there {
            let dst = self.new_target_path(d);
            self.courier.copy_object(&src, &dst).await?;
            self.log_and_note(
                report,
                format!("Copied in new raster dataset {} to the target", d.name),
            )
            .await?;
            return Ok(TransferAction::Created);
        }

        let dst = self.existing_target_path(d);
        if let Err(e) = self.target.delete_object(&dst).await {
            report.warn(format!(
                "Couldn't remove raster dataset {} from the target, probably locked by \
                 another session ({}); skipping it",
                d.name, e
            ));
            return Ok(TransferAction::SkippedLocked);
        }
        self.courier
            .copy_object(&src, &self.new_target_path(d))
            .await?;
        self.log_and_note(
            report,
            format!("Replaced raster dataset {} on the target", d.name),
        )
        .await?;
        Ok(TransferAction::Refreshed)
    }

    fn source_path(&self, d: &TransferDirective) -> ObjectPath {
        ObjectPath {
            dataset: d.dataset.as_deref().and_then(|ds| {
                self.source_catalog
                    .dataset_qualified(ds)
                    .map(|q| q.qualified())
            }),
            name: d.source_qualified(),
        }
    }

    /// Address for an object being created: bare local name, container as the
    /// target knows it (or bare when just created this run).
    fn new_target_path(&self, d: &TransferDirective) -> ObjectPath {
        ObjectPath {
            dataset: d.dataset.as_deref().map(|ds| {
                self.target_catalog
                    .dataset_qualified(ds)
                    .map(|q| q.qualified())
                    .unwrap_or_else(|| ds.to_string())
            }),
            name: d.name.clone(),
        }
    }

    fn existing_target_path(&self, d: &TransferDirective) -> ObjectPath {
        ObjectPath {
            dataset: d.dataset.as_deref().and_then(|ds| {
                self.target_catalog
                    .dataset_qualified(ds)
                    .map(|q| q.qualified())
            }),
            name: d.target_qualified(),
        }
    }

    /// Post-write row accounting. A count mismatch isn't fatal (appends drop
    /// fields that don't match) but it belongs in the report.
    async fn check_counts(
        &self,
        d: &TransferDirective,
        src: &ObjectPath,
        dst: &ObjectPath,
        report: &mut RunReport,
    ) -> Result<()> {
        if !d.kind.has_rows() {
            return Ok(());
        }
        let src_n = self.source.row_count(src).await?;
        let dst_n = self.target.row_count(dst).await?;
        if src_n != dst_n {
            report.warn(format!(
                "{} {}: source has {} rows but target ended up with {}",
                d.kind.label(),
                d.name,
                src_n,
                dst_n
            ));
        } else {
            debug!(name = %d.name, rows = src_n, "row counts agree");
        }
        Ok(())
    }

    /// Record a note and, on a hub target, insert the matching log-table row.
    async fn log_and_note(&self, report: &mut RunReport, note: String) -> Result<()> {
        if let Some(log_table) = &self.hub_log {
            self.target
                .insert_row(log_table, &LOG_FIELDS, &[report::today(), note.clone()])
                .await?;
        }
        report.note(note);
        Ok(())
    }
}
