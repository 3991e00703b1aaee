//! Catalog reconciliation: turning two catalogs into an ordered transfer plan.
//!
//! The reconciler performs no I/O. It takes the source and target [`Catalog`]s
//! (already enumerated by the storage layer) plus the optional directive rows
//! from a spoke's control table, and produces one [`TransferDirective`] per
//! object to move, a tagged [`PlanOutcome`] per processed name, and the deduped
//! list of feature datasets that must be created on the target before any
//! transfer runs.
//!
//! Resolution failures never abort planning: an unresolvable name degrades to
//! a logged skip and the plan proceeds with the remaining objects.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::{Catalog, CatalogEntry, ObjectKind, QualifiedName};
use crate::protocol::{DirectiveKeyword, DirectiveRow};

/// A planning record for one data object, keyed by local name.
///
/// Constructed once during plan-building, consumed exactly once during
/// execution, never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDirective {
    /// Local name (no schema prefix).
    pub name: String,
    /// Object kind.
    pub kind: ObjectKind,
    /// Local name of the enclosing feature dataset, or `None` for a
    /// stand-alone object. Only feature classes have containers.
    pub dataset: Option<String>,
    /// Schema prefix of the object on the source side (empty for file-based
    /// stores).
    pub source_prefix: String,
    /// Push/pull only when a change is detected between the two sides.
    pub detect_changes: bool,
    /// Sort field for change detection; always present when `detect_changes`
    /// is set, absent otherwise.
    pub sort_field: Option<String>,
    /// Whether a same-named counterpart already exists on the target side.
    pub already_there: bool,
    /// Schema prefix observed in the target catalog, empty when the object
    /// isn't there yet.
    pub target_prefix: String,
}

impl TransferDirective {
    /// Qualified source-side name.
    pub fn source_qualified(&self) -> String {
        format!("{}{}", self.source_prefix, self.name)
    }

    /// Qualified target-side name (meaningful when `already_there`).
    pub fn target_qualified(&self) -> String {
        format!("{}{}", self.target_prefix, self.name)
    }
}

/// Tagged outcome for each name the planner processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanOutcome {
    /// A directive was produced for this local name.
    Planned(String),
    /// A STATIC directive excluded this name.
    SkippedStatic(String),
    /// The name resolved to nothing on the source side.
    SkippedNotFound(String),
    /// A directive for this local name already exists in the plan.
    SkippedDuplicate(String),
}

/// Result of reconciliation: the ordered directives plus bookkeeping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferPlan {
    /// Ordered transfer directives, one per object to move.
    pub directives: Vec<TransferDirective>,
    /// One tagged outcome per processed name, in processing order.
    pub outcomes: Vec<PlanOutcome>,
    /// Feature datasets (local names) referenced by directives but absent
    /// from the target; each appears exactly once, in first-reference order.
    pub datasets_to_create: Vec<String>,
}

impl TransferPlan {
    /// Names skipped because they resolved to nothing.
    pub fn skipped_not_found(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                PlanOutcome::SkippedNotFound(n) => Some(n.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Builds a [`TransferPlan`] from a source catalog, a target catalog, and the
/// optional directive rows of a spoke store.
pub struct Reconciler<'a> {
    source: &'a Catalog,
    target: &'a Catalog,
}

/// Internal accumulator threaded through plan-building.
struct PlanBuilder {
    plan: TransferPlan,
    // Lowercased local names already planned; enforces one directive per name.
    seen: HashSet<String>,
    // Lowercased dataset names already marked for creation.
    creating: HashSet<String>,
}

impl<'a> Reconciler<'a> {
    pub fn new(source: &'a Catalog, target: &'a Catalog) -> Self {
        Self { source, target }
    }

    /// Plan every source object with no per-object exceptions.
    ///
    /// Feature classes, then tables, then rasters. The order carries no
    /// semantic weight but stays fixed for reproducible logs. Default mode
    /// never compares before overwriting.
    pub fn plan_default(&self) -> TransferPlan {
        let mut b = PlanBuilder::new();

        for entry in &self.source.feature_classes {
            let d = self.feature_class_directive(entry, DirectiveKeyword::Refresh, None);
            self.push(&mut b, d);
        }
        for table in &self.source.tables {
            let d = self.table_directive(table, DirectiveKeyword::Refresh, None);
            self.push(&mut b, d);
        }
        for raster in &self.source.rasters {
            let d = self.raster_directive(raster);
            self.push(&mut b, d);
        }

        b.plan
    }

    /// Plan from an explicit directive list, in table order.
    pub fn plan_with_directives(&self, rows: &[DirectiveRow]) -> TransferPlan {
        let mut b = PlanBuilder::new();

        for row in rows {
            if row.keyword == DirectiveKeyword::Static {
                debug!("{}: STATIC directive, skipping", row.object_name);
                b.plan
                    .outcomes
                    .push(PlanOutcome::SkippedStatic(row.object_name.clone()));
                continue;
            }

            if row.is_dataset {
                self.expand_dataset(&mut b, row);
            } else {
                self.resolve_single(&mut b, row);
            }
        }

        b.plan
    }

    /// Expand a feature-dataset directive to one directive per member class.
    fn expand_dataset(&self, b: &mut PlanBuilder, row: &DirectiveRow) {
        let Some(dataset) = self.source.find_dataset_qualified(&row.object_name) else {
            warn!(
                "directive names feature dataset {} but the source store has no dataset by \
                 that name, skipping it",
                row.object_name
            );
            b.plan
                .outcomes
                .push(PlanOutcome::SkippedNotFound(row.object_name.clone()));
            return;
        };

        // Keyword and sort field apply uniformly to every member.
        for entry in self.source.feature_classes_in(&dataset.qualified()) {
            let d = self.feature_class_directive(entry, row.keyword, row.sort_field.as_deref());
            self.push(b, d);
        }
    }

    /// Resolve an individual name: feature class, then table, then raster.
    /// First match wins; the priority is fixed here, not an artifact of
    /// enumeration order.
    fn resolve_single(&self, b: &mut PlanBuilder, row: &DirectiveRow) {
        if let Some(entry) = self.source.find_feature_class_qualified(&row.object_name) {
            let d = self.feature_class_directive(entry, row.keyword, row.sort_field.as_deref());
            self.push(b, d);
        } else if let Some(table) = self.source.find_table_qualified(&row.object_name) {
            let d = self.table_directive(table, row.keyword, row.sort_field.as_deref());
            self.push(b, d);
        } else if let Some(raster) = self.source.find_raster_qualified(&row.object_name) {
            // Rasters never support change detection.
            let d = self.raster_directive(raster);
            self.push(b, d);
        } else {
            warn!(
                "directive names data object {} but the source store has no object by that \
                 name, skipping it",
                row.object_name
            );
            b.plan
                .outcomes
                .push(PlanOutcome::SkippedNotFound(row.object_name.clone()));
        }
    }

    fn feature_class_directive(
        &self,
        entry: &CatalogEntry,
        keyword: DirectiveKeyword,
        sort_field: Option<&str>,
    ) -> TransferDirective {
        let (detect_changes, sort_field) = change_detection(keyword, sort_field);
        let (already_there, target_prefix) = self.target_lookup(ObjectKind::FeatureClass, entry.name.local());
        TransferDirective {
            name: entry.name.local().to_string(),
            kind: ObjectKind::FeatureClass,
            dataset: entry.dataset.as_ref().map(|d| d.local().to_string()),
            source_prefix: entry.name.prefix().to_string(),
            detect_changes,
            sort_field,
            already_there,
            target_prefix,
        }
    }

    fn table_directive(
        &self,
        name: &QualifiedName,
        keyword: DirectiveKeyword,
        sort_field: Option<&str>,
    ) -> TransferDirective {
        let (detect_changes, sort_field) = change_detection(keyword, sort_field);
        let (already_there, target_prefix) = self.target_lookup(ObjectKind::Table, name.local());
        TransferDirective {
            name: name.local().to_string(),
            kind: ObjectKind::Table,
            dataset: None,
            source_prefix: name.prefix().to_string(),
            detect_changes,
            sort_field,
            already_there,
            target_prefix,
        }
    }

    fn raster_directive(&self, name: &QualifiedName) -> TransferDirective {
        let (already_there, target_prefix) = self.target_lookup(ObjectKind::Raster, name.local());
        TransferDirective {
            name: name.local().to_string(),
            kind: ObjectKind::Raster,
            dataset: None,
            source_prefix: name.prefix().to_string(),
            detect_changes: false,
            sort_field: None,
            already_there,
            target_prefix,
        }
    }

    /// Case-insensitive local-name lookup in the matching target sub-catalog.
    /// Schema prefixes are ignored for matching but retained for addressing.
    fn target_lookup(&self, kind: ObjectKind, local: &str) -> (bool, String) {
        let found = match kind {
            ObjectKind::FeatureClass => self
                .target
                .find_feature_class(local)
                .map(|e| e.name.prefix().to_string()),
            ObjectKind::Table => self.target.find_table(local).map(|n| n.prefix().to_string()),
            ObjectKind::Raster => self
                .target
                .find_raster(local)
                .map(|n| n.prefix().to_string()),
        };
        match found {
            Some(prefix) => (true, prefix),
            None => (false, String::new()),
        }
    }

    /// Append a directive, enforcing local-name uniqueness and recording any
    /// container that must be created on the target.
    fn push(&self, b: &mut PlanBuilder, directive: TransferDirective) {
        let key = directive.name.to_ascii_lowercase();
        if !b.seen.insert(key) {
            warn!(
                "{} already has a directive in this plan, skipping the duplicate",
                directive.name
            );
            b.plan
                .outcomes
                .push(PlanOutcome::SkippedDuplicate(directive.name));
            return;
        }

        if let Some(ds) = directive.dataset.as_deref() {
            if !self.target.has_dataset(ds) && b.creating.insert(ds.to_ascii_lowercase()) {
                b.plan.datasets_to_create.push(ds.to_string());
            }
        }

        b.plan
            .outcomes
            .push(PlanOutcome::Planned(directive.name.clone()));
        b.plan.directives.push(directive);
    }
}

impl PlanBuilder {
    fn new() -> Self {
        Self {
            plan: TransferPlan::default(),
            seen: HashSet::new(),
            creating: HashSet::new(),
        }
    }
}

/// Change detection applies only when the keyword is exactly DETECT_CHANGES
/// and a non-empty sort field was given; anything else is a plain refresh.
fn change_detection(
    keyword: DirectiveKeyword,
    sort_field: Option<&str>,
) -> (bool, Option<String>) {
    match (keyword, sort_field) {
        (DirectiveKeyword::DetectChanges, Some(f)) if !f.trim().is_empty() => {
            (true, Some(f.trim().to_string()))
        }
        _ => (false, None),
    }
}
