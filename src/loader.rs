//! Table-level population: walk foreign keys so parents are filled before
//! children.
//!
//! One `populate` call is one run. The run keeps a loaded-table set that
//! grows monotonically: a table reached through two paths (a diamond of
//! foreign keys) is populated once, and a cyclic foreign-key chain is cut
//! off as an explicit error instead of recursing forever. That guard is the
//! run-scoped membership check, not the dependency graph's cycle detector.

use indexmap::{IndexMap, IndexSet};
use tracing::info;

use crate::catalog::Catalog;
use crate::error::{Result, TabflowError};
use crate::generator::{ColumnGenerator, GeneratorResource};
use crate::resource::TabularResource;
use crate::schema::Schema;
use crate::transfer::{Transfer, TransferOptions};

/// Per-table knobs for one population run.
#[derive(Debug, Clone, Default)]
pub struct TableOverride {
    /// Rows to generate; the loader default otherwise.
    pub row_count: Option<u64>,
    /// Per-column generator overrides, by column name.
    pub columns: IndexMap<String, ColumnGenerator>,
}

impl TableOverride {
    #[must_use]
    pub fn rows(mut self, row_count: u64) -> Self {
        self.row_count = Some(row_count);
        self
    }

    #[must_use]
    pub fn column(mut self, name: impl Into<String>, generator: ColumnGenerator) -> Self {
        self.columns.insert(name.into(), generator);
        self
    }
}

/// One populated table, in load order.
#[derive(Debug)]
pub struct LoadedTable {
    pub table: String,
    pub rows: u64,
}

/// Outcome of one population run. May list more tables than were asked for
/// when parent loading pulled extra tables in.
#[derive(Debug)]
pub struct LoadReport {
    pub loaded: Vec<LoadedTable>,
}

/// Foreign-key-ordered table population over a catalog.
pub struct TableLoader {
    catalog: Catalog,
    load_parents: bool,
    default_row_count: u64,
    overrides: IndexMap<String, TableOverride>,
    transfer_options: TransferOptions,
}

impl TableLoader {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            load_parents: false,
            default_row_count: 10,
            overrides: IndexMap::new(),
            transfer_options: TransferOptions::default(),
        }
    }

    /// Also populate empty parent tables that are not part of the asked
    /// set. Off by default: an empty, un-loadable parent is an error.
    #[must_use]
    pub fn load_parents(mut self, load: bool) -> Self {
        self.load_parents = load;
        self
    }

    /// Row count for tables without an explicit override.
    #[must_use]
    pub fn default_row_count(mut self, rows: u64) -> Self {
        self.default_row_count = rows;
        self
    }

    #[must_use]
    pub fn override_table(mut self, table: impl Into<String>, o: TableOverride) -> Self {
        self.overrides.insert(table.into(), o);
        self
    }

    #[must_use]
    pub fn transfer_options(mut self, options: TransferOptions) -> Self {
        self.transfer_options = options;
        self
    }

    /// Populate every named table, parents first.
    pub fn populate(&self, tables: &[&str]) -> Result<LoadReport> {
        let mut loaded: IndexSet<String> = IndexSet::new();
        let mut visiting: Vec<String> = Vec::new();
        let mut report = LoadReport { loaded: Vec::new() };
        for table in tables {
            self.populate_table(table, &mut loaded, &mut visiting, &mut report)?;
        }
        Ok(report)
    }

    fn populate_table(
        &self,
        name: &str,
        loaded: &mut IndexSet<String>,
        visiting: &mut Vec<String>,
        report: &mut LoadReport,
    ) -> Result<()> {
        // Already populated this run, possibly via another path.
        if loaded.contains(name) {
            return Ok(());
        }
        // Re-entering a table still being populated is a foreign-key cycle.
        if visiting.iter().any(|t| t == name) {
            return Err(TabflowError::CycleDetected {
                node: name.to_string(),
            });
        }
        visiting.push(name.to_string());

        let table = self.catalog.get(name).ok_or_else(|| {
            TabflowError::stream(name, "the table is not registered in the catalog")
        })?;
        let schema = table.schema();

        // Parents first.
        for fk in &schema.foreign_keys {
            let parent_name = fk.parent_table.as_str();
            if loaded.contains(parent_name) {
                continue;
            }
            let parent = self.catalog.get(parent_name).ok_or_else(|| {
                TabflowError::stream(
                    name,
                    format!("the foreign table ({parent_name}) is not registered in the catalog"),
                )
            })?;
            if parent.row_count()? == 0 {
                if self.load_parents {
                    info!(
                        "the table ({parent_name}) has no records and the option to load parents is on; loading it before ({name})"
                    );
                    self.populate_table(parent_name, loaded, visiting, report)?;
                } else {
                    return Err(TabflowError::UnloadableParent {
                        child: name.to_string(),
                        parent: parent_name.to_string(),
                    });
                }
            }
        }

        let generator = self.build_generator(name, &schema)?;
        let transferred = Transfer::new(generator.into_handle(), table)
            .with_options(self.transfer_options.clone())
            .run()?;

        visiting.pop();
        loaded.insert(name.to_string());
        report.loaded.push(LoadedTable {
            table: name.to_string(),
            rows: transferred.rows,
        });
        Ok(())
    }

    /// A generator shaped like the table: defaults per column type, caller
    /// overrides on top, and foreign-key columns sampling the parent's key
    /// domain.
    fn build_generator(&self, name: &str, schema: &Schema) -> Result<GeneratorResource> {
        let row_count = self
            .overrides
            .get(name)
            .and_then(|o| o.row_count)
            .unwrap_or(self.default_row_count);

        let mut generator = GeneratorResource::from_schema(name, schema.clone(), Some(row_count));

        for fk in &schema.foreign_keys {
            if let Some(o) = self.overrides.get(name) {
                if o.columns.contains_key(&fk.column) {
                    continue;
                }
            }
            let parent = self.catalog.get(&fk.parent_table).ok_or_else(|| {
                TabflowError::stream(
                    name,
                    format!("the foreign table ({}) is not registered in the catalog", fk.parent_table),
                )
            })?;
            let parent_rows = parent.row_count()?;
            if parent_rows > 0 {
                // The parent's default key generator is the 1-step sequence,
                // so its key domain is 1..=rows.
                generator = generator.with_generator(
                    &fk.column,
                    ColumnGenerator::Uniform {
                        min: 1,
                        max: parent_rows as i64,
                    },
                )?;
            }
        }

        if let Some(o) = self.overrides.get(name) {
            for (column, column_generator) in &o.columns {
                generator = generator.with_generator(column, column_generator.clone())?;
            }
        }

        Ok(generator)
    }
}
