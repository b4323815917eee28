//! Record-level generation scheduling: which generator feeds which target.
//!
//! The planner resolves generator-to-target pairings fresh for every run:
//! by explicit selector, by logical-name match, or by the single-pair
//! shortcut. The resulting plan preserves target input order for its pairs
//! and hands each pair to the transfer orchestrator, sequencing
//! foreign-key-dependent targets parents-first.

use indexmap::IndexMap;
use std::time::Duration;
use tracing::debug;

use crate::catalog::{Catalog, Selector};
use crate::config::{FillOptions, ProcessingType, StreamGranularity};
use crate::error::{Result, TabflowError};
use crate::generator::GeneratorResource;
use crate::graph::{DependencyGraph, DependencyNode};
use crate::resource::{ResourceHandle, TabularResource};
use crate::transfer::{Transfer, TransferOptions, TransferReport};

/// One resolved generator-to-target pairing.
pub struct FillPair {
    pub generator: ResourceHandle,
    pub target: ResourceHandle,
}

impl std::fmt::Debug for FillPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FillPair")
            .field("generator", &self.generator.logical_name())
            .field("target", &self.target.logical_name())
            .finish()
    }
}

/// An ordered set of pairings, ready to execute.
pub struct FillPlan {
    pub pairs: Vec<FillPair>,
    options: FillOptions,
}

impl std::fmt::Debug for FillPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FillPlan")
            .field("pairs", &self.pairs)
            .field("options", &self.options)
            .finish()
    }
}

/// Resolves targets and generators out of a catalog into a [`FillPlan`].
pub struct FillPlanner {
    catalog: Catalog,
    /// Generators live in their own namespace so a generator may carry the
    /// same logical name as the target it fills.
    generators: Catalog,
    options: FillOptions,
}

impl FillPlanner {
    pub fn new(catalog: Catalog, options: FillOptions) -> Self {
        Self {
            generators: catalog.clone(),
            catalog,
            options,
        }
    }

    /// Resolve generator selectors against a separate catalog.
    #[must_use]
    pub fn with_generator_catalog(mut self, generators: Catalog) -> Self {
        self.generators = generators;
        self
    }

    /// Resolve the configured selectors and build the pairing.
    pub fn resolve(&self) -> Result<FillPlan> {
        let targets: Vec<ResourceHandle> = self
            .catalog
            .select_all(
                &to_selectors(&self.options.data_selectors),
                self.options.strict_selection,
            )?
            .into_iter()
            .map(|selection| selection.resource)
            .collect();
        let generators: Vec<ResourceHandle> = self
            .generators
            .select_all(
                &to_selectors(&self.options.generator_selectors),
                self.options.strict_selection,
            )?
            .into_iter()
            .map(|selection| selection.resource)
            .collect();
        self.pair(targets, generators)
    }

    /// Build the pairing for pre-resolved targets and generators.
    pub fn pair(
        &self,
        targets: Vec<ResourceHandle>,
        generators: Vec<ResourceHandle>,
    ) -> Result<FillPlan> {
        check_single_connection(&targets)?;

        let default_cap = self.options.default_record_count();

        // Index the resolved generators by logical name, keeping their
        // resolution order for the error message below.
        let mut by_name: IndexMap<String, ResourceHandle> = IndexMap::new();
        for generator in generators {
            by_name.insert(generator.logical_name().to_string(), generator);
        }

        // Mono-fill shortcut: one target, one generator, names need not
        // match.
        if targets.len() == 1 && by_name.len() == 1 {
            let (_, generator) = by_name.pop().expect("one generator is present");
            let target = targets.into_iter().next().expect("one target is present");
            return Ok(FillPlan {
                pairs: vec![FillPair {
                    generator: capped(generator, default_cap),
                    target,
                }],
                options: self.options.clone(),
            });
        }

        let mut pairs = Vec::with_capacity(targets.len());
        for target in targets {
            let name = target.logical_name();
            match by_name.get(name) {
                Some(generator) => {
                    pairs.push(FillPair {
                        generator: capped(generator.clone(), default_cap),
                        target,
                    });
                }
                None => {
                    if target.schema().column_count() == 0 {
                        return Err(TabflowError::UnresolvedGenerator {
                            target: name.to_string(),
                            known: by_name.keys().cloned().collect(),
                        });
                    }
                    // The target describes itself; synthesize a generator
                    // bound to its own schema.
                    debug!("no generator matches the target ({name}); synthesizing one from its schema");
                    let dummy =
                        GeneratorResource::from_schema(name, target.schema(), Some(default_cap));
                    pairs.push(FillPair {
                        generator: dummy.into_handle(),
                        target,
                    });
                }
            }
        }

        Ok(FillPlan {
            pairs,
            options: self.options.clone(),
        })
    }
}

impl FillPlan {
    /// Execute every pairing, parents before children, and return the
    /// transfer reports in execution order.
    pub fn execute(&self) -> Result<Vec<TransferReport>> {
        let ordered = self.creation_ordered_pairs()?;
        let transfer_options = self.transfer_options();
        let mut reports = Vec::with_capacity(ordered.len());
        for pair in ordered {
            let transfer = Transfer::new(pair.generator.clone(), pair.target.clone())
                .with_options(transfer_options.clone());
            let report = match self.options.processing_type {
                ProcessingType::Stream => transfer.run_decoupled()?,
                ProcessingType::Batch => transfer.run()?,
            };
            reports.push(report);
        }
        Ok(reports)
    }

    fn transfer_options(&self) -> TransferOptions {
        let mut options = TransferOptions::default();
        if self.options.stream_granularity == StreamGranularity::Record {
            options.batch_size = 1;
        }
        options.poll_timeout = Duration::from_millis(50);
        options
    }

    /// Pairs reordered so that a target appears after every target it has a
    /// foreign key to. Pair order is otherwise the target input order.
    fn creation_ordered_pairs(&self) -> Result<Vec<&FillPair>> {
        let peers: IndexMap<String, ResourceHandle> = self
            .pairs
            .iter()
            .map(|pair| (pair.target.logical_name().to_string(), pair.target.clone()))
            .collect();
        let mut graph: DependencyGraph<TargetNode> = DependencyGraph::new();
        graph.add_nodes(self.pairs.iter().map(|pair| TargetNode {
            handle: pair.target.clone(),
            peers: peers.clone(),
        }));
        let order = graph.creation_order()?;
        let position: IndexMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(index, node)| (node.handle.logical_name(), index))
            .collect();
        let mut ordered: Vec<&FillPair> = self.pairs.iter().collect();
        ordered.sort_by_key(|pair| position.get(pair.target.logical_name()).copied());
        Ok(ordered)
    }
}

/// A fill target viewed as a dependency node: its dependencies are the
/// foreign-key parents that are themselves part of the fill.
#[derive(Clone)]
struct TargetNode {
    handle: ResourceHandle,
    peers: IndexMap<String, ResourceHandle>,
}

impl PartialEq for TargetNode {
    fn eq(&self, other: &Self) -> bool {
        self.handle.logical_name() == other.handle.logical_name()
    }
}

impl Eq for TargetNode {}

impl std::hash::Hash for TargetNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.handle.logical_name().hash(state);
    }
}

impl DependencyNode for TargetNode {
    fn dependencies(&self) -> Vec<Self> {
        self.handle
            .schema()
            .foreign_keys
            .iter()
            .filter_map(|fk| self.peers.get(&fk.parent_table))
            .map(|handle| TargetNode {
                handle: handle.clone(),
                peers: self.peers.clone(),
            })
            .collect()
    }

    fn node_name(&self) -> String {
        self.handle.logical_name().to_string()
    }
}

fn to_selectors(patterns: &[String]) -> Vec<Selector> {
    patterns.iter().map(Selector::new).collect()
}

/// Assign the scheduler default cap to a generator that has none.
fn capped(generator: ResourceHandle, default_cap: u64) -> ResourceHandle {
    match generator.as_any().downcast_ref::<GeneratorResource>() {
        Some(concrete) if concrete.max_record_count().is_none() => {
            concrete.capped_or(default_cap).into_handle()
        }
        _ => generator,
    }
}

/// A fill never spans connections: every accepted target must live in the
/// same system.
fn check_single_connection(targets: &[ResourceHandle]) -> Result<()> {
    let mut connections: Vec<String> = Vec::new();
    for target in targets {
        let connection = target.connection();
        if !connections.iter().any(|c| c == connection) {
            connections.push(connection.to_string());
        }
    }
    if connections.len() > 1 {
        return Err(TabflowError::MultiConnectionFill { connections });
    }
    Ok(())
}
