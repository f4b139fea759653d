//! Fetch plans: which relations are materialized with a query's results.

use serde::{Deserialize, Serialize};

use crate::metamodel::RelationAttr;

/// Set of relation nodes to load, in dot notation (`models.cars`).
///
/// A nested node implies its parents: `models.cars` loads `models` too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchGraph {
    nodes: Vec<String>,
}

impl FetchGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from raw node paths.
    pub fn from_nodes<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut graph = Self::new();
        for node in nodes {
            graph.push(node.into());
        }
        graph
    }

    /// Add a top-level relation of the root entity.
    pub fn with<E, T>(mut self, relation: RelationAttr<E, T>) -> Self {
        self.push(relation.name().to_string());
        self
    }

    /// Add a relation reached through another relation.
    pub fn with_nested<E, T, U>(
        mut self,
        parent: RelationAttr<E, T>,
        child: RelationAttr<T, U>,
    ) -> Self {
        self.push(format!("{}.{}", parent.name(), child.name()));
        self
    }

    fn push(&mut self, node: String) {
        if !self.nodes.contains(&node) {
            self.nodes.push(node);
        }
    }

    /// Node paths in insertion order.
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level relation names, each listed once.
    pub fn roots(&self) -> Vec<&str> {
        let mut roots: Vec<&str> = Vec::new();
        for node in &self.nodes {
            let head = node.split('.').next().unwrap_or(node);
            if !roots.contains(&head) {
                roots.push(head);
            }
        }
        roots
    }

    /// Whether the graph loads the given top-level relation.
    pub fn contains(&self, relation: &str) -> bool {
        self.roots().contains(&relation)
    }

    /// Nodes below a top-level relation, with its prefix stripped.
    pub fn subgraph(&self, relation: &str) -> FetchGraph {
        let prefix = format!("{relation}.");
        FetchGraph::from_nodes(
            self.nodes
                .iter()
                .filter_map(|node| node.strip_prefix(&prefix)),
        )
    }
}

/// How a fetch plan treats relations mapped as eager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FetchMode {
    /// Load only the listed relations; statically eager relations stay unloaded.
    AssociationsOnly,
    /// Load the listed relations in addition to the statically eager ones.
    AssociationsPlusDefaultEager,
}

impl FetchMode {
    /// Name of the hint a persistence engine would attach the graph under.
    pub fn hint_name(&self) -> &'static str {
        match self {
            FetchMode::AssociationsOnly => "fetchgraph",
            FetchMode::AssociationsPlusDefaultEager => "loadgraph",
        }
    }
}

/// A fetch graph together with its mode. At most one applies per query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchPlan {
    pub graph: FetchGraph,
    pub mode: FetchMode,
}

impl FetchPlan {
    pub fn new(graph: FetchGraph, mode: FetchMode) -> Self {
        Self { graph, mode }
    }

    /// Load exactly the relations in `graph`.
    pub fn associations_only(graph: FetchGraph) -> Self {
        Self::new(graph, FetchMode::AssociationsOnly)
    }

    /// Load the relations in `graph` plus the statically eager ones.
    pub fn with_default_eager(graph: FetchGraph) -> Self {
        Self::new(graph, FetchMode::AssociationsPlusDefaultEager)
    }
}

/// The two ways a caller can describe what to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchSpec {
    /// A plan supplied as-is.
    Plan(FetchPlan),
    /// An attribute list; `only` suppresses statically eager relations.
    Attributes { graph: FetchGraph, only: bool },
}

impl FetchSpec {
    /// Normalize to a single fetch plan.
    pub fn into_plan(self) -> FetchPlan {
        match self {
            FetchSpec::Plan(plan) => plan,
            FetchSpec::Attributes { graph, only: true } => FetchPlan::associations_only(graph),
            FetchSpec::Attributes { graph, only: false } => FetchPlan::with_default_eager(graph),
        }
    }
}

impl From<FetchPlan> for FetchSpec {
    fn from(plan: FetchPlan) -> Self {
        FetchSpec::Plan(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Vendor;
    struct Model;
    struct Car;
    const MODELS: RelationAttr<Vendor, Model> = RelationAttr::new("models");
    const CARS: RelationAttr<Model, Car> = RelationAttr::new("cars");

    #[test]
    fn test_nested_nodes_imply_roots() {
        let graph = FetchGraph::new().with_nested(MODELS, CARS);
        assert_eq!(graph.nodes(), &["models.cars".to_string()]);
        assert!(graph.contains("models"));
        assert!(!graph.contains("cars"));
        assert_eq!(graph.subgraph("models").nodes(), &["cars".to_string()]);
    }

    #[test]
    fn test_duplicate_nodes_are_collapsed() {
        let graph = FetchGraph::new().with(MODELS).with(MODELS);
        assert_eq!(graph.nodes().len(), 1);
        let graph = FetchGraph::from_nodes(["models", "models.cars"]);
        assert_eq!(graph.roots(), vec!["models"]);
    }

    #[test]
    fn test_spec_normalizes_to_plan() {
        let graph = FetchGraph::new().with(MODELS);
        let only = FetchSpec::Attributes {
            graph: graph.clone(),
            only: true,
        };
        assert_eq!(only.into_plan().mode, FetchMode::AssociationsOnly);

        let extra = FetchSpec::Attributes {
            graph: graph.clone(),
            only: false,
        };
        assert_eq!(
            extra.into_plan().mode,
            FetchMode::AssociationsPlusDefaultEager
        );

        let direct = FetchSpec::from(FetchPlan::associations_only(graph.clone()));
        assert_eq!(direct.into_plan(), FetchPlan::associations_only(graph));
    }

    #[test]
    fn test_hint_names() {
        assert_eq!(FetchMode::AssociationsOnly.hint_name(), "fetchgraph");
        assert_eq!(
            FetchMode::AssociationsPlusDefaultEager.hint_name(),
            "loadgraph"
        );
    }
}
