//! Resource dependency graph using `petgraph`.
//!
//! Builds a directed acyclic graph from the `Ref`, `Fn::GetAtt` and
//! `DependsOn` edges of a template and resolves the order in which the
//! provisioning engine will have to create the resources.

use std::collections::HashMap;

use petgraph::graph::NodeIndex;
use statping_common::error::{Result, StackError};
use statping_common::types::LogicalId;

use crate::template::{Template, intrinsic};

/// A dependency graph of declared resources.
#[derive(Debug)]
pub struct ResourceGraph {
    /// Internal petgraph representation.
    graph: petgraph::Graph<LogicalId, ()>,
    /// Node lookup by logical id.
    nodes: HashMap<LogicalId, NodeIndex>,
}

impl ResourceGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: petgraph::Graph::new(),
            nodes: HashMap::new(),
        }
    }

    /// Builds the graph of a template.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::NotFound`] if a resource or an output refers to
    /// a logical id that is not declared.
    pub fn from_template(template: &Template) -> Result<Self> {
        let mut graph = Self::new();
        for id in template.resources.keys() {
            let _ = graph.add_resource(id.clone());
        }

        for (id, resource) in &template.resources {
            let targets = intrinsic::references(&resource.properties)
                .into_iter()
                .chain(resource.depends_on.iter().cloned());
            for target in targets {
                let dependency = graph.node(&target).ok_or_else(|| StackError::NotFound {
                    kind: "resource",
                    id: format!("{target} (referenced by {id})"),
                })?;
                let dependent = graph.node(id).ok_or_else(|| StackError::NotFound {
                    kind: "resource",
                    id: id.to_string(),
                })?;
                graph.add_dependency(dependent, dependency);
            }
        }

        for (name, output) in &template.outputs {
            for target in intrinsic::references(&output.value) {
                if graph.node(&target).is_none() {
                    return Err(StackError::NotFound {
                        kind: "resource",
                        id: format!("{target} (referenced by output {name})"),
                    });
                }
            }
        }

        Ok(graph)
    }

    /// Adds a resource node to the graph.
    pub fn add_resource(&mut self, id: LogicalId) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(&id) {
            return idx;
        }
        let idx = self.graph.add_node(id.clone());
        let _ = self.nodes.insert(id, idx);
        idx
    }

    /// Adds a dependency edge: `dependent` depends on `dependency`.
    ///
    /// The graph edge points from `dependency` to `dependent`
    /// so that topological sort yields dependencies first.
    pub fn add_dependency(&mut self, dependent: NodeIndex, dependency: NodeIndex) {
        let _ = self.graph.update_edge(dependency, dependent, ());
    }

    fn node(&self, id: &LogicalId) -> Option<NodeIndex> {
        self.nodes.get(id).copied()
    }

    /// Returns the direct dependencies of a resource, sorted.
    pub fn dependencies_of(&self, id: &LogicalId) -> Vec<LogicalId> {
        let Some(idx) = self.node(id) else {
            return Vec::new();
        };
        let mut deps: Vec<LogicalId> = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .filter_map(|n| self.graph.node_weight(n).cloned())
            .collect();
        deps.sort();
        deps.dedup();
        deps
    }

    /// Returns a creation order for all resources.
    ///
    /// Every resource appears after the resources it depends on.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Cycle`] if the graph contains cycles.
    pub fn resolve_order(&self) -> Result<Vec<LogicalId>> {
        match petgraph::algo::toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .iter()
                .filter_map(|&idx| self.graph.node_weight(idx).cloned())
                .collect()),
            Err(cycle) => Err(StackError::Cycle {
                id: self
                    .graph
                    .node_weight(cycle.node_id())
                    .map_or_else(|| "<unknown>".to_string(), ToString::to_string),
            }),
        }
    }
}

impl Default for ResourceGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::template::{CfnResource, Output};

    fn id(name: &str) -> LogicalId {
        LogicalId::new(name)
    }

    #[test]
    fn empty_graph_resolves_to_empty() {
        let graph = ResourceGraph::new();
        let order = graph.resolve_order().expect("should resolve");
        assert!(order.is_empty());
    }

    #[test]
    fn linear_dependency_chain() {
        let mut graph = ResourceGraph::new();
        let service = graph.add_resource(id("Service"));
        let db = graph.add_resource(id("Db"));
        graph.add_dependency(service, db);

        let order = graph.resolve_order().expect("should resolve");
        let pos = |name: &str| order.iter().position(|n| n.as_str() == name).expect(name);
        assert!(pos("Db") < pos("Service"), "db should come first: {order:?}");
    }

    #[test]
    fn diamond_dependency() {
        let mut graph = ResourceGraph::new();
        let a = graph.add_resource(id("a"));
        let b = graph.add_resource(id("b"));
        let c = graph.add_resource(id("c"));
        let d = graph.add_resource(id("d"));
        graph.add_dependency(a, b);
        graph.add_dependency(a, c);
        graph.add_dependency(b, d);
        graph.add_dependency(c, d);

        let order = graph.resolve_order().expect("should resolve");
        assert_eq!(order.len(), 4);
        let pos = |name: &str| order.iter().position(|n| n.as_str() == name).expect(name);
        assert!(pos("d") < pos("b"));
        assert!(pos("d") < pos("c"));
        assert!(pos("b") < pos("a"));
        assert!(pos("c") < pos("a"));
    }

    #[test]
    fn cycle_detection() {
        let mut graph = ResourceGraph::new();
        let a = graph.add_resource(id("a"));
        let b = graph.add_resource(id("b"));
        graph.add_dependency(a, b);
        graph.add_dependency(b, a);

        let msg = graph.resolve_order().unwrap_err().to_string();
        assert!(msg.contains("cyclic"), "got: {msg}");
    }

    #[test]
    fn adding_same_id_twice_reuses_node() {
        let mut graph = ResourceGraph::new();
        let first = graph.add_resource(id("x"));
        let second = graph.add_resource(id("x"));
        assert_eq!(first, second);
        assert_eq!(graph.resolve_order().expect("resolve").len(), 1);
    }

    #[test]
    fn from_template_follows_refs_and_depends_on() {
        let mut template = Template::new(None);
        let _ = template
            .resources
            .insert(id("Vpc"), CfnResource::new("AWS::EC2::VPC", json!({})));
        let _ = template
            .resources
            .insert(id("Igw"), CfnResource::new("AWS::EC2::InternetGateway", json!({})));
        let _ = template.resources.insert(
            id("Route"),
            CfnResource::new(
                "AWS::EC2::Route",
                json!({ "Vpc": { "Ref": "Vpc" }, "Gw": { "Fn::GetAtt": ["Igw", "Id"] } }),
            ),
        );
        let _ = template.resources.insert(
            id("Nat"),
            CfnResource::new("AWS::EC2::NatGateway", json!({})).depends_on(&id("Route")),
        );

        let graph = ResourceGraph::from_template(&template).expect("build");
        assert_eq!(graph.dependencies_of(&id("Route")), vec![id("Igw"), id("Vpc")]);
        assert_eq!(graph.dependencies_of(&id("Nat")), vec![id("Route")]);
        assert!(graph.dependencies_of(&id("Ghost")).is_empty());

        let order = graph.resolve_order().expect("resolve");
        let pos = |name: &str| order.iter().position(|n| n.as_str() == name).expect(name);
        assert!(pos("Vpc") < pos("Route"));
        assert!(pos("Route") < pos("Nat"));
    }

    #[test]
    fn from_template_rejects_dangling_depends_on() {
        let mut template = Template::new(None);
        let _ = template.resources.insert(
            id("Nat"),
            CfnResource::new("AWS::EC2::NatGateway", json!({})).depends_on(&id("Gone")),
        );
        let msg = ResourceGraph::from_template(&template).unwrap_err().to_string();
        assert!(msg.contains("Gone (referenced by Nat)"), "got: {msg}");
    }

    #[test]
    fn from_template_rejects_dangling_output() {
        let mut template = Template::new(None);
        let _ = template.outputs.insert(
            "Url".into(),
            Output {
                value: json!({ "Fn::GetAtt": ["Lb", "DNSName"] }),
                description: None,
            },
        );
        let msg = ResourceGraph::from_template(&template).unwrap_err().to_string();
        assert!(msg.contains("output Url"), "got: {msg}");
    }

    #[test]
    fn from_template_detects_reference_cycles() {
        let mut template = Template::new(None);
        let _ = template.resources.insert(
            id("A"),
            CfnResource::new("AWS::X::A", json!({ "B": { "Ref": "B" } })),
        );
        let _ = template.resources.insert(
            id("B"),
            CfnResource::new("AWS::X::B", json!({ "A": { "Ref": "A" } })),
        );
        let graph = ResourceGraph::from_template(&template).expect("build");
        assert!(graph.resolve_order().is_err());
    }
}
