//! The stack scope.
//!
//! A [`Stack`] owns the template being declared. Builders add resources to
//! it under logical ids derived from their construct path, and may later
//! amend a resource they hold a handle to (for example to attach another
//! security group to a load balancer).

use statping_common::error::{Result, StackError};
use statping_common::types::LogicalId;

use crate::graph::ResourceGraph;
use crate::template::{CfnResource, Output, Template};

/// A named collection of declared resources, rendered as one template.
#[derive(Debug, Clone)]
pub struct Stack {
    id: String,
    template: Template,
}

impl Stack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new(id: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: id.into(),
            template: Template::new(description),
        }
    }

    /// Returns the stack id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display path of a construct, used in descriptions and `Name` tags.
    #[must_use]
    pub fn node_path(&self, path: &[&str]) -> String {
        std::iter::once(self.id.as_str())
            .chain(path.iter().copied())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Declares a resource under the logical id derived from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::DuplicateId`] if the id is already taken.
    pub fn add_resource(&mut self, path: &[&str], resource: CfnResource) -> Result<LogicalId> {
        let id = LogicalId::from_path(path);
        if self.template.resources.contains_key(&id) {
            return Err(StackError::DuplicateId {
                id: id.to_string(),
            });
        }
        tracing::debug!(
            stack = %self.id,
            id = %id,
            resource_type = %resource.resource_type,
            "declared resource"
        );
        let _ = self.template.resources.insert(id.clone(), resource);
        Ok(id)
    }

    /// Returns a declared resource.
    pub fn resource(&self, id: &LogicalId) -> Option<&CfnResource> {
        self.template.resource(id)
    }

    /// Returns a declared resource for amendment.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::NotFound`] if no such resource was declared.
    pub fn resource_mut(&mut self, id: &LogicalId) -> Result<&mut CfnResource> {
        self.template
            .resources
            .get_mut(id)
            .ok_or_else(|| StackError::NotFound {
                kind: "resource",
                id: id.to_string(),
            })
    }

    /// Declares a stack output.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::DuplicateId`] if the output name is taken.
    pub fn add_output(&mut self, name: impl Into<String>, output: Output) -> Result<()> {
        let name = name.into();
        if self.template.outputs.contains_key(&name) {
            return Err(StackError::DuplicateId { id: name });
        }
        let _ = self.template.outputs.insert(name, output);
        Ok(())
    }

    /// Returns the template declared so far.
    #[must_use]
    pub const fn template(&self) -> &Template {
        &self.template
    }

    /// Validates the resource graph and returns the finished template.
    ///
    /// # Errors
    ///
    /// Returns an error if a reference points at an undeclared resource or
    /// the dependencies form a cycle.
    pub fn synth(&self) -> Result<Template> {
        let graph = ResourceGraph::from_template(&self.template)?;
        let order = graph.resolve_order()?;
        tracing::info!(
            stack = %self.id,
            resources = order.len(),
            outputs = self.template.outputs.len(),
            "synthesized template"
        );
        Ok(self.template.clone())
    }
}
