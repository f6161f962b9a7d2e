//! CloudFormation template model.
//!
//! The template is the only artifact this workspace produces. Resources are
//! kept in a `BTreeMap` keyed by logical id so that rendering is
//! byte-for-byte stable across runs.

pub mod intrinsic;

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;
use statping_common::constants::TEMPLATE_FORMAT_VERSION;
use statping_common::error::{Result, StackError};
use statping_common::types::{LogicalId, RemovalPolicy};

/// A rendered CloudFormation template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    /// Template format version.
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    /// Human-readable description.
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared resources.
    #[serde(rename = "Resources")]
    pub resources: BTreeMap<LogicalId, CfnResource>,
    /// Stack outputs.
    #[serde(rename = "Outputs", skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Output>,
}

impl Template {
    /// Creates an empty template.
    #[must_use]
    pub fn new(description: Option<String>) -> Self {
        Self {
            format_version: TEMPLATE_FORMAT_VERSION.to_string(),
            description,
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// Returns the resource with the given logical id.
    pub fn resource(&self, id: &LogicalId) -> Option<&CfnResource> {
        self.resources.get(id)
    }

    /// Returns every resource of the given CloudFormation type.
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a LogicalId, &'a CfnResource)> + 'a {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type)
    }

    /// Counts resources per CloudFormation type.
    pub fn type_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for resource in self.resources.values() {
            *counts.entry(resource.resource_type.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Renders the template as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Renders the template as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// One resource declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CfnResource {
    /// CloudFormation resource type, e.g. `AWS::EC2::VPC`.
    #[serde(rename = "Type")]
    pub resource_type: String,
    /// Resource properties.
    #[serde(rename = "Properties", skip_serializing_if = "is_empty_object")]
    pub properties: Value,
    /// Explicit ordering dependencies not visible through references.
    #[serde(rename = "DependsOn", skip_serializing_if = "BTreeSet::is_empty")]
    pub depends_on: BTreeSet<LogicalId>,
    /// Policy applied when the resource is deleted.
    #[serde(rename = "DeletionPolicy", skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<&'static str>,
    /// Policy applied when an update replaces the resource.
    #[serde(rename = "UpdateReplacePolicy", skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<&'static str>,
}

fn is_empty_object(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

impl CfnResource {
    /// Creates a resource of `resource_type` with the given properties.
    pub fn new(resource_type: impl Into<String>, properties: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties,
            depends_on: BTreeSet::new(),
            deletion_policy: None,
            update_replace_policy: None,
        }
    }

    /// Adds an explicit dependency.
    #[must_use]
    pub fn depends_on(mut self, id: &LogicalId) -> Self {
        let _ = self.depends_on.insert(id.clone());
        self
    }

    /// Applies a removal policy to both deletion and replacement.
    #[must_use]
    pub fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.deletion_policy = Some(policy.as_cfn());
        self.update_replace_policy = Some(policy.as_cfn());
        self
    }

    /// Returns one property.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Appends `value` to the list property `key`, creating the list if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the properties are not an object or `key`
    /// already holds something other than a list.
    pub fn push_to_list(&mut self, key: &str, value: Value) -> Result<()> {
        let resource_type = self.resource_type.clone();
        let map = self
            .properties
            .as_object_mut()
            .ok_or_else(|| StackError::Config {
                message: format!("{resource_type} properties are not an object"),
            })?;
        match map
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()))
        {
            Value::Array(items) => {
                items.push(value);
                Ok(())
            }
            _ => Err(StackError::Config {
                message: format!("{resource_type} property {key} is not a list"),
            }),
        }
    }
}

/// A stack output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Output {
    /// Output value, usually an intrinsic.
    #[serde(rename = "Value")]
    pub value: Value,
    /// Human-readable description.
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
