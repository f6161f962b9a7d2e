//! ECS cluster builder.

use serde_json::{Value, json};
use statping_common::config::{ClusterProps, Merge};
use statping_common::error::Result;
use statping_common::types::LogicalId;

use crate::network::Vpc;
use crate::stack::Stack;
use crate::template::{CfnResource, intrinsic};

const FARGATE_PROVIDERS: [&str; 2] = ["FARGATE", "FARGATE_SPOT"];

/// Handle to a declared ECS cluster.
#[derive(Debug, Clone)]
pub struct EcsCluster {
    id: LogicalId,
    cluster_name: String,
    vpc: Vpc,
    capacity_providers: Option<LogicalId>,
}

impl EcsCluster {
    /// The cluster settings used when nothing is overridden.
    #[must_use]
    pub fn default_props(cluster_name: &str) -> ClusterProps {
        ClusterProps {
            cluster_name: Some(cluster_name.to_string()),
            enable_fargate_capacity_providers: Some(true),
            container_insights: Some(false),
        }
    }

    /// Declares an ECS cluster bound to `vpc`.
    ///
    /// # Errors
    ///
    /// Returns an error if a construct path is already taken.
    pub fn new(
        stack: &mut Stack,
        construct_id: &str,
        vpc: &Vpc,
        cluster_name: &str,
        overrides: &ClusterProps,
    ) -> Result<Self> {
        let props = Self::default_props(cluster_name).merge(overrides.clone());
        let cluster_name = props
            .cluster_name
            .unwrap_or_else(|| cluster_name.to_string());
        let insights = if props.container_insights.unwrap_or(false) {
            "enabled"
        } else {
            "disabled"
        };

        let id = stack.add_resource(
            &[construct_id, "Resource"],
            CfnResource::new(
                "AWS::ECS::Cluster",
                json!({
                    "ClusterName": cluster_name,
                    "ClusterSettings": [{ "Name": "containerInsights", "Value": insights }],
                }),
            ),
        )?;

        let capacity_providers = if props.enable_fargate_capacity_providers.unwrap_or(false) {
            Some(stack.add_resource(
                &[construct_id, "ClusterCapacityProviderAssociations"],
                CfnResource::new(
                    "AWS::ECS::ClusterCapacityProviderAssociations",
                    json!({
                        "CapacityProviders": FARGATE_PROVIDERS,
                        "Cluster": intrinsic::reference(&id),
                        "DefaultCapacityProviderStrategy": [],
                    }),
                ),
            )?)
        } else {
            None
        };

        tracing::info!(cluster = %id, name = %cluster_name, "declared ECS cluster");
        Ok(Self {
            id,
            cluster_name,
            vpc: vpc.clone(),
            capacity_providers,
        })
    }

    /// Logical id of the cluster.
    #[must_use]
    pub const fn id(&self) -> &LogicalId {
        &self.id
    }

    /// Physical cluster name.
    #[must_use]
    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    /// `Ref` to the cluster.
    #[must_use]
    pub fn reference(&self) -> Value {
        intrinsic::reference(&self.id)
    }

    /// The VPC the cluster's services run in.
    #[must_use]
    pub const fn vpc(&self) -> &Vpc {
        &self.vpc
    }

    /// Logical id of the capacity provider association, if enabled.
    #[must_use]
    pub const fn capacity_providers(&self) -> Option<&LogicalId> {
        self.capacity_providers.as_ref()
    }
}
