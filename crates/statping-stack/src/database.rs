//! Database credentials and the serverless Aurora MySQL cluster.

use serde_json::{Value, json};
use statping_common::config::{Merge, ServerlessClusterProps};
use statping_common::constants::{
    DATABASE_ENGINE, DATABASE_ENGINE_MODE, DATABASE_PORT, SECRET_EXCLUDE_CHARACTERS,
    SECRET_PASSWORD_LENGTH,
};
use statping_common::error::{Result, StackError};
use statping_common::types::{LogicalId, Port, RemovalPolicy, SubnetType};

use crate::network::Vpc;
use crate::security_group::{Peer, SecurityGroup};
use crate::stack::Stack;
use crate::template::{CfnResource, intrinsic};

/// Handle to a generated username/password secret.
#[derive(Debug, Clone)]
pub struct DatabaseSecret {
    id: LogicalId,
    username: String,
    secret_name: String,
}

impl DatabaseSecret {
    /// Declares a secret whose `password` key is generated by Secrets
    /// Manager and whose `username` key is fixed.
    ///
    /// # Errors
    ///
    /// Returns an error if the construct path is already taken.
    pub fn generate(stack: &mut Stack, path: &[&str], username: &str, secret_name: &str) -> Result<Self> {
        let template = json!({ "username": username }).to_string();
        let id = stack.add_resource(
            path,
            CfnResource::new(
                "AWS::SecretsManager::Secret",
                json!({
                    "GenerateSecretString": {
                        "ExcludeCharacters": SECRET_EXCLUDE_CHARACTERS,
                        "GenerateStringKey": "password",
                        "PasswordLength": SECRET_PASSWORD_LENGTH,
                        "SecretStringTemplate": template,
                    },
                    "Name": secret_name,
                }),
            )
            .with_removal_policy(RemovalPolicy::Destroy),
        )?;
        tracing::debug!(secret = %id, secret_name, "declared generated database secret");
        Ok(Self {
            id,
            username: username.to_string(),
            secret_name: secret_name.to_string(),
        })
    }

    /// Logical id of the secret.
    #[must_use]
    pub const fn id(&self) -> &LogicalId {
        &self.id
    }

    /// The fixed username stored in the secret.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Physical name of the secret.
    #[must_use]
    pub fn secret_name(&self) -> &str {
        &self.secret_name
    }

    /// Deploy-time dynamic reference to one key of the secret.
    #[must_use]
    pub fn field(&self, key: &str) -> Value {
        intrinsic::secret_value(&self.id, key)
    }
}

/// Inputs of [`ServerlessCluster::new`] that come from earlier steps.
#[derive(Debug, Clone, Copy)]
pub struct DatabaseDependencies<'a> {
    /// Network the cluster lives in.
    pub vpc: &'a Vpc,
    /// Master credentials.
    pub credentials: &'a DatabaseSecret,
    /// The only group allowed to reach the database port.
    pub client_security_group: &'a SecurityGroup,
}

/// Handle to the declared database cluster.
#[derive(Debug, Clone)]
pub struct ServerlessCluster {
    id: LogicalId,
    security_group: SecurityGroup,
    subnet_group: LogicalId,
    secret_attachment: LogicalId,
    props: ServerlessClusterProps,
}

impl ServerlessCluster {
    /// The cluster settings used when nothing is overridden.
    #[must_use]
    pub fn default_props(database_name: &str) -> ServerlessClusterProps {
        ServerlessClusterProps {
            default_database_name: Some(database_name.to_string()),
            subnet_type: Some(SubnetType::Isolated),
            min_capacity: Some(1),
            max_capacity: Some(16),
            auto_pause_minutes: Some(5),
            backup_retention_days: Some(1),
            deletion_protection: Some(false),
            removal_policy: Some(RemovalPolicy::Snapshot),
        }
    }

    /// Declares the database security group and the cluster.
    ///
    /// The security group admits the client group on the database port and
    /// nothing else. Overrides are merged shallowly over
    /// [`ServerlessCluster::default_props`].
    ///
    /// # Errors
    ///
    /// Returns an error if the VPC has no subnets of the requested role or a
    /// construct path is already taken.
    pub fn new(
        stack: &mut Stack,
        id: &str,
        deps: DatabaseDependencies<'_>,
        database_name: &str,
        overrides: &ServerlessClusterProps,
    ) -> Result<Self> {
        let sg_construct = format!("RdsSecurityGroup{id}");
        let security_group = SecurityGroup::new(stack, &[sg_construct.as_str()], deps.vpc, None)?;
        security_group.add_ingress_rule(
            stack,
            &Peer::from(deps.client_security_group),
            Port::tcp(DATABASE_PORT),
            "allow ecs cluster to connect to rds",
        )?;

        let props = Self::default_props(database_name).merge(overrides.clone());
        let construct = format!("Database{id}");
        let subnet_type = props.subnet_type.unwrap_or(SubnetType::Isolated);

        let subnet_group = stack.add_resource(
            &[construct.as_str(), "Subnets", "Default"],
            CfnResource::new(
                "AWS::RDS::DBSubnetGroup",
                json!({
                    "DBSubnetGroupDescription": format!("Subnets for {construct} database"),
                    "SubnetIds": deps.vpc.subnet_ids(subnet_type)?,
                }),
            ),
        )?;

        let auto_pause_minutes = props.auto_pause_minutes.unwrap_or(0);
        let mut properties = json!({
            "DBSubnetGroupName": intrinsic::reference(&subnet_group),
            "Engine": DATABASE_ENGINE,
            "EngineMode": DATABASE_ENGINE_MODE,
            "MasterUsername": deps.credentials.field("username"),
            "MasterUserPassword": deps.credentials.field("password"),
            "ScalingConfiguration": {
                "AutoPause": auto_pause_minutes > 0,
                "MinCapacity": props.min_capacity,
                "MaxCapacity": props.max_capacity,
                "SecondsUntilAutoPause": u64::from(auto_pause_minutes) * 60,
            },
            "StorageEncrypted": true,
            "VpcSecurityGroupIds": [security_group.group_id()],
        });
        if let Some(name) = &props.default_database_name {
            properties["DatabaseName"] = json!(name);
        }
        if let Some(days) = props.backup_retention_days {
            properties["BackupRetentionPeriod"] = json!(days);
        }
        if let Some(protect) = props.deletion_protection {
            properties["DeletionProtection"] = json!(protect);
        }

        let cluster_id = stack.add_resource(
            &[construct.as_str(), "Resource"],
            CfnResource::new("AWS::RDS::DBCluster", properties)
                .with_removal_policy(props.removal_policy.unwrap_or(RemovalPolicy::Snapshot)),
        )?;

        let secret_attachment = stack.add_resource(
            &[construct.as_str(), "Secret", "Attachment"],
            CfnResource::new(
                "AWS::SecretsManager::SecretTargetAttachment",
                json!({
                    "SecretId": intrinsic::reference(deps.credentials.id()),
                    "TargetId": intrinsic::reference(&cluster_id),
                    "TargetType": "AWS::RDS::DBCluster",
                }),
            ),
        )?;

        if props.min_capacity > props.max_capacity {
            tracing::warn!(
                min = ?props.min_capacity,
                max = ?props.max_capacity,
                "database min capacity exceeds max capacity"
            );
        }
        tracing::info!(cluster = %cluster_id, subnet_type = %subnet_type, "declared database cluster");

        Ok(Self {
            id: cluster_id,
            security_group,
            subnet_group,
            secret_attachment,
            props,
        })
    }

    /// Logical id of the cluster.
    #[must_use]
    pub const fn id(&self) -> &LogicalId {
        &self.id
    }

    /// Security group of the cluster.
    #[must_use]
    pub const fn security_group(&self) -> &SecurityGroup {
        &self.security_group
    }

    /// Logical id of the subnet group.
    #[must_use]
    pub const fn subnet_group(&self) -> &LogicalId {
        &self.subnet_group
    }

    /// Effective settings after merging.
    #[must_use]
    pub const fn props(&self) -> &ServerlessClusterProps {
        &self.props
    }

    /// Port the cluster listens on.
    #[must_use]
    pub const fn port(&self) -> u16 {
        DATABASE_PORT
    }

    /// `Fn::GetAtt Endpoint.Address`.
    #[must_use]
    pub fn endpoint_hostname(&self) -> Value {
        intrinsic::get_att(&self.id, "Endpoint.Address")
    }

    /// `Ref` to the secret attached to the cluster. Resolves to the secret
    /// ARN once the attachment has filled in the connection fields.
    #[must_use]
    pub fn secret_arn(&self) -> Value {
        intrinsic::reference(&self.secret_attachment)
    }

    /// Logical id of the secret attachment.
    #[must_use]
    pub const fn secret_attachment(&self) -> &LogicalId {
        &self.secret_attachment
    }
}

impl ServerlessCluster {
    /// Ensures the declared cluster can only be reached from `peer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cluster's security group admits anything else.
    pub fn check_only_reachable_from(&self, stack: &Stack, peer: &SecurityGroup) -> Result<()> {
        let group = stack
            .resource(self.security_group.id())
            .ok_or_else(|| StackError::NotFound {
                kind: "security group",
                id: self.security_group.id().to_string(),
            })?;
        if group.property("SecurityGroupIngress").is_some() {
            return Err(StackError::Config {
                message: format!("database group {} has inline CIDR rules", self.security_group.id()),
            });
        }
        let allowed_source = peer.group_id();
        let target = self.security_group.group_id();
        for (id, rule) in stack.template().resources_of_type("AWS::EC2::SecurityGroupIngress") {
            if rule.property("GroupId") != Some(&target) {
                continue;
            }
            let from_peer = rule.property("SourceSecurityGroupId") == Some(&allowed_source);
            let on_port = rule.property("FromPort") == Some(&json!(DATABASE_PORT))
                && rule.property("ToPort") == Some(&json!(DATABASE_PORT));
            if !(from_peer && on_port) {
                return Err(StackError::Config {
                    message: format!("ingress rule {id} opens the database to another source"),
                });
            }
        }
        Ok(())
    }
}
