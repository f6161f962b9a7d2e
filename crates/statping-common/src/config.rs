//! Stack configuration and defaulting.
//!
//! A [`StackConfiguration`] is what a caller hands to the stack: the DNS
//! zone identity plus any number of optional overrides. [`StackConfiguration::resolve`]
//! merges it over the hardcoded defaults and yields a
//! [`ResolvedConfiguration`] in which every scalar option is concrete.
//!
//! Merging is shallow everywhere: a field present in the override replaces
//! the default wholesale. The nested override objects (`vpc`, `database`,
//! `cluster`, `service`) are merged a second time by the builder that owns
//! them, against that builder's own defaults.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{Result, StackError};
use crate::types::{Ipv4Cidr, RemovalPolicy, SubnetType};

/// Shallow merge where values from `overrides` win.
pub trait Merge {
    /// Merges `overrides` on top of `self`.
    #[must_use]
    fn merge(self, overrides: Self) -> Self;
}

impl<T: Merge> Merge for Option<T> {
    fn merge(self, overrides: Self) -> Self {
        match (self, overrides) {
            (Some(base), Some(over)) => Some(base.merge(over)),
            (base, over) => over.or(base),
        }
    }
}

/// One subnet role, instantiated once per availability zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubnetConfiguration {
    /// Name prefix for the subnets of this role.
    pub name: String,
    /// Routing role.
    pub subnet_type: SubnetType,
    /// Prefix length of each subnet; carved evenly when absent.
    #[serde(default)]
    pub cidr_mask: Option<u8>,
}

/// Overrides for the VPC.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VpcProps {
    /// Address block of the VPC.
    pub cidr: Option<Ipv4Cidr>,
    /// Number of availability zones to span.
    pub max_azs: Option<u8>,
    /// Number of NAT gateways; one per zone when absent.
    pub nat_gateways: Option<u8>,
    /// Subnet roles. Replaced as a whole, never merged per role.
    pub subnet_configuration: Option<Vec<SubnetConfiguration>>,
}

impl Merge for VpcProps {
    fn merge(self, overrides: Self) -> Self {
        Self {
            cidr: overrides.cidr.or(self.cidr),
            max_azs: overrides.max_azs.or(self.max_azs),
            nat_gateways: overrides.nat_gateways.or(self.nat_gateways),
            subnet_configuration: overrides.subnet_configuration.or(self.subnet_configuration),
        }
    }
}

/// Overrides for the serverless database cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerlessClusterProps {
    /// Schema created with the cluster.
    pub default_database_name: Option<String>,
    /// Subnet role the cluster is placed in.
    pub subnet_type: Option<SubnetType>,
    /// Minimum Aurora capacity units.
    pub min_capacity: Option<u16>,
    /// Maximum Aurora capacity units.
    pub max_capacity: Option<u16>,
    /// Minutes of inactivity before pausing; `0` disables auto-pause.
    pub auto_pause_minutes: Option<u32>,
    /// Days automated backups are kept.
    pub backup_retention_days: Option<u8>,
    /// Whether the cluster refuses deletion.
    pub deletion_protection: Option<bool>,
    /// What happens to the cluster when it leaves the stack.
    pub removal_policy: Option<RemovalPolicy>,
}

impl Merge for ServerlessClusterProps {
    fn merge(self, overrides: Self) -> Self {
        Self {
            default_database_name: overrides.default_database_name.or(self.default_database_name),
            subnet_type: overrides.subnet_type.or(self.subnet_type),
            min_capacity: overrides.min_capacity.or(self.min_capacity),
            max_capacity: overrides.max_capacity.or(self.max_capacity),
            auto_pause_minutes: overrides.auto_pause_minutes.or(self.auto_pause_minutes),
            backup_retention_days: overrides.backup_retention_days.or(self.backup_retention_days),
            deletion_protection: overrides.deletion_protection.or(self.deletion_protection),
            removal_policy: overrides.removal_policy.or(self.removal_policy),
        }
    }
}

/// Overrides for the ECS cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusterProps {
    /// Physical cluster name.
    pub cluster_name: Option<String>,
    /// Whether `FARGATE` and `FARGATE_SPOT` capacity providers are attached.
    pub enable_fargate_capacity_providers: Option<bool>,
    /// Whether CloudWatch Container Insights is enabled.
    pub container_insights: Option<bool>,
}

impl Merge for ClusterProps {
    fn merge(self, overrides: Self) -> Self {
        Self {
            cluster_name: overrides.cluster_name.or(self.cluster_name),
            enable_fargate_capacity_providers: overrides
                .enable_fargate_capacity_providers
                .or(self.enable_fargate_capacity_providers),
            container_insights: overrides.container_insights.or(self.container_insights),
        }
    }
}

/// A secret value injected into the container from Secrets Manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecretKeyRef {
    /// ARN of the secret.
    pub secret_arn: String,
    /// JSON key inside the secret string.
    pub key: String,
}

/// Container settings. Supplying them replaces the generated ones entirely,
/// database wiring included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskImageOptions {
    /// Image reference.
    pub image: String,
    /// Port the container listens on.
    #[serde(default)]
    pub container_port: Option<u16>,
    /// Container name inside the task definition.
    #[serde(default)]
    pub container_name: Option<String>,
    /// Plain environment variables.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    /// Environment variables read from Secrets Manager.
    #[serde(default)]
    pub secrets: BTreeMap<String, SecretKeyRef>,
}

/// Deployment circuit breaker settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CircuitBreaker {
    /// Whether a failed deployment rolls back automatically.
    pub rollback: bool,
}

/// Overrides for the load-balanced Fargate service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FargateServiceProps {
    /// Task CPU units.
    pub cpu: Option<u32>,
    /// Task memory in MiB.
    pub memory_limit_mib: Option<u32>,
    /// Number of running tasks.
    pub desired_count: Option<u32>,
    /// Container settings.
    pub task_image_options: Option<TaskImageOptions>,
    /// Whether the load balancer is internet-facing.
    pub public_load_balancer: Option<bool>,
    /// Port of the HTTPS listener.
    pub listener_port: Option<u16>,
    /// Whether the load balancer's own group admits the whole internet.
    pub open_listener: Option<bool>,
    /// Deployment circuit breaker.
    pub circuit_breaker: Option<CircuitBreaker>,
    /// Whether ECS propagates managed tags to tasks.
    pub enable_ecs_managed_tags: Option<bool>,
    /// Seconds health checks are ignored after a task starts.
    pub health_check_grace_period_seconds: Option<u32>,
    /// Whether tasks receive a public IP.
    pub assign_public_ip: Option<bool>,
    /// Physical service name.
    pub service_name: Option<String>,
    /// Lower bound of running tasks during a deployment, in percent.
    pub min_healthy_percent: Option<u32>,
    /// Upper bound of running tasks during a deployment, in percent.
    pub max_healthy_percent: Option<u32>,
}

impl Merge for FargateServiceProps {
    fn merge(self, overrides: Self) -> Self {
        Self {
            cpu: overrides.cpu.or(self.cpu),
            memory_limit_mib: overrides.memory_limit_mib.or(self.memory_limit_mib),
            desired_count: overrides.desired_count.or(self.desired_count),
            task_image_options: overrides.task_image_options.or(self.task_image_options),
            public_load_balancer: overrides.public_load_balancer.or(self.public_load_balancer),
            listener_port: overrides.listener_port.or(self.listener_port),
            open_listener: overrides.open_listener.or(self.open_listener),
            circuit_breaker: overrides.circuit_breaker.or(self.circuit_breaker),
            enable_ecs_managed_tags: overrides
                .enable_ecs_managed_tags
                .or(self.enable_ecs_managed_tags),
            health_check_grace_period_seconds: overrides
                .health_check_grace_period_seconds
                .or(self.health_check_grace_period_seconds),
            assign_public_ip: overrides.assign_public_ip.or(self.assign_public_ip),
            service_name: overrides.service_name.or(self.service_name),
            min_healthy_percent: overrides.min_healthy_percent.or(self.min_healthy_percent),
            max_healthy_percent: overrides.max_healthy_percent.or(self.max_healthy_percent),
        }
    }
}

/// Everything a caller can configure about the Statping stack.
///
/// Only the hosted zone identity is mandatory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackConfiguration {
    /// VPC overrides.
    #[serde(default)]
    pub vpc: Option<VpcProps>,
    /// Database cluster overrides.
    #[serde(default)]
    pub database: Option<ServerlessClusterProps>,
    /// ECS cluster overrides.
    #[serde(default)]
    pub cluster: Option<ClusterProps>,
    /// Fargate service overrides.
    #[serde(default)]
    pub service: Option<FargateServiceProps>,
    /// CIDR admitted on the HTTPS port of the load balancer.
    #[serde(default)]
    pub load_balancer_cidr: Option<Ipv4Cidr>,
    /// ECS cluster name.
    #[serde(default)]
    pub cluster_name: Option<String>,
    /// Route 53 hosted zone id.
    pub hosted_zone_id: String,
    /// Route 53 hosted zone name.
    pub hosted_zone_name: String,
    /// Subdomain label of the service inside the zone.
    #[serde(default)]
    pub service_domain_name: Option<String>,
    /// Database master username.
    #[serde(default)]
    pub database_username: Option<String>,
    /// Database schema name.
    #[serde(default)]
    pub database_name: Option<String>,
    /// Statping admin user.
    #[serde(default)]
    pub admin_user: Option<String>,
    /// Statping admin password.
    #[serde(default)]
    pub admin_password: Option<String>,
    /// Status page header.
    #[serde(default)]
    pub header: Option<String>,
    /// Status page description.
    #[serde(default)]
    pub description: Option<String>,
}

impl Merge for StackConfiguration {
    fn merge(self, overrides: Self) -> Self {
        Self {
            vpc: overrides.vpc.or(self.vpc),
            database: overrides.database.or(self.database),
            cluster: overrides.cluster.or(self.cluster),
            service: overrides.service.or(self.service),
            load_balancer_cidr: overrides.load_balancer_cidr.or(self.load_balancer_cidr),
            cluster_name: overrides.cluster_name.or(self.cluster_name),
            hosted_zone_id: overrides.hosted_zone_id,
            hosted_zone_name: overrides.hosted_zone_name,
            service_domain_name: overrides.service_domain_name.or(self.service_domain_name),
            database_username: overrides.database_username.or(self.database_username),
            database_name: overrides.database_name.or(self.database_name),
            admin_user: overrides.admin_user.or(self.admin_user),
            admin_password: overrides.admin_password.or(self.admin_password),
            header: overrides.header.or(self.header),
            description: overrides.description.or(self.description),
        }
    }
}

impl StackConfiguration {
    /// Creates a configuration with only the mandatory zone identity set.
    #[must_use]
    pub fn new(hosted_zone_id: impl Into<String>, hosted_zone_name: impl Into<String>) -> Self {
        Self {
            hosted_zone_id: hosted_zone_id.into(),
            hosted_zone_name: hosted_zone_name.into(),
            ..Self::default()
        }
    }

    /// The hardcoded defaults for a stack named `stack_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in default fails to parse.
    pub fn defaults(stack_id: &str) -> Result<Self> {
        Ok(Self {
            load_balancer_cidr: Some(constants::DEFAULT_LOAD_BALANCER_CIDR.parse()?),
            cluster_name: Some(format!("{}-cluster", stack_id.to_lowercase())),
            service_domain_name: Some(constants::DEFAULT_SERVICE_DOMAIN_NAME.into()),
            database_username: Some(constants::DEFAULT_DATABASE_USERNAME.into()),
            database_name: Some(constants::DEFAULT_DATABASE_NAME.into()),
            admin_user: Some(constants::DEFAULT_ADMIN_USER.into()),
            admin_password: Some(constants::DEFAULT_ADMIN_PASSWORD.into()),
            header: Some(constants::DEFAULT_HEADER.into()),
            description: Some(constants::DEFAULT_DESCRIPTION.into()),
            ..Self::default()
        })
    }

    /// Merges this configuration over the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::MissingField`] if the hosted zone id or name
    /// is empty.
    pub fn resolve(self, stack_id: &str) -> Result<ResolvedConfiguration> {
        let merged = Self::defaults(stack_id)?.merge(self);

        if merged.hosted_zone_id.trim().is_empty() {
            return Err(StackError::MissingField {
                field: "hosted_zone_id",
            });
        }
        let hosted_zone_name = merged.hosted_zone_name.trim().trim_end_matches('.');
        if hosted_zone_name.is_empty() {
            return Err(StackError::MissingField {
                field: "hosted_zone_name",
            });
        }

        let resolved = ResolvedConfiguration {
            vpc: merged.vpc.unwrap_or_default(),
            database: merged.database.unwrap_or_default(),
            cluster: merged.cluster.unwrap_or_default(),
            service: merged.service.unwrap_or_default(),
            load_balancer_cidr: required(merged.load_balancer_cidr, "load_balancer_cidr")?,
            cluster_name: required(merged.cluster_name, "cluster_name")?,
            hosted_zone_id: merged.hosted_zone_id,
            hosted_zone_name: hosted_zone_name.to_string(),
            service_domain_name: required(merged.service_domain_name, "service_domain_name")?,
            database_username: required(merged.database_username, "database_username")?,
            database_name: required(merged.database_name, "database_name")?,
            admin_user: required(merged.admin_user, "admin_user")?,
            admin_password: required(merged.admin_password, "admin_password")?,
            header: required(merged.header, "header")?,
            description: required(merged.description, "description")?,
        };
        tracing::debug!(
            stack_id,
            domain = %resolved.full_domain_name(),
            cluster = %resolved.cluster_name,
            "resolved stack configuration"
        );
        Ok(resolved)
    }

    /// Parses a configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Parses a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration.
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Loads a configuration file, picking the format from its extension
    /// (`.json`, `.yaml` or `.yml`).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, has an unknown
    /// extension, or does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::info!(path = %path.display(), "loading stack configuration");

        let content = std::fs::read_to_string(path).map_err(|e| StackError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            Some("yaml" | "yml") => Self::from_yaml_str(&content),
            other => Err(StackError::Config {
                message: format!(
                    "unsupported configuration format {:?} for {}",
                    other.unwrap_or(""),
                    path.display()
                ),
            }),
        }
    }
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T> {
    value.ok_or(StackError::MissingField { field })
}

/// A configuration after defaulting. Every scalar option is concrete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConfiguration {
    /// VPC overrides, merged again by the network builder.
    pub vpc: VpcProps,
    /// Database overrides, merged again by the database builder.
    pub database: ServerlessClusterProps,
    /// Cluster overrides, merged again by the cluster builder.
    pub cluster: ClusterProps,
    /// Service overrides, merged again by the service builder.
    pub service: FargateServiceProps,
    /// CIDR admitted on the HTTPS port of the load balancer.
    pub load_balancer_cidr: Ipv4Cidr,
    /// ECS cluster name.
    pub cluster_name: String,
    /// Route 53 hosted zone id.
    pub hosted_zone_id: String,
    /// Route 53 hosted zone name, without a trailing dot.
    pub hosted_zone_name: String,
    /// Subdomain label of the service.
    pub service_domain_name: String,
    /// Database master username.
    pub database_username: String,
    /// Database schema name.
    pub database_name: String,
    /// Statping admin user.
    pub admin_user: String,
    /// Statping admin password.
    pub admin_password: String,
    /// Status page header.
    pub header: String,
    /// Status page description.
    pub description: String,
}

impl ResolvedConfiguration {
    /// `{service_domain_name}.{hosted_zone_name}`.
    #[must_use]
    pub fn full_domain_name(&self) -> String {
        format!("{}.{}", self.service_domain_name, self.hosted_zone_name)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn mandatory_fields_only_gets_every_default() {
        let resolved = StackConfiguration::new("Z1", "example.com")
            .resolve("MyTestStack")
            .expect("resolve");
        assert_eq!(resolved.full_domain_name(), "statping.example.com");
        assert_eq!(resolved.admin_user, "admin");
        assert_eq!(resolved.admin_password, "helloapes");
        assert_eq!(resolved.database_name, "statping");
        assert_eq!(resolved.database_username, "statping");
        assert_eq!(resolved.header, "test status page");
        assert_eq!(resolved.description, "monitor external services");
        assert_eq!(resolved.load_balancer_cidr.to_string(), "0.0.0.0/16");
        assert_eq!(resolved.cluster_name, "myteststack-cluster");
        assert_eq!(resolved.vpc, VpcProps::default());
    }

    #[test]
    fn caller_values_win() {
        let config = StackConfiguration {
            service_domain_name: Some("status".into()),
            admin_user: Some("root".into()),
            cluster_name: Some("test-cluster".into()),
            load_balancer_cidr: Some("203.0.113.10/32".parse().expect("cidr")),
            ..StackConfiguration::new("Z1", "example.org")
        };
        let resolved = config.resolve("S").expect("resolve");
        assert_eq!(resolved.full_domain_name(), "status.example.org");
        assert_eq!(resolved.admin_user, "root");
        assert_eq!(resolved.cluster_name, "test-cluster");
        assert_eq!(resolved.load_balancer_cidr.to_string(), "203.0.113.10/32");
        assert_eq!(resolved.admin_password, "helloapes");
    }

    #[test]
    fn trailing_dot_on_zone_name_is_dropped() {
        let resolved = StackConfiguration::new("Z1", "example.com.")
            .resolve("S")
            .expect("resolve");
        assert_eq!(resolved.full_domain_name(), "statping.example.com");
    }

    #[test]
    fn surrounding_whitespace_on_zone_name_is_dropped() {
        let resolved = StackConfiguration::new("Z1", " example.com. ")
            .resolve("S")
            .expect("resolve");
        assert_eq!(resolved.hosted_zone_name, "example.com");
        assert_eq!(resolved.full_domain_name(), "statping.example.com");

        let err = StackConfiguration::new("Z1", " . ")
            .resolve("S")
            .unwrap_err();
        assert!(err.to_string().contains("hosted_zone_name"), "got: {err}");
    }

    #[test]
    fn empty_zone_identity_is_rejected() {
        let err = StackConfiguration::new("", "example.com")
            .resolve("S")
            .unwrap_err();
        assert!(err.to_string().contains("hosted_zone_id"), "got: {err}");

        let err = StackConfiguration::new("Z1", "  ")
            .resolve("S")
            .unwrap_err();
        assert!(err.to_string().contains("hosted_zone_name"), "got: {err}");
    }

    #[test]
    fn nested_props_replace_whole_keys() {
        let base = VpcProps {
            cidr: Some("10.0.0.0/16".parse().expect("cidr")),
            max_azs: Some(2),
            nat_gateways: None,
            subnet_configuration: Some(vec![
                SubnetConfiguration {
                    name: "a".into(),
                    subnet_type: SubnetType::Public,
                    cidr_mask: None,
                },
                SubnetConfiguration {
                    name: "b".into(),
                    subnet_type: SubnetType::Isolated,
                    cidr_mask: None,
                },
            ]),
        };
        let over = VpcProps {
            max_azs: Some(3),
            subnet_configuration: Some(vec![SubnetConfiguration {
                name: "only".into(),
                subnet_type: SubnetType::Public,
                cidr_mask: Some(24),
            }]),
            ..VpcProps::default()
        };
        let merged = base.merge(over);
        assert_eq!(merged.max_azs, Some(3));
        assert_eq!(merged.cidr.map(|c| c.to_string()).as_deref(), Some("10.0.0.0/16"));
        let subnets = merged.subnet_configuration.expect("subnets");
        assert_eq!(subnets.len(), 1);
        assert_eq!(subnets[0].name, "only");
    }

    #[test]
    fn option_merge_recurses_into_both_sides() {
        let base = Some(ClusterProps {
            cluster_name: Some("a".into()),
            enable_fargate_capacity_providers: Some(true),
            container_insights: None,
        });
        let over = Some(ClusterProps {
            cluster_name: Some("b".into()),
            ..ClusterProps::default()
        });
        let merged = base.merge(over).expect("merged");
        assert_eq!(merged.cluster_name.as_deref(), Some("b"));
        assert_eq!(merged.enable_fargate_capacity_providers, Some(true));

        let only_base: Option<ClusterProps> = Some(ClusterProps::default()).merge(None);
        assert!(only_base.is_some());
    }

    #[test]
    fn yaml_configuration_parses() {
        let yaml = r"
hosted_zone_id: Z1VKI2XXXXXXX
hosted_zone_name: example.com
cluster_name: statping-cluster
load_balancer_cidr: 203.0.113.10/32
service:
  cpu: 4096
  memory_limit_mib: 5120
vpc:
  max_azs: 3
";
        let config = StackConfiguration::from_yaml_str(yaml).expect("parse");
        assert_eq!(config.hosted_zone_id, "Z1VKI2XXXXXXX");
        let service = config.service.as_ref().expect("service");
        assert_eq!(service.cpu, Some(4096));
        assert_eq!(service.memory_limit_mib, Some(5120));
        assert_eq!(config.vpc.as_ref().and_then(|v| v.max_azs), Some(3));
    }

    #[test]
    fn yaml_missing_zone_is_rejected() {
        let err = StackConfiguration::from_yaml_str("cluster_name: x\n").unwrap_err();
        assert!(err.to_string().contains("hosted_zone"), "got: {err}");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let json = r#"{"hosted_zone_id":"Z1","hosted_zone_name":"a.b","clusterName":"x"}"#;
        assert!(StackConfiguration::from_json_str(json).is_err());
    }

    #[test]
    fn load_picks_format_from_extension() {
        let dir = tempfile::tempdir().expect("tempdir");

        let json_path = dir.path().join("stack.json");
        let mut file = std::fs::File::create(&json_path).expect("create");
        file.write_all(br#"{"hosted_zone_id":"Z1","hosted_zone_name":"example.com"}"#)
            .expect("write");
        let config = StackConfiguration::load(&json_path).expect("load json");
        assert_eq!(config.hosted_zone_name, "example.com");

        let toml_path = dir.path().join("stack.toml");
        std::fs::write(&toml_path, "hosted_zone_id = 'Z1'").expect("write");
        let err = StackConfiguration::load(&toml_path).unwrap_err();
        assert!(err.to_string().contains("unsupported"), "got: {err}");
    }

    #[test]
    fn load_missing_file_reports_path() {
        let err = StackConfiguration::load(Path::new("/nonexistent/stack.yaml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/stack.yaml"), "got: {err}");
    }
}
