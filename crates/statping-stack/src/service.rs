//! Load-balanced Fargate service.
//!
//! Declares an application load balancer with an HTTPS listener in front of
//! a Fargate service, together with everything the tasks need to run: the
//! task definition, its IAM roles, a log group, and an alias record that
//! points the service domain at the load balancer.

use std::collections::BTreeMap;

use serde_json::{Value, json};
use statping_common::config::{CircuitBreaker, FargateServiceProps, Merge, TaskImageOptions};
use statping_common::constants::{
    CONTAINER_NAME, CONTAINER_PORT, DEFAULT_DESIRED_COUNT, DEFAULT_TASK_CPU,
    DEFAULT_TASK_MEMORY_MIB, HTTPS_PORT, LOG_RETENTION_DAYS,
};
use statping_common::error::{Result, StackError};
use statping_common::types::{LogicalId, Port, RemovalPolicy, SubnetType};

use crate::cluster::EcsCluster;
use crate::dns::{self, DnsValidatedCertificate, HostedZone};
use crate::security_group::{Peer, SecurityGroup};
use crate::stack::Stack;
use crate::template::{CfnResource, Output, intrinsic};

/// Port the target group is declared with. Fargate targets are registered
/// with the container port, which overrides it.
const TARGET_GROUP_PORT: u16 = 80;

/// A container secret read from one JSON key of a Secrets Manager secret.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSecret {
    /// ARN of the secret, literal or an intrinsic.
    pub secret_arn: Value,
    /// JSON key inside the secret string.
    pub key: String,
}

impl ContainerSecret {
    /// The `ValueFrom` ECS expects: `{arn}:{key}::`.
    #[must_use]
    pub fn value_from(&self) -> Value {
        let suffix = format!(":{}::", self.key);
        match &self.secret_arn {
            Value::String(arn) => json!(format!("{arn}{suffix}")),
            arn => intrinsic::join("", vec![arn.clone(), json!(suffix)]),
        }
    }
}

/// The container the service runs.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskImageSpec {
    /// Image reference.
    pub image: String,
    /// Port the container listens on.
    pub container_port: u16,
    /// Container name.
    pub container_name: String,
    /// Plain environment variables. Values may be intrinsics.
    pub environment: BTreeMap<String, Value>,
    /// Environment variables read from Secrets Manager.
    pub secrets: BTreeMap<String, ContainerSecret>,
}

impl TaskImageSpec {
    /// A container with no environment, on the default port.
    #[must_use]
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            container_port: CONTAINER_PORT,
            container_name: CONTAINER_NAME.to_string(),
            environment: BTreeMap::new(),
            secrets: BTreeMap::new(),
        }
    }

    /// Adds a plain environment variable.
    #[must_use]
    pub fn env(mut self, name: &str, value: impl Into<Value>) -> Self {
        let _ = self.environment.insert(name.to_string(), value.into());
        self
    }

    /// Adds an environment variable read from a secret.
    #[must_use]
    pub fn secret(mut self, name: &str, secret: ContainerSecret) -> Self {
        let _ = self.secrets.insert(name.to_string(), secret);
        self
    }

    fn container_definition(&self, log_group: &LogicalId, stream_prefix: &str) -> Value {
        let environment: Vec<Value> = self
            .environment
            .iter()
            .map(|(name, value)| json!({ "Name": name, "Value": value }))
            .collect();
        let secrets: Vec<Value> = self
            .secrets
            .iter()
            .map(|(name, secret)| json!({ "Name": name, "ValueFrom": secret.value_from() }))
            .collect();

        let mut definition = json!({
            "Essential": true,
            "Image": self.image,
            "LogConfiguration": {
                "LogDriver": "awslogs",
                "Options": {
                    "awslogs-group": intrinsic::reference(log_group),
                    "awslogs-region": intrinsic::pseudo("Region"),
                    "awslogs-stream-prefix": stream_prefix,
                },
            },
            "Name": self.container_name,
            "PortMappings": [{ "ContainerPort": self.container_port, "Protocol": "tcp" }],
        });
        if !environment.is_empty() {
            definition["Environment"] = Value::Array(environment);
        }
        if !secrets.is_empty() {
            definition["Secrets"] = Value::Array(secrets);
        }
        definition
    }
}

impl From<TaskImageOptions> for TaskImageSpec {
    fn from(options: TaskImageOptions) -> Self {
        Self {
            image: options.image,
            container_port: options.container_port.unwrap_or(CONTAINER_PORT),
            container_name: options
                .container_name
                .unwrap_or_else(|| CONTAINER_NAME.to_string()),
            environment: options
                .environment
                .into_iter()
                .map(|(name, value)| (name, Value::String(value)))
                .collect(),
            secrets: options
                .secrets
                .into_iter()
                .map(|(name, secret)| {
                    (name, ContainerSecret {
                        secret_arn: Value::String(secret.secret_arn),
                        key: secret.key,
                    })
                })
                .collect(),
        }
    }
}

/// Handle to a declared application load balancer.
#[derive(Debug, Clone)]
pub struct LoadBalancer {
    id: LogicalId,
    security_group: SecurityGroup,
}

impl LoadBalancer {
    /// Logical id of the load balancer.
    #[must_use]
    pub const fn id(&self) -> &LogicalId {
        &self.id
    }

    /// The group created together with the load balancer.
    #[must_use]
    pub const fn security_group(&self) -> &SecurityGroup {
        &self.security_group
    }

    /// `Fn::GetAtt DNSName`.
    #[must_use]
    pub fn dns_name(&self) -> Value {
        intrinsic::get_att(&self.id, "DNSName")
    }

    /// Attaches another security group.
    ///
    /// # Errors
    ///
    /// Returns an error if the load balancer is no longer declared.
    pub fn add_security_group(&self, stack: &mut Stack, group: &SecurityGroup) -> Result<()> {
        tracing::debug!(load_balancer = %self.id, group = %group.id(), "attaching security group");
        stack
            .resource_mut(&self.id)?
            .push_to_list("SecurityGroups", group.group_id())
    }
}

/// Inputs of [`LoadBalancedFargateService::new`] that come from earlier steps.
#[derive(Debug, Clone, Copy)]
pub struct ServiceDependencies<'a> {
    /// Cluster the service runs in.
    pub cluster: &'a EcsCluster,
    /// Certificate served by the HTTPS listener.
    pub certificate: &'a DnsValidatedCertificate,
    /// Zone the alias record is created in.
    pub zone: &'a HostedZone,
    /// Fully qualified service domain.
    pub domain_name: &'a str,
    /// Groups attached to the tasks. One is created when empty.
    pub task_security_groups: &'a [SecurityGroup],
}

/// Handle to the declared service and its surroundings.
#[derive(Debug, Clone)]
pub struct LoadBalancedFargateService {
    id: LogicalId,
    load_balancer: LoadBalancer,
    listener: LogicalId,
    target_group: LogicalId,
    task_definition: LogicalId,
    task_role: LogicalId,
    execution_role: LogicalId,
    log_group: LogicalId,
    dns_record: LogicalId,
    task_security_groups: Vec<SecurityGroup>,
    image: TaskImageSpec,
    props: FargateServiceProps,
}

impl LoadBalancedFargateService {
    /// The service settings used when nothing is overridden.
    #[must_use]
    pub const fn default_props() -> FargateServiceProps {
        FargateServiceProps {
            cpu: Some(DEFAULT_TASK_CPU),
            memory_limit_mib: Some(DEFAULT_TASK_MEMORY_MIB),
            desired_count: Some(DEFAULT_DESIRED_COUNT),
            task_image_options: None,
            public_load_balancer: Some(true),
            listener_port: Some(HTTPS_PORT),
            open_listener: Some(false),
            circuit_breaker: Some(CircuitBreaker { rollback: false }),
            enable_ecs_managed_tags: Some(true),
            health_check_grace_period_seconds: Some(60),
            assign_public_ip: Some(false),
            service_name: None,
            min_healthy_percent: Some(50),
            max_healthy_percent: Some(200),
        }
    }

    /// Declares the service.
    ///
    /// `image` is used unless the overrides carry `task_image_options`, which
    /// replace it entirely.
    ///
    /// # Errors
    ///
    /// Returns an error if the VPC lacks the subnets the load balancer or
    /// the tasks need, the domain is outside the zone, or a construct path
    /// is already taken.
    pub fn new(
        stack: &mut Stack,
        construct_id: &str,
        deps: ServiceDependencies<'_>,
        image: TaskImageSpec,
        overrides: &FargateServiceProps,
    ) -> Result<Self> {
        let props = Self::default_props().merge(overrides.clone());
        let image = props
            .task_image_options
            .clone()
            .map_or(image, TaskImageSpec::from);
        let vpc = deps.cluster.vpc();
        let public = props.public_load_balancer.unwrap_or(true);
        let listener_port = props.listener_port.unwrap_or(HTTPS_PORT);

        let load_balancer = declare_load_balancer(stack, construct_id, deps, &props)?;

        let target_group = stack.add_resource(
            &[construct_id, "LB", "PublicListener", "ECSGroup", "Resource"],
            CfnResource::new(
                "AWS::ElasticLoadBalancingV2::TargetGroup",
                json!({
                    "Port": TARGET_GROUP_PORT,
                    "Protocol": "HTTP",
                    "TargetGroupAttributes": [{ "Key": "stickiness.enabled", "Value": "false" }],
                    "TargetType": "ip",
                    "VpcId": vpc.vpc_id(),
                }),
            ),
        )?;

        let listener = stack.add_resource(
            &[construct_id, "LB", "PublicListener", "Resource"],
            CfnResource::new(
                "AWS::ElasticLoadBalancingV2::Listener",
                json!({
                    "Certificates": [{ "CertificateArn": deps.certificate.certificate_arn() }],
                    "DefaultActions": [{
                        "TargetGroupArn": intrinsic::reference(&target_group),
                        "Type": "forward",
                    }],
                    "LoadBalancerArn": intrinsic::reference(load_balancer.id()),
                    "Port": listener_port,
                    "Protocol": "HTTPS",
                }),
            ),
        )?;

        let roles = declare_task_roles(stack, construct_id, &image)?;
        let task_definition = declare_task_definition(stack, construct_id, &image, &roles, &props)?;

        let task_security_groups = if deps.task_security_groups.is_empty() {
            vec![SecurityGroup::new(
                stack,
                &[construct_id, "Service", "SecurityGroup"],
                vpc,
                None,
            )?]
        } else {
            deps.task_security_groups.to_vec()
        };
        for group in &task_security_groups {
            group.add_ingress_rule(
                stack,
                &Peer::from(load_balancer.security_group()),
                Port::tcp(image.container_port),
                "Load balancer to target",
            )?;
        }

        let task_subnets = vpc
            .subnet_ids(SubnetType::Private)
            .or_else(|_| vpc.subnet_ids(SubnetType::Public))?;
        let task_group_ids: Vec<Value> = task_security_groups.iter().map(SecurityGroup::group_id).collect();
        let assign_public_ip = if props.assign_public_ip.unwrap_or(false) {
            "ENABLED"
        } else {
            "DISABLED"
        };
        let mut service = json!({
            "Cluster": deps.cluster.reference(),
            "DeploymentConfiguration": {
                "MaximumPercent": props.max_healthy_percent,
                "MinimumHealthyPercent": props.min_healthy_percent,
            },
            "DesiredCount": props.desired_count,
            "EnableECSManagedTags": props.enable_ecs_managed_tags.unwrap_or(false),
            "HealthCheckGracePeriodSeconds": props.health_check_grace_period_seconds,
            "LaunchType": "FARGATE",
            "LoadBalancers": [{
                "ContainerName": image.container_name,
                "ContainerPort": image.container_port,
                "TargetGroupArn": intrinsic::reference(&target_group),
            }],
            "NetworkConfiguration": {
                "AwsvpcConfiguration": {
                    "AssignPublicIp": assign_public_ip,
                    "SecurityGroups": task_group_ids,
                    "Subnets": task_subnets,
                },
            },
            "TaskDefinition": intrinsic::reference(&task_definition),
        });
        if let Some(breaker) = props.circuit_breaker {
            service["DeploymentConfiguration"]["DeploymentCircuitBreaker"] =
                json!({ "Enable": true, "Rollback": breaker.rollback });
        }
        if let Some(name) = &props.service_name {
            service["ServiceName"] = json!(name);
        }
        let id = stack.add_resource(
            &[construct_id, "Service", "Service"],
            CfnResource::new("AWS::ECS::Service", service).depends_on(&listener),
        )?;

        let dns_record = dns::alias_record(
            stack,
            &[construct_id, "DNS", "Resource"],
            deps.zone,
            deps.domain_name,
            load_balancer.id(),
        )?;

        let output_prefix: String = construct_id.chars().filter(char::is_ascii_alphanumeric).collect();
        stack.add_output(format!("{output_prefix}LoadBalancerDNS"), Output {
            value: load_balancer.dns_name(),
            description: None,
        })?;
        stack.add_output(format!("{output_prefix}ServiceURL"), Output {
            value: json!(format!("https://{}", deps.domain_name)),
            description: None,
        })?;

        tracing::info!(
            service = %id,
            image = %image.image,
            public,
            listener_port,
            desired_count = ?props.desired_count,
            "declared load-balanced Fargate service"
        );

        Ok(Self {
            id,
            load_balancer,
            listener,
            target_group,
            task_definition,
            task_role: roles.task_role,
            execution_role: roles.execution_role,
            log_group: roles.log_group,
            dns_record,
            task_security_groups,
            image,
            props,
        })
    }

    /// Logical id of the ECS service.
    #[must_use]
    pub const fn id(&self) -> &LogicalId {
        &self.id
    }

    /// The load balancer in front of the service.
    #[must_use]
    pub const fn load_balancer(&self) -> &LoadBalancer {
        &self.load_balancer
    }

    /// Logical id of the HTTPS listener.
    #[must_use]
    pub const fn listener(&self) -> &LogicalId {
        &self.listener
    }

    /// Logical id of the target group.
    #[must_use]
    pub const fn target_group(&self) -> &LogicalId {
        &self.target_group
    }

    /// Logical id of the task definition.
    #[must_use]
    pub const fn task_definition(&self) -> &LogicalId {
        &self.task_definition
    }

    /// Logical id of the role assumed by the containers.
    #[must_use]
    pub const fn task_role(&self) -> &LogicalId {
        &self.task_role
    }

    /// Logical id of the role ECS uses to pull the image and secrets.
    #[must_use]
    pub const fn execution_role(&self) -> &LogicalId {
        &self.execution_role
    }

    /// Logical id of the container log group.
    #[must_use]
    pub const fn log_group(&self) -> &LogicalId {
        &self.log_group
    }

    /// Logical id of the alias record.
    #[must_use]
    pub const fn dns_record(&self) -> &LogicalId {
        &self.dns_record
    }

    /// Groups attached to the tasks.
    #[must_use]
    pub fn task_security_groups(&self) -> &[SecurityGroup] {
        &self.task_security_groups
    }

    /// The container the service runs.
    #[must_use]
    pub const fn image(&self) -> &TaskImageSpec {
        &self.image
    }

    /// Effective settings after merging.
    #[must_use]
    pub const fn props(&self) -> &FargateServiceProps {
        &self.props
    }
}

fn declare_load_balancer(
    stack: &mut Stack,
    construct_id: &str,
    deps: ServiceDependencies<'_>,
    props: &FargateServiceProps,
) -> Result<LoadBalancer> {
    let vpc = deps.cluster.vpc();
    let public = props.public_load_balancer.unwrap_or(true);
    let listener_port = props.listener_port.unwrap_or(HTTPS_PORT);

    let description = format!(
        "Automatically created Security Group for ELB {}",
        LogicalId::from_path(&[construct_id, "LB", "Resource"])
    );
    let security_group = SecurityGroup::new(
        stack,
        &[construct_id, "LB", "SecurityGroup"],
        vpc,
        Some(&description),
    )?;
    if props.open_listener.unwrap_or(false) {
        security_group.add_ingress_rule(
            stack,
            &Peer::any_ipv4()?,
            Port::tcp(listener_port),
            &format!("Allow from anyone on port {listener_port}"),
        )?;
    }

    let (scheme, subnet_type) = if public {
        ("internet-facing", SubnetType::Public)
    } else {
        ("internal", SubnetType::Private)
    };
    let mut resource = CfnResource::new(
        "AWS::ElasticLoadBalancingV2::LoadBalancer",
        json!({
            "LoadBalancerAttributes": [{ "Key": "deletion_protection.enabled", "Value": "false" }],
            "Scheme": scheme,
            "SecurityGroups": [security_group.group_id()],
            "Subnets": vpc.subnet_ids(subnet_type)?,
            "Type": "application",
        }),
    );
    if public {
        for route in vpc.internet_routes() {
            resource = resource.depends_on(route);
        }
    }
    let id = stack.add_resource(&[construct_id, "LB", "Resource"], resource)?;
    Ok(LoadBalancer { id, security_group })
}

struct TaskRoles {
    task_role: LogicalId,
    execution_role: LogicalId,
    log_group: LogicalId,
}

fn assume_role_by_ecs_tasks() -> Value {
    json!({
        "Statement": [{
            "Action": "sts:AssumeRole",
            "Effect": "Allow",
            "Principal": { "Service": "ecs-tasks.amazonaws.com" },
        }],
        "Version": "2012-10-17",
    })
}

fn declare_task_roles(stack: &mut Stack, construct_id: &str, image: &TaskImageSpec) -> Result<TaskRoles> {
    let log_group = stack.add_resource(
        &[construct_id, "TaskDef", image.container_name.as_str(), "LogGroup", "Resource"],
        CfnResource::new(
            "AWS::Logs::LogGroup",
            json!({ "RetentionInDays": LOG_RETENTION_DAYS }),
        )
        .with_removal_policy(RemovalPolicy::Retain),
    )?;

    let task_role = stack.add_resource(
        &[construct_id, "TaskDef", "TaskRole", "Resource"],
        CfnResource::new(
            "AWS::IAM::Role",
            json!({ "AssumeRolePolicyDocument": assume_role_by_ecs_tasks() }),
        ),
    )?;
    let execution_role = stack.add_resource(
        &[construct_id, "TaskDef", "ExecutionRole", "Resource"],
        CfnResource::new(
            "AWS::IAM::Role",
            json!({ "AssumeRolePolicyDocument": assume_role_by_ecs_tasks() }),
        ),
    )?;

    let mut statements = vec![json!({
        "Action": ["logs:CreateLogStream", "logs:PutLogEvents"],
        "Effect": "Allow",
        "Resource": intrinsic::get_att(&log_group, "Arn"),
    })];
    let mut secret_arns: Vec<Value> = Vec::new();
    for secret in image.secrets.values() {
        if !secret_arns.contains(&secret.secret_arn) {
            secret_arns.push(secret.secret_arn.clone());
        }
    }
    if !secret_arns.is_empty() {
        statements.push(json!({
            "Action": ["secretsmanager:DescribeSecret", "secretsmanager:GetSecretValue"],
            "Effect": "Allow",
            "Resource": secret_arns,
        }));
    }

    let policy_path = [construct_id, "TaskDef", "ExecutionRole", "DefaultPolicy", "Resource"];
    let policy_name = LogicalId::from_path(&policy_path[..4]).to_string();
    let _ = stack.add_resource(
        &policy_path,
        CfnResource::new(
            "AWS::IAM::Policy",
            json!({
                "PolicyDocument": { "Statement": statements, "Version": "2012-10-17" },
                "PolicyName": policy_name,
                "Roles": [intrinsic::reference(&execution_role)],
            }),
        ),
    )?;

    Ok(TaskRoles {
        task_role,
        execution_role,
        log_group,
    })
}

fn declare_task_definition(
    stack: &mut Stack,
    construct_id: &str,
    image: &TaskImageSpec,
    roles: &TaskRoles,
    props: &FargateServiceProps,
) -> Result<LogicalId> {
    let cpu = props.cpu.ok_or(StackError::MissingField { field: "service.cpu" })?;
    let memory = props.memory_limit_mib.ok_or(StackError::MissingField {
        field: "service.memory_limit_mib",
    })?;
    let family: String = stack
        .node_path(&[construct_id, "TaskDef"])
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();

    stack.add_resource(
        &[construct_id, "TaskDef", "Resource"],
        CfnResource::new(
            "AWS::ECS::TaskDefinition",
            json!({
                "ContainerDefinitions": [image.container_definition(&roles.log_group, construct_id)],
                "Cpu": cpu.to_string(),
                "ExecutionRoleArn": intrinsic::get_att(&roles.execution_role, "Arn"),
                "Family": family,
                "Memory": memory.to_string(),
                "NetworkMode": "awsvpc",
                "RequiresCompatibilities": ["FARGATE"],
                "TaskRoleArn": intrinsic::get_att(&roles.task_role, "Arn"),
            }),
        ),
    )
}
