//! The Statping deployment.
//!
//! [`StatpingStack::new`] resolves the configuration and then declares, in
//! order: the network, the database credentials, the compute-tier security
//! group, the database, the certificate for the service domain, the ECS
//! cluster, the load-balanced service and the load balancer's allow-list.

use serde_json::json;
use statping_common::config::{ResolvedConfiguration, StackConfiguration};
use statping_common::constants::{
    DATABASE_CONNECTION_DRIVER, DATABASE_PORT, HTTPS_PORT, STATPING_IMAGE,
};
use statping_common::error::Result;
use statping_common::types::Port;

use crate::cluster::EcsCluster;
use crate::database::{DatabaseDependencies, DatabaseSecret, ServerlessCluster};
use crate::dns::{DnsValidatedCertificate, HostedZone};
use crate::network::Vpc;
use crate::security_group::{Peer, SecurityGroup};
use crate::service::{ContainerSecret, LoadBalancedFargateService, ServiceDependencies, TaskImageSpec};
use crate::stack::Stack;
use crate::template::Template;

/// Construct id of the Fargate service.
const SERVICE_CONSTRUCT_ID: &str = "MyFargateService";

/// A fully declared Statping deployment.
#[derive(Debug, Clone)]
pub struct StatpingStack {
    stack: Stack,
    config: ResolvedConfiguration,
    vpc: Vpc,
    secret: DatabaseSecret,
    compute_security_group: SecurityGroup,
    database: ServerlessCluster,
    zone: HostedZone,
    certificate: DnsValidatedCertificate,
    cluster: EcsCluster,
    service: LoadBalancedFargateService,
    load_balancer_security_group: SecurityGroup,
}

impl StatpingStack {
    /// Declares every resource of the deployment.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration lacks the hosted zone, holds an
    /// invalid value, or describes a layout that cannot be declared.
    pub fn new(id: &str, configuration: StackConfiguration) -> Result<Self> {
        let config = configuration.resolve(id)?;
        let domain_name = config.full_domain_name();
        tracing::info!(stack = id, domain = %domain_name, "declaring statping stack");

        let mut stack = Stack::new(id, Some(format!("Statping status page at {domain_name}")));

        let vpc = Vpc::new(&mut stack, &format!("Vpc{id}"), &config.vpc)?;

        let secret_name = format!("RdsSecret{id}");
        let secret = DatabaseSecret::generate(
            &mut stack,
            &[secret_name.as_str()],
            &config.database_username,
            &secret_name,
        )?;

        let compute_security_group =
            SecurityGroup::new(&mut stack, &[format!("ClusterSecurityGroup{id}").as_str()], &vpc, None)?;

        let database = ServerlessCluster::new(
            &mut stack,
            id,
            DatabaseDependencies {
                vpc: &vpc,
                credentials: &secret,
                client_security_group: &compute_security_group,
            },
            &config.database_name,
            &config.database,
        )?;

        let zone = HostedZone::from_attributes(&config.hosted_zone_id, &config.hosted_zone_name)?;
        let certificate =
            DnsValidatedCertificate::new(&mut stack, &[format!("Certificate{id}").as_str()], &zone, &domain_name)?;

        let cluster = EcsCluster::new(&mut stack, id, &vpc, &config.cluster_name, &config.cluster)?;

        let image = statping_image(&config, &domain_name, &secret, &database);
        let service = LoadBalancedFargateService::new(
            &mut stack,
            SERVICE_CONSTRUCT_ID,
            ServiceDependencies {
                cluster: &cluster,
                certificate: &certificate,
                zone: &zone,
                domain_name: &domain_name,
                task_security_groups: std::slice::from_ref(&compute_security_group),
            },
            image,
            &config.service,
        )?;

        let load_balancer_security_group =
            SecurityGroup::new(&mut stack, &[format!("LBSecurityGroup{id}").as_str()], &vpc, None)?;
        load_balancer_security_group.add_ingress_rule(
            &mut stack,
            &Peer::Ipv4(config.load_balancer_cidr),
            Port::tcp(HTTPS_PORT),
            "allow https traffic from whitelisted cidr block",
        )?;
        service
            .load_balancer()
            .add_security_group(&mut stack, &load_balancer_security_group)?;

        tracing::info!(
            stack = id,
            resources = stack.template().resources.len(),
            "statping stack declared"
        );

        Ok(Self {
            stack,
            config,
            vpc,
            secret,
            compute_security_group,
            database,
            zone,
            certificate,
            cluster,
            service,
            load_balancer_security_group,
        })
    }

    /// The resolved configuration the stack was declared from.
    #[must_use]
    pub const fn config(&self) -> &ResolvedConfiguration {
        &self.config
    }

    /// `{service_domain_name}.{hosted_zone_name}`.
    #[must_use]
    pub fn full_domain_name(&self) -> String {
        self.config.full_domain_name()
    }

    /// The underlying stack.
    #[must_use]
    pub const fn stack(&self) -> &Stack {
        &self.stack
    }

    /// The template declared so far, without validation.
    #[must_use]
    pub const fn template(&self) -> &Template {
        self.stack.template()
    }

    /// Validates the resource graph and returns the template.
    ///
    /// # Errors
    ///
    /// Returns an error if a reference dangles or the dependencies form a
    /// cycle.
    pub fn synth(&self) -> Result<Template> {
        self.stack.synth()
    }

    /// The network.
    #[must_use]
    pub const fn vpc(&self) -> &Vpc {
        &self.vpc
    }

    /// The database credentials.
    #[must_use]
    pub const fn secret(&self) -> &DatabaseSecret {
        &self.secret
    }

    /// The group attached to the Statping tasks.
    #[must_use]
    pub const fn compute_security_group(&self) -> &SecurityGroup {
        &self.compute_security_group
    }

    /// The database cluster.
    #[must_use]
    pub const fn database(&self) -> &ServerlessCluster {
        &self.database
    }

    /// The hosted zone the service domain lives in.
    #[must_use]
    pub const fn zone(&self) -> &HostedZone {
        &self.zone
    }

    /// The certificate for the service domain.
    #[must_use]
    pub const fn certificate(&self) -> &DnsValidatedCertificate {
        &self.certificate
    }

    /// The ECS cluster.
    #[must_use]
    pub const fn cluster(&self) -> &EcsCluster {
        &self.cluster
    }

    /// The load-balanced service.
    #[must_use]
    pub const fn service(&self) -> &LoadBalancedFargateService {
        &self.service
    }

    /// The allow-list group attached to the load balancer.
    #[must_use]
    pub const fn load_balancer_security_group(&self) -> &SecurityGroup {
        &self.load_balancer_security_group
    }
}

/// The Statping container, wired to the database. The password only ever
/// travels as a secret reference.
fn statping_image(
    config: &ResolvedConfiguration,
    domain_name: &str,
    secret: &DatabaseSecret,
    database: &ServerlessCluster,
) -> TaskImageSpec {
    TaskImageSpec::new(STATPING_IMAGE)
        .env("NAME", config.header.as_str())
        .env("DESCRIPTION", config.description.as_str())
        .env("DOMAIN", format!("https://{domain_name}"))
        .env("ADMIN_USER", config.admin_user.as_str())
        .env("ADMIN_PASSWORD", config.admin_password.as_str())
        .env("DB_DATABASE", config.database_name.as_str())
        .env("DB_HOST", database.endpoint_hostname())
        .env("DB_USER", secret.username())
        .env("DB_CONN", DATABASE_CONNECTION_DRIVER)
        .env("DB_PORT", json!(DATABASE_PORT.to_string()))
        .secret("DB_PASS", ContainerSecret {
            secret_arn: database.secret_arn(),
            key: "password".to_string(),
        })
}
