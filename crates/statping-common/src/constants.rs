//! System-wide constants and deployment defaults.

/// Stack id used when the CLI is not given one.
pub const DEFAULT_STACK_ID: &str = "CdkStatpingStack";

/// CloudFormation template format version.
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Number of hex digits appended to every logical id.
pub const LOGICAL_ID_HASH_LENGTH: usize = 8;

/// Maximum length of a CloudFormation logical id.
pub const MAX_LOGICAL_ID_LENGTH: usize = 255;

// ── Stack configuration defaults ─────────────────────────────────────

/// Default database master username.
pub const DEFAULT_DATABASE_USERNAME: &str = "statping";
/// Default database schema name.
pub const DEFAULT_DATABASE_NAME: &str = "statping";
/// Default Statping admin user.
pub const DEFAULT_ADMIN_USER: &str = "admin";
/// Default Statping admin password.
pub const DEFAULT_ADMIN_PASSWORD: &str = "helloapes";
/// Default subdomain label for the service.
pub const DEFAULT_SERVICE_DOMAIN_NAME: &str = "statping";
/// Default status page header.
pub const DEFAULT_HEADER: &str = "test status page";
/// Default status page description.
pub const DEFAULT_DESCRIPTION: &str = "monitor external services";
/// Default CIDR admitted by the load balancer security group.
pub const DEFAULT_LOAD_BALANCER_CIDR: &str = "0.0.0.0/16";

// ── Network ──────────────────────────────────────────────────────────

/// Default VPC address block.
pub const DEFAULT_VPC_CIDR: &str = "10.0.0.0/16";
/// Default number of availability zones.
pub const DEFAULT_MAX_AZS: u8 = 2;
/// CIDR that matches every IPv4 address.
pub const ANY_IPV4: &str = "0.0.0.0/0";

// ── Database ─────────────────────────────────────────────────────────

/// Aurora engine identifier.
pub const DATABASE_ENGINE: &str = "aurora-mysql";
/// Aurora engine mode for serverless capacity.
pub const DATABASE_ENGINE_MODE: &str = "serverless";
/// Value handed to the container as the connection driver.
pub const DATABASE_CONNECTION_DRIVER: &str = "mysql";
/// Port the database cluster listens on.
pub const DATABASE_PORT: u16 = 3306;
/// Characters excluded from generated database passwords.
pub const SECRET_EXCLUDE_CHARACTERS: &str = " %+~`#$&*()|[]{}:;<>?!'/@\"\\";
/// Length of generated database passwords.
pub const SECRET_PASSWORD_LENGTH: u32 = 30;

// ── Service ──────────────────────────────────────────────────────────

/// Container image for Statping.
pub const STATPING_IMAGE: &str = "statping/statping:v0.90.74";
/// Port the Statping container listens on.
pub const CONTAINER_PORT: u16 = 8080;
/// Name of the container inside the task definition.
pub const CONTAINER_NAME: &str = "web";
/// HTTPS listener port.
pub const HTTPS_PORT: u16 = 443;
/// Default task CPU units.
pub const DEFAULT_TASK_CPU: u32 = 512;
/// Default task memory in MiB.
pub const DEFAULT_TASK_MEMORY_MIB: u32 = 2048;
/// Default number of running tasks.
pub const DEFAULT_DESIRED_COUNT: u32 = 1;
/// Days the container log group keeps events.
pub const LOG_RETENTION_DAYS: u32 = 30;
