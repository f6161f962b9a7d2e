//! Built-in deployment profiles.
//!
//! `open` admits the default load balancer CIDR, `restricted` admits a
//! single address. Both target the same hosted zone and cluster name.

use clap::ValueEnum;
use statping_common::config::StackConfiguration;

/// Hosted zone id used by the built-in profiles.
pub const PROFILE_HOSTED_ZONE_ID: &str = "Z1VKI2XXXXXXX";

/// Hosted zone name used by the built-in profiles.
pub const PROFILE_HOSTED_ZONE_NAME: &str = "example.com";

/// ECS cluster name used by the built-in profiles.
pub const PROFILE_CLUSTER_NAME: &str = "statping-cluster";

/// The only address the restricted profile admits.
pub const RESTRICTED_CIDR: &str = "203.0.113.10/32";

/// A built-in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Profile {
    /// HTTPS open to the default CIDR.
    #[default]
    Open,
    /// HTTPS open to a single address.
    Restricted,
}

impl Profile {
    /// Builds the configuration of this profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the built-in CIDR fails to parse.
    pub fn configuration(self) -> anyhow::Result<StackConfiguration> {
        let mut config = StackConfiguration {
            cluster_name: Some(PROFILE_CLUSTER_NAME.to_string()),
            ..StackConfiguration::new(PROFILE_HOSTED_ZONE_ID, PROFILE_HOSTED_ZONE_NAME)
        };
        if self == Self::Restricted {
            config.load_balancer_cidr = Some(RESTRICTED_CIDR.parse()?);
        }
        Ok(config)
    }
}
