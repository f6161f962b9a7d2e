//! Domain primitive types used across the statping-stack workspace.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants::{LOGICAL_ID_HASH_LENGTH, MAX_LOGICAL_ID_LENGTH};
use crate::error::{Result, StackError};

/// Identifier of a resource inside a rendered template.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    /// Creates a logical id from a literal value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derives a stable logical id from a construct path.
    ///
    /// The alphanumeric characters of every path component are concatenated
    /// and followed by the first eight hex digits of the SHA-256 of the
    /// `/`-joined path, so two paths that read the same once punctuation is
    /// stripped still get distinct ids.
    #[must_use]
    pub fn from_path(path: &[&str]) -> Self {
        let human: String = path
            .iter()
            .flat_map(|component| component.chars())
            .filter(char::is_ascii_alphanumeric)
            .take(MAX_LOGICAL_ID_LENGTH - LOGICAL_ID_HASH_LENGTH)
            .collect();

        let digest = Sha256::digest(path.join("/").as_bytes());
        let hash: String = digest
            .iter()
            .take(LOGICAL_ID_HASH_LENGTH / 2)
            .map(|b| format!("{b:02X}"))
            .collect();

        Self(format!("{human}{hash}"))
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LogicalId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// An IPv4 address block in CIDR notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Cidr(Ipv4Net);

impl Ipv4Cidr {
    /// Returns the prefix length.
    #[must_use]
    pub const fn prefix(&self) -> u8 {
        self.0.prefix_len()
    }

    /// Returns the address as written, host bits included.
    #[must_use]
    pub const fn address(&self) -> Ipv4Addr {
        self.0.addr()
    }

    /// Returns the network address with host bits cleared.
    #[must_use]
    pub fn network(&self) -> Ipv4Addr {
        self.0.network()
    }

    /// Returns the `index`-th block of length `new_prefix` inside this one.
    ///
    /// # Errors
    ///
    /// Returns an error if `new_prefix` is shorter than this block's prefix,
    /// longer than 32, or if `index` falls outside the block.
    pub fn subnet(&self, new_prefix: u8, index: u32) -> Result<Self> {
        let mut blocks = self.0.subnets(new_prefix).map_err(|_| StackError::Config {
            message: format!("cannot carve a /{new_prefix} out of {self}"),
        })?;
        let position = usize::try_from(index).map_err(|_| StackError::Config {
            message: format!("subnet #{index} does not fit in {self}"),
        })?;
        blocks.nth(position).map(Self).ok_or_else(|| StackError::Config {
            message: format!("subnet #{index} does not fit in {self}"),
        })
    }
}

impl FromStr for Ipv4Cidr {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self> {
        Ipv4Net::from_str(s.trim())
            .map(Self)
            .map_err(|e| StackError::Config {
                message: format!("invalid IPv4 CIDR block \"{s}\": {e}"),
            })
    }
}

impl TryFrom<String> for Ipv4Cidr {
    type Error = StackError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Ipv4Cidr> for String {
    fn from(value: Ipv4Cidr) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transport protocol of a security group rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// TCP.
    Tcp,
    /// UDP.
    Udp,
    /// Every protocol.
    All,
}

impl Protocol {
    /// Returns the protocol as CloudFormation expects it in `IpProtocol`.
    #[must_use]
    pub const fn ip_protocol(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::All => "-1",
        }
    }
}

/// A port range that a security group rule opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Port {
    /// Transport protocol.
    pub protocol: Protocol,
    /// First port of the range.
    pub from_port: u16,
    /// Last port of the range.
    pub to_port: u16,
}

impl Port {
    /// A single TCP port.
    #[must_use]
    pub const fn tcp(port: u16) -> Self {
        Self {
            protocol: Protocol::Tcp,
            from_port: port,
            to_port: port,
        }
    }

    /// Every port of every protocol.
    #[must_use]
    pub const fn all_traffic() -> Self {
        Self {
            protocol: Protocol::All,
            from_port: 0,
            to_port: u16::MAX,
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.protocol {
            Protocol::All => write!(f, "all traffic"),
            _ if self.from_port == self.to_port => {
                write!(f, "{} {}", self.protocol.ip_protocol(), self.from_port)
            }
            _ => write!(
                f,
                "{} {}-{}",
                self.protocol.ip_protocol(),
                self.from_port,
                self.to_port
            ),
        }
    }
}

/// Role a subnet plays inside the VPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubnetType {
    /// Routed to an internet gateway.
    Public,
    /// Outbound-only through a NAT gateway.
    Private,
    /// No route to the internet at all.
    Isolated,
}

impl SubnetType {
    /// Capitalized label used inside construct paths.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Public => "Public",
            Self::Private => "Private",
            Self::Isolated => "Isolated",
        }
    }
}

impl fmt::Display for SubnetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Private => write!(f, "private"),
            Self::Isolated => write!(f, "isolated"),
        }
    }
}

/// What the provisioning engine does with a resource when it leaves the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalPolicy {
    /// Keep the resource.
    Retain,
    /// Take a final snapshot, then delete.
    Snapshot,
    /// Delete the resource.
    Destroy,
}

impl RemovalPolicy {
    /// Returns the value for `DeletionPolicy` / `UpdateReplacePolicy`.
    #[must_use]
    pub const fn as_cfn(self) -> &'static str {
        match self {
            Self::Retain => "Retain",
            Self::Snapshot => "Snapshot",
            Self::Destroy => "Delete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_id_is_deterministic() {
        let a = LogicalId::from_path(&["VpcMyStack", "PublicSubnet1", "Subnet"]);
        let b = LogicalId::from_path(&["VpcMyStack", "PublicSubnet1", "Subnet"]);
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("VpcMyStackPublicSubnet1Subnet"));
        assert_eq!(a.as_str().len(), "VpcMyStackPublicSubnet1Subnet".len() + 8);
    }

    #[test]
    fn logical_id_strips_punctuation_but_hashes_full_path() {
        let a = LogicalId::from_path(&["my-stack", "Vpc"]);
        let b = LogicalId::from_path(&["mystack", "Vpc"]);
        assert!(a.as_str().starts_with("mystackVpc"));
        assert_ne!(a, b);
    }

    #[test]
    fn logical_id_depends_on_stack_id() {
        let a = LogicalId::from_path(&["DatabaseA"]);
        let b = LogicalId::from_path(&["DatabaseB"]);
        assert_ne!(a, b);
    }

    #[test]
    fn cidr_parses_and_displays() {
        let cidr: Ipv4Cidr = "10.0.0.0/16".parse().expect("parse");
        assert_eq!(cidr.prefix(), 16);
        assert_eq!(cidr.to_string(), "10.0.0.0/16");
    }

    #[test]
    fn cidr_rejects_garbage() {
        assert!("10.0.0.0".parse::<Ipv4Cidr>().is_err());
        assert!("10.0.0.0/33".parse::<Ipv4Cidr>().is_err());
        assert!("300.0.0.0/8".parse::<Ipv4Cidr>().is_err());
        assert!("not-a-cidr/8".parse::<Ipv4Cidr>().is_err());
    }

    #[test]
    fn cidr_keeps_single_address() {
        let cidr: Ipv4Cidr = "203.0.113.10/32".parse().expect("parse");
        assert_eq!(cidr.network(), Ipv4Addr::new(203, 0, 113, 10));
    }

    #[test]
    fn cidr_subnets_are_carved_in_order() {
        let vpc: Ipv4Cidr = "10.0.0.0/16".parse().expect("parse");
        assert_eq!(vpc.subnet(19, 0).expect("first").to_string(), "10.0.0.0/19");
        assert_eq!(vpc.subnet(19, 1).expect("second").to_string(), "10.0.32.0/19");
        assert_eq!(vpc.subnet(19, 7).expect("last").to_string(), "10.0.224.0/19");
    }

    #[test]
    fn cidr_subnet_out_of_range_fails() {
        let vpc: Ipv4Cidr = "10.0.0.0/16".parse().expect("parse");
        assert!(vpc.subnet(17, 2).is_err());
        assert!(vpc.subnet(8, 0).is_err());
    }

    #[test]
    fn cidr_keeps_host_bits_as_written() {
        let cidr: Ipv4Cidr = "10.0.7.1/16".parse().expect("parse");
        assert_eq!(cidr.address(), Ipv4Addr::new(10, 0, 7, 1));
        assert_eq!(cidr.network(), Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(cidr.to_string(), "10.0.7.1/16");
        assert_eq!(cidr.subnet(17, 1).expect("second").to_string(), "10.0.128.0/17");
    }

    #[test]
    fn cidr_serde_uses_string_form() {
        let cidr: Ipv4Cidr = serde_json::from_str("\"0.0.0.0/16\"").expect("deserialize");
        assert_eq!(serde_json::to_string(&cidr).expect("serialize"), "\"0.0.0.0/16\"");
        assert!(serde_json::from_str::<Ipv4Cidr>("\"0.0.0.0\"").is_err());
    }

    #[test]
    fn port_display() {
        assert_eq!(Port::tcp(443).to_string(), "tcp 443");
        assert_eq!(Port::all_traffic().to_string(), "all traffic");
    }
}
