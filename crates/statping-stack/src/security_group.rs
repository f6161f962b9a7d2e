//! Security groups and their ingress rules.
//!
//! Rules from a CIDR are rendered inline on the group. Rules from another
//! group become separate `AWS::EC2::SecurityGroupIngress` resources, so two
//! groups can admit each other without a reference cycle.

use serde_json::{Value, json};
use statping_common::constants::ANY_IPV4;
use statping_common::error::Result;
use statping_common::types::{Ipv4Cidr, LogicalId, Port, Protocol};

use crate::network::Vpc;
use crate::stack::Stack;
use crate::template::{CfnResource, intrinsic};

/// The source of an ingress rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Peer {
    /// Any address inside an IPv4 block.
    Ipv4(Ipv4Cidr),
    /// Any network interface that carries another security group.
    SecurityGroup(LogicalId),
}

impl Peer {
    /// Every IPv4 address.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the constant is a valid CIDR.
    pub fn any_ipv4() -> Result<Self> {
        Ok(Self::Ipv4(ANY_IPV4.parse()?))
    }

    /// Short name used in the logical id of a cross-group rule.
    fn unique_id(&self) -> String {
        match self {
            Self::Ipv4(cidr) => cidr.to_string(),
            Self::SecurityGroup(id) => id.to_string(),
        }
    }
}

impl From<&SecurityGroup> for Peer {
    fn from(group: &SecurityGroup) -> Self {
        Self::SecurityGroup(group.id.clone())
    }
}

/// Handle to a declared security group.
#[derive(Debug, Clone)]
pub struct SecurityGroup {
    id: LogicalId,
    path: Vec<String>,
}

impl SecurityGroup {
    /// Declares a security group in `vpc` that allows all outbound traffic.
    ///
    /// # Errors
    ///
    /// Returns an error if the construct path is already taken.
    pub fn new(stack: &mut Stack, path: &[&str], vpc: &Vpc, description: Option<&str>) -> Result<Self> {
        let description = description.map_or_else(|| stack.node_path(path), str::to_string);
        let resource = CfnResource::new(
            "AWS::EC2::SecurityGroup",
            json!({
                "GroupDescription": description,
                "SecurityGroupEgress": [{
                    "CidrIp": ANY_IPV4,
                    "Description": "Allow all outbound traffic by default",
                    "IpProtocol": Protocol::All.ip_protocol(),
                }],
                "VpcId": vpc.vpc_id(),
            }),
        );
        let id = stack.add_resource(path, resource)?;
        Ok(Self {
            id,
            path: path.iter().map(|s| (*s).to_string()).collect(),
        })
    }

    /// Logical id of the group.
    #[must_use]
    pub const fn id(&self) -> &LogicalId {
        &self.id
    }

    /// `Fn::GetAtt GroupId`.
    #[must_use]
    pub fn group_id(&self) -> Value {
        intrinsic::get_att(&self.id, "GroupId")
    }

    /// Admits traffic from `peer` on `port`.
    ///
    /// # Errors
    ///
    /// Returns an error if the group is no longer declared or a rule with the
    /// same peer and port already exists.
    pub fn add_ingress_rule(&self, stack: &mut Stack, peer: &Peer, port: Port, description: &str) -> Result<()> {
        tracing::debug!(group = %self.id, peer = %peer.unique_id(), %port, "adding ingress rule");
        match peer {
            Peer::Ipv4(cidr) => {
                let mut rule = port_fields(port);
                rule["CidrIp"] = json!(cidr.to_string());
                rule["Description"] = json!(description);
                stack.resource_mut(&self.id)?.push_to_list("SecurityGroupIngress", rule)
            }
            Peer::SecurityGroup(source) => {
                let rule_name = format!("from {}:{}", peer.unique_id(), port_label(port));
                let mut path: Vec<&str> = self.path.iter().map(String::as_str).collect();
                path.push(&rule_name);

                let mut properties = port_fields(port);
                properties["Description"] = json!(description);
                properties["GroupId"] = self.group_id();
                properties["SourceSecurityGroupId"] = intrinsic::get_att(source, "GroupId");
                let _ = stack.add_resource(
                    &path,
                    CfnResource::new("AWS::EC2::SecurityGroupIngress", properties),
                )?;
                Ok(())
            }
        }
    }
}

fn port_fields(port: Port) -> Value {
    match port.protocol {
        Protocol::All => json!({ "IpProtocol": port.protocol.ip_protocol() }),
        _ => json!({
            "FromPort": port.from_port,
            "IpProtocol": port.protocol.ip_protocol(),
            "ToPort": port.to_port,
        }),
    }
}

fn port_label(port: Port) -> String {
    match port.protocol {
        Protocol::All => "ALL TRAFFIC".to_string(),
        _ if port.from_port == port.to_port => port.from_port.to_string(),
        _ => format!("{}-{}", port.from_port, port.to_port),
    }
}

#[cfg(test)]
mod tests {
    use statping_common::config::VpcProps;

    use super::*;

    fn setup() -> (Stack, Vpc) {
        let mut stack = Stack::new("Test", None);
        let vpc = Vpc::new(&mut stack, "VpcTest", &VpcProps::default()).expect("vpc");
        (stack, vpc)
    }

    #[test]
    fn new_group_allows_all_outbound() {
        let (mut stack, vpc) = setup();
        let sg = SecurityGroup::new(&mut stack, &["Sg"], &vpc, None).expect("sg");
        let resource = stack.resource(sg.id()).expect("declared");
        assert_eq!(resource.resource_type, "AWS::EC2::SecurityGroup");
        assert_eq!(resource.property("GroupDescription"), Some(&json!("Test/Sg")));
        assert_eq!(resource.properties["SecurityGroupEgress"][0]["IpProtocol"], "-1");
        assert_eq!(resource.property("VpcId"), Some(&vpc.vpc_id()));
    }

    #[test]
    fn cidr_rule_is_inline() {
        let (mut stack, vpc) = setup();
        let sg = SecurityGroup::new(&mut stack, &["Lb"], &vpc, None).expect("sg");
        let cidr: Ipv4Cidr = "203.0.113.10/32".parse().expect("cidr");
        sg.add_ingress_rule(&mut stack, &Peer::Ipv4(cidr), Port::tcp(443), "https")
            .expect("rule");

        let ingress = &stack.resource(sg.id()).expect("declared").properties["SecurityGroupIngress"];
        assert_eq!(
            ingress,
            &json!([{
                "CidrIp": "203.0.113.10/32",
                "Description": "https",
                "FromPort": 443,
                "IpProtocol": "tcp",
                "ToPort": 443
            }])
        );
    }

    #[test]
    fn group_rule_is_a_separate_resource() {
        let (mut stack, vpc) = setup();
        let db = SecurityGroup::new(&mut stack, &["Db"], &vpc, None).expect("db");
        let tasks = SecurityGroup::new(&mut stack, &["Tasks"], &vpc, None).expect("tasks");
        db.add_ingress_rule(&mut stack, &Peer::from(&tasks), Port::tcp(3306), "db access")
            .expect("rule");

        let rules: Vec<_> = stack
            .template()
            .resources_of_type("AWS::EC2::SecurityGroupIngress")
            .collect();
        assert_eq!(rules.len(), 1);
        let (_, rule) = rules[0];
        assert_eq!(rule.property("GroupId"), Some(&db.group_id()));
        assert_eq!(rule.property("SourceSecurityGroupId"), Some(&tasks.group_id()));
        assert_eq!(rule.property("FromPort"), Some(&json!(3306)));
        assert!(stack.resource(db.id()).expect("db").property("SecurityGroupIngress").is_none());
        assert!(stack.synth().is_ok());
    }

    #[test]
    fn duplicate_group_rule_is_rejected() {
        let (mut stack, vpc) = setup();
        let db = SecurityGroup::new(&mut stack, &["Db"], &vpc, None).expect("db");
        let tasks = SecurityGroup::new(&mut stack, &["Tasks"], &vpc, None).expect("tasks");
        let peer = Peer::from(&tasks);
        db.add_ingress_rule(&mut stack, &peer, Port::tcp(3306), "a").expect("first");
        assert!(db.add_ingress_rule(&mut stack, &peer, Port::tcp(3306), "b").is_err());
    }

    #[test]
    fn all_traffic_rule_omits_ports() {
        assert_eq!(port_fields(Port::all_traffic()), json!({ "IpProtocol": "-1" }));
        assert_eq!(port_label(Port::all_traffic()), "ALL TRAFFIC");
    }
}
