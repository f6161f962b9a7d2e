//! VPC builder.
//!
//! Lays out one subnet per role per availability zone, carving the address
//! block in declaration order (role by role, zone by zone). Public subnets
//! route to an internet gateway and host the NAT gateways, private subnets
//! route through a NAT gateway in their zone, isolated subnets get a route
//! table with no default route.

use serde_json::{Value, json};
use statping_common::config::{Merge, SubnetConfiguration, VpcProps};
use statping_common::constants::{ANY_IPV4, DEFAULT_MAX_AZS, DEFAULT_VPC_CIDR};
use statping_common::error::{Result, StackError};
use statping_common::types::{Ipv4Cidr, LogicalId, SubnetType};

use crate::stack::Stack;
use crate::template::{CfnResource, intrinsic};

/// Smallest subnet CloudFormation accepts.
const MAX_SUBNET_PREFIX: u8 = 28;

/// A declared subnet.
#[derive(Debug, Clone)]
pub struct Subnet {
    /// Logical id of the subnet.
    pub id: LogicalId,
    /// Routing role.
    pub subnet_type: SubnetType,
    /// Index of the availability zone.
    pub availability_zone: usize,
    /// Address block.
    pub cidr: Ipv4Cidr,
    /// Logical id of the subnet's route table.
    pub route_table: LogicalId,
    /// Logical id of the route table association.
    pub route_table_association: LogicalId,
    /// Logical id of the subnet's default route, if it has one.
    pub default_route: Option<LogicalId>,
}

/// Handle to a declared VPC.
#[derive(Debug, Clone)]
pub struct Vpc {
    id: LogicalId,
    cidr: Ipv4Cidr,
    max_azs: u8,
    subnets: Vec<Subnet>,
}

struct InternetGateway {
    gateway: LogicalId,
    attachment: LogicalId,
}

struct PlannedSubnet<'a> {
    config: &'a SubnetConfiguration,
    availability_zone: usize,
    cidr: Ipv4Cidr,
}

impl Vpc {
    /// The VPC layout used when nothing is overridden.
    ///
    /// # Errors
    ///
    /// Returns an error if the built-in CIDR fails to parse.
    pub fn default_props() -> Result<VpcProps> {
        Ok(VpcProps {
            cidr: Some(DEFAULT_VPC_CIDR.parse()?),
            max_azs: Some(DEFAULT_MAX_AZS),
            nat_gateways: None,
            subnet_configuration: Some(vec![
                SubnetConfiguration {
                    name: "ecs_public_".into(),
                    subnet_type: SubnetType::Public,
                    cidr_mask: None,
                },
                SubnetConfiguration {
                    name: "ecs_private_".into(),
                    subnet_type: SubnetType::Private,
                    cidr_mask: None,
                },
                SubnetConfiguration {
                    name: "aurora_isolated_".into(),
                    subnet_type: SubnetType::Isolated,
                    cidr_mask: None,
                },
            ]),
        })
    }

    /// Declares the VPC, merging `overrides` over [`Vpc::default_props`].
    ///
    /// # Errors
    ///
    /// Returns an error if the layout does not fit the address block, no
    /// zone or subnet role is configured, or private subnets have no NAT
    /// gateway to route through.
    pub fn new(stack: &mut Stack, construct_id: &str, overrides: &VpcProps) -> Result<Self> {
        let props = Self::default_props()?.merge(overrides.clone());
        let cidr = props.cidr.ok_or(StackError::MissingField { field: "vpc.cidr" })?;
        let max_azs = props.max_azs.ok_or(StackError::MissingField {
            field: "vpc.max_azs",
        })?;
        let roles = props.subnet_configuration.unwrap_or_default();

        if max_azs == 0 {
            return Err(StackError::Config {
                message: "vpc.max_azs must be at least 1".into(),
            });
        }
        if roles.is_empty() {
            return Err(StackError::Config {
                message: "vpc.subnet_configuration must declare at least one subnet role".into(),
            });
        }

        let planned = plan_subnets(cidr, usize::from(max_azs), &roles)?;
        let public_count = planned
            .iter()
            .filter(|p| p.config.subnet_type == SubnetType::Public)
            .count();
        let nat_count = props
            .nat_gateways
            .map_or(usize::from(max_azs), usize::from)
            .min(public_count);
        if nat_count == 0 && planned.iter().any(|p| p.config.subnet_type == SubnetType::Private) {
            return Err(StackError::Config {
                message: "private subnets need at least one public subnet and NAT gateway".into(),
            });
        }

        let vpc_path = stack.node_path(&[construct_id]);
        let id = stack.add_resource(
            &[construct_id],
            CfnResource::new(
                "AWS::EC2::VPC",
                json!({
                    "CidrBlock": cidr.to_string(),
                    "EnableDnsHostnames": true,
                    "EnableDnsSupport": true,
                    "InstanceTenancy": "default",
                    "Tags": [{ "Key": "Name", "Value": vpc_path }],
                }),
            ),
        )?;

        let mut vpc = Self {
            id,
            cidr,
            max_azs,
            subnets: Vec::with_capacity(planned.len()),
        };

        let internet_gateway = if public_count > 0 {
            Some(vpc.declare_internet_gateway(stack, construct_id)?)
        } else {
            None
        };

        let mut nat_gateways = Vec::new();
        for (n, plan) in planned
            .iter()
            .filter(|p| p.config.subnet_type == SubnetType::Public)
            .enumerate()
        {
            let subnet = vpc.declare_subnet(stack, construct_id, plan, internet_gateway.as_ref())?;
            if n < nat_count {
                nat_gateways.push(declare_nat_gateway(stack, construct_id, plan, &subnet)?);
            }
            vpc.subnets.push(subnet);
        }

        for plan in planned
            .iter()
            .filter(|p| p.config.subnet_type != SubnetType::Public)
        {
            let mut subnet = vpc.declare_subnet(stack, construct_id, plan, None)?;
            if plan.config.subnet_type == SubnetType::Private {
                let nat = &nat_gateways[plan.availability_zone % nat_gateways.len()];
                subnet.default_route = Some(declare_default_route(
                    stack,
                    construct_id,
                    plan,
                    &subnet.route_table,
                    "NatGatewayId",
                    nat,
                    None,
                )?);
            }
            vpc.subnets.push(subnet);
        }

        tracing::info!(
            vpc = %vpc.id,
            cidr = %vpc.cidr,
            azs = vpc.max_azs,
            subnets = vpc.subnets.len(),
            nat_gateways = nat_gateways.len(),
            "declared vpc"
        );
        Ok(vpc)
    }

    fn declare_internet_gateway(&self, stack: &mut Stack, construct_id: &str) -> Result<InternetGateway> {
        let name = stack.node_path(&[construct_id]);
        let igw = stack.add_resource(
            &[construct_id, "IGW"],
            CfnResource::new(
                "AWS::EC2::InternetGateway",
                json!({ "Tags": [{ "Key": "Name", "Value": name }] }),
            ),
        )?;
        let attachment = stack.add_resource(
            &[construct_id, "VPCGW"],
            CfnResource::new(
                "AWS::EC2::VPCGatewayAttachment",
                json!({
                    "InternetGatewayId": intrinsic::reference(&igw),
                    "VpcId": self.vpc_id(),
                }),
            ),
        )?;
        Ok(InternetGateway {
            gateway: igw,
            attachment,
        })
    }

    fn declare_subnet(
        &self,
        stack: &mut Stack,
        construct_id: &str,
        plan: &PlannedSubnet<'_>,
        internet_gateway: Option<&InternetGateway>,
    ) -> Result<Subnet> {
        let subnet_name = subnet_construct_name(plan);
        let node_path = stack.node_path(&[construct_id, subnet_name.as_str()]);
        let tags = json!([
            { "Key": "aws-cdk:subnet-name", "Value": plan.config.name },
            { "Key": "aws-cdk:subnet-type", "Value": plan.config.subnet_type.label() },
            { "Key": "Name", "Value": node_path },
        ]);

        let id = stack.add_resource(
            &[construct_id, subnet_name.as_str(), "Subnet"],
            CfnResource::new(
                "AWS::EC2::Subnet",
                json!({
                    "AvailabilityZone": intrinsic::availability_zone(plan.availability_zone),
                    "CidrBlock": plan.cidr.to_string(),
                    "MapPublicIpOnLaunch": plan.config.subnet_type == SubnetType::Public,
                    "Tags": tags,
                    "VpcId": self.vpc_id(),
                }),
            ),
        )?;
        let route_table = stack.add_resource(
            &[construct_id, subnet_name.as_str(), "RouteTable"],
            CfnResource::new(
                "AWS::EC2::RouteTable",
                json!({
                    "Tags": [{ "Key": "Name", "Value": node_path }],
                    "VpcId": self.vpc_id(),
                }),
            ),
        )?;
        let route_table_association = stack.add_resource(
            &[construct_id, subnet_name.as_str(), "RouteTableAssociation"],
            CfnResource::new(
                "AWS::EC2::SubnetRouteTableAssociation",
                json!({
                    "RouteTableId": intrinsic::reference(&route_table),
                    "SubnetId": intrinsic::reference(&id),
                }),
            ),
        )?;

        let default_route = match internet_gateway {
            Some(gateway) => Some(declare_default_route(
                stack,
                construct_id,
                plan,
                &route_table,
                "GatewayId",
                &gateway.gateway,
                Some(&gateway.attachment),
            )?),
            None => None,
        };

        Ok(Subnet {
            id,
            subnet_type: plan.config.subnet_type,
            availability_zone: plan.availability_zone,
            cidr: plan.cidr,
            route_table,
            route_table_association,
            default_route,
        })
    }

    /// Logical id of the VPC.
    #[must_use]
    pub const fn id(&self) -> &LogicalId {
        &self.id
    }

    /// `Ref` to the VPC.
    #[must_use]
    pub fn vpc_id(&self) -> Value {
        intrinsic::reference(&self.id)
    }

    /// Address block of the VPC.
    #[must_use]
    pub const fn cidr(&self) -> Ipv4Cidr {
        self.cidr
    }

    /// Number of availability zones spanned.
    #[must_use]
    pub const fn max_azs(&self) -> u8 {
        self.max_azs
    }

    /// All declared subnets, public ones first.
    #[must_use]
    pub fn subnets(&self) -> &[Subnet] {
        &self.subnets
    }

    /// Subnets of one role.
    pub fn subnets_of(&self, subnet_type: SubnetType) -> impl Iterator<Item = &Subnet> {
        self.subnets
            .iter()
            .filter(move |s| s.subnet_type == subnet_type)
    }

    /// `Ref`s to the subnets of one role.
    ///
    /// # Errors
    ///
    /// Returns an error if the VPC has no subnet of that role.
    pub fn subnet_ids(&self, subnet_type: SubnetType) -> Result<Vec<Value>> {
        let ids: Vec<Value> = self
            .subnets_of(subnet_type)
            .map(|s| intrinsic::reference(&s.id))
            .collect();
        if ids.is_empty() {
            return Err(StackError::Config {
                message: format!("VPC {} has no {subnet_type} subnets", self.id),
            });
        }
        Ok(ids)
    }

    /// Default routes of the public subnets. Resources that need internet
    /// connectivity at creation time depend on them.
    pub fn internet_routes(&self) -> impl Iterator<Item = &LogicalId> {
        self.subnets_of(SubnetType::Public)
            .filter_map(|s| s.default_route.as_ref())
    }
}

fn subnet_construct_name(plan: &PlannedSubnet<'_>) -> String {
    format!("{}Subnet{}", plan.config.name, plan.availability_zone + 1)
}

fn declare_nat_gateway(
    stack: &mut Stack,
    construct_id: &str,
    plan: &PlannedSubnet<'_>,
    subnet: &Subnet,
) -> Result<LogicalId> {
    let subnet_name = subnet_construct_name(plan);
    let node_path = stack.node_path(&[construct_id, subnet_name.as_str()]);
    let eip = stack.add_resource(
        &[construct_id, subnet_name.as_str(), "EIP"],
        CfnResource::new(
            "AWS::EC2::EIP",
            json!({
                "Domain": "vpc",
                "Tags": [{ "Key": "Name", "Value": node_path }],
            }),
        ),
    )?;
    let mut nat = CfnResource::new(
        "AWS::EC2::NatGateway",
        json!({
            "AllocationId": intrinsic::get_att(&eip, "AllocationId"),
            "SubnetId": intrinsic::reference(&subnet.id),
            "Tags": [{ "Key": "Name", "Value": node_path }],
        }),
    )
    .depends_on(&subnet.route_table_association);
    if let Some(route) = &subnet.default_route {
        nat = nat.depends_on(route);
    }
    stack.add_resource(&[construct_id, subnet_name.as_str(), "NATGateway"], nat)
}

fn declare_default_route(
    stack: &mut Stack,
    construct_id: &str,
    plan: &PlannedSubnet<'_>,
    route_table: &LogicalId,
    target_key: &str,
    target: &LogicalId,
    depends_on: Option<&LogicalId>,
) -> Result<LogicalId> {
    let subnet_name = subnet_construct_name(plan);
    let mut properties = json!({
        "DestinationCidrBlock": ANY_IPV4,
        "RouteTableId": intrinsic::reference(route_table),
    });
    properties[target_key] = intrinsic::reference(target);
    let mut route = CfnResource::new("AWS::EC2::Route", properties);
    if let Some(dependency) = depends_on {
        route = route.depends_on(dependency);
    }
    stack.add_resource(&[construct_id, subnet_name.as_str(), "DefaultRoute"], route)
}

/// Assigns an address block to every (role, zone) pair.
///
/// Roles without `cidr_mask` share the block evenly: the prefix grows by
/// enough bits to number every subnet of the layout. Each block is aligned
/// to its own size, so masked and unmasked roles can be mixed.
fn plan_subnets(
    cidr: Ipv4Cidr,
    azs: usize,
    roles: &[SubnetConfiguration],
) -> Result<Vec<PlannedSubnet<'_>>> {
    let total = roles.len() * azs;
    let extra_bits = u8::try_from(total.next_power_of_two().trailing_zeros()).map_err(|_| {
        StackError::Config {
            message: format!("too many subnets ({total})"),
        }
    })?;
    let even_prefix = cidr.prefix().saturating_add(extra_bits);

    let mut planned = Vec::with_capacity(total);
    let mut cursor: u64 = 0;
    for role in roles {
        let prefix = role.cidr_mask.unwrap_or(even_prefix);
        if prefix < cidr.prefix() || prefix > MAX_SUBNET_PREFIX {
            return Err(StackError::Config {
                message: format!(
                    "subnet role \"{}\" needs a /{prefix}, which does not fit in {cidr} (allowed /{}../{MAX_SUBNET_PREFIX})",
                    role.name,
                    cidr.prefix()
                ),
            });
        }
        let size = 1u64 << (32 - prefix);
        for availability_zone in 0..azs {
            cursor = cursor.div_ceil(size) * size;
            let index = u32::try_from(cursor / size).map_err(|_| StackError::Config {
                message: format!("subnet layout overflows {cidr}"),
            })?;
            let block = cidr.subnet(prefix, index)?;
            planned.push(PlannedSubnet {
                config: role,
                availability_zone,
                cidr: block,
            });
            cursor += size;
        }
    }
    Ok(planned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_vpc() -> (Stack, Vpc) {
        let mut stack = Stack::new("Test", None);
        let vpc = Vpc::new(&mut stack, "VpcTest", &VpcProps::default()).expect("vpc");
        (stack, vpc)
    }

    fn role(name: &str, subnet_type: SubnetType, cidr_mask: Option<u8>) -> SubnetConfiguration {
        SubnetConfiguration {
            name: name.into(),
            subnet_type,
            cidr_mask,
        }
    }

    #[test]
    fn default_layout_has_three_roles_in_two_zones() {
        let (stack, vpc) = default_vpc();
        assert_eq!(vpc.subnets().len(), 6);
        assert_eq!(vpc.subnets_of(SubnetType::Public).count(), 2);
        assert_eq!(vpc.subnets_of(SubnetType::Private).count(), 2);
        assert_eq!(vpc.subnets_of(SubnetType::Isolated).count(), 2);

        let template = stack.template();
        assert_eq!(template.resources_of_type("AWS::EC2::VPC").count(), 1);
        assert_eq!(template.resources_of_type("AWS::EC2::NatGateway").count(), 2);
        assert_eq!(template.resources_of_type("AWS::EC2::InternetGateway").count(), 1);
        assert_eq!(template.resources_of_type("AWS::EC2::Route").count(), 4);
        assert!(stack.synth().is_ok());
    }

    #[test]
    fn default_layout_carves_even_blocks() {
        let (_, vpc) = default_vpc();
        let cidrs: Vec<String> = vpc.subnets().iter().map(|s| s.cidr.to_string()).collect();
        assert_eq!(
            cidrs,
            vec![
                "10.0.0.0/19",
                "10.0.32.0/19",
                "10.0.64.0/19",
                "10.0.96.0/19",
                "10.0.128.0/19",
                "10.0.160.0/19",
            ]
        );
    }

    #[test]
    fn isolated_subnets_have_no_default_route() {
        let (_, vpc) = default_vpc();
        assert!(vpc
            .subnets_of(SubnetType::Isolated)
            .all(|s| s.default_route.is_none()));
        assert!(vpc
            .subnets_of(SubnetType::Private)
            .all(|s| s.default_route.is_some()));
        assert_eq!(vpc.internet_routes().count(), 2);
    }

    #[test]
    fn private_subnets_route_through_nat_in_same_zone() {
        let (stack, vpc) = default_vpc();
        for subnet in vpc.subnets_of(SubnetType::Private) {
            let route = stack
                .resource(subnet.default_route.as_ref().expect("route"))
                .expect("declared");
            let nat = route.properties["NatGatewayId"]["Ref"].as_str().expect("nat ref");
            assert!(
                nat.contains(&format!("ecspublicSubnet{}", subnet.availability_zone + 1)),
                "got: {nat}"
            );
        }
    }

    #[test]
    fn subnet_list_override_replaces_all_roles() {
        let mut stack = Stack::new("Test", None);
        let overrides = VpcProps {
            max_azs: Some(3),
            subnet_configuration: Some(vec![role("only_public_", SubnetType::Public, Some(24))]),
            ..VpcProps::default()
        };
        let vpc = Vpc::new(&mut stack, "VpcTest", &overrides).expect("vpc");
        assert_eq!(vpc.subnets().len(), 3);
        assert!(vpc.subnet_ids(SubnetType::Isolated).is_err());
        assert_eq!(vpc.cidr().to_string(), "10.0.0.0/16");
        let cidrs: Vec<String> = vpc.subnets().iter().map(|s| s.cidr.to_string()).collect();
        assert_eq!(cidrs, vec!["10.0.0.0/24", "10.0.1.0/24", "10.0.2.0/24"]);
    }

    #[test]
    fn nat_gateway_count_can_be_reduced() {
        let mut stack = Stack::new("Test", None);
        let overrides = VpcProps {
            nat_gateways: Some(1),
            ..VpcProps::default()
        };
        let _ = Vpc::new(&mut stack, "VpcTest", &overrides).expect("vpc");
        assert_eq!(stack.template().resources_of_type("AWS::EC2::NatGateway").count(), 1);
        assert!(stack.synth().is_ok());
    }

    #[test]
    fn private_without_public_is_rejected() {
        let mut stack = Stack::new("Test", None);
        let overrides = VpcProps {
            subnet_configuration: Some(vec![role("p_", SubnetType::Private, None)]),
            ..VpcProps::default()
        };
        let err = Vpc::new(&mut stack, "VpcTest", &overrides).unwrap_err();
        assert!(err.to_string().contains("NAT"), "got: {err}");
    }

    #[test]
    fn oversized_layout_is_rejected() {
        let mut stack = Stack::new("Test", None);
        let overrides = VpcProps {
            cidr: Some("10.0.0.0/26".parse().expect("cidr")),
            ..VpcProps::default()
        };
        let err = Vpc::new(&mut stack, "VpcTest", &overrides).unwrap_err();
        assert!(err.to_string().contains("does not fit"), "got: {err}");
    }

    #[test]
    fn zero_zones_is_rejected() {
        let mut stack = Stack::new("Test", None);
        let overrides = VpcProps {
            max_azs: Some(0),
            ..VpcProps::default()
        };
        assert!(Vpc::new(&mut stack, "VpcTest", &overrides).is_err());
    }

    #[test]
    fn mixed_masks_are_aligned() {
        let cidr: Ipv4Cidr = "10.0.0.0/16".parse().expect("cidr");
        let roles = vec![
            role("small_", SubnetType::Public, Some(24)),
            role("big_", SubnetType::Isolated, None),
        ];
        let planned = plan_subnets(cidr, 2, &roles).expect("plan");
        let cidrs: Vec<String> = planned.iter().map(|p| p.cidr.to_string()).collect();
        assert_eq!(
            cidrs,
            vec!["10.0.0.0/24", "10.0.1.0/24", "10.0.64.0/18", "10.0.128.0/18"]
        );
    }
}
