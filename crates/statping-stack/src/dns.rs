//! Hosted zone lookup, DNS-validated certificates and alias records.

use serde_json::{Value, json};
use statping_common::error::{Result, StackError};
use statping_common::types::LogicalId;

use crate::stack::Stack;
use crate::template::{CfnResource, intrinsic};

/// An existing Route 53 zone, known by id and name. Declares nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedZone {
    zone_id: String,
    zone_name: String,
}

impl HostedZone {
    /// Refers to an existing zone.
    ///
    /// A trailing dot on the name is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::MissingField`] if either value is blank.
    pub fn from_attributes(zone_id: &str, zone_name: &str) -> Result<Self> {
        let zone_id = zone_id.trim();
        let zone_name = zone_name.trim().trim_end_matches('.');
        if zone_id.is_empty() {
            return Err(StackError::MissingField {
                field: "hosted_zone_id",
            });
        }
        if zone_name.is_empty() {
            return Err(StackError::MissingField {
                field: "hosted_zone_name",
            });
        }
        Ok(Self {
            zone_id: zone_id.to_string(),
            zone_name: zone_name.to_string(),
        })
    }

    /// Zone id.
    #[must_use]
    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    /// Zone name without a trailing dot.
    #[must_use]
    pub fn zone_name(&self) -> &str {
        &self.zone_name
    }

    /// Whether `domain` is the apex of this zone or a name below it.
    #[must_use]
    pub fn contains(&self, domain: &str) -> bool {
        let domain = domain.trim_end_matches('.');
        domain == self.zone_name || domain.ends_with(&format!(".{}", self.zone_name))
    }

    fn ensure_contains(&self, domain: &str) -> Result<()> {
        if self.contains(domain) {
            Ok(())
        } else {
            Err(StackError::Config {
                message: format!("{domain} is outside hosted zone {}", self.zone_name),
            })
        }
    }
}

/// Handle to a certificate validated through DNS records in a hosted zone.
#[derive(Debug, Clone)]
pub struct DnsValidatedCertificate {
    id: LogicalId,
    domain_name: String,
}

impl DnsValidatedCertificate {
    /// Requests a certificate for `domain_name`, validated in `zone`.
    ///
    /// # Errors
    ///
    /// Returns an error if the domain is outside the zone or the construct
    /// path is already taken.
    pub fn new(stack: &mut Stack, path: &[&str], zone: &HostedZone, domain_name: &str) -> Result<Self> {
        zone.ensure_contains(domain_name)?;
        let id = stack.add_resource(
            path,
            CfnResource::new(
                "AWS::CertificateManager::Certificate",
                json!({
                    "DomainName": domain_name,
                    "DomainValidationOptions": [{
                        "DomainName": domain_name,
                        "HostedZoneId": zone.zone_id(),
                    }],
                    "ValidationMethod": "DNS",
                }),
            ),
        )?;
        tracing::debug!(certificate = %id, domain = domain_name, "declared certificate");
        Ok(Self {
            id,
            domain_name: domain_name.to_string(),
        })
    }

    /// Logical id of the certificate.
    #[must_use]
    pub const fn id(&self) -> &LogicalId {
        &self.id
    }

    /// `Ref` to the certificate, which resolves to its ARN.
    #[must_use]
    pub fn certificate_arn(&self) -> Value {
        intrinsic::reference(&self.id)
    }

    /// Domain the certificate covers.
    #[must_use]
    pub fn domain_name(&self) -> &str {
        &self.domain_name
    }
}

/// Declares an `A` alias record pointing `domain_name` at a load balancer.
///
/// # Errors
///
/// Returns an error if the domain is outside the zone or the construct path
/// is already taken.
pub fn alias_record(
    stack: &mut Stack,
    path: &[&str],
    zone: &HostedZone,
    domain_name: &str,
    load_balancer: &LogicalId,
) -> Result<LogicalId> {
    zone.ensure_contains(domain_name)?;
    stack.add_resource(
        path,
        CfnResource::new(
            "AWS::Route53::RecordSet",
            json!({
                "AliasTarget": {
                    "DNSName": intrinsic::join(
                        "",
                        vec![json!("dualstack."), intrinsic::get_att(load_balancer, "DNSName")],
                    ),
                    "HostedZoneId": intrinsic::get_att(load_balancer, "CanonicalHostedZoneID"),
                },
                "HostedZoneId": zone.zone_id(),
                "Name": format!("{}.", domain_name.trim_end_matches('.')),
                "Type": "A",
            }),
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone() -> HostedZone {
        HostedZone::from_attributes("Z1VKI2XXXXXXX", "example.com.").expect("zone")
    }

    #[test]
    fn trailing_dot_is_dropped() {
        let zone = zone();
        assert_eq!(zone.zone_name(), "example.com");
        assert_eq!(zone.zone_id(), "Z1VKI2XXXXXXX");
    }

    #[test]
    fn blank_attributes_are_rejected() {
        assert!(HostedZone::from_attributes("", "example.com").is_err());
        assert!(HostedZone::from_attributes("Z1", " . ").is_err());
    }

    #[test]
    fn containment() {
        let zone = zone();
        assert!(zone.contains("example.com"));
        assert!(zone.contains("statping.example.com."));
        assert!(!zone.contains("badexample.com"));
        assert!(!zone.contains("example.org"));
    }

    #[test]
    fn certificate_is_dns_validated_in_zone() {
        let mut stack = Stack::new("Test", None);
        let cert = DnsValidatedCertificate::new(&mut stack, &["Cert"], &zone(), "statping.example.com")
            .expect("cert");
        let resource = stack.resource(cert.id()).expect("declared");
        assert_eq!(resource.properties["ValidationMethod"], "DNS");
        assert_eq!(resource.properties["DomainName"], "statping.example.com");
        assert_eq!(
            resource.properties["DomainValidationOptions"][0]["HostedZoneId"],
            "Z1VKI2XXXXXXX"
        );
        assert_eq!(cert.domain_name(), "statping.example.com");
        assert_eq!(cert.certificate_arn(), json!({ "Ref": cert.id().as_str() }));
    }

    #[test]
    fn certificate_outside_zone_is_rejected() {
        let mut stack = Stack::new("Test", None);
        let err = DnsValidatedCertificate::new(&mut stack, &["Cert"], &zone(), "statping.example.org")
            .unwrap_err();
        assert!(err.to_string().contains("outside hosted zone"), "got: {err}");
        assert!(stack.template().resources.is_empty());
    }

    #[test]
    fn alias_record_targets_load_balancer() {
        let mut stack = Stack::new("Test", None);
        let lb = stack
            .add_resource(
                &["Lb"],
                CfnResource::new("AWS::ElasticLoadBalancingV2::LoadBalancer", json!({})),
            )
            .expect("lb");
        let record = alias_record(&mut stack, &["Dns"], &zone(), "statping.example.com", &lb)
            .expect("record");
        let resource = stack.resource(&record).expect("declared");
        assert_eq!(resource.properties["Name"], "statping.example.com.");
        assert_eq!(resource.properties["Type"], "A");
        assert_eq!(
            resource.properties["AliasTarget"]["HostedZoneId"],
            json!({ "Fn::GetAtt": [lb.as_str(), "CanonicalHostedZoneID"] })
        );
        assert!(stack.synth().is_ok());
    }
}
