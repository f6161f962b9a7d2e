//! CloudFormation intrinsic functions.
//!
//! Builders never write `{"Ref": ...}` by hand; they go through these
//! helpers so that [`references`] can find every edge of the resource
//! graph again when the template is validated.

use std::collections::BTreeSet;

use serde_json::{Value, json};
use statping_common::types::LogicalId;

/// Prefix shared by pseudo parameters such as `AWS::Region`.
const PSEUDO_PREFIX: &str = "AWS::";

/// `{"Ref": id}`.
pub fn reference(id: &LogicalId) -> Value {
    json!({ "Ref": id.as_str() })
}

/// `{"Fn::GetAtt": [id, attribute]}`.
pub fn get_att(id: &LogicalId, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [id.as_str(), attribute] })
}

/// `{"Ref": "AWS::<name>"}` for a pseudo parameter.
pub fn pseudo(name: &str) -> Value {
    json!({ "Ref": format!("{PSEUDO_PREFIX}{name}") })
}

/// `{"Fn::Join": [delimiter, parts]}`.
pub fn join(delimiter: &str, parts: Vec<Value>) -> Value {
    json!({ "Fn::Join": [delimiter, parts] })
}

/// The `index`-th availability zone of the deployment region.
pub fn availability_zone(index: usize) -> Value {
    json!({ "Fn::Select": [index, { "Fn::GetAZs": "" }] })
}

/// A dynamic reference that resolves one JSON key of a Secrets Manager secret
/// at deploy time, so the value never lands in the template.
pub fn secret_value(secret: &LogicalId, key: &str) -> Value {
    join(
        "",
        vec![
            json!("{{resolve:secretsmanager:"),
            reference(secret),
            json!(format!(":SecretString:{key}::}}}}")),
        ],
    )
}

/// Collects every logical id referenced through `Ref` or `Fn::GetAtt`.
///
/// Pseudo parameters are skipped.
pub fn references(value: &Value) -> BTreeSet<LogicalId> {
    let mut found = BTreeSet::new();
    collect_references(value, &mut found);
    found
}

fn collect_references(value: &Value, found: &mut BTreeSet<LogicalId>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(target)) = map.get("Ref") {
                if !target.starts_with(PSEUDO_PREFIX) {
                    let _ = found.insert(LogicalId::new(target.as_str()));
                }
            }
            match map.get("Fn::GetAtt") {
                Some(Value::Array(parts)) => {
                    if let Some(Value::String(target)) = parts.first() {
                        let _ = found.insert(LogicalId::new(target.as_str()));
                    }
                }
                Some(Value::String(dotted)) => {
                    if let Some((target, _)) = dotted.split_once('.') {
                        let _ = found.insert(LogicalId::new(target));
                    }
                }
                _ => {}
            }
            for nested in map.values() {
                collect_references(nested, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, found);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_and_get_att_shapes() {
        let id = LogicalId::new("Db");
        assert_eq!(reference(&id), json!({ "Ref": "Db" }));
        assert_eq!(
            get_att(&id, "Endpoint.Address"),
            json!({ "Fn::GetAtt": ["Db", "Endpoint.Address"] })
        );
    }

    #[test]
    fn secret_value_renders_dynamic_reference() {
        let value = secret_value(&LogicalId::new("Secret"), "password");
        assert_eq!(
            value,
            json!({ "Fn::Join": ["", [
                "{{resolve:secretsmanager:",
                { "Ref": "Secret" },
                ":SecretString:password::}}"
            ]] })
        );
    }

    #[test]
    fn references_walks_nested_values() {
        let value = json!({
            "VpcId": { "Ref": "Vpc" },
            "Region": { "Ref": "AWS::Region" },
            "Groups": [ { "Fn::GetAtt": ["Sg", "GroupId"] } ],
            "Legacy": { "Fn::GetAtt": "Lb.DNSName" },
            "Nested": { "Fn::Join": ["", [ { "Ref": "Secret" } ]] },
            "Literal": "Ref"
        });
        let found: Vec<String> = references(&value)
            .into_iter()
            .map(|id| id.as_str().to_string())
            .collect();
        assert_eq!(found, vec!["Lb", "Secret", "Sg", "Vpc"]);
    }

    #[test]
    fn availability_zone_selects_by_index() {
        assert_eq!(
            availability_zone(1),
            json!({ "Fn::Select": [1, { "Fn::GetAZs": "" }] })
        );
    }
}
