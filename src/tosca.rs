//! Type-capability lookups over the topology's type maps.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::topology::{NodeTemplate, NodeType, RelationshipType, ScalingPolicy};

pub const NETWORK_TYPE: &str = "tosca.nodes.Network";
pub const HOSTED_ON_TYPE: &str = "tosca.relationships.HostedOn";

/// True when `type_name` is one of `candidates` or derives from one of them.
///
/// `derivedFrom` lists are usually flattened ancestries, but nested chains are
/// followed too.
pub fn is_one_of_type(
    candidates: &[&str],
    type_name: &str,
    node_types: &IndexMap<String, NodeType>,
) -> bool {
    derives_from(candidates, type_name, |name| {
        node_types.get(name).map(|node_type| node_type.derived_from.as_slice())
    })
}

pub fn is_network_type(type_name: &str, node_types: &IndexMap<String, NodeType>) -> bool {
    is_one_of_type(&[NETWORK_TYPE], type_name, node_types)
}

pub fn is_hosted_on_type(
    relationship_type: &str,
    relationship_types: &IndexMap<String, RelationshipType>,
) -> bool {
    derives_from(&[HOSTED_ON_TYPE], relationship_type, |name| {
        relationship_types.get(name).map(|rel| rel.derived_from.as_slice())
    })
}

fn derives_from<'a>(
    candidates: &[&str],
    type_name: &'a str,
    parents: impl Fn(&str) -> Option<&'a [String]>,
) -> bool {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut pending = vec![type_name];
    while let Some(name) = pending.pop() {
        if candidates.contains(&name) {
            return true;
        }
        if !seen.insert(name) {
            continue;
        }
        if let Some(derived) = parents(name) {
            pending.extend(derived.iter().map(String::as_str));
        }
    }
    false
}

/// The template's scaling policy, unless it is the trivial single-instance one.
pub fn get_scaling_policy(template: &NodeTemplate) -> Option<&ScalingPolicy> {
    template.scaling_policy.as_ref().filter(|policy| {
        policy.min_instances != 1 || policy.max_instances != 1 || policy.initial_instances != 1
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_types() -> IndexMap<String, NodeType> {
        let mut types = IndexMap::new();
        types.insert(
            "custom.PrivateNetwork".to_string(),
            NodeType {
                derived_from: vec![NETWORK_TYPE.to_string(), "tosca.nodes.Root".to_string()],
                ..NodeType::default()
            },
        );
        types.insert("tosca.nodes.Compute".to_string(), NodeType::default());
        types
    }

    #[test]
    fn network_detection_follows_derived_from() {
        let types = node_types();
        assert!(is_network_type(NETWORK_TYPE, &types));
        assert!(is_network_type("custom.PrivateNetwork", &types));
        assert!(!is_network_type("tosca.nodes.Compute", &types));
        assert!(!is_network_type("unknown.Type", &types));
    }

    #[test]
    fn nested_ancestry_is_followed_and_cycles_terminate() {
        let mut types = node_types();
        types.insert(
            "custom.VpcSubnet".to_string(),
            NodeType {
                derived_from: vec!["custom.PrivateNetwork".to_string()],
                ..NodeType::default()
            },
        );
        types.insert(
            "loop.A".to_string(),
            NodeType {
                derived_from: vec!["loop.B".to_string()],
                ..NodeType::default()
            },
        );
        types.insert(
            "loop.B".to_string(),
            NodeType {
                derived_from: vec!["loop.A".to_string()],
                ..NodeType::default()
            },
        );
        assert!(is_network_type("custom.VpcSubnet", &types));
        assert!(!is_network_type("loop.A", &types));
        assert!(is_one_of_type(&["loop.B"], "loop.A", &types));
    }

    #[test]
    fn hosted_on_detection_follows_derived_from() {
        let mut rels = IndexMap::new();
        rels.insert(
            "custom.InstalledOn".to_string(),
            RelationshipType {
                derived_from: vec![HOSTED_ON_TYPE.to_string()],
            },
        );
        rels.insert("tosca.relationships.DependsOn".to_string(), RelationshipType::default());
        assert!(is_hosted_on_type(HOSTED_ON_TYPE, &rels));
        assert!(is_hosted_on_type("custom.InstalledOn", &rels));
        assert!(!is_hosted_on_type("tosca.relationships.DependsOn", &rels));
    }

    #[test]
    fn trivial_scaling_policy_is_ignored() {
        let mut template = NodeTemplate::new("tosca.nodes.Compute");
        assert!(get_scaling_policy(&template).is_none());
        template.scaling_policy = Some(ScalingPolicy {
            min_instances: 1,
            max_instances: 1,
            initial_instances: 1,
        });
        assert!(get_scaling_policy(&template).is_none());
        template.scaling_policy = Some(ScalingPolicy {
            min_instances: 1,
            max_instances: 4,
            initial_instances: 1,
        });
        assert_eq!(get_scaling_policy(&template).map(|p| p.max_instances), Some(4));
    }
}
