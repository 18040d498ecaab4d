use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A topology snapshot: node templates plus the type maps needed to
/// classify them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topology {
    #[serde(default)]
    pub node_templates: IndexMap<String, NodeTemplate>,
    #[serde(default)]
    pub node_types: IndexMap<String, NodeType>,
    #[serde(default)]
    pub relationship_types: IndexMap<String, RelationshipType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTemplate {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub relationships: IndexMap<String, RelationshipTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaling_policy: Option<ScalingPolicy>,
    /// Deployment state reported at runtime (e.g. `started`, `error`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_state: Option<String>,
}

impl NodeTemplate {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            selected: false,
            relationships: IndexMap::new(),
            scaling_policy: None,
            runtime_state: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipTemplate {
    #[serde(rename = "type")]
    pub type_name: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirement_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalingPolicy {
    pub min_instances: u32,
    pub max_instances: u32,
    pub initial_instances: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeType {
    #[serde(default)]
    pub derived_from: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipType {
    #[serde(default)]
    pub derived_from: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("failed to read topology: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid topology JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Topology {
    pub fn from_json(input: &str) -> Result<Self, TopologyError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Resolves a node template together with its type.
    pub fn resolve(&self, node_id: &str) -> Option<(&NodeTemplate, &NodeType)> {
        let template = self.node_templates.get(node_id)?;
        let node_type = self.node_types.get(&template.type_name)?;
        Some((template, node_type))
    }

    pub fn add_node(&mut self, id: impl Into<String>, template: NodeTemplate) {
        self.node_templates.insert(id.into(), template);
    }

    pub fn add_relationship(
        &mut self,
        source: &str,
        name: impl Into<String>,
        type_name: impl Into<String>,
        target: impl Into<String>,
    ) {
        if let Some(template) = self.node_templates.get_mut(source) {
            template.relationships.insert(
                name.into(),
                RelationshipTemplate {
                    type_name: type_name.into(),
                    target: target.into(),
                    requirement_name: None,
                },
            );
        }
    }
}

pub fn load_topology(path: &Path) -> Result<Topology, TopologyError> {
    let contents = std::fs::read_to_string(path)?;
    Topology::from_json(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_topology() {
        let json = r#"{
            "nodeTemplates": {
                "Server": { "type": "tosca.nodes.Compute", "selected": true },
                "App": {
                    "type": "my.App",
                    "relationships": {
                        "hostedOnServer": { "type": "tosca.relationships.HostedOn", "target": "Server" }
                    },
                    "scalingPolicy": { "minInstances": 1, "maxInstances": 3, "initialInstances": 2 }
                }
            },
            "nodeTypes": {
                "tosca.nodes.Compute": {},
                "my.App": { "derivedFrom": ["tosca.nodes.Root"], "abstract": true }
            },
            "relationshipTypes": { "tosca.relationships.HostedOn": {} }
        }"#;
        let topology = Topology::from_json(json).unwrap();
        assert_eq!(topology.node_templates.len(), 2);
        let app = &topology.node_templates["App"];
        assert_eq!(app.relationships["hostedOnServer"].target, "Server");
        assert_eq!(app.scaling_policy.unwrap().max_instances, 3);
        assert!(topology.node_types["my.App"].is_abstract);
        assert!(topology.node_templates["Server"].selected);
        let keys: Vec<&str> = topology.node_templates.keys().map(String::as_str).collect();
        assert_eq!(keys, ["Server", "App"]);
    }

    #[test]
    fn resolve_returns_template_and_type() {
        let mut topology = Topology::default();
        topology.node_types.insert("t".to_string(), NodeType::default());
        topology.add_node("a", NodeTemplate::new("t"));
        assert!(topology.resolve("a").is_some());
        assert!(topology.resolve("missing").is_none());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            Topology::from_json("{ nodeTemplates"),
            Err(TopologyError::Json(_))
        ));
    }
}
