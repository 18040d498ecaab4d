mod error;
mod hosting;
mod links;
pub mod routing;
pub(crate) mod types;
pub use error::LayoutError;
pub use routing::{Cell, Grid};
pub use types::*;
use hosting::*;
use links::*;

use crate::topology::{NodeTemplate, NodeType, RelationshipType};
use crate::tosca::is_network_type;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// Computes node coordinates and the abstract link list for a topology.
///
/// Network nodes are stacked at the top-left and act as rails that run to
/// the right of the network column; every other node belongs to a hosted-on
/// branch. Root branches run left to right below the network block and to
/// the right of the network column, so a network link always meets its rail
/// rather than the network node. Inside a branch hosts sit centered above
/// the row of nodes they host.
pub fn compute_layout(
    node_templates: &IndexMap<String, NodeTemplate>,
    node_types: &IndexMap<String, NodeType>,
    relationship_types: &IndexMap<String, RelationshipType>,
    node_size: Size,
    spacing: &Spacing,
) -> Result<Layout, LayoutError> {
    validate(node_templates, node_types, relationship_types)?;

    if node_templates.is_empty() {
        return Ok(Layout::empty());
    }

    let network_ids: IndexMap<&str, usize> = node_templates
        .iter()
        .filter(|(_, template)| is_network_type(&template.type_name, node_types))
        .enumerate()
        .map(|(idx, (id, _))| (id.as_str(), idx))
        .collect();
    let networks: HashSet<&str> = network_ids.keys().copied().collect();

    let mut centers: HashMap<&str, Point> = HashMap::new();
    for (&id, &network_id) in &network_ids {
        let top = network_id as f32 * (node_size.height + spacing.network);
        centers.insert(
            id,
            Point::new(node_size.width / 2.0, top + node_size.height / 2.0),
        );
    }

    let (branch_left, branch_top) = if network_ids.is_empty() {
        (0.0, 0.0)
    } else {
        let count = network_ids.len() as f32;
        (
            node_size.width + spacing.branch.x,
            count * node_size.height + (count - 1.0) * spacing.network + spacing.branch.y,
        )
    };
    let forest = build_hosting_forest(node_templates, &networks, relationship_types);
    centers.extend(
        BranchPlacer::new(&forest, node_size, spacing).place_roots(branch_left, branch_top),
    );

    let nodes: Vec<LayoutNode> = node_templates
        .keys()
        .filter_map(|id| {
            let coordinate = *centers.get(id.as_str())?;
            Some(LayoutNode {
                id: id.clone(),
                coordinate,
                bbox: BoundingBox::centered(coordinate, node_size),
                network_id: network_ids.get(id.as_str()).copied(),
            })
        })
        .collect();

    let by_id: HashMap<&str, &LayoutNode> =
        nodes.iter().map(|node| (node.id.as_str(), node)).collect();
    let links = build_links(node_templates, relationship_types, &by_id, &networks);

    let margin = spacing.branch.x.max(spacing.node.y) / 2.0;
    let bbox = nodes
        .iter()
        .map(|node| node.bbox)
        .reduce(|acc, bbox| acc.union(&bbox))
        .unwrap_or_default()
        .inflate(margin);

    tracing::debug!(
        nodes = nodes.len(),
        links = links.len(),
        networks = network_ids.len(),
        roots = forest.roots.len(),
        "computed topology layout"
    );

    Ok(Layout { nodes, links, bbox })
}

fn validate(
    node_templates: &IndexMap<String, NodeTemplate>,
    node_types: &IndexMap<String, NodeType>,
    relationship_types: &IndexMap<String, RelationshipType>,
) -> Result<(), LayoutError> {
    for (id, template) in node_templates {
        if !node_types.contains_key(&template.type_name) {
            return Err(LayoutError::UnknownNodeType {
                node: id.clone(),
                type_name: template.type_name.clone(),
            });
        }
        for (name, rel) in &template.relationships {
            if !node_templates.contains_key(&rel.target) {
                return Err(LayoutError::UnknownTarget {
                    node: id.clone(),
                    relationship: name.clone(),
                    target: rel.target.clone(),
                });
            }
            if !relationship_types.contains_key(&rel.type_name) {
                return Err(LayoutError::UnknownRelationshipType {
                    node: id.clone(),
                    relationship: name.clone(),
                    type_name: rel.type_name.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{RelationshipTemplate, Topology};
    use crate::tosca::{HOSTED_ON_TYPE, NETWORK_TYPE};

    const DEPENDS_ON: &str = "tosca.relationships.DependsOn";
    const CONNECTS_TO: &str = "tosca.relationships.Network";

    fn spacing() -> Spacing {
        Spacing {
            root_branch: SpacingX { x: 60.0 },
            branch: SpacingXY { x: 40.0, y: 50.0 },
            node: SpacingY { y: 40.0 },
            network: 14.0,
        }
    }

    fn size() -> Size {
        Size {
            width: 100.0,
            height: 60.0,
        }
    }

    fn base_topology() -> Topology {
        let mut topology = Topology::default();
        for name in ["tosca.nodes.Compute", "my.App", NETWORK_TYPE] {
            topology.node_types.insert(name.to_string(), NodeType::default());
        }
        for name in [HOSTED_ON_TYPE, DEPENDS_ON, CONNECTS_TO] {
            topology
                .relationship_types
                .insert(name.to_string(), RelationshipType::default());
        }
        topology
    }

    fn run(topology: &Topology) -> Layout {
        compute_layout(
            &topology.node_templates,
            &topology.node_types,
            &topology.relationship_types,
            size(),
            &spacing(),
        )
        .unwrap()
    }

    #[test]
    fn empty_topology_yields_empty_layout() {
        let layout = run(&base_topology());
        assert!(layout.nodes.is_empty());
        assert!(layout.links.is_empty());
        assert_eq!(layout.bbox, BoundingBox::default());
    }

    #[test]
    fn hosted_nodes_sit_below_their_host() {
        let mut topology = base_topology();
        topology.add_node("Server", NodeTemplate::new("tosca.nodes.Compute"));
        topology.add_node("Web", NodeTemplate::new("my.App"));
        topology.add_node("Db", NodeTemplate::new("my.App"));
        topology.add_relationship("Web", "hostedOn", HOSTED_ON_TYPE, "Server");
        topology.add_relationship("Db", "hostedOn", HOSTED_ON_TYPE, "Server");

        let layout = run(&topology);
        let server = layout.node("Server").unwrap();
        let web = layout.node("Web").unwrap();
        let db = layout.node("Db").unwrap();
        assert!(web.coordinate.y > server.coordinate.y);
        assert_eq!(web.coordinate.y, db.coordinate.y);
        assert!((db.coordinate.x - web.coordinate.x - (100.0 + 40.0)).abs() < 1e-3);
        // Host is centered over its hosted row.
        assert!((server.coordinate.x - (web.coordinate.x + db.coordinate.x) / 2.0).abs() < 1e-3);

        let link = layout.link("Web.hostedOn").unwrap();
        assert_eq!(link.source.direction, Direction::Up);
        assert_eq!(link.target.direction, Direction::Down);
        assert_eq!(link.source.point.y, web.bbox.min_y);
        assert_eq!(link.target.point.y, server.bbox.max_y);
    }

    #[test]
    fn root_branches_are_separated_and_never_overlap() {
        let mut topology = base_topology();
        for idx in 0..4 {
            topology.add_node(format!("Host{idx}"), NodeTemplate::new("tosca.nodes.Compute"));
        }
        for idx in 0..6 {
            let id = format!("App{idx}");
            topology.add_node(id.clone(), NodeTemplate::new("my.App"));
            topology.add_relationship(&id, "hostedOn", HOSTED_ON_TYPE, format!("Host{}", idx % 3));
        }
        topology.add_relationship("App0", "dependsOn", DEPENDS_ON, "App5");

        let layout = run(&topology);
        assert_eq!(layout.nodes.len(), 10);
        for (i, a) in layout.nodes.iter().enumerate() {
            for b in layout.nodes.iter().skip(i + 1) {
                assert!(!a.bbox.intersects(&b.bbox), "{} overlaps {}", a.id, b.id);
            }
            assert!(layout.bbox.contains(a.coordinate));
        }
        let host0 = layout.node("Host0").unwrap();
        let host3 = layout.node("Host3").unwrap();
        assert!(host3.bbox.min_x >= host0.bbox.max_x + 60.0 - 1e-3);
    }

    #[test]
    fn networks_become_rails_with_synthetic_links() {
        let mut topology = base_topology();
        topology.add_node("A", NodeTemplate::new("tosca.nodes.Compute"));
        topology.add_node("B", NodeTemplate::new(NETWORK_TYPE));
        topology.add_node("C", NodeTemplate::new(NETWORK_TYPE));
        topology.add_relationship("A", "hostedOn", HOSTED_ON_TYPE, "B");
        topology.add_relationship("A", "network", CONNECTS_TO, "C");

        let layout = run(&topology);
        let a = layout.node("A").unwrap();
        let b = layout.node("B").unwrap();
        let c = layout.node("C").unwrap();
        assert_eq!(b.network_id, Some(0));
        assert_eq!(c.network_id, Some(1));
        assert_eq!(a.network_id, None);
        assert!(a.coordinate.y > c.coordinate.y);

        assert_eq!(layout.links.len(), 2);
        assert!(layout.links.iter().all(|link| link.is_network));
        let to_c = layout.link("A.network").unwrap();
        assert_eq!(to_c.network_id, Some(1));
        assert_eq!(to_c.target.point, Point::new(a.coordinate.x, c.rail_y()));
    }

    #[test]
    fn network_links_land_on_the_rail() {
        let mut topology = base_topology();
        topology.add_node("Upper", NodeTemplate::new(NETWORK_TYPE));
        topology.add_node("Lower", NodeTemplate::new(NETWORK_TYPE));
        topology.add_node("Server", NodeTemplate::new("tosca.nodes.Compute"));
        topology.add_node("Web", NodeTemplate::new("my.App"));
        topology.add_relationship("Web", "hostedOn", HOSTED_ON_TYPE, "Server");
        topology.add_relationship("Server", "upper", CONNECTS_TO, "Upper");
        topology.add_relationship("Web", "lower", CONNECTS_TO, "Lower");

        let layout = run(&topology);
        let upper = layout.node("Upper").unwrap();
        let lower = layout.node("Lower").unwrap();
        for (link_id, network) in [("Server.upper", upper), ("Web.lower", lower)] {
            let link = layout.link(link_id).unwrap();
            assert!(link.is_network);
            assert!(link.target.point.x >= network.bbox.max_x, "{link_id} ends on the node body");
            assert_eq!(link.target.point.y, network.rail_y());
            assert_eq!(link.source.point.x, link.target.point.x);
        }

        // The vertical run up to the upper rail stays clear of the lower
        // network node.
        let link = layout.link("Server.upper").unwrap();
        assert!(link.source.point.x > lower.bbox.max_x);
        for node in layout.nodes.iter().filter(|node| node.network_id.is_none()) {
            assert!(node.bbox.min_x >= upper.bbox.max_x + spacing().branch.x - 1e-3);
        }
    }

    #[test]
    fn duplicate_network_attachments_are_collapsed() {
        let mut topology = base_topology();
        topology.add_node("A", NodeTemplate::new("tosca.nodes.Compute"));
        topology.add_node("Net", NodeTemplate::new(NETWORK_TYPE));
        topology.add_relationship("A", "first", CONNECTS_TO, "Net");
        topology.add_relationship("A", "second", CONNECTS_TO, "Net");
        let layout = run(&topology);
        assert_eq!(layout.links.len(), 1);
    }

    #[test]
    fn dependency_sides_follow_relative_position() {
        let mut topology = base_topology();
        topology.add_node("Left", NodeTemplate::new("my.App"));
        topology.add_node("Right", NodeTemplate::new("my.App"));
        topology.add_relationship("Right", "dependsOn", DEPENDS_ON, "Left");
        let layout = run(&topology);
        let link = layout.link("Right.dependsOn").unwrap();
        assert_eq!(link.source.direction, Direction::Left);
        assert_eq!(link.target.direction, Direction::Right);
        assert!(!link.is_network);
    }

    #[test]
    fn hosting_cycles_do_not_loop_forever() {
        let mut topology = base_topology();
        topology.add_node("A", NodeTemplate::new("my.App"));
        topology.add_node("B", NodeTemplate::new("my.App"));
        topology.add_relationship("A", "hostedOn", HOSTED_ON_TYPE, "B");
        topology.add_relationship("B", "hostedOn", HOSTED_ON_TYPE, "A");
        let layout = run(&topology);
        assert_eq!(layout.nodes.len(), 2);
        assert_eq!(layout.links.len(), 2);
    }

    #[test]
    fn unknown_references_are_reported() {
        let mut topology = base_topology();
        topology.add_node("A", NodeTemplate::new("missing.Type"));
        let err = compute_layout(
            &topology.node_templates,
            &topology.node_types,
            &topology.relationship_types,
            size(),
            &spacing(),
        )
        .unwrap_err();
        assert!(matches!(err, LayoutError::UnknownNodeType { .. }));

        let mut topology = base_topology();
        topology.add_node("A", NodeTemplate::new("my.App"));
        topology.node_templates["A"].relationships.insert(
            "dependsOn".to_string(),
            RelationshipTemplate {
                type_name: DEPENDS_ON.to_string(),
                target: "Ghost".to_string(),
                requirement_name: None,
            },
        );
        let err = compute_layout(
            &topology.node_templates,
            &topology.node_types,
            &topology.relationship_types,
            size(),
            &spacing(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            LayoutError::UnknownTarget {
                node: "A".to_string(),
                relationship: "dependsOn".to_string(),
                target: "Ghost".to_string(),
            }
        );
    }
}
