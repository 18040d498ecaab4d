use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::topology::{NodeTemplate, RelationshipType};
use crate::tosca::is_hosted_on_type;

use super::types::{Connector, Direction, LayoutLink, LayoutNode, Point};

pub(super) fn side_point(node: &LayoutNode, side: Direction) -> Point {
    let center = node.coordinate;
    match side {
        Direction::Up => Point::new(center.x, node.bbox.min_y),
        Direction::Down => Point::new(center.x, node.bbox.max_y),
        Direction::Left => Point::new(node.bbox.min_x, center.y),
        Direction::Right => Point::new(node.bbox.max_x, center.y),
    }
}

/// Picks source/target sides from the relative position of the two nodes.
pub(super) fn dependency_sides(from: &LayoutNode, to: &LayoutNode) -> (Direction, Direction) {
    let dx = to.coordinate.x - from.coordinate.x;
    let dy = to.coordinate.y - from.coordinate.y;
    if dx.abs() >= dy.abs() {
        if dx >= 0.0 {
            (Direction::Right, Direction::Left)
        } else {
            (Direction::Left, Direction::Right)
        }
    } else if dy > 0.0 {
        (Direction::Down, Direction::Up)
    } else {
        (Direction::Up, Direction::Down)
    }
}

fn connector(node: &LayoutNode, side: Direction) -> Connector {
    Connector {
        node: node.id.clone(),
        point: side_point(node, side),
        direction: side,
    }
}

pub(super) fn build_links(
    templates: &IndexMap<String, NodeTemplate>,
    relationship_types: &IndexMap<String, RelationshipType>,
    nodes: &HashMap<&str, &LayoutNode>,
    networks: &HashSet<&str>,
) -> Vec<LayoutLink> {
    let mut links = Vec::new();
    let mut attachments: HashSet<(&str, &str)> = HashSet::new();

    for (source_id, template) in templates {
        let Some(&source) = nodes.get(source_id.as_str()) else {
            continue;
        };
        let source_is_network = networks.contains(source_id.as_str());
        for (name, rel) in &template.relationships {
            let Some(&target) = nodes.get(rel.target.as_str()) else {
                continue;
            };
            let id = format!("{source_id}.{name}");

            if !source_is_network && networks.contains(rel.target.as_str()) {
                if !attachments.insert((source_id.as_str(), rel.target.as_str())) {
                    continue;
                }
                let start = side_point(source, Direction::Up);
                links.push(LayoutLink {
                    id,
                    relationship_type: rel.type_name.clone(),
                    source: Connector {
                        node: source.id.clone(),
                        point: start,
                        direction: Direction::Up,
                    },
                    target: Connector {
                        node: target.id.clone(),
                        point: Point::new(start.x, target.rail_y()),
                        direction: Direction::Down,
                    },
                    is_network: true,
                    network_id: target.network_id,
                    route: Vec::new(),
                    selected: template.selected,
                });
                continue;
            }

            let (source_side, target_side) =
                if is_hosted_on_type(&rel.type_name, relationship_types) && !source_is_network {
                    (Direction::Up, Direction::Down)
                } else {
                    dependency_sides(source, target)
                };
            links.push(LayoutLink {
                id,
                relationship_type: rel.type_name.clone(),
                source: connector(source, source_side),
                target: connector(target, target_side),
                is_network: false,
                network_id: None,
                route: Vec::new(),
                selected: template.selected,
            });
        }
    }
    links
}
