use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::topology::{NodeTemplate, RelationshipType};
use crate::tosca::is_hosted_on_type;

use super::types::{Point, Size, Spacing};

/// Hosted-on forest over the non-network nodes.
#[derive(Debug, Default)]
pub(super) struct HostingForest<'a> {
    pub(super) roots: Vec<&'a str>,
    pub(super) children: HashMap<&'a str, Vec<&'a str>>,
    pub(super) host_of: HashMap<&'a str, &'a str>,
}

pub(super) fn build_hosting_forest<'a>(
    templates: &'a IndexMap<String, NodeTemplate>,
    networks: &HashSet<&str>,
    relationship_types: &IndexMap<String, RelationshipType>,
) -> HostingForest<'a> {
    let mut host_of: HashMap<&'a str, &'a str> = HashMap::new();
    for (id, template) in templates {
        if networks.contains(id.as_str()) {
            continue;
        }
        let host = template.relationships.values().find(|rel| {
            rel.target != *id
                && !networks.contains(rel.target.as_str())
                && is_hosted_on_type(&rel.type_name, relationship_types)
        });
        if let Some(rel) = host {
            host_of.insert(id.as_str(), rel.target.as_str());
        }
    }

    // A node whose host chain comes back to itself is promoted to a root.
    for id in templates.keys() {
        let id = id.as_str();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut current = id;
        while let Some(&host) = host_of.get(current) {
            if host == id {
                tracing::debug!(node = id, "breaking hosted-on cycle");
                host_of.remove(id);
                break;
            }
            if !seen.insert(host) {
                break;
            }
            current = host;
        }
    }

    let mut forest = HostingForest::default();
    for id in templates.keys() {
        let id = id.as_str();
        if networks.contains(id) {
            continue;
        }
        match host_of.get(id) {
            Some(&host) => forest.children.entry(host).or_default().push(id),
            None => forest.roots.push(id),
        }
    }
    forest.host_of = host_of;
    forest
}

/// Places hosting branches below the network block. Returns node centers.
pub(super) struct BranchPlacer<'f, 'a> {
    forest: &'f HostingForest<'a>,
    size: Size,
    spacing: &'f Spacing,
    widths: HashMap<&'a str, f32>,
    centers: HashMap<&'a str, Point>,
}

impl<'f, 'a> BranchPlacer<'f, 'a> {
    pub(super) fn new(forest: &'f HostingForest<'a>, size: Size, spacing: &'f Spacing) -> Self {
        Self {
            forest,
            size,
            spacing,
            widths: HashMap::new(),
            centers: HashMap::new(),
        }
    }

    pub(super) fn place_roots(mut self, left: f32, top: f32) -> HashMap<&'a str, Point> {
        let mut cursor = left;
        for &root in &self.forest.roots {
            let width = self.measure(root);
            self.place(root, cursor, top);
            cursor += width + self.spacing.root_branch.x;
        }
        self.centers
    }

    fn children(&self, node: &str) -> &'f [&'a str] {
        self.forest
            .children
            .get(node)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn children_width(&mut self, node: &'a str) -> f32 {
        let children = self.children(node);
        if children.is_empty() {
            return 0.0;
        }
        let gaps = (children.len() - 1) as f32 * self.spacing.branch.x;
        let mut total = gaps;
        for &child in children {
            total += self.measure(child);
        }
        total
    }

    fn measure(&mut self, node: &'a str) -> f32 {
        if let Some(width) = self.widths.get(node) {
            return *width;
        }
        let width = self.children_width(node).max(self.size.width);
        self.widths.insert(node, width);
        width
    }

    fn place(&mut self, node: &'a str, left: f32, top: f32) {
        let width = self.measure(node);
        self.centers.insert(
            node,
            Point::new(left + width / 2.0, top + self.size.height / 2.0),
        );

        let row_width = self.children_width(node);
        let child_top = top + self.size.height + self.spacing.node.y;
        let mut cursor = left + (width - row_width) / 2.0;
        for &child in self.children(node) {
            let child_width = self.measure(child);
            self.place(child, cursor, child_top);
            cursor += child_width + self.spacing.branch.x;
        }
    }
}
