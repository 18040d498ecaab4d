//! Node-rendering strategies.
//!
//! A strategy draws the inside of one node group and decides its size and
//! the spacing the layout uses. The diagram swaps strategies at runtime
//! (design-time editor vs. deployed-application view) and never inspects
//! which concrete strategy it holds.

use serde::{Deserialize, Serialize};

use crate::layout::{LayoutNode, Size, Spacing, SpacingX, SpacingXY, SpacingY};
use crate::scene::{self, ElementId, Surface};
use crate::topology::{NodeTemplate, NodeType, Topology};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RendererMetrics {
    pub width: f32,
    pub height: f32,
    pub distance_between_node_horizontal: f32,
    pub distance_between_node_vertical: f32,
    pub distance_between_branch_horizontal: f32,
}

impl RendererMetrics {
    pub fn node_size(&self) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }

    pub fn spacing(&self, network: f32) -> Spacing {
        Spacing {
            root_branch: SpacingX {
                x: self.distance_between_branch_horizontal,
            },
            branch: SpacingXY {
                x: self.distance_between_node_horizontal,
                y: self.distance_between_node_vertical,
            },
            node: SpacingY {
                y: self.distance_between_node_vertical,
            },
            network,
        }
    }

    /// Routing grid step: a quarter of the smallest node distance.
    pub fn grid_step(&self) -> f32 {
        self.distance_between_node_horizontal
            .min(self.distance_between_node_vertical)
            / 4.0
    }
}

pub trait NodeRenderer {
    fn metrics(&self) -> RendererMetrics;

    /// Draws the static parts of a node. `origin_x`/`origin_y` is the
    /// top-left corner relative to the node center.
    #[allow(clippy::too_many_arguments)]
    fn create_node(
        &self,
        surface: &mut dyn Surface,
        group: ElementId,
        node: &LayoutNode,
        template: &NodeTemplate,
        node_type: &NodeType,
        origin_x: f32,
        origin_y: f32,
    );

    /// Refreshes the parts of a node that follow the template.
    #[allow(clippy::too_many_arguments)]
    fn update_node(
        &self,
        surface: &mut dyn Surface,
        group: ElementId,
        node: &LayoutNode,
        template: &NodeTemplate,
        node_type: &NodeType,
        origin_x: f32,
        origin_y: f32,
        topology: &Topology,
    );

    /// Tooltip markup shown while hovering a node.
    fn tooltip(&self, node: &LayoutNode, template: &NodeTemplate, node_type: &NodeType) -> String;
}

/// Last segment of a dotted TOSCA type name.
pub fn short_type_name(type_name: &str) -> &str {
    type_name.rsplit('.').next().unwrap_or(type_name)
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn tooltip_markup(node: &LayoutNode, template: &NodeTemplate, node_type: &NodeType, extra: Option<&str>) -> String {
    let mut html = format!(
        "<div class=\"topology-tooltip\"><strong>{}</strong><br/><span class=\"tooltip-type\">{}</span>",
        escape_html(&node.id),
        escape_html(&template.type_name)
    );
    if let Some(description) = node_type.description.as_deref() {
        html.push_str(&format!(
            "<p class=\"tooltip-description\">{}</p>",
            escape_html(description)
        ));
    }
    if let Some(extra) = extra {
        html.push_str(&format!("<p class=\"tooltip-state\">{}</p>", escape_html(extra)));
    }
    html.push_str("</div>");
    html
}

/// Design-time view: type badge plus node name.
#[derive(Debug, Clone)]
pub struct DesignNodeRenderer {
    metrics: RendererMetrics,
}

impl Default for DesignNodeRenderer {
    fn default() -> Self {
        Self {
            metrics: RendererMetrics {
                width: 200.0,
                height: 50.0,
                distance_between_node_horizontal: 40.0,
                distance_between_node_vertical: 40.0,
                distance_between_branch_horizontal: 80.0,
            },
        }
    }
}

impl DesignNodeRenderer {
    pub fn with_metrics(metrics: RendererMetrics) -> Self {
        Self { metrics }
    }
}

impl NodeRenderer for DesignNodeRenderer {
    fn metrics(&self) -> RendererMetrics {
        self.metrics
    }

    fn create_node(
        &self,
        surface: &mut dyn Surface,
        group: ElementId,
        node: &LayoutNode,
        template: &NodeTemplate,
        _node_type: &NodeType,
        origin_x: f32,
        origin_y: f32,
    ) {
        let kind = scene::text(
            surface,
            group,
            origin_x + 8.0,
            origin_y + 16.0,
            short_type_name(&template.type_name),
        );
        surface.set_attr(kind, "class", "topology-svg-type");
        let name = scene::text(surface, group, origin_x + 8.0, origin_y + 36.0, &node.id);
        surface.set_attr(name, "class", "topology-svg-name");
    }

    fn update_node(
        &self,
        surface: &mut dyn Surface,
        group: ElementId,
        _node: &LayoutNode,
        _template: &NodeTemplate,
        node_type: &NodeType,
        _origin_x: f32,
        _origin_y: f32,
        _topology: &Topology,
    ) {
        surface.set_class(group, "node-abstract", node_type.is_abstract);
    }

    fn tooltip(&self, node: &LayoutNode, template: &NodeTemplate, node_type: &NodeType) -> String {
        tooltip_markup(node, template, node_type, None)
    }
}

/// Runtime view: node name plus a deployment-state indicator.
#[derive(Debug, Clone)]
pub struct RuntimeNodeRenderer {
    metrics: RendererMetrics,
}

impl Default for RuntimeNodeRenderer {
    fn default() -> Self {
        Self {
            metrics: RendererMetrics {
                width: 220.0,
                height: 60.0,
                distance_between_node_horizontal: 40.0,
                distance_between_node_vertical: 48.0,
                distance_between_branch_horizontal: 80.0,
            },
        }
    }
}

impl RuntimeNodeRenderer {
    pub fn with_metrics(metrics: RendererMetrics) -> Self {
        Self { metrics }
    }

    fn state_class(template: &NodeTemplate) -> String {
        format!("state-{}", template.runtime_state.as_deref().unwrap_or("unknown"))
    }
}

const STATE_INDICATOR: &str = "runtime-state";

impl NodeRenderer for RuntimeNodeRenderer {
    fn metrics(&self) -> RendererMetrics {
        self.metrics
    }

    fn create_node(
        &self,
        surface: &mut dyn Surface,
        group: ElementId,
        node: &LayoutNode,
        _template: &NodeTemplate,
        _node_type: &NodeType,
        origin_x: f32,
        origin_y: f32,
    ) {
        let name = scene::text(surface, group, origin_x + 28.0, origin_y + 34.0, &node.id);
        surface.set_attr(name, "class", "topology-svg-name");
        let indicator = scene::circle(surface, group, origin_x + 14.0, origin_y + 30.0, 6.0);
        surface.set_attr(indicator, "class", STATE_INDICATOR);
    }

    fn update_node(
        &self,
        surface: &mut dyn Surface,
        group: ElementId,
        _node: &LayoutNode,
        template: &NodeTemplate,
        _node_type: &NodeType,
        _origin_x: f32,
        _origin_y: f32,
        _topology: &Topology,
    ) {
        let class = format!("{STATE_INDICATOR} {}", Self::state_class(template));
        for child in surface.children(group) {
            if surface.has_class(child, STATE_INDICATOR) {
                surface.set_attr(child, "class", &class);
            }
        }
    }

    fn tooltip(&self, node: &LayoutNode, template: &NodeTemplate, node_type: &NodeType) -> String {
        let state = template.runtime_state.as_deref().unwrap_or("unknown");
        tooltip_markup(node, template, node_type, Some(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{BoundingBox, Point};
    use crate::scene::Scene;

    fn node() -> LayoutNode {
        LayoutNode {
            id: "Web<1>".to_string(),
            coordinate: Point::new(0.0, 0.0),
            bbox: BoundingBox::new(-100.0, -25.0, 100.0, 25.0),
            network_id: None,
        }
    }

    #[test]
    fn metrics_drive_spacing_and_grid_step() {
        let metrics = DesignNodeRenderer::default().metrics();
        let spacing = metrics.spacing(14.0);
        assert_eq!(spacing.root_branch.x, 80.0);
        assert_eq!(spacing.branch.x, 40.0);
        assert_eq!(spacing.node.y, 40.0);
        assert_eq!(metrics.grid_step(), 10.0);
        assert_eq!(RuntimeNodeRenderer::default().metrics().grid_step(), 10.0);
    }

    #[test]
    fn tooltip_is_escaped_and_describes_type() {
        let renderer = DesignNodeRenderer::default();
        let node_type = NodeType {
            description: Some("A web server".to_string()),
            ..NodeType::default()
        };
        let html = renderer.tooltip(&node(), &NodeTemplate::new("my.nodes.WebServer"), &node_type);
        assert!(html.contains("Web&lt;1&gt;"));
        assert!(html.contains("my.nodes.WebServer"));
        assert!(html.contains("A web server"));
    }

    #[test]
    fn runtime_update_follows_state() {
        let renderer = RuntimeNodeRenderer::default();
        let mut scene = Scene::new();
        let root = scene.root();
        let group = scene.append(root, crate::scene::ElementKind::Group);
        let mut template = NodeTemplate::new("tosca.nodes.Compute");
        let node_type = NodeType::default();
        let topology = Topology::default();
        renderer.create_node(&mut scene, group, &node(), &template, &node_type, -110.0, -30.0);
        renderer.update_node(&mut scene, group, &node(), &template, &node_type, -110.0, -30.0, &topology);
        assert_eq!(scene.count_with_class("state-unknown"), 1);

        template.runtime_state = Some("started".to_string());
        renderer.update_node(&mut scene, group, &node(), &template, &node_type, -110.0, -30.0, &topology);
        assert_eq!(scene.count_with_class("state-unknown"), 0);
        assert_eq!(scene.count_with_class("state-started"), 1);
    }

    #[test]
    fn short_type_name_keeps_last_segment() {
        assert_eq!(short_type_name("tosca.nodes.Compute"), "Compute");
        assert_eq!(short_type_name("Plain"), "Plain");
    }
}
