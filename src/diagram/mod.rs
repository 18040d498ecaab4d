//! Interactive topology diagram.
//!
//! [`Diagram`] owns a [`Surface`] and keeps it in sync with the latest
//! topology: every [`Diagram::reset`] recomputes the layout and routing
//! grid, then reconciles node and link visuals by key so unchanged
//! elements keep their identity across redraws.

mod diff;
mod tooltip;
mod view;

pub use diff::{KeyedDiff, keyed_diff};
pub use tooltip::{TOOLTIP_CLASS, Tooltip};
pub use view::{ViewState, Viewport};

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::config::{Config, LayoutConfig};
use crate::layout::{
    BoundingBox, Grid, Layout, LayoutError, LayoutLink, LayoutNode, Point, RAIL_OFFSET, compute_layout,
};
use crate::renderer::NodeRenderer;
use crate::scene::{self, ElementId, ElementKind, Surface};
use crate::theme::Theme;
use crate::topology::{NodeTemplate, NodeType, Topology, TopologyError};
use crate::tosca::{get_scaling_policy, is_hosted_on_type};

pub const NODE_CLASS: &str = "node-template";
pub const SELECTOR_CLASS: &str = "selector";
pub const LINK_CLASS: &str = "link";
pub const BADGE_CLASS: &str = "scaling-policy";
pub const GRID_CELL_CLASS: &str = "grid-cell";

const BADGE_RADIUS: f32 = 12.0;
const BADGE_ICON: &str = "\u{f112}";

#[derive(Debug, Error)]
pub enum DiagramError {
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Passed to the click callback before the selection is updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChange {
    pub new_selected_name: String,
    pub old_selected_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimensions {
    pub width: f32,
    pub height: f32,
}

/// Pointer events routed from the host surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEvent {
    Click(ElementId),
    MouseOver(ElementId),
    MouseOut(ElementId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeVisual {
    pub group: ElementId,
    pub selector: ElementId,
    /// Rail drawn to the right of network nodes.
    pub rail: Option<ElementId>,
    /// Scaling-policy badge, present only while the template has a policy.
    pub badge: Option<ElementId>,
}

/// Visuals currently on the surface, keyed like the layout they mirror.
#[derive(Debug, Clone, Default)]
pub struct RenderedState {
    pub nodes: IndexMap<String, NodeVisual>,
    pub links: IndexMap<String, ElementId>,
}

impl RenderedState {
    pub fn node_for_element(&self, element: ElementId) -> Option<&str> {
        self.nodes
            .iter()
            .find(|(_, visual)| visual.selector == element || visual.group == element)
            .map(|(id, _)| id.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
struct Layers {
    defs: ElementId,
    grid: ElementId,
    links: ElementId,
    nodes: ElementId,
    overlay: ElementId,
}

pub type ClickCallback = Box<dyn FnMut(&SelectionChange)>;

pub struct Diagram<S: Surface> {
    surface: S,
    click_callback: ClickCallback,
    is_runtime: bool,
    config: LayoutConfig,
    layers: Layers,
    tooltip: Tooltip,
    topology: Option<Topology>,
    layout: Option<Layout>,
    grid: Option<Grid>,
    grid_step: f32,
    view: ViewState,
    rendered: RenderedState,
    viewport: Viewport,
}

impl<S: Surface> Diagram<S> {
    pub fn create(
        click_callback: impl FnMut(&SelectionChange) + 'static,
        mut surface: S,
        is_runtime: bool,
        node_renderer: Rc<dyn NodeRenderer>,
        config: &Config,
    ) -> Self {
        let root = surface.root();
        surface.set_attr(root, "class", "topology-svg");
        surface.set_class(root, "topology-svg-runtime", is_runtime);

        let mut layer = |name: &str| {
            let kind = if name == "defs" {
                ElementKind::Defs
            } else {
                ElementKind::Group
            };
            let id = surface.append(root, kind);
            surface.set_attr(id, "class", &format!("topology-layer-{name}"));
            id
        };
        let layers = Layers {
            defs: layer("defs"),
            grid: layer("grid"),
            links: layer("links"),
            nodes: layer("nodes"),
            overlay: layer("overlay"),
        };
        define_markers(&mut surface, layers.defs, &config.theme);
        let tooltip = Tooltip::create(&mut surface, layers.overlay);

        let grid_step = node_renderer.metrics().grid_step();
        let mut diagram = Self {
            surface,
            click_callback: Box::new(click_callback),
            is_runtime,
            config: config.layout.clone(),
            layers,
            tooltip,
            topology: None,
            layout: None,
            grid: None,
            grid_step,
            view: ViewState::new(node_renderer),
            rendered: RenderedState::default(),
            viewport: Viewport::new(config.render.width, config.render.height),
        };
        diagram.update_view_box();
        diagram
    }

    /// Redraws the diagram for `topology`.
    ///
    /// The layout is computed before anything on the surface changes, so a
    /// topology with dangling references leaves the previous drawing intact.
    /// `None` clears the diagram.
    pub fn reset(&mut self, topology: Option<Topology>) -> Result<(), DiagramError> {
        let span = tracing::info_span!(
            "reset",
            nodes = topology.as_ref().map(|t| t.node_templates.len()).unwrap_or(0)
        );
        let _enter = span.enter();

        let Some(topology) = topology else {
            self.clear();
            return Ok(());
        };

        let metrics = self.view.node_renderer.metrics();
        let mut layout = compute_layout(
            &topology.node_templates,
            &topology.node_types,
            &topology.relationship_types,
            metrics.node_size(),
            &metrics.spacing(self.config.network_spacing),
        )?;

        let mut grid = Grid::new(layout.bbox, self.grid_step).with_routing(self.config.routing.clone());
        for node in &layout.nodes {
            grid.add_obstacle(&node.bbox);
        }
        for link in &mut layout.links {
            link.route = link_route(&mut grid, link);
        }

        self.draw(&topology, &layout);
        if !layout.nodes.is_empty() {
            self.view.first_render = false;
        }
        self.viewport.bbox = layout.bbox;
        self.topology = Some(topology);
        self.layout = Some(layout);
        self.grid = Some(grid);
        self.display_grid();

        self.viewport.reset();
        self.update_view_box();
        Ok(())
    }

    fn clear(&mut self) {
        for (_, visual) in self.rendered.nodes.drain(..) {
            self.surface.remove(visual.group);
        }
        for (_, path) in self.rendered.links.drain(..) {
            self.surface.remove(path);
        }
        self.surface.clear_children(self.layers.grid);
        self.tooltip.hide(&mut self.surface);
        self.topology = None;
        self.layout = None;
        self.grid = None;
        self.viewport.bbox = BoundingBox::default();
        self.viewport.reset();
        self.update_view_box();
        tracing::debug!("cleared diagram");
    }

    fn draw(&mut self, topology: &Topology, layout: &Layout) {
        let bbox_width = layout.bbox.width();
        let diff = keyed_diff(
            self.rendered.nodes.keys().map(String::as_str),
            layout.nodes.iter().map(|node| node.id.as_str()),
        );
        for id in &diff.to_remove {
            if let Some(visual) = self.rendered.nodes.shift_remove(id) {
                self.surface.remove(visual.group);
            }
        }

        let layout_nodes: HashMap<&str, &LayoutNode> =
            layout.nodes.iter().map(|node| (node.id.as_str(), node)).collect();
        let mut visuals: HashMap<&str, NodeVisual> = diff
            .to_update
            .iter()
            .filter_map(|id| Some((id.as_str(), *self.rendered.nodes.get(id)?)))
            .collect();
        for id in &diff.to_create {
            let (Some(node), Some((template, node_type))) =
                (layout_nodes.get(id.as_str()), topology.resolve(id))
            else {
                continue;
            };
            let visual = self.create_node(node, template, node_type);
            visuals.insert(id.as_str(), visual);
        }

        // Created and kept visuals get the same update pass, in layout order.
        let mut nodes = IndexMap::with_capacity(layout.nodes.len());
        for node in &layout.nodes {
            let Some(mut visual) = visuals.remove(node.id.as_str()) else {
                continue;
            };
            let Some((template, node_type)) = topology.resolve(&node.id) else {
                self.surface.remove(visual.group);
                continue;
            };
            self.update_node(topology, node, template, node_type, bbox_width, &mut visual);
            nodes.insert(node.id.clone(), visual);
        }
        self.rendered.nodes = nodes;

        let link_diff = self.draw_links(topology, &layout.links);
        tracing::debug!(
            created = diff.to_create.len(),
            updated = diff.to_update.len(),
            removed = diff.to_remove.len(),
            links_created = link_diff.to_create.len(),
            links_removed = link_diff.to_remove.len(),
            "reconciled diagram"
        );
    }

    fn create_node(
        &mut self,
        node: &LayoutNode,
        template: &NodeTemplate,
        node_type: &NodeType,
    ) -> NodeVisual {
        let renderer = Rc::clone(&self.view.node_renderer);
        let metrics = renderer.metrics();
        let (ox, oy) = (-metrics.width / 2.0, -metrics.height / 2.0);

        let group = self.surface.append(self.layers.nodes, ElementKind::Group);
        self.surface.set_attr(group, "class", NODE_CLASS);

        let background = scene::rect(&mut self.surface, group, ox, oy, metrics.width, metrics.height, 0.0, 0.0);
        self.surface.set_attr(background, "class", "background");

        renderer.create_node(&mut self.surface, group, node, template, node_type, ox, oy);

        // Geometry and style are filled in by update_node.
        let rail = node
            .network_id
            .map(|_| scene::path(&mut self.surface, group, ""));

        let selector = scene::rect(&mut self.surface, group, ox, oy, metrics.width, metrics.height, 0.0, 0.0);
        self.surface.set_attr(selector, "class", SELECTOR_CLASS);
        self.surface.set_attr(selector, "node-template-id", &node.id);
        self.surface.set_attr(selector, "id", &format!("rect_{}", node.id));

        NodeVisual {
            group,
            selector,
            rail,
            badge: None,
        }
    }

    fn update_node(
        &mut self,
        topology: &Topology,
        node: &LayoutNode,
        template: &NodeTemplate,
        node_type: &NodeType,
        bbox_width: f32,
        visual: &mut NodeVisual,
    ) {
        let renderer = Rc::clone(&self.view.node_renderer);
        let metrics = renderer.metrics();
        let (ox, oy) = (-metrics.width / 2.0, -metrics.height / 2.0);

        self.surface
            .set_attr(visual.group, "transform", &scene::translate(node.coordinate));
        self.surface.set_class(visual.group, "selected", template.selected);

        renderer.update_node(&mut self.surface, visual.group, node, template, node_type, ox, oy, topology);

        let rail = match (node.network_id, visual.rail) {
            (Some(_), None) => Some(scene::path(&mut self.surface, visual.group, "")),
            (None, Some(rail)) => {
                self.surface.remove(rail);
                None
            }
            (_, rail) => rail,
        };
        visual.rail = rail;
        if let (Some(rail), Some(network_id)) = (rail, node.network_id) {
            let style = network_style(network_id, self.config.network_styles);
            self.surface.set_attr(
                rail,
                "class",
                &format!("link-network link-network-{style} link-selected"),
            );
            self.surface.set_attr(
                rail,
                "d",
                &rail_path(ox, oy, metrics.width, metrics.height, bbox_width),
            );
        }

        match (get_scaling_policy(template), visual.badge) {
            (Some(_), None) => {
                let badge = self.surface.append(visual.group, ElementKind::Group);
                self.surface.set_attr(badge, "id", "scalingPolicy");
                self.surface.set_attr(badge, "class", BADGE_CLASS);
                let (cx, cy) = (ox + metrics.width, oy);
                let circle = scene::circle(&mut self.surface, badge, cx, cy, BADGE_RADIUS);
                self.surface.set_attr(circle, "class", "topology-svg-icon-circle");
                let icon = scene::text(&mut self.surface, badge, cx, cy, BADGE_ICON);
                self.surface
                    .set_attr(icon, "class", "topology-svg-icon topology-svg-icon-center");
                self.surface.set_attr(
                    icon,
                    "transform",
                    &format!("rotate(90 {} {})", scene::fmt_num(cx), scene::fmt_num(cy)),
                );
                visual.badge = Some(badge);
            }
            (None, Some(badge)) => {
                self.surface.remove(badge);
                visual.badge = None;
            }
            _ => {}
        }
    }

    fn draw_links(&mut self, topology: &Topology, links: &[LayoutLink]) -> KeyedDiff {
        let diff = keyed_diff(
            self.rendered.links.keys().map(String::as_str),
            links.iter().map(|link| link.id.as_str()),
        );
        for id in &diff.to_remove {
            if let Some(path) = self.rendered.links.shift_remove(id) {
                self.surface.remove(path);
            }
        }

        let mut paths: HashMap<&str, ElementId> = diff
            .to_update
            .iter()
            .filter_map(|id| Some((id.as_str(), *self.rendered.links.get(id)?)))
            .collect();
        for id in &diff.to_create {
            let path = self.surface.append(self.layers.links, ElementKind::Path);
            paths.insert(id.as_str(), path);
        }

        let mut rendered = IndexMap::with_capacity(links.len());
        for link in links {
            let Some(path) = paths.remove(link.id.as_str()) else {
                continue;
            };
            self.classify_link(topology, link, path);
            self.surface.set_attr(path, "d", &scene::points_to_path(&link.route));
            self.surface.set_class(path, "link-selected", link.selected);
            rendered.insert(link.id.clone(), path);
        }
        self.rendered.links = rendered;
        diff
    }

    fn classify_link(&mut self, topology: &Topology, link: &LayoutLink, path: ElementId) {
        if link.is_network {
            let style = network_style(link.network_id.unwrap_or(0), self.config.network_styles);
            self.surface.set_attr(
                path,
                "class",
                &format!("{LINK_CLASS} link-network link-network-{style}"),
            );
            self.surface.remove_attr(path, "marker-start");
            self.surface.remove_attr(path, "marker-end");
            return;
        }
        let hosted = is_hosted_on_type(&link.relationship_type, &topology.relationship_types);
        let (class, start, end) = if hosted {
            ("link-hosted-on", "url(#markerHosted)", "url(#markerHostedTarget)")
        } else {
            ("link-depends-on", "url(#markerDepends)", "url(#markerDependsEnd)")
        };
        self.surface
            .set_attr(path, "class", &format!("{LINK_CLASS} {class}"));
        self.surface.set_attr(path, "marker-start", start);
        self.surface.set_attr(path, "marker-end", end);
    }

    fn display_grid(&mut self) {
        self.surface.clear_children(self.layers.grid);
        if !self.view.is_grid_displayed {
            return;
        }
        let Some(grid) = &self.grid else {
            return;
        };
        let step = grid.step();
        for col in 0..grid.cols() {
            for row in 0..grid.rows() {
                let Some(cell) = grid.cell(col, row) else {
                    continue;
                };
                let origin = grid.cell_origin(col, row);
                let rect = scene::rect(
                    &mut self.surface,
                    self.layers.grid,
                    origin.x,
                    origin.y,
                    step - 1.0,
                    step - 1.0,
                    0.0,
                    0.0,
                );
                let state = if cell.visited == 1 {
                    "visited"
                } else if cell.weight == crate::layout::routing::OBSTACLE_WEIGHT {
                    "obstacle"
                } else {
                    "free"
                };
                self.surface.set_attr(
                    rect,
                    "class",
                    &format!("{GRID_CELL_CLASS} {GRID_CELL_CLASS}-{state}"),
                );
            }
        }
    }

    fn update_view_box(&mut self) {
        let root = self.surface.root();
        self.surface.set_attr(root, "viewBox", &self.viewport.view_box());
        self.surface
            .set_attr(root, "width", &scene::fmt_num(self.viewport.width));
        self.surface
            .set_attr(root, "height", &scene::fmt_num(self.viewport.height));
    }

    /// Dispatches a pointer event coming from the surface.
    pub fn handle_event(&mut self, event: SceneEvent) {
        match event {
            SceneEvent::Click(element) => {
                if let Some(id) = self.rendered.node_for_element(element).map(str::to_string) {
                    self.select_node(&id);
                }
            }
            SceneEvent::MouseOver(element) => {
                if let Some(id) = self.rendered.node_for_element(element).map(str::to_string) {
                    self.show_tooltip(&id);
                }
            }
            SceneEvent::MouseOut(element) => {
                if self.rendered.node_for_element(element).is_some() {
                    self.tooltip.hide(&mut self.surface);
                }
            }
        }
    }

    /// Selects a rendered node. Returns `false` for unknown ids.
    pub fn select_node(&mut self, node_id: &str) -> bool {
        if !self.rendered.nodes.contains_key(node_id) {
            return false;
        }
        let change = SelectionChange {
            new_selected_name: node_id.to_string(),
            old_selected_name: self.view.selected_node_id.clone(),
        };
        (self.click_callback)(&change);
        self.view.selected_node_id = Some(node_id.to_string());
        true
    }

    fn show_tooltip(&mut self, node_id: &str) {
        let (Some(layout), Some(topology)) = (&self.layout, &self.topology) else {
            return;
        };
        let Some(node) = layout.node(node_id) else {
            return;
        };
        let Some((template, node_type)) = topology.resolve(node_id) else {
            return;
        };
        let markup = self.view.node_renderer.tooltip(node, template, node_type);
        let height = self.view.node_renderer.metrics().height;
        let anchor = Point::new(node.coordinate.x, node.coordinate.y - height / 2.0);
        self.tooltip.show(&mut self.surface, node_id, &markup, anchor);
    }

    /// Swaps the node renderer and redraws. Passing the active renderer
    /// again does nothing.
    pub fn set_node_renderer(&mut self, node_renderer: Rc<dyn NodeRenderer>) -> Result<(), DiagramError> {
        if Rc::ptr_eq(&self.view.node_renderer, &node_renderer) {
            return Ok(());
        }
        for (_, visual) in self.rendered.nodes.drain(..) {
            self.surface.remove(visual.group);
        }
        self.grid_step = node_renderer.metrics().grid_step();
        self.view.node_renderer = node_renderer;
        tracing::debug!(grid_step = self.grid_step, "switched node renderer");
        match self.topology.clone() {
            Some(topology) => self.reset(Some(topology)),
            None => Ok(()),
        }
    }

    /// Resizes the viewport and refits the current layout without
    /// recomputing it.
    pub fn on_resize(&mut self, dimensions: Dimensions) {
        self.viewport.resize(dimensions.width, dimensions.height);
        self.viewport.reset();
        self.update_view_box();
    }

    pub fn set_grid_displayed(&mut self, displayed: bool) {
        self.view.is_grid_displayed = displayed;
        self.display_grid();
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.viewport.pan(dx, dy);
        self.update_view_box();
    }

    pub fn zoom(&mut self, factor: f32) {
        self.viewport.zoom(factor);
        self.update_view_box();
    }

    /// Removes everything the diagram added and hands the surface back.
    pub fn destroy(self) -> S {
        let Diagram {
            mut surface,
            layers,
            tooltip,
            ..
        } = self;
        tooltip.destroy(&mut surface);
        for layer in [layers.defs, layers.grid, layers.links, layers.nodes, layers.overlay] {
            surface.remove(layer);
        }
        surface
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }

    pub fn topology(&self) -> Option<&Topology> {
        self.topology.as_ref()
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn rendered(&self) -> &RenderedState {
        &self.rendered
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn tooltip(&self) -> &Tooltip {
        &self.tooltip
    }

    pub fn is_runtime(&self) -> bool {
        self.is_runtime
    }
}

fn network_style(network_id: usize, styles: usize) -> usize {
    network_id % styles.max(1)
}

fn rail_path(ox: f32, oy: f32, width: f32, height: f32, bbox_width: f32) -> String {
    let start_x = ox + width;
    let end_x = start_x + bbox_width - width;
    let y = oy + height / 2.0 - RAIL_OFFSET;
    scene::points_to_path(&[Point::new(start_x, y), Point::new(end_x, y)])
}

/// Full polyline for a link: source connector, routed bends, target connector.
fn link_route(grid: &mut Grid, link: &LayoutLink) -> Vec<Point> {
    let mut route = Vec::new();
    route.push(link.source.point);
    if !link.is_network {
        route.extend(grid.route(
            link.source.point,
            link.source.direction,
            link.target.point,
            link.target.direction,
        ));
    }
    route.push(link.target.point);
    route
}

struct MarkerSpec {
    id: &'static str,
    ref_x: &'static str,
    ref_y: &'static str,
    d: &'static str,
    hosted: bool,
}

const MARKERS: [MarkerSpec; 4] = [
    MarkerSpec {
        id: "markerDepends",
        ref_x: "0",
        ref_y: "7",
        d: "M 3,12 0,12 0,2 3,2 10,7 z",
        hosted: false,
    },
    MarkerSpec {
        id: "markerDependsEnd",
        ref_x: "12",
        ref_y: "7",
        d: "M 0,12 12,12 12,2 0,2 7,7 z",
        hosted: false,
    },
    MarkerSpec {
        id: "markerHosted",
        ref_x: "12",
        ref_y: "7",
        d: "M 9,12 12,12 12,2 9,2 2,7 z",
        hosted: true,
    },
    MarkerSpec {
        id: "markerHostedTarget",
        ref_x: "7",
        ref_y: "12",
        d: "M 12,0 12,12 2,12 2,0 7,7 z",
        hosted: true,
    },
];

fn define_markers(surface: &mut dyn Surface, defs: ElementId, theme: &Theme) {
    for spec in &MARKERS {
        let marker = surface.append(defs, ElementKind::Marker);
        surface.set_attr(marker, "id", spec.id);
        surface.set_attr(marker, "markerUnits", "userSpaceOnUse");
        surface.set_attr(marker, "markerWidth", "14");
        surface.set_attr(marker, "markerHeight", "14");
        surface.set_attr(marker, "refX", spec.ref_x);
        surface.set_attr(marker, "refY", spec.ref_y);
        surface.set_attr(marker, "orient", "auto");
        let shape = scene::path(surface, marker, spec.d);
        let fill = if spec.hosted {
            &theme.hosted_on_color
        } else {
            &theme.depends_on_color
        };
        surface.set_attr(shape, "style", &format!("stroke: none; fill: {fill}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::DesignNodeRenderer;
    use crate::scene::Scene;

    fn diagram() -> Diagram<Scene> {
        Diagram::create(
            |_| {},
            Scene::new(),
            false,
            Rc::new(DesignNodeRenderer::default()),
            &Config::default(),
        )
    }

    #[test]
    fn create_defines_layers_and_markers() {
        let diagram = diagram();
        let scene = diagram.surface();
        assert_eq!(scene.children(scene.root()).len(), 5);
        for id in ["markerDepends", "markerDependsEnd", "markerHosted", "markerHostedTarget"] {
            let marker = scene.find_by_attr("id", id).unwrap();
            let shape = scene.children(marker)[0];
            assert!(scene.attr(shape, "style").unwrap().starts_with("stroke: none; fill: #"));
        }
        assert_eq!(scene.count_with_class(TOOLTIP_CLASS), 1);
        assert!(diagram.view().first_render);
    }

    #[test]
    fn destroy_returns_a_clean_surface() {
        let scene = diagram().destroy();
        assert!(scene.is_empty());
    }

    #[test]
    fn rail_spans_to_layout_edge() {
        assert_eq!(rail_path(-100.0, -25.0, 200.0, 50.0, 600.0), "M100,-2 500,-2");
    }

    #[test]
    fn network_styles_wrap() {
        assert_eq!(network_style(12, 10), 2);
        assert_eq!(network_style(3, 0), 0);
    }
}
