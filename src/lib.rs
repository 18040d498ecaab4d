#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod diagram;
pub mod layout;
pub mod layout_dump;
pub mod render;
pub mod renderer;
pub mod scene;
pub mod theme;
pub mod topology;
pub mod tosca;

use std::rc::Rc;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, RenderConfig, load_config};
pub use diagram::{Diagram, DiagramError, Dimensions, SceneEvent, SelectionChange};
pub use layout::{Layout, LayoutError, compute_layout};
pub use render::render_svg;
pub use renderer::{DesignNodeRenderer, NodeRenderer, RendererMetrics, RuntimeNodeRenderer};
pub use scene::{Scene, Surface};
pub use theme::Theme;
pub use topology::{Topology, TopologyError};

/// Settings for one-shot rendering of a topology document.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub config: Config,
    /// Draw deployment state instead of design-time type labels.
    pub runtime: bool,
    /// Overlay the routing grid.
    pub show_grid: bool,
    pub selected: Option<String>,
}

impl RenderOptions {
    pub fn classic() -> Self {
        Self::default()
    }

    pub fn dark() -> Self {
        let mut options = Self::default();
        options.config.theme = Theme::dark();
        options.config.render.background = options.config.theme.background.clone();
        options
    }

    /// Node renderer matching these options, with any metrics override
    /// from the layout config applied.
    pub fn node_renderer(&self) -> Rc<dyn NodeRenderer> {
        match (self.runtime, self.config.layout.renderer) {
            (false, None) => Rc::new(DesignNodeRenderer::default()),
            (false, Some(metrics)) => Rc::new(DesignNodeRenderer::with_metrics(metrics)),
            (true, None) => Rc::new(RuntimeNodeRenderer::default()),
            (true, Some(metrics)) => Rc::new(RuntimeNodeRenderer::with_metrics(metrics)),
        }
    }
}

/// Builds a headless diagram for `topology`.
///
/// A selected node is marked on its template before drawing, the same way
/// an editor reacts to the click callback.
pub fn build_diagram(mut topology: Topology, options: &RenderOptions) -> Result<Diagram<Scene>, DiagramError> {
    if let Some(selected) = options.selected.as_deref() {
        match topology.node_templates.get_mut(selected) {
            Some(template) => template.selected = true,
            None => tracing::warn!(node = selected, "selected node not found in topology"),
        }
    }
    let mut diagram = Diagram::create(
        |_| {},
        Scene::new(),
        options.runtime,
        options.node_renderer(),
        &options.config,
    );
    diagram.set_grid_displayed(options.show_grid);
    diagram.reset(Some(topology))?;
    if let Some(selected) = options.selected.as_deref() {
        diagram.select_node(selected);
    }
    Ok(diagram)
}

/// Parses topology JSON and renders it to an SVG string.
pub fn render_with_options(topology_json: &str, options: RenderOptions) -> Result<String, DiagramError> {
    let topology = Topology::from_json(topology_json)?;
    let diagram = build_diagram(topology, &options)?;
    Ok(render_svg(diagram.surface(), &options.config.theme))
}

pub fn render(topology_json: &str) -> Result<String, DiagramError> {
    render_with_options(topology_json, RenderOptions::default())
}
