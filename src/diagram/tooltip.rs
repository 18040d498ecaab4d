use crate::layout::Point;
use crate::scene::{ElementId, ElementKind, Surface, fmt_num, translate};

pub const TOOLTIP_CLASS: &str = "topology-tooltip-overlay";

/// Hover overlay owned by a single diagram.
///
/// Each diagram creates its own overlay on construction and removes it on
/// destroy, so several diagrams on one surface never share or clear each
/// other's tooltip.
#[derive(Debug)]
pub struct Tooltip {
    group: ElementId,
    body: ElementId,
    shown_for: Option<String>,
}

impl Tooltip {
    pub fn create(surface: &mut dyn Surface, parent: ElementId) -> Self {
        let group = surface.append(parent, ElementKind::Group);
        surface.set_attr(group, "class", TOOLTIP_CLASS);
        surface.set_attr(group, "visibility", "hidden");
        let body = surface.append(group, ElementKind::Text);
        surface.set_attr(body, "class", "topology-tooltip-body");
        Self {
            group,
            body,
            shown_for: None,
        }
    }

    pub fn show(&mut self, surface: &mut dyn Surface, node_id: &str, markup: &str, anchor: Point) {
        surface.set_text(self.body, markup);
        surface.set_attr(self.group, "transform", &translate(anchor));
        surface.set_attr(self.group, "data-node", node_id);
        surface.set_attr(self.body, "y", &fmt_num(-8.0));
        surface.set_attr(self.group, "visibility", "visible");
        self.shown_for = Some(node_id.to_string());
    }

    pub fn hide(&mut self, surface: &mut dyn Surface) {
        surface.set_attr(self.group, "visibility", "hidden");
        surface.remove_attr(self.group, "data-node");
        self.shown_for = None;
    }

    /// Node the tooltip currently describes.
    pub fn shown_for(&self) -> Option<&str> {
        self.shown_for.as_deref()
    }

    pub fn element(&self) -> ElementId {
        self.group
    }

    pub fn destroy(self, surface: &mut dyn Surface) {
        surface.remove(self.group);
    }
}
