use std::fmt;
use std::rc::Rc;

use crate::layout::{BoundingBox, Point};
use crate::renderer::NodeRenderer;
use crate::scene::fmt_num;

/// Interaction state owned by one diagram.
pub struct ViewState {
    pub selected_node_id: Option<String>,
    pub is_grid_displayed: bool,
    pub node_renderer: Rc<dyn NodeRenderer>,
    /// Cleared once the first non-empty topology has been drawn.
    pub first_render: bool,
}

impl ViewState {
    pub fn new(node_renderer: Rc<dyn NodeRenderer>) -> Self {
        Self {
            selected_node_id: None,
            is_grid_displayed: false,
            node_renderer,
            first_render: true,
        }
    }
}

impl fmt::Debug for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewState")
            .field("selected_node_id", &self.selected_node_id)
            .field("is_grid_displayed", &self.is_grid_displayed)
            .field("node_renderer", &self.node_renderer.metrics())
            .field("first_render", &self.first_render)
            .finish()
    }
}

const VIEWPORT_PADDING: f32 = 20.0;
const MIN_SCALE: f32 = 0.1;
const MAX_SCALE: f32 = 4.0;

/// Maps layout coordinates onto the visible area.
///
/// A screen point is `layout * scale + translate`.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub bbox: BoundingBox,
    pub scale: f32,
    pub translate: Point,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
            bbox: BoundingBox::default(),
            scale: 1.0,
            translate: Point::new(0.0, 0.0),
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width.max(1.0);
        self.height = height.max(1.0);
    }

    /// Fits the bounding box into the viewport, never enlarging it, and
    /// centers it.
    pub fn reset(&mut self) {
        let bbox_w = self.bbox.width();
        let bbox_h = self.bbox.height();
        self.scale = if bbox_w > 0.0 && bbox_h > 0.0 {
            let avail_w = (self.width - 2.0 * VIEWPORT_PADDING).max(1.0);
            let avail_h = (self.height - 2.0 * VIEWPORT_PADDING).max(1.0);
            (avail_w / bbox_w).min(avail_h / bbox_h).clamp(MIN_SCALE, 1.0)
        } else {
            1.0
        };
        let center = self.bbox.center();
        self.translate = Point::new(
            self.width / 2.0 - center.x * self.scale,
            self.height / 2.0 - center.y * self.scale,
        );
    }

    /// Visible region in layout coordinates.
    pub fn visible(&self) -> BoundingBox {
        let min_x = -self.translate.x / self.scale;
        let min_y = -self.translate.y / self.scale;
        BoundingBox::new(
            min_x,
            min_y,
            min_x + self.width / self.scale,
            min_y + self.height / self.scale,
        )
    }

    /// Value for the root `viewBox` attribute.
    pub fn view_box(&self) -> String {
        let visible = self.visible();
        format!(
            "{} {} {} {}",
            fmt_num(visible.min_x),
            fmt_num(visible.min_y),
            fmt_num(visible.width()),
            fmt_num(visible.height())
        )
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.translate = Point::new(self.translate.x + dx, self.translate.y + dy);
    }

    /// Scales around the viewport center.
    pub fn zoom(&mut self, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        let cx = self.width / 2.0;
        let cy = self.height / 2.0;
        let layout_x = (cx - self.translate.x) / self.scale;
        let layout_y = (cy - self.translate.y) / self.scale;
        self.scale = scale;
        self.translate = Point::new(cx - layout_x * scale, cy - layout_y * scale);
    }

    pub fn to_screen(&self, point: Point) -> Point {
        Point::new(
            point.x * self.scale + self.translate.x,
            point.y * self.scale + self.translate.y,
        )
    }
}
