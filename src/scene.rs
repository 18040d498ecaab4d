//! Retained-mode drawing surface.
//!
//! The diagram only talks to the [`Surface`] trait. [`Scene`] is the
//! in-memory implementation used headlessly; it can be serialized to SVG
//! with [`crate::render::render_svg`].

use indexmap::IndexMap;
use slotmap::{SlotMap, new_key_type};

use crate::layout::Point;

new_key_type! {
    /// Handle to a scene element. A handle to a removed element stays dead
    /// even after its slot is reused.
    pub struct ElementId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Svg,
    Defs,
    Marker,
    Group,
    Rect,
    Circle,
    Path,
    Text,
}

impl ElementKind {
    pub fn tag(self) -> &'static str {
        match self {
            ElementKind::Svg => "svg",
            ElementKind::Defs => "defs",
            ElementKind::Marker => "marker",
            ElementKind::Group => "g",
            ElementKind::Rect => "rect",
            ElementKind::Circle => "circle",
            ElementKind::Path => "path",
            ElementKind::Text => "text",
        }
    }
}

/// Drawing primitives the diagram needs from its host.
pub trait Surface {
    fn root(&self) -> ElementId;
    fn append(&mut self, parent: ElementId, kind: ElementKind) -> ElementId;
    /// Removes the element and its whole subtree. Unknown ids are ignored.
    fn remove(&mut self, id: ElementId);
    fn contains(&self, id: ElementId) -> bool;
    fn set_attr(&mut self, id: ElementId, name: &str, value: &str);
    fn remove_attr(&mut self, id: ElementId, name: &str);
    fn attr(&self, id: ElementId, name: &str) -> Option<&str>;
    fn set_text(&mut self, id: ElementId, text: &str);
    fn children(&self, id: ElementId) -> Vec<ElementId>;

    fn set_class(&mut self, id: ElementId, class: &str, enabled: bool) {
        let mut classes: Vec<String> = self
            .attr(id, "class")
            .map(|value| value.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        let present = classes.iter().any(|existing| existing == class);
        if enabled == present {
            return;
        }
        if enabled {
            classes.push(class.to_string());
        } else {
            classes.retain(|existing| existing != class);
        }
        self.set_attr(id, "class", &classes.join(" "));
    }

    fn has_class(&self, id: ElementId, class: &str) -> bool {
        self.attr(id, "class")
            .map(|value| value.split_whitespace().any(|existing| existing == class))
            .unwrap_or(false)
    }

    fn clear_children(&mut self, id: ElementId) {
        for child in self.children(id) {
            self.remove(child);
        }
    }
}

#[derive(Debug, Clone)]
pub struct Element {
    kind: ElementKind,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    attrs: IndexMap<String, String>,
    text: Option<String>,
}

impl Element {
    fn new(kind: ElementKind, parent: Option<ElementId>) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            attrs: IndexMap::new(),
            text: None,
        }
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn child_ids(&self) -> &[ElementId] {
        &self.children
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

/// Slot-map backed retained scene. Freed slots are reused with a bumped
/// version, so a stale [`ElementId`] can not alias a newer element.
#[derive(Debug, Clone)]
pub struct Scene {
    elements: SlotMap<ElementId, Element>,
    root: ElementId,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        let mut elements = SlotMap::with_key();
        let root = elements.insert(Element::new(ElementKind::Svg, None));
        Self { elements, root }
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    /// Number of live elements, root included.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Slots the scene can hold without growing, live or free.
    pub fn capacity(&self) -> usize {
        self.elements.capacity()
    }

    pub fn with_class(&self, class: &str) -> Vec<ElementId> {
        self.elements
            .keys()
            .filter(|id| self.has_class(*id, class))
            .collect()
    }

    pub fn count_with_class(&self, class: &str) -> usize {
        self.with_class(class).len()
    }

    pub fn find_by_attr(&self, name: &str, value: &str) -> Option<ElementId> {
        self.elements.iter().find_map(|(id, element)| {
            (element.attrs.get(name).map(String::as_str) == Some(value)).then_some(id)
        })
    }
}

impl Surface for Scene {
    fn root(&self) -> ElementId {
        self.root
    }

    fn append(&mut self, parent: ElementId, kind: ElementKind) -> ElementId {
        let parent = if self.contains(parent) { parent } else { self.root };
        let id = self.elements.insert(Element::new(kind, Some(parent)));
        if let Some(parent) = self.elements.get_mut(parent) {
            parent.children.push(id);
        }
        id
    }

    fn remove(&mut self, id: ElementId) {
        if id == self.root {
            self.clear_children(id);
            return;
        }
        let Some(element) = self.elements.remove(id) else {
            return;
        };
        if let Some(parent) = element.parent.and_then(|parent| self.elements.get_mut(parent)) {
            parent.children.retain(|child| *child != id);
        }
        let mut stack = element.children;
        while let Some(child) = stack.pop() {
            if let Some(removed) = self.elements.remove(child) {
                stack.extend(removed.children);
            }
        }
    }

    fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(id)
    }

    fn set_attr(&mut self, id: ElementId, name: &str, value: &str) {
        if let Some(element) = self.elements.get_mut(id) {
            element.attrs.insert(name.to_string(), value.to_string());
        }
    }

    fn remove_attr(&mut self, id: ElementId, name: &str) {
        if let Some(element) = self.elements.get_mut(id) {
            element.attrs.shift_remove(name);
        }
    }

    fn attr(&self, id: ElementId, name: &str) -> Option<&str> {
        self.element(id)?.attrs.get(name).map(String::as_str)
    }

    fn set_text(&mut self, id: ElementId, text: &str) {
        if let Some(element) = self.elements.get_mut(id) {
            element.text = Some(text.to_string());
        }
    }

    fn children(&self, id: ElementId) -> Vec<ElementId> {
        self.element(id)
            .map(|element| element.children.clone())
            .unwrap_or_default()
    }
}

pub fn fmt_num(value: f32) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == rounded.trunc() {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded}")
    }
}

#[allow(clippy::too_many_arguments)]
pub fn rect(
    surface: &mut dyn Surface,
    parent: ElementId,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    rx: f32,
    ry: f32,
) -> ElementId {
    let id = surface.append(parent, ElementKind::Rect);
    surface.set_attr(id, "x", &fmt_num(x));
    surface.set_attr(id, "y", &fmt_num(y));
    surface.set_attr(id, "width", &fmt_num(width));
    surface.set_attr(id, "height", &fmt_num(height));
    surface.set_attr(id, "rx", &fmt_num(rx));
    surface.set_attr(id, "ry", &fmt_num(ry));
    id
}

pub fn circle(surface: &mut dyn Surface, parent: ElementId, cx: f32, cy: f32, r: f32) -> ElementId {
    let id = surface.append(parent, ElementKind::Circle);
    surface.set_attr(id, "cx", &fmt_num(cx));
    surface.set_attr(id, "cy", &fmt_num(cy));
    surface.set_attr(id, "r", &fmt_num(r));
    id
}

pub fn text(surface: &mut dyn Surface, parent: ElementId, x: f32, y: f32, content: &str) -> ElementId {
    let id = surface.append(parent, ElementKind::Text);
    surface.set_attr(id, "x", &fmt_num(x));
    surface.set_attr(id, "y", &fmt_num(y));
    surface.set_text(id, content);
    id
}

pub fn path(surface: &mut dyn Surface, parent: ElementId, d: &str) -> ElementId {
    let id = surface.append(parent, ElementKind::Path);
    surface.set_attr(id, "d", d);
    id
}

pub fn translate(point: Point) -> String {
    format!("translate({},{})", fmt_num(point.x), fmt_num(point.y))
}

/// SVG path data through every point: `M x,y x,y ...`.
pub fn points_to_path(points: &[Point]) -> String {
    let mut d = String::new();
    for (idx, point) in points.iter().enumerate() {
        if idx == 0 {
            d.push('M');
        } else {
            d.push(' ');
        }
        d.push_str(&fmt_num(point.x));
        d.push(',');
        d.push_str(&fmt_num(point.y));
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_drops_whole_subtree() {
        let mut scene = Scene::new();
        let root = scene.root();
        let group = scene.append(root, ElementKind::Group);
        let inner = scene.append(group, ElementKind::Group);
        let leaf = rect(&mut scene, inner, 0.0, 0.0, 10.0, 10.0, 0.0, 0.0);
        assert_eq!(scene.len(), 4);

        scene.remove(group);
        assert_eq!(scene.len(), 1);
        assert!(!scene.contains(leaf));
        assert!(scene.children(root).is_empty());

        // A reused slot gets a fresh id; the old handles stay dead.
        let next = scene.append(root, ElementKind::Group);
        assert_ne!(next, group);
        assert_ne!(next, leaf);
        assert!(!scene.contains(group));
        scene.set_attr(group, "class", "stale");
        assert_eq!(scene.attr(next, "class"), None);
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut scene = Scene::new();
        let root = scene.root();
        let build = |scene: &mut Scene| {
            let group = scene.append(root, ElementKind::Group);
            for idx in 0..64 {
                rect(scene, group, idx as f32, 0.0, 1.0, 1.0, 0.0, 0.0);
            }
            group
        };
        let first = build(&mut scene);
        scene.remove(first);
        let capacity = scene.capacity();
        for _ in 0..100 {
            let group = build(&mut scene);
            assert_eq!(scene.len(), 66);
            scene.remove(group);
        }
        assert_eq!(scene.capacity(), capacity);
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn class_toggling_keeps_other_classes() {
        let mut scene = Scene::new();
        let root = scene.root();
        let id = scene.append(root, ElementKind::Path);
        scene.set_attr(id, "class", "link link-hosted-on");
        scene.set_class(id, "link-selected", true);
        scene.set_class(id, "link-selected", true);
        assert_eq!(scene.attr(id, "class"), Some("link link-hosted-on link-selected"));
        scene.set_class(id, "link-hosted-on", false);
        assert_eq!(scene.attr(id, "class"), Some("link link-selected"));
        assert!(scene.has_class(id, "link"));
        assert_eq!(scene.count_with_class("link-selected"), 1);
    }

    #[test]
    fn path_data_lists_every_point() {
        let points = [Point::new(0.0, 1.5), Point::new(10.0, 1.5), Point::new(10.0, 20.25)];
        assert_eq!(points_to_path(&points), "M0,1.5 10,1.5 10,20.25");
        assert_eq!(translate(Point::new(-3.0, 4.0)), "translate(-3,4)");
    }
}
