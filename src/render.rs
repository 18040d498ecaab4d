#[cfg(feature = "png")]
use crate::config::RenderConfig;
use crate::scene::{ElementId, Scene, Surface};
use crate::theme::Theme;
use anyhow::Result;
use std::fmt::Write as _;
use std::path::Path;

/// Serializes a scene to a standalone SVG document styled by `theme`.
pub fn render_svg(scene: &Scene, theme: &Theme) -> String {
    let mut svg = String::new();
    let root = scene.root();
    svg.push_str("<svg xmlns=\"http://www.w3.org/2000/svg\"");
    push_attrs(&mut svg, scene, root);
    svg.push('>');
    svg.push_str("<style>");
    svg.push_str(&stylesheet(theme));
    svg.push_str("</style>");
    let _ = write!(
        svg,
        "<rect class=\"topology-background\" width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        escape_xml(&theme.background)
    );
    for child in scene.children(root) {
        write_element(&mut svg, scene, child);
    }
    svg.push_str("</svg>");
    svg
}

fn write_element(out: &mut String, scene: &Scene, id: ElementId) {
    let Some(element) = scene.element(id) else {
        return;
    };
    let tag = element.kind().tag();
    out.push('<');
    out.push_str(tag);
    push_attrs(out, scene, id);
    let children = element.child_ids();
    let text = element.text();
    if children.is_empty() && text.is_none() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    if let Some(text) = text {
        out.push_str(&escape_xml(text));
    }
    for child in children {
        write_element(out, scene, *child);
    }
    let _ = write!(out, "</{tag}>");
}

fn push_attrs(out: &mut String, scene: &Scene, id: ElementId) {
    let Some(element) = scene.element(id) else {
        return;
    };
    for (name, value) in element.attrs() {
        let _ = write!(out, " {}=\"{}\"", name, escape_xml(value));
    }
}

fn stylesheet(theme: &Theme) -> String {
    let mut css = String::new();
    let _ = write!(
        css,
        ".topology-svg{{font-family:{};font-size:{}px;}}",
        theme.font_family, theme.font_size
    );
    let _ = write!(
        css,
        ".node-template .background{{fill:{};stroke:{};stroke-width:1;}}",
        theme.node_fill, theme.node_border
    );
    let _ = write!(
        css,
        ".node-template.selected .background{{stroke:{};stroke-width:2;}}",
        theme.selected_border
    );
    let _ = write!(
        css,
        ".node-template.node-abstract .background{{fill:{};stroke-dasharray:4 2;}}",
        theme.abstract_fill
    );
    css.push_str(".selector{fill:#000000;fill-opacity:0;stroke:none;cursor:pointer;}");
    let _ = write!(
        css,
        ".topology-svg-name,.topology-svg-type{{fill:{};}}.topology-svg-type{{font-size:{}px;opacity:0.7;}}",
        theme.node_text_color,
        (theme.font_size - 2.0).max(6.0)
    );
    let _ = write!(
        css,
        ".link{{fill:none;stroke:{};stroke-width:1.5;}}",
        theme.link_color
    );
    let _ = write!(css, ".link-hosted-on{{stroke:{};}}", theme.hosted_on_color);
    let _ = write!(
        css,
        ".link-depends-on{{stroke:{};stroke-dasharray:6 3;}}",
        theme.depends_on_color
    );
    css.push_str(".link-network{fill:none;stroke-width:3;}.link-selected{stroke-width:2.5;}");
    for (idx, color) in theme.network_colors.iter().enumerate() {
        let _ = write!(css, ".link-network-{idx}{{stroke:{color};}}");
    }
    let _ = write!(
        css,
        ".topology-svg-icon-circle{{fill:{};}}.topology-svg-icon{{fill:{};text-anchor:middle;dominant-baseline:central;}}",
        theme.badge_fill, theme.badge_text_color
    );
    let states = &theme.state_colors;
    for (state, color) in [
        ("started", &states.started),
        ("failed", &states.failed),
        ("pending", &states.pending),
        ("unknown", &states.unknown),
    ] {
        let _ = write!(css, ".runtime-state.state-{state}{{fill:{color};}}");
    }
    for (state, color) in [
        ("visited", &theme.grid_visited),
        ("obstacle", &theme.grid_obstacle),
        ("free", &theme.grid_free),
    ] {
        let _ = write!(
            css,
            ".grid-cell-{state}{{fill:{color};fill-opacity:{};}}",
            theme.grid_opacity
        );
    }
    css
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .ok_or_else(|| anyhow::anyhow!("Invalid render size {}x{}", render_cfg.width, render_cfg.height))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

pub fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
