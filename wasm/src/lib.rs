use serde::Deserialize;
use topology_renderer::{RenderOptions, Theme, render_with_options};
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopologyRenderOptions {
    theme: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    runtime: Option<bool>,
    show_grid: Option<bool>,
    selected: Option<String>,
    width: Option<f32>,
    height: Option<f32>,
}

fn build_render_options(options: TopologyRenderOptions) -> RenderOptions {
    let mut render_options = if options.theme.as_deref() == Some("dark") {
        RenderOptions::dark()
    } else {
        RenderOptions::classic()
    };

    let theme: &mut Theme = &mut render_options.config.theme;
    if let Some(font_family) = options.font_family {
        theme.font_family = font_family;
    }
    if let Some(font_size) = options.font_size {
        theme.font_size = font_size;
    }
    if let Some(width) = options.width {
        render_options.config.render.width = width;
    }
    if let Some(height) = options.height {
        render_options.config.render.height = height;
    }
    render_options.runtime = options.runtime.unwrap_or(false);
    render_options.show_grid = options.show_grid.unwrap_or(false);
    render_options.selected = options.selected;

    render_options
}

#[wasm_bindgen]
pub fn render_topology_svg(topology_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<TopologyRenderOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?
    } else {
        TopologyRenderOptions::default()
    };

    let render_options = build_render_options(options);
    render_with_options(topology_json, render_options).map_err(|error| JsValue::from_str(&error.to_string()))
}
