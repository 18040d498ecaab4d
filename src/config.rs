use crate::layout::routing::RoutingConfig;
use crate::renderer::RendererMetrics;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Number of distinct network styles; network ids wrap modulo this.
    pub network_styles: usize,
    /// Vertical gap between stacked network rails.
    pub network_spacing: f32,
    pub routing: RoutingConfig,
    /// Overrides the active node renderer's size and spacing.
    pub renderer: Option<RendererMetrics>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            network_styles: 10,
            network_spacing: 14.0,
            routing: RoutingConfig::default(),
            renderer: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::classic();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    background: Option<String>,
    node_fill: Option<String>,
    node_border: Option<String>,
    node_text_color: Option<String>,
    selected_border: Option<String>,
    link_color: Option<String>,
    depends_on_color: Option<String>,
    hosted_on_color: Option<String>,
    badge_fill: Option<String>,
    grid_opacity: Option<f32>,
    network_colors: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoutingConfigFile {
    enable_grid_router: Option<bool>,
    turn_penalty: Option<f32>,
    max_steps: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    network_styles: Option<usize>,
    network_spacing: Option<f32>,
    routing: Option<RoutingConfigFile>,
    renderer: Option<RendererMetrics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f32>,
    height: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfigFile>,
    render: Option<RenderConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parses a JSON5 config document (plain JSON is accepted too).
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = json5::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        match theme_name {
            "dark" => config.theme = Theme::dark(),
            "default" | "classic" => config.theme = Theme::classic(),
            other => tracing::warn!(theme = other, "unknown theme, keeping default"),
        }
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
        if let Some(v) = vars.node_fill {
            config.theme.node_fill = v;
        }
        if let Some(v) = vars.node_border {
            config.theme.node_border = v;
        }
        if let Some(v) = vars.node_text_color {
            config.theme.node_text_color = v;
        }
        if let Some(v) = vars.selected_border {
            config.theme.selected_border = v;
        }
        if let Some(v) = vars.link_color {
            config.theme.link_color = v;
        }
        if let Some(v) = vars.depends_on_color {
            config.theme.depends_on_color = v;
        }
        if let Some(v) = vars.hosted_on_color {
            config.theme.hosted_on_color = v;
        }
        if let Some(v) = vars.badge_fill {
            config.theme.badge_fill = v;
        }
        if let Some(v) = vars.grid_opacity {
            config.theme.grid_opacity = v;
        }
        if let Some(v) = vars.network_colors
            && !v.is_empty()
        {
            config.theme.network_colors = v;
        }
    }

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.network_styles {
            config.layout.network_styles = v.max(1);
        }
        if let Some(v) = layout.network_spacing {
            config.layout.network_spacing = v;
        }
        if let Some(routing) = layout.routing {
            if let Some(v) = routing.enable_grid_router {
                config.layout.routing.enable_grid_router = v;
            }
            if let Some(v) = routing.turn_penalty {
                config.layout.routing.turn_penalty = v;
            }
            if let Some(v) = routing.max_steps {
                config.layout.routing.max_steps = v;
            }
        }
        if layout.renderer.is_some() {
            config.layout.renderer = layout.renderer;
        }
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.width {
            config.render.width = v;
        }
        if let Some(v) = render.height {
            config.render.height = v;
        }
    }

    config.render.background = config.theme.background.clone();

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let config = load_config(None).unwrap();
        assert_eq!(config.layout.network_styles, 10);
        assert_eq!(config.layout.network_spacing, 14.0);
        assert!(config.layout.routing.enable_grid_router);
        assert_eq!(config.render.width, 1200.0);
    }

    #[test]
    fn json5_overrides_apply() {
        let config = parse_config(
            r##"{
                // comments are fine
                theme: "dark",
                themeVariables: { dependsOnColor: "#00FF00", networkColors: ["#111111"] },
                layout: { networkStyles: 0, routing: { turnPenalty: 5 } },
                render: { width: 640 },
            }"##,
        )
        .unwrap();
        assert_eq!(config.theme.depends_on_color, "#00FF00");
        assert_eq!(config.theme.network_colors, vec!["#111111".to_string()]);
        assert_eq!(config.render.background, Theme::dark().background);
        assert_eq!(config.layout.network_styles, 1);
        assert_eq!(config.layout.routing.turn_penalty, 5.0);
        assert_eq!(config.render.width, 640.0);
        assert_eq!(config.render.height, 800.0);
    }

    #[test]
    fn renderer_metrics_override() {
        let config = parse_config(
            r#"{"layout": {"renderer": {"width": 120, "height": 40,
                "distanceBetweenNodeHorizontal": 20, "distanceBetweenNodeVertical": 30,
                "distanceBetweenBranchHorizontal": 50}}}"#,
        )
        .unwrap();
        let metrics = config.layout.renderer.unwrap();
        assert_eq!(metrics.width, 120.0);
        assert_eq!(metrics.grid_step(), 5.0);
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(parse_config("{ theme: ").is_err());
    }
}
