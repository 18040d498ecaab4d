use serde::{Deserialize, Serialize};

pub const NETWORK_PALETTE_SIZE: usize = 10;

const CLASSIC_NETWORK_COLORS: [&str; NETWORK_PALETTE_SIZE] = [
    "#1F77B4", "#FF7F0E", "#2CA02C", "#D62728", "#9467BD", "#8C564B", "#E377C2", "#7F7F7F",
    "#BCBD22", "#17BECF",
];

const DARK_NETWORK_COLORS: [&str; NETWORK_PALETTE_SIZE] = [
    "#6BAED6", "#FDAE6B", "#74C476", "#FC9272", "#BCBDDC", "#C49C94", "#F7B6D2", "#C7C7C7",
    "#DBDB8D", "#9EDAE5",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub background: String,
    pub node_fill: String,
    pub node_border: String,
    pub node_text_color: String,
    pub selected_border: String,
    pub abstract_fill: String,
    pub link_color: String,
    pub depends_on_color: String,
    pub hosted_on_color: String,
    pub badge_fill: String,
    pub badge_text_color: String,
    pub grid_visited: String,
    pub grid_obstacle: String,
    pub grid_free: String,
    pub grid_opacity: f32,
    pub state_colors: StateColors,
    pub network_colors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateColors {
    pub started: String,
    pub failed: String,
    pub pending: String,
    pub unknown: String,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "\"Helvetica Neue\", Helvetica, Arial, sans-serif".to_string(),
            font_size: 13.0,
            background: "#FFFFFF".to_string(),
            node_fill: "#F5F5F5".to_string(),
            node_border: "#A0A0A0".to_string(),
            node_text_color: "#333333".to_string(),
            selected_border: "#F0AD4E".to_string(),
            abstract_fill: "#FCF8E3".to_string(),
            link_color: "#555555".to_string(),
            depends_on_color: "#048204".to_string(),
            hosted_on_color: "#0000FF".to_string(),
            badge_fill: "#337AB7".to_string(),
            badge_text_color: "#FFFFFF".to_string(),
            grid_visited: "green".to_string(),
            grid_obstacle: "blue".to_string(),
            grid_free: "red".to_string(),
            grid_opacity: 0.3,
            state_colors: StateColors {
                started: "#5CB85C".to_string(),
                failed: "#D9534F".to_string(),
                pending: "#F0AD4E".to_string(),
                unknown: "#999999".to_string(),
            },
            network_colors: CLASSIC_NETWORK_COLORS.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn dark() -> Self {
        Self {
            background: "#1E1E1E".to_string(),
            node_fill: "#2D2D30".to_string(),
            node_border: "#5A5A5E".to_string(),
            node_text_color: "#E0E0E0".to_string(),
            abstract_fill: "#3A3520".to_string(),
            link_color: "#B0B0B0".to_string(),
            depends_on_color: "#3CC43C".to_string(),
            hosted_on_color: "#6C8CFF".to_string(),
            network_colors: DARK_NETWORK_COLORS.iter().map(|c| c.to_string()).collect(),
            ..Self::classic()
        }
    }

    /// Color for a network style index; wraps around the palette.
    pub fn network_color(&self, style: usize) -> &str {
        if self.network_colors.is_empty() {
            return &self.link_color;
        }
        &self.network_colors[style % self.network_colors.len()]
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}
