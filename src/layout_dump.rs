use crate::layout::{Direction, Grid, Layout};
use crate::topology::Topology;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub bbox: [f32; 4],
    pub nodes: Vec<NodeDump>,
    pub links: Vec<LinkDump>,
    pub grid: Option<GridDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: String,
    pub node_type: Option<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub network_id: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDump {
    pub id: String,
    pub relationship_type: String,
    pub from: String,
    pub to: String,
    pub from_side: Direction,
    pub to_side: Direction,
    pub is_network: bool,
    pub network_id: Option<usize>,
    pub points: Vec<[f32; 2]>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridDump {
    pub step: f32,
    pub cols: usize,
    pub rows: usize,
    pub obstacle_cells: usize,
    pub visited_cells: usize,
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout, topology: Option<&Topology>, grid: Option<&Grid>) -> Self {
        let nodes = layout
            .nodes
            .iter()
            .map(|node| NodeDump {
                id: node.id.clone(),
                node_type: topology
                    .and_then(|t| t.node_templates.get(&node.id))
                    .map(|template| template.type_name.clone()),
                x: node.coordinate.x,
                y: node.coordinate.y,
                width: node.bbox.width(),
                height: node.bbox.height(),
                network_id: node.network_id,
            })
            .collect();

        let links = layout
            .links
            .iter()
            .map(|link| LinkDump {
                id: link.id.clone(),
                relationship_type: link.relationship_type.clone(),
                from: link.source.node.clone(),
                to: link.target.node.clone(),
                from_side: link.source.direction,
                to_side: link.target.direction,
                is_network: link.is_network,
                network_id: link.network_id,
                points: link.route.iter().map(|p| [p.x, p.y]).collect(),
            })
            .collect();

        let grid = grid.map(|grid| GridDump {
            step: grid.step(),
            cols: grid.cols(),
            rows: grid.rows(),
            obstacle_cells: grid.obstacle_cells(),
            visited_cells: grid.visited_cells(),
        });

        let bbox = layout.bbox;
        LayoutDump {
            width: bbox.width(),
            height: bbox.height(),
            bbox: [bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y],
            nodes,
            links,
            grid,
        }
    }
}

pub fn write_layout_dump(
    path: &Path,
    layout: &Layout,
    topology: Option<&Topology>,
    grid: Option<&Grid>,
) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout, topology, grid);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
