use plotters::prelude::*;
use std::fs;
use std::path::Path as FsPath;

use crate::graph::Graph;
use crate::grid_map::GridTile;
use crate::path::Path;

const TILE_PX: u32 = 12;
const LAYER_COLORS: [RGBColor; 4] = [
    RGBColor(120, 160, 220),
    RGBColor(60, 110, 200),
    RGBColor(20, 60, 160),
    RGBColor(10, 20, 90),
];

fn layer_color(level: usize) -> RGBColor {
    LAYER_COLORS[level.min(LAYER_COLORS.len() - 1)]
}

fn center(tile: GridTile) -> (i32, i32) {
    ((tile.x * TILE_PX + TILE_PX / 2) as i32, (tile.y * TILE_PX + TILE_PX / 2) as i32)
}

/// Renders a graph's map with the cluster borders of every layer, its abstract
/// nodes coloured by the highest layer they reach, and `path` as a polyline.
pub fn draw_graph(graph: &Graph<'_>, path: &Path, out: &FsPath) {
    let map = graph.map();
    let (width_px, height_px) = (map.width() * TILE_PX, map.height() * TILE_PX);
    if let Some(dir) = out.parent() {
        fs::create_dir_all(dir).unwrap();
    }
    let root = BitMapBackend::new(out, (width_px, height_px)).into_drawing_area();
    root.fill(&WHITE).unwrap();

    let blocked = (0..map.height())
        .flat_map(|y| (0..map.width()).map(move |x| GridTile::new(x, y)))
        .filter(|&tile| !map.is_open(tile));
    for tile in blocked {
        let (x0, y0) = ((tile.x * TILE_PX) as i32, (tile.y * TILE_PX) as i32);
        let cell = [(x0, y0), (x0 + TILE_PX as i32, y0 + TILE_PX as i32)];
        root.draw(&Rectangle::new(cell, BLACK.filled())).unwrap();
    }

    // coarser layers get thicker borders
    for level in 0..graph.layer_count() {
        let partition = &graph.layer(level).partition;
        let style = layer_color(level).stroke_width(level as u32 + 1);
        for idx in 0..partition.len() {
            let rect = partition.rect(idx);
            let corners = [
                ((rect.min_x * TILE_PX) as i32, (rect.min_y * TILE_PX) as i32),
                (((rect.max_x + 1) * TILE_PX) as i32, ((rect.max_y + 1) * TILE_PX) as i32),
            ];
            root.draw(&Rectangle::new(corners, style)).unwrap();
        }
    }

    for id in 0..graph.node_count() {
        let node = graph.node(id);
        let marker = Circle::new(center(node.tile), TILE_PX as i32 / 3, layer_color(node.top_layer).filled());
        root.draw(&marker).unwrap();
    }

    if !path.is_empty() {
        let points: Vec<_> = path.tiles().iter().map(|&t| center(t)).collect();
        root.draw(&PathElement::new(points, RED.stroke_width(2))).unwrap();
    }

    root.present().unwrap();
}
