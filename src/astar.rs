use ordered_float::OrderedFloat;
use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
};

use crate::grid_map::{Connectivity, GridMap, GridTile, Rect, path_cost};
use crate::path::Path;

/// Open-list entry. Among equal f-values the most recently pushed entry pops first.
type OpenEntry = (Reverse<OrderedFloat<f64>>, u64, GridTile);

// includes both start and destination elements
fn reconstruct_path(came_from: &HashMap<GridTile, GridTile>, mut current: GridTile) -> Vec<GridTile> {
    let mut total_path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        current = prev;
        total_path.push(current);
    }
    total_path.reverse();
    total_path
}

/// Grid A* restricted to `bounds`. Returns the optimal path and its cost, which
/// is recounted from the path's steps so both directions of a query agree.
pub fn astar(
    start: GridTile,
    goal: GridTile,
    map: &GridMap,
    bounds: Rect,
    connectivity: Connectivity,
) -> Option<(Vec<GridTile>, f64)> {
    if !map.is_open(start) || !map.is_open(goal) || !bounds.contains(start) || !bounds.contains(goal) {
        return None;
    }

    let mut came_from = HashMap::<GridTile, GridTile>::new();

    let mut g_score = HashMap::<GridTile, f64>::new();
    g_score.insert(start, 0.0);

    let mut pushed = 0u64;
    let mut open_set = BinaryHeap::<OpenEntry>::new();
    open_set.push((Reverse(OrderedFloat(connectivity.heuristic(start, goal))), pushed, start));

    while let Some((Reverse(OrderedFloat(f)), _, current)) = open_set.pop() {
        let current_g = g_score[&current];
        if current == goal {
            let path = reconstruct_path(&came_from, current);
            let cost = path_cost(&path);
            return Some((path, cost));
        }
        // stale entry, a cheaper route was found after it was pushed
        if f > current_g + connectivity.heuristic(current, goal) {
            continue;
        }

        for (neighbor, cost) in map.neighbors(current, bounds, connectivity) {
            let tentative_g_score = current_g + cost;
            if tentative_g_score < *g_score.get(&neighbor).unwrap_or(&f64::INFINITY) {
                came_from.insert(neighbor, current);
                g_score.insert(neighbor, tentative_g_score);
                let neighbor_f_score = tentative_g_score + connectivity.heuristic(neighbor, goal);
                pushed += 1;
                open_set.push((Reverse(OrderedFloat(neighbor_f_score)), pushed, neighbor));
            }
        }
    }
    None
}

/// Unrestricted A* over the whole map. Empty path when no route exists.
pub fn find_path_flat(start: GridTile, goal: GridTile, map: &GridMap, connectivity: Connectivity) -> Path {
    match astar(start, goal, map, map.bounds(), connectivity) {
        Some((tiles, _)) => Path::new(tiles),
        None => Path::empty(),
    }
}
