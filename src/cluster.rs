use crate::grid_map::{GridMap, GridTile, Rect};

/// Fixed-size square tiling of a grid. Clusters are stored in row-major order;
/// clusters on the right and bottom edges may be smaller than `cluster_size`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition {
    width: u32,
    height: u32,
    cluster_size: u32,
    clusters_x: u32,
    clusters_y: u32,
}

impl Partition {
    pub fn new(width: u32, height: u32, cluster_size: u32) -> Self {
        let cluster_size = cluster_size.max(1);
        Self {
            width,
            height,
            cluster_size,
            clusters_x: width.div_ceil(cluster_size),
            clusters_y: height.div_ceil(cluster_size),
        }
    }

    pub fn cluster_size(&self) -> u32 {
        self.cluster_size
    }

    pub fn len(&self) -> usize {
        self.clusters_x as usize * self.clusters_y as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of clusters along x and y.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.clusters_x, self.clusters_y)
    }

    pub fn index(&self, cx: u32, cy: u32) -> usize {
        cy as usize * self.clusters_x as usize + cx as usize
    }

    pub fn cluster_of(&self, tile: GridTile) -> usize {
        self.index(tile.x / self.cluster_size, tile.y / self.cluster_size)
    }

    pub fn rect(&self, idx: usize) -> Rect {
        let cx = (idx % self.clusters_x as usize) as u32;
        let cy = (idx / self.clusters_x as usize) as u32;
        let min_x = cx * self.cluster_size;
        let min_y = cy * self.cluster_size;
        Rect {
            min_x,
            min_y,
            max_x: (min_x + self.cluster_size).min(self.width) - 1,
            max_y: (min_y + self.cluster_size).min(self.height) - 1,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Border {
    /// Shared column border between a cluster and its right neighbour.
    Vertical,
    /// Shared row border between a cluster and the one below it.
    Horizontal,
}

/// Maximal run of tile pairs open on both sides of a cluster border.
/// `first_a` lies in `cluster_a` (left or top), `first_b` is its partner across the border.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Entrance {
    pub cluster_a: usize,
    pub cluster_b: usize,
    pub border: Border,
    pub first_a: GridTile,
    pub first_b: GridTile,
    pub width: u32,
}

impl Entrance {
    fn pair_at(&self, offset: u32) -> (GridTile, GridTile) {
        match self.border {
            Border::Vertical => (
                GridTile::new(self.first_a.x, self.first_a.y + offset),
                GridTile::new(self.first_b.x, self.first_b.y + offset),
            ),
            Border::Horizontal => (
                GridTile::new(self.first_a.x + offset, self.first_a.y),
                GridTile::new(self.first_b.x + offset, self.first_b.y),
            ),
        }
    }

    /// Tile pairs that become abstract nodes. Entrances at least `split_width`
    /// wide get a pair at each end, narrower ones a single pair in the middle.
    pub fn transitions(&self, split_width: u32) -> Vec<(GridTile, GridTile)> {
        if self.width >= split_width.max(2) {
            vec![self.pair_at(0), self.pair_at(self.width - 1)]
        } else {
            vec![self.pair_at((self.width - 1) / 2)]
        }
    }
}

/// Scans every border between 4-adjacent clusters and returns its entrances,
/// vertical borders first, each in scan order.
pub fn find_entrances(map: &GridMap, partition: &Partition) -> Vec<Entrance> {
    let (clusters_x, clusters_y) = partition.dimensions();
    let mut entrances = vec![];

    // Iterate over vertical border edges
    for cy in 0..clusters_y {
        for cx in 1..clusters_x {
            let cluster_a = partition.index(cx - 1, cy);
            let cluster_b = partition.index(cx, cy);
            let rect = partition.rect(cluster_b);
            let border_right_x = rect.min_x;
            let border_left_x = border_right_x - 1;
            scan_border(rect.min_y, rect.max_y, &mut entrances, |y| {
                let a = GridTile::new(border_left_x, y);
                let b = GridTile::new(border_right_x, y);
                (map.is_open(a) && map.is_open(b)).then_some(Entrance {
                    cluster_a,
                    cluster_b,
                    border: Border::Vertical,
                    first_a: a,
                    first_b: b,
                    width: 0,
                })
            });
        }
    }

    // Do the same for all horizontal border edges
    for cy in 1..clusters_y {
        for cx in 0..clusters_x {
            let cluster_a = partition.index(cx, cy - 1);
            let cluster_b = partition.index(cx, cy);
            let rect = partition.rect(cluster_b);
            let border_bottom_y = rect.min_y;
            let border_top_y = border_bottom_y - 1;
            scan_border(rect.min_x, rect.max_x, &mut entrances, |x| {
                let a = GridTile::new(x, border_top_y);
                let b = GridTile::new(x, border_bottom_y);
                (map.is_open(a) && map.is_open(b)).then_some(Entrance {
                    cluster_a,
                    cluster_b,
                    border: Border::Horizontal,
                    first_a: a,
                    first_b: b,
                    width: 0,
                })
            });
        }
    }

    entrances
}

/// Walks one border segment, `open_pair` describing the pair at a given offset
/// when both tiles are open. Consecutive open pairs are merged into one entrance.
fn scan_border(
    first: u32,
    last: u32,
    entrances: &mut Vec<Entrance>,
    open_pair: impl Fn(u32) -> Option<Entrance>,
) {
    let mut current: Option<Entrance> = None;
    for i in first..=last {
        match (open_pair(i), current.as_mut()) {
            (Some(_), Some(entrance)) => entrance.width += 1,
            (Some(mut entrance), None) => {
                entrance.width = 1;
                current = Some(entrance);
            }
            (None, _) => {
                if let Some(entrance) = current.take() {
                    entrances.push(entrance);
                }
            }
        }
    }
    if let Some(entrance) = current {
        entrances.push(entrance);
    }
}
