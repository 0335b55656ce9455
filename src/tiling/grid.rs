//! Tile placement with overlap support.

use std::fmt;

/// How tiles are placed near the raster edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TilePolicy {
    /// Full-size tiles only; the final partial strip at each edge is dropped.
    Training,
    /// Tiles start anywhere inside the raster; overhanging windows are zero-padded.
    Inference,
}

impl fmt::Display for TilePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Training => write!(f, "training"),
            Self::Inference => write!(f, "inference"),
        }
    }
}

/// A tile placement in raster pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Row-major index within the grid.
    pub index: usize,
    /// Column of the tile origin.
    pub x: u32,
    /// Row of the tile origin.
    pub y: u32,
    /// Width of the part that lies inside the raster.
    pub width: u32,
    /// Height of the part that lies inside the raster.
    pub height: u32,
    /// Edge length of the window handed to consumers.
    pub patch_size: u32,
}

impl Tile {
    /// Whether the window extends past the raster and needs padding.
    pub const fn is_padded(&self) -> bool {
        self.width < self.patch_size || self.height < self.patch_size
    }

    /// Stable name used for per-tile output files.
    pub fn stem(&self, prefix: &str) -> String {
        format!("{prefix}_{}_{}", self.x, self.y)
    }
}

/// Deterministic tile layout for a raster.
#[derive(Debug, Clone)]
pub struct TileGrid {
    width: u32,
    height: u32,
    patch_size: u32,
    policy: TilePolicy,
    xs: Vec<u32>,
    ys: Vec<u32>,
}

impl TileGrid {
    /// Lay out tiles over a `width x height` raster.
    ///
    /// # Arguments
    ///
    /// * `width`, `height` - Raster dimensions in pixels
    /// * `patch_size` - Tile edge length in pixels
    /// * `stride` - Distance between tile origins in pixels
    /// * `policy` - Edge handling
    pub fn new(width: u32, height: u32, patch_size: u32, stride: u32, policy: TilePolicy) -> Self {
        Self {
            width,
            height,
            patch_size,
            policy,
            xs: axis_origins(width, patch_size, stride, policy),
            ys: axis_origins(height, patch_size, stride, policy),
        }
    }

    /// Edge policy in use.
    pub const fn policy(&self) -> TilePolicy {
        self.policy
    }

    /// Tile edge length.
    pub const fn patch_size(&self) -> u32 {
        self.patch_size
    }

    /// Origins along the x axis.
    pub fn x_origins(&self) -> &[u32] {
        &self.xs
    }

    /// Origins along the y axis.
    pub fn y_origins(&self) -> &[u32] {
        &self.ys
    }

    /// Total number of tiles.
    pub fn len(&self) -> usize {
        self.xs.len() * self.ys.len()
    }

    /// Whether the grid has no tiles.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        self.ys
            .iter()
            .flat_map(move |&y| self.xs.iter().map(move |&x| (x, y)))
            .enumerate()
            .map(|(index, (x, y))| Tile {
                index,
                x,
                y,
                width: self.patch_size.min(self.width - x),
                height: self.patch_size.min(self.height - y),
                patch_size: self.patch_size,
            })
    }
}

/// Tile origins along one axis.
fn axis_origins(dimension: u32, patch_size: u32, stride: u32, policy: TilePolicy) -> Vec<u32> {
    if stride == 0 || patch_size == 0 {
        return Vec::new();
    }

    let limit = match policy {
        TilePolicy::Training => dimension.saturating_sub(patch_size),
        TilePolicy::Inference => dimension,
    };

    (0..limit).step_by(stride as usize).collect()
}

/// Training-policy tile count along one axis: `ceil((D - P) / S)` for `D > P`.
pub fn training_tile_count(dimension: u32, patch_size: u32, stride: u32) -> usize {
    if stride == 0 || dimension <= patch_size {
        return 0;
    }
    (dimension - patch_size).div_ceil(stride) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_drops_partial_strip() {
        let grid = TileGrid::new(1000, 1000, 512, 256, TilePolicy::Training);
        assert_eq!(grid.x_origins(), &[0, 256]);
        assert_eq!(grid.y_origins(), &[0, 256]);
        assert_eq!(grid.len(), 4);
        assert!(grid.tiles().all(|t| !t.is_padded()));
    }

    #[test]
    fn test_inference_covers_every_pixel() {
        let grid = TileGrid::new(1000, 1000, 512, 256, TilePolicy::Inference);
        assert_eq!(grid.x_origins(), &[0, 256, 512, 768]);
        let last = grid.tiles().last();
        assert_eq!(
            last,
            Some(Tile {
                index: 15,
                x: 768,
                y: 768,
                width: 232,
                height: 232,
                patch_size: 512,
            })
        );
    }

    #[test]
    fn test_training_count_formula_matches_grid() {
        let cases = [
            (1000, 512, 256),
            (1024, 512, 256),
            (513, 512, 256),
            (5000, 640, 320),
            (777, 100, 33),
        ];
        for (d, p, s) in cases {
            let grid = TileGrid::new(d, d, p, s, TilePolicy::Training);
            assert_eq!(
                grid.x_origins().len(),
                training_tile_count(d, p, s),
                "D={d} P={p} S={s}"
            );
        }
    }

    #[test]
    fn test_raster_not_larger_than_patch_has_no_training_tiles() {
        assert!(TileGrid::new(512, 512, 512, 256, TilePolicy::Training).is_empty());
        assert!(TileGrid::new(300, 300, 512, 256, TilePolicy::Training).is_empty());
    }

    #[test]
    fn test_inference_small_raster_single_padded_tile() {
        let grid = TileGrid::new(300, 200, 512, 256, TilePolicy::Inference);
        let tiles: Vec<Tile> = grid.tiles().collect();
        assert_eq!(tiles.len(), 1);
        assert!(tiles[0].is_padded());
        assert_eq!((tiles[0].width, tiles[0].height), (300, 200));
    }

    #[test]
    fn test_tiles_row_major_order() {
        let grid = TileGrid::new(1000, 600, 512, 256, TilePolicy::Inference);
        let origins: Vec<(u32, u32)> = grid.tiles().map(|t| (t.x, t.y)).collect();
        assert_eq!(
            origins,
            vec![
                (0, 0),
                (256, 0),
                (512, 0),
                (768, 0),
                (0, 256),
                (256, 256),
                (512, 256),
                (768, 256),
                (0, 512),
                (256, 512),
                (512, 512),
                (768, 512),
            ]
        );
    }

    #[test]
    fn test_zero_stride_yields_nothing() {
        assert!(TileGrid::new(1000, 1000, 512, 0, TilePolicy::Inference).is_empty());
    }

    #[test]
    fn test_tile_stem() {
        let grid = TileGrid::new(1000, 1000, 512, 256, TilePolicy::Training);
        let tile = grid.tiles().nth(1);
        assert_eq!(tile.map(|t| t.stem("patch")), Some("patch_256_0".to_string()));
    }
}
