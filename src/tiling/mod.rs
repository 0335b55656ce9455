//! Tile layout over large rasters.

mod grid;

pub use grid::{Tile, TileGrid, TilePolicy, training_tile_count};
