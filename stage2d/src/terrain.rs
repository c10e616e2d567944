use std::collections::BTreeMap;

use crate::assets::ImageHandle;
use crate::math::Vec2;

/// A single background tile, identified by `(row, column)`.
///
/// Rows advance along world X, columns along world Y.
#[derive(Clone, Debug, PartialEq)]
pub struct Tile {
    pub row: i32,
    pub column: i32,
    pub image: Option<ImageHandle>,
    pub highlighted: bool,
}

impl Tile {
    pub fn new(row: i32, column: i32, image: Option<ImageHandle>) -> Self {
        Self {
            row,
            column,
            image,
            highlighted: false,
        }
    }

    pub fn key(&self) -> (i32, i32) {
        (self.row, self.column)
    }
}

/// Sparse tile background. At most one tile per `(row, column)`.
#[derive(Clone, Debug)]
pub struct Terrain {
    tile_size: Vec2,
    tiles: BTreeMap<(i32, i32), Tile>,
}

impl Terrain {
    pub fn new() -> Self {
        Self::with_tile_size(Vec2::splat(64.0))
    }

    pub fn with_tile_size(tile_size: Vec2) -> Self {
        Self {
            tile_size,
            tiles: BTreeMap::new(),
        }
    }

    pub fn tile_size(&self) -> Vec2 {
        self.tile_size
    }

    pub fn set_tile_size(&mut self, tile_size: Vec2) {
        self.tile_size = tile_size;
    }

    /// Insert a tile, replacing whatever occupied its key.
    pub fn set_tile(&mut self, tile: Tile) -> Option<Tile> {
        self.tiles.insert(tile.key(), tile)
    }

    pub fn set_tiles(&mut self, tiles: impl IntoIterator<Item = Tile>) {
        for tile in tiles {
            self.set_tile(tile);
        }
    }

    pub fn tile(&self, row: i32, column: i32) -> Option<&Tile> {
        self.tiles.get(&(row, column))
    }

    pub fn tile_mut(&mut self, row: i32, column: i32) -> Option<&mut Tile> {
        self.tiles.get_mut(&(row, column))
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Mark a tile as highlighted (or not), creating an image-less tile when the key is empty.
    pub fn set_tile_highlight(&mut self, row: i32, column: i32, highlighted: bool) -> &mut Tile {
        let tile = self
            .tiles
            .entry((row, column))
            .or_insert_with(|| Tile::new(row, column, None));
        tile.highlighted = highlighted;
        tile
    }

    pub fn clear(&mut self) {
        self.tiles.clear();
    }
}

impl Default for Terrain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_an_occupied_key_replaces_the_tile() {
        let mut terrain = Terrain::new();
        let grass = ImageHandle::pending("grass");
        terrain.set_tile(Tile::new(2, 3, None));
        let replaced = terrain.set_tile(Tile::new(2, 3, Some(grass.clone())));

        assert_eq!(terrain.len(), 1);
        assert_eq!(replaced.map(|tile| tile.image), Some(None));
        assert_eq!(terrain.tile(2, 3).and_then(|t| t.image.clone()), Some(grass));
    }

    #[test]
    fn set_tiles_fills_a_block() {
        let mut terrain = Terrain::new();
        terrain.set_tiles((-2..=2).flat_map(|i| (-2..=2).map(move |j| Tile::new(i, j, None))));
        assert_eq!(terrain.len(), 25);
        assert_eq!(terrain.tile_size(), Vec2::new(64.0, 64.0));
    }

    #[test]
    fn highlight_creates_missing_tiles() {
        let mut terrain = Terrain::new();
        terrain.set_tile_highlight(7, -1, true);
        let tile = terrain.tile(7, -1).expect("tile created");
        assert!(tile.highlighted);
        assert!(tile.image.is_none());

        terrain.set_tile_highlight(7, -1, false);
        assert_eq!(terrain.len(), 1);
        assert!(!terrain.tile(7, -1).map(|t| t.highlighted).unwrap_or(true));
    }

    #[test]
    fn clear_drops_every_tile() {
        let mut terrain = Terrain::with_tile_size(Vec2::new(32.0, 16.0));
        terrain.set_tile(Tile::new(0, 0, None));
        terrain.clear();
        assert!(terrain.is_empty());
        assert_eq!(terrain.tile_size(), Vec2::new(32.0, 16.0));
    }
}
