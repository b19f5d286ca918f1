//! Mapping between the cell lattice and screen pixels.

use egui::{Pos2, Rect, Vec2, pos2, vec2};

use crate::component::GridPos;
use crate::config::GridConfig;

/// Background grid lines in tile-local pixels, relative to the top-left corner of the board.
#[derive(Debug, Clone, PartialEq)]
pub struct GridTile {
    pub zoom: f32,
    pub extent: (u32, u32),
    pub size: Vec2,
    pub minor: Vec<[Pos2; 2]>,
    pub major: Vec<[Pos2; 2]>,
}

impl GridTile {
    fn build(config: &GridConfig, zoom: f32) -> Self {
        let cell = config.cell_size * zoom;
        let (w, h) = config.extent;
        let size = vec2(w as f32 * cell, h as f32 * cell);
        let every = config.major_every.max(1);

        let mut minor = Vec::new();
        let mut major = Vec::new();
        for x in 0..=w {
            let px = x as f32 * cell;
            let line = [pos2(px, 0.0), pos2(px, size.y)];
            if x % every == 0 {
                major.push(line);
            } else {
                minor.push(line);
            }
        }
        for y in 0..=h {
            let py = y as f32 * cell;
            let line = [pos2(0.0, py), pos2(size.x, py)];
            if y % every == 0 {
                major.push(line);
            } else {
                minor.push(line);
            }
        }

        Self {
            zoom,
            extent: config.extent,
            size,
            minor,
            major,
        }
    }
}

pub struct Grid {
    config: GridConfig,
    viewport: Vec2,
    zoom: f32,
    pan: Vec2,
    /// Screen position of grid origin. Derived from the fields above.
    offset: Vec2,
    tile: Option<GridTile>,
    tile_builds: usize,
}

impl Grid {
    pub fn new(config: GridConfig, viewport: Vec2) -> Self {
        let mut grid = Self {
            config,
            viewport,
            zoom: 1.0,
            pan: Vec2::ZERO,
            offset: Vec2::ZERO,
            tile: None,
            tile_builds: 0,
        };
        grid.recenter();
        grid
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn pan_offset(&self) -> Vec2 {
        self.pan
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    /// Pixel size of one cell at the current zoom.
    pub fn cell_pixels(&self) -> f32 {
        self.config.cell_size * self.zoom
    }

    fn board_pixels(&self) -> Vec2 {
        let (w, h) = self.config.extent;
        vec2(w as f32, h as f32) * self.cell_pixels()
    }

    /// Keep the board centered in the viewport, shifted by the user pan.
    fn recenter(&mut self) {
        self.offset = (self.viewport - self.board_pixels()) / 2.0 + self.pan;
    }

    pub fn resize(&mut self, viewport: Vec2) {
        if self.viewport != viewport {
            self.viewport = viewport;
            self.recenter();
        }
    }

    pub fn set_extent(&mut self, extent: (u32, u32)) {
        self.config.extent = extent;
        self.recenter();
    }

    /// Clamp and apply a zoom level. With a pivot, the grid point under the pivot stays put.
    pub fn set_zoom(&mut self, zoom: f32, pivot: Option<Pos2>) {
        let old = self.zoom;
        self.zoom = zoom.clamp(self.config.min_zoom, self.config.max_zoom);

        if let Some(pivot) = pivot {
            let ratio = self.zoom / old;
            let d = pivot.to_vec2() - self.viewport / 2.0;
            self.pan = self.pan * ratio - d * (ratio - 1.0);
        }

        self.recenter();
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.pan += delta;
        self.recenter();
    }

    pub fn reset_view(&mut self) {
        self.zoom = 1.0;
        self.pan = Vec2::ZERO;
        self.recenter();
    }

    pub fn screen_to_grid(&self, screen: Pos2) -> GridPos {
        let p = self.screen_to_grid_precise(screen);
        GridPos::new(p.x.floor() as i32, p.y.floor() as i32)
    }

    /// Fractional grid coordinates, used for pin picking.
    pub fn screen_to_grid_precise(&self, screen: Pos2) -> Pos2 {
        ((screen.to_vec2() - self.offset) / self.cell_pixels()).to_pos2()
    }

    pub fn grid_to_screen(&self, grid: Pos2) -> Pos2 {
        (self.offset + grid.to_vec2() * self.cell_pixels()).to_pos2()
    }

    /// Screen rectangle covered by `cell`.
    pub fn cell_rect(&self, cell: GridPos) -> Rect {
        Rect::from_min_size(
            self.grid_to_screen(cell.to_pos2()),
            Vec2::splat(self.cell_pixels()),
        )
    }

    /// Background lines, rebuilt only when zoom or extent changed since the last call.
    pub fn tile(&mut self) -> &GridTile {
        let (zoom, extent) = (self.zoom, self.config.extent);
        let cached = self
            .tile
            .take()
            .filter(|t| t.zoom == zoom && t.extent == extent);
        let tile = match cached {
            Some(tile) => tile,
            None => {
                self.tile_builds += 1;
                log::debug!("Rebuilding grid tile at zoom {zoom} for {extent:?}");
                GridTile::build(&self.config, zoom)
            }
        };
        self.tile.insert(tile)
    }

    pub fn tile_builds(&self) -> usize {
        self.tile_builds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Grid {
        Grid::new(GridConfig::default(), vec2(800.0, 600.0))
    }

    #[test]
    fn board_is_centered_in_viewport() {
        let g = grid();
        // 1000 cells * 20 px = 20000 px board.
        assert_eq!(g.offset(), vec2((800.0 - 20000.0) / 2.0, (600.0 - 20000.0) / 2.0));
        assert_eq!(g.grid_to_screen(pos2(0.0, 0.0)), g.offset().to_pos2());
    }

    #[test]
    fn conversions_floor_and_round_trip() {
        let g = grid();
        let screen = g.grid_to_screen(pos2(500.25, 499.75));
        let precise = g.screen_to_grid_precise(screen);
        assert!((precise.x - 500.25).abs() < 1e-3, "{precise:?}");
        assert!((precise.y - 499.75).abs() < 1e-3, "{precise:?}");
        assert_eq!(g.screen_to_grid(screen), GridPos::new(500, 499));

        // Cells left of the origin floor toward negative infinity.
        let left = g.grid_to_screen(pos2(-0.5, 2.5));
        assert_eq!(g.screen_to_grid(left), GridPos::new(-1, 2));
    }

    #[test]
    fn zoom_is_clamped() {
        let mut g = grid();
        g.set_zoom(10.0, None);
        assert_eq!(g.zoom(), 2.0);
        g.set_zoom(0.01, None);
        assert_eq!(g.zoom(), 0.5);
    }

    #[test]
    fn zoom_keeps_pivot_fixed() {
        let mut g = grid();
        g.pan(vec2(37.0, -12.0));
        let pivot = pos2(250.0, 410.0);
        let under = g.screen_to_grid_precise(pivot);

        g.set_zoom(1.5, Some(pivot));
        let after = g.grid_to_screen(under);
        assert!((after - pivot).length() < 1e-2, "pivot drifted to {after:?}");

        g.set_zoom(0.75, Some(pivot));
        let after = g.grid_to_screen(under);
        assert!((after - pivot).length() < 1e-2, "pivot drifted to {after:?}");
    }

    #[test]
    fn pan_and_reset() {
        let mut g = grid();
        let before = g.grid_to_screen(pos2(3.0, 4.0));
        g.pan(vec2(10.0, -5.0));
        assert_eq!(g.grid_to_screen(pos2(3.0, 4.0)), before + vec2(10.0, -5.0));

        g.set_zoom(1.8, Some(pos2(100.0, 100.0)));
        g.reset_view();
        assert_eq!(g.zoom(), 1.0);
        assert_eq!(g.pan_offset(), Vec2::ZERO);
        assert_eq!(g.grid_to_screen(pos2(3.0, 4.0)), before);
    }

    #[test]
    fn tile_is_cached_until_zoom_or_extent_changes() {
        let mut g = grid();
        g.set_extent((10, 10));
        g.tile();
        g.tile();
        assert_eq!(g.tile_builds(), 1);

        g.pan(vec2(50.0, 50.0));
        g.resize(vec2(1024.0, 768.0));
        g.tile();
        assert_eq!(g.tile_builds(), 1, "pan and resize must reuse the tile");

        g.set_zoom(1.5, None);
        g.tile();
        assert_eq!(g.tile_builds(), 2);

        g.set_extent((20, 10));
        g.tile();
        assert_eq!(g.tile_builds(), 3);
    }

    #[test]
    fn tile_splits_major_and_minor_lines() {
        let mut g = grid();
        g.set_extent((10, 10));
        let tile = g.tile();
        // Lines 0, 5, 10 in each direction are major.
        assert_eq!(tile.major.len(), 6);
        assert_eq!(tile.minor.len(), 16);
        assert_eq!(tile.size, vec2(200.0, 200.0));
    }

    #[test]
    fn cell_rect_scales_with_zoom() {
        let mut g = grid();
        g.set_zoom(2.0, None);
        let rect = g.cell_rect(GridPos::new(1, 1));
        assert_eq!(rect.width(), 40.0);
        assert_eq!(rect.min, g.grid_to_screen(pos2(1.0, 1.0)));
    }
}
