use macroquad::math::{Rect, Vec2};

/// Cells of a tile layer that intersect an area.
///
/// Columns run `col1..col2`; rows run `row1..=row2` and are drawn top-down.
/// Bounds may lie outside the grid, iteration clamps them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub col1: i64,
    pub col2: i64,
    pub row1: i64,
    pub row2: i64,
}

impl CellRange {
    pub fn cols(&self) -> impl Iterator<Item = usize> {
        (self.col1.max(0)..self.col2.max(0)).map(|c| c as usize)
    }

    /// Top row first, matching the draw order of the renderers.
    pub fn rows(&self) -> impl Iterator<Item = usize> {
        (self.row1.max(0)..=self.row2).rev().map(|r| r as usize)
    }

    /// Which sides still have cells past this range: north, east, west, south.
    pub fn more_beyond(&self, width: usize, height: usize) -> [bool; 4] {
        [
            self.row2 < height as i64,
            self.col2 < width as i64,
            self.col1 > 0,
            self.row1 > 0,
        ]
    }
}

/// Visible cell range of a `width` x `height` layer whose origin sits at `offset`.
pub fn visible_cells(width: usize, height: usize, tile: Vec2, offset: Vec2, area: Rect) -> CellRange {
    let tw = tile.x.max(f32::EPSILON);
    let th = tile.y.max(f32::EPSILON);
    CellRange {
        col1: (((area.x - offset.x) / tw) as i64).max(0),
        col2: (((area.x + area.w + tw - offset.x) / tw) as i64).min(width as i64),
        row1: (((area.y - offset.y) / th) as i64).max(0),
        row2: (((area.y + area.h + th - offset.y) / th) as i64).min(height as i64),
    }
}

/// World rectangle seen by a camera centred on `center`.
pub fn camera_view_rect(center: Vec2, viewport: Vec2, zoom: f32) -> Rect {
    let w = viewport.x * zoom;
    let h = viewport.y * zoom;
    Rect::new(center.x - w / 2.0, center.y - h / 2.0, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use macroquad::math::vec2;

    #[test]
    fn range_covers_partially_visible_cells() {
        let r = visible_cells(10, 10, vec2(16.0, 16.0), Vec2::ZERO, Rect::new(20.0, 8.0, 32.0, 16.0));
        assert_eq!(r, CellRange { col1: 1, col2: 4, row1: 0, row2: 2 });
        assert_eq!(r.cols().collect::<Vec<_>>(), [1, 2, 3]);
        assert_eq!(r.rows().collect::<Vec<_>>(), [2, 1, 0]);
    }

    #[test]
    fn range_is_clamped_to_the_grid() {
        let r = visible_cells(4, 3, vec2(8.0, 8.0), vec2(100.0, 0.0), Rect::new(0.0, -50.0, 64.0, 200.0));
        assert_eq!(r.cols().count(), 0);
        assert_eq!((r.row1, r.row2), (0, 3));
        assert_eq!(r.more_beyond(4, 3), [false, true, false, false]);

        let below = visible_cells(4, 3, vec2(8.0, 8.0), Vec2::ZERO, Rect::new(0.0, -40.0, 32.0, 16.0));
        assert!(below.row2 < 0);
        assert_eq!(below.rows().count(), 0);

        let inner = visible_cells(4, 3, vec2(8.0, 8.0), Vec2::ZERO, Rect::new(8.0, 8.0, 4.0, 4.0));
        assert_eq!(inner.more_beyond(4, 3), [true, true, true, true]);
    }

    #[test]
    fn camera_rect_is_centred() {
        assert_eq!(camera_view_rect(vec2(50.0, 40.0), vec2(100.0, 60.0), 0.5), Rect::new(25.0, 25.0, 50.0, 30.0));
    }
}
