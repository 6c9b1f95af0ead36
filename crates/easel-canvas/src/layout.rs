//! Canvas layout
//!
//! Pure placement math: the grid reflow used by "arrange", and the
//! positions of duplicates and variation slots relative to their source.
//! Nothing here touches canvas state.

use serde::{Deserialize, Serialize};

use crate::entity::{Bounds, ImageEntity, Position};

/// Fixed parameters of the grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridLayout {
    /// Edge length of one image
    pub item_size: f64,
    /// Gap between cells and around the grid
    pub gap: f64,
    /// Space reserved at the top of the container
    pub header_height: f64,
}

/// Result of a grid reflow
#[derive(Debug, Clone, PartialEq)]
pub struct GridArrangement {
    /// The input entities, in order, with positions overwritten
    pub entities: Vec<ImageEntity>,
    /// Minimum container height that fits every row
    pub required_height: f64,
    /// Number of columns used
    pub columns: usize,
}

impl GridLayout {
    /// Columns that fit into `container_width`, never fewer than one
    #[must_use]
    pub fn columns(&self, container_width: f64) -> usize {
        let fit = ((container_width - self.gap) / (self.item_size + self.gap)).floor();
        if fit.is_finite() && fit >= 1.0 {
            fit as usize
        } else {
            1
        }
    }

    /// First y coordinate below the header
    #[must_use]
    pub fn vertical_start(&self) -> f64 {
        self.header_height + self.gap
    }

    /// Reflow every entity into a centred grid.
    ///
    /// x is clamped to the container width; y is not clamped since the
    /// container grows to `required_height`.
    #[must_use]
    pub fn arrange(&self, entities: Vec<ImageEntity>, container_width: f64) -> GridArrangement {
        let columns = self.columns(container_width);
        let rows = entities.len().div_ceil(columns);
        let step = self.item_size + self.gap;

        let grid_width = columns as f64 * self.item_size + (columns as f64 - 1.0) * self.gap;
        let offset_x = self.gap.max((container_width - grid_width) / 2.0);
        let start_y = self.vertical_start();
        let max_x = (container_width - self.item_size).max(0.0);

        let entities = entities
            .into_iter()
            .enumerate()
            .map(|(index, mut entity)| {
                let row = index / columns;
                let col = index % columns;
                entity.position = Position::new(
                    (offset_x + col as f64 * step).clamp(0.0, max_x),
                    start_y + row as f64 * step,
                );
                entity
            })
            .collect();

        let required_height = if rows == 0 {
            start_y
        } else {
            start_y + rows as f64 * self.item_size + (rows as f64 - 1.0) * self.gap + self.gap
        };

        GridArrangement {
            entities,
            required_height,
            columns,
        }
    }
}

/// Where a duplicate of an entity at `source` lands
#[must_use]
pub fn duplicate_position(
    source: Position,
    item_size: f64,
    offset: f64,
    bounds: &Bounds,
) -> Position {
    bounds.clamp(source.offset(item_size + offset, 0.0), item_size)
}

/// Slots for four variations around a parent: above, below, left, right.
///
/// Each slot is clamped on its own, so slots may coincide at a container edge.
#[must_use]
pub fn variation_positions(
    parent: Position,
    item_size: f64,
    gap: f64,
    bounds: &Bounds,
) -> [Position; 4] {
    let step = item_size + gap;
    [
        parent.offset(0.0, -step),
        parent.offset(0.0, step),
        parent.offset(-step, 0.0),
        parent.offset(step, 0.0),
    ]
    .map(|p| bounds.clamp(p, item_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> GridLayout {
        GridLayout {
            item_size: 150.0,
            gap: 20.0,
            header_height: 80.0,
        }
    }

    fn entities(n: usize) -> Vec<ImageEntity> {
        (0..n)
            .map(|i| ImageEntity::new(format!("e{i}"), "u", "p", Position::new(7.0, 7.0)))
            .collect()
    }

    fn overlaps(a: Position, b: Position, size: f64) -> bool {
        (a.x - b.x).abs() < size && (a.y - b.y).abs() < size
    }

    #[test]
    fn test_columns() {
        let g = grid();
        // (1000 - 20) / 170 = 5.76
        assert_eq!(g.columns(1000.0), 5);
        assert_eq!(g.columns(100.0), 1);
        assert_eq!(g.columns(0.0), 1);
    }

    #[test]
    fn test_arrange_positions() {
        let g = grid();
        let result = g.arrange(entities(7), 1000.0);
        assert_eq!(result.columns, 5);

        // grid width = 5*150 + 4*20 = 830, offset = (1000-830)/2 = 85
        assert_eq!(result.entities[0].position, Position::new(85.0, 100.0));
        assert_eq!(result.entities[4].position, Position::new(85.0 + 4.0 * 170.0, 100.0));
        assert_eq!(result.entities[5].position, Position::new(85.0, 270.0));

        // 100 + 2*150 + 20 + 20
        assert_eq!(result.required_height, 440.0);
    }

    #[test]
    fn test_arrange_keeps_order_and_ids() {
        let result = grid().arrange(entities(3), 1000.0);
        let ids: Vec<_> = result.entities.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e0", "e1", "e2"]);
    }

    #[test]
    fn test_arrange_no_overlap_and_in_bounds() {
        let g = grid();
        for width in [90.0, 150.0, 340.0, 555.0, 1000.0, 1920.0] {
            for n in [1, 2, 5, 13, 40] {
                let result = g.arrange(entities(n), width);
                let max_x = (width - g.item_size).max(0.0);
                for (i, a) in result.entities.iter().enumerate() {
                    assert!(a.position.x >= 0.0 && a.position.x <= max_x);
                    assert!(a.position.y >= 0.0);
                    for b in &result.entities[i + 1..] {
                        assert!(
                            !overlaps(a.position, b.position, g.item_size),
                            "overlap at width {width} with {n} entities"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_arrange_idempotent() {
        let g = grid();
        let first = g.arrange(entities(9), 777.0);
        let second = g.arrange(first.entities.clone(), 777.0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_arrange_empty() {
        let result = grid().arrange(Vec::new(), 1000.0);
        assert!(result.entities.is_empty());
        assert_eq!(result.required_height, 100.0);
    }

    #[test]
    fn test_duplicate_position() {
        let bounds = Bounds::new(1200.0, 800.0);
        let pos = duplicate_position(Position::new(100.0, 100.0), 150.0, 25.0, &bounds);
        assert_eq!(pos, Position::new(275.0, 100.0));

        let pos = duplicate_position(Position::new(1000.0, 100.0), 150.0, 25.0, &bounds);
        assert_eq!(pos, Position::new(1050.0, 100.0));
    }

    #[test]
    fn test_variation_positions() {
        let bounds = Bounds::new(1200.0, 800.0);
        let [above, below, left, right] =
            variation_positions(Position::new(400.0, 300.0), 150.0, 20.0, &bounds);
        assert_eq!(above, Position::new(400.0, 130.0));
        assert_eq!(below, Position::new(400.0, 470.0));
        assert_eq!(left, Position::new(230.0, 300.0));
        assert_eq!(right, Position::new(570.0, 300.0));
    }

    #[test]
    fn test_variation_positions_clamped_independently() {
        let bounds = Bounds::new(1200.0, 800.0);
        let [above, _, left, _] = variation_positions(Position::new(0.0, 0.0), 150.0, 20.0, &bounds);
        assert_eq!(above, Position::new(0.0, 0.0));
        assert_eq!(left, Position::new(0.0, 0.0));
    }
}
