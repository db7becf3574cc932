use glam::IVec2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// A map cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CPos {
    pub x: i32,
    pub y: i32,
}

/// An offset between two cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CVec {
    pub x: i32,
    pub y: i32,
}

impl CPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn as_ivec2(self) -> IVec2 {
        IVec2::new(self.x, self.y)
    }

    pub fn from_ivec2(v: IVec2) -> Self {
        Self { x: v.x, y: v.y }
    }

    /// One cell closer to `target`, moving diagonally when both axes differ.
    pub fn step_towards(self, target: CPos) -> CPos {
        let delta = target.as_ivec2().saturating_sub(self.as_ivec2()).signum();
        Self::from_ivec2(self.as_ivec2() + delta)
    }

    pub fn checked_add(self, offset: CVec) -> Option<CPos> {
        Some(CPos::new(self.x.checked_add(offset.x)?, self.y.checked_add(offset.y)?))
    }

    pub fn checked_sub(self, offset: CVec) -> Option<CPos> {
        Some(CPos::new(self.x.checked_sub(offset.x)?, self.y.checked_sub(offset.y)?))
    }

    /// The offset from `origin` to `self`, if it fits.
    pub fn checked_offset_from(self, origin: CPos) -> Option<CVec> {
        Some(CVec::new(self.x.checked_sub(origin.x)?, self.y.checked_sub(origin.y)?))
    }

    /// The cell itself plus its 4 (or 8 with `diagonal`) neighbours.
    pub fn neighbourhood(self, diagonal: bool) -> impl Iterator<Item = CPos> {
        (-1..=1).flat_map(move |dy| {
            (-1..=1).filter_map(move |dx| {
                if !diagonal && dx != 0 && dy != 0 {
                    None
                } else {
                    Some(self + CVec::new(dx, dy))
                }
            })
        })
    }
}

impl CVec {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn checked_add(self, rhs: CVec) -> Option<CVec> {
        Some(CVec::new(self.x.checked_add(rhs.x)?, self.y.checked_add(rhs.y)?))
    }

    pub fn checked_sub(self, rhs: CVec) -> Option<CVec> {
        Some(CVec::new(self.x.checked_sub(rhs.x)?, self.y.checked_sub(rhs.y)?))
    }
}

// The operators saturate at the map's numeric edge.
impl Add<CVec> for CPos {
    type Output = CPos;

    fn add(self, rhs: CVec) -> CPos {
        CPos::new(self.x.saturating_add(rhs.x), self.y.saturating_add(rhs.y))
    }
}

impl Sub<CVec> for CPos {
    type Output = CPos;

    fn sub(self, rhs: CVec) -> CPos {
        CPos::new(self.x.saturating_sub(rhs.x), self.y.saturating_sub(rhs.y))
    }
}

impl Sub for CPos {
    type Output = CVec;

    fn sub(self, rhs: CPos) -> CVec {
        CVec::new(self.x.saturating_sub(rhs.x), self.y.saturating_sub(rhs.y))
    }
}

impl fmt::Display for CPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl fmt::Display for CVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Expands a set of cells by one ring, deduplicated, in first-seen order.
pub fn expand_footprint(cells: &[CPos], diagonal: bool) -> Vec<CPos> {
    let mut out: Vec<CPos> = Vec::new();
    for cell in cells {
        for neighbour in cell.neighbourhood(diagonal) {
            if !out.contains(&neighbour) {
                out.push(neighbour);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_towards_moves_one_cell_per_axis() {
        let start = CPos::new(0, 0);
        assert_eq!(start.step_towards(CPos::new(5, -3)), CPos::new(1, -1));
        assert_eq!(start.step_towards(CPos::new(0, 4)), CPos::new(0, 1));
        assert_eq!(start.step_towards(start), start);
    }

    #[test]
    fn arithmetic_at_the_numeric_edge_does_not_wrap() {
        let edge = CPos::new(i32::MAX, 0);
        assert_eq!(edge.checked_add(CVec::new(1, 0)), None);
        assert_eq!(edge + CVec::new(1, 0), edge);
        assert_eq!(CPos::new(i32::MIN, 0).checked_offset_from(CPos::new(1, 0)), None);
        assert_eq!(CPos::new(i32::MIN, 0).step_towards(edge), CPos::new(i32::MIN + 1, 0));
        assert_eq!(expand_footprint(&[edge], false).len(), 4);
    }

    #[test]
    fn footprint_without_diagonals_is_a_plus() {
        let cells = expand_footprint(&[CPos::new(2, 2)], false);
        assert_eq!(cells.len(), 5);
        assert!(cells.contains(&CPos::new(2, 2)));
        assert!(!cells.contains(&CPos::new(3, 3)));
    }

    #[test]
    fn footprint_dedups_overlapping_cells() {
        let cells = expand_footprint(&[CPos::new(0, 0), CPos::new(1, 0)], true);
        assert_eq!(cells.len(), 12);
    }
}
