use serde::{Deserialize, Serialize};

/// Axial coordinates for a hex grid (q, r). The implicit cube coordinate is `s = -q - r`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hex {
    pub q: i32,
    pub r: i32,
}

impl Hex {
    pub const DIRECTIONS: [Hex; 6] = [
        Hex { q: 1, r: 0 },  // East
        Hex { q: 1, r: -1 }, // Northeast
        Hex { q: 0, r: -1 }, // Northwest
        Hex { q: -1, r: 0 }, // West
        Hex { q: -1, r: 1 }, // Southwest
        Hex { q: 0, r: 1 },  // Southeast
    ];

    #[inline]
    pub const fn s(self) -> i32 {
        -self.q - self.r
    }

    pub fn neighbors(self) -> impl Iterator<Item = Hex> {
        Self::DIRECTIONS.into_iter().map(move |d| self + d)
    }

    #[inline]
    pub fn neighbor(self, direction: usize) -> Hex {
        self + Self::DIRECTIONS[direction % 6]
    }

    #[inline]
    pub fn distance(self, other: Hex) -> i32 {
        ((self.q - other.q).abs() + (self.r - other.r).abs() + (self.s() - other.s()).abs()) / 2
    }

    /// Facing direction from `self` toward `other`, as an index into `DIRECTIONS`.
    ///
    /// The displacement is projected onto each canonical cube-direction vector;
    /// the direction with the largest dot product wins, ties going to the lowest
    /// index. `None` when `self == other` (no facing).
    pub fn direction_index(self, other: Hex) -> Option<usize> {
        if self == other {
            return None;
        }

        let dq = other.q - self.q;
        let dr = other.r - self.r;
        let ds = -dq - dr;

        let mut best = 0;
        let mut best_dot = i32::MIN;
        for (index, dir) in Self::DIRECTIONS.into_iter().enumerate() {
            let dot = dq * dir.q + ds * dir.s() + dr * dir.r;
            if dot > best_dot {
                best_dot = dot;
                best = index;
            }
        }
        Some(best)
    }

    /// All hexes with distance `<= radius`, in a deterministic order.
    pub fn ring_inclusive(self, radius: i32) -> impl Iterator<Item = Hex> {
        InclusiveRingIter::new(self, radius)
    }
}

/// The direction pointing back the way `direction` came.
#[inline]
pub const fn opposite_direction(direction: usize) -> usize {
    (direction + 3) % 6
}

impl std::ops::Add for Hex {
    type Output = Hex;

    fn add(self, other: Hex) -> Hex {
        Hex {
            q: self.q + other.q,
            r: self.r + other.r,
        }
    }
}

impl std::ops::Mul<i32> for Hex {
    type Output = Hex;

    fn mul(self, rhs: i32) -> Self::Output {
        Hex {
            q: self.q * rhs,
            r: self.r * rhs,
        }
    }
}

struct InclusiveRingIter {
    center: Hex,
    radius: i32,
    dq: i32,
    dr: i32,
    dr_max: i32,
    started: bool,
}

impl InclusiveRingIter {
    fn new(center: Hex, radius: i32) -> Self {
        let radius = radius.max(0);
        let dq = -radius;
        let (dr_min, dr_max) = dr_bounds(dq, radius);
        Self {
            center,
            radius,
            dq,
            dr: dr_min,
            dr_max,
            started: false,
        }
    }
}

impl Iterator for InclusiveRingIter {
    type Item = Hex;

    fn next(&mut self) -> Option<Self::Item> {
        if self.radius == 0 && self.started {
            return None;
        }
        self.started = true;

        if self.dq > self.radius {
            return None;
        }

        let out = Hex {
            q: self.center.q + self.dq,
            r: self.center.r + self.dr,
        };

        self.dr += 1;
        if self.dr > self.dr_max {
            self.dq += 1;
            if self.dq <= self.radius {
                let (dr_min, dr_max) = dr_bounds(self.dq, self.radius);
                self.dr_max = dr_max;
                self.dr = dr_min;
            }
        }

        Some(out)
    }
}

#[inline]
fn dr_bounds(dq: i32, radius: i32) -> (i32, i32) {
    // For axial coords (dq, dr), the third cube delta is ds = -dq - dr.
    // Constraint: max(|dq|, |dr|, |ds|) <= radius
    let dr_min = (-radius).max(-dq - radius);
    let dr_max = radius.min(-dq + radius);
    (dr_min, dr_max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_coordinate_invariant_holds() {
        let center = Hex { q: 0, r: 0 };
        for hex in center.ring_inclusive(4) {
            assert_eq!(hex.q + hex.r + hex.s(), 0);
        }
    }

    #[test]
    fn hex_distance_matches_expected() {
        let a = Hex { q: 0, r: 0 };
        let b = Hex { q: 3, r: -1 };
        assert_eq!(a.distance(b), 3);
        assert_eq!(b.distance(a), 3);
        assert_eq!(a.distance(a), 0);
    }

    #[test]
    fn hex_neighbors_has_six_adjacent() {
        let center = Hex { q: 2, r: -1 };
        let neighbors: Vec<_> = center.neighbors().collect();
        assert_eq!(neighbors.len(), 6);
        assert!(neighbors.iter().all(|n| center.distance(*n) == 1));
    }

    #[test]
    fn direction_index_recovers_canonical_directions() {
        let origin = Hex { q: 0, r: 0 };
        for (index, dir) in Hex::DIRECTIONS.into_iter().enumerate() {
            assert_eq!(origin.direction_index(origin + dir), Some(index));
            assert_eq!(origin.direction_index(origin + dir * 3), Some(index));
        }
    }

    #[test]
    fn direction_index_none_for_self() {
        let hex = Hex { q: 1, r: 1 };
        assert_eq!(hex.direction_index(hex), None);
    }

    #[test]
    fn opposite_direction_round_trips() {
        for dir in 0..6 {
            assert_eq!(opposite_direction(opposite_direction(dir)), dir);
        }
    }

    #[test]
    fn ring_inclusive_counts_match_redblob_formula() {
        let center = Hex { q: 0, r: 0 };
        for radius in 0..=4 {
            let count = center.ring_inclusive(radius).count() as i32;
            let expected = 1 + 3 * radius * (radius + 1);
            assert_eq!(count, expected);
        }
    }
}
