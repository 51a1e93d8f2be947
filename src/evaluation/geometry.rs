use geo::{coord, Area, BooleanOps, MultiPolygon, Polygon, Rect};
use itertools::Itertools;

use crate::utils::latlon_to_xy;

/// An axis-aligned box in the projected (x, y) plane, kilometers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boxf {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Boxf {
    /// Square of half-side `radius` centered at (x, y).
    pub fn centered(x: f64, y: f64, radius: f64) -> Self {
        Boxf {
            x1: x - radius,
            y1: y - radius,
            x2: x + radius,
            y2: y + radius,
        }
    }

    /// Square of influence around a store's geographic position.
    pub fn around_store(lat: f64, lon: f64, radius: f64) -> Self {
        let (x, y) = latlon_to_xy(lat, lon);
        Boxf::centered(x, y, radius)
    }

    pub fn area(&self) -> f64 {
        (self.x2 - self.x1) * (self.y2 - self.y1)
    }

    /// Overlap with another box, if any. Touching edges do not count.
    pub fn intersection(&self, other: &Boxf) -> Option<Boxf> {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);
        (x2 > x1 && y2 > y1).then_some(Boxf { x1, y1, x2, y2 })
    }

    fn to_polygon(&self) -> Polygon<f64> {
        Rect::new(
            coord! { x: self.x1, y: self.y1 },
            coord! { x: self.x2, y: self.y2 },
        )
        .to_polygon()
    }
}

fn union_all(parts: impl IntoIterator<Item = MultiPolygon<f64>>) -> MultiPolygon<f64> {
    parts
        .into_iter()
        .reduce(|acc, part| acc.union(&part))
        .unwrap_or_else(|| MultiPolygon(vec![]))
}

/// Direct strategy: polygon union area of all boxes, and the area of the
/// union of all pairwise intersections. Unioning the pairwise overlaps keeps
/// triple overlaps from being double counted.
pub fn union_intersect(boxes: &[Boxf]) -> (f64, f64) {
    if boxes.is_empty() {
        return (0.0, 0.0);
    }

    let polygons: Vec<Polygon<f64>> = boxes.iter().map(Boxf::to_polygon).collect();
    let union = union_all(polygons.iter().map(|p| MultiPolygon(vec![p.clone()])));

    let overlaps: Vec<MultiPolygon<f64>> = polygons
        .iter()
        .tuple_combinations()
        .map(|(a, b)| a.intersection(b))
        .filter(|mp| !mp.0.is_empty())
        .collect();
    let intersect = union_all(overlaps);

    (union.unsigned_area(), intersect.unsigned_area())
}

/// Fast strategy: coordinate-compressed grid sweep. Every grid cell induced
/// by the box boundaries is covered by a known number of boxes; a cell
/// contributes its area to the union if covered at all and to the
/// intersection if covered at least twice. Exact under inclusion-exclusion.
pub fn grid_union_intersect(boxes: &[Boxf]) -> (f64, f64) {
    if boxes.is_empty() {
        return (0.0, 0.0);
    }

    // Disjoint boxes need no grid: the union is just the summed areas.
    let any_overlap = boxes
        .iter()
        .tuple_combinations()
        .any(|(a, b)| a.intersection(b).is_some());
    if !any_overlap {
        return (boxes.iter().map(Boxf::area).sum(), 0.0);
    }

    let mut xs: Vec<f64> = boxes.iter().flat_map(|b| [b.x1, b.x2]).collect();
    let mut ys: Vec<f64> = boxes.iter().flat_map(|b| [b.y1, b.y2]).collect();
    xs.sort_by(|a, b| a.total_cmp(b));
    xs.dedup();
    ys.sort_by(|a, b| a.total_cmp(b));
    ys.dedup();

    let cols = xs.len() - 1;
    let rows = ys.len() - 1;
    let mut cover = vec![0u32; cols * rows];

    let index_of = |coords: &[f64], value: f64| -> usize {
        coords
            .binary_search_by(|probe| probe.total_cmp(&value))
            .expect("box boundary missing from compressed axis")
    };

    for b in boxes {
        let xi1 = index_of(&xs, b.x1);
        let xi2 = index_of(&xs, b.x2);
        let yi1 = index_of(&ys, b.y1);
        let yi2 = index_of(&ys, b.y2);
        for yi in yi1..yi2 {
            for xi in xi1..xi2 {
                cover[yi * cols + xi] += 1;
            }
        }
    }

    let mut union = 0.0;
    let mut intersect = 0.0;
    for yi in 0..rows {
        let height = ys[yi + 1] - ys[yi];
        for xi in 0..cols {
            let count = cover[yi * cols + xi];
            if count == 0 {
                continue;
            }
            let cell = (xs[xi + 1] - xs[xi]) * height;
            union += cell;
            if count >= 2 {
                intersect += cell;
            }
        }
    }

    (union, intersect)
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn assert_close(a: f64, b: f64) {
        let scale = a.abs().max(b.abs()).max(1.0);
        assert!((a - b).abs() / scale < 1e-6, "{a} vs {b}");
    }

    #[test]
    fn empty_box_set() {
        assert_eq!(union_intersect(&[]), (0.0, 0.0));
        assert_eq!(grid_union_intersect(&[]), (0.0, 0.0));
    }

    #[test]
    fn single_box() {
        let b = Boxf::centered(1.0, -2.0, 1.5);
        for (union, intersect) in [union_intersect(&[b]), grid_union_intersect(&[b])] {
            assert_close(union, 9.0);
            assert_eq!(intersect, 0.0);
        }
    }

    #[test]
    fn two_identical_boxes_cancel_out() {
        let b = Boxf::centered(0.0, 0.0, 2.0);
        for (union, intersect) in [union_intersect(&[b, b]), grid_union_intersect(&[b, b])] {
            assert_close(union, 16.0);
            assert_close(intersect, 16.0);
        }
    }

    #[test]
    fn two_disjoint_boxes_sum_their_areas() {
        let a = Boxf::centered(0.0, 0.0, 1.0);
        let b = Boxf::centered(10.0, 0.0, 2.0);
        for (union, intersect) in [union_intersect(&[a, b]), grid_union_intersect(&[a, b])] {
            assert_close(union, 4.0 + 16.0);
            assert_eq!(intersect, 0.0);
        }
    }

    #[test]
    fn two_overlapping_boxes() {
        // Unit squares offset by 1: each 2x2, overlap is 1x1.
        let a = Boxf::centered(0.0, 0.0, 1.0);
        let b = Boxf::centered(1.0, 1.0, 1.0);
        for (union, intersect) in [union_intersect(&[a, b]), grid_union_intersect(&[a, b])] {
            assert_close(union, 7.0);
            assert_close(intersect, 1.0);
        }
    }

    #[test]
    fn triple_overlap_is_not_double_counted() {
        // Three boxes sharing a common core: the intersection area is the
        // union of the pairwise overlaps, not their sum.
        let a = Boxf::centered(0.0, 0.0, 1.0);
        let b = Boxf::centered(0.5, 0.0, 1.0);
        let c = Boxf::centered(0.25, 0.5, 1.0);
        let (du, di) = union_intersect(&[a, b, c]);
        let (gu, gi) = grid_union_intersect(&[a, b, c]);
        assert_close(du, gu);
        assert_close(di, gi);
        // Pairwise overlap areas sum to more than the unioned overlap.
        let pair_sum: f64 = [(a, b), (a, c), (b, c)]
            .iter()
            .map(|(p, q)| p.intersection(q).map_or(0.0, |i| i.area()))
            .sum();
        assert!(pair_sum > di + 1e-9);
    }

    #[test]
    fn strategies_agree_on_random_box_sets() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        for n in [0usize, 1, 2, 5, 20] {
            for _ in 0..20 {
                let boxes: Vec<Boxf> = (0..n)
                    .map(|_| {
                        Boxf::centered(
                            rng.gen_range(-5.0..5.0),
                            rng.gen_range(-5.0..5.0),
                            rng.gen_range(0.1..3.0),
                        )
                    })
                    .collect();
                let (du, di) = union_intersect(&boxes);
                let (gu, gi) = grid_union_intersect(&boxes);
                assert_close(du, gu);
                assert_close(di, gi);
            }
        }
    }
}
