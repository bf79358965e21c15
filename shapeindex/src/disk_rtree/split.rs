//! Node split heuristics.
//!
//! Both heuristics pick two seeds, then distribute the remaining entries
//! between the two groups. A group that can only reach the minimum fill by
//! taking every remaining entry takes them all.

use crate::bounding_box::BoundingBox;
use crate::config::SplitAlgorithm;

use super::rtree_types::{ChildRef, LeafEntry};

/// Anything stored in a node under a bounding box.
pub(crate) trait Bounded: Copy {
    fn bbox(&self) -> &BoundingBox;
}

impl Bounded for LeafEntry {
    fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }
}

impl Bounded for ChildRef {
    fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }
}

/// Partitions an overflowing node into two groups of at least
/// `min_entries` each.
pub(crate) fn split<T: Bounded>(
    algorithm: SplitAlgorithm,
    items: Vec<T>,
    min_entries: usize,
) -> (Vec<T>, Vec<T>) {
    debug_assert!(items.len() >= 2);
    match algorithm {
        SplitAlgorithm::Linear => linear_split(items, min_entries),
        SplitAlgorithm::Quadratic => quadratic_split(items, min_entries),
    }
}

struct Groups<T> {
    first: Vec<T>,
    first_bbox: BoundingBox,
    second: Vec<T>,
    second_bbox: BoundingBox,
}

impl<T: Bounded> Groups<T> {
    fn seeded(first: T, second: T) -> Self {
        Self {
            first_bbox: *first.bbox(),
            first: vec![first],
            second_bbox: *second.bbox(),
            second: vec![second],
        }
    }

    /// Hands all of `remaining` to a group that needs them to reach the
    /// minimum fill. Returns true if it did.
    fn force_fill(&mut self, remaining: &mut Vec<T>, min_entries: usize) -> bool {
        if self.first.len() + remaining.len() <= min_entries {
            for item in remaining.drain(..) {
                self.first_bbox.expand(item.bbox());
                self.first.push(item);
            }
            true
        } else if self.second.len() + remaining.len() <= min_entries {
            for item in remaining.drain(..) {
                self.second_bbox.expand(item.bbox());
                self.second.push(item);
            }
            true
        } else {
            false
        }
    }

    /// Least enlargement, then smaller area, then fewer entries.
    fn prefers_first(&self, item: &T) -> bool {
        let d1 = self.first_bbox.enlargement(item.bbox());
        let d2 = self.second_bbox.enlargement(item.bbox());
        if d1 != d2 {
            return d1 < d2;
        }
        let a1 = self.first_bbox.area();
        let a2 = self.second_bbox.area();
        if a1 != a2 {
            return a1 < a2;
        }
        self.first.len() <= self.second.len()
    }

    fn assign(&mut self, item: T) {
        if self.prefers_first(&item) {
            self.first_bbox.expand(item.bbox());
            self.first.push(item);
        } else {
            self.second_bbox.expand(item.bbox());
            self.second.push(item);
        }
    }

    fn into_parts(self) -> (Vec<T>, Vec<T>) {
        (self.first, self.second)
    }
}

/// Removes the two seeds from `items`, returning them in index order.
fn take_seeds<T: Bounded>(items: &mut Vec<T>, a: usize, b: usize) -> (T, T) {
    let (low, high) = if a < b { (a, b) } else { (b, a) };
    let second = items.remove(high);
    let first = items.remove(low);
    (first, second)
}

fn quadratic_split<T: Bounded>(mut items: Vec<T>, min_entries: usize) -> (Vec<T>, Vec<T>) {
    let (seed_a, seed_b) = quadratic_seeds(&items);
    let (first, second) = take_seeds(&mut items, seed_a, seed_b);
    let mut groups = Groups::seeded(first, second);

    while !items.is_empty() {
        if groups.force_fill(&mut items, min_entries) {
            break;
        }

        // pick the entry with the strongest preference for one group
        let mut next = 0;
        let mut best_difference = f64::NEG_INFINITY;
        for (i, item) in items.iter().enumerate() {
            let d1 = groups.first_bbox.enlargement(item.bbox());
            let d2 = groups.second_bbox.enlargement(item.bbox());
            let difference = (d1 - d2).abs();
            if difference > best_difference {
                best_difference = difference;
                next = i;
            }
        }

        let item = items.swap_remove(next);
        groups.assign(item);
    }

    groups.into_parts()
}

/// The pair wasting the most area when put together.
fn quadratic_seeds<T: Bounded>(items: &[T]) -> (usize, usize) {
    let mut seeds = (0, 1);
    let mut worst = f64::NEG_INFINITY;
    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            let a = items[i].bbox();
            let b = items[j].bbox();
            let dead_space = a.union(b).area() - a.area() - b.area();
            if dead_space > worst {
                worst = dead_space;
                seeds = (i, j);
            }
        }
    }
    seeds
}

fn linear_split<T: Bounded>(mut items: Vec<T>, min_entries: usize) -> (Vec<T>, Vec<T>) {
    let (seed_a, seed_b) = linear_seeds(&items);
    let (first, second) = take_seeds(&mut items, seed_a, seed_b);
    let mut groups = Groups::seeded(first, second);

    let mut remaining = items;
    while !remaining.is_empty() {
        if groups.force_fill(&mut remaining, min_entries) {
            break;
        }
        let item = remaining.remove(0);
        groups.assign(item);
    }

    groups.into_parts()
}

/// Seeds are the pair with the greatest separation along one axis,
/// normalized by the extent of all entries on that axis.
fn linear_seeds<T: Bounded>(items: &[T]) -> (usize, usize) {
    let x = axis_extremes(items, |b| (b.min_x, b.max_x));
    let y = axis_extremes(items, |b| (b.min_y, b.max_y));
    let (_, a, b) = if y.0 > x.0 { y } else { x };

    if a != b {
        (a, b)
    } else if a == 0 {
        (0, 1)
    } else {
        (0, a)
    }
}

/// Returns (normalized separation, highest low side, lowest high side).
fn axis_extremes<T: Bounded>(
    items: &[T],
    side: impl Fn(&BoundingBox) -> (f64, f64),
) -> (f64, usize, usize) {
    let mut highest_low = 0;
    let mut lowest_high = 0;
    let mut extent_low = f64::INFINITY;
    let mut extent_high = f64::NEG_INFINITY;

    for (i, item) in items.iter().enumerate() {
        let (low, high) = side(item.bbox());
        if low > side(items[highest_low].bbox()).0 {
            highest_low = i;
        }
        if high < side(items[lowest_high].bbox()).1 {
            lowest_high = i;
        }
        extent_low = extent_low.min(low);
        extent_high = extent_high.max(high);
    }

    let separation =
        side(items[highest_low].bbox()).0 - side(items[lowest_high].bbox()).1;
    let extent = extent_high - extent_low;
    let normalized = if extent > 0.0 {
        separation / extent
    } else {
        0.0
    };
    (normalized, lowest_high, highest_low)
}
