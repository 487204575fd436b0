//! Static packed R-tree over data-space bounding boxes.
//!
//! Leaves are sorted along a Hilbert curve and packed [`NODE_SIZE`] to a node. The tree
//! is built once and never updated in place.
use indexmap::IndexSet;

use crate::bbox::Rect;

/// Children per tree node.
pub const NODE_SIZE: usize = 16;

const HILBERT_MAX: f64 = 0xFFFF as f64;

/// A bounding box tagged with the row it belongs to.
///
/// Multi-part rows contribute one box per part, all with the same `index`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub index: usize,
}

impl IndexBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64, index: usize) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
            index,
        }
    }

    pub fn point(x: f64, y: f64, index: usize) -> Self {
        Self::new(x, y, x, y, index)
    }

    /// Box around a run of coordinates. `None` if any of them is not finite.
    pub fn from_run(xs: &[f64], ys: &[f64], index: usize) -> Option<Self> {
        let mut rect = Rect::EMPTY;
        for (&x, &y) in xs.iter().zip(ys) {
            if !(x.is_finite() && y.is_finite()) {
                return None;
            }
            rect.extend(&Rect::point(x, y));
        }
        (!rect.is_empty()).then(|| Self::new(rect.x0, rect.y0, rect.x1, rect.y1, index))
    }

    pub fn rect(&self) -> Rect {
        Rect {
            x0: self.min_x,
            y0: self.min_y,
            x1: self.max_x,
            y1: self.max_y,
        }
    }

    fn is_valid(&self) -> bool {
        let r = self.rect();
        r.is_finite() && !r.is_empty()
    }
}

/// Boxes of every NaN-separated run in `xs`/`ys`, tagged with `index`.
pub fn run_boxes(xs: &[f64], ys: &[f64], index: usize, out: &mut Vec<IndexBox>) {
    let n = xs.len().min(ys.len());
    let mut start = 0;
    for i in 0..=n {
        let gap = i == n || !(xs[i].is_finite() && ys[i].is_finite());
        if gap {
            if i > start
                && let Some(b) = IndexBox::from_run(&xs[start..i], &ys[start..i], index)
            {
                out.push(b);
            }
            start = i + 1;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    /// Leaf boxes in Hilbert order, followed by the node boxes of each level.
    boxes: Vec<Rect>,
    /// For leaves, the position in `records`. For nodes, the position of the first child.
    slots: Vec<usize>,
    level_bounds: Vec<usize>,
    records: Vec<IndexBox>,
    extent: Rect,
}

impl SpatialIndex {
    /// Build from `records`, dropping any with non-finite coordinates.
    pub fn build(records: impl IntoIterator<Item = IndexBox>) -> Self {
        let records: Vec<IndexBox> = records.into_iter().filter(IndexBox::is_valid).collect();
        let n = records.len();
        if n == 0 {
            return Self::default();
        }

        let extent = records
            .iter()
            .fold(Rect::EMPTY, |acc, r| acc.union(&r.rect()));

        let mut level_bounds = vec![n];
        let mut count = n;
        let mut total = n;
        loop {
            count = count.div_ceil(NODE_SIZE);
            total += count;
            level_bounds.push(total);
            if count == 1 {
                break;
            }
        }

        let width = if extent.width() > 0.0 { extent.width() } else { 1.0 };
        let height = if extent.height() > 0.0 { extent.height() } else { 1.0 };
        let mut order: Vec<(u32, usize)> = records
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let cx = (r.min_x + r.max_x) / 2.0;
                let cy = (r.min_y + r.max_y) / 2.0;
                let hx = (HILBERT_MAX * (cx - extent.x0) / width).floor() as u32;
                let hy = (HILBERT_MAX * (cy - extent.y0) / height).floor() as u32;
                (hilbert(hx, hy), i)
            })
            .collect();
        order.sort_unstable();

        let mut boxes = Vec::with_capacity(total);
        let mut slots = Vec::with_capacity(total);
        for &(_, i) in &order {
            boxes.push(records[i].rect());
            slots.push(i);
        }

        let mut pos = 0;
        for &end in &level_bounds[..level_bounds.len() - 1] {
            while pos < end {
                let first = pos;
                let mut node = Rect::EMPTY;
                for _ in 0..NODE_SIZE {
                    if pos >= end {
                        break;
                    }
                    node.extend(&boxes[pos]);
                    pos += 1;
                }
                boxes.push(node);
                slots.push(first);
            }
        }

        Self {
            boxes,
            slots,
            level_bounds,
            records,
            extent,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[IndexBox] {
        &self.records
    }

    /// Overall extent, [`Rect::EMPTY`] when the index is empty.
    pub fn bounds(&self) -> Rect {
        self.extent
    }

    /// Records whose box meets `query`, in build order.
    pub fn search(&self, query: &Rect) -> Vec<IndexBox> {
        self.search_positions(query)
            .into_iter()
            .map(|pos| self.records[pos])
            .collect()
    }

    /// Distinct row indices meeting `query`, in build order.
    pub fn indices(&self, query: &Rect) -> Vec<usize> {
        let rows: IndexSet<usize> = self
            .search_positions(query)
            .into_iter()
            .map(|pos| self.records[pos].index)
            .collect();
        rows.into_iter().collect()
    }

    /// Extent of the records meeting `query`.
    pub fn bounds_in(&self, query: &Rect) -> Rect {
        self.search_positions(query)
            .into_iter()
            .fold(Rect::EMPTY, |acc, pos| acc.union(&self.records[pos].rect()))
    }

    /// Extent restricted to positive coordinates, per axis.
    pub fn log_bounds(&self) -> Rect {
        let x = self.bounds_in(&Rect::positive_x());
        let y = self.bounds_in(&Rect::positive_y());
        Rect {
            x0: x.x0,
            y0: y.y0,
            x1: x.x1,
            y1: y.y1,
        }
    }

    fn search_positions(&self, query: &Rect) -> Vec<usize> {
        let n = self.records.len();
        let mut out = Vec::new();
        if n == 0 {
            return out;
        }

        let mut queue = Vec::new();
        let mut node = Some(self.boxes.len() - 1);
        while let Some(first) = node {
            let end = (first + NODE_SIZE).min(self.upper_bound(first));
            for pos in first..end {
                if !query.intersects(&self.boxes[pos]) {
                    continue;
                }
                if first < n {
                    out.push(self.slots[pos]);
                } else {
                    queue.push(self.slots[pos]);
                }
            }
            node = queue.pop();
        }

        out.sort_unstable();
        out
    }

    /// End of the tree level containing `pos`.
    fn upper_bound(&self, pos: usize) -> usize {
        let i = self.level_bounds.partition_point(|&bound| bound <= pos);
        self.level_bounds
            .get(i)
            .copied()
            .unwrap_or(self.boxes.len())
    }
}

/// Position of `(x, y)` along a 16-bit Hilbert curve.
fn hilbert(x: u32, y: u32) -> u32 {
    let mut a = x ^ y;
    let mut b = 0xFFFF ^ a;
    let mut c = 0xFFFF ^ (x | y);
    let mut d = x & (y ^ 0xFFFF);

    let mut aa = a | (b >> 1);
    let mut bb = (a >> 1) ^ a;
    let mut cc = ((c >> 1) ^ (b & (d >> 1))) ^ c;
    let mut dd = ((a & (c >> 1)) ^ (d >> 1)) ^ d;

    a = aa;
    b = bb;
    c = cc;
    d = dd;
    aa = (a & (a >> 2)) ^ (b & (b >> 2));
    bb = (a & (b >> 2)) ^ (b & ((a ^ b) >> 2));
    cc ^= (a & (c >> 2)) ^ (b & (d >> 2));
    dd ^= (b & (c >> 2)) ^ ((a ^ b) & (d >> 2));

    a = aa;
    b = bb;
    c = cc;
    d = dd;
    aa = (a & (a >> 4)) ^ (b & (b >> 4));
    bb = (a & (b >> 4)) ^ (b & ((a ^ b) >> 4));
    cc ^= (a & (c >> 4)) ^ (b & (d >> 4));
    dd ^= (b & (c >> 4)) ^ ((a ^ b) & (d >> 4));

    a = aa;
    b = bb;
    c = cc;
    d = dd;
    cc ^= (a & (c >> 8)) ^ (b & (d >> 8));
    dd ^= (b & (c >> 8)) ^ ((a ^ b) & (d >> 8));

    a = cc ^ (cc >> 1);
    b = dd ^ (dd >> 1);

    let mut i0 = x ^ y;
    let mut i1 = b | (0xFFFF ^ (i0 | a));

    i0 = (i0 | (i0 << 8)) & 0x00FF_00FF;
    i0 = (i0 | (i0 << 4)) & 0x0F0F_0F0F;
    i0 = (i0 | (i0 << 2)) & 0x3333_3333;
    i0 = (i0 | (i0 << 1)) & 0x5555_5555;

    i1 = (i1 | (i1 << 8)) & 0x00FF_00FF;
    i1 = (i1 | (i1 << 4)) & 0x0F0F_0F0F;
    i1 = (i1 | (i1 << 2)) & 0x3333_3333;
    i1 = (i1 | (i1 << 1)) & 0x5555_5555;

    (i1 << 1) | i0
}

#[cfg(test)]
mod tests {
    use rand_distr::{Distribution, Normal};

    use super::*;

    fn random_points(n: usize) -> Vec<IndexBox> {
        let mut rng = rand::rng();
        let dist = Normal::new(0.0, 10.0).expect("normal");
        (0..n)
            .map(|i| IndexBox::point(dist.sample(&mut rng), dist.sample(&mut rng), i))
            .collect()
    }

    #[test]
    fn empty_index_returns_nothing() {
        let index = SpatialIndex::build([]);
        assert!(index.is_empty());
        assert!(index.indices(&Rect::new(-1e9, -1e9, 1e9, 1e9)).is_empty());
        assert!(index.bounds().is_empty());
    }

    #[test]
    fn full_extent_query_returns_every_finite_record() {
        let mut records = random_points(5000);
        records.push(IndexBox::point(f64::NAN, 1.0, 5000));
        records.push(IndexBox::new(0.0, 0.0, f64::INFINITY, 1.0, 5001));
        let index = SpatialIndex::build(records);
        assert_eq!(index.len(), 5000);

        let all = index.indices(&index.bounds());
        assert_eq!(all, (0..5000).collect::<Vec<_>>());

        let far = Rect::new(1e6, 1e6, 2e6, 2e6);
        assert!(index.indices(&far).is_empty());
    }

    #[test]
    fn search_matches_brute_force() {
        let records = random_points(3000);
        let index = SpatialIndex::build(records.clone());
        for query in [
            Rect::new(-5.0, -5.0, 5.0, 5.0),
            Rect::new(0.0, -100.0, 0.5, 100.0),
            Rect::new(-20.0, 3.0, -2.0, 3.5),
        ] {
            let expected: Vec<usize> = records
                .iter()
                .filter(|r| query.intersects(&r.rect()))
                .map(|r| r.index)
                .collect();
            assert_eq!(index.indices(&query), expected);
        }
    }

    #[test]
    fn repeated_indices_are_deduplicated() {
        let records = [
            IndexBox::new(0.0, 0.0, 1.0, 1.0, 7),
            IndexBox::new(2.0, 0.0, 3.0, 1.0, 7),
            IndexBox::new(0.5, 0.5, 2.5, 0.8, 2),
        ];
        let index = SpatialIndex::build(records);
        assert_eq!(index.indices(&Rect::new(0.0, 0.0, 3.0, 1.0)), vec![7, 2]);
        assert_eq!(index.search(&Rect::new(0.0, 0.0, 3.0, 1.0)).len(), 3);
        assert_eq!(
            index.bounds_in(&Rect::new(2.0, 0.0, 2.1, 0.1)),
            Rect::new(2.0, 0.0, 3.0, 1.0)
        );
    }

    #[test]
    fn runs_split_on_nan() {
        let mut out = Vec::new();
        let xs = [0.0, 1.0, f64::NAN, 5.0, 6.0, 7.0, f64::NAN];
        let ys = [0.0, 1.0, f64::NAN, 2.0, 3.0, 1.0, f64::NAN];
        run_boxes(&xs, &ys, 4, &mut out);
        assert_eq!(
            out,
            vec![
                IndexBox::new(0.0, 0.0, 1.0, 1.0, 4),
                IndexBox::new(5.0, 1.0, 7.0, 3.0, 4),
            ]
        );
    }

    #[test]
    fn log_bounds_skip_non_positive() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [-20.0, 0.0, 10.0, 30.0];
        let index = SpatialIndex::build(
            xs.iter()
                .zip(&ys)
                .enumerate()
                .map(|(i, (&x, &y))| IndexBox::point(x, y, i)),
        );
        assert_eq!(index.log_bounds(), Rect::new(1.0, 10.0, 4.0, 30.0));

        let ys = [-20.0, 0.0, 10.0, f64::NAN];
        let index = SpatialIndex::build(
            xs.iter()
                .zip(&ys)
                .enumerate()
                .map(|(i, (&x, &y))| IndexBox::point(x, y, i)),
        );
        assert_eq!(index.log_bounds(), Rect::new(1.0, 10.0, 3.0, 10.0));
    }
}
