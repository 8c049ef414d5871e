//! Sky geometry and spatial index
//!
//! Catalog positions live on the unit sphere. The index stores unit
//! vectors in a kd-tree and compares squared chord lengths, which are
//! monotone in angular separation. Both the chord bound and the leaf
//! distances are computed as `2 - 2*cos`, so a point sitting exactly at
//! a query radius compares equal to the bound and a strict `<` excludes
//! it deterministically.

/// Convert (RA, Dec) in degrees to a unit vector.
pub(crate) fn radec_to_unit(ra_deg: f64, dec_deg: f64) -> [f64; 3] {
    let ra = ra_deg.to_radians();
    let dec = dec_deg.to_radians();
    let cos_dec = dec.cos();
    [cos_dec * ra.cos(), cos_dec * ra.sin(), dec.sin()]
}

/// Squared chord length subtended by an angle (radians) on the unit sphere.
pub(crate) fn chord_sq(angle_rad: f64) -> f64 {
    2.0 - 2.0 * angle_rad.cos()
}

/// Squared chord length between two unit vectors.
#[inline]
fn chord_sq_between(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    2.0 - 2.0 * (a[0] * b[0] + a[1] * b[1] + a[2] * b[2])
}

/// Hit from a spatial query: catalog row position and squared chord
/// distance from the query point.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SkyHit {
    pub row: usize,
    pub chord_sq: f64,
}

/// Points per leaf before a split.
const LEAF_SIZE: usize = 16;

#[derive(Debug, Clone)]
enum Node {
    /// Interior node: split dimension and value, child node indices.
    Split {
        dim: usize,
        value: f64,
        left: usize,
        right: usize,
    },
    /// Leaf node: range [start..end) into the points/rows arrays.
    Leaf { start: usize, end: usize },
}

/// Kd-tree over unit vectors, fixed to three dimensions.
///
/// Built once per open archive; queries never mutate it.
pub(crate) struct SkyTree {
    nodes: Vec<Node>,
    points: Vec<[f64; 3]>,
    rows: Vec<usize>,
}

impl SkyTree {
    /// Build a tree from unit vectors. `rows[i]` in query hits refers back
    /// to position `i` of the input.
    pub(crate) fn build(points: Vec<[f64; 3]>) -> Self {
        let mut entries: Vec<([f64; 3], usize)> = points.into_iter().enumerate()
            .map(|(row, p)| (p, row))
            .collect();

        let mut nodes = Vec::new();
        if !entries.is_empty() {
            build_recursive(&mut nodes, &mut entries, 0);
        }

        let mut points = Vec::with_capacity(entries.len());
        let mut rows = Vec::with_capacity(entries.len());
        for (p, row) in entries {
            points.push(p);
            rows.push(row);
        }

        SkyTree { nodes, points, rows }
    }

    pub(crate) fn len(&self) -> usize {
        self.points.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// All rows strictly within the squared chord bound.
    pub(crate) fn within(&self, query: &[f64; 3], limit: f64) -> Vec<SkyHit> {
        let mut hits = Vec::new();
        if !self.nodes.is_empty() {
            self.within_recursive(0, query, limit, &mut hits);
        }
        hits
    }

    /// Count of rows strictly within the squared chord bound.
    pub(crate) fn count_within(&self, query: &[f64; 3], limit: f64) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        self.count_recursive(0, query, limit)
    }

    /// The single nearest row to the query point.
    pub(crate) fn nearest(&self, query: &[f64; 3]) -> Option<SkyHit> {
        self.nearest_impl(query, None)
    }

    /// The nearest row other than `skip_row` (self-match exclusion).
    pub(crate) fn nearest_excluding(&self, query: &[f64; 3], skip_row: usize) -> Option<SkyHit> {
        self.nearest_impl(query, Some(skip_row))
    }

    // =========================================================================
    // Recursion
    // =========================================================================

    fn within_recursive(&self, node: usize, query: &[f64; 3], limit: f64, hits: &mut Vec<SkyHit>) {
        match self.nodes[node] {
            Node::Leaf { start, end } => {
                for i in start..end {
                    let d = chord_sq_between(query, &self.points[i]);
                    // Strict bound: a point exactly at the limit is out.
                    if d < limit {
                        hits.push(SkyHit {
                            row: self.rows[i],
                            chord_sq: d,
                        });
                    }
                }
            }
            Node::Split { dim, value, left, right } => {
                let diff = query[dim] - value;
                let (near, far) = if diff <= 0.0 { (left, right) } else { (right, left) };

                self.within_recursive(near, query, limit, hits);

                // Inclusive prune so boundary rounding never drops a candidate.
                if diff * diff <= limit {
                    self.within_recursive(far, query, limit, hits);
                }
            }
        }
    }

    fn count_recursive(&self, node: usize, query: &[f64; 3], limit: f64) -> usize {
        match self.nodes[node] {
            Node::Leaf { start, end } => (start..end)
                .filter(|&i| chord_sq_between(query, &self.points[i]) < limit)
                .count(),
            Node::Split { dim, value, left, right } => {
                let diff = query[dim] - value;
                let (near, far) = if diff <= 0.0 { (left, right) } else { (right, left) };

                let mut count = self.count_recursive(near, query, limit);
                if diff * diff <= limit {
                    count += self.count_recursive(far, query, limit);
                }
                count
            }
        }
    }

    fn nearest_impl(&self, query: &[f64; 3], skip_row: Option<usize>) -> Option<SkyHit> {
        if self.nodes.is_empty() {
            return None;
        }
        let mut best = SkyHit {
            row: usize::MAX,
            chord_sq: f64::INFINITY,
        };
        self.nearest_recursive(0, query, skip_row, &mut best);
        if best.row == usize::MAX {
            None
        } else {
            Some(best)
        }
    }

    fn nearest_recursive(
        &self,
        node: usize,
        query: &[f64; 3],
        skip_row: Option<usize>,
        best: &mut SkyHit,
    ) {
        match self.nodes[node] {
            Node::Leaf { start, end } => {
                for i in start..end {
                    if Some(self.rows[i]) == skip_row {
                        continue;
                    }
                    let d = chord_sq_between(query, &self.points[i]);
                    if d < best.chord_sq {
                        best.chord_sq = d;
                        best.row = self.rows[i];
                    }
                }
            }
            Node::Split { dim, value, left, right } => {
                let diff = query[dim] - value;
                let (near, far) = if diff <= 0.0 { (left, right) } else { (right, left) };

                self.nearest_recursive(near, query, skip_row, best);

                if diff * diff <= best.chord_sq {
                    self.nearest_recursive(far, query, skip_row, best);
                }
            }
        }
    }
}

// =============================================================================
// Construction
// =============================================================================

fn build_recursive(
    nodes: &mut Vec<Node>,
    entries: &mut [([f64; 3], usize)],
    base: usize,
) -> usize {
    if entries.len() <= LEAF_SIZE {
        nodes.push(Node::Leaf {
            start: base,
            end: base + entries.len(),
        });
        return nodes.len() - 1;
    }

    let dim = widest_dim(entries);
    let mid = entries.len() / 2;
    entries.select_nth_unstable_by(mid, |a, b| a.0[dim].total_cmp(&b.0[dim]));
    let value = entries[mid].0[dim];

    // Reserve the slot; children are appended first, then patched in.
    let node_idx = nodes.len();
    nodes.push(Node::Leaf { start: 0, end: 0 });

    let (lo, hi) = entries.split_at_mut(mid);
    let left = build_recursive(nodes, lo, base);
    let right = build_recursive(nodes, hi, base + mid);

    nodes[node_idx] = Node::Split { dim, value, left, right };
    node_idx
}

/// Dimension with the widest coordinate spread.
fn widest_dim(entries: &[([f64; 3], usize)]) -> usize {
    let mut best_dim = 0;
    let mut best_spread = f64::NEG_INFINITY;
    for dim in 0..3 {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for (p, _) in entries {
            lo = lo.min(p[dim]);
            hi = hi.max(p[dim]);
        }
        let spread = hi - lo;
        if spread > best_spread {
            best_spread = spread;
            best_dim = dim;
        }
    }
    best_dim
}
