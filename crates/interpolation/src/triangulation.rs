//! Planar Delaunay triangulation with point location.
//!
//! Built incrementally with the Bowyer-Watson algorithm: every inserted point
//! carves out the cavity of triangles whose circumcircle contains it and
//! re-triangulates the cavity as a fan around the new point. Triangles are
//! kept counter-clockwise with explicit neighbour links so insertion can walk
//! to the containing triangle instead of scanning.
//!
//! The super-triangle is finite, so triangles along nearly collinear hull
//! stretches can be lost when it is removed. Those pockets are closed
//! against the convex hull afterwards and the patched region is made
//! Delaunay again by edge flips.

use std::collections::{HashMap, HashSet};

use align_common::{AlignError, Result};
use nalgebra::{Matrix2, Vector2};

/// A 2-D point. For geographic sources this is `(latitude, longitude)`.
pub type Point = [f64; 2];

/// Barycentric tolerance for points on triangle edges.
const EDGE_TOLERANCE: f64 = 1e-10;

/// Super-triangle size relative to the point extent.
const SUPER_SCALE: f64 = 100.0;

#[derive(Debug, Clone)]
struct Tri {
    v: [usize; 3],
    /// Neighbour across the edge opposite `v[k]`.
    n: [Option<usize>; 3],
    alive: bool,
}

/// The Delaunay triangulation of a point set.
#[derive(Debug, Clone)]
pub struct Triangulation {
    points: Vec<Point>,
    simplices: Vec<[usize; 3]>,
    /// Per simplex: inverse edge matrix and origin vertex. `None` for
    /// degenerate (zero-area) simplices.
    transforms: Vec<Option<(Matrix2<f64>, Vector2<f64>)>>,
    locator: BucketGrid,
}

impl Triangulation {
    pub fn new(points: &[Point]) -> Result<Self> {
        if points.len() < 3 {
            return Err(AlignError::precondition(format!(
                "triangulation needs at least 3 points, got {}",
                points.len()
            )));
        }
        if let Some(bad) = points.iter().position(|p| !p[0].is_finite() || !p[1].is_finite()) {
            return Err(AlignError::precondition(format!(
                "source point {} has non-finite coordinates",
                bad
            )));
        }

        let simplices = bowyer_watson(points);
        let transforms: Vec<_> = simplices.iter().map(|s| affine_transform(points, s)).collect();
        if transforms.iter().all(Option::is_none) {
            return Err(AlignError::precondition(
                "source points are collinear; no triangle could be formed",
            ));
        }
        let locator = BucketGrid::new(points, &simplices);

        Ok(Self {
            points: points.to_vec(),
            simplices,
            transforms,
            locator,
        })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Vertex indices of every simplex, counter-clockwise.
    pub fn simplices(&self) -> &[[usize; 3]] {
        &self.simplices
    }

    /// Barycentric coordinates of `p` in simplex `s`; the last one is
    /// `1 - sum(others)`.
    pub fn barycentric(&self, s: usize, p: Point) -> Option<[f64; 3]> {
        let (tinv, origin) = self.transforms[s].as_ref()?;
        let partial = tinv * (Vector2::new(p[0], p[1]) - origin);
        Some([partial[0], partial[1], 1.0 - partial[0] - partial[1]])
    }

    /// Simplex containing `p` with its barycentric coordinates, or `None`
    /// outside the convex hull.
    pub fn locate(&self, p: Point) -> Option<(usize, [f64; 3])> {
        if !p[0].is_finite() || !p[1].is_finite() {
            return None;
        }
        self.locator.candidates(p).iter().find_map(|&s| {
            let bary = self.barycentric(s, p)?;
            bary.iter().all(|&b| b >= -EDGE_TOLERANCE).then_some((s, bary))
        })
    }

    /// Index of the simplex containing `p`.
    pub fn find_simplex(&self, p: Point) -> Option<usize> {
        self.locate(p).map(|(s, _)| s)
    }
}

fn orient(a: Point, b: Point, c: Point) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

/// Positive when `d` lies strictly inside the circumcircle of the
/// counter-clockwise triangle `abc`.
fn in_circle(a: Point, b: Point, c: Point, d: Point) -> f64 {
    let (adx, ady) = (a[0] - d[0], a[1] - d[1]);
    let (bdx, bdy) = (b[0] - d[0], b[1] - d[1]);
    let (cdx, cdy) = (c[0] - d[0], c[1] - d[1]);
    let alift = adx * adx + ady * ady;
    let blift = bdx * bdx + bdy * bdy;
    let clift = cdx * cdx + cdy * cdy;
    alift * (bdx * cdy - bdy * cdx) + blift * (cdx * ady - cdy * adx) + clift * (adx * bdy - ady * bdx)
}

fn affine_transform(points: &[Point], s: &[usize; 3]) -> Option<(Matrix2<f64>, Vector2<f64>)> {
    let [p0, p1, p2] = [points[s[0]], points[s[1]], points[s[2]]];
    let edges = Matrix2::new(
        p0[0] - p2[0],
        p1[0] - p2[0],
        p0[1] - p2[1],
        p1[1] - p2[1],
    );
    let tinv = edges.try_inverse()?;
    Some((tinv, Vector2::new(p2[0], p2[1])))
}

fn bowyer_watson(input: &[Point]) -> Vec<[usize; 3]> {
    let n = input.len();
    let (mut min, mut max) = ([f64::INFINITY; 2], [f64::NEG_INFINITY; 2]);
    for p in input {
        for k in 0..2 {
            min[k] = min[k].min(p[k]);
            max[k] = max[k].max(p[k]);
        }
    }
    let span = (max[0] - min[0]).max(max[1] - min[1]).max(1e-9) * SUPER_SCALE;
    let (cx, cy) = ((min[0] + max[0]) / 2.0, (min[1] + max[1]) / 2.0);

    let mut pts = input.to_vec();
    pts.push([cx - 2.0 * span, cy - span]);
    pts.push([cx + 2.0 * span, cy - span]);
    pts.push([cx, cy + 2.0 * span]);

    let mut tris = vec![Tri {
        v: [n, n + 1, n + 2],
        n: [None; 3],
        alive: true,
    }];
    let mut free: Vec<usize> = Vec::new();
    let mut last = 0usize;
    let mut stamp: Vec<usize> = vec![usize::MAX];

    for i in 0..n {
        let p = pts[i];
        let Some(start) = locate_walk(&tris, &pts, last, p) else {
            continue;
        };
        if tris[start].v.iter().any(|&v| pts[v] == p) {
            // Duplicate point; it keeps zero weight.
            continue;
        }

        // Cavity of triangles whose circumcircle contains p.
        if stamp.len() < tris.len() {
            stamp.resize(tris.len(), usize::MAX);
        }
        let mut bad = vec![start];
        stamp[start] = i;
        let mut cursor = 0;
        while cursor < bad.len() {
            let t = bad[cursor];
            cursor += 1;
            for nb in tris[t].n.into_iter().flatten() {
                if stamp[nb] == i || !tris[nb].alive {
                    continue;
                }
                let [a, b, c] = tris[nb].v;
                if in_circle(pts[a], pts[b], pts[c], p) > 0.0 {
                    stamp[nb] = i;
                    bad.push(nb);
                }
            }
        }

        // Boundary edges (a, b) of the cavity with the triangle beyond them.
        let mut boundary: Vec<(usize, usize, Option<usize>)> = Vec::new();
        for &t in &bad {
            for k in 0..3 {
                let nb = tris[t].n[k];
                if nb.map_or(true, |nb| stamp[nb] != i) {
                    boundary.push((tris[t].v[(k + 1) % 3], tris[t].v[(k + 2) % 3], nb));
                }
            }
        }

        for &t in &bad {
            tris[t].alive = false;
            free.push(t);
        }

        let mut by_start: HashMap<usize, usize> = HashMap::with_capacity(boundary.len());
        let mut by_end: HashMap<usize, usize> = HashMap::with_capacity(boundary.len());
        let mut created = Vec::with_capacity(boundary.len());
        for &(a, b, outside) in &boundary {
            let tri = Tri {
                v: [a, b, i],
                n: [None, None, outside],
                alive: true,
            };
            let j = match free.pop() {
                Some(j) => {
                    tris[j] = tri;
                    j
                }
                None => {
                    tris.push(tri);
                    tris.len() - 1
                }
            };
            if let Some(o) = outside {
                // The outside triangle sees this edge as (b, a).
                for k in 0..3 {
                    let ov = tris[o].v;
                    if ov[(k + 1) % 3] == b && ov[(k + 2) % 3] == a {
                        tris[o].n[k] = Some(j);
                    }
                }
            }
            by_start.insert(a, j);
            by_end.insert(b, j);
            created.push(j);
        }
        for &j in &created {
            let [a, b, _] = tris[j].v;
            tris[j].n[0] = by_start.get(&b).copied();
            tris[j].n[1] = by_end.get(&a).copied();
        }
        if let Some(&j) = created.first() {
            last = j;
        }
    }

    let mut simplices: Vec<[usize; 3]> = tris
        .into_iter()
        .filter(|t| t.alive && t.v.iter().all(|&v| v < n))
        .map(|t| t.v)
        .collect();
    let filled = fill_hull(input, &mut simplices);
    legalize(input, &mut simplices, &filled);
    simplices
}

fn directed_edges(s: [usize; 3]) -> [(usize, usize); 3] {
    [(s[0], s[1]), (s[1], s[2]), (s[2], s[0])]
}

/// Closed containment test for the counter-clockwise triangle `abc`.
fn in_triangle(a: Point, b: Point, c: Point, p: Point) -> bool {
    orient(a, b, p) >= 0.0 && orient(b, c, p) >= 0.0 && orient(c, a, p) >= 0.0
}

fn remove_edge(next: &mut HashMap<usize, Vec<usize>>, a: usize, b: usize) {
    if let Some(outs) = next.get_mut(&a) {
        outs.retain(|&x| x != b);
        if outs.is_empty() {
            next.remove(&a);
        }
    }
}

fn has_edge(next: &HashMap<usize, Vec<usize>>, a: usize, b: usize) -> bool {
    next.get(&a).map_or(false, |outs| outs.contains(&b))
}

/// Whether the boundary corner `a -> b -> c` can be clipped as the
/// triangle `(a, c, b)`.
fn is_ear(
    points: &[Point],
    next: &HashMap<usize, Vec<usize>>,
    neighbours: &HashMap<usize, HashSet<usize>>,
    (a, b, c): (usize, usize, usize),
) -> bool {
    let (pa, pb, pc) = (points[a], points[b], points[c]);
    if orient(pa, pb, pc) >= 0.0 {
        return false;
    }
    // No edge at b may run inside the corner.
    let edge_inside = neighbours.get(&b).map_or(false, |ns| {
        ns.iter()
            .any(|&x| x != a && x != c && orient(pb, pc, points[x]) < 0.0 && orient(pb, pa, points[x]) > 0.0)
    });
    if edge_inside {
        return false;
    }
    !next
        .keys()
        .any(|&v| v != a && v != b && v != c && in_triangle(pa, pc, pb, points[v]))
}

/// Clip ears off every reflex corner of the triangulation boundary until
/// it is convex. Returns the indices of the added simplices.
fn fill_hull(points: &[Point], simplices: &mut Vec<[usize; 3]>) -> Vec<usize> {
    let edges: HashSet<(usize, usize)> = simplices.iter().flat_map(|&s| directed_edges(s)).collect();
    // Boundary edges a -> b with the triangulation on their left.
    let mut next: HashMap<usize, Vec<usize>> = HashMap::new();
    for &(a, b) in &edges {
        if !edges.contains(&(b, a)) {
            next.entry(a).or_default().push(b);
        }
    }
    let mut neighbours: HashMap<usize, HashSet<usize>> = HashMap::new();
    for &(a, b) in &edges {
        neighbours.entry(a).or_default().insert(b);
        neighbours.entry(b).or_default().insert(a);
    }

    let mut added = Vec::new();
    loop {
        let mut progress = false;
        let boundary: Vec<(usize, usize)> = next
            .iter()
            .flat_map(|(&a, outs)| outs.iter().map(move |&b| (a, b)))
            .collect();
        for (a, b) in boundary {
            if !has_edge(&next, a, b) {
                continue;
            }
            let Some(c) = next
                .get(&b)
                .and_then(|outs| outs.iter().copied().find(|&c| c != a && is_ear(points, &next, &neighbours, (a, b, c))))
            else {
                continue;
            };
            remove_edge(&mut next, a, b);
            remove_edge(&mut next, b, c);
            if has_edge(&next, c, a) {
                remove_edge(&mut next, c, a);
            } else {
                next.entry(a).or_default().push(c);
            }
            neighbours.entry(a).or_default().insert(c);
            neighbours.entry(c).or_default().insert(a);
            simplices.push([a, c, b]);
            added.push(simplices.len() - 1);
            progress = true;
        }
        if !progress {
            return added;
        }
    }
}

/// Lawson flips starting from the edges of `seeds` until every reachable
/// edge is locally Delaunay.
fn legalize(points: &[Point], simplices: &mut [[usize; 3]], seeds: &[usize]) {
    if seeds.is_empty() {
        return;
    }
    let mut owner: HashMap<(usize, usize), usize> = HashMap::new();
    for (t, &s) in simplices.iter().enumerate() {
        for e in directed_edges(s) {
            owner.insert(e, t);
        }
    }
    let mut stack: Vec<(usize, usize)> = seeds.iter().flat_map(|&t| directed_edges(simplices[t])).collect();
    let mut budget = 8 * simplices.len() + 64;

    while let Some((a, b)) = stack.pop() {
        if budget == 0 {
            break;
        }
        budget -= 1;
        let (Some(&t1), Some(&t2)) = (owner.get(&(a, b)), owner.get(&(b, a))) else {
            continue;
        };
        let third = |s: [usize; 3]| s.into_iter().find(|&v| v != a && v != b);
        let (Some(c), Some(d)) = (third(simplices[t1]), third(simplices[t2])) else {
            continue;
        };
        // t1 = (a, b, c) and t2 = (b, a, d), both counter-clockwise.
        let [pa, pb, pc, pd] = [points[a], points[b], points[c], points[d]];
        if in_circle(pa, pb, pc, pd) <= 0.0 || orient(pc, pa, pd) <= 0.0 || orient(pd, pb, pc) <= 0.0 {
            continue;
        }
        owner.remove(&(a, b));
        owner.remove(&(b, a));
        simplices[t1] = [c, a, d];
        simplices[t2] = [d, b, c];
        for t in [t1, t2] {
            for e in directed_edges(simplices[t]) {
                owner.insert(e, t);
            }
        }
        stack.extend([(a, d), (d, b), (b, c), (c, a)]);
    }
}

/// Walk from `start` towards `p`, crossing any edge that has `p` on its
/// outer side. Falls back to a scan if the walk does not settle.
fn locate_walk(tris: &[Tri], pts: &[Point], start: usize, p: Point) -> Option<usize> {
    let mut t = start;
    for _ in 0..tris.len() + 3 {
        let v = tris[t].v;
        let crossing = (0..3).find(|&k| orient(pts[v[(k + 1) % 3]], pts[v[(k + 2) % 3]], p) < 0.0);
        match crossing {
            None => return Some(t),
            Some(k) => t = tris[t].n[k]?,
        }
    }
    tris.iter().position(|tri| {
        tri.alive && (0..3).all(|k| orient(pts[tri.v[(k + 1) % 3]], pts[tri.v[(k + 2) % 3]], p) >= 0.0)
    })
}

/// Uniform grid of buckets listing the simplices overlapping each cell.
#[derive(Debug, Clone)]
struct BucketGrid {
    min: Point,
    cell: Point,
    shape: [usize; 2],
    buckets: Vec<Vec<usize>>,
}

impl BucketGrid {
    fn new(points: &[Point], simplices: &[[usize; 3]]) -> Self {
        let (mut min, mut max) = ([f64::INFINITY; 2], [f64::NEG_INFINITY; 2]);
        for p in points {
            for k in 0..2 {
                min[k] = min[k].min(p[k]);
                max[k] = max[k].max(p[k]);
            }
        }
        let side = ((simplices.len() as f64).sqrt().ceil() as usize).clamp(1, 2048);
        let shape = [side, side];
        let cell = [
            ((max[0] - min[0]) / side as f64).max(f64::MIN_POSITIVE),
            ((max[1] - min[1]) / side as f64).max(f64::MIN_POSITIVE),
        ];
        let mut grid = Self {
            min,
            cell,
            shape,
            buckets: vec![Vec::new(); side * side],
        };
        for (s, tri) in simplices.iter().enumerate() {
            let (mut lo, mut hi) = ([usize::MAX; 2], [0usize; 2]);
            for &v in tri {
                let c = grid.cell_of(points[v]);
                for k in 0..2 {
                    lo[k] = lo[k].min(c[k]);
                    hi[k] = hi[k].max(c[k]);
                }
            }
            for r in lo[0]..=hi[0] {
                for c in lo[1]..=hi[1] {
                    grid.buckets[r * shape[1] + c].push(s);
                }
            }
        }
        grid
    }

    fn cell_of(&self, p: Point) -> [usize; 2] {
        let mut out = [0; 2];
        for k in 0..2 {
            let f = ((p[k] - self.min[k]) / self.cell[k]).floor();
            out[k] = (f.max(0.0) as usize).min(self.shape[k] - 1);
        }
        out
    }

    fn candidates(&self, p: Point) -> &[usize] {
        let extent = |k: usize| self.min[k] + self.cell[k] * self.shape[k] as f64;
        let slack = |k: usize| self.cell[k] * 1e-9;
        for k in 0..2 {
            if p[k] < self.min[k] - slack(k) || p[k] > extent(k) + slack(k) {
                return &[];
            }
        }
        let c = self.cell_of(p);
        &self.buckets[c[0] * self.shape[1] + c[1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Vec<Point> {
        vec![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]]
    }

    #[test]
    fn test_square_has_two_triangles() {
        let tri = Triangulation::new(&unit_square()).unwrap();
        assert_eq!(tri.simplices().len(), 2);
    }

    #[test]
    fn test_square_diagonal() {
        // Insertion order fixes the diagonal of the co-circular square:
        // it joins (0, 1) and (1, 0).
        let tri = Triangulation::new(&unit_square()).unwrap();
        for s in tri.simplices() {
            assert!(s.contains(&1) && s.contains(&2), "simplex {:?} misses the 1-2 diagonal", s);
        }
    }

    #[test]
    fn test_barycentric_sums_to_one() {
        let tri = Triangulation::new(&unit_square()).unwrap();
        let (_, bary) = tri.locate([0.25, 0.6]).unwrap();
        assert!((bary.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(bary.iter().all(|&b| b >= 0.0));
    }

    #[test]
    fn test_outside_hull() {
        let tri = Triangulation::new(&unit_square()).unwrap();
        assert!(tri.locate([1.5, 0.5]).is_none());
        assert!(tri.locate([-0.1, -0.1]).is_none());
        assert!(tri.locate([f64::NAN, 0.5]).is_none());
    }

    #[test]
    fn test_vertices_and_edges_are_inside() {
        let tri = Triangulation::new(&unit_square()).unwrap();
        assert!(tri.locate([0.0, 0.0]).is_some());
        assert!(tri.locate([0.5, 0.0]).is_some());
        assert!(tri.locate([1.0, 1.0]).is_some());
    }

    #[test]
    fn test_regular_grid_covers_interior() {
        let mut points = Vec::new();
        for i in 0..10 {
            for j in 0..12 {
                points.push([i as f64 * 0.5, j as f64 * 0.25]);
            }
        }
        let tri = Triangulation::new(&points).unwrap();
        // 2 triangles per cell of a 9 x 11 cell grid.
        assert_eq!(tri.simplices().len(), 2 * 9 * 11);
        for k in 0..50 {
            let p = [0.01 + k as f64 * 0.08, 0.02 + k as f64 * 0.05];
            assert!(tri.locate(p).is_some(), "point {:?} should be inside", p);
        }
    }

    #[test]
    fn test_delaunay_property_on_scattered_points() {
        let points: Vec<Point> = (0..60)
            .map(|k| {
                let t = k as f64;
                [(t * 0.618).fract() * 10.0, (t * 0.377 + 0.1).fract() * 7.0]
            })
            .collect();
        let tri = Triangulation::new(&points).unwrap();
        for s in tri.simplices() {
            let [a, b, c] = [points[s[0]], points[s[1]], points[s[2]]];
            assert!(orient(a, b, c) > 0.0);
            for (i, &p) in points.iter().enumerate() {
                if s.contains(&i) {
                    continue;
                }
                assert!(in_circle(a, b, c, p) <= 1e-9, "point {} inside circumcircle of {:?}", i, s);
            }
        }
    }

    fn bowed_strip(c: f64) -> Vec<Point> {
        let mut points: Vec<Point> = (0..=10).map(|x| [x as f64, -c * (x as f64 - 5.0).powi(2)]).collect();
        points.extend((0..=10).map(|x| [x as f64, 1.0]));
        points
    }

    #[test]
    fn test_bowed_boundary_is_closed_to_the_hull() {
        let c = 1e-5;
        let points = bowed_strip(c);
        let tri = Triangulation::new(&points).unwrap();
        // 2n - 2 - h with 13 hull vertices.
        assert_eq!(tri.simplices().len(), 29);

        let mut seen = HashSet::new();
        for &s in tri.simplices() {
            assert!(orient(points[s[0]], points[s[1]], points[s[2]]) > 0.0, "{:?} is not counter-clockwise", s);
            for e in directed_edges(s) {
                assert!(seen.insert(e), "edge {:?} is used twice", e);
            }
        }
        for x in 1..10 {
            let below = [x as f64, -c * 24.0];
            assert!(tri.locate(below).is_some(), "{:?} should be inside", below);
        }
    }

    #[test]
    fn test_fill_hull_leaves_convex_mesh_alone() {
        let points = unit_square();
        let mut simplices = vec![[0, 2, 1], [1, 2, 3]];
        assert!(fill_hull(&points, &mut simplices).is_empty());
        assert_eq!(simplices.len(), 2);
    }

    #[test]
    fn test_too_few_points() {
        assert!(Triangulation::new(&[[0.0, 0.0], [1.0, 1.0]]).is_err());
    }

    #[test]
    fn test_collinear_points_rejected() {
        let points = vec![[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        assert!(Triangulation::new(&points).is_err());
    }
}
