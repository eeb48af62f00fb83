use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Raw centerline sample as it comes out of a track file, before any
/// geometry has been derived. Widths are measured from the centerline to
/// the respective track edge.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct TrackSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w_tr_left: f64,
    pub w_tr_right: f64,
    /// Banking angle (rad)
    pub banking: f64,
}

/// Centerline point with derived geometry attached.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct TrackPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w_tr_left: f64,
    pub w_tr_right: f64,
    pub banking: f64,
    /// Cumulative arc length from the start line (m)
    pub s: f64,
    /// Heading (rad)
    pub psi: f64,
    /// Signed curvature (1/m), positive = left-hand turn
    pub kappa: f64,
    /// Segment length to the next point, wrapping at the loop closure (m)
    pub ds: f64,
}

/// A preprocessed closed-loop track. The point sequence is cyclic: the last
/// point's segment connects back to the first. Construction derives arc
/// length, heading and curvature once; the track is immutable afterwards.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct Track {
    name: String,
    points: Vec<TrackPoint>,
    total_length: f64,
}

impl Track {
    /// Build a track from raw samples, closing the loop implicitly.
    pub fn from_samples(name: impl Into<String>, samples: &[TrackSample]) -> Result<Self, ModelError> {
        if samples.len() < 3 {
            return Err(ModelError::TooFewPoints(samples.len()));
        }

        let mut points: Vec<TrackPoint> = samples
            .iter()
            .map(|p| TrackPoint {
                x: p.x,
                y: p.y,
                z: p.z,
                w_tr_left: p.w_tr_left,
                w_tr_right: p.w_tr_right,
                banking: p.banking,
                s: 0.0,
                psi: 0.0,
                kappa: 0.0,
                ds: 0.0,
            })
            .collect();

        let total_length = compute_arc_length(&mut points);
        compute_heading(&mut points);
        compute_curvature(&mut points, total_length);

        Ok(Self { name: name.into(), points, total_length })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn total_length(&self) -> f64 {
        self.total_length
    }

    pub fn point(&self, index: usize) -> &TrackPoint {
        &self.points[index]
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    /// Interpolated centerline point at arc length `s`. Out-of-range values
    /// wrap around the loop; heading interpolation is angle-aware.
    pub fn point_at(&self, s: f64) -> TrackPoint {
        let s = s.rem_euclid(self.total_length);
        let i = self.index_at(s);
        let i_next = (i + 1) % self.points.len();

        let p1 = &self.points[i];
        let p2 = &self.points[i_next];

        let t = if p1.ds > 1e-6 { ((s - p1.s) / p1.ds).clamp(0.0, 1.0) } else { 0.0 };

        let dpsi = normalize_angle(p2.psi - p1.psi);

        TrackPoint {
            x: p1.x + t * (p2.x - p1.x),
            y: p1.y + t * (p2.y - p1.y),
            z: p1.z + t * (p2.z - p1.z),
            w_tr_left: p1.w_tr_left + t * (p2.w_tr_left - p1.w_tr_left),
            w_tr_right: p1.w_tr_right + t * (p2.w_tr_right - p1.w_tr_right),
            banking: p1.banking + t * (p2.banking - p1.banking),
            s,
            psi: normalize_angle(p1.psi + t * dpsi),
            kappa: p1.kappa + t * (p2.kappa - p1.kappa),
            ds: p1.ds,
        }
    }

    pub fn curvature_at(&self, s: f64) -> f64 {
        self.point_at(s).kappa
    }

    /// Whether a lateral offset `n` from the centerline at arc length `s`
    /// stays between the track edges (n > 0 is left of the centerline).
    pub fn is_within_bounds(&self, s: f64, n: f64) -> bool {
        let point = self.point_at(s);
        n >= -point.w_tr_right && n <= point.w_tr_left
    }

    /// Index of the point at or just before arc length `s` (s already
    /// normalized into [0, total_length)).
    fn index_at(&self, s: f64) -> usize {
        self.points.partition_point(|p| p.s <= s).saturating_sub(1)
    }
}

fn compute_arc_length(points: &mut [TrackPoint]) -> f64 {
    let n = points.len();
    points[0].s = 0.0;

    for i in 1..n {
        let seg = distance(&points[i - 1], &points[i]);
        points[i - 1].ds = seg;
        points[i].s = points[i - 1].s + seg;
    }

    // close the loop: last point connects back to the first
    points[n - 1].ds = distance(&points[n - 1], &points[0]);
    points[n - 1].s + points[n - 1].ds
}

fn compute_heading(points: &mut [TrackPoint]) {
    let n = points.len();
    for i in 0..n {
        // central difference, wrapping at the loop boundary
        let i_prev = (i + n - 1) % n;
        let i_next = (i + 1) % n;

        let dx = points[i_next].x - points[i_prev].x;
        let dy = points[i_next].y - points[i_prev].y;
        points[i].psi = dy.atan2(dx);
    }
}

fn compute_curvature(points: &mut [TrackPoint], total_length: f64) {
    let n = points.len();
    for i in 0..n {
        let i_prev = (i + n - 1) % n;
        let i_next = (i + 1) % n;

        let dpsi = normalize_angle(points[i_next].psi - points[i_prev].psi);

        let mut ds = points[i_next].s - points[i_prev].s;
        if ds < 0.0 {
            ds += total_length; // wraparound at the start line
        }

        points[i].kappa = if ds > 1e-6 { dpsi / ds } else { 0.0 };
    }
}

fn distance(a: &TrackPoint, b: &TrackPoint) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let dz = b.z - a.z;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Normalize an angle into (-PI, PI].
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle;
    while a > PI {
        a -= 2.0 * PI;
    }
    while a < -PI {
        a += 2.0 * PI;
    }
    a
}
