//! Archimedean spiral discretisation.
//!
//! The centre line starts on the +x axis at `inner_radius` and grows by
//! `pitch` per revolution. The same path feeds both the solver mesh and
//! the footprint tracks.

use super::point::Point;
use crate::design::{GeometrySpec, Resolution};
use crate::error::Result;
use log::debug;
use std::f64::consts::{FRAC_PI_2, TAU};

/// A circular arc given by its centre, start point and signed sweep
/// (radians, positive is counter-clockwise).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcSegment {
    pub center: Point,
    pub start: Point,
    pub sweep: f64,
}

impl ArcSegment {
    pub fn radius(&self) -> f64 {
        self.start.distance(self.center)
    }

    pub fn end(&self) -> Point {
        self.start.rotate_about(self.center, self.sweep)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpiralPath {
    Polyline(Vec<Point>),
    Arcs(Vec<ArcSegment>),
}

impl SpiralPath {
    /// Innermost point of the path.
    pub fn start_point(&self) -> Point {
        match self {
            SpiralPath::Polyline(pts) => pts.first().copied().unwrap_or_default(),
            SpiralPath::Arcs(arcs) => arcs.first().map(|a| a.start).unwrap_or_default(),
        }
    }

    /// Outermost point of the path.
    pub fn end_point(&self) -> Point {
        match self {
            SpiralPath::Polyline(pts) => pts.last().copied().unwrap_or_default(),
            SpiralPath::Arcs(arcs) => arcs.last().map(ArcSegment::end).unwrap_or_default(),
        }
    }

    /// Polyline vertices, flattening arcs so no chord strays further than
    /// `max_deviation` from its arc.
    pub fn to_polyline(&self, max_deviation: f64) -> Vec<Point> {
        match self {
            SpiralPath::Polyline(pts) => pts.clone(),
            SpiralPath::Arcs(arcs) => {
                let mut pts = Vec::new();
                for arc in arcs {
                    let step = max_chord_angle(arc.radius(), max_deviation);
                    let n = (arc.sweep.abs() / step).ceil().max(1.0) as usize;
                    for i in 0..n {
                        let t = arc.sweep * i as f64 / n as f64;
                        pts.push(arc.start.rotate_about(arc.center, t));
                    }
                }
                if let Some(last) = arcs.last() {
                    pts.push(last.end());
                }
                pts
            }
        }
    }
}

/// Largest angle a chord of a circle with `radius` may span while its
/// sagitta stays within `max_deviation`.
fn max_chord_angle(radius: f64, max_deviation: f64) -> f64 {
    if max_deviation >= radius {
        return FRAC_PI_2;
    }
    (2.0 * (1.0 - max_deviation / radius).acos()).min(FRAC_PI_2)
}

/// Centre-line point after `theta` radians of unwinding.
fn spiral_point(geom: &GeometrySpec, theta: f64) -> Point {
    let radius = geom.inner_radius + geom.pitch * theta / TAU;
    Point::polar(radius, geom.direction.sign() * theta)
}

/// Generate the spiral path from innermost to outermost point.
pub fn spiral_path(geom: &GeometrySpec) -> Result<SpiralPath> {
    geom.validate()?;
    let path = match geom.resolution {
        Resolution::MaxDeviation(d) => SpiralPath::Polyline(polyline(geom, d)),
        Resolution::ArcsPerTurn(n) => SpiralPath::Arcs(arcs(geom, n)),
    };
    Ok(path)
}

fn polyline(geom: &GeometrySpec, max_deviation: f64) -> Vec<Point> {
    let total = TAU * geom.turns;
    // The outermost turn has the largest sagitta for a given angle step.
    let max_step = max_chord_angle(geom.outer_radius(), max_deviation);
    let steps = (total / max_step).ceil().max(1.0) as usize;
    let step = total / steps as f64;
    debug!("spiral polyline: {steps} segments, {step:.5} rad each");

    (0..=steps)
        .map(|i| spiral_point(geom, i as f64 * step))
        .collect()
}

fn arcs(geom: &GeometrySpec, per_turn: u32) -> Vec<ArcSegment> {
    let total = TAU * geom.turns;
    // Tolerate float noise in turns * per_turn for whole arc counts.
    let count = (geom.turns * per_turn as f64 - 1e-9).ceil().max(1.0) as usize;
    let span = total / count as f64;
    let sign = geom.direction.sign();
    let half = 0.5 * span;
    debug!("spiral arcs: {count} arcs, {span:.5} rad each");

    let mut out: Vec<ArcSegment> = Vec::with_capacity(count);
    let mut start = spiral_point(geom, 0.0);
    for k in 1..=count {
        let target = spiral_point(geom, k as f64 * span);
        let chord = start.distance(target);
        let mid = start.midpoint(target);
        // Circle through both points whose arc between them spans `span`.
        let radius = chord / (2.0 * half.sin());
        let offset = radius * half.cos();
        let (nx, ny) = (
            -sign * (target.y - start.y) / chord,
            sign * (target.x - start.x) / chord,
        );
        let arc = ArcSegment {
            center: Point::new(mid.x + nx * offset, mid.y + ny * offset),
            start,
            sweep: sign * span,
        };
        start = arc.end();
        out.push(arc);
    }
    out
}
