//! Skin depth and FastHenry filament sizing.

use crate::error::{InductorError, Result};
use log::debug;
use serde::Serialize;
use std::f64::consts::PI;

/// Conductivity of annealed copper (S/m).
pub const COPPER_CONDUCTIVITY: f64 = 5.8e7;
/// Vacuum permeability (H/m).
pub const MU_0: f64 = 4.0e-7 * PI;
/// Upper bound on the filament search; each step doubles the count.
pub const MAX_MESH_ITERATIONS: u32 = 32;

/// Filament ratio FastHenry uses when `nwinc`/`nhinc` > 1.
const FILAMENT_RATIO: f64 = 2.0;

/// Skin depth in copper (metres).
pub fn skin_depth(frequency_hz: f64) -> Result<f64> {
    if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
        return Err(InductorError::InvalidFrequency(frequency_hz));
    }
    Ok(1.0 / (PI * frequency_hz * MU_0 * COPPER_CONDUCTIVITY).sqrt())
}

/// Filament counts across the conductor cross-section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MeshSizing {
    pub width_subdivisions: u32,
    pub height_subdivisions: u32,
}

/// Smallest odd subdivision count whose thinnest filament is below the
/// skin depth.
///
/// With `n = 2k + 1` subdivisions and ratio `r` the cross-section is split
/// into `(2 - r^k (1 + r)) / (1 - r)` units, the outermost filament being
/// one unit wide.
pub fn subdivisions(dimension_m: f64, skin_depth_m: f64) -> Result<u32> {
    let mut n: u32 = 1;
    for _ in 0..MAX_MESH_ITERATIONS {
        let k = ((n - 1) / 2) as i32;
        let units = (2.0 - FILAMENT_RATIO.powi(k) * (1.0 + FILAMENT_RATIO)) / (1.0 - FILAMENT_RATIO);
        if dimension_m / units < skin_depth_m {
            return Ok(n);
        }
        n += 2;
    }
    Err(InductorError::MeshSizingDivergence {
        dimension: dimension_m,
        skin_depth: skin_depth_m,
        iterations: MAX_MESH_ITERATIONS,
    })
}

/// Size the mesh for a `trace_width` x `copper_thickness` (mm) trace.
pub fn mesh_sizing(trace_width: f64, copper_thickness: f64, skin_depth_m: f64) -> Result<MeshSizing> {
    let sizing = MeshSizing {
        width_subdivisions: subdivisions(trace_width * 1e-3, skin_depth_m)?,
        height_subdivisions: subdivisions(copper_thickness * 1e-3, skin_depth_m)?,
    };
    debug!(
        "mesh: nwinc={} nhinc={} (skin depth {:.4} mm)",
        sizing.width_subdivisions,
        sizing.height_subdivisions,
        skin_depth_m * 1e3
    );
    Ok(sizing)
}
