//! Closed-form inductance estimate.
//!
//! Single layer: Mohan's current-sheet expression with the circular-spiral
//! coefficients. Two stacked layers: Zhao's empirical coupling factor.
//! Cheap enough to run on every keystroke.

use crate::design::{GeometrySpec, Layers, StackupSpec};
use crate::physics::MU_0;
use serde::Serialize;

// Current-sheet coefficients for a circular spiral.
const C1: f64 = 1.0;
const C2: f64 = 2.46;
const C3: f64 = 0.0;
const C4: f64 = 0.20;

/// Outcome of one estimate attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", content = "inductance_uh", rename_all = "snake_case")]
pub enum Estimate {
    /// Inductance in µH.
    Valid(f64),
    /// Inputs are mid-edit or out of range; keep whatever was shown before.
    TransientlyInvalid,
}

impl Estimate {
    pub fn value(self) -> Option<f64> {
        match self {
            Estimate::Valid(v) => Some(v),
            Estimate::TransientlyInvalid => None,
        }
    }
}

/// Inner and outer effective diameters (mm) of the copper annulus.
pub fn effective_diameters(turns: f64, inner_radius: f64, pitch: f64, trace_width: f64) -> (f64, f64) {
    let din = 2.0 * inner_radius - trace_width + pitch / 2.0;
    let dout = 2.0 * inner_radius + (2.0 * turns - 0.5) * pitch + trace_width;
    (din, dout)
}

/// Single-layer inductance (H) from turns and diameters in metres.
pub fn current_sheet_inductance(turns: f64, dout: f64, din: f64) -> f64 {
    let davg = 0.5 * (dout + din);
    let rho = (dout - din) / (dout + din);
    MU_0 * turns * turns * davg * C1 / 2.0 * ((C2 / rho).ln() + C3 * rho + C4 * rho * rho)
}

/// Coupling factor between two identical stacked spirals `separation_mm`
/// apart.
pub fn coupling_factor(turns: f64, separation_mm: f64) -> f64 {
    let x = separation_mm;
    let n2 = turns * turns;
    let distance_term = 0.184 * x.powi(3) - 0.525 * x.powi(2) + 1.038 * x + 1.001;
    let turns_term = 1.67 * n2 - 5.84 * turns + 65.0;
    n2 / (distance_term * turns_term * 0.64)
}

/// Estimate the inductance of the whole device.
///
/// Never fails: anything that would produce a meaningless number yields
/// `TransientlyInvalid`.
pub fn estimate_inductance(geom: &GeometrySpec, stackup: &StackupSpec) -> Estimate {
    let inputs = [
        geom.turns,
        geom.inner_radius,
        geom.pitch,
        geom.trace_width,
    ];
    if inputs.iter().any(|v| !v.is_finite() || *v <= 0.0) {
        return Estimate::TransientlyInvalid;
    }
    let (din, dout) = effective_diameters(geom.turns, geom.inner_radius, geom.pitch, geom.trace_width);
    if din <= 0.0 || dout <= din {
        return Estimate::TransientlyInvalid;
    }
    let single = current_sheet_inductance(geom.turns, dout * 1e-3, din * 1e-3);
    let total = match stackup.layers {
        Layers::One => single,
        Layers::Two => {
            if !stackup.board_thickness.is_finite() || stackup.board_thickness <= 0.0 {
                return Estimate::TransientlyInvalid;
            }
            2.0 * single * (1.0 + coupling_factor(geom.turns, stackup.board_thickness))
        }
    };
    let uh = total * 1e6;
    if uh.is_finite() && uh > 0.0 {
        Estimate::Valid(uh)
    } else {
        Estimate::TransientlyInvalid
    }
}

/// Raw text of the fields the estimate depends on, as typed.
#[derive(Debug, Clone, Default)]
pub struct EstimateFields<'a> {
    pub turns: &'a str,
    pub inner_radius: &'a str,
    pub pitch: &'a str,
    pub trace_width: &'a str,
    pub board_thickness: &'a str,
    pub layers: &'a str,
}

impl EstimateFields<'_> {
    fn parse(&self) -> Option<(GeometrySpec, StackupSpec)> {
        let num = |s: &str| s.trim().parse::<f64>().ok();
        let layers = self.layers.trim().parse::<u8>().ok()?;
        let geom = GeometrySpec {
            turns: num(self.turns)?,
            inner_radius: num(self.inner_radius)?,
            pitch: num(self.pitch)?,
            trace_width: num(self.trace_width)?,
            ..GeometrySpec::default()
        };
        let stackup = StackupSpec {
            layers: Layers::try_from(layers).ok()?,
            board_thickness: num(self.board_thickness)?,
            ..StackupSpec::default()
        };
        Some((geom, stackup))
    }
}

/// Holds the last good estimate across edits.
#[derive(Debug, Clone, Default)]
pub struct EstimateTracker {
    last: Option<f64>,
}

impl EstimateTracker {
    pub fn current(&self) -> Option<f64> {
        self.last
    }

    /// Re-estimate from numeric inputs, retaining the previous value when
    /// they are invalid.
    pub fn update(&mut self, geom: &GeometrySpec, stackup: &StackupSpec) -> Option<f64> {
        if let Estimate::Valid(v) = estimate_inductance(geom, stackup) {
            self.last = Some(v);
        }
        self.last
    }

    /// Re-estimate from text fields. Unparseable text leaves the previous
    /// estimate in place.
    pub fn refresh(&mut self, fields: &EstimateFields<'_>) -> Option<f64> {
        match fields.parse() {
            Some((geom, stackup)) => self.update(&geom, &stackup),
            None => self.last,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reference_geom() -> GeometrySpec {
        GeometrySpec {
            turns: 13.0,
            inner_radius: 5.0,
            pitch: 3.0,
            trace_width: 2.0,
            ..GeometrySpec::default()
        }
    }

    #[test]
    fn test_effective_diameters() {
        let (din, dout) = effective_diameters(13.0, 5.0, 3.0, 2.0);
        assert_relative_eq!(din, 9.5);
        assert_relative_eq!(dout, 88.5);
    }

    #[test]
    fn test_reference_single_layer() {
        let l = estimate_inductance(&reference_geom(), &StackupSpec::default())
            .value()
            .unwrap();
        assert_relative_eq!(l, 6.4812, max_relative = 0.01);
    }

    #[test]
    fn test_reference_two_layer() {
        let stackup = StackupSpec {
            layers: Layers::Two,
            ..StackupSpec::default()
        };
        assert_relative_eq!(coupling_factor(13.0, 1.6), 0.46985, max_relative = 1e-3);
        let l = estimate_inductance(&reference_geom(), &stackup).value().unwrap();
        assert_relative_eq!(l, 19.053, max_relative = 0.01);
    }

    #[test]
    fn test_more_turns_more_inductance() {
        let a = estimate_inductance(&reference_geom(), &StackupSpec::default());
        let b = estimate_inductance(
            &GeometrySpec {
                turns: 14.0,
                ..reference_geom()
            },
            &StackupSpec::default(),
        );
        assert!(b.value().unwrap() > a.value().unwrap());
    }

    #[test]
    fn test_invalid_numbers_are_transient() {
        let geom = GeometrySpec {
            pitch: f64::NAN,
            ..reference_geom()
        };
        assert_eq!(
            estimate_inductance(&geom, &StackupSpec::default()),
            Estimate::TransientlyInvalid
        );
        let geom = GeometrySpec {
            turns: 0.0,
            ..reference_geom()
        };
        assert_eq!(
            estimate_inductance(&geom, &StackupSpec::default()),
            Estimate::TransientlyInvalid
        );
    }

    #[test]
    fn test_tracker_keeps_last_value_on_bad_text() {
        let mut tracker = EstimateTracker::default();
        let good = EstimateFields {
            turns: "13",
            inner_radius: "5",
            pitch: "3",
            trace_width: "2",
            board_thickness: "1.6",
            layers: "1",
        };
        let first = tracker.refresh(&good).unwrap();
        assert_relative_eq!(first, 6.4812, max_relative = 0.01);

        let mid_edit = EstimateFields {
            pitch: "3.",
            trace_width: "",
            ..good.clone()
        };
        assert_eq!(tracker.refresh(&mid_edit), Some(first));

        let bad_layers = EstimateFields {
            layers: "3",
            ..good.clone()
        };
        assert_eq!(tracker.refresh(&bad_layers), Some(first));

        let two = EstimateFields {
            layers: "2",
            ..good
        };
        let second = tracker.refresh(&two).unwrap();
        assert!(second > first);
        assert_eq!(tracker.current(), Some(second));
    }

    #[test]
    fn test_estimate_serializes_with_status() {
        let json = serde_json::to_string(&Estimate::Valid(1.5)).unwrap();
        assert_eq!(json, r#"{"status":"valid","inductance_uh":1.5}"#);
        let json = serde_json::to_string(&Estimate::TransientlyInvalid).unwrap();
        assert_eq!(json, r#"{"status":"transiently_invalid"}"#);
    }
}
