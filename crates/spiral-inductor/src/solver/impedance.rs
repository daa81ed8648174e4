//! Reduction of the port impedance matrix to a single series impedance.

use crate::design::Layers;
use crate::error::{InductorError, Result};
use num_complex::Complex64;
use serde::Serialize;
use std::f64::consts::TAU;

/// Square complex impedance matrix between ports at one frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpedanceMatrix {
    pub frequency_hz: f64,
    pub size: usize,
    /// Row-major, `size * size` entries.
    pub entries: Vec<Complex64>,
}

impl ImpedanceMatrix {
    pub fn new(frequency_hz: f64, size: usize, entries: Vec<Complex64>) -> Result<Self> {
        if entries.len() != size * size {
            return Err(InductorError::MalformedImpedance(format!(
                "{size} x {size} matrix needs {} entries, got {}",
                size * size,
                entries.len()
            )));
        }
        Ok(Self {
            frequency_hz,
            size,
            entries,
        })
    }

    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        self.entries[row * self.size + col]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EffectiveImpedance {
    pub frequency_hz: f64,
    pub resistance: f64,
    pub reactance: f64,
}

impl EffectiveImpedance {
    pub fn inductance_uh(&self) -> f64 {
        1e6 * self.reactance / (TAU * self.frequency_hz)
    }

    pub fn quality_factor(&self) -> Result<f64> {
        let q = self.reactance / self.resistance;
        if self.resistance == 0.0 || !q.is_finite() {
            return Err(InductorError::NonFiniteQuality {
                resistance: self.resistance,
                reactance: self.reactance,
            });
        }
        Ok(q)
    }
}

/// Series impedance seen between the inductor's two pads.
///
/// Both ports run inner end to outer end. With two layers the current
/// enters the top spiral at its outer end, so its port is traversed
/// backwards and the mutual terms subtract: `Z11 + Z22 - (Z12 + Z21)`.
/// This sign belongs to the port order emitted by `build_model`.
pub fn effective_impedance(matrix: &ImpedanceMatrix, layers: Layers) -> Result<EffectiveImpedance> {
    if matrix.size < layers.count() {
        return Err(InductorError::MalformedImpedance(format!(
            "{} layer(s) need a {n} x {n} matrix, got {m} x {m}",
            layers.count(),
            n = layers.count(),
            m = matrix.size
        )));
    }
    let z = match layers {
        Layers::One => matrix.get(0, 0),
        Layers::Two => {
            let mutual = matrix.get(0, 1) + matrix.get(1, 0);
            matrix.get(0, 0) + matrix.get(1, 1) - mutual
        }
    };
    Ok(EffectiveImpedance {
        frequency_hz: matrix.frequency_hz,
        resistance: z.re,
        reactance: z.im,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn test_single_layer_reads_self_term() {
        let m = ImpedanceMatrix::new(1e6, 1, vec![c(0.25, 40.0)]).unwrap();
        let z = effective_impedance(&m, Layers::One).unwrap();
        assert_eq!(z.resistance, 0.25);
        assert_eq!(z.reactance, 40.0);
        assert_relative_eq!(z.inductance_uh(), 40.0 / TAU, max_relative = 1e-12);
        assert_relative_eq!(z.quality_factor().unwrap(), 160.0);
    }

    #[test]
    fn test_two_layer_series_aiding() {
        let z11 = c(0.3, 41.0);
        let z22 = c(0.31, 40.5);
        let m1 = c(-0.01, -18.0);
        let m2 = c(-0.012, -18.2);
        let m = ImpedanceMatrix::new(2e6, 2, vec![z11, m1, m2, z22]).unwrap();
        let z = effective_impedance(&m, Layers::Two).unwrap();
        let expected = z11 + z22 - (m1 + m2);
        assert_eq!(z.resistance, expected.re);
        assert_eq!(z.reactance, expected.im);
        assert_eq!(z.frequency_hz, 2e6);
    }

    #[test]
    fn test_zero_resistance_quality() {
        let z = EffectiveImpedance {
            frequency_hz: 1e6,
            resistance: 0.0,
            reactance: 10.0,
        };
        assert!(matches!(
            z.quality_factor(),
            Err(InductorError::NonFiniteQuality { .. })
        ));
    }

    #[test]
    fn test_matrix_too_small_for_layers() {
        let m = ImpedanceMatrix::new(1e6, 1, vec![c(1.0, 1.0)]).unwrap();
        assert!(matches!(
            effective_impedance(&m, Layers::Two),
            Err(InductorError::MalformedImpedance(_))
        ));
    }

    #[test]
    fn test_entry_count_checked() {
        assert!(ImpedanceMatrix::new(1e6, 2, vec![c(1.0, 0.0); 3]).is_err());
    }
}
