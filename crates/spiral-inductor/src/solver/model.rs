//! Solver-ready conductor model and its FastHenry input deck.

use crate::design::{FrequencySpec, GeometrySpec, Resolution, StackupSpec};
use crate::error::{InductorError, Result};
use crate::geometry::spiral_path;
use crate::physics::{MeshSizing, COPPER_CONDUCTIVITY};
use log::debug;
use std::fmt::Write;

/// Chord tolerance (mm) used to flatten arc paths into solver segments.
pub const ARC_FLATTEN_DEVIATION: f64 = 0.05;

/// One spiral layer: a chain of nodes joined by straight segments of a
/// common rectangular cross-section.
#[derive(Debug, Clone, PartialEq)]
pub struct Conductor {
    /// 1-based layer number, top first.
    pub layer: usize,
    /// Node positions (x, y, z) in mm, innermost first.
    pub nodes: Vec<[f64; 3]>,
    pub width: f64,
    pub height: f64,
    pub mesh: MeshSizing,
}

impl Conductor {
    pub fn node_name(&self, index: usize) -> String {
        format!("N{}_{}", self.layer, index)
    }

    pub fn segment_count(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }
}

/// A port between two nodes of the same conductor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Port {
    pub conductor: usize,
    pub from_node: usize,
    pub to_node: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationModel {
    pub mesh: MeshSizing,
    pub conductors: Vec<Conductor>,
    /// Port `i` belongs to conductor `i` and runs from its inner end to
    /// its outer end.
    pub ports: Vec<Port>,
    pub frequencies: Vec<f64>,
}

/// Assemble the conductor mesh, ports and frequency list.
///
/// A second layer sits one board thickness (plus foil) below the first
/// and winds the opposite way, so joining the two inner ends with a via
/// gives a series-aiding pair.
pub fn build_model(
    geom: &GeometrySpec,
    stackup: &StackupSpec,
    mesh: MeshSizing,
    freq: &FrequencySpec,
) -> Result<SimulationModel> {
    geom.validate()?;
    stackup.validate()?;
    if !freq.frequency_hz.is_finite() || freq.frequency_hz <= 0.0 {
        return Err(InductorError::InvalidFrequency(freq.frequency_hz));
    }

    let flatten = match geom.resolution {
        Resolution::MaxDeviation(d) => d,
        Resolution::ArcsPerTurn(_) => ARC_FLATTEN_DEVIATION,
    };
    let layer_pitch = stackup.board_thickness + stackup.copper_thickness;

    let mut conductors = Vec::with_capacity(stackup.layers.count());
    let mut ports = Vec::with_capacity(stackup.layers.count());
    for index in 0..stackup.layers.count() {
        let layer_geom = if index == 0 {
            *geom
        } else {
            geom.with_direction(geom.direction.reversed())
        };
        let z = 0.0 - index as f64 * layer_pitch;
        let nodes: Vec<[f64; 3]> = spiral_path(&layer_geom)?
            .to_polyline(flatten)
            .into_iter()
            .map(|p| [p.x, p.y, z])
            .collect();
        ports.push(Port {
            conductor: index,
            from_node: 0,
            to_node: nodes.len() - 1,
        });
        debug!("layer {}: {} segments at z={z}", index + 1, nodes.len() - 1);
        conductors.push(Conductor {
            layer: index + 1,
            nodes,
            width: geom.trace_width,
            height: stackup.copper_thickness,
            mesh,
        });
    }

    Ok(SimulationModel {
        mesh,
        conductors,
        ports,
        frequencies: vec![freq.frequency_hz],
    })
}

impl SimulationModel {
    /// Render the FastHenry `.inp` deck.
    ///
    /// A frequency list longer than one point becomes a one-point-per-decade
    /// sweep between its extremes.
    pub fn to_fasthenry(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_fasthenry(&mut out);
        out
    }

    fn write_fasthenry(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "* planar spiral inductor, {} layer(s)", self.conductors.len())?;
        writeln!(out, ".units mm")?;
        writeln!(
            out,
            ".default sigma={} nwinc={} nhinc={}",
            COPPER_CONDUCTIVITY / 1e3,
            self.mesh.width_subdivisions,
            self.mesh.height_subdivisions
        )?;

        for conductor in &self.conductors {
            writeln!(out, "* layer {}", conductor.layer)?;
            for (i, [x, y, z]) in conductor.nodes.iter().enumerate() {
                writeln!(out, "{} x={x:.6} y={y:.6} z={z:.6}", conductor.node_name(i))?;
            }
            for i in 0..conductor.segment_count() {
                writeln!(
                    out,
                    "E{}_{i} {} {} w={} h={} nwinc={} nhinc={}",
                    conductor.layer,
                    conductor.node_name(i),
                    conductor.node_name(i + 1),
                    conductor.width,
                    conductor.height,
                    conductor.mesh.width_subdivisions,
                    conductor.mesh.height_subdivisions
                )?;
            }
        }

        for port in &self.ports {
            let conductor = &self.conductors[port.conductor];
            writeln!(
                out,
                ".external {} {}",
                conductor.node_name(port.from_node),
                conductor.node_name(port.to_node)
            )?;
        }

        let fmin = self.frequencies.iter().copied().fold(f64::INFINITY, f64::min);
        let fmax = self.frequencies.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        writeln!(out, ".freq fmin={fmin:e} fmax={fmax:e} ndec=1")?;
        writeln!(out, ".end")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{Layers, Winding};
    use approx::assert_abs_diff_eq;

    const MESH: MeshSizing = MeshSizing {
        width_subdivisions: 9,
        height_subdivisions: 1,
    };

    fn geom() -> GeometrySpec {
        GeometrySpec {
            turns: 2.0,
            inner_radius: 5.0,
            pitch: 3.0,
            trace_width: 2.0,
            direction: Winding::CounterClockwise,
            resolution: Resolution::MaxDeviation(0.1),
        }
    }

    fn two_layer() -> StackupSpec {
        StackupSpec {
            layers: Layers::Two,
            copper_thickness: 0.035,
            board_thickness: 1.6,
        }
    }

    #[test]
    fn test_single_layer_model() {
        let model = build_model(&geom(), &StackupSpec::default(), MESH, &FrequencySpec::default())
            .unwrap();
        assert_eq!(model.conductors.len(), 1);
        assert_eq!(model.ports.len(), 1);
        let c = &model.conductors[0];
        assert_eq!(model.ports[0].from_node, 0);
        assert_eq!(model.ports[0].to_node, c.nodes.len() - 1);
        assert_eq!(c.width, 2.0);
        assert_eq!(c.height, 0.035);
        assert!(c.nodes.iter().all(|n| n[2] == 0.0));
        assert_eq!(model.frequencies, vec![1e6]);
    }

    #[test]
    fn test_second_layer_is_mirrored_and_offset() {
        let model = build_model(&geom(), &two_layer(), MESH, &FrequencySpec::default()).unwrap();
        assert_eq!(model.conductors.len(), 2);
        let (top, bottom) = (&model.conductors[0], &model.conductors[1]);
        assert_eq!(top.nodes.len(), bottom.nodes.len());
        for (a, b) in top.nodes.iter().zip(&bottom.nodes) {
            assert_abs_diff_eq!(a[0], b[0], epsilon = 1e-12);
            assert_abs_diff_eq!(a[1], -b[1], epsilon = 1e-12);
            assert_abs_diff_eq!(b[2], -1.635, epsilon = 1e-12);
        }
        assert_eq!(model.ports[1].conductor, 1);
    }

    #[test]
    fn test_arc_geometry_is_flattened() {
        let g = GeometrySpec {
            resolution: Resolution::ArcsPerTurn(4),
            ..geom()
        };
        let model = build_model(&g, &StackupSpec::default(), MESH, &FrequencySpec::default()).unwrap();
        assert!(model.conductors[0].nodes.len() > 9);
    }

    #[test]
    fn test_rejects_bad_frequency() {
        let err = build_model(
            &geom(),
            &StackupSpec::default(),
            MESH,
            &FrequencySpec { frequency_hz: 0.0 },
        )
        .unwrap_err();
        assert!(matches!(err, InductorError::InvalidFrequency(_)));
    }

    #[test]
    fn test_fasthenry_deck() {
        let model = build_model(&geom(), &two_layer(), MESH, &FrequencySpec::default()).unwrap();
        let deck = model.to_fasthenry();
        assert!(deck.contains(".units mm"));
        assert!(deck.contains(".default sigma=58000 nwinc=9 nhinc=1"));
        assert!(deck.contains("N1_0 x=5.000000 y=0.000000 z=0.000000"));
        assert!(deck.contains("E2_0 N2_0 N2_1 w=2 h=0.035 nwinc=9 nhinc=1"));
        let last = model.conductors[0].nodes.len() - 1;
        assert!(deck.contains(&format!(".external N1_0 N1_{last}")));
        assert!(deck.contains(&format!(".external N2_0 N2_{last}")));
        assert!(deck.contains(".freq fmin=1e6 fmax=1e6 ndec=1"));
        assert!(deck.trim_end().ends_with(".end"));
        let segments = deck.lines().filter(|l| l.starts_with('E')).count();
        assert_eq!(segments, 2 * last);
    }
}
