pub mod design;
pub mod error;
pub mod estimate;
pub mod footprint;
pub mod geometry;
pub mod optimize;
pub mod physics;
pub mod solver;
pub mod types;

use design::{Design, FrequencySpec, GeometrySpec, StackupSpec};
use error::Result;
use log::{info, warn};
use optimize::InductanceEvaluator;
use physics::MeshSizing;
use serde::Serialize;
use solver::{build_model, effective_impedance, SimulationRunner};

/// Outcome of one field-solver run, reduced to the two-pad view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationReport {
    pub frequency_hz: f64,
    pub inductance_uh: f64,
    pub resistance: f64,
    pub reactance: f64,
    /// `None` when the resistance is zero and Q is undefined.
    pub quality_factor: Option<f64>,
    pub skin_depth: f64,
    pub mesh: MeshSizing,
}

/// Build the field-solver model for `design`, run it and interpret the
/// first frequency's impedance matrix.
pub fn simulate<R: SimulationRunner + ?Sized>(design: &Design, runner: &R) -> Result<SimulationReport> {
    let Design {
        geometry,
        stackup,
        frequency,
    } = design;
    geometry.validate()?;
    stackup.validate()?;

    let delta = physics::skin_depth(frequency.frequency_hz)?;
    let mesh = physics::mesh_sizing(geometry.trace_width, stackup.copper_thickness, delta)?;
    info!(
        "skin depth {:.3} um, mesh {}x{}",
        delta * 1e6,
        mesh.width_subdivisions,
        mesh.height_subdivisions
    );

    let model = build_model(geometry, stackup, mesh, frequency)?;
    let matrices = runner.run(&model)?;
    let matrix = matrices.first().ok_or_else(|| {
        error::InductorError::MalformedImpedance("solver returned no impedance matrices".into())
    })?;
    let z = effective_impedance(matrix, stackup.layers)?;

    let quality_factor = match z.quality_factor() {
        Ok(q) => Some(q),
        Err(e) => {
            warn!("{e}");
            None
        }
    };

    Ok(SimulationReport {
        frequency_hz: z.frequency_hz,
        inductance_uh: z.inductance_uh(),
        resistance: z.resistance,
        reactance: z.reactance,
        quality_factor,
        skin_depth: delta,
        mesh,
    })
}

/// Optimizer objective that runs the full simulation for each candidate.
pub struct SimulationEvaluator<R> {
    pub runner: R,
    pub stackup: StackupSpec,
    pub frequency: FrequencySpec,
}

impl<R: SimulationRunner> InductanceEvaluator for SimulationEvaluator<R> {
    fn inductance_uh(&mut self, geom: &GeometrySpec) -> Result<f64> {
        let design = Design {
            geometry: *geom,
            stackup: self.stackup,
            frequency: self.frequency,
        };
        Ok(simulate(&design, &self.runner)?.inductance_uh)
    }
}
