pub mod fasthenry;
pub mod impedance;
pub mod model;

pub use fasthenry::{parse_zc, FastHenryConfig, FastHenryRunner};
pub use impedance::{effective_impedance, EffectiveImpedance, ImpedanceMatrix};
pub use model::{build_model, SimulationModel};

use crate::error::Result;

/// Executes an external field solver on a model.
///
/// Returns one impedance matrix per solved frequency, indexed by the
/// model's port order. Failures are final; callers decide on retries.
pub trait SimulationRunner {
    fn run(&self, model: &SimulationModel) -> Result<Vec<ImpedanceMatrix>>;
}

impl<R: SimulationRunner + ?Sized> SimulationRunner for &R {
    fn run(&self, model: &SimulationModel) -> Result<Vec<ImpedanceMatrix>> {
        (**self).run(model)
    }
}
