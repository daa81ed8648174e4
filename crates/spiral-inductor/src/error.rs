use thiserror::Error;

pub type Result<T> = std::result::Result<T, InductorError>;

#[derive(Error, Debug)]
pub enum InductorError {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("invalid frequency: {0} Hz")]
    InvalidFrequency(f64),

    #[error("filament mesh sizing did not converge after {iterations} iterations (dimension {dimension} m, skin depth {skin_depth} m)")]
    MeshSizingDivergence {
        dimension: f64,
        skin_depth: f64,
        iterations: u32,
    },

    #[error("solver invocation failed: {0}")]
    SolverInvocation(String),

    #[error("malformed impedance data: {0}")]
    MalformedImpedance(String),

    #[error("quality factor is not finite (R = {resistance} ohm, X = {reactance} ohm)")]
    NonFiniteQuality { resistance: f64, reactance: f64 },

    #[error("invalid optimizer setting: {0}")]
    InvalidOptimizerSetting(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
