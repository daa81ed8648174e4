use clap::{Args, Parser, Subcommand};
use log::info;
use serde::Serialize;
use spiral_inductor::design::{
    derive_pitch_spacing, Design, EditedField, GeometrySpec, Layers, Resolution, Winding, WindingDims,
};
use spiral_inductor::error::{InductorError, Result};
use spiral_inductor::estimate::estimate_inductance;
use spiral_inductor::footprint::build_footprint;
use spiral_inductor::optimize::{
    AnalyticEvaluator, CancelToken, InductanceEvaluator, OptimizationResult, OptimizerConfig, Progress,
    SpacingOptimizer,
};
use spiral_inductor::physics::{mesh_sizing, skin_depth};
use spiral_inductor::solver::{FastHenryConfig, FastHenryRunner};
use spiral_inductor::{simulate, SimulationEvaluator};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "spiral-inductor", about = "Design planar spiral PCB inductors")]
struct Cli {
    /// Output JSON file (stdout if not specified)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Copper skin depth and filament mesh at a frequency
    SkinDepth {
        #[command(flatten)]
        design: DesignArgs,
    },
    /// Closed-form inductance estimate
    Estimate {
        #[command(flatten)]
        design: DesignArgs,
    },
    /// Run FastHenry on the design
    Simulate {
        #[command(flatten)]
        design: DesignArgs,
        #[command(flatten)]
        solver: SolverArgs,
    },
    /// Search the conductor spacing that hits a target inductance
    Optimize {
        #[command(flatten)]
        design: DesignArgs,
        #[command(flatten)]
        solver: SolverArgs,
        /// Target inductance (uH)
        #[arg(long)]
        target: f64,
        /// Smallest allowed spacing (mm)
        #[arg(long)]
        min_spacing: Option<f64>,
        /// Acceptable inductance error (uH)
        #[arg(long)]
        tolerance: Option<f64>,
        #[arg(long)]
        max_evaluations: Option<usize>,
        /// Use the closed-form estimate instead of FastHenry
        #[arg(long)]
        analytic: bool,
    },
    /// Emit the copper footprint as JSON
    Footprint {
        #[command(flatten)]
        design: DesignArgs,
    },
}

/// Design parameters; flags override values read from `--design`.
#[derive(Args)]
struct DesignArgs {
    /// JSON design file
    #[arg(long)]
    design: Option<PathBuf>,
    #[arg(long)]
    turns: Option<f64>,
    /// Radius where the spiral starts (mm)
    #[arg(long)]
    inner_radius: Option<f64>,
    /// Centre-to-centre distance between turns (mm)
    #[arg(long, conflicts_with = "spacing")]
    pitch: Option<f64>,
    /// Copper gap between turns (mm); sets the pitch
    #[arg(long)]
    spacing: Option<f64>,
    /// Trace width (mm)
    #[arg(long)]
    trace_width: Option<f64>,
    /// Wind clockwise from the inner end
    #[arg(long)]
    clockwise: bool,
    /// Approximate with circular arcs, this many per turn
    #[arg(long, conflicts_with = "max_deviation")]
    arcs_per_turn: Option<u32>,
    /// Approximate with straight segments within this deviation (mm)
    #[arg(long)]
    max_deviation: Option<f64>,
    /// Copper layers (1 or 2)
    #[arg(long)]
    layers: Option<u8>,
    /// Copper thickness (mm)
    #[arg(long)]
    copper_thickness: Option<f64>,
    /// Board thickness (mm)
    #[arg(long)]
    board_thickness: Option<f64>,
    /// Simulation frequency (Hz)
    #[arg(long)]
    frequency: Option<f64>,
}

impl DesignArgs {
    fn resolve(&self) -> Result<Design> {
        let mut design = match &self.design {
            Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
            None => Design::default(),
        };
        let geom: &mut GeometrySpec = &mut design.geometry;
        if let Some(v) = self.turns {
            geom.turns = v;
        }
        if let Some(v) = self.inner_radius {
            geom.inner_radius = v;
        }
        if let Some(v) = self.trace_width {
            geom.trace_width = v;
        }
        if let Some(v) = self.pitch {
            geom.pitch = v;
        }
        if let Some(v) = self.spacing {
            let dims = WindingDims {
                pitch: geom.pitch,
                spacing: v,
                trace_width: geom.trace_width,
            };
            geom.pitch = derive_pitch_spacing(EditedField::Spacing, dims).pitch;
        }
        if self.clockwise {
            geom.direction = Winding::Clockwise;
        }
        if let Some(n) = self.arcs_per_turn {
            geom.resolution = Resolution::ArcsPerTurn(n);
        }
        if let Some(d) = self.max_deviation {
            geom.resolution = Resolution::MaxDeviation(d);
        }
        if let Some(n) = self.layers {
            design.stackup.layers = Layers::try_from(n).map_err(InductorError::InvalidGeometry)?;
        }
        if let Some(v) = self.copper_thickness {
            design.stackup.copper_thickness = v;
        }
        if let Some(v) = self.board_thickness {
            design.stackup.board_thickness = v;
        }
        if let Some(v) = self.frequency {
            design.frequency.frequency_hz = v;
        }
        Ok(design)
    }
}

#[derive(Args)]
struct SolverArgs {
    /// FastHenry executable
    #[arg(long, default_value = "fasthenry")]
    fasthenry: String,
    /// Solver timeout (seconds)
    #[arg(long, default_value_t = 300)]
    timeout: u64,
}

impl SolverArgs {
    fn runner(&self) -> FastHenryRunner {
        FastHenryRunner::new(FastHenryConfig {
            executable: self.fasthenry.clone(),
            timeout_secs: self.timeout,
        })
    }
}

#[derive(Serialize)]
struct SkinDepthOutput {
    frequency_hz: f64,
    skin_depth_mm: f64,
    width_subdivisions: u32,
    height_subdivisions: u32,
}

#[derive(Serialize)]
struct OptimizeOutput {
    #[serde(flatten)]
    result: OptimizationResult,
    geometry: GeometrySpec,
}

fn run(command: &Command) -> Result<serde_json::Value> {
    let value = match command {
        Command::SkinDepth { design } => {
            let design = design.resolve()?;
            let delta = skin_depth(design.frequency.frequency_hz)?;
            let mesh = mesh_sizing(
                design.geometry.trace_width,
                design.stackup.copper_thickness,
                delta,
            )?;
            serde_json::to_value(SkinDepthOutput {
                frequency_hz: design.frequency.frequency_hz,
                skin_depth_mm: delta * 1e3,
                width_subdivisions: mesh.width_subdivisions,
                height_subdivisions: mesh.height_subdivisions,
            })?
        }
        Command::Estimate { design } => {
            let design = design.resolve()?;
            serde_json::to_value(estimate_inductance(&design.geometry, &design.stackup))?
        }
        Command::Simulate { design, solver } => {
            let design = design.resolve()?;
            serde_json::to_value(simulate(&design, &solver.runner())?)?
        }
        Command::Optimize {
            design,
            solver,
            target,
            min_spacing,
            tolerance,
            max_evaluations,
            analytic,
        } => {
            let design = design.resolve()?;
            let mut config = OptimizerConfig::default();
            if let Some(v) = *min_spacing {
                config.min_spacing = v;
            }
            if let Some(v) = *tolerance {
                config.inductance_tolerance = v;
            }
            if let Some(v) = *max_evaluations {
                config.max_evaluations = v;
            }
            let mut evaluator: Box<dyn InductanceEvaluator> = if *analytic {
                Box::new(AnalyticEvaluator {
                    stackup: design.stackup,
                })
            } else {
                Box::new(SimulationEvaluator {
                    runner: solver.runner(),
                    stackup: design.stackup,
                    frequency: design.frequency,
                })
            };
            let mut report = |p: &Progress| {
                info!(
                    "[{}] spacing {:.4} mm -> {:.4} uH (best {:.4} mm)",
                    p.evaluation, p.spacing, p.inductance_uh, p.best_spacing
                )
            };
            let result = SpacingOptimizer::new(config).run(
                &design.geometry,
                *target,
                evaluator.as_mut(),
                &mut report,
                &CancelToken::new(),
            )?;
            serde_json::to_value(OptimizeOutput {
                result,
                geometry: design.geometry.with_spacing(result.spacing),
            })?
        }
        Command::Footprint { design } => {
            let design = design.resolve()?;
            serde_json::to_value(build_footprint(&design.geometry, &design.stackup)?)?
        }
    };
    Ok(value)
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let value = match run(&cli.command) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let json = if cli.pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    };
    let json = match json {
        Ok(j) => j,
        Err(e) => {
            eprintln!("Error serializing JSON: {e}");
            std::process::exit(1);
        }
    };

    if let Some(output_path) = &cli.output {
        if let Err(e) = std::fs::write(output_path, &json) {
            eprintln!("Error writing output: {e}");
            std::process::exit(1);
        }
        eprintln!("Wrote {}", output_path.display());
    } else {
        println!("{json}");
    }
}
