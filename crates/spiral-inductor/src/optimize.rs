//! Derivative-free search over conductor spacing.
//!
//! The evaluator is a black box (normally a full field-solver run), so the
//! search only compares objective values: a bounded compass search that
//! probes both neighbours of the current point, doubles its step after a
//! successful move and halves it after a failed round.

use crate::design::{GeometrySpec, StackupSpec};
use crate::error::{InductorError, Result};
use crate::estimate::{estimate_inductance, Estimate};
use log::{debug, info};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Maps a geometry to its inductance in µH.
pub trait InductanceEvaluator {
    fn inductance_uh(&mut self, geom: &GeometrySpec) -> Result<f64>;
}

/// Evaluator backed by the closed-form estimate.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticEvaluator {
    pub stackup: StackupSpec,
}

impl InductanceEvaluator for AnalyticEvaluator {
    fn inductance_uh(&mut self, geom: &GeometrySpec) -> Result<f64> {
        match estimate_inductance(geom, &self.stackup) {
            Estimate::Valid(l) => Ok(l),
            Estimate::TransientlyInvalid => Err(InductorError::InvalidGeometry(format!(
                "no estimate for pitch {} and trace width {}",
                geom.pitch, geom.trace_width
            ))),
        }
    }
}

/// One objective evaluation, reported as it happens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub evaluation: usize,
    pub spacing: f64,
    pub inductance_uh: f64,
    pub error_uh: f64,
    pub best_spacing: f64,
    pub best_error_uh: f64,
}

pub trait ProgressObserver {
    fn on_evaluation(&mut self, _progress: &Progress) {}
}

/// Observer that ignores progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {}

impl<F: FnMut(&Progress)> ProgressObserver for F {
    fn on_evaluation(&mut self, progress: &Progress) {
        self(progress)
    }
}

/// Shared flag that stops a running search before its next evaluation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Smallest manufacturable spacing (mm).
    pub min_spacing: f64,
    /// Stop once |achieved - target| is within this many µH.
    pub inductance_tolerance: f64,
    /// Stop when an accepted move improves the objective by less than
    /// this fraction.
    pub ftol_rel: f64,
    /// Stop when the step shrinks below this fraction of the spacing.
    pub xtol_rel: f64,
    pub max_evaluations: usize,
    /// First probe distance (mm); half the starting spacing when unset.
    pub initial_step: Option<f64>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            min_spacing: 0.15,
            inductance_tolerance: 1e-3,
            ftol_rel: 1e-4,
            xtol_rel: 1e-3,
            max_evaluations: 100,
            initial_step: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationOutcome {
    ToleranceReached,
    IterationCapReached,
    /// Stalled at `min_spacing` without reaching the tolerance: the target
    /// needs a smaller spacing than allowed.
    BoundInfeasible,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OptimizationResult {
    pub spacing: f64,
    pub inductance_uh: f64,
    pub error_uh: f64,
    pub evaluations: usize,
    pub outcome: OptimizationOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct SpacingOptimizer {
    pub config: OptimizerConfig,
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    spacing: f64,
    inductance_uh: f64,
    error_uh: f64,
}

impl SpacingOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    fn check(&self, target_uh: f64) -> Result<()> {
        let cfg = &self.config;
        let bad = |msg: String| Err(InductorError::InvalidOptimizerSetting(msg));
        if !target_uh.is_finite() || target_uh <= 0.0 {
            return bad(format!("target inductance must be positive, got {target_uh}"));
        }
        if !cfg.min_spacing.is_finite() || cfg.min_spacing < 0.0 {
            return bad(format!("minimum spacing must be >= 0, got {}", cfg.min_spacing));
        }
        let tolerances = [
            ("inductance tolerance", cfg.inductance_tolerance),
            ("ftol_rel", cfg.ftol_rel),
            ("xtol_rel", cfg.xtol_rel),
        ];
        for (name, value) in tolerances {
            if !value.is_finite() || value < 0.0 {
                return bad(format!("{name} must be finite and >= 0, got {value}"));
            }
        }
        if cfg.max_evaluations == 0 {
            return bad("at least one evaluation is required".to_string());
        }
        if let Some(step) = cfg.initial_step {
            if !step.is_finite() || step <= 0.0 {
                return bad(format!("initial step must be positive, got {step}"));
            }
        }
        Ok(())
    }

    /// Search the spacing of `geom` that brings the evaluated inductance to
    /// `target_uh`.
    ///
    /// Evaluator errors abort the search. The returned spacing is the best
    /// one evaluated; the caller stores it back into its geometry.
    pub fn run<E, O>(
        &self,
        geom: &GeometrySpec,
        target_uh: f64,
        evaluator: &mut E,
        observer: &mut O,
        cancel: &CancelToken,
    ) -> Result<OptimizationResult>
    where
        E: InductanceEvaluator + ?Sized,
        O: ProgressObserver + ?Sized,
    {
        self.check(target_uh)?;
        let cfg = &self.config;
        let mut evaluate = |evaluation: usize, spacing: f64, best: Option<Sample>| -> Result<Sample> {
            let inductance_uh = evaluator.inductance_uh(&geom.with_spacing(spacing))?;
            let sample = Sample {
                spacing,
                inductance_uh,
                error_uh: (inductance_uh - target_uh).abs(),
            };
            let best = match best {
                Some(b) if b.error_uh <= sample.error_uh => b,
                _ => sample,
            };
            debug!(
                "evaluation {evaluation}: spacing {spacing:.5} mm -> {inductance_uh:.5} uH (error {:.3e})",
                sample.error_uh
            );
            observer.on_evaluation(&Progress {
                evaluation,
                spacing,
                inductance_uh,
                error_uh: sample.error_uh,
                best_spacing: best.spacing,
                best_error_uh: best.error_uh,
            });
            Ok(sample)
        };

        let start = geom.spacing().max(cfg.min_spacing);
        let mut best = evaluate(1, start, None)?;
        let mut step = cfg
            .initial_step
            .unwrap_or_else(|| (0.5 * start).max(0.05 * geom.trace_width));
        let mut direction = 1.0;
        let mut used = 1usize;

        let outcome = 'search: loop {
            if best.error_uh <= cfg.inductance_tolerance {
                break OptimizationOutcome::ToleranceReached;
            }
            let mut improved = false;
            let mut probed = false;
            for dir in [direction, -direction] {
                let candidate = (best.spacing + dir * step).max(cfg.min_spacing);
                if candidate == best.spacing {
                    continue;
                }
                probed = true;
                if used >= cfg.max_evaluations {
                    break 'search OptimizationOutcome::IterationCapReached;
                }
                if cancel.is_cancelled() {
                    break 'search OptimizationOutcome::Cancelled;
                }
                used += 1;
                let trial = evaluate(used, candidate, Some(best))?;
                if trial.error_uh < best.error_uh {
                    let gain = (best.error_uh - trial.error_uh) / best.error_uh;
                    best = trial;
                    direction = dir;
                    improved = true;
                    if best.error_uh > cfg.inductance_tolerance && gain < cfg.ftol_rel {
                        break 'search self.stalled(best);
                    }
                    step *= 2.0;
                    break;
                }
            }
            if !improved {
                // Both neighbours rounded onto the current point.
                if !probed {
                    break self.stalled(best);
                }
                step *= 0.5;
                if step == 0.0 || step <= cfg.xtol_rel * best.spacing.abs().max(cfg.min_spacing) {
                    break self.stalled(best);
                }
            }
        };

        info!(
            "spacing search finished: {outcome:?} at {:.5} mm, {:.5} uH after {used} evaluations",
            best.spacing, best.inductance_uh
        );
        Ok(OptimizationResult {
            spacing: best.spacing,
            inductance_uh: best.inductance_uh,
            error_uh: best.error_uh,
            evaluations: used,
            outcome,
        })
    }

    /// Outcome when the search can make no further progress.
    fn stalled(&self, best: Sample) -> OptimizationOutcome {
        if best.spacing <= self.config.min_spacing && best.error_uh > self.config.inductance_tolerance {
            OptimizationOutcome::BoundInfeasible
        } else {
            OptimizationOutcome::ToleranceReached
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn geom() -> GeometrySpec {
        GeometrySpec {
            turns: 13.0,
            inner_radius: 5.0,
            pitch: 3.0,
            trace_width: 2.0,
            ..GeometrySpec::default()
        }
    }

    fn analytic_at(spacing: f64) -> f64 {
        AnalyticEvaluator::default()
            .inductance_uh(&geom().with_spacing(spacing))
            .unwrap()
    }

    /// Linear stand-in for the solver.
    struct Line {
        calls: usize,
    }

    impl InductanceEvaluator for Line {
        fn inductance_uh(&mut self, geom: &GeometrySpec) -> Result<f64> {
            self.calls += 1;
            Ok(2.0 + 3.0 * geom.spacing())
        }
    }

    #[test]
    fn test_converges_to_feasible_target() {
        let target = analytic_at(1.4);
        let opt = SpacingOptimizer::new(OptimizerConfig {
            inductance_tolerance: 0.01,
            xtol_rel: 1e-6,
            ..Default::default()
        });
        let result = opt
            .run(
                &geom(),
                target,
                &mut AnalyticEvaluator::default(),
                &mut NoProgress,
                &CancelToken::new(),
            )
            .unwrap();
        assert_eq!(result.outcome, OptimizationOutcome::ToleranceReached);
        assert!(result.error_uh <= 0.01);
        assert!((result.inductance_uh - target).abs() <= 0.01);
        assert!(result.spacing >= 0.15);
    }

    #[test]
    fn test_target_below_bound_is_infeasible() {
        let floor = analytic_at(0.15);
        let opt = SpacingOptimizer::default();
        let result = opt
            .run(
                &geom(),
                floor * 0.5,
                &mut AnalyticEvaluator::default(),
                &mut NoProgress,
                &CancelToken::new(),
            )
            .unwrap();
        assert_eq!(result.outcome, OptimizationOutcome::BoundInfeasible);
        assert_eq!(result.spacing, 0.15);
        assert!(result.evaluations < opt.config.max_evaluations);
    }

    #[test]
    fn test_iteration_cap() {
        let opt = SpacingOptimizer::new(OptimizerConfig {
            max_evaluations: 3,
            inductance_tolerance: 1e-9,
            ..Default::default()
        });
        let mut line = Line { calls: 0 };
        let result = opt
            .run(&geom(), 7.123, &mut line, &mut NoProgress, &CancelToken::new())
            .unwrap();
        assert_eq!(result.outcome, OptimizationOutcome::IterationCapReached);
        assert_eq!(result.evaluations, 3);
        assert_eq!(line.calls, 3);
    }

    #[test]
    fn test_linear_model_solution() {
        // 2 + 3 s = 5.6 at s = 1.2
        let mut line = Line { calls: 0 };
        let opt = SpacingOptimizer::new(OptimizerConfig {
            xtol_rel: 1e-6,
            ..Default::default()
        });
        let result = opt
            .run(&geom(), 5.6, &mut line, &mut NoProgress, &CancelToken::new())
            .unwrap();
        assert_eq!(result.outcome, OptimizationOutcome::ToleranceReached);
        assert_abs_diff_eq!(result.spacing, 1.2, epsilon = 1e-3);
    }

    #[test]
    fn test_cancel_stops_before_next_evaluation() {
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let mut seen = Vec::new();
        let mut observer = |p: &Progress| {
            seen.push(p.evaluation);
            if p.evaluation == 2 {
                trigger.cancel();
            }
        };
        let mut line = Line { calls: 0 };
        let result = SpacingOptimizer::default()
            .run(&geom(), 5.6, &mut line, &mut observer, &cancel)
            .unwrap();
        assert_eq!(result.outcome, OptimizationOutcome::Cancelled);
        assert_eq!(line.calls, 2);
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn test_progress_tracks_best() {
        let mut best_errors = Vec::new();
        let mut observer = |p: &Progress| best_errors.push(p.best_error_uh);
        SpacingOptimizer::default()
            .run(
                &geom(),
                5.6,
                &mut Line { calls: 0 },
                &mut observer,
                &CancelToken::new(),
            )
            .unwrap();
        assert!(best_errors.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_evaluator_error_aborts() {
        struct Broken;
        impl InductanceEvaluator for Broken {
            fn inductance_uh(&mut self, _geom: &GeometrySpec) -> Result<f64> {
                Err(InductorError::SolverInvocation("boom".to_string()))
            }
        }
        let err = SpacingOptimizer::default()
            .run(&geom(), 5.0, &mut Broken, &mut NoProgress, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, InductorError::SolverInvocation(_)));
    }

    #[test]
    fn test_rejects_bad_target() {
        let err = SpacingOptimizer::default()
            .run(
                &geom(),
                -1.0,
                &mut Line { calls: 0 },
                &mut NoProgress,
                &CancelToken::new(),
            )
            .unwrap_err();
        assert!(matches!(err, InductorError::InvalidOptimizerSetting(_)));
    }

    #[test]
    fn test_rejects_bad_tolerances() {
        let configs = [
            OptimizerConfig {
                xtol_rel: -1.0,
                ..Default::default()
            },
            OptimizerConfig {
                xtol_rel: f64::NAN,
                ..Default::default()
            },
            OptimizerConfig {
                ftol_rel: f64::INFINITY,
                ..Default::default()
            },
            OptimizerConfig {
                inductance_tolerance: -1e-3,
                ..Default::default()
            },
        ];
        for config in configs {
            let mut line = Line { calls: 0 };
            let err = SpacingOptimizer::new(config)
                .run(&geom(), 1.0, &mut line, &mut NoProgress, &CancelToken::new())
                .unwrap_err();
            assert!(matches!(err, InductorError::InvalidOptimizerSetting(_)));
            assert_eq!(line.calls, 0);
        }
    }

    #[test]
    fn test_zero_tolerances_still_terminate() {
        let opt = SpacingOptimizer::new(OptimizerConfig {
            inductance_tolerance: 0.0,
            ftol_rel: 0.0,
            xtol_rel: 0.0,
            max_evaluations: 100_000,
            ..Default::default()
        });
        let target = 2.0 + 3.0 * 1.2345678;
        let mut line = Line { calls: 0 };
        let result = opt
            .run(&geom(), target, &mut line, &mut NoProgress, &CancelToken::new())
            .unwrap();
        assert!(result.evaluations < 100_000);
        assert_eq!(result.evaluations, line.calls);
        assert_ne!(result.outcome, OptimizationOutcome::IterationCapReached);
        assert_abs_diff_eq!(result.spacing, 1.2345678, epsilon = 1e-9);
    }
}
