//! Design parameters shared by every stage of the pipeline.
//!
//! Lengths are millimetres and frequencies are hertz unless a name says
//! otherwise. All values here are plain data owned by the caller.

use crate::error::{InductorError, Result};
use serde::{Deserialize, Serialize};

/// Angular sense in which the spiral unwinds from its inner end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winding {
    #[default]
    CounterClockwise,
    Clockwise,
}

impl Winding {
    /// +1 for counter-clockwise, -1 for clockwise.
    pub fn sign(self) -> f64 {
        match self {
            Winding::CounterClockwise => 1.0,
            Winding::Clockwise => -1.0,
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Winding::CounterClockwise => Winding::Clockwise,
            Winding::Clockwise => Winding::CounterClockwise,
        }
    }
}

/// How finely the spiral is discretised.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Polyline whose chords stay within this distance (mm) of the curve.
    MaxDeviation(f64),
    /// Chain of circular arcs, this many per revolution.
    ArcsPerTurn(u32),
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::MaxDeviation(0.1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometrySpec {
    pub turns: f64,
    pub inner_radius: f64,
    pub pitch: f64,
    pub trace_width: f64,
    #[serde(default)]
    pub direction: Winding,
    #[serde(default)]
    pub resolution: Resolution,
}

impl Default for GeometrySpec {
    fn default() -> Self {
        Self {
            turns: 13.0,
            inner_radius: 5.0,
            pitch: 3.0,
            trace_width: 2.0,
            direction: Winding::CounterClockwise,
            resolution: Resolution::default(),
        }
    }
}

impl GeometrySpec {
    /// Copper-free gap between neighbouring turns.
    pub fn spacing(&self) -> f64 {
        self.pitch - self.trace_width
    }

    /// Copy with the given spacing, keeping the trace width.
    pub fn with_spacing(&self, spacing: f64) -> Self {
        Self {
            pitch: spacing + self.trace_width,
            ..*self
        }
    }

    pub fn with_direction(&self, direction: Winding) -> Self {
        Self { direction, ..*self }
    }

    /// Radius of the outermost point of the centre line.
    pub fn outer_radius(&self) -> f64 {
        self.inner_radius + self.turns * self.pitch
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("turns", self.turns),
            ("inner radius", self.inner_radius),
            ("pitch", self.pitch),
            ("trace width", self.trace_width),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(InductorError::InvalidGeometry(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        match self.resolution {
            Resolution::MaxDeviation(d) if !d.is_finite() || d <= 0.0 => Err(
                InductorError::InvalidGeometry(format!("chord deviation must be positive, got {d}")),
            ),
            Resolution::ArcsPerTurn(n) if n < 2 => Err(InductorError::InvalidGeometry(
                format!("need at least two arcs per turn, got {n}"),
            )),
            _ => Ok(()),
        }
    }
}

/// Which of the coupled winding dimensions was last edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditedField {
    Pitch,
    Spacing,
    TraceWidth,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindingDims {
    pub pitch: f64,
    pub spacing: f64,
    pub trace_width: f64,
}

/// Re-derive the dependent dimension after an edit.
///
/// The edited value is authoritative. A trace width change keeps the
/// pitch and moves the spacing. The returned values always satisfy
/// `pitch == spacing + trace_width`.
pub fn derive_pitch_spacing(edited: EditedField, dims: WindingDims) -> WindingDims {
    match edited {
        EditedField::Pitch | EditedField::TraceWidth => WindingDims {
            spacing: dims.pitch - dims.trace_width,
            ..dims
        },
        EditedField::Spacing => WindingDims {
            pitch: dims.spacing + dims.trace_width,
            ..dims
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Layers {
    #[default]
    One,
    Two,
}

impl Layers {
    pub fn count(self) -> usize {
        match self {
            Layers::One => 1,
            Layers::Two => 2,
        }
    }
}

impl TryFrom<u8> for Layers {
    type Error = String;

    fn try_from(n: u8) -> std::result::Result<Self, Self::Error> {
        match n {
            1 => Ok(Layers::One),
            2 => Ok(Layers::Two),
            other => Err(format!("layer count must be 1 or 2, got {other}")),
        }
    }
}

impl From<Layers> for u8 {
    fn from(layers: Layers) -> u8 {
        layers.count() as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StackupSpec {
    pub layers: Layers,
    /// Copper foil thickness (mm).
    pub copper_thickness: f64,
    /// Dielectric between the two copper layers (mm).
    pub board_thickness: f64,
}

impl Default for StackupSpec {
    fn default() -> Self {
        Self {
            layers: Layers::One,
            copper_thickness: 0.035,
            board_thickness: 1.6,
        }
    }
}

impl StackupSpec {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("copper thickness", self.copper_thickness),
            ("board thickness", self.board_thickness),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(InductorError::InvalidGeometry(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencySpec {
    pub frequency_hz: f64,
}

impl Default for FrequencySpec {
    fn default() -> Self {
        Self { frequency_hz: 1e6 }
    }
}

/// Everything needed for one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Design {
    pub geometry: GeometrySpec,
    #[serde(default)]
    pub stackup: StackupSpec,
    #[serde(default)]
    pub frequency: FrequencySpec,
}
