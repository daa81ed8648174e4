use serde::ser::Serializer;
use serde::Serialize;

/// Round a float to N decimal places.
pub fn round_f64(v: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (v * factor).round() / factor
}

/// Wrapper that rounds f64 to 6 decimal places on serialization.
fn serialize_f64_rounded<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(round_f64(*v, 6))
}

fn serialize_point<S: Serializer>(p: &[f64; 2], s: S) -> Result<S::Ok, S::Error> {
    let rounded = [round_f64(p[0], 6), round_f64(p[1], 6)];
    rounded.serialize(s)
}

fn serialize_opt_f64_rounded<S: Serializer>(v: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
    match v {
        Some(val) => s.serialize_some(&round_f64(*val, 6)),
        None => s.serialize_none(),
    }
}

// ─── Footprint ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Footprint {
    pub name: String,
    pub description: String,
    pub tags: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub value: String,
    pub bbox: BBox,
    pub tracks: LayerData<Vec<Track>>,
    pub pads: Vec<Pad>,
}

// ─── Bounding Box ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct BBox {
    #[serde(serialize_with = "serialize_f64_rounded")]
    pub minx: f64,
    #[serde(serialize_with = "serialize_f64_rounded")]
    pub miny: f64,
    #[serde(serialize_with = "serialize_f64_rounded")]
    pub maxx: f64,
    #[serde(serialize_with = "serialize_f64_rounded")]
    pub maxy: f64,
}

impl BBox {
    pub fn empty() -> Self {
        Self {
            minx: f64::INFINITY,
            miny: f64::INFINITY,
            maxx: f64::NEG_INFINITY,
            maxy: f64::NEG_INFINITY,
        }
    }

    pub fn expand_point(&mut self, x: f64, y: f64) {
        self.minx = self.minx.min(x);
        self.miny = self.miny.min(y);
        self.maxx = self.maxx.max(x);
        self.maxy = self.maxy.max(y);
    }

    /// Grow to cover a square of half-side `half` centred on (x, y).
    pub fn expand_square(&mut self, x: f64, y: f64, half: f64) {
        self.expand_point(x - half, y - half);
        self.expand_point(x + half, y + half);
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.minx && x <= self.maxx && y >= self.miny && y <= self.maxy
    }
}

/// Front/Back copper data.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LayerData<T> {
    #[serde(rename = "F")]
    pub front: T,
    #[serde(rename = "B")]
    pub back: T,
}

impl<T> LayerData<T> {
    pub fn get(&self, side: Side) -> &T {
        match side {
            Side::Front => &self.front,
            Side::Back => &self.back,
        }
    }
}

// ─── Pad ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PadShape {
    Rect,
    Circle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PadType {
    Smd,
    Th,
}

#[derive(Debug, Clone, Serialize)]
pub struct Pad {
    pub number: String,
    pub layers: Vec<String>,
    #[serde(serialize_with = "serialize_point")]
    pub pos: [f64; 2],
    #[serde(serialize_with = "serialize_point")]
    pub size: [f64; 2],
    pub shape: PadShape,
    #[serde(rename = "type")]
    pub pad_type: PadType,
    #[serde(
        serialize_with = "serialize_opt_f64_rounded",
        skip_serializing_if = "Option::is_none"
    )]
    pub drillsize: Option<f64>,
}

// ─── Track ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Track {
    Segment {
        #[serde(serialize_with = "serialize_point")]
        start: [f64; 2],
        #[serde(serialize_with = "serialize_point")]
        end: [f64; 2],
        #[serde(serialize_with = "serialize_f64_rounded")]
        width: f64,
    },
    /// Angles in degrees, counter-clockwise from +x; `endangle` may be
    /// below `startangle` for clockwise arcs.
    Arc {
        #[serde(serialize_with = "serialize_point")]
        center: [f64; 2],
        #[serde(serialize_with = "serialize_f64_rounded")]
        startangle: f64,
        #[serde(serialize_with = "serialize_f64_rounded")]
        endangle: f64,
        #[serde(serialize_with = "serialize_f64_rounded")]
        radius: f64,
        #[serde(serialize_with = "serialize_f64_rounded")]
        width: f64,
    },
}

// ─── Side helper ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Front,
    Back,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Front => "F",
            Side::Back => "B",
        }
    }
}
