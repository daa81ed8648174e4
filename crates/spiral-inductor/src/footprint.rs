//! Footprint placement for the spiral: copper tracks, end pads and the
//! inter-layer via.

use crate::design::{GeometrySpec, Layers, StackupSpec};
use crate::error::Result;
use crate::estimate::estimate_inductance;
use crate::geometry::{spiral_path, Point, SpiralPath};
use crate::types::*;

/// Via joining the two inner ends of a two-layer spiral.
const VIA_SIZE: f64 = 0.6;
const VIA_DRILL: f64 = 0.3;

/// Tracks for one spiral path: straight segments for a polyline, arcs for
/// an arc chain.
pub fn path_tracks(path: &SpiralPath, width: f64) -> Vec<Track> {
    match path {
        SpiralPath::Polyline(pts) => pts
            .windows(2)
            .map(|w| Track::Segment {
                start: w[0].to_array(),
                end: w[1].to_array(),
                width,
            })
            .collect(),
        SpiralPath::Arcs(arcs) => arcs
            .iter()
            .map(|arc| {
                let start = arc.start.angle_about(arc.center).to_degrees();
                Track::Arc {
                    center: arc.center.to_array(),
                    startangle: start,
                    endangle: start + arc.sweep.to_degrees(),
                    radius: arc.radius(),
                    width,
                }
            })
            .collect(),
    }
}

fn smd_pad(number: &str, pos: Point, side: Side, trace_width: f64) -> Pad {
    let edge = trace_width / 2.0;
    Pad {
        number: number.to_string(),
        layers: vec![side.as_str().to_string()],
        pos: pos.to_array(),
        size: [edge, edge],
        shape: PadShape::Rect,
        pad_type: PadType::Smd,
        drillsize: None,
    }
}

fn via_pad(pos: Point) -> Pad {
    Pad {
        number: "lc".to_string(),
        layers: vec![Side::Front.as_str().to_string(), Side::Back.as_str().to_string()],
        pos: pos.to_array(),
        size: [VIA_SIZE, VIA_SIZE],
        shape: PadShape::Circle,
        pad_type: PadType::Th,
        drillsize: Some(VIA_DRILL),
    }
}

/// Lay out the spiral footprint.
///
/// A single layer runs from pad 1 at the centre to pad 2 outside. With two
/// layers the current enters pad 1 at the outer end of the top spiral,
/// winds in to the via, and winds out on the mirrored bottom spiral to
/// pad 2.
pub fn build_footprint(geom: &GeometrySpec, stackup: &StackupSpec) -> Result<Footprint> {
    let top = spiral_path(geom)?;
    let mut tracks: LayerData<Vec<Track>> = LayerData::default();
    tracks.front = path_tracks(&top, geom.trace_width);

    let mut pads = Vec::new();
    match stackup.layers {
        Layers::One => {
            pads.push(smd_pad("1", top.start_point(), Side::Front, geom.trace_width));
            pads.push(smd_pad("2", top.end_point(), Side::Front, geom.trace_width));
        }
        Layers::Two => {
            let bottom = spiral_path(&geom.with_direction(geom.direction.reversed()))?;
            tracks.back = path_tracks(&bottom, geom.trace_width);
            pads.push(via_pad(bottom.start_point()));
            pads.push(smd_pad("1", top.end_point(), Side::Front, geom.trace_width));
            pads.push(smd_pad("2", bottom.end_point(), Side::Back, geom.trace_width));
        }
    }

    let value = match estimate_inductance(geom, stackup).value() {
        Some(uh) => format!("{uh:.3}uH"),
        None => "L".to_string(),
    };

    Ok(Footprint {
        name: "SIND".to_string(),
        description: "spiral inductor".to_string(),
        tags: "SMD".to_string(),
        reference: "REF**".to_string(),
        value,
        bbox: compute_bbox(&tracks, &pads),
        tracks,
        pads,
    })
}

fn compute_bbox(tracks: &LayerData<Vec<Track>>, pads: &[Pad]) -> BBox {
    let mut bbox = BBox::empty();
    for side in [Side::Front, Side::Back] {
        for track in tracks.get(side) {
            match track {
                Track::Segment { start, end, width } => {
                    bbox.expand_square(start[0], start[1], width / 2.0);
                    bbox.expand_square(end[0], end[1], width / 2.0);
                }
                Track::Arc {
                    center,
                    radius,
                    width,
                    ..
                } => {
                    bbox.expand_square(center[0], center[1], radius + width / 2.0);
                }
            }
        }
    }
    for pad in pads {
        bbox.expand_point(pad.pos[0] - pad.size[0] / 2.0, pad.pos[1] - pad.size[1] / 2.0);
        bbox.expand_point(pad.pos[0] + pad.size[0] / 2.0, pad.pos[1] + pad.size[1] / 2.0);
    }
    bbox
}
