use std::f32::consts::TAU;
use std::fmt::Display;

use egui::{Pos2, Vec2};

use crate::component::ComponentId;

slotmap::new_key_type! {
    pub struct WireId;
}

impl Display for WireId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format!("{:?}", self.0))
    }
}

/// One pin of one component. Whether it is an input or an output is decided by which end of
/// the wire it is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinRef {
    pub component: ComponentId,
    pub index: usize,
}

impl PinRef {
    pub fn new(component: ComponentId, index: usize) -> Self {
        Self { component, index }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wire {
    pub serial: u32,
    /// Driving output pin.
    pub from: PinRef,
    /// Driven input pin.
    pub to: PinRef,
    path: Vec<Pos2>,
    path_length: f32,
    pub value: bool,
    /// Offset for the pulse animation so parallel wires do not pulse in lockstep.
    pub pulse_phase: f32,
}

impl Wire {
    pub fn new(serial: u32, from: PinRef, to: PinRef) -> Self {
        Self {
            serial,
            from,
            to,
            path: Vec::new(),
            path_length: 0.0,
            value: false,
            pulse_phase: (serial as f32 * 2.399_963) % TAU,
        }
    }

    pub fn connects(&self, from: PinRef, to: PinRef) -> bool {
        self.from == from && self.to == to
    }

    pub fn touches(&self, id: ComponentId) -> bool {
        self.from.component == id || self.to.component == id
    }

    /// Routed waypoints in grid space. Empty until the first routing pass.
    pub fn path(&self) -> &[Pos2] {
        &self.path
    }

    pub fn path_length(&self) -> f32 {
        self.path_length
    }

    pub fn set_path(&mut self, path: Vec<Pos2>) {
        self.path_length = path.windows(2).map(|w| (w[1] - w[0]).length()).sum();
        self.path = path;
    }

    /// Grid position `distance` units along the path, `None` past the end.
    pub fn point_along_path(&self, distance: f32) -> Option<Pos2> {
        let mut traveled = 0.0;
        for w in self.path.windows(2) {
            let segment: Vec2 = w[1] - w[0];
            let len = segment.length();
            if traveled + len >= distance {
                if len == 0.0 {
                    return Some(w[0]);
                }
                let t = (distance - traveled) / len;
                return Some(w[0] + segment * t);
            }
            traveled += len;
        }
        None
    }

    pub fn display(&self) -> String {
        format!(
            "Wire #{} {}#{} -> {}#{}",
            self.serial, self.from.component, self.from.index, self.to.component, self.to.index
        )
    }
}

pub fn closest_point_on_segment(a: Pos2, b: Pos2, p: Pos2) -> Pos2 {
    let ab: Vec2 = b - a;
    let ap: Vec2 = p - a;

    let ab_len2 = ab.x * ab.x + ab.y * ab.y;
    if ab_len2 == 0.0 {
        return a;
    }

    let t = ((ap.x * ab.x + ap.y * ab.y) / ab_len2).clamp(0.0, 1.0);

    a + ab * t
}

/// Shortest distance from `p` to the polyline through `points`.
pub fn distance_to_polyline(points: &[Pos2], p: Pos2) -> f32 {
    points
        .windows(2)
        .map(|w| (p - closest_point_on_segment(w[0], w[1], p)).length())
        .fold(f32::INFINITY, f32::min)
}
