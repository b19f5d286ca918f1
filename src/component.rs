use std::fmt::Display;

use egui::{Pos2, Vec2, pos2, vec2};

use crate::catalog::{ComponentKind, ComponentSpec, PinKind};

slotmap::new_key_type! {
    pub struct ComponentId;
}

pub type Components = slotmap::SlotMap<ComponentId, Component>;

impl Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format!("{:?}", self.0))
    }
}

/// Integer cell coordinates. The lattice is unbounded in every direction.
#[derive(
    serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default,
)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// `None` when the shifted cell falls off the `i32` lattice.
    pub fn checked_offset(self, dx: i32, dy: i32) -> Option<Self> {
        Some(Self::new(self.x.checked_add(dx)?, self.y.checked_add(dy)?))
    }

    pub fn to_pos2(self) -> Pos2 {
        pos2(self.x as f32, self.y as f32)
    }
}

impl Display for GridPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned rectangle of cells occupied by a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footprint {
    pub origin: GridPos,
    pub width: i32,
    pub height: i32,
}

impl Footprint {
    pub fn new(origin: GridPos, width: i32, height: i32) -> Self {
        Self {
            origin,
            width,
            height,
        }
    }

    /// Like [`Footprint::new`], but `None` unless the far corner is still addressable.
    pub fn checked(origin: GridPos, width: i32, height: i32) -> Option<Self> {
        origin.checked_offset(width, height)?;
        Some(Self::new(origin, width, height))
    }

    pub fn contains(&self, cell: GridPos) -> bool {
        cell.x >= self.origin.x
            && cell.x < self.origin.x + self.width
            && cell.y >= self.origin.y
            && cell.y < self.origin.y + self.height
    }

    /// True when the interiors intersect. Shared edges do not count.
    pub fn overlaps(&self, other: &Self) -> bool {
        !(self.origin.x + self.width <= other.origin.x
            || self.origin.x >= other.origin.x + other.width
            || self.origin.y + self.height <= other.origin.y
            || self.origin.y >= other.origin.y + other.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pin {
    pub index: usize,
    pub kind: PinKind,
    pub offset: Vec2,
    pub value: bool,
    /// Set by the connection manager while a wire ends here.
    pub connected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// Creation order within the owning session. Never reused.
    pub serial: u32,
    pub kind: ComponentKind,
    pub pos: GridPos,
    pub width: i32,
    pub height: i32,
    pub inputs: Vec<Pin>,
    pub outputs: Vec<Pin>,
    /// Driving value of an INPUT, toggled by the user or a test driver.
    pub manual_value: bool,
    pub label: Option<String>,
}

impl Component {
    pub fn new(serial: u32, kind: ComponentKind, pos: GridPos, spec: &ComponentSpec) -> Self {
        let pins = |kind: PinKind| -> Vec<Pin> {
            let specs = match kind {
                PinKind::Input => &spec.inputs,
                PinKind::Output => &spec.outputs,
            };
            specs
                .iter()
                .enumerate()
                .map(|(index, p)| Pin {
                    index,
                    kind,
                    offset: p.offset,
                    value: false,
                    connected: false,
                })
                .collect()
        };

        Self {
            serial,
            kind,
            pos,
            width: spec.width,
            height: spec.height,
            inputs: pins(PinKind::Input),
            outputs: pins(PinKind::Output),
            manual_value: false,
            label: None,
        }
    }

    pub fn footprint(&self) -> Footprint {
        Footprint::new(self.pos, self.width, self.height)
    }

    pub fn footprint_at(&self, pos: GridPos) -> Footprint {
        Footprint::new(pos, self.width, self.height)
    }

    pub fn occupies_cell(&self, cell: GridPos) -> bool {
        self.footprint().contains(cell)
    }

    pub fn pins(&self, kind: PinKind) -> &[Pin] {
        match kind {
            PinKind::Input => &self.inputs,
            PinKind::Output => &self.outputs,
        }
    }

    pub fn pin(&self, kind: PinKind, index: usize) -> Option<&Pin> {
        self.pins(kind).get(index)
    }

    pub fn pin_mut(&mut self, kind: PinKind, index: usize) -> Option<&mut Pin> {
        match kind {
            PinKind::Input => self.inputs.get_mut(index),
            PinKind::Output => self.outputs.get_mut(index),
        }
    }

    /// Absolute grid position of a pin, `None` for an index past the end of the pin list.
    pub fn pin_position(&self, kind: PinKind, index: usize) -> Option<Pos2> {
        self.pin(kind, index).map(|p| self.pos.to_pos2() + p.offset)
    }

    /// Where a wire attaches to the pin. Output anchors sit one cell to the right so the
    /// wire clears the body; both anchors are vertically centered in the pin's cell.
    pub fn pin_anchor(&self, kind: PinKind, index: usize) -> Option<Pos2> {
        let shift = match kind {
            PinKind::Input => vec2(0.0, 0.5),
            PinKind::Output => vec2(1.0, 0.5),
        };
        self.pin_position(kind, index).map(|p| p + shift)
    }

    pub fn input_value(&self, index: usize) -> bool {
        self.inputs.get(index).is_some_and(|p| p.value)
    }

    pub fn output_value(&self, index: usize) -> bool {
        self.outputs.get(index).is_some_and(|p| p.value)
    }

    pub fn reset_inputs(&mut self) {
        for pin in &mut self.inputs {
            pin.value = false;
        }
    }

    /// Recompute the output from the current input values. Touches nothing outside `self`.
    pub fn evaluate(&mut self) {
        let a = self.input_value(0);
        let b = self.input_value(1);

        let out = match self.kind {
            ComponentKind::Input => self.manual_value,
            ComponentKind::Output => return,
            ComponentKind::And | ComponentKind::Average => a && b,
            ComponentKind::Or => a || b,
            ComponentKind::Not => !a,
            ComponentKind::Xor => a != b,
            ComponentKind::Nand => !(a && b),
            ComponentKind::Nor => !(a || b),
            ComponentKind::Xnor => a == b,
            ComponentKind::Threshold => a,
        };

        if let Some(pin) = self.outputs.first_mut() {
            pin.value = out;
        }
    }

    pub fn display(&self) -> String {
        match &self.label {
            Some(label) => format!("{} #{} \"{label}\" at {}", self.kind, self.serial, self.pos),
            None => format!("{} #{} at {}", self.kind, self.serial, self.pos),
        }
    }
}
