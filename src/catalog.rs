use std::fmt::Display;

use egui::{Color32, Vec2, vec2};

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinKind {
    Input,
    Output,
}

impl Display for PinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input => f.write_str("Input"),
            Self::Output => f.write_str("Output"),
        }
    }
}

/// The fixed set of placeable parts. Serialized in lowercase so stored blueprints read
/// `"type": "xor"`.
#[derive(
    serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Input,
    Output,
    And,
    Or,
    Not,
    Xor,
    Nand,
    Nor,
    Xnor,
    Threshold,
    Average,
}

impl ComponentKind {
    pub const ALL: [Self; 11] = [
        Self::Input,
        Self::Output,
        Self::And,
        Self::Or,
        Self::Not,
        Self::Xor,
        Self::Nand,
        Self::Nor,
        Self::Xnor,
        Self::Threshold,
        Self::Average,
    ];

    /// External I/O terminals are not counted as gates.
    pub fn is_gate(self) -> bool {
        !matches!(self, Self::Input | Self::Output)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Input => "INPUT",
            Self::Output => "OUTPUT",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::Xor => "XOR",
            Self::Nand => "NAND",
            Self::Nor => "NOR",
            Self::Xnor => "XNOR",
            Self::Threshold => "THRESHOLD",
            Self::Average => "AVERAGE",
        };
        f.write_str(s)
    }
}

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq)]
pub struct PinSpec {
    pub kind: PinKind,
    /// Offset from the component origin, in grid cells.
    pub offset: Vec2,
}

impl PinSpec {
    const fn input(x: f32, y: f32) -> Self {
        Self {
            kind: PinKind::Input,
            offset: vec2(x, y),
        }
    }

    const fn output(x: f32, y: f32) -> Self {
        Self {
            kind: PinKind::Output,
            offset: vec2(x, y),
        }
    }
}

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
pub struct ComponentSpec {
    pub name: String,
    pub width: i32,
    pub height: i32,
    pub inputs: Vec<PinSpec>,
    pub outputs: Vec<PinSpec>,
    pub color: Color32,
}

impl ComponentSpec {
    fn new(
        name: &str,
        (width, height): (i32, i32),
        inputs: &[PinSpec],
        outputs: &[PinSpec],
        color: Color32,
    ) -> Self {
        Self {
            name: name.to_owned(),
            width,
            height,
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
            color,
        }
    }
}

const TWO_INPUTS: [PinSpec; 2] = [PinSpec::input(0.0, 0.0), PinSpec::input(0.0, 1.0)];
const TWO_INPUT_OUTPUT: [PinSpec; 1] = [PinSpec::output(2.0, 0.5)];
const ONE_INPUT: [PinSpec; 1] = [PinSpec::input(0.0, 0.0)];
const ONE_INPUT_OUTPUT: [PinSpec; 1] = [PinSpec::output(1.0, 0.0)];

/// Footprints and pin layouts for every [`ComponentKind`].
///
/// A session is built with one of these instead of consulting a process-wide table, so two
/// sessions can run with different layouts side by side.
#[derive(Debug, Clone, PartialEq)]
pub struct GateRegistry {
    specs: Vec<ComponentSpec>,
}

impl Default for GateRegistry {
    fn default() -> Self {
        let two_input = |name: &str, color: Color32| {
            ComponentSpec::new(name, (3, 2), &TWO_INPUTS, &TWO_INPUT_OUTPUT, color)
        };
        let one_input = |name: &str, color: Color32| {
            ComponentSpec::new(name, (2, 1), &ONE_INPUT, &ONE_INPUT_OUTPUT, color)
        };

        let specs = ComponentKind::ALL
            .iter()
            .map(|kind| match kind {
                ComponentKind::Input => ComponentSpec::new(
                    "Input",
                    (3, 1),
                    &[],
                    &[PinSpec::output(2.0, 0.0)],
                    Color32::from_rgb(0x4a, 0xde, 0x80),
                ),
                ComponentKind::Output => ComponentSpec::new(
                    "Output",
                    (3, 1),
                    &[PinSpec::input(0.0, 0.0)],
                    &[],
                    Color32::from_rgb(0xf4, 0x72, 0xb6),
                ),
                ComponentKind::And => two_input("AND", Color32::from_rgb(0x60, 0xa5, 0xfa)),
                ComponentKind::Or => two_input("OR", Color32::from_rgb(0xfb, 0xbf, 0x24)),
                ComponentKind::Not => one_input("NOT", Color32::from_rgb(0xa7, 0x8b, 0xfa)),
                ComponentKind::Xor => two_input("XOR", Color32::from_rgb(0x2d, 0xd4, 0xbf)),
                ComponentKind::Nand => two_input("NAND", Color32::from_rgb(0xf8, 0x71, 0x71)),
                ComponentKind::Nor => two_input("NOR", Color32::from_rgb(0xfb, 0x92, 0x3c)),
                ComponentKind::Xnor => two_input("XNOR", Color32::from_rgb(0x34, 0xd3, 0x99)),
                ComponentKind::Threshold => {
                    one_input("THR", Color32::from_rgb(0xf5, 0x9e, 0x0b))
                }
                ComponentKind::Average => two_input("AVG", Color32::from_rgb(0x8b, 0x5c, 0xf6)),
            })
            .collect();

        Self { specs }
    }
}

impl GateRegistry {
    pub fn spec(&self, kind: ComponentKind) -> &ComponentSpec {
        &self.specs[kind.index()]
    }
}
