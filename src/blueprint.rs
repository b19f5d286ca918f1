use crate::catalog::ComponentKind;
use crate::component::{ComponentId, Components, GridPos};
use crate::connection_manager::ConnectionManager;

const MAX_NAME_LEN: usize = 20;
const DEFAULT_NAME: &str = "Blueprint";

#[derive(Debug, thiserror::Error)]
pub enum BlueprintError {
    #[error("invalid blueprint JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("blueprint file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("blueprint has no components")]
    Empty,
}

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintComponent {
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    pub rel_x: i32,
    pub rel_y: i32,
}

impl BlueprintComponent {
    /// Absolute cell for a stamp at `origin`, `None` if it overflows.
    pub fn position(&self, origin: GridPos) -> Option<GridPos> {
        origin.checked_offset(self.rel_x, self.rel_y)
    }
}

/// A wire between two members, by index into [`Blueprint::components`].
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintWire {
    #[serde(alias = "fromIdx")]
    pub from_index: usize,
    pub from_pin: usize,
    #[serde(alias = "toIdx")]
    pub to_index: usize,
    pub to_pin: usize,
}

/// A captured group of components and the wires between them, positioned relative to the
/// group's top-left corner.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    #[serde(default = "default_name")]
    pub name: String,
    pub components: Vec<BlueprintComponent>,
    #[serde(default)]
    pub wires: Vec<BlueprintWire>,
    #[serde(default)]
    pub gate_count: usize,
}

fn default_name() -> String {
    DEFAULT_NAME.to_owned()
}

fn clean_name(name: &str) -> String {
    let name: String = name.trim().chars().take(MAX_NAME_LEN).collect();
    if name.is_empty() { default_name() } else { name }
}

impl Blueprint {
    /// Capture `members` and every wire whose both ends are members.
    ///
    /// Component order follows `members`; ids that no longer exist are skipped.
    pub fn capture(
        name: &str,
        components: &Components,
        members: &[ComponentId],
        cm: &ConnectionManager,
    ) -> Result<Self, BlueprintError> {
        let live: Vec<ComponentId> = members
            .iter()
            .copied()
            .filter(|id| components.contains_key(*id))
            .collect();
        if live.is_empty() {
            return Err(BlueprintError::Empty);
        }

        let min_x = live.iter().map(|&id| components[id].pos.x).min().unwrap_or(0);
        let min_y = live.iter().map(|&id| components[id].pos.y).min().unwrap_or(0);

        let saved = live
            .iter()
            .map(|&id| {
                let c = &components[id];
                BlueprintComponent {
                    kind: c.kind,
                    rel_x: c.pos.x - min_x,
                    rel_y: c.pos.y - min_y,
                }
            })
            .collect::<Vec<_>>();

        let index_of = |id: ComponentId| live.iter().position(|&m| m == id);
        let wires = cm
            .wires_sorted()
            .into_iter()
            .filter_map(|(_, w)| {
                Some(BlueprintWire {
                    from_index: index_of(w.from.component)?,
                    from_pin: w.from.index,
                    to_index: index_of(w.to.component)?,
                    to_pin: w.to.index,
                })
            })
            .collect();

        let gate_count = saved.iter().filter(|c| c.kind.is_gate()).count();

        Ok(Self {
            name: clean_name(name),
            components: saved,
            wires,
            gate_count,
        })
    }

    pub fn to_json(&self) -> Result<String, BlueprintError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, BlueprintError> {
        let mut blueprint: Self = serde_json::from_str(json)?;
        if blueprint.components.is_empty() {
            return Err(BlueprintError::Empty);
        }
        blueprint.name = clean_name(&blueprint.name);
        blueprint.gate_count = blueprint
            .components
            .iter()
            .filter(|c| c.kind.is_gate())
            .count();
        Ok(blueprint)
    }

    /// Size of the captured group in cells, given member footprints from `size_of`.
    pub fn bounds(&self, size_of: impl Fn(ComponentKind) -> (i32, i32)) -> (i32, i32) {
        self.components.iter().fold((0, 0), |(w, h), c| {
            let (cw, ch) = size_of(c.kind);
            (w.max(c.rel_x + cw), h.max(c.rel_y + ch))
        })
    }
}
