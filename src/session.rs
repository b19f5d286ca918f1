use std::collections::HashSet;
use std::time::Duration;

use egui::{Pos2, Vec2};

use crate::blueprint::{Blueprint, BlueprintError};
use crate::catalog::{ComponentKind, GateRegistry, PinKind};
use crate::component::{Component, ComponentId, Components, Footprint, GridPos};
use crate::config::SessionConfig;
use crate::connection_manager::{ConnectError, ConnectionManager};
use crate::gesture::{Gesture, Tool};
use crate::grid::Grid;
use crate::labels::{self, LabelPlan};
use crate::simulator::{AnimationClock, SimulationClock, Simulator};
use crate::wire::{PinRef, Wire, WireId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PlaceError {
    #[error("footprint at {at} overlaps another component")]
    Overlap { at: GridPos },
    #[error("footprint at {at} runs off the grid")]
    OutOfRange { at: GridPos },
    #[error("component does not exist")]
    UnknownComponent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StampError {
    #[error("blueprint member {member} would overlap a component")]
    Overlap { member: usize },
    #[error("blueprint member {member} would land off the grid")]
    OutOfRange { member: usize },
    #[error("blueprint has no components")]
    Empty,
}

/// A pin picked on the board, with its polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinPick {
    pub pin: PinRef,
    pub kind: PinKind,
}

impl PinPick {
    pub fn is_output(&self) -> bool {
        self.kind == PinKind::Output
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Component(ComponentId),
    Wire(WireId),
}

/// One editable circuit: the component graph, its wires, and the interaction state around it.
///
/// Everything that mutates components or wires goes through here. The transient fields
/// (tool, gesture, selection, pointer) can be reset at any time without touching the graph.
pub struct Session {
    pub(crate) registry: GateRegistry,
    pub(crate) config: SessionConfig,
    pub(crate) grid: Grid,
    pub(crate) components: Components,
    pub(crate) connections: ConnectionManager,
    simulator: Simulator,
    sim_clock: SimulationClock,
    anim_clock: AnimationClock,
    next_serial: u32,
    label_plan: Option<LabelPlan>,

    pub(crate) selection: Selection,
    pub(crate) multi: HashSet<ComponentId>,
    pub(crate) tool: Tool,
    pub(crate) gesture: Gesture,
    /// Last pointer position in screen pixels.
    pub(crate) pointer: Pos2,
    /// Screen position of the previous pan sample while a pan drag is active.
    pub(crate) panning: Option<Pos2>,
    pub(crate) hovered_pin: Option<PinPick>,
}

impl Session {
    pub fn new(registry: GateRegistry, config: SessionConfig) -> Self {
        Self {
            grid: Grid::new(config.grid.clone(), Vec2::ZERO),
            simulator: Simulator::new(&config.simulation),
            sim_clock: SimulationClock::new(config.simulation.tick_interval),
            anim_clock: AnimationClock::new(config.simulation.animation_frame),
            registry,
            config,
            components: Components::with_key(),
            connections: ConnectionManager::new(),
            next_serial: 0,
            label_plan: None,
            selection: Selection::None,
            multi: HashSet::new(),
            tool: Tool::Select,
            gesture: Gesture::None,
            pointer: Pos2::ZERO,
            panning: None,
            hovered_pin: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn registry(&self) -> &GateRegistry {
        &self.registry
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn components(&self) -> &Components {
        &self.components
    }

    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(id)
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    pub fn wire(&self, id: WireId) -> Option<&Wire> {
        self.connections.get(id)
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn pointer(&self) -> Pos2 {
        self.pointer
    }

    pub fn hovered_pin(&self) -> Option<PinPick> {
        self.hovered_pin
    }

    /// Component ids in creation order.
    pub fn ordered_components(&self) -> Vec<ComponentId> {
        let mut ids: Vec<(u32, ComponentId)> =
            self.components.iter().map(|(id, c)| (c.serial, id)).collect();
        ids.sort_unstable();
        ids.into_iter().map(|(_, id)| id).collect()
    }

    // Placement

    /// First component whose footprint intersects `footprint`, ignoring `exclude`.
    pub fn overlapping(
        &self,
        footprint: Footprint,
        exclude: Option<ComponentId>,
    ) -> Option<ComponentId> {
        self.components
            .iter()
            .find_map(|(id, c)| {
                (Some(id) != exclude && c.footprint().overlaps(&footprint)).then_some(id)
            })
    }

    pub fn can_place(&self, kind: ComponentKind, pos: GridPos) -> bool {
        let spec = self.registry.spec(kind);
        Footprint::checked(pos, spec.width, spec.height)
            .is_some_and(|footprint| self.overlapping(footprint, None).is_none())
    }

    pub fn place(&mut self, kind: ComponentKind, pos: GridPos) -> Result<ComponentId, PlaceError> {
        let spec = self.registry.spec(kind);
        let footprint = Footprint::checked(pos, spec.width, spec.height)
            .ok_or(PlaceError::OutOfRange { at: pos })?;
        if let Some(other) = self.overlapping(footprint, None) {
            log::debug!("Cannot place {kind} at {pos}: overlaps {other}");
            return Err(PlaceError::Overlap { at: pos });
        }

        self.next_serial += 1;
        let component = Component::new(self.next_serial, kind, pos, spec);
        log::debug!("Placed {}", component.display());
        let id = self.components.insert(component);
        self.refresh_labels();
        Ok(id)
    }

    /// Delete a component and every wire touching it. Returns false if it did not exist.
    pub fn delete_component(&mut self, id: ComponentId) -> bool {
        if !self.components.contains_key(id) {
            return false;
        }

        self.connections
            .remove_wires_for_component(&mut self.components, id, &self.config.routing);
        if let Some(c) = self.components.remove(id) {
            log::debug!("Deleted {}", c.display());
        }

        self.multi.remove(&id);
        match self.selection {
            Selection::Component(sel) if sel == id => self.selection = Selection::None,
            Selection::Wire(w) if self.connections.get(w).is_none() => {
                self.selection = Selection::None;
            }
            _ => {}
        }
        let stale_gesture = match &self.gesture {
            Gesture::Moving { id: moving, .. } => *moving == id,
            Gesture::Wiring(start) => start.pin.component == id,
            _ => false,
        };
        if stale_gesture {
            self.gesture = Gesture::None;
        }
        if self.hovered_pin.is_some_and(|p| p.pin.component == id) {
            self.hovered_pin = None;
        }

        self.refresh_labels();
        true
    }

    /// Move a component. On overlap the component stays where it was.
    pub fn move_component(&mut self, id: ComponentId, pos: GridPos) -> Result<(), PlaceError> {
        let Some(c) = self.components.get(id) else {
            return Err(PlaceError::UnknownComponent);
        };
        let footprint = Footprint::checked(pos, c.width, c.height)
            .ok_or(PlaceError::OutOfRange { at: pos })?;
        if let Some(other) = self.overlapping(footprint, Some(id)) {
            log::debug!("Cannot move {} to {pos}: overlaps {other}", c.display());
            return Err(PlaceError::Overlap { at: pos });
        }

        self.components[id].pos = pos;
        self.connections.reroute(&self.components, &self.config.routing);
        self.refresh_labels();
        Ok(())
    }

    pub fn find_component_at(&self, cell: GridPos) -> Option<ComponentId> {
        self.components
            .iter()
            .find_map(|(id, c)| c.occupies_cell(cell).then_some(id))
    }

    /// Nearest pin anchor within the pick radius of a fractional grid position.
    pub fn find_pin_at(&self, at: Pos2) -> Option<PinPick> {
        let radius = self.config.interaction.pin_hit_radius;
        let mut best: Option<(f32, PinPick)> = None;

        for id in self.ordered_components() {
            let c = &self.components[id];
            for kind in [PinKind::Output, PinKind::Input] {
                for pin in c.pins(kind) {
                    let Some(anchor) = c.pin_anchor(kind, pin.index) else {
                        continue;
                    };
                    let dist = (anchor - at).length();
                    if dist <= radius && best.is_none_or(|(d, _)| dist < d) {
                        best = Some((
                            dist,
                            PinPick {
                                pin: PinRef::new(id, pin.index),
                                kind,
                            },
                        ));
                    }
                }
            }
        }

        best.map(|(_, pick)| pick)
    }

    pub fn find_pin_at_screen(&self, screen: Pos2) -> Option<PinPick> {
        self.find_pin_at(self.grid.screen_to_grid_precise(screen))
    }

    pub fn find_wire_at_screen(&self, screen: Pos2) -> Option<WireId> {
        self.connections.find_wire_at(
            screen,
            &self.grid,
            self.config.interaction.wire_hit_distance,
        )
    }

    // Wiring

    /// Connect output pin `from` to input pin `to`, superseding any wire already into `to`.
    pub fn connect(&mut self, from: PinRef, to: PinRef) -> Result<WireId, ConnectError> {
        self.connections
            .connect(&mut self.components, from, to, &self.config.routing)
    }

    /// Connect two picked pins in whichever direction their polarities allow.
    pub fn connect_pins(&mut self, a: PinPick, b: PinPick) -> Result<WireId, ConnectError> {
        if a.kind == b.kind {
            return Err(ConnectError::SamePolarity);
        }
        if a.pin.component == b.pin.component {
            return Err(ConnectError::SameComponent);
        }
        let (from, to) = match a.kind {
            PinKind::Output => (a.pin, b.pin),
            PinKind::Input => (b.pin, a.pin),
        };
        self.connect(from, to)
    }

    pub fn disconnect(&mut self, id: WireId) -> bool {
        if self.selection == Selection::Wire(id) {
            self.selection = Selection::None;
        }
        self.connections
            .disconnect(&mut self.components, id, &self.config.routing)
            .is_some()
    }

    // Selection

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn select(&mut self, selection: Selection) {
        self.selection = selection;
    }

    pub fn is_selected(&self, id: ComponentId) -> bool {
        self.multi.contains(&id)
    }

    /// Multi-selected components in creation order.
    pub fn selected_components(&self) -> Vec<ComponentId> {
        self.ordered_components()
            .into_iter()
            .filter(|id| self.multi.contains(id))
            .collect()
    }

    pub fn toggle_in_selection(&mut self, id: ComponentId) {
        if !self.multi.remove(&id) && self.components.contains_key(id) {
            self.multi.insert(id);
        }
    }

    pub fn clear_selection(&mut self) {
        self.multi.clear();
    }

    /// Add every component touching the inclusive cell rectangle spanned by `a` and `b`.
    pub fn box_select(&mut self, a: GridPos, b: GridPos) {
        let min = GridPos::new(a.x.min(b.x), a.y.min(b.y));
        let rect = Footprint::new(
            min,
            a.x.max(b.x) + 1 - min.x,
            a.y.max(b.y) + 1 - min.y,
        );
        for (id, c) in &self.components {
            if c.footprint().overlaps(&rect) {
                self.multi.insert(id);
            }
        }
    }

    /// Wires with both ends inside the multi-selection.
    pub fn selected_wires(&self) -> Vec<WireId> {
        self.connections
            .wires_sorted()
            .into_iter()
            .filter(|(_, w)| {
                self.multi.contains(&w.from.component) && self.multi.contains(&w.to.component)
            })
            .map(|(id, _)| id)
            .collect()
    }

    pub fn selected_gate_count(&self) -> usize {
        self.multi
            .iter()
            .filter(|&&id| self.components.get(id).is_some_and(|c| c.kind.is_gate()))
            .count()
    }

    // Blueprints

    pub fn capture_selection(&self, name: &str) -> Result<Blueprint, BlueprintError> {
        Blueprint::capture(
            name,
            &self.components,
            &self.selected_components(),
            &self.connections,
        )
    }

    /// Check every member against the current board and against the other members.
    pub fn check_stamp(&self, blueprint: &Blueprint, origin: GridPos) -> Result<(), StampError> {
        self.plan_stamp(blueprint, origin).map(|_| ())
    }

    /// Footprints for every member of a stamp at `origin`, in member order.
    fn plan_stamp(
        &self,
        blueprint: &Blueprint,
        origin: GridPos,
    ) -> Result<Vec<Footprint>, StampError> {
        if blueprint.components.is_empty() {
            return Err(StampError::Empty);
        }

        let mut planned: Vec<Footprint> = Vec::with_capacity(blueprint.components.len());
        for (member, c) in blueprint.components.iter().enumerate() {
            let spec = self.registry.spec(c.kind);
            let footprint = c
                .position(origin)
                .and_then(|pos| Footprint::checked(pos, spec.width, spec.height))
                .ok_or(StampError::OutOfRange { member })?;
            if self.overlapping(footprint, None).is_some()
                || planned.iter().any(|p| p.overlaps(&footprint))
            {
                return Err(StampError::Overlap { member });
            }
            planned.push(footprint);
        }
        Ok(planned)
    }

    /// Place a blueprint with its top-left corner at `origin`. Nothing is placed unless every
    /// member fits. Wires referring to members that do not exist are skipped.
    pub fn stamp(
        &mut self,
        blueprint: &Blueprint,
        origin: GridPos,
    ) -> Result<Vec<ComponentId>, StampError> {
        let planned = self.plan_stamp(blueprint, origin)?;

        let mut ids = Vec::with_capacity(blueprint.components.len());
        for (c, footprint) in blueprint.components.iter().zip(planned) {
            self.next_serial += 1;
            let spec = self.registry.spec(c.kind);
            let component = Component::new(self.next_serial, c.kind, footprint.origin, spec);
            ids.push(self.components.insert(component));
        }

        for w in &blueprint.wires {
            let (Some(&from), Some(&to)) = (ids.get(w.from_index), ids.get(w.to_index)) else {
                log::debug!("Skipping blueprint wire {w:?}: index out of range");
                continue;
            };
            if let Err(e) = self.connections.connect(
                &mut self.components,
                PinRef::new(from, w.from_pin),
                PinRef::new(to, w.to_pin),
                &self.config.routing,
            ) {
                log::debug!("Skipping blueprint wire {w:?}: {e}");
            }
        }

        self.refresh_labels();
        log::debug!(
            "Stamped blueprint \"{}\" at {origin}: {} components",
            blueprint.name,
            ids.len()
        );
        Ok(ids)
    }

    // Simulation

    pub fn run_simulation_step(&mut self) {
        self.simulator
            .step(&mut self.components, &mut self.connections);
    }

    pub fn simulation_steps(&self) -> u64 {
        self.simulator.steps()
    }

    pub fn is_simulating(&self) -> bool {
        self.sim_clock.is_running()
    }

    /// Start the periodic driver. One step runs immediately.
    pub fn start_simulation(&mut self) {
        if self.is_simulating() {
            return;
        }
        log::info!(
            "Simulation started, stepping every {:?}",
            self.sim_clock.interval()
        );
        self.sim_clock.start();
        self.run_simulation_step();
        self.sync_animation();
    }

    pub fn stop_simulation(&mut self) {
        if !self.is_simulating() {
            return;
        }
        log::info!("Simulation stopped after {} steps", self.simulator.steps());
        self.sim_clock.stop();
        self.sync_animation();
    }

    pub fn toggle_simulation(&mut self) -> bool {
        if self.is_simulating() {
            self.stop_simulation();
        } else {
            self.start_simulation();
        }
        self.is_simulating()
    }

    /// Advance both periodic drivers by `dt`. Returns true when a redraw is due.
    pub fn tick(&mut self, dt: Duration) -> bool {
        let stepped = self.sim_clock.advance(dt);
        if stepped {
            self.run_simulation_step();
        }
        let frame = self.anim_clock.advance(dt);
        stepped || frame
    }

    /// Seconds of animation time, for pulse effects only.
    pub fn anim_time(&self) -> f32 {
        self.anim_clock.elapsed_secs()
    }

    pub fn is_animating(&self) -> bool {
        self.anim_clock.is_running()
    }

    /// Animation runs while simulating or while a wire is being drawn.
    pub(crate) fn sync_animation(&mut self) {
        if self.is_simulating() || self.tool == Tool::Wire {
            self.anim_clock.start();
        } else {
            self.anim_clock.stop();
        }
    }

    pub fn set_manual_value(&mut self, id: ComponentId, value: bool) -> bool {
        match self.components.get_mut(id) {
            Some(c) if c.kind == ComponentKind::Input => {
                c.manual_value = value;
                true
            }
            _ => false,
        }
    }

    // Labels

    pub fn label_plan(&self) -> Option<&LabelPlan> {
        self.label_plan.as_ref()
    }

    /// Remember `plan` and name unlabeled terminals from it. `None` clears every label.
    pub fn apply_labels(&mut self, plan: Option<&LabelPlan>) {
        self.label_plan = plan.cloned();
        self.refresh_labels();
    }

    pub fn reset_labels(&mut self) {
        labels::reset(&mut self.components, self.label_plan.as_ref());
    }

    fn refresh_labels(&mut self) {
        labels::assign(&mut self.components, self.label_plan.as_ref());
    }

    /// Remove every component and wire and stop the simulation.
    pub fn clear(&mut self) {
        self.stop_simulation();
        self.connections.clear(&mut self.components);
        self.components.clear();
        self.selection = Selection::None;
        self.multi.clear();
        self.hovered_pin = None;
        self.panning = None;
        self.gesture = match std::mem::take(&mut self.gesture) {
            Gesture::Placing(kind) => Gesture::Placing(kind),
            _ => Gesture::None,
        };
        if self.tool == Tool::Blueprint {
            self.tool = Tool::Select;
        }
        log::info!("Board cleared");
    }

    pub fn debug_string(&self) -> String {
        let mut out = format!(
            "Components: {}\nTool: {:?}\nGesture: {}\nSelection: {:?} (+{} multi)\nSimulating: {} ({} steps)\nZoom: {:.2}\n",
            self.components.len(),
            self.tool,
            self.gesture.name(),
            self.selection,
            self.multi.len(),
            self.is_simulating(),
            self.simulator.steps(),
            self.grid.zoom(),
        );
        for id in self.ordered_components() {
            out.push_str(&format!("  {}\n", self.components[id].display()));
        }
        out.push_str(&self.connections.debug_info());
        out
    }
}
