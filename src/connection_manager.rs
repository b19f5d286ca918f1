use egui::Pos2;
use slotmap::SlotMap;

use crate::catalog::PinKind;
use crate::component::{ComponentId, Components};
use crate::config::RoutingConfig;
use crate::grid::Grid;
use crate::routing::{Endpoints, Router};
use crate::wire::{PinRef, Wire, WireId, distance_to_polyline};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    #[error("an identical wire already exists")]
    Duplicate,
    #[error("a wire cannot start and end on the same component")]
    SameComponent,
    #[error("both pins have the same polarity")]
    SamePolarity,
    #[error("pin index out of range")]
    NoSuchPin,
    #[error("component does not exist")]
    UnknownComponent,
}

/// Owns every wire of one circuit.
///
/// This is the only place that flips pin `connected` flags, and every wire mutation ends with a
/// full re-route so channel claims are always derived from the current wire set.
#[derive(Default)]
pub struct ConnectionManager {
    wires: SlotMap<WireId, Wire>,
    next_serial: u32,
    /// Channel searches that exhausted their budget during the last routing pass.
    last_fallbacks: usize,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.wires.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wires.is_empty()
    }

    pub fn get(&self, id: WireId) -> Option<&Wire> {
        self.wires.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (WireId, &Wire)> {
        self.wires.iter()
    }

    /// Wires in creation order.
    pub fn wires_sorted(&self) -> Vec<(WireId, &Wire)> {
        let mut wires: Vec<_> = self.wires.iter().collect();
        wires.sort_by_key(|(_, w)| w.serial);
        wires
    }

    pub fn last_fallbacks(&self) -> usize {
        self.last_fallbacks
    }

    /// The wire currently driving the input pin `to`, if any.
    pub fn driver_of(&self, to: PinRef) -> Option<WireId> {
        self.wires
            .iter()
            .find_map(|(id, w)| (w.to == to).then_some(id))
    }

    pub fn wires_touching(&self, component: ComponentId) -> Vec<WireId> {
        self.wires
            .iter()
            .filter_map(|(id, w)| w.touches(component).then_some(id))
            .collect()
    }

    /// Connect output pin `from` to input pin `to`.
    ///
    /// An existing wire into `to` is removed first. All wires are re-routed afterwards.
    pub fn connect(
        &mut self,
        components: &mut Components,
        from: PinRef,
        to: PinRef,
        routing: &RoutingConfig,
    ) -> Result<WireId, ConnectError> {
        let (Some(source), Some(dest)) = (
            components.get(from.component),
            components.get(to.component),
        ) else {
            return Err(ConnectError::UnknownComponent);
        };
        if from.component == to.component {
            return Err(ConnectError::SameComponent);
        }
        if source.pin(PinKind::Output, from.index).is_none()
            || dest.pin(PinKind::Input, to.index).is_none()
        {
            return Err(ConnectError::NoSuchPin);
        }
        if self.wires.values().any(|w| w.connects(from, to)) {
            return Err(ConnectError::Duplicate);
        }

        if let Some(old) = self.driver_of(to)
            && let Some(wire) = self.wires.remove(old)
        {
            log::debug!("{} superseded", wire.display());
            Self::refresh_pin(&self.wires, components, wire.from, PinKind::Output);
        }

        self.next_serial += 1;
        let id = self.wires.insert(Wire::new(self.next_serial, from, to));
        Self::refresh_pin(&self.wires, components, from, PinKind::Output);
        Self::refresh_pin(&self.wires, components, to, PinKind::Input);
        log::debug!("Connected {}", self.wires[id].display());

        self.reroute(components, routing);
        Ok(id)
    }

    pub fn disconnect(
        &mut self,
        components: &mut Components,
        id: WireId,
        routing: &RoutingConfig,
    ) -> Option<Wire> {
        let wire = self.wires.remove(id)?;
        Self::refresh_pin(&self.wires, components, wire.from, PinKind::Output);
        Self::refresh_pin(&self.wires, components, wire.to, PinKind::Input);
        log::debug!("Disconnected {}", wire.display());
        self.reroute(components, routing);
        Some(wire)
    }

    /// Detach and discard every wire touching `component`. Returns how many were removed.
    pub fn remove_wires_for_component(
        &mut self,
        components: &mut Components,
        component: ComponentId,
        routing: &RoutingConfig,
    ) -> usize {
        let doomed = self.wires_touching(component);
        for &id in &doomed {
            if let Some(wire) = self.wires.remove(id) {
                Self::refresh_pin(&self.wires, components, wire.from, PinKind::Output);
                Self::refresh_pin(&self.wires, components, wire.to, PinKind::Input);
            }
        }
        if !doomed.is_empty() {
            log::debug!("Removed {} wires of component {component}", doomed.len());
            self.reroute(components, routing);
        }
        doomed.len()
    }

    /// A pin is connected while at least one wire ends on it.
    fn refresh_pin(
        wires: &SlotMap<WireId, Wire>,
        components: &mut Components,
        pin: PinRef,
        kind: PinKind,
    ) {
        let connected = wires.values().any(|w| match kind {
            PinKind::Output => w.from == pin,
            PinKind::Input => w.to == pin,
        });
        if let Some(p) = components
            .get_mut(pin.component)
            .and_then(|c| c.pin_mut(kind, pin.index))
        {
            p.connected = connected;
        }
    }

    fn endpoints(components: &Components, wire: &Wire) -> Option<Endpoints> {
        let start = components
            .get(wire.from.component)?
            .pin_anchor(PinKind::Output, wire.from.index)?;
        let end = components
            .get(wire.to.component)?
            .pin_anchor(PinKind::Input, wire.to.index)?;
        Some(Endpoints { start, end })
    }

    /// Lay out every wire again from scratch, in creation order.
    pub fn reroute(&mut self, components: &Components, routing: &RoutingConfig) {
        let mut order: Vec<(u32, WireId)> =
            self.wires.iter().map(|(id, w)| (w.serial, id)).collect();
        order.sort_unstable();

        let mut router = Router::new(routing);
        for (_, id) in order {
            let wire = &mut self.wires[id];
            match Self::endpoints(components, wire) {
                Some(ep) => wire.set_path(router.route(ep)),
                None => log::debug!("{} has a dangling endpoint, path left as is", wire.display()),
            }
        }

        self.last_fallbacks = router.fallbacks();
        log::debug!(
            "Routed {} wires, {} channel fallbacks",
            self.wires.len(),
            self.last_fallbacks
        );
    }

    /// Copy each driving output value onto its wire and its destination input.
    pub fn propagate(&mut self, components: &mut Components) {
        for wire in self.wires.values_mut() {
            let value = components
                .get(wire.from.component)
                .is_some_and(|c| c.output_value(wire.from.index));
            wire.value = value;
            if let Some(pin) = components
                .get_mut(wire.to.component)
                .and_then(|c| c.pin_mut(PinKind::Input, wire.to.index))
            {
                pin.value = value;
            }
        }
    }

    /// First wire, in creation order, whose path passes within `max_distance` screen pixels.
    pub fn find_wire_at(&self, screen_pos: Pos2, grid: &Grid, max_distance: f32) -> Option<WireId> {
        self.wires_sorted().into_iter().find_map(|(id, wire)| {
            let points: Vec<Pos2> = wire.path().iter().map(|&p| grid.grid_to_screen(p)).collect();
            (distance_to_polyline(&points, screen_pos) < max_distance).then_some(id)
        })
    }

    pub fn clear(&mut self, components: &mut Components) {
        for c in components.values_mut() {
            for pin in c.inputs.iter_mut().chain(c.outputs.iter_mut()) {
                pin.connected = false;
            }
        }
        self.wires.clear();
        self.last_fallbacks = 0;
    }

    pub fn debug_info(&self) -> String {
        let mut out = format!("Wires: {}\n", self.wires.len());
        for (_, wire) in self.wires_sorted() {
            out.push_str(&format!(
                "  {} value={} points={}\n",
                wire.display(),
                wire.value,
                wire.path().len()
            ));
        }
        out.push_str(&format!("Last routing fallbacks: {}\n", self.last_fallbacks));
        out
    }
}
