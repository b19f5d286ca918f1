use egui::{Pos2, Vec2};

use crate::blueprint::Blueprint;
use crate::catalog::ComponentKind;
use crate::component::{ComponentId, GridPos};
use crate::session::{PinPick, Selection, Session};

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Select,
    Wire,
    Delete,
    Move,
    Component,
    Blueprint,
}

/// The one interaction in progress, if any.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gesture {
    #[default]
    None,
    Placing(ComponentKind),
    /// First pin of a wire has been picked.
    Wiring(PinPick),
    Moving {
        id: ComponentId,
        origin: GridPos,
    },
    BoxSelecting {
        start: GridPos,
        end: GridPos,
    },
    Stamping(Blueprint),
}

impl Gesture {
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Placing(_) => "placing",
            Self::Wiring(_) => "wiring",
            Self::Moving { .. } => "moving",
            Self::BoxSelecting { .. } => "box-selecting",
            Self::Stamping(_) => "stamping",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
}

/// Pointer input in screen pixels, as handed over by the front-end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Moved {
        pos: Pos2,
    },
    Pressed {
        pos: Pos2,
        button: PointerButton,
        modifiers: Modifiers,
    },
    Released {
        pos: Pos2,
        button: PointerButton,
    },
    /// Positive `delta` scrolls away from the user and zooms in.
    Wheel {
        pos: Pos2,
        delta: f32,
    },
}

impl Session {
    /// Switch tools. Pending wire, move and stamp state is dropped; the graph is untouched.
    pub fn set_tool(&mut self, tool: Tool) {
        let keep_move = tool == Tool::Move && matches!(self.gesture, Gesture::Moving { .. });
        if !keep_move {
            self.gesture = Gesture::None;
        }
        if tool != Tool::Move || matches!(self.selection, Selection::Wire(_)) {
            self.selection = Selection::None;
        }
        self.hovered_pin = None;
        self.tool = tool;
        self.sync_animation();
    }

    /// Arm the component tool with `kind`.
    pub fn set_placing(&mut self, kind: ComponentKind) {
        self.set_tool(Tool::Component);
        self.gesture = Gesture::Placing(kind);
    }

    /// Arm the blueprint tool. The next primary click stamps `blueprint` at the clicked cell.
    pub fn begin_stamp(&mut self, blueprint: Blueprint) {
        self.set_tool(Tool::Blueprint);
        self.gesture = Gesture::Stamping(blueprint);
    }

    pub fn start_move(&mut self, id: ComponentId) -> bool {
        let Some(c) = self.components.get(id) else {
            return false;
        };
        self.gesture = Gesture::Moving { id, origin: c.pos };
        self.selection = Selection::Component(id);
        self.tool = Tool::Move;
        self.sync_animation();
        true
    }

    /// Abandon a pending move, putting the component back where the move began.
    pub fn cancel_move(&mut self) {
        if let Gesture::Moving { id, origin } = self.gesture
            && let Some(c) = self.components.get_mut(id)
        {
            c.pos = origin;
            self.connections
                .reroute(&self.components, &self.config.routing);
        }
        self.gesture = Gesture::None;
        self.tool = Tool::Select;
        self.sync_animation();
    }

    pub fn reset_view(&mut self) {
        self.grid.reset_view();
    }

    /// Resize the drawn board. Components outside it stay where they are.
    pub fn set_board_extent(&mut self, extent: (u32, u32)) {
        if self.config.grid.extent != extent {
            self.config.grid.extent = extent;
            self.grid.set_extent(extent);
        }
    }

    pub fn handle_input(&mut self, event: InputEvent) {
        match event {
            InputEvent::Moved { pos } => self.pointer_moved(pos),
            InputEvent::Pressed {
                pos,
                button,
                modifiers,
            } => self.pointer_pressed(pos, button, modifiers),
            InputEvent::Released { pos, button } => self.pointer_released(pos, button),
            InputEvent::Wheel { pos, delta } => {
                if delta == 0.0 {
                    return;
                }
                let interaction = &self.config.interaction;
                let factor = if delta > 0.0 {
                    interaction.wheel_zoom_in
                } else {
                    interaction.wheel_zoom_out
                };
                let zoom = self.grid.zoom() * factor;
                self.grid.set_zoom(zoom, Some(pos));
            }
        }
    }

    fn pointer_moved(&mut self, pos: Pos2) {
        if let Some(last) = self.panning {
            let delta: Vec2 = pos - last;
            self.grid.pan(delta);
            self.panning = Some(pos);
            return;
        }

        self.pointer = pos;
        let cell = self.grid.screen_to_grid(pos);
        if let Gesture::BoxSelecting { end, .. } = &mut self.gesture {
            *end = cell;
        }
        self.hovered_pin = if self.tool == Tool::Wire {
            self.find_pin_at_screen(pos)
        } else {
            None
        };
    }

    fn pointer_pressed(&mut self, pos: Pos2, button: PointerButton, modifiers: Modifiers) {
        match button {
            PointerButton::Middle => {
                self.panning = Some(pos);
                return;
            }
            PointerButton::Primary if modifiers.ctrl => {
                self.panning = Some(pos);
                return;
            }
            PointerButton::Secondary => {
                self.pointer = pos;
                self.right_click();
                return;
            }
            PointerButton::Primary => {}
        }

        self.pointer = pos;
        let cell = self.grid.screen_to_grid(pos);

        if self.tool == Tool::Blueprint {
            self.stamp_click(cell);
            return;
        }

        if modifiers.shift && self.tool == Tool::Select {
            match self.find_component_at(cell) {
                Some(id) => self.toggle_in_selection(id),
                None => {
                    self.gesture = Gesture::BoxSelecting {
                        start: cell,
                        end: cell,
                    }
                }
            }
            return;
        }

        match self.tool {
            Tool::Select => self.select_click(cell),
            Tool::Component => self.place_click(cell),
            Tool::Wire => self.wire_click(),
            Tool::Delete => self.delete_click(cell),
            Tool::Move => self.move_click(cell),
            Tool::Blueprint => {}
        }
    }

    fn pointer_released(&mut self, pos: Pos2, button: PointerButton) {
        if button == PointerButton::Middle
            || (button == PointerButton::Primary && self.panning.is_some())
        {
            self.panning = None;
            return;
        }

        if button == PointerButton::Primary
            && let Gesture::BoxSelecting { start, .. } = self.gesture
        {
            let end = self.grid.screen_to_grid(pos);
            self.gesture = Gesture::None;
            self.box_select(start, end);
            log::debug!("Box selected {} components", self.multi.len());
        }
    }

    fn stamp_click(&mut self, cell: GridPos) {
        match std::mem::take(&mut self.gesture) {
            Gesture::Stamping(blueprint) => match self.stamp(&blueprint, cell) {
                Ok(_) => {
                    self.tool = Tool::Select;
                    self.sync_animation();
                }
                Err(e) => {
                    log::debug!("Stamp at {cell} rejected: {e}");
                    self.gesture = Gesture::Stamping(blueprint);
                }
            },
            other => self.gesture = other,
        }
    }

    fn select_click(&mut self, cell: GridPos) {
        self.clear_selection();

        if let Some(id) = self.find_component_at(cell) {
            self.selection = Selection::Component(id);
            if let Some(c) = self.components.get_mut(id)
                && c.kind == ComponentKind::Input
            {
                c.manual_value = !c.manual_value;
                self.run_simulation_step();
            }
            return;
        }

        self.selection = match self.find_wire_at_screen(self.pointer) {
            Some(wire) => Selection::Wire(wire),
            None => Selection::None,
        };
    }

    fn place_click(&mut self, cell: GridPos) {
        if let Gesture::Placing(kind) = self.gesture
            && let Err(e) = self.place(kind, cell)
        {
            log::debug!("{e}");
        }
    }

    fn wire_click(&mut self) {
        let Some(pick) = self.find_pin_at_screen(self.pointer) else {
            self.gesture = Gesture::None;
            return;
        };

        match self.gesture {
            Gesture::Wiring(start) => {
                self.gesture = Gesture::None;
                if let Err(e) = self.connect_pins(start, pick) {
                    log::debug!("Wire not created: {e}");
                }
            }
            _ => self.gesture = Gesture::Wiring(pick),
        }
    }

    fn delete_click(&mut self, cell: GridPos) {
        let hit = self.find_component_at(cell);

        if let Some(id) = hit
            && self.multi.contains(&id)
        {
            for id in self.selected_components() {
                self.delete_component(id);
            }
            self.clear_selection();
            return;
        }

        if let Some(id) = hit {
            self.delete_component(id);
        } else if let Some(wire) = self.find_wire_at_screen(self.pointer) {
            self.disconnect(wire);
        }
    }

    fn move_click(&mut self, cell: GridPos) {
        match self.gesture {
            Gesture::Moving { id, .. } => match self.move_component(id, cell) {
                Ok(()) => self.gesture = Gesture::None,
                Err(e) => log::debug!("{e}"),
            },
            _ => {
                if let Some(id) = self.find_component_at(cell) {
                    self.start_move(id);
                }
            }
        }
    }

    fn right_click(&mut self) {
        if self.tool == Tool::Blueprint {
            self.gesture = Gesture::None;
            self.tool = Tool::Select;
            return;
        }

        if matches!(self.gesture, Gesture::Wiring(_)) {
            self.gesture = Gesture::None;
            return;
        }

        let cell = self.grid.screen_to_grid(self.pointer);
        if let Some(id) = self.find_component_at(cell) {
            self.delete_component(id);
        } else if let Some(wire) = self.find_wire_at_screen(self.pointer) {
            self.disconnect(wire);
        } else {
            self.selection = Selection::None;
        }
    }

    /// Screen-space start of the wire being drawn, for the rubber-band preview.
    pub fn wire_preview_start(&self) -> Option<Pos2> {
        let Gesture::Wiring(start) = &self.gesture else {
            return None;
        };
        let anchor = self
            .components
            .get(start.pin.component)?
            .pin_anchor(start.kind, start.pin.index)?;
        Some(self.grid.grid_to_screen(anchor))
    }

    /// Footprint preview for the pending placement, move or stamp at the hovered cell,
    /// with whether it would be accepted.
    pub fn preview(&self) -> Option<(Vec<(GridPos, i32, i32)>, bool)> {
        let cell = self.grid.screen_to_grid(self.pointer);
        match &self.gesture {
            Gesture::Placing(kind) => {
                let spec = self.registry.spec(*kind);
                Some((
                    vec![(cell, spec.width, spec.height)],
                    self.can_place(*kind, cell),
                ))
            }
            Gesture::Moving { id, .. } => {
                let c = self.components.get(*id)?;
                let ok = self.overlapping(c.footprint_at(cell), Some(*id)).is_none();
                Some((vec![(cell, c.width, c.height)], ok))
            }
            Gesture::Stamping(bp) => {
                let cells = bp
                    .components
                    .iter()
                    .filter_map(|m| {
                        let spec = self.registry.spec(m.kind);
                        Some((m.position(cell)?, spec.width, spec.height))
                    })
                    .collect();
                Some((cells, self.check_stamp(bp, cell).is_ok()))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{GateRegistry, PinKind};
    use crate::config::SessionConfig;
    use crate::wire::PinRef;
    use egui::{pos2, vec2};

    fn session() -> Session {
        let mut s = Session::new(GateRegistry::default(), SessionConfig::default());
        s.grid_mut().resize(vec2(800.0, 600.0));
        s
    }

    fn cell_center(s: &Session, x: i32, y: i32) -> Pos2 {
        s.grid().grid_to_screen(pos2(x as f32 + 0.5, y as f32 + 0.5))
    }

    fn pin_screen(s: &Session, id: ComponentId, kind: PinKind, index: usize) -> Pos2 {
        let a = s
            .component(id)
            .and_then(|c| c.pin_anchor(kind, index))
            .expect("pin exists");
        s.grid().grid_to_screen(a)
    }

    fn press(s: &mut Session, pos: Pos2, button: PointerButton, modifiers: Modifiers) {
        s.handle_input(InputEvent::Moved { pos });
        s.handle_input(InputEvent::Pressed {
            pos,
            button,
            modifiers,
        });
    }

    fn click(s: &mut Session, pos: Pos2) {
        press(s, pos, PointerButton::Primary, Modifiers::default());
        s.handle_input(InputEvent::Released {
            pos,
            button: PointerButton::Primary,
        });
    }

    fn click_cell(s: &mut Session, x: i32, y: i32) {
        let pos = cell_center(s, x, y);
        click(s, pos);
    }

    fn click_grid(s: &mut Session, at: Pos2) {
        let pos = s.grid().grid_to_screen(at);
        click(s, pos);
    }

    fn click_pin(s: &mut Session, id: ComponentId, kind: PinKind) {
        let pos = pin_screen(s, id, kind, 0);
        click(s, pos);
    }

    fn right_click_grid(s: &mut Session, at: Pos2) {
        let pos = s.grid().grid_to_screen(at);
        press(s, pos, PointerButton::Secondary, Modifiers::default());
    }

    fn right_click_cell(s: &mut Session, x: i32, y: i32) {
        right_click_grid(s, pos2(x as f32 + 0.5, y as f32 + 0.5));
    }

    fn assert_close(actual: Vec2, expected: Vec2) {
        assert!(
            (actual - expected).length() < 1e-2,
            "expected {expected:?}, got {actual:?}"
        );
    }

    const SHIFT: Modifiers = Modifiers {
        shift: true,
        ctrl: false,
    };

    #[test]
    fn component_tool_places_on_click() {
        let mut s = session();
        s.set_placing(ComponentKind::Nor);
        click_cell(&mut s, 4, 2);
        click_cell(&mut s, 5, 2);

        assert_eq!(s.components().len(), 1, "second click overlaps");
        let (_, c) = s.components().iter().next().expect("placed");
        assert_eq!((c.kind, c.pos), (ComponentKind::Nor, GridPos::new(4, 2)));
        assert_eq!(s.gesture(), &Gesture::Placing(ComponentKind::Nor));

        let (cells, ok) = s.preview().expect("placement preview");
        assert_eq!(cells, vec![(GridPos::new(5, 2), 3, 2)]);
        assert!(!ok);
    }

    #[test]
    fn wire_gesture_works_in_both_directions() {
        let mut s = session();
        let a = s.place(ComponentKind::Input, GridPos::new(0, 0)).expect("A");
        let q = s.place(ComponentKind::Output, GridPos::new(8, 3)).expect("Q");
        s.set_tool(Tool::Wire);

        // Start on the input pin, finish on the output pin.
        click_pin(&mut s, q, PinKind::Input);
        assert!(matches!(s.gesture(), Gesture::Wiring(_)));
        assert!(s.wire_preview_start().is_some());
        click_pin(&mut s, a, PinKind::Output);

        assert_eq!(s.gesture(), &Gesture::None);
        let (_, wire) = s.connections().iter().next().expect("wire created");
        assert_eq!(wire.from.component, a);
        assert_eq!(wire.to.component, q);
    }

    #[test]
    fn same_polarity_completion_clears_gesture() {
        let mut s = session();
        let a = s.place(ComponentKind::Input, GridPos::new(0, 0)).expect("A");
        let b = s.place(ComponentKind::Input, GridPos::new(0, 4)).expect("B");
        s.set_tool(Tool::Wire);

        click_pin(&mut s, a, PinKind::Output);
        click_pin(&mut s, b, PinKind::Output);
        assert!(s.connections().is_empty());
        assert_eq!(s.gesture(), &Gesture::None);

        // Clicking empty board also abandons the wire.
        click_pin(&mut s, a, PinKind::Output);
        click_cell(&mut s, 30, 30);
        assert_eq!(s.gesture(), &Gesture::None);
    }

    #[test]
    fn hovering_pins_in_wire_mode() {
        let mut s = session();
        let a = s.place(ComponentKind::Input, GridPos::new(0, 0)).expect("A");
        s.set_tool(Tool::Wire);
        assert!(s.is_animating(), "wire mode animates the pin highlight");

        let pos = pin_screen(&s, a, PinKind::Output, 0);
        s.handle_input(InputEvent::Moved { pos });
        assert_eq!(s.hovered_pin().map(|p| p.pin.component), Some(a));
        assert!(s.hovered_pin().is_some_and(|p| p.is_output()));

        s.set_tool(Tool::Select);
        assert!(s.hovered_pin().is_none());
        assert!(!s.is_animating());
    }

    #[test]
    fn select_click_toggles_inputs_and_picks_wires() {
        let mut s = session();
        let a = s.place(ComponentKind::Input, GridPos::new(0, 0)).expect("A");
        let q = s.place(ComponentKind::Output, GridPos::new(8, 0)).expect("Q");
        let w = s.connect(PinRef::new(a, 0), PinRef::new(q, 0)).expect("wire");

        click_cell(&mut s, 1, 0);
        assert_eq!(s.selection(), Selection::Component(a));
        assert!(s.component(a).expect("A").manual_value);
        assert!(s.component(q).expect("Q").input_value(0), "toggle runs a step");

        // The wire runs along y = 0.5 from x = 3 to x = 8.
        click_grid(&mut s, pos2(5.0, 0.5));
        assert_eq!(s.selection(), Selection::Wire(w));

        click_cell(&mut s, 40, 40);
        assert_eq!(s.selection(), Selection::None);
    }

    #[test]
    fn shift_click_and_box_select() {
        let mut s = session();
        let a = s.place(ComponentKind::Input, GridPos::new(0, 0)).expect("A");
        let g = s.place(ComponentKind::And, GridPos::new(5, 0)).expect("G");
        let far = s.place(ComponentKind::Or, GridPos::new(20, 20)).expect("far");

        let on_a = cell_center(&s, 0, 0);
        press(&mut s, on_a, PointerButton::Primary, SHIFT);
        assert!(s.is_selected(a));
        press(&mut s, on_a, PointerButton::Primary, SHIFT);
        assert!(!s.is_selected(a), "shift-click toggles");

        let start = cell_center(&s, -1, -1);
        let end = cell_center(&s, 6, 1);
        press(&mut s, start, PointerButton::Primary, SHIFT);
        assert!(matches!(s.gesture(), Gesture::BoxSelecting { .. }));
        s.handle_input(InputEvent::Moved { pos: end });
        assert_eq!(
            s.gesture(),
            &Gesture::BoxSelecting {
                start: GridPos::new(-1, -1),
                end: GridPos::new(6, 1)
            }
        );
        s.handle_input(InputEvent::Released {
            pos: end,
            button: PointerButton::Primary,
        });

        assert_eq!(s.selected_components(), vec![a, g]);
        assert!(!s.is_selected(far));
        assert_eq!(s.gesture(), &Gesture::None);
    }

    #[test]
    fn delete_tool_removes_selection_component_or_wire() {
        let mut s = session();
        let a = s.place(ComponentKind::Input, GridPos::new(0, 0)).expect("A");
        let b = s.place(ComponentKind::Input, GridPos::new(0, 4)).expect("B");
        let g = s.place(ComponentKind::Xor, GridPos::new(6, 1)).expect("G");
        let q = s.place(ComponentKind::Output, GridPos::new(12, 1)).expect("Q");
        s.connect(PinRef::new(g, 0), PinRef::new(q, 0)).expect("g->q");
        s.toggle_in_selection(a);
        s.toggle_in_selection(b);
        s.set_tool(Tool::Delete);

        click_cell(&mut s, 0, 4);
        assert!(s.component(a).is_none() && s.component(b).is_none());
        assert!(s.selected_components().is_empty());

        // G's output anchor is (9, 2) and Q's input anchor (12, 1.5), so the first
        // segment runs right from (9, 2) through an empty cell.
        let path = s
            .connections()
            .iter()
            .next()
            .map(|(_, w)| w.path().to_vec())
            .expect("wire");
        click_grid(&mut s, path[0] + (path[1] - path[0]) * 0.5);
        assert!(s.connections().is_empty());
        assert!(s.component(g).is_some());

        click_cell(&mut s, 7, 1);
        assert!(s.component(g).is_none());
    }

    #[test]
    fn right_click_priorities() {
        let mut s = session();
        let a = s.place(ComponentKind::Input, GridPos::new(0, 0)).expect("A");
        let q = s.place(ComponentKind::Output, GridPos::new(8, 0)).expect("Q");
        s.connect(PinRef::new(a, 0), PinRef::new(q, 0)).expect("wire");

        // A pending wire is cancelled before anything is deleted.
        s.set_tool(Tool::Wire);
        click_pin(&mut s, a, PinKind::Output);
        right_click_cell(&mut s, 1, 0);
        assert_eq!(s.gesture(), &Gesture::None);
        assert!(s.component(a).is_some());

        right_click_grid(&mut s, pos2(5.5, 0.5));
        assert!(s.connections().is_empty());

        s.select(Selection::Component(q));
        right_click_cell(&mut s, 1, 0);
        assert!(s.component(a).is_none());
        right_click_cell(&mut s, 30, 30);
        assert_eq!(s.selection(), Selection::None);
        assert!(s.component(q).is_some());
    }

    #[test]
    fn move_tool_commits_stays_and_cancels() {
        let mut s = session();
        let g = s.place(ComponentKind::And, GridPos::new(0, 0)).expect("G");
        s.place(ComponentKind::Or, GridPos::new(10, 0)).expect("blocker");
        s.set_tool(Tool::Move);

        click_cell(&mut s, 1, 1);
        assert_eq!(
            s.gesture(),
            &Gesture::Moving {
                id: g,
                origin: GridPos::new(0, 0)
            }
        );

        // A blocked target keeps the gesture.
        click_cell(&mut s, 9, 0);
        assert!(matches!(s.gesture(), Gesture::Moving { .. }));
        assert_eq!(s.component(g).expect("G").pos, GridPos::new(0, 0));

        click_cell(&mut s, 4, 4);
        assert_eq!(s.component(g).expect("G").pos, GridPos::new(4, 4));
        assert_eq!(s.gesture(), &Gesture::None);
        assert_eq!(s.tool(), Tool::Move, "stays in move mode");

        click_cell(&mut s, 4, 4);
        assert!(matches!(s.gesture(), Gesture::Moving { .. }));
        s.cancel_move();
        assert_eq!(s.component(g).expect("G").pos, GridPos::new(4, 4));
        assert_eq!(s.tool(), Tool::Select);
    }

    #[test]
    fn cancel_move_restores_origin() {
        let mut s = session();
        let a = s.place(ComponentKind::Input, GridPos::new(0, 0)).expect("A");
        let q = s.place(ComponentKind::Output, GridPos::new(8, 0)).expect("Q");
        let w = s.connect(PinRef::new(a, 0), PinRef::new(q, 0)).expect("wire");
        let path = s.wire(w).expect("wire").path().to_vec();

        assert!(s.start_move(q));
        s.components[q].pos = GridPos::new(8, 6);
        s.cancel_move();
        assert_eq!(s.component(q).expect("Q").pos, GridPos::new(8, 0));
        assert_eq!(s.wire(w).expect("wire").path(), path.as_slice());
    }

    #[test]
    fn set_tool_drops_pending_state_but_not_graph() {
        let mut s = session();
        let a = s.place(ComponentKind::Input, GridPos::new(0, 0)).expect("A");
        s.set_tool(Tool::Wire);
        click_pin(&mut s, a, PinKind::Output);
        assert!(matches!(s.gesture(), Gesture::Wiring(_)));

        s.set_tool(Tool::Delete);
        assert_eq!(s.gesture(), &Gesture::None);
        assert_eq!(s.components().len(), 1);
    }

    #[test]
    fn blueprint_stamp_returns_to_select() {
        let mut s = session();
        let a = s.place(ComponentKind::Input, GridPos::new(0, 0)).expect("A");
        let n = s.place(ComponentKind::Not, GridPos::new(5, 0)).expect("N");
        s.connect(PinRef::new(a, 0), PinRef::new(n, 0)).expect("wire");
        s.toggle_in_selection(a);
        s.toggle_in_selection(n);
        let bp = s.capture_selection("pair").expect("capture");

        s.begin_stamp(bp);
        assert_eq!(s.tool(), Tool::Blueprint);

        // An overlapping stamp is refused and the tool stays armed.
        click_cell(&mut s, 2, 0);
        assert_eq!(s.components().len(), 2);
        assert!(matches!(s.gesture(), Gesture::Stamping(_)));
        let (_, ok) = s.preview().expect("stamp preview");
        assert!(!ok);

        click_cell(&mut s, 0, 10);
        assert_eq!(s.components().len(), 4);
        assert_eq!(s.connections().len(), 2);
        assert_eq!(s.tool(), Tool::Select);

        let bp = s.capture_selection("again").expect("capture");
        s.begin_stamp(bp);
        right_click_cell(&mut s, 50, 50);
        assert_eq!(s.tool(), Tool::Select);
        assert_eq!(s.gesture(), &Gesture::None);
        assert_eq!(s.components().len(), 4);
    }

    #[test]
    fn wheel_zooms_around_cursor() {
        let mut s = session();
        let pivot = pos2(300.0, 200.0);
        let under = s.grid().screen_to_grid_precise(pivot);

        s.handle_input(InputEvent::Wheel {
            pos: pivot,
            delta: 1.0,
        });
        assert!((s.grid().zoom() - 1.1).abs() < 1e-5);
        let after = s.grid().grid_to_screen(under);
        assert!((after - pivot).length() < 0.05, "pivot drifted to {after:?}");

        s.handle_input(InputEvent::Wheel {
            pos: pivot,
            delta: -1.0,
        });
        assert!((s.grid().zoom() - 0.99).abs() < 1e-5);

        s.reset_view();
        assert_eq!(s.grid().zoom(), 1.0);
        assert_eq!(s.grid().pan_offset(), Vec2::ZERO);
    }

    #[test]
    fn board_extent_updates_config_and_tile() {
        let mut s = session();
        s.grid_mut().tile();
        let builds = s.grid().tile_builds();

        s.set_board_extent((40, 30));
        assert_eq!(s.config().grid.extent, (40, 30));
        assert_eq!(s.grid_mut().tile().size, vec2(800.0, 600.0));
        assert_eq!(s.grid().tile_builds(), builds + 1);

        s.set_board_extent((40, 30));
        s.grid_mut().tile();
        assert_eq!(s.grid().tile_builds(), builds + 1, "same extent keeps the tile");
    }

    #[test]
    fn middle_and_ctrl_drag_pan() {
        let mut s = session();

        press(&mut s, pos2(100.0, 100.0), PointerButton::Middle, Modifiers::default());
        s.handle_input(InputEvent::Moved {
            pos: pos2(130.0, 90.0),
        });
        s.handle_input(InputEvent::Released {
            pos: pos2(130.0, 90.0),
            button: PointerButton::Middle,
        });
        assert_close(s.grid().pan_offset(), vec2(30.0, -10.0));

        let ctrl = Modifiers {
            shift: false,
            ctrl: true,
        };
        press(&mut s, pos2(0.0, 0.0), PointerButton::Primary, ctrl);
        s.handle_input(InputEvent::Moved {
            pos: pos2(5.0, 5.0),
        });
        s.handle_input(InputEvent::Released {
            pos: pos2(5.0, 5.0),
            button: PointerButton::Primary,
        });
        assert_close(s.grid().pan_offset(), vec2(35.0, -5.0));
        assert!(s.components().is_empty(), "ctrl-click never places or selects");

        // Pointer motion after release no longer pans.
        s.handle_input(InputEvent::Moved {
            pos: pos2(50.0, 50.0),
        });
        assert_close(s.grid().pan_offset(), vec2(35.0, -5.0));
    }
}
