use std::fmt::Write as _;
use std::time::Duration;

use egui::{
    Align, Align2, Color32, CornerRadius, FontId, Layout, Pos2, Rect, Sense, Shape, Stroke,
    StrokeKind, Ui, Vec2, vec2,
};

use crate::blueprint::Blueprint;
use crate::catalog::{ComponentKind, GateRegistry, PinKind};
use crate::component::{ComponentId, GridPos};
use crate::config::SessionConfig;
use crate::gesture::{Gesture, InputEvent, Modifiers, PointerButton, Tool};
use crate::session::{Selection, Session};
use crate::validate::CircuitStats;
use crate::wire::WireId;

pub const COLOR_GRID_LIGHT: Color32 = Color32::from_rgb(230, 230, 230);
pub const COLOR_GRID_DARK: Color32 = Color32::from_rgb(40, 40, 40);
pub const COLOR_GRID_MAJOR_LIGHT: Color32 = Color32::from_rgb(200, 200, 200);
pub const COLOR_GRID_MAJOR_DARK: Color32 = Color32::from_rgb(60, 60, 60);

pub const COLOR_WIRE_POWERED: Color32 = Color32::GREEN;
pub const COLOR_WIRE_IDLE: Color32 = Color32::LIGHT_BLUE;
pub const COLOR_WIRE_SELECTED: Color32 = Color32::YELLOW;
pub const COLOR_PIN_HIGH: Color32 = Color32::GREEN;
pub const COLOR_PIN_LOW: Color32 = Color32::DARK_GRAY;
pub const COLOR_PIN_HOVER: Color32 = Color32::LIGHT_BLUE;

pub const COLOR_SELECTION_HIGHLIGHT: Color32 = Color32::GRAY;
pub const COLOR_SELECTION_BOX: Color32 = Color32::LIGHT_BLUE;
pub const COLOR_PREVIEW_OK: Color32 = Color32::from_rgba_premultiplied(0, 120, 0, 60);
pub const COLOR_PREVIEW_BLOCKED: Color32 = Color32::from_rgba_premultiplied(140, 0, 0, 60);

pub const WIRE_THICKNESS: f32 = 2.0;
pub const OUTLINE_THICKNESS: f32 = 2.0;
/// Pulse speed along powered wires, in cells per second.
pub const PULSE_SPEED: f32 = 6.0;

/// Range offered for each side of the board, in cells.
const BOARD_CELLS: std::ops::RangeInclusive<u32> = 10..=5000;

/// What survives a restart. The board itself is exchanged through blueprint files.
#[derive(serde::Deserialize, serde::Serialize, Default)]
#[serde(default)]
struct Settings {
    config: SessionConfig,
    show_debug: bool,
}

pub struct App {
    session: Session,
    show_debug: bool,
    blueprint_name: String,
    blueprints: Vec<Blueprint>,
    status: String,
}

impl Default for App {
    fn default() -> Self {
        Self::with_settings(Settings::default())
    }
}

impl eframe::App for App {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let settings = Settings {
            config: self.session.config().clone(),
            show_debug: self.show_debug,
        };
        eframe::set_value(storage, eframe::APP_KEY, &settings);
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Load Blueprint").clicked() {
                        self.load_blueprint();
                    }
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                ui.add_space(16.0);

                ui.menu_button("View", |ui| {
                    ui.checkbox(&mut self.show_debug, "Debug");
                    if ui.button("Reset view").clicked() {
                        self.session.reset_view();
                    }
                    let (mut w, mut h) = self.session.config().grid.extent;
                    ui.horizontal(|ui| {
                        ui.label("Board");
                        let w_changed = ui
                            .add(egui::DragValue::new(&mut w).range(BOARD_CELLS))
                            .changed();
                        let h_changed = ui
                            .add(egui::DragValue::new(&mut h).range(BOARD_CELLS))
                            .changed();
                        if w_changed || h_changed {
                            self.session.set_board_extent((w, h));
                        }
                    });
                });
                ui.add_space(16.0);

                let label = if self.session.is_simulating() {
                    "⏹ Stop"
                } else {
                    "▶ Simulate"
                };
                if ui.button(label).clicked() {
                    self.session.toggle_simulation();
                }
                if ui.button("⏭ Step").clicked() {
                    self.session.run_simulation_step();
                }
                if ui.button("Clear").clicked() {
                    self.session.clear();
                }

                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    egui::widgets::global_theme_preference_buttons(ui);
                    ui.add_space(16.0);
                    ui.label(&self.status);
                });
            });
        });

        egui::SidePanel::left("tools").show(ctx, |ui| {
            self.draw_panel(ui);
        });

        if self.show_debug {
            egui::SidePanel::right("debug").show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let mut dbg = self.debug_string();
                    ui.add(egui::TextEdit::multiline(&mut dbg).desired_width(f32::INFINITY));
                });
            });
        }

        let dt = ctx.input(|i| i.stable_dt).max(0.0);
        self.session.tick(Duration::from_secs_f32(dt));
        if self.session.is_animating() {
            ctx.request_repaint_after(self.session.config().simulation.animation_frame);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_canvas(ui);
        });
    }
}

impl App {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, eframe::APP_KEY))
            .unwrap_or_default();
        Self::with_settings(settings)
    }

    fn with_settings(settings: Settings) -> Self {
        Self {
            session: Session::new(GateRegistry::default(), settings.config),
            show_debug: settings.show_debug,
            blueprint_name: String::from("Blueprint"),
            blueprints: Vec::new(),
            status: String::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn draw_panel(&mut self, ui: &mut Ui) {
        egui::ScrollArea::vertical()
            .auto_shrink([true, false])
            .show(ui, |ui| {
                ui.heading("Tools");
                for (tool, name) in [
                    (Tool::Select, "Select"),
                    (Tool::Wire, "Wire"),
                    (Tool::Move, "Move"),
                    (Tool::Delete, "Delete"),
                ] {
                    if ui
                        .selectable_label(self.session.tool() == tool, name)
                        .clicked()
                    {
                        self.session.set_tool(tool);
                    }
                }

                ui.add_space(8.0);
                ui.heading("Components");
                for kind in ComponentKind::ALL {
                    let active = self.session.gesture() == &Gesture::Placing(kind);
                    if ui.selectable_label(active, kind.to_string()).clicked() {
                        self.session.set_placing(kind);
                    }
                }

                ui.add_space(8.0);
                ui.heading("Blueprints");
                ui.text_edit_singleline(&mut self.blueprint_name);
                let selected = self.session.selected_components().len();
                if ui
                    .add_enabled(selected > 0, egui::Button::new("Capture selection"))
                    .clicked()
                {
                    match self.session.capture_selection(&self.blueprint_name) {
                        Ok(bp) => {
                            self.status = format!("Captured \"{}\"", bp.name);
                            self.blueprints.push(bp);
                        }
                        Err(e) => self.status = e.to_string(),
                    }
                }
                ui.label(format!(
                    "{selected} selected, {} gates, {} wires",
                    self.session.selected_gate_count(),
                    self.session.selected_wires().len()
                ));

                let mut stamp = None;
                let mut save = None;
                for (i, bp) in self.blueprints.iter().enumerate() {
                    ui.horizontal(|ui| {
                        let (w, h) = bp.bounds(|kind| {
                            let spec = self.session.registry().spec(kind);
                            (spec.width, spec.height)
                        });
                        ui.label(format!("{} ({w}x{h}, {} gates)", bp.name, bp.gate_count));
                        if ui.small_button("Place").clicked() {
                            stamp = Some(i);
                        }
                        if ui.small_button("Save").clicked() {
                            save = Some(i);
                        }
                    });
                }
                if let Some(bp) = stamp.and_then(|i| self.blueprints.get(i)) {
                    self.session.begin_stamp(bp.clone());
                }
                if let Some(i) = save {
                    self.save_blueprint(i);
                }

                ui.add_space(8.0);
                let stats = CircuitStats::of(&self.session);
                ui.label(format!(
                    "{} gates, {} wires",
                    stats.total_gates, stats.wire_count
                ));
            });
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn save_blueprint(&mut self, index: usize) {
        let Some(bp) = self.blueprints.get(index) else {
            return;
        };
        match crate::save_load::save_blueprint_dialog(bp) {
            Ok(Some(path)) => self.status = format!("Saved {}", path.display()),
            Ok(None) => {}
            Err(e) => {
                log::error!("Failed to save blueprint: {e}");
                self.status = e.to_string();
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn load_blueprint(&mut self) {
        match crate::save_load::load_blueprint_dialog() {
            Ok(Some(bp)) => {
                self.status = format!("Loaded \"{}\"", bp.name);
                self.blueprints.push(bp);
            }
            Ok(None) => {}
            Err(e) => {
                log::error!("Failed to load blueprint: {e}");
                self.status = e.to_string();
            }
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn save_blueprint(&mut self, _index: usize) {}

    #[cfg(target_arch = "wasm32")]
    fn load_blueprint(&mut self) {}

    fn draw_canvas(&mut self, ui: &mut Ui) {
        let (resp, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let canvas = resp.rect;
        let origin = canvas.min.to_vec2();

        self.session.grid_mut().resize(canvas.size());
        self.forward_input(ui, canvas, resp.contains_pointer());

        let painter = painter.with_clip_rect(canvas);
        let to_screen = |session: &Session, p: Pos2| session.grid().grid_to_screen(p) + origin;

        self.draw_grid(&painter, canvas, ui.visuals().dark_mode);

        for (id, _) in self.session.connections().wires_sorted() {
            self.draw_wire(&painter, id, origin);
        }
        for id in self.session.ordered_components() {
            self.draw_component(&painter, id, origin);
        }

        if let Some(pick) = self.session.hovered_pin()
            && let Some(anchor) = self
                .session
                .component(pick.pin.component)
                .and_then(|c| c.pin_anchor(pick.kind, pick.pin.index))
        {
            let r = self.session.grid().cell_pixels() * 0.35;
            painter.circle_stroke(
                to_screen(&self.session, anchor),
                r,
                Stroke::new(2.0, COLOR_PIN_HOVER),
            );
        }

        if let Some(start) = self.session.wire_preview_start() {
            painter.line_segment(
                [start + origin, self.session.pointer() + origin],
                Stroke::new(WIRE_THICKNESS, COLOR_PIN_HOVER),
            );
        }

        if let Some((cells, ok)) = self.session.preview() {
            let fill = if ok { COLOR_PREVIEW_OK } else { COLOR_PREVIEW_BLOCKED };
            for (pos, w, h) in cells {
                let rect = self.footprint_rect(pos, w, h).translate(origin);
                painter.rect_filled(rect, CornerRadius::same(2), fill);
            }
        }

        if let Gesture::BoxSelecting { start, end } = self.session.gesture() {
            let rect = self
                .session
                .grid()
                .cell_rect(*start)
                .union(self.session.grid().cell_rect(*end))
                .translate(origin);
            painter.rect_stroke(
                rect,
                CornerRadius::ZERO,
                Stroke::new(1.0, COLOR_SELECTION_BOX),
                StrokeKind::Inside,
            );
        }
    }

    /// Translate raw pointer events into session input, in canvas-local pixels.
    fn forward_input(&mut self, ui: &Ui, canvas: Rect, hovered: bool) {
        let origin = canvas.min.to_vec2();
        let events = ui.input(|i| i.events.clone());

        for event in events {
            match event {
                egui::Event::PointerMoved(pos) => {
                    self.session.handle_input(InputEvent::Moved { pos: pos - origin });
                }
                egui::Event::PointerButton {
                    pos,
                    button,
                    pressed,
                    modifiers,
                } => {
                    let button = match button {
                        egui::PointerButton::Primary => PointerButton::Primary,
                        egui::PointerButton::Secondary => PointerButton::Secondary,
                        egui::PointerButton::Middle => PointerButton::Middle,
                        _ => continue,
                    };
                    let pos = pos - origin;
                    if !pressed {
                        self.session.handle_input(InputEvent::Released { pos, button });
                    } else if hovered {
                        let modifiers = Modifiers {
                            shift: modifiers.shift,
                            ctrl: modifiers.command,
                        };
                        self.session.handle_input(InputEvent::Pressed {
                            pos,
                            button,
                            modifiers,
                        });
                    }
                }
                egui::Event::Key {
                    key: egui::Key::Escape,
                    pressed: true,
                    ..
                } => {
                    if matches!(self.session.gesture(), Gesture::Moving { .. }) {
                        self.session.cancel_move();
                    } else {
                        self.session.set_tool(Tool::Select);
                    }
                }
                _ => {}
            }
        }

        let scroll = ui.input(|i| i.raw_scroll_delta.y);
        if hovered
            && scroll != 0.0
            && let Some(pos) = ui.input(|i| i.pointer.hover_pos())
        {
            self.session.handle_input(InputEvent::Wheel {
                pos: pos - origin,
                delta: scroll,
            });
        }
    }

    fn draw_grid(&mut self, painter: &egui::Painter, canvas: Rect, dark_mode: bool) {
        let (minor_color, major_color) = if dark_mode {
            (COLOR_GRID_DARK, COLOR_GRID_MAJOR_DARK)
        } else {
            (COLOR_GRID_LIGHT, COLOR_GRID_MAJOR_LIGHT)
        };
        let shift = self.session.grid().offset() + canvas.min.to_vec2();
        let tile = self.session.grid_mut().tile();

        for (lines, color) in [(&tile.minor, minor_color), (&tile.major, major_color)] {
            for [a, b] in lines {
                let (a, b) = (*a + shift, *b + shift);
                if Rect::from_two_pos(a, b).intersects(canvas) {
                    painter.line_segment([a, b], Stroke::new(1.0, color));
                }
            }
        }
    }

    fn footprint_rect(&self, pos: GridPos, width: i32, height: i32) -> Rect {
        let cell = self.session.grid().cell_pixels();
        Rect::from_min_size(
            self.session.grid().grid_to_screen(pos.to_pos2()),
            vec2(width as f32, height as f32) * cell,
        )
    }

    fn draw_component(&self, painter: &egui::Painter, id: ComponentId, origin: Vec2) {
        let Some(c) = self.session.component(id) else {
            return;
        };
        let grid = self.session.grid();
        let rect = self.footprint_rect(c.pos, c.width, c.height).translate(origin);
        if !rect.intersects(painter.clip_rect()) {
            return;
        }

        let mut fill = self.session.registry().spec(c.kind).color;
        if c.kind == ComponentKind::Input && !c.manual_value {
            fill = fill.gamma_multiply(0.4);
        }
        if c.kind == ComponentKind::Output && !c.input_value(0) {
            fill = fill.gamma_multiply(0.4);
        }
        painter.rect_filled(rect, CornerRadius::same(3), fill);

        let selected =
            self.session.is_selected(id) || self.session.selection() == Selection::Component(id);
        if selected {
            painter.rect_stroke(
                rect.expand(2.0),
                CornerRadius::same(3),
                Stroke::new(OUTLINE_THICKNESS, COLOR_SELECTION_HIGHLIGHT),
                StrokeKind::Outside,
            );
        }

        let text = c.label.clone().unwrap_or_else(|| c.kind.to_string());
        painter.text(
            rect.center(),
            Align2::CENTER_CENTER,
            text,
            FontId::proportional(grid.cell_pixels() * 0.6),
            Color32::BLACK,
        );

        let radius = grid.cell_pixels() * 0.2;
        for kind in [PinKind::Input, PinKind::Output] {
            for pin in c.pins(kind) {
                let Some(anchor) = c.pin_anchor(kind, pin.index) else {
                    continue;
                };
                let color = if pin.value { COLOR_PIN_HIGH } else { COLOR_PIN_LOW };
                painter.circle_filled(grid.grid_to_screen(anchor) + origin, radius, color);
            }
        }
    }

    fn draw_wire(&self, painter: &egui::Painter, id: WireId, origin: Vec2) {
        let Some(wire) = self.session.wire(id) else {
            return;
        };
        let grid = self.session.grid();
        let powered = wire.value;

        let color = if self.session.selection() == Selection::Wire(id) {
            COLOR_WIRE_SELECTED
        } else if powered {
            COLOR_WIRE_POWERED
        } else {
            COLOR_WIRE_IDLE
        };
        let points: Vec<Pos2> = wire
            .path()
            .iter()
            .map(|p| grid.grid_to_screen(*p) + origin)
            .collect();
        painter.add(Shape::line(points, Stroke::new(WIRE_THICKNESS, color)));

        if powered && self.session.is_simulating() && wire.path_length() > 0.0 {
            let travel = self.session.anim_time() * PULSE_SPEED + wire.pulse_phase;
            let distance = travel % wire.path_length();
            if let Some(p) = wire.point_along_path(distance) {
                painter.circle_filled(
                    grid.grid_to_screen(p) + origin,
                    grid.cell_pixels() * 0.15,
                    Color32::WHITE,
                );
            }
        }
    }

    fn debug_string(&self) -> String {
        let mut out = self.session.debug_string();
        let grid = self.session.grid();
        writeln!(out, "pointer: {:?}", self.session.pointer()).ok();
        writeln!(out, "pan: {:?}", grid.pan_offset()).ok();
        writeln!(out, "grid tile builds: {}", grid.tile_builds()).ok();
        writeln!(
            out,
            "routing fallbacks: {}",
            self.session.connections().last_fallbacks()
        )
        .ok();
        writeln!(out, "blueprints: {}", self.blueprints.len()).ok();
        out
    }
}
