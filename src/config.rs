use std::time::Duration;

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct GridConfig {
    /// Pixel size of one cell at zoom 1.
    pub cell_size: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Logical size of the drawn board in cells. Placement is not bounded by it.
    pub extent: (u32, u32),
    /// Every n-th grid line is drawn as a major line.
    pub major_every: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: 20.0,
            min_zoom: 0.5,
            max_zoom: 2.0,
            extent: (1000, 1000),
            major_every: 5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct RoutingConfig {
    /// Minimum horizontal distance between vertical channels whose spans overlap.
    pub channel_spacing: f32,
    pub max_attempts: u32,
    /// Endpoints closer than this vertically are routed as a straight line.
    pub straight_epsilon: f32,
    /// Keeps the channel this far inside the endpoints' x range.
    pub clamp_margin: f32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            channel_spacing: 0.5,
            max_attempts: 20,
            straight_epsilon: 0.01,
            clamp_margin: 0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct SimulationConfig {
    /// Relaxation passes per simulation step.
    pub passes: u32,
    pub tick_interval: Duration,
    pub animation_frame: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            passes: 10,
            tick_interval: Duration::from_millis(100),
            animation_frame: Duration::from_millis(33),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct InteractionConfig {
    /// Pin pick radius in grid units.
    pub pin_hit_radius: f32,
    /// Wire pick distance in screen pixels.
    pub wire_hit_distance: f32,
    /// Zoom factor per wheel notch away from the user.
    pub wheel_zoom_in: f32,
    pub wheel_zoom_out: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            pin_hit_radius: 0.8,
            wire_hit_distance: 10.0,
            wheel_zoom_in: 1.1,
            wheel_zoom_out: 0.9,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SessionConfig {
    pub grid: GridConfig,
    pub routing: RoutingConfig,
    pub simulation: SimulationConfig,
    pub interaction: InteractionConfig,
}
