//! HUD - Per-player readouts shown during the race

use serde::{Deserialize, Serialize};

use crate::game_server::cyclist::CyclistState;
use crate::game_server::race::RaceConfig;

/// m/s to km/h
pub const MS_TO_KMH: f32 = 3.6;

/// 8-bit RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    const RED: [f32; 3] = [1.0, 0.0, 0.0];
    // engine yellow, not pure (1, 1, 0)
    const YELLOW: [f32; 3] = [1.0, 0.92, 0.016];
    const GREEN: [f32; 3] = [0.0, 1.0, 0.0];

    fn lerp(a: [f32; 3], b: [f32; 3], t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let channel = |i: usize| ((a[i] + (b[i] - a[i]) * t) * 255.0).round() as u8;
        Self {
            r: channel(0),
            g: channel(1),
            b: channel(2),
        }
    }
}

/// Energy bar tint: red at empty, yellow at half, green at full
pub fn energy_color(fraction: f32) -> Rgb {
    if fraction > 0.5 {
        Rgb::lerp(Rgb::YELLOW, Rgb::GREEN, (fraction - 0.5) * 2.0)
    } else {
        Rgb::lerp(Rgb::RED, Rgb::YELLOW, fraction * 2.0)
    }
}

/// Where the sponsor logo sits on the race HUD
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogoPosition {
    Left,
    #[default]
    Center,
    Right,
}

impl LogoPosition {
    /// Out-of-range values leave the logo hidden
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(LogoPosition::Left),
            1 => Some(LogoPosition::Center),
            2 => Some(LogoPosition::Right),
            _ => None,
        }
    }
}

/// Everything one player's HUD panel shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HudReadout {
    pub name: String,
    pub distance: f32,
    pub distance_text: String,
    pub speed_kmh: f32,
    pub speed_text: String,
    pub energy: f32,
    pub energy_fraction: f32,
    pub energy_color: Rgb,
    pub boosting: bool,
}

impl HudReadout {
    pub fn from_cyclist(state: &CyclistState, config: &RaceConfig) -> Self {
        let speed_kmh = (state.current_speed * MS_TO_KMH).abs();
        let boost = if state.flags.boosting { " [BOOST]" } else { "" };
        let energy_fraction = if config.max_energy > 0.0 {
            state.current_energy / config.max_energy
        } else {
            0.0
        };

        Self {
            name: state.name.clone(),
            distance: state.distance,
            distance_text: format_distance(state.distance),
            speed_kmh,
            speed_text: format!("{:.1} km/h{}", speed_kmh, boost),
            energy: state.current_energy,
            energy_fraction,
            energy_color: energy_color(energy_fraction),
            boosting: state.flags.boosting,
        }
    }
}

/// "12.3m"
pub fn format_distance(distance: f32) -> String {
    format!("{:.1}m", distance)
}

/// Target distance label, e.g. "100m"
pub fn winning_distance_text(winning_distance: f32) -> String {
    format!("{}m", winning_distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_server::input::KeyBindings;

    #[test]
    fn energy_color_endpoints() {
        assert_eq!(energy_color(0.0), Rgb { r: 255, g: 0, b: 0 });
        assert_eq!(energy_color(0.5), Rgb { r: 255, g: 235, b: 4 });
        assert_eq!(energy_color(1.0), Rgb { r: 0, g: 255, b: 0 });
    }

    #[test]
    fn energy_color_is_clamped() {
        assert_eq!(energy_color(-1.0), energy_color(0.0));
        assert_eq!(energy_color(3.0), energy_color(1.0));
    }

    #[test]
    fn readout_formats_speed_and_boost() {
        let config = RaceConfig::default();
        let mut state = CyclistState::new(1, "Alice", None, KeyBindings::player1(), 100.0);
        state.current_speed = -5.0;
        state.distance = 42.345;
        state.current_energy = 25.0;

        let hud = HudReadout::from_cyclist(&state, &config);
        assert_eq!(hud.speed_text, "18.0 km/h");
        assert_eq!(hud.distance_text, "42.3m");
        assert_eq!(hud.energy_fraction, 0.25);

        state.flags.boosting = true;
        state.current_speed = 20.0;
        let hud = HudReadout::from_cyclist(&state, &config);
        assert_eq!(hud.speed_text, "72.0 km/h [BOOST]");
    }

    #[test]
    fn winning_label_drops_trailing_zeros() {
        assert_eq!(winning_distance_text(100.0), "100m");
        assert_eq!(winning_distance_text(250.5), "250.5m");
    }

    #[test]
    fn logo_index_mapping() {
        assert_eq!(LogoPosition::from_index(0), Some(LogoPosition::Left));
        assert_eq!(LogoPosition::from_index(2), Some(LogoPosition::Right));
        assert_eq!(LogoPosition::from_index(7), None);
    }
}
