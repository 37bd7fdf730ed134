//! Scene - Top-level screens and transitions between them

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scene {
    /// Splash animation shown at launch
    #[default]
    Intro,
    Home,
    Race,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SceneRequest {
    Load(Scene),
    Quit,
}

/// Launch splash. Moves on to the home screen once the animation has played.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntroScreen {
    remaining: f32,
    done: bool,
}

impl IntroScreen {
    pub const DURATION: f32 = 6.5;

    pub fn new() -> Self {
        Self {
            remaining: Self::DURATION,
            done: false,
        }
    }

    /// Returns the home request on the frame the splash ends
    pub fn update(&mut self, delta: f32) -> Option<SceneRequest> {
        if self.done {
            return None;
        }
        self.remaining -= delta;
        if self.remaining > 0.0 {
            return None;
        }
        self.done = true;
        Some(SceneRequest::Load(Scene::Home))
    }
}

impl Default for IntroScreen {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intro_hands_over_to_home_once() {
        let mut intro = IntroScreen::new();
        assert_eq!(intro.update(6.0), None);
        assert_eq!(intro.update(0.5), Some(SceneRequest::Load(Scene::Home)));
        assert_eq!(intro.update(1.0), None);
    }
}
