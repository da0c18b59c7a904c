use crate::errors::ScriptError;
use score_core::{Capture, RawObservation};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;

/// What the screen shows during a scripted frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum Screen {
    Gameplay,
    Results { observations: Vec<RawObservation> },
    CharacterSelect,
}

/// A screen held for a number of ticks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptStep {
    #[serde(flatten)]
    pub screen: Screen,
    #[serde(default = "default_hold_ticks")]
    pub hold_ticks: u32,
}

fn default_hold_ticks() -> u32 {
    1
}

impl ScriptStep {
    pub fn new(screen: Screen, hold_ticks: u32) -> Self {
        Self {
            screen,
            hold_ticks: hold_ticks.max(1),
        }
    }
}

/// Replays a fixed sequence of screens, one frame per `refresh`. Once the
/// script runs out the screen stays on gameplay.
pub struct ScriptedCapture {
    steps: VecDeque<ScriptStep>,
    current: Screen,
    remaining: u32,
}

impl ScriptedCapture {
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            current: Screen::Gameplay,
            remaining: 0,
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, ScriptError> {
        let steps: Vec<ScriptStep> =
            serde_json::from_str(raw).map_err(|e| ScriptError::Parse(e.to_string()))?;
        Ok(Self::new(steps))
    }

    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ScriptError::Read(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&raw)
    }

    pub fn is_exhausted(&self) -> bool {
        self.steps.is_empty() && self.remaining == 0
    }

    pub fn screen(&self) -> &Screen {
        &self.current
    }
}

impl Capture for ScriptedCapture {
    fn refresh(&mut self) {
        if self.remaining > 0 {
            self.remaining -= 1;
        }
        if self.remaining == 0 {
            match self.steps.pop_front() {
                Some(step) => {
                    self.current = step.screen;
                    // This refresh shows the first frame of the step.
                    self.remaining = step.hold_ticks.max(1);
                }
                None => self.current = Screen::Gameplay,
            }
        }
    }

    fn result_screen_visible(&self) -> bool {
        matches!(self.current, Screen::Results { .. })
    }

    fn character_select_visible(&self) -> bool {
        matches!(self.current, Screen::CharacterSelect)
    }

    fn capture_observations(&mut self) -> Vec<RawObservation> {
        match &self.current {
            Screen::Results { observations } => observations.clone(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use score_core::Score;

    #[test]
    fn steps_hold_for_their_tick_count() {
        let mut capture = ScriptedCapture::new(vec![
            ScriptStep::new(Screen::Gameplay, 2),
            ScriptStep::new(Screen::CharacterSelect, 1),
        ]);

        capture.refresh();
        assert!(!capture.character_select_visible());
        capture.refresh();
        assert!(!capture.character_select_visible());
        capture.refresh();
        assert!(capture.character_select_visible());
        capture.refresh();
        assert_eq!(capture.screen(), &Screen::Gameplay);
        assert!(capture.is_exhausted());
    }

    #[test]
    fn parses_json_script() {
        let mut capture = ScriptedCapture::from_json(
            r#"[
                {"screen": "results", "observations": [
                    {"legend": "orion", "account": "acct1",
                     "score": {"rank": 1, "points": 10, "kills": 1, "falls": 0,
                               "accidents": 0, "damage_done": 5, "damage_taken": 2}}
                ]},
                {"screen": "character_select", "hold_ticks": 3}
            ]"#,
        )
        .unwrap();

        capture.refresh();
        assert!(capture.result_screen_visible());
        let observations = capture.capture_observations();
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].legend.as_str(), "ORION");
        assert_eq!(observations[0].score, Score::new(1, [10, 1, 0, 0, 5, 2]));
    }
}
