use serde::Serialize;

use super::performer::{Performer, PerformerState};

pub const TRANSITION_MS: u64 = 1_500;
const SKATER_DIALOG_LINES: usize = 4;
const SNOWMAN_DIALOG_LINES: usize = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Default,
    Skater,
    Snowman,
    Crypto,
}

impl View {
    fn performer(self) -> Option<Performer> {
        match self {
            Self::Skater => Some(Performer::Skater),
            Self::Snowman => Some(Performer::Snowman),
            Self::Default | Self::Crypto => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Transition {
    to: View,
    started_at: u64,
}

#[derive(Clone, Debug)]
pub struct SceneCoordinator {
    current: View,
    history: Vec<View>,
    transition: Option<Transition>,
    skater: PerformerState,
    snowman: PerformerState,
}

impl Default for SceneCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneCoordinator {
    pub fn new() -> Self {
        Self {
            current: View::Default,
            history: vec![View::Default],
            transition: None,
            skater: PerformerState::new(SKATER_DIALOG_LINES),
            snowman: PerformerState::new(SNOWMAN_DIALOG_LINES),
        }
    }

    pub fn current_view(&self) -> View {
        self.current
    }

    pub fn history(&self) -> &[View] {
        &self.history
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    pub fn performer(&self, performer: Performer) -> &PerformerState {
        match performer {
            Performer::Skater => &self.skater,
            Performer::Snowman => &self.snowman,
        }
    }

    fn performer_mut(&mut self, performer: Performer) -> &mut PerformerState {
        match performer {
            Performer::Skater => &mut self.skater,
            Performer::Snowman => &mut self.snowman,
        }
    }

    pub fn set_performing(&mut self, performer: Performer, performing: bool, now_ms: u64) {
        let state = self.performer_mut(performer);
        if performing {
            state.perform(now_ms);
        } else {
            state.rest(now_ms);
        }
    }

    pub fn hit(&mut self, performer: Performer, now_ms: u64) {
        self.performer_mut(performer).hit(now_ms);
    }

    pub fn set_view(&mut self, view: View, now_ms: u64) -> bool {
        if !self.begin_transition(view, now_ms) {
            return false;
        }
        self.history.push(view);
        true
    }

    pub fn back(&mut self, now_ms: u64) -> bool {
        if self.history.len() < 2 || self.transition.is_some() {
            return false;
        }
        let previous = self.history[self.history.len() - 2];
        if !self.begin_transition(previous, now_ms) {
            return false;
        }
        self.history.pop();
        true
    }

    pub fn tick(&mut self, now_ms: u64) {
        if let Some(transition) = self.transition
            && now_ms.saturating_sub(transition.started_at) >= TRANSITION_MS
        {
            self.transition = None;
            self.enter(transition.to, transition.started_at.saturating_add(TRANSITION_MS));
        }

        self.skater.tick(now_ms);
        self.snowman.tick(now_ms);
    }

    fn begin_transition(&mut self, view: View, now_ms: u64) -> bool {
        if self.transition.is_some() || view == self.current {
            return false;
        }

        if let Some(performer) = self.current.performer() {
            self.set_performing(performer, false, now_ms);
        }

        log::info!("view {:?} -> {view:?}", self.current);
        self.current = view;
        self.transition = Some(Transition {
            to: view,
            started_at: now_ms,
        });
        true
    }

    fn enter(&mut self, view: View, now_ms: u64) {
        match view.performer() {
            Some(performer) => self.set_performing(performer, true, now_ms),
            None if view == View::Default => {
                self.set_performing(Performer::Skater, false, now_ms);
                self.set_performing(Performer::Snowman, false, now_ms);
            }
            None => {}
        }
    }
}
