use serde::Serialize;

pub const STUMBLE_MS: u64 = 300;
pub const RECOVER_MS: u64 = 500;
pub const DIALOG_LINE_MS: u64 = 4_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Performer {
    Skater,
    Snowman,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Performing,
    Stumbling,
    Recovering,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PerformerState {
    phase: Phase,
    entered_at: u64,
    resume_performing: bool,
    dialog_lines: usize,
    dialog_index: usize,
    next_line_at: Option<u64>,
}

impl PerformerState {
    pub fn new(dialog_lines: usize) -> Self {
        Self {
            phase: Phase::Idle,
            entered_at: 0,
            resume_performing: false,
            dialog_lines,
            dialog_index: 0,
            next_line_at: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn dialog_index(&self) -> usize {
        self.dialog_index
    }

    pub fn is_performing(&self) -> bool {
        self.phase == Phase::Performing
    }

    pub fn perform(&mut self, now_ms: u64) {
        match self.phase {
            Phase::Idle => self.enter(Phase::Performing, now_ms),
            Phase::Stumbling | Phase::Recovering => self.resume_performing = true,
            Phase::Performing => {}
        }
    }

    pub fn rest(&mut self, now_ms: u64) {
        match self.phase {
            Phase::Performing => self.enter(Phase::Idle, now_ms),
            Phase::Stumbling | Phase::Recovering => self.resume_performing = false,
            Phase::Idle => {}
        }
    }

    pub fn hit(&mut self, now_ms: u64) {
        if self.phase == Phase::Stumbling {
            return;
        }
        if self.phase != Phase::Recovering {
            self.resume_performing = self.phase == Phase::Performing;
        }
        self.enter(Phase::Stumbling, now_ms);
    }

    pub fn tick(&mut self, now_ms: u64) {
        let elapsed = now_ms.saturating_sub(self.entered_at);
        match self.phase {
            Phase::Stumbling if elapsed >= STUMBLE_MS => {
                self.enter(Phase::Recovering, self.entered_at.saturating_add(STUMBLE_MS));
                self.tick(now_ms);
            }
            Phase::Recovering if elapsed >= RECOVER_MS => {
                let next = if self.resume_performing {
                    Phase::Performing
                } else {
                    Phase::Idle
                };
                self.enter(next, self.entered_at.saturating_add(RECOVER_MS));
                self.tick(now_ms);
            }
            Phase::Performing => {
                while let Some(due) = self.next_line_at.filter(|&due| due <= now_ms) {
                    if self.dialog_lines > 0 {
                        self.dialog_index = (self.dialog_index + 1) % self.dialog_lines;
                    }
                    self.next_line_at = due.checked_add(DIALOG_LINE_MS);
                }
            }
            _ => {}
        }
    }

    fn enter(&mut self, phase: Phase, now_ms: u64) {
        log::debug!("performer {:?} -> {phase:?} at {now_ms}", self.phase);
        self.phase = phase;
        self.entered_at = now_ms;
        self.next_line_at = if phase == Phase::Performing {
            now_ms.checked_add(DIALOG_LINE_MS)
        } else {
            None
        };
    }
}
