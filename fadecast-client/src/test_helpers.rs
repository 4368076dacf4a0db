//! Recording player for reconciler tests

use std::sync::Arc;

use parking_lot::Mutex;

use crate::player::{ExternalPlayer, PlayerError, PlayerGeneration, PlayerState};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Load(String, PlayerGeneration),
    Cue(String, PlayerGeneration),
    Play,
    Pause,
    Seek(f64),
    Volume(u8),
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub calls: Vec<Call>,
    pub state: PlayerState,
    pub time: f64,
}

/// Player whose state lives behind a handle the test keeps
#[derive(Clone, Default)]
pub struct FakePlayer {
    inner: Arc<Mutex<FakeState>>,
}

impl FakePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    pub fn set_time(&self, time: f64) {
        self.inner.lock().time = time;
    }

    /// Change what the embed reports without going through a command
    pub fn set_state(&self, state: PlayerState) {
        self.inner.lock().state = state;
    }

    pub fn loads(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Load(..) | Call::Cue(..)))
            .count()
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Seek(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    pub fn last_volume(&self) -> Option<u8> {
        self.calls().into_iter().rev().find_map(|c| match c {
            Call::Volume(v) => Some(v),
            _ => None,
        })
    }

    fn record(&self, call: Call) {
        self.inner.lock().calls.push(call);
    }
}

impl ExternalPlayer for FakePlayer {
    fn load_by_id(&mut self, video_id: &str, generation: PlayerGeneration) -> Result<(), PlayerError> {
        self.record(Call::Load(video_id.to_string(), generation));
        let mut inner = self.inner.lock();
        inner.state = PlayerState::Playing;
        inner.time = 0.0;
        Ok(())
    }

    fn cue_by_id(&mut self, video_id: &str, generation: PlayerGeneration) -> Result<(), PlayerError> {
        self.record(Call::Cue(video_id.to_string(), generation));
        let mut inner = self.inner.lock();
        inner.state = PlayerState::Cued;
        inner.time = 0.0;
        Ok(())
    }

    fn play(&mut self) -> Result<(), PlayerError> {
        self.record(Call::Play);
        self.inner.lock().state = PlayerState::Playing;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PlayerError> {
        self.record(Call::Pause);
        self.inner.lock().state = PlayerState::Paused;
        Ok(())
    }

    fn seek(&mut self, seconds: f64, _allow_seek_ahead: bool) -> Result<(), PlayerError> {
        self.record(Call::Seek(seconds));
        self.inner.lock().time = seconds;
        Ok(())
    }

    fn set_volume(&mut self, volume: u8) -> Result<(), PlayerError> {
        self.record(Call::Volume(volume));
        Ok(())
    }

    fn current_time(&self) -> Result<f64, PlayerError> {
        Ok(self.inner.lock().time)
    }

    fn duration(&self) -> Result<f64, PlayerError> {
        Ok(0.0)
    }

    fn player_state(&self) -> Result<PlayerState, PlayerError> {
        Ok(self.inner.lock().state)
    }
}
