//! ENDED to LIVE handling.
//!
//! A broadcast that comes back is a new session as far as the viewer is
//! concerned. Everything learnt about the previous one is dropped so the next
//! snapshot bootstraps from scratch instead of being diffed against stale
//! video ids, fade state, or seek times.

use tracing::info;

use crate::player::ExternalPlayer;
use crate::reconciler::ViewerReconciler;

impl<P: ExternalPlayer> ViewerReconciler<P> {
    pub(crate) fn handle_reconnect(&mut self) {
        info!("Broadcast resumed, re-bootstrapping");
        for slot in &mut self.slots {
            slot.reset();
        }
        self.animator.reset();
        self.snapshot = None;
        self.any_loaded = false;
        self.bootstrap = true;
    }
}
