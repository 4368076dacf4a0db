//! Decides when the viewer shows the idle overlay instead of the decks

/// Inputs observed at one reconcile step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdleInputs {
    pub is_broadcasting: bool,
    pub is_stopped: bool,
    /// At least one slot has had a video loaded this session
    pub any_slot_loaded: bool,
    pub fade_in_flight: bool,
    /// Local report of each player, buffering included
    pub slots_playing: [bool; 2],
}

/// Idle is shown when the broadcaster paused the show, when nothing has ever
/// loaded, or when a live channel has both players silent outside a fade.
#[must_use]
pub const fn should_show_idle(inputs: &IdleInputs) -> bool {
    if !inputs.is_broadcasting || inputs.is_stopped || !inputs.any_slot_loaded {
        return true;
    }
    !inputs.fade_in_flight && !inputs.slots_playing[0] && !inputs.slots_playing[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live() -> IdleInputs {
        IdleInputs {
            is_broadcasting: true,
            is_stopped: false,
            any_slot_loaded: true,
            fade_in_flight: false,
            slots_playing: [true, false],
        }
    }

    #[test]
    fn test_playing_slot_hides_idle() {
        assert!(!should_show_idle(&live()));
    }

    #[test]
    fn test_stopped_shows_idle() {
        let inputs = IdleInputs {
            is_stopped: true,
            ..live()
        };
        assert!(should_show_idle(&inputs));
    }

    #[test]
    fn test_nothing_loaded_shows_idle() {
        let inputs = IdleInputs {
            any_slot_loaded: false,
            ..live()
        };
        assert!(should_show_idle(&inputs));
    }

    #[test]
    fn test_silence_during_fade_is_not_idle() {
        let silent = IdleInputs {
            slots_playing: [false, false],
            ..live()
        };
        assert!(should_show_idle(&silent));

        let fading = IdleInputs {
            fade_in_flight: true,
            ..silent
        };
        assert!(!should_show_idle(&fading));
    }

    #[test]
    fn test_ended_channel_is_idle() {
        let inputs = IdleInputs {
            is_broadcasting: false,
            ..live()
        };
        assert!(should_show_idle(&inputs));
    }
}
