//! Pure dialog transition function

use super::{DialogState, Effect, Event, Intent};

/// Result of a dialog transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    pub new_state: DialogState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: DialogState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// True when the event was not relevant to the dialog machine
    pub fn is_ignored(&self) -> bool {
        self.new_state.is_idle() && self.effects.is_empty()
    }
}

/// Pure transition function.
///
/// Given the same state and event it always yields the same result and
/// performs no I/O; the coordinator executes the returned effects.
pub fn transition(state: &DialogState, event: Event) -> TransitionResult {
    match (state, event) {
        (DialogState::Idle, Event::RequestLookup) => start(Intent::LookupOnce),
        (DialogState::Idle, Event::RequestSetFavorite) => start(Intent::SetFavorite),

        // Idle + anything else: not ours to handle
        (DialogState::Idle, Event::Text { .. }) => TransitionResult::new(DialogState::Idle),

        // AwaitingCity + any event: the event text is the city, verbatim.
        // The dialogue ends here whatever the outcome.
        (DialogState::AwaitingCity { intent }, event) => {
            let city = event.raw_text().trim();
            let effect = if city.is_empty() {
                Effect::RejectCity
            } else {
                Effect::complete(*intent, city)
            };
            TransitionResult::new(DialogState::Idle).with_effect(effect)
        }
    }
}

fn start(intent: Intent) -> TransitionResult {
    TransitionResult::new(DialogState::AwaitingCity { intent }).with_effect(Effect::Prompt { intent })
}
