//! Property-based tests for the dialog state machine

use super::*;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_intent() -> impl Strategy<Value = Intent> {
    prop_oneof![Just(Intent::LookupOnce), Just(Intent::SetFavorite)]
}

fn arb_state() -> impl Strategy<Value = DialogState> {
    prop_oneof![
        Just(DialogState::Idle),
        arb_intent().prop_map(|intent| DialogState::AwaitingCity { intent }),
    ]
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z -]{0,24}",
        "[ \t\n]{0,4}",
        Just("/start".to_string()),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::RequestLookup),
        Just(Event::RequestSetFavorite),
        arb_text().prop_map(Event::text),
    ]
}

fn run(events: &[Event]) -> (DialogState, Vec<Effect>) {
    let mut state = DialogState::Idle;
    let mut effects = Vec::new();
    for event in events {
        let result = transition(&state, event.clone());
        state = result.new_state;
        effects.extend(result.effects);
    }
    (state, effects)
}

proptest! {
    /// Every event received while awaiting a city ends the dialogue
    #[test]
    fn awaiting_always_returns_to_idle(intent in arb_intent(), event in arb_event()) {
        let result = transition(&DialogState::AwaitingCity { intent }, event);
        prop_assert_eq!(result.new_state, DialogState::Idle);
        prop_assert_eq!(result.effects.len(), 1);
    }

    /// Plain text never starts a dialogue and never produces effects
    #[test]
    fn idle_text_never_has_effects(text in arb_text()) {
        let result = transition(&DialogState::Idle, Event::text(text));
        prop_assert!(result.is_ignored());
    }

    /// Blank text never reaches the weather resolver
    #[test]
    fn blank_text_is_always_rejected(intent in arb_intent(), text in "[ \t\n]{0,8}") {
        let result = transition(&DialogState::AwaitingCity { intent }, Event::text(text));
        prop_assert_eq!(result.effects, vec![Effect::RejectCity]);
    }

    /// Lookup dialogues never produce a store write
    #[test]
    fn lookup_never_saves(event in arb_event()) {
        let result = transition(&DialogState::AwaitingCity { intent: Intent::LookupOnce }, event);
        for effect in &result.effects {
            let is_save = matches!(effect, Effect::SaveFavorite { .. });
            prop_assert!(!is_save);
        }
    }

    /// Cities handed to effects are trimmed and non-empty
    #[test]
    fn completed_cities_are_trimmed(state in arb_state(), event in arb_event()) {
        let result = transition(&state, event);
        for effect in result.effects {
            match effect {
                Effect::ReplyWeather { city } | Effect::SaveFavorite { city } => {
                    prop_assert!(!city.is_empty());
                    prop_assert_eq!(city.trim(), city.as_str());
                }
                Effect::Prompt { .. } | Effect::RejectCity => {}
            }
        }
    }

    /// Transitions are deterministic
    #[test]
    fn transition_is_pure(state in arb_state(), event in arb_event()) {
        let first = transition(&state, event.clone());
        let second = transition(&state, event);
        prop_assert_eq!(first, second);
    }

    /// A trigger followed by a reply always leaves the user idle
    #[test]
    fn trigger_then_reply_completes(
        prefix in proptest::collection::vec(arb_event(), 0..6),
        trigger in prop_oneof![Just(Event::RequestLookup), Just(Event::RequestSetFavorite)],
        reply in arb_event(),
    ) {
        let (state, _) = run(&prefix);
        let mut events = prefix;
        if state.is_idle() {
            events.push(trigger);
            events.push(reply);
        } else {
            events.push(reply);
        }
        let (state, _) = run(&events);
        prop_assert_eq!(state, DialogState::Idle);
    }

    /// Each effect sequence prompts at most once per dialogue
    #[test]
    fn prompts_alternate_with_completions(events in proptest::collection::vec(arb_event(), 0..12)) {
        let (_, effects) = run(&events);
        let mut awaiting = false;
        for effect in effects {
            match effect {
                Effect::Prompt { .. } => {
                    prop_assert!(!awaiting);
                    awaiting = true;
                }
                Effect::ReplyWeather { .. } | Effect::SaveFavorite { .. } | Effect::RejectCity => {
                    prop_assert!(awaiting);
                    awaiting = false;
                }
            }
        }
    }
}
