//! Chord matching and isolated action invocation

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, warn};

use super::context;
use super::error::CallbackError;
use super::event::KeyEvent;
use super::keys::{Chord, ModifierKey};
use super::registry::{Binding, Trigger};

/// Whether `chord` is exactly the key and modifier set of `event`
pub fn chord_matches(chord: &Chord, event: &KeyEvent) -> bool {
    chord.key() == event.key && chord.modifiers() == event.modifiers
}

/// Bindings from `snapshot` that should fire for `event`, in order
///
/// A binding qualifies when its chord matches exactly and the focused
/// element's context is permitted for that binding.
pub fn eligible(snapshot: &[Arc<Binding>], event: &KeyEvent) -> Vec<Arc<Binding>> {
    snapshot
        .iter()
        .filter(|binding| match binding.trigger() {
            Trigger::Chord { chord } => chord_matches(&chord, event),
            Trigger::DoubleTap { .. } => false,
        })
        .filter(|binding| context::permits(binding.allow_in(), event.context))
        .cloned()
        .collect()
}

/// Double-tap bindings for `modifier`, in order
pub fn double_tap_bindings(snapshot: &[Arc<Binding>], modifier: ModifierKey) -> Vec<Arc<Binding>> {
    snapshot
        .iter()
        .filter(|binding| binding.trigger() == Trigger::DoubleTap { modifier })
        .cloned()
        .collect()
}

/// Run every binding's action, isolating failures
///
/// A binding disposed by an earlier action in the same pass is skipped.
/// Returns the number of actions run and the errors they produced.
pub fn invoke_all(bindings: &[Arc<Binding>], event: &KeyEvent) -> (usize, Vec<CallbackError>) {
    let mut invoked = 0;
    let mut errors = Vec::new();

    for binding in bindings {
        if binding.is_disposed() {
            debug!(id = binding.id(), "skipping binding disposed during dispatch");
            continue;
        }

        invoked += 1;
        if let Err(error) = invoke(binding, event) {
            warn!(id = binding.id(), %error, "hotkey action failed");
            errors.push(error);
        }
    }

    (invoked, errors)
}

fn invoke(binding: &Binding, event: &KeyEvent) -> Result<(), CallbackError> {
    let trigger = binding.trigger();
    debug!(id = binding.id(), %trigger, "invoking action");

    match panic::catch_unwind(AssertUnwindSafe(|| (binding.action())(event))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(source)) => Err(CallbackError::Failed {
            trigger: trigger.to_string(),
            source,
        }),
        Err(payload) => Err(CallbackError::Panicked {
            trigger: trigger.to_string(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::hotkey::context::{ContextSet, ElementContext};
    use crate::hotkey::keys::{Key, Modifiers};
    use crate::hotkey::registry::{Action, BindingHandle, BindingOptions, Registry};

    fn event(key: Key, modifiers: Modifiers) -> KeyEvent {
        KeyEvent::new(key, modifiers, Duration::ZERO)
    }

    fn bind(
        registry: &mut Registry,
        modifiers: Modifiers,
        key: Key,
        options: BindingOptions,
        action: Box<Action>,
    ) -> BindingHandle {
        let chord = Chord::new(modifiers, key).unwrap();
        registry.insert(Trigger::Chord { chord }, options, action)
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Box<Action> {
        let log = Arc::clone(log);
        Box::new(move |_: &KeyEvent| {
            log.lock().unwrap().push(name);
            Ok(())
        })
    }

    #[test]
    fn test_exact_modifier_match() {
        let chord = Chord::new(Modifiers::CTRL, Key::S).unwrap();
        assert!(chord_matches(&chord, &event(Key::S, Modifiers::CTRL)));
        assert!(!chord_matches(&chord, &event(Key::S, Modifiers::CTRL | Modifiers::SHIFT)));
        assert!(!chord_matches(&chord, &event(Key::S, Modifiers::empty())));
        assert!(!chord_matches(&chord, &event(Key::A, Modifiers::CTRL)));
    }

    #[test]
    fn test_eligible_filters_by_context_per_binding() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = Registry::new();
        bind(
            &mut registry,
            Modifiers::empty(),
            Key::H,
            BindingOptions::new(),
            recorder(&log, "page"),
        );
        let allowed = bind(
            &mut registry,
            Modifiers::empty(),
            Key::H,
            BindingOptions::new().allow_in(ContextSet::TEXT_INPUT),
            recorder(&log, "global"),
        );

        let snapshot = registry.snapshot_active();
        let plain = event(Key::H, Modifiers::empty());
        assert_eq!(eligible(&snapshot, &plain).len(), 2);

        let typing = plain.in_context(ElementContext::TextInput);
        let matched = eligible(&snapshot, &typing);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id(), allowed.id());
    }

    #[test]
    fn test_double_tap_bindings_never_match_chords() {
        let mut registry = Registry::new();
        registry.insert(
            Trigger::DoubleTap {
                modifier: ModifierKey::Ctrl,
            },
            BindingOptions::new(),
            Box::new(|_: &KeyEvent| Ok(())),
        );

        let snapshot = registry.snapshot_active();
        assert!(eligible(&snapshot, &event(Key::Ctrl, Modifiers::CTRL)).is_empty());
        assert_eq!(double_tap_bindings(&snapshot, ModifierKey::Ctrl).len(), 1);
        assert!(double_tap_bindings(&snapshot, ModifierKey::Shift).is_empty());
    }

    #[test]
    fn test_invoke_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = Registry::new();
        bind(
            &mut registry,
            Modifiers::CTRL,
            Key::K,
            BindingOptions::new(),
            recorder(&log, "first"),
        );
        bind(
            &mut registry,
            Modifiers::CTRL,
            Key::K,
            BindingOptions::new(),
            recorder(&log, "second"),
        );

        let trigger = event(Key::K, Modifiers::CTRL);
        let matched = eligible(&registry.snapshot_active(), &trigger);
        let (invoked, errors) = invoke_all(&matched, &trigger);

        assert_eq!(invoked, 2);
        assert!(errors.is_empty());
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_failing_actions_do_not_stop_the_pass() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = Registry::new();
        bind(
            &mut registry,
            Modifiers::empty(),
            Key::F,
            BindingOptions::new(),
            Box::new(|_: &KeyEvent| Err(anyhow::anyhow!("boom"))),
        );
        bind(
            &mut registry,
            Modifiers::empty(),
            Key::F,
            BindingOptions::new(),
            Box::new(|_: &KeyEvent| panic!("kaboom")),
        );
        bind(
            &mut registry,
            Modifiers::empty(),
            Key::F,
            BindingOptions::new(),
            recorder(&log, "last"),
        );

        let trigger = event(Key::F, Modifiers::empty());
        let matched = eligible(&registry.snapshot_active(), &trigger);
        let (invoked, errors) = invoke_all(&matched, &trigger);

        assert_eq!(invoked, 3);
        assert_eq!(errors.len(), 2);
        assert!(matches!(&errors[0], CallbackError::Failed { trigger, .. } if trigger == "F"));
        assert!(matches!(
            &errors[1],
            CallbackError::Panicked { message, .. } if message == "kaboom"
        ));
        assert_eq!(*log.lock().unwrap(), vec!["last"]);
    }

    #[test]
    fn test_binding_disposed_mid_pass_is_skipped() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let victim: Arc<Mutex<Option<BindingHandle>>> = Arc::new(Mutex::new(None));
        let mut registry = Registry::new();

        let slot = Arc::clone(&victim);
        bind(
            &mut registry,
            Modifiers::empty(),
            Key::X,
            BindingOptions::new(),
            Box::new(move |_: &KeyEvent| {
                if let Some(handle) = slot.lock().unwrap().as_ref() {
                    handle.dispose();
                }
                Ok(())
            }),
        );
        let second = bind(
            &mut registry,
            Modifiers::empty(),
            Key::X,
            BindingOptions::new(),
            recorder(&log, "second"),
        );
        *victim.lock().unwrap() = Some(second);

        let trigger = event(Key::X, Modifiers::empty());
        let matched = eligible(&registry.snapshot_active(), &trigger);
        let (invoked, _) = invoke_all(&matched, &trigger);

        assert_eq!(invoked, 1);
        assert!(log.lock().unwrap().is_empty());
    }
}
