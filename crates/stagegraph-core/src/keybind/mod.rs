//! Keybinding registry and chord matcher.
//!
//! Bindings map an id to a [`Chord`]. The chord comes from the
//! [`KeyBindStore`] when one is stored there, otherwise from the default given
//! at registration, which is then written back to the store. Changes made to
//! the store later are picked up before the next event is matched.

mod chord;
pub mod defaults;

pub use chord::{Chord, ChordStep, KeyToken, is_modifier_key, normalize_key};
pub use defaults::register_default_keybinds;

use crate::error::{StageError, StageResult};
use crate::input::InputEvent;
use crate::storage::{KeyBindChange, KeyBindStore};
use kurbo::Point;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::Receiver;

/// Default length of the trailing event window.
pub const DEFAULT_SEQUENCE_WINDOW: usize = 20;

/// Handler for key down/up.
pub type KeyHandler<C> = Box<dyn FnMut(&mut C)>;
/// Handler for pointer movement while the chord is held.
pub type DragHandler<C> = Box<dyn FnMut(&mut C, Point)>;

/// A single registered binding.
pub struct KeyBind<C> {
    id: String,
    default_chord: Chord,
    chord: Chord,
    description: Option<String>,
    on_down: Option<KeyHandler<C>>,
    on_up: Option<KeyHandler<C>>,
    on_drag: Option<DragHandler<C>>,
    held: bool,
}

impl<C> fmt::Debug for KeyBind<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyBind")
            .field("id", &self.id)
            .field("chord", &self.chord.to_string())
            .field("held", &self.held)
            .finish()
    }
}

impl<C> KeyBind<C> {
    fn new(id: String, default_chord: Chord, chord: Chord) -> Self {
        Self {
            id,
            default_chord,
            chord,
            description: None,
            on_down: None,
            on_up: None,
            on_drag: None,
            held: false,
        }
    }

    /// Run when the chord completes.
    pub fn down(&mut self, handler: impl FnMut(&mut C) + 'static) -> &mut Self {
        self.on_down = Some(Box::new(handler));
        self
    }

    /// Run when the chord's final key or button is released.
    pub fn up(&mut self, handler: impl FnMut(&mut C) + 'static) -> &mut Self {
        self.on_up = Some(Box::new(handler));
        self
    }

    /// Run on pointer movement while a chord ending in a mouse button is held.
    pub fn drag(&mut self, handler: impl FnMut(&mut C, Point) + 'static) -> &mut Self {
        self.on_drag = Some(Box::new(handler));
        self
    }

    pub fn describe(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn chord(&self) -> &Chord {
        &self.chord
    }

    pub fn default_chord(&self) -> &Chord {
        &self.default_chord
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    fn releases_on(&self, token: &KeyToken) -> bool {
        self.held && self.chord.last().is_some_and(|step| &step.key == token)
    }

    fn drags(&self) -> bool {
        self.held
            && self
                .chord
                .last()
                .is_some_and(|step| matches!(step.key, KeyToken::Mouse(_)))
    }
}

/// Registry of bindings dispatching to handlers over a context `C`.
pub struct KeyBinds<C> {
    binds: Vec<KeyBind<C>>,
    store: Arc<dyn KeyBindStore>,
    changes: Receiver<KeyBindChange>,
    recent: VecDeque<ChordStep>,
    window: usize,
}

impl<C> fmt::Debug for KeyBinds<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyBinds")
            .field("binds", &self.binds)
            .field("window", &self.window)
            .finish()
    }
}

impl<C> KeyBinds<C> {
    pub fn new(store: Arc<dyn KeyBindStore>, window: usize) -> Self {
        let changes = store.watch();
        Self {
            binds: Vec::new(),
            store,
            changes,
            recent: VecDeque::new(),
            window: window.max(1),
        }
    }

    /// Register a binding.
    ///
    /// A stored chord wins over `default_chord`. A stored chord that does not
    /// parse is replaced by the default.
    pub fn create(&mut self, id: &str, default_chord: &str) -> StageResult<&mut KeyBind<C>> {
        if self.position(id).is_some() {
            return Err(StageError::DuplicateBinding(id.to_string()));
        }
        let default = Chord::parse(default_chord)?;
        let chord = match self.store.get(id)? {
            Some(stored) => match Chord::parse(&stored) {
                Ok(chord) => chord,
                Err(e) => {
                    log::warn!("Stored chord for '{}' is unusable ({}), using default", id, e);
                    self.store.set(id, &default.to_string())?;
                    default.clone()
                }
            },
            None => {
                self.store.set(id, &default.to_string())?;
                default.clone()
            }
        };
        if let Some(other) = self.binds.iter().find(|b| b.chord == chord) {
            log::warn!("Keybind '{}' shares chord '{}' with '{}'", id, chord, other.id);
        }
        self.window = self.window.max(chord.len());
        self.binds.push(KeyBind::new(id.to_string(), default, chord));
        self.poll_changes();
        let index = self.binds.len() - 1;
        Ok(&mut self.binds[index])
    }

    /// Register a binding with a down handler.
    pub fn register(
        &mut self,
        id: &str,
        default_chord: &str,
        handler: impl FnMut(&mut C) + 'static,
    ) -> StageResult<&mut KeyBind<C>> {
        Ok(self.create(id, default_chord)?.down(handler))
    }

    /// Rebind `id` and persist the new chord.
    pub fn set(&mut self, id: &str, chord: &str) -> StageResult<()> {
        let index = self
            .position(id)
            .ok_or_else(|| StageError::BindingNotFound(id.to_string()))?;
        let chord = Chord::parse(chord)?;
        self.store.set(id, &chord.to_string())?;
        self.poll_changes();
        // Applied directly too in case the store does not echo changes.
        self.apply(index, chord);
        Ok(())
    }

    /// Restore the default chord of `id`.
    pub fn reset(&mut self, id: &str) -> StageResult<()> {
        let default = self
            .get(id)
            .map(|b| b.default_chord.to_string())
            .ok_or_else(|| StageError::BindingNotFound(id.to_string()))?;
        self.set(id, &default)
    }

    /// Restore every default chord.
    pub fn reset_all(&mut self) -> StageResult<()> {
        let ids: Vec<String> = self.binds.iter().map(|b| b.id.clone()).collect();
        for id in ids {
            self.reset(&id)?;
        }
        log::info!("All keybinds reset to defaults");
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&KeyBind<C>> {
        self.binds.iter().find(|b| b.id == id)
    }

    pub fn chord_of(&self, id: &str) -> StageResult<&Chord> {
        self.get(id)
            .map(|b| &b.chord)
            .ok_or_else(|| StageError::BindingNotFound(id.to_string()))
    }

    /// Bindings in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &KeyBind<C>> {
        self.binds.iter()
    }

    pub fn len(&self) -> usize {
        self.binds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.binds.is_empty()
    }

    /// Current length of the trailing event window.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Apply chord changes written to the store since the last call.
    pub fn poll_changes(&mut self) {
        while let Ok(change) = self.changes.try_recv() {
            let Some(index) = self.position(&change.id) else {
                log::debug!("Ignoring stored chord for unregistered keybind '{}'", change.id);
                continue;
            };
            match Chord::parse(&change.chord) {
                Ok(chord) => self.apply(index, chord),
                Err(e) => log::warn!("Ignoring chord change for '{}': {}", change.id, e),
            }
        }
    }

    /// Forget pending partial sequences. Held chords still receive their
    /// release.
    pub fn clear_sequence(&mut self) {
        self.recent.clear();
    }

    /// Feed one input event. Returns the ids whose down handlers ran.
    pub fn handle(&mut self, event: &InputEvent, ctx: &mut C) -> Vec<String> {
        self.poll_changes();

        if event.is_escape() {
            self.clear_sequence();
        }

        if let Some(token) = KeyToken::released_by(event) {
            for bind in self.binds.iter_mut().filter(|b| b.releases_on(&token)) {
                bind.held = false;
                if let Some(handler) = bind.on_up.as_mut() {
                    handler(ctx);
                }
            }
            return Vec::new();
        }

        if let InputEvent::MouseMove { position, .. } = event {
            for bind in self.binds.iter_mut().filter(|b| b.drags()) {
                if let Some(handler) = bind.on_drag.as_mut() {
                    handler(ctx, *position);
                }
            }
            return Vec::new();
        }

        let Some(step) = ChordStep::from_event(event) else {
            return Vec::new();
        };
        let holdable = !matches!(step.key, KeyToken::Wheel(_));
        self.recent.push_back(step);
        while self.recent.len() > self.window {
            self.recent.pop_front();
        }

        let matched = self.longest_matches();
        let Some(longest) = matched.first().map(|&i| self.binds[i].chord.len()) else {
            return Vec::new();
        };
        if longest > 1 {
            // A completed sequence must not be reused as the prefix of the next match
            self.recent.clear();
        }

        let mut fired = Vec::with_capacity(matched.len());
        for index in matched {
            let bind = &mut self.binds[index];
            log::debug!("Keybind '{}' ({}) triggered", bind.id, bind.chord);
            bind.held = holdable;
            if let Some(handler) = bind.on_down.as_mut() {
                handler(ctx);
            }
            fired.push(bind.id.clone());
        }
        fired
    }

    /// Indices of every binding matching the window tail with the greatest
    /// chord length, in registration order.
    fn longest_matches(&self) -> Vec<usize> {
        let mut best = 0;
        let mut matched = Vec::new();
        for (index, bind) in self.binds.iter().enumerate() {
            if !bind.chord.matches_tail(self.recent.iter()) {
                continue;
            }
            let len = bind.chord.len();
            if len > best {
                best = len;
                matched.clear();
            }
            if len == best {
                matched.push(index);
            }
        }
        matched
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.binds.iter().position(|b| b.id == id)
    }

    fn apply(&mut self, index: usize, chord: Chord) {
        self.window = self.window.max(chord.len());
        let bind = &mut self.binds[index];
        if bind.chord != chord {
            log::info!("Keybind '{}' rebound: {} -> {}", bind.id, bind.chord, chord);
            bind.chord = chord;
            bind.held = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Modifiers, MouseButton, WheelDirection};
    use crate::storage::MemoryKeyBindStore;

    #[derive(Default)]
    struct Log {
        calls: Vec<String>,
        drags: Vec<Point>,
    }

    fn record(name: &'static str) -> impl FnMut(&mut Log) + 'static {
        move |log: &mut Log| log.calls.push(name.to_string())
    }

    fn keybinds() -> (Arc<MemoryKeyBindStore>, KeyBinds<Log>) {
        let store = Arc::new(MemoryKeyBindStore::new());
        let keybinds = KeyBinds::new(store.clone(), DEFAULT_SEQUENCE_WINDOW);
        (store, keybinds)
    }

    fn press(keybinds: &mut KeyBinds<Log>, log: &mut Log, keys: &str) -> Vec<String> {
        let mut fired = Vec::new();
        for key in keys.split_whitespace() {
            fired.extend(keybinds.handle(&InputEvent::key_down(key), log));
            keybinds.handle(&InputEvent::key_up(key), log);
        }
        fired
    }

    #[test]
    fn test_single_chord_with_modifiers() {
        let (_, mut keybinds) = keybinds();
        let mut log = Log::default();
        keybinds.register("undo", "C-z", record("undo")).unwrap();

        keybinds.handle(&InputEvent::key_down("z"), &mut log);
        assert!(log.calls.is_empty());

        let event = InputEvent::key_down("Z").with_modifiers(Modifiers::ctrl());
        assert_eq!(keybinds.handle(&event, &mut log), vec!["undo".to_string()]);
        assert_eq!(log.calls, vec!["undo"]);
    }

    #[test]
    fn test_sequence_matches_only_when_exact() {
        let (_, mut keybinds) = keybinds();
        let mut log = Log::default();
        keybinds.register("snap", "i n t j", record("snap")).unwrap();

        press(&mut keybinds, &mut log, "i n t k");
        assert!(log.calls.is_empty());
        press(&mut keybinds, &mut log, "i n j");
        assert!(log.calls.is_empty());
        press(&mut keybinds, &mut log, "x i n t j");
        assert_eq!(log.calls, vec!["snap"]);
    }

    #[test]
    fn test_longest_match_wins() {
        let (_, mut keybinds) = keybinds();
        let mut log = Log::default();
        keybinds.register("short", "j", record("short")).unwrap();
        keybinds.register("long", "t j", record("long")).unwrap();

        press(&mut keybinds, &mut log, "j");
        assert_eq!(log.calls, vec!["short"]);
        log.calls.clear();
        press(&mut keybinds, &mut log, "t j");
        assert_eq!(log.calls, vec!["long"]);
    }

    #[test]
    fn test_matched_sequence_is_consumed() {
        let (_, mut keybinds) = keybinds();
        let mut log = Log::default();
        keybinds.register("aa", "a a", record("aa")).unwrap();
        press(&mut keybinds, &mut log, "a a a");
        assert_eq!(log.calls, vec!["aa"]);
        press(&mut keybinds, &mut log, "a");
        assert_eq!(log.calls, vec!["aa", "aa"]);
    }

    #[test]
    fn test_equal_chords_fire_in_registration_order() {
        let (_, mut keybinds) = keybinds();
        let mut log = Log::default();
        keybinds.register("first", "C-g", record("first")).unwrap();
        keybinds.register("second", "C-g", record("second")).unwrap();
        let event = InputEvent::key_down("g").with_modifiers(Modifiers::ctrl());
        keybinds.handle(&event, &mut log);
        assert_eq!(log.calls, vec!["first", "second"]);
    }

    #[test]
    fn test_duplicate_and_missing_ids() {
        let (_, mut keybinds) = keybinds();
        keybinds.create("undo", "C-z").unwrap();
        assert!(matches!(
            keybinds.create("undo", "C-u"),
            Err(StageError::DuplicateBinding(_))
        ));
        assert!(matches!(
            keybinds.set("nope", "a"),
            Err(StageError::BindingNotFound(_))
        ));
        assert!(matches!(
            keybinds.set("undo", "Q-z"),
            Err(StageError::InvalidChord(_))
        ));
        assert!(keybinds.create("bad", "<nope>").is_err());
        assert_eq!(keybinds.len(), 1);
    }

    #[test]
    fn test_default_written_and_stored_chord_preferred() {
        let store = Arc::new(MemoryKeyBindStore::new());
        store.set("redo", "C-S-z").unwrap();
        store.set("broken", "<what>").unwrap();
        let mut keybinds: KeyBinds<Log> = KeyBinds::new(store.clone(), 20);

        keybinds.create("undo", "C-z").unwrap();
        keybinds.create("redo", "C-y").unwrap();
        keybinds.create("broken", "b").unwrap();

        assert_eq!(store.get("undo").unwrap(), Some("C-z".to_string()));
        assert_eq!(keybinds.chord_of("redo").unwrap().to_string(), "C-S-z");
        assert_eq!(keybinds.chord_of("broken").unwrap().to_string(), "b");
        assert_eq!(store.get("broken").unwrap(), Some("b".to_string()));
    }

    #[test]
    fn test_store_change_rebinds() {
        let (store, mut keybinds) = keybinds();
        let mut log = Log::default();
        keybinds.register("select", "v", record("select")).unwrap();

        store.set("select", "s").unwrap();
        press(&mut keybinds, &mut log, "v");
        assert!(log.calls.is_empty());
        press(&mut keybinds, &mut log, "s");
        assert_eq!(log.calls, vec!["select"]);

        keybinds.set("select", "C-s").unwrap();
        assert_eq!(store.get("select").unwrap(), Some("C-s".to_string()));
        keybinds.reset_all().unwrap();
        assert_eq!(keybinds.chord_of("select").unwrap().to_string(), "v");
    }

    #[test]
    fn test_late_registration_keeps_pending_rebinds() {
        let (store, mut keybinds) = keybinds();
        let mut log = Log::default();
        keybinds.register("undo", "C-z", record("undo")).unwrap();

        store.set("undo", "C-u").unwrap();
        keybinds.register("late", "x", record("late")).unwrap();
        assert_eq!(keybinds.chord_of("undo").unwrap().to_string(), "C-u");

        let event = InputEvent::key_down("u").with_modifiers(Modifiers::ctrl());
        assert_eq!(keybinds.handle(&event, &mut log), vec!["undo".to_string()]);
    }

    #[test]
    fn test_up_and_drag_handlers() {
        let (_, mut keybinds) = keybinds();
        let mut log = Log::default();
        keybinds
            .create("pan", "C-<1>")
            .unwrap()
            .down(record("down"))
            .up(record("up"))
            .drag(|log: &mut Log, p| log.drags.push(p));
        keybinds
            .create("hold", "z")
            .unwrap()
            .down(record("z down"))
            .up(record("z up"));

        keybinds.handle(&InputEvent::mouse_move(Point::new(1.0, 1.0)), &mut log);
        assert!(log.drags.is_empty());

        let down = InputEvent::mouse_down(MouseButton::Middle, Point::ZERO).with_modifiers(Modifiers::ctrl());
        keybinds.handle(&down, &mut log);
        keybinds.handle(&InputEvent::mouse_move(Point::new(5.0, 2.0)), &mut log);
        keybinds.handle(&InputEvent::mouse_up(MouseButton::Middle, Point::new(5.0, 2.0)), &mut log);
        keybinds.handle(&InputEvent::mouse_move(Point::new(9.0, 9.0)), &mut log);
        assert_eq!(log.calls, vec!["down", "up"]);
        assert_eq!(log.drags, vec![Point::new(5.0, 2.0)]);

        log.calls.clear();
        keybinds.handle(&InputEvent::key_down("z"), &mut log);
        assert!(keybinds.get("hold").unwrap().is_held());
        keybinds.handle(&InputEvent::key_up("z"), &mut log);
        assert_eq!(log.calls, vec!["z down", "z up"]);
    }

    #[test]
    fn test_wheel_chord() {
        let (_, mut keybinds) = keybinds();
        let mut log = Log::default();
        keybinds.register("zoom", "C-<MWU>", record("zoom")).unwrap();
        let wheel = InputEvent::Wheel {
            direction: WheelDirection::Up,
            position: Point::ZERO,
            modifiers: Modifiers::ctrl(),
        };
        keybinds.handle(&wheel, &mut log);
        assert_eq!(log.calls, vec!["zoom"]);
        assert!(!keybinds.get("zoom").unwrap().is_held());
    }

    #[test]
    fn test_escape_resets_sequence() {
        let (_, mut keybinds) = keybinds();
        let mut log = Log::default();
        keybinds.register("snap", "i n t j", record("snap")).unwrap();
        keybinds.register("cancel", "escape", record("cancel")).unwrap();

        press(&mut keybinds, &mut log, "i n Escape t j");
        assert_eq!(log.calls, vec!["cancel"]);
    }

    #[test]
    fn test_escape_keeps_held_chord_release() {
        let (_, mut keybinds) = keybinds();
        let mut log = Log::default();
        keybinds
            .create("hold", "z")
            .unwrap()
            .down(record("z down"))
            .up(record("z up"));

        keybinds.handle(&InputEvent::key_down("z"), &mut log);
        keybinds.handle(&InputEvent::key_down("Escape"), &mut log);
        keybinds.handle(&InputEvent::key_up("Escape"), &mut log);
        assert!(keybinds.get("hold").unwrap().is_held());
        keybinds.handle(&InputEvent::key_up("z"), &mut log);
        assert_eq!(log.calls, vec!["z down", "z up"]);
        assert!(!keybinds.get("hold").unwrap().is_held());
    }

    #[test]
    fn test_modifier_keys_do_not_break_sequences() {
        let (_, mut keybinds) = keybinds();
        let mut log = Log::default();
        keybinds.register("tag", "C-S-2", record("tag")).unwrap();
        keybinds.handle(&InputEvent::key_down("Control"), &mut log);
        keybinds.handle(&InputEvent::key_down("Shift"), &mut log);
        let mods = Modifiers {
            ctrl: true,
            shift: true,
            ..Modifiers::NONE
        };
        keybinds.handle(&InputEvent::key_down("2").with_modifiers(mods), &mut log);
        assert_eq!(log.calls, vec!["tag"]);
    }

    #[test]
    fn test_window_grows_for_long_chords() {
        let store = Arc::new(MemoryKeyBindStore::new());
        let mut keybinds: KeyBinds<Log> = KeyBinds::new(store, 2);
        let mut log = Log::default();
        keybinds.register("long", "a b c d", record("long")).unwrap();
        assert_eq!(keybinds.window(), 4);
        press(&mut keybinds, &mut log, "a b c d");
        assert_eq!(log.calls, vec!["long"]);
    }
}
