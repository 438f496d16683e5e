//! Translation from crossterm key events to the normalized key model.

use core_events::{InputEvent, KeyCode, KeyEvent, KeyModifiers};
use crossterm::event::{
    KeyCode as CKeyCode, KeyEvent as CKeyEvent, KeyEventKind as CKind,
    KeyModifiers as CMods,
};

fn map_mods(mods: CMods) -> KeyModifiers {
    let mut out = KeyModifiers::empty();
    if mods.contains(CMods::CONTROL) {
        out |= KeyModifiers::CTRL;
    }
    if mods.contains(CMods::ALT) {
        out |= KeyModifiers::ALT;
    }
    if mods.contains(CMods::SHIFT) {
        out |= KeyModifiers::SHIFT;
    }
    out
}

/// Map a crossterm key event to a normalized input event. Release events
/// and keys outside the interaction model map to `None`.
pub fn map_key_event(key: CKeyEvent) -> Option<InputEvent> {
    if matches!(key.kind, CKind::Release) {
        return None;
    }

    // Ctrl-C always means "quit", even while the editor owns the keyboard.
    if key.modifiers.contains(CMods::CONTROL) && key.code == CKeyCode::Char('c') {
        return Some(InputEvent::CtrlC);
    }

    let code = match key.code {
        CKeyCode::Char(c) => KeyCode::Char(c),
        CKeyCode::Enter => KeyCode::Enter,
        CKeyCode::Esc => KeyCode::Esc,
        CKeyCode::Backspace => KeyCode::Backspace,
        CKeyCode::Tab => KeyCode::Tab,
        CKeyCode::Delete => KeyCode::Delete,
        CKeyCode::Up => KeyCode::Up,
        CKeyCode::Down => KeyCode::Down,
        CKeyCode::Left => KeyCode::Left,
        CKeyCode::Right => KeyCode::Right,
        CKeyCode::Home => KeyCode::Home,
        CKeyCode::End => KeyCode::End,
        CKeyCode::PageUp => KeyCode::PageUp,
        CKeyCode::PageDown => KeyCode::PageDown,
        CKeyCode::F(n) => KeyCode::F(n),
        _ => return None,
    };

    Some(InputEvent::Key(KeyEvent {
        code,
        mods: map_mods(key.modifiers),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(code: CKeyCode, mods: CMods) -> CKeyEvent {
        CKeyEvent::new(code, mods)
    }

    #[test]
    fn maps_printable_char() {
        match map_key_event(ev(CKeyCode::Char('A'), CMods::SHIFT)) {
            Some(InputEvent::Key(k)) => {
                assert_eq!(k.code, KeyCode::Char('A'));
                assert!(k.mods.contains(KeyModifiers::SHIFT));
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn ctrl_c_takes_priority_over_char() {
        assert!(matches!(
            map_key_event(ev(CKeyCode::Char('c'), CMods::CONTROL)),
            Some(InputEvent::CtrlC)
        ));
    }

    #[test]
    fn maps_function_and_navigation_keys() {
        for (raw, want) in [
            (CKeyCode::F(5), KeyCode::F(5)),
            (CKeyCode::Home, KeyCode::Home),
            (CKeyCode::End, KeyCode::End),
            (CKeyCode::PageUp, KeyCode::PageUp),
            (CKeyCode::Left, KeyCode::Left),
            (CKeyCode::Esc, KeyCode::Esc),
        ] {
            match map_key_event(ev(raw, CMods::NONE)) {
                Some(InputEvent::Key(k)) => assert_eq!(k.code, want),
                other => panic!("unexpected mapping for {raw:?}: {other:?}"),
            }
        }
    }

    #[test]
    fn unmapped_keys_are_dropped() {
        assert!(map_key_event(ev(CKeyCode::CapsLock, CMods::NONE)).is_none());
    }
}
