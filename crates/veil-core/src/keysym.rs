//! X keysym classification for password entry.
//!
//! Keysym values and ranges follow the X11 `keysymdef.h` assignments. Only the
//! handful the lock screen cares about are named here.

/// X keysym value.
pub type Keysym = u32;

/// `NoSymbol`.
pub const NO_SYMBOL: Keysym = 0;
/// `XK_BackSpace`.
pub const XK_BACKSPACE: Keysym = 0xff08;
/// `XK_Return`.
pub const XK_RETURN: Keysym = 0xff0d;
/// `XK_Escape`.
pub const XK_ESCAPE: Keysym = 0xff1b;
/// `XK_KP_Enter`.
pub const XK_KP_ENTER: Keysym = 0xff8d;
/// `XK_KP_0`.
pub const XK_KP_0: Keysym = 0xffb0;
/// `XK_KP_9`.
pub const XK_KP_9: Keysym = 0xffb9;
/// `XK_0`.
pub const XK_0: Keysym = 0x0030;

const UNICODE_KEYSYM_BASE: Keysym = 0x0100_0000;

/// What one key press means to the password prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Submit the buffered candidate.
    Accept,
    /// Discard the buffered candidate.
    Cancel,
    /// Remove the last character.
    Backspace,
    /// Append a character.
    Text(char),
    /// Not relevant to password entry.
    Ignore,
}

/// Keypad keys (`XK_KP_Space` ..= `XK_KP_Equal`).
pub fn is_keypad_key(keysym: Keysym) -> bool {
    (0xff80..=0xffbd).contains(&keysym)
}

/// Vendor private keypad keys.
pub fn is_private_keypad_key(keysym: Keysym) -> bool {
    (0x1100_0000..=0x1100_ffff).contains(&keysym)
}

/// Function keys (`XK_F1` ..= `XK_F35`).
pub fn is_function_key(keysym: Keysym) -> bool {
    (0xffbe..=0xffe0).contains(&keysym)
}

/// Miscellaneous function keys (`XK_Select` ..= `XK_Break`).
pub fn is_misc_function_key(keysym: Keysym) -> bool {
    (0xff60..=0xff6b).contains(&keysym)
}

/// Keypad PF keys (`XK_KP_F1` ..= `XK_KP_F4`).
pub fn is_pf_key(keysym: Keysym) -> bool {
    (0xff91..=0xff94).contains(&keysym)
}

/// Maps keypad enter and keypad digits onto their main-row equivalents.
pub fn normalize_keypad(keysym: Keysym) -> Keysym {
    match keysym {
        XK_KP_ENTER => XK_RETURN,
        XK_KP_0..=XK_KP_9 => keysym - XK_KP_0 + XK_0,
        other => other,
    }
}

/// Returns the character a keysym types, if any.
///
/// Latin-1 keysyms map onto the same code points; Unicode keysyms carry the
/// code point in their low 24 bits.
pub fn keysym_to_char(keysym: Keysym) -> Option<char> {
    match keysym {
        0x0020..=0x007e | 0x00a0..=0x00ff => char::from_u32(keysym),
        0x0100_0100..=0x0110_ffff => char::from_u32(keysym - UNICODE_KEYSYM_BASE),
        _ => None,
    }
}

/// Classifies one pressed keysym.
pub fn classify(keysym: Keysym) -> KeyAction {
    let keysym = normalize_keypad(keysym);
    if is_function_key(keysym)
        || is_keypad_key(keysym)
        || is_misc_function_key(keysym)
        || is_pf_key(keysym)
        || is_private_keypad_key(keysym)
    {
        return KeyAction::Ignore;
    }

    match keysym {
        XK_RETURN => KeyAction::Accept,
        XK_ESCAPE => KeyAction::Cancel,
        XK_BACKSPACE => KeyAction::Backspace,
        other => keysym_to_char(other)
            .filter(|ch| !ch.is_control())
            .map_or(KeyAction::Ignore, KeyAction::Text),
    }
}

/// Rewrites a printable keysym into the form [`keysym_to_char`] understands.
///
/// Keyboard layouts report many characters through legacy keysyms (Cyrillic,
/// Greek, dead keys). Given the code point the keymap library resolved for
/// `keysym`, such a keysym is replaced by its Latin-1 or Unicode keysym. Keys
/// in the function block and vendor ranges are returned unchanged so keypad
/// normalisation and the ignore rules still see them.
pub fn canonical_keysym(keysym: Keysym, code_point: u32) -> Keysym {
    let function_block = (0xff00..=0xffff).contains(&keysym);
    if function_block || keysym >= 0x1000_0000 || keysym_to_char(keysym).is_some() {
        return keysym;
    }
    match char::from_u32(code_point) {
        Some(ch) if !ch.is_control() && code_point != 0 => match code_point {
            0x0020..=0x007e | 0x00a0..=0x00ff => code_point,
            _ => UNICODE_KEYSYM_BASE + code_point,
        },
        _ => keysym,
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for keysym classification.

    use super::*;

    #[test]
    fn keypad_digits_and_enter_are_normalized() {
        assert_eq!(classify(XK_KP_ENTER), KeyAction::Accept);
        assert_eq!(classify(0xffb7), KeyAction::Text('7'));
        assert_eq!(classify(0xffab), KeyAction::Ignore);
    }

    #[test]
    fn function_and_modifier_keys_are_ignored() {
        assert_eq!(classify(0xffbe), KeyAction::Ignore);
        assert_eq!(classify(0xffe1), KeyAction::Ignore);
        assert_eq!(classify(0xff63), KeyAction::Ignore);
        assert_eq!(classify(0x1100_0001), KeyAction::Ignore);
    }

    #[test]
    fn printable_latin_and_unicode_keysyms_produce_text() {
        assert_eq!(classify(0x0061), KeyAction::Text('a'));
        assert_eq!(classify(0x00e9), KeyAction::Text('é'));
        assert_eq!(classify(0x0100_20ac), KeyAction::Text('€'));
    }

    #[test]
    fn legacy_keysyms_become_unicode_text() {
        // Cyrillic_shorti and Greek_alpha
        assert_eq!(canonical_keysym(0x06ca, 0x0439), 0x0100_0439);
        assert_eq!(classify(canonical_keysym(0x06ca, 0x0439)), KeyAction::Text('й'));
        assert_eq!(canonical_keysym(0x07e1, 0x03b1), 0x0100_03b1);
    }

    #[test]
    fn canonical_keysym_keeps_function_block_and_plain_keysyms() {
        assert_eq!(canonical_keysym(0xffb1, u32::from('1')), 0xffb1);
        assert_eq!(canonical_keysym(XK_RETURN, 0x0d), XK_RETURN);
        assert_eq!(canonical_keysym(0x0040, 0x40), 0x0040);
        assert_eq!(canonical_keysym(0x0100_20ac, 0x20ac), 0x0100_20ac);
        // dead_acute has no code point
        assert_eq!(canonical_keysym(0xfe51, 0), 0xfe51);
        assert_eq!(canonical_keysym(NO_SYMBOL, 0), NO_SYMBOL);
    }
}
