//! Keycode to keysym translation through xkbcommon.
//!
//! The keymap comes from the server's core keyboard device, so layouts,
//! groups and level-three shift (AltGr) resolve exactly as they do for other
//! clients. Each key press carries its own modifier and group state, which is
//! applied before the lookup.

use x11rb::protocol::xkb::ConnectionExt as _;
use x11rb::xcb_ffi::XCBConnection;
use xkbcommon::xkb;

use veil_core::keysym::{Keysym, canonical_keysym};

use crate::display::DisplayError;

const XKB_MAJOR: u16 = 1;
const XKB_MINOR: u16 = 0;
const CORE_MODIFIERS: u16 = 0x00ff;
const CORE_GROUP_SHIFT: u16 = 13;
const CORE_GROUP_BITS: u16 = 0x3;

/// Translates key press events for the password prompt.
pub struct KeyTranslator {
    state: xkb::State,
}

impl KeyTranslator {
    /// Loads the keymap of the core keyboard device on `conn`.
    ///
    /// # Errors
    /// Returns [`DisplayError::Keyboard`] when the server lacks the XKB
    /// extension or reports no core keyboard.
    pub fn from_device(conn: &XCBConnection) -> Result<Self, DisplayError> {
        let reply = conn.xkb_use_extension(XKB_MAJOR, XKB_MINOR)?.reply()?;
        if !reply.supported {
            return Err(DisplayError::Keyboard(format!(
                "server XKB {}.{} is too old",
                reply.server_major, reply.server_minor
            )));
        }

        let context = xkb::Context::new(xkb::CONTEXT_NO_FLAGS);
        let device = xkb::x11::get_core_keyboard_device_id(conn);
        if device < 0 {
            return Err(DisplayError::Keyboard("no core keyboard device".to_string()));
        }
        let keymap = xkb::x11::keymap_new_from_device(&context, conn, device, xkb::KEYMAP_COMPILE_NO_FLAGS);
        let state = xkb::x11::state_new_from_device(&keymap, conn, device);
        Ok(Self { state })
    }

    /// Wraps an already compiled keymap.
    pub fn from_keymap(keymap: &xkb::Keymap) -> Self {
        Self {
            state: xkb::State::new(keymap),
        }
    }

    /// Resolves `keycode` under the core event `state` field.
    ///
    /// The low byte holds the modifier mask and bits 13-14 the effective
    /// group. Characters behind legacy keysyms are returned as their Latin-1
    /// or Unicode keysym.
    pub fn keysym(&mut self, keycode: u8, state: u16) -> Keysym {
        let mods = u32::from(state & CORE_MODIFIERS);
        let group = u32::from((state >> CORE_GROUP_SHIFT) & CORE_GROUP_BITS);
        self.state.update_mask(mods, 0, 0, 0, 0, group);

        let keysym = self.state.key_get_one_sym(u32::from(keycode).into());
        canonical_keysym(keysym.raw(), xkb::keysym_to_utf32(keysym))
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for layout-aware translation.

    use super::*;

    const MOD5_MASK: u16 = 0x80;
    const SHIFT_MASK: u16 = 0x01;
    const SECOND_GROUP: u16 = 1 << CORE_GROUP_SHIFT;
    // evdev keycode of the key labelled Q on a US keyboard
    const KEY_Q: u8 = 24;

    fn translator(layout: &str) -> Option<KeyTranslator> {
        let context = xkb::Context::new(xkb::CONTEXT_NO_FLAGS);
        let keymap = xkb::Keymap::new_from_names(
            &context,
            "evdev",
            "pc105",
            layout,
            "",
            None,
            xkb::KEYMAP_COMPILE_NO_FLAGS,
        )?;
        Some(KeyTranslator::from_keymap(&keymap))
    }

    #[test]
    fn altgr_selects_the_third_level() {
        // Hosts without xkeyboard-config cannot compile layouts.
        let Some(mut keys) = translator("de") else {
            return;
        };
        assert_eq!(keys.keysym(KEY_Q, 0), 0x0071);
        assert_eq!(keys.keysym(KEY_Q, SHIFT_MASK), 0x0051);
        assert_eq!(keys.keysym(KEY_Q, MOD5_MASK), 0x0040);
    }

    #[test]
    fn group_bits_switch_layout() {
        let Some(mut keys) = translator("us,ru") else {
            return;
        };
        assert_eq!(keys.keysym(KEY_Q, 0), 0x0071);
        assert_eq!(keys.keysym(KEY_Q, SECOND_GROUP), 0x0100_0439);
        assert_eq!(keys.keysym(KEY_Q, SECOND_GROUP | SHIFT_MASK), 0x0100_0419);
    }

    #[test]
    fn function_keys_pass_through() {
        let Some(mut keys) = translator("us") else {
            return;
        };
        // evdev 36 is Return, 9 is Escape
        assert_eq!(keys.keysym(36, 0), veil_core::keysym::XK_RETURN);
        assert_eq!(keys.keysym(9, 0), veil_core::keysym::XK_ESCAPE);
    }
}
