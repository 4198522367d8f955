//! Host key events to the byte sequences a shell expects on its PTY

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Encode a key press as terminal input bytes.
///
/// Returns `None` for keys with no VT encoding (bare modifiers, media keys).
pub fn key_bytes(event: &KeyEvent) -> Option<Vec<u8>> {
    let mods = event.modifiers;
    let alt = mods.contains(KeyModifiers::ALT);

    let bytes = match event.code {
        KeyCode::Char(ch) => char_bytes(ch, mods),
        KeyCode::Enter => vec![0x0D],
        KeyCode::Backspace if alt => vec![0x1B, 0x7F],
        KeyCode::Backspace => vec![0x7F],
        KeyCode::Tab if mods.contains(KeyModifiers::SHIFT) => b"\x1b[Z".to_vec(),
        KeyCode::Tab => vec![0x09],
        KeyCode::BackTab => b"\x1b[Z".to_vec(),
        KeyCode::Esc => vec![0x1B],
        KeyCode::Up => csi_letter(b'A', mods),
        KeyCode::Down => csi_letter(b'B', mods),
        KeyCode::Right => csi_letter(b'C', mods),
        KeyCode::Left => csi_letter(b'D', mods),
        KeyCode::Home => csi_letter(b'H', mods),
        KeyCode::End => csi_letter(b'F', mods),
        KeyCode::Insert => csi_tilde(2, mods),
        KeyCode::Delete => csi_tilde(3, mods),
        KeyCode::PageUp => csi_tilde(5, mods),
        KeyCode::PageDown => csi_tilde(6, mods),
        KeyCode::F(n) => function_key(n, mods)?,
        _ => return None,
    };
    Some(bytes)
}

fn char_bytes(ch: char, mods: KeyModifiers) -> Vec<u8> {
    let ctrl = mods.contains(KeyModifiers::CONTROL);
    let alt = mods.contains(KeyModifiers::ALT);

    let mut bytes = Vec::with_capacity(4);
    if alt {
        bytes.push(0x1B);
    }
    match control_code(ch).filter(|_| ctrl) {
        Some(code) => bytes.push(code),
        None => bytes.extend_from_slice(ch.encode_utf8(&mut [0u8; 4]).as_bytes()),
    }
    bytes
}

/// C0 code produced by holding ctrl with `ch`
fn control_code(ch: char) -> Option<u8> {
    match ch {
        'a'..='z' => Some(ch as u8 - b'a' + 1),
        'A'..='Z' => Some(ch as u8 - b'A' + 1),
        '@' | '`' | ' ' | '2' => Some(0x00),
        '[' | '3' => Some(0x1B),
        '\\' | '4' => Some(0x1C),
        ']' | '5' => Some(0x1D),
        '^' | '~' | '6' => Some(0x1E),
        '_' | '?' | '7' => Some(0x1F),
        _ => None,
    }
}

/// xterm modifier parameter, or `None` when no modifier is held
fn modifier_param(mods: KeyModifiers) -> Option<u8> {
    let mut param = 1;
    if mods.contains(KeyModifiers::SHIFT) {
        param += 1;
    }
    if mods.contains(KeyModifiers::ALT) {
        param += 2;
    }
    if mods.contains(KeyModifiers::CONTROL) {
        param += 4;
    }
    (param > 1).then_some(param)
}

fn csi_letter(key: u8, mods: KeyModifiers) -> Vec<u8> {
    match modifier_param(mods) {
        Some(param) => format!("\x1b[1;{}{}", param, key as char).into_bytes(),
        None => vec![0x1B, b'[', key],
    }
}

fn csi_tilde(code: u8, mods: KeyModifiers) -> Vec<u8> {
    match modifier_param(mods) {
        Some(param) => format!("\x1b[{};{}~", code, param).into_bytes(),
        None => format!("\x1b[{}~", code).into_bytes(),
    }
}

fn function_key(n: u8, mods: KeyModifiers) -> Option<Vec<u8>> {
    // F1-F4 use SS3 when unmodified
    let ss3 = match n {
        1 => Some(b'P'),
        2 => Some(b'Q'),
        3 => Some(b'R'),
        4 => Some(b'S'),
        _ => None,
    };
    if let Some(key) = ss3 {
        return Some(match modifier_param(mods) {
            Some(param) => format!("\x1b[1;{}{}", param, key as char).into_bytes(),
            None => vec![0x1B, b'O', key],
        });
    }

    let code = match n {
        5 => 15,
        6 => 17,
        7 => 18,
        8 => 19,
        9 => 20,
        10 => 21,
        11 => 23,
        12 => 24,
        _ => return None,
    };
    Some(csi_tilde(code, mods))
}
