//! Input device and button identifiers.
//!
//! Numbering follows the host's joypad ABI: one digital device class and
//! sixteen button ids. The same values are exposed to scripts through the
//! read-only `input` table.

/// The digital joypad device class.
pub const DEVICE_JOYPAD: u32 = 1;

/// Joypad button: B (bottom face).
pub const JOYPAD_B: u32 = 0;
/// Joypad button: Y (left face).
pub const JOYPAD_Y: u32 = 1;
/// Joypad button: Select.
pub const JOYPAD_SELECT: u32 = 2;
/// Joypad button: Start.
pub const JOYPAD_START: u32 = 3;
/// Joypad d-pad: up.
pub const JOYPAD_UP: u32 = 4;
/// Joypad d-pad: down.
pub const JOYPAD_DOWN: u32 = 5;
/// Joypad d-pad: left.
pub const JOYPAD_LEFT: u32 = 6;
/// Joypad d-pad: right.
pub const JOYPAD_RIGHT: u32 = 7;
/// Joypad button: A (right face).
pub const JOYPAD_A: u32 = 8;
/// Joypad button: X (top face).
pub const JOYPAD_X: u32 = 9;
/// Joypad shoulder: L.
pub const JOYPAD_L: u32 = 10;
/// Joypad shoulder: R.
pub const JOYPAD_R: u32 = 11;
/// Joypad trigger: L2.
pub const JOYPAD_L2: u32 = 12;
/// Joypad trigger: R2.
pub const JOYPAD_R2: u32 = 13;
/// Joypad stick click: L3.
pub const JOYPAD_L3: u32 = 14;
/// Joypad stick click: R3.
pub const JOYPAD_R3: u32 = 15;

/// `(name, value)` pairs backing the script-visible constants table.
pub(crate) const SCRIPT_CONSTANTS: &[(&str, u32)] = &[
    ("JOYPAD", DEVICE_JOYPAD),
    ("B", JOYPAD_B),
    ("Y", JOYPAD_Y),
    ("SELECT", JOYPAD_SELECT),
    ("START", JOYPAD_START),
    ("UP", JOYPAD_UP),
    ("DOWN", JOYPAD_DOWN),
    ("LEFT", JOYPAD_LEFT),
    ("RIGHT", JOYPAD_RIGHT),
    ("A", JOYPAD_A),
    ("X", JOYPAD_X),
    ("L", JOYPAD_L),
    ("R", JOYPAD_R),
    ("L2", JOYPAD_L2),
    ("R2", JOYPAD_R2),
    ("L3", JOYPAD_L3),
    ("R3", JOYPAD_R3),
];
