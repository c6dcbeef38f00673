// ABOUTME: Windows virtual-key codes mapped to the key names the game's input config understands.
// ABOUTME: Also validates user-typed key names, including mouse buttons and the scroll wheel.

/// Virtual-key code to UE3 key name.
const VIRTUAL_KEYS: &[(u32, &str)] = &[
    (0x08, "BackSpace"),
    (0x09, "Tab"),
    (0x0D, "Enter"),
    (0x13, "Pause"),
    (0x14, "CapsLock"),
    (0x1B, "Escape"),
    (0x20, "SpaceBar"),
    (0x21, "PageUp"),
    (0x22, "PageDown"),
    (0x23, "End"),
    (0x24, "Home"),
    (0x25, "Left"),
    (0x26, "Up"),
    (0x27, "Right"),
    (0x28, "Down"),
    (0x2D, "Insert"),
    (0x2E, "Delete"),
    (0x30, "Zero"),
    (0x31, "One"),
    (0x32, "Two"),
    (0x33, "Three"),
    (0x34, "Four"),
    (0x35, "Five"),
    (0x36, "Six"),
    (0x37, "Seven"),
    (0x38, "Eight"),
    (0x39, "Nine"),
    (0x41, "A"),
    (0x42, "B"),
    (0x43, "C"),
    (0x44, "D"),
    (0x45, "E"),
    (0x46, "F"),
    (0x47, "G"),
    (0x48, "H"),
    (0x49, "I"),
    (0x4A, "J"),
    (0x4B, "K"),
    (0x4C, "L"),
    (0x4D, "M"),
    (0x4E, "N"),
    (0x4F, "O"),
    (0x50, "P"),
    (0x51, "Q"),
    (0x52, "R"),
    (0x53, "S"),
    (0x54, "T"),
    (0x55, "U"),
    (0x56, "V"),
    (0x57, "W"),
    (0x58, "X"),
    (0x59, "Y"),
    (0x5A, "Z"),
    (0x60, "NumPadZero"),
    (0x61, "NumPadOne"),
    (0x62, "NumPadTwo"),
    (0x63, "NumPadThree"),
    (0x64, "NumPadFour"),
    (0x65, "NumPadFive"),
    (0x66, "NumPadSix"),
    (0x67, "NumPadSeven"),
    (0x68, "NumPadEight"),
    (0x69, "NumPadNine"),
    (0x6A, "Multiply"),
    (0x6B, "Add"),
    (0x6D, "Subtract"),
    (0x6E, "Decimal"),
    (0x6F, "Divide"),
    (0x70, "F1"),
    (0x71, "F2"),
    (0x72, "F3"),
    (0x73, "F4"),
    (0x74, "F5"),
    (0x75, "F6"),
    (0x76, "F7"),
    (0x77, "F8"),
    (0x78, "F9"),
    (0x79, "F10"),
    (0x7A, "F11"),
    (0x7B, "F12"),
    (0x90, "NumLock"),
    (0x91, "ScrollLock"),
    (0xA0, "LeftShift"),
    (0xA1, "RightShift"),
    (0xA2, "LeftControl"),
    (0xA3, "RightControl"),
    (0xA4, "LeftAlt"),
    (0xA5, "RightAlt"),
    (0xBA, "Semicolon"),
    (0xBB, "Equals"),
    (0xBC, "Comma"),
    (0xBD, "Underscore"),
    (0xBE, "Period"),
    (0xBF, "Slash"),
    (0xC0, "Tilde"),
    (0xDB, "LeftBracket"),
    (0xDC, "Backslash"),
    (0xDD, "RightBracket"),
    (0xDE, "Quote"),
];

/// Mouse inputs have no virtual-key code in the low-level keyboard hook.
const MOUSE_KEYS: &[&str] = &[
    "LeftMouseButton",
    "RightMouseButton",
    "MiddleMouseButton",
    "ThumbMouseButton",
    "ThumbMouseButton2",
    "MouseScrollUp",
    "MouseScrollDown",
];

pub fn name_for_vk(code: u32) -> Option<&'static str> {
    VIRTUAL_KEYS
        .iter()
        .find(|(vk, _)| *vk == code)
        .map(|(_, name)| *name)
}

/// Resolve a user-typed key name to the spelling the game expects.
pub fn canonical_name(input: &str) -> Option<&'static str> {
    let input = input.trim();
    all_names().find(|name| name.eq_ignore_ascii_case(input))
}

/// Accept either a key name or a hex virtual-key code such as `0x70`.
pub fn resolve(input: &str) -> Option<&'static str> {
    let input = input.trim();
    match input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok().and_then(name_for_vk),
        None => canonical_name(input),
    }
}

pub fn all_names() -> impl Iterator<Item = &'static str> {
    VIRTUAL_KEYS
        .iter()
        .map(|(_, name)| *name)
        .chain(MOUSE_KEYS.iter().copied())
}
