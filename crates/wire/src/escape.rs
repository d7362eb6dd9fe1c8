// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `_xHHHH_` escaping of characters XML text cannot carry.
//!
//! Control characters are written as `_xHHHH_` (UTF-16 code unit in hex).
//! An underscore that would otherwise start such a sequence is itself
//! escaped as `_x005F_`.

/// Escape control characters and ambiguous underscores.
pub fn encode_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '_' if chars.peek() == Some(&'x') => out.push_str("_x005F_"),
            c if c.is_control() && (c as u32) <= 0xFFFF => {
                out.push_str(&format!("_x{:04X}_", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

/// Reverse [`encode_text`]. Malformed sequences are kept verbatim.
pub fn decode_text(text: &str) -> String {
    if !text.contains("_x") {
        return text.to_string();
    }
    let mut units: Vec<u16> = Vec::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("_x") {
        let (before, candidate) = rest.split_at(pos);
        units.extend(before.encode_utf16());
        match parse_escape(candidate) {
            Some(unit) => {
                units.push(unit);
                rest = &candidate[7..];
            }
            None => {
                units.extend("_x".encode_utf16());
                rest = &candidate[2..];
            }
        }
    }
    units.extend(rest.encode_utf16());
    String::from_utf16_lossy(&units)
}

/// Parse `_xHHHH_` at the start of `s`.
fn parse_escape(s: &str) -> Option<u16> {
    let bytes = s.as_bytes();
    if bytes.len() < 7 || bytes[6] != b'_' {
        return None;
    }
    let hex = s.get(2..6)?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u16::from_str_radix(hex, 16).ok()
}

#[cfg(test)]
#[path = "escape_tests.rs"]
mod tests;
