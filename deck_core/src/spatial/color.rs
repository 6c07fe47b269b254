//! Color normalization for every hex field exposed downstream.
//!
//! Accepts `#RRGGBB`, `RRGGBB`, `#RGB`, `rgb(r, g, b)`, CSS color names,
//! and creative strings ("electric violet") via a lookup fallback. Output is
//! always 6-hex uppercase without `#`; unknown input yields the caller's
//! default.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static RGB_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^rgba?\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})").expect("static rgb pattern")
});

static NAMED_COLORS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    // CSS basics.
    m.insert("black", "000000");
    m.insert("white", "FFFFFF");
    m.insert("red", "FF0000");
    m.insert("green", "008000");
    m.insert("blue", "0000FF");
    m.insert("yellow", "FFFF00");
    m.insert("orange", "FFA500");
    m.insert("purple", "800080");
    m.insert("gray", "808080");
    m.insert("grey", "808080");
    m.insert("silver", "C0C0C0");
    m.insert("navy", "000080");
    m.insert("teal", "008080");
    m.insert("maroon", "800000");
    m.insert("olive", "808000");
    m.insert("aqua", "00FFFF");
    m.insert("cyan", "00FFFF");
    m.insert("magenta", "FF00FF");
    m.insert("fuchsia", "FF00FF");
    m.insert("lime", "00FF00");
    m.insert("coral", "FF7F50");
    m.insert("crimson", "DC143C");
    m.insert("gold", "FFD700");
    m.insert("indigo", "4B0082");
    m.insert("ivory", "FFFFF0");
    m.insert("khaki", "F0E68C");
    m.insert("lavender", "E6E6FA");
    m.insert("salmon", "FA8072");
    m.insert("slate", "708090");
    m.insert("slategray", "708090");
    m.insert("turquoise", "40E0D0");
    m.insert("violet", "EE82EE");
    m.insert("charcoal", "36454F");
    // Creative strings models actually emit.
    m.insert("electric violet", "8F00FF");
    m.insert("electric blue", "7DF9FF");
    m.insert("midnight blue", "191970");
    m.insert("deep navy", "0B1026");
    m.insert("off white", "FAF9F6");
    m.insert("off-white", "FAF9F6");
    m.insert("warm gray", "8A8583");
    m.insert("cool gray", "8C92AC");
    m.insert("forest green", "228B22");
    m.insert("emerald", "50C878");
    m.insert("sunset orange", "FD5E53");
    m.insert("royal blue", "4169E1");
    m.insert("sky blue", "87CEEB");
    m.insert("rose gold", "B76E79");
    m.insert("burnt orange", "CC5500");
    m.insert("sage", "B2AC88");
    m.insert("terracotta", "E2725B");
    m.insert("mustard", "FFDB58");
    m.insert("plum", "8E4585");
    m.insert("steel blue", "4682B4");
    m
});

/// Normalize any color expression to canonical form, falling back to
/// `default` (already canonical) for unknown input.
pub fn normalize_color(input: &str, default: &str) -> String {
    parse_color(input).unwrap_or_else(|| default.to_string())
}

/// Strict variant used where the style guide itself is validated.
pub fn parse_color(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let bare = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if bare.len() == 6 && bare.chars().all(|c| c.is_ascii_hexdigit()) {
        return Some(bare.to_ascii_uppercase());
    }
    if bare.len() == 3 && bare.chars().all(|c| c.is_ascii_hexdigit()) {
        let doubled: String = bare.chars().flat_map(|c| [c, c]).collect();
        return Some(doubled.to_ascii_uppercase());
    }

    if let Some(caps) = RGB_PATTERN.captures(&trimmed.to_ascii_lowercase()) {
        let channel = |i: usize| -> Option<u8> { caps.get(i)?.as_str().parse::<u16>().ok().filter(|v| *v <= 255).map(|v| v as u8) };
        let (r, g, b) = (channel(1)?, channel(2)?, channel(3)?);
        return Some(format!("{r:02X}{g:02X}{b:02X}"));
    }

    let key = trimmed.to_ascii_lowercase();
    if let Some(hex) = NAMED_COLORS.get(key.as_str()) {
        return Some((*hex).to_string());
    }
    // Creative compounds like "soft coral glow": try the known words inside.
    for word in key.split_whitespace() {
        if let Some(hex) = NAMED_COLORS.get(word) {
            return Some((*hex).to_string());
        }
    }
    None
}

/// YIQ perceptual brightness in 0..=255.
pub fn yiq_brightness(hex: &str) -> f64 {
    let (r, g, b) = split_channels(hex);
    (f64::from(r) * 299.0 + f64::from(g) * 587.0 + f64::from(b) * 114.0) / 1000.0
}

/// Pick a readable text color over the given background: keep `preferred`
/// when the brightness gap is at least 80, otherwise swap to near-white or
/// near-black.
pub fn contrast_safe_text(preferred: &str, background: &str) -> String {
    let gap = (yiq_brightness(preferred) - yiq_brightness(background)).abs();
    if gap >= 80.0 {
        return preferred.to_string();
    }
    if yiq_brightness(background) >= 128.0 {
        "1A1A1A".to_string()
    } else {
        "F5F5F5".to_string()
    }
}

fn split_channels(hex: &str) -> (u8, u8, u8) {
    let parse = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .unwrap_or(0)
    };
    (parse(0..2), parse(2..4), parse(4..6))
}
