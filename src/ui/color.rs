use crate::game::judgment::Judgment;

pub type Rgba = [f32; 4];

const fn nibble(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        b'A'..=b'F' => b - b'A' + 10,
        _ => panic!("invalid hex digit in color literal"),
    }
}

/// Parses `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa` (the `#` is optional)
/// into straight-alpha RGBA. Meant for const palette literals; bad input
/// panics, which fails the build when used in a `const`.
pub const fn rgba_hex(s: &str) -> Rgba {
    let raw = s.as_bytes();
    let skip = if !raw.is_empty() && raw[0] == b'#' { 1 } else { 0 };
    let digits = raw.len() - skip;
    let short = match digits {
        3 | 4 => true,
        6 | 8 => false,
        _ => panic!("color literal must have 3, 4, 6 or 8 hex digits"),
    };
    let channels = if digits == 3 || digits == 6 { 3 } else { 4 };

    let mut out = [1.0_f32; 4];
    let mut c = 0;
    while c < channels {
        let byte = if short {
            nibble(raw[skip + c]) * 17
        } else {
            nibble(raw[skip + 2 * c]) * 16 + nibble(raw[skip + 2 * c + 1])
        };
        out[c] = byte as f32 / 255.0;
        c += 1;
    }
    out
}

/// Marker colors, indexed like the wire codes.
pub const JUDGMENT_RGBA: [Rgba; 4] = [
    rgba_hex("#EF4444"), // Miss
    rgba_hex("#1073B9"), // Perfect
    rgba_hex("#79F63B"), // Great
    rgba_hex("#F59E0B"), // Good
];

pub const UNKNOWN_JUDGMENT_RGBA: Rgba = rgba_hex("#9CA3AF");

/// Accuracy bar band fills (translucent).
pub const BAND_PERFECT_RGBA: Rgba = rgba_hex("#1073B9CC");
pub const BAND_GREAT_RGBA: Rgba = rgba_hex("#47F63BB3");
pub const BAND_GOOD_RGBA: Rgba = rgba_hex("#F5BE0B99");
pub const BAND_MISS_RGBA: Rgba = rgba_hex("#EF444480");

pub const BAR_BACKGROUND_RGBA: Rgba = rgba_hex("#4B5563");
pub const CENTER_LINE_RGBA: Rgba = rgba_hex("#FFFFFF99");

#[inline(always)]
pub const fn color_for(judgment: Judgment) -> Rgba {
    match judgment {
        Judgment::Miss => JUDGMENT_RGBA[0],
        Judgment::Perfect => JUDGMENT_RGBA[1],
        Judgment::Great => JUDGMENT_RGBA[2],
        Judgment::Good => JUDGMENT_RGBA[3],
        Judgment::Unknown => UNKNOWN_JUDGMENT_RGBA,
    }
}

#[inline(always)]
pub const fn band_rgba(judgment: Judgment) -> Rgba {
    match judgment {
        Judgment::Perfect => BAND_PERFECT_RGBA,
        Judgment::Great => BAND_GREAT_RGBA,
        Judgment::Good => BAND_GOOD_RGBA,
        Judgment::Miss | Judgment::Unknown => BAND_MISS_RGBA,
    }
}

/// Straight alpha blend of `fg` over an opaque `bg`.
#[inline(always)]
pub fn blend_over(fg: Rgba, bg: Rgba) -> Rgba {
    let a = fg[3].clamp(0.0, 1.0);
    [
        fg[0].mul_add(a, bg[0] * (1.0 - a)),
        fg[1].mul_add(a, bg[1] * (1.0 - a)),
        fg[2].mul_add(a, bg[2] * (1.0 - a)),
        1.0,
    ]
}

#[inline(always)]
pub fn to_rgb8(c: Rgba) -> (u8, u8, u8) {
    let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    (q(c[0]), q(c[1]), q(c[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parses_all_lengths() {
        assert_eq!(rgba_hex("#fff"), [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(rgba_hex("000f"), [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(to_rgb8(rgba_hex("#1073B9")), (0x10, 0x73, 0xB9));
        assert_eq!(rgba_hex("#FF000080")[3], 128.0 / 255.0);
    }

    #[test]
    fn fallback_color_only_for_unknown() {
        for j in Judgment::ALL_KNOWN {
            assert_ne!(color_for(j), UNKNOWN_JUDGMENT_RGBA, "{j:?} used fallback");
        }
        assert_eq!(color_for(Judgment::Unknown), UNKNOWN_JUDGMENT_RGBA);
    }

    #[test]
    fn blend_respects_alpha() {
        let out = blend_over([1.0, 0.0, 0.0, 0.5], [0.0, 0.0, 1.0, 1.0]);
        assert!((out[0] - 0.5).abs() < 1e-6);
        assert!((out[2] - 0.5).abs() < 1e-6);
        assert_eq!(out[3], 1.0);
    }
}
