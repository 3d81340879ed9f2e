use serde::{Deserialize, Serialize};

/// Straight-alpha RGBA8 color as written in stimulus programs.
///
/// Accepted spellings: a CSS color keyword from a small table, `#rgb`, `#rrggbb`, `#rrggbbaa`,
/// `rgb(r, g, b)` and `rgba(r, g, b, a)` with `a` in `[0, 1]`. Serializes back to hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Opaque color from channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Opaque gray level.
    pub const fn gray(v: u8) -> Self {
        Self::rgb(v, v, v)
    }

    /// Parse any accepted spelling.
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }
        let lower = s.to_ascii_lowercase();
        if let Some(args) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
        {
            return parse_functional(args);
        }
        named(&lower).ok_or_else(|| format!("unknown color \"{s}\""))
    }

    /// Composite this color over an opaque background and return opaque RGB bytes.
    pub fn over_opaque(self, bg: [u8; 3]) -> [u8; 3] {
        if self.a == 255 {
            return [self.r, self.g, self.b];
        }
        let a = u16::from(self.a);
        let inv = 255 - a;
        let mix = |c: u8, b: u8| -> u8 { ((u16::from(c) * a + u16::from(b) * inv + 127) / 255) as u8 };
        [mix(self.r, bg[0]), mix(self.g, bg[1]), mix(self.b, bg[2])]
    }

    /// Opaque RGBA bytes after compositing over black.
    pub fn to_opaque_rgba(self) -> [u8; 4] {
        let [r, g, b] = self.over_opaque([0, 0, 0]);
        [r, g, b, 255]
    }

    /// Hex spelling (`#rrggbb` when opaque, `#rrggbbaa` otherwise).
    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

fn parse_hex(s: &str) -> Result<Color, String> {
    fn hex_byte(pair: &str) -> Result<u8, String> {
        u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte \"{pair}\""))
    }
    fn hex_nibble(c: &str) -> Result<u8, String> {
        let v = u8::from_str_radix(c, 16).map_err(|_| format!("invalid hex digit \"{c}\""))?;
        Ok(v * 17)
    }

    if !s.is_ascii() {
        return Err("hex color must be ascii".to_owned());
    }
    match s.len() {
        3 => Ok(Color::rgb(
            hex_nibble(&s[0..1])?,
            hex_nibble(&s[1..2])?,
            hex_nibble(&s[2..3])?,
        )),
        6 => Ok(Color::rgb(
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
        )),
        8 => Ok(Color {
            r: hex_byte(&s[0..2])?,
            g: hex_byte(&s[2..4])?,
            b: hex_byte(&s[4..6])?,
            a: hex_byte(&s[6..8])?,
        }),
        _ => Err("hex color must be #rgb, #rrggbb or #rrggbbaa".to_owned()),
    }
}

fn parse_functional(args: &str) -> Result<Color, String> {
    let body = args
        .strip_suffix(')')
        .ok_or_else(|| "rgb()/rgba() is missing ')'".to_owned())?;
    let parts = body.split(',').map(str::trim).collect::<Vec<_>>();
    if parts.len() != 3 && parts.len() != 4 {
        return Err("rgb()/rgba() takes 3 or 4 components".to_owned());
    }

    let channel = |p: &str| -> Result<u8, String> {
        let v = p
            .parse::<f64>()
            .map_err(|_| format!("invalid color component \"{p}\""))?;
        Ok(v.round().clamp(0.0, 255.0) as u8)
    };
    let alpha = match parts.get(3) {
        Some(p) => {
            let v = p
                .parse::<f64>()
                .map_err(|_| format!("invalid alpha component \"{p}\""))?;
            (v.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        None => 255,
    };
    Ok(Color {
        r: channel(parts[0])?,
        g: channel(parts[1])?,
        b: channel(parts[2])?,
        a: alpha,
    })
}

fn named(name: &str) -> Option<Color> {
    let c = match name {
        "black" => Color::rgb(0, 0, 0),
        "white" => Color::rgb(255, 255, 255),
        "gray" | "grey" => Color::rgb(128, 128, 128),
        "silver" => Color::rgb(192, 192, 192),
        "red" => Color::rgb(255, 0, 0),
        "green" => Color::rgb(0, 128, 0),
        "lime" => Color::rgb(0, 255, 0),
        "blue" => Color::rgb(0, 0, 255),
        "yellow" => Color::rgb(255, 255, 0),
        "cyan" | "aqua" => Color::rgb(0, 255, 255),
        "magenta" | "fuchsia" => Color::rgb(255, 0, 255),
        "orange" => Color::rgb(255, 165, 0),
        "purple" => Color::rgb(128, 0, 128),
        "transparent" => Color {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        },
        _ => return None,
    };
    Some(c)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/color.rs"]
mod tests;
