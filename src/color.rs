use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::models::BookRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const NEUTRAL_GRAY: Rgb = Rgb::from_u24(0x888888);
    pub const WHITE: Rgb = Rgb::from_u24(0xFFFFFF);

    pub const fn from_u24(value: u32) -> Self {
        Rgb {
            r: ((value >> 16) & 0xFF) as u8,
            g: ((value >> 8) & 0xFF) as u8,
            b: (value & 0xFF) as u8,
        }
    }

    pub fn to_u24(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// `#rrggbb`
    pub fn hex(self) -> String {
        format!("#{:06x}", self.to_u24())
    }

    /// Opaque ARGB as spreadsheet fills expect it, e.g. `FF1A2B3C`.
    pub fn argb(self) -> String {
        format!("FF{:06X}", self.to_u24())
    }

    pub fn ansi_background(self) -> String {
        format!("\x1b[48;2;{};{};{}m", self.r, self.g, self.b)
    }

    /// Black or white, whichever reads better on this background.
    pub fn contrasting_text(self) -> Rgb {
        let luma = 299 * self.r as u32 + 587 * self.g as u32 + 114 * self.b as u32;
        if luma > 150_000 {
            Rgb::from_u24(0x000000)
        } else {
            Rgb::WHITE
        }
    }

    pub fn ansi_foreground(self) -> String {
        format!("\x1b[38;2;{};{};{}m", self.r, self.g, self.b)
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.hex())
    }
}

pub const ANSI_RESET: &str = "\x1b[0m";

/// Display color for a genre. A pure function of the exact genre text, so
/// every caller in every process agrees without sharing state.
pub fn color_for(genre: Option<&str>) -> Rgb {
    let genre = match genre {
        Some(value) if !value.is_empty() => value,
        _ => return Rgb::NEUTRAL_GRAY,
    };
    let digest = Sha256::digest(genre.as_bytes());
    let mut rng = SplitMix64::new(seed_from_digest(&digest));
    Rgb::from_u24((rng.next_u64() & 0xFF_FFFF) as u32)
}

/// Folds the big-endian digest into 64 bits; the last word is the
/// low-order part of the digest read as an integer.
fn seed_from_digest(digest: &[u8]) -> u64 {
    digest.chunks(8).fold(0u64, |seed, chunk| {
        let mut word = [0u8; 8];
        word[..chunk.len()].copy_from_slice(chunk);
        seed ^ u64::from_be_bytes(word)
    })
}

struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    fn new(seed: u64) -> Self {
        SplitMix64 { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

/// Colors for the distinct genres of a view, ordered by genre text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenreColorMap {
    colors: BTreeMap<String, Rgb>,
}

impl GenreColorMap {
    pub fn from_rows<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a BookRow>,
    {
        let mut colors = BTreeMap::new();
        for row in rows {
            colors
                .entry(row.genre.clone())
                .or_insert_with(|| color_for(Some(&row.genre)));
        }
        GenreColorMap { colors }
    }

    pub fn get(&self, genre: &str) -> Option<Rgb> {
        self.colors.get(genre).copied()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Rgb)> {
        self.colors.iter().map(|(genre, color)| (genre.as_str(), *color))
    }
}
