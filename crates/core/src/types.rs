use crate::legend::Legend;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// External-system account identifier (login or display name).
pub type AccountName = String;

/// 24-bit RGB display color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Pack as `0xRRGGBB`.
    pub const fn to_int(self) -> u32 {
        ((self.red as u32) << 16) | ((self.green as u32) << 8) | self.blue as u32
    }

    pub const fn from_int(value: u32) -> Self {
        Self {
            red: ((value >> 16) & 0xff) as u8,
            green: ((value >> 8) & 0xff) as u8,
            blue: (value & 0xff) as u8,
        }
    }
}

/// A durable player identity. The name is the primary key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub initials: String,
    pub color: Color,
}

impl Player {
    pub fn new(name: impl Into<String>, initials: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            initials: initials.into(),
            color,
        }
    }

    /// The "Nobody" sentinel: a player with an empty name.
    pub fn nobody() -> Self {
        Self::new("", "", Color::default())
    }

    pub fn is_nobody(&self) -> bool {
        self.name.is_empty()
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nobody() {
            write!(f, "Nobody")
        } else {
            write!(f, "{} ({})", self.name, self.initials)
        }
    }
}

/// Error when parsing the `name,initials,r|g|b` text form of a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsePlayerError {
    /// Not exactly three comma-separated fields.
    FieldCount,
    /// Color is not three `|`-separated channels.
    ColorFormat,
    /// A color channel is not an integer in 0..=255.
    ColorChannel(String),
    /// The name field is empty.
    EmptyName,
}

impl fmt::Display for ParsePlayerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsePlayerError::FieldCount => write!(f, "expected `name,initials,r|g|b`"),
            ParsePlayerError::ColorFormat => write!(f, "expected color as `r|g|b`"),
            ParsePlayerError::ColorChannel(raw) => write!(f, "invalid color channel `{}`", raw),
            ParsePlayerError::EmptyName => write!(f, "player name is empty"),
        }
    }
}

impl std::error::Error for ParsePlayerError {}

impl FromStr for Player {
    type Err = ParsePlayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(',').collect();
        let [name, initials, rgb] = fields.as_slice() else {
            return Err(ParsePlayerError::FieldCount);
        };

        let channels: Vec<&str> = rgb.split('|').collect();
        if channels.len() != 3 {
            return Err(ParsePlayerError::ColorFormat);
        }
        let mut parsed = [0u8; 3];
        for (slot, raw) in parsed.iter_mut().zip(channels) {
            *slot = raw
                .trim()
                .parse()
                .map_err(|_| ParsePlayerError::ColorChannel(raw.to_string()))?;
        }

        let name = name.trim();
        if name.is_empty() {
            return Err(ParsePlayerError::EmptyName);
        }

        Ok(Player::new(
            name,
            initials.trim(),
            Color::new(parsed[0], parsed[1], parsed[2]),
        ))
    }
}

/// Placement plus the six per-round statistics shown in a result box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Score {
    /// 1-based placement.
    pub rank: u32,
    pub points: i64,
    pub kills: i64,
    pub falls: i64,
    pub accidents: i64,
    pub damage_done: i64,
    pub damage_taken: i64,
}

impl Score {
    pub const fn new(rank: u32, stats: [i64; 6]) -> Self {
        let [points, kills, falls, accidents, damage_done, damage_taken] = stats;
        Self {
            rank,
            points,
            kills,
            falls,
            accidents,
            damage_done,
            damage_taken,
        }
    }
}

/// One result box as read by the capture boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawObservation {
    pub legend: Legend,
    pub account: AccountName,
    pub score: Score,
}

impl RawObservation {
    pub fn new(legend: impl Into<Legend>, account: impl Into<AccountName>, score: Score) -> Self {
        Self {
            legend: legend.into(),
            account: account.into(),
            score,
        }
    }
}

/// A score attributed to a player for one round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributedScore {
    pub player: Player,
    pub legend: Legend,
    pub score: Score,
}

/// The authoritative output of one round.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedResult {
    pub entries: Vec<AttributedScore>,
}

impl FinalizedResult {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributedScore> {
        self.entries.iter()
    }
}
