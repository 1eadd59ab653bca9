use std::fmt;
use std::str::FromStr;

use crate::schema::EnumDef;

/// Genre buku, di-backing i32 di buffer
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Genre {
    /// Default untuk field yang tidak ditulis
    #[default]
    Unknown = 0,
    Adventure = 1,
    Fantasy = 2,
    Mystery = 3,
    Science = 4,
}

impl Genre {
    pub const ALL: [Genre; 5] = [
        Self::Unknown,
        Self::Adventure,
        Self::Fantasy,
        Self::Mystery,
        Self::Science,
    ];

    #[inline(always)]
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::Unknown),
            1 => Some(Self::Adventure),
            2 => Some(Self::Fantasy),
            3 => Some(Self::Mystery),
            4 => Some(Self::Science),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Adventure => "adventure",
            Self::Fantasy => "fantasy",
            Self::Mystery => "mystery",
            Self::Science => "science",
        }
    }

    /// Definisi enum untuk schema
    pub fn enum_def() -> EnumDef {
        EnumDef::new(
            "Genre",
            Self::ALL.iter().map(|genre| (genre.as_str(), *genre as i32)),
        )
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Genre {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|genre| genre.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown genre `{s}`"))
    }
}
