//! PCM output encodings.
//!
//! `Encoding` is a small bit-flag set. The base flags describe a property (width, signedness,
//! float), and the concrete encodings combine them. Masks built with `|` are used to describe
//! *allowed* encodings in the format table; the decoder always settles on one concrete encoding.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// A set of PCM encoding flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Encoding(u32);

impl Encoding {
    pub const NONE: Encoding = Encoding(0);

    pub const BITS_8: Encoding = Encoding(0x000f);
    pub const BITS_16: Encoding = Encoding(0x0040);
    pub const BITS_24: Encoding = Encoding(0x4000);
    pub const BITS_32: Encoding = Encoding(0x0100);
    pub const SIGNED: Encoding = Encoding(0x0080);
    pub const FLOAT: Encoding = Encoding(0x0e00);

    pub const SIGNED_8: Encoding = Encoding(Self::SIGNED.0 | 0x02);
    pub const UNSIGNED_8: Encoding = Encoding(0x01);
    pub const ULAW_8: Encoding = Encoding(0x04);
    pub const ALAW_8: Encoding = Encoding(0x08);
    pub const SIGNED_16: Encoding = Encoding(Self::BITS_16.0 | Self::SIGNED.0 | 0x10);
    pub const UNSIGNED_16: Encoding = Encoding(Self::BITS_16.0 | 0x20);
    pub const SIGNED_24: Encoding = Encoding(Self::BITS_24.0 | Self::SIGNED.0 | 0x1000);
    pub const UNSIGNED_24: Encoding = Encoding(Self::BITS_24.0 | 0x2000);
    pub const SIGNED_32: Encoding = Encoding(Self::BITS_32.0 | Self::SIGNED.0 | 0x1000);
    pub const UNSIGNED_32: Encoding = Encoding(Self::BITS_32.0 | 0x2000);
    pub const FLOAT_32: Encoding = Encoding(0x0200);
    pub const FLOAT_64: Encoding = Encoding(0x0400);

    pub const ANY: Encoding = Encoding(
        Self::SIGNED_16.0
            | Self::UNSIGNED_16.0
            | Self::UNSIGNED_8.0
            | Self::SIGNED_8.0
            | Self::ULAW_8.0
            | Self::ALAW_8.0
            | Self::SIGNED_32.0
            | Self::UNSIGNED_32.0
            | Self::SIGNED_24.0
            | Self::UNSIGNED_24.0
            | Self::FLOAT_32.0
            | Self::FLOAT_64.0,
    );

    /// Concrete encodings in the order the decoder prefers them when a mask allows several.
    pub const PREFERENCE: [Encoding; 12] = [
        Self::SIGNED_16,
        Self::UNSIGNED_16,
        Self::SIGNED_32,
        Self::UNSIGNED_32,
        Self::SIGNED_24,
        Self::UNSIGNED_24,
        Self::FLOAT_32,
        Self::FLOAT_64,
        Self::SIGNED_8,
        Self::UNSIGNED_8,
        Self::ULAW_8,
        Self::ALAW_8,
    ];

    pub const fn from_bits(bits: u32) -> Self {
        Encoding(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether every flag of `other` is set in `self`.
    pub const fn contains(self, other: Encoding) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether `self` is exactly one of the concrete encodings.
    pub fn is_concrete(self) -> bool {
        Self::PREFERENCE.contains(&self)
    }

    /// Pick the preferred concrete encoding allowed by this mask.
    pub fn preferred(self) -> Option<Encoding> {
        Self::PREFERENCE
            .iter()
            .copied()
            .find(|enc| self.contains(*enc))
    }

    /// Iterate the concrete encodings allowed by this mask, in preference order.
    pub fn concrete(self) -> impl Iterator<Item = Encoding> {
        Self::PREFERENCE
            .into_iter()
            .filter(move |enc| self.contains(*enc))
    }

    /// Bytes per sample for a concrete encoding, `None` for masks.
    pub fn sample_size(self) -> Option<usize> {
        match self {
            Self::SIGNED_8 | Self::UNSIGNED_8 | Self::ULAW_8 | Self::ALAW_8 => Some(1),
            Self::SIGNED_16 | Self::UNSIGNED_16 => Some(2),
            Self::SIGNED_24 | Self::UNSIGNED_24 => Some(3),
            Self::SIGNED_32 | Self::UNSIGNED_32 | Self::FLOAT_32 => Some(4),
            Self::FLOAT_64 => Some(8),
            _ => None,
        }
    }

    fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::SIGNED_8 => "s8",
            Self::UNSIGNED_8 => "u8",
            Self::ULAW_8 => "ulaw",
            Self::ALAW_8 => "alaw",
            Self::SIGNED_16 => "s16",
            Self::UNSIGNED_16 => "u16",
            Self::SIGNED_24 => "s24",
            Self::UNSIGNED_24 => "u24",
            Self::SIGNED_32 => "s32",
            Self::UNSIGNED_32 => "u32",
            Self::FLOAT_32 => "f32",
            Self::FLOAT_64 => "f64",
            Self::ANY => "any",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{:#06x}", self.0),
        }
    }
}

impl BitOr for Encoding {
    type Output = Encoding;

    fn bitor(self, rhs: Encoding) -> Encoding {
        Encoding(self.0 | rhs.0)
    }
}

impl BitOrAssign for Encoding {
    fn bitor_assign(&mut self, rhs: Encoding) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Encoding {
    type Output = Encoding;

    fn bitand(self, rhs: Encoding) -> Encoding {
        Encoding(self.0 & rhs.0)
    }
}
