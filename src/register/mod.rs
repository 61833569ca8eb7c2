// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Bit layout of the 16-bit reboot-reason register.
//!
//! ```text
//! bit  15..13   12..10   9..7     6..4     3..0
//!      hist[2]  hist[1]  hist[0]  current  magic (0b0101)
//! ```
//!
//! Each 3-bit slot carries a [`ReasonCode`] in its low two bits and the OOM
//! flag in bit 2. All bit arithmetic for the register lives in this module;
//! callers go through [`ReasonRegister`] accessors.

pub mod store;

use core::fmt;
use core::str::FromStr;

use thiserror::Error;

/// Sentinel stored in the low nibble once the register has been initialised.
pub const MAGIC: u8 = 0x5;
/// Width of the register in CMOS bytes.
pub const REGISTER_WIDTH: u8 = 2;
/// Number of finished boots retained in the register.
pub const HISTORY_DEPTH: usize = 3;

const MAGIC_MASK: u16 = 0x000f;
const SLOT_MASK: u16 = 0b111;
const CURRENT_SHIFT: u32 = 4;
const HISTORY_SHIFT: [u32; HISTORY_DEPTH] = [7, 10, 13];
const CODE_MASK: u8 = 0b011;
const OOM_BIT: u8 = 0b100;

/// Why a boot ended, or is about to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ReasonCode {
    /// Power loss or anything else nobody got to record.
    #[default]
    Unknown = 0,
    /// Orderly reboot requested through the normal shutdown path.
    Reboot = 1,
    /// Emergency restart forced through the reset line.
    Emergency = 2,
    /// Hardware watchdog expired.
    Watchdog = 3,
}

impl ReasonCode {
    /// Decode the low two bits of a slot.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & CODE_MASK {
            0 => Self::Unknown,
            1 => Self::Reboot,
            2 => Self::Emergency,
            _ => Self::Watchdog,
        }
    }

    /// Two-bit encoding of this reason.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Human-readable name used by the query surface.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Reboot => "normal reboot",
            Self::Emergency => "emergency restart",
            Self::Watchdog => "hard watchdog reboot",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a reason keyword is not recognised.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown reboot reason {0:?} (expected unknown, reboot, emergency or watchdog)")]
pub struct ParseReasonError(pub String);

impl FromStr for ReasonCode {
    type Err = ParseReasonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unknown" => Ok(Self::Unknown),
            "reboot" => Ok(Self::Reboot),
            "emergency" | "emerg" => Ok(Self::Emergency),
            "watchdog" | "wdt" => Ok(Self::Watchdog),
            other => Err(ParseReasonError(other.to_string())),
        }
    }
}

/// One 3-bit slot of the register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Slot {
    pub code: ReasonCode,
    pub oom: bool,
}

impl Slot {
    /// Decode a slot from its 3-bit encoding.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self {
            code: ReasonCode::from_bits(bits),
            oom: bits & OOM_BIT != 0,
        }
    }

    /// Encode the slot into 3 bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        let oom = if self.oom { OOM_BIT } else { 0 };
        self.code.bits() | oom
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code.name())?;
        if self.oom {
            f.write_str(", oom")?;
        }
        Ok(())
    }
}

/// Fully decoded register contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedHistory {
    /// Whether the magic nibble matched; nothing else is meaningful otherwise.
    pub valid: bool,
    /// State accumulated by the boot in progress.
    pub current: Slot,
    /// Finished boots, most recent first.
    pub history: [Slot; HISTORY_DEPTH],
}

/// Typed view of the raw 16-bit register value.
///
/// Every operation is pure; persistence is the tracker's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ReasonRegister(u16);

impl ReasonRegister {
    /// Freshly initialised register: magic set, every slot zero.
    pub const INITIALIZED: Self = Self(MAGIC as u16);

    #[must_use]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Decode the CMOS byte pair. The register is stored little-endian.
    #[must_use]
    pub const fn from_le_bytes(bytes: [u8; REGISTER_WIDTH as usize]) -> Self {
        Self(u16::from_le_bytes(bytes))
    }

    #[must_use]
    pub const fn to_le_bytes(self) -> [u8; REGISTER_WIDTH as usize] {
        self.0.to_le_bytes()
    }

    #[must_use]
    pub const fn magic(self) -> u8 {
        (self.0 & MAGIC_MASK) as u8
    }

    /// True once the register carries this subsystem's magic.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.magic() == MAGIC
    }

    #[must_use]
    pub const fn current(self) -> Slot {
        self.slot_at(CURRENT_SHIFT)
    }

    /// History slots, most recent first.
    #[must_use]
    pub const fn history(self) -> [Slot; HISTORY_DEPTH] {
        [
            self.slot_at(HISTORY_SHIFT[0]),
            self.slot_at(HISTORY_SHIFT[1]),
            self.slot_at(HISTORY_SHIFT[2]),
        ]
    }

    /// Boot-time rotation.
    ///
    /// An invalid register is reset to [`Self::INITIALIZED`]. Otherwise the
    /// current slot becomes `history[0]`, each history slot moves one deeper
    /// and the deepest slot is discarded. The new current slot is zero.
    #[must_use]
    pub const fn shift(self) -> Self {
        if !self.is_valid() {
            return Self::INITIALIZED;
        }
        let [h0, h1, _discarded] = self.history();
        Self(self.0 & MAGIC_MASK)
            .with_slot(HISTORY_SHIFT[0], self.current())
            .with_slot(HISTORY_SHIFT[1], h0)
            .with_slot(HISTORY_SHIFT[2], h1)
    }

    /// Set the OOM bit of the current slot.
    #[must_use]
    pub const fn set_oom_flag(self) -> Self {
        let mut current = self.current();
        current.oom = true;
        self.with_slot(CURRENT_SHIFT, current)
    }

    /// Replace the reason code of the current slot, keeping its OOM bit.
    #[must_use]
    pub const fn set_reason(self, code: ReasonCode) -> Self {
        let mut current = self.current();
        current.code = code;
        self.with_slot(CURRENT_SHIFT, current)
    }

    #[must_use]
    pub const fn decode(self) -> DecodedHistory {
        DecodedHistory {
            valid: self.is_valid(),
            current: self.current(),
            history: self.history(),
        }
    }

    const fn slot_at(self, shift: u32) -> Slot {
        Slot::from_bits(((self.0 >> shift) & SLOT_MASK) as u8)
    }

    const fn with_slot(self, shift: u32, slot: Slot) -> Self {
        let cleared = self.0 & !(SLOT_MASK << shift);
        Self(cleared | ((slot.bits() as u16 & SLOT_MASK) << shift))
    }
}

impl fmt::Display for ReasonRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}
