//! Scheduling priority normalization.
//!
//! The OS reports priority in a platform-specific shape: a priority class on
//! Windows, a niceness integer on Unix. A [`PriorityTable`] turns that raw
//! value into a portable [`PriorityTier`]. The table is chosen once at
//! startup with [`platform_table`].

use serde::{Deserialize, Serialize};

/// Raw priority value as the OS reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawPriority {
    /// Windows priority class (`*_PRIORITY_CLASS` flag value).
    Class(u32),
    /// Unix niceness, typically -20..=19.
    Nice(i32),
}

impl std::fmt::Display for RawPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawPriority::Class(class) => write!(f, "class 0x{:X}", class),
            RawPriority::Nice(nice) => write!(f, "nice {}", nice),
        }
    }
}

/// Portable priority tier, lowest to highest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriorityTier {
    Idle,
    Low,
    BelowNormal,
    Normal,
    AboveNormal,
    High,
    Realtime,
    #[default]
    Unknown,
}

impl PriorityTier {
    /// Ordering rank, higher is more favourable scheduling. `Unknown` has none.
    pub fn rank(self) -> Option<u8> {
        match self {
            PriorityTier::Idle => Some(0),
            PriorityTier::Low => Some(1),
            PriorityTier::BelowNormal => Some(2),
            PriorityTier::Normal => Some(3),
            PriorityTier::AboveNormal => Some(4),
            PriorityTier::High => Some(5),
            PriorityTier::Realtime => Some(6),
            PriorityTier::Unknown => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PriorityTier::Idle => "Idle",
            PriorityTier::Low => "Low",
            PriorityTier::BelowNormal => "Below Normal",
            PriorityTier::Normal => "Normal",
            PriorityTier::AboveNormal => "Above Normal",
            PriorityTier::High => "High",
            PriorityTier::Realtime => "Realtime",
            PriorityTier::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Maps a raw OS priority value to a tier. Must be total and pure.
pub trait PriorityTable: Send + Sync {
    fn tier(&self, raw: RawPriority) -> PriorityTier;
}

pub const IDLE_PRIORITY_CLASS: u32 = 0x0000_0040;
pub const BELOW_NORMAL_PRIORITY_CLASS: u32 = 0x0000_4000;
pub const NORMAL_PRIORITY_CLASS: u32 = 0x0000_0020;
pub const ABOVE_NORMAL_PRIORITY_CLASS: u32 = 0x0000_8000;
pub const HIGH_PRIORITY_CLASS: u32 = 0x0000_0080;
pub const REALTIME_PRIORITY_CLASS: u32 = 0x0000_0100;

/// The six Windows priority classes, mapped one to one.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsPriorityTable;

impl PriorityTable for WindowsPriorityTable {
    fn tier(&self, raw: RawPriority) -> PriorityTier {
        match raw {
            RawPriority::Class(IDLE_PRIORITY_CLASS) => PriorityTier::Idle,
            RawPriority::Class(BELOW_NORMAL_PRIORITY_CLASS) => PriorityTier::BelowNormal,
            RawPriority::Class(NORMAL_PRIORITY_CLASS) => PriorityTier::Normal,
            RawPriority::Class(ABOVE_NORMAL_PRIORITY_CLASS) => PriorityTier::AboveNormal,
            RawPriority::Class(HIGH_PRIORITY_CLASS) => PriorityTier::High,
            RawPriority::Class(REALTIME_PRIORITY_CLASS) => PriorityTier::Realtime,
            _ => PriorityTier::Unknown,
        }
    }
}

/// Banded niceness thresholds.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixNiceTable;

impl PriorityTable for UnixNiceTable {
    fn tier(&self, raw: RawPriority) -> PriorityTier {
        match raw {
            RawPriority::Nice(nice) if nice < -10 => PriorityTier::High,
            RawPriority::Nice(nice) if nice < 0 => PriorityTier::AboveNormal,
            RawPriority::Nice(0) => PriorityTier::Normal,
            RawPriority::Nice(nice) if nice < 10 => PriorityTier::BelowNormal,
            RawPriority::Nice(_) => PriorityTier::Low,
            RawPriority::Class(_) => PriorityTier::Unknown,
        }
    }
}

/// Table matching the platform this binary was built for.
pub fn platform_table() -> &'static dyn PriorityTable {
    #[cfg(windows)]
    {
        &WindowsPriorityTable
    }

    #[cfg(not(windows))]
    {
        &UnixNiceTable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_bands() {
        let table = UnixNiceTable;
        assert_eq!(table.tier(RawPriority::Nice(-20)), PriorityTier::High);
        assert_eq!(table.tier(RawPriority::Nice(-11)), PriorityTier::High);
        assert_eq!(table.tier(RawPriority::Nice(-10)), PriorityTier::AboveNormal);
        assert_eq!(table.tier(RawPriority::Nice(-1)), PriorityTier::AboveNormal);
        assert_eq!(table.tier(RawPriority::Nice(0)), PriorityTier::Normal);
        assert_eq!(table.tier(RawPriority::Nice(1)), PriorityTier::BelowNormal);
        assert_eq!(table.tier(RawPriority::Nice(9)), PriorityTier::BelowNormal);
        assert_eq!(table.tier(RawPriority::Nice(10)), PriorityTier::Low);
        assert_eq!(table.tier(RawPriority::Nice(19)), PriorityTier::Low);
    }

    #[test]
    fn test_unix_is_monotonic_and_known() {
        let table = UnixNiceTable;
        let mut previous_rank = u8::MAX;
        for nice in -40..=40 {
            let tier = table.tier(RawPriority::Nice(nice));
            let rank = tier.rank().expect("niceness never maps to Unknown");
            assert!(
                rank <= previous_rank,
                "nice {} ranked {} above nice {}",
                nice,
                rank,
                nice - 1
            );
            previous_rank = rank;
        }
    }

    #[test]
    fn test_windows_classes() {
        let table = WindowsPriorityTable;
        let expected = [
            (IDLE_PRIORITY_CLASS, PriorityTier::Idle),
            (BELOW_NORMAL_PRIORITY_CLASS, PriorityTier::BelowNormal),
            (NORMAL_PRIORITY_CLASS, PriorityTier::Normal),
            (ABOVE_NORMAL_PRIORITY_CLASS, PriorityTier::AboveNormal),
            (HIGH_PRIORITY_CLASS, PriorityTier::High),
            (REALTIME_PRIORITY_CLASS, PriorityTier::Realtime),
        ];
        for (class, tier) in expected {
            assert_eq!(table.tier(RawPriority::Class(class)), tier);
        }
        assert_eq!(table.tier(RawPriority::Class(0x1)), PriorityTier::Unknown);
    }

    #[test]
    fn test_mismatched_raw_value_is_unknown() {
        assert_eq!(
            WindowsPriorityTable.tier(RawPriority::Nice(0)),
            PriorityTier::Unknown
        );
        assert_eq!(
            UnixNiceTable.tier(RawPriority::Class(NORMAL_PRIORITY_CLASS)),
            PriorityTier::Unknown
        );
    }

    #[test]
    fn test_platform_table_handles_native_values() {
        let table = platform_table();
        #[cfg(windows)]
        assert_eq!(
            table.tier(RawPriority::Class(NORMAL_PRIORITY_CLASS)),
            PriorityTier::Normal
        );
        #[cfg(not(windows))]
        assert_eq!(table.tier(RawPriority::Nice(0)), PriorityTier::Normal);
    }
}
