//! Conversions between raw actuator positions and percentages.
//!
//! The appliance reports positions in `0..=0xC800` (51200), i.e. 512 raw
//! units per percent. Relative movements are encoded around `0xCCE8`,
//! ten units per percent step in either direction.

use serde::{Deserialize, Serialize};

/// Largest absolute raw position.
pub const MAX_RAW: u16 = 0xC800;

/// Raw units per percent.
pub const RAW_PER_PERCENT: u16 = 512;

/// Neutral point of relative movements (±0%).
pub const RELATIVE_ZERO: u16 = 0xCCE8;

/// Raw units per percent of a relative movement.
pub const RELATIVE_PER_PERCENT: u16 = 10;

/// Direction in which a percentage maps onto the raw range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PercentRange {
    /// 0% is raw 0.
    #[default]
    Ascending,
    /// 0% is raw 51200.
    Descending,
}

/// Raw position for a percentage, `None` above 100%.
pub fn percent_to_raw(percent: u8, range: PercentRange) -> Option<u16> {
    if percent > 100 {
        return None;
    }
    let percent = match range {
        PercentRange::Ascending => percent,
        PercentRange::Descending => 100 - percent,
    };
    Some(u16::from(percent) * RAW_PER_PERCENT)
}

/// Percentage of a raw position, `None` outside `0..=51200`.
///
/// The remainder rounds up only when it exceeds half a percent.
pub fn raw_to_percent(raw: u16, range: PercentRange) -> Option<u8> {
    if raw > MAX_RAW {
        return None;
    }
    let quotient = raw / RAW_PER_PERCENT;
    let rounded = if raw % RAW_PER_PERCENT > RAW_PER_PERCENT / 2 {
        quotient + 1
    } else {
        quotient
    };
    // rounded <= 100 for raw <= MAX_RAW
    let rounded = rounded as u8;
    Some(match range {
        PercentRange::Ascending => rounded,
        PercentRange::Descending => 100 - rounded,
    })
}

/// Target for a relative movement of `step` percent (clamped to 100).
pub fn relative_target(up: bool, step: u8) -> u16 {
    let delta = u16::from(step.min(100)) * RELATIVE_PER_PERCENT;
    if up {
        RELATIVE_ZERO + delta
    } else {
        RELATIVE_ZERO - delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_to_raw() {
        assert_eq!(percent_to_raw(0, PercentRange::Ascending), Some(0));
        assert_eq!(percent_to_raw(50, PercentRange::Ascending), Some(25600));
        assert_eq!(percent_to_raw(100, PercentRange::Ascending), Some(MAX_RAW));
        assert_eq!(percent_to_raw(25, PercentRange::Descending), Some(38400));
        assert_eq!(percent_to_raw(101, PercentRange::Ascending), None);
    }

    #[test]
    fn test_raw_to_percent_rounding() {
        assert_eq!(raw_to_percent(512 + 256, PercentRange::Ascending), Some(1));
        assert_eq!(raw_to_percent(512 + 257, PercentRange::Ascending), Some(2));
        assert_eq!(raw_to_percent(MAX_RAW, PercentRange::Ascending), Some(100));
        assert_eq!(raw_to_percent(MAX_RAW, PercentRange::Descending), Some(0));
        assert_eq!(raw_to_percent(0, PercentRange::Descending), Some(100));
    }

    #[test]
    fn test_raw_outside_range() {
        // 0xD200 means "stop", not a position
        assert_eq!(raw_to_percent(0xD200, PercentRange::Ascending), None);
        assert_eq!(raw_to_percent(MAX_RAW + 1, PercentRange::Ascending), None);
    }

    #[test]
    fn test_relative_target() {
        assert_eq!(relative_target(true, 10), 52556);
        assert_eq!(relative_target(false, 10), 52356);
        assert_eq!(relative_target(true, 100), 0xD0D0);
        assert_eq!(relative_target(false, 200), 0xC900);
        assert_eq!(relative_target(true, 0), RELATIVE_ZERO);
    }
}
