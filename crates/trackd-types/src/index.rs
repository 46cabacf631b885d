//! Global index namespaces.

use std::fmt;

/// The four independent global namespaces a device can own slots in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexKind {
    Tracker,
    Button,
    Valuator,
    Haptic,
}

impl IndexKind {
    /// All namespaces in allocation order.
    pub const ALL: [IndexKind; 4] = [
        IndexKind::Tracker,
        IndexKind::Button,
        IndexKind::Valuator,
        IndexKind::Haptic,
    ];

    /// Lowercase name used in messages and configuration keys.
    pub fn as_str(self) -> &'static str {
        match self {
            IndexKind::Tracker => "tracker",
            IndexKind::Button => "button",
            IndexKind::Valuator => "valuator",
            IndexKind::Haptic => "haptic feature",
        }
    }

    /// Configuration key of the base index for this namespace.
    pub fn base_key(self) -> &'static str {
        match self {
            IndexKind::Tracker => "trackerIndexBase",
            IndexKind::Button => "buttonIndexBase",
            IndexKind::Valuator => "valuatorIndexBase",
            IndexKind::Haptic => "hapticFeatureIndexBase",
        }
    }

    /// Prefix of the per-slot override key, e.g. `trackerIndex3`.
    pub fn slot_key(self) -> &'static str {
        match self {
            IndexKind::Tracker => "trackerIndex",
            IndexKind::Button => "buttonIndex",
            IndexKind::Valuator => "valuatorIndex",
            IndexKind::Haptic => "hapticFeatureIndex",
        }
    }

    /// Key of the slot count.
    pub fn count_key(self) -> &'static str {
        match self {
            IndexKind::Tracker => "numTrackers",
            IndexKind::Button => "numButtons",
            IndexKind::Valuator => "numValuators",
            IndexKind::Haptic => "numHapticFeatures",
        }
    }

    /// Key of the optional slot name list.
    pub fn names_key(self) -> &'static str {
        match self {
            IndexKind::Tracker => "trackerNames",
            IndexKind::Button => "buttonNames",
            IndexKind::Valuator => "valuatorNames",
            IndexKind::Haptic => "hapticFeatureNames",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_keys() {
        assert_eq!(IndexKind::Valuator.base_key(), "valuatorIndexBase");
        assert_eq!(format!("{}{}", IndexKind::Tracker.slot_key(), 2), "trackerIndex2");
        assert_eq!(IndexKind::Haptic.count_key(), "numHapticFeatures");
        assert_eq!(IndexKind::Button.to_string(), "button");
    }
}
