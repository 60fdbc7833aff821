//! TTL urgency scales.
//!
//! Two scales coexist on purpose and use different inputs:
//! - [`UrgencyTier`] is keyed on raw `ttl_left` seconds and drives row classification.
//! - [`BarColor`] is keyed on the bar fill percentage and drives the bar color.

use serde::Serialize;

/// Baseline used to scale the TTL bar before any lock/renew has been issued.
pub const DEFAULT_REFERENCE_MAX: f64 = 30.0;

const CRITICAL_MAX_SECS: f64 = 3.0;
const WARNING_MAX_SECS: f64 = 10.0;
const HEALTHY_MIN_PCT: f64 = 33.0;
const CAUTION_MIN_PCT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyTier {
    Ok,
    Warning,
    Critical,
}

impl UrgencyTier {
    pub fn from_ttl(ttl_left: f64) -> Self {
        if ttl_left <= CRITICAL_MAX_SECS {
            UrgencyTier::Critical
        } else if ttl_left <= WARNING_MAX_SECS {
            UrgencyTier::Warning
        } else {
            UrgencyTier::Ok
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UrgencyTier::Ok => "ok",
            UrgencyTier::Warning => "warning",
            UrgencyTier::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BarColor {
    Healthy,
    Caution,
    Danger,
}

impl BarColor {
    pub fn from_intensity(intensity_pct: f64) -> Self {
        if intensity_pct > HEALTHY_MIN_PCT {
            BarColor::Healthy
        } else if intensity_pct > CAUTION_MIN_PCT {
            BarColor::Caution
        } else {
            BarColor::Danger
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BarColor::Healthy => "healthy",
            BarColor::Caution => "caution",
            BarColor::Danger => "danger",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TtlClass {
    pub tier: UrgencyTier,
    pub intensity_pct: f64,
}

impl TtlClass {
    pub fn bar_color(&self) -> BarColor {
        BarColor::from_intensity(self.intensity_pct)
    }
}

/// Maps remaining seconds onto an urgency tier and a bar fill in `[0, 100]`.
///
/// A non-positive `reference_max` yields an empty bar; there is nothing to scale against.
pub fn classify(ttl_left: f64, reference_max: f64) -> TtlClass {
    let intensity_pct = if reference_max > 0.0 && ttl_left.is_finite() {
        (ttl_left / reference_max).clamp(0.0, 1.0) * 100.0
    } else {
        0.0
    };
    TtlClass {
        tier: UrgencyTier::from_ttl(ttl_left),
        intensity_pct,
    }
}

/// How the bar baseline is chosen each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferencePolicy {
    /// Follow the TTL of the most recent successful lock/renew.
    #[default]
    LastAction,
    /// Use the largest TTL present in the snapshot being rendered.
    SnapshotMax,
}

impl ReferencePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "last-action" | "last_action" | "action" => Some(ReferencePolicy::LastAction),
            "snapshot-max" | "snapshot_max" | "snapshot" => Some(ReferencePolicy::SnapshotMax),
            _ => None,
        }
    }

    /// Baseline for one cycle. `SnapshotMax` falls back to `last_action` on an empty snapshot.
    pub fn reference_for(self, last_action: f64, snapshot_ttls: &[i64]) -> f64 {
        match self {
            ReferencePolicy::LastAction => last_action,
            ReferencePolicy::SnapshotMax => snapshot_ttls
                .iter()
                .copied()
                .max()
                .filter(|max| *max > 0)
                .map(|max| max as f64)
                .unwrap_or(last_action),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_boundaries() {
        assert_eq!(UrgencyTier::from_ttl(-5.0), UrgencyTier::Critical);
        assert_eq!(UrgencyTier::from_ttl(3.0), UrgencyTier::Critical);
        assert_eq!(UrgencyTier::from_ttl(3.5), UrgencyTier::Warning);
        assert_eq!(UrgencyTier::from_ttl(10.0), UrgencyTier::Warning);
        assert_eq!(UrgencyTier::from_ttl(11.0), UrgencyTier::Ok);
    }

    #[test]
    fn bar_color_uses_percent_not_seconds() {
        // 5s against a 10s baseline is a warning row with a healthy bar.
        let class = classify(5.0, 10.0);
        assert_eq!(class.tier, UrgencyTier::Warning);
        assert_eq!(class.bar_color(), BarColor::Healthy);

        assert_eq!(BarColor::from_intensity(33.0), BarColor::Caution);
        assert_eq!(BarColor::from_intensity(10.0), BarColor::Danger);
        assert_eq!(BarColor::from_intensity(10.1), BarColor::Caution);
    }

    #[test]
    fn critical_lock_against_default_reference() {
        let class = classify(2.0, DEFAULT_REFERENCE_MAX);
        assert_eq!(class.tier, UrgencyTier::Critical);
        assert!((class.intensity_pct - 6.666).abs() < 0.01);
        assert_eq!(class.bar_color(), BarColor::Danger);
    }

    #[test]
    fn intensity_is_clamped_and_monotonic() {
        let mut last = -1.0;
        for ttl in -10..=100 {
            let pct = classify(ttl as f64, 30.0).intensity_pct;
            assert!((0.0..=100.0).contains(&pct));
            assert!(pct >= last, "intensity regressed at ttl={ttl}");
            last = pct;
        }
        assert_eq!(classify(90.0, 30.0).intensity_pct, 100.0);
    }

    #[test]
    fn non_positive_reference_empties_bar() {
        assert_eq!(classify(20.0, 0.0).intensity_pct, 0.0);
        assert_eq!(classify(20.0, -3.0).intensity_pct, 0.0);
    }

    #[test]
    fn snapshot_policy_falls_back_when_empty() {
        assert_eq!(ReferencePolicy::SnapshotMax.reference_for(30.0, &[]), 30.0);
        assert_eq!(ReferencePolicy::SnapshotMax.reference_for(30.0, &[-1, 0]), 30.0);
        assert_eq!(ReferencePolicy::SnapshotMax.reference_for(30.0, &[4, 120, 9]), 120.0);
        assert_eq!(ReferencePolicy::LastAction.reference_for(45.0, &[120]), 45.0);
        assert_eq!(
            ReferencePolicy::parse("Snapshot-Max"),
            Some(ReferencePolicy::SnapshotMax)
        );
        assert_eq!(ReferencePolicy::parse("bogus"), None);
    }
}
