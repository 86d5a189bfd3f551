use serde::Serialize;
use strum::Display;

/// Vargha-Delaney magnitude of an A measure's distance from 0.5
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum EffectSize {
    Negligible,
    Small,
    Medium,
    Large,
}

impl EffectSize {
    /// Classify `|A - 0.5|` using the published cutoffs 0.06, 0.14 and 0.21
    pub fn from_distance(distance: f64) -> Self {
        if distance < 0.06 {
            EffectSize::Negligible
        } else if distance < 0.14 {
            EffectSize::Small
        } else if distance < 0.21 {
            EffectSize::Medium
        } else {
            EffectSize::Large
        }
    }
}

/// Outcome of comparing two samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Comparison {
    /// Mann-Whitney U of the first sample
    pub u_statistic: f64,
    /// Two-sided p-value
    pub p_value: f64,
    /// Vargha-Delaney A, `U / (n1 * n2)`
    pub effect_size: f64,
    pub label: EffectSize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_render_for_reports() {
        assert_eq!(EffectSize::Negligible.to_string(), "Negligible");
        assert_eq!(EffectSize::Large.to_string(), "Large");
        assert_eq!(serde_json::to_value(EffectSize::Medium).unwrap(), "Medium");
    }
}
