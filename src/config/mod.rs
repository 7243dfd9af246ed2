//! Configuration module for the signal engine.

pub mod analysis;

mod debug; // Private: callers go through crate::config::DEBUG_FLAGS
pub use debug::DEBUG_FLAGS;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

// Re-export commonly used items
pub use analysis::{
    ConfidenceSettings, CooldownSettings, DecisionStyle, EntryMode, IndicatorSettings, IMPULSE,
    Mode, RiskSettings, SCALP, STRUCTURE, SWING, ScoreSettings, StrategyConfig, StructureSettings,
    TimeframeWeights, TrendGateSettings, ZoneSettings,
};

/// Recursively overlay `patch` onto `base`. Objects merge key by key, any other
/// value replaces what was there.
fn merge_json(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Apply a (possibly partial) JSON override to a preset.
pub fn apply_overrides(preset: StrategyConfig, overrides: Value) -> Result<StrategyConfig> {
    let mut merged = serde_json::to_value(preset).context("serialising preset")?;
    merge_json(&mut merged, overrides);
    let config: StrategyConfig =
        serde_json::from_value(merged).context("override does not describe a valid strategy config")?;
    config.validate()?;
    Ok(config)
}

/// Load the preset for `mode`, then overlay the JSON file at `path` if given.
pub fn load_config(mode: Mode, path: Option<&Path>) -> Result<StrategyConfig> {
    let preset = mode.config();
    let Some(path) = path else {
        return Ok(preset);
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config override {}", path.display()))?;
    let overrides: Value = serde_json::from_str(&text)
        .with_context(|| format!("parsing config override {}", path.display()))?;
    let config = apply_overrides(preset, overrides)?;
    log::info!("Loaded {} preset with overrides from {}", mode, path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partial_override_keeps_the_rest() {
        let cfg = apply_overrides(
            SWING,
            json!({ "risk": { "min_reward_risk": 3.5 }, "cooldown": { "enabled": false } }),
        )
        .unwrap();
        assert_eq!(cfg.risk.min_reward_risk, 3.5);
        assert!(!cfg.cooldown.enabled);
        assert_eq!(cfg.risk.sl_atr_multiple, SWING.risk.sl_atr_multiple);
        assert_eq!(cfg.gate, SWING.gate);
    }

    #[test]
    fn test_bad_override_is_rejected() {
        let result = apply_overrides(SWING, json!({ "min_bars": "lots" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_override_must_validate() {
        let result = apply_overrides(SWING, json!({ "risk": { "tick_min": 2.0 } }));
        assert!(result.is_err(), "tick_min above tick_max");
    }

    #[test]
    fn test_no_path_returns_preset() {
        let cfg = load_config(Mode::Structure, None).unwrap();
        assert_eq!(cfg, STRUCTURE);
    }
}
