use std::{path::Path, time::Duration};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    animation::{AnimationConfig, BezierCurve},
    model::{ForceSplit, TreeSettings},
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Fallback animation duration in milliseconds.
    #[serde(default = "default_duration")]
    pub duration: u64,
    #[serde(default = "yes")]
    pub tile_by_default: bool,
    /// Fallback curve, `[p1x, p1y, p2x, p2y]`.
    #[serde(default = "default_bezier")]
    pub bezier: [f32; 4],
    #[serde(default = "default_gaps_in")]
    pub gaps_in: i32,
    #[serde(default = "default_gaps_out")]
    pub gaps_out: i32,
    #[serde(default)]
    pub preserve_split: bool,
    #[serde(default)]
    pub smart_split: bool,
    #[serde(default = "default_split_width_multiplier")]
    pub split_width_multiplier: f32,
    #[serde(default)]
    pub force_split: ForceSplit,
    #[serde(default = "default_popin_percent")]
    pub popin_percent: f32,
    #[serde(default)]
    pub animations: Animations,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Animations {
    #[serde(default)]
    pub enter: AnimationOverride,
    #[serde(default)]
    pub exit: AnimationOverride,
    #[serde(default)]
    pub movement: AnimationOverride,
}

/// Timing for one animation category. Zero values inherit from the top-level
/// `duration` and `bezier`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AnimationOverride {
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub bezier: [f32; 4],
}

impl AnimationOverride {
    fn has_curve(&self) -> bool {
        self.bezier.iter().any(|&c| c != 0.0)
    }
}

fn yes() -> bool {
    true
}

fn default_duration() -> u64 {
    300
}

fn default_bezier() -> [f32; 4] {
    [0.05, 0.9, 0.1, 1.05]
}

fn default_gaps_in() -> i32 {
    5
}

fn default_gaps_out() -> i32 {
    10
}

fn default_split_width_multiplier() -> f32 {
    1.0
}

fn default_popin_percent() -> f32 {
    0.8
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
        Self::parse(&buf).with_context(|| format!("parsing {path:?}"))
    }

    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        Ok(toml::from_str(buf)?)
    }

    pub fn default() -> Config {
        Self::parse(include_str!("../swoop.default.toml")).expect("bundled config parses")
    }

    /// Resolves the file to the settings a layout tree runs with.
    pub fn tree_settings(&self) -> TreeSettings {
        TreeSettings {
            enter: self.animation(&self.animations.enter),
            exit: self.animation(&self.animations.exit),
            movement: self.animation(&self.animations.movement),
            gaps_in: self.gaps_in,
            gaps_out: self.gaps_out,
            preserve_split: self.preserve_split,
            split_width_multiplier: self.split_width_multiplier,
            force_split: self.force_split,
            smart_split: self.smart_split,
            popin_scale: self.popin_percent,
        }
    }

    fn animation(&self, category: &AnimationOverride) -> AnimationConfig {
        let ms = match category.duration {
            0 => self.duration,
            ms => ms,
        };
        let points = if category.has_curve() { category.bezier } else { self.bezier };
        AnimationConfig::new(BezierCurve::from(points), Duration::from_millis(ms))
    }

    /// Validates the configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.gaps_in < 0 {
            issues.push(format!("gaps_in must be non-negative, got {}", self.gaps_in));
        }
        if self.gaps_out < 0 {
            issues.push(format!("gaps_out must be non-negative, got {}", self.gaps_out));
        }
        if !(self.split_width_multiplier > 0.0) {
            issues.push(format!(
                "split_width_multiplier must be positive, got {}",
                self.split_width_multiplier
            ));
        }
        if !(self.popin_percent > 0.0 && self.popin_percent <= 1.0) {
            issues.push(format!(
                "popin_percent must be in (0, 1], got {}",
                self.popin_percent
            ));
        }

        let curves = [
            ("bezier", Some(&self.bezier)),
            ("animations.enter.bezier", self.animations.enter.has_curve().then_some(&self.animations.enter.bezier)),
            ("animations.exit.bezier", self.animations.exit.has_curve().then_some(&self.animations.exit.bezier)),
            (
                "animations.movement.bezier",
                self.animations.movement.has_curve().then_some(&self.animations.movement.bezier),
            ),
        ];
        for (name, points) in curves {
            let Some(&[p1x, _, p2x, _]) = points else { continue };
            if !(0.0..=1.0).contains(&p1x) || !(0.0..=1.0).contains(&p2x) {
                issues.push(format!(
                    "{name} x coordinates must be in [0, 1], got {p1x} and {p2x}"
                ));
            }
        }

        issues
    }

    /// Clamps invalid values into range. Returns the number of fixes applied.
    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;

        for gap in [&mut self.gaps_in, &mut self.gaps_out] {
            if *gap < 0 {
                *gap = 0;
                fixes += 1;
            }
        }
        if !(self.split_width_multiplier > 0.0) {
            self.split_width_multiplier = default_split_width_multiplier();
            fixes += 1;
        }
        if !(self.popin_percent > 0.0) {
            self.popin_percent = default_popin_percent();
            fixes += 1;
        } else if self.popin_percent > 1.0 {
            self.popin_percent = 1.0;
            fixes += 1;
        }

        let Animations { enter, exit, movement } = &mut self.animations;
        for points in [&mut self.bezier, &mut enter.bezier, &mut exit.bezier, &mut movement.bezier] {
            for x in [0, 2] {
                let clamped = if points[x].is_nan() { 0.0 } else { points[x].clamp(0.0, 1.0) };
                if clamped != points[x] {
                    points[x] = clamped;
                    fixes += 1;
                }
            }
        }

        fixes
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn default_config_parses() {
        let config = Config::default();
        assert_eq!(config, Config::parse("").unwrap());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn defaults_resolve_to_tree_defaults() {
        let settings = Config::default().tree_settings();
        let expected = AnimationConfig::new(
            BezierCurve::new(0.05, 0.9, 0.1, 1.05),
            Duration::from_millis(300),
        );
        assert_eq!(settings.enter, expected);
        assert_eq!(settings.exit, expected);
        assert_eq!(settings.movement, expected);
        assert_eq!(
            TreeSettings { enter: expected, exit: expected, movement: expected, ..Default::default() },
            settings
        );
    }

    #[test]
    fn category_overrides() {
        let config = Config::parse(
            r#"
            duration = 200
            bezier = [0.25, 0.1, 0.25, 1.0]

            [animations.enter]
            duration = 120

            [animations.movement]
            bezier = [0.4, 0.0, 0.2, 1.0]
            "#,
        )
        .unwrap();
        let settings = config.tree_settings();
        assert_eq!(
            settings.enter,
            AnimationConfig::new(BezierCurve::new(0.25, 0.1, 0.25, 1.0), Duration::from_millis(120))
        );
        assert_eq!(
            settings.exit,
            AnimationConfig::new(BezierCurve::new(0.25, 0.1, 0.25, 1.0), Duration::from_millis(200))
        );
        assert_eq!(
            settings.movement,
            AnimationConfig::new(BezierCurve::new(0.4, 0.0, 0.2, 1.0), Duration::from_millis(200))
        );
    }

    #[test]
    fn layout_options() {
        let config = Config::parse(
            r#"
            gaps_in = 0
            gaps_out = 20
            preserve_split = true
            smart_split = true
            split_width_multiplier = 1.5
            force_split = "second"
            popin_percent = 0.5
            tile_by_default = false
            "#,
        )
        .unwrap();
        let settings = config.tree_settings();
        assert_eq!(settings.gaps_in, 0);
        assert_eq!(settings.gaps_out, 20);
        assert!(settings.preserve_split);
        assert!(settings.smart_split);
        assert_eq!(settings.split_width_multiplier, 1.5);
        assert_eq!(settings.force_split, ForceSplit::Second);
        assert_eq!(settings.popin_scale, 0.5);
        assert!(!config.tile_by_default);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(Config::parse("gaps = 3").is_err());
        assert!(Config::parse("force_split = \"left\"").is_err());
        assert!(Config::parse("[animations.fade]\nduration = 3").is_err());
    }

    #[test]
    fn read_reports_path() {
        let err = Config::read(Path::new("/nonexistent/swoop.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/swoop.toml"), "{err:#}");
    }

    #[test]
    fn validate_and_fix() {
        let mut config = Config::parse(
            r#"
            gaps_in = -4
            gaps_out = -1
            split_width_multiplier = 0.0
            popin_percent = 1.5
            bezier = [1.2, 0.0, -0.5, 1.0]

            [animations.exit]
            bezier = [0.5, 0.5, 3.0, 1.0]
            "#,
        )
        .unwrap();
        let issues = config.validate();
        assert_eq!(issues.len(), 6, "{issues:#?}");

        assert_eq!(config.auto_fix_values(), 7);
        assert!(config.validate().is_empty(), "{:#?}", config.validate());
        assert_eq!((config.gaps_in, config.gaps_out), (0, 0));
        assert_eq!(config.split_width_multiplier, 1.0);
        assert_eq!(config.popin_percent, 1.0);
        assert_eq!(config.bezier, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(config.animations.exit.bezier, [0.5, 0.5, 1.0, 1.0]);
        assert_eq!(config.auto_fix_values(), 0);
    }
}
