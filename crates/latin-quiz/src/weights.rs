//! Category weights for the question sampler.

use latin_paradigm::Category;
use serde::Deserialize;
use thiserror::Error;

/// Preset used when the caller does not choose one.
pub const DEFAULT_PRESET: &str = "relevant";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("unknown weight preset `{0}`")]
    UnknownPreset(String),
    #[error("expected {expected} weights, got {found}")]
    WeightCount { expected: usize, found: usize },
    #[error("weight {index} must be a finite non-negative number, got {value}")]
    InvalidWeight { index: usize, value: f64 },
}

/// One weight per category, in canonical order.
#[derive(Clone, Debug, PartialEq)]
pub struct Weights([f64; Category::COUNT]);

impl Weights {
    /// Look up a named preset (case-insensitive).
    ///
    /// Names starting with `gerund` or `partizip` match their family, so
    /// `Gerundivum` and `Partizipien` work as well.
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        let name = name.trim().to_lowercase();
        let tail: [f64; 6] = match name.as_str() {
            "relevant" => return Ok(Self(relevant())),
            "zeiten" => [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            "basic" => [1.0, 1.0, 0.0, 0.0, 0.0, 0.0],
            "special" | "spezial" | "abwandlungen" => [0.0, 0.0, 1.0, 1.0, 3.0, 0.0],
            "supina" => [0.0, 0.0, 0.0, 0.0, 0.0, 1.0],
            n if n.starts_with("gerund") => [0.0, 0.0, 1.0, 1.0, 0.0, 0.0],
            n if n.starts_with("partizip") => [0.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            _ => return Err(ConfigError::UnknownPreset(name)),
        };
        let finite = if matches!(name.as_str(), "zeiten" | "basic") {
            1.0
        } else {
            0.0
        };
        let mut weights = [finite; Category::COUNT];
        weights[10..].copy_from_slice(&tail);
        Ok(Self(weights))
    }

    /// Caller-supplied weights.
    ///
    /// Takes all 16 values, or 15 when Supina is excluded; the missing
    /// Supina slot is then filled with zero. Older clients insisted on 15
    /// values whenever Supina was excluded. A full vector is accepted here
    /// as well, and the sampler zeroes the excluded slot before drawing.
    pub fn custom(values: &[f64], supine_excluded: bool) -> Result<Self, ConfigError> {
        let mut weights = [0.0; Category::COUNT];
        match values.len() {
            Category::COUNT => weights.copy_from_slice(values),
            n if n == Category::COUNT - 1 && supine_excluded => {
                weights[..n].copy_from_slice(values)
            }
            found => {
                return Err(ConfigError::WeightCount {
                    expected: if supine_excluded {
                        Category::COUNT - 1
                    } else {
                        Category::COUNT
                    },
                    found,
                });
            }
        }
        if let Some((index, &value)) = weights
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(ConfigError::InvalidWeight { index, value });
        }
        Ok(Self(weights))
    }

    pub fn get(&self, category: Category) -> f64 {
        self.0[category.index()]
    }

    /// Set a category's weight to zero.
    pub fn exclude(&mut self, category: Category) {
        self.0[category.index()] = 0.0;
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self(relevant())
    }
}

fn relevant() -> [f64; Category::COUNT] {
    let mut weights = [6.5; Category::COUNT];
    weights[10..].copy_from_slice(&[4.0, 3.0, 4.0, 6.5, 14.5, 3.0]);
    weights
}

/// Either a preset name or explicit values, as accepted from callers.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WeightSpec {
    Preset(String),
    Custom(Vec<f64>),
}

impl WeightSpec {
    pub fn resolve(&self, supine_excluded: bool) -> Result<Weights, ConfigError> {
        match self {
            WeightSpec::Preset(name) => Weights::preset(name),
            WeightSpec::Custom(values) => Weights::custom(values, supine_excluded),
        }
    }
}

impl Default for WeightSpec {
    fn default() -> Self {
        WeightSpec::Preset(DEFAULT_PRESET.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_cover_expected_slots() {
        let basic = Weights::preset("Basic").unwrap();
        assert_eq!(basic.get(Category::PresentIndicative), 1.0);
        assert_eq!(basic.get(Category::Infinitive), 1.0);
        assert_eq!(basic.get(Category::Gerund), 0.0);

        let relevant = Weights::preset("relevant").unwrap();
        assert_eq!(relevant, Weights::default());
        assert_eq!(relevant.get(Category::Participles), 14.5);
        assert_eq!(relevant.get(Category::Supine), 3.0);

        let special = Weights::preset("abwandlungen").unwrap();
        assert_eq!(special.get(Category::Participles), 3.0);
        assert_eq!(special.get(Category::Imperative), 0.0);

        assert_eq!(
            Weights::preset("Gerundivum").unwrap(),
            Weights::preset("gerund").unwrap()
        );
        assert_eq!(Weights::preset("partizipien").unwrap().as_slice()[14], 1.0);
        assert_eq!(Weights::preset("zeiten").unwrap().as_slice()[10..], [0.0; 6]);
    }

    #[test]
    fn unknown_preset_is_rejected() {
        assert_eq!(
            Weights::preset("alles"),
            Err(ConfigError::UnknownPreset("alles".into()))
        );
    }

    #[test]
    fn custom_weights_pad_missing_supine_slot() {
        let fifteen = vec![1.0; 15];
        let weights = Weights::custom(&fifteen, true).unwrap();
        assert_eq!(weights.get(Category::Supine), 0.0);
        assert_eq!(weights.get(Category::Participles), 1.0);

        assert_eq!(
            Weights::custom(&fifteen, false),
            Err(ConfigError::WeightCount {
                expected: 16,
                found: 15
            })
        );
        assert!(Weights::custom(&[1.0; 16], true).is_ok());
        assert!(matches!(
            Weights::custom(&[-1.0; 16], false),
            Err(ConfigError::InvalidWeight { index: 0, .. })
        ));
    }

    #[test]
    fn spec_deserializes_from_name_or_list() {
        let preset: WeightSpec = serde_json::from_str(r#""basic""#).unwrap();
        assert_eq!(preset, WeightSpec::Preset("basic".into()));
        let custom: WeightSpec = serde_json::from_str("[1, 2, 3]").unwrap();
        assert_eq!(
            custom.resolve(false),
            Err(ConfigError::WeightCount {
                expected: 16,
                found: 3
            })
        );
    }
}
