use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::renderer::postprocess::FxaaQuality;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default = "RenderSettings::default_shadow_map_size")]
    pub shadow_map_size: u32,
    /// 0 = logarithmic splits, 1 = uniform splits.
    #[serde(default = "RenderSettings::default_cascade_split_lambda")]
    pub cascade_split_lambda: f32,
    /// Caps the depth range the cascades cover. `None` covers the whole
    /// camera frustum.
    #[serde(default)]
    pub max_shadow_distance: Option<f32>,
    #[serde(default)]
    pub shadow_depth_bias: DepthBiasSettings,
    #[serde(default = "RenderSettings::default_clear_color")]
    pub clear_color: [f64; 4],
    #[serde(default)]
    pub post_process: PostProcessSettings,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            shadow_map_size: Self::default_shadow_map_size(),
            cascade_split_lambda: Self::default_cascade_split_lambda(),
            max_shadow_distance: None,
            shadow_depth_bias: DepthBiasSettings::default(),
            clear_color: Self::default_clear_color(),
            post_process: PostProcessSettings::default(),
        }
    }
}

impl RenderSettings {
    pub fn load() -> Self {
        Self::load_from_path("settings.json")
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Self {
        use std::fs;

        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|err| {
                warn!(
                    "Failed to parse {:?} ({}). Falling back to default render settings.",
                    path, err
                );
                RenderSettings::default()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "Render settings file {:?} not found. Using default settings.",
                    path
                );
                RenderSettings::default()
            }
            Err(err) => {
                warn!(
                    "Failed to read {:?} ({}). Falling back to default render settings.",
                    path, err
                );
                RenderSettings::default()
            }
        }
    }

    /// Parses and validates settings from a JSON document.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        let settings = serde_json::from_str::<RenderSettings>(contents)?;
        info!("Loaded render settings");
        Ok(settings.validate())
    }

    pub fn validate(mut self) -> Self {
        if self.shadow_map_size == 0 {
            warn!("Shadow map size must be greater than zero. Using default value.");
            self.shadow_map_size = Self::default_shadow_map_size();
        }

        if self.resolution.width == 0 || self.resolution.height == 0 {
            warn!("Resolution must be greater than zero. Using default resolution.");
            self.resolution = Resolution::default();
        }

        if !self.cascade_split_lambda.is_finite() {
            warn!("Cascade split lambda is not a number. Using default value.");
            self.cascade_split_lambda = Self::default_cascade_split_lambda();
        } else if !(0.0..=1.0).contains(&self.cascade_split_lambda) {
            let clamped = self.cascade_split_lambda.clamp(0.0, 1.0);
            warn!(
                "Cascade split lambda {} is outside [0, 1]. Clamping to {}.",
                self.cascade_split_lambda, clamped
            );
            self.cascade_split_lambda = clamped;
        }

        if let Some(distance) = self.max_shadow_distance {
            if !distance.is_finite() || distance <= 0.0 {
                warn!(
                    "Max shadow distance {} must be positive. Shadows will cover the whole view.",
                    distance
                );
                self.max_shadow_distance = None;
            }
        }

        if self.post_process.exposure.is_nan() || self.post_process.exposure <= 0.0 {
            warn!("Exposure must be positive. Using 1.0 instead.");
            self.post_process.exposure = PostProcessSettings::default().exposure;
        }

        self
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.resolution.width as f32 / self.resolution.height.max(1) as f32
    }

    pub fn clear_color(&self) -> wgpu::Color {
        let [r, g, b, a] = self.clear_color;
        wgpu::Color { r, g, b, a }
    }

    pub fn shadow_depth_bias(&self) -> wgpu::DepthBiasState {
        wgpu::DepthBiasState {
            constant: self.shadow_depth_bias.constant,
            slope_scale: self.shadow_depth_bias.slope_scale,
            clamp: 0.0,
        }
    }

    const fn default_shadow_map_size() -> u32 {
        2048
    }

    const fn default_cascade_split_lambda() -> f32 {
        0.5
    }

    const fn default_clear_color() -> [f64; 4] {
        [0.0, 0.0, 0.0, 1.0]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Polygon offset applied while rendering shadow depth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthBiasSettings {
    pub constant: i32,
    pub slope_scale: f32,
}

impl Default for DepthBiasSettings {
    fn default() -> Self {
        Self {
            constant: 2,
            slope_scale: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcessSettings {
    pub bloom: bool,
    pub bloom_threshold: f32,
    pub bloom_intensity: f32,
    pub exposure: f32,
    pub fxaa: FxaaQuality,
}

impl Default for PostProcessSettings {
    fn default() -> Self {
        Self {
            bloom: true,
            bloom_threshold: 1.0,
            bloom_intensity: 0.04,
            exposure: 1.0,
            fxaa: FxaaQuality::Medium,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_settings() -> RenderSettings {
        RenderSettings {
            shadow_map_size: 0,
            resolution: Resolution {
                width: 0,
                height: 0,
            },
            max_shadow_distance: Some(-1.0),
            ..RenderSettings::default()
        }
    }

    #[test]
    fn validate_replaces_invalid_values_with_defaults() {
        let validated = invalid_settings().validate();
        let defaults = RenderSettings::default();

        assert_eq!(validated.shadow_map_size, defaults.shadow_map_size);
        assert_eq!(validated.resolution, defaults.resolution);
        assert_eq!(validated.max_shadow_distance, defaults.max_shadow_distance);
        assert_eq!(validated.max_shadow_distance, None);
    }

    #[test]
    fn validate_clamps_split_lambda() {
        let high = RenderSettings {
            cascade_split_lambda: 1.7,
            ..RenderSettings::default()
        };
        assert_eq!(high.validate().cascade_split_lambda, 1.0);

        let nan = RenderSettings {
            cascade_split_lambda: f32::NAN,
            ..RenderSettings::default()
        };
        assert_eq!(nan.validate().cascade_split_lambda, 0.5);
    }

    #[test]
    fn validate_preserves_valid_values() {
        let valid = RenderSettings {
            shadow_map_size: 1024,
            cascade_split_lambda: 0.9,
            resolution: Resolution {
                width: 1920,
                height: 1080,
            },
            ..RenderSettings::default()
        };

        assert_eq!(valid.clone().validate(), valid);
    }

    #[test]
    fn partial_json_uses_field_defaults() {
        let settings =
            RenderSettings::from_json(r#"{ "shadow_map_size": 512, "post_process": { "bloom": false } }"#)
                .unwrap();
        assert_eq!(settings.shadow_map_size, 512);
        assert_eq!(settings.cascade_split_lambda, 0.5);
        assert!(!settings.post_process.bloom);
        assert_eq!(settings.post_process.fxaa, FxaaQuality::Medium);
        assert_eq!(settings.max_shadow_distance, None);
    }

    #[test]
    fn max_shadow_distance_is_opt_in() {
        assert_eq!(RenderSettings::default().max_shadow_distance, None);

        let capped = RenderSettings::from_json(r#"{ "max_shadow_distance": 60.0 }"#).unwrap();
        assert_eq!(capped.max_shadow_distance, Some(60.0));

        let infinite = RenderSettings {
            max_shadow_distance: Some(f32::INFINITY),
            ..RenderSettings::default()
        };
        assert_eq!(infinite.validate().max_shadow_distance, None);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = RenderSettings::load_from_path("does/not/exist/settings.json");
        assert_eq!(settings, RenderSettings::default());
    }
}
