use anyhow::{Context, Result};
use placer_3d::MarkerStyle;
use placer_camera::CameraSettings;
use placer_xr::{Feature, SessionInit, SimulatorSettings};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSection {
    pub title: String,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            title: "placer".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    pub path: PathBuf,
    pub scale: f32,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("assets/box.glb"),
            scale: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XrSection {
    pub enabled: bool,
    pub required_features: Vec<Feature>,
}

impl Default for XrSection {
    fn default() -> Self {
        Self {
            enabled: true,
            required_features: vec![Feature::HitTest],
        }
    }
}

impl XrSection {
    pub fn session_init(&self) -> SessionInit {
        SessionInit::requiring(self.required_features.iter().copied())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSection {
    /// Unset keeps every placed instance. Zero is rejected.
    pub max_instances: Option<NonZeroUsize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacerConfig {
    pub log_filter: String,
    pub window: WindowSection,
    pub camera: CameraSettings,
    pub model: ModelSection,
    pub marker: MarkerStyle,
    pub xr: XrSection,
    pub simulator: SimulatorSettings,
    pub scene: SceneSection,
}

impl Default for PlacerConfig {
    fn default() -> Self {
        Self {
            log_filter: "warn".into(),
            window: WindowSection::default(),
            camera: CameraSettings::default(),
            model: ModelSection::default(),
            marker: MarkerStyle::default(),
            xr: XrSection::default(),
            simulator: SimulatorSettings::default(),
            scene: SceneSection::default(),
        }
    }
}

impl PlacerConfig {
    pub const DEFAULT_PATH: &'static str = "placer.toml";

    /// An explicit path must exist. Without one, `placer.toml` in the working
    /// directory is used when present, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(Self::DEFAULT_PATH);
                if !fallback.exists() {
                    return Ok(Self::default());
                }
                fallback
            }
        };
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}
