//! Saved sessions keep the source images, not the derived cloud, so a reload
//! rebuilds the point cloud locally without calling the depth generator again.

use std::{
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    raster,
    reconstruct::{self, PointCloud, ReconstructOptions, StylizationMode},
    types::RasterImage,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSettings {
    pub density: f32,
    pub max_dimension: u32,
    #[serde(default)]
    pub mode: StylizationMode,
    #[serde(default)]
    pub background_threshold: Option<f32>,
}

impl SessionSettings {
    pub fn reconstruct_options(&self) -> ReconstructOptions {
        ReconstructOptions {
            density: self.density,
            mode: self.mode,
            background_threshold: self.background_threshold,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// PNG data URI.
    pub color_image: String,
    /// PNG data URI.
    pub depth_image: String,
    pub created_at_ms: u64,
    pub settings: SessionSettings,
}

impl SessionRecord {
    pub fn capture(
        color: &RasterImage,
        depth: &RasterImage,
        settings: SessionSettings,
    ) -> Result<Self> {
        let created_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Ok(Self {
            color_image: raster::to_data_uri(color)?,
            depth_image: raster::to_data_uri(depth)?,
            created_at_ms,
            settings,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json =
            serde_json::to_vec_pretty(self).map_err(|err| Error::Session(err.to_string()))?;
        std::fs::write(path, json)?;
        log::info!("saved session to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|err| Error::Session(err.to_string()))
    }

    pub fn images(&self) -> Result<(RasterImage, RasterImage)> {
        let color = raster::load(self.color_image.as_bytes())?;
        let depth = raster::load(self.depth_image.as_bytes())?;
        Ok((color, depth))
    }

    /// Rebuilds the point cloud from the stored images and settings.
    pub fn regenerate(&self) -> Result<PointCloud> {
        let (color, depth) = self.images()?;
        reconstruct::reconstruct(&color, &depth, &self.settings.reconstruct_options())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!(
            "depth_lens_{name}_{}_{}.json",
            std::process::id(),
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ))
    }

    #[test]
    fn save_load_regenerate() {
        let color = RasterImage::new(2, 2, [255u8, 0, 0, 255].repeat(4)).unwrap();
        let depth = RasterImage::from_gray(2, 2, &[0, 64, 128, 255]).unwrap();
        let settings = SessionSettings {
            density: 1.0,
            max_dimension: 128,
            mode: StylizationMode::Voxel,
            background_threshold: None,
        };
        let record = SessionRecord::capture(&color, &depth, settings).unwrap();
        assert!(record.created_at_ms > 0);

        let path = temp_path("session");
        record.save(&path).unwrap();
        let loaded = SessionRecord::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, record);
        let (c, d) = loaded.images().unwrap();
        assert_eq!(c, color);
        assert_eq!(d, depth);

        let cloud = loaded.regenerate().unwrap();
        let direct =
            reconstruct::reconstruct(&color, &depth, &loaded.settings.reconstruct_options())
                .unwrap();
        assert_eq!(cloud, direct);
    }

    #[test]
    fn record_uses_camel_case_keys() {
        let json = serde_json::json!({
            "colorImage": "data:image/png;base64,",
            "depthImage": "data:image/png;base64,",
            "createdAtMs": 1,
            "settings": { "density": 0.5, "maxDimension": 64 }
        });
        let record: SessionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.settings.mode, StylizationMode::PointCloud);
        assert_eq!(record.settings.background_threshold, None);
        assert!(record.images().is_err());
    }

    #[test]
    fn background_threshold_survives_a_reload() {
        let color = RasterImage::new(4, 1, [0u8, 200, 0, 255].repeat(4)).unwrap();
        let depth = RasterImage::from_gray(4, 1, &[0, 10, 128, 255]).unwrap();
        let settings = SessionSettings {
            density: 1.0,
            max_dimension: 64,
            mode: StylizationMode::PointCloud,
            background_threshold: Some(0.1),
        };
        let built = reconstruct::reconstruct(&color, &depth, &settings.reconstruct_options())
            .unwrap();
        assert_eq!(built.count(), 2);

        let path = temp_path("threshold");
        SessionRecord::capture(&color, &depth, settings)
            .unwrap()
            .save(&path)
            .unwrap();
        let loaded = SessionRecord::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.settings.background_threshold, Some(0.1));
        assert_eq!(loaded.regenerate().unwrap(), built);
    }

    #[test]
    fn garbage_file_is_session_error() {
        let path = temp_path("garbage");
        std::fs::write(&path, b"{ not json").unwrap();
        let err = SessionRecord::load(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, Error::Session(_)));
    }
}
