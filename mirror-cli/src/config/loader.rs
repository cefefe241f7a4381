use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use mirror_core::KurentoConfig;

use super::types::{
    DEFAULT_HOST, DEFAULT_PORT, MirrorConfig, OverlaySection, RawKurentoConfig, RawMirrorConfig,
    RawOverlayConfig, RawServerConfig, ServerSection,
};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<MirrorConfig> {
        Self::load_from(
            Self::user_config_path().as_deref(),
            &Self::project_config_path(),
        )
    }

    /// Load merged configuration from explicit file locations
    ///
    /// Missing files are skipped; a file that exists but does not parse is
    /// an error.
    pub fn load_from(user_path: Option<&Path>, project_path: &Path) -> Result<MirrorConfig> {
        let mut raw = RawMirrorConfig::default();

        // Layer 1: User config
        if let Some(user_path) = user_path
            && let Some(user_config) = Self::read_layer(user_path)?
        {
            raw = Self::merge_raw(raw, user_config);
        }

        // Layer 2: Project config
        if let Some(project_config) = Self::read_layer(project_path)? {
            raw = Self::merge_raw(raw, project_config);
        }

        Ok(Self::finalize(raw))
    }

    fn read_layer(path: &Path) -> Result<Option<RawMirrorConfig>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let raw = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(raw))
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "magic-mirror").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    /// Can be overridden with MAGIC_MIRROR_PROJECT_CONFIG_DIR
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("MAGIC_MIRROR_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".magic-mirror/config.toml")
        }
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawMirrorConfig, overlay: RawMirrorConfig) -> RawMirrorConfig {
        RawMirrorConfig {
            server: RawServerConfig {
                host: overlay.server.host.or(base.server.host),
                port: overlay.server.port.or(base.server.port),
            },
            kurento: RawKurentoConfig {
                url: overlay.kurento.url.or(base.kurento.url),
                request_timeout_ms: overlay
                    .kurento
                    .request_timeout_ms
                    .or(base.kurento.request_timeout_ms),
                keepalive_interval_ms: overlay
                    .kurento
                    .keepalive_interval_ms
                    .or(base.kurento.keepalive_interval_ms),
            },
            overlay: RawOverlayConfig {
                image_uri: overlay.overlay.image_uri.or(base.overlay.image_uri),
                offset_x: overlay.overlay.offset_x.or(base.overlay.offset_x),
                offset_y: overlay.overlay.offset_y.or(base.overlay.offset_y),
                width: overlay.overlay.width.or(base.overlay.width),
                height: overlay.overlay.height.or(base.overlay.height),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawMirrorConfig) -> MirrorConfig {
        let kurento_defaults = KurentoConfig::default();
        let overlay_defaults = OverlaySection::default();

        MirrorConfig {
            server: ServerSection {
                host: raw.server.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port: raw.server.port.unwrap_or(DEFAULT_PORT),
            },
            kurento: KurentoConfig {
                url: raw.kurento.url.unwrap_or(kurento_defaults.url),
                request_timeout_ms: raw
                    .kurento
                    .request_timeout_ms
                    .unwrap_or(kurento_defaults.request_timeout_ms),
                keepalive_interval_ms: raw
                    .kurento
                    .keepalive_interval_ms
                    .unwrap_or(kurento_defaults.keepalive_interval_ms),
            },
            overlay: OverlaySection {
                image_uri: raw.overlay.image_uri.unwrap_or(overlay_defaults.image_uri),
                offset_x: raw.overlay.offset_x.unwrap_or(overlay_defaults.offset_x),
                offset_y: raw.overlay.offset_y.unwrap_or(overlay_defaults.offset_y),
                width: raw.overlay.width.unwrap_or(overlay_defaults.width),
                height: raw.overlay.height.unwrap_or(overlay_defaults.height),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_files_give_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ConfigLoader::load_from(
            Some(&dir.path().join("user.toml")),
            &dir.path().join("project.toml"),
        )
        .unwrap();
        assert_eq!(config, MirrorConfig::default());
    }

    #[test]
    fn project_overrides_user() {
        let dir = TempDir::new().unwrap();
        let user = write(
            &dir,
            "user.toml",
            r#"
            [server]
            port = 9000
            host = "0.0.0.0"

            [kurento]
            url = "ws://user-kms:8888/kurento"
            "#,
        );
        let project = write(
            &dir,
            "project.toml",
            r#"
            [server]
            port = 9100
            "#,
        );

        let config = ConfigLoader::load_from(Some(&user), &project).unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.kurento.url, "ws://user-kms:8888/kurento");
    }

    #[test]
    fn overlay_fields_merge_individually() {
        let dir = TempDir::new().unwrap();
        let user = write(
            &dir,
            "user.toml",
            r#"
            [overlay]
            image_uri = "http://example.com/hat.png"
            "#,
        );
        let project = write(
            &dir,
            "project.toml",
            r#"
            [overlay]
            offset_y = -1.5
            "#,
        );

        let config = ConfigLoader::load_from(Some(&user), &project).unwrap();

        assert_eq!(config.overlay.image_uri, "http://example.com/hat.png");
        assert_eq!(config.overlay.offset_y, -1.5);
        assert_eq!(config.overlay.width, OverlaySection::default().width);
    }

    #[test]
    fn unparseable_file_names_its_path() {
        let dir = TempDir::new().unwrap();
        let project = write(&dir, "project.toml", "[server\nport = ");

        let error = ConfigLoader::load_from(None, &project).unwrap_err();

        assert!(format!("{:#}", error).contains("project.toml"));
    }

    #[test]
    fn project_path_defaults_to_dot_directory() {
        if std::env::var("MAGIC_MIRROR_PROJECT_CONFIG_DIR").is_err() {
            assert_eq!(
                ConfigLoader::project_config_path(),
                PathBuf::from(".magic-mirror/config.toml")
            );
        }
    }
}
