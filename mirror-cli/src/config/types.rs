use mirror_core::{KurentoConfig, OverlayImage};
use serde::{Deserialize, Serialize};

/// Default bind address for the signaling server
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default port for the signaling server
pub const DEFAULT_PORT: u16 = 8443;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawMirrorConfig {
    #[serde(default)]
    pub server: RawServerConfig,

    #[serde(default)]
    pub kurento: RawKurentoConfig,

    #[serde(default)]
    pub overlay: RawOverlayConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawKurentoConfig {
    pub url: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub keepalive_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawOverlayConfig {
    pub image_uri: Option<String>,
    pub offset_x: Option<f32>,
    pub offset_y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MirrorConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub kurento: KurentoConfig,

    #[serde(default)]
    pub overlay: OverlaySection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    /// Address the signaling server binds to
    pub host: String,

    /// Port the signaling server listens on
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Image drawn over detected faces, positioned relative to the face box
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverlaySection {
    pub image_uri: String,
    pub offset_x: f32,
    pub offset_y: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for OverlaySection {
    fn default() -> Self {
        OverlayImage::default().into()
    }
}

impl From<OverlayImage> for OverlaySection {
    fn from(image: OverlayImage) -> Self {
        Self {
            image_uri: image.uri,
            offset_x: image.offset_x,
            offset_y: image.offset_y,
            width: image.width,
            height: image.height,
        }
    }
}

impl From<&OverlaySection> for OverlayImage {
    fn from(section: &OverlaySection) -> Self {
        OverlayImage {
            uri: section.image_uri.clone(),
            offset_x: section.offset_x,
            offset_y: section.offset_y,
            width: section.width,
            height: section.height,
        }
    }
}

impl MirrorConfig {
    pub fn server_config(&self) -> mirror_server::ServerConfig {
        mirror_server::ServerConfig::new(self.server.host.clone(), self.server.port)
    }

    pub fn overlay_image(&self) -> OverlayImage {
        (&self.overlay).into()
    }
}
