//! Service configuration read from `ISSUER_*` environment variables.
//!
//! Every variable is optional. A value that does not parse is logged with
//! `warn!` and replaced by its default.

use crate::pipeline::compose::PageSize;
use crate::pipeline::raster::PRINT_DPI;
use crate::pipeline::scheduler::DEFAULT_YIELD_EVERY;
use log::{info, warn};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub verify_base_url: String,
    pub font_path: Option<PathBuf>,
    pub yield_every: usize,
    pub dpi: f32,
    pub issuer_label: String,
    pub page: PageSize,
    pub json_limit_mb: usize,
    /// Finished jobs kept for status and download before the oldest is dropped.
    pub retain_jobs: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_path: PathBuf::from("issuer.sqlite"),
            verify_base_url: "http://127.0.0.1:8080/verify".to_string(),
            font_path: None,
            yield_every: DEFAULT_YIELD_EVERY,
            dpi: PRINT_DPI,
            issuer_label: "Issuer".to_string(),
            page: PageSize::default(),
            json_limit_mb: 25,
            retain_jobs: 32,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let page = match (
            positive(parsed(&lookup, "ISSUER_PAGE_WIDTH_PT", defaults.page.width_pt)),
            positive(parsed(&lookup, "ISSUER_PAGE_HEIGHT_PT", defaults.page.height_pt)),
        ) {
            (Some(width_pt), Some(height_pt)) => PageSize {
                width_pt,
                height_pt,
            },
            _ => {
                warn!("page size must be positive, using {:?}", defaults.page);
                defaults.page
            }
        };

        let yield_every = match parsed(&lookup, "ISSUER_YIELD_EVERY", defaults.yield_every) {
            0 => {
                warn!("ISSUER_YIELD_EVERY must be at least 1, using {}", DEFAULT_YIELD_EVERY);
                DEFAULT_YIELD_EVERY
            }
            n => n,
        };
        let retain_jobs = match parsed(&lookup, "ISSUER_RETAIN_JOBS", defaults.retain_jobs) {
            0 => {
                warn!("ISSUER_RETAIN_JOBS must be at least 1, using {}", defaults.retain_jobs);
                defaults.retain_jobs
            }
            n => n,
        };
        let dpi = positive(parsed(&lookup, "ISSUER_DPI", defaults.dpi)).unwrap_or_else(|| {
            warn!("ISSUER_DPI must be positive, using {}", PRINT_DPI);
            PRINT_DPI
        });

        Self {
            host: lookup("ISSUER_HOST").unwrap_or(defaults.host),
            port: parsed(&lookup, "ISSUER_PORT", defaults.port),
            database_path: lookup("ISSUER_DATABASE")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            verify_base_url: lookup("ISSUER_VERIFY_BASE_URL").unwrap_or(defaults.verify_base_url),
            font_path: lookup("ISSUER_FONT_PATH").map(PathBuf::from),
            yield_every,
            dpi,
            issuer_label: lookup("ISSUER_LABEL").unwrap_or(defaults.issuer_label),
            page,
            json_limit_mb: parsed(&lookup, "ISSUER_JSON_LIMIT_MB", defaults.json_limit_mb),
            retain_jobs,
        }
    }

    /// Loads the assets named by the configuration. A font that cannot be
    /// read or parsed is logged and the bundled face is used instead.
    pub fn load_assets(&self) -> RenderAssets {
        let font = self.font_path.as_ref().and_then(|path| match std::fs::read(path) {
            Ok(bytes) => match ttf_parser::Face::parse(&bytes, 0) {
                Ok(face) => {
                    info!(
                        "loaded font {} ({} glyphs)",
                        path.display(),
                        face.number_of_glyphs()
                    );
                    Some(Arc::new(bytes))
                }
                Err(e) => {
                    warn!("{} is not a usable font: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                warn!("could not read font {}: {}", path.display(), e);
                None
            }
        });
        if font.is_none() {
            info!("text is drawn with the bundled DejaVu Sans face");
        }
        RenderAssets { font }
    }
}

/// Shared, read-only inputs to every rasterizer the service creates.
#[derive(Debug, Clone, Default)]
pub struct RenderAssets {
    pub font: Option<Arc<Vec<u8>>>,
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("invalid value {:?} for {}, using {:?}", raw, key, default);
            default
        }),
    }
}

fn positive(value: f32) -> Option<f32> {
    (value.is_finite() && value > 0.0).then_some(value)
}
