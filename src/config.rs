use crate::calendar::{WorkCalendar, WorkCalendarConfig};
use crate::error::ScheduleError;
use crate::task::ProjectId;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub const HTTP_ADDR_VAR: &str = "SITE_SCHEDULE_HTTP_ADDR";
pub const DB_VAR: &str = "SITE_SCHEDULE_DB";
pub const CALENDAR_VAR: &str = "SITE_SCHEDULE_CALENDAR";
pub const PROJECT_VAR: &str = "SITE_SCHEDULE_PROJECT";

const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SITE_SCHEDULE_HTTP_ADDR={value} is not a socket address: {source}")]
    InvalidAddr {
        value: String,
        #[source]
        source: AddrParseError,
    },
    #[error("SITE_SCHEDULE_PROJECT: {0}")]
    InvalidProject(ScheduleError),
    #[error("cannot read calendar file {path}: {source}")]
    CalendarFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("calendar file {path} is not valid calendar json: {source}")]
    CalendarJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("calendar file {path}: {error}")]
    Calendar { path: PathBuf, error: ScheduleError },
}

/// Settings shared by the binaries, read from `SITE_SCHEDULE_*` variables.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub http_addr: SocketAddr,
    pub db_path: Option<PathBuf>,
    pub calendar_path: Option<PathBuf>,
    pub project_id: Option<ProjectId>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let addr = get(HTTP_ADDR_VAR).unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string());
        let http_addr = addr
            .trim()
            .parse()
            .map_err(|source| ConfigError::InvalidAddr {
                value: addr.clone(),
                source,
            })?;

        let project_id = get(PROJECT_VAR)
            .map(|raw| ProjectId::from_str(raw.trim()))
            .transpose()
            .map_err(ConfigError::InvalidProject)?;

        Ok(Self {
            http_addr,
            db_path: get(DB_VAR).map(PathBuf::from),
            calendar_path: get(CALENDAR_VAR).map(PathBuf::from),
            project_id,
        })
    }

    /// The configured calendar, or the Mon-Fri default when no file is set.
    pub fn load_calendar(&self) -> Result<WorkCalendar, ConfigError> {
        let Some(path) = &self.calendar_path else {
            return Ok(WorkCalendar::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::CalendarFile {
            path: path.clone(),
            source,
        })?;
        let config: WorkCalendarConfig =
            serde_json::from_str(&raw).map_err(|source| ConfigError::CalendarJson {
                path: path.clone(),
                source,
            })?;
        WorkCalendar::from_config(&config).map_err(|error| ConfigError::Calendar {
            path: path.clone(),
            error,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            db_path: None,
            calendar_path: None,
            project_id: None,
        }
    }
}

/// Install a stderr subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive`. Safe to call more than once.
#[cfg(any(feature = "cli_api", feature = "http_api"))]
pub fn init_tracing(default_directive: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
