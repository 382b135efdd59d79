use once_cell::sync::Lazy;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

/// Overrides the directory holding the catalog and config file.
pub const HOME_ENV: &str = "EVENT_ADVISOR_HOME";

const APP_DIR: &str = "event-advisor";

static DATA_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    let root = resolve_data_root(env::var_os(HOME_ENV).map(PathBuf::from), dirs::data_dir());
    if let Err(err) = fs::create_dir_all(&root) {
        tracing::warn!(path = %root.display(), "cannot create data directory: {err}");
    }
    root
});

fn resolve_data_root(home: Option<PathBuf>, platform_data: Option<PathBuf>) -> PathBuf {
    match (home, platform_data) {
        (Some(home), _) if !home.as_os_str().is_empty() => home,
        (_, Some(data)) => data.join(APP_DIR),
        _ => PathBuf::from(".").join(APP_DIR),
    }
}

pub fn data_root() -> &'static Path {
    &DATA_ROOT
}

pub fn database_path() -> PathBuf {
    data_root().join("events.sqlite")
}

pub fn config_path() -> PathBuf {
    data_root().join("config.json")
}

/// Creates the directory a catalog or config file will live in. Failures are
/// logged; the subsequent open reports the real error.
pub fn ensure_parent(path: &Path) {
    let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) else {
        return;
    };
    if let Err(err) = fs::create_dir_all(parent) {
        tracing::warn!(path = %parent.display(), "cannot create directory: {err}");
    }
}

/// Shows the last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{tail}", "*".repeat(chars.len() - 4))
}
