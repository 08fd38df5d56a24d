// src/infra/paths.rs — Config path resolution
//
// DOSSIER_HOME overrides everything; otherwise config lives in ~/.dossier/.

use std::path::PathBuf;

fn dossier_home() -> Option<PathBuf> {
    std::env::var_os("DOSSIER_HOME").map(PathBuf::from)
}

/// Configuration directory: $DOSSIER_HOME/ or ~/.dossier/
pub fn config_dir() -> PathBuf {
    if let Some(home) = dossier_home() {
        return home;
    }
    dirs_home().join(".dossier")
}

/// Path of the config file inside the config directory.
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

fn dirs_home() -> PathBuf {
    directories::BaseDirs::new()
        .expect("Could not determine home directory")
        .home_dir()
        .to_path_buf()
}
