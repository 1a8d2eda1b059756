use reqsmith::{InstallerConfig, PackageManager};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes `content` to `dir/name`, creating parent directories
#[allow(dead_code)]
pub fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Filtered requirements files left behind in `dir`
#[allow(dead_code)]
pub fn filtered_leftovers(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map_or(false, |name| name.starts_with(".reqsmith-"))
        })
        .collect()
}

#[allow(dead_code)]
pub fn pip_config() -> InstallerConfig {
    InstallerConfig {
        package_manager: PackageManager::Pip,
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[allow(dead_code)]
pub fn reqsmith_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_reqsmith"))
}
