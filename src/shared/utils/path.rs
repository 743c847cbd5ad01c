use dirs::home_dir;
use std::path::{Path, PathBuf};

/// Expands a leading `~` or `~/` to the home directory. `~user` forms are left untouched.
pub fn expand_tilde(path: &str) -> PathBuf {
    let Some(home) = home_dir() else {
        return PathBuf::from(path);
    };

    match path {
        "~" => home,
        _ => match path.strip_prefix("~/") {
            Some(rest) => home.join(rest),
            None => PathBuf::from(path),
        },
    }
}

/// Renders a path for user-facing messages, abbreviating the home directory to `~`.
pub fn contract_tilde(path: &Path) -> String {
    let display = path.to_string_lossy().into_owned();

    let Some(home) = home_dir() else {
        return display;
    };

    match path.strip_prefix(&home) {
        Ok(rest) if rest.as_os_str().is_empty() => "~".to_string(),
        Ok(rest) => format!("~/{}", rest.to_string_lossy()),
        Err(_) => display,
    }
}

/// File name of a note without its extension, e.g. `Daily-20250106` for
/// `~/vault/Daily-20250106.md`.
pub fn note_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}
