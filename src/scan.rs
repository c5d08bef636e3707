use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// File extensions considered to be images, compared ASCII case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif"];

/// Whether `file_name` ends with a `.` followed by one of [`IMAGE_EXTENSIONS`].
pub fn is_image_name(file_name: &str) -> bool {
    has_extension(file_name, IMAGE_EXTENSIONS)
}

/// List the regular files directly inside `dir` whose names end with one of `extensions`.
///
/// Listing the directory is fatal; nothing is recursed into. When `sort` is set the
/// result is ordered by file name, otherwise it follows the platform's listing order.
pub fn list_files(dir: &Path, extensions: &[&str], sort: bool) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|err| Error::io(dir, err))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| Error::io(dir, err))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| has_extension(name, extensions));
        if matches {
            files.push(path);
        }
    }

    if sort {
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    }

    Ok(files)
}

/// List image files in `dir`. See [`list_files`].
pub fn list_images(dir: &Path, sort: bool) -> Result<Vec<PathBuf>> {
    list_files(dir, IMAGE_EXTENSIONS, sort)
}

fn has_extension(file_name: &str, extensions: &[&str]) -> bool {
    let Some((stem, ext)) = file_name.rsplit_once('.') else {
        return false;
    };
    !stem.is_empty() && extensions.iter().any(|known| ext.eq_ignore_ascii_case(known))
}
