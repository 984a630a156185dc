use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::parser::ParseError;
use crate::program::Program;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("path {} can't be found", .0.display())]
    NotFound(PathBuf),
    #[error("cannot read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

/// Everything parsed under a path.
#[derive(Debug)]
pub struct Scan {
    pub program: Program,
    /// One entry per file that failed to parse; those files contribute no
    /// blocks.
    pub errors: Vec<ParseError>,
}

/// Parse a single file, or every file under a directory whose extension is
/// in `extensions`. Directories are visited in file-name order.
pub fn scan_path(root: &Path, extensions: &[String]) -> Result<Scan, ScanError> {
    if !root.exists() {
        return Err(ScanError::NotFound(root.to_path_buf()));
    }

    let paths = if root.is_file() {
        vec![root.to_path_buf()]
    } else {
        let mut paths = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
                paths.push(entry.into_path());
            }
        }
        paths
    };

    let mut program = Program::new();
    let mut errors = Vec::new();
    for path in paths {
        let source = std::fs::read_to_string(&path).map_err(|source| ScanError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "scanning");
        if let Err(error) = program.add_file(path.display().to_string(), source) {
            warn!(path = %path.display(), %error, "skipping file");
            errors.push(error);
        }
    }

    Ok(Scan { program, errors })
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|wanted| wanted == ext))
}
