use std::path::{Path, PathBuf};

/// Owning handle to the silent intermediate video.
///
/// The file is removed when the handle drops, whichever way the run ends.
#[derive(Debug)]
pub struct IntermediateVideo {
    path: PathBuf,
}

impl IntermediateVideo {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hidden sibling of `output`, unique per process.
    pub fn path_for(output: &Path) -> PathBuf {
        let dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let stem = output
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        dir.join(format!(".{}.silent-{}.mp4", stem, std::process::id()))
    }
}

impl Drop for IntermediateVideo {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Removed intermediate video {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!(
                "Failed to remove intermediate video {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
