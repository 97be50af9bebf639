//! Utility functions for file handling and common operations

use crate::{PileupError, PileupResult};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Check if a file is gzip compressed
pub fn is_gzipped<P: AsRef<Path>>(path: P) -> PileupResult<bool> {
    let mut file = File::open(path)?;
    let mut buffer = [0; 2];

    match file.read_exact(&mut buffer) {
        Ok(()) => Ok(buffer == [0x1f, 0x8b]),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(PileupError::Io(e)),
    }
}

/// Validate file paths and check if they exist
pub fn validate_file_exists<P: AsRef<Path>>(path: P) -> PileupResult<()> {
    if !path.as_ref().exists() {
        return Err(PileupError::FileNotFound(
            path.as_ref().to_string_lossy().to_string(),
        ));
    }
    Ok(())
}

/// Validate that a file is readable
pub fn validate_file_readable<P: AsRef<Path>>(path: P) -> PileupResult<()> {
    validate_file_exists(&path)?;

    File::open(&path)
        .map_err(|_| PileupError::FileNotFound(path.as_ref().to_string_lossy().to_string()))?;

    Ok(())
}

/// Validate that an output directory already exists
pub fn validate_dir_exists<P: AsRef<Path>>(path: P) -> PileupResult<()> {
    if !path.as_ref().is_dir() {
        return Err(PileupError::DirNotFound(
            path.as_ref().to_string_lossy().to_string(),
        ));
    }
    Ok(())
}

/// Timer utility for measuring execution time
pub struct Timer {
    start: std::time::Instant,
    name: String,
}

impl Timer {
    pub fn new(name: &str) -> Self {
        log::info!("Starting timer: {}", name);
        Timer {
            start: std::time::Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }

    pub fn log_elapsed(&self) {
        let duration = self.elapsed();
        log::info!("Timer '{}' elapsed: {:.2?}", self.name, duration);
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.log_elapsed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_is_gzipped() {
        // Test with a regular file
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "test content").unwrap();
        assert_eq!(is_gzipped(temp_file.path()).unwrap(), false);

        // Test with gzipped content
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(&[0x1f, 0x8b]).unwrap();
        assert_eq!(is_gzipped(temp_file.path()).unwrap(), true);
    }

    #[test]
    fn test_validate_file_exists() {
        let temp_file = NamedTempFile::new().unwrap();
        assert!(validate_file_exists(temp_file.path()).is_ok());

        assert!(validate_file_exists("/nonexistent/file").is_err());
    }

    #[test]
    fn test_validate_dir_exists() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(validate_dir_exists(temp_dir.path()).is_ok());

        assert!(validate_dir_exists("/nonexistent/dir").is_err());

        // A file is not a directory
        let temp_file = NamedTempFile::new().unwrap();
        assert!(validate_dir_exists(temp_file.path()).is_err());
    }

    #[test]
    fn test_timer() {
        let timer = Timer::new("test");
        std::thread::sleep(std::time::Duration::from_millis(1));
        assert!(timer.elapsed().as_millis() >= 1);
    }
}
