use crate::error::PersistenceError;
use crate::object_detection::detection_result::{DetectionResult, ObjectLocation};
use image::RgbImage;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// One coordinate log line: `"<name>\t(<x>,<y>)"`. Images without the target are written with
/// the `(-1,-1)` sentinel.
pub fn format_log_line(name: &str, location: &ObjectLocation) -> String {
    format!("{}\t{}", name, location.logged_point())
}

/// Appends one line to the coordinate log, creating the file and its directory if needed.
pub fn append_coordinate(
    log_path: &Path,
    name: &str,
    location: &ObjectLocation,
) -> Result<(), PersistenceError> {
    let to_error = |source: std::io::Error| PersistenceError::CoordsLog {
        path: log_path.to_path_buf(),
        source,
    };
    create_parent_dir(log_path).map_err(to_error)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(to_error)?;
    writeln!(file, "{}", format_log_line(name, location)).map_err(to_error)?;
    Ok(())
}

/// Writes an image, the format is picked from the file extension.
pub fn save_image(image: &RgbImage, image_path: &Path) -> Result<(), PersistenceError> {
    create_parent_dir(image_path).map_err(|source| PersistenceError::CreateDir {
        path: image_path.to_path_buf(),
        source,
    })?;
    image
        .save(image_path)
        .map_err(|source| PersistenceError::ImageWrite {
            path: image_path.to_path_buf(),
            source,
        })
}

fn create_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

impl DetectionResult {
    /// Saves the image to `image_path` and logs its coordinate under the image's file name.
    ///
    /// The coordinate is logged even when the image cannot be written. If both fail the image
    /// error is returned.
    pub fn save(&self, image_path: &Path, coords_log: &Path) -> Result<(), PersistenceError> {
        let image_saved = save_image(&self.image, image_path);
        let name = image_path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();
        let logged = append_coordinate(coords_log, &name, &self.location);
        image_saved?;
        logged?;
        debug!("Saved {:?}, logged to {:?}", image_path, coords_log);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::point::Point;

    #[test]
    fn log_line_format() {
        let found = ObjectLocation::Found(Point::new(304, 117));
        assert_eq!(format_log_line("bat_01.png", &found), "bat_01.png\t(304,117)");
        assert_eq!(
            format_log_line("empty.png", &ObjectLocation::NotFound),
            "empty.png\t(-1,-1)"
        );
    }

    #[test]
    fn save_writes_image_and_appends_log() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("Output/Images/bat.png");
        let coords_log = dir.path().join("Output/coords.txt");

        let first = DetectionResult {
            image: RgbImage::new(4, 4),
            location: ObjectLocation::Found(Point::new(1, 2)),
        };
        first.save(&image_path, &coords_log).unwrap();
        let second = DetectionResult {
            image: RgbImage::new(4, 4),
            location: ObjectLocation::NotFound,
        };
        second
            .save(&dir.path().join("Output/Images/none.png"), &coords_log)
            .unwrap();

        assert!(image_path.is_file());
        let log = fs::read_to_string(&coords_log).unwrap();
        assert_eq!(log, "bat.png\t(1,2)\nnone.png\t(-1,-1)\n");
    }

    #[test]
    fn coordinate_is_logged_when_image_write_fails() {
        let dir = tempfile::tempdir().unwrap();
        let coords_log = dir.path().join("coords.txt");
        let result = DetectionResult {
            image: RgbImage::new(4, 4),
            location: ObjectLocation::Found(Point::new(3, 1)),
        };
        // No encoder is registered for this extension.
        let err = result
            .save(&dir.path().join("bat.nope"), &coords_log)
            .unwrap_err();
        assert!(matches!(err, PersistenceError::ImageWrite { .. }));
        let log = fs::read_to_string(&coords_log).unwrap();
        assert_eq!(log, "bat.nope\t(3,1)\n");
    }

    #[test]
    fn unwritable_log_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending.
        let err = append_coordinate(dir.path(), "a.png", &ObjectLocation::NotFound).unwrap_err();
        assert!(matches!(err, PersistenceError::CoordsLog { .. }));
    }
}
