//! Per-person dataset folders: `<root>/<name>/NNN.jpg`.

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// JPEG quality for saved faces.
const JPEG_QUALITY: u8 = 95;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("name cannot be empty")]
    EmptyName,
    #[error("name {0:?} is not a valid folder name")]
    InvalidName(String),
    #[error("failed to prepare {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to write {path}: {source}")]
    Encode {
        path: PathBuf,
        source: image::ImageError,
    },
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> DatasetError + '_ {
    move |source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Trim a person name and make sure it maps to a single folder under the root.
pub fn validate_name(raw: &str) -> Result<String, DatasetError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DatasetError::EmptyName);
    }
    if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(DatasetError::InvalidName(name.to_string()));
    }
    Ok(name.to_string())
}

/// Result of setting up the output folder.
#[derive(Debug)]
pub enum Preparation {
    Ready(SessionDir),
    /// The folder exists and the operator chose to keep it; nothing was touched.
    Declined,
}

/// Create the session folder for `name` under `root`.
///
/// If the folder already exists, `confirm` decides between clearing it and
/// leaving it alone.
pub fn prepare_session<F>(root: &Path, name: &str, confirm: F) -> Result<Preparation, DatasetError>
where
    F: FnOnce() -> io::Result<bool>,
{
    let name = validate_name(name)?;
    fs::create_dir_all(root).map_err(io_err(root))?;

    let dir = root.join(&name);
    if dir.exists() {
        tracing::info!(path = %dir.display(), "session folder already exists");
        if !confirm().map_err(io_err(&dir))? {
            return Ok(Preparation::Declined);
        }
        let removed = clear_dir(&dir)?;
        tracing::info!(path = %dir.display(), removed, "cleared previous session");
    } else {
        fs::create_dir(&dir).map_err(io_err(&dir))?;
        tracing::debug!(path = %dir.display(), "created session folder");
    }

    Ok(Preparation::Ready(SessionDir { name, dir }))
}

/// Remove every entry inside `dir`, keeping the folder itself.
fn clear_dir(dir: &Path) -> Result<usize, DatasetError> {
    let mut removed = 0;
    for entry in fs::read_dir(dir).map_err(io_err(dir))? {
        let path = entry.map_err(io_err(dir))?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path).map_err(io_err(&path))?;
        } else {
            fs::remove_file(&path).map_err(io_err(&path))?;
        }
        removed += 1;
    }
    Ok(removed)
}

/// Output folder of one capture session.
#[derive(Debug, Clone)]
pub struct SessionDir {
    name: String,
    dir: PathBuf,
}

impl SessionDir {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// `NNN.jpg`, zero-padded to three digits.
    pub fn file_name(index: u32) -> String {
        format!("{index:03}.jpg")
    }

    pub fn image_path(&self, index: u32) -> PathBuf {
        self.dir.join(Self::file_name(index))
    }

    /// Encode `face` as JPEG under the name for `index`.
    pub fn save_face(&self, face: &RgbImage, index: u32) -> Result<PathBuf, DatasetError> {
        let path = self.image_path(index);
        let file = fs::File::create(&path).map_err(io_err(&path))?;
        let mut writer = BufWriter::new(file);
        JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY)
            .encode_image(face)
            .map_err(|source| DatasetError::Encode {
                path: path.clone(),
                source,
            })?;
        writer.flush().map_err(io_err(&path))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use tempfile::TempDir;

    fn ready(p: Preparation) -> SessionDir {
        match p {
            Preparation::Ready(s) => s,
            Preparation::Declined => panic!("expected Ready"),
        }
    }

    #[test]
    fn test_validate_name_trims() {
        assert_eq!(validate_name("  alice \n").unwrap(), "alice");
        assert_eq!(validate_name("Mary Ann").unwrap(), "Mary Ann");
    }

    #[test]
    fn test_validate_name_rejects_empty() {
        assert!(matches!(validate_name(""), Err(DatasetError::EmptyName)));
        assert!(matches!(validate_name("   \t"), Err(DatasetError::EmptyName)));
    }

    #[test]
    fn test_validate_name_rejects_path_escape() {
        for bad in ["..", ".", "a/b", "..\\x", "/etc"] {
            assert!(
                matches!(validate_name(bad), Err(DatasetError::InvalidName(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_prepare_creates_root_and_folder() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("dataset");

        let session = ready(prepare_session(&root, "alice", || panic!("no prompt expected")).unwrap());
        assert!(root.join("alice").is_dir());
        assert_eq!(session.path(), root.join("alice"));
        assert_eq!(session.name(), "alice");
    }

    #[test]
    fn test_prepare_declined_leaves_files_untouched() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("bob");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("000.jpg"), b"old face").unwrap();
        fs::write(dir.join("notes.txt"), b"keep me").unwrap();

        let result = prepare_session(tmp.path(), "bob", || Ok(false)).unwrap();
        assert!(matches!(result, Preparation::Declined));
        assert_eq!(fs::read(dir.join("000.jpg")).unwrap(), b"old face");
        assert_eq!(fs::read(dir.join("notes.txt")).unwrap(), b"keep me");
    }

    #[test]
    fn test_prepare_confirmed_clears_folder() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("carol");
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("000.jpg"), b"old").unwrap();
        fs::write(dir.join("nested").join("x"), b"old").unwrap();

        let session = ready(prepare_session(tmp.path(), "carol", || Ok(true)).unwrap());
        assert!(session.path().is_dir());
        assert_eq!(fs::read_dir(session.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_prepare_rejects_empty_name_before_touching_disk() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("dataset");
        let err = prepare_session(&root, "  ", || Ok(true)).unwrap_err();
        assert!(matches!(err, DatasetError::EmptyName));
        assert!(!root.exists());
    }

    #[test]
    fn test_file_names_are_zero_padded() {
        assert_eq!(SessionDir::file_name(0), "000.jpg");
        assert_eq!(SessionDir::file_name(7), "007.jpg");
        assert_eq!(SessionDir::file_name(99), "099.jpg");
        assert_eq!(SessionDir::file_name(1000), "1000.jpg");
    }

    #[test]
    fn test_save_face_writes_decodable_jpeg() {
        let tmp = TempDir::new().unwrap();
        let session = ready(prepare_session(tmp.path(), "dave", || Ok(true)).unwrap());
        let face = RgbImage::from_pixel(128, 128, Rgb([200, 100, 50]));

        let path = session.save_face(&face, 4).unwrap();
        assert_eq!(path, session.path().join("004.jpg"));

        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (128, 128));
        let p = decoded.get_pixel(64, 64);
        assert!((p[0] as i32 - 200).abs() < 8);
        assert!((p[2] as i32 - 50).abs() < 8);
    }
}
