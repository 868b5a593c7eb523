use std::fmt::{Debug, Formatter, Result as FormatResult};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Error as IoError, ErrorKind as IoErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

/// Locations of key files inside one key directory
#[derive(Clone, PartialEq, Eq)]
pub struct KeyFiles {
    directory: PathBuf,
}

impl KeyFiles {
    const PRIVATE_KEY_NAME: &'static str = "private.key";
    const PUBLIC_KEY_NAME: &'static str = "public.key";
    const SYMMETRIC_KEY_NAME: &'static str = "symmetric.json";

    pub fn new<T>(directory: T) -> KeyFiles where T: Into<PathBuf> {
        KeyFiles { directory: directory.into() }
    }

    pub fn create_dir(&self) -> Result<(), IoError> {
        std::fs::create_dir_all(&self.directory)
    }

    #[inline]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    #[inline]
    pub fn private_key(&self) -> PathBuf {
        self.directory.join(KeyFiles::PRIVATE_KEY_NAME)
    }

    #[inline]
    pub fn public_key(&self) -> PathBuf {
        self.directory.join(KeyFiles::PUBLIC_KEY_NAME)
    }

    #[inline]
    pub fn symmetric_key(&self) -> PathBuf {
        self.directory.join(KeyFiles::SYMMETRIC_KEY_NAME)
    }
}

impl Debug for KeyFiles {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        write!(f, "KeyFiles({})", self.directory.display())
    }
}

#[cfg(unix)]
fn open_for_write(path: &Path, secret: bool) -> Result<File, IoError> {
    use std::fs::Permissions;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut options = OpenOptions::new();
    options.write(true).create(true);
    if !secret {
        return options.open(path);
    }
    let file = options.mode(0o600).open(path)?;
    // mode only applies on creation, existing files are reset
    file.set_permissions(Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_for_write(path: &Path, _secret: bool) -> Result<File, IoError> {
    OpenOptions::new().write(true).create(true).open(path)
}

fn write_locked(path: &Path, data: &[u8], secret: bool) -> Result<(), IoError> {
    // NB: truncation waits for the lock so readers never see a partial file
    let file = open_for_write(path, secret)?;
    file.lock_exclusive()?;
    file.set_len(0)?;
    let mut writer = BufWriter::new(&file);
    writer.write_all(data)?;
    writer.flush()?;
    drop(writer);
    file.unlock()?;
    debug!("Saved {} bytes to {}", data.len(), path.display());
    Ok(())
}

pub fn save_bytes<T>(path: T, data: &[u8]) -> Result<(), IoError> where T: AsRef<Path> {
    write_locked(path.as_ref(), data, false)
}

/// Like `save_bytes` but readable by the owner only, for private and symmetric keys
pub fn save_secret_bytes<T>(path: T, data: &[u8]) -> Result<(), IoError> where T: AsRef<Path> {
    write_locked(path.as_ref(), data, true)
}

pub fn load_bytes<T>(path: T) -> Result<Vec<u8>, IoError> where T: AsRef<Path> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(IoError::new(IoErrorKind::NotFound, "key path is not a file"));
    }
    let file = File::open(path)?;
    file.lock_shared()?;
    let size = file.metadata()?.len() as usize;
    let mut contents = Vec::with_capacity(size);
    let mut reader = BufReader::new(&file);
    reader.read_to_end(&mut contents)?;
    file.unlock()?;
    Ok(contents)
}

pub fn save_text<T>(path: T, text: &str) -> Result<(), IoError> where T: AsRef<Path> {
    save_bytes(path, text.as_bytes())
}

pub fn save_secret_text<T>(path: T, text: &str) -> Result<(), IoError> where T: AsRef<Path> {
    save_secret_bytes(path, text.as_bytes())
}

pub fn load_text<T>(path: T) -> Result<String, IoError> where T: AsRef<Path> {
    let contents = load_bytes(path)?;
    String::from_utf8(contents)
        .map_err(|e| IoError::new(IoErrorKind::InvalidData, e))
}
