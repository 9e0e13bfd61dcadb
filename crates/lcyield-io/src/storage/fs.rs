use std::fs::{self, File};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::storage::Storage;

/// Local filesystem storage (rooted at the host filesystem).
#[derive(Debug, Clone, Default)]
pub struct FsStorage;

impl FsStorage {
    pub fn new() -> Self {
        Self
    }
}

fn io_err(op: &str, path: &str, e: std::io::Error) -> Error {
    if e.kind() == ErrorKind::NotFound {
        Error::NotFound(path.to_string())
    } else {
        Error::Storage(format!("{op} {path}: {e}"))
    }
}

impl Storage for FsStorage {
    fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let p = Path::new(path);
        if let Some(parent) = p.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| io_err("mkparent", path, e))?;
            }
        }
        let mut f = File::create(p).map_err(|e| io_err("create", path, e))?;
        f.write_all(bytes).map_err(|e| io_err("write", path, e))?;
        f.flush().map_err(|e| io_err("flush", path, e))?;
        Ok(())
    }

    fn read_range(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut f = File::open(Path::new(path)).map_err(|e| io_err("open", path, e))?;
        f.seek(SeekFrom::Start(offset))
            .map_err(|e| io_err("seek", path, e))?;
        let mut buf = vec![0u8; len];
        f.read_exact(&mut buf).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                Error::Storage(format!("{path}: short read of {len} bytes at offset {offset}"))
            } else {
                io_err("read", path, e)
            }
        })?;
        Ok(buf)
    }

    fn delete(&self, path: &str) -> Result<()> {
        match fs::remove_file(Path::new(path)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err("delete", path, e)),
        }
    }

    fn exists(&self, path: &str) -> Result<bool> {
        Ok(Path::new(path).is_file())
    }

    fn size(&self, path: &str) -> Result<u64> {
        let meta = fs::metadata(Path::new(path)).map_err(|e| io_err("size", path, e))?;
        Ok(meta.len())
    }
}
