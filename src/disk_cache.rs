//! Disk Cache
//!
//! Persists compiled bytecode between runs so that a warm start does not
//! invoke the compiler at all.
//!
//! # Layout
//!
//! ```text
//! <root>/info.json
//! <root>/<Family>/<hash:032x>.<vso|pso|cso>
//! ```
//!
//! # Keying
//!
//! The entry hash is an xxh3-128 over every input that can change the
//! bytecode: the cache format version, class, family, descriptor, target
//! profile, the full define list (by name, so symbol ids never leak into the
//! key), the family source file and every file under the shader root and
//! the extra include directories. Editing any of them simply produces a
//! different key; stale entries are never read.
//!
//! # Integrity
//!
//! Each entry starts with a fixed [`EntryHeader`] carrying a magic, the
//! format version, the payload length and an xxh3-64 of the payload. A
//! mismatch means the file was truncated or tampered with: the entry is
//! deleted and [`KilnError::DiskCacheCorrupt`] is returned so the caller can
//! fall back to compiling.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bytemuck::{Pod, Zeroable};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;
use xxhash_rust::xxh3::{Xxh3, xxh3_64, xxh3_128};

use crate::compiler::CompileRequest;
use crate::defines::ShaderDefines;
use crate::descriptor::{ShaderClass, ShaderFamily};
use crate::errors::{KilnError, Result};

/// Bumped whenever the key derivation or entry format changes.
pub const FORMAT_VERSION: u32 = 1;

const MAGIC: [u8; 4] = *b"KLNB";
const INFO_FILE: &str = "info.json";

/// Fixed prefix of every entry file.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct EntryHeader {
    pub magic: [u8; 4],
    pub version: u32,
    pub payload_len: u64,
    pub checksum: u64,
}

impl EntryHeader {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    fn for_payload(payload: &[u8]) -> Self {
        Self {
            magic: MAGIC,
            version: FORMAT_VERSION,
            payload_len: payload.len() as u64,
            checksum: xxh3_64(payload),
        }
    }
}

/// Contents of `info.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheInfo {
    pub version: u32,
    pub global_defines: Vec<(String, String)>,
}

impl CacheInfo {
    fn current(global_defines: &ShaderDefines) -> Self {
        Self {
            version: FORMAT_VERSION,
            global_defines: global_defines
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// Bytecode store keyed by content hash.
pub struct DiskCache {
    root: PathBuf,
    shader_root: PathBuf,
    include_dirs: Vec<PathBuf>,
    global_defines: ShaderDefines,
    /// Memoized content hashes of source files and of the include tree.
    source_hashes: RwLock<FxHashMap<PathBuf, u128>>,
    include_hash: RwLock<Option<u128>>,
    /// Bumped by every invalidation.
    epoch: AtomicU64,
}

impl DiskCache {
    #[must_use]
    pub fn new(
        root: impl Into<PathBuf>,
        shader_root: impl Into<PathBuf>,
        include_dirs: Vec<PathBuf>,
        global_defines: ShaderDefines,
    ) -> Self {
        Self {
            root: root.into(),
            shader_root: shader_root.into(),
            include_dirs,
            global_defines,
            source_hashes: RwLock::new(FxHashMap::default()),
            include_hash: RwLock::new(None),
            epoch: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Forgets memoized source hashes; the next key derivation re-reads the
    /// files. Hashes computed concurrently from the old contents are not
    /// memoized.
    pub fn invalidate_sources(&self) {
        let mut sources = self.source_hashes.write();
        let mut tree = self.include_hash.write();
        self.epoch.fetch_add(1, Ordering::AcqRel);
        sources.clear();
        *tree = None;
    }

    fn source_hash(&self, path: &Path) -> Result<u128> {
        if let Some(&hash) = self.source_hashes.read().get(path) {
            return Ok(hash);
        }
        let epoch = self.epoch.load(Ordering::Acquire);
        let contents = fs::read(path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => KilnError::MissingSource(path.to_path_buf()),
            _ => KilnError::Io(err),
        })?;
        let hash = xxh3_128(&contents);
        self.memoize_source(path, hash, epoch);
        Ok(hash)
    }

    fn memoize_source(&self, path: &Path, hash: u128, epoch: u64) {
        let mut sources = self.source_hashes.write();
        if self.epoch.load(Ordering::Acquire) == epoch {
            sources.insert(path.to_path_buf(), hash);
        }
    }

    /// Hash of everything a source can include: the whole shader root (the
    /// compiler resolves includes relative to the including file) plus any
    /// extra include directory outside it.
    fn include_tree_hash(&self) -> Result<u128> {
        if let Some(hash) = *self.include_hash.read() {
            return Ok(hash);
        }
        let epoch = self.epoch.load(Ordering::Acquire);

        let mut hasher = Xxh3::new();
        self.hash_tree(&mut hasher, &self.shader_root)?;
        for dir in &self.include_dirs {
            if !dir.starts_with(&self.shader_root) {
                self.hash_tree(&mut hasher, dir)?;
            }
        }

        let hash = hasher.digest128();
        self.memoize_tree(hash, epoch);
        Ok(hash)
    }

    fn memoize_tree(&self, hash: u128, epoch: u64) {
        let mut tree = self.include_hash.write();
        if self.epoch.load(Ordering::Acquire) == epoch {
            *tree = Some(hash);
        }
    }

    fn hash_tree(&self, hasher: &mut Xxh3, dir: &Path) -> Result<()> {
        if !dir.is_dir() {
            return Ok(());
        }
        // The cache may live inside the shader root; its entries are outputs.
        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.path() != self.root);
        for entry in walker {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
            hasher.update(relative.to_string_lossy().as_bytes());
            hasher.update(&fs::read(entry.path())?);
        }
        Ok(())
    }

    /// Derives the entry hash for a request.
    pub fn key(&self, request: &CompileRequest<'_>) -> Result<u128> {
        let source = self.source_hash(request.source_path)?;
        let includes = self.include_tree_hash()?;

        let mut hasher = Xxh3::new();
        hasher.update(&FORMAT_VERSION.to_le_bytes());
        hasher.update(&[request.class as u8]);
        hasher.update(&request.family.id().to_le_bytes());
        hasher.update(&request.descriptor.raw().to_le_bytes());
        hasher.update(request.class.profile().as_bytes());
        hasher.update(&[u8::from(request.debug)]);
        request.defines.write_stable(&mut |chunk| hasher.update(chunk));
        hasher.update(&source.to_le_bytes());
        hasher.update(&includes.to_le_bytes());
        Ok(hasher.digest128())
    }

    #[must_use]
    pub fn entry_path(&self, family: ShaderFamily, class: ShaderClass, hash: u128) -> PathBuf {
        self.root
            .join(family.name())
            .join(format!("{hash:032x}.{}", class.extension()))
    }

    /// Reads an entry. `Ok(None)` if it does not exist; a corrupt entry is
    /// deleted and reported as an error.
    pub fn load(&self, family: ShaderFamily, class: ShaderClass, hash: u128) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(family, class, hash);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        match Self::decode(&bytes) {
            Ok(payload) => Ok(Some(payload.to_vec())),
            Err(reason) => {
                let _ = fs::remove_file(&path);
                Err(KilnError::DiskCacheCorrupt { path, reason })
            }
        }
    }

    fn decode(bytes: &[u8]) -> std::result::Result<&[u8], String> {
        if bytes.len() < EntryHeader::SIZE {
            return Err(format!("truncated header ({} bytes)", bytes.len()));
        }
        let (head, payload) = bytes.split_at(EntryHeader::SIZE);
        let header: EntryHeader = bytemuck::pod_read_unaligned(head);

        if header.magic != MAGIC {
            return Err("bad magic".to_string());
        }
        if header.version != FORMAT_VERSION {
            return Err(format!("format version {} != {FORMAT_VERSION}", header.version));
        }
        if header.payload_len != payload.len() as u64 {
            return Err(format!(
                "payload length {} != header {}",
                payload.len(),
                header.payload_len
            ));
        }
        if header.checksum != xxh3_64(payload) {
            return Err("checksum mismatch".to_string());
        }
        Ok(payload)
    }

    /// Writes an entry atomically (temp file + rename).
    pub fn store(&self, family: ShaderFamily, class: ShaderClass, hash: u128, bytecode: &[u8]) -> Result<()> {
        let path = self.entry_path(family, class, hash);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let header = EntryHeader::for_payload(bytecode);
        let mut contents = Vec::with_capacity(EntryHeader::SIZE + bytecode.len());
        contents.extend_from_slice(bytemuck::bytes_of(&header));
        contents.extend_from_slice(bytecode);

        let tmp = path.with_extension(format!("{}.tmp", std::process::id()));
        fs::write(&tmp, &contents)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Checks `info.json` against the current format and global defines.
    /// A missing or different info wipes the cache. Returns `true` if the
    /// existing cache was kept.
    pub fn validate(&self) -> Result<bool> {
        let expected = CacheInfo::current(&self.global_defines);
        let path = self.root.join(INFO_FILE);

        let kept = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<CacheInfo>(&bytes) {
                Ok(info) if info == expected => true,
                Ok(info) => {
                    log::info!(
                        "Disk cache info changed (version {} -> {}), deleting {}",
                        info.version,
                        expected.version,
                        self.root.display()
                    );
                    false
                }
                Err(err) => {
                    log::warn!("Unreadable disk cache info {}: {err}", path.display());
                    false
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => false,
            Err(err) => return Err(err.into()),
        };

        if !kept {
            self.delete_all()?;
            self.write_info()?;
        }
        Ok(kept)
    }

    /// Writes the current `info.json`.
    pub fn write_info(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let info = CacheInfo::current(&self.global_defines);
        fs::write(self.root.join(INFO_FILE), serde_json::to_vec_pretty(&info)?)?;
        Ok(())
    }

    /// Removes the whole cache tree.
    pub fn delete_all(&self) -> Result<()> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => {
                log::info!("Deleted disk cache at {}", self.root.display());
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
