//! `MappedFile`: random-access reads and writes over a memory-mapped file,
//! with appends buffered in process memory until the next flush grows the
//! file and replaces the mapping.

use byteorder::{ByteOrder, LittleEndian};
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::MapFileError;
use crate::mapping::Mapping;
use crate::DEFAULT_FLUSH_THRESHOLD;

/// Mutable state shared by every accessor, guarded by one `RwLock`.
///
/// The logical length is never stored separately: it is always
/// `physical_len + pending.len()`.
struct State {
    /// Bytes committed to disk and covered by `mapping`.
    physical_len: u64,
    /// Appended bytes not yet written to disk.
    pending: Vec<u8>,
    /// The one live mapping over `[0, physical_len)`. `None` only after a
    /// failed flush; every later operation then reports `InvalidState`.
    mapping: Option<Mapping>,
}

impl State {
    fn out_of_range(&self, offset: u64, len: u64) -> MapFileError {
        MapFileError::OutOfRange {
            offset,
            len,
            mapped: self.physical_len,
        }
    }

    /// Borrows the mapped bytes at `[offset, offset + len)`.
    fn mapped(&self, offset: u64, len: u64) -> Result<&[u8], MapFileError> {
        let map = self.mapping.as_ref().ok_or(MapFileError::InvalidState)?;
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= self.physical_len)
            .ok_or_else(|| self.out_of_range(offset, len))?;
        Ok(&map.as_slice()[offset as usize..end as usize])
    }

    /// Borrows the mapped tail starting at `offset` (used by string scans).
    fn mapped_from(&self, offset: u64) -> Result<&[u8], MapFileError> {
        let map = self.mapping.as_ref().ok_or(MapFileError::InvalidState)?;
        if offset > self.physical_len {
            return Err(self.out_of_range(offset, 0));
        }
        Ok(&map.as_slice()[offset as usize..])
    }

    /// Mutably borrows the mapped bytes at `[offset, offset + len)`.
    fn mapped_mut(&mut self, offset: u64, len: u64) -> Result<&mut [u8], MapFileError> {
        let physical_len = self.physical_len;
        let map = self.mapping.as_mut().ok_or(MapFileError::InvalidState)?;
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= physical_len)
            .ok_or(MapFileError::OutOfRange {
                offset,
                len,
                mapped: physical_len,
            })?;
        Ok(&mut map.as_mut_slice()[offset as usize..end as usize])
    }
}

/// Random-access view of a file through a memory mapping, with buffered
/// appends past the mapped extent.
///
/// # Offsets
///
/// All offsets are byte offsets into the *logical* file. Offsets below
/// [`mapped_len`](MappedFile::mapped_len) resolve through the mapping;
/// offsets between `mapped_len()` and [`len`](MappedFile::len) exist only
/// in the append buffer and become readable once a flush commits them.
/// Typed accessors never grow the file; only
/// [`append_bytes`](MappedFile::append_bytes) does.
///
/// # Concurrency
///
/// The whole object is usable through a shared reference from multiple
/// threads. Reads (typed reads, string reads, views, [`to_vec`]) run
/// concurrently with each other; appends, flushes, and typed writes are
/// exclusive. A flush replaces the mapping, so it can never overlap any
/// accessor.
///
/// [`to_vec`]: MappedFile::to_vec
pub struct MappedFile {
    path: PathBuf,
    flush_threshold: usize,
    state: RwLock<State>,
}

impl std::fmt::Debug for MappedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ds = f.debug_struct("MappedFile");
        ds.field("path", &self.path)
            .field("flush_threshold", &self.flush_threshold);
        if let Ok(state) = self.state.read() {
            ds.field("mapped_len", &state.physical_len)
                .field("pending_len", &state.pending.len());
        }
        ds.finish()
    }
}

impl MappedFile {
    /// Opens an existing file and maps its entire current extent, using
    /// [`DEFAULT_FLUSH_THRESHOLD`] for the append buffer.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file does not exist, cannot be opened
    /// read/write, or is zero-length (unmappable).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MapFileError> {
        Self::with_threshold(path, DEFAULT_FLUSH_THRESHOLD)
    }

    /// Opens an existing file with an explicit append-buffer flush
    /// threshold.
    ///
    /// Once the buffer reaches `flush_threshold` bytes, the append that got
    /// it there flushes before returning, so the buffer never grows
    /// unboundedly between explicit flushes.
    pub fn with_threshold<P: AsRef<Path>>(
        path: P,
        flush_threshold: usize,
    ) -> Result<Self, MapFileError> {
        let path = path.as_ref().to_path_buf();
        let mapping = Mapping::open(&path)?;
        let physical_len = mapping.len();
        Ok(Self {
            path,
            flush_threshold,
            state: RwLock::new(State {
                physical_len,
                pending: Vec::new(),
                mapping: Some(mapping),
            }),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The configured append-buffer flush threshold in bytes.
    #[must_use]
    pub fn flush_threshold(&self) -> usize {
        self.flush_threshold
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, State>, MapFileError> {
        self.state.read().map_err(|_| MapFileError::InvalidState)
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, State>, MapFileError> {
        self.state.write().map_err(|_| MapFileError::InvalidState)
    }

    /// Logical length: committed bytes plus not-yet-flushed appended bytes.
    pub fn len(&self) -> Result<u64, MapFileError> {
        let state = self.read_state()?;
        if state.mapping.is_none() {
            return Err(MapFileError::InvalidState);
        }
        Ok(state.physical_len + state.pending.len() as u64)
    }

    /// Returns `true` if the logical length is zero.
    pub fn is_empty(&self) -> Result<bool, MapFileError> {
        Ok(self.len()? == 0)
    }

    /// Physical length: bytes committed to disk and reachable through the
    /// mapping. Appended bytes move from [`len`](MappedFile::len) down to
    /// here when a flush commits them.
    pub fn mapped_len(&self) -> Result<u64, MapFileError> {
        let state = self.read_state()?;
        if state.mapping.is_none() {
            return Err(MapFileError::InvalidState);
        }
        Ok(state.physical_len)
    }

    // ---------------- Typed reads ----------------

    /// Reads the byte at `offset`.
    pub fn read_u8(&self, offset: u64) -> Result<u8, MapFileError> {
        let state = self.read_state()?;
        Ok(state.mapped(offset, 1)?[0])
    }

    /// Reads a little-endian `u16` at `offset`.
    pub fn read_u16(&self, offset: u64) -> Result<u16, MapFileError> {
        let state = self.read_state()?;
        Ok(LittleEndian::read_u16(state.mapped(offset, 2)?))
    }

    /// Reads a little-endian `u32` at `offset`.
    pub fn read_u32(&self, offset: u64) -> Result<u32, MapFileError> {
        let state = self.read_state()?;
        Ok(LittleEndian::read_u32(state.mapped(offset, 4)?))
    }

    /// Reads a little-endian `u64` at `offset`.
    pub fn read_u64(&self, offset: u64) -> Result<u64, MapFileError> {
        let state = self.read_state()?;
        Ok(LittleEndian::read_u64(state.mapped(offset, 8)?))
    }

    // ---------------- Typed writes ----------------

    /// Writes the byte at `offset`. The offset must already be mapped;
    /// writes never extend the file.
    pub fn write_u8(&self, offset: u64, value: u8) -> Result<(), MapFileError> {
        let mut state = self.write_state()?;
        state.mapped_mut(offset, 1)?[0] = value;
        Ok(())
    }

    /// Writes a little-endian `u16` at `offset`.
    pub fn write_u16(&self, offset: u64, value: u16) -> Result<(), MapFileError> {
        let mut state = self.write_state()?;
        LittleEndian::write_u16(state.mapped_mut(offset, 2)?, value);
        Ok(())
    }

    /// Writes a little-endian `u32` at `offset`.
    pub fn write_u32(&self, offset: u64, value: u32) -> Result<(), MapFileError> {
        let mut state = self.write_state()?;
        LittleEndian::write_u32(state.mapped_mut(offset, 4)?, value);
        Ok(())
    }

    /// Writes a little-endian `u64` at `offset`.
    pub fn write_u64(&self, offset: u64, value: u64) -> Result<(), MapFileError> {
        let mut state = self.write_state()?;
        LittleEndian::write_u64(state.mapped_mut(offset, 8)?, value);
        Ok(())
    }

    /// Overwrites `bytes.len()` bytes starting at `offset`. The whole range
    /// must already be mapped.
    pub fn write_bytes(&self, offset: u64, bytes: &[u8]) -> Result<(), MapFileError> {
        let mut state = self.write_state()?;
        state
            .mapped_mut(offset, bytes.len() as u64)?
            .copy_from_slice(bytes);
        Ok(())
    }

    // ---------------- String reads ----------------

    /// Reads a zero-terminated single-byte-per-character string at
    /// `offset`, widening each byte to one `char` (Latin-1). The terminator
    /// is not included.
    ///
    /// # Errors
    ///
    /// A string that runs past the mapped extent without a terminator is a
    /// contract violation of the file content; it is reported as
    /// `OutOfRange` rather than scanned past the mapping.
    pub fn read_ascii_string(&self, offset: u64) -> Result<String, MapFileError> {
        let state = self.read_state()?;
        let tail = state.mapped_from(offset)?;
        match tail.iter().position(|&b| b == 0) {
            Some(n) => Ok(tail[..n].iter().map(|&b| b as char).collect()),
            None => Err(state.out_of_range(offset, tail.len() as u64 + 1)),
        }
    }

    /// Reads a UTF-16LE string at `offset`, scanning two-byte code units
    /// until a zero unit or until fewer than two mapped bytes remain.
    /// Invalid code units decode to U+FFFD.
    pub fn read_utf16_string(&self, offset: u64) -> Result<String, MapFileError> {
        let state = self.read_state()?;
        let tail = state.mapped_from(offset)?;
        let mut units = Vec::new();
        for chunk in tail.chunks_exact(2) {
            let unit = LittleEndian::read_u16(chunk);
            if unit == 0 {
                break;
            }
            units.push(unit);
        }
        Ok(String::from_utf16_lossy(&units))
    }

    /// Reads exactly `len` UTF-16LE code units (`2 * len` bytes) at
    /// `offset`. Invalid code units decode to U+FFFD.
    pub fn read_utf16_string_len(&self, offset: u64, len: u64) -> Result<String, MapFileError> {
        let state = self.read_state()?;
        let bytes = state.mapped(offset, len.saturating_mul(2))?;
        let units: Vec<u16> = bytes.chunks_exact(2).map(LittleEndian::read_u16).collect();
        Ok(String::from_utf16_lossy(&units))
    }

    // ---------------- Views and copies ----------------

    /// Borrows the mapped bytes at `[offset, offset + len)`.
    ///
    /// The returned view holds the read lock, so the mapping it borrows
    /// from cannot be replaced while the view is alive; mutating calls
    /// (appends, flushes, writes) block until it is dropped.
    pub fn as_view(&self, offset: u64, len: u64) -> Result<View<'_>, MapFileError> {
        let guard = self.read_state()?;
        guard.mapped(offset, len)?;
        Ok(View {
            guard,
            start: offset as usize,
            end: (offset + len) as usize,
        })
    }

    /// Copies the full logical content: the mapped bytes followed by any
    /// pending appended bytes, [`len`](MappedFile::len) bytes total.
    pub fn to_vec(&self) -> Result<Vec<u8>, MapFileError> {
        let state = self.read_state()?;
        let mapped = state.mapped(0, state.physical_len)?;
        let mut out = Vec::with_capacity(mapped.len() + state.pending.len());
        out.extend_from_slice(mapped);
        out.extend_from_slice(&state.pending);
        Ok(out)
    }

    // ---------------- Appends and flushing ----------------

    /// Appends `bytes` past the current logical end and returns the logical
    /// offset the data was assigned.
    ///
    /// The bytes land in the in-process append buffer, not on disk: they
    /// are not readable through the offset accessors until the next flush
    /// commits them, at exactly the returned offset. If the buffer reaches
    /// the flush threshold, this call flushes before returning; otherwise
    /// it performs no disk I/O.
    pub fn append_bytes(&self, bytes: &[u8]) -> Result<u64, MapFileError> {
        let mut state = self.write_state()?;
        if state.mapping.is_none() {
            return Err(MapFileError::InvalidState);
        }
        let offset = state.physical_len + state.pending.len() as u64;
        state.pending.extend_from_slice(bytes);
        if state.pending.len() >= self.flush_threshold {
            self.flush_locked(&mut state)?;
        }
        Ok(offset)
    }

    /// Drains the append buffer to disk, grows the file, and replaces the
    /// mapping. A no-op when the buffer is empty.
    ///
    /// # Steps
    ///
    /// 1. Take the pending bytes (the buffer is left empty).
    /// 2. Drop the current mapping (the file must not grow under a live
    ///    mapping).
    /// 3. Open the file read/write, write the taken bytes at the old
    ///    physical end, and extend the file to exactly the new physical
    ///    length (some filesystems do not extend precisely on write).
    /// 4. Advance the physical length and re-map the grown file.
    ///
    /// # Errors
    ///
    /// An I/O failure after step 2 leaves the object without a mapping; the
    /// error is returned and every later call reports `InvalidState`.
    pub fn flush(&self) -> Result<(), MapFileError> {
        let mut state = self.write_state()?;
        if state.mapping.is_none() {
            return Err(MapFileError::InvalidState);
        }
        self.flush_locked(&mut state)
    }

    /// Flush body shared by [`flush`](MappedFile::flush) and the threshold
    /// path in [`append_bytes`](MappedFile::append_bytes). The caller holds
    /// the write lock.
    fn flush_locked(&self, state: &mut State) -> Result<(), MapFileError> {
        if state.pending.is_empty() {
            return Ok(());
        }
        let taken = std::mem::take(&mut state.pending);
        let new_physical = state.physical_len + taken.len() as u64;

        state.mapping = None;

        let mut file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(state.physical_len))?;
        file.write_all(&taken)?;
        file.set_len(new_physical)?;
        drop(file);

        state.physical_len = new_physical;
        state.mapping = Some(Mapping::open(&self.path)?);
        Ok(())
    }

    // ---------------- Unsupported operations ----------------

    /// Always fails with `Unsupported`: a memory-mapped region cannot
    /// shrink, so byte ranges cannot be removed from this storage kind.
    pub fn remove_range(&self, _offset: u64, _len: u64) -> Result<(), MapFileError> {
        Err(MapFileError::Unsupported)
    }

    // ---------------- Lifecycle ----------------

    /// Flushes any pending appended bytes, then releases the mapping.
    ///
    /// Prefer this over plain `drop` when the flush result matters.
    /// Closing an object whose mapping is already gone releases resources
    /// without error.
    pub fn close(self) -> Result<(), MapFileError> {
        let mut state = self.write_state()?;
        if state.mapping.is_some() {
            self.flush_locked(&mut state)?;
        }
        Ok(())
    }

    /// Releases the mapping WITHOUT flushing: appended-but-unflushed bytes
    /// are dropped and the file on disk keeps its pre-append content. The
    /// explicit opt-out for callers that buffer speculatively.
    pub fn discard(self) {
        if let Ok(mut state) = self.state.write() {
            state.pending.clear();
            state.mapping = None;
        }
    }
}

/// Best-effort flush on drop.
///
/// Appended-but-unflushed bytes are written out when the handle goes out of
/// scope. Errors are ignored because `Drop` cannot propagate them; callers
/// that need the result use [`MappedFile::close`]. Dropping after
/// [`MappedFile::discard`] or after a failed flush releases resources only.
impl Drop for MappedFile {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.write() {
            if state.mapping.is_some() && !state.pending.is_empty() {
                let _ = self.flush_locked(&mut state);
            }
        }
    }
}

/// A borrowed window into the mapped bytes, created by
/// [`MappedFile::as_view`].
///
/// The view holds the state read lock for its lifetime, so the mapping it
/// borrows from cannot be replaced or torn down underneath it. Dropping the
/// view releases the lock.
pub struct View<'a> {
    guard: RwLockReadGuard<'a, State>,
    start: usize,
    end: usize,
}

impl Deref for View<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match &self.guard.mapping {
            Some(map) => &map.as_slice()[self.start..self.end],
            // Unreachable: the mapping cannot be torn down while the read
            // guard is held.
            None => &[],
        }
    }
}

impl AsRef<[u8]> for View<'_> {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl std::fmt::Debug for View<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("start", &self.start)
            .field("len", &(self.end - self.start))
            .finish()
    }
}
