//! Mapping manager: owns the one live memory mapping over the committed
//! extent of the backing file.

use memmap2::MmapMut;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;

/// A writable memory mapping covering the first `len()` bytes of a file.
///
/// Exactly one `Mapping` is alive per mapped file at any time. Growing the
/// file replaces the whole value: the old mapping is dropped first, then
/// [`Mapping::open`] runs again over the new extent. No address derived from
/// a mapping is ever cached across that replacement; every access goes
/// through [`as_slice`](Mapping::as_slice) /
/// [`as_mut_slice`](Mapping::as_mut_slice) on the current value.
pub(crate) struct Mapping {
    map: MmapMut,
}

impl Mapping {
    /// Maps the entire current extent of the file at `path` for read/write.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened read/write, or if it is
    /// zero-length (a zero-length region cannot be mapped).
    pub(crate) fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        if len == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot map a zero-length file",
            ));
        }
        // Safety: all access to the map is serialized behind the owning
        // file's state lock, which also guarantees the file is only resized
        // while no mapping is alive.
        let map = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { map })
    }

    /// Number of mapped bytes (the physical length at map time).
    pub(crate) fn len(&self) -> u64 {
        self.map.len() as u64
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.map
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.map
    }
}
