//! Page-oriented file storage for the R-Tree.
//!
//! The file is a sequence of fixed-size pages. Page 0 holds the header;
//! every other page is framed as
//!
//! ```text
//! [kind u8][crc32 u32 LE][payload length u32 LE][payload][zero padding]
//! ```
//!
//! Freed pages are chained on disk through their `Free` payload, so the
//! free list survives a reopen. Each `read_page` call results in exactly
//! one seek and one read; nothing is preloaded.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind as IoErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use parking_lot::{Mutex, RwLock};

use crate::config::PageDefinition;
use crate::errors::{SpatialError, SpatialResult};

use super::rtree_constants::{HEADER_PAGE, MAGIC, NO_PAGE, PAGE_FRAME_OVERHEAD};
use super::rtree_types::{FileHeader, FreePage, PageId, PageKind, TreeState};

/// Header page prefix: magic, payload length, CRC32
const HEADER_PREFIX: usize = 12;

/// A page as read from disk, with its frame already verified.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub id: PageId,
    pub kind: PageKind,
    pub payload: Bytes,
}

/// I/O counters of a page store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageStoreStats {
    pub page_size: usize,
    pub allocated_pages: u64,
    pub free_pages: u64,
    pub disk_reads: u64,
    pub disk_writes: u64,
}

/// Fixed-size page file with free-list bookkeeping.
///
/// Lock order is header, then free set, then file.
pub struct PageStore {
    path: PathBuf,
    page_size: usize,
    file: Mutex<Option<File>>,
    header: RwLock<FileHeader>,
    free_pages: Mutex<HashSet<PageId>>,
    header_dirty: AtomicBool,
    disk_reads: AtomicU64,
    disk_writes: AtomicU64,
}

impl PageStore {
    /// Creates a new page file. Fails if the file already exists.
    pub fn create(path: impl AsRef<Path>, definition: &PageDefinition) -> SpatialResult<Self> {
        definition.validate()?;
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| {
                if e.kind() == IoErrorKind::AlreadyExists {
                    SpatialError::Configuration(format!("{} already exists", path.display()))
                } else {
                    SpatialError::Io(e)
                }
            })?;
        Self::initialize(path, file, definition)
    }

    /// Opens an existing page file, checking its header against `definition`.
    pub fn open(path: impl AsRef<Path>, definition: &PageDefinition) -> SpatialResult<Self> {
        definition.validate()?;
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Self::load(path, file, definition)
    }

    /// Opens the page file if it holds data, initializes it otherwise.
    pub fn open_or_create(
        path: impl AsRef<Path>,
        definition: &PageDefinition,
    ) -> SpatialResult<Self> {
        definition.validate()?;
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        if file.metadata()?.len() == 0 {
            Self::initialize(path, file, definition)
        } else {
            Self::load(path, file, definition)
        }
    }

    fn initialize(path: &Path, mut file: File, definition: &PageDefinition) -> SpatialResult<Self> {
        let header = FileHeader::new(definition.clone());
        let page_size = definition.page_size as usize;
        write_header_page(&mut file, &header, page_size)?;
        file.sync_all()?;

        log::debug!(
            "Created page store at {:?} (page size {}, fan-out {}..{})",
            path,
            page_size,
            definition.min_entries,
            definition.max_entries
        );
        Ok(Self::assemble(path, file, header, HashSet::new()))
    }

    fn load(path: &Path, mut file: File, definition: &PageDefinition) -> SpatialResult<Self> {
        let header = read_header_page(&mut file)?;
        header.validate()?;
        if header.page_definition != *definition {
            return Err(SpatialError::Configuration(format!(
                "{:?} was created with {:?}, opened with {:?}",
                path, header.page_definition, definition
            )));
        }

        let free_pages = walk_free_list(&mut file, &header)?;
        log::debug!(
            "Opened page store at {:?} ({} pages, {} free, root {})",
            path,
            header.next_page_id - 1,
            free_pages.len(),
            header.root_page
        );
        Ok(Self::assemble(path, file, header, free_pages))
    }

    fn assemble(
        path: &Path,
        file: File,
        header: FileHeader,
        free_pages: HashSet<PageId>,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            page_size: header.page_definition.page_size as usize,
            file: Mutex::new(Some(file)),
            header: RwLock::new(header),
            free_pages: Mutex::new(free_pages),
            header_dirty: AtomicBool::new(false),
            disk_reads: AtomicU64::new(0),
            disk_writes: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_definition(&self) -> PageDefinition {
        self.header.read().page_definition.clone()
    }

    /// Largest payload a single page can carry.
    pub fn max_payload(&self) -> usize {
        self.page_size - PAGE_FRAME_OVERHEAD
    }

    pub fn is_closed(&self) -> bool {
        self.file.lock().is_none()
    }

    /// Returns a page number for new content: the head of the free list if
    /// there is one, a page past the end of the file otherwise.
    pub fn allocate_page(&self) -> SpatialResult<PageId> {
        self.check_open()?;
        let mut header = self.header.write();

        if header.free_list_head != NO_PAGE {
            let page_id = header.free_list_head;
            let (kind, payload) = self.read_raw(page_id)?;
            if kind != PageKind::Free {
                return Err(SpatialError::Corruption(format!(
                    "free list head {} is a {:?} page",
                    page_id, kind
                )));
            }
            let (free, _): (FreePage, usize) =
                bincode::serde::decode_from_slice(&payload, bincode::config::legacy())?;

            header.free_list_head = free.next_free;
            header.free_page_count = header.free_page_count.saturating_sub(1);
            self.free_pages.lock().remove(&page_id);
            self.header_dirty.store(true, Ordering::Release);

            log::trace!("Reusing free page {}", page_id);
            return Ok(page_id);
        }

        let page_id = header.next_page_id;
        header.next_page_id += 1;
        self.header_dirty.store(true, Ordering::Release);
        Ok(page_id)
    }

    /// Reads and verifies one page.
    pub fn read_page(&self, page_id: PageId) -> SpatialResult<Page> {
        self.check_open()?;
        check_range(&self.header.read(), page_id)?;
        let (kind, payload) = self.read_raw(page_id)?;
        Ok(Page {
            id: page_id,
            kind,
            payload,
        })
    }

    /// Writes `payload` into page `page_id` under the given kind.
    ///
    /// Free pages are written by [`PageStore::free_page`] only.
    pub fn write_page(&self, page_id: PageId, kind: PageKind, payload: &[u8]) -> SpatialResult<()> {
        self.check_open()?;
        if kind == PageKind::Free {
            return Err(SpatialError::InvalidOperation(format!(
                "page {} cannot be written as free, use free_page",
                page_id
            )));
        }
        check_range(&self.header.read(), page_id)?;
        if self.free_pages.lock().contains(&page_id) {
            return Err(SpatialError::InvalidOperation(format!(
                "page {} is on the free list",
                page_id
            )));
        }
        self.write_raw(page_id, kind, payload)
    }

    /// Pushes a page onto the free list. Freeing a page twice is rejected
    /// and leaves the list untouched.
    pub fn free_page(&self, page_id: PageId) -> SpatialResult<()> {
        self.check_open()?;
        let mut header = self.header.write();
        check_range(&header, page_id)?;

        let mut free_pages = self.free_pages.lock();
        if free_pages.contains(&page_id) {
            return Err(SpatialError::InvalidOperation(format!(
                "page {} is already free",
                page_id
            )));
        }

        let free = FreePage {
            next_free: header.free_list_head,
        };
        let payload = bincode::serde::encode_to_vec(free, bincode::config::legacy())?;
        self.write_raw(page_id, PageKind::Free, &payload)?;

        header.free_list_head = page_id;
        header.free_page_count += 1;
        free_pages.insert(page_id);
        self.header_dirty.store(true, Ordering::Release);

        log::trace!("Freed page {}", page_id);
        Ok(())
    }

    pub fn tree_state(&self) -> TreeState {
        let header = self.header.read();
        TreeState {
            root_page: header.root_page,
            height: header.height,
            entry_count: header.entry_count,
        }
    }

    /// Buffers new tree metadata; it reaches the disk on flush or close.
    pub fn set_tree_state(&self, state: TreeState) {
        let mut header = self.header.write();
        header.root_page = state.root_page;
        header.height = state.height;
        header.entry_count = state.entry_count;
        self.header_dirty.store(true, Ordering::Release);
    }

    /// One past the highest page number handed out so far.
    pub fn next_page_id(&self) -> PageId {
        self.header.read().next_page_id
    }

    pub fn free_page_ids(&self) -> HashSet<PageId> {
        self.free_pages.lock().clone()
    }

    pub fn stats(&self) -> PageStoreStats {
        let header = self.header.read();
        PageStoreStats {
            page_size: self.page_size,
            allocated_pages: header.next_page_id - 1,
            free_pages: header.free_page_count,
            disk_reads: self.disk_reads.load(Ordering::Relaxed),
            disk_writes: self.disk_writes.load(Ordering::Relaxed),
        }
    }

    /// Writes buffered header state and syncs the file.
    pub fn flush(&self) -> SpatialResult<()> {
        let header = self.header.read();
        let mut guard = self.file.lock();
        let file = guard.as_mut().ok_or(SpatialError::Closed)?;
        if self.header_dirty.swap(false, Ordering::AcqRel) {
            write_header_page(file, &header, self.page_size)?;
        }
        file.sync_all()?;
        Ok(())
    }

    /// Flushes and releases the file handle. Calling it again is a no-op.
    ///
    /// The handle is released even when the final flush fails.
    pub fn close(&self) -> SpatialResult<()> {
        let header = self.header.read();
        let file = self.file.lock().take();
        match file {
            None => Ok(()),
            Some(mut file) => {
                let result = if self.header_dirty.swap(false, Ordering::AcqRel) {
                    write_header_page(&mut file, &header, self.page_size)
                } else {
                    Ok(())
                };
                let result = result.and_then(|_| file.sync_all().map_err(SpatialError::from));
                log::debug!("Closed page store at {:?}", self.path);
                result
            }
        }
    }

    fn check_open(&self) -> SpatialResult<()> {
        if self.file.lock().is_none() {
            Err(SpatialError::Closed)
        } else {
            Ok(())
        }
    }

    fn read_raw(&self, page_id: PageId) -> SpatialResult<(PageKind, Bytes)> {
        let mut guard = self.file.lock();
        let file = guard.as_mut().ok_or(SpatialError::Closed)?;
        let frame = read_frame(file, self.page_size, page_id)?;
        self.disk_reads.fetch_add(1, Ordering::Relaxed);
        log::trace!("Read page {} ({:?})", page_id, frame.0);
        Ok(frame)
    }

    fn write_raw(&self, page_id: PageId, kind: PageKind, payload: &[u8]) -> SpatialResult<()> {
        if payload.len() > self.max_payload() {
            return Err(SpatialError::InvalidOperation(format!(
                "payload of {} bytes does not fit a {} byte page",
                payload.len(),
                self.page_size
            )));
        }

        let mut frame = BytesMut::with_capacity(self.page_size);
        frame.put_u8(kind.as_u8());
        frame.put_u32_le(crc32fast::hash(payload));
        frame.put_u32_le(payload.len() as u32);
        frame.put_slice(payload);
        frame.resize(self.page_size, 0);

        let mut guard = self.file.lock();
        let file = guard.as_mut().ok_or(SpatialError::Closed)?;
        file.seek(SeekFrom::Start(page_id * self.page_size as u64))?;
        file.write_all(&frame)?;
        self.disk_writes.fetch_add(1, Ordering::Relaxed);
        log::trace!("Wrote page {} ({:?}, {} bytes)", page_id, kind, payload.len());
        Ok(())
    }
}

impl Drop for PageStore {
    fn drop(&mut self) {
        // Best effort flush on drop
        if let Some(mut file) = self.file.get_mut().take() {
            if *self.header_dirty.get_mut() {
                let result = write_header_page(&mut file, self.header.get_mut(), self.page_size)
                    .and_then(|_| file.sync_all().map_err(SpatialError::from));
                if let Err(e) = result {
                    log::warn!("Failed to flush page store {:?} on drop: {}", self.path, e);
                }
            }
        }
    }
}

fn check_range(header: &FileHeader, page_id: PageId) -> SpatialResult<()> {
    if page_id == HEADER_PAGE || page_id >= header.next_page_id {
        return Err(SpatialError::Corruption(format!(
            "page {} is outside of allocated pages 1..{}",
            page_id, header.next_page_id
        )));
    }
    Ok(())
}

fn read_frame(file: &mut File, page_size: usize, page_id: PageId) -> SpatialResult<(PageKind, Bytes)> {
    let mut buffer = vec![0u8; page_size];
    file.seek(SeekFrom::Start(page_id * page_size as u64))?;
    file.read_exact(&mut buffer).map_err(|e| {
        if e.kind() == IoErrorKind::UnexpectedEof {
            SpatialError::Corruption(format!("page {} was never written", page_id))
        } else {
            SpatialError::Io(e)
        }
    })?;

    let mut prefix = &buffer[..PAGE_FRAME_OVERHEAD];
    let kind_byte = prefix.get_u8();
    let checksum = prefix.get_u32_le();
    let len = prefix.get_u32_le() as usize;

    if kind_byte == 0 {
        return Err(SpatialError::Corruption(format!(
            "page {} was never written",
            page_id
        )));
    }
    let kind = PageKind::from_u8(kind_byte).ok_or_else(|| {
        SpatialError::Corruption(format!("page {} has unknown kind {}", page_id, kind_byte))
    })?;
    if len > page_size - PAGE_FRAME_OVERHEAD {
        return Err(SpatialError::Corruption(format!(
            "page {} announces {} payload bytes",
            page_id, len
        )));
    }

    let payload = Bytes::from(buffer).slice(PAGE_FRAME_OVERHEAD..PAGE_FRAME_OVERHEAD + len);
    let actual = crc32fast::hash(&payload);
    if actual != checksum {
        return Err(SpatialError::Corruption(format!(
            "page {} checksum mismatch (expected {:x}, got {:x})",
            page_id, checksum, actual
        )));
    }
    Ok((kind, payload))
}

fn write_header_page(file: &mut File, header: &FileHeader, page_size: usize) -> SpatialResult<()> {
    let body = bincode::serde::encode_to_vec(header, bincode::config::legacy())?;
    if HEADER_PREFIX + body.len() > page_size {
        return Err(SpatialError::Configuration(format!(
            "file header of {} bytes does not fit a {} byte page",
            HEADER_PREFIX + body.len(),
            page_size
        )));
    }

    let mut page = BytesMut::with_capacity(page_size);
    page.put_u32_le(MAGIC);
    page.put_u32_le(body.len() as u32);
    page.put_u32_le(crc32fast::hash(&body));
    page.put_slice(&body);
    page.resize(page_size, 0);

    file.seek(SeekFrom::Start(0))?;
    file.write_all(&page)?;
    Ok(())
}

fn read_header_page(file: &mut File) -> SpatialResult<FileHeader> {
    let mut prefix = [0u8; HEADER_PREFIX];
    file.seek(SeekFrom::Start(0))?;
    file.read_exact(&mut prefix).map_err(|e| {
        if e.kind() == IoErrorKind::UnexpectedEof {
            SpatialError::Configuration("file is too short to be an index file".into())
        } else {
            SpatialError::Io(e)
        }
    })?;

    let mut cursor = &prefix[..];
    let magic = cursor.get_u32_le();
    let len = cursor.get_u32_le() as usize;
    let checksum = cursor.get_u32_le();
    if magic != MAGIC {
        return Err(SpatialError::Configuration(
            "not an index file (bad magic)".into(),
        ));
    }

    let file_len = file.metadata()?.len();
    if (HEADER_PREFIX + len) as u64 > file_len {
        return Err(SpatialError::Corruption(format!(
            "header announces {} bytes, file holds {}",
            len, file_len
        )));
    }
    let mut body = vec![0u8; len];
    file.read_exact(&mut body)?;
    if crc32fast::hash(&body) != checksum {
        return Err(SpatialError::Corruption("header checksum mismatch".into()));
    }

    let (header, _): (FileHeader, usize) =
        bincode::serde::decode_from_slice(&body, bincode::config::legacy())?;
    Ok(header)
}

/// Follows the on-disk free chain, checking range, page kind, cycles and
/// the recorded count.
fn walk_free_list(file: &mut File, header: &FileHeader) -> SpatialResult<HashSet<PageId>> {
    let page_size = header.page_definition.page_size as usize;
    let mut seen = HashSet::new();
    let mut current = header.free_list_head;

    while current != NO_PAGE {
        check_range(header, current)?;
        if !seen.insert(current) {
            return Err(SpatialError::Corruption(format!(
                "free list cycles back to page {}",
                current
            )));
        }
        if seen.len() as u64 > header.free_page_count {
            return Err(SpatialError::Corruption(format!(
                "free list is longer than the recorded {} pages",
                header.free_page_count
            )));
        }

        let (kind, payload) = read_frame(file, page_size, current)?;
        if kind != PageKind::Free {
            return Err(SpatialError::Corruption(format!(
                "page {} is on the free list but holds a {:?} page",
                current, kind
            )));
        }
        let (free, _): (FreePage, usize) =
            bincode::serde::decode_from_slice(&payload, bincode::config::legacy())?;
        current = free.next_free;
    }

    if seen.len() as u64 != header.free_page_count {
        return Err(SpatialError::Corruption(format!(
            "free list holds {} pages, header records {}",
            seen.len(),
            header.free_page_count
        )));
    }
    Ok(seen)
}
