//! Shapefile main file (`.shp`) access.
//!
//! The main file is a 100-byte header followed by records, each prefixed
//! with a big-endian record header:
//!
//! ```text
//! header   fileCode(BE i32 = 9994) unused(5 x BE i32) fileLength(BE i32, words)
//!          version(LE i32 = 1000) shapeType(LE i32) box(4 x LE f64)
//!          zRange(2 x LE f64) mRange(2 x LE f64)
//! record   number(BE i32) contentLength(BE i32, words) content
//! ```
//!
//! Record contents are handled by [`crate::shape::codec`].

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind as IoErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use parking_lot::Mutex;

use crate::bounding_box::BoundingBox;
use crate::errors::{SpatialError, SpatialResult};
use crate::record_pointer::RecordPointer;
use crate::shape::{codec, Shape, ShapeType};

pub const FILE_CODE: i32 = 9994;
pub const VERSION: i32 = 1000;
pub const HEADER_LEN: usize = 100;
pub const RECORD_HEADER_LEN: usize = 8;

/// Anything that can hand out record contents by pointer.
///
/// The query layer only depends on this contract, so records may come from
/// a file, a memory map or a remote store.
pub trait RecordSource {
    /// Shape type announced for every record of the source.
    fn shape_type(&self) -> ShapeType;

    /// Content bytes of the record at `pointer`, without its record header.
    fn read_content(&self, pointer: RecordPointer) -> SpatialResult<Bytes>;
}

/// Big-endian prefix of every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// 1-based record number
    pub number: i32,
    /// Content length in 16-bit words
    pub content_length: i32,
}

impl RecordHeader {
    pub fn for_content(number: i32, content_bytes: usize) -> SpatialResult<RecordHeader> {
        let words = i32::try_from(content_bytes / 2).map_err(|_| {
            SpatialError::InvalidOperation(format!(
                "record of {} bytes is too large",
                content_bytes
            ))
        })?;
        Ok(RecordHeader {
            number,
            content_length: words,
        })
    }

    pub fn content_bytes(&self) -> usize {
        self.content_length.max(0) as usize * 2
    }

    pub fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_i32(self.number);
        buf.put_i32(self.content_length);
    }

    pub fn read<B: Buf>(buf: &mut B) -> SpatialResult<RecordHeader> {
        if buf.remaining() < RECORD_HEADER_LEN {
            return Err(SpatialError::Format("truncated record header".into()));
        }
        Ok(RecordHeader {
            number: buf.get_i32(),
            content_length: buf.get_i32(),
        })
    }
}

/// Decoded 100-byte main file header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShpHeader {
    pub shape_type: ShapeType,
    /// Total file length in bytes, header included.
    pub file_length: u64,
    pub bbox: BoundingBox,
    pub z_range: (f64, f64),
    pub m_range: (f64, f64),
}

impl ShpHeader {
    fn empty(shape_type: ShapeType) -> ShpHeader {
        ShpHeader {
            shape_type,
            file_length: HEADER_LEN as u64,
            bbox: BoundingBox::default(),
            z_range: (0.0, 0.0),
            m_range: (0.0, 0.0),
        }
    }

    pub fn write<B: BufMut>(&self, buf: &mut B) -> SpatialResult<()> {
        let words = i32::try_from(self.file_length / 2).map_err(|_| {
            SpatialError::InvalidOperation(format!(
                "file length {} exceeds the shapefile limit",
                self.file_length
            ))
        })?;

        buf.put_i32(FILE_CODE);
        for _ in 0..5 {
            buf.put_i32(0);
        }
        buf.put_i32(words);
        buf.put_i32_le(VERSION);
        buf.put_i32_le(self.shape_type.code());
        buf.put_f64_le(self.bbox.min_x);
        buf.put_f64_le(self.bbox.min_y);
        buf.put_f64_le(self.bbox.max_x);
        buf.put_f64_le(self.bbox.max_y);
        buf.put_f64_le(self.z_range.0);
        buf.put_f64_le(self.z_range.1);
        buf.put_f64_le(self.m_range.0);
        buf.put_f64_le(self.m_range.1);
        Ok(())
    }

    pub fn read<B: Buf>(buf: &mut B) -> SpatialResult<ShpHeader> {
        if buf.remaining() < HEADER_LEN {
            return Err(SpatialError::Format(format!(
                "main file header needs {} bytes, found {}",
                HEADER_LEN,
                buf.remaining()
            )));
        }

        let file_code = buf.get_i32();
        if file_code != FILE_CODE {
            return Err(SpatialError::Format(format!(
                "bad file code {}, expected {}",
                file_code, FILE_CODE
            )));
        }
        buf.advance(20);
        let words = buf.get_i32();
        let version = buf.get_i32_le();
        if version != VERSION {
            return Err(SpatialError::Format(format!(
                "unsupported version {}, expected {}",
                version, VERSION
            )));
        }
        let shape_type = ShapeType::from_code(buf.get_i32_le())?;
        let bbox = BoundingBox::new(
            buf.get_f64_le(),
            buf.get_f64_le(),
            buf.get_f64_le(),
            buf.get_f64_le(),
        );
        let z_range = (buf.get_f64_le(), buf.get_f64_le());
        let m_range = (buf.get_f64_le(), buf.get_f64_le());

        Ok(ShpHeader {
            shape_type,
            file_length: words.max(0) as u64 * 2,
            bbox,
            z_range,
            m_range,
        })
    }
}

/// Appends records to a new main file.
///
/// The header is written as a placeholder on creation and rewritten with
/// the final length and extent by [`ShpWriter::finish`].
pub struct ShpWriter {
    file: BufWriter<File>,
    header: ShpHeader,
    has_extent: bool,
    position: u64,
    next_number: i32,
}

impl ShpWriter {
    /// Creates a main file for records of `shape_type`. The file must not exist.
    pub fn create<P: AsRef<Path>>(path: P, shape_type: ShapeType) -> SpatialResult<ShpWriter> {
        let path = path.as_ref();
        let file = OpenOptions::new()
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

        let header = ShpHeader::empty(shape_type);
        let mut file = BufWriter::new(file);
        let mut buf = BytesMut::with_capacity(HEADER_LEN);
        header.write(&mut buf)?;
        file.write_all(&buf)?;

        log::debug!("Created shapefile {} for {}", path.display(), shape_type);
        Ok(ShpWriter {
            file,
            header,
            has_extent: false,
            position: HEADER_LEN as u64,
            next_number: 1,
        })
    }

    pub fn shape_type(&self) -> ShapeType {
        self.header.shape_type
    }

    /// Appends `shape` and returns the pointer to its record.
    ///
    /// Null and empty shapes are accepted in any file; every other shape
    /// must match the file's shape type.
    pub fn write(&mut self, shape: &Shape) -> SpatialResult<RecordPointer> {
        if !shape.is_empty() && shape.shape_type() != self.header.shape_type {
            return Err(SpatialError::InvalidOperation(format!(
                "cannot write {} into a {} file",
                shape.shape_type(),
                self.header.shape_type
            )));
        }

        let content_len = codec::length(shape);
        let record_header = RecordHeader::for_content(self.next_number, content_len)?;
        let pointer = RecordPointer::from_file_offset(self.position)?;

        let mut buf = BytesMut::with_capacity(RECORD_HEADER_LEN + content_len);
        record_header.write(&mut buf);
        codec::write(&mut buf, shape)?;
        self.file.write_all(&buf)?;

        self.position += buf.len() as u64;
        self.next_number += 1;
        self.include_extent(shape);
        Ok(pointer)
    }

    fn include_extent(&mut self, shape: &Shape) {
        let extent = match shape.extent() {
            Some(extent) => extent,
            None => return,
        };
        let m_range = extent.m_range.unwrap_or((0.0, 0.0));

        if self.has_extent {
            let header = &mut self.header;
            header.bbox.expand(&extent.bbox);
            header.z_range = (
                header.z_range.0.min(extent.z_range.0),
                header.z_range.1.max(extent.z_range.1),
            );
            if extent.m_range.is_some() {
                header.m_range = (header.m_range.0.min(m_range.0), header.m_range.1.max(m_range.1));
            }
        } else {
            self.header.bbox = extent.bbox;
            self.header.z_range = extent.z_range;
            self.header.m_range = m_range;
            self.has_extent = true;
        }
    }

    /// Rewrites the header with the final length and extent and syncs the file.
    pub fn finish(mut self) -> SpatialResult<ShpHeader> {
        self.header.file_length = self.position;

        let mut buf = BytesMut::with_capacity(HEADER_LEN);
        self.header.write(&mut buf)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&buf)?;
        self.file.flush()?;
        self.file.get_ref().sync_all()?;

        log::debug!(
            "Finished shapefile with {} records, {} bytes",
            self.next_number - 1,
            self.position
        );
        Ok(self.header)
    }
}

/// Random-access reader over a main file.
///
/// Reads take `&self`; the file handle is guarded so a reader can be shared
/// between threads.
pub struct ShpReader {
    file: Mutex<File>,
    header: ShpHeader,
    file_len: u64,
}

impl ShpReader {
    /// Opens a main file and validates its header.
    pub fn open<P: AsRef<Path>>(path: P) -> SpatialResult<ShpReader> {
        let mut file = File::open(path.as_ref())?;
        let file_len = file.metadata()?.len();

        let mut raw = vec![0u8; HEADER_LEN.min(file_len as usize)];
        file.read_exact(&mut raw)?;
        let header = ShpHeader::read(&mut raw.as_slice())?;

        if header.file_length != file_len {
            log::debug!(
                "Header of {} announces {} bytes, file holds {}",
                path.as_ref().display(),
                header.file_length,
                file_len
            );
        }

        Ok(ShpReader {
            file: Mutex::new(file),
            header,
            file_len,
        })
    }

    pub fn header(&self) -> &ShpHeader {
        &self.header
    }

    /// Decodes the record at `pointer`.
    pub fn read_record(&self, pointer: RecordPointer) -> SpatialResult<Shape> {
        let (_, content) = self.read_at(pointer.file_offset())?;
        codec::decode(&content, self.header.shape_type)
    }

    /// Sequential iterator over every record, in file order.
    pub fn records(&self) -> Records<'_> {
        Records {
            reader: self,
            position: HEADER_LEN as u64,
            done: false,
        }
    }

    fn read_at(&self, position: u64) -> SpatialResult<(RecordHeader, Bytes)> {
        if position < HEADER_LEN as u64
            || position + RECORD_HEADER_LEN as u64 > self.file_len
        {
            return Err(SpatialError::Corruption(format!(
                "record offset {} outside of a {} byte file",
                position, self.file_len
            )));
        }

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(position))?;

        let mut raw_header = [0u8; RECORD_HEADER_LEN];
        file.read_exact(&mut raw_header)?;
        let header = RecordHeader::read(&mut &raw_header[..])?;

        let content_len = header.content_bytes();
        let end = position + (RECORD_HEADER_LEN + content_len) as u64;
        if header.content_length < 2 || end > self.file_len {
            return Err(SpatialError::Corruption(format!(
                "record {} at offset {} announces {} content bytes, file holds {}",
                header.number, position, content_len, self.file_len
            )));
        }

        let mut content = vec![0u8; content_len];
        file.read_exact(&mut content)?;
        Ok((header, Bytes::from(content)))
    }
}

impl RecordSource for ShpReader {
    fn shape_type(&self) -> ShapeType {
        self.header.shape_type
    }

    fn read_content(&self, pointer: RecordPointer) -> SpatialResult<Bytes> {
        self.read_at(pointer.file_offset()).map(|(_, content)| content)
    }
}

impl<S: RecordSource + ?Sized> RecordSource for std::sync::Arc<S> {
    fn shape_type(&self) -> ShapeType {
        (**self).shape_type()
    }

    fn read_content(&self, pointer: RecordPointer) -> SpatialResult<Bytes> {
        (**self).read_content(pointer)
    }
}

/// Iterator returned by [`ShpReader::records`]. Stops after the first error.
pub struct Records<'a> {
    reader: &'a ShpReader,
    position: u64,
    done: bool,
}

impl Iterator for Records<'_> {
    type Item = SpatialResult<(RecordPointer, Shape)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.position >= self.reader.file_len {
            return None;
        }

        let result = RecordPointer::from_file_offset(self.position).and_then(|pointer| {
            let (header, content) = self.reader.read_at(self.position)?;
            let shape = codec::decode(&content, self.reader.header.shape_type)?;
            self.position += (RECORD_HEADER_LEN + header.content_bytes()) as u64;
            Ok((pointer, shape))
        });

        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}
