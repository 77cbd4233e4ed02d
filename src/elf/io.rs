use super::{Endian, Field};
use crate::error::{PargsError, Result};
use memchr::memmem;
use std::fmt;

/// A `[begin, end)` range of offsets into the bytes of an ELF file. Ranges never own or
/// point at the bytes themselves: they have to go through a Reader to be dereferenced
/// which is where the bounds checking happens.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ByteRange {
    pub begin: usize,
    pub end: usize,
}

impl ByteRange {
    /// None if end comes before begin.
    #[cfg(test)]
    pub fn new(begin: usize, end: usize) -> Option<Self> {
        if begin <= end {
            Some(ByteRange { begin, end })
        } else {
            None
        }
    }

    /// None if the end overflows.
    pub fn with_len(begin: usize, len: usize) -> Option<Self> {
        begin.checked_add(len).map(|end| ByteRange { begin, end })
    }

    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }
}

/// Read-only view of an ELF file (normally a memory mapped core file) together with the
/// file's byte order. All multi-byte reads go through here.
#[derive(Copy, Clone)]
pub struct Reader<'a> {
    pub endian: Endian,
    bytes: &'a [u8],
}

impl fmt::Debug for Reader<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("Reader")
            .field("endian", &self.endian)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Readers are equal if they view the very same bytes.
impl PartialEq for Reader<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.endian == other.endian && std::ptr::eq(self.bytes, other.bytes)
    }
}

impl Eq for Reader<'_> {}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8], endian: Endian) -> Self {
        Reader { endian, bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True if the file was written by a machine with a different byte order.
    pub fn need_to_swap(&self) -> bool {
        self.endian != Endian::host()
    }

    pub fn whole(&self) -> ByteRange {
        ByteRange {
            begin: 0,
            end: self.bytes.len(),
        }
    }

    /// Returns the range for size bytes starting at offset. Both values normally come
    /// straight from the file so this checks for overflow as well as for the range
    /// extending past the end of the file.
    pub fn range(&self, offset: u64, size: u64) -> Option<ByteRange> {
        let begin = usize::try_from(offset).ok()?;
        let size = usize::try_from(size).ok()?;
        let range = ByteRange::with_len(begin, size)?;
        if range.end <= self.bytes.len() {
            Some(range)
        } else {
            None
        }
    }

    pub fn slice(&self, range: ByteRange) -> Result<&'a [u8]> {
        self.bytes.get(range.begin..range.end).ok_or_else(|| {
            PargsError::format(format!(
                "range {:#x}..{:#x} is outside the file",
                range.begin, range.end
            ))
        })
    }

    /// Reads a half, word, xword, etc at offset using the file's byte order.
    pub fn read<T: Field>(&self, offset: usize) -> Result<T> {
        offset
            .checked_add(T::SIZE)
            .and_then(|end| self.bytes.get(offset..end))
            .and_then(|bytes| T::from_bytes(bytes, self.endian))
            .ok_or_else(|| {
                PargsError::format(format!(
                    "couldn't read {} bytes at offset {offset:#x}",
                    T::SIZE
                ))
            })
    }
}

/// Sequential reads within a range, e.g. the notes in a NOTE segment.
pub struct Stream<'a> {
    pub reader: Reader<'a>,
    pub offset: usize,
    end: usize,
}

impl<'a> Stream<'a> {
    pub fn new(reader: Reader<'a>, range: ByteRange) -> Self {
        Stream {
            reader,
            offset: range.begin,
            end: range.end,
        }
    }

    pub fn remaining(&self) -> usize {
        self.end.saturating_sub(self.offset)
    }

    pub fn at_end(&self) -> bool {
        self.offset >= self.end
    }

    pub fn read<T: Field>(&mut self) -> Result<T> {
        if self.remaining() < T::SIZE {
            return Err(PargsError::format(format!(
                "read of {} bytes at offset {:#x} runs past {:#x}",
                T::SIZE,
                self.offset,
                self.end
            )));
        }
        let value = self.reader.read(self.offset)?;
        self.offset += T::SIZE;
        Ok(value)
    }

    /// Returns the range for the next len bytes and advances past them.
    pub fn take(&mut self, len: usize) -> Result<ByteRange> {
        if self.remaining() < len {
            return Err(PargsError::format(format!(
                "{len} bytes at offset {:#x} run past {:#x}",
                self.offset, self.end
            )));
        }
        let range = ByteRange {
            begin: self.offset,
            end: self.offset + len,
        };
        self.offset += len;
        Ok(range)
    }

    /// Skips padding. The last entry in a range may legitimately be missing its padding
    /// so this stops at the end instead of failing.
    pub fn skip(&mut self, len: usize) {
        self.offset = self.offset.saturating_add(len).min(self.end.max(self.offset));
    }
}

/// Like memmem but searching backwards and only at offsets that are multiples of align.
/// Returns the offset of the match closest to the end of haystack.
pub fn aligned_rfind(haystack: &[u8], needle: &[u8], align: usize) -> Option<usize> {
    if needle.is_empty() || align == 0 || needle.len() > haystack.len() {
        return None;
    }
    // rfind_iter skips overlapping matches so runs of zeros need the window moved by hand
    let finder = memmem::FinderRev::new(needle);
    let mut end = haystack.len();
    while let Some(i) = finder.rfind(&haystack[..end]) {
        if i % align == 0 {
            return Some(i);
        }
        end = i / align * align + needle.len();
    }
    None
}
