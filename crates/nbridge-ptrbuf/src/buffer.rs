use crate::addr::RawRegion;

/// Where a buffer's bytes live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Storage owned by the buffer (or by a foreign buffer type).
    Array,
    /// An aliased native region.
    Region(RawRegion),
}

/// Buffer-like objects whose backing store can be queried.
///
/// Implemented by [`ByteBuffer`] and by foreign buffer types; anything that
/// does not alias native memory reports [`Provenance::Array`].
pub trait Buffer {
    fn capacity(&self) -> usize;
    fn position(&self) -> usize;
    fn limit(&self) -> usize;
    fn is_read_only(&self) -> bool;
    fn provenance(&self) -> Provenance;

    fn remaining(&self) -> usize {
        self.limit().saturating_sub(self.position())
    }

    fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    fn is_direct(&self) -> bool {
        matches!(self.provenance(), Provenance::Region(_))
    }
}

impl Buffer for Vec<u8> {
    fn capacity(&self) -> usize {
        self.len()
    }

    fn position(&self) -> usize {
        0
    }

    fn limit(&self) -> usize {
        self.len()
    }

    fn is_read_only(&self) -> bool {
        false
    }

    fn provenance(&self) -> Provenance {
        Provenance::Array
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("index {index} out of bounds for limit {limit}")]
    IndexOutOfBounds { index: usize, limit: usize },
    #[error("new position {position} exceeds limit {limit}")]
    InvalidPosition { position: usize, limit: usize },
    #[error("new limit {limit} exceeds capacity {capacity}")]
    InvalidLimit { limit: usize, capacity: usize },
    #[error("buffer underflow: {requested} bytes requested, {remaining} remaining")]
    Underflow { requested: usize, remaining: usize },
    #[error("buffer overflow: {requested} bytes requested, {remaining} remaining")]
    Overflow { requested: usize, remaining: usize },
    #[error("buffer is read-only")]
    ReadOnly,
}

#[derive(Debug, Clone)]
enum Backing {
    Array { data: Vec<u8>, read_only: bool },
    Region(RawRegion),
}

/// A byte buffer with capacity, position and limit.
///
/// Array-backed buffers own their storage, so [`ByteBuffer::duplicate`] and
/// [`ByteBuffer::as_read_only`] copy it. Region-backed buffers alias native
/// memory; their duplicates alias the same region.
#[derive(Debug, Clone)]
pub struct ByteBuffer {
    backing: Backing,
    capacity: usize,
    position: usize,
    limit: usize,
}

impl ByteBuffer {
    /// Zero-filled array-backed buffer.
    pub fn allocate(capacity: usize) -> Self {
        Self::wrap(vec![0; capacity])
    }

    /// Array-backed buffer over `data`.
    pub fn wrap(data: Vec<u8>) -> Self {
        let capacity = data.len();
        Self {
            backing: Backing::Array {
                data,
                read_only: false,
            },
            capacity,
            position: 0,
            limit: capacity,
        }
    }

    pub(crate) fn over_region(region: RawRegion) -> Self {
        Self {
            backing: Backing::Region(region),
            capacity: region.len(),
            position: 0,
            limit: region.len(),
        }
    }

    /// Owned storage, if the buffer is array-backed and writable.
    pub fn array(&self) -> Option<&[u8]> {
        match &self.backing {
            Backing::Array {
                data,
                read_only: false,
            } => Some(data.as_slice()),
            _ => None,
        }
    }

    pub fn set_position(&mut self, position: usize) -> Result<(), BufferError> {
        if position > self.limit {
            return Err(BufferError::InvalidPosition {
                position,
                limit: self.limit,
            });
        }
        self.position = position;
        Ok(())
    }

    pub fn set_limit(&mut self, limit: usize) -> Result<(), BufferError> {
        if limit > self.capacity {
            return Err(BufferError::InvalidLimit {
                limit,
                capacity: self.capacity,
            });
        }
        self.limit = limit;
        self.position = self.position.min(limit);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.position = 0;
        self.limit = self.capacity;
    }

    pub fn flip(&mut self) {
        self.limit = self.position;
        self.position = 0;
    }

    pub fn get(&self, index: usize) -> Result<u8, BufferError> {
        self.check_index(index)?;
        Ok(match &self.backing {
            Backing::Array { data, .. } => data[index],
            // SAFETY: index < limit <= capacity == region.len().
            Backing::Region(region) => unsafe { region.read(index) },
        })
    }

    pub fn put(&mut self, index: usize, value: u8) -> Result<(), BufferError> {
        self.check_writable()?;
        self.check_index(index)?;
        match &mut self.backing {
            Backing::Array { data, .. } => data[index] = value,
            // SAFETY: index is in bounds and the region is writable.
            Backing::Region(region) => unsafe { region.write(index, value) },
        }
        Ok(())
    }

    /// Reads the byte at the current position and advances it.
    pub fn get_next(&mut self) -> Result<u8, BufferError> {
        if self.position >= self.limit {
            return Err(BufferError::Underflow {
                requested: 1,
                remaining: 0,
            });
        }
        let value = self.get(self.position)?;
        self.position += 1;
        Ok(value)
    }

    /// Writes a byte at the current position and advances it.
    pub fn put_next(&mut self, value: u8) -> Result<(), BufferError> {
        self.check_writable()?;
        if self.position >= self.limit {
            return Err(BufferError::Overflow {
                requested: 1,
                remaining: 0,
            });
        }
        self.put(self.position, value)?;
        self.position += 1;
        Ok(())
    }

    /// Fills `dst` from the current position and advances it.
    pub fn get_bytes(&mut self, dst: &mut [u8]) -> Result<(), BufferError> {
        let remaining = self.remaining();
        if dst.len() > remaining {
            return Err(BufferError::Underflow {
                requested: dst.len(),
                remaining,
            });
        }
        let start = self.position;
        match &self.backing {
            Backing::Array { data, .. } => dst.copy_from_slice(&data[start..start + dst.len()]),
            // SAFETY: start + dst.len() <= limit <= region.len().
            Backing::Region(region) => unsafe { region.copy_out(start, dst) },
        }
        self.position += dst.len();
        Ok(())
    }

    /// Copies `src` in at the current position and advances it.
    pub fn put_bytes(&mut self, src: &[u8]) -> Result<(), BufferError> {
        self.check_writable()?;
        let remaining = self.remaining();
        if src.len() > remaining {
            return Err(BufferError::Overflow {
                requested: src.len(),
                remaining,
            });
        }
        let start = self.position;
        match &mut self.backing {
            Backing::Array { data, .. } => data[start..start + src.len()].copy_from_slice(src),
            // SAFETY: in bounds and writable, checked above.
            Backing::Region(region) => unsafe { region.copy_in(start, src) },
        }
        self.position += src.len();
        Ok(())
    }

    /// A buffer with the same contents, position and limit that rejects
    /// writes.
    pub fn as_read_only(&self) -> ByteBuffer {
        let backing = match &self.backing {
            Backing::Array { data, .. } => Backing::Array {
                data: data.clone(),
                read_only: true,
            },
            Backing::Region(region) => Backing::Region(region.to_read_only()),
        };
        ByteBuffer { backing, ..*self }
    }

    /// A buffer with the same contents, position, limit and mutability.
    pub fn duplicate(&self) -> ByteBuffer {
        self.clone()
    }

    fn check_index(&self, index: usize) -> Result<(), BufferError> {
        if index >= self.limit {
            return Err(BufferError::IndexOutOfBounds {
                index,
                limit: self.limit,
            });
        }
        Ok(())
    }

    fn check_writable(&self) -> Result<(), BufferError> {
        if self.is_read_only() {
            return Err(BufferError::ReadOnly);
        }
        Ok(())
    }
}

impl Buffer for ByteBuffer {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn position(&self) -> usize {
        self.position
    }

    fn limit(&self) -> usize {
        self.limit
    }

    fn is_read_only(&self) -> bool {
        match &self.backing {
            Backing::Array { read_only, .. } => *read_only,
            Backing::Region(region) => region.is_read_only(),
        }
    }

    fn provenance(&self) -> Provenance {
        match &self.backing {
            Backing::Array { .. } => Provenance::Array,
            Backing::Region(region) => Provenance::Region(*region),
        }
    }
}
