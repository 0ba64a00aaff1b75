//! Linear memory instances
//!
//! All access is bounds-checked against the current byte length before any
//! byte is touched; a failed check traps without partial writes. Effective
//! addresses are computed in 64 bits, so a 32-bit index plus a 32-bit
//! static offset can never wrap.

use super::Trap;
use crate::module::MemoryType;
use byteorder::{ByteOrder, LittleEndian};

/// WebAssembly page size in bytes (64KB)
pub const PAGE_SIZE: usize = 65536;

/// Maximum number of pages (4GB total)
pub const MAX_PAGES: u32 = 65536;

/// A linear memory instance
#[derive(Debug)]
pub struct Memory {
    data: Vec<u8>,
    max_pages: Option<u32>,
}

impl Memory {
    /// Create a memory with `limits.min` zeroed pages.
    ///
    /// Limit validity (min <= max <= 64K pages) is the decoder's concern.
    pub fn new(ty: &MemoryType) -> Self {
        Memory {
            data: vec![0u8; ty.limits.min as usize * PAGE_SIZE],
            max_pages: ty.limits.max,
        }
    }

    /// Current size in pages
    pub fn size(&self) -> u32 {
        (self.data.len() / PAGE_SIZE) as u32
    }

    pub fn max_pages(&self) -> Option<u32> {
        self.max_pages
    }

    /// Current size in bytes
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Grow by `delta_pages`, returning the previous page count or -1 when
    /// the limit (declared maximum or the 4GB architectural cap) would be
    /// exceeded. Growth failure is a value, not a trap.
    pub fn grow(&mut self, delta_pages: u32) -> i32 {
        let current = self.size();
        let Some(new_pages) = current.checked_add(delta_pages) else {
            return -1;
        };
        if new_pages > self.max_pages.unwrap_or(MAX_PAGES) {
            return -1;
        }
        self.data.resize(new_pages as usize * PAGE_SIZE, 0);
        current as i32
    }

    /// Bounds check: the whole range `[addr, addr + len)` must lie inside
    /// the current byte length
    #[inline]
    fn check(&self, addr: u64, len: usize) -> Result<usize, Trap> {
        let end = addr.checked_add(len as u64).ok_or(Trap::OutOfBoundsMemoryAccess)?;
        if end > self.data.len() as u64 {
            return Err(Trap::OutOfBoundsMemoryAccess);
        }
        Ok(addr as usize)
    }

    pub fn read_u8(&self, addr: u64) -> Result<u8, Trap> {
        let a = self.check(addr, 1)?;
        Ok(self.data[a])
    }

    pub fn read_u16(&self, addr: u64) -> Result<u16, Trap> {
        let a = self.check(addr, 2)?;
        Ok(LittleEndian::read_u16(&self.data[a..a + 2]))
    }

    pub fn read_u32(&self, addr: u64) -> Result<u32, Trap> {
        let a = self.check(addr, 4)?;
        Ok(LittleEndian::read_u32(&self.data[a..a + 4]))
    }

    pub fn read_u64(&self, addr: u64) -> Result<u64, Trap> {
        let a = self.check(addr, 8)?;
        Ok(LittleEndian::read_u64(&self.data[a..a + 8]))
    }

    pub fn write_u8(&mut self, addr: u64, value: u8) -> Result<(), Trap> {
        let a = self.check(addr, 1)?;
        self.data[a] = value;
        Ok(())
    }

    pub fn write_u16(&mut self, addr: u64, value: u16) -> Result<(), Trap> {
        let a = self.check(addr, 2)?;
        LittleEndian::write_u16(&mut self.data[a..a + 2], value);
        Ok(())
    }

    pub fn write_u32(&mut self, addr: u64, value: u32) -> Result<(), Trap> {
        let a = self.check(addr, 4)?;
        LittleEndian::write_u32(&mut self.data[a..a + 4], value);
        Ok(())
    }

    pub fn write_u64(&mut self, addr: u64, value: u64) -> Result<(), Trap> {
        let a = self.check(addr, 8)?;
        LittleEndian::write_u64(&mut self.data[a..a + 8], value);
        Ok(())
    }

    /// Copy `bytes` to `dst`, checked as a whole before any byte lands.
    /// Used both by active data segments and `memory.init`.
    pub fn init(&mut self, dst: u64, bytes: &[u8]) -> Result<(), Trap> {
        let a = self.check(dst, bytes.len())?;
        self.data[a..a + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// `memory.copy`: overlapping ranges behave like a memmove
    pub fn copy_within(&mut self, dst: u64, src: u64, len: u64) -> Result<(), Trap> {
        let len = usize::try_from(len).map_err(|_| Trap::OutOfBoundsMemoryAccess)?;
        let d = self.check(dst, len)?;
        let s = self.check(src, len)?;
        self.data.copy_within(s..s + len, d);
        Ok(())
    }

    /// `memory.fill`
    pub fn fill(&mut self, dst: u64, value: u8, len: u64) -> Result<(), Trap> {
        let len = usize::try_from(len).map_err(|_| Trap::OutOfBoundsMemoryAccess)?;
        let d = self.check(dst, len)?;
        self.data[d..d + len].fill(value);
        Ok(())
    }

    /// Raw view of the current contents, for embedder inspection
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}
