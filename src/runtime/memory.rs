use tracing::trace;

use crate::{
    errors::errors::{Error, ErrorImpl},
    Position,
};

pub const PAGE_SIZE: usize = 65536;
pub const INITIAL_PAGES: usize = 2;
pub const MAX_PAGES: usize = 100;

/// Word 0 holds the bump allocator's next free address.
pub const HEAP_POINTER_ADDRESS: u32 = 0;
/// Global slots live in `[GLOBALS_START, HEAP_START)`.
pub const GLOBALS_START: u32 = 8;
pub const HEAP_START: u32 = 1 << 16;

const WORD: u32 = 8;

/// Byte-addressable memory shared by the emitted code and the host.
#[derive(Debug, Clone)]
pub struct LinearMemory {
    bytes: Vec<u8>,
}

impl LinearMemory {
    pub fn new() -> Self {
        let mut memory = LinearMemory {
            bytes: vec![0; INITIAL_PAGES * PAGE_SIZE],
        };
        memory.bytes[..8].copy_from_slice(&(HEAP_START as i64).to_le_bytes());
        memory
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn pages(&self) -> usize {
        self.bytes.len() / PAGE_SIZE
    }

    /// Grows by `pages`, failing past `MAX_PAGES`.
    pub fn grow(&mut self, pages: usize) -> Result<(), Error> {
        if self.pages() + pages > MAX_PAGES {
            return Err(Error::new(
                ErrorImpl::OutOfMemory {
                    requested: (pages * PAGE_SIZE) as u64,
                },
                Position::null(),
            ));
        }

        self.bytes.resize((self.pages() + pages) * PAGE_SIZE, 0);
        Ok(())
    }

    fn check(&self, address: u32, width: u32) -> Result<usize, Error> {
        let start = address as usize;
        if start + width as usize > self.bytes.len() {
            return Err(Error::new(
                ErrorImpl::MemoryOutOfBounds {
                    address: address as u64,
                },
                Position::null(),
            ));
        }

        Ok(start)
    }

    pub fn load_word(&self, address: u32) -> Result<i64, Error> {
        let start = self.check(address, WORD)?;
        let mut word = [0u8; 8];
        word.copy_from_slice(&self.bytes[start..start + 8]);
        Ok(i64::from_le_bytes(word))
    }

    pub fn store_word(&mut self, address: u32, value: i64) -> Result<(), Error> {
        let start = self.check(address, WORD)?;
        self.bytes[start..start + 8].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn load_byte(&self, address: u32) -> Result<u8, Error> {
        let start = self.check(address, 1)?;
        Ok(self.bytes[start])
    }

    pub fn store_byte(&mut self, address: u32, value: u8) -> Result<(), Error> {
        let start = self.check(address, 1)?;
        self.bytes[start] = value;
        Ok(())
    }

    pub fn heap_pointer(&self) -> Result<u32, Error> {
        let word = self.load_word(HEAP_POINTER_ADDRESS)?;
        u32::try_from(word).map_err(|_| {
            Error::new(
                ErrorImpl::MemoryOutOfBounds {
                    address: word as u64,
                },
                Position::null(),
            )
        })
    }

    /// Bump allocation. Sizes are rounded up to whole words and memory is
    /// never handed back.
    pub fn malloc(&mut self, size: u64) -> Result<u32, Error> {
        let limit = (MAX_PAGES * PAGE_SIZE) as u64;
        let address = self.heap_pointer()?;

        let end = size
            .checked_next_multiple_of(WORD as u64)
            .and_then(|rounded| rounded.checked_add(address as u64));
        let end = match end {
            Some(end) if end <= limit => end,
            _ => {
                return Err(Error::new(
                    ErrorImpl::OutOfMemory { requested: size },
                    Position::null(),
                ))
            }
        };

        if end > self.bytes.len() as u64 {
            let missing = end as usize - self.bytes.len();
            self.grow(missing.div_ceil(PAGE_SIZE))?;
        }

        self.store_word(HEAP_POINTER_ADDRESS, end as i64)?;
        trace!(address, size, "malloc");
        Ok(address)
    }
}

impl Default for LinearMemory {
    fn default() -> Self {
        LinearMemory::new()
    }
}
