//! String primitives over linear memory.
//!
//! A string is a run of bytes ending in a 0 byte, addressed by its raw
//! offset. Every operation allocates a fresh string; none writes into an
//! existing one.

use crate::{
    errors::errors::{Error, ErrorImpl},
    Position,
};

use super::memory::LinearMemory;

const TERMINATOR: u8 = 0;

pub fn length(memory: &LinearMemory, s: u32) -> Result<usize, Error> {
    let mut len = 0;
    while memory.load_byte(s + len as u32)? != TERMINATOR {
        len += 1;
    }
    Ok(len)
}

pub fn read(memory: &LinearMemory, s: u32) -> Result<Vec<u8>, Error> {
    let len = length(memory, s)?;
    (0..len)
        .map(|offset| memory.load_byte(s + offset as u32))
        .collect()
}

pub fn to_string(memory: &LinearMemory, s: u32) -> Result<String, Error> {
    Ok(String::from_utf8_lossy(&read(memory, s)?).into_owned())
}

/// Copies `bytes` into a fresh allocation and terminates it.
pub fn allocate(memory: &mut LinearMemory, bytes: &[u8]) -> Result<u32, Error> {
    let address = memory.malloc(bytes.len() as u64 + 1)?;

    for (offset, byte) in bytes.iter().enumerate() {
        memory.store_byte(address + offset as u32, *byte)?;
    }
    memory.store_byte(address + bytes.len() as u32, TERMINATOR)?;

    Ok(address)
}

pub fn concat(memory: &mut LinearMemory, left: u32, right: u32) -> Result<u32, Error> {
    let mut bytes = read(memory, left)?;
    bytes.extend(read(memory, right)?);
    allocate(memory, &bytes)
}

pub fn equals(memory: &LinearMemory, left: u32, right: u32) -> Result<bool, Error> {
    let mut offset = 0;
    loop {
        let a = memory.load_byte(left + offset)?;
        let b = memory.load_byte(right + offset)?;

        if a != b {
            return Ok(false);
        }
        if a == TERMINATOR {
            return Ok(true);
        }
        offset += 1;
    }
}

pub fn not_equals(memory: &LinearMemory, left: u32, right: u32) -> Result<bool, Error> {
    Ok(!equals(memory, left, right)?)
}

/// `s * times`; a non-positive count gives the empty string.
///
/// The result is allocated before any byte is copied, so a count too large
/// for linear memory fails without building the string on the host.
pub fn repeat(memory: &mut LinearMemory, s: u32, times: i64) -> Result<u32, Error> {
    let bytes = read(memory, s)?;
    let times = times.max(0) as u64;

    let len = (bytes.len() as u64).checked_mul(times).ok_or_else(|| {
        Error::new(
            ErrorImpl::OutOfMemory {
                requested: u64::MAX,
            },
            Position::null(),
        )
    })?;
    let address = memory.malloc(len.saturating_add(1))?;

    for (offset, byte) in bytes.iter().cycle().take(len as usize).enumerate() {
        memory.store_byte(address + offset as u32, *byte)?;
    }
    memory.store_byte(address + len as u32, TERMINATOR)?;

    Ok(address)
}

/// `s[index]` as a one-byte string. Negative indices count from the end.
pub fn index(memory: &mut LinearMemory, s: u32, index: i64) -> Result<u32, Error> {
    let bytes = read(memory, s)?;
    let len = bytes.len() as i64;
    let adjusted = if index < 0 { index + len } else { index };

    if !(0..len).contains(&adjusted) {
        return Err(Error::new(
            ErrorImpl::IndexOutOfRange {
                index,
                length: bytes.len(),
            },
            Position::null(),
        ));
    }

    allocate(memory, &bytes[adjusted as usize..adjusted as usize + 1])
}

/// Byte positions visited by `s[start:stop:step]` on a string of `len` bytes.
///
/// Missing bounds default by the sign of `step`, negative bounds count from
/// the end, and out-of-range bounds clamp. A zero step is a `ValueError`.
pub fn slice_indices(
    len: usize,
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
) -> Result<Vec<usize>, Error> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(Error::new(ErrorImpl::ZeroSliceStep, Position::null()));
    }

    let len = len as i64;
    let (lower, upper) = if step > 0 { (0, len) } else { (-1, len - 1) };

    let clamp = |bound: i64| {
        if bound < 0 {
            (bound + len).max(lower)
        } else {
            bound.min(upper)
        }
    };

    let start = match start {
        Some(start) => clamp(start),
        None if step > 0 => lower,
        None => upper,
    };
    let stop = match stop {
        Some(stop) => clamp(stop),
        None if step > 0 => upper,
        None => lower,
    };

    let mut visited = vec![];
    let mut position = start;
    while (step > 0 && position < stop) || (step < 0 && position > stop) {
        visited.push(position as usize);
        // A step past the end of the i64 range has left the string too
        match position.checked_add(step) {
            Some(next) => position = next,
            None => break,
        }
    }

    Ok(visited)
}

pub fn slice(
    memory: &mut LinearMemory,
    s: u32,
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
) -> Result<u32, Error> {
    let bytes = read(memory, s)?;
    let picked = slice_indices(bytes.len(), start, stop, step)?
        .into_iter()
        .map(|position| bytes[position])
        .collect::<Vec<u8>>();

    allocate(memory, &picked)
}
