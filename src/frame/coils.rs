// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::*;
use crate::error::*;

/// Turn a bool into a u16 coil value
#[must_use]
pub const fn bool_to_u16_coil(state: bool) -> u16 {
    if state { 0xFF00 } else { 0x0000 }
}

/// Turn a u16 coil value into a boolean value.
pub const fn u16_coil_to_bool(coil: u16) -> Result<bool, Error> {
    match coil {
        0xFF00 => Ok(true),
        0x0000 => Ok(false),
        _ => Err(Error::CoilValue(coil)),
    }
}

/// Calculate the number of bytes required for a given number of coils.
#[must_use]
pub const fn packed_coils_len(bitcount: usize) -> usize {
    bitcount.div_ceil(8)
}

/// Pack coils into a byte array.
///
/// Each group of eight coils becomes one byte, the coil with the
/// highest address of the group ends up in the most significant bit.
/// A trailing partial group fills the low bits of the last byte.
///
/// It returns the number of bytes used to pack the coils.
pub fn pack_coils(coils: &[Coil], bytes: &mut [u8]) -> Result<usize, Error> {
    let packed_size = packed_coils_len(coils.len());
    if bytes.len() < packed_size {
        return Err(Error::BufferSize);
    }
    for (chunk, byte) in coils.chunks(8).zip(bytes.iter_mut()) {
        *byte = chunk
            .iter()
            .rev()
            .fold(0, |acc, &coil| (acc << 1) | u8::from(coil));
    }
    Ok(packed_size)
}

/// Packed coils as carried by a write request.
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coils<'c> {
    pub(crate) data: RawData<'c>,
    pub(crate) quantity: usize,
}

impl Coils<'_> {
    /// Quantity of coils
    #[must_use]
    pub const fn len(&self) -> usize {
        self.quantity
    }
    ///  Returns `true` if the container has no items.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.quantity == 0
    }
    /// `true` if enough bytes are present to unpack every coil.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.data.len() >= packed_coils_len(self.quantity)
    }
    /// Get a specific coil.
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<Coil> {
        if idx >= self.quantity {
            return None;
        }
        self.data
            .get(idx / 8)
            .map(|byte| (byte >> (idx % 8)) & 0b1 > 0)
    }
}

/// Coils iterator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoilsIter<'c> {
    cnt: usize,
    coils: Coils<'c>,
}

impl Iterator for CoilsIter<'_> {
    type Item = Coil;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.coils.get(self.cnt);
        self.cnt += 1;
        result
    }
}

impl<'c> IntoIterator for Coils<'c> {
    type Item = Coil;
    type IntoIter = CoilsIter<'c>;

    fn into_iter(self) -> Self::IntoIter {
        CoilsIter {
            cnt: 0,
            coils: self,
        }
    }
}
