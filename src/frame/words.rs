// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::*;
use byteorder::{BigEndian, ByteOrder};

/// Register values (u16, big-endian) as carried by a write request.
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Words<'d> {
    pub(crate) data: RawData<'d>,
    pub(crate) quantity: usize,
}

impl Words<'_> {
    /// Quantity of words (u16 values)
    #[must_use]
    pub const fn len(&self) -> usize {
        self.quantity
    }
    ///  Returns `true` if the container has no items.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.quantity == 0
    }
    /// `true` if enough bytes are present to read every word.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.data.len() >= self.quantity * 2
    }
    /// Get a specific word.
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<Word> {
        if idx >= self.quantity {
            return None;
        }
        let idx = idx * 2;
        self.data.get(idx..idx + 2).map(BigEndian::read_u16)
    }
}

/// Words iterator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordsIter<'d> {
    cnt: usize,
    words: Words<'d>,
}

impl Iterator for WordsIter<'_> {
    type Item = Word;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.words.get(self.cnt);
        self.cnt += 1;
        result
    }
}

impl<'d> IntoIterator for Words<'d> {
    type Item = Word;
    type IntoIter = WordsIter<'d>;

    fn into_iter(self) -> Self::IntoIter {
        WordsIter {
            cnt: 0,
            words: self,
        }
    }
}
