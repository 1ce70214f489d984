// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory register image of the slave.

use crate::{Address, Coil, Error, Fingerprint, Quantity, Word};

/// Number of coils (discrete outputs).
pub const COILS_CAPACITY: usize = 20;

/// Number of discrete inputs.
pub const DISCRETE_INPUTS_CAPACITY: usize = 20;

/// Number of holding registers (analog outputs).
pub const HOLDING_REGISTERS_CAPACITY: usize = 10;

/// Number of input registers (analog inputs).
pub const INPUT_REGISTERS_CAPACITY: usize = 20;

/// Input register slot counting the received requests.
pub const REQUEST_COUNT_SLOT: usize = 13;

/// Input register slot summing up the received bytes.
pub const BYTES_RECEIVED_SLOT: usize = 14;

/// Input register slot summing up the transmitted bytes.
pub const BYTES_SENT_SLOT: usize = 15;

/// Input register slots seeded with the usage counters, the fingerprint
/// occupies the slots below.
const FIRST_PATTERN_SLOT: usize = BYTES_SENT_SLOT + 1;

/// Discrete inputs above this slot are not derived from input registers.
const LAST_DERIVED_INPUT: usize = 14;

/// A fixed size bank of values with 1-based addressing.
///
/// `SLOTS` includes the unused slot `0`, the bank holds `SLOTS - 1` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bank<T, const SLOTS: usize> {
    slots: [T; SLOTS],
}

impl<T: Copy + Default, const SLOTS: usize> Default for Bank<T, SLOTS> {
    fn default() -> Self {
        Self {
            slots: [T::default(); SLOTS],
        }
    }
}

impl<T: Copy, const SLOTS: usize> Bank<T, SLOTS> {
    /// Number of addressable values.
    pub const CAPACITY: usize = SLOTS - 1;

    /// Number of addressable values.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        Self::CAPACITY
    }

    /// Value at the 1-based `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        if index == 0 {
            return None;
        }
        self.slots.get(index).copied()
    }

    /// Overwrite the value at the 1-based `index`.
    pub fn set(&mut self, index: usize, value: T) -> Result<(), Error> {
        if index == 0 {
            return Err(Error::RegisterIndex(index));
        }
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(Error::RegisterIndex(index))?;
        *slot = value;
        Ok(())
    }

    /// The `quantity` values addressed by the zero based wire `offset`,
    /// i.e. slots `offset + 1 ..= offset + quantity`.
    ///
    /// Returns `None` if the range exceeds the bank.
    #[must_use]
    pub fn range(&self, offset: Address, quantity: Quantity) -> Option<&[T]> {
        let (start, end) = Self::bounds(offset, quantity)?;
        self.slots.get(start..end)
    }

    /// Mutable variant of [`Bank::range`].
    pub fn range_mut(&mut self, offset: Address, quantity: Quantity) -> Option<&mut [T]> {
        let (start, end) = Self::bounds(offset, quantity)?;
        self.slots.get_mut(start..end)
    }

    /// The addressable values, slot `1` first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().skip(1)
    }

    fn bounds(offset: Address, quantity: Quantity) -> Option<(usize, usize)> {
        let last = usize::from(offset) + usize::from(quantity);
        if last > Self::CAPACITY {
            return None;
        }
        Some((usize::from(offset) + 1, last + 1))
    }
}

/// Coils (discrete outputs).
pub type CoilBank = Bank<Coil, { COILS_CAPACITY + 1 }>;

/// Discrete inputs.
pub type DiscreteInputBank = Bank<Coil, { DISCRETE_INPUTS_CAPACITY + 1 }>;

/// Holding registers (analog outputs).
pub type HoldingRegisterBank = Bank<Word, { HOLDING_REGISTERS_CAPACITY + 1 }>;

/// Input registers (analog inputs).
pub type InputRegisterBank = Bank<Word, { INPUT_REGISTERS_CAPACITY + 1 }>;

/// Snapshot of the usage counters.
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub requests: u16,
    pub bytes_received: u16,
    pub bytes_sent: u16,
}

/// The four register banks of the slave.
///
/// Discrete inputs and input registers are read-only for a Modbus
/// master, the owner of the registers may still update them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Registers {
    pub coils: CoilBank,
    pub discrete_inputs: DiscreteInputBank,
    pub holding_registers: HoldingRegisterBank,
    pub input_registers: InputRegisterBank,
}

impl Registers {
    /// Create the initial register image.
    ///
    /// - coils alternate, starting with `OFF` at slot `0`
    /// - holding register `i` holds `(i - 1) * 4`
    /// - input registers `1..=12` hold the fingerprint, `13..=15`
    ///   the usage counters, the rest alternate `0x0000`/`0x1111`
    /// - discrete input `i <= 14` is `ON` if input register `i` is even
    #[must_use]
    pub fn new(fingerprint: &Fingerprint) -> Self {
        let mut registers = Self::default();

        for (i, coil) in registers.coils.slots.iter_mut().enumerate() {
            *coil = !is_even(i);
        }
        for (i, reg) in registers.holding_registers.slots.iter_mut().enumerate().skip(1) {
            *reg = ((i - 1) * 4) as Word;
        }

        let inputs = &mut registers.input_registers.slots;
        for (slot, value) in inputs[1..].iter_mut().zip(fingerprint.to_words()) {
            *slot = value;
        }
        for (i, reg) in inputs.iter_mut().enumerate().skip(FIRST_PATTERN_SLOT) {
            *reg = if is_even(i) { 0x0000 } else { 0x1111 };
        }

        let inputs = registers.input_registers.slots;
        for (i, input) in registers
            .discrete_inputs
            .slots
            .iter_mut()
            .enumerate()
            .skip(1)
        {
            *input = i <= LAST_DERIVED_INPUT && is_even(usize::from(inputs[i]));
        }
        registers
    }

    /// Current values of the usage counters.
    #[must_use]
    pub const fn stats(&self) -> Stats {
        let slots = &self.input_registers.slots;
        Stats {
            requests: slots[REQUEST_COUNT_SLOT],
            bytes_received: slots[BYTES_RECEIVED_SLOT],
            bytes_sent: slots[BYTES_SENT_SLOT],
        }
    }

    /// Account for one processed request.
    ///
    /// The counters wrap around at 16 bit.
    pub fn record_request(&mut self, received: usize, sent: usize) {
        let slots = &mut self.input_registers.slots;
        slots[REQUEST_COUNT_SLOT] = slots[REQUEST_COUNT_SLOT].wrapping_add(1);
        slots[BYTES_RECEIVED_SLOT] = slots[BYTES_RECEIVED_SLOT].wrapping_add(received as u16);
        slots[BYTES_SENT_SLOT] = slots[BYTES_SENT_SLOT].wrapping_add(sent as u16);
    }
}

const fn is_even(n: usize) -> bool {
    n % 2 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const FINGERPRINT: Fingerprint = Fingerprint {
        year: 2015,
        month: 3,
        day: 2,
        hour: 10,
        minute: 31,
        second: 7,
        uid: 1000,
        gid: 1000,
        pid: 4321,
        ppid: 4000,
        elapsed_secs: 0,
        elapsed_millis: 3,
    };

    mod bank {
        use super::*;

        #[test]
        fn capacity() {
            assert_eq!(CoilBank::CAPACITY, 20);
            assert_eq!(HoldingRegisterBank::default().capacity(), 10);
            assert_eq!(InputRegisterBank::CAPACITY, 20);
        }

        #[test]
        fn slot_zero_is_not_addressable() {
            let mut bank = HoldingRegisterBank::default();
            assert_eq!(bank.get(0), None);
            assert_eq!(bank.set(0, 1), Err(Error::RegisterIndex(0)));
            assert_eq!(bank.set(11, 1), Err(Error::RegisterIndex(11)));
            assert!(bank.set(10, 0xABCD).is_ok());
            assert_eq!(bank.get(10), Some(0xABCD));
            assert_eq!(bank.get(11), None);
        }

        #[test]
        fn range_maps_offset_to_slots() {
            let mut bank = HoldingRegisterBank::default();
            bank.set(4, 0x0044).unwrap();
            bank.set(5, 0x0055).unwrap();
            assert_eq!(bank.range(3, 2), Some(&[0x0044, 0x0055][..]));
        }

        #[test]
        fn range_boundaries() {
            let bank = CoilBank::default();
            assert_eq!(bank.range(0, 20).map(<[Coil]>::len), Some(20));
            assert_eq!(bank.range(19, 1).map(<[Coil]>::len), Some(1));
            assert_eq!(bank.range(0, 21), None);
            assert_eq!(bank.range(20, 1), None);
            assert_eq!(bank.range(20, 0).map(<[Coil]>::len), Some(0));
            assert_eq!(bank.range(21, 0), None);
            assert_eq!(bank.range(u16::MAX, u16::MAX), None);
        }

        #[test]
        fn range_mut_writes_through() {
            let mut bank = CoilBank::default();
            bank.range_mut(18, 2).unwrap().fill(true);
            assert_eq!(bank.get(18), Some(false));
            assert_eq!(bank.get(19), Some(true));
            assert_eq!(bank.get(20), Some(true));
            assert!(bank.range_mut(19, 2).is_none());
        }

        #[test]
        fn iterate_from_slot_one() {
            let mut bank = HoldingRegisterBank::default();
            bank.set(1, 7).unwrap();
            assert_eq!(bank.iter().count(), 10);
            assert_eq!(bank.iter().next(), Some(&7));
        }
    }

    mod seeding {
        use super::*;

        #[test]
        fn coils_alternate() {
            let regs = Registers::new(&FINGERPRINT);
            assert_eq!(regs.coils.get(1), Some(true));
            assert_eq!(regs.coils.get(2), Some(false));
            assert_eq!(regs.coils.get(19), Some(true));
            assert_eq!(regs.coils.get(20), Some(false));
        }

        #[test]
        fn holding_registers_count_up() {
            let regs = Registers::new(&FINGERPRINT);
            let values: [Word; 10] = [0, 4, 8, 12, 16, 20, 24, 28, 32, 36];
            assert!(regs.holding_registers.iter().eq(values.iter()));
        }

        #[test]
        fn input_registers_layout() {
            let regs = Registers::new(&FINGERPRINT);
            let expected: [Word; 20] = [
                2015, 3, 2, 10, 31, 7, // timestamp
                1000, 1000, 4321, 4000, // identity
                0, 3, // elapsed
                0, 0, 0, // usage counters
                0x0000, 0x1111, 0x0000, 0x1111, 0x0000,
            ];
            assert!(regs.input_registers.iter().eq(expected.iter()));
        }

        #[test]
        fn discrete_inputs_follow_input_parity() {
            let regs = Registers::new(&FINGERPRINT);
            let expected = [
                false, false, true, true, false, false, // 2015 3 2 10 31 7
                true, true, false, true, // 1000 1000 4321 4000
                true, false, // 0 3
                true, true, // counters at 0
                false, false, false, false, false, false,
            ];
            assert!(regs.discrete_inputs.iter().eq(expected.iter()));
        }
    }

    mod usage_counters {
        use super::*;

        #[test]
        fn start_at_zero() {
            let regs = Registers::new(&FINGERPRINT);
            assert_eq!(regs.stats(), Stats::default());
        }

        #[test]
        fn record_requests() {
            let mut regs = Registers::new(&FINGERPRINT);
            regs.record_request(8, 7);
            regs.record_request(9, 0);
            assert_eq!(
                regs.stats(),
                Stats {
                    requests: 2,
                    bytes_received: 17,
                    bytes_sent: 7,
                }
            );
            assert_eq!(regs.input_registers.get(REQUEST_COUNT_SLOT), Some(2));
            assert_eq!(regs.input_registers.get(BYTES_RECEIVED_SLOT), Some(17));
            assert_eq!(regs.input_registers.get(BYTES_SENT_SLOT), Some(7));
        }

        #[test]
        fn counters_wrap() {
            let mut regs = Registers::default();
            regs.input_registers
                .set(BYTES_RECEIVED_SLOT, u16::MAX)
                .unwrap();
            regs.record_request(2, 0);
            assert_eq!(regs.stats().bytes_received, 1);
        }
    }
}
