// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Clock controller register block and register access.
//!
//! The clock tree is table driven: gates, muxes and dividers are described
//! by a byte offset into the controller plus a bit range. Register access
//! therefore goes through the offset-based [`ClockRegisters`] trait, which
//! [`ClkMmio`] implements on top of the memory-mapped block and which unit
//! tests implement on top of a plain array.

use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::registers::{ReadOnly, ReadWrite};
use tock_registers::{register_bitfields, register_structs, LocalRegisterCopy};

use crate::static_ref::StaticRef;

register_structs! {
    pub PllRegisters {
        (0x000 => ctl0: ReadWrite<u32>),
        (0x004 => ctl1: ReadWrite<u32>),
        (0x008 => ctl2: ReadWrite<u32>),
        (0x00C => _reserved0),
        (0x010 => @END),
    },
    pub ClkRegisterBlock {
        /// Oscillator power control and crystal enables
        (0x000 => pwrctl: ReadWrite<u32>),
        /// System bus clock enables
        (0x004 => sysclk0: ReadWrite<u32>),
        (0x008 => sysclk1: ReadWrite<u32>),
        /// Peripheral bus clock enables
        (0x00C => apbclk0: ReadWrite<u32>),
        (0x010 => apbclk1: ReadWrite<u32>),
        (0x014 => apbclk2: ReadWrite<u32>),
        /// Clock source selection
        (0x018 => clksel0: ReadWrite<u32, CLKSEL0::Register>),
        (0x01C => clksel1: ReadWrite<u32>),
        (0x020 => clksel2: ReadWrite<u32>),
        (0x024 => clksel3: ReadWrite<u32>),
        (0x028 => clksel4: ReadWrite<u32>),
        /// Clock dividers
        (0x02C => clkdiv0: ReadWrite<u32>),
        (0x030 => clkdiv1: ReadWrite<u32>),
        (0x034 => clkdiv2: ReadWrite<u32>),
        (0x038 => clkdiv3: ReadWrite<u32>),
        (0x03C => clkdiv4: ReadWrite<u32>),
        /// Clock output control
        (0x040 => clkoctl: ReadWrite<u32>),
        (0x044 => _reserved0),
        /// Oscillator and PLL stable flags
        (0x050 => status: ReadOnly<u32>),
        (0x054 => _reserved1),
        /// CA-PLL, SYS-PLL, DDR-PLL, A-PLL, E-PLL, V-PLL
        (0x060 => pll: [PllRegisters; 6]),
        /// Clock frequency detector
        (0x0C0 => clkdctl: ReadWrite<u32>),
        (0x0C4 => clkdsts: ReadWrite<u32>),
        (0x0C8 => cdupb: ReadWrite<u32>),
        (0x0CC => cdlowb: ReadWrite<u32>),
        (0x0D0 => ckfltrctl: ReadWrite<u32>),
        (0x0D4 => @END),
    }
}

register_bitfields![u32,
    /// Control word 0 of the A/E/V/DDR PLLs
    pub PLL_CTL0 [
        /// Feedback divider (N)
        FBDIV OFFSET(0) NUMBITS(11) [],
        /// Reference input divider (M)
        INDIV OFFSET(12) NUMBITS(6) [],
        /// Operating mode
        MODE OFFSET(18) NUMBITS(2) [
            Integer = 0,
            Fractional = 1,
            SpreadSpectrum = 2
        ],
        /// Spread-spectrum modulation rate
        SSRATE OFFSET(20) NUMBITS(11) []
    ],
    pub PLL_CTL1 [
        /// Power-down
        PD OFFSET(0) NUMBITS(1) [],
        /// Output divider (P)
        OUTDIV OFFSET(4) NUMBITS(3) [],
        /// Fractional part of N, in units of 2^-24
        FRAC OFFSET(8) NUMBITS(24) []
    ],
    pub PLL_CTL2 [
        /// Spread-spectrum slope
        SLOPE OFFSET(0) NUMBITS(24) []
    ],
    /// Control word 0 of the fixed-ratio CA-PLL and SYS-PLL
    pub SMIC_PLL_CTL0 [
        FBDIV OFFSET(0) NUMBITS(8) [],
        INDIV OFFSET(8) NUMBITS(4) [],
        /// Output divides by 2^OUTDIV
        OUTDIV OFFSET(12) NUMBITS(2) [],
        PD OFFSET(16) NUMBITS(1) [],
        /// Bypass: output follows the reference
        BP OFFSET(17) NUMBITS(1) []
    ],
    pub CLKSEL0 [
        CA35CKSEL OFFSET(0) NUMBITS(2) [],
        SYSCK0SEL OFFSET(2) NUMBITS(1) [],
        SYSCK1SEL OFFSET(4) NUMBITS(2) [],
        SD0SEL OFFSET(16) NUMBITS(2) [
            SysPll = 3
        ],
        SD1SEL OFFSET(18) NUMBITS(2) [
            SysPll = 3
        ],
        DCUSEL OFFSET(24) NUMBITS(1) [],
        DCUPSEL OFFSET(25) NUMBITS(1) []
    ]
];

/// Type-safe copies of the PLL control words.
pub type PllCtl0 = LocalRegisterCopy<u32, PLL_CTL0::Register>;
pub type PllCtl1 = LocalRegisterCopy<u32, PLL_CTL1::Register>;
pub type PllCtl2 = LocalRegisterCopy<u32, PLL_CTL2::Register>;
pub type SmicPllCtl0 = LocalRegisterCopy<u32, SMIC_PLL_CTL0::Register>;
pub type ClkSel0 = LocalRegisterCopy<u32, CLKSEL0::Register>;

/// Byte offsets of the registers used by the clock tree.
pub mod offset {
    pub const PWRCTL: usize = 0x00;
    pub const SYSCLK0: usize = 0x04;
    pub const SYSCLK1: usize = 0x08;
    pub const APBCLK0: usize = 0x0C;
    pub const APBCLK1: usize = 0x10;
    pub const APBCLK2: usize = 0x14;
    pub const CLKSEL0: usize = 0x18;
    pub const CLKSEL1: usize = 0x1C;
    pub const CLKSEL2: usize = 0x20;
    pub const CLKSEL3: usize = 0x24;
    pub const CLKSEL4: usize = 0x28;
    pub const CLKDIV0: usize = 0x2C;
    pub const CLKDIV1: usize = 0x30;
    pub const CLKDIV2: usize = 0x34;
    pub const CLKDIV3: usize = 0x38;
    pub const CLKDIV4: usize = 0x3C;
    pub const CLKOCTL: usize = 0x40;
    pub const STATUS: usize = 0x50;
    pub const PLL_BASE: usize = 0x60;
    pub const PLL_STRIDE: usize = 0x10;
    pub const CLKDCTL: usize = 0xC0;
    pub const CLKDSTS: usize = 0xC4;
    pub const CDUPB: usize = 0xC8;
    pub const CDLOWB: usize = 0xCC;
    pub const CKFLTRCTL: usize = 0xD0;
    /// First offset past the register block.
    pub const END: usize = 0xD4;
}

/// Offset-based access to the clock controller.
///
/// Offsets are byte offsets from the controller base. The clock tree only
/// performs aligned 32-bit accesses.
pub trait ClockRegisters {
    fn read32(&self, offset: usize) -> u32;
    fn write32(&self, offset: usize, value: u32);

    /// Read-modify-write: clears `clear`, then sets `set`.
    fn modify32(&self, offset: usize, clear: u32, set: u32) {
        let value = self.read32(offset);
        self.write32(offset, (value & !clear) | set);
    }
}

pub const CLK_BASE: StaticRef<ClkRegisterBlock> =
    unsafe { StaticRef::new(0x4046_0200 as *const ClkRegisterBlock) };

/// The memory-mapped clock controller.
pub struct ClkMmio {
    registers: StaticRef<ClkRegisterBlock>,
}

impl ClkMmio {
    pub const fn new(registers: StaticRef<ClkRegisterBlock>) -> ClkMmio {
        ClkMmio { registers }
    }

    fn register(&self, at: usize) -> Option<&ReadWrite<u32>> {
        let regs = &*self.registers;
        match at {
            offset::PWRCTL => Some(&regs.pwrctl),
            offset::SYSCLK0 => Some(&regs.sysclk0),
            offset::SYSCLK1 => Some(&regs.sysclk1),
            offset::APBCLK0 => Some(&regs.apbclk0),
            offset::APBCLK1 => Some(&regs.apbclk1),
            offset::APBCLK2 => Some(&regs.apbclk2),
            offset::CLKSEL1 => Some(&regs.clksel1),
            offset::CLKSEL2 => Some(&regs.clksel2),
            offset::CLKSEL3 => Some(&regs.clksel3),
            offset::CLKSEL4 => Some(&regs.clksel4),
            offset::CLKDIV0 => Some(&regs.clkdiv0),
            offset::CLKDIV1 => Some(&regs.clkdiv1),
            offset::CLKDIV2 => Some(&regs.clkdiv2),
            offset::CLKDIV3 => Some(&regs.clkdiv3),
            offset::CLKDIV4 => Some(&regs.clkdiv4),
            offset::CLKOCTL => Some(&regs.clkoctl),
            offset::CLKDCTL => Some(&regs.clkdctl),
            offset::CLKDSTS => Some(&regs.clkdsts),
            offset::CDUPB => Some(&regs.cdupb),
            offset::CDLOWB => Some(&regs.cdlowb),
            offset::CKFLTRCTL => Some(&regs.ckfltrctl),
            o if (offset::PLL_BASE..offset::CLKDCTL).contains(&o) => {
                let pll = regs.pll.get((o - offset::PLL_BASE) / offset::PLL_STRIDE)?;
                match (o - offset::PLL_BASE) % offset::PLL_STRIDE {
                    0x0 => Some(&pll.ctl0),
                    0x4 => Some(&pll.ctl1),
                    0x8 => Some(&pll.ctl2),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

impl ClockRegisters for ClkMmio {
    fn read32(&self, at: usize) -> u32 {
        match at {
            offset::CLKSEL0 => self.registers.clksel0.get(),
            offset::STATUS => self.registers.status.get(),
            o => self.register(o).map_or(0, |r| r.get()),
        }
    }

    fn write32(&self, at: usize, value: u32) {
        match at {
            offset::CLKSEL0 => self.registers.clksel0.set(value),
            o => match self.register(o) {
                Some(r) => r.set(value),
                None => log::warn!("clk: dropped write of {:#x} to offset {:#x}", value, o),
            },
        }
    }
}

/// In-memory register file standing in for the clock controller in tests.
#[cfg(test)]
pub(crate) struct FakeClkRegisters {
    words: [core::cell::Cell<u32>; offset::END / 4],
    writes: core::cell::Cell<usize>,
}

#[cfg(test)]
impl FakeClkRegisters {
    pub(crate) fn new() -> FakeClkRegisters {
        FakeClkRegisters {
            words: core::array::from_fn(|_| core::cell::Cell::new(0)),
            writes: core::cell::Cell::new(0),
        }
    }

    /// A register file preloaded with `(offset, value)` pairs. Preloading
    /// does not count as a write.
    pub(crate) fn with(values: &[(usize, u32)]) -> FakeClkRegisters {
        let regs = FakeClkRegisters::new();
        for &(at, value) in values {
            regs.words[at / 4].set(value);
        }
        regs
    }

    /// Number of `write32` calls since creation.
    pub(crate) fn writes(&self) -> usize {
        self.writes.get()
    }
}

#[cfg(test)]
impl ClockRegisters for FakeClkRegisters {
    fn read32(&self, at: usize) -> u32 {
        self.words.get(at / 4).map_or(0, |w| w.get())
    }

    fn write32(&self, at: usize, value: u32) {
        self.writes.set(self.writes.get() + 1);
        if let Some(w) = self.words.get(at / 4) {
            w.set(value);
        }
    }
}
