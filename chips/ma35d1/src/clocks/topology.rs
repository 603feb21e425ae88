// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Static description of the MA35D1 clock tree.
//!
//! Every [`ClockId`] maps to exactly one [`ClockNode`]. A node is at most two
//! levels deep: an optional mux picks one of a few [`RootSource`]s, an
//! optional divider divides it, and a gate switches the result on and off.
//! Nodes without a mux are fed by the fixed root of their gate.

use crate::clocks::ids::{self, ClockId, CLK_MAX};
use crate::clocks::registers::offset;

/// Everything a gate root or a mux input can be.
///
/// Bus clocks are derived from the CA35 and SYSCLK0/1 mux selections and
/// are cached by the tree; the others follow an oscillator or a PLL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RootSource {
    Hxt,
    Lxt,
    Hirc,
    Lirc,
    CaPll,
    SysPll,
    DdrPll,
    APll,
    EPll,
    VPll,
    CaPllDiv2,
    CaPllDiv4,
    EPllDiv2,
    EPllDiv4,
    VPllDiv2,
    Ca35,
    Axi0Aclk,
    SysClk0,
    SysClk1,
    SysClk1Div2,
    Hclk0,
    Hclk1,
    Hclk2,
    Hclk3,
    Pclk0,
    Pclk1,
    Pclk2,
    Pclk3,
    Pclk4,
    Pclk3Div4096,
    Pclk4Div4096,
    UsbPhy0,
    UsbPhy1,
    /// Reserved selector value. Resolves to the HXT crystal.
    Unspecified,
}

/// The six PLLs, in clock id order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PllKind {
    CaPll,
    SysPll,
    DdrPll,
    APll,
    EPll,
    VPll,
}

pub const PLL_COUNT: usize = 6;

impl PllKind {
    pub const ALL: [PllKind; PLL_COUNT] = [
        PllKind::CaPll,
        PllKind::SysPll,
        PllKind::DdrPll,
        PllKind::APll,
        PllKind::EPll,
        PllKind::VPll,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn id(self) -> ClockId {
        ids::CAPLL + self.index()
    }

    /// CA-PLL and SYS-PLL have a fixed ratio and the SMIC control layout.
    pub fn is_fixed_ratio(self) -> bool {
        matches!(self, PllKind::CaPll | PllKind::SysPll)
    }

    /// The CPU and DRAM PLLs must never be powered down.
    pub fn is_always_on(self) -> bool {
        matches!(self, PllKind::CaPll | PllKind::DdrPll)
    }

    pub fn ctl0_offset(self) -> usize {
        offset::PLL_BASE + offset::PLL_STRIDE * self.index()
    }

    pub fn ctl1_offset(self) -> usize {
        self.ctl0_offset() + 0x4
    }

    pub fn ctl2_offset(self) -> usize {
        self.ctl0_offset() + 0x8
    }
}

/// A PLL node. The reference is always the HXT crystal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PllSpec {
    pub kind: PllKind,
}

/// One enable bit in a clock enable register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnableBit {
    pub offset: usize,
    pub bit: u32,
}

/// A gate and the root that feeds it when no mux is in front of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Gate {
    /// `None` for bus clocks that cannot be switched off.
    pub enable: Option<EnableBit>,
    pub root: RootSource,
}

/// A selector field and the sources it chooses from, indexed by selector
/// value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mux {
    pub offset: usize,
    pub shift: u32,
    pub width: u32,
    pub parents: &'static [RootSource],
}

/// A divider field and the ratio encoded by each field value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Divider {
    pub offset: usize,
    pub shift: u32,
    pub width: u32,
    pub table: &'static [u64],
}

/// Mask of a `width`-bit field, not shifted.
pub const fn field_mask(width: u32) -> u32 {
    (1 << width) - 1
}

impl Mux {
    pub fn selector(&self, register: u32) -> usize {
        ((register >> self.shift) & field_mask(self.width)) as usize
    }

    /// Register mask covering the selector field.
    pub fn mask(&self) -> u32 {
        field_mask(self.width) << self.shift
    }
}

impl Divider {
    /// Division ratio encoded in `register`. A field value without a table
    /// entry divides by one.
    pub fn ratio(&self, register: u32) -> u64 {
        let field = ((register >> self.shift) & field_mask(self.width)) as usize;
        match self.table.get(field) {
            Some(&ratio) if ratio != 0 => ratio,
            _ => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockNode {
    Pll(PllSpec),
    Gate(Gate),
    Mux { gate: Gate, mux: Mux },
    /// Dividers are read only. When a mux sits in front of the divider, the
    /// mux selection is divided; otherwise the gate root is.
    Div {
        gate: Gate,
        mux: Option<Mux>,
        div: Divider,
    },
}

impl ClockNode {
    pub fn gate(&self) -> Option<&Gate> {
        match self {
            ClockNode::Pll(_) => None,
            ClockNode::Gate(gate) | ClockNode::Mux { gate, .. } | ClockNode::Div { gate, .. } => {
                Some(gate)
            }
        }
    }
}

/// The node behind `id`, or `None` if `id` is not a clock.
pub fn clock_node(id: ClockId) -> Option<&'static ClockNode> {
    CLOCK_NODES.get(id)
}

/// Ids of the muxes the bus clock caches are derived from.
pub fn is_bus_mux(id: ClockId) -> bool {
    matches!(id, ids::CA35CLK_MUX | ids::SYSCLK0_MUX | ids::SYSCLK1_MUX)
}

use RootSource::*;

const CA35_PARENTS: &[RootSource] = &[Hxt, CaPll, EPll, APll];
const SYSCLK0_PARENTS: &[RootSource] = &[EPllDiv2, SysPll];
const SYSCLK1_PARENTS: &[RootSource] = &[Hxt, SysPll, APll, APll];
const SDH_PARENTS: &[RootSource] = &[SysPll, APll, Unspecified, SysPll];
const DCU_PARENTS: &[RootSource] = &[EPllDiv2, SysPll];
const DCUP_PARENTS: &[RootSource] = &[VPll, APll];
const SPI_PCLK1_PARENTS: &[RootSource] = &[Pclk1, APll, Unspecified, Unspecified];
const SPI_PCLK2_PARENTS: &[RootSource] = &[Pclk2, APll, Unspecified, Unspecified];
const QSPI0_PARENTS: &[RootSource] = &[Pclk0, APll, Unspecified, Unspecified];
const QSPI1_PARENTS: &[RootSource] = &[Pclk1, APll, Unspecified, Unspecified];

const DIV_2_4_6_8: &[u64] = &[2, 4, 6, 8];
const DIV_2_4: &[u64] = &[2, 4];

pub const CA35_SEL: Mux = mux(offset::CLKSEL0, 0, 2, CA35_PARENTS);
pub const SYSCLK0_SEL: Mux = mux(offset::CLKSEL0, 2, 1, SYSCLK0_PARENTS);
pub const SYSCLK1_SEL: Mux = mux(offset::CLKSEL0, 4, 2, SYSCLK1_PARENTS);
const SDH0_SEL: Mux = mux(offset::CLKSEL0, 16, 2, SDH_PARENTS);
const SDH1_SEL: Mux = mux(offset::CLKSEL0, 18, 2, SDH_PARENTS);
const DCUP_SEL: Mux = mux(offset::CLKSEL0, 25, 1, DCUP_PARENTS);

const DCU_ENABLE: Gate = gate(offset::SYSCLK0, 26, EPllDiv2);
const DCUP_ENABLE: Gate = gate(offset::SYSCLK0, 26, VPll);

const fn mux(offset: usize, shift: u32, width: u32, parents: &'static [RootSource]) -> Mux {
    Mux {
        offset,
        shift,
        width,
        parents,
    }
}

const fn divider(offset: usize, shift: u32, width: u32, table: &'static [u64]) -> Divider {
    Divider {
        offset,
        shift,
        width,
        table,
    }
}

const fn gate(offset: usize, bit: u32, root: RootSource) -> Gate {
    Gate {
        enable: Some(EnableBit { offset, bit }),
        root,
    }
}

const fn ungated(root: RootSource) -> Gate {
    Gate { enable: None, root }
}

const fn pll(kind: PllKind) -> ClockNode {
    ClockNode::Pll(PllSpec { kind })
}

const fn g(offset: usize, bit: u32, root: RootSource) -> ClockNode {
    ClockNode::Gate(gate(offset, bit, root))
}

const fn m(gate: Gate, mux: Mux) -> ClockNode {
    ClockNode::Mux { gate, mux }
}

static CLOCK_NODES: [ClockNode; CLK_MAX] = [
    // PLLs
    pll(PllKind::CaPll),
    pll(PllKind::SysPll),
    pll(PllKind::DdrPll),
    pll(PllKind::APll),
    pll(PllKind::EPll),
    pll(PllKind::VPll),
    // Oscillator gates
    g(offset::PWRCTL, 0, Hxt),
    g(offset::PWRCTL, 1, Lxt),
    g(offset::PWRCTL, 2, Hirc),
    g(offset::PWRCTL, 3, Lirc),
    // System bus gates
    g(offset::SYSCLK0, 5, DdrPll),
    g(offset::SYSCLK0, 3, DdrPll),
    g(offset::SYSCLK0, 16, SysPll),
    g(offset::SYSCLK0, 17, SysPll),
    g(offset::SYSCLK0, 18, Hclk0),
    g(offset::SYSCLK0, 20, UsbPhy0),
    g(offset::SYSCLK0, 21, UsbPhy0),
    g(offset::SYSCLK0, 22, UsbPhy1),
    g(offset::SYSCLK0, 26, EPllDiv2),
    g(offset::SYSCLK0, 27, EPllDiv2),
    g(offset::SYSCLK0, 28, EPllDiv2),
    // Peripheral bus gates
    g(offset::APBCLK0, 29, Lxt),
    g(offset::APBCLK0, 30, DdrPll),
    g(offset::APBCLK1, 0, Pclk0),
    g(offset::APBCLK1, 1, Pclk1),
    g(offset::APBCLK1, 2, Pclk2),
    g(offset::APBCLK1, 3, Pclk0),
    g(offset::APBCLK1, 4, Pclk1),
    g(offset::APBCLK1, 5, Pclk2),
    g(offset::APBCLK1, 6, Pclk0),
    g(offset::APBCLK1, 7, Pclk1),
    g(offset::APBCLK2, 4, Pclk1),
    g(offset::APBCLK2, 5, Pclk2),
    g(offset::APBCLK2, 6, Pclk1),
    g(offset::APBCLK2, 7, Pclk2),
    // GPIO ports A to N
    g(offset::SYSCLK1, 16, Hclk0),
    g(offset::SYSCLK1, 17, Hclk0),
    g(offset::SYSCLK1, 18, Hclk0),
    g(offset::SYSCLK1, 19, Hclk0),
    g(offset::SYSCLK1, 20, Hclk0),
    g(offset::SYSCLK1, 21, Hclk0),
    g(offset::SYSCLK1, 22, Hclk0),
    g(offset::SYSCLK1, 23, Hclk0),
    g(offset::SYSCLK1, 24, Hclk0),
    g(offset::SYSCLK1, 25, Hclk0),
    g(offset::SYSCLK1, 26, Hclk0),
    g(offset::SYSCLK1, 27, Hclk0),
    g(offset::SYSCLK1, 28, Hclk0),
    g(offset::SYSCLK1, 29, Hclk0),
    // Muxes
    m(gate(offset::SYSCLK0, 0, Ca35), CA35_SEL),
    m(ungated(SysClk0), SYSCLK0_SEL),
    m(ungated(SysClk1), SYSCLK1_SEL),
    m(gate(offset::SYSCLK0, 16, SysPll), SDH0_SEL),
    m(gate(offset::SYSCLK0, 17, SysPll), SDH1_SEL),
    m(DCU_ENABLE, mux(offset::CLKSEL0, 24, 1, DCU_PARENTS)),
    m(DCUP_ENABLE, DCUP_SEL),
    m(gate(offset::APBCLK2, 4, Pclk1), mux(offset::CLKSEL4, 0, 2, SPI_PCLK1_PARENTS)),
    m(gate(offset::APBCLK2, 5, Pclk2), mux(offset::CLKSEL4, 2, 2, SPI_PCLK2_PARENTS)),
    m(gate(offset::APBCLK2, 6, Pclk1), mux(offset::CLKSEL4, 4, 2, SPI_PCLK1_PARENTS)),
    m(gate(offset::APBCLK2, 7, Pclk2), mux(offset::CLKSEL4, 6, 2, SPI_PCLK2_PARENTS)),
    m(gate(offset::APBCLK1, 6, Pclk0), mux(offset::CLKSEL4, 8, 2, QSPI0_PARENTS)),
    m(gate(offset::APBCLK1, 7, Pclk1), mux(offset::CLKSEL4, 10, 2, QSPI1_PARENTS)),
    // Dividers
    ClockNode::Div {
        gate: DCUP_ENABLE,
        mux: Some(DCUP_SEL),
        div: divider(offset::CLKDIV0, 24, 2, DIV_2_4_6_8),
    },
    ClockNode::Div {
        gate: gate(offset::SYSCLK0, 27, EPllDiv2),
        mux: None,
        div: divider(offset::CLKDIV0, 28, 2, DIV_2_4_6_8),
    },
    ClockNode::Div {
        gate: gate(offset::SYSCLK0, 28, EPllDiv2),
        mux: None,
        div: divider(offset::CLKDIV0, 30, 2, DIV_2_4_6_8),
    },
    ClockNode::Div {
        gate: ungated(Ca35),
        mux: None,
        div: divider(offset::CLKDIV0, 26, 1, DIV_2_4),
    },
    // Watchdog 1
    g(offset::APBCLK1, 17, Pclk3),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clocks::ids::*;

    #[test]
    fn every_id_maps_to_the_node_kind_of_its_range() {
        for id in 0..CLK_MAX {
            let node = clock_node(id).unwrap();
            match id {
                CAPLL..=VPLL => assert!(matches!(node, ClockNode::Pll(_)), "{}", id),
                HXT_GATE..=GPN_GATE | WDT1_GATE => {
                    assert!(matches!(node, ClockNode::Gate(_)), "{}", id)
                }
                CA35CLK_MUX..=QSPI1_MUX => assert!(matches!(node, ClockNode::Mux { .. }), "{}", id),
                _ => assert!(matches!(node, ClockNode::Div { .. }), "{}", id),
            }
        }
        assert_eq!(clock_node(CLK_MAX), None);
    }

    #[test]
    fn pll_nodes_follow_id_order() {
        for kind in PllKind::ALL {
            assert_eq!(clock_node(kind.id()), Some(&pll(kind)));
        }
        assert_eq!(PllKind::VPll.ctl0_offset(), 0xB0);
        assert_eq!(PllKind::APll.ctl2_offset(), 0x98);
    }

    #[test]
    fn mux_parents_fit_selector_width() {
        for id in 0..CLK_MAX {
            if let Some(ClockNode::Mux { mux, .. }) = clock_node(id) {
                assert!(mux.parents.len() <= 1 << mux.width, "{}", id);
            }
        }
    }

    #[test]
    fn field_decoding() {
        assert_eq!(SYSCLK1_SEL.selector(0b11_0000), 3);
        assert_eq!(SYSCLK1_SEL.mask(), 0x30);
        let emac0 = divider(offset::CLKDIV0, 28, 2, DIV_2_4_6_8);
        assert_eq!(emac0.ratio(0x2000_0000), 6);
        let sparse = divider(offset::CLKDIV0, 0, 2, DIV_2_4);
        assert_eq!(sparse.ratio(0x3), 1);
    }

    #[test]
    fn only_bus_muxes_and_aclk_are_ungated() {
        for id in 0..CLK_MAX {
            let ungated = clock_node(id)
                .and_then(ClockNode::gate)
                .map_or(false, |g| g.enable.is_none());
            assert_eq!(
                ungated,
                matches!(id, SYSCLK0_MUX | SYSCLK1_MUX | ACLK0_DIV),
                "{}",
                id
            );
        }
    }
}
