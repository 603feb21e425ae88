// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Clock tree evaluator.
//!
//! [`ClockTree`] answers the four clock operations for every [`ClockId`] by
//! walking the static topology and reading the controller registers. The
//! only state it keeps is [`ClockTreeState`]: PLL rates and modes read back
//! when the tree is created, and the CPU and system bus clocks derived from
//! them. The caches are refreshed whenever a PLL is reprogrammed or one of
//! the three bus muxes is switched.
//!
//! Usage
//! -----
//!
//! ```rust,ignore
//! let clocks = ClockTree::new(&clk_mmio, Oscillators::MA35D1_DEFAULT);
//! clocks.enable(ids::SDH0_GATE)?;
//! let sd_hz = clocks.get_rate(ids::SDH0_MUX)?;
//! ```
//!
//! Failure handling follows the controller, not the caller: a PLL target
//! that cannot be synthesized answers `Ok(0)` and leaves the PLL alone, and
//! a mux target that no parent provides answers the gate's root rate and
//! leaves the selector alone. Rate requests only fail for unknown ids.

use core::cell::Cell;

use log::{debug, trace, warn};

use crate::clocks::ids::{self, clock_name, ClockId};
use crate::clocks::pll::{self, PllMode, PllRegs, PllSolution};
use crate::clocks::registers::{
    offset, ClkSel0, ClockRegisters, PllCtl1, SmicPllCtl0, CLKSEL0, PLL_CTL1, SMIC_PLL_CTL0,
};
use crate::clocks::topology::{
    self, ClockNode, Divider, Gate, Mux, PllKind, RootSource, PLL_COUNT,
};
use crate::clocks::ClockProvider;
use crate::config::{Oscillators, CONFIG};
use crate::ErrorCode;

fn name(id: ClockId) -> &'static str {
    clock_name(id).unwrap_or("?")
}

/// Rates cached by the tree.
pub struct ClockTreeState {
    pll_hz: [Cell<u64>; PLL_COUNT],
    pll_mode: [Cell<PllMode>; PLL_COUNT],
    ca35_hz: Cell<u64>,
    sysclk_hz: [Cell<u64>; 2],
}

impl ClockTreeState {
    fn new() -> ClockTreeState {
        ClockTreeState {
            pll_hz: core::array::from_fn(|_| Cell::new(0)),
            pll_mode: core::array::from_fn(|_| Cell::new(PllMode::Integer)),
            ca35_hz: Cell::new(0),
            sysclk_hz: core::array::from_fn(|_| Cell::new(0)),
        }
    }

    pub fn pll_hz(&self, kind: PllKind) -> u64 {
        self.pll_hz[kind.index()].get()
    }

    pub fn pll_mode(&self, kind: PllKind) -> PllMode {
        self.pll_mode[kind.index()].get()
    }

    /// Cortex-A35 core clock.
    pub fn ca35_hz(&self) -> u64 {
        self.ca35_hz.get()
    }

    pub fn sysclk0_hz(&self) -> u64 {
        self.sysclk_hz[0].get()
    }

    pub fn sysclk1_hz(&self) -> u64 {
        self.sysclk_hz[1].get()
    }
}

/// What a rate request would do to the hardware.
enum RatePlan {
    /// Nothing to program; the clock runs at this rate.
    Unchanged(u64),
    /// No PLL setting reaches the target.
    Unreachable,
    /// No mux parent runs at the target; carries the gate root rate.
    NoParent(u64),
    Pll {
        kind: PllKind,
        mode: PllMode,
        solution: PllSolution,
    },
    Select {
        mux: Mux,
        index: usize,
        rate_hz: u64,
    },
}

impl RatePlan {
    fn rate_hz(&self) -> u64 {
        match *self {
            RatePlan::Unchanged(hz) | RatePlan::NoParent(hz) => hz,
            RatePlan::Unreachable => 0,
            RatePlan::Pll { solution, .. } => solution.rate_hz,
            RatePlan::Select { rate_hz, .. } => rate_hz,
        }
    }
}

pub struct ClockTree<'a, R: ClockRegisters> {
    registers: &'a R,
    oscillators: Oscillators,
    state: ClockTreeState,
}

impl<'a, R: ClockRegisters> ClockTree<'a, R> {
    /// Read back every PLL and bus mux from `registers`.
    ///
    /// Nothing is written: the tree starts from whatever the boot ROM or an
    /// earlier stage programmed.
    pub fn new(registers: &'a R, oscillators: Oscillators) -> ClockTree<'a, R> {
        let tree = ClockTree {
            registers,
            oscillators,
            state: ClockTreeState::new(),
        };
        for kind in PllKind::ALL {
            let hz = tree.read_back_pll(kind);
            debug!(
                "clk: {} {} Hz ({:?})",
                name(kind.id()),
                hz,
                tree.state.pll_mode(kind)
            );
        }
        tree.refresh_bus_clocks();
        tree
    }

    pub fn state(&self) -> &ClockTreeState {
        &self.state
    }

    pub fn oscillators(&self) -> &Oscillators {
        &self.oscillators
    }

    /// Cached operating mode of a PLL.
    pub fn pll_mode(&self, id: ClockId) -> Result<PllMode, ErrorCode> {
        match *self.node(id)? {
            ClockNode::Pll(spec) => Ok(self.state.pll_mode(spec.kind)),
            _ => Err(ErrorCode::INVAL),
        }
    }

    /// Frequency of `root`. Every root resolves; reserved selector values
    /// read as the HXT crystal.
    pub fn resolve_root(&self, root: RootSource) -> u64 {
        let osc = &self.oscillators;
        let pll = |kind| self.state.pll_hz(kind);
        let sysclk1 = self.state.sysclk1_hz();
        match root {
            RootSource::Hxt | RootSource::Unspecified => osc.hxt_hz,
            RootSource::Lxt => osc.lxt_hz,
            RootSource::Hirc => osc.hirc_hz,
            RootSource::Lirc => osc.lirc_hz,
            RootSource::CaPll => pll(PllKind::CaPll),
            RootSource::SysPll => pll(PllKind::SysPll),
            RootSource::DdrPll => pll(PllKind::DdrPll),
            RootSource::APll => pll(PllKind::APll),
            RootSource::EPll => pll(PllKind::EPll),
            RootSource::VPll => pll(PllKind::VPll),
            RootSource::CaPllDiv2 | RootSource::Axi0Aclk => pll(PllKind::CaPll) / 2,
            RootSource::CaPllDiv4 => pll(PllKind::CaPll) / 4,
            RootSource::EPllDiv2 => pll(PllKind::EPll) / 2,
            RootSource::EPllDiv4 => pll(PllKind::EPll) / 4,
            RootSource::VPllDiv2 => pll(PllKind::VPll) / 2,
            RootSource::Ca35 => self.state.ca35_hz(),
            RootSource::SysClk0 => self.state.sysclk0_hz(),
            RootSource::SysClk1
            | RootSource::Hclk0
            | RootSource::Hclk1
            | RootSource::Hclk2
            | RootSource::Pclk0
            | RootSource::Pclk1
            | RootSource::Pclk2 => sysclk1,
            RootSource::SysClk1Div2 | RootSource::Hclk3 | RootSource::Pclk3 | RootSource::Pclk4 => {
                sysclk1 / 2
            }
            RootSource::Pclk3Div4096 | RootSource::Pclk4Div4096 => sysclk1 / 2 / 4096,
            RootSource::UsbPhy0 => osc.usbphy0_hz,
            RootSource::UsbPhy1 => osc.usbphy1_hz,
        }
    }

    fn node(&self, id: ClockId) -> Result<&'static ClockNode, ErrorCode> {
        topology::clock_node(id).ok_or_else(|| {
            warn!("clk: no clock with id {}", id);
            ErrorCode::NODEVICE
        })
    }

    fn read_pll_regs(&self, kind: PllKind) -> PllRegs {
        PllRegs {
            ctl0: self.registers.read32(kind.ctl0_offset()),
            ctl1: self.registers.read32(kind.ctl1_offset()),
            ctl2: self.registers.read32(kind.ctl2_offset()),
        }
    }

    /// Decode a PLL from its registers and refresh its cached mode and rate.
    fn read_back_pll(&self, kind: PllKind) -> u64 {
        let regs = self.read_pll_regs(kind);
        let mode = if kind.is_fixed_ratio() {
            PllMode::FixedRatio
        } else {
            PllMode::from_ctl0(regs.ctl0)
        };
        let hz = pll::decode(mode, self.oscillators.hxt_hz, regs);
        self.state.pll_mode[kind.index()].set(mode);
        self.state.pll_hz[kind.index()].set(hz);
        hz
    }

    fn mux_rate(&self, mux: &Mux) -> u64 {
        let selector = mux.selector(self.registers.read32(mux.offset));
        mux.parents
            .get(selector)
            .map_or(self.oscillators.hxt_hz, |&parent| self.resolve_root(parent))
    }

    fn divider_ratio(&self, div: &Divider) -> u64 {
        div.ratio(self.registers.read32(div.offset))
    }

    fn refresh_bus_clocks(&self) {
        self.state.ca35_hz.set(self.mux_rate(&topology::CA35_SEL));
        self.state.sysclk_hz[0].set(self.mux_rate(&topology::SYSCLK0_SEL));
        self.state.sysclk_hz[1].set(self.mux_rate(&topology::SYSCLK1_SEL));
        debug!(
            "clk: ca35 {} Hz, sysclk0 {} Hz, sysclk1 {} Hz",
            self.state.ca35_hz(),
            self.state.sysclk0_hz(),
            self.state.sysclk1_hz()
        );
    }

    fn plan(&self, id: ClockId, target_hz: u64) -> Result<RatePlan, ErrorCode> {
        let plan = match *self.node(id)? {
            ClockNode::Pll(spec) => self.plan_pll(spec.kind, target_hz),
            ClockNode::Gate(gate) => RatePlan::Unchanged(self.resolve_root(gate.root)),
            ClockNode::Mux { gate, mux } => self.plan_select(&gate, &mux, None, target_hz),
            ClockNode::Div {
                gate,
                mux: Some(mux),
                div,
            } => self.plan_select(&gate, &mux, Some(&div), target_hz),
            ClockNode::Div {
                gate,
                mux: None,
                div,
            } => RatePlan::Unchanged(self.resolve_root(gate.root) / self.divider_ratio(&div)),
        };
        Ok(plan)
    }

    fn plan_pll(&self, kind: PllKind, target_hz: u64) -> RatePlan {
        if kind.is_fixed_ratio() {
            return RatePlan::Unchanged(self.state.pll_hz(kind));
        }
        let mode = self.state.pll_mode(kind);
        match pll::solve(mode, self.oscillators.hxt_hz, target_hz) {
            Some(solution) => RatePlan::Pll {
                kind,
                mode,
                solution,
            },
            None => RatePlan::Unreachable,
        }
    }

    /// Pick the first parent running exactly at `target_hz`. Reserved
    /// selector values are never picked.
    fn plan_select(
        &self,
        gate: &Gate,
        mux: &Mux,
        div: Option<&Divider>,
        target_hz: u64,
    ) -> RatePlan {
        let index = mux.parents.iter().position(|&parent| {
            parent != RootSource::Unspecified && self.resolve_root(parent) == target_hz
        });
        match index {
            Some(index) => RatePlan::Select {
                mux: *mux,
                index,
                rate_hz: div.map_or(target_hz, |div| target_hz / self.divider_ratio(div)),
            },
            None => RatePlan::NoParent(self.resolve_root(gate.root)),
        }
    }

    fn program_pll(&self, kind: PllKind, mode: PllMode, solution: &PllSolution) {
        if solution.fallback {
            warn!(
                "clk: {} target out of range, using {} Hz default",
                name(kind.id()),
                solution.rate_hz
            );
        }
        let regs = pll::merge(mode, self.read_pll_regs(kind), solution.regs);
        self.registers.write32(kind.ctl0_offset(), regs.ctl0);
        self.registers.write32(kind.ctl1_offset(), regs.ctl1);
        if mode == PllMode::SpreadSpectrum {
            self.registers.write32(kind.ctl2_offset(), regs.ctl2);
        }
        debug!(
            "clk: {} ctl0={:#010x} ctl1={:#010x} ctl2={:#010x} -> {} Hz",
            name(kind.id()),
            regs.ctl0,
            regs.ctl1,
            regs.ctl2,
            solution.rate_hz
        );
        self.read_back_pll(kind);
        self.refresh_bus_clocks();
    }

    fn set_pll_power(&self, kind: PllKind, on: bool) {
        if kind.is_fixed_ratio() {
            let mut ctl0 = SmicPllCtl0::new(self.registers.read32(kind.ctl0_offset()));
            ctl0.modify(if on {
                SMIC_PLL_CTL0::PD::CLEAR
            } else {
                SMIC_PLL_CTL0::PD::SET
            });
            self.registers.write32(kind.ctl0_offset(), ctl0.get());
        } else {
            let mut ctl1 = PllCtl1::new(self.registers.read32(kind.ctl1_offset()));
            ctl1.modify(if on {
                PLL_CTL1::PD::CLEAR
            } else {
                PLL_CTL1::PD::SET
            });
            self.registers.write32(kind.ctl1_offset(), ctl1.get());
        }
    }

    fn pll_powered(&self, kind: PllKind) -> bool {
        if kind.is_fixed_ratio() {
            !SmicPllCtl0::new(self.registers.read32(kind.ctl0_offset())).is_set(SMIC_PLL_CTL0::PD)
        } else {
            !PllCtl1::new(self.registers.read32(kind.ctl1_offset())).is_set(PLL_CTL1::PD)
        }
    }

    /// The SD host gates only clock the card once their source is the system
    /// PLL, so enabling them also switches SD0SEL/SD1SEL.
    fn route_sd_to_syspll(&self, id: ClockId) {
        let field = match id {
            ids::SDH0_GATE => CLKSEL0::SD0SEL::SysPll,
            ids::SDH1_GATE => CLKSEL0::SD1SEL::SysPll,
            _ => return,
        };
        let mut clksel0 = ClkSel0::new(self.registers.read32(offset::CLKSEL0));
        clksel0.modify(field);
        self.registers.write32(offset::CLKSEL0, clksel0.get());
    }
}

impl<R: ClockRegisters> ClockProvider for ClockTree<'_, R> {
    fn get_rate(&self, id: ClockId) -> Result<u64, ErrorCode> {
        let rate = match *self.node(id)? {
            ClockNode::Pll(spec) => self.read_back_pll(spec.kind),
            ClockNode::Gate(gate) => self.resolve_root(gate.root),
            ClockNode::Mux { mux, .. } => self.mux_rate(&mux),
            ClockNode::Div { gate, mux, div } => {
                let parent = match mux {
                    Some(mux) => self.mux_rate(&mux),
                    None => self.resolve_root(gate.root),
                };
                parent / self.divider_ratio(&div)
            }
        };
        if CONFIG.trace_clocks {
            trace!("clk: {} = {} Hz", name(id), rate);
        }
        Ok(rate)
    }

    fn set_rate(&self, id: ClockId, target_hz: u64) -> Result<u64, ErrorCode> {
        match self.plan(id, target_hz)? {
            RatePlan::Unchanged(hz) => Ok(hz),
            RatePlan::Unreachable => {
                warn!("clk: {} cannot be set to {} Hz", name(id), target_hz);
                Ok(0)
            }
            RatePlan::NoParent(hz) => {
                warn!("clk: {} has no parent at {} Hz", name(id), target_hz);
                Ok(hz)
            }
            RatePlan::Pll {
                kind,
                mode,
                solution,
            } => {
                self.program_pll(kind, mode, &solution);
                Ok(solution.rate_hz)
            }
            RatePlan::Select {
                mux,
                index,
                rate_hz,
            } => {
                self.registers
                    .modify32(mux.offset, mux.mask(), (index as u32) << mux.shift);
                debug!("clk: {} selects parent {} -> {} Hz", name(id), index, rate_hz);
                if topology::is_bus_mux(id) {
                    self.refresh_bus_clocks();
                }
                Ok(rate_hz)
            }
        }
    }

    fn round_rate(&self, id: ClockId, target_hz: u64) -> Result<u64, ErrorCode> {
        Ok(self.plan(id, target_hz)?.rate_hz())
    }

    fn enable(&self, id: ClockId) -> Result<(), ErrorCode> {
        match *self.node(id)? {
            ClockNode::Pll(spec) => self.set_pll_power(spec.kind, true),
            node => {
                if let Some(bit) = node.gate().and_then(|gate| gate.enable) {
                    self.registers.modify32(bit.offset, 0, 1 << bit.bit);
                }
                self.route_sd_to_syspll(id);
            }
        }
        Ok(())
    }

    fn disable(&self, id: ClockId) -> Result<(), ErrorCode> {
        match *self.node(id)? {
            ClockNode::Pll(spec) if spec.kind.is_always_on() => {
                warn!("clk: {} is always on", name(id));
                Ok(())
            }
            ClockNode::Pll(spec) => {
                self.set_pll_power(spec.kind, false);
                Ok(())
            }
            node => match node.gate().and_then(|gate| gate.enable) {
                Some(bit) => {
                    self.registers.modify32(bit.offset, 1 << bit.bit, 0);
                    Ok(())
                }
                None => Err(ErrorCode::NOSUPPORT),
            },
        }
    }

    fn is_enabled(&self, id: ClockId) -> Result<bool, ErrorCode> {
        match *self.node(id)? {
            ClockNode::Pll(spec) => Ok(self.pll_powered(spec.kind)),
            node => Ok(node
                .gate()
                .and_then(|gate| gate.enable)
                .map_or(true, |bit| {
                    self.registers.read32(bit.offset) & (1 << bit.bit) != 0
                })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clocks::ids::*;
    use crate::clocks::registers::FakeClkRegisters;

    const HXT: u64 = 24_000_000;

    /// CA-PLL 800 MHz, SYS-PLL 180 MHz, DDR-PLL 533 MHz, A-PLL 24 MHz,
    /// E-PLL 500 MHz, V-PLL 884.736 MHz fractional. CA35 runs from the
    /// CA-PLL, both system clocks from the SYS-PLL.
    fn board(overrides: &[(usize, u32)]) -> FakeClkRegisters {
        let mut values = vec![
            (PllKind::CaPll.ctl0_offset(), 0x0364),
            (PllKind::SysPll.ctl0_offset(), 0x110F),
            (PllKind::DdrPll.ctl0_offset(), 0x6215),
            (PllKind::DdrPll.ctl1_offset(), 0x40),
            (PllKind::APll.ctl0_offset(), 0x401C),
            (PllKind::APll.ctl1_offset(), 0x70),
            (PllKind::EPll.ctl0_offset(), 0x307D),
            (PllKind::EPll.ctl1_offset(), 0x20),
            (PllKind::VPll.ctl0_offset(), 0x41024),
            (PllKind::VPll.ctl1_offset(), 0xDD2F_1B10),
            (offset::CLKSEL0, 0x15),
        ];
        values.extend_from_slice(overrides);
        FakeClkRegisters::with(&values)
    }

    fn tree(regs: &FakeClkRegisters) -> ClockTree<'_, FakeClkRegisters> {
        ClockTree::new(regs, Oscillators::MA35D1_DEFAULT)
    }

    #[test]
    fn probe_reads_back_without_writing() {
        let regs = board(&[]);
        let clocks = tree(&regs);
        assert_eq!(regs.writes(), 0);

        assert_eq!(clocks.get_rate(CAPLL), Ok(800_000_000));
        assert_eq!(clocks.get_rate(SYSPLL), Ok(180_000_000));
        assert_eq!(clocks.get_rate(DDRPLL), Ok(533_000_000));
        assert_eq!(clocks.get_rate(APLL), Ok(24_000_000));
        assert_eq!(clocks.get_rate(EPLL), Ok(500_000_000));
        assert_eq!(clocks.get_rate(VPLL), Ok(884_736_000));

        assert_eq!(clocks.pll_mode(CAPLL), Ok(PllMode::FixedRatio));
        assert_eq!(clocks.pll_mode(APLL), Ok(PllMode::Integer));
        assert_eq!(clocks.pll_mode(VPLL), Ok(PllMode::Fractional));
        assert_eq!(clocks.pll_mode(I2C0_GATE), Err(ErrorCode::INVAL));

        assert_eq!(clocks.state().ca35_hz(), 800_000_000);
        assert_eq!(clocks.state().sysclk0_hz(), 180_000_000);
        assert_eq!(clocks.state().sysclk1_hz(), 180_000_000);
    }

    #[test]
    fn unprogrammed_plls_read_zero() {
        let regs = FakeClkRegisters::new();
        let clocks = tree(&regs);
        for kind in PllKind::ALL {
            assert_eq!(clocks.get_rate(kind.id()), Ok(0));
        }
        // CA35 selector 0 is the crystal.
        assert_eq!(clocks.state().ca35_hz(), HXT);
    }

    #[test]
    fn gates_follow_their_root() {
        let regs = board(&[]);
        let clocks = tree(&regs);
        assert_eq!(clocks.get_rate(HXT_GATE), Ok(HXT));
        assert_eq!(clocks.get_rate(LXT_GATE), Ok(32_768));
        assert_eq!(clocks.get_rate(RTC_GATE), Ok(32_768));
        assert_eq!(clocks.get_rate(I2C0_GATE), Ok(180_000_000));
        assert_eq!(clocks.get_rate(GPA_GATE), Ok(180_000_000));
        assert_eq!(clocks.get_rate(WDT1_GATE), Ok(90_000_000));
        assert_eq!(clocks.get_rate(EMAC0_GATE), Ok(250_000_000));
        assert_eq!(clocks.get_rate(USBH_GATE), Ok(480_000_000));
        assert_eq!(clocks.get_rate(DDR0_GATE), Ok(533_000_000));
    }

    #[test]
    fn derived_roots() {
        let regs = board(&[]);
        let clocks = tree(&regs);
        assert_eq!(clocks.resolve_root(RootSource::Unspecified), HXT);
        assert_eq!(clocks.resolve_root(RootSource::CaPllDiv4), 200_000_000);
        assert_eq!(clocks.resolve_root(RootSource::Axi0Aclk), 400_000_000);
        assert_eq!(clocks.resolve_root(RootSource::VPllDiv2), 442_368_000);
        assert_eq!(clocks.resolve_root(RootSource::Hclk3), 90_000_000);
        assert_eq!(clocks.resolve_root(RootSource::Pclk4Div4096), 21_972);
    }

    #[test]
    fn dividers() {
        // EMAC0 field 1 (/4), DCUP field 0 (/2), ACLK0 field 0 (/2).
        let regs = board(&[(offset::CLKDIV0, 1 << 28)]);
        let clocks = tree(&regs);
        assert_eq!(clocks.get_rate(EMAC0_DIV), Ok(62_500_000));
        assert_eq!(clocks.get_rate(EMAC1_DIV), Ok(125_000_000));
        assert_eq!(clocks.get_rate(ACLK0_DIV), Ok(400_000_000));
        assert_eq!(clocks.get_rate(DCUP_DIV), Ok(442_368_000));

        // Read-only dividers ignore rate requests.
        assert_eq!(clocks.set_rate(EMAC0_DIV, 1), Ok(62_500_000));
        assert_eq!(regs.writes(), 0);
    }

    #[test]
    fn mux_selects_exact_parent() {
        let regs = board(&[]);
        let clocks = tree(&regs);
        assert_eq!(clocks.get_rate(SDH0_MUX), Ok(180_000_000));

        assert_eq!(clocks.set_rate(SDH0_MUX, 24_000_000), Ok(24_000_000));
        assert_eq!((regs.read32(offset::CLKSEL0) >> 16) & 0x3, 1);
        assert_eq!(clocks.get_rate(SDH0_MUX), Ok(24_000_000));
        // Other selectors in the register are untouched.
        assert_eq!(regs.read32(offset::CLKSEL0) & 0xFFFF, 0x15);
    }

    #[test]
    fn mux_miss_keeps_selection() {
        let regs = board(&[]);
        let clocks = tree(&regs);
        let before = clocks.get_rate(SDH0_MUX);
        assert_eq!(clocks.set_rate(SDH0_MUX, 999), Ok(180_000_000));
        assert_eq!(regs.writes(), 0);
        assert_eq!(clocks.get_rate(SDH0_MUX), before);
    }

    #[test]
    fn mux_never_selects_reserved_values() {
        let regs = board(&[]);
        let clocks = tree(&regs);
        // Only the reserved selector slots now resolve to 24 MHz.
        assert_eq!(clocks.set_rate(APLL, 1_000_000_000), Ok(1_000_000_000));
        let writes = regs.writes();

        assert_eq!(clocks.set_rate(SPI0_MUX, 24_000_000), Ok(180_000_000));
        assert_eq!(clocks.round_rate(SDH0_MUX, 24_000_000), Ok(180_000_000));
        assert_eq!(clocks.set_rate(SDH0_MUX, 24_000_000), Ok(180_000_000));
        assert_eq!(regs.writes(), writes);
        assert_eq!(regs.read32(offset::CLKSEL4), 0);
        assert_eq!((regs.read32(offset::CLKSEL0) >> 16) & 0x3, 0);
        assert_eq!(clocks.get_rate(SPI0_MUX), Ok(180_000_000));
    }

    #[test]
    fn mux_in_front_of_divider() {
        let regs = board(&[]);
        let clocks = tree(&regs);
        // A miss answers the undivided V-PLL root.
        assert_eq!(clocks.set_rate(DCUP_DIV, 999), Ok(884_736_000));
        assert_eq!(regs.writes(), 0);
        assert_eq!(clocks.get_rate(DCUP_DIV), Ok(442_368_000));

        // DCUP mux parent 1 is the A-PLL; the divider halves it.
        assert_eq!(clocks.set_rate(DCUP_DIV, 24_000_000), Ok(12_000_000));
        assert_eq!(clocks.get_rate(DCUP_DIV), Ok(12_000_000));
        assert_eq!(clocks.get_rate(DCUP_MUX), Ok(24_000_000));
    }

    #[test]
    fn bus_mux_write_refreshes_bus_clocks() {
        let regs = board(&[]);
        let clocks = tree(&regs);
        // The crystal is parent 0, ahead of the 24 MHz A-PLL.
        assert_eq!(clocks.set_rate(SYSCLK1_MUX, 24_000_000), Ok(24_000_000));
        assert_eq!((regs.read32(offset::CLKSEL0) >> 4) & 0x3, 0);
        assert_eq!(clocks.get_rate(I2C0_GATE), Ok(24_000_000));
        assert_eq!(clocks.get_rate(WDT1_GATE), Ok(12_000_000));
    }

    #[test]
    fn pll_reprogramming_refreshes_bus_clocks() {
        let regs = board(&[]);
        let clocks = tree(&regs);
        assert_eq!(clocks.set_rate(APLL, 1_000_000_000), Ok(1_000_000_000));
        assert_eq!(clocks.set_rate(SYSCLK1_MUX, 1_000_000_000), Ok(1_000_000_000));
        assert_eq!(clocks.get_rate(I2C0_GATE), Ok(1_000_000_000));

        assert_eq!(clocks.set_rate(APLL, 800_000_000), Ok(800_000_000));
        assert_eq!(clocks.get_rate(I2C0_GATE), Ok(800_000_000));
    }

    #[test]
    fn integer_pll_set_rate() {
        let regs = board(&[]);
        let clocks = tree(&regs);
        assert_eq!(clocks.set_rate(APLL, 1_000_000_000), Ok(1_000_000_000));
        assert_eq!(regs.read32(PllKind::APll.ctl0_offset()), 0x307D);
        assert_eq!(regs.read32(PllKind::APll.ctl1_offset()), 0x10);
        assert_eq!(regs.writes(), 2);
        assert_eq!(clocks.get_rate(APLL), Ok(1_000_000_000));
    }

    #[test]
    fn integer_pll_out_of_band_programs_default() {
        let regs = board(&[]);
        let clocks = tree(&regs);
        assert_eq!(clocks.set_rate(APLL, 3_000_000_000), Ok(1_000_000_000));
        assert_eq!(regs.read32(PllKind::APll.ctl0_offset()), 0x30FA);
        assert_eq!(clocks.get_rate(APLL), Ok(1_000_000_000));
    }

    #[test]
    fn fractional_pll_set_rate() {
        let regs = board(&[]);
        let clocks = tree(&regs);
        assert_eq!(clocks.set_rate(VPLL, 300_000_000), Ok(300_000_000));
        assert_eq!(regs.read32(PllKind::VPll.ctl0_offset()), 0x41019);
        assert_eq!(regs.read32(PllKind::VPll.ctl1_offset()), 0x20);
        assert_eq!(clocks.get_rate(VPLL), Ok(300_000_000));
        assert_eq!(clocks.pll_mode(VPLL), Ok(PllMode::Fractional));
    }

    #[test]
    fn unreachable_pll_target_changes_nothing() {
        let regs = board(&[]);
        let clocks = tree(&regs);
        assert_eq!(clocks.set_rate(VPLL, 0), Ok(0));
        assert_eq!(regs.writes(), 0);
        assert_eq!(clocks.get_rate(VPLL), Ok(884_736_000));
    }

    #[test]
    fn spread_spectrum_pll_set_rate() {
        let regs = board(&[
            (PllKind::EPll.ctl0_offset(), 0x0778_2085),
            (PllKind::EPll.ctl1_offset(), 0x60),
            (PllKind::EPll.ctl2_offset(), 0x5_8CF9),
        ]);
        let clocks = tree(&regs);
        assert_eq!(clocks.pll_mode(EPLL), Ok(PllMode::SpreadSpectrum));
        assert_eq!(clocks.get_rate(EPLL), Ok(266_000_000));

        let expected = pll::solve(PllMode::SpreadSpectrum, HXT, 500_000_000).unwrap();
        assert_eq!(clocks.set_rate(EPLL, 500_000_000), Ok(expected.rate_hz));
        assert_eq!(regs.read32(PllKind::EPll.ctl2_offset()), expected.regs.ctl2);
        assert_eq!(regs.writes(), 3);
        assert_eq!(clocks.pll_mode(EPLL), Ok(PllMode::SpreadSpectrum));
    }

    #[test]
    fn fixed_ratio_pll_ignores_rate_requests() {
        let regs = board(&[]);
        let clocks = tree(&regs);
        assert_eq!(clocks.set_rate(SYSPLL, 1_000_000_000), Ok(180_000_000));
        assert_eq!(clocks.set_rate(CAPLL, 1), Ok(800_000_000));
        assert_eq!(regs.writes(), 0);
    }

    #[test]
    fn round_rate_is_pure() {
        let regs = board(&[]);
        let clocks = tree(&regs);
        assert_eq!(clocks.round_rate(APLL, 1_000_000_000), Ok(1_000_000_000));
        assert_eq!(clocks.round_rate(VPLL, 0), Ok(0));
        assert_eq!(clocks.round_rate(SDH0_MUX, 24_000_000), Ok(24_000_000));
        assert_eq!(clocks.round_rate(SDH0_MUX, 999), Ok(180_000_000));
        assert_eq!(clocks.round_rate(SYSPLL, 1), Ok(180_000_000));
        assert_eq!(regs.writes(), 0);
        assert_eq!(clocks.get_rate(APLL), Ok(24_000_000));
    }

    #[test]
    fn gate_enable_and_disable() {
        let regs = board(&[]);
        let clocks = tree(&regs);
        assert_eq!(clocks.is_enabled(I2C0_GATE), Ok(false));
        assert_eq!(clocks.enable(I2C0_GATE), Ok(()));
        assert_eq!(regs.read32(offset::APBCLK1), 0x1);
        assert_eq!(clocks.is_enabled(I2C0_GATE), Ok(true));
        assert_eq!(clocks.disable(I2C0_GATE), Ok(()));
        assert_eq!(regs.read32(offset::APBCLK1), 0x0);

        // Not an SD gate: the source selection stays put.
        clocks.enable(NAND_GATE).unwrap();
        assert_eq!(regs.read32(offset::CLKSEL0), 0x15);
    }

    #[test]
    fn sd_gates_route_to_syspll() {
        let regs = board(&[(offset::CLKSEL0, 0x15 | (1 << 16))]);
        let clocks = tree(&regs);
        assert_eq!(clocks.get_rate(SDH0_MUX), Ok(24_000_000));

        clocks.enable(SDH0_GATE).unwrap();
        assert_eq!(regs.read32(offset::SYSCLK0), 1 << 16);
        assert_eq!((regs.read32(offset::CLKSEL0) >> 16) & 0x3, 3);
        assert_eq!(clocks.get_rate(SDH0_MUX), Ok(180_000_000));

        clocks.enable(SDH1_GATE).unwrap();
        assert_eq!((regs.read32(offset::CLKSEL0) >> 18) & 0x3, 3);
        assert_eq!(regs.read32(offset::CLKSEL0) & 0xFFFF, 0x15);
    }

    #[test]
    fn ungated_bus_clocks() {
        let regs = board(&[]);
        let clocks = tree(&regs);
        assert_eq!(clocks.enable(SYSCLK0_MUX), Ok(()));
        assert_eq!(clocks.is_enabled(SYSCLK1_MUX), Ok(true));
        assert_eq!(clocks.disable(SYSCLK0_MUX), Err(ErrorCode::NOSUPPORT));
        assert_eq!(clocks.disable(ACLK0_DIV), Err(ErrorCode::NOSUPPORT));
        assert_eq!(regs.writes(), 0);
    }

    #[test]
    fn pll_power_down() {
        let regs = board(&[]);
        let clocks = tree(&regs);
        assert_eq!(clocks.disable(APLL), Ok(()));
        assert_eq!(regs.read32(PllKind::APll.ctl1_offset()), 0x71);
        assert_eq!(clocks.is_enabled(APLL), Ok(false));
        assert_eq!(clocks.enable(APLL), Ok(()));
        assert_eq!(clocks.is_enabled(APLL), Ok(true));

        // Fixed-ratio PLLs keep the power-down bit in CTL0.
        assert_eq!(clocks.disable(SYSPLL), Ok(()));
        assert_eq!(regs.read32(PllKind::SysPll.ctl0_offset()), 0x1110F);
        assert_eq!(clocks.is_enabled(SYSPLL), Ok(false));
        assert_eq!(clocks.get_rate(SYSPLL), Ok(180_000_000));
    }

    #[test]
    fn always_on_plls_ignore_disable() {
        let regs = board(&[]);
        let clocks = tree(&regs);
        let writes = regs.writes();
        assert_eq!(clocks.disable(CAPLL), Ok(()));
        assert_eq!(clocks.disable(DDRPLL), Ok(()));
        assert_eq!(regs.writes(), writes);
        assert_eq!(clocks.is_enabled(CAPLL), Ok(true));
        assert_eq!(clocks.is_enabled(DDRPLL), Ok(true));
    }

    #[test]
    fn invalid_ids_touch_nothing() {
        let regs = board(&[]);
        let clocks = tree(&regs);
        for id in [CLK_MAX, CLK_MAX + 1, usize::MAX] {
            assert_eq!(clocks.get_rate(id), Err(ErrorCode::NODEVICE));
            assert_eq!(clocks.set_rate(id, 24_000_000), Err(ErrorCode::NODEVICE));
            assert_eq!(clocks.round_rate(id, 24_000_000), Err(ErrorCode::NODEVICE));
            assert_eq!(clocks.enable(id), Err(ErrorCode::NODEVICE));
            assert_eq!(clocks.disable(id), Err(ErrorCode::NODEVICE));
            assert_eq!(clocks.is_enabled(id), Err(ErrorCode::NODEVICE));
            assert_eq!(clocks.pll_mode(id), Err(ErrorCode::NODEVICE));
        }
        assert_eq!(regs.writes(), 0);
    }

    #[test]
    fn get_rate_is_idempotent() {
        let regs = board(&[(offset::CLKDIV0, 0x5A00_0000)]);
        let clocks = tree(&regs);
        for id in 0..CLK_MAX {
            assert_eq!(clocks.get_rate(id), clocks.get_rate(id), "{}", name(id));
        }
        assert_eq!(regs.writes(), 0);
    }
}
