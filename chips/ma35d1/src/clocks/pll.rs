// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! PLL frequency synthesis and read-back for the MA35D1.
//!
//! The A-PLL, E-PLL, V-PLL and DDR-PLL produce
//!
//! ```text
//! Fout = Fref / M * (N + FRAC / 2^24) / P
//! ```
//!
//! with three operating modes:
//!
//! + integer: `FRAC` is unused, `(M, N, P)` is found by exhaustive search
//! + fractional: `P` and `M` are the smallest usable values, `N` carries a
//!   24-bit fractional part
//! + spread-spectrum: as fractional, plus a modulation rate and slope
//!
//! The CA-PLL and SYS-PLL are fixed-ratio PLLs with a different control word
//! layout. They are only ever read back, never solved for.
//!
//! Everything in this module is pure: solving returns the register words to
//! program and decoding takes register words. Touching hardware is the job
//! of [`crate::clocks::tree`].
//!
//! # Constraints
//!
//! | stage              | band                 |
//! |--------------------|----------------------|
//! | `Fref / M`         | 1 MHz - 40 MHz       |
//! | `Fref / M * N`     | 600 MHz - 2.4 GHz    |
//! | `Fout`             | 85.7 MHz - 2.4 GHz   |
//!
//! Targets outside the output band are answered with a 1 GHz default.

use log::warn;

use crate::clocks::registers::{
    PllCtl0, PllCtl1, PllCtl2, SmicPllCtl0, PLL_CTL0, PLL_CTL1, PLL_CTL2, SMIC_PLL_CTL0,
};

pub const REF_MIN_HZ: u64 = 1_000_000;
pub const REF_MAX_HZ: u64 = 200_000_000;
pub const PFD_MIN_HZ: u64 = 1_000_000;
pub const PFD_MAX_HZ: u64 = 40_000_000;
/// Fractional mode needs a faster phase detector input.
pub const FRAC_PFD_MIN_HZ: u64 = 10_000_000;
pub const VCO_MIN_HZ: u64 = 600_000_000;
pub const VCO_MAX_HZ: u64 = 2_400_000_000;
pub const OUT_MIN_HZ: u64 = 85_700_000;
pub const OUT_MAX_HZ: u64 = 2_400_000_000;

const M_RANGE: core::ops::RangeInclusive<u64> = 1..=63;
const N_RANGE: core::ops::RangeInclusive<u64> = 16..=2047;
const P_RANGE: core::ops::RangeInclusive<u64> = 1..=7;
/// Multipliers tried to lift a low fractional target into the output band.
const SCALE_RANGE: core::ops::RangeInclusive<u64> = 2..=99;

/// Spread-spectrum modulation frequency.
pub const SS_MODULATION_HZ: u64 = 50_000;
/// Spread-spectrum depth, in units of 0.01 %.
pub const SS_SPREAD: u64 = 194;

/// Largest values of `PLL_CTL0.SSRATE` and `PLL_CTL2.SLOPE`.
const SSRATE_MAX: u64 = 0x7FF;
const SLOPE_MAX: u64 = 0xFF_FFFF;

/// Safe default programmed when the target is out of band: M=3, N=250,
/// P=2, i.e. 1 GHz from a 24 MHz crystal.
pub const FALLBACK: PllRegs = PllRegs {
    ctl0: 0x30FA,
    ctl1: 0x20,
    ctl2: 0,
};
pub const FALLBACK_HZ: u64 = 1_000_000_000;

/// Spread-spectrum settings used instead of the derived ones. The slope
/// register only honours 16 bits on current silicon.
const SS_TABLE_THRESHOLD_HZ: u64 = 266_000_000;
const SS_TABLE_LOW: PllSolution = PllSolution {
    regs: PllRegs {
        ctl0: 0x0778_2085,
        ctl1: 0x60,
        ctl2: 0x5_8CF9,
    },
    rate_hz: 266_000_000,
    fallback: false,
};
const SS_TABLE_HIGH: PllSolution = PllSolution {
    regs: PllRegs {
        ctl0: 0x12b8_1016,
        ctl1: 0x3553_2610,
        ctl2: 0x9208,
    },
    rate_hz: 533_000_000,
    fallback: false,
};

/// PLL operating mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PllMode {
    Integer,
    Fractional,
    SpreadSpectrum,
    /// CA-PLL and SYS-PLL: fixed ratio, read back only.
    FixedRatio,
}

impl PllMode {
    /// Mode encoded in `PLL_CTL0.MODE`. Both values 2 and 3 select
    /// spread-spectrum operation.
    pub fn from_ctl0(ctl0: u32) -> PllMode {
        match PllCtl0::new(ctl0).read(PLL_CTL0::MODE) {
            0 => PllMode::Integer,
            1 => PllMode::Fractional,
            _ => PllMode::SpreadSpectrum,
        }
    }

    /// Value of `PLL_CTL0.MODE` for this mode.
    pub fn bits(self) -> u32 {
        match self {
            PllMode::Integer | PllMode::FixedRatio => 0,
            PllMode::Fractional => 1,
            PllMode::SpreadSpectrum => 2,
        }
    }
}

/// The three control words of a PLL.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PllRegs {
    pub ctl0: u32,
    pub ctl1: u32,
    pub ctl2: u32,
}

impl PllRegs {
    pub fn is_unprogrammed(&self) -> bool {
        self.ctl0 == 0 && self.ctl1 == 0 && self.ctl2 == 0
    }
}

/// Result of a PLL solve: the divider fields to program and the frequency
/// they produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PllSolution {
    /// Divider fields only. Mode bits and the power-down bit are merged in
    /// by [`merge`].
    pub regs: PllRegs,
    pub rate_hz: u64,
    /// Set when the target was out of band and [`FALLBACK`] was returned.
    pub fallback: bool,
}

impl PllSolution {
    const fn fallback() -> PllSolution {
        PllSolution {
            regs: FALLBACK,
            rate_hz: FALLBACK_HZ,
            fallback: true,
        }
    }
}

fn in_band(hz: u64, min: u64, max: u64) -> bool {
    hz >= min && hz <= max
}

fn pack(m: u64, n: u64, p: u64, frac: u64, ssrate: u64, slope: u64) -> PllRegs {
    let mut ctl0 = PllCtl0::new(0);
    ctl0.modify(
        PLL_CTL0::SSRATE.val(ssrate as u32)
            + PLL_CTL0::INDIV.val(m as u32)
            + PLL_CTL0::FBDIV.val(n as u32),
    );
    let mut ctl1 = PllCtl1::new(0);
    ctl1.modify(PLL_CTL1::OUTDIV.val(p as u32) + PLL_CTL1::FRAC.val(frac as u32));
    let mut ctl2 = PllCtl2::new(0);
    ctl2.modify(PLL_CTL2::SLOPE.val(slope as u32));
    PllRegs {
        ctl0: ctl0.get(),
        ctl1: ctl1.get(),
        ctl2: ctl2.get(),
    }
}

/// Integer mode: search every `(M, N, P)` and keep the first one closest to
/// the target.
///
/// The search runs M, then N, then P in ascending order and stops at the
/// first exact match. For a given `(M, N)` the output only decreases with P,
/// so the P loop is abandoned as soon as a non-improving candidate falls
/// below the target.
pub fn solve_integer(ref_hz: u64, target_hz: u64) -> PllSolution {
    if !in_band(target_hz, OUT_MIN_HZ, OUT_MAX_HZ) {
        return PllSolution::fallback();
    }

    let mut best: Option<(u64, u64, u64)> = None;
    let mut best_distance = u64::MAX;

    'search: for m in M_RANGE {
        let pfd_hz = ref_hz / m;
        if !in_band(pfd_hz, PFD_MIN_HZ, PFD_MAX_HZ) {
            continue;
        }
        for n in N_RANGE {
            let vco_hz = pfd_hz * n;
            if !in_band(vco_hz, VCO_MIN_HZ, VCO_MAX_HZ) {
                continue;
            }
            for p in P_RANGE {
                let out_hz = vco_hz / p;
                if !in_band(out_hz, OUT_MIN_HZ, OUT_MAX_HZ) {
                    continue;
                }
                let distance = out_hz.abs_diff(target_hz);
                if distance < best_distance {
                    best_distance = distance;
                    best = Some((m, n, p));
                    if distance == 0 {
                        break 'search;
                    }
                } else if out_hz < target_hz {
                    break;
                }
            }
        }
    }

    match best {
        Some((m, n, p)) => PllSolution {
            regs: pack(m, n, p, 0, 0, 0),
            rate_hz: ref_hz * n / (p * m),
            fallback: false,
        },
        // Reference too slow or too fast for any M.
        None => PllSolution::fallback(),
    }
}

/// P, M and `N * 1000` shared by the fractional and spread-spectrum modes.
struct FractionalDividers {
    m: u64,
    p: u64,
    n_milli: u64,
}

impl FractionalDividers {
    fn n(&self) -> u64 {
        self.n_milli / 1000
    }

    /// Thousandths of N, rounded into 24-bit fixed point.
    fn frac(&self) -> u64 {
        (((self.n_milli % 1000) << 24) + 500) / 1000
    }

    fn rate_hz(&self, ref_hz: u64) -> u64 {
        ref_hz * self.n_milli / self.p / self.m / 1000
    }
}

enum FractionalSearch {
    Found(FractionalDividers),
    OutOfBand,
    Failed,
}

fn search_fractional(ref_hz: u64, target_hz: u64) -> FractionalSearch {
    if !in_band(ref_hz, REF_MIN_HZ, REF_MAX_HZ) {
        return FractionalSearch::Failed;
    }

    let out_hz = if target_hz < OUT_MIN_HZ {
        match SCALE_RANGE
            .map(|i| i * target_hz)
            .find(|&hz| hz > OUT_MIN_HZ)
        {
            Some(hz) => hz,
            None => return FractionalSearch::Failed,
        }
    } else if target_hz >= OUT_MAX_HZ {
        return FractionalSearch::OutOfBand;
    } else {
        target_hz
    };

    let Some(p) = P_RANGE.clone().find(|&p| in_band(p * out_hz, VCO_MIN_HZ, VCO_MAX_HZ)) else {
        return FractionalSearch::Failed;
    };
    let Some(m) = M_RANGE.clone().find(|&m| in_band(ref_hz / m, FRAC_PFD_MIN_HZ, PFD_MAX_HZ)) else {
        return FractionalSearch::Failed;
    };

    FractionalSearch::Found(FractionalDividers {
        m,
        p,
        n_milli: out_hz * p * m * 1000 / ref_hz,
    })
}

/// Fractional mode.
///
/// Targets below the output band are multiplied by the smallest integer
/// that lifts them into it; the returned rate is the lifted one. Returns
/// `None` when the reference is outside 1-200 MHz or no usable P or M
/// exists.
pub fn solve_fractional(ref_hz: u64, target_hz: u64) -> Option<PllSolution> {
    match search_fractional(ref_hz, target_hz) {
        FractionalSearch::Found(d) => Some(PllSolution {
            regs: pack(d.m, d.n(), d.p, d.frac(), 0, 0),
            rate_hz: d.rate_hz(ref_hz),
            fallback: false,
        }),
        FractionalSearch::OutOfBand => Some(PllSolution::fallback()),
        FractionalSearch::Failed => None,
    }
}

/// Spread-spectrum mode, using the two register triples validated on
/// silicon: 266 MHz for targets up to 266 MHz, 533 MHz above.
pub fn solve_spread_spectrum_table(target_hz: u64) -> PllSolution {
    if target_hz <= SS_TABLE_THRESHOLD_HZ {
        SS_TABLE_LOW
    } else {
        SS_TABLE_HIGH
    }
}

/// Spread-spectrum mode derived from the fractional dividers.
///
/// `modulation_hz` is the modulation frequency and `spread` the depth in
/// units of 0.01 %.
pub fn solve_spread_spectrum_derived(
    ref_hz: u64,
    target_hz: u64,
    modulation_hz: u64,
    spread: u64,
) -> Option<PllSolution> {
    let d = match search_fractional(ref_hz, target_hz) {
        FractionalSearch::Found(d) => d,
        FractionalSearch::OutOfBand => return Some(PllSolution::fallback()),
        FractionalSearch::Failed => return None,
    };

    if modulation_hz == 0 {
        return None;
    }
    let ssrate = ((ref_hz >> 1) / (modulation_hz * 2)).checked_sub(1)?;
    if ssrate == 0 {
        return None;
    }
    if ssrate > SSRATE_MAX {
        warn!("pll: spread rate {} does not fit SSRATE", ssrate);
        return None;
    }
    let slope = ((d.n_milli * spread / ssrate) << 24) / 100 / 1000;
    if slope > SLOPE_MAX {
        warn!("pll: spread slope {:#x} does not fit SLOPE", slope);
        return None;
    }

    Some(PllSolution {
        regs: pack(d.m, d.n(), d.p, d.frac(), ssrate, slope),
        rate_hz: d.rate_hz(ref_hz),
        fallback: false,
    })
}

/// Spread-spectrum mode as configured by
/// `CONFIG.spread_spectrum_derivation`.
pub fn solve_spread_spectrum(ref_hz: u64, target_hz: u64) -> Option<PllSolution> {
    if crate::config::CONFIG.spread_spectrum_derivation {
        solve_spread_spectrum_derived(ref_hz, target_hz, SS_MODULATION_HZ, SS_SPREAD)
    } else {
        Some(solve_spread_spectrum_table(target_hz))
    }
}

/// Solve for `target_hz` in `mode`. `None` means no rate could be derived;
/// fixed-ratio PLLs are never solved for.
pub fn solve(mode: PllMode, ref_hz: u64, target_hz: u64) -> Option<PllSolution> {
    match mode {
        PllMode::Integer => Some(solve_integer(ref_hz, target_hz)),
        PllMode::Fractional => solve_fractional(ref_hz, target_hz),
        PllMode::SpreadSpectrum => solve_spread_spectrum(ref_hz, target_hz),
        PllMode::FixedRatio => None,
    }
}

/// Merge a solution into the current control words, leaving every field the
/// mode does not own untouched.
pub fn merge(mode: PllMode, current: PllRegs, solved: PllRegs) -> PllRegs {
    let mut ctl0 = PllCtl0::new(current.ctl0);
    let mut ctl1 = PllCtl1::new(current.ctl1);
    let mut ctl2 = PllCtl2::new(current.ctl2);

    ctl0.modify(PLL_CTL0::MODE.val(mode.bits()) + PLL_CTL0::INDIV::CLEAR + PLL_CTL0::FBDIV::CLEAR);
    ctl1.modify(PLL_CTL1::OUTDIV::CLEAR);
    match mode {
        PllMode::Integer | PllMode::FixedRatio => {}
        PllMode::Fractional => ctl1.modify(PLL_CTL1::FRAC::CLEAR),
        PllMode::SpreadSpectrum => {
            ctl0.modify(PLL_CTL0::SSRATE::CLEAR);
            ctl1.modify(PLL_CTL1::FRAC::CLEAR);
            ctl2.set(solved.ctl2);
        }
    }

    PllRegs {
        ctl0: ctl0.get() | solved.ctl0,
        ctl1: ctl1.get() | solved.ctl1,
        ctl2: ctl2.get(),
    }
}

/// Frequency produced by the fixed-ratio PLL control word `ctl0`:
/// `Fref * N / (M * 2^OUTDIV)`, or `Fref` itself in bypass.
pub fn decode_fixed_ratio(ref_hz: u64, ctl0: u32) -> u64 {
    let ctl0 = SmicPllCtl0::new(ctl0);
    if ctl0.is_set(SMIC_PLL_CTL0::BP) {
        return ref_hz;
    }
    let n = u64::from(ctl0.read(SMIC_PLL_CTL0::FBDIV));
    let m = u64::from(ctl0.read(SMIC_PLL_CTL0::INDIV));
    let outdiv = ctl0.read(SMIC_PLL_CTL0::OUTDIV);
    if m == 0 {
        return 0;
    }
    ref_hz * n / (m << outdiv)
}

/// Frequency produced by `regs` in `mode`. Unprogrammed (all zero) words and
/// zero dividers decode to 0.
pub fn decode(mode: PllMode, ref_hz: u64, regs: PllRegs) -> u64 {
    if regs.is_unprogrammed() {
        return 0;
    }
    if mode == PllMode::FixedRatio {
        return decode_fixed_ratio(ref_hz, regs.ctl0);
    }

    let ctl0 = PllCtl0::new(regs.ctl0);
    let ctl1 = PllCtl1::new(regs.ctl1);
    let n = u64::from(ctl0.read(PLL_CTL0::FBDIV));
    let m = u64::from(ctl0.read(PLL_CTL0::INDIV));
    let p = u64::from(ctl1.read(PLL_CTL1::OUTDIV));
    if m == 0 || p == 0 {
        return 0;
    }

    match mode {
        PllMode::Integer | PllMode::FixedRatio => ref_hz * n / (p * m),
        PllMode::Fractional | PllMode::SpreadSpectrum => {
            let frac = u64::from(ctl1.read(PLL_CTL1::FRAC));
            let x = (frac * 1000 + 500) >> 24;
            ref_hz * (n * 1000 + x) / 1000 / p / m
        }
    }
}
