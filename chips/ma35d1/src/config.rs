// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Compile-time configuration of the clock controller driver.
//!
//! Options are gathered in a `const` object rather than scattered `#[cfg]`
//! attributes, so that every code path is type-checked and unit-tested
//! whatever the selected Cargo features are. The compiler folds the constant
//! and drops the disabled branch.

/// Data structure holding compile-time configuration options.
///
/// To change the configuration, enable the matching Cargo feature of this
/// crate; the `CONFIG` constant at the end of this file picks it up.
pub(crate) struct Config {
    /// Whether every clock rate read-back is traced to the log at `trace`
    /// level, together with the clock name.
    pub(crate) trace_clocks: bool,

    /// Whether spread-spectrum PLL solves compute the spread rate and slope
    /// from the modulation parameters.
    ///
    /// When disabled, spread-spectrum solves return one of two register
    /// triples known to work around a 16-bit slope limitation in silicon.
    pub(crate) spread_spectrum_derivation: bool,
}

/// Frequencies of the clock inputs that do not come out of a PLL.
///
/// They are board properties (crystals, PHY references) and are handed to
/// the clock tree once, when it is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Oscillators {
    /// External high-speed crystal, the reference of every PLL.
    pub hxt_hz: u64,
    /// External 32 kHz crystal.
    pub lxt_hz: u64,
    pub hirc_hz: u64,
    pub lirc_hz: u64,
    pub usbphy0_hz: u64,
    pub usbphy1_hz: u64,
}

impl Oscillators {
    /// Reference board population: 24 MHz and 32.768 kHz crystals.
    pub const MA35D1_DEFAULT: Oscillators = Oscillators {
        hxt_hz: 24_000_000,
        lxt_hz: 32_768,
        hirc_hz: 12_000_000,
        lirc_hz: 32_000,
        usbphy0_hz: 480_000_000,
        usbphy1_hz: 480_000_000,
    };
}

/// A unique instance of `Config` where compile-time configuration options
/// are defined.
pub(crate) const CONFIG: Config = Config {
    trace_clocks: cfg!(feature = "trace_clocks"),
    spread_spectrum_derivation: cfg!(feature = "spread_spectrum_derivation"),
};
