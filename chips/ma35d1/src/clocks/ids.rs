// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Clock identifiers.
//!
//! A single flat namespace, numbered as in the MA35D1 device-tree clock
//! binding: the six PLLs, then the gates, the muxes and the dividers. The
//! watchdog gate was added to the binding last and sits after the dividers.

/// Handle of a clock in the tree. Valid handles are below [`CLK_MAX`].
pub type ClockId = usize;

pub const CAPLL: ClockId = 0;
pub const SYSPLL: ClockId = 1;
pub const DDRPLL: ClockId = 2;
pub const APLL: ClockId = 3;
pub const EPLL: ClockId = 4;
pub const VPLL: ClockId = 5;

pub const HXT_GATE: ClockId = 6;
pub const LXT_GATE: ClockId = 7;
pub const HIRC_GATE: ClockId = 8;
pub const LIRC_GATE: ClockId = 9;
pub const DDR0_GATE: ClockId = 10;
pub const DDR6_GATE: ClockId = 11;
pub const SDH0_GATE: ClockId = 12;
pub const SDH1_GATE: ClockId = 13;
pub const NAND_GATE: ClockId = 14;
pub const USBH_GATE: ClockId = 15;
pub const HUSBH0_GATE: ClockId = 16;
pub const HUSBH1_GATE: ClockId = 17;
pub const DCU_GATE: ClockId = 18;
pub const EMAC0_GATE: ClockId = 19;
pub const EMAC1_GATE: ClockId = 20;
pub const RTC_GATE: ClockId = 21;
pub const DDR_GATE: ClockId = 22;
pub const I2C0_GATE: ClockId = 23;
pub const I2C1_GATE: ClockId = 24;
pub const I2C2_GATE: ClockId = 25;
pub const I2C3_GATE: ClockId = 26;
pub const I2C4_GATE: ClockId = 27;
pub const I2C5_GATE: ClockId = 28;
pub const QSPI0_GATE: ClockId = 29;
pub const QSPI1_GATE: ClockId = 30;
pub const SPI0_GATE: ClockId = 31;
pub const SPI1_GATE: ClockId = 32;
pub const SPI2_GATE: ClockId = 33;
pub const SPI3_GATE: ClockId = 34;
pub const GPA_GATE: ClockId = 35;
pub const GPB_GATE: ClockId = 36;
pub const GPC_GATE: ClockId = 37;
pub const GPD_GATE: ClockId = 38;
pub const GPE_GATE: ClockId = 39;
pub const GPF_GATE: ClockId = 40;
pub const GPG_GATE: ClockId = 41;
pub const GPH_GATE: ClockId = 42;
pub const GPI_GATE: ClockId = 43;
pub const GPJ_GATE: ClockId = 44;
pub const GPK_GATE: ClockId = 45;
pub const GPL_GATE: ClockId = 46;
pub const GPM_GATE: ClockId = 47;
pub const GPN_GATE: ClockId = 48;

pub const CA35CLK_MUX: ClockId = 49;
pub const SYSCLK0_MUX: ClockId = 50;
pub const SYSCLK1_MUX: ClockId = 51;
pub const SDH0_MUX: ClockId = 52;
pub const SDH1_MUX: ClockId = 53;
pub const DCU_MUX: ClockId = 54;
pub const DCUP_MUX: ClockId = 55;
pub const SPI0_MUX: ClockId = 56;
pub const SPI1_MUX: ClockId = 57;
pub const SPI2_MUX: ClockId = 58;
pub const SPI3_MUX: ClockId = 59;
pub const QSPI0_MUX: ClockId = 60;
pub const QSPI1_MUX: ClockId = 61;

pub const DCUP_DIV: ClockId = 62;
pub const EMAC0_DIV: ClockId = 63;
pub const EMAC1_DIV: ClockId = 64;
pub const ACLK0_DIV: ClockId = 65;

pub const WDT1_GATE: ClockId = 66;

/// Number of clock ids.
pub const CLK_MAX: ClockId = 67;

/// First id of each range.
pub const FIRST_GATE: ClockId = HXT_GATE;
pub const FIRST_MUX: ClockId = CA35CLK_MUX;
pub const FIRST_DIV: ClockId = DCUP_DIV;

static CLOCK_NAMES: [&str; CLK_MAX] = [
    "capll", "syspll", "ddrpll", "apll", "epll", "vpll",
    "hxt_gate", "lxt_gate", "hirc_gate", "lirc_gate", "ddr0_gate", "ddr6_gate",
    "sdh0_gate", "sdh1_gate", "nand_gate", "usbh_gate", "husbh0_gate", "husbh1_gate",
    "dcu_gate", "emac0_gate", "emac1_gate", "rtc_gate", "ddr_gate", "i2c0_gate",
    "i2c1_gate", "i2c2_gate", "i2c3_gate", "i2c4_gate", "i2c5_gate", "qspi0_gate",
    "qspi1_gate", "spi0_gate", "spi1_gate", "spi2_gate", "spi3_gate", "gpa_gate",
    "gpb_gate", "gpc_gate", "gpd_gate", "gpe_gate", "gpf_gate", "gpg_gate",
    "gph_gate", "gpi_gate", "gpj_gate", "gpk_gate", "gpl_gate", "gpm_gate",
    "gpn_gate", "ca35clk_mux", "sysclk0_mux", "sysclk1_mux", "sdh0_mux", "sdh1_mux",
    "dcu_mux", "dcup_mux", "spi0_mux", "spi1_mux", "spi2_mux", "spi3_mux",
    "qspi0_mux", "qspi1_mux", "dcup_div", "emac0_div", "emac1_div", "aclk0_div",
    "wdt1_gate",
];

/// Binding name of a clock, as used in log messages.
pub fn clock_name(id: ClockId) -> Option<&'static str> {
    CLOCK_NAMES.get(id).copied()
}
