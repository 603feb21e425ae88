// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Peripheral implementations for the Nuvoton MA35D1 SoC.
//!
//! Only the clock controller is implemented: PLL frequency synthesis and
//! read-back, and the gate/mux/divider tree that hangs off the PLLs.
//! Peripheral drivers ask this crate for the rate of their clock, or to
//! switch it on, through [`clocks::ClockProvider`].

#![cfg_attr(not(test), no_std)]

pub mod clocks;
pub mod config;
pub mod errorcode;
pub mod static_ref;

pub use crate::errorcode::ErrorCode;
