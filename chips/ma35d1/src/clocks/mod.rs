// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! MA35D1 clock controller.
//!
//! Layered bottom-up:
//!
//! + [`registers`]: the register block and offset-based register access
//! + [`pll`]: PLL synthesis and read-back, pure functions over register words
//! + [`ids`] and [`topology`]: the static description of every clock
//! + [`tree`]: the evaluator implementing [`ClockProvider`]
//! + [`peripheral`]: per-driver handles on a single clock

pub mod ids;
pub mod peripheral;
pub mod pll;
pub mod registers;
pub mod topology;
pub mod tree;

pub use self::ids::ClockId;
pub use self::peripheral::{ClockInterface, PeripheralClock};
pub use self::tree::ClockTree;

use crate::ErrorCode;

/// Rate and gating control over a tree of clocks addressed by [`ClockId`].
///
/// Every operation returns `Err(ErrorCode::NODEVICE)` for an id that names
/// no clock, without touching the hardware.
pub trait ClockProvider {
    /// Current rate of `id`, in Hz.
    fn get_rate(&self, id: ClockId) -> Result<u64, ErrorCode>;

    /// Move `id` as close to `target_hz` as the hardware allows and return
    /// the rate it now runs at. Clocks whose rate cannot be changed answer
    /// their current rate.
    ///
    /// A mux with no parent at `target_hz` keeps its selection and answers
    /// the rate of its gate root. Behind a divider that is the undivided
    /// rate, not the rate the clock runs at.
    fn set_rate(&self, id: ClockId, target_hz: u64) -> Result<u64, ErrorCode>;

    /// The rate [`ClockProvider::set_rate`] would produce, without changing
    /// anything.
    fn round_rate(&self, id: ClockId, target_hz: u64) -> Result<u64, ErrorCode>;

    fn enable(&self, id: ClockId) -> Result<(), ErrorCode>;

    /// `Err(ErrorCode::NOSUPPORT)` for clocks that cannot be switched off.
    fn disable(&self, id: ClockId) -> Result<(), ErrorCode>;

    fn is_enabled(&self, id: ClockId) -> Result<bool, ErrorCode>;
}
