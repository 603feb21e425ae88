// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Per-peripheral clock handles.
//!
//! A peripheral driver holds a [`PeripheralClock`] for the one clock it
//! needs and switches it through [`ClockInterface`], without knowing about
//! ids or the rest of the tree.

use log::warn;

use crate::clocks::ids::{clock_name, ClockId};
use crate::clocks::ClockProvider;
use crate::ErrorCode;

/// Generic operations that clock-like things are expected to support.
pub trait ClockInterface {
    fn is_enabled(&self) -> bool;
    fn enable(&self);
    fn disable(&self);
}

/// One clock of the tree, bound to the provider that owns it.
pub struct PeripheralClock<'a, P: ClockProvider> {
    provider: &'a P,
    id: ClockId,
}

impl<'a, P: ClockProvider> PeripheralClock<'a, P> {
    pub const fn new(provider: &'a P, id: ClockId) -> PeripheralClock<'a, P> {
        PeripheralClock { provider, id }
    }

    pub fn id(&self) -> ClockId {
        self.id
    }

    pub fn rate(&self) -> Result<u64, ErrorCode> {
        self.provider.get_rate(self.id)
    }

    pub fn set_rate(&self, hz: u64) -> Result<u64, ErrorCode> {
        self.provider.set_rate(self.id, hz)
    }

    fn report(&self, op: &str, result: Result<(), ErrorCode>) {
        if let Err(e) = result {
            warn!(
                "clk: {} {} failed: {:?}",
                op,
                clock_name(self.id).unwrap_or("?"),
                e
            );
        }
    }
}

impl<P: ClockProvider> ClockInterface for PeripheralClock<'_, P> {
    fn is_enabled(&self) -> bool {
        self.provider.is_enabled(self.id).unwrap_or(false)
    }

    fn enable(&self) {
        self.report("enable", self.provider.enable(self.id));
    }

    fn disable(&self) {
        self.report("disable", self.provider.disable(self.id));
    }
}
