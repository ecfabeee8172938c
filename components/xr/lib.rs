/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

#![deny(unsafe_code)]

//! The Parallax XR session controller.
//!
//! [`XrManager`] owns the session state machine: it probes device
//! capability, opens sessions, derives per-eye render views from the
//! device pose every frame, feeds them to a renderer sink, and tears the
//! session down again, tolerating tracking loss and device-initiated
//! ends along the way. The `window` module provides a desktop
//! "magic window" device adapter.

mod manager;
mod pool;
pub mod window;

pub use crate::manager::{FrameScheduler, XrManager};
pub use crate::pool::RenderViewPool;
