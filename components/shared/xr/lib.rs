/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

#![deny(unsafe_code)]

//! Shared types and traits for the Parallax XR toolkit.
//!
//! This crate defines the data model an XR session controller exchanges
//! with a platform device adapter: session configuration, per-frame poses
//! and views, the error taxonomy, and the trait seams behind which the
//! platform runtime, the graphics surface factory, and the renderer live.
//! It also provides a mock runtime/device pair for exercising a controller
//! without any real hardware.

mod config;
mod device;
mod error;
mod events;
mod frame;
pub mod mock;
pub mod util;
mod view;

pub use crate::config::{
    ContextAttributes, FrameOfReferenceOptions, FrameOfReferenceType, LayerInit, SessionInit,
    SessionMode,
};
pub use crate::device::{DeviceAPI, GraphicsProvider, LayerId, RendererSink, RuntimeAPI};
pub use crate::error::Error;
pub use crate::events::{Event, EventBuffer, Visibility};
pub use crate::frame::FrameData;
pub use crate::view::{
    DeviceView, Display, Eye, EyeLocal, Floor, Native, Reference, RenderView, Viewer, Viewport,
};

#[cfg(feature = "ipc")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "ipc")]
pub use ipc_channel::ipc::IpcSender as Sender;

#[cfg(feature = "ipc")]
pub use ipc_channel::ipc::IpcReceiver as Receiver;

#[cfg(not(feature = "ipc"))]
pub use crossbeam_channel::Sender;

#[cfg(not(feature = "ipc"))]
pub use crossbeam_channel::Receiver;

#[cfg(feature = "ipc")]
pub fn channel<T>() -> Result<(Sender<T>, Receiver<T>), std::io::Error>
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    ipc_channel::ipc::channel()
}

#[cfg(not(feature = "ipc"))]
pub fn channel<T>() -> Result<(Sender<T>, Receiver<T>), std::io::Error> {
    Ok(crossbeam_channel::unbounded())
}
