/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The trait seams between the session controller and its collaborators:
//! the platform runtime, the device it hands out, the graphics surface
//! factory, and the renderer.

use euclid::RigidTransform3D;

use crate::config::{ContextAttributes, LayerInit, SessionInit};
use crate::error::Error;
use crate::events::Event;
use crate::frame::FrameData;
use crate::view::{Floor, Native, RenderView};
use crate::Sender;

/// A presentation layer bound to a session's graphics context. Minted by
/// the device in `attach_layer`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "ipc", derive(serde::Serialize, serde::Deserialize))]
pub struct LayerId(pub u32);

/// The graphics surface factory. Given context creation attributes it
/// returns a ready context handle; the controller consumes it once per
/// session request and owns the resulting context for the session's life.
pub trait GraphicsProvider: 'static {
    type Context;

    fn create_context(&mut self, attributes: &ContextAttributes) -> Result<Self::Context, Error>;
}

/// The renderer that consumes per-frame render views. The controller has
/// no knowledge of what the sink does with them.
pub trait RendererSink {
    /// Called once per successfully-posed frame with the elapsed session
    /// time in seconds and the views for this frame, in device order.
    fn render_frame(&mut self, elapsed: f64, views: &[RenderView]);
}

/// The platform entry point for XR capability. Implemented by a platform
/// adapter in production and by `mock::MockRuntime` in tests.
pub trait RuntimeAPI<G: GraphicsProvider>: 'static {
    /// Enumerate and acquire the device handle. Fails with
    /// [`Error::NotAvailable`] when no device exists.
    fn request_device(&mut self) -> Result<Box<dyn DeviceAPI<G>>, Error>;
}

/// An XR device capable of running sessions.
///
/// The handle is acquired once during initialization and reused across
/// sessions; `request_session`/`end_session` bracket each presentation.
pub trait DeviceAPI<G: GraphicsProvider>: 'static {
    /// Whether the device can satisfy `init`. A negotiation rejection is
    /// `Ok(false)`; only genuine device faults produce an `Err`.
    fn supports_session(&self, init: &SessionInit) -> Result<bool, Error>;

    /// Open a session for `init`. May fail with [`Error::NotSupported`],
    /// [`Error::InvalidState`] or [`Error::SecurityPrecondition`].
    fn request_session(&mut self, init: &SessionInit) -> Result<(), Error>;

    /// Bind a presentation layer to `context`, returning its id.
    fn attach_layer(
        &mut self,
        context: &mut G::Context,
        init: &LayerInit,
    ) -> Result<LayerId, Error>;

    /// Release a presentation layer. Part of session teardown; must not
    /// fail outward.
    fn detach_layer(&mut self, context: &mut G::Context, layer: LayerId);

    /// The transform from native space to the physical floor, if the
    /// device knows where the floor is.
    fn floor_transform(&self) -> Option<RigidTransform3D<f32, Native, Floor>>;

    /// Start an animation frame: bind the layer's framebuffer as render
    /// target and report the current pose and views. `None` means the
    /// device could not produce a frame at all.
    fn begin_animation_frame(&mut self, layer: LayerId) -> Option<FrameData>;

    /// Finish an animation frame and present the layer.
    fn end_animation_frame(&mut self, layer: LayerId);

    /// Wire the destination for device-driven events such as
    /// [`Event::SessionEnd`].
    fn set_event_dest(&mut self, dest: Sender<Event>);

    /// Terminate the active session. Idempotent; never fails outward.
    fn end_session(&mut self);

    /// Propagate updated near/far clip planes to the device so future
    /// projection matrices reflect them.
    fn update_clip_planes(&mut self, near: f32, far: f32);
}
