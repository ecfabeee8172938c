/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The XR session state machine and per-frame pipeline.
//!
//! Lifecycle: `Uninitialized -> Ready (device acquired) -> SessionActive
//! -> Ended`, with `Ended` looping back to `Ready` (the device handle is
//! reusable for further sessions).
//!
//! The frame loop is an explicit scheduler handshake rather than a
//! self-resubscribing closure: the host invokes [`XrManager::render_frame`]
//! once per scheduled callback, and the first thing each callback does is
//! re-register the next one. A failed frame therefore never stalls the
//! loop, and teardown makes the next callback a silent no-op.

use euclid::{RigidTransform3D, Rotation3D, Vector3D};
use xr_api::util::ClipPlanes;
use xr_api::{
    channel, DeviceAPI, Error, Event, FrameOfReferenceType, GraphicsProvider, LayerId, Native,
    Receiver, Reference, RendererSink, RuntimeAPI, SessionInit,
};

use crate::pool::RenderViewPool;

/// The host's animation-frame registration. One call schedules exactly
/// one future invocation of [`XrManager::render_frame`].
pub trait FrameScheduler {
    fn request_frame(&mut self);
}

/// Session-scoped state. Dropped wholesale on teardown so nothing
/// dangles.
struct ActiveSession<Context> {
    context: Context,
    layer: LayerId,
    /// The origin of the application's reference space within native
    /// space, resolved once from the session's frame-of-reference type.
    origin: RigidTransform3D<f32, Native, Reference>,
    events: Receiver<Event>,
    /// Timestamp of the first rendered frame; elapsed time is measured
    /// from here.
    start: Option<f64>,
}

/// The XR session and frame lifecycle controller.
pub struct XrManager<G: GraphicsProvider> {
    graphics: G,
    runtime: Option<Box<dyn RuntimeAPI<G>>>,
    device: Option<Box<dyn DeviceAPI<G>>>,
    session: Option<ActiveSession<G::Context>>,
    scheduler: Box<dyn FrameScheduler>,
    sink: Option<Box<dyn RendererSink>>,
    pool: RenderViewPool,
    blocked: bool,
    /// Whether a frame callback is registered but not yet invoked. At
    /// most one is ever outstanding; a callback that outlives its
    /// session is reused as the next session's first frame.
    frame_pending: bool,
    clip_planes: ClipPlanes,
}

impl<G: GraphicsProvider> XrManager<G> {
    pub fn new(
        graphics: G,
        scheduler: Box<dyn FrameScheduler>,
        runtime: Option<Box<dyn RuntimeAPI<G>>>,
    ) -> XrManager<G> {
        XrManager {
            graphics,
            runtime,
            device: None,
            session: None,
            scheduler,
            sink: None,
            pool: RenderViewPool::new(),
            blocked: false,
            frame_pending: false,
            clip_planes: ClipPlanes::default(),
        }
    }

    /// Register the next frame callback unless one is already
    /// outstanding. One call schedules exactly one future invocation of
    /// [`XrManager::render_frame`]; double registration would double the
    /// frame loop.
    fn schedule_frame(&mut self) {
        if !self.frame_pending {
            self.frame_pending = true;
            self.scheduler.request_frame();
        }
    }

    /// Whether the host environment exposes an XR entry point at all.
    /// Pure capability check; no side effects.
    pub fn supports_xr(&self) -> bool {
        self.runtime.is_some()
    }

    /// Acquire the device handle from the platform entry point. Must
    /// complete successfully before any other device-touching operation.
    /// Idempotent once it has succeeded.
    pub fn initialize(&mut self) -> Result<(), Error> {
        if self.device.is_some() {
            return Ok(());
        }
        let runtime = self.runtime.as_mut().ok_or(Error::NotAvailable)?;
        self.device = Some(runtime.request_device()?);
        Ok(())
    }

    /// Ask the device whether it can satisfy `init`. A negotiation
    /// rejection comes back as `Ok(false)`; genuine device faults
    /// surface as errors.
    pub fn supports_session(&self, init: &SessionInit) -> Result<bool, Error> {
        self.device
            .as_ref()
            .ok_or(Error::NotAvailable)?
            .supports_session(init)
    }

    /// Wire in the renderer that will consume per-frame render views.
    pub fn set_renderer(&mut self, sink: Box<dyn RendererSink>) {
        self.sink = Some(sink);
    }

    pub fn blocked(&self) -> bool {
        self.blocked
    }

    /// Cooperatively suppress frame submission. The frame loop keeps
    /// running, but the renderer sink is not invoked until `unblock`.
    pub fn block(&mut self) {
        self.blocked = true;
    }

    pub fn unblock(&mut self) {
        self.blocked = false;
    }

    /// Update the near/far clip planes used for future projection
    /// matrices. The change reaches the device at the next animation
    /// frame, or at session start, whichever comes first.
    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        self.clip_planes.update(near, far);
    }

    /// Force a non-device-driven redraw. Inside an XR session frames are
    /// device-driven and this is a no-op; outside one, a forced update
    /// invokes the renderer sink with an empty view slice. Suppressed
    /// (not queued) while blocked.
    pub fn update(&mut self, force: bool) {
        if self.session.is_some() || self.blocked || !force {
            return;
        }
        if let Some(sink) = self.sink.as_mut() {
            sink.render_frame(0.0, &[]);
        }
    }

    /// Open a session for `init`: negotiate with the device, create the
    /// graphics context, bind the presentation layer, resolve the frame
    /// of reference, wire the end-of-session observer, and register the
    /// first frame callback.
    ///
    /// On any mid-sequence failure every partial artifact is unwound, so
    /// a failed request leaves the controller safely retryable.
    pub fn request_session(&mut self, init: SessionInit) -> Result<(), Error> {
        if self.session.is_some() {
            return Err(Error::InvalidState);
        }
        let device = self.device.as_mut().ok_or(Error::NotAvailable)?;
        device.request_session(&init)?;
        // The device mints this session's projection matrices; make sure
        // it has the current clip planes first. This also consumes any
        // pending latch so the first frame does not resend them.
        let _ = self.clip_planes.recently_updated();
        device.update_clip_planes(self.clip_planes.near, self.clip_planes.far);

        let mut context = match self.graphics.create_context(&init.context_attributes) {
            Ok(context) => context,
            Err(error) => {
                device.end_session();
                return Err(error);
            },
        };
        let layer = match device.attach_layer(&mut context, &init.layer_init) {
            Ok(layer) => layer,
            Err(error) => {
                device.end_session();
                return Err(error);
            },
        };
        let origin = match reference_space_origin(device.as_ref(), &init) {
            Ok(origin) => origin,
            Err(error) => {
                device.detach_layer(&mut context, layer);
                device.end_session();
                return Err(error);
            },
        };
        let (sender, receiver) = match channel() {
            Ok(pair) => pair,
            Err(error) => {
                device.detach_layer(&mut context, layer);
                device.end_session();
                return Err(Error::BackendSpecific(error.to_string()));
            },
        };
        device.set_event_dest(sender);

        self.session = Some(ActiveSession {
            context,
            layer,
            origin,
            events: receiver,
            start: None,
        });
        self.schedule_frame();
        Ok(())
    }

    /// End the active session. Ending an already-ended session is a
    /// no-op; teardown never fails outward.
    pub fn end_session(&mut self) {
        self.teardown();
    }

    /// Whether a session is currently active.
    pub fn session_active(&self) -> bool {
        self.session.is_some()
    }

    /// Process one device-driven frame callback. `timestamp` is the
    /// host's frame time in seconds.
    pub fn render_frame(&mut self, timestamp: f64) {
        // This invocation consumes the outstanding registration.
        self.frame_pending = false;

        // A callback scheduled before teardown may still fire afterwards;
        // it must find the cleared state and do nothing.
        if self.session.is_none() {
            log::debug!("frame callback after session end; dropping");
            return;
        }

        // Register the continuation before doing any work, so a frame
        // that fails to produce output never stops the loop.
        self.schedule_frame();

        let mut ended = false;
        if let Some(session) = self.session.as_ref() {
            while let Ok(event) = session.events.try_recv() {
                match event {
                    Event::SessionEnd => ended = true,
                    Event::VisibilityChange(visibility) => {
                        log::debug!("session visibility changed to {:?}", visibility);
                    },
                }
            }
        }
        if ended {
            log::debug!("session ended by device");
            self.teardown();
            return;
        }

        if self.blocked {
            return;
        }

        let (Some(device), Some(session)) = (self.device.as_mut(), self.session.as_mut()) else {
            return;
        };
        if self.clip_planes.recently_updated() {
            device.update_clip_planes(self.clip_planes.near, self.clip_planes.far);
        }
        let frame = match device.begin_animation_frame(session.layer) {
            Some(frame) => frame,
            None => {
                log::warn!("device could not begin an animation frame; skipping");
                return;
            },
        };
        let pose = match frame.pose {
            Some(pose) => pose,
            None => {
                // Tracking loss. Not fatal: the next scheduled frame
                // retries pose resolution independently.
                log::warn!("viewer pose unavailable; skipping frame");
                return;
            },
        };

        let start = *session.start.get_or_insert(timestamp);
        self.pool.fill(&frame.views, &pose, &session.origin);
        if let Some(sink) = self.sink.as_mut() {
            sink.render_frame(timestamp - start, self.pool.active_views());
        }
        device.end_animation_frame(session.layer);
    }

    /// Shared teardown for explicit `end_session` and device-driven ends:
    /// detach the layer, drop the graphics context, clear the frame of
    /// reference and the pool's active views.
    fn teardown(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        if let Some(device) = self.device.as_mut() {
            device.detach_layer(&mut session.context, session.layer);
            device.end_session();
        }
        self.pool.clear();
        // `session` drops here, releasing the context and event channel.
    }
}

/// Resolve the reference-space origin for the requested frame of
/// reference. Head-model and eye-level spaces coincide with the native
/// origin; a stage space sits on the device-reported floor, or on an
/// emulated one when the device has no floor and emulation is allowed.
fn reference_space_origin<G: GraphicsProvider>(
    device: &dyn DeviceAPI<G>,
    init: &SessionInit,
) -> Result<RigidTransform3D<f32, Native, Reference>, Error> {
    match init.frame_of_reference {
        FrameOfReferenceType::HeadModel | FrameOfReferenceType::EyeLevel => {
            Ok(RigidTransform3D::identity())
        },
        FrameOfReferenceType::Stage => {
            if let Some(floor) = device.floor_transform() {
                return Ok(RigidTransform3D::new(
                    Rotation3D::quaternion(
                        floor.rotation.i,
                        floor.rotation.j,
                        floor.rotation.k,
                        floor.rotation.r,
                    ),
                    floor.translation.cast_unit(),
                ));
            }
            let options = &init.frame_of_reference_options;
            if options.allow_stage_emulation {
                let height = options.stage_emulation_height;
                return Ok(RigidTransform3D::from_translation(Vector3D::new(
                    0., height, 0.,
                )));
            }
            Err(Error::NotSupported)
        },
    }
}
