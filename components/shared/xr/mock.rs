/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! A mock runtime and device for exercising a session controller without
//! hardware. The controller is single-threaded cooperative, so the mock
//! is driven through a shared [`MockDeviceHandle`] rather than a message
//! pump: tests mutate device state between frames and observe what the
//! device saw.

use std::cell::RefCell;
use std::f32::consts::FRAC_PI_4;
use std::rc::Rc;

use euclid::{Angle, Point2D, Rect, RigidTransform3D, Rotation3D, Size2D, Vector3D};
use smallvec::SmallVec;

use crate::config::{SessionInit, SessionMode};
use crate::device::{DeviceAPI, GraphicsProvider, LayerId, RuntimeAPI};
use crate::error::Error;
use crate::events::{Event, EventBuffer, Visibility};
use crate::frame::FrameData;
use crate::util::{fov_to_projection_matrix, ClipPlanes};
use crate::view::{DeviceView, Eye, Floor, Native, Viewer, Viewport};
use crate::Sender;

/// Initial state for a mock device.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "ipc", derive(serde::Serialize, serde::Deserialize))]
pub struct MockDeviceInit {
    pub supports_inline: bool,
    pub supports_immersive: bool,
    /// Immersive session requests fail with
    /// [`Error::SecurityPrecondition`] unless a user activation has been
    /// simulated.
    pub require_user_activation: bool,
    pub viewer_origin: Option<RigidTransform3D<f32, Viewer, Native>>,
    pub floor_origin: Option<RigidTransform3D<f32, Native, Floor>>,
    pub views: Vec<DeviceView>,
}

impl Default for MockDeviceInit {
    fn default() -> Self {
        MockDeviceInit {
            supports_inline: true,
            supports_immersive: true,
            require_user_activation: false,
            viewer_origin: Some(RigidTransform3D::identity()),
            floor_origin: None,
            views: stereo_views(),
        }
    }
}

/// A plausible side-by-side stereo view pair: 90 degree symmetric
/// frustums, eyes 6cm apart, 256x256 pixels per eye.
pub fn stereo_views() -> Vec<DeviceView> {
    let size = Size2D::new(256, 256);
    [(Eye::Left, -0.03, 0), (Eye::Right, 0.03, 256)]
        .iter()
        .map(|&(eye, x_offset, viewport_x)| DeviceView {
            eye,
            projection: fov_to_projection_matrix(
                -FRAC_PI_4,
                FRAC_PI_4,
                FRAC_PI_4,
                -FRAC_PI_4,
                ClipPlanes::default(),
            ),
            offset: RigidTransform3D::new(
                Rotation3D::identity(),
                Vector3D::new(x_offset, 0., 0.),
            ),
            viewport: Rect::new(Point2D::new(viewport_x, 0), size),
        })
        .collect()
}

/// A single centre view for inline sessions.
pub fn mono_view(size: Size2D<i32, Viewport>) -> DeviceView {
    DeviceView {
        eye: Eye::Center,
        projection: fov_to_projection_matrix(
            -Angle::degrees(45.0f32).radians,
            Angle::degrees(45.0f32).radians,
            Angle::degrees(45.0f32).radians,
            -Angle::degrees(45.0f32).radians,
            ClipPlanes::default(),
        ),
        offset: RigidTransform3D::identity(),
        viewport: Rect::new(Point2D::origin(), size),
    }
}

struct MockDeviceState {
    init: MockDeviceInit,
    pose: Option<RigidTransform3D<f32, Viewer, Native>>,
    views: Vec<DeviceView>,
    user_active: bool,
    probe_fault: Option<String>,
    session_active: bool,
    events: EventBuffer,
    clip_planes: ClipPlanes,
    next_layer: u32,
    layers: Vec<LayerId>,
    frames_begun: u32,
    frames_ended: u32,
}

/// Shared control handle for a mock device. Clones observe and mutate the
/// same device.
#[derive(Clone)]
pub struct MockDeviceHandle(Rc<RefCell<MockDeviceState>>);

impl MockDeviceHandle {
    /// Replace the viewer pose; `None` simulates tracking loss.
    pub fn set_viewer_pose(&self, pose: Option<RigidTransform3D<f32, Viewer, Native>>) {
        self.0.borrow_mut().pose = pose;
    }

    /// Replace the device-reported view list for subsequent frames.
    pub fn set_views(&self, views: Vec<DeviceView>) {
        self.0.borrow_mut().views = views;
    }

    pub fn set_floor_origin(&self, floor: Option<RigidTransform3D<f32, Native, Floor>>) {
        self.0.borrow_mut().init.floor_origin = floor;
    }

    /// Simulate a qualifying user gesture (or its expiry).
    pub fn set_user_activation(&self, active: bool) {
        self.0.borrow_mut().user_active = active;
    }

    /// Make every `supports_session` query fail with a backend fault.
    pub fn fail_support_queries(&self, reason: &str) {
        self.0.borrow_mut().probe_fault = Some(reason.to_owned());
    }

    /// Raise a device-initiated session end, as if the headset were
    /// removed.
    pub fn simulate_session_end(&self) {
        self.0.borrow_mut().events.callback(Event::SessionEnd);
    }

    pub fn simulate_visibility_change(&self, visibility: Visibility) {
        self.0
            .borrow_mut()
            .events
            .callback(Event::VisibilityChange(visibility));
    }

    pub fn session_active(&self) -> bool {
        self.0.borrow().session_active
    }

    pub fn attached_layers(&self) -> usize {
        self.0.borrow().layers.len()
    }

    pub fn frames_begun(&self) -> u32 {
        self.0.borrow().frames_begun
    }

    pub fn frames_ended(&self) -> u32 {
        self.0.borrow().frames_ended
    }

    pub fn clip_planes(&self) -> (f32, f32) {
        let state = self.0.borrow();
        (state.clip_planes.near, state.clip_planes.far)
    }
}

/// A mock platform entry point.
pub struct MockRuntime {
    state: Option<Rc<RefCell<MockDeviceState>>>,
}

impl MockRuntime {
    /// A runtime with a connected device described by `init`. Returns the
    /// runtime and the control handle for the device it will hand out.
    pub fn new(init: MockDeviceInit) -> (MockRuntime, MockDeviceHandle) {
        let state = Rc::new(RefCell::new(MockDeviceState {
            pose: init.viewer_origin,
            views: init.views.clone(),
            user_active: false,
            probe_fault: None,
            session_active: false,
            events: EventBuffer::default(),
            clip_planes: ClipPlanes::default(),
            next_layer: 0,
            layers: vec![],
            frames_begun: 0,
            frames_ended: 0,
            init,
        }));
        let handle = MockDeviceHandle(state.clone());
        (
            MockRuntime {
                state: Some(state),
            },
            handle,
        )
    }

    /// A runtime with no device connected: `request_device` fails with
    /// [`Error::NotAvailable`].
    pub fn disconnected() -> MockRuntime {
        MockRuntime { state: None }
    }
}

impl<G: GraphicsProvider> RuntimeAPI<G> for MockRuntime {
    fn request_device(&mut self) -> Result<Box<dyn DeviceAPI<G>>, Error> {
        match self.state {
            Some(ref state) => Ok(Box::new(MockDevice {
                state: state.clone(),
            })),
            None => Err(Error::NotAvailable),
        }
    }
}

struct MockDevice {
    state: Rc<RefCell<MockDeviceState>>,
}

impl<G: GraphicsProvider> DeviceAPI<G> for MockDevice {
    fn supports_session(&self, init: &SessionInit) -> Result<bool, Error> {
        let state = self.state.borrow();
        if let Some(ref reason) = state.probe_fault {
            return Err(Error::BackendSpecific(reason.clone()));
        }
        Ok(match init.mode {
            SessionMode::Inline => state.init.supports_inline,
            SessionMode::ImmersiveVr => state.init.supports_immersive,
        })
    }

    fn request_session(&mut self, init: &SessionInit) -> Result<(), Error> {
        let mut state = self.state.borrow_mut();
        let supported = match init.mode {
            SessionMode::Inline => state.init.supports_inline,
            SessionMode::ImmersiveVr => state.init.supports_immersive,
        };
        if !supported {
            return Err(Error::NotSupported);
        }
        if state.session_active {
            return Err(Error::InvalidState);
        }
        if init.mode.is_immersive() && state.init.require_user_activation && !state.user_active {
            return Err(Error::SecurityPrecondition);
        }
        state.session_active = true;
        Ok(())
    }

    fn attach_layer(
        &mut self,
        _context: &mut G::Context,
        _init: &crate::config::LayerInit,
    ) -> Result<LayerId, Error> {
        let mut state = self.state.borrow_mut();
        let layer = LayerId(state.next_layer);
        state.next_layer += 1;
        state.layers.push(layer);
        Ok(layer)
    }

    fn detach_layer(&mut self, _context: &mut G::Context, layer: LayerId) {
        self.state.borrow_mut().layers.retain(|&l| l != layer);
    }

    fn floor_transform(&self) -> Option<RigidTransform3D<f32, Native, Floor>> {
        self.state.borrow().init.floor_origin
    }

    fn begin_animation_frame(&mut self, layer: LayerId) -> Option<FrameData> {
        let mut state = self.state.borrow_mut();
        if !state.session_active || !state.layers.contains(&layer) {
            return None;
        }
        state.frames_begun += 1;
        Some(FrameData {
            pose: state.pose,
            views: SmallVec::from_slice(&state.views),
            predicted_display_time: 0.0,
        })
    }

    fn end_animation_frame(&mut self, _layer: LayerId) {
        self.state.borrow_mut().frames_ended += 1;
    }

    fn set_event_dest(&mut self, dest: Sender<Event>) {
        self.state.borrow_mut().events.upgrade(dest);
    }

    fn end_session(&mut self) {
        let mut state = self.state.borrow_mut();
        state.session_active = false;
        state.events.downgrade();
    }

    fn update_clip_planes(&mut self, near: f32, far: f32) {
        self.state.borrow_mut().clip_planes.update(near, far);
    }
}
