/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! A desktop "magic window" device adapter.
//!
//! Presents inline sessions as a single full-window view and immersive
//! sessions as side-by-side stereo halves, deriving the viewer pose from
//! a host-supplied window abstraction. Useful for developing XR content
//! without a headset.

use std::cell::Cell;
use std::rc::Rc;

use euclid::{Point2D, Rect, RigidTransform3D, Rotation3D, Size2D, UnknownUnit, Vector3D};
use smallvec::SmallVec;

use xr_api::util::{fov_to_projection_matrix, ClipPlanes};
use xr_api::{
    DeviceAPI, DeviceView, Error, Event, EventBuffer, Eye, Floor, FrameData, GraphicsProvider,
    LayerId, LayerInit, Native, RuntimeAPI, Sender, SessionInit, SessionMode, Viewer, Viewport,
};

// How far off the ground are the viewer's eyes?
const HEIGHT: f32 = 1.4;

// What is half the vertical field of view, in radians?
const FOV_UP: f32 = std::f32::consts::FRAC_PI_4;

// What is the distance between the viewer's eyes?
const INTER_PUPILLARY_DISTANCE: f32 = 0.06;

/// The host window a [`WindowDevice`] presents into.
pub trait StereoWindow: 'static {
    /// Current size of the drawable area, in pixels.
    fn size(&self) -> Size2D<i32, Viewport>;
    /// Current orientation of the simulated viewer.
    fn rotation(&self) -> Rotation3D<f32, UnknownUnit, UnknownUnit>;
    /// Current position of the simulated viewer.
    fn translation(&self) -> Vector3D<f32, UnknownUnit>;
}

/// Marks whether a qualifying user gesture is currently in flight.
/// Immersive session requests made without one fail with
/// [`Error::SecurityPrecondition`].
#[derive(Clone)]
pub struct UserActivation(Rc<Cell<bool>>);

impl UserActivation {
    pub fn set_active(&self, active: bool) {
        self.0.set(active);
    }
}

/// The platform entry point for the window adapter.
pub struct WindowRuntime {
    window: Rc<dyn StereoWindow>,
    user_active: Rc<Cell<bool>>,
}

impl WindowRuntime {
    pub fn new(window: Rc<dyn StereoWindow>) -> (WindowRuntime, UserActivation) {
        let user_active = Rc::new(Cell::new(false));
        let activation = UserActivation(user_active.clone());
        (
            WindowRuntime {
                window,
                user_active,
            },
            activation,
        )
    }
}

impl<G: GraphicsProvider> RuntimeAPI<G> for WindowRuntime {
    fn request_device(&mut self) -> Result<Box<dyn DeviceAPI<G>>, Error> {
        Ok(Box::new(WindowDevice {
            window: self.window.clone(),
            user_active: self.user_active.clone(),
            events: EventBuffer::default(),
            clip_planes: ClipPlanes::default(),
            session: None,
            next_layer: 0,
            layers: vec![],
        }))
    }
}

pub struct WindowDevice {
    window: Rc<dyn StereoWindow>,
    user_active: Rc<Cell<bool>>,
    events: EventBuffer,
    clip_planes: ClipPlanes,
    session: Option<SessionMode>,
    next_layer: u32,
    layers: Vec<LayerId>,
}

impl WindowDevice {
    fn viewer_pose(&self) -> RigidTransform3D<f32, Viewer, Native> {
        let translation = Vector3D::from_untyped(self.window.translation());
        let translation: RigidTransform3D<f32, Viewer, Native> =
            RigidTransform3D::from_translation(translation);
        let rotation = Rotation3D::from_untyped(&self.window.rotation());
        let rotation: RigidTransform3D<f32, Native, Native> =
            RigidTransform3D::from_rotation(rotation);
        translation.then(&rotation)
    }

    fn view(&self, eye: Eye, viewport: Rect<i32, Viewport>) -> DeviceView {
        let x_offset = match eye {
            Eye::Left => -INTER_PUPILLARY_DISTANCE / 2.0,
            Eye::Right => INTER_PUPILLARY_DISTANCE / 2.0,
            Eye::Center => 0.0,
        };
        let aspect = viewport.size.width as f32 / viewport.size.height as f32;
        let fov_right = (aspect * FOV_UP.tan()).atan();
        DeviceView {
            eye,
            projection: fov_to_projection_matrix(
                -fov_right,
                fov_right,
                FOV_UP,
                -FOV_UP,
                self.clip_planes,
            ),
            offset: RigidTransform3D::from_translation(Vector3D::new(x_offset, 0., 0.)),
            viewport,
        }
    }

    fn views(&self, mode: SessionMode) -> SmallVec<[DeviceView; 2]> {
        let window_size = self.window.size();
        match mode {
            SessionMode::Inline => {
                let viewport = Rect::new(Point2D::origin(), window_size);
                let mut views = SmallVec::new();
                views.push(self.view(Eye::Center, viewport));
                views
            },
            SessionMode::ImmersiveVr => {
                let size = Size2D::new(window_size.width / 2, window_size.height);
                let left = Rect::new(Point2D::origin(), size);
                let right = Rect::new(Point2D::new(size.width, 0), size);
                SmallVec::from_buf([self.view(Eye::Left, left), self.view(Eye::Right, right)])
            },
        }
    }
}

impl<G: GraphicsProvider> DeviceAPI<G> for WindowDevice {
    fn supports_session(&self, _init: &SessionInit) -> Result<bool, Error> {
        // The window can fake both inline and stereo presentation.
        Ok(true)
    }

    fn request_session(&mut self, init: &SessionInit) -> Result<(), Error> {
        if self.session.is_some() {
            return Err(Error::InvalidState);
        }
        if init.mode.is_immersive() && !self.user_active.get() {
            return Err(Error::SecurityPrecondition);
        }
        self.session = Some(init.mode);
        Ok(())
    }

    fn attach_layer(
        &mut self,
        _context: &mut G::Context,
        _init: &LayerInit,
    ) -> Result<LayerId, Error> {
        let layer = LayerId(self.next_layer);
        self.next_layer += 1;
        self.layers.push(layer);
        Ok(layer)
    }

    fn detach_layer(&mut self, _context: &mut G::Context, layer: LayerId) {
        self.layers.retain(|&l| l != layer);
    }

    fn floor_transform(&self) -> Option<RigidTransform3D<f32, Native, Floor>> {
        let translation = Vector3D::new(0.0, HEIGHT, 0.0);
        Some(RigidTransform3D::from_translation(translation))
    }

    fn begin_animation_frame(&mut self, layer: LayerId) -> Option<FrameData> {
        log::debug!("begin animation frame for layer {:?}", layer);
        let mode = self.session?;
        if !self.layers.contains(&layer) {
            return None;
        }
        Some(FrameData {
            pose: Some(self.viewer_pose()),
            views: self.views(mode),
            predicted_display_time: 0.0,
        })
    }

    fn end_animation_frame(&mut self, layer: LayerId) {
        // Presentation happens in the graphics provider's context; the
        // window itself has nothing to flush.
        log::debug!("end animation frame for layer {:?}", layer);
    }

    fn set_event_dest(&mut self, dest: Sender<Event>) {
        self.events.upgrade(dest);
    }

    fn end_session(&mut self) {
        self.session = None;
        self.events.downgrade();
    }

    fn update_clip_planes(&mut self, near: f32, far: f32) {
        self.clip_planes.update(near, far);
    }
}
