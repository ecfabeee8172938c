/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Coordinate spaces and per-view records.
//!
//! Transforms are tagged with zero-sized space markers so that composing
//! a projection with a pose in the wrong order fails to compile.

use euclid::{Rect, RigidTransform3D, Transform3D};

/// The space tracked by the device. Poses are reported in this space.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "ipc", derive(serde::Serialize, serde::Deserialize))]
pub enum Native {}

/// The application space selected by the session's frame of reference.
/// View matrices map this space to per-eye space.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "ipc", derive(serde::Serialize, serde::Deserialize))]
pub enum Reference {}

/// The space of the viewer's head.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "ipc", derive(serde::Serialize, serde::Deserialize))]
pub enum Viewer {}

/// The space of a single eye's camera.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "ipc", derive(serde::Serialize, serde::Deserialize))]
pub enum EyeLocal {}

/// The projective space produced by a projection matrix.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "ipc", derive(serde::Serialize, serde::Deserialize))]
pub enum Display {}

/// The space of the physical floor, for stage frames of reference.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "ipc", derive(serde::Serialize, serde::Deserialize))]
pub enum Floor {}

/// Pixel units of a presentation target.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "ipc", derive(serde::Serialize, serde::Deserialize))]
pub enum Viewport {}

/// Which eye a view belongs to. Views are always processed in the
/// device-reported order, so array position remains the logical eye
/// index; this tag is carried for sinks that want to distinguish eyes
/// explicitly.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "ipc", derive(serde::Serialize, serde::Deserialize))]
pub enum Eye {
    Left,
    Right,
    /// A mono or centre view, e.g. for inline sessions.
    Center,
}

/// A per-view record as reported by the device each frame.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "ipc", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceView {
    pub eye: Eye,
    /// Device-constant for the view while the session lasts.
    pub projection: Transform3D<f32, EyeLocal, Display>,
    /// Where this eye sits relative to the viewer's head.
    pub offset: RigidTransform3D<f32, EyeLocal, Viewer>,
    /// The region of the presentation target this view draws to, in pixels.
    pub viewport: Rect<i32, Viewport>,
}

/// The per-eye bundle handed to the renderer sink.
///
/// The projection and viewport are device-supplied; the view matrix is
/// rederived from the viewer pose every frame.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "ipc", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderView {
    pub eye: Eye,
    pub projection: Transform3D<f32, EyeLocal, Display>,
    pub view: RigidTransform3D<f32, Reference, EyeLocal>,
    pub viewport: Rect<i32, Viewport>,
}

impl RenderView {
    /// Derive the view matrix for `device_view` from the current viewer
    /// pose and the session's reference-space origin.
    pub fn from_pose(
        device_view: &DeviceView,
        pose: &RigidTransform3D<f32, Viewer, Native>,
        origin: &RigidTransform3D<f32, Native, Reference>,
    ) -> RenderView {
        let eye_in_reference = device_view.offset.then(pose).then(origin);
        RenderView {
            eye: device_view.eye,
            projection: device_view.projection,
            view: eye_in_reference.inverse(),
            viewport: device_view.viewport,
        }
    }
}
