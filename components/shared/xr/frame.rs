/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use euclid::RigidTransform3D;
use smallvec::SmallVec;

use crate::view::{DeviceView, Native, Viewer};

/// The per-frame data reported by the device when an animation frame
/// begins.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "ipc", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameData {
    /// The transform from the viewer to native coordinates, i.e. the pose
    /// of the viewer's head. `None` means tracking was lost for this
    /// frame; the controller skips rendering and retries next frame.
    pub pose: Option<RigidTransform3D<f32, Viewer, Native>>,
    /// The views to render this frame, in device order (left eye before
    /// right eye by platform convention).
    pub views: SmallVec<[DeviceView; 2]>,
    /// When the device expects this frame to reach its display, in
    /// seconds. Zero when the device cannot predict.
    pub predicted_display_time: f64,
}
