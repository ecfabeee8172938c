/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use euclid::RigidTransform3D;
use xr_api::{DeviceView, Native, Reference, RenderView, Viewer};

/// A pooled arena of [`RenderView`] slots, reused across frames.
///
/// Capacity only grows, never shrinks below what a frame has needed;
/// slots are overwritten in place. The active count is explicit and
/// separate from capacity, so stale trailing slots are excluded from
/// what gets submitted to a renderer.
#[derive(Debug, Default)]
pub struct RenderViewPool {
    slots: Vec<RenderView>,
    active: usize,
}

impl RenderViewPool {
    pub fn new() -> RenderViewPool {
        RenderViewPool::default()
    }

    /// Fill the pool from this frame's device views and viewer pose,
    /// growing it if the device reports more views than any frame so far.
    pub fn fill(
        &mut self,
        views: &[DeviceView],
        pose: &RigidTransform3D<f32, Viewer, Native>,
        origin: &RigidTransform3D<f32, Native, Reference>,
    ) {
        for (index, device_view) in views.iter().enumerate() {
            let render_view = RenderView::from_pose(device_view, pose, origin);
            if index < self.slots.len() {
                self.slots[index] = render_view;
            } else {
                self.slots.push(render_view);
            }
        }
        self.active = views.len();
        debug_assert!(self.slots.len() >= self.active);
    }

    /// The views filled by the most recent frame. Slots beyond the active
    /// count are stale and never exposed here.
    pub fn active_views(&self) -> &[RenderView] {
        &self.slots[..self.active]
    }

    /// Mark all slots stale without releasing their storage.
    pub fn clear(&mut self) {
        self.active = 0;
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.active
    }

    /// A stale slot's last contents, for tests that check growth does not
    /// disturb neighbouring entries.
    pub fn slot(&self, index: usize) -> Option<&RenderView> {
        self.slots.get(index)
    }
}
