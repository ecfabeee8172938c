/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Session lifecycle and frame loop tests, driven through the mock
//! runtime/device pair.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use euclid::{RigidTransform3D, Vector3D};
use xr::{FrameScheduler, XrManager};
use xr_api::mock::{mono_view, stereo_views, MockDeviceHandle, MockDeviceInit, MockRuntime};
use xr_api::{
    ContextAttributes, Error, FrameOfReferenceType, GraphicsProvider, RenderView, RendererSink,
    SessionInit, Visibility,
};

struct TestGraphics;

impl GraphicsProvider for TestGraphics {
    type Context = ();

    fn create_context(&mut self, _attributes: &ContextAttributes) -> Result<(), Error> {
        Ok(())
    }
}

struct FailingGraphics;

impl GraphicsProvider for FailingGraphics {
    type Context = ();

    fn create_context(&mut self, _attributes: &ContextAttributes) -> Result<(), Error> {
        Err(Error::BackendSpecific("no GPU".into()))
    }
}

/// Records animation-frame registrations so tests can pump the loop
/// manually, one callback at a time, the way a host scheduler would.
#[derive(Clone, Default)]
struct CountingScheduler(Rc<Cell<usize>>);

impl CountingScheduler {
    fn take_pending(&self) -> usize {
        self.0.replace(0)
    }

    fn pending(&self) -> usize {
        self.0.get()
    }
}

impl FrameScheduler for CountingScheduler {
    fn request_frame(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

#[derive(Clone, Default)]
struct RecordingSink(Rc<RefCell<Vec<(f64, Vec<RenderView>)>>>);

impl RecordingSink {
    fn frames(&self) -> Vec<(f64, Vec<RenderView>)> {
        self.0.borrow().clone()
    }

    fn frame_count(&self) -> usize {
        self.0.borrow().len()
    }
}

impl RendererSink for RecordingSink {
    fn render_frame(&mut self, elapsed: f64, views: &[RenderView]) {
        self.0.borrow_mut().push((elapsed, views.to_vec()));
    }
}

fn manager_with_device(
    init: MockDeviceInit,
) -> (
    XrManager<TestGraphics>,
    MockDeviceHandle,
    CountingScheduler,
    RecordingSink,
) {
    let (runtime, handle) = MockRuntime::new(init);
    let scheduler = CountingScheduler::default();
    let sink = RecordingSink::default();
    let mut manager = XrManager::new(
        TestGraphics,
        Box::new(scheduler.clone()),
        Some(Box::new(runtime)),
    );
    manager.initialize().expect("mock device should be present");
    manager.set_renderer(Box::new(sink.clone()));
    (manager, handle, scheduler, sink)
}

/// Run every currently-scheduled callback exactly once, as the host's
/// animation-frame scheduler would.
fn pump(manager: &mut XrManager<TestGraphics>, scheduler: &CountingScheduler, timestamp: f64) {
    for _ in 0..scheduler.take_pending() {
        manager.render_frame(timestamp);
    }
}

#[test]
fn no_runtime_means_no_xr() {
    let scheduler = CountingScheduler::default();
    let mut manager: XrManager<TestGraphics> =
        XrManager::new(TestGraphics, Box::new(scheduler), None);
    assert!(!manager.supports_xr());
    assert_eq!(manager.initialize(), Err(Error::NotAvailable));
}

#[test]
fn disconnected_runtime_fails_initialize() {
    let scheduler = CountingScheduler::default();
    let mut manager: XrManager<TestGraphics> = XrManager::new(
        TestGraphics,
        Box::new(scheduler),
        Some(Box::new(MockRuntime::disconnected())),
    );
    assert!(manager.supports_xr());
    assert_eq!(manager.initialize(), Err(Error::NotAvailable));
    // Probing and session requests both require a device.
    assert_eq!(
        manager.supports_session(&SessionInit::inline()),
        Err(Error::NotAvailable)
    );
    assert_eq!(
        manager.request_session(SessionInit::inline()),
        Err(Error::NotAvailable)
    );
}

#[test]
fn immersive_rejection_is_false_not_an_error() {
    let (manager, _handle, _scheduler, _sink) = manager_with_device(MockDeviceInit {
        supports_immersive: false,
        ..MockDeviceInit::default()
    });
    assert_eq!(manager.supports_session(&SessionInit::immersive()), Ok(false));
    assert_eq!(manager.supports_session(&SessionInit::inline()), Ok(true));
}

#[test]
fn probe_faults_surface_as_distinct_errors() {
    let (manager, handle, _scheduler, _sink) = manager_with_device(MockDeviceInit::default());
    handle.fail_support_queries("device wedged");
    assert_eq!(
        manager.supports_session(&SessionInit::immersive()),
        Err(Error::BackendSpecific("device wedged".into()))
    );
}

#[test]
fn request_session_schedules_the_first_frame() {
    let (mut manager, handle, scheduler, _sink) = manager_with_device(MockDeviceInit::default());
    manager.request_session(SessionInit::immersive()).unwrap();
    assert!(manager.session_active());
    assert!(handle.session_active());
    assert_eq!(handle.attached_layers(), 1);
    assert_eq!(scheduler.pending(), 1);
}

#[test]
fn conflicting_session_is_invalid_state() {
    let (mut manager, _handle, _scheduler, _sink) = manager_with_device(MockDeviceInit::default());
    manager.request_session(SessionInit::immersive()).unwrap();
    assert_eq!(
        manager.request_session(SessionInit::inline()),
        Err(Error::InvalidState)
    );
    // The original session survives a rejected request.
    assert!(manager.session_active());
}

#[test]
fn unsupported_config_leaves_controller_retryable() {
    let (mut manager, handle, _scheduler, _sink) = manager_with_device(MockDeviceInit {
        supports_immersive: false,
        ..MockDeviceInit::default()
    });
    assert_eq!(
        manager.request_session(SessionInit::immersive()),
        Err(Error::NotSupported)
    );
    assert!(!manager.session_active());
    assert!(!handle.session_active());
    assert_eq!(handle.attached_layers(), 0);
    // A corrected configuration succeeds on the same controller.
    manager.request_session(SessionInit::inline()).unwrap();
}

#[test]
fn immersive_request_requires_user_activation() {
    let (mut manager, handle, _scheduler, _sink) = manager_with_device(MockDeviceInit {
        require_user_activation: true,
        ..MockDeviceInit::default()
    });
    assert_eq!(
        manager.request_session(SessionInit::immersive()),
        Err(Error::SecurityPrecondition)
    );
    assert!(!manager.session_active());
    handle.set_user_activation(true);
    manager.request_session(SessionInit::immersive()).unwrap();
}

#[test]
fn failed_context_creation_unwinds_the_device_session() {
    let (runtime, handle) = MockRuntime::new(MockDeviceInit::default());
    let scheduler = CountingScheduler::default();
    let mut manager: XrManager<FailingGraphics> = XrManager::new(
        FailingGraphics,
        Box::new(scheduler.clone()),
        Some(Box::new(runtime)),
    );
    manager.initialize().unwrap();
    assert_eq!(
        manager.request_session(SessionInit::immersive()),
        Err(Error::BackendSpecific("no GPU".into()))
    );
    assert!(!manager.session_active());
    assert!(!handle.session_active());
    assert_eq!(handle.attached_layers(), 0);
    assert_eq!(scheduler.pending(), 0);
}

#[test]
fn tracking_loss_skips_frames_without_stopping_the_loop() {
    let (mut manager, handle, scheduler, sink) = manager_with_device(MockDeviceInit::default());
    manager.request_session(SessionInit::immersive()).unwrap();
    handle.set_viewer_pose(None);

    for frame in 0..5 {
        pump(&mut manager, &scheduler, frame as f64 / 60.0);
        // Each skipped frame still re-registered the next callback.
        assert_eq!(scheduler.pending(), 1);
    }
    assert_eq!(sink.frame_count(), 0);
    assert!(manager.session_active());

    // Tracking returns; the very next frame renders.
    handle.set_viewer_pose(Some(RigidTransform3D::identity()));
    pump(&mut manager, &scheduler, 0.1);
    assert_eq!(sink.frame_count(), 1);
}

#[test]
fn ten_frame_round_trip_matches_pose_derived_view_matrices() {
    let (mut manager, handle, scheduler, sink) = manager_with_device(MockDeviceInit::default());
    manager.request_session(SessionInit::immersive()).unwrap();

    let views = stereo_views();
    for frame in 0..10 {
        let pose = RigidTransform3D::from_translation(Vector3D::new(0., 1.5, frame as f32 * 0.1));
        handle.set_viewer_pose(Some(pose));
        pump(&mut manager, &scheduler, frame as f64 / 60.0);

        let frames = sink.frames();
        let (_, ref submitted) = frames[frame];
        assert_eq!(submitted.len(), 2, "view count invariant broke at frame {}", frame);
        for (view, device_view) in submitted.iter().zip(&views) {
            let expected = device_view.offset.then(&pose).inverse();
            let delta = view.view.translation - expected.translation.cast_unit();
            assert!(delta.length() < 1e-5, "frame {} view {:?}", frame, view.eye);
            assert_eq!(view.projection, device_view.projection);
            assert_eq!(view.viewport, device_view.viewport);
        }
    }
    assert_eq!(sink.frame_count(), 10);
}

#[test]
fn view_count_growth_is_handled_mid_session() {
    let (mut manager, handle, scheduler, sink) = manager_with_device(MockDeviceInit {
        views: vec![mono_view(euclid::Size2D::new(256, 256))],
        ..MockDeviceInit::default()
    });
    manager.request_session(SessionInit::inline()).unwrap();

    pump(&mut manager, &scheduler, 0.0);
    assert_eq!(sink.frames()[0].1.len(), 1);

    handle.set_views(stereo_views());
    pump(&mut manager, &scheduler, 0.016);
    let frames = sink.frames();
    assert_eq!(frames[1].1.len(), 2);
    assert_eq!(frames[1].1[0].eye, xr_api::Eye::Left);
    assert_eq!(frames[1].1[1].eye, xr_api::Eye::Right);
}

#[test]
fn elapsed_time_is_measured_from_the_first_rendered_frame() {
    let (mut manager, _handle, scheduler, sink) = manager_with_device(MockDeviceInit::default());
    manager.request_session(SessionInit::immersive()).unwrap();

    pump(&mut manager, &scheduler, 2.0);
    pump(&mut manager, &scheduler, 2.016);
    let frames = sink.frames();
    assert_eq!(frames[0].0, 0.0);
    assert!((frames[1].0 - 0.016).abs() < 1e-9);
}

#[test]
fn end_session_is_idempotent() {
    let (mut manager, handle, scheduler, _sink) = manager_with_device(MockDeviceInit::default());
    manager.request_session(SessionInit::immersive()).unwrap();
    manager.end_session();
    assert!(!manager.session_active());
    assert!(!handle.session_active());
    manager.end_session();
    assert!(!manager.session_active());
    // Ready again: the device handle is reusable for a new session.
    manager.request_session(SessionInit::immersive()).unwrap();
    assert!(manager.session_active());
    let _ = scheduler.take_pending();
}

#[test]
fn device_initiated_end_converges_on_the_same_teardown() {
    let (mut manager, handle, scheduler, sink) = manager_with_device(MockDeviceInit::default());
    manager.request_session(SessionInit::immersive()).unwrap();
    pump(&mut manager, &scheduler, 0.0);
    assert_eq!(sink.frame_count(), 1);

    handle.simulate_session_end();
    pump(&mut manager, &scheduler, 0.016);
    // The ending frame renders nothing and clears the session.
    assert_eq!(sink.frame_count(), 1);
    assert!(!manager.session_active());
    assert!(!handle.session_active());
}

#[test]
fn late_callback_after_teardown_is_a_silent_noop() {
    let (mut manager, _handle, scheduler, sink) = manager_with_device(MockDeviceInit::default());
    manager.request_session(SessionInit::immersive()).unwrap();
    // The callback scheduled by request_session is still pending when the
    // session ends.
    manager.end_session();
    assert_eq!(scheduler.pending(), 1);
    pump(&mut manager, &scheduler, 0.0);
    assert_eq!(sink.frame_count(), 0);
    // A dropped callback does not reschedule itself.
    assert_eq!(scheduler.pending(), 0);
}

#[test]
fn session_restart_keeps_a_single_frame_loop() {
    let (mut manager, _handle, scheduler, sink) = manager_with_device(MockDeviceInit::default());
    manager.request_session(SessionInit::immersive()).unwrap();
    // The first session's callback is still pending when it ends; the
    // restarted session reuses it rather than stacking a second one.
    manager.end_session();
    manager.request_session(SessionInit::immersive()).unwrap();
    assert_eq!(scheduler.pending(), 1);

    pump(&mut manager, &scheduler, 0.0);
    assert_eq!(sink.frame_count(), 1);
    assert_eq!(scheduler.pending(), 1);

    // The loop stays single across repeated restarts.
    manager.end_session();
    manager.request_session(SessionInit::inline()).unwrap();
    pump(&mut manager, &scheduler, 0.016);
    assert_eq!(sink.frame_count(), 2);
    assert_eq!(scheduler.pending(), 1);
}

#[test]
fn visibility_changes_are_drained_without_disturbing_the_session() {
    let (mut manager, handle, scheduler, sink) = manager_with_device(MockDeviceInit::default());
    manager.request_session(SessionInit::immersive()).unwrap();

    handle.simulate_visibility_change(Visibility::VisibleBlurred);
    pump(&mut manager, &scheduler, 0.0);
    assert!(manager.session_active());
    assert!(handle.session_active());
    assert_eq!(sink.frame_count(), 1);

    handle.simulate_visibility_change(Visibility::Hidden);
    handle.simulate_visibility_change(Visibility::Visible);
    pump(&mut manager, &scheduler, 0.016);
    assert!(manager.session_active());
    assert_eq!(sink.frame_count(), 2);
}

#[test]
fn blocked_sessions_suppress_submission_but_keep_the_loop_alive() {
    let (mut manager, handle, scheduler, sink) = manager_with_device(MockDeviceInit::default());
    manager.request_session(SessionInit::immersive()).unwrap();

    assert!(!manager.blocked());
    manager.block();
    assert!(manager.blocked());
    for frame in 0..3 {
        pump(&mut manager, &scheduler, frame as f64 / 60.0);
        assert_eq!(scheduler.pending(), 1);
    }
    assert_eq!(sink.frame_count(), 0);
    // The device never started a frame for the suppressed callbacks.
    assert_eq!(handle.frames_begun(), 0);

    manager.unblock();
    assert!(!manager.blocked());
    pump(&mut manager, &scheduler, 0.1);
    assert_eq!(sink.frame_count(), 1);
}

#[test]
fn update_is_suppressed_while_blocked_and_inert_inside_sessions() {
    let (mut manager, _handle, scheduler, sink) = manager_with_device(MockDeviceInit::default());

    // Outside a session, a forced update is a plain redraw.
    manager.update(true);
    assert_eq!(sink.frame_count(), 1);
    assert!(sink.frames()[0].1.is_empty());

    // Suppressed, not queued, while blocked.
    manager.block();
    manager.update(true);
    assert_eq!(sink.frame_count(), 1);
    manager.unblock();
    assert_eq!(sink.frame_count(), 1);

    // A non-forced update changes nothing.
    manager.update(false);
    assert_eq!(sink.frame_count(), 1);

    // Inside a session frames are device-driven; update is unused.
    manager.request_session(SessionInit::immersive()).unwrap();
    manager.update(true);
    assert_eq!(sink.frame_count(), 1);
    let _ = scheduler.take_pending();
}

#[test]
fn clip_plane_updates_reach_the_device() {
    let (mut manager, handle, _scheduler, _sink) = manager_with_device(MockDeviceInit::default());
    manager.set_clip_planes(0.5, 500.0);
    manager.request_session(SessionInit::immersive()).unwrap();
    assert_eq!(handle.clip_planes(), (0.5, 500.0));
}

#[test]
fn mid_session_clip_plane_changes_reach_the_device_next_frame() {
    let (mut manager, handle, scheduler, _sink) = manager_with_device(MockDeviceInit::default());
    manager.request_session(SessionInit::immersive()).unwrap();
    assert_eq!(handle.clip_planes(), (0.1, 1000.0));

    manager.set_clip_planes(0.25, 250.0);
    // Deferred until a frame runs.
    assert_eq!(handle.clip_planes(), (0.1, 1000.0));
    pump(&mut manager, &scheduler, 0.0);
    assert_eq!(handle.clip_planes(), (0.25, 250.0));
}

#[test]
fn stage_reference_space_is_emulated_when_the_device_has_no_floor() {
    let (mut manager, _handle, scheduler, sink) = manager_with_device(MockDeviceInit {
        views: vec![mono_view(euclid::Size2D::new(256, 256))],
        ..MockDeviceInit::default()
    });
    let mut init = SessionInit::inline();
    init.frame_of_reference = FrameOfReferenceType::Stage;
    manager.request_session(init).unwrap();

    pump(&mut manager, &scheduler, 0.0);
    let frames = sink.frames();
    let view = &frames[0].1[0];
    // Identity pose at an emulated 1.6m eye height: the view matrix
    // drops the scene by that height.
    assert!((view.view.translation.y + 1.6).abs() < 1e-6);
}

#[test]
fn stage_without_floor_or_emulation_is_not_supported() {
    let (mut manager, handle, _scheduler, _sink) = manager_with_device(MockDeviceInit::default());
    let mut init = SessionInit::immersive();
    init.frame_of_reference = FrameOfReferenceType::Stage;
    init.frame_of_reference_options.allow_stage_emulation = false;
    assert_eq!(manager.request_session(init), Err(Error::NotSupported));
    assert!(!manager.session_active());
    assert!(!handle.session_active());
    assert_eq!(handle.attached_layers(), 0);
}
