//! Component integration tests: timer service, surface hub and action bus.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::time::{sleep, Duration};

use live_timer::clock::ManualClock;
use live_timer::daemon::{TimerEvent, TimerService, TimerUpdate};
use live_timer::messaging::{action_bus, SurfaceAction, TimerBridge};
use live_timer::presentation::{Control, Presenter, FINISHED_MESSAGE};
use live_timer::surface::hub::SurfaceHub;
use live_timer::surface::live_activity::intents;
use live_timer::surface::notification::action_ids;
use live_timer::surface::{
    InAppSurface, LiveActivitySurface, MockSurface, NotificationSurface, Surface, SurfaceCall,
    SurfaceKind,
};
use live_timer::types::TimerPhase;

/// Sampler period long enough that no tick lands inside a test.
const QUIET_SAMPLE: Duration = Duration::from_secs(60);

/// Sampler period short enough to observe ticks.
const FAST_SAMPLE: Duration = Duration::from_millis(10);

fn create_service(sample: Duration) -> (Arc<TimerService>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0));
    let service = Arc::new(TimerService::new(clock.clone(), sample));
    (service, clock)
}

/// Collects every update already published.
fn drain(rx: &mut broadcast::Receiver<TimerUpdate>) -> Vec<TimerUpdate> {
    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }
    updates
}

/// Waits until the service reaches `phase` or gives up after about a second.
async fn wait_for_phase(service: &TimerService, phase: TimerPhase) -> bool {
    for _ in 0..100 {
        if service.status().await.0.phase == phase {
            return true;
        }
        sleep(Duration::from_millis(10)).await;
    }
    false
}

// ============================================================================
// Fan-out
// ============================================================================

mod fan_out {
    use super::*;

    #[tokio::test]
    async fn test_every_surface_sees_the_same_view() {
        let (service, clock) = create_service(QUIET_SAMPLE);
        let mut rx = service.subscribe();
        let notification = MockSurface::new(SurfaceKind::Notification);
        let activity = MockSurface::new(SurfaceKind::LiveActivity);
        let in_app = MockSurface::new(SurfaceKind::InApp);
        let mut hub = SurfaceHub::new()
            .with_surface(notification.clone())
            .with_surface(activity.clone())
            .with_surface(in_app.clone());

        service.start(10, None).await.unwrap();
        clock.advance(3_000);
        service.pause(None).await.unwrap();
        for update in drain(&mut rx) {
            hub.dispatch(&update);
        }

        let views: Vec<_> = [&notification, &activity, &in_app]
            .iter()
            .map(|s| s.last_view().unwrap())
            .collect();
        assert!(views.iter().all(|v| *v == views[0]));
        assert_eq!(views[0].display_time, "0:03");
        assert_eq!(views[0].phase, TimerPhase::Paused);
    }

    #[tokio::test]
    async fn test_lifecycle_calls_follow_transitions() {
        let (service, clock) = create_service(QUIET_SAMPLE);
        let mut rx = service.subscribe();
        let surface = MockSurface::new(SurfaceKind::Notification);
        let mut hub = SurfaceHub::new().with_surface(surface.clone());

        service.start(10, None).await.unwrap();
        clock.advance(1_000);
        service.pause(None).await.unwrap();
        service.resume().await.unwrap();
        service.finish().await.unwrap();
        service.reset().await;
        for update in drain(&mut rx) {
            hub.dispatch(&update);
        }

        let calls = surface.calls();
        assert!(matches!(calls.first(), Some(SurfaceCall::Create(_))));
        assert_eq!(calls.last(), Some(&SurfaceCall::Teardown));
        let updates = calls
            .iter()
            .filter(|c| matches!(c, SurfaceCall::Update(_)))
            .count();
        assert_eq!(updates, 3);
        match &calls[calls.len() - 2] {
            SurfaceCall::Update(view) => {
                assert_eq!(view.message.as_deref(), Some(FINISHED_MESSAGE));
                assert_eq!(view.progress_fraction, 1.0);
            }
            other => panic!("Expected finished update, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failing_surface_does_not_block_others() {
        let (service, _clock) = create_service(QUIET_SAMPLE);
        let mut rx = service.subscribe();
        let broken = MockSurface::new(SurfaceKind::LiveActivity);
        broken.set_fail_create(true);
        let healthy = MockSurface::new(SurfaceKind::InApp);
        let mut hub = SurfaceHub::new()
            .with_surface(broken.clone())
            .with_surface(healthy.clone());

        service.start(10, None).await.unwrap();
        service.pause(None).await.unwrap();
        for update in drain(&mut rx) {
            hub.dispatch(&update);
        }

        assert!(!broken.is_presented());
        assert_eq!(healthy.calls().len(), 2);
        assert_eq!(healthy.last_view().unwrap().phase, TimerPhase::Paused);
    }

    #[tokio::test]
    async fn test_sampler_ticks_reach_surfaces_until_finished() {
        let (service, clock) = create_service(FAST_SAMPLE);
        let mut rx = service.subscribe();

        service.start(1, None).await.unwrap();
        clock.advance(1_200);
        assert!(wait_for_phase(&service, TimerPhase::Finished).await);
        let mut sampling = true;
        for _ in 0..100 {
            sampling = service.is_sampling().await;
            if !sampling {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        assert!(!sampling);

        let events: Vec<TimerEvent> = drain(&mut rx).into_iter().map(|u| u.event).collect();
        assert_eq!(events.first(), Some(&TimerEvent::Started));
        assert_eq!(events.last(), Some(&TimerEvent::Finished));
        assert_eq!(
            events.iter().filter(|e| **e == TimerEvent::Finished).count(),
            1
        );
    }
}

// ============================================================================
// Concrete Surfaces
// ============================================================================

mod concrete_surfaces {
    use super::*;

    #[tokio::test]
    async fn test_notification_tracks_the_run() {
        let (service, clock) = create_service(QUIET_SAMPLE);
        let mut rx = service.subscribe();
        let mut notification = NotificationSurface::new();

        service.start(10, None).await.unwrap();
        clock.advance(4_000);
        service.pause(None).await.unwrap();

        // Drive the surface directly so the test keeps ownership.
        for update in drain(&mut rx) {
            let view = Presenter::render(&update.state, update.at_ms);
            if update.event == TimerEvent::Started {
                notification.create(&update, &view).unwrap();
            } else {
                notification.update(&update, &view).unwrap();
            }
        }

        let layout = notification.layout().unwrap();
        assert_eq!(layout.time_text, "0:04");
        assert_eq!(layout.progress_max, 10);
        assert_eq!(layout.progress_value, 4);
        assert!(layout.has_button(action_ids::RESUME));
        assert!(layout.has_button(action_ids::RESTART));
        assert!(!layout.has_button(action_ids::PAUSE));
    }

    #[tokio::test]
    async fn test_unauthorized_live_activity_skips_run() {
        let (service, _clock) = create_service(QUIET_SAMPLE);
        let mut rx = service.subscribe();
        let mut activity = LiveActivitySurface::new(false);

        service.start(10, None).await.unwrap();
        let update = drain(&mut rx).remove(0);
        let view = Presenter::render(&update.state, update.at_ms);

        let err = activity.create(&update, &view).unwrap_err();
        assert!(err.is_unavailable());
        assert!(!activity.is_presented());
    }

    #[tokio::test]
    async fn test_in_app_view_follows_spawned_hub() {
        let (service, clock) = create_service(QUIET_SAMPLE);
        let in_app = InAppSurface::new();
        let hub_task = SurfaceHub::new()
            .with_surface(in_app.clone())
            .spawn(service.subscribe());

        service.start(10, None).await.unwrap();
        clock.advance(2_000);
        service.pause(None).await.unwrap();

        let mut seen = None;
        for _ in 0..100 {
            seen = in_app.view();
            if seen.as_ref().map(|v| v.phase) == Some(TimerPhase::Paused) {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        let view = seen.unwrap();
        assert_eq!(view.display_time, "0:02");
        assert!(view.visible_controls.contains(Control::Play));
        assert_eq!(in_app.last_event(), Some(TimerEvent::Paused));

        hub_task.abort();
    }
}

// ============================================================================
// Action Bus
// ============================================================================

mod action_bus_flow {
    use super::*;

    #[tokio::test]
    async fn test_in_app_press_pauses_timer() {
        let (service, _clock) = create_service(QUIET_SAMPLE);
        let (actions, receiver) = action_bus();
        let bridge = TimerBridge::new(service.clone(), receiver).spawn();
        let in_app = InAppSurface::new().with_actions(&actions);
        let hub_task = SurfaceHub::new()
            .with_surface(in_app.clone())
            .spawn(service.subscribe());

        service.start(10, None).await.unwrap();
        for _ in 0..100 {
            if in_app.view().is_some() {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(in_app.press(Control::Pause), Some(SurfaceAction::Pause));
        assert!(wait_for_phase(&service, TimerPhase::Paused).await);

        hub_task.abort();
        bridge.abort();
    }

    #[tokio::test]
    async fn test_notification_stop_resets_timer() {
        let (service, _clock) = create_service(QUIET_SAMPLE);
        let (actions, receiver) = action_bus();
        let bridge = TimerBridge::new(service.clone(), receiver).spawn();
        let notification = NotificationSurface::new().with_actions(&actions);

        service.start(10, None).await.unwrap();
        assert_eq!(
            notification.on_action(action_ids::STOP),
            Some(SurfaceAction::Reset)
        );
        assert!(wait_for_phase(&service, TimerPhase::Idle).await);

        bridge.abort();
    }

    #[tokio::test]
    async fn test_live_activity_restart_intent() {
        let (service, clock) = create_service(QUIET_SAMPLE);
        let (actions, receiver) = action_bus();
        let bridge = TimerBridge::new(service.clone(), receiver).spawn();
        let activity = LiveActivitySurface::new(true).with_actions(&actions);

        service.start(10, None).await.unwrap();
        clock.advance(5_000);
        service.pause(None).await.unwrap();

        assert_eq!(
            activity.on_intent(intents::RESTART),
            Some(SurfaceAction::Restart)
        );
        assert!(wait_for_phase(&service, TimerPhase::Running).await);
        let (state, now) = service.status().await;
        assert_eq!(state.elapsed_seconds(now), 0);
        assert_eq!(state.limit_time, Some(10));

        bridge.abort();
    }

    #[tokio::test]
    async fn test_invalid_action_is_ignored() {
        let (service, _clock) = create_service(QUIET_SAMPLE);
        let (actions, receiver) = action_bus();
        let bridge = TimerBridge::new(service.clone(), receiver).spawn();

        let result = actions.request(SurfaceAction::Resume).await.unwrap();

        assert!(result.unwrap_err().is_invalid_transition());
        assert_eq!(service.status().await.0.phase, TimerPhase::Idle);

        // The bridge keeps serving after a rejected action.
        service.start(10, None).await.unwrap();
        let result = actions.request(SurfaceAction::Pause).await.unwrap();
        assert_eq!(result.unwrap().phase, TimerPhase::Paused);

        bridge.abort();
    }
}
