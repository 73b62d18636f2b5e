//! Session lifecycle and host interaction

use std::cell::Cell;
use std::rc::Rc;

use infoview_sync::protocol::{notify, worker};
use infoview_sync::{InfoviewSession, SchedulerConfig, run_host_pump};
use infoview_types::Range;
use tokio::sync::mpsc;
use tokio::task::LocalSet;

use crate::common::{
    DOC, RecordingHost, ScriptedWorker, cursor_params, diagnostic, diagnostics_params, harness,
    harness_with, pos, settle,
};

const CONSUMED: [&str; 5] = [
    notify::PUBLISH_DIAGNOSTICS,
    notify::FILE_PROGRESS,
    notify::CURSOR_LOCATION,
    notify::CONFIG_CHANGED,
    notify::ACTION,
];

#[tokio::test(start_paused = true)]
async fn start_subscribes_each_consumed_notification_once() {
    LocalSet::new()
        .run_until(async {
            let h = harness();
            settle(1).await;
            let expected: Vec<String> = CONSUMED.iter().map(|m| format!("subscribe {m}")).collect();
            assert_eq!(h.host.calls(), expected);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn dispose_unsubscribes_everything_and_goes_quiet() {
    LocalSet::new()
        .run_until(async {
            let h = harness();
            settle(1).await;
            h.session.dispose();
            settle(1).await;
            assert_eq!(h.host.count_prefix("unsubscribe "), CONSUMED.len());

            h.session
                .handle_notification(notify::CURSOR_LOCATION, cursor_params(1, 0));
            settle(200).await;
            assert!(h.worker.requests(worker::PLAIN_GOAL).is_empty());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn dispose_cancels_goal_requests_already_scheduled() {
    LocalSet::new()
        .run_until(async {
            let h = harness();
            h.session
                .handle_notification(notify::CURSOR_LOCATION, cursor_params(3, 0));
            h.session.pin(pos(9, 0));
            h.session.dispose();
            settle(200).await;
            assert!(h.worker.requests(worker::PLAIN_GOAL).is_empty());
            assert!(h.worker.requests(worker::PLAIN_TERM_GOAL).is_empty());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn dropping_the_last_handle_drains_queued_unsubscribes() {
    LocalSet::new()
        .run_until(async {
            let host = Rc::new(RecordingHost::default());
            let (commands, queued) = mpsc::unbounded_channel();
            let pump = tokio::task::spawn_local(run_host_pump(host.clone(), queued));
            let session = InfoviewSession::with_command_queue(
                commands,
                Rc::new(ScriptedWorker::default()),
                SchedulerConfig::default(),
            );

            session.dispose();
            drop(session);
            pump.await.unwrap();

            assert_eq!(host.count_prefix("subscribe "), CONSUMED.len());
            assert_eq!(host.count_prefix("unsubscribe "), CONSUMED.len());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn rejected_subscription_is_logged_not_fatal() {
    LocalSet::new()
        .run_until(async {
            let host = RecordingHost::default();
            host.reject_subscribe.set(true);
            let h = harness_with(host);
            settle(1).await;
            assert_eq!(h.host.count_prefix("subscribe "), CONSUMED.len());

            h.session.handle_notification(
                notify::PUBLISH_DIAGNOSTICS,
                diagnostics_params(DOC, vec![diagnostic((0, 0), (0, 3), 1, "oops")]),
            );
            assert_eq!(h.session.diagnostics().error_count(), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn diagnostics_batches_replace_per_document() {
    LocalSet::new()
        .run_until(async {
            let h = harness();
            let other = "file:///Other.lean";
            h.session.handle_notification(
                notify::PUBLISH_DIAGNOSTICS,
                diagnostics_params(DOC, vec![diagnostic((1, 0), (1, 4), 1, "x")]),
            );
            h.session.handle_notification(
                notify::PUBLISH_DIAGNOSTICS,
                diagnostics_params(other, vec![diagnostic((2, 0), (2, 4), 2, "z")]),
            );
            h.session.handle_notification(
                notify::PUBLISH_DIAGNOSTICS,
                diagnostics_params(DOC, vec![diagnostic((3, 0), (3, 4), 1, "y")]),
            );

            let snap = h.session.diagnostics();
            let main = snap.get(&DOC.into());
            assert_eq!(main.len(), 1);
            assert_eq!(main[0].message(), "y");
            assert_eq!(snap.get(&other.into())[0].message(), "z");
            assert_eq!(snap.status_string(), "E:1 W:1");
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn diagnostics_observers_see_every_new_snapshot() {
    LocalSet::new()
        .run_until(async {
            let h = harness();
            let seen = Rc::new(Cell::new(0));
            let counter = seen.clone();
            let _sub = h.session.on_diagnostics(move |_| {
                counter.set(counter.get() + 1);
                Ok(())
            });
            for _ in 0..3 {
                h.session.handle_notification(
                    notify::PUBLISH_DIAGNOSTICS,
                    diagnostics_params(DOC, vec![diagnostic((0, 0), (0, 1), 1, "e")]),
                );
            }
            assert_eq!(seen.get(), 3);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn malformed_params_do_not_disturb_other_notifications() {
    LocalSet::new()
        .run_until(async {
            let h = harness();
            h.session.handle_notification(
                notify::PUBLISH_DIAGNOSTICS,
                serde_json::json!({ "uri": 42 }),
            );
            h.session
                .handle_notification(notify::ACTION, serde_json::json!({ "kind": "selfDestruct" }));
            h.session.handle_notification(
                notify::PUBLISH_DIAGNOSTICS,
                diagnostics_params(DOC, vec![diagnostic((0, 0), (0, 1), 2, "w")]),
            );
            assert_eq!(h.session.diagnostics().warning_count(), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn reveal_and_copy_reach_the_host_in_order() {
    LocalSet::new()
        .run_until(async {
            let h = harness();
            settle(1).await;
            let target = pos(12, 3);
            h.session.reveal(
                target.uri().clone(),
                Range::new(target.position(), target.position()),
            );
            h.session.copy_text("⊢ True");
            settle(1).await;
            let calls = h.host.calls();
            assert_eq!(
                &calls[CONSUMED.len()..],
                &[format!("reveal {DOC} 12"), "copy ⊢ True".to_string()]
            );
        })
        .await;
}
