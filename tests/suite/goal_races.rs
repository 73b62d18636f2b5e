//! Goal scheduling under racing cursor moves, stale documents and busy workers

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use infoview_sync::protocol::{notify, worker};
use infoview_sync::{GoalState, GoalStatus, Subscription, WorkerError};
use tokio::task::LocalSet;

use crate::common::{DOC, Harness, cursor_params, harness, progress_params, settle};

type Recorded = Rc<RefCell<Vec<Rc<GoalState>>>>;

fn record_goal_states(h: &Harness) -> (Recorded, Subscription) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let sub = h.session.on_goal_state(move |state| {
        sink.borrow_mut().push(state.clone());
        Ok(())
    });
    (seen, sub)
}

fn goal_text(state: &GoalState) -> Option<String> {
    state.goal.as_ref().map(|g| g.plain_text())
}

#[tokio::test(start_paused = true)]
async fn idle_cursor_move_requests_both_goals_after_short_delay() {
    LocalSet::new()
        .run_until(async {
            let h = harness();
            h.session
                .handle_notification(notify::CURSOR_LOCATION, cursor_params(4, 2));
            settle(40).await;
            assert!(h.worker.requests(worker::PLAIN_GOAL).is_empty());
            assert_eq!(h.session.goal_state().status, GoalStatus::Updating);

            settle(20).await;
            assert_eq!(h.worker.requests(worker::PLAIN_GOAL).len(), 1);
            assert_eq!(h.worker.requests(worker::PLAIN_TERM_GOAL).len(), 1);
            let state = h.session.goal_state();
            assert!(state.is_ready());
            assert_eq!(goal_text(&state).as_deref(), Some("⊢ line 4"));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn rapid_cursor_moves_collapse_into_one_request() {
    LocalSet::new()
        .run_until(async {
            let h = harness();
            for line in 0..10 {
                h.session
                    .handle_notification(notify::CURSOR_LOCATION, cursor_params(line, 0));
                settle(3).await;
            }
            settle(100).await;
            let requests = h.worker.requests(worker::PLAIN_GOAL);
            assert_eq!(requests.len(), 1);
            assert_eq!(requests[0].line(), 9);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn stale_document_is_retried_without_surfacing_an_error() {
    LocalSet::new()
        .run_until(async {
            let h = harness();
            let (seen, _sub) = record_goal_states(&h);
            h.worker
                .push(worker::PLAIN_GOAL, Err(WorkerError::from_response(-32801, "modified")));

            h.session
                .handle_notification(notify::CURSOR_LOCATION, cursor_params(2, 0));
            settle(200).await;

            assert_eq!(h.worker.requests(worker::PLAIN_GOAL).len(), 2);
            assert!(seen.borrow().iter().all(|s| s.error().is_none()));
            let state = h.session.goal_state();
            assert!(state.is_ready());
            assert_eq!(goal_text(&state).as_deref(), Some("⊢ line 2"));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn slow_result_for_an_old_position_is_never_shown() {
    LocalSet::new()
        .run_until(async {
            let h = harness();
            h.worker.set_latency(Duration::from_millis(100));
            let (seen, _sub) = record_goal_states(&h);

            h.session
                .handle_notification(notify::CURSOR_LOCATION, cursor_params(1, 0));
            // First request is in flight from 50 ms to 150 ms.
            settle(60).await;
            h.session
                .handle_notification(notify::CURSOR_LOCATION, cursor_params(8, 0));
            settle(300).await;

            assert_eq!(h.worker.requests(worker::PLAIN_GOAL).len(), 2);
            let shown: Vec<Option<String>> = seen
                .borrow()
                .iter()
                .filter(|s| s.goal.is_some())
                .map(|s| goal_text(s))
                .collect();
            assert_eq!(shown, vec![Some("⊢ line 8".to_string())]);
            assert_eq!(h.session.goal_state().position.as_ref().map(|p| p.line()), Some(8));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn busy_worker_stretches_the_delay() {
    LocalSet::new()
        .run_until(async {
            let h = harness();
            h.session.handle_notification(
                notify::FILE_PROGRESS,
                progress_params(DOC, &[((0, 0), (40, 0))]),
            );
            h.session
                .handle_notification(notify::CURSOR_LOCATION, cursor_params(3, 0));
            settle(400).await;
            assert!(h.worker.requests(worker::PLAIN_GOAL).is_empty());

            settle(150).await;
            assert_eq!(h.worker.requests(worker::PLAIN_GOAL).len(), 1);

            // Processing finished: the flip back to idle refreshes quickly.
            h.session
                .handle_notification(notify::FILE_PROGRESS, progress_params(DOC, &[]));
            settle(60).await;
            assert_eq!(h.worker.requests(worker::PLAIN_GOAL).len(), 2);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn progress_for_another_document_does_not_slow_the_cursor() {
    LocalSet::new()
        .run_until(async {
            let h = harness();
            h.session.handle_notification(
                notify::FILE_PROGRESS,
                progress_params("file:///Other.lean", &[((0, 0), (40, 0))]),
            );
            h.session
                .handle_notification(notify::CURSOR_LOCATION, cursor_params(3, 0));
            settle(60).await;
            assert_eq!(h.worker.requests(worker::PLAIN_GOAL).len(), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn failure_is_shown_until_a_refresh_succeeds() {
    LocalSet::new()
        .run_until(async {
            let h = harness();
            h.worker.push(
                worker::PLAIN_GOAL,
                Err(WorkerError::from_response(-32603, "elaboration failed")),
            );
            h.session
                .handle_notification(notify::CURSOR_LOCATION, cursor_params(6, 0));
            settle(100).await;

            let failed = h.session.goal_state();
            assert_eq!(failed.error(), Some("elaboration failed"));
            assert_eq!(failed.goal_error.as_deref(), Some("elaboration failed"));
            assert!(failed.term_goal.is_some());

            h.session.refresh();
            settle(100).await;
            let recovered = h.session.goal_state();
            assert!(recovered.is_ready());
            assert!(recovered.goal_error.is_none());
            assert_eq!(goal_text(&recovered).as_deref(), Some("⊢ line 6"));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn unknown_error_codes_are_generic_failures() {
    LocalSet::new()
        .run_until(async {
            let h = harness();
            h.worker.push(
                worker::PLAIN_TERM_GOAL,
                Err(WorkerError::from_response(-31999, "odd")),
            );
            h.session
                .handle_notification(notify::CURSOR_LOCATION, cursor_params(1, 0));
            settle(200).await;
            assert_eq!(h.worker.requests(worker::PLAIN_TERM_GOAL).len(), 1);
            assert_eq!(h.session.goal_state().error(), Some("odd"));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn paused_view_is_silent_and_resume_shows_latest() {
    LocalSet::new()
        .run_until(async {
            let h = harness();
            h.session
                .handle_notification(notify::CURSOR_LOCATION, cursor_params(1, 0));
            settle(100).await;

            let (seen, _sub) = record_goal_states(&h);
            h.session
                .handle_notification(notify::ACTION, serde_json::json!({ "kind": "togglePaused" }));
            assert!(h.session.is_paused());
            h.session
                .handle_notification(notify::CURSOR_LOCATION, cursor_params(5, 0));
            settle(100).await;
            assert!(seen.borrow().is_empty());
            assert_eq!(goal_text(&h.session.goal_state()).as_deref(), Some("⊢ line 1"));

            h.session.set_paused(false);
            let seen = seen.borrow();
            assert_eq!(seen.len(), 1);
            assert_eq!(goal_text(&seen[0]).as_deref(), Some("⊢ line 5"));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn pushed_debounce_time_overrides_idle_interval() {
    LocalSet::new()
        .run_until(async {
            let h = harness();
            h.session.handle_notification(
                notify::CONFIG_CHANGED,
                serde_json::json!({ "debounceTime": 200 }),
            );
            h.session
                .handle_notification(notify::CURSOR_LOCATION, cursor_params(2, 0));
            settle(150).await;
            assert!(h.worker.requests(worker::PLAIN_GOAL).is_empty());
            settle(60).await;
            assert_eq!(h.worker.requests(worker::PLAIN_GOAL).len(), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn expected_type_off_skips_term_goal_requests() {
    LocalSet::new()
        .run_until(async {
            let h = harness();
            h.session.handle_notification(
                notify::CONFIG_CHANGED,
                serde_json::json!({ "showExpectedType": false }),
            );
            h.session
                .handle_notification(notify::CURSOR_LOCATION, cursor_params(2, 0));
            settle(100).await;
            assert!(h.worker.requests(worker::PLAIN_TERM_GOAL).is_empty());
            let state = h.session.goal_state();
            assert!(state.is_ready());
            assert!(state.term_goal.is_none());
        })
        .await;
}
