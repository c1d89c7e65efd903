use async_trait::async_trait;
use serde_json::json;
use skyhost_portal::backend::{BackendReply, GatewayError, MockBackendGateway};
use skyhost_portal::code_entry::{
    CODE_LEN, CodeEntry, CodeEntryFlow, CodeSubmitter, FlowEvent, GatewayCodeSubmitter, KeyEvent,
    Phase,
};
use std::sync::{Arc, Mutex};

/// RecordingSubmitter
///
/// Scripted submitter: records every (email, code) submission and answers from a
/// queue of outcomes, defaulting to success.
#[derive(Default)]
struct RecordingSubmitter {
    submissions: Mutex<Vec<(String, String)>>,
    failures_remaining: Mutex<usize>,
}

impl RecordingSubmitter {
    fn failing_times(n: usize) -> Self {
        Self {
            submissions: Mutex::new(Vec::new()),
            failures_remaining: Mutex::new(n),
        }
    }

    fn submissions(&self) -> Vec<(String, String)> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl CodeSubmitter for RecordingSubmitter {
    async fn submit(&self, email: &str, code: &str) -> Result<(), String> {
        self.submissions
            .lock()
            .unwrap()
            .push((email.to_string(), code.to_string()));
        let mut failures = self.failures_remaining.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            Err("invalid code".to_string())
        } else {
            Ok(())
        }
    }
}

async fn type_code(flow: &mut CodeEntryFlow, code: &str) -> Vec<FlowEvent> {
    let mut events = Vec::new();
    for c in code.chars() {
        events.push(flow.handle_key(KeyEvent::Char(c)).await);
    }
    events
}

// --- Pure machine rules ---

#[test]
fn non_alphanumeric_input_leaves_the_cell_untouched() {
    let mut entry = CodeEntry::new();
    entry.apply(KeyEvent::Char('a'));
    assert_eq!(entry.cell(0), Some('a'));
    assert_eq!(entry.focus(), 1);

    // Rejected characters change neither the cell nor the focus.
    for bad in ['-', ' ', '!', 'é', '.'] {
        assert_eq!(entry.apply(KeyEvent::Char(bad)), None);
        assert_eq!(entry.cell(1), None);
        assert_eq!(entry.focus(), 1);
    }
}

#[test]
fn focus_advances_except_at_the_last_cell() {
    let mut entry = CodeEntry::new();
    for (i, c) in "abcdefg".chars().enumerate() {
        entry.apply(KeyEvent::Char(c));
        assert_eq!(entry.focus(), i + 1);
    }
    // The final character completes the code; focus does not move past the end.
    entry.apply(KeyEvent::Char('h'));
    assert_eq!(entry.focus(), CODE_LEN - 1);
}

#[test]
fn backspace_clears_in_place_and_moves_back_over_empty_cells() {
    let mut entry = CodeEntry::new();
    entry.apply(KeyEvent::Char('a'));
    entry.apply(KeyEvent::Char('b'));
    // Focus sits on empty cell 2: backspace only moves focus back.
    entry.apply(KeyEvent::Backspace);
    assert_eq!(entry.focus(), 1);
    assert_eq!(entry.cell(1), Some('b'));

    // Now the focused cell is filled: backspace clears it without moving.
    entry.apply(KeyEvent::Backspace);
    assert_eq!(entry.focus(), 1);
    assert_eq!(entry.cell(1), None);

    // And again: empty cell, move back to 0; at 0 it stays.
    entry.apply(KeyEvent::Backspace);
    assert_eq!(entry.focus(), 0);
    entry.apply(KeyEvent::Backspace);
    assert_eq!(entry.focus(), 0);
}

#[test]
fn completion_fires_the_moment_all_cells_fill() {
    let mut entry = CodeEntry::new();
    for c in "1234567".chars() {
        assert_eq!(entry.apply(KeyEvent::Char(c)), None);
    }
    assert_eq!(entry.apply(KeyEvent::Char('8')), Some("12345678".to_string()));
    assert_eq!(entry.phase(), Phase::Submitting);
}

// --- Flow: auto-submit and retry ---

#[tokio::test]
async fn typing_a_full_code_submits_exactly_once() {
    let submitter = Arc::new(RecordingSubmitter::default());
    let mut flow = CodeEntryFlow::new("a@b.com", submitter.clone());

    let events = type_code(&mut flow, "A1B2C3D4").await;

    // Seven pending keystrokes, then the completing one.
    assert_eq!(events[..7], vec![FlowEvent::Pending; 7][..]);
    assert_eq!(events[7], FlowEvent::Completed);
    assert_eq!(
        submitter.submissions(),
        vec![("a@b.com".to_string(), "A1B2C3D4".to_string())]
    );
}

#[tokio::test]
async fn rejected_submission_keeps_cells_and_surfaces_an_error() {
    let submitter = Arc::new(RecordingSubmitter::failing_times(1));
    let mut flow = CodeEntryFlow::new("a@b.com", submitter.clone());

    let events = type_code(&mut flow, "A1B2C3D4").await;
    assert_eq!(events[7], FlowEvent::Rejected);

    // All 8 cell values intact, editing resumed, error set.
    for (i, c) in "A1B2C3D4".chars().enumerate() {
        assert_eq!(flow.entry().cell(i), Some(c));
    }
    assert_eq!(flow.entry().phase(), Phase::Editing);
    assert_eq!(flow.entry().error(), Some("invalid code"));
    assert_eq!(submitter.submissions().len(), 1);
}

#[tokio::test]
async fn editing_after_rejection_resubmits_the_corrected_code() {
    let submitter = Arc::new(RecordingSubmitter::failing_times(1));
    let mut flow = CodeEntryFlow::new("a@b.com", submitter.clone());

    assert_eq!(type_code(&mut flow, "A1B2C3D4").await[7], FlowEvent::Rejected);

    // Overwrite the last cell in place: the code completes again and resubmits.
    assert_eq!(flow.handle_key(KeyEvent::Backspace).await, FlowEvent::Pending);
    assert_eq!(flow.handle_key(KeyEvent::Char('9')).await, FlowEvent::Completed);

    assert_eq!(
        submitter.submissions(),
        vec![
            ("a@b.com".to_string(), "A1B2C3D4".to_string()),
            ("a@b.com".to_string(), "A1B2C3D9".to_string()),
        ]
    );
}

// --- Gateway-backed submitter ---

#[tokio::test]
async fn gateway_submitter_maps_replies_to_generic_outcomes() {
    // 2xx verify reply: success.
    let ok_gateway = Arc::new(
        MockBackendGateway::new().with_verify(Ok(BackendReply::json(200, json!({"success": true})))),
    );
    let submitter = GatewayCodeSubmitter::new(ok_gateway);
    assert_eq!(submitter.submit("a@b.com", "A1B2C3D4").await, Ok(()));

    // Rejected code: generic message, regardless of the backend's own wording.
    let rejected = Arc::new(MockBackendGateway::new().with_verify(Ok(BackendReply::json(
        401,
        json!({"error": "code expired at 12:03"}),
    ))));
    let submitter = GatewayCodeSubmitter::new(rejected);
    assert_eq!(
        submitter.submit("a@b.com", "A1B2C3D4").await,
        Err("invalid code".to_string())
    );

    // Transport failure: same generic message.
    let down = Arc::new(
        MockBackendGateway::new().with_verify(Err(GatewayError::Transport("refused".into()))),
    );
    let submitter = GatewayCodeSubmitter::new(down);
    assert_eq!(
        submitter.submit("a@b.com", "A1B2C3D4").await,
        Err("invalid code".to_string())
    );
}
