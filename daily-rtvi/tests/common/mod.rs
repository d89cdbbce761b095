//! Recording fake of the native call engine.
//!
//! Every call is logged. Calls that take a request id answer with a
//! `request-completed` event on the caller's thread unless completions are
//! held back.

#![allow(dead_code)]

use daily_rtvi::{
    AboutClient, CallClient, CallClientDelegate, NativeEngine, NativeLogLevel, RequestId,
    TransportError, VirtualMicrophone, VirtualSpeaker,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// One recorded native call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetLogLevel(NativeLogLevel),
    CreateContext(AboutClient),
    CreateSpeaker { name: String, sample_rate: u32, channels: u8 },
    CreateMicrophone { name: String, sample_rate: u32, channels: u8 },
    CreateCallClient,
    UpdateSubscriptionProfiles(RequestId, Value),
    Join { request_id: RequestId, room_url: String, token: String, settings: Value },
    Leave(RequestId),
    SendAppMessage(RequestId, Value),
    WriteFrames(RequestId, usize),
    ReadFrames(RequestId, usize),
    DropCallClient,
}

#[derive(Default)]
struct Shared {
    calls: Mutex<Vec<Call>>,
    delegate: Mutex<Option<Arc<dyn CallClientDelegate>>>,
    hold_completions: AtomicBool,
    fail_call_client: AtomicBool,
    join_events: Mutex<Vec<Value>>,
}

impl Shared {
    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn complete(&self, request_id: RequestId) {
        if self.hold_completions.load(Ordering::SeqCst) {
            return;
        }
        self.emit(&format!(
            r#"{{"action":"request-completed","requestId":{{"id":{}}}}}"#,
            request_id
        ));
    }

    fn emit(&self, event_json: &str) {
        let delegate = self.delegate.lock().clone();
        if let Some(delegate) = delegate {
            delegate.on_event(event_json);
        }
    }
}

/// Fake engine handle; clones share state.
#[derive(Clone, Default)]
pub struct MockEngine {
    shared: Arc<Shared>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call made so far.
    pub fn calls(&self) -> Vec<Call> {
        self.shared.calls.lock().clone()
    }

    /// Calls that carried a request id answered by a completion event.
    pub fn round_trips(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| {
                matches!(
                    call,
                    Call::UpdateSubscriptionProfiles(..)
                        | Call::Join { .. }
                        | Call::Leave(_)
                        | Call::SendAppMessage(..)
                )
            })
            .collect()
    }

    /// Payloads of every app message sent, in order.
    pub fn app_messages(&self) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SendAppMessage(_, payload) => Some(payload),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.shared.calls.lock().clear();
    }

    /// Stop answering requests with completion events.
    pub fn hold_completions(&self, hold: bool) {
        self.shared.hold_completions.store(hold, Ordering::SeqCst);
    }

    /// Make `create_call_client` fail.
    pub fn fail_call_client(&self, fail: bool) {
        self.shared.fail_call_client.store(fail, Ordering::SeqCst);
    }

    /// Events delivered from inside the next `join`, before its completion.
    pub fn emit_during_join(&self, events: Vec<Value>) {
        *self.shared.join_events.lock() = events;
    }

    /// Deliver a raw event to the current call client's delegate.
    pub fn emit(&self, event: Value) {
        self.shared.emit(&event.to_string());
    }

    /// Deliver a completion for `request_id` regardless of holds.
    pub fn complete(&self, request_id: RequestId) {
        self.shared.emit(&format!(
            r#"{{"action":"request-completed","requestId":{{"id":{}}}}}"#,
            request_id
        ));
    }

    pub fn as_engine(&self) -> Arc<dyn NativeEngine> {
        Arc::new(self.clone())
    }
}

impl NativeEngine for MockEngine {
    fn set_log_level(&self, level: NativeLogLevel) {
        self.shared.record(Call::SetLogLevel(level));
    }

    fn create_context(&self, about: &AboutClient) -> daily_rtvi::Result<()> {
        self.shared.record(Call::CreateContext(about.clone()));
        Ok(())
    }

    fn create_speaker(
        &self,
        name: &str,
        sample_rate: u32,
        channels: u8,
    ) -> daily_rtvi::Result<Box<dyn VirtualSpeaker>> {
        self.shared.record(Call::CreateSpeaker { name: name.to_string(), sample_rate, channels });
        Ok(Box::new(MockDevice { shared: Arc::clone(&self.shared) }))
    }

    fn create_microphone(
        &self,
        name: &str,
        sample_rate: u32,
        channels: u8,
    ) -> daily_rtvi::Result<Box<dyn VirtualMicrophone>> {
        self.shared.record(Call::CreateMicrophone {
            name: name.to_string(),
            sample_rate,
            channels,
        });
        Ok(Box::new(MockDevice { shared: Arc::clone(&self.shared) }))
    }

    fn create_call_client(
        &self,
        delegate: Arc<dyn CallClientDelegate>,
    ) -> daily_rtvi::Result<Box<dyn CallClient>> {
        if self.shared.fail_call_client.load(Ordering::SeqCst) {
            return Err(TransportError::native("call client unavailable"));
        }
        self.shared.record(Call::CreateCallClient);
        *self.shared.delegate.lock() = Some(delegate);
        Ok(Box::new(MockClient { shared: Arc::clone(&self.shared) }))
    }
}

struct MockClient {
    shared: Arc<Shared>,
}

fn parse(payload: &str) -> Value {
    serde_json::from_str(payload).unwrap_or(Value::Null)
}

impl CallClient for MockClient {
    fn update_subscription_profiles(&self, request_id: RequestId, profiles: &str) {
        self.shared.record(Call::UpdateSubscriptionProfiles(request_id, parse(profiles)));
        self.shared.complete(request_id);
    }

    fn join(&self, request_id: RequestId, room_url: &str, token: &str, settings: &str) {
        self.shared.record(Call::Join {
            request_id,
            room_url: room_url.to_string(),
            token: token.to_string(),
            settings: parse(settings),
        });
        let events = std::mem::take(&mut *self.shared.join_events.lock());
        for event in events {
            self.shared.emit(&event.to_string());
        }
        self.shared.complete(request_id);
    }

    fn leave(&self, request_id: RequestId) {
        self.shared.record(Call::Leave(request_id));
        self.shared.complete(request_id);
    }

    fn send_app_message(&self, request_id: RequestId, payload: &str) {
        self.shared.record(Call::SendAppMessage(request_id, parse(payload)));
        self.shared.complete(request_id);
    }
}

impl Drop for MockClient {
    fn drop(&mut self) {
        self.shared.record(Call::DropCallClient);
        self.shared.delegate.lock().take();
    }
}

struct MockDevice {
    shared: Arc<Shared>,
}

impl VirtualSpeaker for MockDevice {
    fn read_frames(&self, frames: &mut [i16], request_id: RequestId) -> usize {
        self.shared.record(Call::ReadFrames(request_id, frames.len()));
        frames.fill(1);
        frames.len()
    }
}

impl VirtualMicrophone for MockDevice {
    fn write_frames(&self, frames: &[i16], request_id: RequestId) -> usize {
        self.shared.record(Call::WriteFrames(request_id, frames.len()));
        frames.len()
    }
}

/// Connection payload as returned by a bot start endpoint.
pub fn session_info() -> Value {
    serde_json::json!({
        "room_url": "https://example.daily.co/rtvi-test",
        "token": "test-token"
    })
}

/// Poll `check` until it holds or `limit` elapses.
pub async fn eventually(limit: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}
