//! Live dashboard channel.
//!
//! A tokio task holds the WebSocket open and forwards every decoded frame to
//! the main loop. When the socket drops it waits the reconnect delay and
//! tries again, forever, until the event receiver is gone.

use futures::StreamExt;
use gaitview_core::events::PushFrame;
use gaitview_core::reconcile::ReconnectPolicy;
use tokio::sync::mpsc::UnboundedSender;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::event::{AppEvent, LiveEvent};

pub fn spawn_live_task(url: String, policy: ReconnectPolicy, tx: UnboundedSender<AppEvent>) {
    tokio::spawn(live_loop(url, policy, tx));
}

async fn live_loop(url: String, policy: ReconnectPolicy, tx: UnboundedSender<AppEvent>) {
    let mut attempt: u32 = 0;
    loop {
        if tx.send(AppEvent::Live(LiveEvent::Connecting)).is_err() {
            return;
        }
        let reason = match connect_async(url.as_str()).await {
            Ok((mut ws, _)) => {
                attempt = 0;
                tracing::info!(%url, "live channel connected");
                if tx.send(AppEvent::Live(LiveEvent::Connected)).is_err() {
                    return;
                }
                loop {
                    match ws.next().await {
                        Some(Ok(Message::Text(text))) => match decode(text.as_str()) {
                            Some(frame) => {
                                let event = AppEvent::Live(LiveEvent::Frame(Box::new(frame)));
                                if tx.send(event).is_err() {
                                    return;
                                }
                            }
                            None => continue,
                        },
                        Some(Ok(Message::Close(_))) | None => break "closed by server".to_owned(),
                        Some(Ok(_)) => {}
                        Some(Err(err)) => break err.to_string(),
                    }
                }
            }
            Err(err) => err.to_string(),
        };

        tracing::warn!(%url, attempt, reason = %reason, "live channel down");
        if tx.send(AppEvent::Live(LiveEvent::Disconnected(reason))).is_err() {
            return;
        }
        tokio::time::sleep(policy.delay_for(attempt)).await;
        attempt = attempt.saturating_add(1);
    }
}

fn decode(text: &str) -> Option<PushFrame> {
    match PushFrame::decode(text) {
        Ok(frame) => Some(frame),
        Err(err) => {
            tracing::warn!(error = %err, "undecodable live frame dropped");
            None
        }
    }
}
