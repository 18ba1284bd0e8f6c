//! WebSocket transport for the change feed.
//!
//! ```text
//! GET /api/feed?tables=tickets&events=insert,update
//!
//! <- {"type":"subscribed","tables":["tickets"]}
//! <- {"type":"change","table":"tickets","kind":"update","id":"...","revisionId":12}
//! <- {"type":"resync","missed":40}
//! ```
//!
//! A `resync` means events were dropped for this client; it must refetch
//! everything it shows.

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use super::{ChangeEvent, Subscription, Table};
use crate::errors::{AppError, AppErrorWithRevision};
use crate::AppState;

/// Query string of the feed endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    #[serde(default)]
    pub tables: Option<String>,
    #[serde(default)]
    pub events: Option<String>,
}

/// Messages sent to feed subscribers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    Subscribed { tables: Vec<Table> },
    Change(ChangeEvent),
    Resync { missed: u64 },
}

/// GET /api/feed - Upgrade to a change feed WebSocket.
pub async fn feed_socket(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, AppErrorWithRevision> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let reject = |error: AppError| AppErrorWithRevision { error, revision_id };

    let subscription =
        Subscription::parse(query.tables.as_deref(), query.events.as_deref()).map_err(reject)?;
    let ws = ws.map_err(|e| reject(AppError::BadRequest(e.body_text())))?;

    // Subscribe before the upgrade so nothing committed in between is missed.
    let receiver = state.repo.feed().subscribe();
    info!(
        tables = ?subscription.tables(),
        subscribers = state.repo.feed().subscriber_count(),
        "Feed subscriber connecting"
    );
    Ok(ws.on_upgrade(move |socket| forward(socket, receiver, subscription)))
}

async fn forward(
    socket: WebSocket,
    mut events: broadcast::Receiver<ChangeEvent>,
    subscription: Subscription,
) {
    let (mut sender, mut receiver) = socket.split();

    let hello = FeedMessage::Subscribed {
        tables: subscription.tables(),
    };
    if send(&mut sender, &hello).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            event = events.recv() => {
                let message = match event {
                    Ok(event) if subscription.matches(&event) => FeedMessage::Change(event),
                    Ok(_) => continue,
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Feed subscriber lagged, requesting resync");
                        FeedMessage::Resync { missed }
                    }
                    Err(RecvError::Closed) => break,
                };
                if send(&mut sender, &message).await.is_err() {
                    break;
                }
            }
        }
    }

    debug!("Feed subscriber disconnected");
}

async fn send<S>(sender: &mut S, message: &FeedMessage) -> Result<(), ()>
where
    S: futures::Sink<Message> + Unpin,
{
    let text = serde_json::to_string(message).map_err(|_| ())?;
    sender.send(Message::Text(text.into())).await.map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::ChangeKind;

    #[test]
    fn test_feed_message_wire_format() {
        let change = FeedMessage::Change(ChangeEvent {
            table: Table::Tickets,
            kind: ChangeKind::Insert,
            id: "t1".to_string(),
            revision_id: 7,
        });
        let value = serde_json::to_value(&change).unwrap();
        assert_eq!(value["type"], "change");
        assert_eq!(value["table"], "tickets");
        assert_eq!(value["kind"], "insert");
        assert_eq!(value["revisionId"], 7);

        let resync = serde_json::to_value(FeedMessage::Resync { missed: 3 }).unwrap();
        assert_eq!(resync, serde_json::json!({ "type": "resync", "missed": 3 }));
    }
}
