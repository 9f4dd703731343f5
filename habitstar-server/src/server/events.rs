use std::convert::Infallible;

use axum::extract::{Extension, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use habitstar_shared::api::{ServerEvent, View};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use super::{AppState, FamilyEvent, auth::AuthCtx};

const ALL_VIEWS: [View; 6] = [
    View::Dashboard,
    View::Children,
    View::Tasks,
    View::Play,
    View::Rewards,
    View::Settings,
];

/// Streams the caller's family events until the client leaves or the server shuts down.
pub async fn api_events(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let parent_id = auth.parent_id().to_string();
    let child_id = auth.claims.child_id.clone();
    tracing::debug!(parent_id = %parent_id, child_id = ?child_id, "events: subscriber attached");

    let stream = BroadcastStream::new(state.subscribe())
        .filter_map(move |msg| {
            let out = route(msg, &parent_id, child_id.as_deref());
            async move { out }
        })
        .map(|ev| Ok(sse_event(&ev)))
        .take_until(state.shutdown_token().cancelled_owned());

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Decides whether a broadcast message reaches this subscriber.
fn route(
    msg: Result<FamilyEvent, BroadcastStreamRecvError>,
    parent_id: &str,
    child_id: Option<&str>,
) -> Option<ServerEvent> {
    match msg {
        Ok(fe) if fe.parent_id != parent_id => None,
        Ok(fe) => match (&fe.event, child_id) {
            // play tokens only hear about their own child
            (ServerEvent::StickerUnlocked { child_id: c, .. }, Some(own)) if c != own => None,
            _ => Some(fe.event),
        },
        Err(BroadcastStreamRecvError::Lagged(n)) => {
            tracing::warn!(skipped = n, "events: subscriber lagged; invalidating everything");
            Some(ServerEvent::Invalidate {
                views: ALL_VIEWS.to_vec(),
            })
        }
    }
}

fn sse_event(ev: &ServerEvent) -> Event {
    let name = match ev {
        ServerEvent::Invalidate { .. } => "invalidate",
        ServerEvent::StickerUnlocked { .. } => "sticker_unlocked",
    };
    match serde_json::to_string(ev) {
        Ok(json) => Event::default().event(name).data(json),
        Err(e) => {
            tracing::error!(error = %e, "events: serialize failed");
            Event::default().comment("serialize failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fe(parent: &str, event: ServerEvent) -> Result<FamilyEvent, BroadcastStreamRecvError> {
        Ok(FamilyEvent {
            parent_id: parent.into(),
            event,
        })
    }

    fn unlocked(child: &str) -> ServerEvent {
        ServerEvent::StickerUnlocked {
            child_id: child.into(),
            sticker_id: "rocket".into(),
        }
    }

    #[test]
    fn events_stay_within_the_family() {
        let inv = ServerEvent::Invalidate {
            views: vec![View::Dashboard],
        };
        assert_eq!(route(fe("p1", inv.clone()), "p1", None), Some(inv.clone()));
        assert_eq!(route(fe("p2", inv), "p1", None), None);
    }

    #[test]
    fn play_tokens_only_see_their_own_stickers() {
        assert_eq!(route(fe("p1", unlocked("a")), "p1", Some("b")), None);
        assert_eq!(
            route(fe("p1", unlocked("a")), "p1", Some("a")),
            Some(unlocked("a"))
        );
        // parents hear about every child
        assert_eq!(route(fe("p1", unlocked("a")), "p1", None), Some(unlocked("a")));
    }

    #[test]
    fn lag_turns_into_full_invalidation() {
        let out = route(Err(BroadcastStreamRecvError::Lagged(3)), "p1", None);
        assert_eq!(
            out,
            Some(ServerEvent::Invalidate {
                views: ALL_VIEWS.to_vec()
            })
        );
    }
}
