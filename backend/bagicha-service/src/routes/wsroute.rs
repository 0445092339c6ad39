use crate::models::message::NewMessage;
use crate::services::MessageService;
use crate::state::AppState;
use crate::websocket::events::{MessageReadPayload, MessageSentPayload};
use crate::websocket::message_types::SendMessagePayload;
use crate::websocket::{fanout, ClientEvent, ConnectionId, Room, RoomRegistry, ServerEvent};
use actix::{Actor, ActorContext, AsyncContext, Handler, Message as ActixMessage, StreamHandler};
use actix_middleware::{bearer_token, json_error};
use actix_web::{get, http::StatusCode, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

/// Serialized event for this socket
#[derive(ActixMessage)]
#[rtype(result = "()")]
struct BroadcastMessage(String);

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

pub struct WsSession {
    conn: ConnectionId,
    /// `None` for anonymous sockets
    user_id: Option<Uuid>,
    hb: Instant,
    heartbeat: Duration,
    client_timeout: Duration,
    rooms: RoomRegistry,
    app_state: AppState,
    outbox: Option<UnboundedReceiver<String>>,
}

impl WsSession {
    fn new(
        conn: ConnectionId,
        user_id: Option<Uuid>,
        outbox: UnboundedReceiver<String>,
        app_state: AppState,
    ) -> Self {
        Self {
            conn,
            user_id,
            hb: Instant::now(),
            heartbeat: Duration::from_secs(app_state.config.ws.heartbeat_secs.max(1)),
            client_timeout: Duration::from_secs(app_state.config.ws.client_timeout_secs.max(1)),
            rooms: app_state.rooms.clone(),
            app_state,
            outbox: Some(outbox),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let timeout = self.client_timeout;
        ctx.run_interval(self.heartbeat, move |act, ctx| {
            if Instant::now().duration_since(act.hb) > timeout {
                tracing::info!(connection = %act.conn, "websocket client heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn send(ctx: &mut ws::WebsocketContext<Self>, event: &ServerEvent) {
        if let Some(payload) = encode(event) {
            ctx.text(payload);
        }
    }

    fn join(&self, rooms: Vec<Room>) {
        let registry = self.rooms.clone();
        let conn = self.conn;
        actix::spawn(async move {
            for room in &rooms {
                registry.join(room, conn).await;
            }
        });
    }

    fn join_user_room(&self, id: Uuid, ctx: &mut ws::WebsocketContext<Self>) {
        if self.user_id == Some(id) {
            self.join(vec![Room::User(id)]);
        } else {
            tracing::warn!(connection = %self.conn, requested = %id, "rejected foreign user room join");
            Self::send(ctx, &ServerEvent::error("Not authorized for this room"));
        }
    }

    fn handle_event(&mut self, event: ClientEvent, ctx: &mut ws::WebsocketContext<Self>) {
        match event {
            ClientEvent::UserConnected(id) | ClientEvent::JoinUserRoom(id) => {
                self.join_user_room(id, ctx)
            }
            ClientEvent::JoinRoom(name) => match Room::parse(&name) {
                Some(Room::User(id)) => self.join_user_room(id, ctx),
                Some(room) => self.join(vec![room, Room::Global]),
                None => Self::send(ctx, &ServerEvent::error("Room name is required")),
            },
            ClientEvent::LeaveRoom(name) => match Room::parse(&name) {
                Some(Room::User(_)) => {
                    Self::send(ctx, &ServerEvent::error("User rooms cannot be left"))
                }
                Some(room) => {
                    let registry = self.rooms.clone();
                    let conn = self.conn;
                    actix::spawn(async move { registry.leave(&room, conn).await });
                }
                None => {}
            },
            ClientEvent::SendMessage(payload) => self.send_message(payload, ctx),
            ClientEvent::MarkRead(message_id) => self.mark_read(message_id, ctx),
            ClientEvent::Ping => Self::send(ctx, &ServerEvent::Pong),
        }
    }

    fn send_message(&self, payload: SendMessagePayload, ctx: &mut ws::WebsocketContext<Self>) {
        let Some(sender_id) = self.user_id else {
            Self::send(ctx, &ServerEvent::error("Not authorized"));
            return;
        };
        let Some(new_message) = NewMessage::build(
            sender_id,
            payload.recipient_id,
            payload.content.as_deref(),
            payload.post_id,
        ) else {
            Self::send(ctx, &ServerEvent::error("Missing required fields"));
            return;
        };

        let db = self.app_state.db.clone();
        let registry = self.rooms.clone();
        let addr = ctx.address();
        actix::spawn(async move {
            let reply = match MessageService::create(&db, &new_message).await {
                Ok(message) => {
                    MessageService::broadcast(&registry, &message).await;
                    ServerEvent::MessageSent(MessageSentPayload {
                        id: message.id,
                        success: true,
                    })
                }
                Err(e) => {
                    tracing::error!(error = %e, sender_id = %sender_id, "failed to persist socket message");
                    ServerEvent::error("Failed to send message")
                }
            };
            if let Some(payload) = encode(&reply) {
                addr.do_send(BroadcastMessage(payload));
            }
        });
    }

    fn mark_read(&self, message_id: Uuid, ctx: &mut ws::WebsocketContext<Self>) {
        let Some(reader) = self.user_id else {
            Self::send(ctx, &ServerEvent::error("Not authorized"));
            return;
        };

        let db = self.app_state.db.clone();
        let registry = self.rooms.clone();
        let addr = ctx.address();
        actix::spawn(async move {
            let failure = match MessageService::mark_read(&db, message_id, reader).await {
                Ok(Some(message)) => {
                    registry
                        .emit(
                            &fanout::rooms_for_participants(message.sender_id, message.recipient_id),
                            &ServerEvent::MessageRead(MessageReadPayload {
                                message_id: message.id,
                                is_read: true,
                            }),
                        )
                        .await;
                    return;
                }
                Ok(None) => ServerEvent::error("Message not found"),
                Err(e) => {
                    tracing::error!(error = %e, message_id = %message_id, "failed to mark message read");
                    ServerEvent::error("Failed to mark message read")
                }
            };
            if let Some(payload) = encode(&failure) {
                addr.do_send(BroadcastMessage(payload));
            }
        });
    }
}

fn encode(event: &ServerEvent) -> Option<String> {
    serde_json::to_string(event)
        .map_err(|e| tracing::error!(error = %e, event = event.name(), "failed to encode event"))
        .ok()
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(
            connection = %self.conn,
            user_id = ?self.user_id,
            "websocket session started"
        );

        self.hb(ctx);

        if let Some(outbox) = self.outbox.take() {
            ctx.add_message_stream(futures::stream::unfold(outbox, |mut rx| async move {
                rx.recv().await.map(|payload| (BroadcastMessage(payload), rx))
            }));
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(connection = %self.conn, "websocket session stopped");

        let registry = self.rooms.clone();
        let conn = self.conn;
        actix::spawn(async move {
            registry.leave_all(conn).await;
        });
    }
}

impl Handler<BroadcastMessage> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: BroadcastMessage, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.hb = Instant::now();
                match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => self.handle_event(event, ctx),
                    Err(e) => {
                        tracing::warn!(connection = %self.conn, error = %e, "failed to parse websocket event");
                        Self::send(ctx, &ServerEvent::error("Invalid event"));
                    }
                }
            }
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!("binary websocket messages not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!(connection = %self.conn, ?reason, "websocket close received");
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                tracing::warn!(connection = %self.conn, error = %e, "websocket protocol error");
                ctx.stop();
            }
            _ => {}
        }
    }
}

/// Token from `?token=` or the `Authorization` header, query first.
fn socket_token<'a>(params: &'a WsParams, req: &'a HttpRequest) -> Option<&'a str> {
    params
        .token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| bearer_token(req.headers()))
}

#[get("/ws")]
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
    query: web::Query<WsParams>,
) -> Result<HttpResponse, Error> {
    let params = query.into_inner();

    let user_id = match socket_token(&params, &req) {
        None => None,
        Some(token) => match crypto_core::jwt::get_user_id_from_token(token) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(error = %e, "websocket connection rejected: invalid token");
                return Err(json_error(
                    StatusCode::UNAUTHORIZED,
                    "Not authorized, token invalid",
                ));
            }
        },
    };

    let (conn, outbox) = state.rooms.register().await;
    state.rooms.join(&Room::Global, conn).await;
    if let Some(id) = user_id {
        state.rooms.join(&Room::User(id), conn).await;
    }

    let session = WsSession::new(conn, user_id, outbox, state.get_ref().clone());
    let response = ws::start(session, &req, stream);
    if response.is_err() {
        state.rooms.leave_all(conn).await;
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_socket_token_prefers_query() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer from-header"))
            .to_http_request();

        let params = WsParams {
            token: Some("from-query".into()),
        };
        assert_eq!(socket_token(&params, &req), Some("from-query"));

        let params = WsParams {
            token: Some("  ".into()),
        };
        assert_eq!(socket_token(&params, &req), Some("from-header"));

        let bare = TestRequest::default().to_http_request();
        assert_eq!(socket_token(&WsParams { token: None }, &bare), None);
    }

    #[test]
    fn test_encode_uses_event_envelope() {
        let payload = encode(&ServerEvent::Pong).unwrap();
        assert_eq!(payload, r#"{"event":"pong"}"#);
    }
}
