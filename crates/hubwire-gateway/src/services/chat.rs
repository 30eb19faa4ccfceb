use std::sync::Arc;

use serde_json::{json, Value};

use hubwire_core::error::{HubError, Result};

use crate::bind::{Args, BindingSource};
use crate::dispatch::EventSource;
use crate::registry::Service;
use crate::server::HubServer;

/// Room chat: `chat.send` RPC feeding the `chat.message` event.
///
/// Subscribers pick a room with `{"room": ..}` credentials; a message only
/// reaches subscribers of the same room.
#[derive(Debug, Default)]
pub struct ChatService {
    message: EventSource,
}

impl ChatService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message_source(&self) -> &EventSource {
        &self.message
    }

    pub fn register(this: Arc<Self>, server: &HubServer) -> Result<()> {
        let svc = Service::new("chat", Arc::clone(&this));

        server.register_method(
            svc.method("send", |chat: Arc<ChatService>, args: Args| chat.send(args))
                .require_auth()
                .arg(BindingSource::context("user"))
                .arg(BindingSource::payload_field("room"))
                .arg(BindingSource::payload_field("msg")),
        )?;

        server.register_event(
            svc.event("message", &this.message)
                .require_auth()
                .validate(|_, _, creds| async move { Ok(room_of(creds.as_ref()).is_some()) })
                .select(|_, _, sub, publ| async move {
                    let want = room_of(sub.as_ref());
                    Ok(want.is_some() && want == room_of(publ.as_ref()))
                }),
        )?;
        Ok(())
    }

    async fn send(self: Arc<Self>, args: Args) -> Result<Value> {
        let user: Value = args.required(0)?;
        let room: String = args.required(1)?;
        let msg: String = args.required(2)?;
        if room.is_empty() {
            return Err(HubError::fault("room must not be empty"));
        }

        let from = user.get("sub").cloned().unwrap_or(Value::Null);
        let delivered = self
            .message
            .fire_with(
                json!({ "room": room }),
                json!({ "room": room, "from": from, "msg": msg }),
            )
            .await;

        Ok(json!({ "delivered": delivered }))
    }
}

fn room_of(credentials: Option<&Value>) -> Option<&str> {
    credentials?.get("room")?.as_str()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn room_lookup() {
        assert_eq!(room_of(Some(&json!({"room": "a"}))), Some("a"));
        assert_eq!(room_of(Some(&json!({"room": 1}))), None);
        assert_eq!(room_of(None), None);
    }
}
