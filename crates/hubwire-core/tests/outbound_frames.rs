//! Outbound frame shape tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use serde_json::{json, Value};

use hubwire_core::protocol::{
    encode_outbound, ErrorNotice, HubAction, OutboundFrame, PublishMessage, RpcRequest,
    RpcResponse, SubscriptionRequest, SubscriptionResponse,
};
use hubwire_core::ErrorCode;

fn encode(frame: OutboundFrame) -> Value {
    serde_json::from_str(&encode_outbound(&frame).unwrap()).unwrap()
}

fn rpc_req() -> RpcRequest {
    RpcRequest {
        namespace: "chat".into(),
        method: "send".into(),
        data: None,
        credentials: None,
    }
}

#[test]
fn rpc_success_uses_camel_case_and_omits_error() {
    let v = encode(OutboundFrame::Rpc(RpcResponse::success(&rpc_req(), json!({"ok": true}))));
    assert_eq!(
        v,
        json!({"channel": "rpc", "namespace": "chat", "method": "send", "isSuccess": true, "data": {"ok": true}})
    );
}

#[test]
fn rpc_failure_carries_code_and_message() {
    let v = encode(OutboundFrame::Rpc(RpcResponse::failure(
        &rpc_req(),
        ErrorCode::NotFound,
        "service 'chat' not contains method 'send'",
    )));
    assert_eq!(v["isSuccess"], false);
    assert_eq!(v["error"]["code"], "NOT_FOUND");
    assert!(v.get("data").is_none());
}

#[test]
fn hub_response_echoes_method() {
    let req = SubscriptionRequest {
        namespace: "chat".into(),
        name: "message".into(),
        method: "unsubscribe".into(),
        credentials: None,
    };
    assert_eq!(req.action(), Some(HubAction::Unsubscribe));
    let v = encode(OutboundFrame::Hub(SubscriptionResponse::success(&req)));
    assert_eq!(v["channel"], "hub");
    assert_eq!(v["method"], "unsubscribe");
    assert_eq!(v["name"], "message");
    assert_eq!(v["isSuccess"], true);
}

#[test]
fn publish_and_error_frames() {
    let v = encode(OutboundFrame::Publish(PublishMessage {
        namespace: "chat".into(),
        name: "message".into(),
        data: json!({"msg": "hi"}),
    }));
    assert_eq!(v, json!({"channel": "publish", "namespace": "chat", "name": "message", "data": {"msg": "hi"}}));

    let v = encode(OutboundFrame::Error(ErrorNotice::protocol("invalid frame")));
    assert_eq!(v["channel"], "error");
    assert_eq!(v["error"]["code"], "PROTOCOL_ERROR");
}
