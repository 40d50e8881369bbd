//! Wire types for the line-delimited JSON protocol.
//!
//! Every line on the input and output streams is one [`Envelope`]: a source,
//! a destination, and a JSON-object body. The runtime only ever interprets
//! the generic [`Body`] fields of that object (`type`, `msg_id`,
//! `in_reply_to`, and the `init` identity fields); everything else belongs
//! to whichever handler is registered for the body's `type`.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// A routed message: exactly one line on the wire.
///
/// `src` and `dest` are omitted from the serialized form when empty, so a
/// locally triggered envelope (which has no destination) round-trips
/// cleanly. Envelopes are constructed fresh for every read and every send
/// and never mutated afterwards.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Envelope {
    /// Sender node id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub src: String,
    /// Recipient node id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dest: String,
    /// The message body, a JSON object keyed by its `type` field.
    #[serde(default)]
    pub body: Value,
}

impl Envelope {
    /// The body's `type` field, if present.
    pub fn kind(&self) -> Option<&str> {
        self.body.get("type").and_then(Value::as_str)
    }

    /// Deserializes the body into the shape a handler expects.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_value(self.body.clone()).map_err(|source| Error::Decode {
            kind: self.kind().unwrap_or_default().to_owned(),
            source,
        })
    }
}

/// The generic fields the runtime understands in every body.
///
/// Workload bodies `#[serde(flatten)]` this into their own shapes. Unknown
/// fields are ignored on deserialization, so any inbound body can be
/// decoded into a bare `Body` to read its `type` and `msg_id`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Body {
    /// Message type; selects the handler.
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    /// Request identifier, unique per sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<u64>,
    /// Echoes the `msg_id` of the request this body acknowledges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<u64>,
    /// The node's own id; present only on `init`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    /// Every node id in the cluster; present only on `init`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_ids: Option<Vec<String>>,
}

impl Body {
    /// A bare body of the given type.
    pub fn new(kind: impl Into<String>) -> Self {
        Body {
            kind: kind.into(),
            ..Body::default()
        }
    }

    /// The acknowledgement body for this request: the type gains an `_ok`
    /// suffix and `in_reply_to` echoes the request's `msg_id`.
    pub fn ack(&self) -> Body {
        Body {
            kind: format!("{}_ok", self.kind),
            in_reply_to: self.msg_id,
            ..Body::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_src_and_dest_are_omitted() {
        let msg = Envelope {
            src: String::new(),
            dest: String::new(),
            body: json!({ "type": "gossip" }),
        };
        let line = serde_json::to_string(&msg).unwrap();
        assert_eq!(line, r#"{"body":{"type":"gossip"}}"#);
    }

    #[test]
    fn generic_fields_decode_from_any_body() {
        let msg: Envelope = serde_json::from_str(
            r#"{"src":"c1","dest":"n1","body":{"type":"broadcast","msg_id":7,"message":42}}"#,
        )
        .unwrap();
        assert_eq!(msg.kind(), Some("broadcast"));
        let body: Body = msg.decode().unwrap();
        assert_eq!(body.kind, "broadcast");
        assert_eq!(body.msg_id, Some(7));
        assert_eq!(body.in_reply_to, None);
    }

    #[test]
    fn ack_appends_ok_and_echoes_msg_id() {
        let request = Body {
            kind: "topology".to_owned(),
            msg_id: Some(3),
            ..Body::default()
        };
        let ack = request.ack();
        assert_eq!(ack.kind, "topology_ok");
        assert_eq!(ack.in_reply_to, Some(3));
        assert_eq!(ack.msg_id, None);
    }

    #[test]
    fn decode_failure_names_the_message_type() {
        #[derive(Debug, Deserialize)]
        struct Strict {
            #[allow(dead_code)]
            message: i64,
        }

        let msg = Envelope {
            src: "c1".to_owned(),
            dest: "n1".to_owned(),
            body: json!({ "type": "broadcast", "message": "not an int" }),
        };
        let err = msg.decode::<Strict>().unwrap_err();
        assert!(matches!(err, Error::Decode { ref kind, .. } if kind == "broadcast"));
    }
}
