//! Inbound frame classification.
//!
//! First match wins:
//! 1. one byte equal to [`PONG`] → keep-alive
//! 2. four bytes → reliable-protocol control frame (never JSON)
//! 3. anything else → UTF-8 JSON, one request or a batch; unparsable input is discarded

use serde_json::Value;

use super::{message::TrebuchetRequest, reliable::ReliableControl};

/// Keep-alive reply sent by clients
pub const PONG: u8 = 65;
/// Keep-alive probe sent by the server
pub const PING: u8 = 57;

#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    Pong,
    ReliableControl(ReliableControl),
    Requests(Vec<TrebuchetRequest>),
    Discarded,
}

pub fn classify(bytes: &[u8]) -> InboundFrame {
    if bytes.len() == 1 && bytes[0] == PONG {
        return InboundFrame::Pong;
    }
    if let Some(control) = ReliableControl::decode(bytes) {
        return InboundFrame::ReliableControl(control);
    }

    let parsed: Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("Ignoring non-JSON frame ({} bytes): {}", bytes.len(), e);
            return InboundFrame::Discarded;
        }
    };

    let candidates = match parsed {
        Value::Array(items) => items,
        value @ Value::Object(_) => vec![value],
        _ => return InboundFrame::Discarded,
    };

    let requests: Vec<TrebuchetRequest> = candidates
        .into_iter()
        .filter_map(|candidate| match serde_json::from_value(candidate) {
            Ok(request) => Some(request),
            Err(e) => {
                tracing::debug!("Skipping unrecognized request: {}", e);
                None
            }
        })
        .collect();

    if requests.is_empty() {
        InboundFrame::Discarded
    } else {
        InboundFrame::Requests(requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_pong_byte() {
        // テスト項目: 値 65 の 1 バイトは PONG
        // given (前提条件):
        let bytes = [PONG];

        // when (操作):
        let frame = classify(&bytes);

        // then (期待する結果):
        assert_eq!(frame, InboundFrame::Pong);
    }

    #[test]
    fn test_single_other_byte_is_not_pong() {
        // テスト項目: 65 以外の 1 バイトは JSON として扱われ、リクエストにならない
        // given (前提条件):
        let bytes = b"7";

        // when (操作):
        let frame = classify(bytes);

        // then (期待する結果):
        assert_eq!(frame, InboundFrame::Discarded);
    }

    #[test]
    fn test_four_bytes_never_parsed_as_json() {
        // テスト項目: 4 バイトのフレームは JSON として妥当でも制御フレームになる
        // given (前提条件):
        let bytes = b"[{}]";

        // when (操作):
        let frame = classify(bytes);

        // then (期待する結果):
        assert!(matches!(frame, InboundFrame::ReliableControl(_)));
    }

    #[test]
    fn test_malformed_json_is_discarded() {
        // テスト項目: 不正な JSON は黙って破棄される
        // given (前提条件):
        let bytes = br#"{"type":"start""#;

        // when (操作):
        let frame = classify(bytes);

        // then (期待する結果):
        assert_eq!(frame, InboundFrame::Discarded);
    }

    #[test]
    fn test_invalid_utf8_is_discarded() {
        // テスト項目: UTF-8 でないバイト列は破棄される
        // given (前提条件):
        let bytes = [0xff, 0xfe, 0xfd, 0xfc, 0xfb];

        // when (操作):
        let frame = classify(&bytes);

        // then (期待する結果):
        assert_eq!(frame, InboundFrame::Discarded);
    }

    #[test]
    fn test_batch_skips_unknown_elements() {
        // テスト項目: バッチ内の未知の要素だけがスキップされる
        // given (前提条件):
        let bytes = br#"[{"type":"start","id":"1","payload":{}},{"type":"bogus"},{"type":"stop","id":"2"}]"#;

        // when (操作):
        let frame = classify(bytes);

        // then (期待する結果):
        match frame {
            InboundFrame::Requests(requests) => {
                assert_eq!(requests.len(), 2);
                assert!(matches!(requests[0], TrebuchetRequest::Start { .. }));
                assert!(matches!(requests[1], TrebuchetRequest::Stop { .. }));
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}
