//! Value objects.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ValueObjectError;

/// 空文字列を許さない文字列 ID を定義する
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(value: String) -> Result<Self, ValueObjectError> {
                if value.trim().is_empty() {
                    return Err(ValueObjectError::Empty($label));
                }
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValueObjectError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// ソケット接続ごとに一意な ID
    ConnectionId,
    "ConnectionId"
);
string_id!(
    /// クライアントが付与するオペレーション ID（レスポンスの相関に使う）
    OperationId,
    "OperationId"
);
string_id!(UserId, "UserId");
string_id!(TeamId, "TeamId");
string_id!(MeetingId, "MeetingId");
string_id!(JobId, "JobId");
string_id!(NotificationId, "NotificationId");

impl ConnectionId {
    /// ランダムな接続 ID を生成
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl NotificationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Unix epoch ミリ秒（UTC）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_id_rejects_blank_value() {
        // テスト項目: 空白のみの ID は生成できない
        // given (前提条件):
        let value = "   ".to_string();

        // when (操作):
        let result = MeetingId::new(value);

        // then (期待する結果):
        assert_eq!(result, Err(ValueObjectError::Empty("MeetingId")));
    }

    #[test]
    fn test_string_id_deserialize_validates() {
        // テスト項目: デシリアライズ時にも空文字列が拒否される
        // given (前提条件):
        let json = r#""""#;

        // when (操作):
        let result = serde_json::from_str::<JobId>(json);

        // then (期待する結果):
        assert!(result.is_err());
        assert_eq!(serde_json::from_str::<JobId>(r#""j1""#).unwrap().as_str(), "j1");
    }

    #[test]
    fn test_connection_id_generate_is_unique() {
        // テスト項目: 生成される接続 ID は毎回異なる
        // given (前提条件):

        // when (操作):
        let a = ConnectionId::generate();
        let b = ConnectionId::generate();

        // then (期待する結果):
        assert_ne!(a, b);
    }
}
