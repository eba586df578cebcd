use serde_json::Value as JsonValue;

/// The four field types carried by an AMP frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FieldType {
    Blob = 1,
    Str = 2,
    BigInt = 3,
    Json = 4,
}

impl FieldType {
    pub(crate) fn from_tag(tag: u8) -> Option<FieldType> {
        match tag {
            1 => Some(FieldType::Blob),
            2 => Some(FieldType::Str),
            3 => Some(FieldType::BigInt),
            4 => Some(FieldType::Json),
            _ => None,
        }
    }
}

/// One typed value within a message. A message is an ordered sequence of fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Blob(Vec<u8>),
    Str(String),
    BigInt(i64),
    Json(JsonValue),
}

impl Field {
    pub fn field_type(&self) -> FieldType {
        match self {
            Field::Blob(_) => FieldType::Blob,
            Field::Str(_) => FieldType::Str,
            Field::BigInt(_) => FieldType::BigInt,
            Field::Json(_) => FieldType::Json,
        }
    }

    /// Borrows the field as a string, if it is one. Used to inspect the
    /// topic (SUB/PULL) and request id (REQ/REP) fields without consuming
    /// the message.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Field::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Field::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Vec<u8>> for Field {
    fn from(bytes: Vec<u8>) -> Field {
        Field::Blob(bytes)
    }
}

impl From<String> for Field {
    fn from(s: String) -> Field {
        Field::Str(s)
    }
}

impl From<&str> for Field {
    fn from(s: &str) -> Field {
        Field::Str(s.to_owned())
    }
}

impl From<i64> for Field {
    fn from(n: i64) -> Field {
        Field::BigInt(n)
    }
}

impl From<JsonValue> for Field {
    fn from(v: JsonValue) -> Field {
        Field::Json(v)
    }
}
