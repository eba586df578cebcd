use super::field::Field;

/// An ordered sequence of fields: the unit of send/receive for every role.
///
/// `Message` carries no pattern-specific meaning by itself — it is the
/// dispatcher (`crate::dispatcher`) that knows a SUB message's first field is
/// a topic, or that a REQ/REP message's last field is a correlation id, and
/// strips it before the message reaches a user callback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    fields: Vec<Field>,
}

impl Message {
    pub fn new() -> Message {
        Message { fields: Vec::new() }
    }

    pub fn with_fields(fields: Vec<Field>) -> Message {
        Message { fields }
    }

    pub fn push(mut self, field: impl Into<Field>) -> Message {
        self.fields.push(field.into());
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<Field> {
        self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn first(&self) -> Option<&Field> {
        self.fields.first()
    }

    pub fn last(&self) -> Option<&Field> {
        self.fields.last()
    }

    /// If the first field is a string, removes and returns it along with the
    /// remaining message. Used by the dispatcher to pull the topic out of an
    /// inbound SUB/PULL message before subscription matching.
    pub fn split_first_str(mut self) -> Option<(String, Message)> {
        if self.fields.is_empty() {
            return None;
        }
        match self.fields[0] {
            Field::Str(_) => {
                let head = self.fields.remove(0);
                Some((head.into_string().expect("checked above"), self))
            }
            _ => None,
        }
    }

    /// If the last field is a string, removes and returns it along with the
    /// remaining message. Used to strip the REQ/REP correlation id.
    pub fn split_last_str(mut self) -> Option<(Message, String)> {
        match self.fields.last() {
            Some(Field::Str(_)) => {
                let tail = self.fields.pop().unwrap();
                Some((self, tail.into_string().expect("checked above")))
            }
            _ => None,
        }
    }
}

impl IntoIterator for Message {
    type Item = Field;
    type IntoIter = std::vec::IntoIter<Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl FromIterator<Field> for Message {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Message { fields: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_first_str_strips_topic() {
        let msg = Message::new().push("news").push(42i64);
        let (topic, rest) = msg.split_first_str().unwrap();

        assert_eq!(topic, "news");
        assert_eq!(rest.fields(), &[Field::BigInt(42)]);
    }

    #[test]
    fn split_first_str_none_when_not_string() {
        let msg = Message::new().push(42i64);
        assert!(msg.split_first_str().is_none());
    }

    #[test]
    fn split_last_str_strips_request_id() {
        let msg = Message::new().push("hello").push("1:7");
        let (rest, id) = msg.split_last_str().unwrap();

        assert_eq!(id, "1:7");
        assert_eq!(rest.fields(), &[Field::Str("hello".into())]);
    }
}
