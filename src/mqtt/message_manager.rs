use chrono::NaiveDateTime;
use std::fmt;

const PREVIEW_CHARS: usize = 32;

/// A message delivered by the broker on one of our subscriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: String,
    pub received_at: NaiveDateTime,
}

impl fmt::Display for InboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let preview: String = self.payload.chars().take(PREVIEW_CHARS).collect();
        write!(f, "{} - {}: {}", self.received_at, self.topic, preview)
    }
}

impl InboundMessage {
    /// Builds a message from raw bytes; invalid UTF-8 is replaced, not rejected.
    pub fn from_topic(topic: impl Into<String>, payload: &[u8]) -> Self {
        InboundMessage {
            topic: topic.into(),
            payload: String::from_utf8_lossy(payload).into_owned(),
            received_at: chrono::Local::now().naive_local(),
        }
    }

    pub fn reading(&self) -> Option<Reading<'_>> {
        Reading::parse(&self.payload)
    }
}

/// Device reading in the wire format `device_id|sensor_name|value[|...]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading<'a> {
    pub device_id: &'a str,
    pub sensor_name: &'a str,
    pub sensor_value: &'a str,
}

impl<'a> Reading<'a> {
    /// Splits on `|`. Fewer than three fields is not a reading; anything
    /// after the third field is ignored.
    pub fn parse(payload: &'a str) -> Option<Self> {
        let mut fields = payload.split('|');
        Some(Reading {
            device_id: fields.next()?,
            sensor_name: fields.next()?,
            sensor_value: fields.next()?,
        })
    }
}
