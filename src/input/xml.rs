//! Plain XML record source
//!
//! Reads `<edges>` and `<nodes>` documents into record events. Element
//! nesting is preserved as open/close pairs; self-closing elements produce
//! both events.

use std::fs;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{Record, RecordEvent, Tag};
use crate::core::error::Result;

pub struct XmlRecordReader;

impl XmlRecordReader {
    /// Parse a whole document into its record events
    pub fn read_str(content: &str) -> Result<Vec<RecordEvent>> {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);

        let mut events = Vec::new();
        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    events.push(RecordEvent::Open(record_from(&start)?));
                }
                Event::Empty(start) => {
                    let record = record_from(&start)?;
                    let tag = record.tag().clone();
                    events.push(RecordEvent::Open(record));
                    events.push(RecordEvent::Close(tag));
                }
                Event::End(end) => {
                    let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                    events.push(RecordEvent::Close(Tag::from_name(&name)));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        log::debug!("Read {} record events", events.len());
        Ok(events)
    }

    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Vec<RecordEvent>> {
        let content = fs::read_to_string(path)?;
        Self::read_str(&content)
    }
}

fn record_from(start: &BytesStart<'_>) -> Result<Record> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut record = Record::new(Tag::from_name(&name));
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?;
        record.set(&key, &value);
    }
    Ok(record)
}
