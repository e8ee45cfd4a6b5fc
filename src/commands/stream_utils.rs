use bytes::Bytes;

use crate::resp::RespValue;
use crate::store::StreamEntry;

/// Converts stream entries to their reply shape: each entry is a 2-element
/// array of the identifier and a flat field-value array, fields in the order
/// they were appended.
pub(crate) fn entries_reply(entries: &[StreamEntry]) -> RespValue {
    let items = entries
        .iter()
        .map(|entry| {
            let mut fields = Vec::with_capacity(entry.fields.len() * 2);
            for (name, value) in &entry.fields {
                fields.push(RespValue::BulkString(name.clone()));
                fields.push(RespValue::BulkString(value.clone()));
            }

            RespValue::Array(vec![
                RespValue::BulkString(Bytes::from(entry.id.to_string())),
                RespValue::Array(fields),
            ])
        })
        .collect();

    RespValue::Array(items)
}
