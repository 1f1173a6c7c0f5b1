//! Loopia wire record and its conversion to [`Record`]

use std::collections::BTreeMap;
use std::time::Duration;

use crate::providers::common::records_equal;
use crate::types::Record;
use crate::xmlrpc::{FromValue, Value, XmlRpcError, take_member};

/// Record as stored by Loopia (`getZoneRecords` / `addZoneRecord` struct).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoopiaRecord {
    /// `record_id`, 0 for records that do not exist yet
    pub id: i64,
    /// `ttl` in seconds
    pub ttl: u32,
    /// `type`
    pub record_type: String,
    /// `rdata`
    pub rdata: String,
    /// `priority`
    pub priority: u32,
}

impl LoopiaRecord {
    /// Wire form of `record`. TTL is truncated to whole seconds.
    pub fn from_record(record: &Record, id: i64) -> Self {
        Self {
            id,
            ttl: u32::try_from(record.ttl.as_secs()).unwrap_or(u32::MAX),
            record_type: record.record_type.clone(),
            rdata: record.data.clone(),
            priority: 0,
        }
    }

    /// Neutral form under the given label. One layer of surrounding quotes is
    /// removed from `rdata`.
    pub fn to_record(&self, name: &str) -> Record {
        Record {
            name: name.to_string(),
            record_type: self.record_type.clone(),
            data: unquote(&self.rdata).to_string(),
            ttl: Duration::from_secs(u64::from(self.ttl)),
            id: Some(self.id),
        }
    }

    /// Whether this remote record is `record` for reconciliation purposes.
    pub fn matches(&self, record: &Record) -> bool {
        records_equal(record, &self.to_record(&record.name))
    }

    /// Struct value for `addZoneRecord` / `updateZoneRecord`.
    pub fn to_value(&self) -> Value {
        let mut members = BTreeMap::new();
        members.insert("type".to_string(), Value::from(self.record_type.clone()));
        members.insert("ttl".to_string(), Value::from(self.ttl));
        members.insert("priority".to_string(), Value::from(self.priority));
        members.insert("rdata".to_string(), Value::from(self.rdata.clone()));
        members.insert("record_id".to_string(), Value::from(self.id));
        Value::Struct(members)
    }
}

impl FromValue for LoopiaRecord {
    fn from_value(value: Value) -> Result<Self, XmlRpcError> {
        let mut members = match value {
            Value::Struct(members) => members,
            other => {
                return Err(XmlRpcError::TypeMismatch {
                    expected: "struct",
                    found: other.type_name(),
                });
            }
        };

        let non_negative = |field: &'static str, n: i64| {
            u32::try_from(n).map_err(|_| XmlRpcError::InvalidScalar {
                kind: field,
                value: n.to_string(),
            })
        };

        Ok(Self {
            id: take_member(&mut members, "record_id")?,
            ttl: non_negative("ttl", take_member(&mut members, "ttl")?)?,
            record_type: take_member(&mut members, "type")?,
            rdata: take_member(&mut members, "rdata")?,
            priority: match members.remove("priority") {
                Some(v) => non_negative("priority", i64::from_value(v)?)?,
                None => 0,
            },
        })
    }
}

fn unquote(data: &str) -> &str {
    data.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(id: i64, record_type: &str, rdata: &str) -> LoopiaRecord {
        LoopiaRecord {
            id,
            ttl: 300,
            record_type: record_type.to_string(),
            rdata: rdata.to_string(),
            priority: 0,
        }
    }

    #[test]
    fn from_record_floors_ttl() {
        let record = Record::new("www", "A", "192.0.2.1", Duration::from_millis(3_599_900));
        let remote = LoopiaRecord::from_record(&record, 0);
        assert_eq!(remote.ttl, 3599);
        assert_eq!(remote.id, 0);
        assert_eq!(remote.rdata, "192.0.2.1");
    }

    #[test]
    fn to_record_strips_one_layer_of_quotes() {
        let record = wire(7, "TXT", "\"\"nested\"\"").to_record("_acme");
        assert_eq!(record.data, "\"nested\"");
        assert_eq!(record.id, Some(7));
        assert_eq!(record.ttl, Duration::from_secs(300));
        assert_eq!(record.name, "_acme");

        assert_eq!(wire(1, "TXT", "\"").to_record("x").data, "\"");
        assert_eq!(wire(1, "TXT", "plain").to_record("x").data, "plain");
    }

    #[test]
    fn quoted_remote_txt_matches_unquoted_input() {
        let input = Record::new("_acme", "TXT", "token", Duration::from_secs(60));
        assert!(wire(3, "TXT", "\"token\"").matches(&input));
        assert!(!wire(3, "A", "token").matches(&input));
    }

    #[test]
    fn value_round_trip() {
        let remote = LoopiaRecord {
            id: 12,
            ttl: 3600,
            record_type: "MX".to_string(),
            rdata: "10 mail.example.org".to_string(),
            priority: 10,
        };
        assert_eq!(LoopiaRecord::from_value(remote.to_value()).unwrap(), remote);
    }

    #[test]
    fn from_value_rejects_missing_member_and_negative_ttl() {
        let Value::Struct(mut members) = wire(1, "A", "192.0.2.1").to_value() else {
            panic!("expected struct");
        };
        members.insert("ttl".to_string(), Value::Int(-1));
        assert!(matches!(
            LoopiaRecord::from_value(Value::Struct(members.clone())),
            Err(XmlRpcError::InvalidScalar { kind: "ttl", .. })
        ));

        members.remove("rdata");
        members.insert("ttl".to_string(), Value::Int(60));
        assert_eq!(
            LoopiaRecord::from_value(Value::Struct(members)),
            Err(XmlRpcError::MissingMember("rdata".to_string()))
        );
    }
}
