use crate::dataset::DatasetKind;
use crate::error::{ProxyError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field values of a single record.
pub type Fields = Map<String, Value>;

/// What the `data` key holds: one record, or an ordered list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Record(Fields),
    Records(Vec<Fields>),
}

impl Payload {
    /// The shape applied when there is nothing on disk yet.
    pub fn empty(kind: DatasetKind) -> Self {
        match kind {
            DatasetKind::Model => Payload::Record(Fields::new()),
            DatasetKind::Store => Payload::Records(Vec::new()),
        }
    }

    pub fn kind(&self) -> DatasetKind {
        match self {
            Payload::Record(_) => DatasetKind::Model,
            Payload::Records(_) => DatasetKind::Store,
        }
    }

    pub fn into_record(self) -> Result<Fields> {
        match self {
            Payload::Record(fields) => Ok(fields),
            Payload::Records(_) => Err(ProxyError::Format(
                "expected a single record but found a record list".to_string(),
            )),
        }
    }

    pub fn into_records(self) -> Result<Vec<Fields>> {
        match self {
            Payload::Records(records) => Ok(records),
            Payload::Record(_) => Err(ProxyError::Format(
                "expected a record list but found a single record".to_string(),
            )),
        }
    }

    /// Number of records represented (a single record counts as one).
    pub fn len(&self) -> usize {
        match self {
            Payload::Record(_) => 1,
            Payload::Records(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Record(fields) => fields.is_empty(),
            Payload::Records(records) => records.is_empty(),
        }
    }
}

/// The on-disk document: `{"data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub data: Payload,
}

impl Envelope {
    pub fn new(data: Payload) -> Self {
        Self { data }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| ProxyError::Format(format!("invalid data file contents: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_record_shape() {
        let env = Envelope::from_json(r#"{"data":{"a":1,"b":[true,null]}}"#).unwrap();
        let fields = env.data.into_record().unwrap();
        assert_eq!(fields["a"], json!(1));
        assert_eq!(fields["b"], json!([true, null]));
    }

    #[test]
    fn test_record_list_keeps_order() {
        let env = Envelope::from_json(r#"{"data":[{"n":"A"},{"n":"B"},{"n":"C"}]}"#).unwrap();
        let names: Vec<_> = env
            .data
            .into_records()
            .unwrap()
            .into_iter()
            .map(|r| r["n"].clone())
            .collect();
        assert_eq!(names, vec![json!("A"), json!("B"), json!("C")]);
    }

    #[test]
    fn test_serializes_with_data_key() {
        let mut fields = Fields::new();
        fields.insert("lastname".into(), json!("Doctor"));
        let text = Envelope::new(Payload::Record(fields)).to_json().unwrap();
        assert_eq!(text, r#"{"data":{"lastname":"Doctor"}}"#);
    }

    #[test]
    fn test_shape_mismatch_is_format_error() {
        let err = Payload::Records(vec![]).into_record().unwrap_err();
        assert!(err.is_format());
        let err = Payload::Record(Fields::new()).into_records().unwrap_err();
        assert!(err.is_format());
    }

    #[test]
    fn test_rejects_missing_data_key_and_scalars() {
        assert!(Envelope::from_json(r#"{"records":[]}"#).is_err());
        assert!(Envelope::from_json(r#"{"data":42}"#).is_err());
        assert!(Envelope::from_json(r#"{"data":{"#).is_err());
    }

    #[test]
    fn test_empty_shapes() {
        assert!(Payload::empty(DatasetKind::Model).is_empty());
        assert_eq!(Payload::empty(DatasetKind::Store), Payload::Records(vec![]));
    }
}
