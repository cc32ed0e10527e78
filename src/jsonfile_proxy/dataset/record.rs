use super::{Change, Dataset, DatasetKind, Mutation, MutationHandler, MutationKind, Observable, Observers};
use crate::envelope::{Envelope, Fields, Payload};
use crate::error::{ProxyError, Result};
use crate::proxy::PersistenceAdapter;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

pub type SharedAdapter = Arc<dyn PersistenceAdapter + Send + Sync>;

/// A single record: plain fields plus named relationships to nested records.
///
/// Relationships serialize inline, so `data()` of a record with a `pet`
/// relationship looks like `{"name": "...", "pet": {"breed": "..."}}`.
pub struct Record {
    id: Uuid,
    fields: Fields,
    relationships: BTreeMap<String, Record>,
    observers: Observers,
    proxy: Option<SharedAdapter>,
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

impl Record {
    pub fn new() -> Self {
        Self::from_fields(Fields::new())
    }

    pub fn from_fields(fields: Fields) -> Self {
        Self {
            id: Uuid::new_v4(),
            fields,
            relationships: BTreeMap::new(),
            observers: Observers::default(),
            proxy: None,
        }
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self::from_fields(fields)),
            other => Err(ProxyError::InvalidRecord(format!(
                "expected an object, got {other}"
            ))),
        }
    }

    /// Inject the adapter used by [`Record::save`], [`Record::fetch`] and
    /// [`Record::enable_live_sync`].
    pub fn with_proxy<P>(mut self, proxy: P) -> Self
    where
        P: PersistenceAdapter + Send + Sync + 'static,
    {
        self.proxy = Some(Arc::new(proxy));
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Fields and relationships merged into one object.
    pub fn data(&self) -> Fields {
        let mut out = self.fields.clone();
        for (name, related) in &self.relationships {
            out.insert(name.clone(), Value::Object(related.data()));
        }
        out
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn related(&self, name: &str) -> Option<&Record> {
        self.relationships.get(name)
    }

    pub fn related_mut(&mut self, name: &str) -> Option<&mut Record> {
        self.relationships.get_mut(name)
    }

    /// Set a field, emitting `field.create` for a new name and `field.update`
    /// for an existing one. Writing an identical value emits nothing.
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        match self.write(name, value)? {
            Some(mutation) => self.notify(mutation),
            None => Ok(()),
        }
    }

    /// Set a field without notifying anyone.
    pub fn set_silent(&mut self, name: &str, value: Value) -> Result<()> {
        self.write(name, value).map(|_| ())
    }

    fn write(&mut self, name: &str, value: Value) -> Result<Option<Mutation>> {
        if let Some(related) = self.relationships.get_mut(name) {
            let Value::Object(nested) = value else {
                return Err(ProxyError::InvalidRecord(format!(
                    "{name} is a relationship and needs an object value"
                )));
            };
            let old = Value::Object(related.data());
            related.load(nested);
            let new = Value::Object(related.data());
            if old == new {
                return Ok(None);
            }
            return Ok(Some(
                Mutation::new(MutationKind::FieldUpdate)
                    .with_name(name)
                    .with_change(Change {
                        field: name.to_string(),
                        old,
                        new,
                    }),
            ));
        }

        let kind = if self.fields.contains_key(name) {
            MutationKind::FieldUpdate
        } else {
            MutationKind::FieldCreate
        };
        let old = self
            .fields
            .insert(name.to_string(), value.clone())
            .unwrap_or(Value::Null);
        if kind == MutationKind::FieldUpdate && old == value {
            return Ok(None);
        }
        Ok(Some(Mutation::new(kind).with_name(name).with_change(Change {
            field: name.to_string(),
            old,
            new: value,
        })))
    }

    /// Add a field with a default value. Always emits `field.create`.
    pub fn add_field(&mut self, name: &str, default: Value) -> Result<()> {
        let old = self
            .fields
            .insert(name.to_string(), default.clone())
            .unwrap_or(Value::Null);
        self.notify(
            Mutation::new(MutationKind::FieldCreate)
                .with_name(name)
                .with_change(Change {
                    field: name.to_string(),
                    old,
                    new: default,
                }),
        )
    }

    pub fn remove_field(&mut self, name: &str) -> Result<Option<Value>> {
        let removed = self.fields.remove(name);
        if let Some(old) = &removed {
            self.notify(
                Mutation::new(MutationKind::FieldRemove)
                    .with_name(name)
                    .with_change(Change {
                        field: name.to_string(),
                        old: old.clone(),
                        new: Value::Null,
                    }),
            )?;
        }
        Ok(removed)
    }

    /// Attach a nested record. A plain field of the same name is replaced.
    pub fn add_relationship(&mut self, name: &str, related: Record) -> Result<()> {
        self.fields.remove(name);
        self.relationships.insert(name.to_string(), related);
        self.notify(Mutation::new(MutationKind::RelationshipCreate).with_name(name))
    }

    pub fn remove_relationship(&mut self, name: &str) -> Result<Option<Record>> {
        let removed = self.relationships.remove(name);
        if removed.is_some() {
            self.notify(Mutation::new(MutationKind::RelationshipRemove).with_name(name))?;
        }
        Ok(removed)
    }

    /// Set a field on a related record. The owner reports it as a
    /// `field.update` of `<relationship>.<field>`.
    pub fn set_related(&mut self, relationship: &str, field: &str, value: Value) -> Result<()> {
        let related = self.relationships.get_mut(relationship).ok_or_else(|| {
            ProxyError::InvalidRecord(format!("no relationship named {relationship}"))
        })?;
        let old = related
            .fields
            .insert(field.to_string(), value.clone())
            .unwrap_or(Value::Null);
        if old == value {
            return Ok(());
        }
        let path = format!("{relationship}.{field}");
        self.notify(
            Mutation::new(MutationKind::FieldUpdate)
                .with_name(path.clone())
                .with_change(Change {
                    field: path,
                    old,
                    new: value,
                }),
        )
    }

    /// Replace all field values. Keys naming a relationship load into it;
    /// relationships absent from `fields` are cleared.
    pub fn load(&mut self, mut fields: Fields) {
        for (name, related) in self.relationships.iter_mut() {
            match fields.remove(name) {
                Some(Value::Object(nested)) => related.load(nested),
                _ => related.clear_state(),
            }
        }
        self.fields = fields;
    }

    /// Drop every field value, recursively, without notifying anyone.
    pub fn clear_state(&mut self) {
        self.fields.clear();
        for related in self.relationships.values_mut() {
            related.clear_state();
        }
    }

    fn notify(&self, mutation: Mutation) -> Result<()> {
        self.observers.notify(&mutation, self)
    }

    fn adapter(&self) -> Result<SharedAdapter> {
        self.proxy.clone().ok_or_else(|| {
            ProxyError::Configuration("record has no persistence adapter".to_string())
        })
    }

    pub fn save(&self) -> Result<()> {
        self.adapter()?.save(self)
    }

    pub fn fetch(&mut self) -> Result<Envelope> {
        let adapter = self.adapter()?;
        adapter.fetch(self)
    }

    pub fn enable_live_sync(&mut self) -> Result<()> {
        let adapter = self.adapter()?;
        adapter.enable_live_sync(self)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("id", &self.id)
            .field("data", &self.data())
            .field("observers", &self.observers)
            .field("proxy", &self.proxy.is_some())
            .finish()
    }
}

impl Dataset for Record {
    fn kind(&self) -> DatasetKind {
        DatasetKind::Model
    }

    fn snapshot(&self) -> Payload {
        Payload::Record(self.data())
    }

    fn apply(&mut self, data: Payload) -> Result<()> {
        self.load(data.into_record()?);
        Ok(())
    }
}

impl Observable for Record {
    fn subscribe(&mut self, kind: MutationKind, handler: MutationHandler) {
        self.observers.subscribe(kind, handler);
    }

    fn subscribe_as(&mut self, owner: Uuid, kind: MutationKind, handler: MutationHandler) {
        self.observers.subscribe_as(owner, kind, handler);
    }

    fn is_subscribed(&self, owner: Uuid) -> bool {
        self.observers.is_subscribed(owner)
    }

    fn subscriptions(&self) -> Vec<MutationKind> {
        self.observers.kinds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn doctor() -> Record {
        let mut record = Record::from_value(json!({
            "firstname": "The",
            "lastname": "Doctor",
        }))
        .unwrap();
        let pet = Record::from_value(json!({"name": "K-9", "breed": "Robodog"})).unwrap();
        record.add_relationship("pet", pet).unwrap();
        record
    }

    fn recorder(record: &mut Record) -> Arc<Mutex<Vec<Mutation>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        for kind in [
            MutationKind::FieldCreate,
            MutationKind::FieldUpdate,
            MutationKind::FieldRemove,
            MutationKind::RelationshipCreate,
            MutationKind::RelationshipRemove,
        ] {
            let sink = Arc::clone(&seen);
            record.subscribe(
                kind,
                Arc::new(move |m: &Mutation, _: &dyn Dataset| {
                    sink.lock().unwrap().push(m.clone());
                    Ok(())
                }),
            );
        }
        seen
    }

    #[test]
    fn test_data_inlines_relationships() {
        let record = doctor();
        let data = record.data();
        assert_eq!(data["lastname"], json!("Doctor"));
        assert_eq!(data["pet"], json!({"name": "K-9", "breed": "Robodog"}));
    }

    #[test]
    fn test_set_emits_create_then_update() {
        let mut record = doctor();
        let seen = recorder(&mut record);

        record.set("middlename", json!("Alonsi")).unwrap();
        record.set("firstname", json!("Da")).unwrap();
        record.set("firstname", json!("Da")).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].kind, MutationKind::FieldCreate);
        assert_eq!(seen[1].kind, MutationKind::FieldUpdate);
        let change = seen[1].change.as_ref().unwrap();
        assert_eq!(change.old, json!("The"));
        assert_eq!(change.new, json!("Da"));
    }

    #[test]
    fn test_set_silent_does_not_notify() {
        let mut record = doctor();
        let seen = recorder(&mut record);

        record.set_silent("lastname", json!("Master")).unwrap();
        assert_eq!(record.get("lastname"), Some(&json!("Master")));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_remove_field_and_relationship() {
        let mut record = doctor();
        let seen = recorder(&mut record);

        assert_eq!(record.remove_field("lastname").unwrap(), Some(json!("Doctor")));
        assert_eq!(record.remove_field("lastname").unwrap(), None);
        assert!(record.remove_relationship("pet").unwrap().is_some());

        let kinds: Vec<_> = seen.lock().unwrap().iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![MutationKind::FieldRemove, MutationKind::RelationshipRemove]
        );
        assert!(!record.data().contains_key("pet"));
    }

    #[test]
    fn test_set_related_reports_on_owner() {
        let mut record = doctor();
        let seen = recorder(&mut record);

        record.set_related("pet", "name", json!("K-9 Mk II")).unwrap();
        assert_eq!(
            record.related("pet").unwrap().get("name"),
            Some(&json!("K-9 Mk II"))
        );
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].kind, MutationKind::FieldUpdate);
        assert_eq!(seen[0].name.as_deref(), Some("pet.name"));
    }

    #[test]
    fn test_set_related_unknown_relationship() {
        let mut record = doctor();
        assert!(record.set_related("vehicle", "type", json!("Tardis")).is_err());
    }

    #[test]
    fn test_load_fills_relationships_and_clears_missing() {
        let mut record = doctor();
        let mut fields = Fields::new();
        fields.insert("firstname".into(), json!("Missy"));
        record.load(fields);

        assert_eq!(record.get("firstname"), Some(&json!("Missy")));
        assert_eq!(record.get("lastname"), None);
        assert!(record.related("pet").unwrap().data().is_empty());

        let mut fields = Fields::new();
        fields.insert("pet".into(), json!({"name": "Drums"}));
        record.load(fields);
        assert_eq!(
            record.related("pet").unwrap().get("name"),
            Some(&json!("Drums"))
        );
    }

    #[test]
    fn test_apply_rejects_record_list() {
        let mut record = doctor();
        let err = record.apply(Payload::Records(vec![])).unwrap_err();
        assert!(err.is_format());
        assert_eq!(record.get("lastname"), Some(&json!("Doctor")));
    }

    #[test]
    fn test_save_without_adapter_is_configuration_error() {
        let record = doctor();
        assert!(matches!(
            record.save().unwrap_err(),
            ProxyError::Configuration(_)
        ));
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(matches!(
            Record::from_value(json!([1, 2])).unwrap_err(),
            ProxyError::InvalidRecord(_)
        ));
    }
}
