//! Shared fixtures: an Artist / Painting / Gallery catalog, an in-memory
//! persistence context with canned store answers, and persistent objects
//! bound to it.
#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc};

use orm_expr::{
    Catalog, EntityDescriptor, ObjectContext, ObjectId, Persistent, Relationship, ReverseLookup,
    Snapshot, StoreError, SubqueryRequest, Value,
};
use parking_lot::Mutex;

pub fn catalog() -> Arc<Catalog> {
    let mut catalog = Catalog::new();
    catalog
        .add(
            EntityDescriptor::new("Artist", "ARTIST")
                .attribute("artistName", "ARTIST_NAME")
                .attribute("dateOfBirth", "DATE_OF_BIRTH")
                .primary_key("ARTIST_ID")
                .relationship(
                    Relationship::to_many("paintings", "Artist", "Painting")
                        .db_name("paintingArray")
                        .join("ARTIST_ID", "ARTIST_ID"),
                ),
        )
        .add(
            EntityDescriptor::new("Painting", "PAINTING")
                .attribute("paintingTitle", "PAINTING_TITLE")
                .attribute("estimatedPrice", "ESTIMATED_PRICE")
                .primary_key("PAINTING_ID")
                .relationship(
                    Relationship::to_one("toArtist", "Painting", "Artist").join("ARTIST_ID", "ARTIST_ID"),
                )
                .relationship(
                    Relationship::to_one("toGallery", "Painting", "Gallery").join("GALLERY_ID", "GALLERY_ID"),
                ),
        )
        .add(
            EntityDescriptor::new("Gallery", "GALLERY")
                .attribute("galleryName", "GALLERY_NAME")
                .primary_key("GALLERY_ID"),
        );
    Arc::new(catalog)
}

/// Persistence context answering from canned data and recording every
/// store request it receives
#[derive(Debug)]
pub struct FakeContext {
    pub catalog: Arc<Catalog>,
    pub snapshots: Vec<(ObjectId, Snapshot)>,
    pub lookup_answer: Value,
    pub rows: Vec<Value>,
    pub fail: bool,
    pub lookups: Mutex<Vec<ReverseLookup>>,
    pub requests: Mutex<Vec<SubqueryRequest>>,
}

impl FakeContext {
    pub fn new() -> Self {
        FakeContext {
            catalog: catalog(),
            snapshots: Vec::new(),
            lookup_answer: Value::Null,
            rows: Vec::new(),
            fail: false,
            lookups: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_snapshot(mut self, id: ObjectId, snapshot: Snapshot) -> Self {
        self.snapshots.push((id, snapshot));
        self
    }

    pub fn answering(mut self, value: impl Into<Value>) -> Self {
        self.lookup_answer = value.into();
        self
    }

    pub fn with_rows(mut self, rows: Vec<Value>) -> Self {
        self.rows = rows;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[derive(Debug)]
struct StoreDown;

impl std::fmt::Display for StoreDown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "store unavailable")
    }
}

impl std::error::Error for StoreDown {}

impl ObjectContext for FakeContext {
    fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    fn snapshot(&self, id: &ObjectId) -> Option<Snapshot> {
        self.snapshots
            .iter()
            .find(|(known, _)| known == id)
            .map(|(_, snapshot)| snapshot.clone())
    }

    fn select_one(&self, lookup: &ReverseLookup) -> Result<Value, StoreError> {
        self.lookups.lock().push(lookup.clone());
        if self.fail {
            return Err(Box::new(StoreDown));
        }
        Ok(self.lookup_answer.clone())
    }

    fn select(&self, request: &SubqueryRequest) -> Result<Vec<Value>, StoreError> {
        self.requests.lock().push(request.clone());
        if self.fail {
            return Err(Box::new(StoreDown));
        }
        Ok(self.rows.clone())
    }
}

/// A persistent object with in-memory properties
#[derive(Debug)]
pub struct FakeObject {
    pub id: ObjectId,
    pub properties: HashMap<String, Value>,
    pub context: Option<Arc<FakeContext>>,
}

impl Persistent for FakeObject {
    fn object_id(&self) -> ObjectId {
        self.id.clone()
    }

    fn read_property(&self, name: &str) -> Value {
        self.properties.get(name).cloned().unwrap_or(Value::Null)
    }

    fn context(&self) -> Option<Arc<dyn ObjectContext>> {
        self.context
            .as_ref()
            .map(|context| Arc::clone(context) as Arc<dyn ObjectContext>)
    }
}

pub fn object(id: ObjectId, properties: Vec<(&str, Value)>, context: Option<Arc<FakeContext>>) -> Value {
    let persistent: Arc<dyn Persistent> = Arc::new(FakeObject {
        id,
        properties: properties
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
        context,
    });
    Value::Object(persistent)
}

pub fn artist(id: i64, name: &str) -> Value {
    object(
        ObjectId::single("Artist", "ARTIST_ID", id),
        vec![("artistName", Value::from(name))],
        None,
    )
}

pub fn painting(id: i64, title: &str, price: i64, artist: Value) -> Value {
    object(
        ObjectId::single("Painting", "PAINTING_ID", id),
        vec![
            ("paintingTitle", Value::from(title)),
            ("estimatedPrice", Value::from(price)),
            ("toArtist", artist),
        ],
        None,
    )
}

/// A painting as a plain map
pub fn painting_map(title: &str, price: i64) -> Value {
    Value::map([
        ("paintingTitle", Value::from(title)),
        ("estimatedPrice", Value::from(price)),
    ])
}
