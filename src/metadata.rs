//! Entity metadata: the schema a path resolves against when the subject
//! carries no data.

use std::{collections::HashMap, fmt, sync::Arc};

/// A persistent attribute mapped to a column
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub column: String,
}

/// One column pair of a relationship join
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub source: String,
    pub target: String,
}

/// A relationship between two entities.
///
/// `name` is the object-level name used by object paths, `db_name` the
/// store-level name used by store paths.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub name: String,
    pub db_name: String,
    pub source: String,
    pub target: String,
    pub to_many: bool,
    pub joins: Vec<Join>,
    /// Name of the declared inverse on the target entity
    pub reverse: Option<String>,
    /// Synthesized on demand rather than declared
    pub runtime: bool,
}

impl Relationship {
    pub fn to_one(name: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        let name = name.into();
        Relationship {
            db_name: name.clone(),
            name,
            source: source.into(),
            target: target.into(),
            to_many: false,
            joins: Vec::new(),
            reverse: None,
            runtime: false,
        }
    }

    pub fn to_many(name: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Relationship {
            to_many: true,
            ..Relationship::to_one(name, source, target)
        }
    }

    pub fn db_name(mut self, db_name: impl Into<String>) -> Self {
        self.db_name = db_name.into();
        self
    }

    pub fn join(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.joins.push(Join {
            source: source.into(),
            target: target.into(),
        });
        self
    }

    pub fn reverse(mut self, reverse: impl Into<String>) -> Self {
        self.reverse = Some(reverse.into());
        self
    }

    fn joins_mirror(&self, other: &Relationship) -> bool {
        self.joins.len() == other.joins.len()
            && self.joins.iter().all(|j| {
                other
                    .joins
                    .iter()
                    .any(|o| o.source == j.target && o.target == j.source)
            })
    }
}

/// Schema of one persistent entity
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDescriptor {
    pub name: String,
    pub table: String,
    pub attributes: Vec<Attribute>,
    pub relationships: Vec<Relationship>,
    pub primary_key: Vec<String>,
}

impl EntityDescriptor {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        EntityDescriptor {
            name: name.into(),
            table: table.into(),
            attributes: Vec::new(),
            relationships: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    pub fn attribute(mut self, name: impl Into<String>, column: impl Into<String>) -> Self {
        self.attributes.push(Attribute {
            name: name.into(),
            column: column.into(),
        });
        self
    }

    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key.push(column.into());
        self
    }

    pub fn relationship(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    pub fn find_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn find_attribute_by_column(&self, column: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.column == column)
    }

    pub fn find_relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.name == name)
    }

    pub fn find_db_relationship(&self, db_name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.db_name == db_name)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.primary_key.iter().any(|c| c == column)
            || self.find_attribute_by_column(column).is_some()
            || self
                .relationships
                .iter()
                .any(|r| r.joins.iter().any(|j| j.source == column))
    }
}

/// Registry of entity descriptors by name
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entities: HashMap<String, Arc<EntityDescriptor>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entity: EntityDescriptor) -> &mut Self {
        self.entities.insert(entity.name.clone(), Arc::new(entity));
        self
    }

    pub fn entity(&self, name: &str) -> Option<Arc<EntityDescriptor>> {
        self.entities.get(name).cloned()
    }

    /// Returns the inverse of `relationship`: the declared reverse if any,
    /// else a relationship on the target whose joins mirror this one, else
    /// a runtime relationship synthesized from the swapped joins.
    pub fn reverse_relationship(&self, relationship: &Relationship) -> Relationship {
        if let Some(target) = self.entity(&relationship.target) {
            if let Some(declared) = relationship
                .reverse
                .as_deref()
                .and_then(|name| target.find_relationship(name))
            {
                return declared.clone();
            }

            if let Some(mirror) = target
                .relationships
                .iter()
                .find(|r| r.target == relationship.source && relationship.joins_mirror(r))
            {
                return mirror.clone();
            }
        }

        let name = format!("runtime_reverse_{}", relationship.db_name);
        Relationship {
            name: name.clone(),
            db_name: name,
            source: relationship.target.clone(),
            target: relationship.source.clone(),
            to_many: !relationship.to_many,
            joins: relationship
                .joins
                .iter()
                .map(|j| Join {
                    source: j.target.clone(),
                    target: j.source.clone(),
                })
                .collect(),
            reverse: Some(relationship.name.clone()),
            runtime: true,
        }
    }
}

/// Handle to an entity inside a catalog, used as an evaluation subject
#[derive(Debug, Clone)]
pub struct EntityRef {
    pub catalog: Arc<Catalog>,
    pub name: String,
}

impl EntityRef {
    pub fn new(catalog: Arc<Catalog>, name: impl Into<String>) -> Self {
        EntityRef {
            catalog,
            name: name.into(),
        }
    }

    pub fn descriptor(&self) -> Option<Arc<EntityDescriptor>> {
        self.catalog.entity(&self.name)
    }
}

impl PartialEq for EntityRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.catalog, &other.catalog)
    }
}

/// What a path names when resolved against metadata instead of data
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    Attribute { entity: String, attribute: Attribute },
    Relationship { entity: String, relationship: Relationship },
    /// A bare column with no mapped attribute (e.g. a primary key)
    Column { entity: String, column: String },
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Attribute { entity, attribute } => write!(f, "{}.{}", entity, attribute.name),
            Endpoint::Relationship { entity, relationship } => {
                write!(f, "{}.{}", entity, relationship.name)
            }
            Endpoint::Column { entity, column } => write!(f, "{}.{}", entity, column),
        }
    }
}
