//! Path resolution against maps, persistent objects and entity metadata.
//!
//! The same path text means different things depending on the subject:
//!
//! - a map or snapshot is read by key;
//! - a raw identity key, or a detached object, answers store paths from its
//!   identity snapshot;
//! - an attached object answers single-segment store paths from the cached
//!   snapshot and multi-segment ones with a reverse lookup through its
//!   context (the one blocking call in evaluation);
//! - an entity handle answers with attribute and relationship descriptors
//!   instead of values.

use std::sync::Arc;

use log::{debug, trace};

use crate::{
    ast::Path,
    context::{Persistent, ReverseLookup},
    error::{ExpressionError, Result},
    metadata::{Catalog, Endpoint, EntityDescriptor, EntityRef, Relationship},
    value::{ObjectId, Value},
};

/// Which namespace a path's segments name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathMode {
    /// Object properties and relationships
    Object,
    /// Store columns and store relationships
    Db,
    /// Identity-key columns
    DbId,
}

/// Resolves `path` against `subject`.
///
/// Absent segments resolve to `Value::Null`. Lists are resolved element-wise,
/// so a path through a to-many relationship yields a flat list.
///
/// # Examples
///
/// ```
/// use orm_expr::{Value, ast::Path, resolver::{PathMode, resolve}};
///
/// let artist = Value::map([("name", Value::from("Picasso"))]);
/// let painting = Value::map([("title", Value::from("Guernica")), ("toArtist", artist)]);
///
/// let path = Path::parse("toArtist.name")?;
/// assert_eq!(resolve(&path, PathMode::Object, &painting)?, Value::from("Picasso"));
/// # Ok::<(), orm_expr::ExpressionError>(())
/// ```
pub fn resolve(path: &Path, mode: PathMode, subject: &Value) -> Result<Value> {
    if path.is_empty() {
        return Ok(subject.clone());
    }

    let names: Vec<&str> = path.names().collect();
    trace!("resolving {:?} path '{}' against {}", mode, path, subject.type_name());

    match subject {
        Value::Entity(entity) => resolve_metadata(path, &names, mode, entity),
        Value::List(items) => {
            let mut resolved = Vec::with_capacity(items.len());
            for item in items {
                push_flat(&mut resolved, resolve(path, mode, item)?);
            }
            Ok(Value::List(resolved))
        }
        _ => match mode {
            PathMode::Object => walk(subject, &names),
            PathMode::Db => resolve_db(path, &names, subject),
            PathMode::DbId => resolve_db_id(&names, subject),
        },
    }
}

fn push_flat(out: &mut Vec<Value>, value: Value) {
    match value {
        Value::List(items) => out.extend(items),
        other => out.push(other),
    }
}

/// Walks object properties, map keys and list elements segment by segment
fn walk(subject: &Value, names: &[&str]) -> Result<Value> {
    let mut current = subject.clone();
    for name in names {
        current = step(&current, name);
        if current.is_null() {
            break;
        }
    }
    Ok(current)
}

fn step(current: &Value, name: &str) -> Value {
    match current {
        Value::Object(object) => object.read_property(name),
        Value::Map(map) => map.get(name).cloned().unwrap_or(Value::Null),
        Value::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                push_flat(&mut out, step(item, name));
            }
            Value::List(out)
        }
        _ => Value::Null,
    }
}

fn final_segment<'a>(names: &[&'a str]) -> &'a str {
    names.last().copied().unwrap_or_default()
}

fn resolve_db_id(names: &[&str], subject: &Value) -> Result<Value> {
    let column = final_segment(names);
    let value = match subject {
        Value::Map(map) => map.get(column).cloned(),
        Value::ObjectId(id) => id.key.get(column).cloned(),
        Value::Object(object) => object.object_id().key.get(column).cloned(),
        _ => None,
    };
    Ok(value.unwrap_or(Value::Null))
}

fn resolve_db(path: &Path, names: &[&str], subject: &Value) -> Result<Value> {
    match subject {
        Value::Map(map) => Ok(map.get(final_segment(names)).cloned().unwrap_or(Value::Null)),
        Value::ObjectId(id) => Ok(id.key.get(final_segment(names)).cloned().unwrap_or(Value::Null)),
        Value::Object(object) if names.len() == 1 => Ok(snapshot_value(object.as_ref(), names[0])),
        // Detached: only the identity snapshot is available
        Value::Object(object) if object.context().is_none() => Ok(object
            .object_id()
            .key
            .get(final_segment(names))
            .cloned()
            .unwrap_or(Value::Null)),
        Value::Object(object) => reverse_lookup(path, names, object),
        _ => Ok(Value::Null),
    }
}

/// Single-column read: cached snapshot first, identity snapshot otherwise
fn snapshot_value(object: &dyn Persistent, column: &str) -> Value {
    let id = object.object_id();
    if let Some(context) = object.context()
        && let Some(snapshot) = context.snapshot(&id)
        && let Some(value) = snapshot.get(column)
    {
        return value.clone();
    }
    id.key.get(column).cloned().unwrap_or(Value::Null)
}

/// Multi-segment store path on an attached object: walks the relationships
/// forward, reverses them, and asks the context for the terminal column of
/// the row that joins back to this object.
fn reverse_lookup(path: &Path, names: &[&str], object: &Arc<dyn Persistent>) -> Result<Value> {
    let context = object
        .context()
        .ok_or(ExpressionError::NoContext("multi-segment store path"))?;
    let catalog = context.catalog();
    let source_id = object.object_id();

    let (relationships, terminal) = forward_relationships(&catalog, path, names, &source_id)?;

    let reversed_path: Vec<Relationship> = relationships
        .iter()
        .rev()
        .map(|r| catalog.reverse_relationship(r))
        .collect();

    let lookup = ReverseLookup {
        entity: terminal,
        column: final_segment(names).to_string(),
        reversed_path,
        source_id,
    };

    debug!(
        "reverse lookup of {}.{} via '{}' for {} (blocking)",
        lookup.entity,
        lookup.column,
        lookup.reversed_db_path(),
        lookup.source_id
    );

    context.select_one(&lookup).map_err(ExpressionError::Store)
}

fn forward_relationships(
    catalog: &Catalog,
    path: &Path,
    names: &[&str],
    source_id: &ObjectId,
) -> Result<(Vec<Relationship>, String)> {
    let mut entity = entity_descriptor(catalog, path, &source_id.entity)?;
    let mut relationships = Vec::with_capacity(names.len().saturating_sub(1));

    for name in &names[..names.len() - 1] {
        let relationship = entity
            .find_db_relationship(name)
            .cloned()
            .ok_or_else(|| invalid(path, format!("no store relationship '{}' on {}", name, entity.name)))?;
        entity = entity_descriptor(catalog, path, &relationship.target)?;
        relationships.push(relationship);
    }

    Ok((relationships, entity.name.clone()))
}

fn entity_descriptor(catalog: &Catalog, path: &Path, name: &str) -> Result<Arc<EntityDescriptor>> {
    catalog
        .entity(name)
        .ok_or_else(|| invalid(path, format!("unknown entity '{}'", name)))
}

fn invalid(path: &Path, reason: String) -> ExpressionError {
    ExpressionError::InvalidPath {
        path: path.to_string(),
        reason,
    }
}

/// Resolves a path against schema only, producing an endpoint descriptor
fn resolve_metadata(path: &Path, names: &[&str], mode: PathMode, entity: &EntityRef) -> Result<Value> {
    let catalog = entity.catalog.as_ref();
    let mut current = entity_descriptor(catalog, path, &entity.name)?;

    for name in &names[..names.len() - 1] {
        let relationship = match mode {
            PathMode::Object => current.find_relationship(name),
            PathMode::Db | PathMode::DbId => current.find_db_relationship(name),
        }
        .ok_or_else(|| invalid(path, format!("no relationship '{}' on {}", name, current.name)))?;
        let target = relationship.target.clone();
        current = entity_descriptor(catalog, path, &target)?;
    }

    let last = final_segment(names);
    let entity_name = current.name.clone();
    let endpoint = match mode {
        PathMode::Object => {
            if let Some(attribute) = current.find_attribute(last) {
                Endpoint::Attribute {
                    entity: entity_name,
                    attribute: attribute.clone(),
                }
            } else if let Some(relationship) = current.find_relationship(last) {
                Endpoint::Relationship {
                    entity: entity_name,
                    relationship: relationship.clone(),
                }
            } else {
                return Err(invalid(path, format!("no property '{}' on {}", last, current.name)));
            }
        }
        PathMode::Db => {
            if let Some(attribute) = current.find_attribute_by_column(last) {
                Endpoint::Attribute {
                    entity: entity_name,
                    attribute: attribute.clone(),
                }
            } else if let Some(relationship) = current.find_db_relationship(last) {
                Endpoint::Relationship {
                    entity: entity_name,
                    relationship: relationship.clone(),
                }
            } else if current.has_column(last) {
                Endpoint::Column {
                    entity: entity_name,
                    column: last.to_string(),
                }
            } else {
                return Err(invalid(path, format!("no column '{}' on {}", last, current.name)));
            }
        }
        PathMode::DbId => {
            if current.primary_key.iter().any(|c| c == last) {
                Endpoint::Column {
                    entity: entity_name,
                    column: last.to_string(),
                }
            } else {
                return Err(invalid(path, format!("'{}' is not a key column of {}", last, current.name)));
            }
        }
    };

    Ok(Value::Endpoint(endpoint))
}
