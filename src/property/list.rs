//! Ordered, keyed list of properties.
//!
//! [`PropertyList`] keeps its members in insertion order and maintains a
//! reference index from normalized identity to member, so keyed lookups do not
//! scan the list. Every member gets a private slot number when inserted; the
//! reference index and the position table both speak in slots, which keeps
//! "most recently inserted" well defined for multi-value keys no matter how the
//! members are later reordered.

use super::Property;
use crate::error::{CollectionError, Result};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;

type Slot = u64;

/// Per-list indexing behaviour, normally taken from the element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    /// Fold identities to lowercase before indexing and lookup.
    pub case_insensitive: bool,
    /// Keep every member sharing an identity instead of replacing.
    pub allows_multiple_values: bool,
}

impl ListOptions {
    /// Options declared by the element type `T`.
    pub fn of<T: Property>() -> Self {
        Self {
            case_insensitive: T::CASE_INSENSITIVE,
            allows_multiple_values: T::ALLOWS_MULTIPLE_VALUES,
        }
    }

    fn normalize<'k>(&self, key: &'k str) -> Cow<'k, str> {
        if self.case_insensitive {
            Cow::Owned(key.to_lowercase())
        } else {
            Cow::Borrowed(key)
        }
    }

    fn key_of<T: Property>(&self, item: &T) -> Option<String> {
        item.key()
            .filter(|key| !key.is_empty())
            .map(|key| self.normalize(key).into_owned())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Indexed {
    One(Slot),
    /// Slots in insertion order; the last one answers single lookups.
    Many(Vec<Slot>),
}

#[derive(Debug, Clone)]
struct Member<T> {
    slot: Slot,
    item: T,
}

/// An ordered collection of properties with keyed lookup.
#[derive(Clone)]
pub struct PropertyList<T> {
    members: Vec<Member<T>>,
    reference: HashMap<String, Indexed>,
    positions: HashMap<Slot, usize>,
    next_slot: Slot,
    options: ListOptions,
}

impl<T: Property> Default for PropertyList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Property> PropertyList<T> {
    /// Creates an empty list configured from the element type.
    pub fn new() -> Self {
        Self::with_options(ListOptions::of::<T>())
    }

    /// Creates an empty list with explicit indexing options.
    pub fn with_options(options: ListOptions) -> Self {
        Self {
            members: Vec::new(),
            reference: HashMap::new(),
            positions: HashMap::new(),
            next_slot: 0,
            options,
        }
    }

    /// Creates a list populated from elements or element definitions.
    pub fn from_items<I, D>(items: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<T>,
    {
        let mut list = Self::new();
        list.populate(items);
        list
    }

    /// The indexing options of this list.
    pub fn options(&self) -> ListOptions {
        self.options
    }

    /// Inserts `item` before the member identified by `before`, or at the end.
    ///
    /// Unless the list allows multiple values, an existing member with the
    /// same identity is removed first, so re-inserting moves rather than
    /// duplicates. A `before` key that does not resolve appends.
    ///
    /// # Arguments
    ///
    /// * `item` - The element to insert; the list takes ownership
    /// * `before` - Identity of the member to insert in front of
    ///
    /// # Example
    ///
    /// ```
    /// use rest_collection::{Header, PropertyList};
    ///
    /// let mut headers: PropertyList<Header> = PropertyList::new();
    /// headers.append(Header::new("Accept", "*/*"));
    /// headers.insert(Header::new("Host", "example.com"), Some("accept"));
    ///
    /// assert_eq!(headers.index_of("host"), Some(0));
    /// assert_eq!(headers.index_of("Accept"), Some(1));
    /// ```
    pub fn insert(&mut self, item: T, before: Option<&str>) {
        let before = before.and_then(|key| self.slot_of(key));
        self.insert_before_slot(item, before);
    }

    /// Inserts `item` after the member identified by `after`.
    ///
    /// The target position is resolved before any existing member with the
    /// same identity is removed. When `after` is missing or unknown the item
    /// goes in front of the first member.
    pub fn insert_after(&mut self, item: T, after: Option<&str>) {
        let target = after
            .and_then(|key| self.index_of(key))
            .map_or(0, |index| index + 1);
        let before = self.members.get(target).map(|member| member.slot);
        self.insert_before_slot(item, before);
    }

    /// Inserts `item` at the end of the list.
    pub fn append(&mut self, item: T) {
        self.insert_before_slot(item, None);
    }

    /// Inserts `item` in front of the first member.
    pub fn prepend(&mut self, item: T) {
        let before = self.members.first().map(|member| member.slot);
        self.insert_before_slot(item, before);
    }

    /// Converts a definition into an element and appends it.
    pub fn add<D: Into<T>>(&mut self, definition: D) {
        self.append(definition.into());
    }

    /// Appends every item, converting definitions as needed.
    pub fn populate<I, D>(&mut self, items: I)
    where
        I: IntoIterator<Item = D>,
        D: Into<T>,
    {
        for item in items {
            self.add(item);
        }
    }

    /// Parses `source` with the element type's parser and appends the result.
    ///
    /// Element types without a string form leave the list unchanged.
    pub fn populate_str(&mut self, source: &str) {
        match T::parse_list(source) {
            Some(items) => self.populate(items),
            None => log::warn!(
                "Element type indexed by `{}` has no string parser; ignoring input",
                T::INDEX_KEY
            ),
        }
    }

    /// Clears the list, then populates it from `items`.
    pub fn repopulate<I, D>(&mut self, items: I)
    where
        I: IntoIterator<Item = D>,
        D: Into<T>,
    {
        self.clear();
        self.populate(items);
    }

    /// Merges `source` into this list.
    ///
    /// Members whose identity already exists replace the current holder in
    /// place; new identities are appended. With `prune`, keyed members whose
    /// identity does not appear in `source` are removed.
    pub fn assimilate<I: IntoIterator<Item = T>>(&mut self, source: I, prune: bool) {
        let options = self.options;
        let mut source_keys = HashSet::new();

        for item in source {
            let key = options.key_of(&item);
            if prune {
                if let Some(key) = &key {
                    source_keys.insert(key.clone());
                }
            }

            let position = key
                .as_deref()
                .and_then(|key| self.slot_of_normalized(key))
                .and_then(|slot| self.positions.get(&slot).copied());

            match position {
                Some(position) => self.members[position].item = item,
                None => self.append(item),
            }
        }

        if prune {
            self.take_where(|item| {
                options
                    .key_of(item)
                    .is_some_and(|key| !source_keys.contains(&key))
            });
        }
    }

    /// Removes every member with the given identity.
    pub fn remove(&mut self, key: &str) -> Vec<T> {
        let options = self.options;
        let key = options.normalize(key).into_owned();
        self.take_where(|item| options.key_of(item).as_deref() == Some(key.as_str()))
    }

    /// Removes every member matching `predicate`.
    pub fn remove_where<F: FnMut(&T) -> bool>(&mut self, predicate: F) -> Vec<T> {
        self.take_where(predicate)
    }

    /// Removes the first member equal to `item`.
    pub fn remove_item(&mut self, item: &T) -> Option<T>
    where
        T: PartialEq,
    {
        let mut found = false;
        self.take_where(|member| {
            if !found && member == item {
                found = true;
                return true;
            }
            false
        })
        .pop()
    }

    /// Removes all members.
    pub fn clear(&mut self) {
        self.members.clear();
        self.reference.clear();
        self.positions.clear();
    }

    /// The member with the given identity; for multi-value keys, the most
    /// recently inserted one.
    pub fn one(&self, key: &str) -> Option<&T> {
        let slot = self.slot_of(key)?;
        let position = *self.positions.get(&slot)?;
        self.members.get(position).map(|member| &member.item)
    }

    /// Mutable access to [`one`](Self::one).
    ///
    /// The identity of the returned member must not be changed through this
    /// reference; re-insert the element instead.
    pub fn one_mut(&mut self, key: &str) -> Option<&mut T> {
        let slot = self.slot_of(key)?;
        let position = *self.positions.get(&slot)?;
        self.members.get_mut(position).map(|member| &mut member.item)
    }

    /// Every member with the given identity, in insertion order.
    pub fn all(&self, key: &str) -> Vec<&T> {
        let slots: Vec<Slot> = match self.reference.get(&*self.options.normalize(key)) {
            Some(Indexed::One(slot)) => vec![*slot],
            Some(Indexed::Many(slots)) => slots.clone(),
            None => Vec::new(),
        };

        slots
            .into_iter()
            .filter_map(|slot| self.positions.get(&slot))
            .map(|&position| &self.members[position].item)
            .collect()
    }

    /// The resolved value of the member with the given identity.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.one(key).map(T::value_of)
    }

    /// Whether a member with the given identity exists.
    pub fn has(&self, key: &str) -> bool {
        self.reference.contains_key(&*self.options.normalize(key))
    }

    /// The member at `index`.
    pub fn idx(&self, index: usize) -> Option<&T> {
        self.members.get(index).map(|member| &member.item)
    }

    /// Position of the member with the given identity.
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.slot_of(key)
            .and_then(|slot| self.positions.get(&slot).copied())
    }

    pub fn count(&self) -> usize {
        self.members.len()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Iterates members in order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.members.iter(),
        }
    }

    pub fn each<F: FnMut(&T)>(&self, f: F) {
        self.iter().for_each(f);
    }

    pub fn find<P: FnMut(&&T) -> bool>(&self, predicate: P) -> Option<&T> {
        self.iter().find(predicate)
    }

    pub fn filter<P: FnMut(&&T) -> bool>(&self, predicate: P) -> Vec<&T> {
        self.iter().filter(predicate).collect()
    }

    pub fn map<'a, R, F: FnMut(&'a T) -> R>(&'a self, f: F) -> Vec<R> {
        self.iter().map(f).collect()
    }

    pub fn reduce<A, F: FnMut(A, &T) -> A>(&self, init: A, f: F) -> A {
        self.iter().fold(init, f)
    }

    /// Projects the list to a plain key/value object.
    ///
    /// Keys of a case-insensitive list are lowercased unless `case_sensitive`
    /// is set. With `multi_value`, colliding keys collect their values into an
    /// array in member order; otherwise the last member wins.
    ///
    /// # Arguments
    ///
    /// * `exclude_disabled` - Skip members reporting [`Property::is_disabled`]
    /// * `case_sensitive` - Keep keys as written in a case-insensitive list
    /// * `multi_value` - Collect colliding keys into arrays
    ///
    /// Members without a key never appear in the result.
    pub fn to_object(
        &self,
        exclude_disabled: bool,
        case_sensitive: bool,
        multi_value: bool,
    ) -> Map<String, Value> {
        let mut object = Map::new();
        let mut collided = HashSet::new();

        for item in self.iter() {
            if exclude_disabled && item.is_disabled() {
                continue;
            }
            let Some(key) = item.key().filter(|key| !key.is_empty()) else {
                continue;
            };
            let key = if self.options.case_insensitive && !case_sensitive {
                key.to_lowercase()
            } else {
                key.to_string()
            };
            let value = item.value_of();

            match object.get_mut(&key) {
                Some(existing) if multi_value => {
                    if collided.insert(key.clone()) {
                        let first = existing.take();
                        *existing = Value::Array(vec![first]);
                    }
                    if let Value::Array(values) = existing {
                        values.push(value);
                    }
                }
                _ => {
                    object.insert(key, value);
                }
            }
        }

        object
    }

    /// Builds a list from a JSON array of member definitions.
    ///
    /// Non-object entries and entries that fail to decode are skipped. A single
    /// object is treated as a one-member array, a string is handed to the
    /// element parser and `null` yields an empty list.
    pub fn from_json(value: &Value) -> Result<Self>
    where
        T: DeserializeOwned,
    {
        let mut list = Self::new();

        match value {
            Value::Null => {}
            Value::Array(entries) => {
                for entry in entries {
                    list.push_json(entry);
                }
            }
            Value::Object(_) => list.push_json(value),
            Value::String(source) => list.populate_str(source),
            other => {
                return Err(CollectionError::InvalidDefinition(format!(
                    "expected a list of members, found {}",
                    other
                )))
            }
        }

        Ok(list)
    }

    fn push_json(&mut self, entry: &Value)
    where
        T: DeserializeOwned,
    {
        if !entry.is_object() {
            log::trace!("Skipping non-object list member: {}", entry);
            return;
        }

        match serde_json::from_value::<T>(entry.clone()) {
            Ok(item) => self.append(item),
            Err(e) => log::warn!("Skipping malformed list member: {}", e),
        }
    }

    fn slot_of(&self, key: &str) -> Option<Slot> {
        self.slot_of_normalized(&self.options.normalize(key))
    }

    fn slot_of_normalized(&self, key: &str) -> Option<Slot> {
        match self.reference.get(key)? {
            Indexed::One(slot) => Some(*slot),
            Indexed::Many(slots) => slots.last().copied(),
        }
    }

    fn insert_before_slot(&mut self, item: T, before: Option<Slot>) {
        let key = self.options.key_of(&item);

        if !self.options.allows_multiple_values {
            if let Some(key) = &key {
                if self.reference.contains_key(key) {
                    let options = self.options;
                    self.take_where(|member| options.key_of(member).as_ref() == Some(key));
                }
            }
        }

        let slot = self.next_slot;
        self.next_slot += 1;

        if let Some(key) = key {
            self.index(key, slot);
        }

        let member = Member { slot, item };
        match before.and_then(|before| self.positions.get(&before).copied()) {
            Some(position) => {
                self.members.insert(position, member);
                self.reindex_positions(position);
            }
            None => {
                self.positions.insert(slot, self.members.len());
                self.members.push(member);
            }
        }
    }

    fn index(&mut self, key: String, slot: Slot) {
        let allows_multiple = self.options.allows_multiple_values;

        match self.reference.get_mut(&key) {
            Some(Indexed::One(existing)) if allows_multiple => {
                let existing = *existing;
                log::trace!("Key `{}` now holds multiple values", key);
                self.reference
                    .insert(key, Indexed::Many(vec![existing, slot]));
            }
            Some(Indexed::Many(slots)) => slots.push(slot),
            _ => {
                self.reference.insert(key, Indexed::One(slot));
            }
        }
    }

    fn unindex(&mut self, key: &str, slot: Slot) {
        let residual = match self.reference.get_mut(key) {
            Some(Indexed::One(existing)) if *existing == slot => None,
            Some(Indexed::Many(slots)) => {
                slots.retain(|s| *s != slot);
                match slots.as_slice() {
                    [] => None,
                    [only] => Some(Indexed::One(*only)),
                    _ => return,
                }
            }
            _ => return,
        };

        match residual {
            Some(indexed) => {
                self.reference.insert(key.to_string(), indexed);
            }
            None => {
                self.reference.remove(key);
            }
        }
    }

    fn take_where<F: FnMut(&T) -> bool>(&mut self, mut predicate: F) -> Vec<T> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.members.len());

        for member in self.members.drain(..) {
            if predicate(&member.item) {
                removed.push(member);
            } else {
                kept.push(member);
            }
        }
        self.members = kept;

        if removed.is_empty() {
            return Vec::new();
        }

        for member in &removed {
            self.positions.remove(&member.slot);
            if let Some(key) = self.options.key_of(&member.item) {
                self.unindex(&key, member.slot);
            }
        }
        self.reindex_positions(0);

        removed.into_iter().map(|member| member.item).collect()
    }

    fn reindex_positions(&mut self, from: usize) {
        for (position, member) in self.members.iter().enumerate().skip(from) {
            self.positions.insert(member.slot, position);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for PropertyList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.members.iter().map(|member| &member.item))
            .finish()
    }
}

impl<T: PartialEq> PartialEq for PropertyList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.members.len() == other.members.len()
            && self
                .members
                .iter()
                .zip(&other.members)
                .all(|(a, b)| a.item == b.item)
    }
}

/// Iterator over the members of a [`PropertyList`].
pub struct Iter<'a, T> {
    inner: std::slice::Iter<'a, Member<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|member| &member.item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|member| &member.item)
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<'a, T: Property> IntoIterator for &'a PropertyList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Property> FromIterator<T> for PropertyList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_items(iter)
    }
}

impl<T: Property> Extend<T> for PropertyList<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.populate(iter);
    }
}

impl<T: Serialize> Serialize for PropertyList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.members.iter().map(|member| &member.item))
    }
}

impl<'de, T: Property + DeserializeOwned> Deserialize<'de> for PropertyList<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(&value).map_err(D::Error::custom)
    }
}
