//! Property tests for property list ordering and indexing.
//!
//! Random edit sequences are run against a list and against a plain vector
//! model; both must agree on member order, and every lookup must agree with
//! the member order.

use rest_collection::{Header, PropertyList, Variable};
use proptest::prelude::*;
use serde_json::json;

const KEYS: &[&str] = &["alpha", "beta", "gamma", "delta", "epsilon"];

#[derive(Debug, Clone)]
enum Edit {
    Append(&'static str, i64),
    Prepend(&'static str, i64),
    Insert(&'static str, i64, Option<&'static str>),
    InsertAfter(&'static str, i64, Option<&'static str>),
    Remove(&'static str),
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    let key = || prop::sample::select(KEYS);
    prop_oneof![
        4 => (key(), any::<i64>()).prop_map(|(k, v)| Edit::Append(k, v)),
        2 => (key(), any::<i64>()).prop_map(|(k, v)| Edit::Prepend(k, v)),
        2 => (key(), any::<i64>(), prop::option::of(key()))
            .prop_map(|(k, v, before)| Edit::Insert(k, v, before)),
        2 => (key(), any::<i64>(), prop::option::of(key()))
            .prop_map(|(k, v, after)| Edit::InsertAfter(k, v, after)),
        2 => key().prop_map(Edit::Remove),
    ]
}

/// Reference model: members in order, each with a unique identity.
#[derive(Default)]
struct Model {
    members: Vec<(u64, &'static str, i64)>,
    next: u64,
}

impl Model {
    fn position(&self, key: &str) -> Option<usize> {
        self.members.iter().position(|(_, k, _)| *k == key)
    }

    fn insert_before(&mut self, key: &'static str, value: i64, before: Option<u64>) {
        self.members.retain(|(_, k, _)| *k != key);
        let id = self.next;
        self.next += 1;

        match before.and_then(|id| self.members.iter().position(|(m, _, _)| *m == id)) {
            Some(position) => self.members.insert(position, (id, key, value)),
            None => self.members.push((id, key, value)),
        }
    }

    fn apply(&mut self, edit: &Edit) {
        match *edit {
            Edit::Append(key, value) => self.insert_before(key, value, None),
            Edit::Prepend(key, value) => {
                let first = self.members.first().map(|(id, _, _)| *id);
                self.insert_before(key, value, first);
            }
            Edit::Insert(key, value, before) => {
                let target = before
                    .and_then(|before| self.position(before))
                    .map(|position| self.members[position].0);
                self.insert_before(key, value, target);
            }
            Edit::InsertAfter(key, value, after) => {
                let target = after
                    .and_then(|after| self.position(after))
                    .map_or(0, |position| position + 1);
                let before = self.members.get(target).map(|(id, _, _)| *id);
                self.insert_before(key, value, before);
            }
            Edit::Remove(key) => self.members.retain(|(_, k, _)| *k != key),
        }
    }

    fn pairs(&self) -> Vec<(String, i64)> {
        self.members
            .iter()
            .map(|(_, key, value)| (key.to_string(), *value))
            .collect()
    }
}

fn apply(list: &mut PropertyList<Variable>, edit: &Edit) {
    match *edit {
        Edit::Append(key, value) => list.append(Variable::new(key, value)),
        Edit::Prepend(key, value) => list.prepend(Variable::new(key, value)),
        Edit::Insert(key, value, before) => list.insert(Variable::new(key, value), before),
        Edit::InsertAfter(key, value, after) => list.insert_after(Variable::new(key, value), after),
        Edit::Remove(key) => {
            list.remove(key);
        }
    }
}

fn pairs(list: &PropertyList<Variable>) -> Vec<(String, i64)> {
    list.map(|variable| {
        (
            variable.key.clone(),
            variable.get().as_i64().unwrap_or_default(),
        )
    })
}

proptest! {
    #[test]
    fn prop_list_matches_model(edits in prop::collection::vec(edit_strategy(), 0..60)) {
        let mut list = PropertyList::<Variable>::new();
        let mut model = Model::default();

        for edit in &edits {
            apply(&mut list, edit);
            model.apply(edit);
        }

        prop_assert_eq!(pairs(&list), model.pairs());
        prop_assert_eq!(list.count(), model.members.len());
    }

    #[test]
    fn prop_lookups_agree_with_order(edits in prop::collection::vec(edit_strategy(), 0..60)) {
        let mut list = PropertyList::<Variable>::new();
        for edit in &edits {
            apply(&mut list, edit);
        }

        for (position, variable) in list.iter().enumerate() {
            prop_assert_eq!(list.index_of(&variable.key), Some(position));
            prop_assert_eq!(list.idx(position), Some(variable));
            prop_assert_eq!(list.one(&variable.key), Some(variable));
        }

        for key in KEYS {
            let present = list.iter().any(|variable| variable.key == *key);
            prop_assert_eq!(list.has(key), present);
            prop_assert_eq!(list.all(key).len(), usize::from(present));
        }
    }

    #[test]
    fn prop_headers_group_case_insensitively(
        entries in prop::collection::vec(
            (prop::sample::select(vec!["Accept", "ACCEPT", "accept", "Cookie", "cookie"]), 0u8..10),
            0..30,
        )
    ) {
        let mut headers = PropertyList::<Header>::new();
        for (name, value) in &entries {
            headers.append(Header::new(*name, value.to_string()));
        }

        prop_assert_eq!(headers.count(), entries.len());

        for name in ["accept", "cookie"] {
            let expected: Vec<String> = entries
                .iter()
                .filter(|(entry, _)| entry.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.to_string())
                .collect();
            let found: Vec<String> = headers
                .all(&name.to_uppercase())
                .into_iter()
                .map(|header| header.value.clone())
                .collect();
            prop_assert_eq!(&found, &expected);

            let object = headers.to_object(false, false, true);
            match expected.len() {
                0 => prop_assert!(object.get(name).is_none()),
                1 => prop_assert_eq!(object.get(name), Some(&json!(expected[0]))),
                _ => prop_assert_eq!(object.get(name), Some(&json!(expected))),
            }
        }

        headers.remove("ACCEPT");
        prop_assert!(headers.iter().all(|header| !header.key.eq_ignore_ascii_case("accept")));
    }
}
