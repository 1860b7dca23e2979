//! Path-addressed reads and writes over the JSON metadata tree.

use serde_json::{Map, Value as Json};

pub fn get_in<'a, S: AsRef<str>>(tree: &'a Json, path: &[S]) -> Option<&'a Json> {
    path.iter()
        .try_fold(tree, |node, key| node.as_object()?.get(key.as_ref()))
}

/// Returns a copy of `tree` with `value` stored at `path`, creating objects along the way.
/// A non-object met on the path is replaced by an object.
pub fn set_in<S: AsRef<str>>(tree: &Json, path: &[S], value: Json) -> Json {
    let mut next = tree.clone();
    set_in_place(&mut next, path, value);
    next
}

pub fn set_in_place<S: AsRef<str>>(tree: &mut Json, path: &[S], value: Json) {
    let Some((last, parents)) = path.split_last() else {
        *tree = value;
        return;
    };
    let mut node = tree;
    for key in parents {
        node = ensure_object(node)
            .entry(key.as_ref().to_string())
            .or_insert_with(|| Json::Object(Map::new()));
    }
    ensure_object(node).insert(last.as_ref().to_string(), value);
}

/// Deep-merges `other` into `base`: objects merge key by key, anything else overwrites.
pub fn merge_deep(base: &mut Json, other: Json) {
    match (base, other) {
        (Json::Object(left), Json::Object(right)) => {
            for (key, value) in right {
                match left.get_mut(&key) {
                    Some(existing) => merge_deep(existing, value),
                    None => {
                        left.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Replaces any non-object with an empty object.
fn ensure_object(node: &mut Json) -> &mut Map<String, Json> {
    match node {
        Json::Object(map) => map,
        other => {
            *other = Json::Object(Map::new());
            ensure_object(other)
        }
    }
}
