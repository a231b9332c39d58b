//! Small collection helpers

/// Flattens a list of lists into a single list, keeping order
///
/// Only nested sequences are accepted; passing a flat `Vec<T>` is a type
/// error.
pub fn flatten<T>(nested: Vec<Vec<T>>) -> Vec<T> {
    let capacity = nested.iter().map(Vec::len).sum();
    let mut flat = Vec::with_capacity(capacity);
    for inner in nested {
        flat.extend(inner);
    }
    flat
}
