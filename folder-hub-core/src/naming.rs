//! Sibling-aware folder name generation.

use std::collections::HashSet;

/// Return `base` if no sibling uses it, else `"base (n)"` for the first
/// free `n` starting at 1.
pub fn generate_unique_child_name<'a, I>(sibling_names: I, base: &str) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: HashSet<&str> = sibling_names.into_iter().collect();
    if !taken.contains(base) {
        return base.to_string();
    }
    let mut n = 1u32;
    loop {
        let candidate = format!("{} ({})", base, n);
        if !taken.contains(candidate.as_str()) {
            return candidate;
        }
        n += 1;
    }
}
