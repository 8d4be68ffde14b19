//! Next/previous resolution over an ordered play list.
//!
//! Wraparound is circular in both directions. A current id that is not in
//! the list resolves to nothing rather than to a guessed position.

use crate::error::QueueMiss;

/// Step direction through a play list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Resolve the index that follows `current_id` in `list` in `direction`.
///
/// `id_of` extracts the identifier of an entry, so the same function works over
/// tracks, ids, or any other entry type.
pub fn resolve<T, F>(
    list: &[T],
    current_id: &str,
    direction: Direction,
    id_of: F,
) -> Result<usize, QueueMiss>
where
    F: Fn(&T) -> &str,
{
    let len = list.len();
    if len == 0 {
        return Err(QueueMiss::Empty);
    }

    let index = list
        .iter()
        .position(|entry| id_of(entry) == current_id)
        .ok_or(QueueMiss::NotFound)?;

    Ok(match direction {
        Direction::Next => (index + 1) % len,
        Direction::Previous => (index + len - 1) % len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn step(list: &[String], current: &str, direction: Direction) -> Result<usize, QueueMiss> {
        resolve(list, current, direction, |s: &String| s.as_str())
    }

    #[test]
    fn next_wraps_to_first() {
        let list = ids(&["a", "b", "c"]);
        assert_eq!(step(&list, "c", Direction::Next), Ok(0));
        assert_eq!(step(&list, "a", Direction::Next), Ok(1));
    }

    #[test]
    fn previous_wraps_to_last() {
        let list = ids(&["a", "b", "c"]);
        assert_eq!(step(&list, "a", Direction::Previous), Ok(2));
        assert_eq!(step(&list, "c", Direction::Previous), Ok(1));
    }

    #[test]
    fn single_entry_resolves_to_itself() {
        let list = ids(&["solo"]);
        assert_eq!(step(&list, "solo", Direction::Next), Ok(0));
        assert_eq!(step(&list, "solo", Direction::Previous), Ok(0));
    }

    #[test]
    fn empty_list_is_a_miss() {
        let list: Vec<String> = Vec::new();
        assert_eq!(step(&list, "a", Direction::Next), Err(QueueMiss::Empty));
    }

    #[test]
    fn unknown_current_is_not_guessed() {
        let list = ids(&["a", "b"]);
        assert_eq!(step(&list, "zzz", Direction::Next), Err(QueueMiss::NotFound));
        assert_eq!(
            step(&list, "zzz", Direction::Previous),
            Err(QueueMiss::NotFound)
        );
    }

    #[test]
    fn first_match_wins_for_duplicates() {
        let list = ids(&["a", "b", "a", "c"]);
        assert_eq!(step(&list, "a", Direction::Next), Ok(1));
    }
}
