//! Longest increasing subsequence.
//!
//! The keyed diff records, for every slot of the unresolved window of the new
//! list, where that node sat in the old list (`0` for a fresh node, otherwise
//! old index + 1). The longest strictly increasing run of those positions is
//! the largest set of nodes whose relative order is already right; every
//! other matched node has to move.
//!
//! # Algorithm
//!
//! Patience sorting in O(n log n):
//!
//! 1. `tails[k]` holds the index of the smallest value that ends an
//!    increasing run of length `k + 1` seen so far.
//! 2. Each value either extends the longest run or replaces the first tail
//!    that is not smaller than it (binary search).
//! 3. `predecessors[i]` remembers the tail before `i` at the time `i` was
//!    placed; walking it back from the last tail rebuilds one longest run.

/// Indices (ascending) of a longest strictly increasing subsequence of
/// `positions`, ignoring zero entries.
pub fn longest_increasing_subsequence(positions: &[usize]) -> Vec<usize> {
    let mut predecessors = vec![0usize; positions.len()];
    let mut tails: Vec<usize> = Vec::new();

    for (i, &value) in positions.iter().enumerate() {
        if value == 0 {
            continue;
        }

        match tails.last() {
            None => {
                tails.push(i);
                continue;
            }
            Some(&last) if positions[last] < value => {
                predecessors[i] = last;
                tails.push(i);
                continue;
            }
            Some(_) => {}
        }

        let slot = tails.partition_point(|&tail| positions[tail] < value);
        if value < positions[tails[slot]] {
            if slot > 0 {
                predecessors[i] = tails[slot - 1];
            }
            tails[slot] = i;
        }
    }

    let mut len = tails.len();
    let Some(&last) = tails.last() else {
        return tails;
    };
    let mut cursor = last;
    while len > 0 {
        len -= 1;
        tails[len] = cursor;
        cursor = predecessors[cursor];
    }
    tails
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(positions: &[usize], indices: &[usize]) -> Vec<usize> {
        indices.iter().map(|&i| positions[i]).collect()
    }

    #[test]
    fn empty_and_all_fresh() {
        assert!(longest_increasing_subsequence(&[]).is_empty());
        assert!(longest_increasing_subsequence(&[0, 0, 0]).is_empty());
    }

    #[test]
    fn already_sorted_keeps_everything() {
        let positions = [1, 2, 3, 4];
        assert_eq!(longest_increasing_subsequence(&positions), vec![0, 1, 2, 3]);
    }

    #[test]
    fn single_node_moved_back() {
        // old [2,3,4] became new [3,4,2]
        let positions = [3, 4, 2];
        assert_eq!(longest_increasing_subsequence(&positions), vec![0, 1]);
    }

    #[test]
    fn zeros_are_skipped() {
        let positions = [0, 5, 0, 3, 4, 0, 6];
        let lis = longest_increasing_subsequence(&positions);
        assert_eq!(values(&positions, &lis), vec![3, 4, 6]);
    }

    #[test]
    fn reversed_keeps_one() {
        let positions = [5, 4, 3, 2, 1];
        assert_eq!(longest_increasing_subsequence(&positions).len(), 1);
    }

    #[test]
    fn classic_sequence() {
        let positions = [2, 3, 1, 5, 6, 8, 7, 9, 4];
        let lis = longest_increasing_subsequence(&positions);
        assert_eq!(values(&positions, &lis), vec![2, 3, 5, 6, 7, 9]);
    }
}
