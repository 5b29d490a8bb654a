//! Longest increasing subsequence used to minimise moves in keyed lists.

/// Marks the entries of `sources` that form a longest strictly increasing subsequence.
///
/// `sources[i]` is the old position of the entry now at position `i`, or `None` for a
/// new entry. Entries marked `true` keep their relative order and need not move.
/// Runs in O(n log n).
pub(crate) fn longest_increasing_subsequence(sources: &[Option<usize>]) -> Vec<bool> {
	let mut stable = vec![false; sources.len()];
	// tails[k]: index of the smallest tail of an increasing run of length k + 1
	let mut tails: Vec<usize> = Vec::new();
	let mut tail_values: Vec<usize> = Vec::new();
	let mut predecessors: Vec<Option<usize>> = vec![None; sources.len()];

	for (i, source) in sources.iter().enumerate() {
		let Some(value) = *source else { continue };
		let position = tail_values.partition_point(|&tail| tail < value);
		if position > 0 {
			predecessors[i] = Some(tails[position - 1]);
		}
		if position == tails.len() {
			tails.push(i);
			tail_values.push(value);
		} else {
			tails[position] = i;
			tail_values[position] = value;
		}
	}

	let mut cursor = tails.last().copied();
	while let Some(i) = cursor {
		stable[i] = true;
		cursor = predecessors[i];
	}
	stable
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn stable_values(sources: &[Option<usize>]) -> Vec<usize> {
		longest_increasing_subsequence(sources)
			.iter()
			.zip(sources)
			.filter_map(|(stable, source)| if *stable { *source } else { None })
			.collect()
	}

	#[rstest]
	#[case(vec![Some(0), Some(1), Some(2)], vec![0, 1, 2])]
	#[case(vec![Some(2), Some(1), Some(0)], vec![0])]
	#[case(vec![Some(1), Some(2), Some(0)], vec![1, 2])]
	#[case(vec![None, Some(0), None, Some(1)], vec![0, 1])]
	#[case(vec![Some(3), Some(0), Some(1), Some(4), Some(2)], vec![0, 1, 2])]
	#[case(vec![], vec![])]
	fn test_longest_increasing_subsequence(
		#[case] sources: Vec<Option<usize>>,
		#[case] expected: Vec<usize>,
	) {
		assert_eq!(stable_values(&sources), expected);
	}

	#[rstest]
	fn test_new_entries_are_never_stable() {
		let stable = longest_increasing_subsequence(&[None, None]);
		assert_eq!(stable, vec![false, false]);
	}
}
