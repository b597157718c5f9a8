use crate::sequence::MutationMap;

/// Returns the genetic distance between a node's accumulated state and a sample's
/// [genotype](crate::sequence::Sample::genotype).
///
/// With `n` coordinates in the state and `m` in the genotype, every genotype coordinate the state
/// also records is either identical (same base) or different:
///
/// `distance = n + m - 2 * shared_identical - shared_different`
///
/// Coordinates missing from the state are assumed to match the reference, so a sample
/// substitution there always counts towards the distance.
///
/// ```rust
/// use graft::placement::distance;
/// use graft::sequence::{MutationMap, Sample};
///
/// let state = MutationMap::from([(0, 'C'), (5, 'T')]);
/// let mut sample = Sample::new("s1");
/// assert_eq!(distance(&state, &sample.genotype()), 2);
///
/// sample.mutations = vec!["A1C".parse()?, "G4A".parse()?];
/// assert_eq!(distance(&MutationMap::new(), &sample.genotype()), 2);
///
/// // identical at position 1, 2 + 2 - 2
/// assert_eq!(distance(&state, &sample.genotype()), 2);
///
/// // different at position 6, 2 + 1 - 1
/// sample.mutations = vec!["C6G".parse()?];
/// assert_eq!(distance(&state, &sample.genotype()), 2);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn distance(state: &MutationMap, genotype: &MutationMap) -> usize {
    let (mut shared_identical, mut shared_different) = (0, 0);
    for (coord, base) in genotype {
        if let Some(state_base) = state.get(coord) {
            match state_base == base {
                true => shared_identical += 1,
                false => shared_different += 1,
            }
        }
    }

    // each coordinate is shared at most once, so this never underflows
    state.len() + genotype.len() - 2 * shared_identical - shared_different
}
