//! Bounds Filter
//!
//! One pattern is authored against the largest member of a family. Smaller
//! siblings keep only the entries that fall strictly inside their extent;
//! an entry sitting exactly on the far edge is dropped.

use std::collections::BTreeMap;

use crate::features::{Extent, Pos2};

/// Keep the named positions admitted by `extent`, in identifier order.
pub fn within(positions: &BTreeMap<String, Pos2>, extent: Extent) -> BTreeMap<String, Pos2> {
    positions
        .iter()
        .filter(|(_, pos)| extent.admits(**pos))
        .map(|(id, pos)| (id.clone(), *pos))
        .collect()
}

/// Keep the unnamed positions admitted by `extent`, in input order.
pub fn retain(positions: &[Pos2], extent: Extent) -> Vec<Pos2> {
    positions
        .iter()
        .copied()
        .filter(|pos| extent.admits(*pos))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::atx_pattern;

    #[test]
    fn test_edge_is_excluded() {
        let kept = retain(
            &[Pos2::new(10.0, 1.0), Pos2::new(9.999, 1.0), Pos2::new(1.0, 10.0)],
            Extent::new(10.0, 10.0),
        );
        assert_eq!(kept, vec![Pos2::new(9.999, 1.0)]);
    }

    #[test]
    fn test_empty_result_is_valid() {
        let holes = atx_pattern().resolve();
        assert!(within(&holes, Extent::new(5.0, 5.0)).is_empty());
    }

    #[test]
    fn test_inclusion_is_monotonic_in_size() {
        let holes = atx_pattern().resolve();
        let extents = [
            Extent::new(170.0, 170.0),
            Extent::new(243.84, 243.84),
            Extent::new(305.0, 244.0),
        ];
        for pair in extents.windows(2) {
            let smaller = within(&holes, pair[0]);
            let larger = within(&holes, pair[1]);
            assert!(smaller.keys().all(|id| larger.contains_key(id)));
            assert!(smaller.len() <= larger.len());
        }
    }

    #[test]
    fn test_micro_atx_drops_right_column() {
        let kept = within(&atx_pattern().resolve(), Extent::new(243.84, 243.84));
        assert!(!kept.contains_key("A"));
        assert!(!kept.contains_key("G"));
        assert!(!kept.contains_key("K"));
        assert!(kept.contains_key("B"));
        assert!(kept.contains_key("M"));
    }
}
