//! Hold-aware planning: the most perfect clears a preview can give.

use std::cmp;
use std::collections::BTreeMap;

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::catalog::PcCatalog;
use crate::error::{Error, Result};
use crate::gameplay::Shape;
use crate::queue::{Queue, MAX_QUEUE};

/// One position in a working queue: a shape, or `None` for the virtual
/// end-of-queue marker appended after the last real piece.
///
/// The marker lets the planner spend the held piece on the final clear:
/// an order that puts the marker last is a clear that used everything,
/// leaving the hold slot empty.
type Slot = Option<Shape>;

/// A hold piece plus a window of the preview.
type Segment = SmallVec<[Slot; 9]>;

/// Every playable ordering of `segment` under a one-piece hold.
///
/// Either the front piece is played now, or it goes to the hold and the
/// second piece is played first. The two branches partition the order
/// space, so no ordering is generated twice (repeated shapes can still
/// yield equal sequences).
fn orders(segment: &[Slot]) -> Vec<Segment> {
    if segment.len() <= 1 {
        return vec![segment.iter().copied().collect()];
    }

    let mut out = Vec::new();

    for order in orders(&segment[1..]) {
        let mut played: Segment = SmallVec::new();
        played.push(segment[0]);
        played.extend(order);
        out.push(played);
    }

    let mut swapped: Segment = SmallVec::new();
    swapped.push(segment[0]);
    swapped.extend_from_slice(&segment[2..]);
    for order in orders(&swapped) {
        let mut played: Segment = SmallVec::new();
        played.push(segment[1]);
        played.extend(order);
        out.push(played);
    }

    out
}

/// Pack slots into a queue, or `None` if the end marker is among them or
/// they outrun the packed capacity.
fn pack(slots: &[Slot]) -> Option<Queue> {
    if slots.len() > MAX_QUEUE {
        return None;
    }

    let mut queue = Queue::empty();
    for &slot in slots {
        queue = queue.push_last(slot?);
    }
    Some(queue)
}

/// Which pieces `segment` can leave in the hold slot while clearing.
///
/// For every hold ordering whose first `len − 1` pieces form a catalog
/// queue, the final piece is a save, witnessed by that queue. An ordering
/// that is a catalog queue outright maps the end marker to itself: a
/// clear that needs no save. Later orderings overwrite earlier ones for
/// the same save.
pub(crate) fn saves(catalog: &PcCatalog, segment: &[Slot]) -> BTreeMap<Slot, Queue> {
    let mut saves = BTreeMap::new();

    for order in orders(segment) {
        let (&last, prefix) = order.split_last().unwrap();

        if let Some(witness) = pack(prefix) {
            if catalog.contains(witness) {
                saves.insert(last, witness);
            }
        }
        if let Some(witness) = pack(&order) {
            if catalog.contains(witness) {
                saves.insert(None, witness);
            }
        }
    }

    saves
}

/// The maximum number of perfect clears obtainable from `queue`, with the
/// catalog queues that realize them, in play order.
///
/// Dynamic program over `(consumed, held)` states. The first piece goes
/// straight to the hold slot; from each reachable state every window of
/// upcoming pieces up to the longest catalog entry is tried, and each
/// save the window admits advances the state. States holding the end
/// marker are terminal: there is no piece left to start the next clear
/// with.
pub fn max_pcs(catalog: &PcCatalog, queue: &str) -> Result<(usize, Vec<Queue>)> {
    let mut slots: Vec<Slot> = Vec::new();
    for c in queue.chars() {
        slots.push(Some(Shape::from_char(c).ok_or(Error::UnknownShape(c))?));
    }
    slots.push(None);

    type State = (usize, Slot);

    #[derive(Clone, Copy)]
    struct Entry {
        count: usize,
        predecessor: Option<State>,
        witness: Option<Queue>,
    }

    let mut dp: AHashMap<State, Entry> = AHashMap::new();
    dp.insert(
        (1, slots[0]),
        Entry {
            count: 0,
            predecessor: None,
            witness: None,
        },
    );

    let longest = catalog.longest();

    for index in 1..slots.len() {
        for &hold in &Shape::ALL {
            let state = (index, Some(hold));
            let count = match dp.get(&state) {
                Some(entry) => entry.count,
                None => continue,
            };

            let max_window = cmp::min(slots.len() - index, longest);
            for window in 1..=max_window {
                let mut segment: Segment = SmallVec::new();
                segment.push(Some(hold));
                segment.extend_from_slice(&slots[index..index + window]);

                let admitted = saves(catalog, &segment);
                for (&save, &witness) in &admitted {
                    let successor = (index + window, save);
                    let improved = dp
                        .get(&successor)
                        .map_or(true, |entry| count + 1 > entry.count);

                    if improved {
                        dp.insert(
                            successor,
                            Entry {
                                count: count + 1,
                                predecessor: Some(state),
                                witness: Some(witness),
                            },
                        );
                    }
                }
            }
        }
    }

    // Ties beyond the count are broken on the rest of the entry, so equal
    // keys reconstruct identical answers and the result is reproducible.
    let best = dp
        .values()
        .max_by_key(|entry| (entry.count, entry.predecessor, entry.witness))
        .copied()
        .expect("the initial state is always present");

    if best.count == 0 {
        return Ok((0, Vec::new()));
    }

    let mut segments = vec![best.witness.expect("counted entries carry a witness")];
    let mut state = best.predecessor.expect("counted entries have a predecessor");

    loop {
        let entry = dp[&state];
        match entry.witness {
            Some(witness) => {
                segments.push(witness);
                state = entry.predecessor.expect("witnessed entries have a predecessor");
            }
            None => break,
        }
    }

    segments.reverse();
    Ok((best.count, segments))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot_str(s: &str) -> Vec<Slot> {
        s.chars()
            .map(|c| if c == 'X' { None } else { Shape::from_char(c) })
            .collect()
    }

    fn tiny_catalog() -> PcCatalog {
        let queues = ["I", "OO", "OOOO"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        PcCatalog::from_queues(queues)
    }

    #[test]
    fn orders_partition_the_order_space() {
        let all = orders(&slot_str("IJL"));
        let strings: Vec<String> = all
            .iter()
            .map(|o| {
                o.iter()
                    .map(|slot| slot.map_or("X", Shape::name))
                    .collect()
            })
            .collect();

        assert_eq!(strings, vec!["IJL", "ILJ", "JIL", "JLI"]);

        // One binary choice per piece after the first.
        assert_eq!(orders(&slot_str("IJLS")).len(), 8);
        assert_eq!(orders(&slot_str("I")).len(), 1);
    }

    #[test]
    fn orders_can_float_the_marker_inward() {
        // The end marker is swappable like any slot; such orderings just
        // never produce catalog queues.
        let all = orders(&slot_str("OX"));
        assert_eq!(all.len(), 2);
        assert!(all.contains(&Segment::from_slice(&slot_str("XO"))));
    }

    #[test]
    fn saves_of_short_segments() {
        let catalog = tiny_catalog();

        // Hold O, window O: playing both is a clear with nothing left.
        let admitted = saves(&catalog, &slot_str("OO"));
        assert_eq!(admitted.get(&None), Some(&"OO".parse().unwrap()));

        // Hold O, window O O: clear two and keep one in hand.
        let admitted = saves(&catalog, &slot_str("OOO"));
        assert_eq!(
            admitted.get(&Some(Shape::O)),
            Some(&"OO".parse().unwrap())
        );

        // Hold I, then the end marker: the single-I clear.
        let admitted = saves(&catalog, &slot_str("IX"));
        assert_eq!(admitted.get(&None), Some(&"I".parse().unwrap()));

        // Nothing in a Z-contaminated window clears.
        assert!(saves(&catalog, &slot_str("OZ")).is_empty());
    }

    #[test]
    fn dp_counts_and_witnesses() {
        let catalog = tiny_catalog();

        assert_eq!(max_pcs(&catalog, "").unwrap(), (0, vec![]));
        assert_eq!(max_pcs(&catalog, "ZZZZ").unwrap(), (0, vec![]));

        let (count, segments) = max_pcs(&catalog, "I").unwrap();
        assert_eq!(count, 1);
        assert_eq!(segments, vec!["I".parse().unwrap()]);

        let (count, segments) = max_pcs(&catalog, "OO").unwrap();
        assert_eq!(count, 1);
        assert_eq!(segments, vec!["OO".parse().unwrap()]);

        // Two two-piece clears beat one four-piece clear.
        let (count, segments) = max_pcs(&catalog, "OOOO").unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            segments,
            vec!["OO".parse().unwrap(), "OO".parse().unwrap()]
        );

        // The Z has to be saved across the only clear.
        let (count, segments) = max_pcs(&catalog, "OZOO").unwrap();
        assert_eq!(count, 1);
        assert_eq!(segments, vec!["OO".parse().unwrap()]);

        assert!(matches!(
            max_pcs(&catalog, "OX"),
            Err(Error::UnknownShape('X'))
        ));
    }

    #[test]
    fn dp_chains_many_segments() {
        let catalog = tiny_catalog();

        let (count, segments) = max_pcs(&catalog, &"O".repeat(8)).unwrap();
        assert_eq!(count, 4);
        assert_eq!(segments.len(), 4);
        for segment in &segments {
            assert_eq!(segment.to_string(), "OO");
        }

        // Segment lengths never outrun the preview.
        let (count, segments) = max_pcs(&catalog, "OOOOO").unwrap();
        assert_eq!(count, 2);
        let total: usize = segments.iter().map(|s| s.len()).sum();
        assert!(total <= 5);
    }

    #[test]
    fn deterministic_answers() {
        let catalog = tiny_catalog();

        for queue in ["OOOO", "OOIOO", "IIII", "OZOZOO"] {
            assert_eq!(
                max_pcs(&catalog, queue).unwrap(),
                max_pcs(&catalog, queue).unwrap()
            );
        }
    }
}
