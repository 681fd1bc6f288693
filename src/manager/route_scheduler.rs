//! Cost based insertion of stops into an elevator's stop list.
//!
//! The cost of a stop sequence is the distance travelled visiting the stops in order,
//! starting from the elevator's current floor:
//!
//! ```text
//! cost = |s0 - current| + |s1 - s0| + ... + |sn - sn-1|
//! ```
//!
//! A new stop (or pickup/drop-off pair) is tried at every position of the existing list and
//! put where the cost is lowest. The first minimum in scan order wins, so a tie goes to the
//! lower index (for pairs: lower pickup index, then lower drop index).
//!
//! Each insertion is only locally optimal. Earlier stops are never moved.
//!
//! # Example
//! ```
//! use liftdispatch::manager::route_scheduler::{insert_pair, route_cost};
//! use liftdispatch::model::Stop;
//!
//! let mut stops = vec![Stop::pickup(1, 3, 1), Stop::dropoff(2, 7, 1)];
//! let (p, d) = Stop::pair((3, 4), 5, 2, 1, 9);
//! let (i, j) = insert_pair(1, &mut stops, p, d);
//! assert!(i < j);
//! assert!(route_cost(1, &stops) <= 14);
//! ```

use crate::model::{Direction, Stop};

/// Distance travelled from `current_floor` through `floors` in order.
fn floors_cost(current_floor: i32, floors: impl IntoIterator<Item = i32>) -> u64 {
    let mut prev = current_floor;
    let mut cost: u64 = 0;
    for floor in floors {
        cost += u64::from(floor.abs_diff(prev));
        prev = floor;
    }
    cost
}

/// Total travel distance of visiting `stops` in order from `current_floor`.
pub fn route_cost(current_floor: i32, stops: &[Stop]) -> u64 {
    floors_cost(current_floor, stops.iter().map(|s| s.floor))
}

/// Cost of the sequence `stops` with `floor` spliced in at `index`.
fn cost_with(current_floor: i32, stops: &[i32], floor: i32, index: usize) -> u64 {
    let candidate = stops[..index]
        .iter()
        .copied()
        .chain(std::iter::once(floor))
        .chain(stops[index..].iter().copied());
    floors_cost(current_floor, candidate)
}

/// Index at which `floor` is cheapest to visit. Lowest index on a tie.
pub fn best_insert_index(current_floor: i32, stops: &[Stop], floor: i32) -> usize {
    if stops.is_empty() {
        return 0;
    }
    let floors: Vec<i32> = stops.iter().map(|s| s.floor).collect();

    let mut best = (0, u64::MAX);
    for i in 0..=floors.len() {
        let cost = cost_with(current_floor, &floors, floor, i);
        if cost < best.1 {
            best = (i, cost);
        }
    }
    best.0
}

/// Pickup and drop-off indices (in the final list) that minimise the route cost.
///
/// The pickup index is searched in `[min_index, n]`, the drop index in `(i, n + 1]`.
/// The first minimum in row-major order wins.
pub fn best_pair_indices(
    current_floor: i32,
    stops: &[Stop],
    pickup_floor: i32,
    drop_floor: i32,
    min_index: usize,
) -> (usize, usize) {
    let n = stops.len();
    let start = min_index.min(n);
    if n == 0 {
        return (0, 1);
    }
    let floors: Vec<i32> = stops.iter().map(|s| s.floor).collect();

    let mut best = ((start, start + 1), u64::MAX);
    let mut with_pickup = Vec::with_capacity(n + 1);
    for i in start..=n {
        with_pickup.clear();
        with_pickup.extend_from_slice(&floors[..i]);
        with_pickup.push(pickup_floor);
        with_pickup.extend_from_slice(&floors[i..]);

        for j in (i + 1)..=(n + 1) {
            let cost = cost_with(current_floor, &with_pickup, drop_floor, j);
            if cost < best.1 {
                best = ((i, j), cost);
            }
        }
    }
    best.0
}

/// Inserts a single stop where it adds the least travel. Returns its index.
pub fn insert(current_floor: i32, stops: &mut Vec<Stop>, stop: Stop) -> usize {
    if stops.is_empty() {
        stops.push(stop);
        return 0;
    }
    let index = best_insert_index(current_floor, stops, stop.floor);
    stops.insert(index, stop);
    index
}

/// Inserts a pickup and its drop-off, pickup first. Returns their indices.
pub fn insert_pair(current_floor: i32, stops: &mut Vec<Stop>, pickup: Stop, drop: Stop) -> (usize, usize) {
    insert_pair_from(current_floor, stops, pickup, drop, 0)
}

/// Like [insert_pair], but the pickup is never placed before `min_index`.
///
/// Used to requeue riders that did not fit in the car, so their new pickup lands after
/// the stop that frees room for them.
pub fn insert_pair_from(
    current_floor: i32,
    stops: &mut Vec<Stop>,
    pickup: Stop,
    drop: Stop,
    min_index: usize,
) -> (usize, usize) {
    if stops.is_empty() {
        stops.push(pickup);
        stops.push(drop);
        return (0, 1);
    }
    let (i, j) = best_pair_indices(current_floor, stops, pickup.floor, drop.floor, min_index);
    stops.insert(i, pickup);
    stops.insert(j, drop);
    (i, j)
}

/// Direction an idle elevator at `current_floor` should start in to serve `stops`.
///
/// The first stop on another floor decides. With every stop on the current floor the
/// elevator is still busy, so [Direction::Up] is used rather than idle.
/// Returns [Direction::Idle] only for an empty list.
pub fn initial_direction(current_floor: i32, stops: &[Stop]) -> Direction {
    if stops.is_empty() {
        return Direction::Idle;
    }
    stops
        .iter()
        .map(|s| Direction::towards(current_floor, s.floor))
        .find(|d| *d != Direction::Idle)
        .unwrap_or(Direction::Up)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stops_at(floors: &[i32]) -> Vec<Stop> {
        floors
            .iter()
            .enumerate()
            .map(|(i, f)| Stop::pickup(100 + i as u64, *f, 1))
            .collect()
    }

    fn floors(stops: &[Stop]) -> Vec<i32> {
        stops.iter().map(|s| s.floor).collect()
    }

    #[test]
    fn cost_is_distance_from_current_floor() {
        assert_eq!(route_cost(1, &stops_at(&[3, 7, 5, 2])), 2 + 4 + 2 + 3);
        assert_eq!(route_cost(4, &[]), 0);
        assert_eq!(route_cost(0, &stops_at(&[-2, 2])), 6);
    }

    #[test]
    fn empty_list_appends() {
        let mut stops = Vec::new();
        assert_eq!(insert(5, &mut stops, Stop::pickup(1, 0, 1)), 0);
        let mut stops = Vec::new();
        let (p, d) = Stop::pair((1, 2), 3, 1, 1, 1);
        assert_eq!(insert_pair(9, &mut stops, p, d), (0, 1));
        assert_eq!(floors(&stops), vec![3, 1]);
    }

    #[test]
    fn single_insert_is_minimal_over_every_index() {
        let cases: &[(i32, &[i32], i32)] = &[
            (0, &[5, 1, 9], 3),
            (4, &[2, 8], 6),
            (10, &[0, 10, 3, 7], 5),
            (-3, &[4, -1], 0),
            (2, &[2, 2, 2], 2),
        ];
        for (current, existing, floor) in cases {
            let base = stops_at(existing);
            let mut stops = base.clone();
            let chosen = insert(*current, &mut stops, Stop::pickup(1, *floor, 1));
            let chosen_cost = route_cost(*current, &stops);

            for i in 0..=base.len() {
                let mut other = base.clone();
                other.insert(i, Stop::pickup(1, *floor, 1));
                let cost = route_cost(*current, &other);
                assert!(chosen_cost <= cost, "index {} beats chosen {}", i, chosen);
                if cost == chosen_cost {
                    assert!(chosen <= i, "tie must go to the lowest index");
                }
            }
        }
    }

    #[test]
    fn tie_goes_to_lowest_index() {
        // Every position costs the same when all floors are equal
        let mut stops = stops_at(&[4, 4]);
        assert_eq!(insert(4, &mut stops, Stop::pickup(1, 4, 1)), 0);
    }

    #[test]
    fn pair_keeps_pickup_before_drop() {
        let cases: &[(i32, &[i32], i32, i32)] = &[
            (1, &[3, 7], 5, 2),
            (0, &[], 0, 5),
            (6, &[0, 9], 9, 0),
            (3, &[3], 3, 3),
            (2, &[8, 1, 5], 4, 4),
        ];
        for (current, existing, pickup, drop) in cases {
            let mut stops = stops_at(existing);
            let (p, d) = Stop::pair((1, 2), *pickup, *drop, 1, 1);
            let (i, j) = insert_pair(*current, &mut stops, p, d);
            assert!(i < j);
            let pi = stops.iter().position(|s| s.id == 1).unwrap();
            let di = stops.iter().position(|s| s.id == 2).unwrap();
            assert_eq!((pi, di), (i, j));
        }
    }

    #[test]
    fn pair_is_minimal_over_every_split() {
        let current = 1;
        let base = stops_at(&[3, 7]);
        let mut stops = base.clone();
        let (p, d) = Stop::pair((1, 2), 5, 2, 1, 1);
        let (ci, cj) = insert_pair(current, &mut stops, p.clone(), d.clone());
        let chosen = route_cost(current, &stops);

        for i in 0..=base.len() {
            for j in (i + 1)..=(base.len() + 1) {
                let mut other = base.clone();
                other.insert(i, p.clone());
                other.insert(j, d.clone());
                let cost = route_cost(current, &other);
                assert!(chosen <= cost);
                if cost == chosen {
                    assert!((ci, cj) <= (i, j));
                }
            }
        }
    }

    #[test]
    fn moving_elevator_takes_pair_on_the_way() {
        // Scenario: at floor 1 with [3, 7], a call 5 -> 2
        let mut stops = stops_at(&[3, 7]);
        let (p, d) = Stop::pair((1, 2), 5, 2, 1, 1);
        insert_pair(1, &mut stops, p, d);
        let cost = route_cost(1, &stops);
        assert!(cost <= route_cost(1, &stops_at(&[3, 7, 5, 2])));
        assert!(cost <= route_cost(1, &stops_at(&[5, 2, 3, 7])));
        assert_eq!(floors(&stops), vec![3, 5, 7, 2]);
    }

    #[test]
    fn min_index_bounds_the_pickup() {
        let mut stops = stops_at(&[2, 8, 4]);
        let (p, d) = Stop::pair((1, 2), 2, 3, 1, 1);
        let (i, j) = insert_pair_from(2, &mut stops, p, d, 2);
        assert!(i >= 2);
        assert!(j > i);

        // Past the end means append
        let mut stops = stops_at(&[2, 8]);
        let (p, d) = Stop::pair((1, 2), 2, 3, 1, 1);
        assert_eq!(insert_pair_from(2, &mut stops, p, d, 10), (2, 3));
    }

    #[test]
    fn initial_direction_skips_stops_on_current_floor() {
        assert_eq!(initial_direction(0, &stops_at(&[0, 5])), Direction::Up);
        assert_eq!(initial_direction(4, &stops_at(&[4, 1])), Direction::Down);
        assert_eq!(initial_direction(4, &stops_at(&[4, 4])), Direction::Up);
        assert_eq!(initial_direction(4, &[]), Direction::Idle);
    }
}
