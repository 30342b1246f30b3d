//! Tests for interval-set algebra and canonical form.

use crate::interval::IntervalSet;
use crate::token::TOKEN_EOF;

fn set(pairs: &[(i32, i32)]) -> IntervalSet {
    let mut s = IntervalSet::new();
    for &(a, b) in pairs {
        s.add_range(a, b);
    }
    s
}

#[test]
fn add_coalesces_overlap_and_adjacency() {
    let mut s = IntervalSet::new();
    s.add_range(1, 3);
    s.add_range(5, 7);
    assert_eq!(s.intervals().len(), 2);

    // adjacency bridges the gap
    s.add(4);
    assert_eq!(s.intervals().len(), 1);
    assert_eq!(s.to_string(), "{1..7}");
}

#[test]
fn add_out_of_order_is_canonical() {
    let a = set(&[(10, 20), (1, 2), (5, 8)]);
    let b = set(&[(1, 2), (5, 8), (10, 20)]);
    assert_eq!(a, b);
}

#[test]
fn contains_is_exact_at_boundaries() {
    let s = set(&[(1, 3), (7, 9)]);
    assert!(s.contains(1));
    assert!(s.contains(3));
    assert!(!s.contains(4));
    assert!(!s.contains(6));
    assert!(s.contains(7));
    assert!(s.contains(9));
    assert!(!s.contains(10));
}

#[test]
fn or_covers_both_operands() {
    let a = set(&[(1, 5), (10, 12)]);
    let b = set(&[(4, 8), (20, 20)]);
    let u = a.or(&b);
    for x in -2..30 {
        assert_eq!(u.contains(x), a.contains(x) || b.contains(x), "x={x}");
    }
}

#[test]
fn and_is_intersection() {
    let a = set(&[(1, 10)]);
    let b = set(&[(5, 15), (20, 25)]);
    assert_eq!(a.and(&b), set(&[(5, 10)]));
    assert!(set(&[(1, 2)]).and(&set(&[(3, 4)])).is_empty());
}

#[test]
fn subtract_splits_intervals() {
    let a = set(&[(1, 10)]);
    let b = set(&[(4, 6)]);
    assert_eq!(a.subtract(&b), set(&[(1, 3), (7, 10)]));

    // removing the edges
    assert_eq!(a.subtract(&set(&[(1, 2), (9, 12)])), set(&[(3, 8)]));
    // removing everything
    assert!(a.subtract(&set(&[(0, 11)])).is_empty());
}

#[test]
fn complement_within_universe() {
    let s = set(&[(2, 3), (6, 6)]);
    assert_eq!(s.complement(1, 8), set(&[(1, 1), (4, 5), (7, 8)]));
}

#[test]
fn remove_single_element() {
    let mut s = set(&[(1, 3)]);
    s.remove(2);
    assert_eq!(s, set(&[(1, 1), (3, 3)]));
}

#[test]
fn min_max_elements() {
    let s = set(&[(3, 5), (9, 9)]);
    assert_eq!(s.min_element(), 3);
    assert_eq!(s.max_element(), 9);
}

#[test]
fn token_names_render_in_place_of_numbers() {
    use crate::vocabulary::Vocabulary;
    let vocab = Vocabulary::from_names(&["", "'a'", "'b'"], &["", "A", "B"]);
    let s = set(&[(1, 2)]);
    insta::assert_snapshot!(s.to_token_string(&vocab), @"{'a', 'b'}");
    insta::assert_snapshot!(IntervalSet::of(2).to_token_string(&vocab), @"'b'");
    insta::assert_snapshot!(IntervalSet::new().to_token_string(&vocab), @"{}");
}

#[test]
fn display_forms() {
    assert_eq!(IntervalSet::new().to_string(), "{}");
    assert_eq!(IntervalSet::of(5).to_string(), "5");
    assert_eq!(set(&[(1, 3), (5, 5)]).to_string(), "{1..3, 5}");
    assert_eq!(IntervalSet::of(TOKEN_EOF).to_string(), "<EOF>");
}

#[test]
fn display_round_trips() {
    let cases = [
        IntervalSet::new(),
        IntervalSet::of(5),
        IntervalSet::of(TOKEN_EOF),
        set(&[(1, 3), (5, 5), (40, 60)]),
        set(&[(-5, -3), (0, 0)]),
    ];
    for s in cases {
        let parsed: IntervalSet = s.to_string().parse().unwrap();
        assert_eq!(parsed, s, "round trip of {s}");
    }
}

#[test]
fn parse_rejects_garbage() {
    assert!("{1..}".parse::<IntervalSet>().is_err());
    assert!("{5..1}".parse::<IntervalSet>().is_err());
    assert!("pony".parse::<IntervalSet>().is_err());
}

#[test]
#[should_panic(expected = "read-only")]
fn read_only_rejects_mutation() {
    let mut s = set(&[(1, 3)]);
    s.set_read_only();
    s.add(10);
}

#[test]
fn len_counts_elements() {
    assert_eq!(set(&[(1, 3), (7, 7)]).len(), 4);
    assert_eq!(IntervalSet::new().len(), 0);
}
