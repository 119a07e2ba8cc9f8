use super::*;

#[test]
fn color_of_is_deterministic() {
    for id in ["u1", "u2", "3f1c2a9e-0000-4000-8000-000000000000", "alice"] {
        assert_eq!(color_of(id), color_of(id));
    }
}

#[test]
fn color_of_always_lands_in_palette() {
    let ids = ["ab", "zz", "00", "9f", "ÿÿ", "😀x", "user-42", "AB"];
    for id in ids {
        assert!(is_palette_color(color_of(id)), "{id} mapped outside palette");
    }
}

#[test]
fn color_of_sums_first_two_code_units() {
    // 'u' (117) + '1' (49) = 166; 166 % 8 = 6 -> cyan.
    assert_eq!(color_of("u1"), "#06b6d4");
    // 'u' (117) + '2' (50) = 167; 167 % 8 = 7 -> lime.
    assert_eq!(color_of("u2"), "#84cc16");
    // Only the first two units matter.
    assert_eq!(color_of("u1-anything"), color_of("u1"));
}

#[test]
fn color_of_guards_short_ids() {
    // 'a' (97) + 0 = 97; 97 % 8 = 1 -> red.
    assert_eq!(color_of("a"), "#ef4444");
    assert_eq!(color_of(""), PALETTE[0]);
}

#[test]
fn is_palette_color_rejects_foreign_values() {
    assert!(!is_palette_color("#000000"));
    assert!(!is_palette_color("blue"));
}
