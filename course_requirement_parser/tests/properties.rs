use course_requirement_parser::{parse_requirement, render, CourseCode, CourseRef, Requirement};
use proptest::prelude::*;

fn course_code() -> impl Strategy<Value = CourseCode> {
    "[A-Z]{3,5}[0-9]{3,4}[A-Z]?".prop_map(|s| s.parse().unwrap())
}

/// Trees the text grammar can express: no `UnitsOf`, no catalogue metadata,
/// relations with at least two children.
fn parsable_requirement() -> impl Strategy<Value = Requirement> {
    let leaf = course_code().prop_map(Requirement::course);
    leaf.prop_recursive(4, 32, 4, |inner| {
        let children = prop::collection::vec(inner, 2..5);
        prop_oneof![
            children.clone().prop_map(Requirement::all),
            children.clone().prop_map(Requirement::any),
            children.prop_map(|children| Requirement::Or {
                children,
                ambiguous: true,
            }),
        ]
    })
}

fn enriched_course() -> impl Strategy<Value = Requirement> {
    (
        course_code(),
        prop::option::of(0u8..=12),
        prop::option::of("[A-Za-z &]{1,24}"),
    )
        .prop_map(|(code, units, name)| {
            Requirement::Course(CourseRef {
                code,
                units: units.map(f64::from),
                name,
            })
        })
}

/// Any well-formed tree, including `UnitsOf` and enriched leaves.
fn requirement() -> impl Strategy<Value = Requirement> {
    enriched_course().prop_recursive(4, 32, 4, |inner| {
        let children = prop::collection::vec(inner, 1..5);
        prop_oneof![
            children.clone().prop_map(Requirement::all),
            children.clone().prop_map(Requirement::any),
            (0u32..20, children)
                .prop_map(|(threshold, children)| Requirement::units_of(threshold, children)),
        ]
    })
}

proptest! {
    #[test]
    fn text_round_trip(requirement in parsable_requirement()) {
        let text = requirement.to_string();
        prop_assert_eq!(parse_requirement(&text), Ok(requirement));
    }

    #[test]
    fn parsing_is_idempotent(requirement in parsable_requirement()) {
        let text = requirement.to_string();
        prop_assert_eq!(parse_requirement(&text), parse_requirement(&text));
    }

    #[test]
    fn serde_round_trip(requirement in requirement()) {
        let json = serde_json::to_string(&requirement).unwrap();
        let decoded: Requirement = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(render(&decoded), render(&requirement));
        prop_assert_eq!(decoded, requirement);
    }

    #[test]
    fn render_is_stable(requirement in requirement()) {
        prop_assert_eq!(render(&requirement), render(&requirement.clone()));
        prop_assert_eq!(render(&requirement).lines().count(), count_nodes(&requirement));
    }
}

fn count_nodes(requirement: &Requirement) -> usize {
    1 + requirement.children().iter().map(count_nodes).sum::<usize>()
}
