//! One line per node, two spaces of indentation per level.
//!
//! ```text
//! And:
//!   CourseRef(MATH1061, 2, "Calculus & Linear Algebra I")
//!   Or:
//!     CourseRef(PHYS1001, None, None)
//!     CourseRef(PHYS1002, None, None)
//! ```

use crate::requirement::{CourseRef, Requirement};

pub fn render(requirement: &Requirement) -> String {
    let mut lines = Vec::new();
    render_lines(requirement, 0, &mut lines);
    lines.join("\n")
}

fn render_lines(requirement: &Requirement, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    let header = match requirement {
        Requirement::Course(course) => {
            lines.push(format!("{indent}{}", course_line(course)));
            return;
        }
        Requirement::And { .. } => "And:".to_owned(),
        Requirement::Or {
            ambiguous: false, ..
        } => "Or:".to_owned(),
        Requirement::Or {
            ambiguous: true, ..
        } => "Or (ambiguous):".to_owned(),
        Requirement::UnitsOf { threshold, .. } => format!("UnitsOf({threshold}):"),
    };
    lines.push(format!("{indent}{header}"));
    for child in requirement.children() {
        render_lines(child, depth + 1, lines);
    }
}

fn course_line(course: &CourseRef) -> String {
    let units = course
        .units
        .map_or_else(|| "None".to_owned(), |units| units.to_string());
    let name = course
        .name
        .as_ref()
        .map_or_else(|| "None".to_owned(), |name| format!("{name:?}"));
    format!("CourseRef({}, {units}, {name})", course.code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_requirement, CourseCode};
    use expect_test::{expect, Expect};

    #[track_caller]
    fn check(input: &str, output: Expect) {
        output.assert_eq(&render(&parse_requirement(input).unwrap()));
    }

    #[test]
    fn render_single_course() {
        check("MATH1061", expect!["CourseRef(MATH1061, None, None)"]);
    }

    #[test]
    fn render_nested_relations() {
        check(
            "MATH1061 and (PHYS1001 or (PHYS1002, PHYS1003))",
            expect![[r#"
                And:
                  CourseRef(MATH1061, None, None)
                  Or:
                    CourseRef(PHYS1001, None, None)
                    Or (ambiguous):
                      CourseRef(PHYS1002, None, None)
                      CourseRef(PHYS1003, None, None)"#]],
        );
    }

    #[test]
    fn render_units_and_metadata() {
        let code: CourseCode = "MATH1061".parse().unwrap();
        let mut course = CourseRef::new(code);
        course.units = Some(2.5);
        course.name = Some("Calculus & Linear Algebra I".to_owned());
        let requirement = Requirement::units_of(
            4,
            vec![Requirement::Course(course), Requirement::course("MATH1062".parse().unwrap())],
        );
        let rendered = render(&requirement);
        expect![[r#"
            UnitsOf(4):
              CourseRef(MATH1061, 2.5, "Calculus & Linear Algebra I")
              CourseRef(MATH1062, None, None)"#]]
        .assert_eq(&rendered);
        assert_eq!(render(&requirement), rendered);
    }
}
