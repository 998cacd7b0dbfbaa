use std::borrow::Borrow;
use std::fmt::{self, Write};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::requirement_parser::patterns;

/// A course identifier such as `MATH1061` or `CHEM1100A`.
///
/// Three to five uppercase letters, three or four digits and an optional
/// trailing uppercase letter. Every way of building one checks the shape,
/// including deserialization.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CourseCode(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0:?} is not a course code")]
pub struct InvalidCourseCode(pub String);

impl CourseCode {
    /// Callers must have matched `s` against the course code pattern already.
    pub(crate) fn new_unchecked(s: &str) -> CourseCode {
        debug_assert!(patterns::is_course_code(s), "{s:?}");
        CourseCode(s.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CourseCode {
    type Err = InvalidCourseCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if patterns::is_course_code(s) {
            Ok(CourseCode(s.to_owned()))
        } else {
            Err(InvalidCourseCode(s.to_owned()))
        }
    }
}

impl TryFrom<String> for CourseCode {
    type Error = InvalidCourseCode;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if patterns::is_course_code(&s) {
            Ok(CourseCode(s))
        } else {
            Err(InvalidCourseCode(s))
        }
    }
}

impl From<CourseCode> for String {
    fn from(code: CourseCode) -> String {
        code.0
    }
}

impl Borrow<str> for CourseCode {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CourseCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CourseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for CourseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A leaf naming one course.
///
/// `units` and `name` are never filled in by the parser. Verification copies
/// them from the catalogue when it knows the course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRef {
    pub code: CourseCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl CourseRef {
    pub fn new(code: CourseCode) -> CourseRef {
        CourseRef {
            code,
            units: None,
            name: None,
        }
    }
}

// Units compare by bit pattern so that equality agrees with `Hash`.
impl PartialEq for CourseRef {
    fn eq(&self, other: &CourseRef) -> bool {
        self.code == other.code
            && self.units.map(f64::to_bits) == other.units.map(f64::to_bits)
            && self.name == other.name
    }
}

impl Eq for CourseRef {}

impl Hash for CourseRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code.hash(state);
        self.units.map(f64::to_bits).hash(state);
        self.name.hash(state);
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Requirement {
    Course(CourseRef),
    And {
        children: Vec<Requirement>,
    },
    /// `ambiguous` marks a comma-separated list. Catalogues use those for both
    /// "all of" and "one of", and they are read as `Or`.
    Or {
        children: Vec<Requirement>,
        #[serde(default, skip_serializing_if = "is_false")]
        ambiguous: bool,
    },
    /// Satisfied once the satisfied children add up to `threshold` units.
    #[serde(rename = "units")]
    UnitsOf {
        children: Vec<Requirement>,
        threshold: u32,
    },
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RelationKind {
    And,
    Or,
    UnitsOf,
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationKind::And => write!(f, "And"),
            RelationKind::Or => write!(f, "Or"),
            RelationKind::UnitsOf => write!(f, "UnitsOf"),
        }
    }
}

impl Requirement {
    pub fn course(code: CourseCode) -> Requirement {
        Requirement::Course(CourseRef::new(code))
    }

    pub fn all(children: Vec<Requirement>) -> Requirement {
        Requirement::And { children }
    }

    pub fn any(children: Vec<Requirement>) -> Requirement {
        Requirement::Or {
            children,
            ambiguous: false,
        }
    }

    pub fn units_of(threshold: u32, children: Vec<Requirement>) -> Requirement {
        Requirement::UnitsOf {
            children,
            threshold,
        }
    }

    /// `None` for course leaves.
    pub fn relation_kind(&self) -> Option<RelationKind> {
        match self {
            Requirement::Course(_) => None,
            Requirement::And { .. } => Some(RelationKind::And),
            Requirement::Or { .. } => Some(RelationKind::Or),
            Requirement::UnitsOf { .. } => Some(RelationKind::UnitsOf),
        }
    }

    pub fn children(&self) -> &[Requirement] {
        match self {
            Requirement::Course(_) => &[],
            Requirement::And { children }
            | Requirement::Or { children, .. }
            | Requirement::UnitsOf { children, .. } => children,
        }
    }

    /// Every course code in the tree, in pre-order. Repeated references are
    /// listed once per leaf.
    pub fn course_codes(&self) -> Vec<&CourseCode> {
        fn collect<'a>(requirement: &'a Requirement, codes: &mut Vec<&'a CourseCode>) {
            match requirement {
                Requirement::Course(course) => codes.push(&course.code),
                _ => {
                    for child in requirement.children() {
                        collect(child, codes);
                    }
                }
            }
        }

        let mut codes = Vec::new();
        collect(self, &mut codes);
        codes
    }
}

/// Writes the requirement back out as prerequisite text. Nested relations are
/// parenthesized, so anything but `UnitsOf` parses back to the same tree.
impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_list(
            f: &mut fmt::Formatter<'_>,
            children: &[Requirement],
            separator: &str,
        ) -> fmt::Result {
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    f.write_str(separator)?;
                }
                match child {
                    Requirement::Course(_) => write!(f, "{child}")?,
                    _ => write!(f, "({child})")?,
                }
            }
            Ok(())
        }

        match self {
            Self::Course(course) => write!(f, "{}", course.code),
            Self::And { children } => write_list(f, children, " and "),
            Self::Or {
                children,
                ambiguous,
            } => write_list(f, children, if *ambiguous { ", " } else { " or " }),
            Self::UnitsOf {
                children,
                threshold,
            } => {
                write!(f, "{threshold} units from (")?;
                write_list(f, children, ", ")?;
                f.write_char(')')
            }
        }
    }
}

impl fmt::Debug for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_args(f: &mut fmt::Formatter<'_>, args: &[Requirement]) -> fmt::Result {
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{arg:?}")?;
            }
            f.write_char(')')
        }

        match self {
            Self::Course(course) => write!(f, "{}", course.code),
            Self::And { children } => {
                write!(f, "all(")?;
                write_args(f, children)
            }
            Self::Or {
                children,
                ambiguous,
            } => {
                write!(f, "{}(", if *ambiguous { "any?" } else { "any" })?;
                write_args(f, children)
            }
            Self::UnitsOf {
                children,
                threshold,
            } => {
                write!(f, "units({threshold}; ")?;
                write_args(f, children)
            }
        }
    }
}
