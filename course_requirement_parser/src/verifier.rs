//! Checks a requirement tree against a course catalogue.
//!
//! Verification never changes the tree it is given. It returns a copy with
//! catalogue metadata filled into the course leaves, together with the course
//! codes the catalogue did not know and any warnings about the tree.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::requirement::{CourseCode, CourseRef, RelationKind, Requirement};

/// What a catalogue knows about one course.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseInfo {
    /// `None` when the catalogue lists the course without a numeric unit value.
    pub units: Option<f64>,
    pub name: String,
}

pub trait CourseLookup {
    fn lookup(&self, code: &CourseCode) -> Option<CourseInfo>;
}

impl<T: CourseLookup + ?Sized> CourseLookup for &T {
    fn lookup(&self, code: &CourseCode) -> Option<CourseInfo> {
        (**self).lookup(code)
    }
}

impl CourseLookup for HashMap<CourseCode, CourseInfo> {
    fn lookup(&self, code: &CourseCode) -> Option<CourseInfo> {
        self.get(code).cloned()
    }
}

impl CourseLookup for BTreeMap<CourseCode, CourseInfo> {
    fn lookup(&self, code: &CourseCode) -> Option<CourseInfo> {
        self.get(code).cloned()
    }
}

/// A catalogue that has to be asked remotely. Retrying is up to the
/// implementation.
#[async_trait]
pub trait AsyncCourseLookup: Sync {
    async fn lookup(&self, code: &CourseCode) -> Option<CourseInfo>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// The resolved units of a `UnitsOf` node's course children fall short of
    /// its threshold, or none of them carry units at all.
    UnitsUnresolvable { threshold: u32, available: f64 },
    /// A comma-separated list was read as `Or`.
    AmbiguousList { children: usize },
}

impl Warning {
    /// Whether the warning makes the verification fail.
    pub fn is_blocking(&self) -> bool {
        match self {
            Warning::UnitsUnresolvable { .. } => true,
            Warning::AmbiguousList { .. } => false,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnitsUnresolvable {
                threshold,
                available,
            } => write!(
                f,
                "units_unresolvable: {threshold} units required, {available} resolvable"
            ),
            Warning::AmbiguousList { children } => write!(
                f,
                "ambiguous_list: comma-separated list of {children} read as 'or'"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub requirement: Requirement,
    pub unknown_courses: BTreeSet<CourseCode>,
    pub warnings: Vec<Warning>,
}

impl Verification {
    pub fn ok(&self) -> bool {
        self.unknown_courses.is_empty() && !self.warnings.iter().any(Warning::is_blocking)
    }
}

/// A tree that the parser could never have produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("{relation} relation has no children")]
    EmptyRelation { relation: RelationKind },
}

pub fn verify(
    requirement: &Requirement,
    catalogue: &impl CourseLookup,
) -> Result<Verification, VerificationError> {
    check_shape(requirement)?;
    let mut verifier = Verifier {
        catalogue,
        unknown_courses: BTreeSet::new(),
        warnings: Vec::new(),
    };
    let requirement = verifier.visit(requirement);
    Ok(Verification {
        requirement,
        unknown_courses: verifier.unknown_courses,
        warnings: verifier.warnings,
    })
}

/// Like [`verify`], for catalogues behind an async interface. Every course
/// leaf is looked up exactly once, in pre-order, before the tree is walked.
pub async fn verify_async(
    requirement: &Requirement,
    catalogue: &dyn AsyncCourseLookup,
) -> Result<Verification, VerificationError> {
    check_shape(requirement)?;
    let mut answers = VecDeque::new();
    for code in requirement.course_codes() {
        answers.push_back(catalogue.lookup(code).await);
    }
    verify(requirement, &Answered(RefCell::new(answers)))
}

fn check_shape(requirement: &Requirement) -> Result<(), VerificationError> {
    if let Some(relation) = requirement.relation_kind() {
        if requirement.children().is_empty() {
            return Err(VerificationError::EmptyRelation { relation });
        }
    }
    requirement.children().iter().try_for_each(check_shape)
}

/// Replays lookups that were already answered, in the order the verifier asks.
struct Answered(RefCell<VecDeque<Option<CourseInfo>>>);

impl CourseLookup for Answered {
    fn lookup(&self, _code: &CourseCode) -> Option<CourseInfo> {
        self.0.borrow_mut().pop_front().flatten()
    }
}

struct Verifier<'a, L> {
    catalogue: &'a L,
    unknown_courses: BTreeSet<CourseCode>,
    warnings: Vec<Warning>,
}

impl<L: CourseLookup> Verifier<'_, L> {
    fn visit(&mut self, requirement: &Requirement) -> Requirement {
        match requirement {
            Requirement::Course(course) => Requirement::Course(self.visit_course(course)),
            Requirement::And { children } => Requirement::And {
                children: self.visit_children(children),
            },
            Requirement::Or {
                children,
                ambiguous,
            } => {
                let children = self.visit_children(children);
                if *ambiguous {
                    self.warnings.push(Warning::AmbiguousList {
                        children: children.len(),
                    });
                }
                Requirement::Or {
                    children,
                    ambiguous: *ambiguous,
                }
            }
            Requirement::UnitsOf {
                children,
                threshold,
            } => {
                let children = self.visit_children(children);
                self.check_units(&children, *threshold);
                Requirement::UnitsOf {
                    children,
                    threshold: *threshold,
                }
            }
        }
    }

    fn visit_children(&mut self, children: &[Requirement]) -> Vec<Requirement> {
        children.iter().map(|child| self.visit(child)).collect()
    }

    fn visit_course(&mut self, course: &CourseRef) -> CourseRef {
        let mut course = course.clone();
        match self.catalogue.lookup(&course.code) {
            Some(info) => {
                if course.units.is_none() {
                    course.units = info.units;
                }
                if course.name.is_none() {
                    course.name = Some(info.name);
                }
            }
            None => {
                debug!(code = %course.code, "course not in catalogue");
                self.unknown_courses.insert(course.code.clone());
            }
        }
        course
    }

    // Only direct course children count; a nested relation has no single unit
    // total.
    fn check_units(&mut self, children: &[Requirement], threshold: u32) {
        let units: Vec<f64> = children
            .iter()
            .filter_map(|child| match child {
                Requirement::Course(course) => course.units,
                _ => None,
            })
            .collect();
        let available: f64 = units.iter().sum();
        if units.is_empty() || available < f64::from(threshold) {
            debug!(threshold, available, "unit threshold cannot be resolved");
            self.warnings.push(Warning::UnitsUnresolvable {
                threshold,
                available,
            });
        }
    }
}
