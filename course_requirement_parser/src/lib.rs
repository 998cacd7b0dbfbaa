//! Turns free-form course prerequisite text such as
//! `MATH1061 or MATH1062` into a [`Requirement`] tree, checks trees against
//! a course catalogue and renders them for diagnostics.
//!
//! Every operation here is a pure function of its inputs, so independent
//! prerequisite strings can be parsed and verified on as many threads as the
//! caller likes.

pub mod pretty;
mod requirement;
pub mod requirement_parser;
pub mod verifier;

pub use pretty::render;
pub use requirement::{CourseCode, CourseRef, InvalidCourseCode, RelationKind, Requirement};
pub use requirement_parser::{parse_requirement, ParseError, Rule};
pub use verifier::{
    verify, verify_async, AsyncCourseLookup, CourseInfo, CourseLookup, Verification,
    VerificationError, Warning,
};
