//! Database models.

pub mod content;
pub mod course;
pub mod module;
pub mod role;
pub mod subject;
pub mod user;

pub use content::{Content, ContentItem, ContentWithItem, ItemBody, ItemKind, Renderable};
pub use course::{Course, CourseForm, CourseWithModuleCount};
pub use module::Module;
pub use role::Role;
pub use subject::{Subject, SubjectWithCourseCount};
pub use user::User;
