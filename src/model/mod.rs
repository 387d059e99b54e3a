//! Structural model: language-agnostic descriptions of declared types.
//!
//! Descriptions are plain owned values. Services clone them freely; the cache
//! keeps its own copies so edits never leak into what queries see.

pub mod members;
pub mod types;

pub use members::{
    EventDescription, FieldDescription, Member, MemberCollection, MemberItem, MemberKind,
    MethodDescription, Parameter, PropertyDescription,
};
pub use types::{TypeDescription, TypeKind, TypeModifiers, Visibility};
