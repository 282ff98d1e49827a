mod def;
mod field;
pub mod identity;

pub use def::{Model, ModelDef};
pub use field::{OnDelete, RelationField, RelationFieldDef, RelationKind};
pub use identity::{IdentityError, IdentityPart, ModelIdentity, ModelKey};
