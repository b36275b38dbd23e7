mod links;
mod people;

pub use links::{detach_all, linked_names, reconcile, AssociationKind, LinkTable, ReconcileChanges};
pub use people::{detach_people, reconcile_people, Cast, Person, PersonRole};
