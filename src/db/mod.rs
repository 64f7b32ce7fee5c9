//! Persistence seam. Services talk to a `dyn Store`; production wires in
//! [`pg::PgStore`], tests an in-memory store with the same semantics.

pub mod pg;

#[cfg(test)]
pub mod memory;

use crate::catalog::repo::CatalogRepo;
use crate::memberships::repo::MembershipRepo;
use crate::recipes::repo::RecipeRepo;
use crate::shopping_list::repo::ShoppingListRepo;

pub trait Store: CatalogRepo + RecipeRepo + MembershipRepo + ShoppingListRepo {}

impl<T> Store for T where T: CatalogRepo + RecipeRepo + MembershipRepo + ShoppingListRepo {}
