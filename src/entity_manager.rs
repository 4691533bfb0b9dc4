//! Holder exposing a table's CRUD object to repository code.

use crate::crud::{Crud, CrudOps};

/// Wraps exactly one [`CrudOps`] implementation.
#[derive(Debug)]
pub struct EntityManager<C = Crud> {
    crud: C,
}

impl<C: CrudOps> EntityManager<C> {
    pub fn new(crud: C) -> Self {
        Self { crud }
    }

    pub fn crud(&self) -> &C {
        &self.crud
    }

    pub fn crud_mut(&mut self) -> &mut C {
        &mut self.crud
    }

    pub fn into_crud(self) -> C {
        self.crud
    }
}
