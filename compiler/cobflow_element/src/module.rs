//! Contains the shared-data [`Module`]s and the [`Library`] that keeps them
//! across the translation of successive compilation units.

use std::collections::{HashMap, HashSet};

use cobflow_arena::{Arena, ID};
use getset::{CopyGetters, Getters};
use log::info;
use serde::{Deserialize, Serialize};

use crate::element::Declaration;

/// The visibility tier of a shared-data module.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
pub enum Tier {
    /// Shared by a unit and the subroutines extracted from it (`<UNIT>_DATA`).
    #[strum(to_string = "local")]
    Local,

    /// Holds the `GLOBAL` records of a unit (`<UNIT>_GLOBAL`).
    #[strum(to_string = "global")]
    Global,

    /// Holds one `EXTERNAL` record (`<RECORD>_EXTERNAL`).
    #[strum(to_string = "external")]
    External,
}

/// An includable unit holding hoisted declarations.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Getters,
    CopyGetters,
    Serialize,
    Deserialize,
)]
pub struct Module {
    /// The name of the module.
    #[get = "pub"]
    name: String,

    /// The visibility tier.
    #[get_copy = "pub"]
    tier: Tier,

    /// The declarations, in the order they were appended.
    #[get = "pub"]
    declarations: Vec<Declaration>,

    /// `true` once the unit that created the module finished.
    #[get_copy = "pub"]
    sealed: bool,
}

/// A declaration was appended to a module after it had been sealed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, thiserror::Error)]
#[error("the module `{name}` is sealed and cannot be extended")]
pub struct SealedModuleError {
    /// The name of the sealed module.
    pub name: String,
}

fn key(name: &str) -> String { name.trim().to_ascii_uppercase() }

/// The append-only set of shared-data modules and finished programs.
///
/// A unit either creates a module or references an existing one by name.
/// Modules created by a unit are sealed when that unit finishes, after which
/// they are never mutated again.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Library {
    modules: Arena<Module>,
    by_name: HashMap<String, ID<Module>>,
    programs: HashSet<String>,
}

impl Library {
    /// Creates an empty library.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Returns the module with the given name.
    #[must_use]
    pub fn module(&self, name: &str) -> Option<&Module> {
        self.by_name.get(&key(name)).map(|id| &self.modules[*id])
    }

    /// Returns the ID of the module with the given name.
    #[must_use]
    pub fn id(&self, name: &str) -> Option<ID<Module>> {
        self.by_name.get(&key(name)).copied()
    }

    /// Returns every module, in creation order.
    pub fn modules(&self) -> impl ExactSizeIterator<Item = &Module> {
        self.modules.items()
    }

    /// Returns the module with the given name, creating it if it doesn't exist
    /// yet. The flag is `true` if the module was created.
    pub fn get_or_create(
        &mut self,
        name: &str,
        tier: Tier,
    ) -> (ID<Module>, bool) {
        if let Some(id) = self.by_name.get(&key(name)) {
            return (*id, false);
        }

        let id = self.modules.insert(Module {
            name: name.to_owned(),
            tier,
            declarations: Vec::new(),
            sealed: false,
        });
        self.by_name.insert(key(name), id);

        info!("created the {tier} module `{name}`");

        (id, true)
    }

    /// Appends a declaration to the module.
    ///
    /// # Errors
    ///
    /// Returns [`SealedModuleError`] if the module was sealed.
    ///
    /// # Panics
    ///
    /// Panics if `id` doesn't belong to this library.
    pub fn append(
        &mut self,
        id: ID<Module>,
        declaration: Declaration,
    ) -> Result<(), SealedModuleError> {
        let module = &mut self.modules[id];

        if module.sealed {
            return Err(SealedModuleError { name: module.name.clone() });
        }

        module.declarations.push(declaration);
        Ok(())
    }

    /// Seals the module; it can't be extended afterwards.
    pub fn seal(&mut self, id: ID<Module>) {
        if let Some(module) = self.modules.get_mut(id) {
            module.sealed = true;
        }
    }

    /// Records that a program unit of the given name has been translated.
    pub fn register_program(&mut self, name: &str) {
        self.programs.insert(key(name));
    }

    /// Returns `true` if a program unit of the given name has been translated.
    #[must_use]
    pub fn has_program(&self, name: &str) -> bool {
        self.programs.contains(&key(name))
    }
}
