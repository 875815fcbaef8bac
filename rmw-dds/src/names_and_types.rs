use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Result, RmwError};

/// Names, each with the set of types seen under it.
///
/// `names[i]` pairs with `types[i]`. A container handed to a query must be
/// zero-initialized: no entries and no backing storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamesAndTypes {
    pub names: Vec<String>,
    pub types: Vec<Vec<String>>,
}

impl NamesAndTypes {
    pub fn zero_initialized() -> Self {
        Self::default()
    }

    pub fn is_zero_initialized(&self) -> bool {
        self.names.is_empty()
            && self.types.is_empty()
            && self.names.capacity() == 0
            && self.types.capacity() == 0
    }

    pub fn check_zero(&self) -> Result<()> {
        if self.is_zero_initialized() {
            Ok(())
        } else {
            Err(RmwError::invalid_argument(
                "names_and_types is not zero initialized",
            ))
        }
    }

    /// Reserves room for `size` entries.
    pub fn init(&mut self, size: usize) -> Result<()> {
        self.check_zero()?;
        self.names
            .try_reserve_exact(size)
            .and_then(|_| self.types.try_reserve_exact(size))
            .map_err(|_| {
                self.fini();
                RmwError::resource_exhausted("failed to allocate memory for names and types")
            })
    }

    /// Returns the container to its zero-initialized state.
    pub fn fini(&mut self) {
        self.names = Vec::new();
        self.types = Vec::new();
    }

    /// Fills a zero-initialized container from an ordered name -> types map.
    pub fn fill_from(&mut self, entries: BTreeMap<String, BTreeSet<String>>) -> Result<()> {
        self.init(entries.len())?;
        for (name, types) in entries {
            self.names.push(name);
            self.types.push(types.into_iter().collect());
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.types[i].as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.names
            .iter()
            .zip(&self.types)
            .map(|(n, t)| (n.as_str(), t.as_slice()))
    }
}
