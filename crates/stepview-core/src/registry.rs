//! Object-group registry: the live renderables of each category

use std::collections::BTreeMap;

use tracing::debug;

use crate::category::Category;
use crate::surface::RenderSurface;

/// Exclusive owner of every live render handle, grouped by category.
///
/// Each category maps to an ordered list of handles (possibly empty). At most
/// one live set exists per category; replacing it detaches and releases the
/// previous set first.
#[derive(Debug, Clone)]
pub struct ObjectGroups<H> {
    groups: BTreeMap<Category, Vec<H>>,
}

impl<H> Default for ObjectGroups<H> {
    fn default() -> Self {
        Self {
            groups: BTreeMap::new(),
        }
    }
}

impl<H> ObjectGroups<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: Category) -> &[H] {
        self.groups.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self, category: Category) -> bool {
        self.get(category).is_empty()
    }

    /// Non-empty groups in category order
    pub fn iter(&self) -> impl Iterator<Item = (Category, &[H])> {
        self.groups.iter().map(|(c, handles)| (*c, handles.as_slice()))
    }

    /// Total number of live handles across all categories
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Replace a category's handles, releasing the previous set.
    ///
    /// Returns the number of handles released.
    pub fn set<S>(&mut self, surface: &mut S, category: Category, handles: Vec<H>) -> usize
    where
        S: RenderSurface<Handle = H>,
    {
        let released = self.clear(surface, category);
        if !handles.is_empty() {
            self.groups.insert(category, handles);
        }
        released
    }

    /// Detach and release everything in a category.
    ///
    /// Returns the number of handles released.
    pub fn clear<S>(&mut self, surface: &mut S, category: Category) -> usize
    where
        S: RenderSurface<Handle = H>,
    {
        let Some(old) = self.groups.remove(&category) else {
            return 0;
        };
        for handle in &old {
            surface.detach(handle);
        }
        let count = old.len();
        for handle in old {
            surface.release(handle);
        }
        debug!(category = %category, released = count, "Released object group");
        count
    }

    /// Release every category (viewer teardown)
    pub fn clear_all<S>(&mut self, surface: &mut S)
    where
        S: RenderSurface<Handle = H>,
    {
        for category in Category::ALL {
            self.clear(surface, category);
        }
    }
}
