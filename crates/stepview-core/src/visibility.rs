//! Per-category visibility flags and the visibility applier

use std::collections::BTreeMap;

use crate::category::Category;
use crate::registry::ObjectGroups;
use crate::surface::RenderSurface;

/// One visibility flag per category, independent of whether the category
/// currently has content. Defaults to visible.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VisibilityState {
    hidden: BTreeMap<Category, bool>,
}

impl VisibilityState {
    pub fn is_visible(&self, category: Category) -> bool {
        !self.hidden.get(&category).copied().unwrap_or(false)
    }

    pub fn set(&mut self, category: Category, visible: bool) {
        if visible {
            self.hidden.remove(&category);
        } else {
            self.hidden.insert(category, true);
        }
    }

    pub fn toggle(&mut self, category: Category) -> bool {
        let visible = !self.is_visible(category);
        self.set(category, visible);
        visible
    }

    /// Project the flags onto every live renderable.
    ///
    /// Idempotent; empty categories are skipped.
    pub fn apply<S>(&self, groups: &ObjectGroups<S::Handle>, surface: &mut S)
    where
        S: RenderSurface,
    {
        for (category, handles) in groups.iter() {
            self.apply_category(category, handles, surface);
        }
    }

    pub(crate) fn apply_category<S>(&self, category: Category, handles: &[S::Handle], surface: &mut S)
    where
        S: RenderSurface,
    {
        let visible = self.is_visible(category);
        for handle in handles {
            surface.set_visible(handle, visible);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_visible_and_toggle() {
        let mut state = VisibilityState::default();
        assert!(Category::ALL.iter().all(|c| state.is_visible(*c)));

        assert!(!state.toggle(Category::Frustums));
        assert!(!state.is_visible(Category::Frustums));
        assert!(state.is_visible(Category::Axes));

        state.set(Category::Frustums, true);
        assert_eq!(state, VisibilityState::default());
    }
}
