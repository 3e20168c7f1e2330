use gws_schemas::Entity;

/// Selection tags for one run.
///
/// An active selection partitions the control plane: only entities carrying
/// at least one selection tag are visible, and only those may be created,
/// updated or deleted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    tags: Vec<String>,
}

impl Selection {
    /// No selection: the run sees the whole control plane.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        tags.sort();
        tags.dedup();
        Self { tags }
    }

    pub fn is_active(&self) -> bool {
        !self.tags.is_empty()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Whether `entity` is inside this selection.
    pub fn admits<T: Entity>(&self, entity: &T) -> bool {
        if !self.is_active() {
            return true;
        }
        T::TAGGABLE && entity.has_any_tag(&self.tags)
    }

    /// Append every selection tag `entity` does not carry yet. Entities
    /// created by a selection run must land inside the selection, otherwise
    /// the next run would not see them and would create them again.
    pub fn apply_to<T: Entity>(&self, entity: &mut T) {
        if let Some(tags) = entity.tags_mut() {
            for t in &self.tags {
                if !tags.contains(t) {
                    tags.push(t.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gws_schemas::{Route, Service};

    #[test]
    fn inactive_selection_admits_everything() {
        let s = Selection::none();
        assert!(s.admits(&Service::default()));
    }

    #[test]
    fn apply_to_is_idempotent() {
        let sel = Selection::new(["b", "a", "a"]);
        let mut r = Route {
            tags: vec!["a".into()],
            ..Route::default()
        };
        sel.apply_to(&mut r);
        sel.apply_to(&mut r);
        assert_eq!(r.tags, vec!["a".to_string(), "b".to_string()]);
        assert!(sel.admits(&r));
    }
}
