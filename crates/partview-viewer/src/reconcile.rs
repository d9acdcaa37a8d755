//! Merge persisted part metadata into freshly indexed parts.

use partview_core::{Part, PartMeta, PartsMeta};

/// Applies stored [`PartMeta`] entries to a part list.
pub struct MetaReconciler;

impl MetaReconciler {
    /// Return a new part list of the same length with every matching entry
    /// applied field by field. Parts without an entry pass through unchanged.
    pub fn reconcile(parts: &[Part], meta: &PartsMeta) -> Vec<Part> {
        parts
            .iter()
            .map(|part| match meta.get(&part.id) {
                Some(entry) => Self::apply_entry(part, entry),
                None => part.clone(),
            })
            .collect()
    }

    /// Overlay one entry. A missing field, an empty name, a malformed color or
    /// an unknown preset keeps the part's current value.
    pub fn apply_entry(part: &Part, entry: &PartMeta) -> Part {
        let mut merged = part.clone();
        if let Some(name) = entry.name.as_deref().filter(|n| !n.trim().is_empty()) {
            merged.name = name.to_string();
        }
        if let Some(notes) = &entry.notes {
            merged.notes = notes.clone();
        }
        if let Some(color) = entry.parsed_color() {
            merged.color = color;
        }
        if let Some(preset) = entry.parsed_preset() {
            merged.material_preset = preset;
        }
        merged
    }
}
