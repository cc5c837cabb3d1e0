use crate::util::entity_prefix;

/// Coarse entity classification. The numeric values match the backend's
/// category encoding and index into the attractor-center table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Protein = 1,
    Disease = 2,
    BiologicalProcess = 3,
    Chemical = 4,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Protein,
        Category::Disease,
        Category::BiologicalProcess,
        Category::Chemical,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Protein => "Proteins or Gene Products",
            Self::Disease => "Diseases",
            Self::BiologicalProcess => "Biological Process",
            Self::Chemical => "Chemicals",
        }
    }

    pub fn short_label(self) -> &'static str {
        match self {
            Self::Protein => "Protein",
            Self::Disease => "Disease",
            Self::BiologicalProcess => "Bio. Process",
            Self::Chemical => "Chemical",
        }
    }

    pub fn index(self) -> usize {
        (self as usize) - 1
    }

    pub fn from_number(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Protein),
            2 => Some(Self::Disease),
            3 => Some(Self::BiologicalProcess),
            4 => Some(Self::Chemical),
            _ => None,
        }
    }

    /// Classify an entity id by its grounding-database prefix.
    pub fn from_entity_id(id: &str) -> Option<Self> {
        match entity_prefix(id) {
            "uniprot" | "fplx" | "interpro" | "proonto" | "pfam" => Some(Self::Protein),
            "mesh" => Some(Self::Disease),
            "go" | "frailty" => Some(Self::BiologicalProcess),
            "pubchem" | "chebi" => Some(Self::Chemical),
            _ => None,
        }
    }
}

/// Sign of a reported relationship between two entities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Polarity {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Polarity {
    /// Backend polarity labels are free-form; anything that is not
    /// recognizably positive or negative counts as neutral.
    pub fn from_label(label: &str) -> Self {
        let label = label.to_ascii_lowercase();
        if label.starts_with("positive") || label.ends_with("(positive)") {
            Self::Positive
        } else if label.starts_with("negative") || label.ends_with("(negative)") {
            Self::Negative
        } else {
            Self::Neutral
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_from_prefix() {
        assert_eq!(
            Category::from_entity_id("uniprot:P05231"),
            Some(Category::Protein)
        );
        assert_eq!(
            Category::from_entity_id("mesh_D000077"),
            Some(Category::Disease)
        );
        assert_eq!(
            Category::from_entity_id("go:GO:0006954"),
            Some(Category::BiologicalProcess)
        );
        assert_eq!(
            Category::from_entity_id("chebi:CHEBI:15377"),
            Some(Category::Chemical)
        );
        assert_eq!(Category::from_entity_id("unknown:X"), None);
    }

    #[test]
    fn polarity_labels() {
        assert_eq!(Polarity::from_label("Positive"), Polarity::Positive);
        assert_eq!(
            Polarity::from_label("negative_association"),
            Polarity::Negative
        );
        assert_eq!(Polarity::from_label("activation"), Polarity::Neutral);
    }
}
