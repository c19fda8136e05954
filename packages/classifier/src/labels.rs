//! Descriptive prompt labels for each issue category.

use civicsense_issue_models::IssueCategory;

const CIVIC_LABELS: &[(&str, IssueCategory)] = &[
    ("pothole", IssueCategory::RoadDamage),
    ("road damage", IssueCategory::RoadDamage),
    ("broken road", IssueCategory::RoadDamage),
    ("crack in road", IssueCategory::RoadDamage),
    ("garbage pile", IssueCategory::Garbage),
    ("trash", IssueCategory::Garbage),
    ("waste", IssueCategory::Garbage),
    ("litter", IssueCategory::Garbage),
    ("dumping", IssueCategory::Garbage),
    ("broken streetlight", IssueCategory::StreetLight),
    ("power line", IssueCategory::StreetLight),
    ("electric pole", IssueCategory::StreetLight),
    ("cable", IssueCategory::StreetLight),
    ("water leak", IssueCategory::WaterLeak),
    ("broken pipe", IssueCategory::WaterLeak),
    ("sewage", IssueCategory::WaterLeak),
    ("drainage", IssueCategory::WaterLeak),
    ("general issue", IssueCategory::Other),
    ("miscellaneous", IssueCategory::Other),
];

/// One candidate label and the category it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    /// Prompt text, lowercase.
    pub text: String,
    /// Category this label votes for.
    pub category: IssueCategory,
}

/// Ordered list of candidate labels.
///
/// Order matters: it is the index space for classifier scores, and the
/// keyword scan in [`LabelSet::classify_text`] walks it front to back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    labels: Vec<Label>,
}

impl Default for LabelSet {
    fn default() -> Self {
        Self::new(
            CIVIC_LABELS
                .iter()
                .map(|(text, category)| ((*text).to_string(), *category)),
        )
    }
}

impl LabelSet {
    /// Builds a label set from `(text, category)` pairs. Text is lowercased.
    #[must_use]
    pub fn new(labels: impl IntoIterator<Item = (String, IssueCategory)>) -> Self {
        Self {
            labels: labels
                .into_iter()
                .map(|(text, category)| Label {
                    text: text.to_lowercase(),
                    category,
                })
                .collect(),
        }
    }

    /// Number of labels.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the set has no labels.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label at `index`, the same index as its classifier score.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Label> {
        self.labels.get(index)
    }

    /// Label texts in order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|l| l.text.as_str())
    }

    /// Position of `text` in the set, case-insensitively.
    #[must_use]
    pub fn position(&self, text: &str) -> Option<usize> {
        let text = text.to_lowercase();
        self.labels.iter().position(|l| l.text == text)
    }

    /// Category a label maps to.
    #[must_use]
    pub fn category_of(&self, text: &str) -> Option<IssueCategory> {
        self.position(text).map(|i| self.labels[i].category)
    }

    /// Picks a category from free text by keyword containment.
    ///
    /// The first label found anywhere in `title` or `description`
    /// (case-insensitive) decides. Falls back to [`IssueCategory::Other`].
    #[must_use]
    pub fn classify_text(&self, title: &str, description: &str) -> IssueCategory {
        let text = format!("{title} {description}").to_lowercase();
        self.labels
            .iter()
            .find(|l| text.contains(&l.text))
            .map_or(IssueCategory::Other, |l| l.category)
    }
}
