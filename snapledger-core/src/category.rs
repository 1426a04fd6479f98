//! The closed category vocabulary shared by the prompt, the sheet and the summary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Spending categories a record may carry. Anything outside this set is rejected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    #[serde(rename = "Housing")]
    Housing,
    #[serde(rename = "Utilities")]
    Utilities,
    #[serde(rename = "Groceries")]
    Groceries,
    #[serde(rename = "Dining & Drinks")]
    DiningDrinks,
    #[serde(rename = "Transportation")]
    Transportation,
    #[serde(rename = "Shopping")]
    Shopping,
    #[serde(rename = "Health & Wellness")]
    HealthWellness,
    #[serde(rename = "Entertainment")]
    Entertainment,
    #[serde(rename = "Travel")]
    Travel,
    #[serde(rename = "Education")]
    Education,
    #[serde(rename = "Subscriptions")]
    Subscriptions,
    #[serde(rename = "Personal Care")]
    PersonalCare,
    #[serde(rename = "Gifts & Donations")]
    GiftsDonations,
    #[serde(rename = "Fees & Charges")]
    FeesCharges,
    #[serde(rename = "Income")]
    Income,
    #[serde(rename = "Others")]
    Others,
}

impl Category {
    /// Every category, in the order they are listed to the model.
    pub const ALL: [Category; 16] = [
        Category::Housing,
        Category::Utilities,
        Category::Groceries,
        Category::DiningDrinks,
        Category::Transportation,
        Category::Shopping,
        Category::HealthWellness,
        Category::Entertainment,
        Category::Travel,
        Category::Education,
        Category::Subscriptions,
        Category::PersonalCare,
        Category::GiftsDonations,
        Category::FeesCharges,
        Category::Income,
        Category::Others,
    ];

    /// Canonical spelling, as written to the sheet.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Housing => "Housing",
            Category::Utilities => "Utilities",
            Category::Groceries => "Groceries",
            Category::DiningDrinks => "Dining & Drinks",
            Category::Transportation => "Transportation",
            Category::Shopping => "Shopping",
            Category::HealthWellness => "Health & Wellness",
            Category::Entertainment => "Entertainment",
            Category::Travel => "Travel",
            Category::Education => "Education",
            Category::Subscriptions => "Subscriptions",
            Category::PersonalCare => "Personal Care",
            Category::GiftsDonations => "Gifts & Donations",
            Category::FeesCharges => "Fees & Charges",
            Category::Income => "Income",
            Category::Others => "Others",
        }
    }

    /// Match a label against the vocabulary, ignoring surrounding whitespace and ASCII case.
    pub fn parse(label: &str) -> Option<Category> {
        let label = label.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(label))
    }

    /// Comma-separated vocabulary for embedding in a prompt.
    pub fn vocabulary() -> String {
        Category::ALL
            .iter()
            .map(|c| c.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
