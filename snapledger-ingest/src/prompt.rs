//! Instruction template sent to the inference endpoint.

use snapledger_core::{Category, RECORD_KEYS};

/// Build the extraction prompt around raw OCR text.
pub fn build_prompt(text: &str) -> String {
    let keys = RECORD_KEYS
        .iter()
        .map(|k| format!("\"{k}\""))
        .collect::<Vec<_>>()
        .join(", ");

    let mut p = String::new();
    p.push_str("You extract financial transactions from OCR text of receipts and statements.\n\n");
    p.push_str("Return a JSON array with one object per transaction found in the text.\n");
    p.push_str(&format!("Every object must have exactly these keys: {keys}.\n"));
    p.push_str("- date: the transaction date as YYYY-MM-DD. If the date is ambiguous, infer the most likely one. Use null if there is no date.\n");
    p.push_str("- merchant: the merchant or payee name only, without timestamps, addresses or store numbers.\n");
    p.push_str("- amount: the total as a number, without currency symbols. Refunds and credits are negative.\n");
    p.push_str(&format!(
        "- category: exactly one of: {}.\n",
        Category::vocabulary()
    ));
    p.push_str("\nRules:\n");
    p.push_str("- Output only the JSON array. No markdown, no code fences, no commentary.\n");
    p.push_str("- Use null for any field you cannot determine. Never use an empty string.\n");
    p.push_str("- If there are no transactions, output [].\n");
    p.push_str("\nText:\n\"\"\"\n");
    p.push_str(text.trim());
    p.push_str("\n\"\"\"\n");
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_text_and_rules() {
        let p = build_prompt("  CAFE X\nTOTAL 12.50\n ");
        assert!(p.contains("\"date\", \"merchant\", \"amount\", \"category\""));
        assert!(p.contains("CAFE X\nTOTAL 12.50\n\"\"\""));
        assert!(p.contains("Dining & Drinks"));
        assert!(p.contains("no code fences"));
        assert!(p.contains("Use null"));
    }

    #[test]
    fn test_prompt_lists_whole_vocabulary() {
        let p = build_prompt("x");
        for c in Category::ALL {
            assert!(p.contains(c.label()), "missing {c}");
        }
    }
}
