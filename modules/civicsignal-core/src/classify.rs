//! Intake classifier: deterministic keyword scoring over citizen text.
//!
//! Pure function over the keyword tables plus the input text — no store, no
//! network. Given identical tables and text the output is identical,
//! bit-for-bit, across calls.

use civicsignal_common::{Category, GeoPoint, Priority, Sentiment};

const BASE_URGENCY: u32 = 50;
const URGENT_KEYWORD_BONUS: u32 = 30;
const NEGATIVE_KEYWORD_BONUS: u32 = 20;
const LONG_TEXT_BONUS: u32 = 10;
const LONG_TEXT_CHARS: usize = 100;

/// One category's scoring row. Table order is significant: ties resolve to
/// the earliest entry.
#[derive(Debug, Clone)]
pub struct CategoryEntry {
    pub category: Category,
    pub keywords: Vec<String>,
    /// Base priority weight contributed when this category wins.
    pub base_weight: u8,
    /// keyword -> subcategory, first match wins.
    pub subcategories: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeywordTables {
    pub categories: Vec<CategoryEntry>,
    pub negative: Vec<String>,
    pub positive: Vec<String>,
    pub urgent: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub category: Category,
    pub subcategory: String,
    pub priority: Priority,
    pub sentiment: Sentiment,
    pub keywords: Vec<String>,
    pub confidence: f32,
    pub urgency_score: u8,
}

pub struct Classifier {
    tables: KeywordTables,
}

impl Classifier {
    pub fn new(tables: KeywordTables) -> Self {
        Self { tables }
    }

    /// Classify free text. Location is accepted for parity with the intake
    /// contract but does not influence the heuristic.
    pub fn classify(&self, text: &str, _location: Option<&GeoPoint>) -> Classification {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered.split_whitespace().collect();

        // Category: highest token-match count wins; strict greater-than keeps
        // the first-declared category on ties.
        let mut best: Option<&CategoryEntry> = None;
        let mut best_score = 0usize;
        let mut matched_keywords: Vec<String> = Vec::new();

        for entry in &self.tables.categories {
            let matched: Vec<String> = entry
                .keywords
                .iter()
                .filter(|kw| {
                    let kw = kw.to_lowercase();
                    tokens.iter().any(|token| token.contains(kw.as_str()))
                })
                .cloned()
                .collect();
            if matched.len() > best_score {
                best_score = matched.len();
                best = Some(entry);
                matched_keywords = matched;
            }
        }

        let category = best.map(|e| e.category).unwrap_or(Category::Other);
        let confidence = (best_score as f32 / 3.0).min(1.0);

        let sentiment = self.sentiment(&tokens);
        let urgent_hit = self.tables.urgent.iter().any(|kw| lowered.contains(&kw.to_lowercase()));
        let priority = self.priority(best, sentiment, urgent_hit);
        let urgency_score = self.urgency_score(&lowered, urgent_hit, text);
        let subcategory = best
            .and_then(|entry| {
                entry
                    .subcategories
                    .iter()
                    .find(|(kw, _)| lowered.contains(&kw.to_lowercase()))
                    .map(|(_, sub)| sub.clone())
            })
            .unwrap_or_else(|| "general".to_string());

        Classification {
            category,
            subcategory,
            priority,
            sentiment,
            keywords: matched_keywords,
            confidence,
            urgency_score,
        }
    }

    fn sentiment(&self, tokens: &[&str]) -> Sentiment {
        let hits = |set: &[String]| -> usize {
            tokens
                .iter()
                .filter(|token| set.iter().any(|kw| token.contains(&kw.to_lowercase())))
                .count()
        };
        let negative = hits(&self.tables.negative);
        let positive = hits(&self.tables.positive);
        match negative.cmp(&positive) {
            std::cmp::Ordering::Greater => Sentiment::Negative,
            std::cmp::Ordering::Less => Sentiment::Positive,
            std::cmp::Ordering::Equal => Sentiment::Neutral,
        }
    }

    fn priority(&self, best: Option<&CategoryEntry>, sentiment: Sentiment, urgent: bool) -> Priority {
        let mut score: u32 = best.map(|e| e.base_weight as u32).unwrap_or(1);
        if sentiment == Sentiment::Negative {
            score += 1;
        }
        if urgent {
            score += 2;
        }
        match score {
            s if s >= 5 => Priority::Critical,
            4 => Priority::High,
            s if s >= 2 => Priority::Medium,
            _ => Priority::Low,
        }
    }

    fn urgency_score(&self, lowered: &str, urgent: bool, original: &str) -> u8 {
        let mut score = BASE_URGENCY;
        if urgent {
            score += URGENT_KEYWORD_BONUS;
        }
        if self.tables.negative.iter().any(|kw| lowered.contains(&kw.to_lowercase())) {
            score += NEGATIVE_KEYWORD_BONUS;
        }
        if original.chars().count() > LONG_TEXT_CHARS {
            score += LONG_TEXT_BONUS;
        }
        score.min(100) as u8
    }
}

impl Default for Classifier {
    /// Ships the production Hindi keyword tables.
    fn default() -> Self {
        fn strs(words: &[&str]) -> Vec<String> {
            words.iter().map(|w| w.to_string()).collect()
        }
        fn pairs(entries: &[(&str, &str)]) -> Vec<(String, String)> {
            entries
                .iter()
                .map(|(kw, sub)| (kw.to_string(), sub.to_string()))
                .collect()
        }

        Self::new(KeywordTables {
            categories: vec![
                CategoryEntry {
                    category: Category::Roads,
                    keywords: strs(&["सड़क", "गड्ढे", "ट्रैफिक", "बस", "रिक्शा", "पार्किंग"]),
                    base_weight: 2,
                    subcategories: pairs(&[
                        ("गड्ढे", "potholes"),
                        ("holes", "potholes"),
                        ("ट्रैफिक", "traffic"),
                        ("jam", "traffic"),
                        ("बत्ती", "street_lights"),
                        ("lights", "street_lights"),
                        ("साइन", "signage"),
                        ("board", "signage"),
                    ]),
                },
                CategoryEntry {
                    category: Category::Water,
                    keywords: strs(&["पानी", "नल", "टंकी", "बोरवेल", "कमी", "गुणवत्ता"]),
                    base_weight: 3,
                    subcategories: pairs(&[
                        ("कमी", "shortage"),
                        ("shortage", "shortage"),
                        ("गुणवत्ता", "quality"),
                        ("quality", "quality"),
                        ("गंदा", "quality"),
                        ("लीकेज", "leakage"),
                        ("leak", "leakage"),
                        ("प्रेशर", "pressure"),
                        ("pressure", "pressure"),
                    ]),
                },
                CategoryEntry {
                    category: Category::Electricity,
                    keywords: strs(&["बिजली", "कटौती", "ट्रांसफार्मर", "मीटर", "वोल्टेज", "बिल"]),
                    base_weight: 2,
                    subcategories: vec![],
                },
                CategoryEntry {
                    category: Category::Garbage,
                    keywords: strs(&["कचरा", "गंदगी", "सफाई", "डस्टबिन", "कलेक्शन"]),
                    base_weight: 1,
                    subcategories: vec![],
                },
                CategoryEntry {
                    category: Category::Healthcare,
                    keywords: strs(&["अस्पताल", "डॉक्टर", "दवा", "इलाज", "एम्बुलेंस"]),
                    base_weight: 3,
                    subcategories: vec![],
                },
                CategoryEntry {
                    category: Category::Education,
                    keywords: strs(&["स्कूल", "शिक्षक", "किताबें", "फीस", "बिल्डिंग"]),
                    base_weight: 1,
                    subcategories: vec![],
                },
            ],
            negative: strs(&["समस्या", "परेशानी", "गुस्सा", "गलत", "बुरा", "खराब", "टूटा"]),
            positive: strs(&["अच्छा", "बेहतर", "सुधार", "धन्यवाद", "खुश", "संतुष्ट"]),
            urgent: strs(&["तुरंत", "जल्दी", "आपातकाल", "इमरजेंसी", "फौरन"]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn water_shortage_with_urgent_keyword() {
        let classifier = Classifier::default();
        let result = classifier.classify("पानी की कमी है, तुरंत ध्यान चाहिए", None);

        assert_eq!(result.category, Category::Water);
        assert!(result.urgency_score >= 80, "got {}", result.urgency_score);
        assert!(
            result.priority == Priority::High || result.priority == Priority::Critical,
            "got {:?}",
            result.priority
        );
        assert_eq!(result.subcategory, "shortage");
    }

    #[test]
    fn classification_is_deterministic() {
        let classifier = Classifier::default();
        let text = "सड़क पर गड्ढे हैं और ट्रैफिक की समस्या है";
        let a = classifier.classify(text, None);
        let b = classifier.classify(text, None);
        assert_eq!(a, b);
    }

    #[test]
    fn no_keyword_hit_falls_back_to_other() {
        let classifier = Classifier::default();
        let result = classifier.classify("hello world", None);
        assert_eq!(result.category, Category::Other);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.subcategory, "general");
        assert!(result.keywords.is_empty());
    }

    #[test]
    fn ties_go_to_first_declared_category() {
        fn entry(category: Category, kw: &str, weight: u8) -> CategoryEntry {
            CategoryEntry {
                category,
                keywords: vec![kw.to_string()],
                base_weight: weight,
                subcategories: vec![],
            }
        }
        let classifier = Classifier::new(KeywordTables {
            categories: vec![
                entry(Category::Roads, "shared", 2),
                entry(Category::Water, "shared", 3),
            ],
            negative: vec![],
            positive: vec![],
            urgent: vec![],
        });
        let result = classifier.classify("shared keyword text", None);
        assert_eq!(result.category, Category::Roads);
    }

    #[test]
    fn confidence_caps_at_one() {
        let classifier = Classifier::default();
        // Four distinct water keywords -> raw score 4/3, clamped
        let result = classifier.classify("पानी नल टंकी बोरवेल", None);
        assert_eq!(result.category, Category::Water);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn sentiment_tie_is_neutral() {
        let classifier = Classifier::default();
        // One negative (समस्या) and one positive (अच्छा) keyword
        let result = classifier.classify("समस्या अच्छा", None);
        assert_eq!(result.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn negative_sentiment_raises_priority() {
        let classifier = Classifier::default();
        // healthcare (base 3) + negative (+1) = 4 -> high
        let with_negative = classifier.classify("अस्पताल में बुरा हाल", None);
        assert_eq!(with_negative.category, Category::Healthcare);
        assert_eq!(with_negative.sentiment, Sentiment::Negative);
        assert_eq!(with_negative.priority, Priority::High);

        // healthcare alone (base 3) -> medium
        let plain = classifier.classify("अस्पताल दूर है", None);
        assert_eq!(plain.priority, Priority::Medium);
    }

    #[test]
    fn urgency_score_clamps_at_100() {
        let classifier = Classifier::default();
        // urgent (+30), negative (+20), and padding past 100 chars (+10)
        let text = format!("तुरंत समस्या {}", "बहुत लंबा विवरण ".repeat(10));
        let result = classifier.classify(&text, None);
        assert_eq!(result.urgency_score, 100);
    }

    #[test]
    fn keywords_are_the_matched_category_keywords() {
        let classifier = Classifier::default();
        let result = classifier.classify("पानी और नल की शिकायत", None);
        assert_eq!(result.keywords, vec!["पानी".to_string(), "नल".to_string()]);
    }
}
