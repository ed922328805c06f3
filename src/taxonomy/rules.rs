use super::category::Category;
use super::color::Color;
use crate::common::labels::{sort_labels, ScoredLabel};
use serde::{Deserialize, Serialize};

fn default_rule_confidence() -> f32 {
    1.0
}

/// A declared domain correction. When any label contains one of `patterns`
/// (and none of `exclude`), the rule forces a category and/or a color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRule {
    pub name: String,
    pub patterns: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub forced_category: Option<Category>,
    #[serde(default)]
    pub forced_color: Option<Color>,
    /// Confidence of a forced color. Forced categories report the matched
    /// label's score scaled by this value.
    #[serde(default = "default_rule_confidence")]
    pub confidence: f32,
    #[serde(default)]
    pub priority: i32,
}

impl OverrideRule {
    pub fn new(name: impl Into<String>, patterns: &[&str]) -> Self {
        Self {
            name: name.into(),
            patterns: patterns.iter().map(|p| p.to_lowercase()).collect(),
            exclude: Vec::new(),
            forced_category: None,
            forced_color: None,
            confidence: default_rule_confidence(),
            priority: 0,
        }
    }

    pub fn excluding(mut self, exclude: &[&str]) -> Self {
        self.exclude = exclude.iter().map(|e| e.to_lowercase()).collect();
        self
    }

    pub fn forcing_category(mut self, category: Category) -> Self {
        self.forced_category = Some(category);
        self
    }

    pub fn forcing_color(mut self, color: Color) -> Self {
        self.forced_color = Some(color);
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn matches(&self, label: &str) -> bool {
        let label = label.to_lowercase();
        !self
            .exclude
            .iter()
            .any(|e| label.contains(&e.to_lowercase()))
            && self
                .patterns
                .iter()
                .any(|p| !p.is_empty() && label.contains(&p.to_lowercase()))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("rule name must not be empty".to_string());
        }
        if self.patterns.iter().all(|p| p.trim().is_empty()) {
            return Err(format!("rule '{}' has no patterns", self.name));
        }
        if self.forced_category.is_none() && self.forced_color.is_none() {
            return Err(format!("rule '{}' forces neither a category nor a color", self.name));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!(
                "rule '{}' confidence must be in [0, 1], got {}",
                self.name, self.confidence
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleHit<T> {
    pub rule: String,
    pub value: T,
    pub matched_label: String,
    pub label_score: f32,
    pub confidence: f32,
}

impl<T> RuleHit<T> {
    fn new(rule: &OverrideRule, label: &ScoredLabel, value: T) -> Self {
        Self {
            rule: rule.name.clone(),
            value,
            matched_label: label.label.clone(),
            label_score: label.score,
            confidence: rule.confidence,
        }
    }
}

/// Outcome of running every rule once against a request's labels.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuleEvaluation {
    pub category: Option<RuleHit<Category>>,
    pub color: Option<RuleHit<Color>>,
}

impl RuleEvaluation {
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.color.is_none()
    }
}

/// Prioritized override rules. Higher priority is consulted first; equal
/// priorities keep insertion order.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<OverrideRule>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in corrections: the clog family is footwear, never a kitchen appliance.
    pub fn standard() -> Self {
        Self::new().with_rule(
            OverrideRule::new("clog-family", &["clog", "croc", "geta", "patten", "sabot"])
                .excluding(&["crock pot", "crockpot", "crocodile"])
                .forcing_category(Category::Footwear)
                .with_priority(100),
        )
    }

    pub fn with_rule(mut self, rule: OverrideRule) -> Self {
        self.push(rule);
        self
    }

    pub fn push(&mut self, rule: OverrideRule) {
        let at = self
            .rules
            .iter()
            .position(|r| r.priority < rule.priority)
            .unwrap_or(self.rules.len());
        self.rules.insert(at, rule);
    }

    pub fn rules(&self) -> &[OverrideRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn evaluate(&self, labels: &[ScoredLabel]) -> RuleEvaluation {
        let mut ranked = labels.to_vec();
        sort_labels(&mut ranked);

        let mut evaluation = RuleEvaluation::default();
        for rule in &self.rules {
            if evaluation.category.is_some() && evaluation.color.is_some() {
                break;
            }
            let Some(label) = ranked.iter().find(|l| rule.matches(&l.label)) else {
                continue;
            };
            if evaluation.category.is_none() {
                evaluation.category = rule.forced_category.map(|v| RuleHit::new(rule, label, v));
            }
            if evaluation.color.is_none() {
                evaluation.color = rule.forced_color.map(|v| RuleHit::new(rule, label, v));
            }
        }
        evaluation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_forces_footwear_for_clogs_only() {
        let table = RuleTable::standard();
        let hit = table
            .evaluate(&[ScoredLabel::new("Clog, geta, patten, sabot", 0.4)])
            .category
            .unwrap();
        assert_eq!(hit.value, Category::Footwear);
        assert_eq!(hit.rule, "clog-family");

        assert!(table
            .evaluate(&[ScoredLabel::new("Crock Pot", 0.9)])
            .is_empty());
        assert!(table.evaluate(&[]).is_empty());
    }

    #[test]
    fn higher_priority_rules_win() {
        let table = RuleTable::new()
            .with_rule(
                OverrideRule::new("low", &["loafer"])
                    .forcing_color(Color::Brown)
                    .with_priority(1),
            )
            .with_rule(
                OverrideRule::new("high", &["loafer"])
                    .forcing_color(Color::Purple)
                    .with_confidence(0.9)
                    .with_priority(5),
            );
        assert_eq!(table.rules()[0].name, "high");

        let color = table
            .evaluate(&[ScoredLabel::new("Loafer", 0.7)])
            .color
            .unwrap();
        assert_eq!(color.value, Color::Purple);
        assert_eq!(color.confidence, 0.9);
        assert_eq!(color.label_score, 0.7);
    }

    #[test]
    fn equal_priorities_keep_insertion_order() {
        let table = RuleTable::new()
            .with_rule(OverrideRule::new("first", &["bag"]).forcing_category(Category::Bag))
            .with_rule(OverrideRule::new("second", &["bag"]).forcing_category(Category::Other));
        let hit = table
            .evaluate(&[ScoredLabel::new("bag", 0.5)])
            .category
            .unwrap();
        assert_eq!(hit.rule, "first");
    }

    #[test]
    fn rules_deserialize_from_config_shape() {
        let rule: OverrideRule = serde_json::from_str(
            r#"{"name":"loafer-purple","patterns":["loafer"],"forced_color":"purple","confidence":0.85}"#,
        )
        .unwrap();
        assert_eq!(rule.forced_color, Some(Color::Purple));
        assert_eq!(rule.priority, 0);
        assert!(rule.validate().is_ok());

        let empty = OverrideRule::new("nothing", &["x"]);
        assert!(empty.validate().is_err());
        assert!(OverrideRule::new("", &["x"])
            .forcing_color(Color::Red)
            .validate()
            .is_err());
    }
}
