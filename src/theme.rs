use crate::blueprint::Category;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_size: f32,
    pub background: String,
    pub text_color: String,
    pub line_color: String,
    pub node_border: String,
    pub theme_color: String,
    pub concept_color: String,
    pub movement_color: String,
    pub political_color: String,
    pub digital_color: String,
    pub other_color: String,
    pub marker_fill: String,
    pub marker_border: String,
    pub marker_label: String,
}

impl Theme {
    pub fn blueprint_default() -> Self {
        Self {
            font_size: 10.0,
            background: "#FFFFFF".to_string(),
            text_color: "#1C2430".to_string(),
            line_color: "#7A8AA6".to_string(),
            node_border: "#FFFFFF".to_string(),
            theme_color: "#E45756".to_string(),
            concept_color: "#4C78A8".to_string(),
            movement_color: "#F58518".to_string(),
            political_color: "#54A24B".to_string(),
            digital_color: "#B279A2".to_string(),
            other_color: "#9D9D9D".to_string(),
            marker_fill: "#4682DC".to_string(),
            marker_border: "#1E3C78".to_string(),
            marker_label: "#282828".to_string(),
        }
    }

    pub fn monochrome() -> Self {
        let gray = "#5A5A5A".to_string();
        Self {
            theme_color: gray.clone(),
            concept_color: gray.clone(),
            movement_color: gray.clone(),
            political_color: gray.clone(),
            digital_color: gray.clone(),
            other_color: gray,
            ..Self::blueprint_default()
        }
    }

    pub fn category_color(&self, category: &Category) -> &str {
        match category {
            Category::Theme => &self.theme_color,
            Category::Concept => &self.concept_color,
            Category::Movement => &self.movement_color,
            Category::Political => &self.political_color,
            Category::Digital => &self.digital_color,
            Category::Other(_) => &self.other_color,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::blueprint_default()
    }
}
